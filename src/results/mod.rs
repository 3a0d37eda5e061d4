//! Result set state: which places are shown, and why
//!
//! One [`ResultSetManager`] owns the unfiltered superset, the live
//! filter query, and the [`ViewMode`] that produced the data. Every
//! fetch goes through a [`RequestTicket`] so a slow response issued for
//! an older mode can never overwrite a newer one.

pub mod filter;

use crate::core::geo::LatLng;
use crate::core::place::{ListKind, ListStatus, Place, PlaceId};
use std::borrow::Cow;

/// Which data source currently populates the result set
#[derive(Debug, Clone, PartialEq)]
pub enum ViewMode {
    /// Free search results (also the empty starting state)
    Search,
    /// One of the user's personal lists, optionally with distances
    /// relative to a reference location
    PersonalList {
        kind: ListKind,
        reference: Option<LatLng>,
    },
    /// A shared group's member places
    GroupView { group_id: i64, group_name: String },
}

impl ViewMode {
    pub fn is_search(&self) -> bool {
        matches!(self, ViewMode::Search)
    }

    pub fn is_personal_list(&self) -> bool {
        matches!(self, ViewMode::PersonalList { .. })
    }

    /// Short name for log lines
    pub fn label(&self) -> &'static str {
        match self {
            ViewMode::Search => "search",
            ViewMode::PersonalList { .. } => "personal-list",
            ViewMode::GroupView { .. } => "group",
        }
    }
}

/// The current superset, its filter query, and its origin
#[derive(Debug, Clone, PartialEq)]
pub struct ResultSet {
    pub mode: ViewMode,
    pub places: Vec<Place>,
    pub query: String,
    /// Set when the server computed distances relative to a location
    pub reference_location: Option<LatLng>,
}

impl ResultSet {
    fn empty() -> Self {
        Self {
            mode: ViewMode::Search,
            places: Vec::new(),
            query: String::new(),
            reference_location: None,
        }
    }

    /// The superset narrowed by the current query; borrowed when the
    /// query is empty
    pub fn filtered(&self) -> Cow<'_, [Place]> {
        filter::filter_places(&self.places, &self.query)
    }

    pub fn is_empty(&self) -> bool {
        self.places.is_empty()
    }
}

impl Default for ResultSet {
    fn default() -> Self {
        Self::empty()
    }
}

/// Proof that a fetch was started; pairs the response with the
/// generation it was issued under
#[derive(Debug, Clone)]
pub struct RequestTicket {
    generation: u64,
    mode: ViewMode,
}

impl RequestTicket {
    pub fn mode(&self) -> &ViewMode {
        &self.mode
    }
}

/// What [`ResultSetManager::complete`] did with a response
#[derive(Debug, Clone, PartialEq)]
pub enum ApplyOutcome {
    /// The response replaced the result set
    Applied { shown: usize },
    /// Applied, but with zero places (UI hides the results panel)
    AppliedEmpty,
    /// A newer request superseded this one; the response was dropped
    Stale,
}

impl ApplyOutcome {
    pub fn was_applied(&self) -> bool {
        !matches!(self, ApplyOutcome::Stale)
    }
}

/// Single owner of the displayed result set.
///
/// Mode switches always replace the whole superset, never merge, so
/// data from a previous mode cannot leak into the new one.
#[derive(Debug, Default)]
pub struct ResultSetManager {
    current: ResultSet,
    generation: u64,
}

impl ResultSetManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> &ResultSet {
        &self.current
    }

    pub fn mode(&self) -> &ViewMode {
        &self.current.mode
    }

    pub fn query(&self) -> &str {
        &self.current.query
    }

    /// The filtered subset currently shown
    pub fn filtered(&self) -> Cow<'_, [Place]> {
        self.current.filtered()
    }

    /// Starts a fetch for `mode`, invalidating every earlier ticket
    pub fn begin(&mut self, mode: ViewMode) -> RequestTicket {
        self.generation += 1;
        RequestTicket {
            generation: self.generation,
            mode,
        }
    }

    /// Applies a completed fetch, unless a newer one has started since.
    ///
    /// An empty group view reverts to empty search instead of showing a
    /// group with nothing in it.
    pub fn complete(
        &mut self,
        ticket: RequestTicket,
        places: Vec<Place>,
        reference_location: Option<LatLng>,
    ) -> ApplyOutcome {
        if ticket.generation != self.generation {
            log::debug!(
                "dropping stale {} response (generation {} < {})",
                ticket.mode.label(),
                ticket.generation,
                self.generation
            );
            return ApplyOutcome::Stale;
        }

        let mode = match ticket.mode {
            ViewMode::GroupView { .. } if places.is_empty() => ViewMode::Search,
            // A list fetched with geolocation learns its reference from
            // the response, not from the request
            ViewMode::PersonalList { kind, reference } => ViewMode::PersonalList {
                kind,
                reference: reference_location.or(reference),
            },
            other => other,
        };

        let shown = places.len();
        self.current = ResultSet {
            mode,
            places,
            query: String::new(),
            reference_location,
        };

        if shown == 0 {
            ApplyOutcome::AppliedEmpty
        } else {
            ApplyOutcome::Applied { shown }
        }
    }

    /// Updates the live filter query; filtering itself is recomputed on
    /// the next [`filtered`](Self::filtered) call
    pub fn set_query(&mut self, query: impl Into<String>) {
        self.current.query = query.into();
    }

    /// Appends a newly created place to the current superset
    pub fn append(&mut self, place: Place) {
        self.current.places.push(place);
    }

    pub fn get(&self, id: PlaceId) -> Option<&Place> {
        self.current.places.iter().find(|p| p.id == id)
    }

    /// Patches one place's membership flag in the cached superset
    pub fn patch_status(&mut self, id: PlaceId, kind: ListKind, member: bool) {
        if let Some(place) = self.current.places.iter_mut().find(|p| p.id == id) {
            place.status_mut().set(kind, member);
        }
    }

    /// Replaces one place's membership flags wholesale, from a fresh
    /// server snapshot
    pub fn set_status(&mut self, id: PlaceId, status: ListStatus) {
        if let Some(place) = self.current.places.iter_mut().find(|p| p.id == id) {
            place.list_status = Some(status);
        }
    }

    /// Drops one place from the current superset; returns whether it
    /// was present
    pub fn remove(&mut self, id: PlaceId) -> bool {
        let before = self.current.places.len();
        self.current.places.retain(|p| p.id != id);
        self.current.places.len() != before
    }

    /// Removes membership flags everywhere and leaves any
    /// account-scoped view, used when the account session ends
    pub fn strip_list_state(&mut self) {
        for place in &mut self.current.places {
            place.list_status = None;
        }
        // Personal lists and groups cannot outlive the account session
        if !self.current.mode.is_search() {
            self.generation += 1;
            self.current = ResultSet::empty();
        }
    }

    /// Back to the empty search state
    pub fn reset(&mut self) {
        self.generation += 1;
        self.current = ResultSet::empty();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn place(id: PlaceId, name: &str) -> Place {
        Place::new(id, name)
    }

    #[test]
    fn test_complete_replaces_never_merges() {
        let mut manager = ResultSetManager::new();

        let ticket = manager.begin(ViewMode::Search);
        manager.complete(ticket, vec![place(1, "A"), place(2, "B")], None);
        assert_eq!(manager.current().places.len(), 2);

        let ticket = manager.begin(ViewMode::PersonalList {
            kind: ListKind::Wishlist,
            reference: None,
        });
        manager.complete(ticket, vec![place(3, "C")], None);

        let ids: Vec<_> = manager.current().places.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![3]);
        assert!(manager.mode().is_personal_list());
    }

    #[test]
    fn test_stale_response_is_discarded() {
        let mut manager = ResultSetManager::new();

        let old = manager.begin(ViewMode::Search);
        let new = manager.begin(ViewMode::Search);

        assert_eq!(
            manager.complete(new, vec![place(1, "fresh")], None),
            ApplyOutcome::Applied { shown: 1 }
        );
        assert_eq!(
            manager.complete(old, vec![place(2, "slow")], None),
            ApplyOutcome::Stale
        );
        assert_eq!(manager.current().places[0].id, 1);
    }

    #[test]
    fn test_empty_group_reverts_to_search() {
        let mut manager = ResultSetManager::new();
        let ticket = manager.begin(ViewMode::GroupView {
            group_id: 9,
            group_name: "VT crawl".to_string(),
        });
        let outcome = manager.complete(ticket, Vec::new(), None);

        assert_eq!(outcome, ApplyOutcome::AppliedEmpty);
        assert!(manager.mode().is_search());
        assert!(manager.current().is_empty());
    }

    #[test]
    fn test_mode_switch_clears_query() {
        let mut manager = ResultSetManager::new();
        let ticket = manager.begin(ViewMode::Search);
        manager.complete(ticket, vec![place(1, "Alpha"), place(2, "Beta")], None);

        manager.set_query("alp");
        assert_eq!(manager.filtered().len(), 1);

        let ticket = manager.begin(ViewMode::Search);
        manager.complete(ticket, vec![place(1, "Alpha"), place(2, "Beta")], None);
        assert_eq!(manager.query(), "");
        assert_eq!(manager.filtered().len(), 2);
    }

    #[test]
    fn test_patch_status_only_touches_target() {
        let mut manager = ResultSetManager::new();
        let ticket = manager.begin(ViewMode::Search);
        manager.complete(ticket, vec![place(1, "A"), place(2, "B")], None);

        manager.patch_status(1, ListKind::Liked, true);
        assert!(manager.get(1).unwrap().status().liked);
        assert!(manager.get(2).unwrap().list_status.is_none());

        manager.patch_status(1, ListKind::Liked, false);
        assert!(!manager.get(1).unwrap().status().liked);
    }

    #[test]
    fn test_strip_list_state_after_logout() {
        let mut manager = ResultSetManager::new();
        let ticket = manager.begin(ViewMode::Search);
        let mut p = place(1, "A");
        p.status_mut().visited = true;
        manager.complete(ticket, vec![p], None);

        manager.strip_list_state();
        // Search view keeps its places, just without membership flags
        assert_eq!(manager.current().places.len(), 1);
        assert!(manager.get(1).unwrap().list_status.is_none());

        let ticket = manager.begin(ViewMode::PersonalList {
            kind: ListKind::Visited,
            reference: None,
        });
        manager.complete(ticket, vec![place(2, "B")], None);
        manager.strip_list_state();
        // A personal-list view cannot outlive the account session
        assert!(manager.mode().is_search());
        assert!(manager.current().is_empty());

        let ticket = manager.begin(ViewMode::GroupView {
            group_id: 4,
            group_name: "crew".to_string(),
        });
        manager.complete(ticket, vec![place(3, "C")], None);
        manager.strip_list_state();
        assert!(manager.mode().is_search());
        assert!(manager.current().is_empty());
    }

    #[test]
    fn test_remove_drops_only_the_target_row() {
        let mut manager = ResultSetManager::new();
        let ticket = manager.begin(ViewMode::Search);
        manager.complete(ticket, vec![place(1, "A"), place(2, "B")], None);

        assert!(manager.remove(1));
        assert!(!manager.remove(1));
        assert_eq!(
            manager.current().places.iter().map(|p| p.id).collect::<Vec<_>>(),
            vec![2]
        );
    }

    #[test]
    fn test_reset_invalidates_outstanding_tickets() {
        let mut manager = ResultSetManager::new();
        let ticket = manager.begin(ViewMode::Search);
        manager.reset();
        assert_eq!(
            manager.complete(ticket, vec![place(1, "late")], None),
            ApplyOutcome::Stale
        );
    }
}
