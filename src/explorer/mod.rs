//! The explorer facade
//!
//! [`Explorer`] owns every subsystem: the session state, the result
//! set, the marker synchronizer, and the API handle. Data loads are
//! spawned on the async runtime and report back over a channel; the
//! UI drives the engine by calling [`Explorer::pump`] once per frame
//! (or per loop iteration) and draining [`Explorer::poll_events`].
//!
//! Every fetch carries a [`crate::results::RequestTicket`], so a slow
//! response that arrives after the user has already switched views is
//! dropped instead of overwriting the newer result set.

pub mod events;
pub mod geolocate;

use crate::api::shapes::{
    AddPlaceResponse, GroupSummary, ImportSummary, PermissionReport, PlaceDraft, Stats,
};
use crate::api::{PlacesApi, SearchParams, SearchQuery};
use crate::core::config::ExplorerConfig;
use crate::core::place::{ListKind, Place, PlaceId};
use crate::markers::backend::MarkerBackend;
use crate::markers::MarkerSynchronizer;
use crate::results::{ApplyOutcome, RequestTicket, ResultSet, ResultSetManager, ViewMode};
use crate::runtime::{spawn, AsyncHandle};
use crate::session::store::CredentialStore;
use crate::session::SessionState;
use crate::Result;
use crossbeam_channel::{unbounded, Receiver, Sender};
use events::ExplorerEvent;
use geolocate::{locate_bounded, GeolocationProvider};
use std::borrow::Cow;
use std::sync::Arc;

/// A finished background operation, delivered to `pump`
enum Completion {
    Page {
        ticket: RequestTicket,
        result: Result<crate::api::shapes::PlacePage>,
    },
    Stats {
        result: Result<Stats>,
    },
    PlaceAdded {
        result: Result<AddPlaceResponse>,
    },
    CsvImported {
        result: Result<ImportSummary>,
    },
    Membership {
        kind: ListKind,
        place_id: PlaceId,
        member: bool,
        revert_to: bool,
        result: Result<()>,
    },
    StatusFetched {
        place_id: PlaceId,
        result: Result<crate::api::shapes::PlaceStatus>,
    },
    Notice(ExplorerEvent),
}

/// Top-level engine state for one map view
pub struct Explorer {
    api: Arc<dyn PlacesApi>,
    config: ExplorerConfig,
    session: SessionState,
    results: ResultSetManager,
    markers: MarkerSynchronizer,
    geolocation: Option<Arc<dyn GeolocationProvider>>,
    stats: Option<Stats>,
    stats_dirty: bool,
    stats_in_flight: bool,
    csv_in_flight: bool,
    completions_tx: Sender<Completion>,
    completions_rx: Receiver<Completion>,
    events_tx: Sender<ExplorerEvent>,
    events_rx: Receiver<ExplorerEvent>,
    tasks: Vec<Box<dyn AsyncHandle>>,
}

impl Explorer {
    pub fn new(
        api: Arc<dyn PlacesApi>,
        credentials: Arc<dyn CredentialStore>,
        backend: Box<dyn MarkerBackend>,
        config: ExplorerConfig,
    ) -> Self {
        let (completions_tx, completions_rx) = unbounded();
        let (events_tx, events_rx) = unbounded();
        let markers = MarkerSynchronizer::new(backend, config.markers.clone());
        Self {
            api,
            session: SessionState::new(credentials),
            results: ResultSetManager::new(),
            markers,
            geolocation: None,
            stats: None,
            stats_dirty: false,
            stats_in_flight: false,
            csv_in_flight: false,
            completions_tx,
            completions_rx,
            events_tx,
            events_rx,
            tasks: Vec::new(),
            config,
        }
    }

    pub fn with_geolocation(mut self, provider: Arc<dyn GeolocationProvider>) -> Self {
        self.geolocation = Some(provider);
        self
    }

    // Accessors

    pub fn api(&self) -> &Arc<dyn PlacesApi> {
        &self.api
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    pub fn results(&self) -> &ResultSet {
        self.results.current()
    }

    pub fn view_mode(&self) -> &ViewMode {
        self.results.mode()
    }

    /// The superset narrowed by the live filter query
    pub fn filtered(&self) -> Cow<'_, [Place]> {
        self.results.filtered()
    }

    pub fn markers(&self) -> &MarkerSynchronizer {
        &self.markers
    }

    pub fn stats(&self) -> Option<&Stats> {
        self.stats.as_ref()
    }

    pub fn selected_place(&self) -> Option<&Place> {
        self.markers.selected().and_then(|id| self.results.get(id))
    }

    // Data loads

    /// Starts a free search; the result replaces whatever is shown
    /// once it arrives
    pub fn run_search(&mut self, query: SearchQuery, params: SearchParams) {
        let ticket = self.results.begin(ViewMode::Search);
        let api = Arc::clone(&self.api);
        let tx = self.completions_tx.clone();
        self.spawn_task(async move {
            let result = api.search(&query, &params).await;
            let _ = tx.send(Completion::Page { ticket, result });
        });
    }

    /// Starts loading one of the user's personal lists.
    ///
    /// Without an account session this aborts untouched and asks the
    /// UI to run its login flow. With `locate` set and a geolocation
    /// provider wired in, the device position is resolved first (with
    /// a bounded wait) so the server can attach distances; a failed
    /// lookup degrades to loading the list without one.
    ///
    /// Returns whether the load actually started.
    pub fn load_personal_list(&mut self, kind: ListKind, locate: bool) -> bool {
        if !self.session.has_account() {
            self.emit(ExplorerEvent::LoginRequired);
            return false;
        }

        let ticket = self.results.begin(ViewMode::PersonalList {
            kind,
            reference: None,
        });
        let api = Arc::clone(&self.api);
        let tx = self.completions_tx.clone();
        let provider = if locate && self.config.geolocation.enabled {
            self.geolocation.clone()
        } else {
            None
        };
        let timeout = self.config.geolocation.timeout;

        self.spawn_task(async move {
            let reference = match &provider {
                Some(provider) => {
                    let position = locate_bounded(provider.as_ref(), timeout).await;
                    if position.is_none() {
                        let _ = tx.send(Completion::Notice(ExplorerEvent::warning(
                            "Could not determine your location; loading the list without distances.",
                        )));
                    }
                    position
                }
                None => None,
            };
            let result = api.personal_list(kind, reference).await;
            let _ = tx.send(Completion::Page { ticket, result });
        });
        true
    }

    /// Starts loading a group's member places
    pub fn load_group_places(&mut self, group_id: i64, group_name: &str) {
        let ticket = self.results.begin(ViewMode::GroupView {
            group_id,
            group_name: group_name.to_string(),
        });
        let api = Arc::clone(&self.api);
        let tx = self.completions_tx.clone();
        self.spawn_task(async move {
            let result = api.group_places(group_id).await;
            let _ = tx.send(Completion::Page { ticket, result });
        });
    }

    /// Updates the live text filter and reschedules the markers
    pub fn set_filter(&mut self, query: &str) {
        self.results.set_query(query);
        let (shown, total) = self.schedule_markers();
        self.emit(ExplorerEvent::ResultsUpdated { shown, total });
    }

    /// Back to the empty search state, markers included
    pub fn reset(&mut self) {
        self.results.reset();
        self.markers.sync_now(&[]);
    }

    // Mutation flows

    /// Starts creating a place. Validation and permission failures
    /// surface immediately; server denials come back as messages
    /// through `pump`.
    pub fn add_place(&mut self, draft: PlaceDraft) -> bool {
        if let Err(e) = draft.validate() {
            self.emit(ExplorerEvent::error(e.user_message()));
            return false;
        }
        if !self.session.can_add_places() {
            self.emit(ExplorerEvent::error("Your role does not allow this action."));
            return false;
        }
        let api = Arc::clone(&self.api);
        let tx = self.completions_tx.clone();
        self.spawn_task(async move {
            let result = api.add_place(&draft).await;
            let _ = tx.send(Completion::PlaceAdded { result });
        });
        true
    }

    /// Starts a CSV bulk import. Admin-only, and at most one upload at
    /// a time; anything else gets an error message without a request
    /// being issued.
    pub fn upload_csv(&mut self, file_name: &str, bytes: Vec<u8>) -> bool {
        if !self.session.is_admin() {
            self.emit(ExplorerEvent::error("Your role does not allow this action."));
            return false;
        }
        if self.csv_in_flight {
            self.emit(ExplorerEvent::warning("An import is already running."));
            return false;
        }
        self.csv_in_flight = true;
        let api = Arc::clone(&self.api);
        let tx = self.completions_tx.clone();
        let file_name = file_name.to_string();
        self.spawn_task(async move {
            let result = api.upload_csv(&file_name, bytes).await;
            let _ = tx.send(Completion::CsvImported { result });
        });
        true
    }

    /// Adds or removes a place from one of the personal lists.
    ///
    /// The cached flag flips optimistically; a server failure flips it
    /// back and surfaces a message.
    pub fn set_membership(&mut self, kind: ListKind, place_id: PlaceId, member: bool) -> bool {
        if !self.session.has_account() {
            self.emit(ExplorerEvent::LoginRequired);
            return false;
        }
        let revert_to = self
            .results
            .get(place_id)
            .map(|p| p.status().get(kind))
            .unwrap_or(false);
        self.results.patch_status(place_id, kind, member);

        let api = Arc::clone(&self.api);
        let tx = self.completions_tx.clone();
        self.spawn_task(async move {
            let result = if member {
                api.add_to_list(kind, place_id, None).await
            } else {
                api.remove_from_list(kind, place_id).await
            };
            let _ = tx.send(Completion::Membership {
                kind,
                place_id,
                member,
                revert_to,
                result,
            });
        });
        true
    }

    /// Starts a stats refresh unless one is already in flight
    pub fn refresh_stats(&mut self) {
        if self.stats_in_flight {
            return;
        }
        self.stats_in_flight = true;
        self.stats_dirty = false;
        let api = Arc::clone(&self.api);
        let tx = self.completions_tx.clone();
        self.spawn_task(async move {
            let result = api.stats().await;
            let _ = tx.send(Completion::Stats { result });
        });
    }

    // Session flows, awaited directly by the UI

    /// Re-validates both stored credentials on startup
    pub async fn check_sessions(&mut self) -> (bool, bool) {
        let role = self.session.check_role(self.api.as_ref()).await;
        let account = self.session.check_account(self.api.as_ref()).await;
        self.emit(ExplorerEvent::SessionChanged);
        (role, account)
    }

    pub async fn login_role(&mut self, username: &str, password: &str) -> Result<()> {
        self.session
            .login_role(self.api.as_ref(), username, password)
            .await?;
        self.emit(ExplorerEvent::SessionChanged);
        Ok(())
    }

    pub async fn login_account(&mut self, username: &str, password: &str) -> Result<()> {
        self.session
            .login_account(self.api.as_ref(), username, password)
            .await?;
        self.emit(ExplorerEvent::SessionChanged);
        Ok(())
    }

    pub async fn register_account(
        &mut self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<()> {
        self.session
            .register_account(self.api.as_ref(), username, email, password)
            .await?;
        self.emit(ExplorerEvent::SessionChanged);
        Ok(())
    }

    pub async fn logout_role(&mut self) {
        self.session.logout_role(self.api.as_ref()).await;
        self.emit(ExplorerEvent::SessionChanged);
    }

    /// Ends the account session and scrubs every trace of it from the
    /// cached results: membership flags are stripped, and an active
    /// personal-list or group view reverts to empty search
    pub async fn logout_account(&mut self) {
        self.session.logout_account();
        self.results.strip_list_state();
        let (shown, total) = self.schedule_markers();
        self.emit(ExplorerEvent::SessionChanged);
        self.emit(ExplorerEvent::ResultsUpdated { shown, total });
    }

    /// Admin permission inspection, a straight passthrough
    pub async fn inspect_permissions(&self) -> Result<PermissionReport> {
        self.api.permissions().await
    }

    pub async fn my_groups(&self) -> Result<Vec<GroupSummary>> {
        self.api.my_groups().await
    }

    pub async fn density(
        &self,
        center: crate::core::geo::LatLng,
        radius_km: Option<f64>,
    ) -> Result<crate::api::shapes::DensityReport> {
        self.api.density(center, radius_km).await
    }

    pub async fn export(
        &self,
        format: crate::api::ExportFormat,
        params: &SearchParams,
    ) -> Result<crate::api::shapes::ExportPayload> {
        self.api.export(format, params).await
    }

    // Engine loop

    /// Applies finished background work and advances the marker
    /// synchronizer. Call once per UI frame; returns the number of
    /// completions applied.
    pub fn pump(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(completion) = self.completions_rx.try_recv() {
            self.apply(completion);
            applied += 1;
        }

        if self.stats_dirty && !self.stats_in_flight {
            self.refresh_stats();
        }

        self.tasks.retain(|task| !task.is_finished());

        self.markers.tick();
        for place_id in self.markers.pump_events() {
            self.emit(ExplorerEvent::PlaceSelected(place_id));
            // With an account session, refresh the clicked place's
            // membership flags so the detail view shows current data
            if self.session.has_account() {
                let api = Arc::clone(&self.api);
                let tx = self.completions_tx.clone();
                self.spawn_task(async move {
                    let result = api.place_status(place_id).await;
                    let _ = tx.send(Completion::StatusFetched { place_id, result });
                });
            }
        }
        applied
    }

    /// Whether background work or a deferred marker rebuild is still
    /// outstanding
    pub fn is_busy(&self) -> bool {
        !self.tasks.is_empty() || self.markers.has_pending()
    }

    /// Drains every pending UI event
    pub fn poll_events(&mut self) -> Vec<ExplorerEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.events_rx.try_recv() {
            events.push(event);
        }
        events
    }

    // Internals

    fn spawn_task<F>(&mut self, future: F)
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        self.tasks.push(spawn(future));
    }

    fn emit(&self, event: ExplorerEvent) {
        let _ = self.events_tx.send(event);
    }

    /// Reschedules the markers from the current filtered list and
    /// returns (shown, total)
    fn schedule_markers(&mut self) -> (usize, usize) {
        let total = self.results.current().places.len();
        let shown = {
            let filtered = self.results.filtered();
            self.markers.schedule(&filtered);
            filtered.len()
        };
        (shown, total)
    }

    fn apply(&mut self, completion: Completion) {
        match completion {
            Completion::Page { ticket, result } => self.apply_page(ticket, result),
            Completion::Stats { result } => {
                self.stats_in_flight = false;
                match result {
                    Ok(stats) => {
                        self.stats = Some(stats.clone());
                        self.emit(ExplorerEvent::StatsUpdated(stats));
                    }
                    Err(e) => log::warn!("stats refresh failed: {e}"),
                }
            }
            Completion::PlaceAdded { result } => match result {
                Ok(response) => {
                    let message = response.message.clone();
                    if let Some(place) = response.into_place() {
                        let place_id = place.id;
                        self.results.append(place);
                        let (shown, total) = self.schedule_markers();
                        self.emit(ExplorerEvent::PlaceAdded(place_id));
                        self.emit(ExplorerEvent::ResultsUpdated { shown, total });
                    }
                    if !message.is_empty() {
                        self.emit(ExplorerEvent::info(message));
                    }
                    self.stats_dirty = true;
                }
                Err(e) => self.emit(ExplorerEvent::error(e.user_message())),
            },
            Completion::CsvImported { result } => {
                self.csv_in_flight = false;
                // Stats go stale on success and on partial failure alike
                self.stats_dirty = true;
                match result {
                    Ok(summary) => self.emit(ExplorerEvent::ImportFinished(summary)),
                    Err(e) => self.emit(ExplorerEvent::error(e.user_message())),
                }
            }
            Completion::Membership {
                kind,
                place_id,
                member,
                revert_to,
                result,
            } => match result {
                Ok(()) => {
                    // Removing a place from the very list being viewed
                    // takes its row off the screen too
                    let viewing_that_list = matches!(
                        self.results.mode(),
                        ViewMode::PersonalList { kind: shown, .. } if *shown == kind
                    );
                    if !member && viewing_that_list && self.results.remove(place_id) {
                        let (shown, total) = self.schedule_markers();
                        self.emit(ExplorerEvent::ResultsUpdated { shown, total });
                    }
                }
                Err(e) => {
                    self.results.patch_status(place_id, kind, revert_to);
                    self.emit(ExplorerEvent::error(e.user_message()));
                }
            },
            Completion::StatusFetched { place_id, result } => match result {
                Ok(status) => self.results.set_status(place_id, status),
                Err(e) => log::debug!("status fetch for place {place_id} failed: {e}"),
            },
            Completion::Notice(event) => self.emit(event),
        }
    }

    fn apply_page(
        &mut self,
        ticket: RequestTicket,
        result: Result<crate::api::shapes::PlacePage>,
    ) {
        let (places, reference) = match result {
            Ok(page) => {
                let mut places = page.places;
                // A record coming back from list endpoint N is a member
                // of list N even when the server omits the flag
                if let ViewMode::PersonalList { kind, .. } = ticket.mode() {
                    let kind = *kind;
                    for place in &mut places {
                        place.status_mut().set(kind, true);
                    }
                }
                (places, page.reference_location)
            }
            Err(e) if matches!(e, crate::Error::Serialization(_)) => {
                // Malformed body: show an empty view, not a crash
                log::error!("unexpected response shape: {e}");
                (Vec::new(), None)
            }
            Err(e) => {
                self.emit(ExplorerEvent::error(e.user_message()));
                return;
            }
        };

        match self.results.complete(ticket, places, reference) {
            ApplyOutcome::Applied { shown: total } => {
                let (shown, _) = self.schedule_markers();
                self.emit(ExplorerEvent::ResultsUpdated { shown, total });
            }
            ApplyOutcome::AppliedEmpty => {
                self.markers.sync_now(&[]);
                self.emit(ExplorerEvent::ResultsEmpty);
            }
            ApplyOutcome::Stale => {}
        }
    }
}
