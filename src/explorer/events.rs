//! Engine-to-UI event stream

use crate::api::shapes::{ImportSummary, Stats};
use crate::core::place::PlaceId;

/// Severity of a user-facing message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageLevel {
    Info,
    Warning,
    Error,
}

/// Everything the UI needs to react to, drained via
/// [`crate::explorer::Explorer::poll_events`]
#[derive(Debug, Clone, PartialEq)]
pub enum ExplorerEvent {
    /// The result set changed; `shown` is after filtering
    ResultsUpdated { shown: usize, total: usize },
    /// A fetch applied but produced nothing; the UI hides the results
    /// panel and shows an informational message
    ResultsEmpty,
    /// The user clicked a marker
    PlaceSelected(PlaceId),
    /// A place was created and appended to the current results
    PlaceAdded(PlaceId),
    /// A CSV bulk import finished, successfully or partially
    ImportFinished(ImportSummary),
    /// Fresh dataset statistics arrived
    StatsUpdated(Stats),
    /// An operation needs an account session that is not there;
    /// the UI opens its login flow
    LoginRequired,
    /// Either session was established or torn down
    SessionChanged,
    /// Dismissable user-facing message
    Message { level: MessageLevel, text: String },
}

impl ExplorerEvent {
    pub fn info(text: impl Into<String>) -> Self {
        ExplorerEvent::Message {
            level: MessageLevel::Info,
            text: text.into(),
        }
    }

    pub fn warning(text: impl Into<String>) -> Self {
        ExplorerEvent::Message {
            level: MessageLevel::Warning,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        ExplorerEvent::Message {
            level: MessageLevel::Error,
            text: text.into(),
        }
    }
}
