//! Session lifecycle notifications

use super::error::RefreshError;

/// Broadcast to subscribers whenever the session changes
///
/// `Expired` is the signal to send the user back to the sign-in screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    LoggedIn { user_id: String },
    Refreshed,
    Expired { reason: RefreshError },
    LoggedOut,
}
