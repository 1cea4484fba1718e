//! Application layer driving the two state machines.
//!
//! Each driver owns its state exclusively, applies events through the pure
//! transitions in `domain`, executes the resulting commands against the ports
//! and hands the outward effects back to the caller.

pub mod funding;
pub mod payment;
pub mod scanner;

use crate::domain::effect::{Effect, Notice, Route};
use crate::domain::ports::SessionPort;
use crate::domain::session::{Credential, Role};

/// Credential of the active session, if it belongs to a passenger.
pub(crate) async fn passenger_credential(session: &dyn SessionPort) -> Option<Credential> {
    session
        .current()
        .await
        .filter(|s| s.role == Role::Passenger)
        .map(|s| s.credential)
}

pub(crate) fn login_required() -> Vec<Effect> {
    vec![
        Effect::Notify(Notice::error("Please login to continue")),
        Effect::Navigate(Route::Login),
    ]
}
