//! Data returned by the state machines.
//!
//! A transition never performs I/O. It yields the next state, the commands its
//! driver must execute (network calls, session teardown, checkpoint writes) and
//! the outward effects the presentation layer interprets.

use super::funding::{FundingIntent, TxRef};
use super::money::Amount;
use super::payment::DriverCode;
use url::Url;

/// Where the presentation layer should send the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Login,
    Dashboard,
}

impl Route {
    pub fn path(&self) -> &'static str {
        match self {
            Route::Login => "/login",
            Route::Dashboard => "/dashboard/user",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

/// Outward effect consumed by the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Navigate(Route),
    Notify(Notice),
    RefreshWallet,
    /// Hand the browsing context to the payment gateway.
    RedirectToGateway(Url),
}

/// Work the owning driver performs on behalf of a transition.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    SubmitPayment(DriverCode),
    RequestFundingLink(Amount),
    VerifyFunding(TxRef),
    Checkpoint(FundingIntent),
    InvalidateSession,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Transition<S> {
    pub state: S,
    pub commands: Vec<Command>,
    pub effects: Vec<Effect>,
}

impl<S> Transition<S> {
    /// Moves to `state` with no commands or effects yet.
    pub fn to(state: S) -> Self {
        Self {
            state,
            commands: Vec::new(),
            effects: Vec::new(),
        }
    }

    pub fn command(mut self, command: Command) -> Self {
        self.commands.push(command);
        self
    }

    pub fn effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    pub fn notify(self, notice: Notice) -> Self {
        self.effect(Effect::Notify(notice))
    }

    /// Session teardown shared by both machines on any authorization failure.
    pub fn session_expired(self) -> Self {
        self.command(Command::InvalidateSession)
            .notify(Notice::error("Session expired. Please login again."))
            .effect(Effect::Navigate(Route::Login))
    }
}
