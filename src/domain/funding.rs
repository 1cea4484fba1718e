use super::effect::{Command, Effect, Notice, Route, Transition};
use super::money::Amount;
use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

/// Gateway-assigned reference (`tx_ref`) correlating a funding request with
/// its redirect return. The only key that survives the navigation boundary.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TxRef(String);

impl TxRef {
    /// Returns `None` for blank input.
    pub fn new(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        (!trimmed.is_empty()).then(|| Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TxRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    /// The redirect came back without a `tx_ref`.
    MissingReference,
    /// No payment link could be obtained.
    GatewayUnavailable,
    /// The backend explicitly refused verification.
    Rejected,
    /// Verification hit an authorization failure.
    SessionExpired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "reason", rename_all = "snake_case")]
pub enum FundingStatus {
    Initiated,
    AwaitingRedirectReturn,
    Verifying,
    Confirmed,
    Cancelled,
    Failed(FailureReason),
    /// Verification could not reach a verdict. Never treated as success.
    Ambiguous,
}

impl FundingStatus {
    /// Terminal states are never re-verified.
    pub fn is_terminal(&self) -> bool {
        matches!(self, FundingStatus::Confirmed | FundingStatus::Cancelled)
    }
}

impl fmt::Display for FundingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FundingStatus::Initiated => f.write_str("Initiated"),
            FundingStatus::AwaitingRedirectReturn => f.write_str("AwaitingRedirectReturn"),
            FundingStatus::Verifying => f.write_str("Verifying"),
            FundingStatus::Confirmed => f.write_str("Confirmed"),
            FundingStatus::Cancelled => f.write_str("Cancelled"),
            FundingStatus::Failed(FailureReason::SessionExpired) => f.write_str("Failed (session expired)"),
            FundingStatus::Failed(reason) => write!(f, "Failed ({:?})", reason),
            FundingStatus::Ambiguous => f.write_str("Ambiguous"),
        }
    }
}

/// The `status` query parameter of a gateway redirect. Advisory only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedirectStatus {
    Successful,
    Cancelled,
    Other(String),
}

impl RedirectStatus {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "successful" => RedirectStatus::Successful,
            "cancelled" => RedirectStatus::Cancelled,
            other => RedirectStatus::Other(other.to_string()),
        }
    }
}

/// Everything the gateway hands back on the return URL.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RedirectParams {
    pub reference: Option<TxRef>,
    pub status: Option<RedirectStatus>,
    pub transaction_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FundingEvent {
    LinkIssued {
        payment_link: Url,
        reference: Option<TxRef>,
    },
    LinkFailed,
    Verified,
    VerificationRejected(Option<String>),
    VerifyTransportFailed,
    AuthExpired,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FundingIntent {
    pub reference: Option<TxRef>,
    /// Unknown when the intent was reconstructed from a redirect alone.
    pub amount: Option<Amount>,
    pub transaction_id: Option<String>,
    pub status: FundingStatus,
    pub message: Option<String>,
}

impl FundingIntent {
    /// Starts a funding request. The amount is already known to be positive.
    pub fn initiate(amount: Amount) -> Transition<Self> {
        let intent = Self {
            reference: None,
            amount: Some(amount),
            transaction_id: None,
            status: FundingStatus::Initiated,
            message: None,
        };
        Transition::to(intent).command(Command::RequestFundingLink(amount))
    }

    fn reconstructed(reference: Option<TxRef>) -> Self {
        Self {
            reference,
            amount: None,
            transaction_id: None,
            status: FundingStatus::AwaitingRedirectReturn,
            message: None,
        }
    }

    fn with_status(self, status: FundingStatus, message: Option<String>) -> Self {
        Self {
            status,
            message,
            ..self
        }
    }

    pub fn apply(self, event: FundingEvent) -> Transition<Self> {
        if self.status.is_terminal() {
            return Transition::to(self);
        }
        match event {
            FundingEvent::LinkIssued {
                payment_link,
                reference,
            } => {
                let next = Self {
                    reference: reference.or(self.reference),
                    ..self
                }
                .with_status(FundingStatus::AwaitingRedirectReturn, None);
                checkpointed(next).effect(Effect::RedirectToGateway(payment_link))
            }
            FundingEvent::LinkFailed => {
                let message = "Failed to initialize payment";
                let next = self.with_status(
                    FundingStatus::Failed(FailureReason::GatewayUnavailable),
                    Some(message.to_string()),
                );
                Transition::to(next).notify(Notice::error(message))
            }
            FundingEvent::Verified => {
                let next = self.with_status(FundingStatus::Confirmed, None);
                checkpointed(next)
                    .notify(Notice::success("Payment successful! Wallet funded!"))
                    .effect(Effect::RefreshWallet)
                    .effect(Effect::Navigate(Route::Dashboard))
            }
            FundingEvent::VerificationRejected(message) => {
                let message = message
                    .filter(|m| !m.trim().is_empty())
                    .unwrap_or_else(|| {
                        "Payment verification failed. Please contact support.".to_string()
                    });
                let next = self.with_status(
                    FundingStatus::Failed(FailureReason::Rejected),
                    Some(message.clone()),
                );
                checkpointed(next)
                    .notify(Notice::error(message))
                    .effect(Effect::Navigate(Route::Dashboard))
            }
            FundingEvent::VerifyTransportFailed => {
                let message = "Error verifying payment. Please check your wallet or contact support.";
                let next = self.with_status(FundingStatus::Ambiguous, Some(message.to_string()));
                checkpointed(next)
                    .notify(Notice::error(message))
                    .effect(Effect::Navigate(Route::Dashboard))
            }
            FundingEvent::AuthExpired => {
                let next = self.with_status(
                    FundingStatus::Failed(FailureReason::SessionExpired),
                    Some("Session expired. Please login again.".to_string()),
                );
                checkpointed(next).session_expired()
            }
        }
    }
}

fn checkpointed(intent: FundingIntent) -> Transition<FundingIntent> {
    let transition = Transition::to(intent.clone());
    if intent.reference.is_some() {
        transition.command(Command::Checkpoint(intent))
    } else {
        transition
    }
}

/// Decides what a redirect return means, given whatever was checkpointed
/// under the same reference before the hand-off.
pub fn reconcile(stored: Option<FundingIntent>, params: RedirectParams) -> Transition<FundingIntent> {
    if let Some(stored) = stored.as_ref()
        && stored.status.is_terminal()
    {
        return Transition::to(stored.clone()).effect(Effect::Navigate(Route::Dashboard));
    }

    let RedirectParams {
        reference,
        status,
        transaction_id,
    } = params;
    let mut intent = stored.unwrap_or_else(|| FundingIntent::reconstructed(reference.clone()));
    if transaction_id.is_some() {
        intent.transaction_id = transaction_id;
    }

    match (status, reference) {
        (Some(RedirectStatus::Cancelled), _) => {
            let message = "Payment was cancelled";
            let next = intent.with_status(FundingStatus::Cancelled, Some(message.to_string()));
            checkpointed(next)
                .notify(Notice::error(message))
                .effect(Effect::Navigate(Route::Dashboard))
        }
        (_, None) => {
            let message = "Payment failed - no transaction reference";
            let next = intent.with_status(
                FundingStatus::Failed(FailureReason::MissingReference),
                Some(message.to_string()),
            );
            Transition::to(next)
                .notify(Notice::error(message))
                .effect(Effect::Navigate(Route::Dashboard))
        }
        (status, Some(reference)) => {
            let notice = match status {
                Some(RedirectStatus::Successful) => Notice::info("Contacting payment processor..."),
                _ => Notice::info("Payment status unclear, checking..."),
            };
            let next = intent.with_status(FundingStatus::Verifying, None);
            checkpointed(next)
                .command(Command::VerifyFunding(reference))
                .notify(notice)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn params(reference: Option<&str>, status: Option<&str>) -> RedirectParams {
        RedirectParams {
            reference: reference.and_then(TxRef::new),
            status: status.map(RedirectStatus::parse),
            transaction_id: None,
        }
    }

    fn verify_commands(t: &Transition<FundingIntent>) -> usize {
        t.commands
            .iter()
            .filter(|c| matches!(c, Command::VerifyFunding(_)))
            .count()
    }

    #[test]
    fn test_initiate_requests_link() {
        let amount = Amount::new(dec!(500)).unwrap();
        let t = FundingIntent::initiate(amount);
        assert_eq!(t.state.status, FundingStatus::Initiated);
        assert_eq!(t.commands, vec![Command::RequestFundingLink(amount)]);
    }

    #[test]
    fn test_link_issued_checkpoints_before_handoff() {
        let amount = Amount::new(dec!(500)).unwrap();
        let link: Url = "https://checkout.gateway.test/pay/abc".parse().unwrap();
        let t = FundingIntent::initiate(amount).state.apply(FundingEvent::LinkIssued {
            payment_link: link.clone(),
            reference: TxRef::new("ABC123"),
        });
        assert_eq!(t.state.status, FundingStatus::AwaitingRedirectReturn);
        assert!(matches!(&t.commands[..], [Command::Checkpoint(i)] if i.amount == Some(amount)));
        assert_eq!(t.effects, vec![Effect::RedirectToGateway(link)]);
    }

    #[test]
    fn test_link_failure_is_terminal_failure() {
        let t = FundingIntent::initiate(Amount::new(dec!(1)).unwrap())
            .state
            .apply(FundingEvent::LinkFailed);
        assert_eq!(
            t.state.status,
            FundingStatus::Failed(FailureReason::GatewayUnavailable)
        );
        assert!(t.commands.is_empty());
    }

    #[test]
    fn test_successful_redirect_verifies() {
        let t = reconcile(None, params(Some("ABC123"), Some("successful")));
        assert_eq!(t.state.status, FundingStatus::Verifying);
        assert_eq!(verify_commands(&t), 1);
    }

    #[test]
    fn test_unclear_status_still_verifies() {
        for status in [None, Some("pending"), Some("failed")] {
            let t = reconcile(None, params(Some("ABC123"), status));
            assert_eq!(t.state.status, FundingStatus::Verifying);
            assert_eq!(verify_commands(&t), 1);
        }
    }

    #[test]
    fn test_cancelled_never_verifies() {
        for reference in [None, Some("R")] {
            let t = reconcile(None, params(reference, Some("cancelled")));
            assert_eq!(t.state.status, FundingStatus::Cancelled);
            assert_eq!(verify_commands(&t), 0);
        }
    }

    #[test]
    fn test_missing_reference_fails() {
        let t = reconcile(None, params(None, Some("successful")));
        assert_eq!(
            t.state.status,
            FundingStatus::Failed(FailureReason::MissingReference)
        );
        assert!(t.commands.is_empty());
    }

    #[test]
    fn test_terminal_reentry_is_pure_read() {
        let confirmed = reconcile(None, params(Some("ABC123"), Some("successful")))
            .state
            .apply(FundingEvent::Verified)
            .state;
        assert_eq!(confirmed.status, FundingStatus::Confirmed);

        let again = reconcile(Some(confirmed.clone()), params(Some("ABC123"), Some("successful")));
        assert_eq!(again.state, confirmed);
        assert!(again.commands.is_empty());
        assert!(!again.effects.contains(&Effect::RefreshWallet));
    }

    #[test]
    fn test_ambiguous_intent_is_reverified() {
        let ambiguous = reconcile(None, params(Some("ABC123"), Some("successful")))
            .state
            .apply(FundingEvent::VerifyTransportFailed)
            .state;
        assert_eq!(ambiguous.status, FundingStatus::Ambiguous);

        let again = reconcile(Some(ambiguous), params(Some("ABC123"), Some("successful")));
        assert_eq!(verify_commands(&again), 1);
    }

    #[test]
    fn test_auth_expired_during_verification() {
        let t = reconcile(None, params(Some("XYZ"), Some("successful")))
            .state
            .apply(FundingEvent::AuthExpired);
        assert_eq!(
            t.state.status,
            FundingStatus::Failed(FailureReason::SessionExpired)
        );
        assert!(t.commands.contains(&Command::InvalidateSession));
        assert!(t.effects.contains(&Effect::Navigate(Route::Login)));
    }

    #[test]
    fn test_stored_amount_survives_reconstruction() {
        let stored = FundingIntent {
            reference: TxRef::new("ABC123"),
            amount: Some(Amount::new(dec!(750)).unwrap()),
            transaction_id: None,
            status: FundingStatus::AwaitingRedirectReturn,
            message: None,
        };
        let mut p = params(Some("ABC123"), Some("successful"));
        p.transaction_id = Some("998877".to_string());
        let t = reconcile(Some(stored), p);
        assert_eq!(t.state.amount, Some(Amount::new(dec!(750)).unwrap()));
        assert_eq!(t.state.transaction_id.as_deref(), Some("998877"));
    }

    #[test]
    fn test_status_serialization() {
        let json = serde_json::to_string(&FundingStatus::Failed(FailureReason::SessionExpired)).unwrap();
        assert_eq!(json, r#"{"state":"failed","reason":"session_expired"}"#);
        let back: FundingStatus = serde_json::from_str(r#"{"state":"confirmed"}"#).unwrap();
        assert_eq!(back, FundingStatus::Confirmed);
    }
}
