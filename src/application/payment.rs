use super::scanner::{ScanOutcome, scan_with_fallback};
use super::{login_required, passenger_credential};
use crate::domain::effect::{Command, Effect, Notice, Transition};
use crate::domain::payment::{DriverCode, PaymentAttempt, PaymentEvent, PaymentStatus};
use crate::domain::ports::{QrDecoder, SessionRef, TransactionApiRef};
use crate::error::{ApiError, ValidationError};
use std::collections::VecDeque;
use tokio::sync::Mutex;
use tracing::{info, warn};

/// Turns a scanned or typed driver code into exactly one settled debit.
///
/// The attempt lock is only held while a transition is applied, never across
/// the payment call, so a second `confirm()` observes the in-flight attempt
/// and becomes a no-op.
pub struct PaymentOrchestrator {
    attempt: Mutex<PaymentAttempt>,
    api: TransactionApiRef,
    session: SessionRef,
}

impl PaymentOrchestrator {
    pub fn new(api: TransactionApiRef, session: SessionRef) -> Self {
        Self {
            attempt: Mutex::new(PaymentAttempt::new()),
            api,
            session,
        }
    }

    pub async fn attempt(&self) -> PaymentAttempt {
        self.attempt.lock().await.clone()
    }

    pub async fn status(&self) -> PaymentStatus {
        self.attempt.lock().await.status()
    }

    /// Feeds a decoded or manually entered code.
    pub async fn on_scan_result(&self, code: &str) -> Result<Vec<Effect>, ValidationError> {
        self.drive(PaymentEvent::Scan(code.to_string())).await
    }

    /// Scans with the camera, falling back to manual entry, and feeds the code.
    pub async fn scan(
        &self,
        camera: &dyn QrDecoder,
        manual: &dyn QrDecoder,
    ) -> Result<Vec<Effect>, ValidationError> {
        match scan_with_fallback(camera, manual).await {
            ScanOutcome::Decoded(code) => self.on_scan_result(&code).await,
            ScanOutcome::Unavailable(reason) => Ok(vec![Effect::Notify(Notice::error(reason))]),
        }
    }

    pub async fn confirm(&self) -> Result<Vec<Effect>, ValidationError> {
        if passenger_credential(self.session.as_ref()).await.is_none() {
            warn!("payment confirmation without a passenger session");
            return Ok(login_required());
        }
        self.drive(PaymentEvent::Confirm).await
    }

    pub async fn cancel(&self) -> Vec<Effect> {
        self.drive(PaymentEvent::Cancel).await.unwrap_or_default()
    }

    /// Dismisses a success or failure and returns to `Idle`.
    pub async fn acknowledge(&self) -> Vec<Effect> {
        self.drive(PaymentEvent::Acknowledge).await.unwrap_or_default()
    }

    async fn drive(&self, event: PaymentEvent) -> Result<Vec<Effect>, ValidationError> {
        let mut effects = Vec::new();
        let mut events = VecDeque::from([event]);
        while let Some(event) = events.pop_front() {
            let transition = self.step(event).await?;
            effects.extend(transition.effects);
            for command in transition.commands {
                if let Some(result) = self.execute(command).await {
                    events.push_back(result);
                }
            }
        }
        Ok(effects)
    }

    async fn step(&self, event: PaymentEvent) -> Result<Transition<()>, ValidationError> {
        let mut attempt = self.attempt.lock().await;
        let transition = attempt.clone().apply(event)?;
        if transition.state.status() != attempt.status() {
            info!(from = ?attempt.status(), to = ?transition.state.status(), "payment attempt transition");
        }
        *attempt = transition.state;
        Ok(Transition {
            state: (),
            commands: transition.commands,
            effects: transition.effects,
        })
    }

    async fn execute(&self, command: Command) -> Option<PaymentEvent> {
        match command {
            Command::SubmitPayment(driver) => Some(self.submit(&driver).await),
            Command::InvalidateSession => {
                warn!("invalidating session after authorization failure");
                self.session.invalidate().await;
                None
            }
            other => {
                warn!(command = ?other, "command not handled by the payment orchestrator");
                None
            }
        }
    }

    async fn submit(&self, driver: &DriverCode) -> PaymentEvent {
        let Some(credential) = passenger_credential(self.session.as_ref()).await else {
            return PaymentEvent::AuthExpired;
        };
        match self.api.pay_driver(&credential, driver).await {
            Ok(()) => {
                info!(%driver, "payment settled");
                PaymentEvent::Settled
            }
            Err(ApiError::AuthExpired) => PaymentEvent::AuthExpired,
            Err(ApiError::Rejected { status, message }) => {
                warn!(%driver, status, ?message, "payment declined");
                PaymentEvent::Declined(message)
            }
            Err(ApiError::Transport(reason)) => {
                warn!(%driver, %reason, "payment transport failure");
                PaymentEvent::TransportFailed
            }
        }
    }
}
