use super::{login_required, passenger_credential};
use crate::domain::effect::{Command, Effect, Route, Transition};
use crate::domain::funding::{
    FundingEvent, FundingIntent, FundingStatus, RedirectParams, RedirectStatus, TxRef, reconcile,
};
use crate::domain::money::Amount;
use crate::domain::ports::{FundingIntentStoreBox, SessionRef, TransactionApiRef};
use crate::error::{ApiError, ValidationError};
use rust_decimal::Decimal;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::{info, warn};

/// What the presentation layer observes after a funding operation.
#[derive(Debug, Clone, PartialEq)]
pub struct FundingOutcome {
    /// `None` when the request was refused before an intent existed.
    pub intent: Option<FundingIntent>,
    pub effects: Vec<Effect>,
}

impl FundingOutcome {
    pub fn status(&self) -> Option<FundingStatus> {
        self.intent.as_ref().map(|i| i.status)
    }
}

/// Takes a wallet funding from initiation through the gateway redirect to a
/// definite outcome.
///
/// Nothing here is expected to survive the redirect. `resume()` rebuilds the
/// picture from the checkpoint store and the redirect parameters alone.
pub struct FundingReconciler {
    api: TransactionApiRef,
    session: SessionRef,
    store: FundingIntentStoreBox,
    in_flight: Slots,
}

impl FundingReconciler {
    pub fn new(api: TransactionApiRef, session: SessionRef, store: FundingIntentStoreBox) -> Self {
        Self {
            api,
            session,
            store,
            in_flight: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Requests a payment link for `amount`. Non-positive amounts are
    /// rejected before any intent or network call exists.
    pub async fn initiate(&self, amount: Decimal) -> Result<FundingOutcome, ValidationError> {
        let amount = Amount::new(amount)?;
        if passenger_credential(self.session.as_ref()).await.is_none() {
            warn!("funding requested without a passenger session");
            return Ok(FundingOutcome {
                intent: None,
                effects: login_required(),
            });
        }
        info!(%amount, "initiating wallet funding");
        Ok(self.run(FundingIntent::initiate(amount)).await)
    }

    /// Single entry point on return from the gateway. Safe to call repeatedly.
    ///
    /// Concurrent calls for one reference are serialized. A caller that had to
    /// wait reads the outcome the first call checkpointed instead of verifying
    /// again; only a cancellation redirect is still applied on top of it.
    pub async fn resume(&self, params: RedirectParams) -> FundingOutcome {
        let (_slot, waited) = match params.reference.clone() {
            Some(reference) => {
                let (slot, waited) = InFlightSlot::acquire(&self.in_flight, reference).await;
                (Some(slot), waited)
            }
            None => (None, false),
        };

        let stored = match params.reference.as_ref() {
            Some(reference) => self.lookup(reference).await,
            None => None,
        };
        if let Some(stored) = stored.as_ref() {
            info!(reference = ?stored.reference, status = %stored.status, "resuming checkpointed intent");
            if waited
                && stored.status != FundingStatus::Verifying
                && params.status != Some(RedirectStatus::Cancelled)
            {
                info!(reference = ?stored.reference, "sharing the verification that just completed");
                let shared = Transition::to(stored.clone()).effect(Effect::Navigate(Route::Dashboard));
                return self.run(shared).await;
            }
        }
        self.run(reconcile(stored, params)).await
    }

    /// The checkpointed intent for `reference`, if any.
    pub async fn intent(&self, reference: &TxRef) -> Option<FundingIntent> {
        self.lookup(reference).await
    }

    async fn lookup(&self, reference: &TxRef) -> Option<FundingIntent> {
        match self.store.get(reference).await {
            Ok(intent) => intent,
            Err(e) => {
                // Degrade to a lookup miss; the backend deduplicates verification.
                warn!(%reference, error = %e, "funding checkpoint unreadable");
                None
            }
        }
    }

    async fn run(&self, transition: Transition<FundingIntent>) -> FundingOutcome {
        let Transition {
            state: mut intent,
            commands,
            mut effects,
        } = transition;
        let mut commands = VecDeque::from(commands);

        while let Some(command) = commands.pop_front() {
            let event = match command {
                Command::Checkpoint(snapshot) => {
                    if let Err(e) = self.store.store(snapshot).await {
                        warn!(reference = ?intent.reference, error = %e, "failed to checkpoint funding intent");
                    }
                    continue;
                }
                Command::InvalidateSession => {
                    warn!("invalidating session after authorization failure");
                    self.session.invalidate().await;
                    continue;
                }
                Command::RequestFundingLink(amount) => self.request_link(amount).await,
                Command::VerifyFunding(reference) => self.verify(&reference).await,
                other => {
                    warn!(command = ?other, "command not handled by the funding reconciler");
                    continue;
                }
            };

            let previous = intent.status;
            let next = intent.apply(event);
            if next.state.status != previous {
                info!(from = %previous, to = %next.state.status, "funding intent transition");
            }
            intent = next.state;
            effects.extend(next.effects);
            commands.extend(next.commands);
        }

        FundingOutcome {
            intent: Some(intent),
            effects,
        }
    }

    async fn request_link(&self, amount: Amount) -> FundingEvent {
        let Some(credential) = passenger_credential(self.session.as_ref()).await else {
            return FundingEvent::AuthExpired;
        };
        match self.api.fund_wallet(&credential, amount).await {
            Ok(link) => FundingEvent::LinkIssued {
                payment_link: link.payment_link,
                reference: link.reference,
            },
            Err(ApiError::AuthExpired) => FundingEvent::AuthExpired,
            Err(e) => {
                warn!(error = %e, "failed to initialize payment");
                FundingEvent::LinkFailed
            }
        }
    }

    async fn verify(&self, reference: &TxRef) -> FundingEvent {
        let Some(session) = self.session.current().await else {
            return FundingEvent::AuthExpired;
        };
        match self.api.verify_funding(&session.credential, reference).await {
            Ok(true) => FundingEvent::Verified,
            Ok(false) => FundingEvent::VerificationRejected(None),
            Err(ApiError::AuthExpired) => FundingEvent::AuthExpired,
            Err(ApiError::Rejected { status, message }) => {
                warn!(%reference, status, ?message, "verification rejected");
                FundingEvent::VerificationRejected(message)
            }
            Err(ApiError::Transport(reason)) => {
                warn!(%reference, %reason, "verification outcome unknown");
                FundingEvent::VerifyTransportFailed
            }
        }
    }
}

type Slots = Arc<Mutex<HashMap<TxRef, Arc<AsyncMutex<()>>>>>;

/// Exclusive hold on one reference while it is resumed; released on drop.
struct InFlightSlot {
    slots: Slots,
    reference: TxRef,
    _guard: OwnedMutexGuard<()>,
}

impl InFlightSlot {
    /// Waits for any other resume of `reference` to finish. The flag reports
    /// whether the slot was contended.
    async fn acquire(slots: &Slots, reference: TxRef) -> (Self, bool) {
        let lock = {
            let mut map = slots.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(map.entry(reference.clone()).or_default())
        };
        let (guard, waited) = match Arc::clone(&lock).try_lock_owned() {
            Ok(guard) => (guard, false),
            Err(_) => {
                info!(%reference, "verification already in progress, waiting");
                (lock.lock_owned().await, true)
            }
        };
        let slot = Self {
            slots: Arc::clone(slots),
            reference,
            _guard: guard,
        };
        (slot, waited)
    }
}

impl Drop for InFlightSlot {
    fn drop(&mut self) {
        let mut map = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        // One handle lives in the map and one in our guard; anything more is a waiter.
        if map
            .get(&self.reference)
            .is_some_and(|lock| Arc::strong_count(lock) <= 2)
        {
            map.remove(&self.reference);
        }
    }
}
