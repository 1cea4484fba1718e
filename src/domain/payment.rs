use super::effect::{Command, Effect, Notice, Transition};
use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Message shown when a payment fails without a server-supplied reason.
pub const GENERIC_PAYMENT_FAILURE: &str = "Payment failed";

/// Driver identifier produced by a QR scan or typed by hand, e.g. `DRV-123456`.
///
/// Only emptiness is checked here; the format is the server's concern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriverCode(String);

impl DriverCode {
    pub fn new(raw: &str) -> Result<Self, ValidationError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            Err(ValidationError::EmptyDriverCode)
        } else {
            Ok(Self(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DriverCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PaymentStatus {
    #[default]
    Idle,
    Scanned,
    Confirming,
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentEvent {
    Scan(String),
    Confirm,
    Cancel,
    Acknowledge,
    /// The payment call reported success.
    Settled,
    /// Explicit decline, with the server's message when it sent one.
    Declined(Option<String>),
    TransportFailed,
    AuthExpired,
}

/// The single payment attempt owned by an orchestrator.
///
/// `in_flight` is tracked apart from `status` so that cancelling while a
/// submission is outstanding does not re-open the single-flight guard.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PaymentAttempt {
    driver_code: Option<DriverCode>,
    status: PaymentStatus,
    error_message: Option<String>,
    in_flight: bool,
}

impl PaymentAttempt {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> PaymentStatus {
        self.status
    }

    pub fn driver_code(&self) -> Option<&DriverCode> {
        self.driver_code.as_ref()
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight
    }

    /// Applies one event. Only locally invalid input is an `Err`.
    pub fn apply(self, event: PaymentEvent) -> Result<Transition<Self>, ValidationError> {
        match event {
            PaymentEvent::Scan(raw) => self.on_scan(&raw),
            PaymentEvent::Confirm => self.on_confirm(),
            PaymentEvent::Cancel => Ok(Transition::to(Self {
                in_flight: self.in_flight,
                ..Self::default()
            })),
            PaymentEvent::Acknowledge => Ok(self.on_acknowledge()),
            PaymentEvent::Settled => Ok(self.on_settled()),
            PaymentEvent::Declined(message) => {
                let message = message
                    .filter(|m| !m.trim().is_empty())
                    .unwrap_or_else(|| GENERIC_PAYMENT_FAILURE.to_string());
                Ok(self.on_failed(message))
            }
            PaymentEvent::TransportFailed => Ok(self.on_failed(GENERIC_PAYMENT_FAILURE.to_string())),
            PaymentEvent::AuthExpired => Ok(Transition::to(Self::default()).session_expired()),
        }
    }

    fn on_scan(self, raw: &str) -> Result<Transition<Self>, ValidationError> {
        if self.status == PaymentStatus::Confirming {
            return Ok(Transition::to(self));
        }
        let code = DriverCode::new(raw)?;
        let next = Self {
            driver_code: Some(code),
            status: PaymentStatus::Scanned,
            error_message: None,
            in_flight: self.in_flight,
        };
        Ok(Transition::to(next).notify(Notice::success(
            "QR code scanned! Confirm payment below.",
        )))
    }

    fn on_confirm(self) -> Result<Transition<Self>, ValidationError> {
        if self.in_flight {
            return Ok(Transition::to(self));
        }
        match (self.status, self.driver_code.clone()) {
            (PaymentStatus::Scanned | PaymentStatus::Failed, Some(code)) => {
                let next = Self {
                    driver_code: Some(code.clone()),
                    status: PaymentStatus::Confirming,
                    error_message: None,
                    in_flight: true,
                };
                Ok(Transition::to(next).command(Command::SubmitPayment(code)))
            }
            _ => Err(ValidationError::MissingDriverCode),
        }
    }

    fn on_acknowledge(self) -> Transition<Self> {
        match self.status {
            PaymentStatus::Succeeded | PaymentStatus::Failed => Transition::to(Self {
                in_flight: self.in_flight,
                ..Self::default()
            }),
            _ => Transition::to(self),
        }
    }

    fn on_settled(self) -> Transition<Self> {
        if self.status != PaymentStatus::Confirming {
            // Cancelled while the call was outstanding; the debit still happened.
            let next = Self {
                in_flight: false,
                ..self
            };
            return Transition::to(next)
                .notify(Notice::success("Payment successful!"))
                .effect(Effect::RefreshWallet);
        }
        let next = Self {
            driver_code: None,
            status: PaymentStatus::Succeeded,
            error_message: None,
            in_flight: false,
        };
        Transition::to(next)
            .notify(Notice::success("Payment successful!"))
            .effect(Effect::RefreshWallet)
    }

    fn on_failed(self, message: String) -> Transition<Self> {
        if self.status != PaymentStatus::Confirming {
            return Transition::to(Self {
                in_flight: false,
                ..self
            });
        }
        let next = Self {
            driver_code: self.driver_code,
            status: PaymentStatus::Failed,
            error_message: Some(message.clone()),
            in_flight: false,
        };
        Transition::to(next).notify(Notice::error(message))
    }
}
