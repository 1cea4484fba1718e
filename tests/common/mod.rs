#![allow(dead_code)]

use async_trait::async_trait;
use futures::StreamExt;
use futures::stream::{self, BoxStream};
use qtap::domain::funding::TxRef;
use qtap::domain::money::{Amount, Balance, WalletSnapshot};
use qtap::domain::payment::DriverCode;
use qtap::domain::ports::{FundingLink, QrDecoder, TransactionApi};
use qtap::domain::scan::{DecodeEvent, DeviceHandle};
use qtap::domain::session::{Credential, Role, Session};
use qtap::error::ApiError;
use qtap::infrastructure::in_memory::SessionHandle;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;

pub fn passenger_session() -> Arc<SessionHandle> {
    Arc::new(SessionHandle::new(Session::new(
        "rider-1",
        Role::Passenger,
        Credential::new("test-token"),
    )))
}

pub fn driver_session() -> Arc<SessionHandle> {
    Arc::new(SessionHandle::new(Session::new(
        "driver-1",
        Role::Driver,
        Credential::new("test-token"),
    )))
}

/// Scripted backend that counts every call.
///
/// Unscripted payment and verification calls succeed. When gated, payment
/// calls wait for `release_payment()` and verification calls wait for
/// `release_verification()` before answering.
pub struct FakeApi {
    pay_calls: AtomicUsize,
    fund_calls: AtomicUsize,
    verify_calls: AtomicUsize,
    pay_results: Mutex<VecDeque<Result<(), ApiError>>>,
    fund_results: Mutex<VecDeque<Result<FundingLink, ApiError>>>,
    verify_results: Mutex<VecDeque<Result<bool, ApiError>>>,
    pay_gate: Option<Arc<Semaphore>>,
    verify_gate: Option<Arc<Semaphore>>,
    verified: Mutex<Vec<String>>,
    paid: Mutex<Vec<String>>,
}

impl FakeApi {
    pub fn new() -> Self {
        Self {
            pay_calls: AtomicUsize::new(0),
            fund_calls: AtomicUsize::new(0),
            verify_calls: AtomicUsize::new(0),
            pay_results: Mutex::new(VecDeque::new()),
            fund_results: Mutex::new(VecDeque::new()),
            verify_results: Mutex::new(VecDeque::new()),
            pay_gate: None,
            verify_gate: None,
            verified: Mutex::new(Vec::new()),
            paid: Mutex::new(Vec::new()),
        }
    }

    pub fn gated(mut self) -> Self {
        self.pay_gate = Some(Arc::new(Semaphore::new(0)));
        self
    }

    pub fn gated_verification(mut self) -> Self {
        self.verify_gate = Some(Arc::new(Semaphore::new(0)));
        self
    }

    pub fn with_pay(self, result: Result<(), ApiError>) -> Self {
        self.pay_results.lock().unwrap().push_back(result);
        self
    }

    pub fn with_fund(self, result: Result<FundingLink, ApiError>) -> Self {
        self.fund_results.lock().unwrap().push_back(result);
        self
    }

    pub fn with_verify(self, result: Result<bool, ApiError>) -> Self {
        self.verify_results.lock().unwrap().push_back(result);
        self
    }

    pub fn release_payment(&self) {
        if let Some(gate) = &self.pay_gate {
            gate.add_permits(1);
        }
    }

    pub fn release_verification(&self) {
        if let Some(gate) = &self.verify_gate {
            gate.add_permits(1);
        }
    }

    pub fn pay_calls(&self) -> usize {
        self.pay_calls.load(Ordering::SeqCst)
    }

    pub fn fund_calls(&self) -> usize {
        self.fund_calls.load(Ordering::SeqCst)
    }

    pub fn verify_calls(&self) -> usize {
        self.verify_calls.load(Ordering::SeqCst)
    }

    pub fn paid_codes(&self) -> Vec<String> {
        self.paid.lock().unwrap().clone()
    }

    pub fn verified_refs(&self) -> Vec<String> {
        self.verified.lock().unwrap().clone()
    }
}

#[async_trait]
impl TransactionApi for FakeApi {
    async fn pay_driver(&self, _credential: &Credential, driver: &DriverCode) -> Result<(), ApiError> {
        self.pay_calls.fetch_add(1, Ordering::SeqCst);
        self.paid.lock().unwrap().push(driver.as_str().to_string());
        if let Some(gate) = &self.pay_gate {
            gate.acquire().await.unwrap().forget();
        }
        self.pay_results.lock().unwrap().pop_front().unwrap_or(Ok(()))
    }

    async fn fund_wallet(&self, _credential: &Credential, _amount: Amount) -> Result<FundingLink, ApiError> {
        self.fund_calls.fetch_add(1, Ordering::SeqCst);
        self.fund_results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(link("https://checkout.gateway.test/pay/default", Some("DEFAULT"))))
    }

    async fn verify_funding(&self, _credential: &Credential, reference: &TxRef) -> Result<bool, ApiError> {
        self.verify_calls.fetch_add(1, Ordering::SeqCst);
        self.verified.lock().unwrap().push(reference.as_str().to_string());
        if let Some(gate) = &self.verify_gate {
            gate.acquire().await.unwrap().forget();
        }
        self.verify_results.lock().unwrap().pop_front().unwrap_or(Ok(true))
    }

    async fn wallet(&self, _credential: &Credential) -> Result<WalletSnapshot, ApiError> {
        Ok(WalletSnapshot {
            balance: Balance::ZERO,
        })
    }
}

pub fn link(url: &str, reference: Option<&str>) -> FundingLink {
    FundingLink {
        payment_link: url.parse().unwrap(),
        reference: reference.and_then(TxRef::new),
    }
}

/// Camera stand-in replaying a fixed list of decode events.
pub struct ScriptedCamera {
    devices: Vec<DeviceHandle>,
    events: Vec<DecodeEvent>,
    stopped: AtomicBool,
}

impl ScriptedCamera {
    pub fn new(events: Vec<DecodeEvent>) -> Self {
        Self {
            devices: vec![DeviceHandle::new("cam-0", "Back camera")],
            events,
            stopped: AtomicBool::new(false),
        }
    }

    pub fn without_devices() -> Self {
        Self {
            devices: Vec::new(),
            events: Vec::new(),
            stopped: AtomicBool::new(false),
        }
    }

    pub fn was_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl QrDecoder for ScriptedCamera {
    async fn list_devices(&self) -> Result<Vec<DeviceHandle>, String> {
        Ok(self.devices.clone())
    }

    fn decode(&self, _device: &DeviceHandle) -> BoxStream<'static, DecodeEvent> {
        stream::iter(self.events.clone()).boxed()
    }

    async fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }
}
