use crate::domain::ports::QrDecoder;
use crate::domain::scan::{DecodeEvent, DeviceHandle};
use async_trait::async_trait;
use futures::StreamExt;
use futures::stream::{self, BoxStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex, PoisonError};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader, Lines};
use tokio::sync::Mutex;

pub const MANUAL_DEVICE_ID: &str = "manual";

/// Typed driver IDs, one per line, presented through the decoder interface.
///
/// Always reports exactly one device, so it is usable wherever a camera is.
/// Blank lines surface as transient errors; end of input ends the stream.
/// Each `decode()` opens a new session, so `stop()` only ends the latest one.
pub struct ManualEntryDecoder<R> {
    lines: Arc<Mutex<Lines<BufReader<R>>>>,
    stopped: StdMutex<Arc<AtomicBool>>,
}

impl<R> ManualEntryDecoder<R>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    pub fn new(source: R) -> Self {
        Self {
            lines: Arc::new(Mutex::new(BufReader::new(source).lines())),
            stopped: StdMutex::new(Arc::new(AtomicBool::new(false))),
        }
    }
}

impl ManualEntryDecoder<tokio::io::Stdin> {
    pub fn stdin() -> Self {
        Self::new(tokio::io::stdin())
    }
}

#[async_trait]
impl<R> QrDecoder for ManualEntryDecoder<R>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    async fn list_devices(&self) -> Result<Vec<DeviceHandle>, String> {
        Ok(vec![DeviceHandle::new(MANUAL_DEVICE_ID, "Manual entry")])
    }

    fn decode(&self, _device: &DeviceHandle) -> BoxStream<'static, DecodeEvent> {
        let lines = Arc::clone(&self.lines);
        let stopped = Arc::new(AtomicBool::new(false));
        *self.stopped.lock().unwrap_or_else(PoisonError::into_inner) = Arc::clone(&stopped);
        stream::unfold((lines, stopped), |(lines, stopped)| async move {
            if stopped.load(Ordering::SeqCst) {
                return None;
            }
            let next = lines.lock().await.next_line().await;
            match next {
                Ok(Some(line)) if line.trim().is_empty() => Some((
                    DecodeEvent::Transient("empty entry".to_string()),
                    (lines, stopped),
                )),
                Ok(Some(line)) => Some((DecodeEvent::Decoded(line), (lines, stopped))),
                Ok(None) | Err(_) => None,
            }
        })
        .boxed()
    }

    async fn stop(&self) {
        self.stopped
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .store(true, Ordering::SeqCst);
    }
}
