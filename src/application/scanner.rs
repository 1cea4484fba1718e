use crate::domain::ports::QrDecoder;
use crate::domain::scan::DecodeEvent;
use futures::StreamExt;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    Decoded(String),
    /// No device, device failure, or the stream ended without a code.
    Unavailable(String),
}

/// Reads the first non-empty code from the first available device, then
/// stops the decoder. Transient decode errors are skipped.
pub async fn scan_first_code(decoder: &dyn QrDecoder) -> ScanOutcome {
    let devices = match decoder.list_devices().await {
        Ok(devices) => devices,
        Err(reason) => {
            warn!(%reason, "unable to access camera");
            return ScanOutcome::Unavailable(reason);
        }
    };
    let Some(device) = devices.first() else {
        return ScanOutcome::Unavailable("No camera found on this device".to_string());
    };

    info!(device = %device.label, "scanning for driver QR code");
    let mut events = decoder.decode(device);
    while let Some(event) = events.next().await {
        match event {
            DecodeEvent::Decoded(text) if !text.trim().is_empty() => {
                decoder.stop().await;
                return ScanOutcome::Decoded(text);
            }
            DecodeEvent::Decoded(_) => debug!("ignoring blank decode"),
            DecodeEvent::Transient(reason) => debug!(%reason, "transient decode error"),
        }
    }
    decoder.stop().await;
    ScanOutcome::Unavailable("Scanner stopped before a code was read".to_string())
}

/// Tries the camera first and falls back to manual entry.
pub async fn scan_with_fallback(camera: &dyn QrDecoder, manual: &dyn QrDecoder) -> ScanOutcome {
    match scan_first_code(camera).await {
        ScanOutcome::Decoded(code) => ScanOutcome::Decoded(code),
        ScanOutcome::Unavailable(reason) => {
            info!(%reason, "falling back to manual entry");
            scan_first_code(manual).await
        }
    }
}
