//! xcap-backed screen capture.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::capture::{FrameSource, RgbFrame};
use crate::error::{Error, Result};

/// Screen frames grabbed from one monitor via xcap.
///
/// Monitor handles stay on a worker thread; `grab_frame` sends a request
/// and awaits the captured frame, so the engine task never blocks on the
/// platform capture call.
pub struct XcapFrameSource {
    request_tx: std::sync::mpsc::Sender<()>,
    frame_rx: mpsc::UnboundedReceiver<Result<RgbFrame>>,
}

impl XcapFrameSource {
    /// Opens a grabber for the monitor at `monitor_index`. Out-of-range
    /// indices fall back to the first monitor; an empty monitor list is a
    /// configuration error.
    pub fn open(monitor_index: usize) -> Result<Self> {
        let (ready_tx, ready_rx) = std::sync::mpsc::channel::<Result<()>>();
        let (request_tx, request_rx) = std::sync::mpsc::channel::<()>();
        let (frame_tx, frame_rx) = mpsc::unbounded_channel();

        std::thread::Builder::new()
            .name("screen-capture".to_string())
            .spawn(move || capture_worker(monitor_index, ready_tx, request_rx, frame_tx))
            .map_err(|e| Error::NoCaptureBackend(format!("failed to spawn capture thread: {e}")))?;

        ready_rx
            .recv()
            .map_err(|_| Error::NoCaptureBackend("capture thread died during setup".to_string()))??;

        Ok(Self {
            request_tx,
            frame_rx,
        })
    }
}

#[async_trait]
impl FrameSource for XcapFrameSource {
    async fn grab_frame(&mut self) -> Result<RgbFrame> {
        self.request_tx
            .send(())
            .map_err(|_| Error::CaptureRead("screen capture thread exited".to_string()))?;

        self.frame_rx
            .recv()
            .await
            .ok_or_else(|| Error::CaptureRead("screen capture thread exited".to_string()))?
    }
}

/// Worker owning the xcap monitor handle. Exits when the request channel
/// disconnects, i.e. when the `XcapFrameSource` is dropped.
fn capture_worker(
    monitor_index: usize,
    ready_tx: std::sync::mpsc::Sender<Result<()>>,
    request_rx: std::sync::mpsc::Receiver<()>,
    frame_tx: mpsc::UnboundedSender<Result<RgbFrame>>,
) {
    let monitors = match xcap::Monitor::all() {
        Ok(monitors) if !monitors.is_empty() => monitors,
        Ok(_) => {
            let _ = ready_tx.send(Err(Error::NoCaptureBackend(
                "no monitors available".to_string(),
            )));
            return;
        }
        Err(e) => {
            let _ = ready_tx.send(Err(Error::NoCaptureBackend(e.to_string())));
            return;
        }
    };

    let index = if monitor_index < monitors.len() {
        monitor_index
    } else {
        tracing::warn!(
            "Monitor index {} out of range ({} available), using monitor 0",
            monitor_index,
            monitors.len()
        );
        0
    };
    let monitor = &monitors[index];

    let _ = ready_tx.send(Ok(()));

    while request_rx.recv().is_ok() {
        let frame = monitor
            .capture_image()
            .map(|image| {
                let (width, height) = (image.width(), image.height());
                RgbFrame::from_rgba(width, height, image.into_raw())
            })
            .map_err(|e| Error::CaptureRead(e.to_string()));

        if frame_tx.send(frame).is_err() {
            break;
        }
    }
}
