//! cpal-backed audio capture.

use std::time::Duration;

use async_trait::async_trait;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use tokio::sync::mpsc;

use crate::capture::AudioSource;
use crate::error::{Error, Result};

/// Mono audio frames captured from a cpal input stream.
///
/// `cpal::Stream` is not `Send`, so the stream lives on a dedicated thread
/// that parks until this source is dropped. The data callback mixes
/// interleaved channels down to mono and forwards chunks over an unbounded
/// channel; `read_frame` reassembles them into fixed-size frames.
pub struct CpalAudioSource {
    sample_rate: u32,
    chunk_rx: mpsc::UnboundedReceiver<Vec<f32>>,
    buffer: Vec<f32>,
    // Dropping this disconnects the capture thread's park channel,
    // which drops the stream and exits the thread.
    _shutdown: std::sync::mpsc::Sender<()>,
}

impl CpalAudioSource {
    /// Opens an input stream on the device at `device_index`, or the host
    /// default input device when `None`. Fails fast when no usable input
    /// device exists.
    pub fn open(device_index: Option<usize>) -> Result<Self> {
        let (ready_tx, ready_rx) = std::sync::mpsc::channel::<Result<u32>>();
        let (shutdown_tx, shutdown_rx) = std::sync::mpsc::channel::<()>();
        let (chunk_tx, chunk_rx) = mpsc::unbounded_channel();

        std::thread::Builder::new()
            .name("audio-capture".to_string())
            .spawn(move || match build_stream(device_index, chunk_tx) {
                Ok((stream, sample_rate)) => {
                    let _ = ready_tx.send(Ok(sample_rate));
                    // Park until the source is dropped.
                    let _ = shutdown_rx.recv();
                    drop(stream);
                }
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                }
            })
            .map_err(|e| Error::NoCaptureBackend(format!("failed to spawn capture thread: {e}")))?;

        let sample_rate = ready_rx
            .recv()
            .map_err(|_| Error::NoCaptureBackend("capture thread died during setup".to_string()))??;

        Ok(Self {
            sample_rate,
            chunk_rx,
            buffer: Vec::new(),
            _shutdown: shutdown_tx,
        })
    }
}

#[async_trait]
impl AudioSource for CpalAudioSource {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    async fn read_frame(&mut self, frame_size: usize) -> Result<Vec<f32>> {
        while self.buffer.len() < frame_size {
            let chunk = tokio::time::timeout(Duration::from_secs(1), self.chunk_rx.recv())
                .await
                .map_err(|_| Error::CaptureRead("timed out waiting for audio data".to_string()))?
                .ok_or_else(|| Error::CaptureRead("audio stream closed".to_string()))?;
            self.buffer.extend_from_slice(&chunk);
        }

        Ok(self.buffer.drain(..frame_size).collect())
    }
}

/// Builds and starts the input stream. Runs on the capture thread because
/// the returned stream must stay there.
fn build_stream(
    device_index: Option<usize>,
    chunk_tx: mpsc::UnboundedSender<Vec<f32>>,
) -> Result<(cpal::Stream, u32)> {
    let host = cpal::default_host();

    let device = match device_index {
        Some(index) => host
            .input_devices()
            .map_err(|e| Error::NoCaptureBackend(e.to_string()))?
            .nth(index)
            .ok_or_else(|| {
                Error::NoCaptureBackend(format!("no input device at index {index}"))
            })?,
        None => host
            .default_input_device()
            .ok_or_else(|| Error::NoCaptureBackend("no default input device".to_string()))?,
    };

    let supported = device
        .default_input_config()
        .map_err(|e| Error::NoCaptureBackend(e.to_string()))?;
    let sample_rate = supported.sample_rate().0;
    let channels = supported.channels() as usize;
    let config: cpal::StreamConfig = supported.config();

    tracing::info!(
        "Capturing audio from '{}' at {} Hz, {} channel(s)",
        device.name().unwrap_or_else(|_| "<unknown>".to_string()),
        sample_rate,
        channels
    );

    let err_fn = |e: cpal::StreamError| tracing::warn!("Audio stream error: {}", e);

    let stream = match supported.sample_format() {
        cpal::SampleFormat::F32 => device
            .build_input_stream(
                &config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    let _ = chunk_tx.send(mix_to_mono(data, channels));
                },
                err_fn,
                None,
            )
            .map_err(|e| Error::NoCaptureBackend(e.to_string()))?,
        cpal::SampleFormat::I16 => device
            .build_input_stream(
                &config,
                move |data: &[i16], _: &cpal::InputCallbackInfo| {
                    let floats: Vec<f32> =
                        data.iter().map(|&s| s as f32 / i16::MAX as f32).collect();
                    let _ = chunk_tx.send(mix_to_mono(&floats, channels));
                },
                err_fn,
                None,
            )
            .map_err(|e| Error::NoCaptureBackend(e.to_string()))?,
        cpal::SampleFormat::U16 => device
            .build_input_stream(
                &config,
                move |data: &[u16], _: &cpal::InputCallbackInfo| {
                    let floats: Vec<f32> = data
                        .iter()
                        .map(|&s| (s as f32 / u16::MAX as f32) * 2.0 - 1.0)
                        .collect();
                    let _ = chunk_tx.send(mix_to_mono(&floats, channels));
                },
                err_fn,
                None,
            )
            .map_err(|e| Error::NoCaptureBackend(e.to_string()))?,
        other => {
            return Err(Error::NoCaptureBackend(format!(
                "unsupported sample format {other:?}"
            )))
        }
    };

    stream
        .play()
        .map_err(|e| Error::NoCaptureBackend(e.to_string()))?;

    Ok((stream, sample_rate))
}

/// Averages interleaved channels down to a mono signal.
fn mix_to_mono(samples: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return samples.to_vec();
    }
    samples
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}
