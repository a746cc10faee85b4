//! cpal output (and optional input) streams driving a [`DeviceBridge`].

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{BufferSize, SampleFormat, SampleRate, Stream, StreamConfig};
use rtrb::{Consumer, Producer, RingBuffer};
use tracing::{error, info, warn};

use crate::config::DeviceConfig;
use crate::engine::Engine;
use crate::error::{DeviceError, GraphError};

use super::DeviceBridge;

/// Output routing edits travel to the callback over this many slots.
const ROUTE_QUEUE: usize = 64;

/// Capture ring length, in device periods.
const CAPTURE_PERIODS: usize = 8;

enum RouteChange {
    Map {
        channel: usize,
        node: Arc<str>,
        output: usize,
    },
    Unmap(usize),
}

/// Stop handshake between the control thread and the output callback.
#[derive(Default)]
struct FadeState {
    requested: AtomicBool,
    /// Ramp length in ms, as `f32` bits
    duration: AtomicU32,
    finished: AtomicBool,
}

/// The system default audio device running an [`Engine`].
///
/// The output stream owns a [`DeviceBridge`]; everything the control thread
/// changes afterwards (channel routing, stopping) reaches the callback
/// through lock-free queues and atomics.
///
/// ```no_run
/// use std::sync::Arc;
/// use patchbay::{DeviceConfig, Engine};
/// use patchbay::device::AudioDevice;
/// use patchbay::nodes::Sine;
///
/// let engine = Arc::new(Engine::new());
/// engine.create_node("osc", Sine::new(220.0).with_amplitude(0.2)).unwrap();
///
/// let config = AudioDevice::default_config().unwrap().with_fade_out_ms(200.0);
/// let mut device = AudioDevice::open(engine, config).unwrap();
/// device.map_output_channel(0, "osc", 0).unwrap();
/// device.map_output_channel(1, "osc", 0).unwrap();
///
/// std::thread::sleep(std::time::Duration::from_secs(1));
/// device.stop(None);
/// ```
pub struct AudioDevice {
    engine: Arc<Engine>,
    config: DeviceConfig,
    name: String,
    output: Stream,
    input: Option<Stream>,
    routes: Producer<RouteChange>,
    fade: Arc<FadeState>,
}

impl AudioDevice {
    /// Sample rate and channel count of the default output device.
    pub fn default_config() -> Result<DeviceConfig, DeviceError> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or(DeviceError::NoDevice("output"))?;
        let supported = device.default_output_config()?;

        Ok(DeviceConfig::default()
            .with_sample_rate(supported.sample_rate().0)
            .with_output_channels(supported.channels() as usize))
    }

    /// Open the default output device (and the default input device when
    /// `config.input_channels > 0`), prepare `engine` and start rendering.
    pub fn open(engine: Arc<Engine>, config: DeviceConfig) -> Result<Self, DeviceError> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or(DeviceError::NoDevice("output"))?;
        let format = device.default_output_config()?.sample_format();
        if format != SampleFormat::F32 {
            return Err(DeviceError::UnsupportedFormat(format!("{format:?}")));
        }
        let name = device.name().unwrap_or_else(|_| "Unknown".into());

        let mut bridge = DeviceBridge::new(Arc::clone(&engine), &config);
        let (routes, mut route_rx) = RingBuffer::<RouteChange>::new(ROUTE_QUEUE);
        let fade = Arc::new(FadeState::default());

        let in_channels = config.input_channels;
        let capture_len = config.block_size * in_channels * CAPTURE_PERIODS;
        let (input, mut capture_rx) = if in_channels > 0 {
            let (capture_tx, capture_rx) = RingBuffer::<f32>::new(capture_len);
            (Some(open_input(&host, &config, capture_tx)?), Some(capture_rx))
        } else {
            (None, None)
        };
        let mut captured = vec![0.0f32; capture_len];

        let stream_config = StreamConfig {
            channels: config.output_channels as u16,
            sample_rate: SampleRate(config.sample_rate),
            buffer_size: BufferSize::Default,
        };
        let out_channels = config.output_channels.max(1);
        let callback_fade = Arc::clone(&fade);

        let output = device.build_output_stream(
            &stream_config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                while let Ok(change) = route_rx.pop() {
                    // Channels were checked on the control side.
                    let _ = match change {
                        RouteChange::Map { channel, node, output } => bridge.map_shared(channel, node, output),
                        RouteChange::Unmap(channel) => bridge.unmap_output_channel(channel),
                    };
                }
                if callback_fade.requested.swap(false, Ordering::AcqRel) {
                    let duration = f32::from_bits(callback_fade.duration.load(Ordering::Acquire));
                    bridge.start_fade_out(Some(duration));
                }

                let wanted = (data.len() / out_channels * in_channels).min(captured.len());
                let input = &mut captured[..wanted];
                match capture_rx.as_mut() {
                    Some(rx) => fill_from(rx, input),
                    None => input.fill(0.0),
                }

                bridge.render(input, data);

                if bridge.fade_finished() {
                    callback_fade.finished.store(true, Ordering::Release);
                }
            },
            |err| error!("output stream error: {err}"),
            None,
        )?;
        output.play()?;
        if let Some(input) = &input {
            input.play()?;
        }

        info!(
            "opened {} at {} Hz, {} out / {} in",
            name, config.sample_rate, config.output_channels, config.input_channels
        );

        Ok(Self {
            engine,
            config,
            name,
            output,
            input,
            routes,
            fade,
        })
    }

    pub fn engine(&self) -> &Arc<Engine> {
        &self.engine
    }

    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Send Audio output `output` of `node` to device channel `channel`.
    ///
    /// Takes effect at the start of the next device callback.
    pub fn map_output_channel(&mut self, channel: usize, node: &str, output: usize) -> Result<(), DeviceError> {
        self.check_channel(channel)?;
        self.send(RouteChange::Map {
            channel,
            node: Arc::from(node),
            output,
        })
    }

    pub fn unmap_output_channel(&mut self, channel: usize) -> Result<(), DeviceError> {
        self.check_channel(channel)?;
        self.send(RouteChange::Unmap(channel))
    }

    /// Default ramp length used by [`stop`](Self::stop).
    pub fn set_fade_out_duration(&mut self, duration_ms: f32) {
        self.config.fade_out_ms = duration_ms.max(0.0);
    }

    /// Ramp every output to silence over `fade_ms` (or the configured
    /// default), block until the ramp is done, then close the streams.
    pub fn stop(self, fade_ms: Option<f32>) {
        let duration = fade_ms.unwrap_or(self.config.fade_out_ms).max(0.0);
        self.fade.duration.store(duration.to_bits(), Ordering::Release);
        self.fade.requested.store(true, Ordering::Release);

        // The callback needs a period or two to pick the request up.
        let deadline = Instant::now()
            + Duration::from_secs_f32(duration / 1000.0)
            + Duration::from_secs_f64(self.config.block_period() * 4.0)
            + Duration::from_millis(50);
        while !self.fade.finished.load(Ordering::Acquire) {
            if Instant::now() >= deadline {
                warn!("fade-out did not finish before the deadline; closing {}", self.name);
                break;
            }
            thread::sleep(Duration::from_millis(1));
        }

        drop(self.input);
        drop(self.output);
        info!("closed {}", self.name);
    }

    fn check_channel(&self, channel: usize) -> Result<(), DeviceError> {
        if channel < self.config.output_channels {
            Ok(())
        } else {
            Err(GraphError::UnknownChannel(channel).into())
        }
    }

    fn send(&mut self, change: RouteChange) -> Result<(), DeviceError> {
        self.routes.push(change).map_err(|_| DeviceError::QueueFull)
    }
}

fn open_input(host: &cpal::Host, config: &DeviceConfig, mut capture: Producer<f32>) -> Result<Stream, DeviceError> {
    let device = host
        .default_input_device()
        .ok_or(DeviceError::NoDevice("input"))?;
    let format = device.default_input_config()?.sample_format();
    if format != SampleFormat::F32 {
        return Err(DeviceError::UnsupportedFormat(format!("{format:?}")));
    }

    let stream_config = StreamConfig {
        channels: config.input_channels as u16,
        sample_rate: SampleRate(config.sample_rate),
        buffer_size: BufferSize::Default,
    };
    let stream = device.build_input_stream(
        &stream_config,
        move |data: &[f32], _: &cpal::InputCallbackInfo| {
            for &sample in data {
                // Overruns drop the newest capture.
                if capture.push(sample).is_err() {
                    break;
                }
            }
        },
        |err| error!("input stream error: {err}"),
        None,
    )?;
    Ok(stream)
}

/// Pop captured samples into `dest`; whatever the ring cannot supply is silence.
fn fill_from(capture: &mut Consumer<f32>, dest: &mut [f32]) {
    for sample in dest {
        *sample = capture.pop().unwrap_or(0.0);
    }
}
