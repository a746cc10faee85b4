//! Built-in nodes.
//!
//! Nodes are organized into two categories:
//!
//! ## Sources ([`source`])
//!
//! Produce signal with no audio inputs:
//! - [`Sine`] - Sine oscillator with frequency/amplitude control inputs
//! - [`AudioInput`] - One channel of the capture device
//! - [`Slider`] - A control value set from outside, linear or logarithmic
//!
//! ## Effects ([`effect`])
//!
//! Process audio (inputs → outputs):
//! - [`Gain`] - Volume control, ramped per block
//! - [`Mixer`] - Sum N inputs with per-channel gain and pan
//! - [`Pan`] - Mono to stereo, constant power
//! - [`Threshold`] - Emit `trigger` events on rising edges
//! - [`BlockDelay`] - One block of delay; makes feedback loops legal
//!
//! Every node takes a `with_fade_in_ms` builder and exposes its settings as
//! params, so [`Graph::set_param`](crate::Graph::set_param) and the engine's
//! param queue can reach them by name.

pub mod effect;
pub mod source;

pub use effect::{BlockDelay, Gain, Mixer, Pan, Threshold};
pub use source::{AudioInput, Sine, Slider, SliderScale};
