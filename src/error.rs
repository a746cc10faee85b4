//! Error types.
//!
//! Topology operations never panic. They return a [`GraphError`], log it
//! through `tracing`, and leave the graph exactly as it was.

use std::sync::Arc;

use thiserror::Error;

use crate::graph::Connection;
use crate::signal::PortKind;

/// Which side of a node a port lives on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Input,
    Output,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Input => f.write_str("input"),
            Direction::Output => f.write_str("output"),
        }
    }
}

/// A structural error from a graph operation.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("node '{0}' already exists")]
    DuplicateNode(Arc<str>),

    #[error("node '{0}' not found")]
    UnknownNode(Arc<str>),

    #[error("node '{node}' has no {direction} port named '{port}'")]
    UnknownPort {
        node: Arc<str>,
        port: Arc<str>,
        direction: Direction,
    },

    #[error("node '{0}' cannot be connected to itself; route feedback through a delay")]
    SelfConnection(Arc<str>),

    #[error("connection {0} already exists")]
    DuplicateConnection(Connection),

    #[error("connection {0} not found")]
    ConnectionNotFound(Connection),

    #[error("physical input channel {0} is not allocated")]
    UnknownChannel(usize),

    #[error("node '{node}' rejected param '{param}'")]
    ParamRejected { node: Arc<str>, param: Arc<str> },
}

/// A conversion the engine deliberately does not implement.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ConversionGap {
    pub from: PortKind,
    pub to: PortKind,
}

impl ConversionGap {
    /// Returns the gap if `from -> to` is one of the unimplemented cells.
    pub fn check(from: PortKind, to: PortKind) -> Option<Self> {
        match (from, to) {
            (PortKind::Audio, PortKind::Event)
            | (PortKind::Control, PortKind::Event)
            | (PortKind::Event, PortKind::Audio) => Some(Self { from, to }),
            _ => None,
        }
    }
}

/// Errors from opening or running an audio device.
#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("no default {0} device available")]
    NoDevice(&'static str),

    #[error("unsupported sample format {0}; only f32 streams are supported")]
    UnsupportedFormat(String),

    #[error("device control queue is full")]
    QueueFull,

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[cfg(feature = "cpal_device")]
    #[error("could not query device config: {0}")]
    Config(#[from] cpal::DefaultStreamConfigError),

    #[cfg(feature = "cpal_device")]
    #[error("could not build stream: {0}")]
    Build(#[from] cpal::BuildStreamError),

    #[cfg(feature = "cpal_device")]
    #[error("could not start stream: {0}")]
    Play(#[from] cpal::PlayStreamError),
}
