//! Crate error type for the fallible edges: loading files and opening sockets.
//!
//! Playback itself never fails; bad references play as silence.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid yaml: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("failed to encode OSC packet: {0}")]
    OscEncode(#[from] rosc::OscError),

    #[error("cannot resolve synth address {0}")]
    Address(String),
}

pub type Result<T> = std::result::Result<T, Error>;
