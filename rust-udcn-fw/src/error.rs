//! Error types for the forwarding core.

use thiserror::Error;

/// All possible errors that can occur within the forwarding core.
#[derive(Error, Debug)]
pub enum Error {
    /// FIB lookup or mutation failure.
    #[error("FIB error: {0}")]
    Fib(String),

    /// PIT lookup or mutation failure.
    #[error("PIT error: {0}")]
    Pit(String),

    /// Strategy construction or invocation failure. Surfaced to management
    /// as invalid-argument; the previously bound strategy is left in place.
    #[error("strategy error: {0}")]
    Strategy(String),

    /// Face lookup or I/O failure.
    #[error("face error: {0}")]
    Face(String),

    /// Wraps a packet-level error from `rust_udcn_common`.
    #[error(transparent)]
    Common(#[from] rust_udcn_common::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
