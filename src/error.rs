//! Central error taxonomy shared across the crate.
//!
//! Mirrors the recovery policy each variant implies: `Transport` and `Data`
//! errors are expected and handled by the caller (retry the tick, drop the
//! record); `Consistency` and `Config` are fatal.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ErrorKind {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("malformed data: {0}")]
    Data(String),

    #[error("stale data: {0}")]
    Staleness(String),

    #[error("capacity exceeded: {0}")]
    Capacity(String),

    #[error("invariant violated: {0}")]
    Consistency(String),

    #[error("configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, ErrorKind>;
