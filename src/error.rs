//! Error taxonomy shared by the query and codec layers.
//!
//! Fatal kinds propagate unchanged to main, which maps them to exit
//! statuses. Tolerated failures (EDID property walks, atom name lookups)
//! never surface here; they are absorbed at the call site with an empty
//! value.

use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Transport or display-name failure; no session exists afterwards.
    #[error("cannot open display: {0}")]
    Connect(#[from] x11rb::errors::ConnectError),

    /// A required protocol round-trip failed, aborting the query.
    #[error("display server request failed: {0}")]
    Protocol(#[from] x11rb::errors::ReplyError),

    /// A profile that drives no outputs cannot be serialized.
    #[error("profile has no outputs")]
    EmptyProfile,

    /// Malformed profile document; the source error carries line and column.
    #[error("invalid profile: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// No stored profile with the requested name.
    #[error("{0}: no such profile")]
    NotFound(String),

    #[error(transparent)]
    Io(#[from] io::Error),
}

// A failed send aborts the call the same way a failed reply does.
impl From<x11rb::errors::ConnectionError> for Error {
    fn from(err: x11rb::errors::ConnectionError) -> Self {
        Error::Protocol(err.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
