//! Host-facing error type.
//!
//! The virtual machine itself never fails: stack misuse, out-of-range
//! addresses and unregistered ports all wrap or fall back to plain storage.
//! Errors only arise at the edges where the host touches the outside world
//! (ROM files, header stamping, screenshots, windows).

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid ROM header: {0}")]
    InvalidHeader(String),
    #[error("frame buffer holds {got} pixels, expected {expected}")]
    FrameSize { got: usize, expected: usize },
    #[cfg(feature = "screenshot")]
    #[error("screenshot error: {0}")]
    Image(#[from] image::ImageError),
    #[cfg(feature = "display")]
    #[error("display error: {0}")]
    Display(String),
}
