//! Error re-exports
//!
//! The error type lives in `uf-error` so the protocol crate and the binary
//! share it; core code imports it from here.

pub use uf_error::{Result, Status, UfError};
