//! Transport layer for the shop.
//!
//! Currently provides a TCP transport speaking newline-delimited JSON.

pub mod tcp;

pub use tcp::{run, serve, shutdown_signal};
