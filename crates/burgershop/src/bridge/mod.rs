//! Wire layer between customers and the shop.
//!
//! - **protocol**: request/response message types and session ids
//! - **codec**: newline-delimited JSON framing for AsyncRead/AsyncWrite

pub mod codec;
pub mod protocol;
