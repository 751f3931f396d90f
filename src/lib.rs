//! Huji - HTTP/1.x server core
//!
//! Request framing, parsing, routing and response writing built directly on a
//! byte stream.

pub mod config;
pub mod http;
pub mod router;
pub mod server;
