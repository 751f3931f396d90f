//! HTTP/1.0 and HTTP/1.1 protocol implementation.
//!
//! # Architecture
//!
//! - **`reader`**: Byte-stream framer turning chunks into complete request texts
//! - **`parser`**: Request-line and header-line grammar, head/body split
//! - **`request`**: Structured request with query, cookies, body parameters and close decision
//! - **`response`**: Response model handed to handlers
//! - **`writer`**: Response serialization and the per-connection output queue
//! - **`connection`**: The per-connection read/dispatch/write state machine
//! - **`status`**, **`mime`**, **`error`**: Fixed tables and error types
//!
//! # Connection State Machine
//!
//! ```text
//!        ┌─────────────┐
//!        │   Reading   │ ← Wait for bytes (idle timeout → TimedOut)
//!        └──────┬──────┘
//!               │ Frames completed
//!               ▼
//!        ┌──────────────────┐
//!        │   Processing     │ ← Route each frame, responses are queued
//!        └──────┬───────────┘
//!               │
//!               ▼
//!        ┌──────────────────┐
//!        │    Writing       │ ← Flush queued responses and files
//!        └──────┬───────────┘
//!               ├─ Still open → Reading
//!               └─ Close queued → Closed
//! ```

pub mod connection;
pub mod error;
pub mod mime;
pub mod parser;
pub mod reader;
pub mod request;
pub mod response;
pub mod status;
pub mod writer;
