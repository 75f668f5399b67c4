//! Daemon module: long-running GraphQL server.
//!
//! The server owns the store driver for its whole lifetime and answers
//! requests over TCP. Each connection carries one JSON request line and
//! receives one JSON response line.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │           holonet serve                 │
//! │  - store driver (pooled)                │
//! │  - GraphQL schema                       │
//! │  - TCP listener                         │
//! └─────────────────────────────────────────┘
//!           ▲
//!           │ 127.0.0.1:4000
//!           ▼
//! ┌─────────────────────────────────────────┐
//! │           holonet CLI                   │
//! │  - sends JSON requests                  │
//! │  - receives JSON responses              │
//! └─────────────────────────────────────────┘
//! ```

pub mod protocol;
pub mod server;

pub use protocol::{Request, Response};
pub use server::{send_request, serve, start_server};
