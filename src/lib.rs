//! Rust client library for the REDCap HTTP API.
//!
//! Public API layers:
//! - [`BlockingRedcapClient`]/[`RedcapClient`]: one method per REDCap operation.
//! - [`request`]: builders for the form body of each operation, with
//!   per-operation override allow-lists.
//! - [`Response`]: normalized response (URL, JSON, XML error text or raw body).
//! - [`ClientError`]: unified error type used by all clients.
//!
//! Overrides outside an operation's allow-list and malformed import payloads
//! are logged through `tracing` and never fail a call.

mod blocking_client;
mod client;
mod error;
mod operation;
mod options;
pub mod request;
mod response;

/// Blocking REDCap client.
pub use blocking_client::BlockingRedcapClient;
/// Async REDCap client.
pub use client::RedcapClient;
/// Error type returned by all client operations.
pub use error::ClientError;
pub use operation::{Operation, OperationDefinition, operations};
pub use options::ClientOptions;
pub use request::{Attachment, Diagnostic, RequestDescriptor};
pub use response::{Response, ResponseContext, normalize};
