// core/src/lib.rs
//! Client for the privileged multiboot daemon.
//!
//! [`Connection::connect`] opens the daemon socket and runs the handshake;
//! the returned connection exposes one method per daemon operation. Calls
//! block, are serialized per connection and must not run on the thread
//! registered with [`foreground::mark_current_thread`].

pub mod client;
pub mod config;
pub mod connection;
pub mod error;
pub mod exec;
pub mod foreground;
pub mod rpc;
pub mod utils;
pub mod version;

#[cfg(test)]
pub(crate) mod test_support;

pub use client::{PackageCounts, WipeResult};
pub use config::{ClientConfig, ConnectionConfig, SocketAddress};
pub use connection::{Connection, DaemonReplacer, HandshakeState, InFlight};
pub use error::{Error, FailureReason, OperationError, ProtocolFailure, Result, TransportError};
pub use exec::ExecCompletion;
pub use version::Version;
