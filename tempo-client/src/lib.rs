//! Tempo client library exports.

pub mod config;
pub mod error;
pub mod nav;
pub mod persistence;
pub mod registry;
pub mod session;
pub mod store;
pub mod telemetry;
pub mod transport;

pub use registry::Stores;
pub use session::{LoginOutcome, SessionState, SessionStore};
pub use store::StoreError;
pub use transport::{CredentialSlot, HttpTransport};
