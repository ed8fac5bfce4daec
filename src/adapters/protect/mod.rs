//! Session-authenticated HTTPS video API (cookie login + video export).

mod session;

pub use session::{ProtectConnector, ProtectSession, ProtectSettings};
