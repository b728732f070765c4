//! The coordinator between an incoming command and the destination tab.
//!
//! One accepted command means exactly one tab opened at the service's base
//! URL and exactly one injection attempt once that tab reports
//! load-complete. Commands are independent: each runs as its own task with
//! its own correlation id, so back-to-back commands produce two tabs with
//! two injection sequences and nothing shared between them.

pub mod coordinator;
pub mod model;
pub mod ports;

pub use coordinator::Relay;
pub use model::{Command, RelayRequest, RelayResponse};
pub use ports::{InjectPort, TabPort};
