//! Bounded wait for a set of elements to exist on a destination page.
//!
//! The destination markup may not exist yet when the relay arrives (chat
//! front-ends render their composer asynchronously), so every DOM action is
//! gated on a poll that re-checks the wanted selectors at a fixed interval
//! and gives up after a bounded number of attempts or a wall-clock budget,
//! whichever trips first. Both exits fall out of the loop itself, so there
//! is nothing left ticking on either path.

pub mod errors;
pub mod model;
pub mod ports;
pub mod watcher;

pub use errors::GateError;
pub use model::{GatePass, GateSpec};
pub use ports::ProbePort;
pub use watcher::await_elements;
