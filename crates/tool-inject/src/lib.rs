//! Writes a text payload into a destination page's input field and submits
//! it, preferring a synthetic Enter keypress and falling back to clicking
//! the send control when the page ignores the keypress. Chat front-ends
//! disagree on which of the two they listen for; the keypress goes first and
//! the click only fires when the page left the keypress unhandled, so a
//! command never submits twice.

pub mod api;
pub mod errors;
pub mod events;
pub mod model;
pub mod policy;
pub mod ports;
pub mod runner;

pub use api::{InjectTool, InjectToolBuilder};
pub use errors::InjectError;
pub use model::{ExecCtx, InjectParams, InjectPhase, InjectReport, SubmitPath};
pub use policy::InjectPolicyView;
pub use ports::{EventsPort, PagePort};
