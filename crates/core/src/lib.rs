//! Core types, errors and start-position rules for the log harvester.

pub mod clock;
pub mod error;
pub mod events;
pub mod position;

pub use clock::*;
pub use error::{ConfigErrorCode, Error, Result};
pub use events::*;
pub use position::*;
