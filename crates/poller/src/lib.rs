//! Offset-tracked polling of remote log groups.
//!
//! Pipeline per cycle:
//! - Resolve the group set (names verbatim, or prefixes expanded remotely)
//! - Order groups so the least recently serviced go first
//! - Drain each group page by page, emitting decoded records downstream
//! - Checkpoint read offsets to a local file

pub mod config;
pub mod cycle;
pub mod decoder;
pub mod driver;
pub mod emitter;
pub mod group;
pub mod offsets;
pub mod resolver;
pub mod scheduler;
pub mod sink;

pub use config::*;
pub use cycle::*;
pub use decoder::{decoder_for, Decoder, JsonDecoder, PlainDecoder};
pub use driver::{PollLoop, PollState};
pub use emitter::EventEmitter;
pub use group::{lookback_offset, GroupPoller};
pub use offsets::*;
pub use resolver::GroupResolver;
pub use scheduler::{order, PriorityList};
pub use sink::{ChannelSink, RecordSink};
