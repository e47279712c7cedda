pub mod accumulator;
pub mod types;

pub use accumulator::{StreamingAccumulator, StreamingMessage};
pub use types::StreamChunk;
