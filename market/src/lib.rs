pub mod error;
pub mod feed;
pub mod ingester;
pub mod registry;
pub mod scorer;
pub mod tick_buffer;
pub mod types;

pub use error::{FeedError, IngestError};
pub use types::{FeedEvent, Instrument, Tick};
