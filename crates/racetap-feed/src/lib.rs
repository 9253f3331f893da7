pub mod broadcast;
pub mod error;
pub mod processor;
pub mod rate;
pub mod recording;
pub mod serial;
pub mod source;

pub use error::FeedError;
pub use source::OutputSource;
