//! Plain data types shared across the delivery pipeline.

mod link;
mod sample;

pub use link::{LinkEvent, LinkState};
pub use sample::{Sample, SampleKind};
