//! Event processing pipeline
//!
//! Composes the publisher (persistence, fan-out, device updates, alarm and
//! automation hand-off) with the thumbnail coordinator. The process entry
//! point owns one of everything and injects the handles here.

mod publisher;
mod thumbnail;

pub use publisher::{EventPublisher, IngestReceipt, PublishError, PublishResult};
pub use thumbnail::{is_thumbnail_eligible, ThumbnailCoordinator};
