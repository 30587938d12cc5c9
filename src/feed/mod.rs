//! Feed output: what a caller asks for, what they get back, and how it is serialized.
//!
//! - [`request`] - album id plus listing/show-note flags, parsed from route-style parameters
//! - [`model`] - the normalized feed object handed to publishers
//! - [`rss`] - RSS 2.0 + iTunes rendering via `quick-xml`

mod model;
mod request;
mod rss;

pub use model::{Enclosure, Feed, FeedItem};
pub use request::FeedRequest;
pub use rss::{format_pub_date, render_rss};
