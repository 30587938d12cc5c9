//! Builds podcast feeds for Ximalaya albums.
//!
//! [`pipeline::AlbumFeedBuilder`] fetches album metadata and track listings,
//! enriches tracks with descriptions and (given a listener credential) paid
//! play URLs, and assembles a [`feed::Feed`] that [`feed::render_rss`]
//! serializes. Remote results are memoized in a shared [`cache::FeedCache`].

pub mod cache;
pub mod config;
pub mod feed;
pub mod pipeline;
pub mod platform;
pub mod util;
