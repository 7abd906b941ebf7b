//! Feed retrieval and normalization.
//!
//! - [`fetcher`] - timeout-bounded, size-capped HTTP retrieval
//! - [`parser`] - RSS/Atom normalization via `feed-rs`, including the
//!   mandatory root-update-time fallback
//! - [`url_check`] - pre-fetch URL validation for the subscribe path

mod fetcher;
mod parser;
mod url_check;

pub use fetcher::{FetchError, Fetcher, USER_AGENT};
pub use parser::{parse_document, FeedItem, FetchedFeed};
pub use url_check::{check_feed_url, UrlCheckError};
