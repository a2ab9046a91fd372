//! Response fingerprinting and cache directives.

mod etag;
mod stage;

pub use etag::{any_tag_match, body_fingerprint};
pub use stage::{CacheControlStage, EtagStage, NO_CACHE_DIRECTIVES};
