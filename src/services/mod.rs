pub mod dashboard;
pub mod feed_cache;
pub mod filter;
pub mod marker_renderer;
pub mod normalizer;
