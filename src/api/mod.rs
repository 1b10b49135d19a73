pub mod feed_client;
pub mod server;
pub mod usgs;
