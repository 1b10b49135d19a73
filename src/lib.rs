pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod utils;

// Re-export commonly used items
pub use config::Config;
pub use models::event::Event;
pub use services::dashboard::Dashboard;
pub use services::feed_cache::FeedCache;
