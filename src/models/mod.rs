pub mod cache;
pub mod event;
pub mod filter;
pub mod marker;
