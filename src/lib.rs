pub mod config;
pub mod error;
pub mod events;
pub mod fetch;
pub mod filter;
pub mod loader;
pub mod model;
pub mod output;
pub mod projection;
pub mod scale;
pub mod session;
pub mod time;
pub mod traffic;
