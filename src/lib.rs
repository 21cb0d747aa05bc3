pub mod bands;
pub mod clock;
pub mod collab;
pub mod color;
pub mod config;
pub mod fake_feed;
pub mod format;
pub mod identity;
pub mod metrics;
pub mod pipeline;
pub mod state;
pub mod stats_cache;
pub mod throttle;
pub mod width;
