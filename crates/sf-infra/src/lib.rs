pub mod config;
pub mod http;
pub mod time;

pub use config::load_config;
pub use http::HttpMarketplaceApi;
pub use time::TokioCountdown;
