mod config;
mod metrics;

pub use config::{ConfigError, SamplerConfig, DEFAULT_WARM_UP_SECS, WARM_UP_ENV, WINDOW_ENV};
pub use metrics::*;
