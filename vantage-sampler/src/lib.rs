//! vantage-sampler - bulk sampling driver for the heatmap API
//!
//! Generates candidate coordinates (random, grid, or coverage-driven
//! hierarchical hex sampling), submits them to a running vantage-api, and
//! reports the outcome mix.

pub mod client;
pub mod coords;
pub mod coverage;
pub mod stats;
