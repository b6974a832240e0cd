//! HTTP API handlers for vantage-api

pub mod cells;
pub mod health;
pub mod points;
pub mod stats;

pub use cells::cell_routes;
pub use health::health_routes;
pub use points::point_routes;
pub use stats::stats_routes;
