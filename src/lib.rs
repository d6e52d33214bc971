pub mod census;
pub mod config;
pub mod layer;
pub mod metrics;
pub mod output;
pub mod pipeline;
pub mod spatial;
pub mod stats;
