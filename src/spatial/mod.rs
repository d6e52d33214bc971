//! Spatial aggregation of auxiliary feature layers onto ZCTA polygons.

pub mod aggregate;
pub mod features;
pub mod projection;

pub use aggregate::{Zone, count_intersecting, distance_to_nearest, zones_from_layer};
pub use features::FeatureLayer;
pub use projection::LambertConformal;
