//! Trip-duration model and departure planner for Austin rideshare trips.
//!
//! Historical trips are turned into zone/time/group/distance features, a seeded
//! random forest learns trip duration from them, and [`TravelTimePredictor`]
//! answers "when should I leave to arrive by HH:MM".

pub mod analytics;
pub mod config;
pub mod dataset;
pub mod error;
pub mod features;
pub mod forest;
pub mod model;
pub mod service;
pub mod types;
pub mod zone;

pub use error::{PredictorError, Result};
pub use forest::ForestParams;
pub use model::{TrainedModel, TravelTimePredictor};
pub use types::{DeparturePlan, TripRecord};
pub use zone::Zone;
