use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::zone::Zone;

/// One historical trip. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripRecord {
    pub trip_id: u64,
    pub booking_user_id: u64,
    pub pickup_lat: f64,
    pub pickup_lon: f64,
    pub dropoff_lat: f64,
    pub dropoff_lon: f64,
    pub pickup_address: String,
    pub dropoff_address: String,
    pub pickup_time: NaiveDateTime,
    pub passengers: u32,
}

impl TripRecord {
    pub fn pickup_zone(&self) -> Zone {
        Zone::resolve(&self.pickup_address, self.pickup_lat, self.pickup_lon)
    }

    pub fn dropoff_zone(&self) -> Zone {
        Zone::resolve(&self.dropoff_address, self.dropoff_lat, self.dropoff_lon)
    }

    pub fn hour(&self) -> u32 {
        self.pickup_time.hour()
    }
}

/// Answer to "when should I leave". Ephemeral, one per query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeparturePlan {
    pub departure: NaiveTime,
    /// Departure wrapped past midnight onto the day before the arrival.
    pub previous_day: bool,
    pub predicted_minutes: f64,
    pub buffer_minutes: u32,
    pub total_minutes: f64,
    pub pickup_zone: Zone,
    pub dropoff_zone: Zone,
}

impl DeparturePlan {
    /// Departure clock time as HH:MM.
    pub fn departure_time(&self) -> String {
        self.departure.format("%H:%M").to_string()
    }
}

// ---------- Service request/response types ----------

#[derive(Debug, Deserialize)]
pub struct PredictRequest {
    pub pickup: String,
    pub dropoff: String,
    /// "HH:MM" or "HHMM"
    pub arrival_time: String,
    #[serde(default = "default_group_size")]
    pub group_size: u32,
    /// Arrival date; today when omitted.
    pub date: Option<NaiveDate>,
}

fn default_group_size() -> u32 {
    1
}

#[derive(Debug, Serialize)]
pub struct PlanOut {
    pub departure_time: String,
    pub previous_day: bool,
    pub travel_minutes: f64,
    pub buffer_minutes: u32,
    pub total_minutes: f64,
    pub pickup_zone: Zone,
    pub dropoff_zone: Zone,
}

impl From<&DeparturePlan> for PlanOut {
    fn from(plan: &DeparturePlan) -> Self {
        Self {
            departure_time: plan.departure_time(),
            previous_day: plan.previous_day,
            travel_minutes: (plan.predicted_minutes * 10.0).round() / 10.0,
            buffer_minutes: plan.buffer_minutes,
            total_minutes: (plan.total_minutes * 10.0).round() / 10.0,
            pickup_zone: plan.pickup_zone,
            dropoff_zone: plan.dropoff_zone,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TrainOut {
    pub trips: usize,
    pub zones: Vec<Zone>,
    pub trained_at: i64,
}
