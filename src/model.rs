use chrono::{Datelike, Duration, Local, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Utc};

use crate::error::{PredictorError, Result};
use crate::features::{zone_pair_distance, FeatureVector, TrainingSet, ZoneEncoder, FEATURE_NAMES};
use crate::forest::{ForestParams, RandomForest};
use crate::types::{DeparturePlan, TripRecord};
use crate::zone::Zone;

pub const BASE_BUFFER_MINUTES: u32 = 10;
pub const RUSH_HOUR_BUFFER_MINUTES: u32 = 15;
pub const WEEKEND_BUFFER_MINUTES: u32 = 5;
pub const PER_EXTRA_RIDER_BUFFER_MINUTES: u32 = 2;

/// Arrival hours that count as rush hour: 7-9 AM and 5-7 PM.
pub const RUSH_HOURS: [u32; 6] = [7, 8, 9, 17, 18, 19];

/// Fitted regression plus the zone encoding fixed at training time.
/// Read-only once built.
#[derive(Debug, Clone)]
pub struct TrainedModel {
    forest: RandomForest,
    encoder: ZoneEncoder,
    trained_on: usize,
    trained_at: i64,
}

impl TrainedModel {
    pub fn fit(trips: &[TripRecord], params: &ForestParams) -> Result<Self> {
        if trips.is_empty() {
            return Err(PredictorError::EmptyCorpus);
        }
        let set = TrainingSet::from_trips(trips);
        let forest = RandomForest::fit(&set.rows, &set.labels, params)?;

        tracing::info!(
            "trained on {} trips; zones={:?} features={:?}",
            trips.len(),
            set.encoder.zones(),
            FEATURE_NAMES
        );

        Ok(Self {
            forest,
            encoder: set.encoder,
            trained_on: trips.len(),
            trained_at: Utc::now().timestamp_millis(),
        })
    }

    pub fn encoder(&self) -> &ZoneEncoder {
        &self.encoder
    }

    pub fn trained_on(&self) -> usize {
        self.trained_on
    }

    /// Unix millis.
    pub fn trained_at(&self) -> i64 {
        self.trained_at
    }

    pub fn predict_minutes(&self, features: &FeatureVector) -> Result<f64> {
        self.forest.predict(&features.to_row())
    }

    /// Plan a departure for an arrival at `arrival`.
    pub fn plan(
        &self,
        pickup_location: &str,
        dropoff_location: &str,
        arrival: NaiveDateTime,
        group_size: u32,
    ) -> Result<DeparturePlan> {
        if group_size == 0 {
            return Err(PredictorError::InvalidGroupSize(group_size));
        }

        let pickup_zone = Zone::from_address(pickup_location);
        let dropoff_zone = Zone::from_address(dropoff_location);
        for zone in [pickup_zone, dropoff_zone] {
            if !self.encoder.contains(zone) {
                tracing::debug!("zone {} not seen in training; encoding as fallback id", zone);
            }
        }

        let distance = zone_pair_distance(pickup_zone, dropoff_zone);
        let features = FeatureVector::new(
            &self.encoder,
            pickup_zone,
            dropoff_zone,
            arrival,
            group_size,
            distance,
        );
        let predicted_minutes = self.predict_minutes(&features)?;
        let buffer_minutes = buffer_minutes(arrival, group_size);
        let total_minutes = predicted_minutes + buffer_minutes as f64;

        let lead = Duration::seconds((total_minutes * 60.0).round() as i64);
        let departure_at = arrival
            .checked_sub_signed(lead)
            .ok_or(PredictorError::DepartureOutOfRange(arrival))?;

        Ok(DeparturePlan {
            departure: departure_at.time(),
            previous_day: departure_at.date() < arrival.date(),
            predicted_minutes,
            buffer_minutes,
            total_minutes,
            pickup_zone,
            dropoff_zone,
        })
    }
}

/// Heuristic padding on top of the predicted travel time. Saturates at
/// `u32::MAX` for absurd group sizes instead of wrapping.
pub fn buffer_minutes(arrival: NaiveDateTime, group_size: u32) -> u32 {
    let mut buffer = BASE_BUFFER_MINUTES;
    if RUSH_HOURS.contains(&arrival.hour()) {
        buffer += RUSH_HOUR_BUFFER_MINUTES;
    }
    if arrival.weekday().num_days_from_monday() >= 5 {
        buffer += WEEKEND_BUFFER_MINUTES;
    }
    let riders = PER_EXTRA_RIDER_BUFFER_MINUTES.saturating_mul(group_size.saturating_sub(1));
    buffer.saturating_add(riders)
}

/// Accepts "HH:MM" or "HHMM".
pub fn parse_arrival_time(text: &str) -> Result<NaiveTime> {
    let trimmed = text.trim();
    if let Ok(time) = NaiveTime::parse_from_str(trimmed, "%H:%M") {
        return Ok(time);
    }
    if trimmed.len() == 4 && trimmed.bytes().all(|b| b.is_ascii_digit()) {
        if let Ok(time) = NaiveTime::parse_from_str(trimmed, "%H%M") {
            return Ok(time);
        }
    }
    Err(PredictorError::TimeParse(text.to_string()))
}

/// Untrained until `train` succeeds; retraining replaces the model wholesale.
#[derive(Debug, Default)]
pub struct TravelTimePredictor {
    params: ForestParams,
    model: Option<TrainedModel>,
}

impl TravelTimePredictor {
    pub fn new(params: ForestParams) -> Self {
        Self { params, model: None }
    }

    pub fn train(&mut self, trips: &[TripRecord]) -> Result<&mut Self> {
        self.model = Some(TrainedModel::fit(trips, &self.params)?);
        Ok(self)
    }

    pub fn is_trained(&self) -> bool {
        self.model.is_some()
    }

    pub fn model(&self) -> Result<&TrainedModel> {
        self.model.as_ref().ok_or(PredictorError::Untrained)
    }

    pub fn into_model(self) -> Result<TrainedModel> {
        self.model.ok_or(PredictorError::Untrained)
    }

    /// Same-day plan: the arrival is taken to be today in local time.
    pub fn predict_departure(
        &self,
        pickup_location: &str,
        dropoff_location: &str,
        arrival_time: &str,
        group_size: u32,
    ) -> Result<DeparturePlan> {
        self.predict_departure_on(
            pickup_location,
            dropoff_location,
            Local::now().date_naive(),
            arrival_time,
            group_size,
        )
    }

    pub fn predict_departure_on(
        &self,
        pickup_location: &str,
        dropoff_location: &str,
        date: NaiveDate,
        arrival_time: &str,
        group_size: u32,
    ) -> Result<DeparturePlan> {
        let model = self.model()?;
        let time = parse_arrival_time(arrival_time)?;
        model.plan(pickup_location, dropoff_location, date.and_time(time), group_size)
    }

    pub fn predict_departure_at(
        &self,
        pickup_location: &str,
        dropoff_location: &str,
        arrival: NaiveDateTime,
        group_size: u32,
    ) -> Result<DeparturePlan> {
        self.model()?
            .plan(pickup_location, dropoff_location, arrival, group_size)
    }
}
