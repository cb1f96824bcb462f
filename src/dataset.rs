use anyhow::Context;
use chrono::NaiveDateTime;
use serde::Deserialize;
use std::{fs::File, io, path::Path};

use crate::error::{PredictorError, Result};
use crate::types::TripRecord;

const SAMPLE_CSV: &str = include_str!("../data/sample_trips.csv");

/// Timestamp layouts seen in trip exports, tried in order.
const TIMESTAMP_FORMATS: [&str; 3] = ["%m/%d/%y %H:%M", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

// Column names follow the rideshare export headers.
#[derive(Debug, Deserialize)]
struct RawTrip {
    #[serde(rename = "Trip ID")]
    trip_id: u64,
    #[serde(rename = "Booking User ID", default)]
    booking_user_id: Option<u64>,
    #[serde(rename = "Pick Up Latitude")]
    pickup_lat: f64,
    #[serde(rename = "Pick Up Longitude")]
    pickup_lon: f64,
    #[serde(rename = "Drop Off Latitude")]
    dropoff_lat: f64,
    #[serde(rename = "Drop Off Longitude")]
    dropoff_lon: f64,
    #[serde(rename = "Pick Up Address", default)]
    pickup_address: String,
    #[serde(rename = "Drop Off Address", default)]
    dropoff_address: String,
    #[serde(rename = "Trip Date and Time")]
    pickup_time: String,
    #[serde(rename = "Total Passengers", default)]
    passengers: Option<u32>,
}

pub fn parse_trip_timestamp(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
}

impl RawTrip {
    fn into_record(self, row: usize) -> Result<TripRecord> {
        let pickup_time =
            parse_trip_timestamp(&self.pickup_time).ok_or_else(|| PredictorError::Dataset {
                row,
                message: format!("unrecognized timestamp {:?}", self.pickup_time),
            })?;
        Ok(TripRecord {
            trip_id: self.trip_id,
            booking_user_id: self.booking_user_id.unwrap_or_default(),
            pickup_lat: self.pickup_lat,
            pickup_lon: self.pickup_lon,
            dropoff_lat: self.dropoff_lat,
            dropoff_lon: self.dropoff_lon,
            pickup_address: self.pickup_address.trim().to_string(),
            dropoff_address: self.dropoff_address.trim().to_string(),
            pickup_time,
            // missing counts are treated as a solo rider
            passengers: self.passengers.filter(|p| *p > 0).unwrap_or(1),
        })
    }
}

/// Parse trip rows from CSV with a header line. Row numbers in errors are 1-based
/// data rows.
pub fn read_trips<R: io::Read>(reader: R) -> Result<Vec<TripRecord>> {
    let mut rdr = csv::Reader::from_reader(reader);
    let mut trips = Vec::new();
    for (i, raw) in rdr.deserialize::<RawTrip>().enumerate() {
        let row = i + 1;
        let raw = raw.map_err(|e| PredictorError::Dataset {
            row,
            message: e.to_string(),
        })?;
        trips.push(raw.into_record(row)?);
    }
    Ok(trips)
}

pub fn load_trips_csv<P: AsRef<Path>>(path: P) -> anyhow::Result<Vec<TripRecord>> {
    let path = path.as_ref();
    let file = File::open(path).with_context(|| format!("failed to open trips at {}", path.display()))?;
    let trips = read_trips(file).with_context(|| format!("failed to parse trips in {}", path.display()))?;
    tracing::info!("loaded {} trips from {}", trips.len(), path.display());
    Ok(trips)
}

/// The bundled 15-trip Austin sample.
pub fn sample_trips() -> Result<Vec<TripRecord>> {
    read_trips(SAMPLE_CSV.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_sample_trips() {
        let trips = sample_trips().unwrap();
        assert_eq!(trips.len(), 15);
        let first = &trips[0];
        assert_eq!(first.trip_id, 734889);
        assert_eq!(first.passengers, 9);
        assert_eq!(first.pickup_time.hour(), 11);
        assert_eq!(first.pickup_time.minute(), 47);
        assert_eq!(first.pickup_time.year(), 2025);
        assert!(first.dropoff_address.starts_with("Robert L. Patton"));
    }

    #[test]
    fn test_timestamp_formats() {
        assert!(parse_trip_timestamp("9/7/25 23:29").is_some());
        assert!(parse_trip_timestamp("2025-09-07 23:29:00").is_some());
        assert!(parse_trip_timestamp("2025-09-07T23:29:00").is_some());
        assert!(parse_trip_timestamp("yesterday").is_none());
    }

    #[test]
    fn test_missing_passengers_default_to_one() {
        let csv = "Trip ID,Pick Up Latitude,Pick Up Longitude,Drop Off Latitude,Drop Off Longitude,Pick Up Address,Drop Off Address,Trip Date and Time,Total Passengers\n\
                   1,30.28,-97.74,30.27,-97.75,  Downtown  ,Airport,9/7/25 21:10,\n";
        let trips = read_trips(csv.as_bytes()).unwrap();
        assert_eq!(trips[0].passengers, 1);
        assert_eq!(trips[0].booking_user_id, 0);
        assert_eq!(trips[0].pickup_address, "Downtown");
    }

    #[test]
    fn test_bad_timestamp_names_row() {
        let csv = "Trip ID,Pick Up Latitude,Pick Up Longitude,Drop Off Latitude,Drop Off Longitude,Trip Date and Time,Total Passengers\n\
                   1,30.28,-97.74,30.27,-97.75,9/7/25 21:10,2\n\
                   2,30.28,-97.74,30.27,-97.75,not a time,2\n";
        match read_trips(csv.as_bytes()) {
            Err(PredictorError::Dataset { row, .. }) => assert_eq!(row, 2),
            other => panic!("expected dataset error, got {:?}", other),
        }
    }

    #[test]
    fn test_load_missing_file() {
        let err = load_trips_csv("/nonexistent/trips.csv").unwrap_err();
        assert!(err.to_string().contains("failed to open trips"));
    }
}
