use chrono::{Datelike, NaiveDateTime, Timelike};
use std::collections::{BTreeMap, BTreeSet};

use crate::types::TripRecord;
use crate::zone::Zone;

/// Rough degrees-to-miles factor for the Austin latitude band.
pub const MILES_PER_DEGREE: f64 = 69.0;

pub const MIN_DURATION_MINUTES: f64 = 15.0;
pub const MAX_DURATION_MINUTES: f64 = 45.0;

/// Used for zone pairs missing from `ZONE_DISTANCES`.
pub const DEFAULT_ZONE_DISTANCE_MILES: f64 = 5.0;

/// Authoritative column order of a feature row.
pub const FEATURE_NAMES: [&str; 6] = [
    "pickup_zone_id",
    "dropoff_zone_id",
    "hour",
    "day_of_week",
    "group_size",
    "distance_estimate",
];

/// Known inter-zone distances in miles. Lookup is symmetric.
const ZONE_DISTANCES: &[(Zone, Zone, f64)] = &[
    (Zone::University, Zone::Airport, 12.0),
    (Zone::WestCampus, Zone::Airport, 13.0),
    (Zone::Downtown, Zone::Airport, 8.0),
    (Zone::EastAustin, Zone::Airport, 10.0),
    (Zone::SouthAustin, Zone::Airport, 6.0),
    (Zone::NorthAustin, Zone::Airport, 15.0),
    (Zone::University, Zone::Downtown, 2.0),
    (Zone::WestCampus, Zone::Downtown, 1.0),
    (Zone::EastAustin, Zone::Downtown, 1.0),
    (Zone::SouthAustin, Zone::Downtown, 3.0),
    (Zone::NorthAustin, Zone::Downtown, 4.0),
];

pub fn estimate_distance_miles(from: (f64, f64), to: (f64, f64)) -> f64 {
    ((to.0 - from.0).abs() + (to.1 - from.1).abs()) * MILES_PER_DEGREE
}

/// Stand-in label: the source data has no measured durations.
pub fn synthetic_duration_minutes(distance_miles: f64) -> f64 {
    (distance_miles * 3.0 + 15.0).clamp(MIN_DURATION_MINUTES, MAX_DURATION_MINUTES)
}

pub fn zone_pair_distance(a: Zone, b: Zone) -> f64 {
    ZONE_DISTANCES
        .iter()
        .find(|(x, y, _)| (*x == a && *y == b) || (*x == b && *y == a))
        .map(|(_, _, miles)| *miles)
        .unwrap_or(DEFAULT_ZONE_DISTANCE_MILES)
}

/// Zone label -> integer id, fixed at training time.
///
/// Observed zones get ids `1..=n` in label order. `Other` and any zone not seen
/// during training encode to 0.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ZoneEncoder {
    ids: BTreeMap<Zone, u32>,
}

impl ZoneEncoder {
    pub const FALLBACK_ID: u32 = 0;

    pub fn fit<I: IntoIterator<Item = Zone>>(zones: I) -> Self {
        let observed: BTreeSet<Zone> = zones.into_iter().filter(|z| *z != Zone::Other).collect();
        let mut ordered: Vec<Zone> = observed.into_iter().collect();
        ordered.sort_by_key(|z| z.label());
        let ids = ordered
            .into_iter()
            .enumerate()
            .map(|(i, z)| (z, i as u32 + 1))
            .collect();
        Self { ids }
    }

    pub fn encode(&self, zone: Zone) -> u32 {
        self.ids.get(&zone).copied().unwrap_or(Self::FALLBACK_ID)
    }

    pub fn contains(&self, zone: Zone) -> bool {
        self.ids.contains_key(&zone)
    }

    pub fn zones(&self) -> Vec<Zone> {
        let mut zones: Vec<(Zone, u32)> = self.ids.iter().map(|(z, id)| (*z, *id)).collect();
        zones.sort_by_key(|(_, id)| *id);
        zones.into_iter().map(|(z, _)| z).collect()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureVector {
    pub pickup_zone_id: u32,
    pub dropoff_zone_id: u32,
    pub hour: u32,
    /// 0 = Monday
    pub day_of_week: u32,
    pub group_size: u32,
    pub distance_estimate: f64,
}

impl FeatureVector {
    pub fn new(
        encoder: &ZoneEncoder,
        pickup: Zone,
        dropoff: Zone,
        at: NaiveDateTime,
        group_size: u32,
        distance_estimate: f64,
    ) -> Self {
        Self {
            pickup_zone_id: encoder.encode(pickup),
            dropoff_zone_id: encoder.encode(dropoff),
            hour: at.hour(),
            day_of_week: at.weekday().num_days_from_monday(),
            group_size,
            distance_estimate,
        }
    }

    /// Columns in `FEATURE_NAMES` order.
    pub fn to_row(&self) -> [f64; 6] {
        [
            self.pickup_zone_id as f64,
            self.dropoff_zone_id as f64,
            self.hour as f64,
            self.day_of_week as f64,
            self.group_size as f64,
            self.distance_estimate,
        ]
    }
}

/// Feature table and label vector built from a training corpus.
#[derive(Debug, Clone)]
pub struct TrainingSet {
    pub encoder: ZoneEncoder,
    pub rows: Vec<[f64; 6]>,
    pub labels: Vec<f64>,
}

impl TrainingSet {
    pub fn from_trips(trips: &[TripRecord]) -> Self {
        let zones: Vec<(Zone, Zone)> = trips
            .iter()
            .map(|t| (t.pickup_zone(), t.dropoff_zone()))
            .collect();
        let encoder = ZoneEncoder::fit(zones.iter().flat_map(|(p, d)| [*p, *d]));

        let mut rows = Vec::with_capacity(trips.len());
        let mut labels = Vec::with_capacity(trips.len());
        for (trip, (pickup, dropoff)) in trips.iter().zip(zones) {
            let distance = estimate_distance_miles(
                (trip.pickup_lat, trip.pickup_lon),
                (trip.dropoff_lat, trip.dropoff_lon),
            );
            let fv = FeatureVector::new(
                &encoder,
                pickup,
                dropoff,
                trip.pickup_time,
                trip.passengers,
                distance,
            );
            rows.push(fv.to_row());
            labels.push(synthetic_duration_minutes(distance));
        }

        Self { encoder, rows, labels }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_distance_estimate() {
        let d = estimate_distance_miles((30.0, -97.0), (30.1, -97.1));
        assert!((d - 13.8).abs() < 1e-9);
        assert_eq!(estimate_distance_miles((30.0, -97.0), (30.0, -97.0)), 0.0);
    }

    #[test]
    fn test_synthetic_label_is_clamped() {
        assert_eq!(synthetic_duration_minutes(0.0), 15.0);
        assert_eq!(synthetic_duration_minutes(5.0), 30.0);
        assert_eq!(synthetic_duration_minutes(10.0), 45.0);
        assert_eq!(synthetic_duration_minutes(100.0), 45.0);
    }

    #[test]
    fn test_zone_pair_distance_is_symmetric() {
        assert_eq!(zone_pair_distance(Zone::University, Zone::Airport), 12.0);
        assert_eq!(zone_pair_distance(Zone::Airport, Zone::University), 12.0);
        assert_eq!(zone_pair_distance(Zone::Downtown, Zone::WestCampus), 1.0);
        assert_eq!(zone_pair_distance(Zone::Other, Zone::Airport), DEFAULT_ZONE_DISTANCE_MILES);
        assert_eq!(zone_pair_distance(Zone::Airport, Zone::Airport), DEFAULT_ZONE_DISTANCE_MILES);
    }

    #[test]
    fn test_encoder_ids() {
        let enc = ZoneEncoder::fit([Zone::Downtown, Zone::Airport, Zone::Other, Zone::Downtown]);
        assert_eq!(enc.len(), 2);
        assert_eq!(enc.encode(Zone::Airport), 1);
        assert_eq!(enc.encode(Zone::Downtown), 2);
        assert_eq!(enc.encode(Zone::Other), ZoneEncoder::FALLBACK_ID);
        assert_eq!(enc.encode(Zone::NorthAustin), ZoneEncoder::FALLBACK_ID);
        assert_eq!(enc.zones(), vec![Zone::Airport, Zone::Downtown]);
    }

    #[test]
    fn test_feature_row_order() {
        let enc = ZoneEncoder::fit([Zone::Airport, Zone::University]);
        // 2025-09-07 is a Sunday
        let at = NaiveDate::from_ymd_opt(2025, 9, 7)
            .unwrap()
            .and_hms_opt(21, 15, 0)
            .unwrap();
        let fv = FeatureVector::new(&enc, Zone::University, Zone::Airport, at, 4, 12.0);
        assert_eq!(fv.to_row(), [2.0, 1.0, 21.0, 6.0, 4.0, 12.0]);
        assert_eq!(FEATURE_NAMES.len(), fv.to_row().len());
    }
}
