use chrono::NaiveDateTime;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

use crate::features::{estimate_distance_miles, synthetic_duration_minutes};
use crate::types::TripRecord;
use crate::zone::Zone;

pub const BASE_FARE: f64 = 15.0;

/// Fare grows 30% per extra rider and scales linearly with duration around a 30-minute trip.
pub fn estimated_fare(passengers: u32, duration_minutes: f64) -> f64 {
    let group_multiplier = 1.0 + passengers.saturating_sub(1) as f64 * 0.3;
    let fare = BASE_FARE * group_multiplier * (duration_minutes / 30.0);
    (fare * 100.0).round() / 100.0
}

pub fn trip_duration_minutes(trip: &TripRecord) -> f64 {
    synthetic_duration_minutes(estimate_distance_miles(
        (trip.pickup_lat, trip.pickup_lon),
        (trip.dropoff_lat, trip.dropoff_lon),
    ))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum GroupSizeCategory {
    #[serde(rename = "Small (1-3)")]
    Small,
    #[serde(rename = "Medium (4-6)")]
    Medium,
    #[serde(rename = "Large (7-9)")]
    Large,
    #[serde(rename = "XL (10-12)")]
    ExtraLarge,
    #[serde(rename = "XXL (13+)")]
    DoubleExtraLarge,
}

impl GroupSizeCategory {
    pub fn of(passengers: u32) -> Self {
        match passengers {
            0..=3 => Self::Small,
            4..=6 => Self::Medium,
            7..=9 => Self::Large,
            10..=12 => Self::ExtraLarge,
            _ => Self::DoubleExtraLarge,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalyticsSummary {
    pub total_trips: usize,
    pub total_passengers: u64,
    pub avg_group_size: f64,
    /// Most frequent pickup hour; the earliest hour wins ties.
    pub peak_hour: Option<u32>,
    pub most_common_zone: Option<Zone>,
    pub avg_trip_duration: f64,
    pub avg_fare: f64,
    pub group_size_distribution: BTreeMap<GroupSizeCategory, usize>,
    pub zone_distribution: BTreeMap<Zone, usize>,
    pub hourly_patterns: BTreeMap<u32, usize>,
}

impl AnalyticsSummary {
    pub fn from_trips(trips: &[TripRecord]) -> Self {
        let total_trips = trips.len();
        let total_passengers: u64 = trips.iter().map(|t| t.passengers as u64).sum();

        let mut group_size_distribution = BTreeMap::new();
        let mut zone_distribution = BTreeMap::new();
        let mut hourly_patterns = BTreeMap::new();
        let mut duration_sum = 0.0;
        let mut fare_sum = 0.0;

        for trip in trips {
            *group_size_distribution
                .entry(GroupSizeCategory::of(trip.passengers))
                .or_insert(0) += 1;
            *zone_distribution.entry(trip.pickup_zone()).or_insert(0) += 1;
            *hourly_patterns.entry(trip.hour()).or_insert(0) += 1;

            let duration = trip_duration_minutes(trip);
            duration_sum += duration;
            fare_sum += estimated_fare(trip.passengers, duration);
        }

        let mean = |sum: f64| if total_trips == 0 { 0.0 } else { sum / total_trips as f64 };

        Self {
            total_trips,
            total_passengers,
            avg_group_size: mean(total_passengers as f64),
            peak_hour: mode(&hourly_patterns),
            most_common_zone: mode(&zone_distribution),
            avg_trip_duration: mean(duration_sum),
            avg_fare: mean(fare_sum),
            group_size_distribution,
            zone_distribution,
            hourly_patterns,
        }
    }
}

/// Highest count, smallest key on ties.
fn mode<K: Copy + Ord>(counts: &BTreeMap<K, usize>) -> Option<K> {
    counts
        .iter()
        .fold(None, |best: Option<(K, usize)>, (k, n)| match best {
            Some((_, m)) if m >= *n => best,
            _ => Some((*k, *n)),
        })
        .map(|(k, _)| k)
}

/// How group size varies with passenger count, pickup hour and pickup zone.
#[derive(Debug, Clone, Default, Serialize)]
pub struct GroupPatterns {
    /// Trips per exact passenger count.
    pub size_distribution: BTreeMap<u32, usize>,
    /// Mean passengers per pickup hour.
    pub time_patterns: BTreeMap<u32, f64>,
    /// Mean passengers per pickup zone.
    pub zone_patterns: BTreeMap<Zone, f64>,
}

impl GroupPatterns {
    pub fn from_trips(trips: &[TripRecord]) -> Self {
        let mut size_distribution = BTreeMap::new();
        let mut by_hour: BTreeMap<u32, (u64, usize)> = BTreeMap::new();
        let mut by_zone: BTreeMap<Zone, (u64, usize)> = BTreeMap::new();

        for trip in trips {
            *size_distribution.entry(trip.passengers).or_insert(0) += 1;
            for slot in [
                by_hour.entry(trip.hour()).or_insert((0, 0)),
                by_zone.entry(trip.pickup_zone()).or_insert((0, 0)),
            ] {
                slot.0 += trip.passengers as u64;
                slot.1 += 1;
            }
        }

        fn means<K: Ord>(sums: BTreeMap<K, (u64, usize)>) -> BTreeMap<K, f64> {
            sums.into_iter()
                .map(|(k, (total, n))| (k, total as f64 / n as f64))
                .collect()
        }

        Self {
            size_distribution,
            time_patterns: means(by_hour),
            zone_patterns: means(by_zone),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Hotspot {
    pub address: String,
    pub trips: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct Hotspots {
    pub pickup: Vec<Hotspot>,
    pub dropoff: Vec<Hotspot>,
}

/// Most frequent pickup and dropoff addresses, ties broken alphabetically.
pub fn hotspots(trips: &[TripRecord], top_n: usize) -> Hotspots {
    fn rank<'a>(addresses: impl Iterator<Item = &'a str>, top_n: usize) -> Vec<Hotspot> {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for a in addresses {
            *counts.entry(a).or_insert(0) += 1;
        }
        let mut ranked: Vec<(&str, usize)> = counts.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        ranked
            .into_iter()
            .take(top_n)
            .map(|(address, trips)| Hotspot {
                address: address.to_string(),
                trips,
            })
            .collect()
    }

    Hotspots {
        pickup: rank(trips.iter().map(|t| t.pickup_address.as_str()), top_n),
        dropoff: rank(trips.iter().map(|t| t.dropoff_address.as_str()), top_n),
    }
}

/// Trips whose pickup or dropoff address mentions `location` (case-insensitive).
pub fn filter_by_location<'a>(trips: &'a [TripRecord], location: &str) -> Vec<&'a TripRecord> {
    let needle = location.to_lowercase();
    trips
        .iter()
        .filter(|t| {
            t.pickup_address.to_lowercase().contains(&needle)
                || t.dropoff_address.to_lowercase().contains(&needle)
        })
        .collect()
}

pub fn filter_by_group_size(trips: &[TripRecord], min: u32, max: u32) -> Vec<&TripRecord> {
    trips
        .iter()
        .filter(|t| (min..=max).contains(&t.passengers))
        .collect()
}

/// Inclusive on both ends.
pub fn filter_by_time_range(
    trips: &[TripRecord],
    start: NaiveDateTime,
    end: NaiveDateTime,
) -> Vec<&TripRecord> {
    trips
        .iter()
        .filter(|t| t.pickup_time >= start && t.pickup_time <= end)
        .collect()
}
