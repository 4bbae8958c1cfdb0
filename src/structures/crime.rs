use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::structures::LatLng;

/// Decimal places kept for crime coordinates.
pub const COORDINATE_PRECISION: i32 = 6;
const SCALE: f64 = 1_000_000.0;

/// A coordinate rounded to [`COORDINATE_PRECISION`] decimal places, held as
/// integer micro-degrees.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GridPoint {
    pub lat_e6: i64,
    pub lon_e6: i64,
}

impl GridPoint {
    /// `None` for non-finite input.
    pub fn round(latitude: f64, longitude: f64) -> Option<GridPoint> {
        if !latitude.is_finite() || !longitude.is_finite() {
            return None;
        }
        Some(GridPoint {
            lat_e6: (latitude * SCALE).round() as i64,
            lon_e6: (longitude * SCALE).round() as i64,
        })
    }

    pub fn lat_lng(&self) -> LatLng {
        LatLng {
            latitude: self.lat_e6 as f64 / SCALE,
            longitude: self.lon_e6 as f64 / SCALE,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl Default for BoundingBox {
    /// Greater London.
    fn default() -> Self {
        BoundingBox {
            min_lat: 51.30,
            max_lat: 51.70,
            min_lon: -0.50,
            max_lon: 0.30,
        }
    }
}

impl BoundingBox {
    pub fn contains(&self, latitude: f64, longitude: f64) -> bool {
        (self.min_lat..=self.max_lat).contains(&latitude)
            && (self.min_lon..=self.max_lon).contains(&longitude)
    }
}

pub type CrimeCounts = BTreeMap<String, u32>;

/// Aggregated crime incidents, one entry per distinct [`GridPoint`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CrimeData {
    records: BTreeMap<GridPoint, CrimeCounts>,
}

impl CrimeData {
    pub fn records(&self) -> &BTreeMap<GridPoint, CrimeCounts> {
        &self.records
    }

    pub fn get(&self, point: &GridPoint) -> Option<&CrimeCounts> {
        self.records.get(point)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn incident_count(&self) -> u64 {
        self.records
            .values()
            .flat_map(|counts| counts.values())
            .map(|&c| u64::from(c))
            .sum()
    }

    /// Every crime type label present, sorted.
    pub fn crime_types(&self) -> BTreeSet<&str> {
        self.records
            .values()
            .flat_map(|counts| counts.keys())
            .map(String::as_str)
            .collect()
    }

    /// Incident total per crime type across all locations.
    pub fn type_totals(&self) -> BTreeMap<&str, u64> {
        let mut totals = BTreeMap::new();
        for (crime_type, &count) in self.records.values().flat_map(|counts| counts.iter()) {
            *totals.entry(crime_type.as_str()).or_insert(0) += u64::from(count);
        }
        totals
    }
}

impl FromIterator<(GridPoint, CrimeCounts)> for CrimeData {
    fn from_iter<I: IntoIterator<Item = (GridPoint, CrimeCounts)>>(iter: I) -> Self {
        let mut acc = CrimeAccumulator::new();
        for (point, counts) in iter {
            for (crime_type, count) in counts {
                acc.add_count(point, &crime_type, count);
            }
        }
        acc.finish()
    }
}

/// Mutable accumulation pass over raw incidents. Consumed by [`finish`] into
/// the immutable [`CrimeData`].
///
/// [`finish`]: CrimeAccumulator::finish
#[derive(Debug, Default)]
pub struct CrimeAccumulator {
    records: BTreeMap<GridPoint, CrimeCounts>,
}

impl CrimeAccumulator {
    pub fn new() -> CrimeAccumulator {
        CrimeAccumulator::default()
    }

    pub fn add(&mut self, point: GridPoint, crime_type: &str) {
        self.add_count(point, crime_type, 1);
    }

    pub fn add_count(&mut self, point: GridPoint, crime_type: &str, count: u32) {
        let counts = self.records.entry(point).or_default();
        match counts.get_mut(crime_type) {
            Some(c) => *c = c.saturating_add(count),
            None => {
                counts.insert(crime_type.to_string(), count);
            }
        }
    }

    pub fn finish(self) -> CrimeData {
        CrimeData {
            records: self.records,
        }
    }
}
