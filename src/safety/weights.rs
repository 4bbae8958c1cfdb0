use std::collections::BTreeMap;

use tracing::warn;

use crate::structures::ScoringConfig;

/// Weight applied to crime types missing from the table.
pub const DEFAULT_WEIGHT: f64 = 1.0;

/// Severity weight per crime type label. Higher is more dangerous.
#[derive(Debug, Clone, PartialEq)]
pub struct CrimeWeightTable {
    weights: BTreeMap<String, f64>,
}

impl Default for CrimeWeightTable {
    fn default() -> Self {
        [
            ("Violence and sexual offences", 5.0),
            ("Robbery", 4.5),
            ("Possession of weapons", 4.2),
            ("Theft from the person", 4.0),
            ("Criminal damage and arson", 3.5),
            ("Burglary", 3.3),
            ("Vehicle crime", 3.0),
            ("Drugs", 2.8),
            ("Other crime", 2.5),
            ("Public order", 2.2),
            ("Anti-social behaviour", 2.0),
            ("Other theft", 2.0),
            ("Shoplifting", 1.5),
            ("Bicycle theft", 1.2),
        ]
        .into_iter()
        .map(|(k, w)| (k.to_string(), w))
        .collect()
    }
}

impl FromIterator<(String, f64)> for CrimeWeightTable {
    fn from_iter<I: IntoIterator<Item = (String, f64)>>(iter: I) -> Self {
        CrimeWeightTable {
            weights: iter.into_iter().collect(),
        }
    }
}

impl CrimeWeightTable {
    /// The configured table, or the built-in one when none is given.
    pub fn from_config(config: &ScoringConfig) -> CrimeWeightTable {
        let table: CrimeWeightTable = match &config.weights {
            Some(w) => w.iter().map(|(k, v)| (k.clone(), *v)).collect(),
            None => CrimeWeightTable::default(),
        };
        if table.is_empty() {
            warn!("Crime weight table is empty, every crime type weighs {DEFAULT_WEIGHT}");
        }
        table
    }

    pub fn contains(&self, crime_type: &str) -> bool {
        self.weights.contains_key(crime_type)
    }

    pub fn weight(&self, crime_type: &str) -> f64 {
        self.weights
            .get(crime_type)
            .copied()
            .unwrap_or(DEFAULT_WEIGHT)
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }
}
