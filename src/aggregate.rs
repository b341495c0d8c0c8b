use crate::datastore::Registration;
use crate::types::Dataset;
use log::warn;
use serde::Serialize;
use std::collections::BTreeMap;

pub const STATES: [&str; 8] = ["ACT", "NSW", "NT", "QLD", "SA", "TAS", "VIC", "WA"];

const UNKNOWN_YEAR: &str = "unknown";

/// A labelled value, the shape both the table and the charts consume.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Point {
    pub label: String,
    pub value: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Breakdown {
    pub states: Vec<Point>,
    pub total: u64,
    pub by_year: Vec<Point>,
}

impl Breakdown {
    /// What the dashboard shows before anything has been selected.
    pub fn empty() -> Breakdown {
        Breakdown {
            states: STATES
                .iter()
                .map(|s| Point {
                    label: s.to_string(),
                    value: 0,
                })
                .collect(),
            total: 0,
            by_year: Vec::new(),
        }
    }

    pub fn from_rows(rows: &[Registration]) -> Breakdown {
        let mut states: BTreeMap<String, u64> =
            STATES.iter().map(|s| (s.to_string(), 0)).collect();
        let mut years: BTreeMap<String, u64> = BTreeMap::new();
        let mut total = 0;

        for row in rows {
            total += row.no_vehicles;
            let state = row.state_abb.trim().to_ascii_uppercase();
            if !STATES.iter().any(|s| *s == state) {
                warn!("Unrecognised state {:?} in registration data", row.state_abb);
            }
            *states.entry(state).or_insert(0) += row.no_vehicles;
            let year = row
                .year_of_manufacture
                .clone()
                .unwrap_or_else(|| UNKNOWN_YEAR.to_string());
            *years.entry(year).or_insert(0) += row.no_vehicles;
        }

        Breakdown {
            states: points(states),
            total,
            by_year: points(years),
        }
    }
}

/// Total registrations in each dataset, oldest first. Datasets that returned
/// no rows at all contribute no point.
pub fn dataset_change(counts: &[(Dataset, Vec<u64>)]) -> Vec<Point> {
    let mut totals: BTreeMap<Dataset, u64> = BTreeMap::new();
    for (dataset, rows) in counts {
        for n in rows {
            *totals.entry(*dataset).or_insert(0) += n;
        }
    }
    totals
        .into_iter()
        .map(|(dataset, value)| Point {
            label: dataset.to_string(),
            value,
        })
        .collect()
}

fn points(map: BTreeMap<String, u64>) -> Vec<Point> {
    map.into_iter()
        .map(|(label, value)| Point { label, value })
        .collect()
}
