use chrono::{DateTime, Utc};

use crate::reading::Reading;

/// One scalar sample as stored in the time-series table.
#[derive(Debug, Clone, PartialEq)]
pub struct Point {
    pub measurement: &'static str,

    pub source: String,

    pub value: f32,

    pub measured_at: DateTime<Utc>,
}

impl Point {
    pub fn from_reading(reading: &Reading, source: &str, measured_at: DateTime<Utc>) -> Vec<Self> {
        reading
            .fields()
            .into_iter()
            .map(|field| Point {
                measurement: field.measurement,
                source: source.to_string(),
                value: field.value,
                measured_at,
            })
            .collect()
    }
}
