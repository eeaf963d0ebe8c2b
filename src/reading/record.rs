use std::fmt::Write as _;

use crate::reading::{Arity, ParseReadingError};

const INTERNAL_TEMPERATURE_INDEX: usize = 0;
const INTERNAL_HUMIDITY_INDEX: usize = 1;
const PRESSURE_INDEX: usize = 2;
const EXTERNAL_TEMPERATURE_INDEX: usize = 3;
const EXTERNAL_HUMIDITY_INDEX: usize = 4;
const CO2_INDEX: usize = 5;

const FIELD_DELIMITER: char = ',';

/// One line of sensor output.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading {
    pub internal_temperature_celsius: f32,

    pub internal_humidity_percent: f32,

    pub pressure_hpa: f32,

    pub external_temperature_celsius: f32,

    pub external_humidity_percent: f32,

    pub co2_ppm: Option<f32>,
}

/// A single named scalar of a [`Reading`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Field {
    pub measurement: &'static str,
    pub label: &'static str,
    pub unit: &'static str,
    pub value: f32,
}

impl Reading {
    /// Parses a delimited line. The whole line is rejected unless it has exactly
    /// `arity.field_count()` numeric fields.
    pub fn parse(line: &str, arity: Arity) -> Result<Self, ParseReadingError> {
        let fields: Vec<&str> = line.trim().split(FIELD_DELIMITER).collect();

        if fields.len() != arity.field_count() {
            return Err(ParseReadingError::FieldCount {
                expected: arity.field_count(),
                actual: fields.len(),
            });
        }

        let values = fields
            .iter()
            .enumerate()
            .map(|(index, field)| {
                field
                    .trim()
                    .parse::<f32>()
                    .map_err(|_| ParseReadingError::InvalidField {
                        index,
                        value: field.to_string(),
                    })
            })
            .collect::<Result<Vec<f32>, _>>()?;

        let co2_ppm = match arity {
            Arity::Basic => None,
            Arity::Co2 => Some(values[CO2_INDEX]),
        };

        Ok(Self {
            internal_temperature_celsius: values[INTERNAL_TEMPERATURE_INDEX],
            internal_humidity_percent: values[INTERNAL_HUMIDITY_INDEX],
            pressure_hpa: values[PRESSURE_INDEX],
            external_temperature_celsius: values[EXTERNAL_TEMPERATURE_INDEX],
            external_humidity_percent: values[EXTERNAL_HUMIDITY_INDEX],
            co2_ppm,
        })
    }

    pub fn fields(&self) -> Vec<Field> {
        let mut fields = vec![
            Field {
                measurement: "temperature",
                label: "Internal temperature",
                unit: "°C",
                value: self.internal_temperature_celsius,
            },
            Field {
                measurement: "humidity",
                label: "Internal humidity",
                unit: "%",
                value: self.internal_humidity_percent,
            },
            Field {
                measurement: "pressure",
                label: "Atmospheric pressure",
                unit: "hPa",
                value: self.pressure_hpa,
            },
            Field {
                measurement: "external_temperature",
                label: "External temperature",
                unit: "°C",
                value: self.external_temperature_celsius,
            },
            Field {
                measurement: "external_humidity",
                label: "External humidity",
                unit: "%",
                value: self.external_humidity_percent,
            },
        ];

        if let Some(co2_ppm) = self.co2_ppm {
            fields.push(Field {
                measurement: "co2",
                label: "CO2",
                unit: "ppm",
                value: co2_ppm,
            });
        }

        fields
    }

    /// Renders one `label: value unit` line per field.
    pub fn report(&self) -> String {
        let mut out = String::new();
        for (i, field) in self.fields().iter().enumerate() {
            if i > 0 {
                out.push('\n');
            }
            let _ = write!(out, "{}: {} {}", field.label, field.value, field.unit);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_basic_line() {
        let reading = Reading::parse("21.5,40.2,1013.1,9.8,77\r\n", Arity::Basic).unwrap();

        assert_eq!(reading.internal_temperature_celsius, 21.5);
        assert_eq!(reading.internal_humidity_percent, 40.2);
        assert_eq!(reading.pressure_hpa, 1013.1);
        assert_eq!(reading.external_temperature_celsius, 9.8);
        assert_eq!(reading.external_humidity_percent, 77.0);
        assert_eq!(reading.co2_ppm, None);
        assert_eq!(reading.fields().len(), 5);
    }

    #[test]
    fn parses_co2_line_with_padded_fields() {
        let reading = Reading::parse(" 21.5, 40.2 ,1013.1,9.8,77,415", Arity::Co2).unwrap();

        assert_eq!(reading.co2_ppm, Some(415.0));
        assert_eq!(reading.fields().len(), 6);
        assert_eq!(reading.fields()[5].measurement, "co2");
    }

    #[test]
    fn rejects_wrong_field_count() {
        assert_eq!(
            Reading::parse("12.5,bad,1,2", Arity::Basic),
            Err(ParseReadingError::FieldCount {
                expected: 5,
                actual: 4
            })
        );
        assert_eq!(
            Reading::parse("21.5,40.2,1013.1,9.8,77", Arity::Co2),
            Err(ParseReadingError::FieldCount {
                expected: 6,
                actual: 5
            })
        );
        assert!(matches!(
            Reading::parse("", Arity::Basic),
            Err(ParseReadingError::FieldCount { actual: 1, .. })
        ));
    }

    #[test]
    fn rejects_non_numeric_field() {
        assert_eq!(
            Reading::parse("21.5,oops,1013.1,9.8,77", Arity::Basic),
            Err(ParseReadingError::InvalidField {
                index: 1,
                value: "oops".to_string()
            })
        );
    }

    #[test]
    fn report_lists_every_field() {
        let reading = Reading::parse("21.5,40,1013,9.5,77,415", Arity::Co2).unwrap();

        assert_eq!(
            reading.report(),
            "Internal temperature: 21.5 °C\n\
             Internal humidity: 40 %\n\
             Atmospheric pressure: 1013 hPa\n\
             External temperature: 9.5 °C\n\
             External humidity: 77 %\n\
             CO2: 415 ppm"
        );
    }
}
