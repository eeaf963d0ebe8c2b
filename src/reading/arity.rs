use std::fmt;

/// Number of comma-separated fields a station emits per line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum Arity {
    /// Internal temperature, internal humidity, pressure, external temperature, external humidity.
    Basic,

    /// The basic fields followed by CO2 concentration.
    #[default]
    Co2,
}

impl Arity {
    pub fn field_count(&self) -> usize {
        match self {
            Arity::Basic => 5,
            Arity::Co2 => 6,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Arity::Basic => "basic",
            Arity::Co2 => "co2",
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
