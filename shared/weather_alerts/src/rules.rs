//! Weather alert threshold rules
//!
//! Rules are checked in a fixed order and the first match wins:
//!
//! 1. temperature below -10 °C or above 40 °C
//! 2. wind speed above 80
//! 3. a severe condition (thunderstorm, tornado, hurricane)

use serde::Serialize;
use serde_json::{Number, Value};

use crate::dispatcher::{AlertError, AlertResult};

/// Lowest temperature (°C) that does not raise an alert
pub const MIN_TEMPERATURE: f64 = -10.0;
/// Highest temperature (°C) that does not raise an alert
pub const MAX_TEMPERATURE: f64 = 40.0;
/// Highest wind speed that does not raise an alert, in the source's unit
pub const MAX_WIND_SPEED: f64 = 80.0;
/// Condition categories that always raise an alert
pub const SEVERE_CONDITIONS: [&str; 3] = ["Thunderstorm", "Tornado", "Hurricane"];

/// Alert raised by a snapshot
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WeatherAlert {
    /// Temperature outside the safe range
    ExtremeTemperature {
        /// Observed temperature in °C, as reported
        temperature: Number,
    },
    /// Wind speed above the limit
    HighWind {
        /// Observed wind speed, as reported
        speed: Number,
    },
    /// Severe weather condition
    SevereWeather {
        /// Condition category, e.g. `Tornado`
        condition: String,
    },
}

impl WeatherAlert {
    /// Message body published to the topic
    ///
    /// Readings keep the form they were reported in, so a float `-15.0` renders as
    /// `-15.0°C` and an integer `45` as `45°C`.
    #[must_use]
    pub fn message(&self, city: &str) -> String {
        match self {
            Self::ExtremeTemperature { temperature } => {
                format!("⚠️ Extreme Temperature Alert: {temperature}°C in {city}!")
            }
            Self::HighWind { speed } => {
                format!("🌪️ High Wind Speed Alert: {speed} km/h in {city}!")
            }
            Self::SevereWeather { condition } => {
                format!("⛈️ Severe Weather Alert: {condition} in {city}!")
            }
        }
    }

    /// Subject line published with the message
    #[must_use]
    pub fn subject(city: &str) -> String {
        format!("Weather Alert for {city}")
    }
}

/// Fields of a snapshot the rules look at
#[derive(Debug, Clone, PartialEq)]
pub struct Readings {
    /// `main.temp`
    pub temperature: Number,
    /// `wind.speed`
    pub wind_speed: Number,
    /// `weather[0].main`
    pub condition: String,
}

impl Readings {
    /// Extracts the readings from an upstream weather payload
    ///
    /// # Errors
    ///
    /// Returns `AlertError::InvalidSnapshot` if a field is missing or has the wrong type
    pub fn from_snapshot(snapshot: &Value) -> AlertResult<Self> {
        let number = |pointer: &str, field: &str| {
            snapshot
                .pointer(pointer)
                .and_then(Value::as_number)
                .filter(|number| number.as_f64().is_some())
                .cloned()
                .ok_or_else(|| AlertError::InvalidSnapshot(format!("missing numeric `{field}`")))
        };

        let condition = snapshot
            .pointer("/weather/0/main")
            .and_then(Value::as_str)
            .ok_or_else(|| AlertError::InvalidSnapshot("missing `weather[0].main`".to_string()))?;

        Ok(Self {
            temperature: number("/main/temp", "main.temp")?,
            wind_speed: number("/wind/speed", "wind.speed")?,
            condition: condition.to_string(),
        })
    }

    /// First rule matched by the readings, if any
    #[must_use]
    pub fn evaluate(&self) -> Option<WeatherAlert> {
        let extreme_temperature = self
            .temperature
            .as_f64()
            .is_some_and(|temp| !(MIN_TEMPERATURE..=MAX_TEMPERATURE).contains(&temp));
        let high_wind = self
            .wind_speed
            .as_f64()
            .is_some_and(|speed| speed > MAX_WIND_SPEED);

        if extreme_temperature {
            Some(WeatherAlert::ExtremeTemperature {
                temperature: self.temperature.clone(),
            })
        } else if high_wind {
            Some(WeatherAlert::HighWind {
                speed: self.wind_speed.clone(),
            })
        } else if SEVERE_CONDITIONS.contains(&self.condition.as_str()) {
            Some(WeatherAlert::SevereWeather {
                condition: self.condition.clone(),
            })
        } else {
            None
        }
    }
}

/// Evaluates an upstream weather payload against the threshold rules
///
/// # Errors
///
/// Returns `AlertError::InvalidSnapshot` if a field the rules need is missing
pub fn evaluate_snapshot(snapshot: &Value) -> AlertResult<Option<WeatherAlert>> {
    Readings::from_snapshot(snapshot).map(|readings| readings.evaluate())
}
