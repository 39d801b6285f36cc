//! Mock weather tool
//!
//! Reports a random temperature and sky condition for any city. The RNG can
//! be seeded so a session (or a test) replays the same forecasts.

use super::{FieldKind, ToolExecutionError, ToolExecutor, ToolOutput, ToolSchema, ValidatedInput};
use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use std::sync::{Mutex, PoisonError};

pub const CONDITIONS: [&str; 3] = ["sunny", "cloudy", "rainy"];
pub const TEMPERATURE_RANGE: RangeInclusive<i32> = 10..=39;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WeatherReport {
    pub city: String,
    pub temperature: i32,
    pub condition: &'static str,
}

impl WeatherReport {
    pub fn summary(&self) -> String {
        format!(
            "The weather in {} is {} with a temperature of {}°C.",
            self.city, self.condition, self.temperature
        )
    }
}

#[derive(Debug, Deserialize)]
struct WeatherInput {
    city: String,
}

pub struct WeatherTool {
    rng: Mutex<StdRng>,
}

impl WeatherTool {
    pub const NAME: &'static str = "getWeather";
    pub const DESCRIPTION: &'static str = "Get the current weather for a city";

    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    pub fn schema() -> ToolSchema {
        ToolSchema::new().required(
            "city",
            FieldKind::String,
            "The city to get the weather for",
        )
    }

    pub fn report(&self, city: &str) -> WeatherReport {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        let temperature = rng.gen_range(TEMPERATURE_RANGE);
        let condition = CONDITIONS.choose(&mut *rng).copied().unwrap_or(CONDITIONS[0]);
        WeatherReport {
            city: city.to_string(),
            temperature,
            condition,
        }
    }
}

impl Default for WeatherTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ToolExecutor for WeatherTool {
    async fn execute(&self, input: &ValidatedInput) -> Result<ToolOutput, ToolExecutionError> {
        let input: WeatherInput = input
            .parse()
            .map_err(|e| ToolExecutionError::failed(Self::NAME, e.to_string()))?;

        let report = self.report(&input.city);
        tracing::debug!(
            city = %report.city,
            temperature = report.temperature,
            condition = report.condition,
            "Weather reported"
        );
        Ok(ToolOutput::Text(report.summary()))
    }
}
