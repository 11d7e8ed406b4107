//! Ambient information module: current time and weather.

use async_trait::async_trait;
use chrono::{Datelike, FixedOffset, Timelike, Utc};
use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use valet_core::{CapabilityModule, HandlerResult, ModuleContext};
use valet_protocol::{Input, Permissions, ToolSchema};

const WEATHER_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_LOCATION: &str = "Davidson";
const DEFAULT_UNIT: &str = "celsius";

/// Answers time and weather questions, defaulting to the preferences stored
/// in bot memory.
#[derive(Debug, Default)]
pub struct AmbientModule {
    client: reqwest::Client,
}

impl AmbientModule {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    async fn current_weather(&self, ctx: &ModuleContext, input: &Input) -> serde_json::Value {
        let memory = ctx.memory();
        let location = input
            .param_str("location")
            .filter(|value| !value.is_empty())
            .map(str::to_string)
            .or_else(|| (!memory.city.is_empty()).then(|| memory.city.clone()))
            .unwrap_or_else(|| DEFAULT_LOCATION.to_string());
        let unit = input
            .param_str("unit")
            .filter(|value| !value.is_empty())
            .map(str::to_string)
            .or_else(|| {
                (!memory.temperature_unit.is_empty()).then(|| memory.temperature_unit.clone())
            })
            .unwrap_or_else(|| DEFAULT_UNIT.to_string());

        let Some(base_url) = ctx.setting("weather_base_url") else {
            return json!({"error": "weather service is not configured"});
        };
        let token = ctx.setting("weather_token").unwrap_or_default();
        let url = format!("{base_url}/data/2.5/weather?q={location}&appid={token}");

        let response = match self
            .client
            .get(url)
            .timeout(WEATHER_TIMEOUT)
            .send()
            .await
        {
            Ok(response) => response,
            Err(err) => {
                warn!("weather lookup failed (location={location}): {err}");
                return json!({"error": "could not access weather service"});
            }
        };

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return json!({"error": format!("could not find location '{location}'")});
        }
        if !response.status().is_success() {
            return json!({"error": format!("unexpected response status {}", response.status())});
        }

        let reading: WeatherResponse = match response.json().await {
            Ok(reading) => reading,
            Err(err) => {
                warn!("weather response unreadable (location={location}): {err}");
                return json!({"error": "weather service response is not formatted correctly"});
            }
        };
        let Some(element) = reading.weather.first() else {
            return json!({"error": "no weather elements available for location"});
        };

        let convert = |kelvin: f64| convert_kelvin(kelvin, &unit);
        json!(WeatherConditions {
            overview: element.main.clone(),
            description: element.description.clone(),
            temperature: convert(reading.main.temp),
            feels_like: convert(reading.main.feels_like),
            max_temperature: convert(reading.main.temp_max),
            min_temperature: convert(reading.main.temp_min),
            humidity_percent: reading.main.humidity,
            wind_speed: reading.wind.speed,
            cloud_cover_percent: reading.clouds.all,
        })
    }
}

#[async_trait]
impl CapabilityModule for AmbientModule {
    fn name(&self) -> &str {
        "ambient"
    }

    fn permissions(&self) -> Permissions {
        Permissions::PRIVATE_MODULES
    }

    fn schemas(&self) -> Vec<ToolSchema> {
        vec![
            ToolSchema::new(
                "get_current_time",
                "Get the current time in the user's timezone",
                json!({"type": "object", "properties": {}}),
            ),
            ToolSchema::new(
                "get_current_weather",
                "Get the current weather conditions for a location",
                json!({
                    "type": "object",
                    "properties": {
                        "location": {"type": "string", "description": "The city, ex: Raleigh"},
                        "unit": {"type": "string", "enum": ["celsius", "fahrenheit"]},
                    },
                }),
            ),
        ]
    }

    async fn handle(
        &self,
        function: &str,
        ctx: &ModuleContext,
        input: &Input,
    ) -> Option<HandlerResult> {
        match function {
            "get_current_time" => Some(HandlerResult::Data(current_time(&ctx.memory().timezone))),
            "get_current_weather" => {
                Some(HandlerResult::Data(self.current_weather(ctx, input).await))
            }
            _ => None,
        }
    }
}

/// Current wall-clock time in the stored timezone. An empty timezone means
/// UTC; named zones are not resolvable here, so anything that is not a
/// fixed offset comes back as an error payload.
fn current_time(timezone: &str) -> serde_json::Value {
    let offset = match parse_offset(timezone) {
        Some(offset) => offset,
        None => return json!({"error": "could not load timezone"}),
    };
    let now = Utc::now().with_timezone(&offset);
    json!({
        "year": now.year().to_string(),
        "month": now.month().to_string(),
        "day": now.day().to_string(),
        "weekday": now.weekday().to_string(),
        "hour": now.hour().to_string(),
        "minute": now.minute().to_string(),
        "second": now.second().to_string(),
        "timezone": timezone,
    })
}

/// Parse `""`, `"UTC"`, or a `±HH:MM` offset.
fn parse_offset(timezone: &str) -> Option<FixedOffset> {
    if timezone.is_empty() || timezone == "UTC" {
        return FixedOffset::east_opt(0);
    }
    let (sign, rest) = if let Some(rest) = timezone.strip_prefix('+') {
        (1, rest)
    } else if let Some(rest) = timezone.strip_prefix('-') {
        (-1, rest)
    } else {
        return None;
    };
    let (hours, minutes) = rest.split_once(':')?;
    let hours: i32 = hours.parse().ok()?;
    let minutes: i32 = minutes.parse().ok()?;
    if hours > 14 || minutes > 59 {
        return None;
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

fn convert_kelvin(kelvin: f64, unit: &str) -> f64 {
    if unit == "celsius" {
        kelvin - 273.15
    } else {
        (kelvin - 273.15) * 9.0 / 5.0 + 32.0
    }
}

#[derive(Debug, Deserialize)]
struct WeatherResponse {
    weather: Vec<WeatherElement>,
    main: WeatherMain,
    wind: Wind,
    clouds: Clouds,
}

#[derive(Debug, Deserialize)]
struct WeatherElement {
    main: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct WeatherMain {
    temp: f64,
    feels_like: f64,
    temp_min: f64,
    temp_max: f64,
    humidity: i64,
}

#[derive(Debug, Deserialize)]
struct Wind {
    speed: f64,
}

#[derive(Debug, Deserialize)]
struct Clouds {
    all: i64,
}

/// Condensed weather payload handed to the model.
#[derive(Debug, Serialize)]
struct WeatherConditions {
    overview: String,
    description: String,
    temperature: f64,
    feels_like: f64,
    max_temperature: f64,
    min_temperature: f64,
    humidity_percent: i64,
    wind_speed: f64,
    cloud_cover_percent: i64,
}

#[cfg(test)]
mod tests {
    use super::{AmbientModule, convert_kelvin, current_time, parse_offset};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::collections::HashMap;
    use valet_core::{CapabilityModule, HandlerResult, ModuleContext};
    use valet_protocol::{Input, Permissions};

    #[test]
    fn kelvin_conversion_matches_both_units() {
        assert_eq!(convert_kelvin(273.15, "celsius"), 0.0);
        assert_eq!(convert_kelvin(273.15, "fahrenheit"), 32.0);
    }

    #[test]
    fn offsets_parse_and_reject() {
        assert!(parse_offset("").is_some());
        assert!(parse_offset("UTC").is_some());
        assert!(parse_offset("+05:30").is_some());
        assert!(parse_offset("-04:00").is_some());
        assert!(parse_offset("America/New_York").is_none());
        assert!(parse_offset("+99:00").is_none());
    }

    #[test]
    fn unknown_timezone_is_a_payload_error() {
        let payload = current_time("Mars/Olympus");
        assert_eq!(payload, json!({"error": "could not load timezone"}));

        let payload = current_time("");
        assert!(payload.get("hour").is_some());
        assert!(payload.get("weekday").is_some());
    }

    #[tokio::test]
    async fn unconfigured_weather_service_is_a_payload_error() {
        let module = AmbientModule::new();
        let ctx = ModuleContext::detached(HashMap::new());
        let result = module
            .handle("get_current_weather", &ctx, &Input::new("", Permissions::ALL))
            .await
            .expect("claimed");
        assert_eq!(
            result,
            HandlerResult::Data(json!({"error": "weather service is not configured"}))
        );
    }
}
