//! Weather wrapper tools (weatherapi.com) plus an IP-geolocation lookup
//! (ipinfo.io) for queries that name no location.

use async_trait::async_trait;
use chrono::{Local, NaiveDate};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use crate::util::http;

use super::Tool;

const WEATHER_API_BASE: &str = "http://api.weatherapi.com/v1";
const IPINFO_URL: &str = "https://ipinfo.io/";

/// weatherapi.com client holding the injected API key.
pub struct WeatherClient {
    api_key: String,
}

impl WeatherClient {
    pub fn new(api_key: String) -> Self {
        Self { api_key }
    }

    async fn get(&self, endpoint: &str, query: &[(&str, &str)]) -> anyhow::Result<Value> {
        debug!(endpoint, "Weather API GET");
        let response = http::client()
            .get(format!("{WEATHER_API_BASE}/{endpoint}"))
            .query(&[("key", self.api_key.as_str())])
            .query(query)
            .query(&[("aqi", "no")])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Weather API returned {status}: {body}");
        }
        Ok(response.json().await?)
    }
}

// ====== JSON -> text reshaping ======

fn text(v: &Value) -> &str {
    v.as_str().unwrap_or("?")
}

fn format_current(data: &Value) -> String {
    let current = &data["current"];
    let location = &data["location"];

    format!(
        "Current Weather in {}, {}:\n\
         Temperature: {}°C (Feels like {}°C)\n\
         Condition: {}\n\
         Humidity: {}%\n\
         Wind: {} km/h {} (Gusts up to {} km/h)\n\
         Visibility: {} km\n\
         UV Index: {}\n\
         Precipitation: {} mm",
        text(&location["name"]),
        text(&location["country"]),
        current["temp_c"],
        current["feelslike_c"],
        text(&current["condition"]["text"]),
        current["humidity"],
        current["wind_kph"],
        text(&current["wind_dir"]),
        current["gust_kph"],
        current["vis_km"],
        current["uv"],
        current["precip_mm"],
    )
}

fn format_forecast(location: &str, forecast_day: &Value) -> String {
    let day = &forecast_day["day"];
    let astro = &forecast_day["astro"];

    // Every third hour is enough of a skyline for an agent reply
    let hours: Vec<String> = forecast_day["hour"]
        .as_array()
        .into_iter()
        .flatten()
        .step_by(3)
        .map(|hour| {
            let time_of_day = text(&hour["time"]).split_whitespace().last().unwrap_or("?");
            format!(
                "{}: {}°C, {}, Rain Chance: {}%, Wind: {} km/h",
                time_of_day,
                hour["temp_c"],
                text(&hour["condition"]["text"]),
                hour["chance_of_rain"],
                hour["wind_kph"],
            )
        })
        .collect();

    format!(
        "Weather Forecast for {} on {}:\n\
         Day Condition: {}\n\
         Max Temperature: {}°C\n\
         Min Temperature: {}°C\n\
         Average Temperature: {}°C\n\
         Chance of Rain: {}%\n\
         Total Precipitation: {} mm\n\
         Max Wind Speed: {} km/h\n\
         Sunrise: {}\n\
         Sunset: {}\n\
         Moon Phase: {}\n\n\
         Hourly Forecast Highlights:\n{}",
        location,
        text(&forecast_day["date"]),
        text(&day["condition"]["text"]),
        day["maxtemp_c"],
        day["mintemp_c"],
        day["avgtemp_c"],
        day["daily_chance_of_rain"],
        day["totalprecip_mm"],
        day["maxwind_kph"],
        text(&astro["sunrise"]),
        text(&astro["sunset"]),
        text(&astro["moon_phase"]),
        hours.join("\n"),
    )
}

/// How many forecast days to request so the wanted date is covered; past
/// dates mirror into the future the same way the distance math always has.
fn forecast_days(date: Option<NaiveDate>, today: NaiveDate) -> i64 {
    match date {
        Some(d) => (d - today).num_days().abs() + 1,
        None => 3,
    }
}

/// Pick the forecast day matching `date`, falling back to the first one.
fn select_forecast_day<'a>(data: &'a Value, date: Option<&str>) -> Option<&'a Value> {
    let days = data["forecast"]["forecastday"].as_array()?;
    if let Some(wanted) = date {
        if let Some(day) = days.iter().find(|d| d["date"].as_str() == Some(wanted)) {
            return Some(day);
        }
    }
    days.first()
}

// ====== Tools ======

/// Current conditions for a location.
pub struct CurrentWeatherTool {
    client: Arc<WeatherClient>,
}

impl CurrentWeatherTool {
    pub fn new(client: Arc<WeatherClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for CurrentWeatherTool {
    fn name(&self) -> &str {
        "weather_current"
    }

    fn description(&self) -> &str {
        "Get detailed current weather conditions for a city."
    }

    fn parameters(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "location": {"type": "string", "description": "City name, e.g. 'Lisbon'"}
            },
            "required": ["location"]
        })
    }

    async fn execute(&self, params: HashMap<String, serde_json::Value>) -> String {
        let location = match params.get("location").and_then(|v| v.as_str()) {
            Some(l) => l,
            None => return "Error: 'location' parameter is required".to_string(),
        };

        match self.client.get("current.json", &[("q", location)]).await {
            Ok(data) => format_current(&data),
            Err(e) => format!("Error fetching current weather: {e}"),
        }
    }
}

/// Multi-day forecast for a location, optionally pinned to a date.
pub struct ForecastTool {
    client: Arc<WeatherClient>,
}

impl ForecastTool {
    pub fn new(client: Arc<WeatherClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for ForecastTool {
    fn name(&self) -> &str {
        "weather_forecast"
    }

    fn description(&self) -> &str {
        "Get the weather forecast for a city, optionally for a specific date (YYYY-MM-DD)."
    }

    fn parameters(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "location": {"type": "string", "description": "City name, e.g. 'Lisbon'"},
                "date": {"type": "string", "description": "Date to forecast (YYYY-MM-DD); defaults to the next days"}
            },
            "required": ["location"]
        })
    }

    async fn execute(&self, params: HashMap<String, serde_json::Value>) -> String {
        let location = match params.get("location").and_then(|v| v.as_str()) {
            Some(l) => l,
            None => return "Error: 'location' parameter is required".to_string(),
        };

        let date = params.get("date").and_then(|v| v.as_str());
        let parsed_date = match date {
            Some(raw) => match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
                Ok(d) => Some(d),
                Err(_) => return format!("Error: invalid date '{raw}' (expected YYYY-MM-DD)"),
            },
            None => None,
        };

        let days = forecast_days(parsed_date, Local::now().date_naive()).to_string();
        let data = match self
            .client
            .get("forecast.json", &[("q", location), ("days", &days)])
            .await
        {
            Ok(data) => data,
            Err(e) => return format!("Error fetching weather forecast: {e}"),
        };

        match select_forecast_day(&data, date) {
            Some(day) => format_forecast(location, day),
            None => format!("Error fetching weather forecast: no forecast data for {location}"),
        }
    }
}

/// Resolve the caller's own location from their public IP.
pub struct LocateTool;

#[async_trait]
impl Tool for LocateTool {
    fn name(&self) -> &str {
        "locate"
    }

    fn description(&self) -> &str {
        "Look up the user's current city, region and country from their IP address. Use when a query names no location."
    }

    fn parameters(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {}
        })
    }

    async fn execute(&self, _params: HashMap<String, serde_json::Value>) -> String {
        debug!("IP geolocation lookup");
        let result = async {
            let response = http::client()
                .get(IPINFO_URL)
                .header("Accept", "application/json")
                .send()
                .await?;
            let data: Value = response.error_for_status()?.json().await?;
            anyhow::Ok(data)
        }
        .await;

        match result {
            Ok(data) => format!(
                "Current location: {}, {}, {}",
                text(&data["city"]),
                text(&data["region"]),
                text(&data["country"]),
            ),
            Err(e) => format!("Error fetching location: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_current() -> Value {
        json!({
            "location": {"name": "Lisbon", "country": "Portugal"},
            "current": {
                "temp_c": 28.5, "feelslike_c": 30.1,
                "condition": {"text": "Sunny"},
                "humidity": 48,
                "wind_kph": 14.0, "wind_dir": "NW", "gust_kph": 22.3,
                "vis_km": 10.0, "uv": 7.0, "precip_mm": 0.0
            }
        })
    }

    #[test]
    fn test_format_current() {
        let out = format_current(&sample_current());
        assert!(out.starts_with("Current Weather in Lisbon, Portugal:"));
        assert!(out.contains("Temperature: 28.5°C (Feels like 30.1°C)"));
        assert!(out.contains("Condition: Sunny"));
        assert!(out.contains("Humidity: 48%"));
        assert!(out.contains("Wind: 14.0 km/h NW (Gusts up to 22.3 km/h)"));
        assert!(out.contains("Precipitation: 0.0 mm"));
    }

    fn sample_forecast_day() -> Value {
        json!({
            "date": "2026-08-07",
            "day": {
                "condition": {"text": "Partly cloudy"},
                "maxtemp_c": 29.0, "mintemp_c": 18.2, "avgtemp_c": 23.4,
                "daily_chance_of_rain": 10, "totalprecip_mm": 0.2,
                "maxwind_kph": 19.1
            },
            "astro": {
                "sunrise": "06:31 AM", "sunset": "08:42 PM", "moon_phase": "Waxing Crescent"
            },
            "hour": [
                {"time": "2026-08-07 00:00", "temp_c": 19.0, "condition": {"text": "Clear"}, "chance_of_rain": 0, "wind_kph": 8.0},
                {"time": "2026-08-07 01:00", "temp_c": 18.7, "condition": {"text": "Clear"}, "chance_of_rain": 0, "wind_kph": 7.9},
                {"time": "2026-08-07 02:00", "temp_c": 18.5, "condition": {"text": "Clear"}, "chance_of_rain": 0, "wind_kph": 7.6},
                {"time": "2026-08-07 03:00", "temp_c": 18.2, "condition": {"text": "Clear"}, "chance_of_rain": 0, "wind_kph": 7.2}
            ]
        })
    }

    #[test]
    fn test_format_forecast() {
        let out = format_forecast("Lisbon", &sample_forecast_day());
        assert!(out.starts_with("Weather Forecast for Lisbon on 2026-08-07:"));
        assert!(out.contains("Day Condition: Partly cloudy"));
        assert!(out.contains("Max Temperature: 29.0°C"));
        assert!(out.contains("Sunrise: 06:31 AM"));
        assert!(out.contains("Moon Phase: Waxing Crescent"));
        // Every third hour: 00:00 and 03:00, not 01:00
        assert!(out.contains("00:00: 19.0°C, Clear"));
        assert!(out.contains("03:00: 18.2°C, Clear"));
        assert!(!out.contains("01:00:"));
    }

    #[test]
    fn test_forecast_days() {
        let today = NaiveDate::from_ymd_opt(2026, 8, 6).unwrap();
        assert_eq!(forecast_days(None, today), 3);
        assert_eq!(forecast_days(Some(today), today), 1);
        let in_two = NaiveDate::from_ymd_opt(2026, 8, 8).unwrap();
        assert_eq!(forecast_days(Some(in_two), today), 3);
        // Past dates keep the +1 distance semantics
        let yesterday = NaiveDate::from_ymd_opt(2026, 8, 5).unwrap();
        assert_eq!(forecast_days(Some(yesterday), today), 2);
    }

    #[test]
    fn test_select_forecast_day() {
        let data = json!({
            "forecast": {"forecastday": [
                {"date": "2026-08-07"},
                {"date": "2026-08-08"}
            ]}
        });
        let day = select_forecast_day(&data, Some("2026-08-08")).unwrap();
        assert_eq!(day["date"], "2026-08-08");

        // Unknown dates fall back to the first day
        let day = select_forecast_day(&data, Some("2026-09-01")).unwrap();
        assert_eq!(day["date"], "2026-08-07");

        let day = select_forecast_day(&data, None).unwrap();
        assert_eq!(day["date"], "2026-08-07");

        assert!(select_forecast_day(&json!({}), None).is_none());
    }

    #[tokio::test]
    async fn test_current_tool_requires_location() {
        let tool = CurrentWeatherTool::new(Arc::new(WeatherClient::new(String::new())));
        let out = tool.execute(HashMap::new()).await;
        assert_eq!(out, "Error: 'location' parameter is required");
    }
}
