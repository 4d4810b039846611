use atlas_base::DecisionHook;
use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::{Value, json};

use super::http::{client, get_json, urlenc};
use super::{Tool, ToolError, str_arg};

const GEOCODING_URL: &str = "https://geocoding-api.open-meteo.com/v1/search";
const FORECAST_URL: &str = "https://api.open-meteo.com/v1/forecast";
const DEFAULT_DAYS: u64 = 7;
const MAX_DAYS: u64 = 16;

#[derive(Debug, Deserialize)]
struct GeocodingResponse {
    #[serde(default)]
    results: Vec<Place>,
}

#[derive(Debug, Clone, Deserialize)]
struct Place {
    name: String,
    latitude: f64,
    longitude: f64,
    country: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    timezone: Option<String>,
    daily: Daily,
}

#[derive(Debug, Deserialize)]
struct Daily {
    time: Vec<String>,
    temperature_2m_max: Vec<Option<f64>>,
    temperature_2m_min: Vec<Option<f64>>,
    precipitation_sum: Vec<Option<f64>>,
    weather_code: Vec<Option<u32>>,
}

/// WMO weather interpretation code.
fn describe_code(code: u32) -> &'static str {
    match code {
        0 => "clear sky",
        1..=3 => "partly cloudy",
        45 | 48 => "fog",
        51..=57 => "drizzle",
        61..=67 => "rain",
        71..=77 => "snow",
        80..=82 => "rain showers",
        85 | 86 => "snow showers",
        95..=99 => "thunderstorm",
        _ => "unknown",
    }
}

fn fmt_num(v: Option<f64>, unit: &str) -> String {
    v.map_or_else(|| "n/a".to_string(), |v| format!("{:.1}{}", v, unit))
}

fn format_forecast(place: &Place, forecast: &ForecastResponse) -> String {
    let label = match &place.country {
        Some(c) => format!("{}, {}", place.name, c),
        None => place.name.clone(),
    };
    let mut out = format!(
        "Daily forecast for {} ({:.2}, {:.2}), timezone {}:",
        label,
        place.latitude,
        place.longitude,
        forecast.timezone.as_deref().unwrap_or("UTC")
    );
    let d = &forecast.daily;
    for (i, day) in d.time.iter().enumerate() {
        let at = |v: &Vec<Option<f64>>| v.get(i).copied().flatten();
        let sky = d.weather_code.get(i).copied().flatten().map_or("unknown", describe_code);
        out.push_str(&format!(
            "\n{}: {}, {} to {}, precipitation {}",
            day,
            sky,
            fmt_num(at(&d.temperature_2m_min), "°C"),
            fmt_num(at(&d.temperature_2m_max), "°C"),
            fmt_num(at(&d.precipitation_sum), " mm"),
        ));
    }
    out
}

/// Geocode a place name and fetch its daily forecast.
pub struct OpenMeteoTool {
    client: Client,
}

impl OpenMeteoTool {
    pub fn new(timeout_secs: u64) -> Result<Self, ToolError> {
        Ok(Self { client: client(timeout_secs)? })
    }

    fn geocode(&self, name: &str, country: Option<&str>) -> Result<Place, ToolError> {
        let url = format!("{}?name={}&count=5&language=en&format=json", GEOCODING_URL, urlenc(name));
        let resp: GeocodingResponse = get_json(&self.client, &url)?;
        let wanted = country.map(str::to_lowercase);
        let pick = resp
            .results
            .iter()
            .find(|p| match (&wanted, &p.country) {
                (Some(w), Some(c)) => c.to_lowercase() == *w,
                _ => true,
            })
            .or(resp.results.first())
            .cloned();
        pick.ok_or_else(|| ToolError::NotFound(name.to_string()))
    }
}

impl Tool for OpenMeteoTool {
    fn name(&self) -> &str {
        "OpenMeteo"
    }

    fn description(&self) -> &str {
        "Retrieve current, past, or future weather forecasts for a location."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "location_name": { "type": "string", "description": "City or place name" },
                "country": { "type": "string", "description": "Country name, to disambiguate the location" },
                "days": { "type": "integer", "minimum": 1, "maximum": MAX_DAYS, "description": "Number of forecast days" }
            },
            "required": ["location_name"]
        })
    }

    fn run(&self, input: &Value, _hook: &dyn DecisionHook) -> Result<String, ToolError> {
        let name = str_arg(input, "location_name")?;
        let country = input.get("country").and_then(Value::as_str).filter(|c| !c.trim().is_empty());
        let days = input.get("days").and_then(Value::as_u64).unwrap_or(DEFAULT_DAYS).clamp(1, MAX_DAYS);

        let place = self.geocode(name, country)?;
        let url = format!(
            "{}?latitude={}&longitude={}&daily=temperature_2m_max,temperature_2m_min,precipitation_sum,weather_code&timezone=auto&forecast_days={}",
            FORECAST_URL, place.latitude, place.longitude, days
        );
        let forecast: ForecastResponse = get_json(&self.client, &url)?;
        Ok(format_forecast(&place, &forecast))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weather_codes() {
        assert_eq!(describe_code(0), "clear sky");
        assert_eq!(describe_code(63), "rain");
        assert_eq!(describe_code(96), "thunderstorm");
        assert_eq!(describe_code(42), "unknown");
    }

    #[test]
    fn formats_daily_rows() {
        let place = Place { name: "Tokyo".into(), latitude: 35.6895, longitude: 139.6917, country: Some("Japan".into()) };
        let forecast: ForecastResponse = serde_json::from_str(
            r#"{"timezone":"Asia/Tokyo","daily":{
                "time":["2026-04-01","2026-04-02"],
                "temperature_2m_max":[18.4,null],
                "temperature_2m_min":[9.0,10.2],
                "precipitation_sum":[0.0,4.5],
                "weather_code":[1,61]}}"#,
        )
        .unwrap();
        let text = format_forecast(&place, &forecast);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Daily forecast for Tokyo, Japan (35.69, 139.69), timezone Asia/Tokyo:");
        assert_eq!(lines[1], "2026-04-01: partly cloudy, 9.0°C to 18.4°C, precipitation 0.0 mm");
        assert_eq!(lines[2], "2026-04-02: rain, 10.2°C to n/a, precipitation 4.5 mm");
    }

    #[test]
    fn geocoding_without_results() {
        let resp: GeocodingResponse = serde_json::from_str(r#"{"generationtime_ms":0.3}"#).unwrap();
        assert!(resp.results.is_empty());
    }
}
