use async_trait::async_trait;
use chrono::NaiveDateTime;
use reqwest::Client;
use serde::{Deserialize, de::DeserializeOwned};
use tracing::debug;

use crate::{
    model::{CurrentConditions, ForecastEntry, PlaceQuery},
    provider::{CurrentLookup, LookupError},
};

use super::WeatherProvider;

pub const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org/data/2.5";

const CURRENT: &str = "current weather";
const FORECAST: &str = "forecast";
const DT_TXT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone)]
pub struct OpenWeatherProvider {
    api_key: String,
    base_url: String,
    http: Client,
}

impl OpenWeatherProvider {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            http: Client::new(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// GET `{base_url}/{path}` for `place`, returning status and raw body.
    async fn get(
        &self,
        endpoint: &'static str,
        path: &str,
        place: &PlaceQuery,
    ) -> Result<(reqwest::StatusCode, String), LookupError> {
        let url = format!("{}/{}", self.base_url, path);
        debug!(%url, place = %place, "requesting {endpoint}");

        let res = self
            .http
            .get(&url)
            .query(&[
                ("q", place.as_str()),
                ("appid", self.api_key.as_str()),
                ("units", "metric"),
            ])
            .send()
            .await
            .map_err(|source| LookupError::Transport { endpoint, source })?;

        let status = res.status();
        let body = res.text().await.map_err(|source| LookupError::Transport { endpoint, source })?;

        Ok((status, body))
    }
}

/// `cod` is a number on `/weather` success and a string everywhere else.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OwCode {
    Number(u16),
    Text(String),
}

impl OwCode {
    fn value(&self) -> Option<u16> {
        match self {
            OwCode::Number(n) => Some(*n),
            OwCode::Text(s) => s.trim().parse().ok(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct OwEnvelope {
    cod: OwCode,
}

#[derive(Debug, Deserialize)]
struct OwMain {
    temp: f64,
    humidity: u8,
}

#[derive(Debug, Deserialize)]
struct OwWeather {
    main: String,
}

#[derive(Debug, Deserialize)]
struct OwWind {
    speed: f64,
}

#[derive(Debug, Deserialize)]
struct OwCurrentResponse {
    name: String,
    main: OwMain,
    weather: Vec<OwWeather>,
    wind: OwWind,
}

#[derive(Debug, Deserialize)]
struct OwForecastMain {
    temp: f64,
}

#[derive(Debug, Deserialize)]
struct OwForecastEntry {
    dt_txt: String,
    main: OwForecastMain,
    weather: Vec<OwWeather>,
}

#[derive(Debug, Deserialize)]
struct OwForecastResponse {
    list: Vec<OwForecastEntry>,
}

fn decode<T: DeserializeOwned>(endpoint: &'static str, body: &str) -> Result<T, LookupError> {
    serde_json::from_str(body).map_err(|e| LookupError::Decode {
        endpoint,
        reason: e.to_string(),
    })
}

fn primary_condition(
    endpoint: &'static str,
    weather: Vec<OwWeather>,
) -> Result<String, LookupError> {
    weather.into_iter().next().map(|w| w.main).ok_or_else(|| LookupError::Decode {
        endpoint,
        reason: "empty `weather` array".to_string(),
    })
}

/// Interpret a `/weather` response. A readable envelope with `cod != 200` is
/// "not found" regardless of the transport status; a 2xx body without a
/// numeric `cod` fails closed.
fn parse_current(status: reqwest::StatusCode, body: &str) -> Result<CurrentLookup, LookupError> {
    let envelope = match serde_json::from_str::<OwEnvelope>(body) {
        Ok(envelope) => envelope,
        Err(_) if !status.is_success() => {
            return Err(LookupError::Status {
                endpoint: CURRENT,
                status: status.as_u16(),
                body: truncate_body(body),
            });
        }
        Err(e) => {
            return Err(LookupError::Decode {
                endpoint: CURRENT,
                reason: e.to_string(),
            });
        }
    };

    match envelope.cod.value() {
        Some(200) => {}
        Some(code) => return Ok(CurrentLookup::NotFound { code }),
        None => {
            return Err(LookupError::Decode {
                endpoint: CURRENT,
                reason: "non-numeric `cod`".to_string(),
            });
        }
    }

    if !status.is_success() {
        return Err(LookupError::Status {
            endpoint: CURRENT,
            status: status.as_u16(),
            body: truncate_body(body),
        });
    }

    let parsed: OwCurrentResponse = decode(CURRENT, body)?;
    let condition = primary_condition(CURRENT, parsed.weather)?;

    Ok(CurrentLookup::Found(CurrentConditions {
        location_name: parsed.name,
        condition,
        temperature_c: parsed.main.temp,
        humidity_pct: parsed.main.humidity,
        wind_speed_mps: parsed.wind.speed,
    }))
}

fn parse_forecast(
    status: reqwest::StatusCode,
    body: &str,
) -> Result<Vec<ForecastEntry>, LookupError> {
    if !status.is_success() {
        return Err(LookupError::Status {
            endpoint: FORECAST,
            status: status.as_u16(),
            body: truncate_body(body),
        });
    }

    let envelope: OwEnvelope = decode(FORECAST, body)?;
    if envelope.cod.value() != Some(200) {
        return Err(LookupError::Status {
            endpoint: FORECAST,
            status: status.as_u16(),
            body: truncate_body(body),
        });
    }

    let parsed: OwForecastResponse = decode(FORECAST, body)?;

    parsed
        .list
        .into_iter()
        .map(|entry| {
            let timestamp = NaiveDateTime::parse_from_str(&entry.dt_txt, DT_TXT_FORMAT).map_err(
                |e| LookupError::Decode {
                    endpoint: FORECAST,
                    reason: format!("bad dt_txt {:?}: {e}", entry.dt_txt),
                },
            )?;

            Ok(ForecastEntry {
                timestamp,
                temperature_c: entry.main.temp,
                condition: primary_condition(FORECAST, entry.weather)?,
            })
        })
        .collect()
}

#[async_trait]
impl WeatherProvider for OpenWeatherProvider {
    async fn current(&self, place: &PlaceQuery) -> Result<CurrentLookup, LookupError> {
        let (status, body) = self.get(CURRENT, "weather", place).await?;
        parse_current(status, &body)
    }

    async fn forecast(&self, place: &PlaceQuery) -> Result<Vec<ForecastEntry>, LookupError> {
        let (status, body) = self.get(FORECAST, "forecast", place).await?;
        parse_forecast(status, &body)
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    const CAIRO: &str = r#"{
        "cod": 200,
        "name": "Cairo",
        "main": {"temp": 28.4, "humidity": 40, "pressure": 1012},
        "weather": [{"id": 800, "main": "Clear", "description": "clear sky"}],
        "wind": {"speed": 3.1, "deg": 20}
    }"#;

    #[test]
    fn parses_current_conditions() {
        let lookup = parse_current(StatusCode::OK, CAIRO).expect("valid payload");

        let CurrentLookup::Found(c) = &lookup else {
            panic!("expected Found, got {lookup:?}");
        };
        assert_eq!(c.location_name, "Cairo");
        assert_eq!(c.condition, "Clear");
        assert_eq!(c.temperature_c, 28.4);
        assert_eq!(c.humidity_pct, 40);
        assert_eq!(c.wind_speed_mps, 3.1);
    }

    #[test]
    fn string_404_envelope_is_not_found() {
        let body = r#"{"cod":"404","message":"city not found"}"#;
        let lookup = parse_current(StatusCode::NOT_FOUND, body).expect("readable envelope");

        assert_eq!(lookup, CurrentLookup::NotFound { code: 404 });
    }

    #[test]
    fn non_200_envelope_on_http_ok_is_not_found() {
        let body = r#"{"cod":401,"message":"Invalid API key"}"#;
        let lookup = parse_current(StatusCode::OK, body).expect("readable envelope");

        assert_eq!(lookup, CurrentLookup::NotFound { code: 401 });
    }

    #[test]
    fn missing_field_fails_closed() {
        let body = r#"{"cod":200,"name":"Cairo","main":{"temp":28.4},"weather":[{"main":"Clear"}],"wind":{"speed":3.1}}"#;
        let err = parse_current(StatusCode::OK, body).unwrap_err();

        assert!(matches!(err, LookupError::Decode { .. }), "{err}");
    }

    #[test]
    fn missing_cod_fails_closed() {
        let body = r#"{"name":"Cairo","main":{"temp":28.4,"humidity":40},"weather":[{"main":"Clear"}],"wind":{"speed":3.1}}"#;
        let err = parse_current(StatusCode::OK, body).unwrap_err();

        assert!(matches!(err, LookupError::Decode { .. }), "{err}");
        assert!(err.to_string().contains("cod"), "{err}");
    }

    #[test]
    fn empty_weather_array_fails_closed() {
        let body = r#"{"cod":200,"name":"Cairo","main":{"temp":28.4,"humidity":40},"weather":[],"wind":{"speed":3.1}}"#;
        let err = parse_current(StatusCode::OK, body).unwrap_err();

        assert!(err.to_string().contains("empty `weather` array"));
    }

    #[test]
    fn server_error_without_envelope_is_status_error() {
        let err = parse_current(StatusCode::BAD_GATEWAY, "<html>bad gateway</html>").unwrap_err();

        assert!(matches!(err, LookupError::Status { status: 502, .. }), "{err}");
    }

    #[test]
    fn parses_forecast_samples_in_order() {
        let body = r#"{
            "cod": "200",
            "cnt": 2,
            "list": [
                {"dt": 1, "dt_txt": "2026-10-15 09:00:00", "main": {"temp": 20.0}, "weather": [{"main": "Clouds"}]},
                {"dt": 2, "dt_txt": "2026-10-15 12:00:00", "main": {"temp": 24.6}, "weather": [{"main": "Clear"}]}
            ]
        }"#;

        let samples = parse_forecast(StatusCode::OK, body).expect("valid forecast");

        assert_eq!(samples.len(), 2);
        assert_eq!(samples[1].condition, "Clear");
        assert_eq!(samples[1].timestamp.to_string(), "2026-10-15 12:00:00");
    }

    #[test]
    fn malformed_dt_txt_fails_closed() {
        let body = r#"{"cod":"200","list":[{"dt_txt":"tomorrow noon","main":{"temp":1.0},"weather":[{"main":"Rain"}]}]}"#;
        let err = parse_forecast(StatusCode::OK, body).unwrap_err();

        assert!(err.to_string().contains("bad dt_txt"));
    }

    #[test]
    fn truncate_body_respects_char_boundaries() {
        let long = "é".repeat(300);
        let out = truncate_body(&long);

        assert!(out.ends_with("..."));
        assert_eq!(out.chars().count(), 203);
    }
}
