use crate::{
    Config,
    model::{CurrentConditions, ForecastEntry, PlaceQuery},
    provider::openweather::OpenWeatherProvider,
};
use async_trait::async_trait;
use std::{fmt::Debug, sync::Arc};

pub mod openweather;

/// Outcome of a current-conditions lookup that reached the provider.
#[derive(Debug, Clone, PartialEq)]
pub enum CurrentLookup {
    Found(CurrentConditions),
    /// The provider answered with a non-200 envelope code.
    NotFound { code: u16 },
}

#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    #[error("request to {endpoint} failed: {source}")]
    Transport {
        endpoint: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("{endpoint} request failed with status {status}: {body}")]
    Status {
        endpoint: &'static str,
        status: u16,
        body: String,
    },
    #[error("malformed {endpoint} payload: {reason}")]
    Decode {
        endpoint: &'static str,
        reason: String,
    },
}

#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    async fn current(&self, place: &PlaceQuery) -> Result<CurrentLookup, LookupError>;

    /// Raw 3-hour samples, unfiltered.
    async fn forecast(&self, place: &PlaceQuery) -> Result<Vec<ForecastEntry>, LookupError>;
}

/// Construct the OpenWeather provider from config.
pub fn provider_from_config(config: &Config) -> anyhow::Result<Arc<dyn WeatherProvider>> {
    let api_key = config.resolve_api_key()?;
    let provider = OpenWeatherProvider::new(api_key).with_base_url(config.base_url());

    Ok(Arc::new(provider))
}
