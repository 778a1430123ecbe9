//! Core library for the `citycast` weather client.
//!
//! This crate defines:
//! - Configuration & credentials handling
//! - The weather provider abstraction and its OpenWeather implementation
//! - Shared domain models (place queries, conditions, forecast, view state)
//! - Persistence of the last successful query
//! - The query orchestrator that ties lookups, persistence and state together
//!
//! It is used by `citycast-cli`, but can also be reused by other front ends.

pub mod config;
pub mod forecast;
pub mod model;
pub mod orchestrator;
pub mod provider;
pub mod store;

pub use config::{Config, ForecastFailurePolicy};
pub use model::{CurrentConditions, ForecastEntry, PlaceQuery, QueryResult, ViewState};
pub use orchestrator::QueryOrchestrator;
pub use provider::{CurrentLookup, LookupError, WeatherProvider, provider_from_config};
pub use store::{FileStore, KeyValueStore, LastQuery, MemoryStore};

/// Build an orchestrator from config: OpenWeather provider plus on-disk last query.
pub fn orchestrator_from_config(config: &Config) -> anyhow::Result<QueryOrchestrator> {
    let provider = provider_from_config(config)?;
    let store = FileStore::new(config.state_dir()?);

    Ok(QueryOrchestrator::new(provider, LastQuery::new(store))
        .with_policy(config.on_forecast_failure))
}
