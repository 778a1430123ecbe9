//! Search orchestration and the state container the UI renders from.
//!
//! Every search or clear starts a new generation. A finished lookup only
//! publishes (and persists) its result if its generation is still the latest,
//! so overlapping searches resolve to the most recently issued one.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::{
    config::ForecastFailurePolicy,
    forecast::daily_noon,
    model::{CurrentConditions, PlaceQuery, QueryResult, ViewState},
    provider::{CurrentLookup, WeatherProvider},
    store::LastQuery,
};

#[derive(Debug)]
pub struct QueryOrchestrator {
    provider: Arc<dyn WeatherProvider>,
    last_query: LastQuery,
    policy: ForecastFailurePolicy,
    state: watch::Sender<ViewState>,
}

impl QueryOrchestrator {
    pub fn new(provider: Arc<dyn WeatherProvider>, last_query: LastQuery) -> Self {
        let (state, _) = watch::channel(ViewState::default());
        Self {
            provider,
            last_query,
            policy: ForecastFailurePolicy::default(),
            state,
        }
    }

    pub fn with_policy(mut self, policy: ForecastFailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn subscribe(&self) -> watch::Receiver<ViewState> {
        self.state.subscribe()
    }

    /// Current state snapshot.
    pub fn state(&self) -> ViewState {
        self.state.borrow().clone()
    }

    pub fn last_query(&self) -> &LastQuery {
        &self.last_query
    }

    /// Handle raw search input. Blank input clears the result instead of fetching.
    pub async fn search(&self, input: &str) -> Option<QueryResult> {
        match PlaceQuery::parse(input) {
            Ok(place) => Some(self.fetch(place).await),
            Err(_) => {
                self.clear();
                None
            }
        }
    }

    /// Back to the untouched placeholder; any in-flight lookup is superseded.
    pub fn clear(&self) {
        self.state.send_modify(|s| {
            s.generation += 1;
            s.result = None;
            s.has_searched = false;
        });
    }

    /// Look up `place`, passing through `Pending`.
    pub async fn fetch(&self, place: PlaceQuery) -> QueryResult {
        let generation = self.begin(QueryResult::Pending);
        self.run(generation, place).await
    }

    /// Replay the persisted last query, once at startup.
    ///
    /// The stored snapshot (if any) is shown immediately and stays visible
    /// while a live lookup for the stored place refreshes it. Returns `None`
    /// when nothing was ever saved; no network call is made then.
    pub async fn restore_last_query(&self) -> Option<QueryResult> {
        let place = self.last_query.load_last_place()?;

        let generation = match self.last_query.load_snapshot() {
            Some(conditions) => {
                debug!(place = %place, "showing cached snapshot");
                self.begin(QueryResult::Found {
                    conditions,
                    forecast: Vec::new(),
                })
            }
            None => self.begin(QueryResult::Pending),
        };

        Some(self.run(generation, place).await)
    }

    /// Start a new generation and show `shown` until it resolves.
    fn begin(&self, shown: QueryResult) -> u64 {
        let mut generation = 0;
        self.state.send_modify(|s| {
            s.generation += 1;
            generation = s.generation;
            if shown.is_found() {
                s.has_searched = true;
            }
            s.result = Some(shown);
        });
        generation
    }

    async fn run(&self, generation: u64, place: PlaceQuery) -> QueryResult {
        let (result, snapshot) = self.lookup(&place).await;

        if !self.apply(generation, &place, &result, snapshot.as_ref()) {
            debug!(place = %place, generation, "discarding superseded result");
        }

        result
    }

    /// The result to show, plus the conditions to persist whenever the
    /// current-conditions lookup itself succeeded.
    async fn lookup(&self, place: &PlaceQuery) -> (QueryResult, Option<CurrentConditions>) {
        let conditions = match self.provider.current(place).await {
            Ok(CurrentLookup::Found(conditions)) => conditions,
            Ok(CurrentLookup::NotFound { code }) => {
                info!(place = %place, code, "place not found");
                return (QueryResult::NotFound, None);
            }
            Err(e) => {
                warn!(error = %e, place = %place, "current conditions lookup failed");
                return (QueryResult::NotFound, None);
            }
        };

        let forecast = match self.provider.forecast(place).await {
            Ok(samples) => daily_noon(samples),
            Err(e) => {
                warn!(
                    error = %e,
                    place = %place,
                    policy = ?self.policy,
                    "forecast lookup failed"
                );
                match self.policy {
                    ForecastFailurePolicy::Partial => Vec::new(),
                    ForecastFailurePolicy::NotFound => {
                        return (QueryResult::NotFound, Some(conditions));
                    }
                }
            }
        };

        info!(place = %place, days = forecast.len(), "weather found");
        let snapshot = conditions.clone();
        (QueryResult::Found { conditions, forecast }, Some(snapshot))
    }

    /// Publish `result` and persist `snapshot` if `generation` is still current.
    ///
    /// Both happen under the state channel's lock, so no newer search or clear
    /// can start between the generation check and the save.
    fn apply(
        &self,
        generation: u64,
        place: &PlaceQuery,
        result: &QueryResult,
        snapshot: Option<&CurrentConditions>,
    ) -> bool {
        self.state.send_if_modified(|s| {
            if s.generation != generation {
                return false;
            }
            if let Some(conditions) = snapshot {
                self.last_query.save(place, conditions);
            }
            s.result = Some(result.clone());
            s.has_searched = true;
            true
        })
    }
}
