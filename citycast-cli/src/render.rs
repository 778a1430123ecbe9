use chrono::NaiveDate;
use citycast_core::{CurrentConditions, ForecastEntry, QueryResult};
use std::fmt::Write;

/// Text for the current result; `None` is the pre-search placeholder.
pub fn render(result: Option<&QueryResult>, today: NaiveDate) -> String {
    match result {
        None => message("Search City", "Find out the weather conditions of the city"),
        Some(QueryResult::Pending) => "Loading...\n".to_string(),
        Some(QueryResult::NotFound) => {
            message("Not Found", "Find out the weather conditions of the city")
        }
        Some(QueryResult::Found { conditions, forecast }) => card(conditions, forecast, today),
    }
}

fn message(title: &str, hint: &str) -> String {
    format!("{title}\n  {hint}\n")
}

fn card(conditions: &CurrentConditions, forecast: &[ForecastEntry], today: NaiveDate) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "{}  ({})", conditions.location_name, today.format("%A, %-d %b"));
    let _ = writeln!(out, "  {}°C  {}", conditions.rounded_temperature(), conditions.condition);
    let _ = writeln!(out, "  Humidity    {}%", conditions.humidity_pct);
    let _ = writeln!(out, "  Wind Speed  {} m/s", conditions.wind_speed_mps);

    if !forecast.is_empty() {
        let _ = writeln!(out);
        for entry in forecast {
            let _ = writeln!(
                out,
                "  {:<7} {:<12} {}°C",
                entry.day_label(),
                entry.condition,
                entry.rounded_temperature()
            );
        }
    }

    out
}
