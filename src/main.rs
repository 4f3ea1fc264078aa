#[macro_use]
extern crate lazy_static;
#[macro_use]
extern crate prometheus;
#[macro_use]
extern crate rocket;

use alsoenergy_rs::model::Api;
use alsoenergy_rs::settings::{self, DailyField, Factors, Settings};
use alsoenergy_rs::{api, poller, usage, Catalog};
use chrono::{Duration, Local, NaiveDate};
use rocket::{Build, Rocket, State};
use std::sync::Mutex;
use std::time::Instant;

mod metrics;

/// Structure containing state for API handlers.
pub struct StateData {
    api: Api,
    interval: u64,
    catalog_interval: u64,
    daily_fields: Vec<DailyField>,
    factors: Factors,
    /// Timestamp of last successful current-data poll
    timestamp: Mutex<Option<Instant>>,
    /// Catalog of the last successful cycle, with the time it was fetched
    catalog: Mutex<Option<(Instant, Catalog)>>,
}

impl StateData {
    fn new(settings: Settings) -> Self {
        StateData {
            api: api::api(
                settings.api_url.clone(),
                settings.username.clone(),
                settings.password.clone(),
                settings.timeout(),
            ),
            interval: settings.interval,
            catalog_interval: settings.catalog_interval,
            daily_fields: settings.daily_fields,
            factors: settings.factors,
            timestamp: Mutex::new(None),
            catalog: Mutex::new(None),
        }
    }

    /// Updates `timestamp` to `now()`.
    fn touch(&self) {
        if let Ok(mut ts) = self.timestamp.lock() {
            *ts = Some(Instant::now());
        } else {
            log::trace!("Unable to lock timestamp mutex, will refresh again")
        }
    }

    /// Checks whether `interval_seconds` elapsed since last `touch()`
    fn interval_elapsed(&self, interval_secs: u64) -> bool {
        let elapsed_opt = self
            .timestamp
            .lock()
            .ok()
            .and_then(|a| a.map(|b| b.elapsed().as_secs()));

        if let Some(elapsed) = elapsed_opt {
            elapsed > interval_secs
        } else {
            /* If there is None timestamp/elapsed, always return true to trigger action */
            true
        }
    }

    /// Cached catalog, unless it is older than `catalog_interval` seconds.
    fn cached_catalog(&self) -> Option<Catalog> {
        self.catalog.lock().ok().and_then(|cached| match &*cached {
            Some((fetched, catalog)) if fetched.elapsed().as_secs() <= self.catalog_interval => {
                Some(catalog.clone())
            }
            _ => None,
        })
    }

    fn store_catalog(&self, catalog: &Catalog) {
        if let Ok(mut cached) = self.catalog.lock() {
            *cached = Some((Instant::now(), catalog.clone()));
        } else {
            log::trace!("Unable to lock catalog mutex, will fetch again")
        }
    }
}

#[get("/metrics")]
async fn metrics_route(state: &State<StateData>) -> Result<String, api::Error> {
    if state.interval_elapsed(state.interval) {
        let cached = state.cached_catalog();
        let refresh = cached.is_none();
        let (catalog, readings) = poller::current_cycle(&state.api, cached).await?;
        let figures = usage::current_figures(&catalog, &readings, &state.factors);
        metrics::record_current(&catalog, &readings, &figures);
        if refresh {
            state.store_catalog(&catalog);
        }
        state.touch();
    } else {
        log::info!("interval time not yet elapsed since last run; returning cached result")
    }
    metrics::read().await
}

#[get("/daily?<date>")]
async fn daily_route(state: &State<StateData>, date: Option<&str>) -> Result<String, api::Error> {
    let day = match date {
        Some(date) => NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .map_err(|e| api::Error::QueryError(format!("Invalid date {:?}: {}", date, e)))?,
        None => Local::now().date_naive() - Duration::days(1),
    };

    let cached = state.cached_catalog();
    let refresh = cached.is_none();
    let (catalog, readings) =
        poller::daily_cycle(&state.api, cached, day, &state.daily_fields).await?;
    let figures = usage::daily_figures(&catalog, &readings, &state.factors);
    metrics::record_daily(&readings, &figures);
    if refresh {
        state.store_catalog(&catalog);
    }

    metrics::read().await
}

#[get("/dump-hardware")]
async fn dump_hardware_route(state: &State<StateData>) -> Result<String, api::Error> {
    let catalog = poller::dump_hardware(&state.api).await?;
    state.store_catalog(&catalog);

    Ok(format!("{:#?}", catalog))
}

#[launch]
fn rocket() -> Rocket<Build> {
    env_logger::init();

    let settings = match settings::read_settings() {
        Ok(settings) => settings,
        Err(e) => {
            log::error!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };
    log::info!("polling {} as {}", settings.api_url, settings.username);

    rocket::build().manage(StateData::new(settings)).mount(
        "/",
        routes![metrics_route, daily_route, dump_hardware_route],
    )
}
