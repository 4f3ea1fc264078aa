//! One polling cycle per cadence: log in, make sure a catalog is at hand, read, log out.
//!
//! Nothing is retried here. A failed cycle is surfaced to whoever scheduled it.

use crate::api::{self, Error};
use crate::catalog::{self, Catalog};
use crate::model::{Api, BinSize, FieldSpec, HardwareId, Reading, Session, SiteId};
use crate::readings;
use crate::settings::DailyField;
use crate::usage;

use chrono::NaiveDate;

/// A query the vendor or the catalog rejects only costs its own readings.
fn skip_rejected(
    site_id: SiteId,
    what: &str,
    result: Result<Vec<Reading>, Error>,
) -> Result<Vec<Reading>, Error> {
    match result {
        Err(Error::QueryError(e)) => {
            log::warn!("site {}: skipping {}: {}", site_id, what, e);
            Ok(Vec::new())
        }
        other => other,
    }
}

async fn catalog_or_fetch(session: &Session, cached: Option<Catalog>) -> Result<Catalog, Error> {
    match cached {
        Some(catalog) => Ok(catalog),
        None => catalog::fetch_catalog(session).await,
    }
}

/// Current values of every device of every site.
///
/// A site whose query the vendor rejects is skipped; any other failure ends the cycle.
pub async fn poll_current(session: &Session, catalog: &Catalog) -> Result<Vec<Reading>, Error> {
    let mut readings = Vec::new();

    for site in catalog.sites() {
        let hids: Vec<HardwareId> = catalog
            .site_devices(site.id)
            .filter(|device| !device.fields.is_empty())
            .map(|device| device.hid())
            .collect();

        let site_readings = skip_rejected(
            site.id,
            "current data",
            readings::get_current_data(session, catalog, &hids).await,
        )?;
        log::debug!("site {}: {} current readings", site.id, site_readings.len());
        readings.extend(site_readings);
    }

    Ok(readings)
}

/// Daily aggregates of `fields` on every site's summary device, plus the daily energy of its
/// production and consumption meters.
///
/// A field the vendor or the catalog rejects is skipped; any other failure ends the cycle.
pub async fn poll_daily(
    session: &Session,
    catalog: &Catalog,
    day: NaiveDate,
    fields: &[DailyField],
) -> Result<Vec<Reading>, Error> {
    let (from, to) = match (day.and_hms_opt(0, 0, 0), day.and_hms_opt(23, 59, 0)) {
        (Some(from), Some(to)) => (from, to),
        _ => return Err(Error::QueryError(format!("Invalid day: {}", day))),
    };
    let mut readings = Vec::new();

    for site in catalog.sites() {
        let summary = match catalog.summary_device(site.id) {
            Some(summary) => summary,
            None => {
                log::warn!("site {} has no summary device, skipping", site.id);
                continue;
            }
        };

        for field in fields {
            let spec = FieldSpec::new(summary.hid(), &field.field_name, field.function);
            readings.extend(skip_rejected(
                site.id,
                &field.field_name,
                readings::get_summary_data(session, catalog, BinSize::BinDay, from, to, &[spec])
                    .await,
            )?);
        }

        let meters = usage::meter_energy_specs(catalog, site.id);
        if !meters.is_empty() {
            readings.extend(skip_rejected(
                site.id,
                "meter energy",
                readings::get_summary_data(session, catalog, BinSize::BinDay, from, to, &meters)
                    .await,
            )?);
        }
    }

    Ok(readings)
}

/// Current-data cycle. Returns the catalog used so the caller can reuse it.
pub async fn current_cycle(
    api: &Api,
    cached: Option<Catalog>,
) -> Result<(Catalog, Vec<Reading>), Error> {
    let session = api::login(api).await?;

    let result: Result<_, Error> = async {
        let catalog = catalog_or_fetch(&session, cached).await?;
        let readings = poll_current(&session, &catalog).await?;
        Ok((catalog, readings))
    }
    .await;

    api::logout(session).await;

    if let Ok((_, readings)) = &result {
        log::info!("current cycle: {} readings", readings.len());
    }
    result
}

/// Daily-data cycle for `day`.
pub async fn daily_cycle(
    api: &Api,
    cached: Option<Catalog>,
    day: NaiveDate,
    fields: &[DailyField],
) -> Result<(Catalog, Vec<Reading>), Error> {
    let session = api::login(api).await?;

    let result: Result<_, Error> = async {
        let catalog = catalog_or_fetch(&session, cached).await?;
        let readings = poll_daily(&session, &catalog, day, fields).await?;
        Ok((catalog, readings))
    }
    .await;

    api::logout(session).await;

    if let Ok((_, readings)) = &result {
        log::info!("daily cycle for {}: {} readings", day, readings.len());
    }
    result
}

/// Log in, fetch the complete catalog, log out.
pub async fn dump_hardware(api: &Api) -> Result<Catalog, Error> {
    let session = api::login(api).await?;
    let result = catalog::fetch_catalog(&session).await;
    api::logout(session).await;
    result
}
