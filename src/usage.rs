//! Site-level figures derived from meter readings: solar production, gross and net electric
//! usage, and what the production is worth in avoided emissions and everyday equivalents.
//!
//! Current figures are power (kW) taken from the meters' `KW` field. Daily figures are energy
//! (kWh) taken from the difference of the meters' `KWHdel` register over the day; a site
//! without a production meter falls back to the `ProdKWH` of its summary device.

use crate::catalog::Catalog;
use crate::model::{DeviceCode, FieldSpec, Function, Reading, SiteId};
use crate::settings::Factors;

use std::collections::BTreeMap;
use std::fmt;

pub const POWER_FIELD: &str = "KW";
pub const ENERGY_FIELD: &str = "KWHdel";
pub const SUMMARY_PRODUCTION_FIELD: &str = "ProdKWH";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    SolarProduction,
    GrossElectricUsage,
    NetElectricUsage,
    Co2,
    So2,
    Nox,
    Cars,
    Homes,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::SolarProduction => "solar_production",
            Category::GrossElectricUsage => "gross_electric_usage",
            Category::NetElectricUsage => "net_electric_usage",
            Category::Co2 => "co2",
            Category::So2 => "so2",
            Category::Nox => "nox",
            Category::Cars => "cars",
            Category::Homes => "homes",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SiteFigure {
    pub site_id: SiteId,
    pub category: Category,
    pub value: f64,
}

#[derive(Debug, Default)]
struct Totals {
    production: Option<f64>,
    consumption: Option<f64>,
    summary_production: Option<f64>,
}

fn add(total: &mut Option<f64>, value: f64) {
    *total = Some(total.unwrap_or(0.0) + value);
}

fn totals(
    catalog: &Catalog,
    readings: &[Reading],
    meter_field: &str,
    summary_field: Option<&str>,
) -> BTreeMap<SiteId, Totals> {
    let mut totals: BTreeMap<SiteId, Totals> = BTreeMap::new();

    for reading in readings {
        let device = match catalog.device(reading.hid) {
            Some(device) => device,
            None => continue,
        };
        let site = totals.entry(reading.site_id).or_default();
        let field = reading.field_name.as_str();

        match device.device_code {
            DeviceCode::ProductionMeter if field == meter_field => {
                add(&mut site.production, reading.value)
            }
            DeviceCode::ConsumptionMeter if field == meter_field => {
                add(&mut site.consumption, reading.value)
            }
            DeviceCode::SiteSummary if Some(field) == summary_field => {
                add(&mut site.summary_production, reading.value)
            }
            _ => {}
        }
    }

    totals
}

fn site_figures(site_id: SiteId, totals: &Totals, factors: &Factors) -> Vec<SiteFigure> {
    let figure = |category, value| SiteFigure {
        site_id,
        category,
        value,
    };
    let production = totals.production.or(totals.summary_production);
    let mut figures = Vec::new();

    if let Some(production) = production {
        figures.push(figure(Category::SolarProduction, production));
        figures.push(figure(Category::Co2, production * factors.co2));
        figures.push(figure(Category::So2, production * factors.so2));
        figures.push(figure(Category::Nox, production * factors.nox));
        figures.push(figure(Category::Cars, production * factors.cars));
        figures.push(figure(Category::Homes, production * factors.homes));
    }
    if let Some(consumption) = totals.consumption {
        figures.push(figure(Category::GrossElectricUsage, consumption));
        figures.push(figure(
            Category::NetElectricUsage,
            consumption - production.unwrap_or(0.0),
        ));
    }

    figures
}

fn figures(
    catalog: &Catalog,
    readings: &[Reading],
    factors: &Factors,
    meter_field: &str,
    summary_field: Option<&str>,
) -> Vec<SiteFigure> {
    totals(catalog, readings, meter_field, summary_field)
        .iter()
        .flat_map(|(site_id, totals)| site_figures(*site_id, totals, factors))
        .collect()
}

/// Power figures from the readings of a current-data cycle.
pub fn current_figures(catalog: &Catalog, readings: &[Reading], factors: &Factors) -> Vec<SiteFigure> {
    figures(catalog, readings, factors, POWER_FIELD, None)
}

/// Energy figures from the readings of a daily cycle.
pub fn daily_figures(catalog: &Catalog, readings: &[Reading], factors: &Factors) -> Vec<SiteFigure> {
    figures(
        catalog,
        readings,
        factors,
        ENERGY_FIELD,
        Some(SUMMARY_PRODUCTION_FIELD),
    )
}

/// Daily energy requests for the production and consumption meters of `site_id`.
pub fn meter_energy_specs(catalog: &Catalog, site_id: SiteId) -> Vec<FieldSpec> {
    catalog
        .site_devices(site_id)
        .filter(|device| {
            matches!(
                device.device_code,
                DeviceCode::ProductionMeter | DeviceCode::ConsumptionMeter
            )
        })
        .filter(|device| device.field(ENERGY_FIELD).is_some())
        .map(|device| FieldSpec::new(device.hid(), ENERGY_FIELD, Function::Diff))
        .collect()
}
