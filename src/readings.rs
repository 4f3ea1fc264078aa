use crate::api::response::data::{DataItem, DataResult};
use crate::api::soap::{Param, Request};
use crate::api::{self, operation, Error};
use crate::catalog::Catalog;
use crate::model::{BinSize, FieldSpec, Function, HardwareId, Reading, Session};
use crate::normalize;

use chrono::NaiveDateTime;
use std::collections::HashMap;

/// Width of the trailing window queried for current values.
const CURRENT_WINDOW_MINUTES: i64 = 15;

fn data_field(spec: &FieldSpec) -> Vec<(&'static str, Param)> {
    vec![
        ("HID", Param::Text(spec.hid.to_string())),
        ("FieldName", Param::Text(spec.field_name.clone())),
        ("Function", Param::Text(spec.function.to_string())),
    ]
}

fn data_request(
    session: &Session,
    operation: &'static operation::Operation,
    bin_size: BinSize,
    from: NaiveDateTime,
    to: NaiveDateTime,
    field_specs: &[FieldSpec],
) -> Request {
    let request = api::session_request(session, operation)
        .param("BinSize", bin_size)
        .param("FromLocal", api::format_local_time(from))
        .param("ToLocal", api::format_local_time(to));

    field_specs
        .iter()
        .fold(request, |request, spec| request.group("DataField", data_field(spec)))
}

fn reading(catalog: &Catalog, bin_size: BinSize, item: DataItem) -> Result<Option<Reading>, Error> {
    let value = match &item.value {
        Some(value) => value.trim(),
        None => {
            log::debug!("no value for {} of hardware {} at {}", item.field_name, item.hid, item.time);
            return Ok(None);
        }
    };

    let hid: HardwareId = item
        .hid
        .trim()
        .parse()
        .map_err(|_| Error::SchemaError(format!("Invalid HID: {:?}", item.hid)))?;
    let device = catalog
        .device(hid)
        .ok_or_else(|| Error::SchemaError(format!("Reading for unknown hardware {}", hid)))?;

    Ok(Some(Reading {
        hid,
        site_id: device.site_id,
        timestamp: api::parse_local_time(&item.time)
            .ok_or_else(|| Error::SchemaError(format!("Invalid time: {:?}", item.time)))?,
        bin_size,
        function: item.function.parse().map_err(Error::SchemaError)?,
        value: value
            .parse()
            .map_err(|_| Error::SchemaError(format!("Invalid value: {:?}", value)))?,
        field_name: item.field_name,
    }))
}

async fn fetch(
    session: &Session,
    catalog: &Catalog,
    request: &Request,
    bin_size: BinSize,
    field_specs: &[FieldSpec],
) -> Result<Vec<Reading>, Error> {
    let result: DataResult = api::decode(api::session_call(session, request).await?)?;
    api::check_code(request.operation(), result.code.as_deref())?;

    let mut readings = Vec::new();
    for item in normalize::normalize_list(result.items.and_then(|items| items.data_item)) {
        if let Some(reading) = reading(catalog, bin_size, item)? {
            let requested = field_specs
                .iter()
                .any(|spec| spec.hid == reading.hid && spec.field_name == reading.field_name);
            if !requested {
                return Err(Error::SchemaError(format!(
                    "Unrequested reading {} of hardware {}",
                    reading.field_name, reading.hid
                )));
            }
            readings.push(reading);
        }
    }
    Ok(readings)
}

fn check_window(from: NaiveDateTime, to: NaiveDateTime) -> Result<(), Error> {
    if from > to {
        Err(Error::QueryError(format!(
            "Invalid time window: {} is after {}",
            from, to
        )))
    } else {
        Ok(())
    }
}

/// Aggregated readings, one per bin per requested field.
///
/// The request is validated against the catalog before anything is sent: an inverted window,
/// an empty field list, or a field the target device does not declare is a `QueryError`.
pub async fn get_summary_data(
    session: &Session,
    catalog: &Catalog,
    bin_size: BinSize,
    from: NaiveDateTime,
    to: NaiveDateTime,
    field_specs: &[FieldSpec],
) -> Result<Vec<Reading>, Error> {
    check_window(from, to)?;
    if field_specs.is_empty() {
        return Err(Error::QueryError("No data fields requested".to_string()));
    }
    for spec in field_specs {
        catalog.field(spec.hid, &spec.field_name)?;
    }

    let request = data_request(
        session,
        operation::SUMMARY_DATA,
        bin_size,
        from,
        to,
        field_specs,
    );
    let readings = fetch(session, catalog, &request, bin_size, field_specs).await?;

    if let Some(bins) = bin_size.bins_covered(from, to) {
        let mut per_field: HashMap<(HardwareId, &str), u64> = HashMap::new();
        for reading in &readings {
            let count = per_field
                .entry((reading.hid, reading.field_name.as_str()))
                .or_insert(0);
            *count += 1;
            if *count > bins {
                return Err(Error::SchemaError(format!(
                    "More than {} {} readings for {} of hardware {}",
                    bins, bin_size, reading.field_name, reading.hid
                )));
            }
        }
    }

    Ok(readings)
}

/// Latest value of every declared field of `hids`, taken from the last quarter hour of
/// vendor time.
pub async fn get_current_data(
    session: &Session,
    catalog: &Catalog,
    hids: &[HardwareId],
) -> Result<Vec<Reading>, Error> {
    let mut field_specs = Vec::new();
    for hid in hids {
        let device = catalog
            .device(*hid)
            .ok_or_else(|| Error::QueryError(format!("Unknown hardware {}", hid)))?;
        field_specs.extend(
            device
                .fields
                .iter()
                .map(|field| FieldSpec::new(*hid, &field.name, Function::Last)),
        );
    }
    if field_specs.is_empty() {
        return Ok(Vec::new());
    }

    let to = api::get_timestamp(session).await?;
    let from = to - chrono::Duration::minutes(CURRENT_WINDOW_MINUTES);
    let request = data_request(
        session,
        operation::BIN_DATA,
        BinSize::Bin15Min,
        from,
        to,
        &field_specs,
    );

    let mut latest: HashMap<(HardwareId, String), Reading> = HashMap::new();
    for reading in fetch(session, catalog, &request, BinSize::Bin15Min, &field_specs).await? {
        let key = (reading.hid, reading.field_name.clone());
        let newer = latest
            .get(&key)
            .map_or(true, |known| known.timestamp < reading.timestamp);
        if newer {
            latest.insert(key, reading);
        }
    }

    /* keep request order */
    Ok(field_specs
        .iter()
        .filter_map(|spec| latest.remove(&(spec.hid, spec.field_name.clone())))
        .collect())
}
