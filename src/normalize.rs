//! Coerce the vendor's loosely typed results into the crate's model.
//!
//! Every list the vendor returns may arrive as nothing, as a bare object or as a list. Shapes
//! are resolved here, at the API boundary; everything past this module sees plain vectors.

use crate::api::response::hardware::HardwareComplete;
use crate::api::response::site_list::ListItem;
use crate::api::response::OneOrMany;
use crate::api::Error;
use crate::model::{Device, DeviceCode, FieldDefinition, Site};
use std::str::FromStr;

pub fn normalize_list<T>(raw: Option<OneOrMany<T>>) -> Vec<T> {
    raw.map(Vec::from).unwrap_or_default()
}

/// Always an ordered sequence; an absent field list is empty, never an error.
pub fn normalize_field_list(raw: Option<OneOrMany<FieldDefinition>>) -> Vec<FieldDefinition> {
    normalize_list(raw)
}

fn parse_number<T: FromStr>(what: &str, text: &str) -> Result<T, Error> {
    text.trim()
        .parse()
        .map_err(|_| Error::SchemaError(format!("Invalid {}: {:?}", what, text)))
}

fn normalize_device(raw: HardwareComplete) -> Result<Device, Error> {
    Ok(Device {
        hardware_id: parse_number("HardwareID", &raw.hardware_id)?,
        device_code: DeviceCode::from(raw.device_code.as_str()),
        device_type_id: parse_number("DeviceID", &raw.device_id)?,
        flags: match raw.flags {
            Some(flags) => parse_number("Flags", &flags)?,
            None => 0,
        },
        gateway_id: raw.gateway_id,
        name: raw.name,
        site_id: parse_number("SiteID", &raw.site_id)?,
        fields: normalize_field_list(raw.field_list.and_then(|list| list.field_info)),
    })
}

pub fn normalize_device_list(raw: Option<OneOrMany<HardwareComplete>>) -> Result<Vec<Device>, Error> {
    normalize_list(raw)
        .into_iter()
        .map(normalize_device)
        .collect()
}

pub fn normalize_site_list(raw: Option<OneOrMany<ListItem>>) -> Result<Vec<Site>, Error> {
    normalize_list(raw)
        .into_iter()
        .map(|item| {
            Ok(Site {
                id: parse_number("site ID", &item.id)?,
                name: item.name.unwrap_or_default(),
                type_code: item.site_type,
            })
        })
        .collect()
}
