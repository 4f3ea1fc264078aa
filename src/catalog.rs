use crate::api::response::hardware::HardwareResult;
use crate::api::response::site_list::SiteListResult;
use crate::api::{self, operation, Error};
use crate::model::{Device, FieldDefinition, HardwareId, Session, Site, SiteId};
use crate::normalize;

use std::collections::HashSet;

/// All sites visible to the account, in vendor order.
pub async fn list_sites(session: &Session) -> Result<Vec<Site>, Error> {
    let request = api::session_request(session, operation::SITE_LIST);
    let result: SiteListResult = api::decode(api::session_call(session, &request).await?)?;
    api::check_code(operation::SITE_LIST, result.code.as_deref())?;

    normalize::normalize_site_list(result.items.and_then(|items| items.list_item))
}

async fn hardware(
    session: &Session,
    operation: &'static operation::Operation,
    site_id: SiteId,
) -> Result<Vec<Device>, Error> {
    let request = api::session_request(session, operation).param("SiteID", site_id);
    let result: HardwareResult = api::decode(api::session_call(session, &request).await?)?;
    api::check_code(operation, result.code.as_deref())?;

    let devices =
        normalize::normalize_device_list(result.hardware_list.and_then(|l| l.hardware_complete))?;

    /* readings are attributed through the catalog, so a foreign device is a broken response */
    match devices.iter().find(|device| device.site_id != site_id) {
        Some(device) => Err(Error::SchemaError(format!(
            "{} for site {} returned hardware {} of site {}",
            operation, site_id, device.hardware_id, device.site_id
        ))),
        None => Ok(devices),
    }
}

/// The synthetic per-site summary device(s).
pub async fn summary_hardware(session: &Session, site_id: SiteId) -> Result<Vec<Device>, Error> {
    hardware(session, operation::SUMMARY_HARDWARE, site_id).await
}

/// Full inventory of one site: physical hardware followed by the summary device.
pub async fn list_site_hardware(session: &Session, site_id: SiteId) -> Result<Vec<Device>, Error> {
    let mut devices = hardware(session, operation::SITE_HARDWARE_LIST, site_id).await?;
    devices.extend(summary_hardware(session, site_id).await?);

    log::debug!("site {}: {} devices", site_id, devices.len());
    Ok(devices)
}

/// Sites and their hardware, as needed to validate and attribute readings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Catalog {
    sites: Vec<Site>,
    devices: Vec<Device>,
}

impl Catalog {
    pub fn new(sites: Vec<Site>, devices: Vec<Device>) -> Self {
        Catalog { sites, devices }
    }

    pub fn sites(&self) -> &[Site] {
        &self.sites
    }

    pub fn devices(&self) -> &[Device] {
        &self.devices
    }

    pub fn site_devices(&self, site_id: SiteId) -> impl Iterator<Item = &Device> {
        self.devices
            .iter()
            .filter(move |device| device.site_id == site_id)
    }

    /// Look up a device by its data request id (see `Device::hid`).
    pub fn device(&self, hid: HardwareId) -> Option<&Device> {
        self.devices.iter().find(|device| device.hid() == hid)
    }

    pub fn summary_device(&self, site_id: SiteId) -> Option<&Device> {
        self.site_devices(site_id).find(|device| device.is_summary())
    }

    pub fn field(&self, hid: HardwareId, name: &str) -> Result<&FieldDefinition, Error> {
        let device = self
            .device(hid)
            .ok_or_else(|| Error::QueryError(format!("Unknown hardware {}", hid)))?;

        device.field(name).ok_or_else(|| {
            Error::QueryError(format!(
                "Field {} is not declared by hardware {} ({})",
                name, hid, device.device_code
            ))
        })
    }
}

/// Readings are attributed by `Device::hid`, so it has to identify one device only.
fn check_unique_hids(devices: &[Device]) -> Result<(), Error> {
    let mut seen = HashSet::new();
    match devices.iter().find(|device| !seen.insert(device.hid())) {
        Some(device) => Err(Error::SchemaError(format!(
            "Hardware id {} is used by more than one device (site {})",
            device.hid(),
            device.site_id
        ))),
        None => Ok(()),
    }
}

pub async fn fetch_catalog(session: &Session) -> Result<Catalog, Error> {
    let sites = list_sites(session).await?;
    let mut devices = Vec::new();

    for site in &sites {
        devices.extend(list_site_hardware(session, site.id).await?);
    }
    check_unique_hids(&devices)?;

    log::info!(
        "catalog: {} sites, {} devices",
        sites.len(),
        devices.len()
    );
    Ok(Catalog::new(sites, devices))
}
