use super::OneOrMany;
use crate::model::FieldDefinition;
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FieldList {
    #[serde(default)]
    pub field_info: Option<OneOrMany<FieldDefinition>>,
}

/* Shared by GetSiteHardwareList and GetSummaryHardware */
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct HardwareComplete {
    pub device_code: String,
    #[serde(rename = "DeviceID")]
    pub device_id: String,
    #[serde(default)]
    pub flags: Option<String>,
    #[serde(default, rename = "GatewayID")]
    pub gateway_id: Option<String>,
    #[serde(rename = "HardwareID")]
    pub hardware_id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "SiteID")]
    pub site_id: String,
    #[serde(default)]
    pub field_list: Option<FieldList>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct HardwareList {
    #[serde(default)]
    pub hardware_complete: Option<OneOrMany<HardwareComplete>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct HardwareResult {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub hardware_list: Option<HardwareList>,
}
