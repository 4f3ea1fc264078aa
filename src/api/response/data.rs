use super::OneOrMany;
use serde::Deserialize;

/* Shared by GetSummaryData and GetBinData */
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DataItem {
    #[serde(rename = "HID")]
    pub hid: String,
    pub field_name: String,
    pub function: String,
    pub time: String,
    #[serde(default)]
    pub value: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Items {
    #[serde(default)]
    pub data_item: Option<OneOrMany<DataItem>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DataResult {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub items: Option<Items>,
}
