use super::OneOrMany;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct ListItem {
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(default, rename = "Name")]
    pub name: Option<String>,
    #[serde(default, rename = "Type")]
    pub site_type: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Items {
    #[serde(default)]
    pub list_item: Option<OneOrMany<ListItem>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SiteListResult {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub items: Option<Items>,
}
