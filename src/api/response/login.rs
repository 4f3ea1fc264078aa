use serde::Deserialize;

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LoginResult {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default, rename = "SessionID")]
    pub session_id: Option<String>,
}
