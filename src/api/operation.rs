pub type Operation = str;

/// Namespace and contract of the WCF service; `SOAPAction` is `{SERVICE_NS}{CONTRACT}/{op}`.
pub const SERVICE_NS: &str = "http://tempuri.org/";
pub const CONTRACT: &str = "IWebAPI";

pub const LOGIN: &Operation = "Login";
pub const LOGOUT: &Operation = "Logout";
pub const SITE_LIST: &Operation = "GetSiteList";
pub const SITE_HARDWARE_LIST: &Operation = "GetSiteHardwareList";
pub const SUMMARY_HARDWARE: &Operation = "GetSummaryHardware";
pub const SUMMARY_DATA: &Operation = "GetSummaryData";
pub const BIN_DATA: &Operation = "GetBinData";
pub const TIMESTAMP: &Operation = "GetTimestamp";
// Also exposed by the service, unused here: GetSiteDetail, GetGatewayConfig, SendHeartbeat,
// SendCommandResult, UploadRawData, UploadByteData.

pub fn soap_action(operation: &Operation) -> String {
    format!("{}{}/{}", SERVICE_NS, CONTRACT, operation)
}
