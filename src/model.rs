use chrono::{Datelike, NaiveDateTime, Timelike};
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

pub type SiteId = u64;

/// Hardware id as used in data requests (`HID`). Negative values are the vendor's synthetic
/// per-site summary devices.
pub type HardwareId = i64;

#[derive(Debug, Clone)]
pub struct Api {
    pub api_url: String,
    pub username: String,
    pub password: String,
    pub timeout: Duration,
}

/// Authenticated vendor session. Valid until `logout` or server-side expiry.
#[derive(Debug)]
pub struct Session {
    pub api_url: String,
    pub session_id: String,
    pub client: reqwest::Client,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Site {
    pub id: SiteId,
    pub name: String,
    pub type_code: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DeviceCode {
    Gateway,
    ProductionMeter,
    ConsumptionMeter,
    Inverter,
    WeatherStation,
    SiteSummary,
    Other(String),
}

impl DeviceCode {
    pub fn as_str(&self) -> &str {
        match self {
            DeviceCode::Gateway => "GW",
            DeviceCode::ProductionMeter => "PM",
            DeviceCode::ConsumptionMeter => "CM",
            DeviceCode::Inverter => "PV",
            DeviceCode::WeatherStation => "WS",
            DeviceCode::SiteSummary => "SU",
            DeviceCode::Other(code) => code,
        }
    }
}

impl From<&str> for DeviceCode {
    fn from(code: &str) -> Self {
        match code {
            "GW" => DeviceCode::Gateway,
            "PM" => DeviceCode::ProductionMeter,
            "CM" => DeviceCode::ConsumptionMeter,
            "PV" => DeviceCode::Inverter,
            "WS" => DeviceCode::WeatherStation,
            "SU" => DeviceCode::SiteSummary,
            other => DeviceCode::Other(other.to_string()),
        }
    }
}

impl PartialEq<&str> for DeviceCode {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == *other
    }
}

impl fmt::Display for DeviceCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A measurable quantity declared by a device. `units` is legitimately absent for some
/// numeric fields (`PowerFactor`, `ProdKWH`).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FieldDefinition {
    pub name: String,
    #[serde(default)]
    pub units: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Device {
    pub hardware_id: HardwareId,
    pub device_code: DeviceCode,
    /// Vendor driver id (`DeviceID`), shared by all devices of the same model.
    pub device_type_id: u64,
    pub flags: u32,
    pub gateway_id: Option<String>,
    pub name: Option<String>,
    pub site_id: SiteId,
    pub fields: Vec<FieldDefinition>,
}

impl Device {
    /// Id to put into `HID` of a data request. Summary devices are addressed by site id.
    pub fn hid(&self) -> HardwareId {
        match self.device_code {
            DeviceCode::SiteSummary => self.site_id as HardwareId,
            _ => self.hardware_id,
        }
    }

    pub fn is_summary(&self) -> bool {
        self.device_code == DeviceCode::SiteSummary
    }

    pub fn field(&self, name: &str) -> Option<&FieldDefinition> {
        self.fields.iter().find(|field| field.name == name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
pub enum BinSize {
    BinRaw,
    Bin5Min,
    Bin15Min,
    BinHour,
    BinDay,
    BinMonth,
    BinYear,
}

impl BinSize {
    pub fn as_str(&self) -> &'static str {
        match self {
            BinSize::BinRaw => "BinRaw",
            BinSize::Bin5Min => "Bin5Min",
            BinSize::Bin15Min => "Bin15Min",
            BinSize::BinHour => "BinHour",
            BinSize::BinDay => "BinDay",
            BinSize::BinMonth => "BinMonth",
            BinSize::BinYear => "BinYear",
        }
    }

    /// Number of bins touched by the window `[from, to]`. `None` for raw data, which has no
    /// fixed bin count.
    pub fn bins_covered(&self, from: NaiveDateTime, to: NaiveDateTime) -> Option<u64> {
        if from > to {
            return Some(0);
        }

        let minutes = |size: i64| {
            let first = minute_of_era(from) / size;
            let last = minute_of_era(to) / size;
            (last - first + 1) as u64
        };
        let months = |from: NaiveDateTime, to: NaiveDateTime| {
            (to.year() - from.year()) as i64 * 12 + to.month() as i64 - from.month() as i64 + 1
        };

        match self {
            BinSize::BinRaw => None,
            BinSize::Bin5Min => Some(minutes(5)),
            BinSize::Bin15Min => Some(minutes(15)),
            BinSize::BinHour => Some(minutes(60)),
            BinSize::BinDay => Some((to.date() - from.date()).num_days() as u64 + 1),
            BinSize::BinMonth => Some(months(from, to) as u64),
            BinSize::BinYear => Some((to.year() - from.year()) as u64 + 1),
        }
    }
}

impl fmt::Display for BinSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn minute_of_era(at: NaiveDateTime) -> i64 {
    at.num_days_from_ce() as i64 * 1440 + at.hour() as i64 * 60 + at.minute() as i64
}

/// Aggregation applied to a field over a bin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
pub enum Function {
    Integral,
    Avg,
    Min,
    Max,
    Last,
    Diff,
}

impl Function {
    pub fn as_str(&self) -> &'static str {
        match self {
            Function::Integral => "Integral",
            Function::Avg => "Avg",
            Function::Min => "Min",
            Function::Max => "Max",
            Function::Last => "Last",
            Function::Diff => "Diff",
        }
    }
}

impl FromStr for Function {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Integral" => Ok(Function::Integral),
            "Avg" => Ok(Function::Avg),
            "Min" => Ok(Function::Min),
            "Max" => Ok(Function::Max),
            "Last" => Ok(Function::Last),
            "Diff" => Ok(Function::Diff),
            other => Err(format!("unknown aggregation function: {}", other)),
        }
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One requested data field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    pub hid: HardwareId,
    pub field_name: String,
    pub function: Function,
}

impl FieldSpec {
    pub fn new(hid: HardwareId, field_name: &str, function: Function) -> Self {
        FieldSpec {
            hid,
            field_name: field_name.to_string(),
            function,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    pub hid: HardwareId,
    pub site_id: SiteId,
    pub field_name: String,
    /// Start of the bin, in site local time.
    pub timestamp: NaiveDateTime,
    pub bin_size: BinSize,
    pub function: Function,
    pub value: f64,
}
