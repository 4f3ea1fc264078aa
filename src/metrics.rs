use alsoenergy_rs::model::Reading;
use alsoenergy_rs::usage::SiteFigure;
use alsoenergy_rs::Catalog;
use prometheus::{Encoder, GaugeVec, IntGauge, TextEncoder};

lazy_static! {
    static ref CURRENT_READING_GAUGE: GaugeVec = register_gauge_vec!(
        opts!(
            "current_reading",
            "latest value of a device field within the last quarter hour",
        ),
        &["site_id", "hid", "device_code", "field", "units"],
    )
    .unwrap();
    static ref DAILY_READING_GAUGE: GaugeVec = register_gauge_vec!(
        opts!(
            "daily_reading",
            "daily aggregate of a site summary field, for the last polled day",
        ),
        &["site_id", "hid", "field", "function"],
    )
    .unwrap();
    static ref SITE_CURRENT_GAUGE: GaugeVec = register_gauge_vec!(
        opts!(
            "site_current",
            "site production, usage and equivalents from the latest power readings (per kW)",
        ),
        &["site_id", "category"],
    )
    .unwrap();
    static ref SITE_DAILY_GAUGE: GaugeVec = register_gauge_vec!(
        opts!(
            "site_daily",
            "site production, usage and equivalents for the last polled day (per kWh)",
        ),
        &["site_id", "category"],
    )
    .unwrap();
    static ref CATALOG_DEVICES_GAUGE: IntGauge = register_int_gauge!(opts!(
        "catalog_devices",
        "number of devices in the current hardware catalog",
    ))
    .unwrap();
}

fn record_figures(gauge: &GaugeVec, figures: &[SiteFigure]) {
    for figure in figures {
        gauge
            .with_label_values(&[&figure.site_id.to_string(), figure.category.as_str()])
            .set(figure.value);
    }
}

/// Replace current gauges with the readings of the latest cycle, labelled with what the
/// catalog knows about the device and field.
pub fn record_current(catalog: &Catalog, readings: &[Reading], figures: &[SiteFigure]) {
    CATALOG_DEVICES_GAUGE.set(catalog.devices().len() as i64);

    /* a field that came back nil or a device gone from the catalog must not linger */
    CURRENT_READING_GAUGE.reset();
    SITE_CURRENT_GAUGE.reset();

    for reading in readings {
        let device = catalog.device(reading.hid);
        let device_code = device.map(|d| d.device_code.to_string()).unwrap_or_default();
        let units = device
            .and_then(|d| d.field(&reading.field_name))
            .and_then(|f| f.units.clone())
            .unwrap_or_default();

        CURRENT_READING_GAUGE
            .with_label_values(&[
                &reading.site_id.to_string(),
                &reading.hid.to_string(),
                &device_code,
                &reading.field_name,
                &units,
            ])
            .set(reading.value);
    }
    record_figures(&SITE_CURRENT_GAUGE, figures);
}

pub fn record_daily(readings: &[Reading], figures: &[SiteFigure]) {
    DAILY_READING_GAUGE.reset();
    SITE_DAILY_GAUGE.reset();

    for reading in readings {
        DAILY_READING_GAUGE
            .with_label_values(&[
                &reading.site_id.to_string(),
                &reading.hid.to_string(),
                &reading.field_name,
                reading.function.as_str(),
            ])
            .set(reading.value);
    }
    record_figures(&SITE_DAILY_GAUGE, figures);
}

/// Read metrics from Prometheus exporter registry.
pub async fn read() -> Result<String, alsoenergy_rs::Error> {
    let mut buffer = Vec::new();
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();

    encoder
        .encode(&metric_families, &mut buffer)
        .or(Err(alsoenergy_rs::Error::FormatError))?;
    String::from_utf8(buffer).or(Err(alsoenergy_rs::Error::FormatError))
}
