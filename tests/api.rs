// Integration tests against a mock SOAP endpoint.

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use chrono::{NaiveDate, NaiveDateTime};
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use alsoenergy_rs::model::{Api, BinSize, DeviceCode, FieldSpec, Function, Session};
use alsoenergy_rs::settings::{DailyField, Factors};
use alsoenergy_rs::usage::{self, Category};
use alsoenergy_rs::{poller, Catalog, Error};

// ── Helpers ─────────────────────────────────────────────────────────

const SERVICE_PATH: &str = "/WebAPI/WebAPI.svc";
const SESSION_ID: &str = "5d2c8d2e-6d3a-4a8b-9a57-9f0d1f3c2b11";

fn read_resource(filename: &str) -> String {
    let mut d = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    d.push(format!("resources/test/{}", filename));
    fs::read_to_string(d.as_path()).unwrap()
}

fn api_for(server: &MockServer, timeout: Duration) -> Api {
    alsoenergy_rs::api(
        format!("{}{}", server.uri(), SERVICE_PATH),
        "SDCWAapi".to_string(),
        "secret".to_string(),
        timeout,
    )
}

fn soap_call(operation: &str) -> wiremock::MockBuilder {
    Mock::given(method("POST"))
        .and(path(SERVICE_PATH))
        .and(header(
            "SOAPAction",
            format!("http://tempuri.org/IWebAPI/{}", operation).as_str(),
        ))
}

fn xml(filename: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header("Content-Type", "text/xml; charset=utf-8")
        .set_body_string(read_resource(filename))
}

async fn mount_login(server: &MockServer) {
    soap_call("Login")
        .and(body_string_contains("<Username>SDCWAapi</Username>"))
        .respond_with(xml("Login.xml"))
        .mount(server)
        .await;
}

async fn mount_catalog(server: &MockServer) {
    mount_login(server).await;

    soap_call("GetSiteList")
        .and(body_string_contains(SESSION_ID))
        .respond_with(xml("GetSiteList.xml"))
        .mount(server)
        .await;

    soap_call("GetSiteHardwareList")
        .and(body_string_contains("<SiteID>28096</SiteID>"))
        .respond_with(xml("GetSiteHardwareList_28096.xml"))
        .mount(server)
        .await;

    for site in &["28096", "28097", "28099"] {
        soap_call("GetSummaryHardware")
            .and(body_string_contains(format!("<SiteID>{}</SiteID>", site).as_str()))
            .respond_with(xml(&format!("GetSummaryHardware_{}.xml", site)))
            .mount(server)
            .await;
    }

    /* no physical hardware published for the other two sites */
    for site in &["28097", "28099"] {
        soap_call("GetSiteHardwareList")
            .and(body_string_contains(format!("<SiteID>{}</SiteID>", site).as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"<s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/"><s:Body>
                   <GetSiteHardwareListResponse xmlns="http://tempuri.org/"><GetSiteHardwareListResult>
                   <Code>Success</Code><HardwareList/>
                   </GetSiteHardwareListResult></GetSiteHardwareListResponse>
                   </s:Body></s:Envelope>"#,
            ))
            .mount(server)
            .await;
    }

    soap_call("Logout")
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/"><s:Body>
               <LogoutResponse xmlns="http://tempuri.org/"><LogoutResult><Code>Success</Code></LogoutResult></LogoutResponse>
               </s:Body></s:Envelope>"#,
        ))
        .mount(server)
        .await;
}

async fn setup() -> (MockServer, Session) {
    let server = MockServer::start().await;
    mount_catalog(&server).await;
    let session = alsoenergy_rs::login(&api_for(&server, Duration::from_secs(5)))
        .await
        .unwrap();
    (server, session)
}

fn day(h: u32, m: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2014, 1, 29)
        .unwrap()
        .and_hms_opt(h, m, 0)
        .unwrap()
}

// ── Session tests ───────────────────────────────────────────────────

#[tokio::test]
async fn test_login_success() {
    let (_server, session) = setup().await;
    assert!(!session.session_id.is_empty());
    assert_eq!(SESSION_ID, session.session_id);
}

#[tokio::test]
async fn test_login_rejected() {
    let server = MockServer::start().await;
    soap_call("Login")
        .respond_with(ResponseTemplate::new(500).set_body_string(read_resource("Login_Fault.xml")))
        .mount(&server)
        .await;

    let result = alsoenergy_rs::login(&api_for(&server, Duration::from_secs(5))).await;
    assert!(
        matches!(result, Err(Error::AuthError(_))),
        "expected AuthError, got: {:?}",
        result
    );
}

#[tokio::test]
async fn test_login_http_forbidden() {
    let server = MockServer::start().await;
    soap_call("Login")
        .respond_with(ResponseTemplate::new(403).set_body_string("Forbidden"))
        .mount(&server)
        .await;

    let result = alsoenergy_rs::login(&api_for(&server, Duration::from_secs(5))).await;
    assert!(matches!(result, Err(Error::AuthError(_))));
}

#[tokio::test]
async fn test_login_timeout() {
    let server = MockServer::start().await;
    soap_call("Login")
        .respond_with(xml("Login.xml").set_delay(Duration::from_secs(2)))
        .mount(&server)
        .await;

    let result = alsoenergy_rs::login(&api_for(&server, Duration::from_millis(200))).await;
    assert!(
        matches!(result, Err(Error::TransportError(_))),
        "expected TransportError, got: {:?}",
        result
    );
}

#[tokio::test]
async fn test_gateway_error_is_transport_error() {
    let server = MockServer::start().await;
    soap_call("Login")
        .respond_with(ResponseTemplate::new(502).set_body_string("<html>Bad Gateway</html>"))
        .mount(&server)
        .await;

    let result = alsoenergy_rs::login(&api_for(&server, Duration::from_secs(5))).await;
    assert!(matches!(result, Err(Error::TransportError(_))));
}

#[tokio::test]
async fn test_expired_session_is_auth_error() {
    let (server, session) = setup().await;
    server.reset().await;
    soap_call("GetSiteList")
        .respond_with(ResponseTemplate::new(500).set_body_string(read_resource("Fault_Session.xml")))
        .mount(&server)
        .await;

    let result = alsoenergy_rs::list_sites(&session).await;
    assert!(matches!(result, Err(Error::AuthError(_))));
}

#[tokio::test]
async fn test_logout_failure_is_not_fatal() {
    let (server, session) = setup().await;
    server.reset().await;
    soap_call("Logout")
        .respond_with(ResponseTemplate::new(500).set_body_string(read_resource("Fault_Session.xml")))
        .expect(1)
        .mount(&server)
        .await;

    alsoenergy_rs::logout(session).await;
}

// ── Catalog tests ───────────────────────────────────────────────────

#[tokio::test]
async fn test_list_sites() {
    let (_server, session) = setup().await;

    let sites = alsoenergy_rs::list_sites(&session).await.unwrap();
    let ids: Vec<u64> = sites.iter().map(|site| site.id).collect();

    assert_eq!(vec![28096, 28097, 28099], ids);
    assert_eq!("SDCWA Headquarters", sites[1].name);
    assert_eq!(Some("2"), sites[1].type_code.as_deref());
}

#[tokio::test]
async fn test_list_site_hardware() {
    let (_server, session) = setup().await;

    let devices = alsoenergy_rs::list_site_hardware(&session, 28096)
        .await
        .unwrap();

    assert_eq!(7, devices.len());
    assert!(devices.iter().all(|device| device.site_id == 28096));
    assert!(devices.iter().any(|device| device.device_code == "GW"
        && device.gateway_id.as_deref() == Some("00-90-E8-3B-A3-0F")));

    let gateway = &devices[0];
    assert!(gateway.fields.is_empty());

    let meter = devices.iter().find(|d| d.hardware_id == 14504).unwrap();
    assert_eq!(DeviceCode::ProductionMeter, meter.device_code);
    assert_eq!(14, meter.fields.len());
    assert_eq!(None, meter.field("PowerFactor").unwrap().units);
    assert_eq!(
        Some("Kilowatt hours"),
        meter.field("KWHdel").unwrap().units.as_deref()
    );

    let summary = devices.last().unwrap();
    assert_eq!(DeviceCode::SiteSummary, summary.device_code);
    assert_eq!(-28096, summary.hardware_id);
}

#[tokio::test]
async fn test_single_summary_field_is_a_list() {
    let (_server, session) = setup().await;

    let devices = alsoenergy_rs::summary_hardware(&session, 28099).await.unwrap();

    assert_eq!(1, devices.len());
    assert_eq!(1, devices[0].fields.len());
    assert_eq!("ProdKWH", devices[0].fields[0].name);
}

#[tokio::test]
async fn test_foreign_hardware_is_schema_error() {
    let server = MockServer::start().await;
    soap_call("GetSiteHardwareList")
        .respond_with(xml("GetSiteHardwareList_28096.xml"))
        .mount(&server)
        .await;
    let session = Session {
        api_url: format!("{}{}", server.uri(), SERVICE_PATH),
        session_id: SESSION_ID.to_string(),
        client: reqwest::Client::new(),
    };

    /* the inventory of site 28096 answered for site 28098 */
    let result = alsoenergy_rs::list_site_hardware(&session, 28098).await;
    assert!(matches!(result, Err(Error::SchemaError(_))));
}

#[tokio::test]
async fn test_fetch_catalog() {
    let (_server, session) = setup().await;

    let catalog = alsoenergy_rs::fetch_catalog(&session).await.unwrap();

    assert_eq!(3, catalog.sites().len());
    assert_eq!(7 + 1 + 1, catalog.devices().len());
    for site in catalog.sites() {
        assert!(catalog.summary_device(site.id).is_some());
    }
}

// ── Reading tests ───────────────────────────────────────────────────

async fn catalog(session: &Session) -> Catalog {
    alsoenergy_rs::fetch_catalog(session).await.unwrap()
}

#[tokio::test]
async fn test_summary_data_one_reading_per_day() {
    let (server, session) = setup().await;
    soap_call("GetSummaryData")
        .and(body_string_contains("<BinSize>BinDay</BinSize>"))
        .and(body_string_contains("<FromLocal>2014-01-29T00:00:00</FromLocal>"))
        .and(body_string_contains("<ToLocal>2014-01-29T23:59:00</ToLocal>"))
        .and(body_string_contains(
            "<DataField><HID>28097</HID><FieldName>ProdKWH</FieldName><Function>Integral</Function></DataField>",
        ))
        .respond_with(xml("GetSummaryData_28097.xml"))
        .expect(1)
        .mount(&server)
        .await;
    let catalog = catalog(&session).await;

    let readings = alsoenergy_rs::get_summary_data(
        &session,
        &catalog,
        BinSize::BinDay,
        day(0, 0),
        day(23, 59),
        &[FieldSpec::new(28097, "ProdKWH", Function::Integral)],
    )
    .await
    .unwrap();

    assert_eq!(1, readings.len());
    assert_eq!(28097, readings[0].site_id);
    assert_eq!("ProdKWH", readings[0].field_name);
    assert_eq!(day(0, 0), readings[0].timestamp);
    assert_eq!(Function::Integral, readings[0].function);
    assert_eq!(1874.25, readings[0].value);
}

#[tokio::test]
async fn test_summary_data_inverted_window() {
    let (server, session) = setup().await;
    soap_call("GetSummaryData")
        .respond_with(xml("GetSummaryData_28097.xml"))
        .expect(0)
        .mount(&server)
        .await;
    let catalog = catalog(&session).await;

    let result = alsoenergy_rs::get_summary_data(
        &session,
        &catalog,
        BinSize::BinDay,
        day(23, 59),
        day(0, 0),
        &[FieldSpec::new(28097, "ProdKWH", Function::Integral)],
    )
    .await;

    assert!(matches!(result, Err(Error::QueryError(_))));
}

#[tokio::test]
async fn test_summary_data_undeclared_field() {
    let (server, session) = setup().await;
    soap_call("GetSummaryData")
        .respond_with(xml("GetSummaryData_28097.xml"))
        .expect(0)
        .mount(&server)
        .await;
    let catalog = catalog(&session).await;

    let result = alsoenergy_rs::get_summary_data(
        &session,
        &catalog,
        BinSize::BinDay,
        day(0, 0),
        day(23, 59),
        &[
            FieldSpec::new(28097, "ProdKWH", Function::Integral),
            FieldSpec::new(28099, "Insolation", Function::Integral),
        ],
    )
    .await;

    assert!(
        matches!(result, Err(Error::QueryError(_))),
        "expected QueryError, got: {:?}",
        result
    );
}

#[tokio::test]
async fn test_summary_data_too_many_bins() {
    let (server, session) = setup().await;
    soap_call("GetSummaryData")
        .respond_with(ResponseTemplate::new(200).set_body_string(
            read_resource("GetBinData_14504.xml").replace("GetBinData", "GetSummaryData"),
        ))
        .mount(&server)
        .await;
    let catalog = catalog(&session).await;

    /* two KW readings for a one-day window */
    let result = alsoenergy_rs::get_summary_data(
        &session,
        &catalog,
        BinSize::BinDay,
        day(0, 0),
        day(23, 59),
        &[
            FieldSpec::new(14504, "KW", Function::Last),
            FieldSpec::new(14504, "PowerFactor", Function::Last),
        ],
    )
    .await;

    assert!(matches!(result, Err(Error::SchemaError(_))));
}

#[tokio::test]
async fn test_summary_data_unrequested_reading() {
    let (server, session) = setup().await;
    soap_call("GetSummaryData")
        .respond_with(ResponseTemplate::new(200).set_body_string(
            read_resource("GetBinData_14504.xml").replace("GetBinData", "GetSummaryData"),
        ))
        .mount(&server)
        .await;
    let catalog = catalog(&session).await;

    /* meter readings answered for a summary request */
    let result = alsoenergy_rs::get_summary_data(
        &session,
        &catalog,
        BinSize::BinDay,
        day(0, 0),
        day(23, 59),
        &[FieldSpec::new(28097, "ProdKWH", Function::Integral)],
    )
    .await;

    assert!(
        matches!(&result, Err(Error::SchemaError(e)) if e.contains("Unrequested")),
        "expected SchemaError, got: {:?}",
        result
    );
}

#[tokio::test]
async fn test_current_data() {
    let (server, session) = setup().await;
    soap_call("GetTimestamp")
        .respond_with(xml("GetTimestamp.xml"))
        .mount(&server)
        .await;
    soap_call("GetBinData")
        .and(body_string_contains("<BinSize>Bin15Min</BinSize>"))
        .and(body_string_contains("<FromLocal>2014-01-29T10:02:42</FromLocal>"))
        .and(body_string_contains("<ToLocal>2014-01-29T10:17:42</ToLocal>"))
        .respond_with(xml("GetBinData_14504.xml"))
        .expect(1)
        .mount(&server)
        .await;
    let catalog = catalog(&session).await;

    let readings = alsoenergy_rs::get_current_data(&session, &catalog, &[14504])
        .await
        .unwrap();

    /* KWHdel came back nil and is dropped; KW keeps only its latest bin */
    let fields: Vec<&str> = readings.iter().map(|r| r.field_name.as_str()).collect();
    assert_eq!(vec!["KW", "PowerFactor"], fields);
    assert_eq!(418.75, readings[0].value);
    assert_eq!(day(10, 15), readings[0].timestamp);
    assert!(readings.iter().all(|r| r.site_id == 28096 && r.hid == 14504));
}

#[tokio::test]
async fn test_current_data_unknown_device() {
    let (_server, session) = setup().await;
    let catalog = catalog(&session).await;

    let result = alsoenergy_rs::get_current_data(&session, &catalog, &[99999]).await;
    assert!(matches!(result, Err(Error::QueryError(_))));

    /* a gateway declares no fields, so there is nothing to ask for */
    let readings = alsoenergy_rs::get_current_data(&session, &catalog, &[14503])
        .await
        .unwrap();
    assert!(readings.is_empty());
}

// ── Poller tests ────────────────────────────────────────────────────

#[tokio::test]
async fn test_daily_cycle_skips_rejected_fields() {
    let server = MockServer::start().await;
    mount_catalog(&server).await;
    soap_call("GetSummaryData")
        .and(body_string_contains("<HID>28097</HID><FieldName>ProdKWH</FieldName>"))
        .respond_with(xml("GetSummaryData_28097.xml"))
        .expect(1)
        .mount(&server)
        .await;
    /* every other request, meter energy of 28096 included, has no data for the day */
    soap_call("GetSummaryData")
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/"><s:Body>
               <GetSummaryDataResponse xmlns="http://tempuri.org/"><GetSummaryDataResult>
               <Code>Success</Code><Items/>
               </GetSummaryDataResult></GetSummaryDataResponse>
               </s:Body></s:Envelope>"#,
        ))
        .expect(5)
        .mount(&server)
        .await;

    let fields = vec![
        DailyField {
            field_name: "ProdKWH".to_string(),
            function: Function::Integral,
        },
        /* not declared by the summary device of 28099 */
        DailyField {
            field_name: "Insolation".to_string(),
            function: Function::Avg,
        },
    ];
    let (catalog, readings) = poller::daily_cycle(
        &api_for(&server, Duration::from_secs(5)),
        None,
        NaiveDate::from_ymd_opt(2014, 1, 29).unwrap(),
        &fields,
    )
    .await
    .unwrap();

    assert_eq!(3, catalog.sites().len());
    assert_eq!(1, readings.len());
    assert_eq!(28097, readings[0].site_id);
    assert_eq!("ProdKWH", readings[0].field_name);
}

#[tokio::test]
async fn test_cycle_logs_out_on_failure() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    soap_call("GetSiteList")
        .respond_with(ResponseTemplate::new(200).set_body_string("<not-soap/>"))
        .mount(&server)
        .await;
    soap_call("Logout")
        .respond_with(ResponseTemplate::new(200).set_body_string(""))
        .expect(1)
        .mount(&server)
        .await;

    let result = poller::current_cycle(&api_for(&server, Duration::from_secs(5)), None).await;
    assert!(matches!(result, Err(Error::SchemaError(_))));
}

const EMPTY_BIN_DATA: &str = r#"<s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/"><s:Body>
   <GetBinDataResponse xmlns="http://tempuri.org/"><GetBinDataResult>
   <Code>Success</Code><Items/>
   </GetBinDataResult></GetBinDataResponse>
   </s:Body></s:Envelope>"#;

async fn mount_current(server: &MockServer, site_28096: ResponseTemplate) {
    soap_call("GetTimestamp")
        .respond_with(xml("GetTimestamp.xml"))
        .mount(server)
        .await;
    soap_call("GetBinData")
        .and(body_string_contains("<HID>14504</HID>"))
        .respond_with(site_28096)
        .expect(1)
        .mount(server)
        .await;
    soap_call("GetBinData")
        .and(body_string_contains("<HID>28097</HID>"))
        .respond_with(xml("GetBinData_28097.xml"))
        .expect(1)
        .mount(server)
        .await;
    soap_call("GetBinData")
        .respond_with(ResponseTemplate::new(200).set_body_string(EMPTY_BIN_DATA))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_current_cycle() {
    let server = MockServer::start().await;
    mount_catalog(&server).await;
    mount_current(&server, xml("GetBinData_14504.xml")).await;

    let (catalog, readings) =
        poller::current_cycle(&api_for(&server, Duration::from_secs(5)), None)
            .await
            .unwrap();

    assert_eq!(9, catalog.devices().len());
    let fields: Vec<(i64, &str)> = readings
        .iter()
        .map(|r| (r.hid, r.field_name.as_str()))
        .collect();
    assert_eq!(
        vec![(14504, "KW"), (14504, "PowerFactor"), (28097, "ProdKWH")],
        fields
    );

    let figures = usage::current_figures(&catalog, &readings, &Factors::default());
    let production: Vec<(u64, f64)> = figures
        .iter()
        .filter(|f| f.category == Category::SolarProduction)
        .map(|f| (f.site_id, f.value))
        .collect();
    assert_eq!(vec![(28096, 418.75)], production);
}

#[tokio::test]
async fn test_current_cycle_skips_rejected_site() {
    let server = MockServer::start().await;
    mount_catalog(&server).await;
    mount_current(
        &server,
        ResponseTemplate::new(500).set_body_string(read_resource("Fault_Field.xml")),
    )
    .await;

    let (_, readings) = poller::current_cycle(&api_for(&server, Duration::from_secs(5)), None)
        .await
        .unwrap();

    assert_eq!(1, readings.len());
    assert_eq!(28097, readings[0].site_id);
    assert_eq!(96.5, readings[0].value);
}

#[tokio::test]
async fn test_current_cycle_reuses_catalog() {
    let (server, session) = setup().await;
    let cached = catalog(&session).await;

    server.reset().await;
    mount_login(&server).await;
    mount_current(&server, xml("GetBinData_14504.xml")).await;
    for operation in &["GetSiteList", "GetSiteHardwareList", "GetSummaryHardware"] {
        soap_call(operation)
            .respond_with(xml("GetSiteList.xml"))
            .expect(0)
            .mount(&server)
            .await;
    }
    soap_call("Logout")
        .respond_with(ResponseTemplate::new(200).set_body_string(""))
        .expect(1)
        .mount(&server)
        .await;

    let (catalog, readings) = poller::current_cycle(
        &api_for(&server, Duration::from_secs(5)),
        Some(cached.clone()),
    )
    .await
    .unwrap();

    assert_eq!(cached, catalog);
    assert_eq!(3, readings.len());
}
