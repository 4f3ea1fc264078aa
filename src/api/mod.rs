pub mod error;
pub mod operation;
pub mod response;
pub mod soap;

use crate::model;
pub use error::Error;
use response::login::LoginResult;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use soap::Request;

use chrono::NaiveDateTime;
use std::time::Duration;

const SUCCESS: &str = "Success";

pub fn api(api_url: String, username: String, password: String, timeout: Duration) -> model::Api {
    model::Api {
        api_url,
        username,
        password,
        timeout,
    }
}

/// Map transport-level failures (no HTTP response, or an error status) to Error
fn map_api_err(error: reqwest::Error) -> Error {
    match error.status() {
        Some(http::StatusCode::UNAUTHORIZED) | Some(http::StatusCode::FORBIDDEN) => {
            Error::AuthError(error.to_string())
        }
        _ if error.is_timeout() => Error::TransportError(format!("Request timed out: {}", error)),
        _ => Error::TransportError(error.to_string()),
    }
}

/// SOAP faults are raised for rejected credentials, expired sessions and requests the service
/// refuses to answer. Anything that is not about the session is the caller's query.
fn map_fault(operation: &operation::Operation, fault: soap::Fault) -> Error {
    let message = format!("{} ({})", fault.message, fault.code);
    if operation == operation::LOGIN || fault.message.to_lowercase().contains("session") {
        Error::AuthError(message)
    } else {
        Error::QueryError(message)
    }
}

/// Non-`Success` result code carried inside an otherwise valid response.
pub(crate) fn check_code(operation: &operation::Operation, code: Option<&str>) -> Result<(), Error> {
    match code {
        None | Some(SUCCESS) => Ok(()),
        Some(code) => Err(Error::QueryError(format!(
            "{} returned result code {}",
            operation, code
        ))),
    }
}

pub(crate) fn decode<T: DeserializeOwned>(value: Value) -> Result<T, Error> {
    T::deserialize(&value).map_err(|e| Error::SchemaError(format!("{}: {}", e, value)))
}

async fn call(
    client: &reqwest::Client,
    api_url: &str,
    request: &Request,
) -> Result<Value, Error> {
    let body = request.to_xml()?;

    let response = client
        .post(api_url)
        .header(http::header::CONTENT_TYPE, "text/xml; charset=utf-8")
        .header("SOAPAction", request.action())
        .body(body)
        .send()
        .await
        .map_err(map_api_err)?;

    let status = response.status();
    if status == http::StatusCode::UNAUTHORIZED || status == http::StatusCode::FORBIDDEN {
        return Err(Error::AuthError(format!(
            "{} rejected with status {}",
            request.operation(),
            status
        )));
    }

    let text = response
        .text()
        .await
        .map_err(|e| Error::TransportError(format!("Error reading API response: {}", e)))?;

    log::trace!(
        "operation: {}, status: {}, response_text: {}",
        request.operation(),
        status,
        text
    );

    /* SOAP faults come with a 500, so the body has to be looked at before the status */
    let envelope = match soap::parse(&text) {
        Ok(envelope) => envelope,
        Err(_) if !status.is_success() => {
            return Err(Error::TransportError(format!(
                "{} failed with status {}: {}",
                request.operation(),
                status,
                text
            )))
        }
        Err(e) => return Err(e),
    };

    if let Some(fault) = soap::fault(&envelope) {
        return Err(map_fault(request.operation(), fault));
    }
    if !status.is_success() {
        return Err(Error::TransportError(format!(
            "{} failed with status {}",
            request.operation(),
            status
        )));
    }

    soap::result(envelope, request.operation())
}

/// Start a request on behalf of `session`.
pub(crate) fn session_request(
    session: &model::Session,
    operation: &'static operation::Operation,
) -> Request {
    Request::new(operation).param("SessionID", &session.session_id)
}

pub(crate) async fn session_call(
    session: &model::Session,
    request: &Request,
) -> Result<Value, Error> {
    log::debug!("calling {} for session", request.operation());
    call(&session.client, &session.api_url, request).await
}

pub async fn login(api: &model::Api) -> Result<model::Session, Error> {
    let client = reqwest::ClientBuilder::new()
        .timeout(api.timeout)
        .build()
        .map_err(|e| Error::InternalError(e.to_string()))?;

    let request = Request::new(operation::LOGIN)
        .param("Username", &api.username)
        .param("Password", &api.password);

    let result: LoginResult = decode(call(&client, &api.api_url, &request).await?)?;

    match result.session_id.filter(|id| !id.is_empty()) {
        Some(session_id) => {
            log::debug!("logged in as {}", api.username);
            Ok(model::Session {
                api_url: api.api_url.to_owned(),
                session_id,
                client,
            })
        }
        None => Err(Error::AuthError(format!(
            "No session id received (result code {})",
            result.code.as_deref().unwrap_or("none")
        ))),
    }
}

/// Best-effort logout. The session expires server-side anyway, so failures are only logged.
pub async fn logout(session: model::Session) {
    let request = session_request(&session, operation::LOGOUT);
    match session_call(&session, &request).await {
        Ok(_) => log::debug!("logged out"),
        Err(e) => log::warn!("Error while logging out: {:#?}", e),
    }
}

/// Parse a vendor local timestamp; offsets, when present, are dropped.
pub(crate) fn parse_local_time(text: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .or_else(|| {
            chrono::DateTime::parse_from_rfc3339(text)
                .ok()
                .map(|t| t.naive_local())
        })
}

pub(crate) fn format_local_time(time: NaiveDateTime) -> String {
    time.format("%Y-%m-%dT%H:%M:%S").to_string()
}

/// Current time according to the vendor, in site local time.
pub async fn get_timestamp(session: &model::Session) -> Result<NaiveDateTime, Error> {
    let request = session_request(session, operation::TIMESTAMP);
    let value = session_call(session, &request).await?;

    String::deserialize(&value)
        .ok()
        .and_then(|text| parse_local_time(&text))
        .ok_or_else(|| Error::SchemaError(format!("Invalid timestamp: {}", value)))
}
