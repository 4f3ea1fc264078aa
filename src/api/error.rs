use rocket::http::{ContentType, Status};
use rocket::request::Request;
use rocket::response::{self, Responder, Response};
use std::fmt;
use std::io::Cursor;

#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// Credentials rejected or session no longer accepted. Aborts the cycle.
    AuthError(String),
    /// Network failure, timeout or non-SOAP HTTP error. Aborts the cycle.
    TransportError(String),
    /// Malformed request (time window, unknown device or field). Aborts only that query.
    QueryError(String),
    /// Vendor response missing an expected key or in an unrecognized shape.
    SchemaError(String),
    FormatError,
    InternalError(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::AuthError(s) => write!(f, "authentication failed: {}", s),
            Error::TransportError(s) => write!(f, "transport error: {}", s),
            Error::QueryError(s) => write!(f, "invalid query: {}", s),
            Error::SchemaError(s) => write!(f, "unexpected API response: {}", s),
            Error::FormatError => write!(f, "unable to format output"),
            Error::InternalError(s) => write!(f, "internal error: {}", s),
        }
    }
}

impl std::error::Error for Error {}

fn html(status: Status, title: &str, detail: String) -> response::Result<'static> {
    let body = format!(
        "<html><body><h3>{} {}</h3><code>{}</code></body></html>",
        status.code, title, detail
    );
    Response::build()
        .status(status)
        .sized_body(body.len(), Cursor::new(body))
        .header(ContentType::new("text", "html"))
        .ok()
}

impl<'r> Responder<'r, 'static> for Error {
    fn respond_to(self, _: &'r Request<'_>) -> response::Result<'static> {
        log::error!("{}", self);
        match self {
            Error::AuthError(s) => html(
                Status::Forbidden,
                "Forbidden",
                format!("Error while authenticating to downstream API: {}", s),
            ),
            Error::QueryError(s) => html(Status::BadRequest, "Bad Request", s),
            Error::TransportError(s) | Error::SchemaError(s) => html(
                Status::BadGateway,
                "Bad Gateway",
                format!("Downstream API response: {}", s),
            ),
            _ => html(
                Status::InternalServerError,
                "Internal Server Error",
                format!("{:?}", self),
            ),
        }
    }
}
