//! HTTP helpers for Lambda functions.

use lambda_http::{Body, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::models::ErrorResponse;

/// Create a JSON response with the given status code and data.
///
/// Every response allows cross-origin POSTs so browser clients can call the
/// function directly.
pub fn json_response<T: Serialize>(status: u16, data: &T) -> Result<Response<Body>, lambda_http::Error> {
    let response = Response::builder()
        .status(status)
        .header("content-type", "application/json")
        .header("access-control-allow-origin", "*")
        .header("access-control-allow-methods", "POST")
        .body(Body::from(serde_json::to_string(data)?))
        .map_err(Box::new)?;

    Ok(response)
}

/// Create an error response with the given status code and message.
pub fn error_response(status: u16, message: impl Into<String>) -> Result<Response<Body>, lambda_http::Error> {
    json_response(status, &ErrorResponse::new(message))
}

/// Parse request body as JSON, returning a 400 response on failure.
///
/// Returns `Ok(Ok(T))` on successful parse, `Ok(Err(Response))` on parse error (400),
/// or `Err(lambda_http::Error)` on serialization failure.
pub fn parse_json_body<T: DeserializeOwned>(body: &Body) -> Result<Result<T, Response<Body>>, lambda_http::Error> {
    match serde_json::from_slice(body.as_ref()) {
        Ok(parsed) => Ok(Ok(parsed)),
        Err(e) => {
            let response = error_response(400, format!("Invalid request body: {}", e))?;
            Ok(Err(response))
        }
    }
}

/// Macro to parse request body, returning early with 400 on parse error.
///
/// Usage:
/// ```ignore
/// let request: ReadingRequest = parse_body!(event.body());
/// ```
#[macro_export]
macro_rules! parse_body {
    ($body:expr) => {
        match $crate::http::parse_json_body($body)? {
            Ok(parsed) => parsed,
            Err(response) => return Ok(response),
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ReadingRequest;

    #[test]
    fn test_error_response_shape() {
        let response = error_response(405, "Method not allowed").unwrap();
        assert_eq!(response.status(), 405);
        assert_eq!(response.headers()["access-control-allow-origin"], "*");
        let body = std::str::from_utf8(response.body().as_ref()).unwrap();
        assert_eq!(body, r#"{"error":"Method not allowed"}"#);
    }

    #[test]
    fn test_parse_json_body() {
        let ok: ReadingRequest = parse_json_body(&Body::from(r#"{"query":"love"}"#))
            .unwrap()
            .unwrap();
        assert_eq!(ok.query, "love");

        let bad = parse_json_body::<ReadingRequest>(&Body::from("not json"))
            .unwrap()
            .unwrap_err();
        assert_eq!(bad.status(), 400);
    }
}
