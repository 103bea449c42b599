/**
 * Error Conversion
 *
 * This module provides conversion implementations for gateway errors,
 * allowing them to be returned directly from Axum handlers.
 *
 * # Response Format
 *
 * Error responses are returned as JSON with the following structure:
 * ```json
 * {
 *   "error": "Error message",
 *   "status": 400
 * }
 * ```
 */

use axum::{
    body::Body,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::error::types::RealtimeError;

impl IntoResponse for RealtimeError {
    /// Convert a gateway error into an HTTP response
    ///
    /// The status comes from [`RealtimeError::status_code`] and the
    /// body carries the error message as JSON.
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = self.message();

        let body = serde_json::json!({
            "error": message,
            "status": status.as_u16(),
        });

        Response::builder()
            .status(status)
            .header("Content-Type", "application/json")
            .body(Body::from(serde_json::to_string(&body).unwrap_or_else(
                |_| format!(r#"{{"error":"{}","status":{}}}"#, message, status.as_u16()),
            )))
            .unwrap_or_else(|_| {
                Response::builder()
                    .status(StatusCode::INTERNAL_SERVER_ERROR)
                    .body(Body::from("Internal Server Error"))
                    .unwrap()
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handler_error_maps_to_its_status() {
        let response =
            RealtimeError::handler(StatusCode::UNAUTHORIZED, "Unauthorized").into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_upstream_error_maps_to_bad_gateway() {
        let response = RealtimeError::upstream("permission service down").into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }
}
