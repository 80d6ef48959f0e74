use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub status_code: u16,
    pub message: String,
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<serde_json::Value>,
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> axum::response::Response {
        let status =
            StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self)).into_response()
    }
}

impl<T: Serialize> ApiResponse<T> {
    /// Create a success response
    pub fn success(status: StatusCode, message: impl Into<String>, data: T) -> Self {
        ApiResponse {
            success: true,
            status_code: status.as_u16(),
            message: message.into(),
            timestamp: Utc::now().to_rfc3339(),
            data: Some(data),
            errors: None,
        }
    }

    /// Create an error response
    pub fn error(
        status: StatusCode,
        message: impl Into<String>,
        errors: Option<serde_json::Value>,
    ) -> Self {
        ApiResponse {
            success: false,
            status_code: status.as_u16(),
            message: message.into(),
            timestamp: Utc::now().to_rfc3339(),
            data: None,
            errors,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn success_envelope_carries_data_and_no_errors() {
        let resp = ApiResponse::success(StatusCode::CREATED, "created", json!({ "id": 1 }));
        let value = serde_json::to_value(&resp).unwrap();
        assert_eq!(value["success"], json!(true));
        assert_eq!(value["status_code"], json!(201));
        assert_eq!(value["data"]["id"], json!(1));
        assert!(value.get("errors").is_none());
    }

    #[test]
    fn error_envelope_carries_field_errors_and_no_data() {
        let resp = ApiResponse::<()>::error(
            StatusCode::BAD_REQUEST,
            "Validation failed",
            Some(json!([{ "field": "rating", "message": "Rating cannot exceed 5" }])),
        );
        let value = serde_json::to_value(&resp).unwrap();
        assert_eq!(value["success"], json!(false));
        assert_eq!(value["status_code"], json!(400));
        assert!(value.get("data").is_none());
        assert_eq!(value["errors"][0]["field"], json!("rating"));
    }
}
