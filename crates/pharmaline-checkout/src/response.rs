//! # API Response Envelope
//!
//! ```json
//! { "success": true,  "data": { ... }, "message": "Order placed successfully!" }
//! { "success": false, "error": { "code": "VALIDATION_ERROR", "message": "..." } }
//! ```

use serde::Serialize;

use crate::error::{ApiError, CheckoutError};

pub const ORDER_PLACED_MESSAGE: &str = "Order placed successfully!";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiError>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        ApiResponse {
            success: true,
            data: Some(data),
            error: None,
            message: None,
        }
    }

    pub fn ok_with_message(data: T, message: impl Into<String>) -> Self {
        ApiResponse {
            message: Some(message.into()),
            ..Self::ok(data)
        }
    }

    pub fn err(error: impl Into<ApiError>) -> Self {
        ApiResponse {
            success: false,
            data: None,
            error: Some(error.into()),
            message: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.success
    }
}

impl<T> From<Result<T, CheckoutError>> for ApiResponse<T> {
    fn from(result: Result<T, CheckoutError>) -> Self {
        match result {
            Ok(data) => ApiResponse::ok(data),
            Err(e) => ApiResponse::err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ErrorCode, EMPTY_CART_MESSAGE};
    use pharmaline_core::ValidationError;

    #[test]
    fn test_success_shape() {
        let response = ApiResponse::ok_with_message(7, ORDER_PLACED_MESSAGE);
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["data"], 7);
        assert_eq!(json["message"], "Order placed successfully!");
        assert!(json.get("error").is_none());
    }

    #[test]
    fn test_failure_shape() {
        let response: ApiResponse<()> =
            Err(CheckoutError::from(ValidationError::EmptyCart)).into();
        assert!(!response.is_success());

        let error = response.error.as_ref().unwrap();
        assert_eq!(error.code, ErrorCode::ValidationError);
        assert_eq!(error.message, EMPTY_CART_MESSAGE);

        let json = serde_json::to_value(&response).unwrap();
        assert!(json.get("data").is_none());
        assert_eq!(json["error"]["code"], "VALIDATION_ERROR");
    }
}
