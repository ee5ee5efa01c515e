// src/response.rs

use serde::Serialize;

/// Response envelope shared by every endpoint: a success flag, an optional
/// payload and an optional human-readable message.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        ApiResponse {
            success: true,
            data: Some(data),
            message: None,
        }
    }
}

impl ApiResponse<()> {
    pub fn failure(message: impl Into<String>) -> Self {
        ApiResponse {
            success: false,
            data: None,
            message: Some(message.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ok_envelope_carries_data_and_no_message() {
        let value = serde_json::to_value(ApiResponse::ok(vec![1, 2, 3])).unwrap();
        assert_eq!(value["success"], true);
        assert_eq!(value["data"], serde_json::json!([1, 2, 3]));
        assert!(value.get("message").is_none());
    }

    #[test]
    fn failure_envelope_carries_message_and_no_data() {
        let value = serde_json::to_value(ApiResponse::failure("Task not found")).unwrap();
        assert_eq!(value["success"], false);
        assert_eq!(value["message"], "Task not found");
        assert!(value.get("data").is_none());
    }
}
