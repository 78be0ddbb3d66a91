//! Response wrappers used by the review API.

use serde::{Deserialize, Serialize};

use crate::api::ApiError;

/// `{success, message, data}` wrapper used by most endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiEnvelope<T> {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default = "Option::default")]
    pub data: Option<T>,
}

impl<T> ApiEnvelope<T> {
    /// The payload, only if the server reported success.
    pub fn into_data(self) -> Result<T, ApiError> {
        if !self.success {
            return Err(ApiError::InvalidResponse(
                self.message
                    .unwrap_or_else(|| "unsuccessful response".to_string()),
            ));
        }
        self.data
            .ok_or_else(|| ApiError::InvalidResponse("response missing data".to_string()))
    }
}

/// `{status, data}` wrapper used by the channel and property endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusEnvelope<T> {
    pub status: String,
    #[serde(default = "Option::default")]
    pub data: Option<T>,
}

impl<T> StatusEnvelope<T> {
    pub fn into_data(self) -> Result<T, ApiError> {
        if self.status != "success" {
            return Err(ApiError::InvalidResponse(format!(
                "unexpected status: {}",
                self.status
            )));
        }
        self.data
            .ok_or_else(|| ApiError::InvalidResponse("response missing data".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_success_is_checked_before_data() {
        let ok: ApiEnvelope<Vec<i32>> =
            serde_json::from_str(r#"{"success": true, "data": [1, 2]}"#).unwrap();
        assert_eq!(ok.into_data().unwrap(), vec![1, 2]);

        let failed: ApiEnvelope<Vec<i32>> = serde_json::from_str(
            r#"{"success": false, "message": "Database offline", "data": [1]}"#,
        )
        .unwrap();
        assert_eq!(
            failed.into_data().unwrap_err(),
            ApiError::InvalidResponse("Database offline".to_string())
        );

        let empty: ApiEnvelope<Vec<i32>> = serde_json::from_str(r#"{"success": true}"#).unwrap();
        assert!(empty.into_data().is_err());
    }

    #[test]
    fn test_status_envelope() {
        let ok: StatusEnvelope<Vec<String>> =
            serde_json::from_str(r#"{"status": "success", "data": ["airbnb"]}"#).unwrap();
        assert_eq!(ok.into_data().unwrap(), vec!["airbnb".to_string()]);

        let failed: StatusEnvelope<Vec<String>> =
            serde_json::from_str(r#"{"status": "error"}"#).unwrap();
        assert!(matches!(failed.into_data(), Err(ApiError::InvalidResponse(_))));
    }
}
