//! Uniform response envelope shared by every endpoint.
//!
//! Success bodies are `{success: true, data, pagination?}`; failures are
//! produced by `ApiError` with the same shape plus `error` and, for name
//! collisions, `suggestedName`.

use serde::Serialize;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub total: usize,
    pub page: usize,
    pub limit: usize,
}

impl<T> Envelope<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            suggested_name: None,
            pagination: None,
        }
    }

    pub fn paginated(data: T, pagination: Pagination) -> Self {
        Self {
            pagination: Some(pagination),
            ..Self::ok(data)
        }
    }
}

impl Envelope<()> {
    /// Success with no payload (e.g. a deliverable patch).
    pub fn ok_empty() -> Self {
        Self {
            success: true,
            data: None,
            error: None,
            suggested_name: None,
            pagination: None,
        }
    }

    pub fn failure(error: String, suggested_name: Option<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error),
            suggested_name,
            pagination: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ok_envelope_omits_error_fields() {
        let json = serde_json::to_value(Envelope::ok(42)).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["data"], 42);
        assert!(json.get("error").is_none());
        assert!(json.get("suggestedName").is_none());
    }

    #[test]
    fn test_failure_envelope_carries_suggested_name() {
        let json = serde_json::to_value(Envelope::failure(
            "A run with that name already exists.".to_string(),
            Some("report_2.pdf".to_string()),
        ))
        .unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["suggestedName"], "report_2.pdf");
    }

    #[test]
    fn test_pagination_is_camel_case() {
        let env = Envelope::paginated(
            Vec::<u8>::new(),
            Pagination {
                total: 7,
                page: 1,
                limit: 20,
            },
        );
        let json = serde_json::to_value(env).unwrap();
        assert_eq!(json["pagination"]["total"], 7);
        assert_eq!(json["pagination"]["limit"], 20);
    }
}
