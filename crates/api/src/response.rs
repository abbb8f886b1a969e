//! Shared response body types for API handlers.
//!
//! Every successful response carries a human-readable `message`; endpoints
//! that return data flatten it next to the message.

use serde::Serialize;

/// `{ "message": ... }`
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// `{ "message": ..., <payload fields> }`
///
/// # Example
///
/// ```ignore
/// Ok(Json(WithMessage::new("token generated", TokenBody { token })))
/// ```
#[derive(Debug, Serialize)]
pub struct WithMessage<T: Serialize> {
    pub message: String,
    #[serde(flatten)]
    pub data: T,
}

impl<T: Serialize> WithMessage<T> {
    pub fn new(message: impl Into<String>, data: T) -> Self {
        Self {
            message: message.into(),
            data,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Serialize)]
    struct Payload {
        kb_id: i64,
    }

    #[test]
    fn payload_is_flattened_next_to_message() {
        let body = WithMessage::new("created", Payload { kb_id: 4 });
        assert_eq!(
            serde_json::to_value(body).unwrap(),
            json!({"message": "created", "kb_id": 4})
        );
    }
}
