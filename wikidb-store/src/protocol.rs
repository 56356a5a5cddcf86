//! Request/reply envelopes exchanged over the bus
//!
//! Request: `{"op": "fetch-page", "params": ["Sample"]}`
//! Reply:   `{"status": "ok", "value": ...}` or
//!          `{"status": "error", "kind": "conflict", "message": "..."}`
//!
//! Both sides are plain serde types, so the same envelopes can travel over
//! a network transport without change.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{FailureKind, ServiceError};

/// Operations a page store answers on the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Operation {
    FetchAllPages,
    FetchPage,
    FetchPageById,
    CreatePage,
    SavePage,
    DeletePage,
    FetchAllPagesData,
}

impl Operation {
    /// Number of positional parameters the operation takes.
    pub fn arity(self) -> usize {
        match self {
            Self::FetchAllPages | Self::FetchAllPagesData => 0,
            Self::FetchPage | Self::FetchPageById | Self::DeletePage => 1,
            Self::CreatePage | Self::SavePage => 2,
        }
    }
}

/// Positional parameter value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Param {
    Int(i64),
    Text(String),
}

impl From<i64> for Param {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<&str> for Param {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for Param {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// Request envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    pub op: Operation,
    #[serde(default)]
    pub params: Vec<Param>,
}

impl Request {
    pub fn new(op: Operation, params: Vec<Param>) -> Self {
        Self { op, params }
    }

    /// Fail unless the parameter count matches the operation.
    pub fn check_arity(&self) -> Result<(), ServiceError> {
        let expected = self.op.arity();
        if self.params.len() != expected {
            return Err(ServiceError::invalid_request(format!(
                "{:?} takes {} parameter(s), got {}",
                self.op,
                expected,
                self.params.len()
            )));
        }
        Ok(())
    }

    /// Integer parameter at `index`.
    pub fn int(&self, index: usize) -> Result<i64, ServiceError> {
        match self.params.get(index) {
            Some(Param::Int(value)) => Ok(*value),
            other => Err(self.type_mismatch(index, "integer", other)),
        }
    }

    /// Text parameter at `index`.
    pub fn text(&self, index: usize) -> Result<&str, ServiceError> {
        match self.params.get(index) {
            Some(Param::Text(value)) => Ok(value),
            other => Err(self.type_mismatch(index, "text", other)),
        }
    }

    fn type_mismatch(&self, index: usize, expected: &str, found: Option<&Param>) -> ServiceError {
        let found = match found {
            Some(Param::Int(_)) => "integer",
            Some(Param::Text(_)) => "text",
            None => "nothing",
        };
        ServiceError::invalid_request(format!(
            "{:?} parameter {} must be {}, got {}",
            self.op, index, expected, found
        ))
    }
}

/// Reply envelope. Exactly one is produced per request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Reply {
    Ok {
        #[serde(default)]
        value: serde_json::Value,
    },
    Error {
        kind: FailureKind,
        message: String,
    },
}

impl Reply {
    /// Successful reply carrying `value`.
    pub fn ok<T: Serialize>(value: &T) -> Self {
        match serde_json::to_value(value) {
            Ok(value) => Self::Ok { value },
            Err(e) => Self::failure(&ServiceError::Storage(format!(
                "failed to encode reply: {}",
                e
            ))),
        }
    }

    /// Successful reply with no payload.
    pub fn empty() -> Self {
        Self::Ok {
            value: serde_json::Value::Null,
        }
    }

    pub fn failure(err: &ServiceError) -> Self {
        Self::Error {
            kind: err.kind(),
            message: err.message(),
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok { .. })
    }

    /// Decode the reply into the caller's typed result.
    pub fn into_result<T: DeserializeOwned>(self) -> Result<T, ServiceError> {
        match self {
            Self::Ok { value } => serde_json::from_value(value).map_err(|e| {
                ServiceError::InvalidRequest(format!("unexpected reply payload: {}", e))
            }),
            Self::Error { kind, message } => Err(ServiceError::from_wire(kind, message)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Page;
    use serde_json::json;

    #[test]
    fn request_wire_shape() {
        let req = Request::new(Operation::SavePage, vec![7i64.into(), "# Title".into()]);
        assert_eq!(
            serde_json::to_value(&req).unwrap(),
            json!({"op": "save-page", "params": [7, "# Title"]})
        );
    }

    #[test]
    fn params_decode_by_type() {
        let req: Request =
            serde_json::from_value(json!({"op": "create-page", "params": ["Sample", "body"]}))
                .unwrap();
        assert!(req.check_arity().is_ok());
        assert_eq!(req.text(0).unwrap(), "Sample");
        assert!(matches!(req.int(0), Err(ServiceError::InvalidRequest(_))));
    }

    #[test]
    fn arity_mismatch_is_invalid_request() {
        let req = Request::new(Operation::DeletePage, vec![]);
        let err = req.check_arity().unwrap_err();
        assert!(err.to_string().contains("takes 1 parameter"));
    }

    #[test]
    fn error_reply_shape() {
        let reply = Reply::failure(&ServiceError::Conflict("duplicate".into()));
        assert_eq!(
            serde_json::to_value(&reply).unwrap(),
            json!({"status": "error", "kind": "conflict", "message": "duplicate"})
        );
    }

    #[test]
    fn not_found_travels_as_null() {
        let reply = Reply::ok(&Option::<Page>::None);
        assert!(reply.is_ok());
        let page: Option<Page> = reply.into_result().unwrap();
        assert!(page.is_none());
    }

    #[test]
    fn empty_reply_decodes_to_unit() {
        let unit: Result<(), ServiceError> = Reply::empty().into_result();
        assert!(unit.is_ok());
    }
}
