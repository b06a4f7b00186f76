//! RPC envelope decoding and the per-request log headline.

use serde_json::{Map, Value};
use thiserror::Error;

/// A JSON object of RPC parameters.
pub type Params = Map<String, Value>;

/// Why an inbound body could not be turned into an [`Envelope`].
#[derive(Debug, Error)]
pub enum EnvelopeError {
    #[error("body is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("body is not a JSON object")]
    NotAMapping,

    #[error("missing or non-string method_name")]
    MissingMethodName,

    #[error("missing params sequence")]
    MissingParams,

    #[error("params entry {0} is not an object")]
    InvalidParams(usize),
}

/// A decoded `{method_name, params: [auth_params, method_params]}` body.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub method_name: String,
    pub auth_params: Params,
    pub method_params: Params,
}

impl Envelope {
    /// Decode a raw request body.
    ///
    /// `params` must be a sequence. Missing trailing entries read as empty
    /// maps, which is how clients encode argument-less calls such as `info`.
    pub fn parse(body: &[u8]) -> Result<Self, EnvelopeError> {
        let value: Value = serde_json::from_slice(body)?;
        let Value::Object(mut payload) = value else {
            return Err(EnvelopeError::NotAMapping);
        };

        let method_name = match payload.remove("method_name") {
            Some(Value::String(name)) => name,
            _ => return Err(EnvelopeError::MissingMethodName),
        };

        let mut params = match payload.remove("params") {
            Some(Value::Array(params)) => params.into_iter(),
            _ => return Err(EnvelopeError::MissingParams),
        };

        let auth_params = as_params(params.next(), 0)?;
        let method_params = as_params(params.next(), 1)?;

        Ok(Self {
            method_name,
            auth_params,
            method_params,
        })
    }

    /// The entity type the call targets, if any.
    pub fn entity_type(&self) -> Option<&str> {
        non_empty_str(&self.method_params, "type")
    }

    /// Human-readable summary logged before the request is handled.
    pub fn headline(&self) -> String {
        let mut chunks = vec![format!("Starting {}", self.method_name)];

        if let Some(entity_type) = self.entity_type() {
            chunks.push(format!("on {entity_type}"));
        }

        if let Some(script_name) = non_empty_str(&self.auth_params, "script_name") {
            chunks.push(format!("by script \"{script_name}\""));
            if let Some(sudo_as_login) = non_empty_str(&self.auth_params, "sudo_as_login") {
                chunks.push(format!("as user \"{sudo_as_login}\""));
            }
        } else if let Some(user_login) = non_empty_str(&self.auth_params, "user_login") {
            chunks.push(format!("by user \"{user_login}\""));
        }

        chunks.join(" ")
    }
}

fn as_params(value: Option<Value>, index: usize) -> Result<Params, EnvelopeError> {
    match value {
        None | Some(Value::Null) => Ok(Params::new()),
        Some(Value::Object(map)) => Ok(map),
        Some(_) => Err(EnvelopeError::InvalidParams(index)),
    }
}

fn non_empty_str<'a>(params: &'a Params, key: &str) -> Option<&'a str> {
    params
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn envelope(value: Value) -> Envelope {
        Envelope::parse(value.to_string().as_bytes()).unwrap()
    }

    #[test]
    fn test_parse_full_envelope() {
        let env = envelope(json!({
            "method_name": "find",
            "params": [{"script_name": "s1"}, {"type": "Shot"}]
        }));
        assert_eq!(env.method_name, "find");
        assert_eq!(env.auth_params["script_name"], "s1");
        assert_eq!(env.entity_type(), Some("Shot"));
    }

    #[test]
    fn test_parse_auth_only_params() {
        let env = envelope(json!({"method_name": "info", "params": [{"user_login": "bob"}]}));
        assert!(env.method_params.is_empty());
    }

    #[test]
    fn test_parse_empty_params() {
        let env = envelope(json!({"method_name": "info", "params": []}));
        assert!(env.auth_params.is_empty());
        assert!(env.method_params.is_empty());
        assert_eq!(env.headline(), "Starting info");
    }

    #[test]
    fn test_rejects_malformed_bodies() {
        let cases: &[&[u8]] = &[
            b"not json",
            b"",
            b"[1, 2]",
            b"\"find\"",
            br#"{"params": [{}, {}]}"#,
            br#"{"method_name": 5, "params": [{}, {}]}"#,
            br#"{"method_name": "find"}"#,
            br#"{"method_name": "find", "params": {"a": 1}}"#,
            br#"{"method_name": "find", "params": [{}, [1]]}"#,
        ];
        for body in cases {
            assert!(
                Envelope::parse(body).is_err(),
                "accepted {:?}",
                String::from_utf8_lossy(body)
            );
        }
    }

    #[test]
    fn test_headline_script_with_sudo() {
        let env = envelope(json!({
            "method_name": "find",
            "params": [{"script_name": "s1", "sudo_as_login": "bob"}, {"type": "Shot"}]
        }));
        assert_eq!(
            env.headline(),
            "Starting find on Shot by script \"s1\" as user \"bob\""
        );
    }

    #[test]
    fn test_headline_user_login() {
        let env = envelope(json!({
            "method_name": "update",
            "params": [{"user_login": "alice"}, {}]
        }));
        assert_eq!(env.headline(), "Starting update by user \"alice\"");
    }

    #[test]
    fn test_headline_script_wins_over_user() {
        let env = envelope(json!({
            "method_name": "info",
            "params": [{"script_name": "s1", "user_login": "alice"}]
        }));
        assert_eq!(env.headline(), "Starting info by script \"s1\"");
    }

    #[test]
    fn test_headline_anonymous() {
        let env = envelope(json!({"method_name": "info", "params": [{}]}));
        assert_eq!(env.headline(), "Starting info");
    }
}
