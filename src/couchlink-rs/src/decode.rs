use crate::{ClientError, Result};
use couchlink_core::{DecodePolicy, ErrorBody, UpdateResult};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;

/// Outcome of decoding a response body, before the decode policy applies.
#[derive(Debug)]
pub(crate) enum Decoded<T> {
    Value(T),
    Empty,
    Malformed(serde_json::Error),
    Status { status: u16, message: String },
}

impl<T: DeserializeOwned> Decoded<T> {
    /// A non-success status is always `Status`, even when the body happens to
    /// have the shape of `T`.
    pub fn from_body(status: StatusCode, body: &[u8]) -> Self {
        if !status.is_success() {
            return Decoded::Status {
                status: status.as_u16(),
                message: error_message(body),
            };
        }
        if is_blank(body) {
            return Decoded::Empty;
        }
        match serde_json::from_slice(body) {
            Ok(value) => Decoded::Value(value),
            Err(e) => Decoded::Malformed(e),
        }
    }
}

impl<T> Decoded<T> {
    /// Lenient callers get `fallback()` in place of any anomaly; strict
    /// callers get the matching error.
    pub fn resolve(
        self,
        policy: DecodePolicy,
        operation: &str,
        fallback: impl FnOnce() -> T,
    ) -> Result<T> {
        let error = match self {
            Decoded::Value(value) => return Ok(value),
            Decoded::Empty => ClientError::EmptyBody,
            Decoded::Malformed(e) => ClientError::Decode(e),
            Decoded::Status { status, message } => ClientError::Server { status, message },
        };

        match policy {
            DecodePolicy::Strict => Err(error),
            DecodePolicy::Lenient => {
                tracing::warn!(operation, error = %error, "Response not decoded, using fallback");
                Ok(fallback())
            }
        }
    }
}

pub(crate) fn database_list(
    status: StatusCode,
    body: &[u8],
    policy: DecodePolicy,
) -> Result<Vec<String>> {
    Decoded::from_body(status, body).resolve(policy, "list_databases", Vec::new)
}

pub(crate) fn update_result(
    status: StatusCode,
    body: &[u8],
    policy: DecodePolicy,
    operation: &str,
) -> Result<UpdateResult> {
    Decoded::from_body(status, body).resolve(policy, operation, UpdateResult::sentinel)
}

/// `error: reason` from a server error body, or the raw text when it isn't one.
pub(crate) fn error_message(body: &[u8]) -> String {
    match serde_json::from_slice::<ErrorBody>(body) {
        Ok(err) if !err.error.is_empty() && !err.reason.is_empty() => {
            format!("{}: {}", err.error, err.reason)
        }
        Ok(err) if !err.error.is_empty() => err.error,
        _ => String::from_utf8_lossy(body).trim().to_string(),
    }
}

pub(crate) fn is_blank(body: &[u8]) -> bool {
    body.iter().all(u8::is_ascii_whitespace)
}

#[cfg(test)]
mod tests {
    use super::*;

    const LENIENT: DecodePolicy = DecodePolicy::Lenient;
    const STRICT: DecodePolicy = DecodePolicy::Strict;

    #[test]
    fn test_database_list_in_order() {
        let dbs = database_list(StatusCode::OK, br#"["a","b"]"#, LENIENT).unwrap();
        assert_eq!(dbs, vec!["a", "b"]);
    }

    #[test]
    fn test_database_list_lenient_fallbacks() {
        assert!(database_list(StatusCode::OK, b"", LENIENT).unwrap().is_empty());
        assert!(database_list(StatusCode::OK, b"<html>", LENIENT).unwrap().is_empty());
        assert!(database_list(StatusCode::OK, br#"{"a":1}"#, LENIENT)
            .unwrap()
            .is_empty());
        assert!(database_list(
            StatusCode::UNAUTHORIZED,
            br#"{"error":"unauthorized"}"#,
            LENIENT
        )
        .unwrap()
        .is_empty());
    }

    #[test]
    fn test_database_list_strict_errors() {
        assert!(matches!(
            database_list(StatusCode::OK, b"  ", STRICT),
            Err(ClientError::EmptyBody)
        ));
        assert!(matches!(
            database_list(StatusCode::OK, b"nope", STRICT),
            Err(ClientError::Decode(_))
        ));
        match database_list(
            StatusCode::UNAUTHORIZED,
            br#"{"error":"unauthorized","reason":"You are not a server admin."}"#,
            STRICT,
        ) {
            Err(ClientError::Server { status, message }) => {
                assert_eq!(status, 401);
                assert_eq!(message, "unauthorized: You are not a server admin.");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_update_result_sentinel_on_anomalies() {
        for body in [&b""[..], &b"not json"[..], &b"[1,2]"[..]] {
            let result = update_result(StatusCode::CREATED, body, LENIENT, "insert").unwrap();
            assert_eq!(result, UpdateResult::sentinel());
        }

        let conflict = update_result(
            StatusCode::CONFLICT,
            br#"{"error":"conflict","reason":"Document update conflict."}"#,
            LENIENT,
            "update",
        )
        .unwrap();
        assert!(conflict.is_sentinel());
    }

    #[test]
    fn test_update_result_partial_object_is_not_a_result() {
        for body in [&br#"{"ok":true}"#[..], &b"{}"[..], &br#"{"unexpected":1}"#[..]] {
            let lenient = update_result(StatusCode::CREATED, body, LENIENT, "insert").unwrap();
            assert_eq!(lenient, UpdateResult::sentinel());

            assert!(matches!(
                update_result(StatusCode::CREATED, body, STRICT, "insert"),
                Err(ClientError::Decode(_))
            ));
        }
    }

    #[test]
    fn test_error_status_wins_over_well_formed_body() {
        let body = br#"{"ok":true,"id":"doc1","rev":"1-abc"}"#;
        match update_result(StatusCode::CONFLICT, body, STRICT, "update") {
            Err(ClientError::Server { status, .. }) => assert_eq!(status, 409),
            other => panic!("unexpected result: {other:?}"),
        }
        assert!(update_result(StatusCode::CONFLICT, body, LENIENT, "update")
            .unwrap()
            .is_sentinel());
    }

    #[test]
    fn test_update_result_decodes() {
        let result = update_result(
            StatusCode::CREATED,
            br#"{"ok":true,"id":"doc1","rev":"1-abc"}"#,
            STRICT,
            "insert",
        )
        .unwrap();
        assert!(result.ok);
        assert_eq!(result.id, "doc1");
        assert_eq!(result.rev, "1-abc");
    }

    #[test]
    fn test_error_message_falls_back_to_text() {
        assert_eq!(error_message(b"Bad Gateway\n"), "Bad Gateway");
        assert_eq!(error_message(br#"{"error":"not_found"}"#), "not_found");
    }
}
