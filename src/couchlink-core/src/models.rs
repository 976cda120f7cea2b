use serde::{Deserialize, Serialize};

/// Body of a `POST /_session` response
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AuthPayload {
    #[serde(default)]
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
}

/// Authentication state held by a client for its whole lifetime.
///
/// `cookie` and `auth` are only ever written together.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct SessionState {
    pub cookie: Option<String>,
    pub auth: Option<AuthPayload>,
}

impl SessionState {
    pub fn is_authorized(&self) -> bool {
        self.auth.as_ref().is_some_and(|auth| auth.ok)
    }
}

/// UpdateResult is returned by insert, update and delete
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UpdateResult {
    pub ok: bool,
    pub id: String,
    pub rev: String,
}

impl UpdateResult {
    /// `{ok: false, id: "", rev: ""}`, returned when a response can't be decoded
    pub fn sentinel() -> Self {
        Self::default()
    }

    pub fn is_sentinel(&self) -> bool {
        *self == Self::sentinel()
    }
}

/// Error body returned by the server on non-success statuses
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub error: String,
    #[serde(default)]
    pub reason: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_authorized_only_when_ok() {
        let mut state = SessionState::default();
        assert!(!state.is_authorized());

        state.auth = Some(AuthPayload {
            ok: false,
            ..Default::default()
        });
        assert!(!state.is_authorized());

        state.auth = Some(AuthPayload {
            ok: true,
            name: Some("admin".to_string()),
            roles: vec!["_admin".to_string()],
        });
        assert!(state.is_authorized());
    }

    #[test]
    fn test_auth_payload_decodes_null_name() {
        let payload: AuthPayload =
            serde_json::from_str(r#"{"ok":true,"name":null,"roles":["_admin"]}"#).unwrap();
        assert!(payload.ok);
        assert_eq!(payload.name, None);
        assert_eq!(payload.roles, vec!["_admin"]);
    }

    #[test]
    fn test_update_result_sentinel() {
        let sentinel = UpdateResult::sentinel();
        assert!(!sentinel.ok);
        assert!(sentinel.id.is_empty());
        assert!(sentinel.rev.is_empty());
        assert!(sentinel.is_sentinel());

        let result: UpdateResult =
            serde_json::from_str(r#"{"ok":true,"id":"doc1","rev":"1-abc"}"#).unwrap();
        assert!(!result.is_sentinel());
    }

    #[test]
    fn test_update_result_requires_all_fields() {
        assert!(serde_json::from_str::<UpdateResult>(
            r#"{"error":"conflict","reason":"Document update conflict."}"#
        )
        .is_err());
        assert!(serde_json::from_str::<UpdateResult>(r#"{"ok":true}"#).is_err());
        assert!(serde_json::from_str::<UpdateResult>("{}").is_err());

        let error: ErrorBody =
            serde_json::from_str(r#"{"error":"conflict","reason":"Document update conflict."}"#)
                .unwrap();
        assert_eq!(error.error, "conflict");
    }
}
