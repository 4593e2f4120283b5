//! The authenticated user snapshot.

use serde::{Deserialize, Deserializer, Serialize};

/// One granted authorization scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeGrant {
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ScopeGrant {
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            description: None,
        }
    }
}

/// The resolved authenticated identity plus its scopes.
///
/// Serialized as the `users/me` payload and persisted verbatim under the
/// `"user"` storage key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    /// Numeric ids from the API are kept in their decimal form.
    #[serde(deserialize_with = "id_from_text_or_number")]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_address: Option<String>,
    #[serde(default)]
    pub scopes: Vec<ScopeGrant>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Unsigned(u64),
    Signed(i64),
}

fn id_from_text_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(id) => id,
        RawId::Unsigned(id) => id.to_string(),
        RawId::Signed(id) => id.to_string(),
    })
}

impl Principal {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            first_name: None,
            last_name: None,
            email_address: None,
            scopes: Vec::new(),
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email_address = Some(email.into());
        self
    }

    pub fn with_name(mut self, first: impl Into<String>, last: impl Into<String>) -> Self {
        self.first_name = Some(first.into());
        self.last_name = Some(last.into());
        self
    }

    pub fn with_scope(mut self, code: impl Into<String>) -> Self {
        self.scopes.push(ScopeGrant::new(code));
        self
    }

    pub fn scope_codes(&self) -> impl Iterator<Item = &str> {
        self.scopes.iter().map(|s| s.code.as_str())
    }

    /// True iff any granted code is in `required`. Empty `required` is false.
    pub fn has_any_scope<S: AsRef<str>>(&self, required: &[S]) -> bool {
        self.scope_codes()
            .any(|code| required.iter().any(|r| r.as_ref() == code))
    }

    /// "First Last", falling back to the email, then the id.
    pub fn display_name(&self) -> String {
        match (&self.first_name, &self.last_name) {
            (Some(first), Some(last)) => format!("{first} {last}"),
            (Some(first), None) => first.clone(),
            (None, Some(last)) => last.clone(),
            (None, None) => self
                .email_address
                .clone()
                .unwrap_or_else(|| self.id.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intersection_semantics() {
        let p = Principal::new("u1").with_scope("read");
        assert!(!p.has_any_scope(&["write"]));
        assert!(p.has_any_scope(&["read", "write"]));
        assert!(!p.has_any_scope::<&str>(&[]));
    }

    #[test]
    fn deserializes_api_payload() {
        let json = r#"{
            "id": "42",
            "first_name": "Robby",
            "email_address": "robby@ranch.test",
            "scopes": [{"code": "animal:read"}, {"code": "tenant:admin", "description": "Owner"}]
        }"#;
        let p: Principal = serde_json::from_str(json).unwrap();
        assert_eq!(p.id, "42");
        assert_eq!(
            p.scope_codes().collect::<Vec<_>>(),
            vec!["animal:read", "tenant:admin"]
        );
        assert_eq!(p.display_name(), "Robby");
    }

    #[test]
    fn numeric_id_is_kept_as_text() {
        let p: Principal =
            serde_json::from_str(r#"{"id": 42, "scopes": [{"code": "read"}]}"#).unwrap();
        assert_eq!(p.id, "42");
        assert!(p.has_any_scope(&["read"]));

        let stored = serde_json::to_value(&p).unwrap();
        assert_eq!(stored["id"], "42");
    }

    #[test]
    fn non_scalar_id_is_rejected() {
        assert!(serde_json::from_str::<Principal>(r#"{"id": {"value": 1}}"#).is_err());
        assert!(serde_json::from_str::<Principal>(r#"{"id": null}"#).is_err());
    }

    #[test]
    fn missing_scopes_default_to_empty() {
        let p: Principal = serde_json::from_str(r#"{"id": "7"}"#).unwrap();
        assert!(p.scopes.is_empty());
        assert_eq!(p.display_name(), "7");
    }
}
