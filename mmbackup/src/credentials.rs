use anyhow::{Context, Result, anyhow, bail};
use serde::Deserialize;
use std::{fs, path::Path};

/// Contents of the secrets file. Every field is optional, the server decides
/// whether what is present is enough.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Credentials {
    pub login_id: Option<String>,
    pub password: Option<String>,
    pub token: Option<String>,
    /// One-time code sent along with a password login on MFA accounts.
    pub mfa_token: Option<String>,
}

const STRING_FIELDS: [&str; 4] = ["login_id", "password", "token", "mfa_token"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthMethod<'a> {
    Token(&'a str),
    Password {
        login_id: &'a str,
        password: &'a str,
        mfa_token: Option<&'a str>,
    },
}

impl Credentials {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read secrets file {}", path.display()))?;
        Self::from_json(&content)
            .with_context(|| format!("Invalid secrets file {}", path.display()))
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(content)?;
        let object = value
            .as_object()
            .ok_or_else(|| anyhow!("credentials must be a JSON object"))?;

        // Present fields must be strings, null included.
        for field in STRING_FIELDS {
            if let Some(field_value) = object.get(field) {
                if !field_value.is_string() {
                    bail!("credential field {} must be a string", field);
                }
            }
        }

        Ok(serde_json::from_value(value)?)
    }

    /// A token takes precedence over a login id and password pair.
    pub fn auth_method(&self) -> Result<AuthMethod<'_>> {
        if let Some(token) = self.token.as_deref() {
            return Ok(AuthMethod::Token(token));
        }

        match (self.login_id.as_deref(), self.password.as_deref()) {
            (Some(login_id), Some(password)) => Ok(AuthMethod::Password {
                login_id,
                password,
                mfa_token: self.mfa_token.as_deref(),
            }),
            _ => Err(anyhow!(
                "credentials need either a token or both login_id and password"
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_any_subset_of_fields() {
        let credentials = Credentials::from_json(r#"{"login_id": "alice", "password": "secret"}"#)
            .unwrap();
        assert_eq!(credentials.login_id.as_deref(), Some("alice"));
        assert!(credentials.token.is_none());

        let credentials = Credentials::from_json("{}").unwrap();
        assert!(credentials.login_id.is_none());
    }

    #[test]
    fn test_ignores_unknown_fields() {
        let credentials =
            Credentials::from_json(r#"{"token": "abc", "comment": "personal token"}"#).unwrap();
        assert_eq!(credentials.token.as_deref(), Some("abc"));
    }

    #[test]
    fn test_rejects_wrong_field_type() {
        assert!(Credentials::from_json(r#"{"login_id": "alice", "password": 1234}"#).is_err());
        assert!(Credentials::from_json(r#"{"token": ["a"]}"#).is_err());
        assert!(Credentials::from_json(r#"{"token": "abc", "mfa_token": 123456}"#).is_err());
    }

    #[test]
    fn test_rejects_null_field() {
        let error =
            Credentials::from_json(r#"{"login_id": "alice", "password": null}"#).unwrap_err();
        assert!(error.to_string().contains("password"), "{}", error);
        assert!(Credentials::from_json(r#"{"token": null}"#).is_err());
    }

    #[test]
    fn test_rejects_non_object() {
        assert!(Credentials::from_json(r#"["alice", "secret"]"#).is_err());
        assert!(Credentials::from_json(r#""token""#).is_err());
        assert!(Credentials::from_json("not json").is_err());
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("secrets.json");
        fs::write(&path, r#"{"token": "abc"}"#).unwrap();

        let credentials = Credentials::from_file(&path).unwrap();
        assert_eq!(credentials.auth_method().unwrap(), AuthMethod::Token("abc"));

        let missing = Credentials::from_file(&dir.path().join("missing.json"));
        assert!(missing.unwrap_err().to_string().contains("Failed to read"));
    }

    #[test]
    fn test_auth_method() {
        let both = Credentials {
            login_id: Some("alice".into()),
            password: Some("secret".into()),
            token: Some("abc".into()),
            mfa_token: None,
        };
        assert_eq!(both.auth_method().unwrap(), AuthMethod::Token("abc"));

        let password = Credentials {
            token: None,
            ..both.clone()
        };
        assert_eq!(
            password.auth_method().unwrap(),
            AuthMethod::Password {
                login_id: "alice",
                password: "secret",
                mfa_token: None,
            }
        );

        let with_mfa = Credentials {
            mfa_token: Some("123456".into()),
            ..password.clone()
        };
        assert_eq!(
            with_mfa.auth_method().unwrap(),
            AuthMethod::Password {
                login_id: "alice",
                password: "secret",
                mfa_token: Some("123456"),
            }
        );

        let incomplete = Credentials {
            login_id: Some("alice".into()),
            ..Credentials::default()
        };
        assert!(incomplete.auth_method().is_err());
    }
}
