use serde::{Deserialize, Serialize};

/// Body of `POST accounts/jwt/create/`.
#[derive(Debug, Clone, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

/// Successful `jwt/create` response.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

/// Body of `POST accounts/jwt/refresh/`.
#[derive(Debug, Clone, Serialize)]
pub struct RefreshRequest<'a> {
    pub refresh: &'a str,
}

/// Successful `jwt/refresh` response.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AccessToken {
    pub access: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Registration {
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub sex: String,
    pub birthday: Option<String>,
    pub first_name: String,
    pub last_name: String,
}

/// Activation link parameters sent by email after registration.
#[derive(Debug, Clone, Serialize)]
pub struct Activation {
    pub uid: String,
    pub token: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PasswordResetRequest {
    pub email: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PasswordResetConfirm {
    pub uid: String,
    pub token: String,
    pub new_password: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_pair_ignores_extra_fields() {
        let json = r#"{"refresh": "r.t", "access": "a.t", "lifetime": 300}"#;
        let pair: TokenPair = serde_json::from_str(json).expect("Failed to parse token pair");
        assert_eq!(pair.access, "a.t");
        assert_eq!(pair.refresh, "r.t");
    }

    #[test]
    fn test_refresh_request_body() {
        let body = serde_json::to_value(RefreshRequest { refresh: "abc" })
            .expect("Failed to serialize refresh request");
        assert_eq!(body, serde_json::json!({ "refresh": "abc" }));
    }
}
