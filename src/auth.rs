use std::fmt;

use serde::{Deserialize, Serialize};

/// Jenkins API token or password.
///
/// Serialized as a plain string; never printed by `Debug`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Token(String);

impl Token {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Token {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl From<String> for Token {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Token(***)")
    }
}

/// Username and token pair sent as HTTP basic auth.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub token: Token,
}

impl Credentials {
    pub fn new(username: impl Into<String>, token: impl Into<Token>) -> Self {
        Self {
            username: username.into(),
            token: token.into(),
        }
    }
}
