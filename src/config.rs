//! Credentials supplied by the user and persisted in the settings store.

use serde::{Deserialize, Serialize};

use crate::broker::Mt5Config;

/// Environment variables that override stored credentials.
pub const ENV_GEMINI_API_KEY: &str = "GEMINI_API_KEY";
pub const ENV_MT5_SERVER: &str = "MT5_SERVER";
pub const ENV_MT5_LOGIN: &str = "MT5_LOGIN";
pub const ENV_MT5_PASSWORD: &str = "MT5_PASSWORD";

/// API key for the decision service plus broker login details.
///
/// The broker fields are accepted and stored but never validated.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Credentials {
    pub gemini_api_key: String,
    pub mt5_server: String,
    pub mt5_login: String,
    pub mt5_password: String,
}

impl Credentials {
    pub fn has_api_key(&self) -> bool {
        !self.gemini_api_key.trim().is_empty()
    }

    /// Replace fields with any non-empty values from the environment.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|name| std::env::var(name).ok())
    }

    fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let fields: [(&str, &mut String); 4] = [
            (ENV_GEMINI_API_KEY, &mut self.gemini_api_key),
            (ENV_MT5_SERVER, &mut self.mt5_server),
            (ENV_MT5_LOGIN, &mut self.mt5_login),
            (ENV_MT5_PASSWORD, &mut self.mt5_password),
        ];
        for (name, field) in fields {
            if let Some(value) = lookup(name).filter(|v| !v.trim().is_empty()) {
                *field = value;
            }
        }
        self
    }

    /// Fill empty fields from `other`.
    pub fn merged_with(mut self, other: &Credentials) -> Self {
        if self.gemini_api_key.is_empty() {
            self.gemini_api_key = other.gemini_api_key.clone();
        }
        if self.mt5_server.is_empty() {
            self.mt5_server = other.mt5_server.clone();
        }
        if self.mt5_login.is_empty() {
            self.mt5_login = other.mt5_login.clone();
        }
        if self.mt5_password.is_empty() {
            self.mt5_password = other.mt5_password.clone();
        }
        self
    }

    pub fn mt5_config(&self) -> Mt5Config {
        Mt5Config {
            server: self.mt5_server.clone(),
            login: self.mt5_login.clone(),
            password: self.mt5_password.clone(),
        }
    }
}

/// Show only the last four characters of a secret.
pub fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.is_empty() {
        return "(not set)".to_string();
    }
    if chars.len() <= 4 {
        return "*".repeat(chars.len());
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}{}", "*".repeat(chars.len() - 4), tail)
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("gemini_api_key", &mask_secret(&self.gemini_api_key))
            .field("mt5_server", &self.mt5_server)
            .field("mt5_login", &self.mt5_login)
            .field("mt5_password", &mask_secret(&self.mt5_password))
            .finish()
    }
}

impl std::fmt::Display for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Gemini API Key:  {}", mask_secret(&self.gemini_api_key))?;
        writeln!(f, "MT5 Server:      {}", self.mt5_server)?;
        writeln!(f, "MT5 Login:       {}", self.mt5_login)?;
        writeln!(f, "MT5 Password:    {}", mask_secret(&self.mt5_password))?;
        Ok(())
    }
}
