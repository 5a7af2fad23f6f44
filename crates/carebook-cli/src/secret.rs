//! API token lookup.
//!
//! Patients rarely want a bearer token sitting in plain text next to the
//! rest of their settings, so `[api] token` (and `--token`) may name where
//! the token lives instead:
//!
//! - `env::CAREBOOK_TOKEN_VAR` takes it from that environment variable
//! - `pass::carebook/api` takes the first line of that password-store entry
//!
//! Any other value is the token itself.

use std::process::Command;

/// Where an API token comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenSource<'a> {
    Inline(&'a str),
    Env(&'a str),
    Pass(&'a str),
}

impl<'a> TokenSource<'a> {
    pub fn parse(value: &'a str) -> Self {
        if let Some(var) = value.strip_prefix("env::") {
            Self::Env(var)
        } else if let Some(entry) = value.strip_prefix("pass::") {
            Self::Pass(entry)
        } else {
            Self::Inline(value)
        }
    }

    /// Looks the token up. Referenced tokens are trimmed and must not be
    /// blank; inline values are returned untouched.
    pub fn fetch(&self) -> Result<String, String> {
        let token = match self {
            Self::Inline(token) => return Ok(token.to_string()),
            Self::Env(var) => std::env::var(var)
                .map_err(|_| format!("environment variable `{}` is not set", var))?,
            Self::Pass(entry) => read_pass_entry(entry)?,
        };

        let token = token.trim();
        if token.is_empty() {
            return Err(format!("token from {} is empty", self));
        }
        Ok(token.to_string())
    }
}

impl std::fmt::Display for TokenSource<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Inline(_) => write!(f, "inline value"),
            Self::Env(var) => write!(f, "`env::{}`", var),
            Self::Pass(entry) => write!(f, "`pass::{}`", entry),
        }
    }
}

/// Resolves a configured token value to the token to send.
pub fn resolve(value: &str) -> Result<String, String> {
    TokenSource::parse(value).fetch()
}

fn read_pass_entry(entry: &str) -> Result<String, String> {
    let output = Command::new("pass")
        .args(["show", entry])
        .output()
        .map_err(|e| format!("cannot run pass for `{}`: {}", entry, e))?;

    if !output.status.success() {
        return Err(format!(
            "pass could not read `{}` ({}): {}",
            entry,
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        ));
    }

    String::from_utf8_lossy(&output.stdout)
        .lines()
        .next()
        .map(str::to_string)
        .ok_or_else(|| format!("pass entry `{}` is empty", entry))
}
