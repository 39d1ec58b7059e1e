//! Query string handling
//!
//! Handlers take the raw `(key, value)` pairs and validate them against the
//! keys the endpoint accepts, so repeated keys such as `tags` keep every
//! occurrence and unknown keys are rejected.

use devmon_core::GatewayError;

use crate::error::ApiError;

/// Validated query parameters of one request
#[derive(Debug, Default)]
pub struct Params {
    pairs: Vec<(String, String)>,
}

impl Params {
    /// Accept `pairs` if every key is in `allowed`
    pub fn parse(pairs: Vec<(String, String)>, allowed: &[&str]) -> Result<Self, ApiError> {
        if let Some((key, _)) = pairs.iter().find(|(k, _)| !allowed.contains(&k.as_str())) {
            return Err(ApiError(
                GatewayError::invalid_usage(format!(
                    "invalid query parameter: {}",
                    key
                ))
                .with_context(format!("supported parameters: {}", allowed.join(", "))),
            ));
        }
        Ok(Self { pairs })
    }

    /// Last value given for `key`, ignoring empty values
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .rev()
            .find(|(k, v)| k == key && !v.is_empty())
            .map(|(_, v)| v.as_str())
    }

    /// Every comma-separated value across all occurrences of `key`
    pub fn list(&self, key: &str) -> Vec<String> {
        self.pairs
            .iter()
            .filter(|(k, _)| k == key)
            .flat_map(|(_, v)| split(v))
            .collect()
    }

    /// One tag group per occurrence of `tags`
    pub fn tag_groups(&self) -> Vec<Vec<String>> {
        self.pairs
            .iter()
            .filter(|(k, _)| k == "tags")
            .map(|(_, v)| split(v))
            .filter(|group| !group.is_empty())
            .collect()
    }

    /// Boolean flag; absent means false
    pub fn flag(&self, key: &str) -> Result<bool, ApiError> {
        match self.get(key) {
            None => Ok(false),
            Some(v) => match v.to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" => Ok(true),
                "false" | "0" | "no" => Ok(false),
                _ => Err(ApiError::invalid_usage(format!(
                    "invalid value for '{}': {}",
                    key, v
                ))),
            },
        }
    }
}

fn split(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
