//! Configuration loader backed by environment variables

use super::ConfigError;
use serde::de::DeserializeOwned;
use std::collections::HashMap;

/// Configuration loader
///
/// Reads `UPPER_SNAKE` variables and exposes them as `lower_snake` keys, so
/// `USER_POOLS_ID` deserializes into a `user_pools_id` field. Empty values
/// count as unset.
pub struct ConfigLoader {
    vars: Option<HashMap<String, String>>,
}

impl ConfigLoader {
    /// Read from the process environment
    pub fn from_env() -> Self {
        Self { vars: None }
    }

    /// Read from an explicit variable map instead of the process environment
    pub fn from_vars(vars: HashMap<String, String>) -> Self {
        Self { vars: Some(vars) }
    }

    /// Deserialize a configuration section
    pub fn load<T: DeserializeOwned>(&self) -> Result<T, ConfigError> {
        // Values stay strings; numeric fields are converted on deserialize
        let source = config::Environment::default()
            .ignore_empty(true)
            .source(
                self.vars
                    .as_ref()
                    .map(|vars| vars.clone().into_iter().collect()),
            );

        let config = config::Config::builder().add_source(source).build()?;
        Ok(config.try_deserialize::<T>()?)
    }
}
