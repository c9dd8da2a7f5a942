// Environment variable loading

use crate::Result;
use std::collections::HashMap;
use std::env;

/// Environment variable loader
///
/// With a prefix, only variables starting with it are kept and the prefix
/// is stripped: `RESTIVE_MAX_BODY_BYTES` becomes `max_body_bytes`.
pub struct EnvLoader {
    prefix: Option<String>,
}

impl EnvLoader {
    pub fn new(prefix: Option<String>) -> Self {
        Self { prefix }
    }

    /// Load from the process environment
    pub fn load(&self) -> Result<HashMap<String, String>> {
        Ok(self.collect(env::vars()))
    }

    /// Filter and normalise an arbitrary set of variables
    pub fn collect<I>(&self, vars: I) -> HashMap<String, String>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut config = HashMap::new();

        for (key, value) in vars {
            match &self.prefix {
                Some(prefix) => {
                    if let Some(rest) = key.strip_prefix(prefix.as_str()) {
                        config.insert(rest.trim_start_matches('_').to_lowercase(), value);
                    }
                }
                None => {
                    config.insert(key.to_lowercase(), value);
                }
            }
        }

        config
    }
}

impl Default for EnvLoader {
    fn default() -> Self {
        Self::new(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // std::env::set_var is unsafe in edition 2024, so prefix handling is
    // exercised through `collect` with synthetic variables.

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_prefix_is_stripped_and_filtered() {
        let loader = EnvLoader::new(Some("RESTIVE_".to_string()));
        let loaded = loader.collect(vars(&[
            ("RESTIVE_ADDRESS", "0.0.0.0:9000"),
            ("RESTIVE_LOG_LEVEL", "debug"),
            ("HOME", "/root"),
        ]));

        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded["address"], "0.0.0.0:9000");
        assert_eq!(loaded["log_level"], "debug");
    }

    #[test]
    fn test_no_prefix_keeps_everything() {
        let loaded = EnvLoader::default().collect(vars(&[("PATH", "/bin"), ("X", "1")]));
        assert_eq!(loaded["path"], "/bin");
        assert_eq!(loaded["x"], "1");
    }
}
