use std::path::PathBuf;

const DEFAULT_DB_PATH: &str = "data/pinmap.redb";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_MAX_BLOB_BYTES: usize = 10 * 1024 * 1024;

/// Server settings, read from the environment.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub db_path: PathBuf,
    pub port: u16,
    pub max_blob_bytes: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            port: DEFAULT_PORT,
            max_blob_bytes: DEFAULT_MAX_BLOB_BYTES,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable lookup so tests need not touch the process env.
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        let mut config = Config::default();
        if let Some(path) = lookup("DB_PATH") {
            config.db_path = PathBuf::from(path);
        }
        if let Some(port) = lookup("PORT") {
            config.port = port
                .parse()
                .map_err(|e| format!("Invalid PORT {:?}: {}", port, e))?;
        }
        if let Some(max) = lookup("MAX_BLOB_BYTES") {
            config.max_blob_bytes = max
                .parse()
                .map_err(|e| format!("Invalid MAX_BLOB_BYTES {:?}: {}", max, e))?;
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.port, 3000);
        assert_eq!(config.db_path, PathBuf::from("data/pinmap.redb"));
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("DB_PATH", "/tmp/x.redb"),
            ("PORT", "8080"),
            ("MAX_BLOB_BYTES", "42"),
        ]))
        .unwrap();
        assert_eq!(config.db_path, PathBuf::from("/tmp/x.redb"));
        assert_eq!(config.port, 8080);
        assert_eq!(config.max_blob_bytes, 42);
    }

    #[test]
    fn test_invalid_port() {
        let err = Config::from_lookup(lookup(&[("PORT", "not-a-port")])).unwrap_err();
        assert!(err.contains("Invalid PORT"));
    }
}
