use std::path::PathBuf;
use std::str::FromStr;

/// Server settings, read once at startup from `SPACEBOOK_*` environment
/// variables. Unset or unparseable values fall back to the defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub bind: String,
    pub port: u16,
    pub data_dir: PathBuf,
    pub max_connections: usize,
    pub metrics_port: Option<u16>,
    /// Days of demo bookings to seed from today, if any.
    pub seed_demo_days: Option<u32>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".into(),
            port: 7878,
            data_dir: PathBuf::from("./data"),
            max_connections: 256,
            metrics_port: None,
            seed_demo_days: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            bind: lookup("SPACEBOOK_BIND").unwrap_or(defaults.bind),
            port: parsed(&lookup, "SPACEBOOK_PORT").unwrap_or(defaults.port),
            data_dir: lookup("SPACEBOOK_DATA_DIR").map_or(defaults.data_dir, PathBuf::from),
            max_connections: parsed(&lookup, "SPACEBOOK_MAX_CONNECTIONS")
                .filter(|&n: &usize| n > 0)
                .unwrap_or(defaults.max_connections),
            metrics_port: parsed(&lookup, "SPACEBOOK_METRICS_PORT"),
            seed_demo_days: parsed(&lookup, "SPACEBOOK_SEED_DEMO_DAYS"),
        }
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }
}

fn parsed<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    lookup(key).and_then(|s| s.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn from_map(vars: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_when_unset() {
        let config = from_map(&[]);
        assert_eq!(config, Config::default());
        assert_eq!(config.addr(), "0.0.0.0:7878");
    }

    #[test]
    fn reads_every_variable() {
        let config = from_map(&[
            ("SPACEBOOK_BIND", "127.0.0.1"),
            ("SPACEBOOK_PORT", "9000"),
            ("SPACEBOOK_DATA_DIR", "/var/lib/spacebook"),
            ("SPACEBOOK_MAX_CONNECTIONS", "16"),
            ("SPACEBOOK_METRICS_PORT", "9100"),
            ("SPACEBOOK_SEED_DEMO_DAYS", "30"),
        ]);
        assert_eq!(
            config,
            Config {
                bind: "127.0.0.1".into(),
                port: 9000,
                data_dir: PathBuf::from("/var/lib/spacebook"),
                max_connections: 16,
                metrics_port: Some(9100),
                seed_demo_days: Some(30),
            }
        );
    }

    #[test]
    fn bad_numbers_fall_back() {
        let config = from_map(&[
            ("SPACEBOOK_PORT", "http"),
            ("SPACEBOOK_MAX_CONNECTIONS", "0"),
            ("SPACEBOOK_METRICS_PORT", "-1"),
        ]);
        assert_eq!(config.port, 7878);
        assert_eq!(config.max_connections, 256);
        assert_eq!(config.metrics_port, None);
    }
}
