use anyhow::Context;
use serde::Deserialize;
use std::{fs, str::FromStr};

use crate::forest::ForestParams;

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub port: u16,
    /// CSV export to train on at startup; the bundled sample when unset.
    pub trips_path: Option<String>,
    pub forest: ForestParams,
    pub hotspots_top_n: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            trips_path: None,
            forest: ForestParams::default(),
            hotspots_top_n: 5,
        }
    }
}

impl AppConfig {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("failed to read config at {}", path))?;
        serde_json::from_str(&data).with_context(|| format!("invalid config JSON in {}", path))
    }

    /// JSON file from `CONFIG_PATH` (if set), then env overrides on top.
    pub fn from_env() -> anyhow::Result<Self> {
        let mut cfg = match std::env::var("CONFIG_PATH") {
            Ok(path) => Self::load(&path)?,
            Err(_) => Self::default(),
        };
        cfg.apply_overrides(|key| std::env::var(key).ok());
        Ok(cfg)
    }

    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = parse_var(&lookup, "PORT") {
            self.port = port;
        }
        if let Some(path) = lookup("TRIPS_PATH").filter(|p| !p.is_empty()) {
            self.trips_path = Some(path);
        }
        if let Some(n) = parse_var(&lookup, "FOREST_TREES") {
            self.forest.n_trees = n;
        }
        if let Some(seed) = parse_var(&lookup, "FOREST_SEED") {
            self.forest.seed = seed;
        }
    }
}

fn parse_var<T: FromStr, F: Fn(&str) -> Option<String>>(lookup: &F, key: &str) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!("ignoring {}={:?}: not a valid value", key, raw);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_partial_json_uses_defaults() {
        let cfg: AppConfig = serde_json::from_str(r#"{ "port": 9000, "forest": { "n_trees": 10 } }"#).unwrap();
        assert_eq!(cfg.port, 9000);
        assert_eq!(cfg.forest.n_trees, 10);
        assert_eq!(cfg.forest.seed, 42);
        assert_eq!(cfg.hotspots_top_n, 5);
        assert!(cfg.trips_path.is_none());
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [("PORT", "3000"), ("FOREST_TREES", "lots"), ("FOREST_SEED", "7")]
            .into_iter()
            .collect();
        let mut cfg = AppConfig::default();
        cfg.apply_overrides(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(cfg.port, 3000);
        assert_eq!(cfg.forest.n_trees, 100, "bad values are ignored");
        assert_eq!(cfg.forest.seed, 7);
    }

    #[test]
    fn test_missing_file() {
        assert!(AppConfig::load("/nonexistent/config.json").is_err());
    }
}
