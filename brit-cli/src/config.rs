//! CLI configuration file.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use brit_lib::fees::FeePolicy;
use brit_lib::matcher::MatcherConfig;
use brit_lib::payer::PayerConfig;
use brit_lib::BitcoinNetwork;

/// File name looked up in the data directory.
pub const CONFIG_FILE: &str = "brit.json";

/// Contents of `brit.json`. Every section is optional.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CliConfig {
    #[serde(default)]
    pub network: BitcoinNetwork,

    /// Payer settings; required for `exchange` unless `--url` is given.
    #[serde(default)]
    pub payer: Option<PayerConfig>,

    /// Matcher settings; `matcher.network` is the network of the pool file.
    #[serde(default)]
    pub matcher: MatcherConfig,

    #[serde(default)]
    pub fees: FeePolicy,
}

impl CliConfig {
    /// Load `explicit`, or `brit.json` in `data_dir` if present, or defaults.
    pub fn load(data_dir: &Path, explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => {
                let path = data_dir.join(CONFIG_FILE);
                if !path.exists() {
                    return Ok(Self::default());
                }
                path
            }
        };
        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: Self = serde_json::from_str(&text)
            .with_context(|| format!("parsing config {}", path.display()))?;
        tracing::debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    /// Payer settings for `url`, keeping timeouts from the config file.
    pub fn payer_for(&self, url: Option<String>) -> Option<PayerConfig> {
        match (url, &self.payer) {
            (Some(url), Some(payer)) => Some(PayerConfig {
                matcher_url: url,
                ..payer.clone()
            }),
            (Some(url), None) => Some(PayerConfig::new(url)),
            (None, payer) => payer.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_is_default() {
        let dir = TempDir::new().unwrap();
        let config = CliConfig::load(dir.path(), None).unwrap();
        assert_eq!(config.network, BitcoinNetwork::Mainnet);
        assert!(config.payer.is_none());
    }

    #[test]
    fn test_partial_file() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE),
            r#"{"network":"testnet","payer":{"matcher_url":"https://m.example","timeout_secs":5},"fees":{"send_jitter":0}}"#,
        )
        .unwrap();
        let config = CliConfig::load(dir.path(), None).unwrap();
        assert_eq!(config.network, BitcoinNetwork::Testnet);
        assert_eq!(config.fees.send_jitter, 0);
        assert_eq!(config.fees.min_sends_between_fees, 20);

        let payer = config.payer_for(Some("https://other.example".into())).unwrap();
        assert_eq!(payer.matcher_url, "https://other.example");
        assert_eq!(payer.timeout_secs, 5);
    }

    #[test]
    fn test_explicit_missing_file_fails() {
        let dir = TempDir::new().unwrap();
        assert!(CliConfig::load(dir.path(), Some(&dir.path().join("nope.json"))).is_err());
    }
}
