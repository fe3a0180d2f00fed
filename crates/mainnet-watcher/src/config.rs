use serde::Deserialize;

use crate::error::ConfigError;

/// Recognized watcher configuration (§6). Credentials are read from the
/// environment when not present in the deserialized file, matching how the
/// teacher keeps secrets out of checked-in config.
#[derive(Clone, Debug, Deserialize)]
pub struct WatcherConfig {
    pub mainnet_rpc_url: String,
    #[serde(default)]
    pub mainnet_rpc_username: String,
    #[serde(default)]
    pub mainnet_rpc_password: String,

    #[serde(default)]
    pub smartbch_rpc_url: Option<String>,

    /// Enables the fast-sync primer (§4.5).
    #[serde(default)]
    pub speedup: bool,

    /// Epoch window length.
    pub num_blocks_in_epoch: u64,

    /// Seconds between serial-phase tip polls.
    #[serde(default = "default_waiting_block_delay_secs")]
    pub waiting_block_delay_secs: u64,

    /// Catch-up and collector worker count.
    #[serde(default = "default_parallelism")]
    pub parallelism: usize,

    /// Threshold below which no `MonitorVoteInfo` is emitted.
    #[serde(default)]
    pub start_mainnet_height_for_cc: u64,

    /// Safety lag: blocks must be this many blocks behind the tip before
    /// being treated as finalized. A compile-time constant in the distilled
    /// spec (1 in tests, >= 9 in production); exposed here as a config field
    /// per the redesign note in §9 ("lift to explicit fields").
    pub finalize_depth: u64,

    /// Disables the UTXO collector for the "amber" test chain variant.
    #[serde(default)]
    pub is_amber: bool,

    /// Bound on the retained vote-info history list.
    #[serde(default = "default_monitor_info_clean_threshold")]
    pub monitor_info_clean_threshold: usize,

    /// Hex-encoded magic byte prefix identifying this rollup's deposit
    /// `OP_RETURN` payloads (§4.6.1). Threaded into the UTXO collector's
    /// [`mainnet_watcher_utxo_parser::CovenantConfig`] on every iteration.
    #[serde(default)]
    pub deposit_magic_bytes: String,

    /// Minimum satoshi amount a deposit output must carry.
    #[serde(default)]
    pub deposit_quantity_sats: u64,
}

fn default_waiting_block_delay_secs() -> u64 {
    5
}

fn default_parallelism() -> usize {
    10
}

fn default_monitor_info_clean_threshold() -> usize {
    mainnet_watcher_primitives::MONITOR_INFO_CLEAN_THRESHOLD
}

impl WatcherConfig {
    /// Applies `MAINNET_RPC_USERNAME` / `MAINNET_RPC_PASSWORD` environment
    /// overrides on top of whatever was deserialized, then validates.
    pub fn finalize(mut self) -> Result<Self, ConfigError> {
        if let Ok(user) = std::env::var("MAINNET_RPC_USERNAME") {
            self.mainnet_rpc_username = user;
        }
        if let Ok(pass) = std::env::var("MAINNET_RPC_PASSWORD") {
            self.mainnet_rpc_password = pass;
        }
        self.validate()?;
        Ok(self)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.num_blocks_in_epoch == 0 {
            return Err(ConfigError::InvalidField("num_blocks_in_epoch must be > 0"));
        }
        if self.parallelism == 0 {
            return Err(ConfigError::InvalidField("parallelism must be > 0"));
        }
        if self.mainnet_rpc_url.is_empty() {
            return Err(ConfigError::InvalidField("mainnet_rpc_url must be set"));
        }
        self.deposit_magic_bytes_decoded()?;
        Ok(())
    }

    /// Decodes [`Self::deposit_magic_bytes`]. An empty string decodes to an
    /// empty prefix, which matches nothing — the collector then never
    /// recognizes deposits, which is the deliberate "not configured" state
    /// rather than an error.
    pub fn deposit_magic_bytes_decoded(&self) -> Result<Vec<u8>, ConfigError> {
        hex::decode(&self.deposit_magic_bytes).map_err(|source| ConfigError::InvalidHex {
            field: "deposit_magic_bytes",
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> WatcherConfig {
        WatcherConfig {
            mainnet_rpc_url: "http://localhost:8545".into(),
            mainnet_rpc_username: "u".into(),
            mainnet_rpc_password: "p".into(),
            smartbch_rpc_url: None,
            speedup: false,
            num_blocks_in_epoch: 100,
            waiting_block_delay_secs: 5,
            parallelism: 10,
            start_mainnet_height_for_cc: 0,
            finalize_depth: 9,
            is_amber: false,
            monitor_info_clean_threshold: 5,
            deposit_magic_bytes: "6d6763".into(),
            deposit_quantity_sats: 1_000,
        }
    }

    #[test]
    fn rejects_zero_epoch_length() {
        let mut cfg = base();
        cfg.num_blocks_in_epoch = 0;
        assert!(cfg.finalize().is_err());
    }

    #[test]
    fn rejects_zero_parallelism() {
        let mut cfg = base();
        cfg.parallelism = 0;
        assert!(cfg.finalize().is_err());
    }

    #[test]
    fn accepts_valid_config() {
        assert!(base().finalize().is_ok());
    }

    #[test]
    fn rejects_non_hex_magic_bytes() {
        let mut cfg = base();
        cfg.deposit_magic_bytes = "not hex".into();
        assert!(cfg.finalize().is_err());
    }

    #[test]
    fn decodes_magic_bytes() {
        let cfg = base();
        assert_eq!(cfg.deposit_magic_bytes_decoded().unwrap(), b"mgc".to_vec());
    }
}
