//! Environment-var overrides for [`tcc_core::TxManagerOptions`].
//!
//! The core options struct stays storage/runtime agnostic; loading it from
//! the environment is a binary-level concern, wired here with the `config`
//! crate the way a host application would.

use std::time::Duration;

use serde::Deserialize;
use tcc_base::Result;
use tcc_core::TxManagerOptions;

#[derive(Debug, Deserialize)]
struct RawSettings {
    #[serde(default)]
    timeout_ms: Option<u64>,
    #[serde(default)]
    monitor_tick_ms: Option<u64>,
}

/// Load `TCC_TIMEOUT_MS` / `TCC_MONITOR_TICK_MS` from the environment,
/// falling back to [`TxManagerOptions::default`] for anything unset.
pub fn load() -> Result<TxManagerOptions> {
    let raw: RawSettings = config::Config::builder()
        .add_source(config::Environment::with_prefix("TCC"))
        .build()?
        .try_deserialize()?;

    let mut opts = TxManagerOptions::default();
    if let Some(ms) = raw.timeout_ms {
        opts = opts.with_timeout(Duration::from_millis(ms));
    }
    if let Some(ms) = raw.monitor_tick_ms {
        opts = opts.with_monitor_tick(Duration::from_millis(ms));
    }
    Ok(opts)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_when_env_unset() {
        let opts = load().unwrap();
        assert_eq!(opts.timeout, TxManagerOptions::default().timeout);
        assert_eq!(opts.monitor_tick, TxManagerOptions::default().monitor_tick);
    }
}
