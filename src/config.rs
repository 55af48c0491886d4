//! TOML configuration, parsing, and validation.
//!
//! One file configures the whole engine. Every section and field is
//! optional; an empty file yields the same engine as [`EngineConfig::default`].
//!
//! ```toml
//! [table]
//! limit = 1000000
//!
//! [oracle]
//! trial_division_ceiling = 10000000000
//! mr_rounds = 15
//! primesdb_path = "primes.dat"
//! primesdb_layout = "offset"
//! primesdb_sha256 = "…"
//!
//! [search]
//! sampling_threshold = 10000
//! time_budget_secs = 30.0
//! parallel = true
//! unbounded_policy = "exhaustive"
//!
//! [locator]
//! search_window = 10000000000
//! self_policy = "exclude"
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::nearest::{SelfPolicy, DEFAULT_SEARCH_WINDOW};
use crate::oracle::{DEFAULT_MR_ROUNDS, DEFAULT_TRIAL_DIVISION_CEILING};
use crate::primesdb::{AddressLayout, PrimesDbBlock};
use crate::scheduler::SchedulerConfig;
use crate::sequence::UnboundedPolicy;
use crate::table::DEFAULT_TABLE_LIMIT;

// ── TOML Configuration Structs ──────────────────────────────────

/// Maps to the `[table]`, `[oracle]`, `[search]` and `[locator]` sections.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub table: TableConfig,
    pub oracle: OracleConfig,
    pub search: SearchConfig,
    pub locator: LocatorConfig,
}

/// The `[table]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableConfig {
    /// Sieve limit; also the largest admissible search `end`.
    pub limit: u64,
}

impl Default for TableConfig {
    fn default() -> Self {
        TableConfig {
            limit: DEFAULT_TABLE_LIMIT,
        }
    }
}

/// The `[oracle]` section: primality dispatch and the optional PrimesDB block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OracleConfig {
    pub trial_division_ceiling: u64,
    pub mr_rounds: u32,
    pub primesdb_path: Option<PathBuf>,
    pub primesdb_layout: AddressLayout,
    /// Expected SHA-256 of the block, lowercase hex.
    pub primesdb_sha256: Option<String>,
}

impl Default for OracleConfig {
    fn default() -> Self {
        OracleConfig {
            trial_division_ceiling: DEFAULT_TRIAL_DIVISION_CEILING,
            mr_rounds: DEFAULT_MR_ROUNDS,
            primesdb_path: None,
            primesdb_layout: AddressLayout::default(),
            primesdb_sha256: None,
        }
    }
}

/// The `[search]` section: scheduler tuning plus the finder's length policy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    #[serde(flatten)]
    pub scheduler: SchedulerConfig,
    pub unbounded_policy: UnboundedPolicy,
}

/// The `[locator]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocatorConfig {
    pub search_window: u64,
    pub self_policy: SelfPolicy,
}

impl Default for LocatorConfig {
    fn default() -> Self {
        LocatorConfig {
            search_window: DEFAULT_SEARCH_WINDOW,
            self_policy: SelfPolicy::default(),
        }
    }
}

// ── TOML Parsing ────────────────────────────────────────────────

impl EngineConfig {
    /// Parse and validate a configuration from a TOML string.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: EngineConfig = toml::from_str(content).context("invalid engine config TOML")?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate a configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config = Self::from_toml_str(&content)
            .with_context(|| format!("loading config {}", path.display()))?;
        info!(path = %path.display(), limit = config.table.limit, "engine config loaded");
        Ok(config)
    }

    /// Check the configuration for logical consistency.
    pub fn validate(&self) -> Result<()> {
        if self.table.limit < 2 {
            anyhow::bail!("table.limit must be at least 2 (got {})", self.table.limit);
        }
        if self.oracle.mr_rounds == 0 {
            anyhow::bail!("oracle.mr_rounds must be at least 1");
        }
        if let Some(digest) = &self.oracle.primesdb_sha256 {
            if digest.len() != 64 || !digest.bytes().all(|b| b.is_ascii_hexdigit()) {
                anyhow::bail!("oracle.primesdb_sha256 must be 64 hex characters");
            }
            if self.oracle.primesdb_path.is_none() {
                anyhow::bail!("oracle.primesdb_sha256 is set but oracle.primesdb_path is not");
            }
        }

        let search = &self.search.scheduler;
        if search.sample_size == 0 {
            anyhow::bail!("search.sample_size must be at least 1");
        }
        if search.segment_size == 0 {
            anyhow::bail!("search.segment_size must be at least 1");
        }
        if !search.time_budget_secs.is_finite() || search.time_budget_secs <= 0.0 {
            anyhow::bail!(
                "search.time_budget_secs must be a positive number (got {})",
                search.time_budget_secs
            );
        }

        if self.locator.search_window < 2 {
            anyhow::bail!("locator.search_window must be at least 2");
        }
        Ok(())
    }

    /// Read the configured PrimesDB block, verifying its digest when one is
    /// given. `None` when no block is configured.
    pub fn load_primesdb(&self) -> Result<Option<PrimesDbBlock>> {
        let Some(path) = &self.oracle.primesdb_path else {
            return Ok(None);
        };
        let bytes = std::fs::read(path)
            .with_context(|| format!("reading PrimesDB block {}", path.display()))?;
        let layout = self.oracle.primesdb_layout;
        let block = match &self.oracle.primesdb_sha256 {
            Some(expected) => PrimesDbBlock::verified(bytes, layout, expected)
                .with_context(|| format!("verifying PrimesDB block {}", path.display()))?,
            None => PrimesDbBlock::new(bytes, layout),
        };
        info!(
            path = %path.display(),
            bytes = block.len(),
            ceiling = block.ceiling(),
            "PrimesDB block loaded"
        );
        Ok(Some(block))
    }
}
