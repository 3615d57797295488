//! # Deployment File
//!
//! A deployment describes the contract a node should create on first run:
//! its owner plus the [`PresaleConfig`] constructor arguments. It is written
//! by `presale-node init` and read by `presale-node run --deployment`.
//!
//! ```json
//! {
//!   "owner": "0x0101010101010101010101010101010101010101",
//!   "name": "NFTPresale",
//!   "symbol": "NPS",
//!   "base_uri": "google.com",
//!   "maximum_nft_supply": 1200,
//!   "presale_duration_secs": 86400
//! }
//! ```

use anyhow::{bail, Context, Result};
use presale_contracts::PresaleConfig;
use presale_protocol::config::DEFAULT_PRESALE_DURATION;
use presale_protocol::Address;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::cli::ContractArgs;

/// Owner and constructor arguments for a new presale contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deployment {
    pub owner: Address,
    #[serde(flatten)]
    pub contract: PresaleConfig,
}

impl Deployment {
    /// Reads a deployment from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read deployment file {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("malformed deployment file {}", path.display()))
    }

    /// Writes the deployment as pretty JSON. Refuses to clobber an existing
    /// file unless `overwrite` is set.
    pub fn save(&self, path: &Path, overwrite: bool) -> Result<()> {
        if path.exists() && !overwrite {
            bail!(
                "{} already exists (pass --force to overwrite)",
                path.display()
            );
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
            .with_context(|| format!("failed to write deployment file {}", path.display()))
    }

    /// Builds the effective deployment for `run`.
    ///
    /// Starts from `file` when given, otherwise from the reference defaults,
    /// then applies every flag or environment override that is set. The
    /// owner has no default and must come from one of the two sources.
    pub fn resolve(file: Option<&Path>, overrides: &ContractArgs) -> Result<Self> {
        let (owner, mut contract) = match file {
            Some(path) => {
                let d = Self::load(path)?;
                (Some(d.owner), d.contract)
            }
            None => (
                None,
                PresaleConfig::new("NFTPresale", "NPS", "google.com", 1200)
                    .with_presale_duration(DEFAULT_PRESALE_DURATION),
            ),
        };

        let owner = match overrides.owner.as_deref() {
            Some(raw) => raw
                .parse::<Address>()
                .with_context(|| format!("invalid owner address {:?}", raw))?,
            None => owner.context("no owner given: pass --owner or --deployment")?,
        };

        if let Some(name) = &overrides.name {
            contract.name = name.clone();
        }
        if let Some(symbol) = &overrides.symbol {
            contract.symbol = symbol.clone();
        }
        if let Some(base_uri) = &overrides.base_uri {
            contract.base_uri = base_uri.clone();
        }
        if let Some(max) = overrides.max_supply {
            contract.maximum_nft_supply = max;
        }
        if let Some(secs) = overrides.presale_duration_secs {
            contract.presale_duration_secs = secs;
        }

        contract.validate()?;
        Ok(Self { owner, contract })
    }
}
