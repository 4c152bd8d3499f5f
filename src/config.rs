//! Configuration for consensus-script
//!
//! Verification and signing parameters, loadable from JSON, from
//! environment variables, or built programmatically.

use crate::error::{ConsensusError, Result};
use crate::script::flags::ScriptFlags;
use crate::sighash::SighashVariant;
use crate::solver::SolverOptions;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// Verification configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifierConfig {
    /// Script flags by their Bitcoin Core names
    /// Default: P2SH, WITNESS
    #[serde(default = "default_flags")]
    pub flags: Vec<String>,

    /// Which chain's signature hashes to check against
    #[serde(default)]
    pub variant: SighashVariant,
}

fn default_flags() -> Vec<String> {
    ScriptFlags::DEFAULT
        .names()
        .into_iter()
        .map(String::from)
        .collect()
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            flags: default_flags(),
            variant: SighashVariant::default(),
        }
    }
}

impl VerifierConfig {
    /// Unknown flag names are rejected.
    pub fn script_flags(&self) -> Result<ScriptFlags> {
        ScriptFlags::from_names(&self.flags)
    }
}

/// Signing configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignerConfig {
    /// Hash type appended to new signatures
    /// Default: the chain's `SIGHASH_ALL` (with `FORKID` on fork-id chains)
    #[serde(default)]
    pub hash_type: Option<u32>,

    /// Hex bytes put into multisig slots that cannot be signed yet;
    /// `null` leaves such inputs unsolved
    /// Default: "" (empty push)
    #[serde(default = "default_placeholder")]
    pub signature_placeholder: Option<String>,

    /// Hash types under which existing signatures are reused
    #[serde(default)]
    pub sig_hash_types_to_try: Vec<u32>,

    #[serde(default)]
    pub variant: SighashVariant,

    /// Flags inputs are checked against before being (re)signed
    #[serde(default = "default_flags")]
    pub flags: Vec<String>,
}

fn default_placeholder() -> Option<String> {
    Some(String::new())
}

impl Default for SignerConfig {
    fn default() -> Self {
        Self {
            hash_type: None,
            signature_placeholder: default_placeholder(),
            sig_hash_types_to_try: Vec::new(),
            variant: SighashVariant::default(),
            flags: default_flags(),
        }
    }
}

impl SignerConfig {
    pub fn solver_options(&self) -> Result<SolverOptions> {
        let signature_placeholder = self
            .signature_placeholder
            .as_deref()
            .map(hex::decode)
            .transpose()?;
        Ok(SolverOptions {
            hash_type: self
                .hash_type
                .unwrap_or_else(|| self.variant.default_hash_type()),
            signature_placeholder,
            sig_hash_types_to_try: self.sig_hash_types_to_try.clone(),
            variant: self.variant,
            flags: ScriptFlags::from_names(&self.flags)?,
        })
    }
}

/// Complete configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub verifier: VerifierConfig,

    #[serde(default)]
    pub signer: SignerConfig,
}

impl EngineConfig {
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| ConsensusError::Config(Cow::Owned(e.to_string())))
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| ConsensusError::Config(Cow::Owned(e.to_string())))
    }

    /// Defaults overridden from the environment:
    /// - `CONSENSUS_SCRIPT_FLAGS=P2SH,WITNESS,NULLFAIL` (both verifier and signer)
    /// - `CONSENSUS_SCRIPT_VARIANT=bitcoin_cash`
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        if let Ok(val) = std::env::var("CONSENSUS_SCRIPT_FLAGS") {
            let flags: Vec<String> = val
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
            ScriptFlags::from_names(&flags)?;
            config.verifier.flags = flags.clone();
            config.signer.flags = flags;
        }
        if let Ok(val) = std::env::var("CONSENSUS_SCRIPT_VARIANT") {
            let variant: SighashVariant = serde_json::from_value(serde_json::Value::String(val))
                .map_err(|e| ConsensusError::Config(Cow::Owned(e.to_string())))?;
            config.verifier.variant = variant;
            config.signer.variant = variant;
        }
        Ok(config)
    }
}
