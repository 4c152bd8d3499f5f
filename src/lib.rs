//! # Consensus-Script
//!
//! Bitcoin transaction validation and signing: the wire format, the Script
//! virtual machine, signature hashes, and a solver that produces the
//! scriptSig and witness an output asks for.
//!
//! ## Architecture
//!
//! The crate is layered bottom-up:
//! - Byte codec and hashing (`serialization`, `hashing`)
//! - Script encoding, numbers and signature encoding (`script::stream`,
//!   `script::number`, `script::der`)
//! - Transactions and signature hashes (`transaction`, `sighash`)
//! - The VM and the solution checker (`script::vm`, `script::checker`)
//! - Templates, keys and the solver (`templates`, `keys`, `solver`)
//!
//! ## Design Principles
//!
//! 1. **Byte-exact**: serialization, sighashes and script evaluation follow
//!    Bitcoin Core, including its historical quirks
//! 2. **Pure verification**: checking an input never mutates the transaction
//! 3. **Exact Version Pinning**: consensus-critical dependencies are pinned
//! 4. **Sign ⟺ Verify**: the solver is driven by the same VM the checker runs
//!
//! ## Usage
//!
//! ```rust
//! use consensus_script::curve::Curve;
//! use consensus_script::hashing::hash160;
//! use consensus_script::{templates, KeyStore, ScriptEngine, Tx, TxIn, TxOut};
//! use num_bigint::BigUint;
//!
//! let engine = ScriptEngine::new();
//! let secret = BigUint::from(1u32);
//! let keys = KeyStore::from_secret_exponents(engine.curve(), [&secret]).unwrap();
//! let sec = engine.curve().derive_public_point(&secret).unwrap().to_sec(true);
//!
//! let mut tx = Tx::new(
//!     1,
//!     vec![TxIn::new([1; 32], 0, vec![], 0xffff_ffff)],
//!     vec![TxOut::new(9_000, vec![0x51])],
//!     0,
//! );
//! tx.set_unspents(vec![Some(TxOut::new(10_000, templates::p2pkh(&hash160(&sec))))])
//!     .unwrap();
//!
//! assert_eq!(engine.sign_tx(&mut tx, &keys, &()), 0);
//! assert!(engine.verify_tx(&tx).is_ok());
//! ```

pub mod config;
pub mod constants;
pub mod curve;
pub mod error;
pub mod hashing;
pub mod keys;
pub mod opcodes;
pub mod script;
pub mod segwit;
pub mod serialization;
pub mod sighash;
pub mod solver;
pub mod templates;
pub mod transaction;
pub mod types;

// Re-export commonly used types
pub use config::{EngineConfig, SignerConfig, VerifierConfig};
pub use constants::*;
pub use curve::{Curve, EcdsaSignature, PublicPoint, Secp256k1Curve};
pub use error::{ConsensusError, Result, ScriptError, ScriptErrorKind, SolvingError, ValidationFailureError};
pub use keys::{Hash160Db, KeyRecord, KeyStore, ScriptDb, ScriptStore};
pub use script::{compile, disassemble, ScriptFlags, SolutionChecker, TxContext};
pub use sighash::SighashVariant;
pub use solver::{Solution, Solver, SolverOptions};
pub use templates::{classify, ScriptInfo};
pub use transaction::{Spendable, Tx, TxIn, TxOut};
pub use types::*;

/// Verification and signing with one curve, chain variant and flag set
///
/// # Examples
///
/// ```
/// use consensus_script::{compile, ScriptEngine, ScriptFlags, Tx, TxIn, TxOut};
///
/// let engine = ScriptEngine::new().with_flags(ScriptFlags::STANDARD);
/// let puzzle = compile("2 ADD 5 EQUAL").unwrap();
///
/// let mut tx = Tx::new(
///     1,
///     vec![TxIn::new([7; 32], 0, compile("3").unwrap(), 0xffff_ffff)],
///     vec![TxOut::new(1_000, vec![])],
///     0,
/// );
/// tx.set_unspents(vec![Some(TxOut::new(2_000, puzzle))]).unwrap();
/// assert!(engine.verify_input(&tx, 0).is_ok());
/// ```
pub struct ScriptEngine {
    curve: Box<dyn Curve>,
    variant: SighashVariant,
    flags: ScriptFlags,
    options: SolverOptions,
}

impl std::fmt::Debug for ScriptEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptEngine")
            .field("variant", &self.variant)
            .field("flags", &self.flags)
            .field("options", &self.options)
            .finish()
    }
}

impl Default for ScriptEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptEngine {
    /// Bitcoin rules over secp256k1 with `P2SH | WITNESS`.
    pub fn new() -> Self {
        Self::with_curve(Box::new(Secp256k1Curve::new()), SighashVariant::Bitcoin)
    }

    pub fn with_curve(curve: Box<dyn Curve>, variant: SighashVariant) -> Self {
        Self {
            curve,
            variant,
            flags: ScriptFlags::DEFAULT,
            options: SolverOptions::for_variant(variant),
        }
    }

    /// Engine for the verifier and signer settings of `config`.
    ///
    /// # Examples
    ///
    /// ```
    /// use consensus_script::{EngineConfig, ScriptEngine, ScriptFlags, SighashVariant};
    ///
    /// let config = EngineConfig::from_json(
    ///     r#"{"verifier": {"flags": ["P2SH", "STRICTENC"], "variant": "bitcoin_gold"}}"#,
    /// )
    /// .unwrap();
    /// let engine = ScriptEngine::from_config(&config).unwrap();
    /// assert_eq!(engine.flags(), ScriptFlags::P2SH | ScriptFlags::STRICTENC);
    /// assert_eq!(engine.variant(), SighashVariant::BitcoinGold);
    /// ```
    pub fn from_config(config: &EngineConfig) -> Result<Self> {
        let variant = config.verifier.variant;
        let mut engine = Self::with_curve(Box::new(Secp256k1Curve::new()), variant);
        engine.flags = config.verifier.script_flags()?;
        engine.options = config.signer.solver_options()?;
        // one chain per engine
        engine.options.variant = variant;
        if config.signer.hash_type.is_none() {
            engine.options.hash_type = variant.default_hash_type();
        }
        Ok(engine)
    }

    #[must_use]
    pub fn with_flags(mut self, flags: ScriptFlags) -> Self {
        self.flags = flags;
        self
    }

    #[must_use]
    pub fn with_options(mut self, options: SolverOptions) -> Self {
        self.options = SolverOptions {
            variant: self.variant,
            ..options
        };
        self
    }

    pub fn curve(&self) -> &dyn Curve {
        self.curve.as_ref()
    }

    pub fn variant(&self) -> SighashVariant {
        self.variant
    }

    pub fn flags(&self) -> ScriptFlags {
        self.flags
    }

    pub fn checker(&self) -> SolutionChecker<'_> {
        SolutionChecker::new(self.curve(), self.variant)
    }

    /// Checks one input; its unspent must be attached.
    pub fn verify_input(&self, tx: &Tx, tx_in_idx: usize) -> Result<()> {
        tx.check_solution_with(&self.checker(), tx_in_idx, self.flags)
    }

    /// Checks every input, failing on the first that does not verify.
    pub fn verify_tx(&self, tx: &Tx) -> Result<()> {
        let checker = self.checker();
        for tx_in_idx in 0..tx.txs_in.len() {
            tx.check_solution_with(&checker, tx_in_idx, self.flags)?;
        }
        Ok(())
    }

    pub fn bad_solution_count(&self, tx: &Tx) -> usize {
        tx.bad_solution_count_with(&self.checker(), self.flags)
    }

    pub fn solver<'a>(&'a self, keys: &'a dyn Hash160Db, scripts: &'a dyn ScriptDb) -> Solver<'a> {
        let options = SolverOptions {
            flags: self.flags,
            ..self.options.clone()
        };
        Solver::with_options(self.curve(), keys, scripts, options)
    }

    /// Signs what the keys and scripts allow; returns the number of inputs
    /// that still do not verify.
    pub fn sign_tx(&self, tx: &mut Tx, keys: &dyn Hash160Db, scripts: &dyn ScriptDb) -> usize {
        tx.sign(&self.solver(keys, scripts))
    }
}
