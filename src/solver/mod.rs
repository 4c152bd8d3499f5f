//! Solver: builds the scriptSig and witness that unlock an input
//!
//! The puzzle is unwrapped the way the checker unwraps it (P2SH redeem
//! script, P2WPKH script code, P2WSH witness script), the innermost script
//! is run symbolically to learn what its solution must satisfy, and the
//! constraints are solved against the available keys. Atoms are numbered
//! from the top of the stack, so `x_0`/`w_0` is pushed last.

pub mod constraints;
pub mod solvers;
pub mod symbolic;

pub use constraints::{Constraint, SymbolicItem};
pub use symbolic::{collect_constraints, ConstraintCollector, SymbolicRun};

use crate::curve::Curve;
use crate::error::{ConsensusError, Result, SolvingError};
use crate::keys::{Hash160Db, ScriptDb};
use crate::script::checker::{p2wpkh_script_code, SolutionChecker};
use crate::script::flags::ScriptFlags;
use crate::script::stack::{Slot, SlotFamily};
use crate::script::stream::{compile_push_bytes, compile_push_data, push_data_list};
use crate::segwit::{is_p2sh, witness_program};
use crate::sighash::{SighashVariant, SignatureHasher};
use crate::transaction::Tx;
use crate::types::{Hash, SigVersion};
use solvers::{ensure_filled, solve_constraints, SolveContext};
use tracing::{debug, warn};

/// How signatures are produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolverOptions {
    pub hash_type: u32,
    /// Fills signature slots of a partially signed multisig. `None` leaves
    /// them unsolved, which fails the input.
    pub signature_placeholder: Option<Vec<u8>>,
    /// Hash types under which existing signatures are recognized; empty
    /// means `hash_type` only.
    pub sig_hash_types_to_try: Vec<u32>,
    pub variant: SighashVariant,
    /// Flags the signer checks inputs against before re-signing them
    pub flags: ScriptFlags,
}

impl Default for SolverOptions {
    fn default() -> Self {
        Self::for_variant(SighashVariant::Bitcoin)
    }
}

impl SolverOptions {
    pub fn for_variant(variant: SighashVariant) -> Self {
        Self {
            hash_type: variant.default_hash_type(),
            signature_placeholder: Some(Vec::new()),
            sig_hash_types_to_try: Vec::new(),
            variant,
            flags: ScriptFlags::DEFAULT,
        }
    }

    fn hint_hash_types(&self) -> Vec<u32> {
        if self.sig_hash_types_to_try.is_empty() {
            vec![self.hash_type]
        } else {
            self.sig_hash_types_to_try.clone()
        }
    }
}

/// A scriptSig and witness for one input.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Solution {
    pub script_sig: Vec<u8>,
    pub witness: Vec<Vec<u8>>,
}

/// The script that actually gets solved, and how its solution is wrapped.
#[derive(Debug)]
struct Plan {
    script: Vec<u8>,
    family: SlotFamily,
    sig_version: SigVersion,
    redeem_script: Option<Vec<u8>>,
    witness_script: Option<Vec<u8>>,
}

/// Solves inputs with the keys and scripts it is given.
pub struct Solver<'a> {
    curve: &'a dyn Curve,
    keys: &'a dyn Hash160Db,
    scripts: &'a dyn ScriptDb,
    options: SolverOptions,
}

impl std::fmt::Debug for Solver<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Solver")
            .field("options", &self.options)
            .finish()
    }
}

impl<'a> Solver<'a> {
    pub fn new(curve: &'a dyn Curve, keys: &'a dyn Hash160Db, scripts: &'a dyn ScriptDb) -> Self {
        Self::with_options(curve, keys, scripts, SolverOptions::default())
    }

    pub fn with_options(
        curve: &'a dyn Curve,
        keys: &'a dyn Hash160Db,
        scripts: &'a dyn ScriptDb,
        options: SolverOptions,
    ) -> Self {
        Self {
            curve,
            keys,
            scripts,
            options,
        }
    }

    pub fn curve(&self) -> &'a dyn Curve {
        self.curve
    }

    pub fn options(&self) -> &SolverOptions {
        &self.options
    }

    fn lookup_script(&self, hash: &[u8]) -> Result<Vec<u8>> {
        self.scripts
            .get(hash)
            .map(<[u8]>::to_vec)
            .ok_or_else(|| SolvingError::UnknownScript(hex::encode(hash)).into())
    }

    /// P2SH → redeem script; v0 witness program → script code or witness
    /// script; anything else is solved as it is.
    fn plan(&self, puzzle: &[u8]) -> Result<Plan> {
        let redeem_script = if is_p2sh(puzzle) {
            Some(self.lookup_script(&puzzle[2..22])?)
        } else {
            None
        };
        let inner = redeem_script.as_deref().unwrap_or(puzzle);
        let plan = match witness_program(inner) {
            Some((0, program)) if program.len() == 20 => Plan {
                script: p2wpkh_script_code(program),
                family: SlotFamily::Witness,
                sig_version: SigVersion::WitnessV0,
                redeem_script: None,
                witness_script: None,
            },
            Some((0, program)) if program.len() == 32 => {
                let witness_script = self.lookup_script(program)?;
                Plan {
                    script: witness_script.clone(),
                    family: SlotFamily::Witness,
                    sig_version: SigVersion::WitnessV0,
                    redeem_script: None,
                    witness_script: Some(witness_script),
                }
            }
            Some((version, _)) => {
                return Err(SolvingError::Unsolved(format!(
                    "witness program version {version}"
                ))
                .into())
            }
            None => Plan {
                script: inner.to_vec(),
                family: SlotFamily::ScriptSig,
                sig_version: SigVersion::Base,
                redeem_script: None,
                witness_script: None,
            },
        };
        Ok(Plan {
            redeem_script,
            ..plan
        })
    }

    /// The constraints a solution of `puzzle` has to satisfy.
    pub fn determine_constraints(&self, puzzle: &[u8]) -> Result<Vec<Constraint>> {
        let plan = self.plan(puzzle)?;
        Ok(collect_constraints(&plan.script, plan.family, plan.sig_version, self.options.flags, self.curve).constraints)
    }

    /// Builds the solution for input `tx_in_idx`, which needs its unspent
    /// attached. Signatures already on the input are reused when they still
    /// verify.
    pub fn solve(&self, tx: &Tx, tx_in_idx: usize) -> Result<Solution> {
        let tx_in = tx
            .txs_in
            .get(tx_in_idx)
            .ok_or(SolvingError::InputIndex(tx_in_idx))?;
        let unspent = tx
            .unspent(tx_in_idx)
            .ok_or(SolvingError::MissingUnspent(tx_in_idx))?;
        let plan = self.plan(&unspent.script)?;
        let run = collect_constraints(&plan.script, plan.family, plan.sig_version, self.options.flags, self.curve);

        let hasher = SignatureHasher::new(tx, self.options.variant);
        let amount = unspent.coin_value;
        let sighash = |script_code: &[u8], hash_type: u32, sig_version: SigVersion| -> Result<Hash> {
            hasher
                .signature_hash(script_code, tx_in_idx, amount, hash_type, sig_version)
                .map_err(ConsensusError::from)
        };
        let mut hints = push_data_list(&tx_in.script).unwrap_or_default();
        hints.extend(tx_in.witness.iter().cloned());
        let ctx = SolveContext {
            curve: self.curve,
            keys: self.keys,
            sighash: &sighash,
            hash_type: self.options.hash_type,
            hint_hash_types: self.options.hint_hash_types(),
            hints,
            signature_placeholder: self.options.signature_placeholder.clone(),
        };
        let assignments = solve_constraints(&run.constraints, &ctx)?;

        let slot = |i| match plan.family {
            SlotFamily::ScriptSig => Slot::ScriptSig(i),
            SlotFamily::Witness => Slot::Witness(i),
        };
        ensure_filled((0..run.atom_count).map(slot), &assignments)?;
        // deepest slot first
        let items: Vec<Vec<u8>> = (0..run.atom_count)
            .rev()
            .filter_map(|i| assignments.get(&slot(i)).cloned())
            .collect();

        let mut solution = Solution::default();
        match plan.family {
            SlotFamily::ScriptSig => {
                for item in &items {
                    solution.script_sig.extend_from_slice(&compile_push_data(item));
                }
            }
            SlotFamily::Witness => {
                solution.witness = items;
                solution.witness.extend(plan.witness_script);
            }
        }
        if let Some(redeem) = &plan.redeem_script {
            solution.script_sig.extend_from_slice(&compile_push_bytes(redeem));
        }
        debug!(
            tx_in_idx,
            script_sig_len = solution.script_sig.len(),
            witness_items = solution.witness.len(),
            "input solved"
        );
        Ok(solution)
    }
}

impl Tx {
    /// Solves input `tx_in_idx` and writes the solution into it.
    pub fn sign_input(&mut self, solver: &Solver<'_>, tx_in_idx: usize) -> Result<()> {
        let solution = solver.solve(self, tx_in_idx)?;
        let tx_in = &mut self.txs_in[tx_in_idx];
        tx_in.script = solution.script_sig;
        tx_in.witness = solution.witness;
        Ok(())
    }

    /// Signs every input that does not already verify. Inputs that cannot be
    /// solved are logged and left as they are. Returns the number of inputs
    /// that still do not verify.
    pub fn sign(&mut self, solver: &Solver<'_>) -> usize {
        let options = solver.options();
        let checker = SolutionChecker::new(solver.curve(), options.variant);
        for tx_in_idx in 0..self.txs_in.len() {
            if self.txs_in[tx_in_idx].is_coinbase() {
                continue;
            }
            if self.check_solution_with(&checker, tx_in_idx, options.flags).is_ok() {
                debug!(tx_in_idx, "input already signed");
                continue;
            }
            if let Err(err) = self.sign_input(solver, tx_in_idx) {
                warn!(tx_in_idx, error = %err, "input left unsigned");
            }
        }
        self.bad_solution_count_with(&checker, options.flags)
    }
}
