//! Solution checker: does an input's scriptSig and witness unlock the
//! output it spends?
//!
//! Follows Bitcoin Core's `VerifyScript`: scriptSig, then scriptPubKey on
//! the resulting stack, then the witness program or the P2SH redeem script
//! (which may itself be a witness program), then the clean-stack and
//! unexpected-witness rules.

use crate::constants::MAX_BLOB_LENGTH;
use crate::curve::Curve;
use crate::error::{self, ConsensusError, ScriptError, ScriptErrorKind, SolvingError};
use crate::hashing::sha256;
use crate::opcodes::*;
use crate::script::flags::ScriptFlags;
use crate::script::number::cast_to_bool;
use crate::script::stack::VmStack;
use crate::script::stream::{compile_push_bytes, is_push_only};
use crate::script::vm::{eval_script, ExecutionHooks, ScriptEnv};
use crate::segwit::{is_p2sh, witness_program};
use crate::sighash::{SighashVariant, SignatureHasher};
use crate::transaction::Tx;
use crate::types::SigVersion;
use tracing::debug;

/// Everything needed to check one input.
#[derive(Debug, Clone)]
pub struct TxContext<'a> {
    pub tx: &'a Tx,
    pub tx_in_idx: usize,
    pub puzzle_script: Vec<u8>,
    pub solution_script: Vec<u8>,
    pub witness_solution_stack: Vec<Vec<u8>>,
    /// Value of the output being spent, committed to by BIP-143
    pub amount: u64,
    pub sequence: u32,
    pub lock_time: u32,
    pub version: u32,
}

impl<'a> TxContext<'a> {
    /// Context for input `tx_in_idx`, which needs its unspent attached.
    pub fn for_input(tx: &'a Tx, tx_in_idx: usize) -> error::Result<Self> {
        let tx_in = tx
            .txs_in
            .get(tx_in_idx)
            .ok_or(ConsensusError::InvalidInputIndex(tx_in_idx))?;
        let unspent = tx
            .unspent(tx_in_idx)
            .ok_or(SolvingError::MissingUnspent(tx_in_idx))?;
        Ok(Self {
            tx,
            tx_in_idx,
            puzzle_script: unspent.script.clone(),
            solution_script: tx_in.script.clone(),
            witness_solution_stack: tx_in.witness.clone(),
            amount: unspent.coin_value,
            sequence: tx_in.sequence,
            lock_time: tx.lock_time,
            version: tx.version,
        })
    }
}

/// Verifies solutions with a given curve and sighash variant.
pub struct SolutionChecker<'c> {
    curve: &'c dyn Curve,
    variant: SighashVariant,
}

impl std::fmt::Debug for SolutionChecker<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SolutionChecker")
            .field("variant", &self.variant)
            .finish()
    }
}

impl<'c> SolutionChecker<'c> {
    pub fn new(curve: &'c dyn Curve, variant: SighashVariant) -> Self {
        Self { curve, variant }
    }

    pub fn curve(&self) -> &'c dyn Curve {
        self.curve
    }

    pub fn variant(&self) -> SighashVariant {
        self.variant
    }

    pub fn check_solution(&self, ctx: &TxContext<'_>, flags: ScriptFlags) -> Result<(), ScriptError> {
        self.check_solution_traced(ctx, flags, &mut ())
    }

    /// VerifyScript: scriptSig × scriptPubKey × witness × flags → {valid} ∪ error
    ///
    /// 1. SIGPUSHONLY: scriptSig is push-only
    /// 2. S₀ = eval(scriptSig, ∅); S = eval(scriptPubKey, S₀); S ≠ ∅ ∧ top(S) true
    /// 3. WITNESS ∧ scriptPubKey is a witness program: scriptSig = ∅, run the program
    /// 4. P2SH ∧ scriptPubKey is P2SH: scriptSig push-only, S = eval(redeem, S₀ ∖ redeem),
    ///    top(S) true; a redeem witness program needs scriptSig = push(redeem)
    /// 5. CLEANSTACK ∧ P2SH: |S| = 1
    /// 6. WITNESS: witness data without a witness program is rejected
    pub fn check_solution_traced<H>(
        &self,
        ctx: &TxContext<'_>,
        flags: ScriptFlags,
        hooks: &mut H,
    ) -> Result<(), ScriptError>
    where
        H: ExecutionHooks<Vec<u8>>,
    {
        let hasher = SignatureHasher::new(ctx.tx, self.variant);
        let base_sighash = |script_code: &[u8], hash_type: u32| {
            hasher.signature_hash(script_code, ctx.tx_in_idx, ctx.amount, hash_type, SigVersion::Base)
        };
        let v0_sighash = |script_code: &[u8], hash_type: u32| {
            hasher.signature_hash(script_code, ctx.tx_in_idx, ctx.amount, hash_type, SigVersion::WitnessV0)
        };
        let env = ScriptEnv {
            flags,
            sig_version: SigVersion::Base,
            curve: self.curve,
            sighash: &base_sighash,
            uses_fork_id: self.variant.uses_fork_id(),
            tx_version: ctx.version,
            lock_time: ctx.lock_time,
            sequence: ctx.sequence,
        };
        let witness_env = ScriptEnv {
            sig_version: SigVersion::WitnessV0,
            sighash: &v0_sighash,
            ..env
        };

        let solution = &ctx.solution_script;
        let puzzle = &ctx.puzzle_script;
        let witness = &ctx.witness_solution_stack;
        let fail = |stage: &str, err: ScriptError| {
            debug!(tx_in_idx = ctx.tx_in_idx, stage, error = %err, "solution rejected");
            err
        };

        // 1. Push-only scriptSig
        if flags.contains(ScriptFlags::SIGPUSHONLY) && !is_push_only(solution) {
            return Err(fail("script_sig", ScriptErrorKind::SigPushOnly.into()));
        }

        // 2. scriptSig, then scriptPubKey
        let mut stack = VmStack::new();
        eval_script(&mut stack, solution, &env, hooks).map_err(|e| fail("script_sig", e))?;
        let stack_copy = flags
            .contains(ScriptFlags::P2SH)
            .then(|| stack.clone());
        eval_script(&mut stack, puzzle, &env, hooks).map_err(|e| fail("script_pubkey", e))?;
        if !top_is_true(&stack) {
            return Err(fail("script_pubkey", ScriptErrorKind::EvalFalse.into()));
        }

        // 3. Bare witness program
        let mut had_witness = false;
        if flags.contains(ScriptFlags::WITNESS) {
            if let Some((version, program)) = witness_program(puzzle) {
                had_witness = true;
                if !solution.is_empty() {
                    return Err(fail("witness", ScriptErrorKind::WitnessMalleated.into()));
                }
                check_witness_program(witness, version, program, &witness_env, hooks)
                    .map_err(|e| fail("witness", e))?;
                // keep the clean-stack rule below satisfied
                keep_bottom(&mut stack);
            }
        }

        // 4. P2SH
        if let Some(copy) = stack_copy.filter(|_| is_p2sh(puzzle)) {
            if !is_push_only(solution) {
                return Err(fail("p2sh", ScriptErrorKind::SigPushOnly.into()));
            }
            stack = copy;
            let redeem = stack.pop().map_err(|e| fail("p2sh", e))?;
            eval_script(&mut stack, &redeem, &env, hooks).map_err(|e| fail("redeem_script", e))?;
            if !top_is_true(&stack) {
                return Err(fail("redeem_script", ScriptErrorKind::EvalFalse.into()));
            }
            if flags.contains(ScriptFlags::WITNESS) {
                if let Some((version, program)) = witness_program(&redeem) {
                    had_witness = true;
                    if *solution != compile_push_bytes(&redeem) {
                        return Err(fail("p2sh_witness", ScriptErrorKind::WitnessMalleatedP2sh.into()));
                    }
                    check_witness_program(witness, version, program, &witness_env, hooks)
                        .map_err(|e| fail("p2sh_witness", e))?;
                    keep_bottom(&mut stack);
                }
            }
        }

        // 5. Clean stack, only meaningful alongside P2SH
        if flags.contains(ScriptFlags::CLEANSTACK) && flags.contains(ScriptFlags::P2SH) && stack.len() != 1 {
            return Err(fail("clean_stack", ScriptErrorKind::CleanStack.into()));
        }

        // 6. Stray witness
        if flags.contains(ScriptFlags::WITNESS) && !had_witness && !witness.is_empty() {
            return Err(fail("witness", ScriptErrorKind::WitnessUnexpected.into()));
        }
        Ok(())
    }
}

fn top_is_true(stack: &VmStack<Vec<u8>>) -> bool {
    stack.last().is_some_and(|top| cast_to_bool(top))
}

fn keep_bottom(stack: &mut VmStack<Vec<u8>>) {
    let mut items = std::mem::take(stack).into_items();
    items.truncate(1);
    *stack = VmStack::from_items(items);
}

/// Script code P2WPKH executes: `DUP HASH160 <program> EQUALVERIFY CHECKSIG`.
pub fn p2wpkh_script_code(program: &[u8]) -> Vec<u8> {
    let mut script = vec![OP_DUP, OP_HASH160];
    script.extend_from_slice(&compile_push_bytes(program));
    script.push(OP_EQUALVERIFY);
    script.push(OP_CHECKSIG);
    script
}

/// VerifyWitnessProgram: witness × version × program × env → {valid} ∪ error
///
/// `env` carries the flags and must be set up for `SigVersion::WitnessV0`.
///
/// Version 0:
/// - 32-byte program: last witness item is the script, SHA256(script) = program
/// - 20-byte program: witness = [sig, pubkey], run the P2PKH-shaped script code
/// - other lengths: WITNESS_PROGRAM_WRONG_LENGTH
///
/// Other versions succeed unless upgradable programs are discouraged. The
/// witness script runs on the remaining items (each ≤ 520 bytes) and must
/// leave exactly one true item.
pub fn check_witness_program<H>(
    witness: &[Vec<u8>],
    version: u8,
    program: &[u8],
    env: &ScriptEnv<'_>,
    hooks: &mut H,
) -> Result<(), ScriptError>
where
    H: ExecutionHooks<Vec<u8>>,
{
    let (script, items) = match (version, program.len()) {
        (0, 32) => {
            let (script, items) = witness
                .split_last()
                .ok_or_else(|| ScriptError::new(ScriptErrorKind::WitnessProgramWitnessEmpty))?;
            if sha256(script)[..] != *program {
                return Err(ScriptErrorKind::WitnessProgramMismatch.into());
            }
            (script.clone(), items.to_vec())
        }
        (0, 20) => {
            if witness.len() != 2 {
                return Err(ScriptErrorKind::WitnessProgramMismatch.into());
            }
            (p2wpkh_script_code(program), witness.to_vec())
        }
        (0, _) => return Err(ScriptErrorKind::WitnessProgramWrongLength.into()),
        _ => {
            if env
                .flags
                .contains(ScriptFlags::DISCOURAGE_UPGRADABLE_WITNESS_PROGRAM)
            {
                return Err(ScriptErrorKind::DiscourageUpgradableWitnessProgram.into());
            }
            return Ok(());
        }
    };

    if items.iter().any(|item| item.len() > MAX_BLOB_LENGTH) {
        return Err(ScriptErrorKind::PushSize.into());
    }
    let mut stack = VmStack::from_items(items);
    eval_script(&mut stack, &script, env, hooks)?;
    if stack.len() != 1 {
        return Err(ScriptErrorKind::CleanStack.into());
    }
    if !top_is_true(&stack) {
        return Err(ScriptErrorKind::EvalFalse.into());
    }
    Ok(())
}

impl Tx {
    /// Checks input `tx_in_idx` with an explicit checker. Coinbase inputs
    /// have nothing to check.
    pub fn check_solution_with(
        &self,
        checker: &SolutionChecker<'_>,
        tx_in_idx: usize,
        flags: ScriptFlags,
    ) -> error::Result<()> {
        if self.is_coinbase() {
            return Ok(());
        }
        let ctx = TxContext::for_input(self, tx_in_idx)?;
        checker.check_solution(&ctx, flags)?;
        Ok(())
    }

    /// Checks input `tx_in_idx` under Bitcoin rules.
    pub fn check_solution(&self, curve: &dyn Curve, tx_in_idx: usize, flags: ScriptFlags) -> error::Result<()> {
        let checker = SolutionChecker::new(curve, SighashVariant::Bitcoin);
        self.check_solution_with(&checker, tx_in_idx, flags)
    }

    pub fn is_solution_ok(&self, curve: &dyn Curve, tx_in_idx: usize, flags: ScriptFlags) -> bool {
        self.check_solution(curve, tx_in_idx, flags).is_ok()
    }

    /// Number of inputs whose solution does not verify.
    pub fn bad_solution_count_with(&self, checker: &SolutionChecker<'_>, flags: ScriptFlags) -> usize {
        (0..self.txs_in.len())
            .filter(|&idx| self.check_solution_with(checker, idx, flags).is_err())
            .count()
    }

    pub fn bad_solution_count(&self, curve: &dyn Curve, flags: ScriptFlags) -> usize {
        let checker = SolutionChecker::new(curve, SighashVariant::Bitcoin);
        self.bad_solution_count_with(&checker, flags)
    }
}
