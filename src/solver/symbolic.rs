//! Symbolic run of a puzzle script
//!
//! The script runs on the ordinary VM with [`SymbolicItem`]s on a stack
//! that conjures an atom for every item popped past the bottom. The opcodes
//! that would need the solution's actual bytes are taken over by
//! [`ConstraintCollector`], which records what those bytes must satisfy
//! and pushes the outcome the solution is meant to achieve.

use crate::constants::{MAX_PUBKEYS_PER_MULTISIG, SCRIPT_NUM_MAX_LEN};
use crate::curve::Curve;
use crate::error::{ScriptError, ScriptErrorKind};
use crate::opcodes::*;
use crate::script::flags::ScriptFlags;
use crate::script::number::script_num;
use crate::script::stack::{SlotFamily, StackItem, VmStack};
use crate::script::vm::{eval_script, ExecutionHooks, ScriptEnv};
use crate::solver::constraints::{Constraint, SymbolicItem};
use crate::types::{Hash, SigVersion};
use tracing::debug;

/// Hooks that turn signature and hash checks into [`Constraint`]s.
#[derive(Debug, Default)]
pub struct ConstraintCollector {
    pub constraints: Vec<Constraint>,
}

impl ConstraintCollector {
    fn pop_count(stack: &mut VmStack<SymbolicItem>, max: i64, kind: ScriptErrorKind) -> Result<usize, ScriptError> {
        let item = stack.pop()?;
        let n = script_num(item.require_data()?, false, SCRIPT_NUM_MAX_LEN)?;
        if !(0..=max).contains(&n) {
            return Err(kind.into());
        }
        Ok(n as usize)
    }

    fn pop_n(stack: &mut VmStack<SymbolicItem>, n: usize) -> Result<Vec<SymbolicItem>, ScriptError> {
        let mut items = (0..n).map(|_| stack.pop()).collect::<Result<Vec<_>, _>>()?;
        // popped top first; callers want script order
        items.reverse();
        Ok(items)
    }

    fn signatures_correct(
        &mut self,
        secs: Vec<SymbolicItem>,
        sigs: Vec<SymbolicItem>,
        script_code: &[u8],
        sig_version: SigVersion,
    ) {
        self.constraints
            .extend(secs.iter().cloned().map(Constraint::IsPubkey));
        self.constraints
            .extend(sigs.iter().cloned().map(Constraint::IsSignature));
        self.constraints.push(Constraint::SignaturesCorrect {
            secs,
            sigs,
            script_code: script_code.to_vec(),
            sig_version,
        });
    }
}

impl ExecutionHooks<SymbolicItem> for ConstraintCollector {
    fn intercept(
        &mut self,
        opcode: u8,
        stack: &mut VmStack<SymbolicItem>,
        script_code: &[u8],
        env: &ScriptEnv<'_>,
    ) -> Result<bool, ScriptError> {
        match opcode {
            OP_HASH160 => {
                if stack.peek(0)?.data().is_some() {
                    return Ok(false);
                }
                let item = stack.pop()?;
                stack.push(SymbolicItem::Hash160(Box::new(item)));
            }
            OP_EQUAL | OP_EQUALVERIFY => {
                if stack.peek(0)?.data().is_some() && stack.peek(1)?.data().is_some() {
                    return Ok(false);
                }
                let b = stack.pop()?;
                let a = stack.pop()?;
                self.constraints.push(Constraint::Equal(a, b));
                if opcode == OP_EQUAL {
                    stack.push_data(vec![1]);
                }
            }
            OP_CHECKSIG | OP_CHECKSIGVERIFY => {
                let pubkey = stack.pop()?;
                let sig = stack.pop()?;
                self.signatures_correct(vec![pubkey], vec![sig], script_code, env.sig_version);
                if opcode == OP_CHECKSIG {
                    stack.push_data(vec![1]);
                }
            }
            OP_CHECKMULTISIG | OP_CHECKMULTISIGVERIFY => {
                let n = Self::pop_count(stack, MAX_PUBKEYS_PER_MULTISIG, ScriptErrorKind::PubkeyCount)?;
                let secs = Self::pop_n(stack, n)?;
                let m = Self::pop_count(stack, n as i64, ScriptErrorKind::SigCount)?;
                let sigs = Self::pop_n(stack, m)?;
                let dummy = stack.pop()?;
                self.constraints
                    .push(Constraint::Equal(dummy, SymbolicItem::Bytes(Vec::new())));
                self.signatures_correct(secs, sigs, script_code, env.sig_version);
                if opcode == OP_CHECKMULTISIG {
                    stack.push_data(vec![1]);
                }
            }
            _ => return Ok(false),
        }
        Ok(true)
    }
}

/// Result of a symbolic run.
#[derive(Debug, Clone, Default)]
pub struct SymbolicRun {
    pub constraints: Vec<Constraint>,
    /// Number of atoms the script consumed, `x_0`/`w_0` being the top.
    pub atom_count: usize,
}

/// Runs `script` symbolically with atoms of `family`.
///
/// Faults are expected here (a symbolic value reaching an opcode that needs
/// bytes, or a final stack that proves nothing) and only end the run; the
/// constraints gathered up to that point are kept.
pub fn collect_constraints(
    script: &[u8],
    family: SlotFamily,
    sig_version: SigVersion,
    flags: ScriptFlags,
    curve: &dyn Curve,
) -> SymbolicRun {
    let no_sighash = |_: &[u8], _: u32| -> Result<Hash, ScriptError> {
        Err(ScriptErrorKind::UnknownError.into())
    };
    let env = ScriptEnv {
        flags,
        sig_version,
        curve,
        sighash: &no_sighash,
        uses_fork_id: false,
        tx_version: 0,
        lock_time: 0,
        sequence: 0,
    };
    let mut stack = VmStack::with_fill(Vec::new(), family, 0);
    let mut collector = ConstraintCollector::default();
    if let Err(err) = eval_script(&mut stack, script, &env, &mut collector) {
        debug!(error = %err, "symbolic run stopped early");
    }
    let run = SymbolicRun {
        constraints: collector.constraints,
        atom_count: stack.next_atom_index().unwrap_or(0),
    };
    debug!(
        atoms = run.atom_count,
        constraints = run.constraints.len(),
        "constraints collected"
    );
    run
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curve::Secp256k1Curve;
    use crate::script::stack::Slot;
    use crate::script::tools::compile;

    fn run(text: &str) -> SymbolicRun {
        let curve = Secp256k1Curve::new();
        let script = compile(text).unwrap();
        collect_constraints(&script, SlotFamily::ScriptSig, SigVersion::Base, ScriptFlags::DEFAULT, &curve)
    }

    fn rendered(run: &SymbolicRun) -> Vec<String> {
        run.constraints.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_p2pkh_constraints() {
        let run = run("DUP HASH160 [0102] EQUALVERIFY CHECKSIG");
        assert_eq!(run.atom_count, 2);
        assert_eq!(
            rendered(&run),
            vec![
                "EQUAL(HASH160(x_0), [0102])",
                "IS_PUBKEY(x_0)",
                "IS_SIGNATURE(x_1)",
                "SIGNATURES_CORRECT([x_0], [x_1])",
            ]
        );
    }

    #[test]
    fn test_multisig_constraints() {
        let run = run("2 [02] [03] [04] 3 CHECKMULTISIG");
        assert_eq!(run.atom_count, 3);
        let last = run.constraints.last().unwrap();
        match last {
            Constraint::SignaturesCorrect { secs, sigs, .. } => {
                assert_eq!(secs[0], SymbolicItem::Bytes(vec![2]));
                assert_eq!(secs[2], SymbolicItem::Bytes(vec![4]));
                // deepest first
                assert_eq!(sigs[0].as_atom(), Some(Slot::ScriptSig(1)));
                assert_eq!(sigs[1].as_atom(), Some(Slot::ScriptSig(0)));
            }
            other => panic!("unexpected {other}"),
        }
        assert_eq!(rendered(&run)[0], "EQUAL(x_2, [])");
    }

    #[test]
    fn test_concrete_ops_still_run() {
        let run = run("[0102] HASH160 DROP 1 1 EQUAL VERIFY 5 EQUAL");
        assert_eq!(rendered(&run), vec!["EQUAL(x_0, [05])"]);
        assert_eq!(run.atom_count, 1);
    }

    #[test]
    fn test_symbolic_branch_stops_run() {
        let run = run("IF 1 ELSE 2 ENDIF");
        assert!(run.constraints.is_empty());
        assert_eq!(run.atom_count, 1);
    }
}
