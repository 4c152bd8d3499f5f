//! Filling atoms from constraints
//!
//! Each rule looks at one constraint and, once the values it depends on are
//! known, fills one or more atoms. Rules are applied until a full pass
//! makes no progress.

use crate::curve::{Curve, PublicPoint};
use crate::error::{Result, SolvingError};
use crate::hashing::hash160;
use crate::keys::Hash160Db;
use crate::script::der::{parse_signature_blob, signature_blob};
use crate::script::stack::Slot;
use crate::solver::constraints::{Constraint, SymbolicItem};
use crate::types::{Hash, SigVersion};
use std::collections::BTreeMap;
use tracing::debug;

/// Values found so far, by slot.
pub type Assignments = BTreeMap<Slot, Vec<u8>>;

/// Digest for a signature over `script_code` with a hash type, under the
/// given script version.
pub type SighashForSolver<'a> = dyn Fn(&[u8], u32, SigVersion) -> Result<Hash> + 'a;

/// What the rules may consult.
pub struct SolveContext<'a> {
    pub curve: &'a dyn Curve,
    pub keys: &'a dyn Hash160Db,
    pub sighash: &'a SighashForSolver<'a>,
    pub hash_type: u32,
    /// Hash types accepted when reusing existing signatures
    pub hint_hash_types: Vec<u32>,
    /// Signatures already present on the input
    pub hints: Vec<Vec<u8>>,
    pub signature_placeholder: Option<Vec<u8>>,
}

/// Concrete value of `item` under `assignments`, if known.
pub fn resolve(item: &SymbolicItem, assignments: &Assignments) -> Option<Vec<u8>> {
    match item {
        SymbolicItem::Bytes(data) => Some(data.clone()),
        SymbolicItem::Atom(slot) => assignments.get(slot).cloned(),
        SymbolicItem::Hash160(inner) => resolve(inner, assignments).map(|v| hash160(&v).to_vec()),
    }
}

fn unfilled(item: &SymbolicItem, assignments: &Assignments) -> Option<Slot> {
    item.as_atom().filter(|slot| !assignments.contains_key(slot))
}

/// EQUAL(HASH160(x), h): x is the SEC of the key hashing to h.
/// EQUAL(x, c): x is c.
fn solve_equal(a: &SymbolicItem, b: &SymbolicItem, ctx: &SolveContext<'_>, assignments: &mut Assignments) -> bool {
    for (lhs, rhs) in [(a, b), (b, a)] {
        let Some(value) = resolve(rhs, assignments) else {
            continue;
        };
        if let Some(slot) = unfilled(lhs, assignments) {
            assignments.insert(slot, value);
            return true;
        }
        if let SymbolicItem::Hash160(inner) = lhs {
            if let Some(slot) = unfilled(inner, assignments) {
                if let Some(record) = ctx.keys.get(&value) {
                    assignments.insert(slot, record.sec());
                    return true;
                }
            }
        }
    }
    false
}

/// Existing signatures from `ctx.hints` that verify against one of `points`,
/// by key index.
fn signatures_from_hints(
    points: &[Option<PublicPoint>],
    script_code: &[u8],
    sig_version: SigVersion,
    ctx: &SolveContext<'_>,
) -> BTreeMap<usize, Vec<u8>> {
    let mut found = BTreeMap::new();
    for blob in &ctx.hints {
        // anything that does not parse is simply not a signature
        let Ok((signature, hash_type)) = parse_signature_blob(blob) else {
            continue;
        };
        if !ctx.hint_hash_types.contains(&hash_type) {
            continue;
        }
        let Ok(digest) = (ctx.sighash)(script_code, hash_type, sig_version) else {
            continue;
        };
        let candidates = ctx
            .curve
            .possible_public_points_for_signature(&digest, &signature);
        for (idx, point) in points.iter().enumerate() {
            if let Some(point) = point {
                if !found.contains_key(&idx) && candidates.contains(point) {
                    found.insert(idx, blob.clone());
                    break;
                }
            }
        }
    }
    found
}

/// SIGNATURES_CORRECT(secs, sigs): reuse or produce signatures for the first
/// keys we can, in key order, and pad the rest with the placeholder. Without
/// a placeholder the remaining slots stay open.
fn solve_signatures(
    secs: &[SymbolicItem],
    sigs: &[SymbolicItem],
    script_code: &[u8],
    sig_version: SigVersion,
    ctx: &SolveContext<'_>,
    assignments: &mut Assignments,
) -> Result<bool> {
    let open: Vec<Slot> = sigs
        .iter()
        .filter_map(|sig| unfilled(sig, assignments))
        .collect();
    // signatures are placed in a single pass; a partly filled constraint
    // already holds every signature the keys and hints could give
    let already_signed = sigs
        .iter()
        .filter_map(SymbolicItem::as_atom)
        .any(|slot| assignments.contains_key(&slot));
    if open.is_empty() || already_signed {
        return Ok(false);
    }
    let Some(secs) = secs
        .iter()
        .map(|sec| resolve(sec, assignments))
        .collect::<Option<Vec<_>>>()
    else {
        return Ok(false);
    };

    let points: Vec<Option<PublicPoint>> = secs.iter().map(|sec| ctx.curve.parse_sec(sec)).collect();
    let mut found = signatures_from_hints(&points, script_code, sig_version, ctx);
    let needed = sigs.len();
    for (idx, sec) in secs.iter().enumerate() {
        if found.len() >= needed {
            break;
        }
        if found.contains_key(&idx) {
            continue;
        }
        let Some(record) = ctx.keys.get(&hash160(sec)) else {
            continue;
        };
        let digest = (ctx.sighash)(script_code, ctx.hash_type, sig_version)?;
        let signature = ctx
            .curve
            .sign(&record.secret_exponent, &digest)?
            .normalize_s(&ctx.curve.order());
        found.insert(idx, signature_blob(&signature, ctx.hash_type));
    }

    if found.is_empty() {
        return Ok(false);
    }
    debug!(signatures = found.len(), needed, "signatures prepared");

    let mut produced = found.into_values().take(needed);
    let mut progress = false;
    for slot in open {
        let value = match produced.next() {
            Some(blob) => blob,
            None => match &ctx.signature_placeholder {
                Some(placeholder) => placeholder.clone(),
                None => continue,
            },
        };
        assignments.insert(slot, value);
        progress = true;
    }
    Ok(progress)
}

/// Applies every rule until nothing changes, returning the assignments.
pub fn solve_constraints(constraints: &[Constraint], ctx: &SolveContext<'_>) -> Result<Assignments> {
    let mut assignments = Assignments::new();
    loop {
        let mut progress = false;
        for constraint in constraints {
            progress |= match constraint {
                Constraint::Equal(a, b) => solve_equal(a, b, ctx, &mut assignments),
                Constraint::SignaturesCorrect {
                    secs,
                    sigs,
                    script_code,
                    sig_version,
                } => solve_signatures(secs, sigs, script_code, *sig_version, ctx, &mut assignments)?,
                Constraint::IsPubkey(_) | Constraint::IsSignature(_) => false,
            };
        }
        if !progress {
            return Ok(assignments);
        }
        debug!(filled = assignments.len(), "fixpoint pass");
    }
}

/// Fails naming every slot in `slots` that is still empty.
pub fn ensure_filled(slots: impl IntoIterator<Item = Slot>, assignments: &Assignments) -> Result<()> {
    let missing: Vec<String> = slots
        .into_iter()
        .filter(|slot| !assignments.contains_key(slot))
        .map(|slot| slot.to_string())
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(SolvingError::Unsolved(missing.join(", ")).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curve::Secp256k1Curve;
    use crate::error::ConsensusError;
    use crate::keys::KeyStore;
    use num_bigint::BigUint;

    fn context<'a>(curve: &'a Secp256k1Curve, keys: &'a KeyStore, sighash: &'a SighashForSolver<'a>) -> SolveContext<'a> {
        SolveContext {
            curve,
            keys,
            sighash,
            hash_type: 1,
            hint_hash_types: vec![1],
            hints: vec![],
            signature_placeholder: None,
        }
    }

    #[test]
    fn test_hash160_equality_fills_sec() {
        let curve = Secp256k1Curve::new();
        let keys = KeyStore::from_secret_exponents(&curve, &[BigUint::from(5u32)]).unwrap();
        let sec = curve.derive_public_point(&BigUint::from(5u32)).unwrap().to_sec(true);
        let sighash = |_: &[u8], _: u32, _: SigVersion| -> Result<Hash> { Ok([7; 32]) };
        let ctx = context(&curve, &keys, &sighash);

        let x0 = SymbolicItem::Atom(Slot::ScriptSig(0));
        let x1 = SymbolicItem::Atom(Slot::ScriptSig(1));
        let constraints = vec![
            Constraint::Equal(
                SymbolicItem::Hash160(Box::new(x0.clone())),
                SymbolicItem::Bytes(hash160(&sec).to_vec()),
            ),
            Constraint::SignaturesCorrect {
                secs: vec![x0],
                sigs: vec![x1],
                script_code: vec![],
                sig_version: SigVersion::Base,
            },
        ];
        let assignments = solve_constraints(&constraints, &ctx).unwrap();
        assert_eq!(assignments[&Slot::ScriptSig(0)], sec);
        let (signature, hash_type) = parse_signature_blob(&assignments[&Slot::ScriptSig(1)]).unwrap();
        assert_eq!(hash_type, 1);
        assert!(signature.is_low_s(&curve.order()));
        let point = curve.parse_sec(&sec).unwrap();
        assert!(curve.verify(&point, &[7; 32], &signature));
    }

    #[test]
    fn test_unknown_key_leaves_slots_open() {
        let curve = Secp256k1Curve::new();
        let keys = KeyStore::new();
        let sighash = |_: &[u8], _: u32, _: SigVersion| -> Result<Hash> { Ok([7; 32]) };
        let mut ctx = context(&curve, &keys, &sighash);
        ctx.signature_placeholder = Some(vec![]);

        let constraints = vec![
            Constraint::Equal(SymbolicItem::Atom(Slot::Witness(2)), SymbolicItem::Bytes(vec![])),
            Constraint::SignaturesCorrect {
                secs: vec![SymbolicItem::Bytes(vec![2; 33])],
                sigs: vec![SymbolicItem::Atom(Slot::Witness(0))],
                script_code: vec![],
                sig_version: SigVersion::WitnessV0,
            },
        ];
        let assignments = solve_constraints(&constraints, &ctx).unwrap();
        assert_eq!(assignments.get(&Slot::Witness(2)), Some(&vec![]));
        assert!(!assignments.contains_key(&Slot::Witness(0)));

        let err = ensure_filled((0..3).map(Slot::Witness), &assignments).unwrap_err();
        assert!(matches!(err, ConsensusError::Solving(SolvingError::Unsolved(ref s)) if s == "w_0, w_1"));
    }

    #[test]
    fn test_one_key_never_fills_two_slots() {
        let curve = Secp256k1Curve::new();
        let exponents = [BigUint::from(5u32), BigUint::from(6u32)];
        let secs: Vec<Vec<u8>> = exponents
            .iter()
            .map(|e| curve.derive_public_point(e).unwrap().to_sec(true))
            .collect();
        let keys = KeyStore::from_secret_exponents(&curve, &exponents[..1]).unwrap();
        let sighash = |_: &[u8], _: u32, _: SigVersion| -> Result<Hash> { Ok([7; 32]) };
        let ctx = context(&curve, &keys, &sighash);

        let constraints = vec![Constraint::SignaturesCorrect {
            secs: secs.into_iter().map(SymbolicItem::Bytes).collect(),
            sigs: vec![SymbolicItem::Atom(Slot::ScriptSig(1)), SymbolicItem::Atom(Slot::ScriptSig(2))],
            script_code: vec![],
            sig_version: SigVersion::Base,
        }];
        let assignments = solve_constraints(&constraints, &ctx).unwrap();
        assert_eq!(assignments.len(), 1);
        let err = ensure_filled([Slot::ScriptSig(1), Slot::ScriptSig(2)], &assignments).unwrap_err();
        assert!(matches!(err, ConsensusError::Solving(SolvingError::Unsolved(_))));
    }
}
