//! What a symbolic run learns about the solution

use crate::script::stack::{Slot, StackItem};
use crate::types::SigVersion;
use std::fmt;

/// A stack value during constraint collection: known bytes, an unfilled
/// solution slot, or HASH160 of another value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SymbolicItem {
    Bytes(Vec<u8>),
    Atom(Slot),
    Hash160(Box<SymbolicItem>),
}

impl SymbolicItem {
    /// The slot this item is, if it is a bare atom.
    pub fn as_atom(&self) -> Option<Slot> {
        match self {
            SymbolicItem::Atom(slot) => Some(*slot),
            _ => None,
        }
    }
}

impl StackItem for SymbolicItem {
    fn from_data(data: Vec<u8>) -> Self {
        SymbolicItem::Bytes(data)
    }

    fn data(&self) -> Option<&[u8]> {
        match self {
            SymbolicItem::Bytes(data) => Some(data),
            _ => None,
        }
    }

    fn atom(slot: Slot) -> Option<Self> {
        Some(SymbolicItem::Atom(slot))
    }
}

impl fmt::Display for SymbolicItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SymbolicItem::Bytes(data) => write!(f, "[{}]", hex::encode(data)),
            SymbolicItem::Atom(slot) => write!(f, "{slot}"),
            SymbolicItem::Hash160(inner) => write!(f, "HASH160({inner})"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Constraint {
    Equal(SymbolicItem, SymbolicItem),
    IsPubkey(SymbolicItem),
    IsSignature(SymbolicItem),
    /// `sigs` (deepest first) are valid signatures by a subsequence of
    /// `secs` (script order) over `script_code`.
    SignaturesCorrect {
        secs: Vec<SymbolicItem>,
        sigs: Vec<SymbolicItem>,
        script_code: Vec<u8>,
        sig_version: SigVersion,
    },
}

fn join(items: &[SymbolicItem]) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constraint::Equal(a, b) => write!(f, "EQUAL({a}, {b})"),
            Constraint::IsPubkey(x) => write!(f, "IS_PUBKEY({x})"),
            Constraint::IsSignature(x) => write!(f, "IS_SIGNATURE({x})"),
            Constraint::SignaturesCorrect { secs, sigs, .. } => {
                write!(f, "SIGNATURES_CORRECT([{}], [{}])", join(secs), join(sigs))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let hashed = SymbolicItem::Hash160(Box::new(SymbolicItem::Atom(Slot::ScriptSig(0))));
        let c = Constraint::Equal(hashed, SymbolicItem::Bytes(vec![0xab]));
        assert_eq!(c.to_string(), "EQUAL(HASH160(x_0), [ab])");

        let c = Constraint::SignaturesCorrect {
            secs: vec![SymbolicItem::Bytes(vec![2]), SymbolicItem::Bytes(vec![3])],
            sigs: vec![SymbolicItem::Atom(Slot::Witness(1))],
            script_code: vec![],
            sig_version: SigVersion::WitnessV0,
        };
        assert_eq!(c.to_string(), "SIGNATURES_CORRECT([[02], [03]], [w_1])");
    }

    #[test]
    fn test_stack_item_behaviour() {
        assert_eq!(SymbolicItem::from_data(vec![1]).data(), Some(&[1u8][..]));
        let atom = SymbolicItem::atom(Slot::ScriptSig(4)).unwrap();
        assert_eq!(atom.data(), None);
        assert_eq!(atom.as_atom(), Some(Slot::ScriptSig(4)));
        assert!(atom.require_data().is_err());
    }
}
