//! Segregated Witness helpers (BIP-141)

use crate::constants::WITNESS_SCALE_FACTOR;
use crate::opcodes::*;
use crate::transaction::Tx;

/// Witness Data: 𝒲 = 𝕊* (stack of witness elements)
pub type Witness = Vec<Vec<u8>>;

/// WitnessProgram: 𝕊 → (version, program) ∪ {⊥}
///
/// A script is a witness program iff:
/// 1. 4 ≤ |script| ≤ 42
/// 2. script[0] ∈ {OP_0, OP_1 … OP_16}
/// 3. script[1] = |script| − 2 (a single direct push of 2..=40 bytes)
pub fn witness_program(script: &[u8]) -> Option<(u8, &[u8])> {
    if !(4..=42).contains(&script.len()) {
        return None;
    }
    let version = match script[0] {
        OP_0 => 0,
        op @ OP_1..=OP_16 => op - OP_1 + 1,
        _ => return None,
    };
    if usize::from(script[1]) + 2 != script.len() {
        return None;
    }
    Some((version, &script[2..]))
}

/// `OP_HASH160 <20 bytes> OP_EQUAL`
pub fn is_p2sh(script: &[u8]) -> bool {
    script.len() == 23 && script[0] == OP_HASH160 && script[1] == 0x14 && script[22] == OP_EQUAL
}

/// Version-0 program carrying a 20-byte key hash.
pub fn is_p2wpkh(script: &[u8]) -> bool {
    matches!(witness_program(script), Some((0, program)) if program.len() == 20)
}

/// Version-0 program carrying a 32-byte script hash.
pub fn is_p2wsh(script: &[u8]) -> bool {
    matches!(witness_program(script), Some((0, program)) if program.len() == 32)
}

/// Weight(tx) = (WITNESS_SCALE_FACTOR − 1) × |Serialize(tx ∖ witness)| + |Serialize(tx)|
pub fn transaction_weight(tx: &Tx) -> usize {
    let base_size = tx.to_legacy_bin().len();
    let total_size = tx.to_bin().len();
    (WITNESS_SCALE_FACTOR - 1) * base_size + total_size
}

/// VSize(tx) = ⌈Weight(tx) / WITNESS_SCALE_FACTOR⌉
pub fn virtual_size(tx: &Tx) -> usize {
    transaction_weight(tx).div_ceil(WITNESS_SCALE_FACTOR)
}
