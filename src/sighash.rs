//! Signature hashes: the digest an input's ECDSA signature commits to
//!
//! Two algorithms exist. The legacy one re-serializes a modified copy of the
//! transaction for every signature, hashing the (cleaned) script code of the
//! input being signed. BIP-143, used by SegWit v0 and by the fork-id chains,
//! hashes a fixed-shape preimage whose transaction-wide parts can be cached.

use crate::constants::*;
use crate::error::{ScriptError, ScriptErrorKind};
use crate::hashing::double_sha256;
use crate::opcodes::OP_CODESEPARATOR;
use crate::script::stream::delete_opcode;
use crate::serialization::{ByteWriter, Streamable};
use crate::transaction::Tx;
use crate::types::{Hash, SigVersion};
use serde::{Deserialize, Serialize};
use std::cell::OnceCell;

/// The value Bitcoin Core signs when `SIGHASH_SINGLE` has no matching
/// output: the integer 1 stored little-endian, which ECDSA reads as 2^248.
pub const SIGHASH_SINGLE_BUG: Hash = {
    let mut one = [0u8; 32];
    one[0] = 0x01;
    one
};

/// Which chain's signature-hash rules apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SighashVariant {
    #[default]
    Bitcoin,
    /// BIP-143 for every input, `SIGHASH_FORKID` mandatory
    BitcoinCash,
    /// As Bitcoin Cash, with fork id 79 in bits 8.. of the hash type
    BitcoinGold,
}

impl SighashVariant {
    pub fn uses_fork_id(self) -> bool {
        !matches!(self, SighashVariant::Bitcoin)
    }

    /// Hash type a signer should use by default on this chain.
    pub fn default_hash_type(self) -> u32 {
        if self.uses_fork_id() {
            SIGHASH_ALL | SIGHASH_FORKID
        } else {
            SIGHASH_ALL
        }
    }

    /// The 32-bit hash type committed to in the preimage.
    pub fn preimage_hash_type(self, hash_type: u32) -> u32 {
        match self {
            SighashVariant::BitcoinGold => hash_type | (BITCOIN_GOLD_FORK_ID << 8),
            _ => hash_type,
        }
    }
}

/// Legacy signature hash of input `tx_in_idx` over `script_code`.
///
/// `script_code` is expected to have had the signature itself removed
/// already; `OP_CODESEPARATOR`s are removed here.
///
/// Out-of-range inputs and `SIGHASH_SINGLE` without a matching output hash
/// to [`SIGHASH_SINGLE_BUG`], exactly as Bitcoin Core does.
pub fn legacy_signature_hash(tx: &Tx, script_code: &[u8], tx_in_idx: usize, hash_type: u32) -> Hash {
    if tx_in_idx >= tx.txs_in.len() {
        return SIGHASH_SINGLE_BUG;
    }
    let base_type = hash_type & SIGHASH_BASE_MASK;
    if base_type == SIGHASH_SINGLE && tx_in_idx >= tx.txs_out.len() {
        return SIGHASH_SINGLE_BUG;
    }

    let script_code = delete_opcode(script_code, OP_CODESEPARATOR);
    let anyone_can_pay = hash_type & SIGHASH_ANYONECANPAY != 0;
    let zero_other_sequences = base_type == SIGHASH_NONE || base_type == SIGHASH_SINGLE;

    let mut writer = ByteWriter::with_capacity(tx.to_legacy_bin().len() + script_code.len() + 4);
    writer.write_u32_le(tx.version);

    let chosen: Vec<usize> = if anyone_can_pay {
        vec![tx_in_idx]
    } else {
        (0..tx.txs_in.len()).collect()
    };
    writer.write_compact_size(chosen.len() as u64);
    for idx in chosen {
        let tx_in = &tx.txs_in[idx];
        writer.write_bytes(&tx_in.previous_hash);
        writer.write_u32_le(tx_in.previous_index);
        if idx == tx_in_idx {
            writer.write_byte_string(&script_code);
            writer.write_u32_le(tx_in.sequence);
        } else {
            writer.write_byte_string(&[]);
            writer.write_u32_le(if zero_other_sequences { 0 } else { tx_in.sequence });
        }
    }

    match base_type {
        SIGHASH_NONE => writer.write_compact_size(0),
        SIGHASH_SINGLE => {
            writer.write_compact_size(tx_in_idx as u64 + 1);
            for _ in 0..tx_in_idx {
                writer.write_u64_le(u64::MAX);
                writer.write_byte_string(&[]);
            }
            tx.txs_out[tx_in_idx].stream(&mut writer);
        }
        _ => {
            writer.write_compact_size(tx.txs_out.len() as u64);
            for tx_out in &tx.txs_out {
                tx_out.stream(&mut writer);
            }
        }
    }

    writer.write_u32_le(tx.lock_time);
    writer.write_u32_le(hash_type);
    double_sha256(writer.as_bytes())
}

/// Lazily computed BIP-143 midstate for one transaction.
///
/// `hashPrevouts`, `hashSequence` and `hashOutputs` are shared by every
/// input signed with `SIGHASH_ALL`, so each is hashed at most once per cache.
#[derive(Debug)]
pub struct SegwitSighashCache<'a> {
    tx: &'a Tx,
    hash_prevouts: OnceCell<Hash>,
    hash_sequence: OnceCell<Hash>,
    hash_outputs: OnceCell<Hash>,
}

impl<'a> SegwitSighashCache<'a> {
    pub fn new(tx: &'a Tx) -> Self {
        Self {
            tx,
            hash_prevouts: OnceCell::new(),
            hash_sequence: OnceCell::new(),
            hash_outputs: OnceCell::new(),
        }
    }

    pub fn tx(&self) -> &'a Tx {
        self.tx
    }

    /// dSHA256(∥ prev_hash | prev_index)
    pub fn hash_prevouts(&self) -> Hash {
        *self.hash_prevouts.get_or_init(|| {
            let mut writer = ByteWriter::with_capacity(36 * self.tx.txs_in.len());
            for tx_in in &self.tx.txs_in {
                writer.write_bytes(&tx_in.previous_hash);
                writer.write_u32_le(tx_in.previous_index);
            }
            double_sha256(writer.as_bytes())
        })
    }

    /// dSHA256(∥ sequence)
    pub fn hash_sequence(&self) -> Hash {
        *self.hash_sequence.get_or_init(|| {
            let mut writer = ByteWriter::with_capacity(4 * self.tx.txs_in.len());
            for tx_in in &self.tx.txs_in {
                writer.write_u32_le(tx_in.sequence);
            }
            double_sha256(writer.as_bytes())
        })
    }

    /// dSHA256(∥ value | script)
    pub fn hash_outputs(&self) -> Hash {
        *self.hash_outputs.get_or_init(|| {
            let mut writer = ByteWriter::new();
            for tx_out in &self.tx.txs_out {
                tx_out.stream(&mut writer);
            }
            double_sha256(writer.as_bytes())
        })
    }

    /// BIP-143 preimage for input `tx_in_idx` spending `amount` satoshis.
    ///
    /// `hash_type` is the full 32-bit value written at the end, which lets
    /// the fork-id chains commit to extra bits. `None` when the input does
    /// not exist.
    pub fn preimage(&self, script_code: &[u8], tx_in_idx: usize, amount: u64, hash_type: u32) -> Option<Vec<u8>> {
        let tx = self.tx;
        let tx_in = tx.txs_in.get(tx_in_idx)?;
        let base_type = hash_type & SIGHASH_BASE_MASK;
        let anyone_can_pay = hash_type & SIGHASH_ANYONECANPAY != 0;

        let hash_prevouts = if anyone_can_pay {
            [0u8; 32]
        } else {
            self.hash_prevouts()
        };
        let hash_sequence =
            if anyone_can_pay || base_type == SIGHASH_SINGLE || base_type == SIGHASH_NONE {
                [0u8; 32]
            } else {
                self.hash_sequence()
            };
        let hash_outputs = if base_type != SIGHASH_SINGLE && base_type != SIGHASH_NONE {
            self.hash_outputs()
        } else if base_type == SIGHASH_SINGLE && tx_in_idx < tx.txs_out.len() {
            double_sha256(&tx.txs_out[tx_in_idx].to_bytes())
        } else {
            [0u8; 32]
        };

        let mut writer = ByteWriter::with_capacity(156 + script_code.len() + 9);
        writer.write_u32_le(tx.version);
        writer.write_bytes(&hash_prevouts);
        writer.write_bytes(&hash_sequence);
        writer.write_bytes(&tx_in.previous_hash);
        writer.write_u32_le(tx_in.previous_index);
        writer.write_byte_string(script_code);
        writer.write_u64_le(amount);
        writer.write_u32_le(tx_in.sequence);
        writer.write_bytes(&hash_outputs);
        writer.write_u32_le(tx.lock_time);
        writer.write_u32_le(hash_type);
        Some(writer.into_bytes())
    }

    /// BIP-143 signature hash. Out-of-range inputs have no preimage and
    /// hash to [`SIGHASH_SINGLE_BUG`].
    pub fn signature_hash(&self, script_code: &[u8], tx_in_idx: usize, amount: u64, hash_type: u32) -> Hash {
        self.preimage(script_code, tx_in_idx, amount, hash_type)
            .map_or(SIGHASH_SINGLE_BUG, |preimage| double_sha256(&preimage))
    }
}

/// Picks the right algorithm for an input according to the chain variant
/// and the script version being executed.
#[derive(Debug)]
pub struct SignatureHasher<'a> {
    cache: SegwitSighashCache<'a>,
    variant: SighashVariant,
}

impl<'a> SignatureHasher<'a> {
    pub fn new(tx: &'a Tx, variant: SighashVariant) -> Self {
        Self {
            cache: SegwitSighashCache::new(tx),
            variant,
        }
    }

    pub fn variant(&self) -> SighashVariant {
        self.variant
    }

    pub fn cache(&self) -> &SegwitSighashCache<'a> {
        &self.cache
    }

    /// Digest for input `tx_in_idx` spending `amount` under `script_code`.
    ///
    /// Fork-id chains reject hash types without `SIGHASH_FORKID`.
    pub fn signature_hash(
        &self,
        script_code: &[u8],
        tx_in_idx: usize,
        amount: u64,
        hash_type: u32,
        sig_version: SigVersion,
    ) -> Result<Hash, ScriptError> {
        if self.variant.uses_fork_id() {
            if hash_type & SIGHASH_FORKID == 0 {
                return Err(ScriptErrorKind::SigHashType.into());
            }
            let hash_type = self.variant.preimage_hash_type(hash_type);
            return Ok(self
                .cache
                .signature_hash(script_code, tx_in_idx, amount, hash_type));
        }
        Ok(match sig_version {
            SigVersion::Base => {
                legacy_signature_hash(self.cache.tx(), script_code, tx_in_idx, hash_type)
            }
            SigVersion::WitnessV0 => self
                .cache
                .signature_hash(script_code, tx_in_idx, amount, hash_type),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::{TxIn, TxOut};

    fn two_in_one_out() -> Tx {
        Tx::new(
            1,
            vec![
                TxIn::new([1; 32], 0, vec![], SEQUENCE_FINAL),
                TxIn::new([2; 32], 1, vec![], 5),
            ],
            vec![TxOut::new(1000, vec![0x51])],
            0,
        )
    }

    #[test]
    fn test_single_without_output_is_one() {
        let tx = two_in_one_out();
        assert_eq!(
            legacy_signature_hash(&tx, &[0x51], 1, SIGHASH_SINGLE),
            SIGHASH_SINGLE_BUG
        );
        assert_eq!(
            legacy_signature_hash(&tx, &[0x51], 1, SIGHASH_SINGLE | SIGHASH_ANYONECANPAY),
            SIGHASH_SINGLE_BUG
        );
        assert_ne!(
            legacy_signature_hash(&tx, &[0x51], 0, SIGHASH_SINGLE),
            SIGHASH_SINGLE_BUG
        );
    }

    #[test]
    fn test_legacy_ignores_codeseparator_and_other_scripts() {
        let tx = two_in_one_out();
        let plain = legacy_signature_hash(&tx, &[0x51, 0x52], 0, SIGHASH_ALL);
        let separated = legacy_signature_hash(&tx, &[0x51, OP_CODESEPARATOR, 0x52], 0, SIGHASH_ALL);
        assert_eq!(plain, separated);

        let mut other = tx.clone();
        other.txs_in[1].script = vec![0x00, 0x00];
        assert_eq!(plain, legacy_signature_hash(&other, &[0x51, 0x52], 0, SIGHASH_ALL));
    }

    #[test]
    fn test_hash_type_masks() {
        let tx = two_in_one_out();
        let mut changed_seq = tx.clone();
        changed_seq.txs_in[1].sequence = 9;
        let mut changed_out = tx.clone();
        changed_out.txs_out[0].coin_value = 1;

        let all = |t: &Tx| legacy_signature_hash(t, &[0x51], 0, SIGHASH_ALL);
        let none = |t: &Tx| legacy_signature_hash(t, &[0x51], 0, SIGHASH_NONE);
        let acp = |t: &Tx| legacy_signature_hash(t, &[0x51], 0, SIGHASH_ALL | SIGHASH_ANYONECANPAY);

        assert_ne!(all(&tx), all(&changed_seq));
        assert_eq!(none(&tx), none(&changed_seq));
        assert_eq!(none(&tx), none(&changed_out));
        assert_eq!(acp(&tx), acp(&changed_seq));
        assert_ne!(acp(&tx), acp(&changed_out));
    }

    #[test]
    fn test_fork_id_required() {
        let tx = two_in_one_out();
        let hasher = SignatureHasher::new(&tx, SighashVariant::BitcoinCash);
        let err = hasher
            .signature_hash(&[0x51], 0, 1000, SIGHASH_ALL, SigVersion::Base)
            .unwrap_err();
        assert_eq!(err.kind, ScriptErrorKind::SigHashType);

        let cash = hasher
            .signature_hash(&[0x51], 0, 1000, SIGHASH_ALL | SIGHASH_FORKID, SigVersion::Base)
            .unwrap();
        let gold = SignatureHasher::new(&tx, SighashVariant::BitcoinGold)
            .signature_hash(&[0x51], 0, 1000, SIGHASH_ALL | SIGHASH_FORKID, SigVersion::Base)
            .unwrap();
        assert_ne!(cash, gold);

        let cache = SegwitSighashCache::new(&tx);
        let preimage = cache.preimage(&[0x51], 0, 1000, (79 << 8) | 0x41).unwrap();
        assert!(cache.preimage(&[0x51], 5, 1000, 0x41).is_none());
        assert_eq!(&preimage[preimage.len() - 4..], &[0x41, 0x4f, 0x00, 0x00]);
        assert_eq!(gold, double_sha256(&preimage));
    }

    #[test]
    fn test_variant_serde_names() {
        let variant: SighashVariant = serde_json::from_str("\"bitcoin_gold\"").unwrap();
        assert_eq!(variant, SighashVariant::BitcoinGold);
        assert_eq!(SighashVariant::BitcoinCash.default_hash_type(), 0x41);
        assert_eq!(SighashVariant::Bitcoin.default_hash_type(), 0x01);
    }
}
