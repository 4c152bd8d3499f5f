//! Signature and public key encodings
//!
//! A script signature is a DER `SEQUENCE { INTEGER r, INTEGER s }`
//! followed by one sighash-type byte. The strict checks follow BIP-66
//! (`DERSIG`), BIP-62 low-S (`LOW_S`) and Core's `STRICTENC` rules.

use crate::constants::{SIGHASH_ANYONECANPAY, SIGHASH_FORKID};
use crate::curve::EcdsaSignature;
use crate::error::{ConsensusError, ScriptError, ScriptErrorKind};
use crate::script::flags::ScriptFlags;
use crate::types::SigVersion;
use num_bigint::BigUint;
use std::borrow::Cow;

/// Core's `IsValidSignatureEncoding`, applied to signature plus hashtype.
///
/// Format: `0x30 [total-length] 0x02 [R-length] [R] 0x02 [S-length] [S] [sighash]`
/// 1. total size 9..=73, leading `0x30`, length byte covers everything but the hashtype
/// 2. both integers tagged `0x02`, non-empty, non-negative, no superfluous `0x00`
pub fn is_valid_signature_encoding(sig: &[u8]) -> bool {
    if sig.len() < 9 || sig.len() > 73 {
        return false;
    }
    if sig[0] != 0x30 || sig[1] as usize != sig.len() - 3 {
        return false;
    }
    let len_r = sig[3] as usize;
    if 5 + len_r >= sig.len() {
        return false;
    }
    let len_s = sig[5 + len_r] as usize;
    if len_r + len_s + 7 != sig.len() {
        return false;
    }

    if sig[2] != 0x02 || len_r == 0 || sig[4] & 0x80 != 0 {
        return false;
    }
    if len_r > 1 && sig[4] == 0x00 && sig[5] & 0x80 == 0 {
        return false;
    }

    if sig[len_r + 4] != 0x02 || len_s == 0 || sig[len_r + 6] & 0x80 != 0 {
        return false;
    }
    if len_s > 1 && sig[len_r + 6] == 0x00 && sig[len_r + 7] & 0x80 == 0 {
        return false;
    }
    true
}

/// Parses a bare DER signature (no hashtype byte).
///
/// Accepts BER-style leniency the network historically allowed: extra
/// padding zeros in the integers. Lengths must still be consistent.
pub fn parse_der_signature(der: &[u8]) -> Option<EcdsaSignature> {
    let (&tag, rest) = der.split_first()?;
    if tag != 0x30 {
        return None;
    }
    let (seq_len, rest) = read_der_length(rest)?;
    let body = rest.get(..seq_len)?;
    let (r, body) = read_der_integer(body)?;
    let (s, body) = read_der_integer(body)?;
    if !body.is_empty() {
        return None;
    }
    Some(EcdsaSignature::new(r, s))
}

fn read_der_length(data: &[u8]) -> Option<(usize, &[u8])> {
    let (&first, rest) = data.split_first()?;
    if first & 0x80 == 0 {
        return Some((first as usize, rest));
    }
    let width = (first & 0x7f) as usize;
    if width == 0 || width > 4 {
        return None;
    }
    let bytes = rest.get(..width)?;
    let len = bytes.iter().fold(0usize, |acc, b| (acc << 8) | *b as usize);
    Some((len, &rest[width..]))
}

fn read_der_integer(data: &[u8]) -> Option<(BigUint, &[u8])> {
    let (&tag, rest) = data.split_first()?;
    if tag != 0x02 {
        return None;
    }
    let (len, rest) = read_der_length(rest)?;
    if len == 0 {
        return None;
    }
    let bytes = rest.get(..len)?;
    Some((BigUint::from_bytes_be(bytes), &rest[len..]))
}

/// Minimal DER for `(r, s)`.
pub fn encode_der_signature(signature: &EcdsaSignature) -> Vec<u8> {
    let r = der_integer(&signature.r);
    let s = der_integer(&signature.s);
    let mut out = Vec::with_capacity(r.len() + s.len() + 2);
    out.push(0x30);
    out.push((r.len() + s.len()) as u8);
    out.extend_from_slice(&r);
    out.extend_from_slice(&s);
    out
}

fn der_integer(n: &BigUint) -> Vec<u8> {
    let mut bytes = n.to_bytes_be();
    if bytes[0] & 0x80 != 0 {
        bytes.insert(0, 0x00);
    }
    let mut out = Vec::with_capacity(bytes.len() + 2);
    out.push(0x02);
    out.push(bytes.len() as u8);
    out.extend_from_slice(&bytes);
    out
}

/// Splits a script signature into its DER part and hashtype and parses it.
pub fn parse_signature_blob(blob: &[u8]) -> Result<(EcdsaSignature, u32), ConsensusError> {
    let (&hash_type, der) = blob
        .split_last()
        .ok_or(ConsensusError::InvalidSignature(Cow::Borrowed("empty signature")))?;
    let signature = parse_der_signature(der)
        .ok_or(ConsensusError::InvalidSignature(Cow::Borrowed("malformed DER")))?;
    Ok((signature, u32::from(hash_type)))
}

/// Signature plus hashtype byte, ready to be pushed.
pub fn signature_blob(signature: &EcdsaSignature, hash_type: u32) -> Vec<u8> {
    let mut blob = encode_der_signature(signature);
    blob.push(hash_type as u8);
    blob
}

/// STRICTENC: the hashtype is one of ALL, NONE, SINGLE, optionally with
/// ANYONECANPAY. Fork-id chains also allow (and require) `SIGHASH_FORKID`.
pub fn is_defined_hash_type(hash_type: u32, uses_fork_id: bool) -> bool {
    let mut base = hash_type & !SIGHASH_ANYONECANPAY;
    if uses_fork_id {
        base &= !SIGHASH_FORKID;
    }
    (1..=3).contains(&base)
}

pub fn is_valid_pubkey_encoding(pubkey: &[u8]) -> bool {
    match pubkey.len() {
        33 => matches!(pubkey[0], 0x02 | 0x03),
        65 => pubkey[0] == 0x04,
        _ => false,
    }
}

pub fn is_compressed_pubkey(pubkey: &[u8]) -> bool {
    pubkey.len() == 33 && matches!(pubkey[0], 0x02 | 0x03)
}

/// `CheckSignatureEncoding`. Empty signatures pass: they are the
/// conventional way to make a CHECKSIG fail without failing the script.
pub fn check_signature_encoding(
    sig: &[u8],
    flags: ScriptFlags,
    order: &BigUint,
    uses_fork_id: bool,
) -> Result<(), ScriptError> {
    if sig.is_empty() {
        return Ok(());
    }
    let strict = ScriptFlags::DERSIG | ScriptFlags::LOW_S | ScriptFlags::STRICTENC;
    if !(flags & strict).is_empty() && !is_valid_signature_encoding(sig) {
        return Err(ScriptErrorKind::SigDer.into());
    }
    if flags.contains(ScriptFlags::LOW_S) {
        let low = parse_der_signature(&sig[..sig.len() - 1])
            .map(|parsed| parsed.is_low_s(order))
            .unwrap_or(false);
        if !low {
            return Err(ScriptErrorKind::SigHighS.into());
        }
    }
    if flags.contains(ScriptFlags::STRICTENC) {
        let hash_type = u32::from(sig[sig.len() - 1]);
        if !is_defined_hash_type(hash_type, uses_fork_id) {
            return Err(ScriptErrorKind::SigHashType.into());
        }
    }
    Ok(())
}

/// `CheckPubKeyEncoding`.
pub fn check_pubkey_encoding(
    pubkey: &[u8],
    flags: ScriptFlags,
    sig_version: SigVersion,
) -> Result<(), ScriptError> {
    if flags.contains(ScriptFlags::STRICTENC) && !is_valid_pubkey_encoding(pubkey) {
        return Err(ScriptErrorKind::PubkeyType.into());
    }
    if sig_version == SigVersion::WitnessV0
        && flags.contains(ScriptFlags::WITNESS_PUBKEYTYPE)
        && !is_compressed_pubkey(pubkey)
    {
        return Err(ScriptErrorKind::WitnessPubkeyType.into());
    }
    Ok(())
}
