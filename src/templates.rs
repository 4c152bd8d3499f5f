//! Standard puzzle scripts: constructors and a template-matching classifier

use crate::error::{ConsensusError, Result};
use crate::hashing::{hash160, sha256};
use crate::opcodes::*;
use crate::script::stream::{compile_push_bytes, get_opcode};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// `<sec> OP_CHECKSIG`
pub fn p2pk(sec: &[u8]) -> Vec<u8> {
    let mut script = compile_push_bytes(sec);
    script.push(OP_CHECKSIG);
    script
}

/// `OP_DUP OP_HASH160 <hash160> OP_EQUALVERIFY OP_CHECKSIG`
pub fn p2pkh(hash160: &[u8; 20]) -> Vec<u8> {
    let mut script = vec![OP_DUP, OP_HASH160];
    script.extend_from_slice(&compile_push_bytes(hash160));
    script.push(OP_EQUALVERIFY);
    script.push(OP_CHECKSIG);
    script
}

/// `OP_HASH160 <hash160> OP_EQUAL`
pub fn p2sh(hash160: &[u8; 20]) -> Vec<u8> {
    let mut script = vec![OP_HASH160];
    script.extend_from_slice(&compile_push_bytes(hash160));
    script.push(OP_EQUAL);
    script
}

/// `OP_0 <hash160>`
pub fn p2wpkh(hash160: &[u8; 20]) -> Vec<u8> {
    let mut script = vec![OP_0];
    script.extend_from_slice(&compile_push_bytes(hash160));
    script
}

/// `OP_0 <sha256>`
pub fn p2wsh(sha256: &[u8; 32]) -> Vec<u8> {
    let mut script = vec![OP_0];
    script.extend_from_slice(&compile_push_bytes(sha256));
    script
}

/// `OP_m <sec₁> … <secₙ> OP_n OP_CHECKMULTISIG`, 1 ≤ m ≤ n ≤ 16.
pub fn multisig(m: usize, secs: &[Vec<u8>]) -> Result<Vec<u8>> {
    let n = secs.len();
    if m == 0 || m > n || n > 16 {
        return Err(ConsensusError::Serialization(Cow::Owned(format!(
            "bad multisig parameters {m} of {n}"
        ))));
    }
    let mut script = vec![OP_1 + m as u8 - 1];
    for sec in secs {
        script.extend_from_slice(&compile_push_bytes(sec));
    }
    script.push(OP_1 + n as u8 - 1);
    script.push(OP_CHECKMULTISIG);
    Ok(script)
}

/// `OP_RETURN <data>`; empty data gives a bare `OP_RETURN`.
pub fn nulldata(data: &[u8]) -> Vec<u8> {
    let mut script = vec![OP_RETURN];
    if !data.is_empty() {
        script.extend_from_slice(&compile_push_bytes(data));
    }
    script
}

/// P2SH puzzle paying to `redeem_script`.
pub fn p2sh_for_script(redeem_script: &[u8]) -> Vec<u8> {
    p2sh(&hash160(redeem_script))
}

/// P2WSH puzzle paying to `witness_script`.
pub fn p2wsh_for_script(witness_script: &[u8]) -> Vec<u8> {
    p2wsh(&sha256(witness_script))
}

/// What a puzzle script turned out to be.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScriptInfo {
    P2pk { sec: Vec<u8> },
    P2pkh { hash160: [u8; 20] },
    P2sh { hash160: [u8; 20] },
    P2wpkh { hash160: [u8; 20] },
    P2wsh { hash256: [u8; 32] },
    Multisig { m: usize, secs: Vec<Vec<u8>> },
    Nulldata { data: Vec<u8> },
    Unknown { script: Vec<u8> },
}

impl ScriptInfo {
    pub fn type_name(&self) -> &'static str {
        match self {
            ScriptInfo::P2pk { .. } => "p2pk",
            ScriptInfo::P2pkh { .. } => "p2pkh",
            ScriptInfo::P2sh { .. } => "p2sh",
            ScriptInfo::P2wpkh { .. } => "p2wpkh",
            ScriptInfo::P2wsh { .. } => "p2wsh",
            ScriptInfo::Multisig { .. } => "multisig",
            ScriptInfo::Nulldata { .. } => "nulldata",
            ScriptInfo::Unknown { .. } => "unknown",
        }
    }
}

/// One position of a template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pattern {
    Op(u8),
    /// 33- or 65-byte SEC push
    PubKey,
    /// 20-byte push
    PubKeyHash,
    /// 32-byte push
    Segwit,
    /// any push, possibly absent at the end
    Data,
}

const P2PK_TEMPLATE: &[Pattern] = &[Pattern::PubKey, Pattern::Op(OP_CHECKSIG)];
const P2PKH_TEMPLATE: &[Pattern] = &[
    Pattern::Op(OP_DUP),
    Pattern::Op(OP_HASH160),
    Pattern::PubKeyHash,
    Pattern::Op(OP_EQUALVERIFY),
    Pattern::Op(OP_CHECKSIG),
];
const P2SH_TEMPLATE: &[Pattern] = &[
    Pattern::Op(OP_HASH160),
    Pattern::PubKeyHash,
    Pattern::Op(OP_EQUAL),
];
const P2WPKH_TEMPLATE: &[Pattern] = &[Pattern::Op(OP_0), Pattern::PubKeyHash];
const P2WSH_TEMPLATE: &[Pattern] = &[Pattern::Op(OP_0), Pattern::Segwit];
const NULLDATA_TEMPLATE: &[Pattern] = &[Pattern::Op(OP_RETURN), Pattern::Data];

/// Walks `script` and `template` in parallel, returning the data matched by
/// each placeholder.
fn match_template<'s>(script: &'s [u8], template: &[Pattern]) -> Option<Vec<&'s [u8]>> {
    let mut captured = Vec::new();
    let mut pc = 0;
    for pattern in template {
        if pc >= script.len() {
            // only a trailing Data may be absent
            return (*pattern == Pattern::Data).then_some(captured);
        }
        let ins = get_opcode(script, pc).ok()?;
        pc = ins.next_pc;
        match (*pattern, ins.data) {
            (Pattern::Op(op), _) if op == ins.opcode => {}
            (Pattern::PubKey, Some(data)) if data.len() == 33 || data.len() == 65 => captured.push(data),
            (Pattern::PubKeyHash, Some(data)) if data.len() == 20 => captured.push(data),
            (Pattern::Segwit, Some(data)) if data.len() == 32 => captured.push(data),
            (Pattern::Data, Some(data)) => captured.push(data),
            _ => return None,
        }
    }
    (pc == script.len()).then_some(captured)
}

fn match_multisig(script: &[u8]) -> Option<ScriptInfo> {
    let first = get_opcode(script, 0).ok()?;
    let m = small_int_value(first.opcode)? as usize;
    let mut pc = first.next_pc;
    let mut secs = Vec::new();
    loop {
        let ins = get_opcode(script, pc).ok()?;
        pc = ins.next_pc;
        match ins.data {
            Some(data) if data.len() == 33 || data.len() == 65 => secs.push(data.to_vec()),
            Some(_) => return None,
            None => {
                let n = small_int_value(ins.opcode)? as usize;
                let last = get_opcode(script, pc).ok()?;
                let valid = n == secs.len()
                    && m <= n
                    && last.opcode == OP_CHECKMULTISIG
                    && last.next_pc == script.len();
                return valid.then_some(ScriptInfo::Multisig { m, secs });
            }
        }
    }
}

/// Classifies `script` against the standard templates.
pub fn classify(script: &[u8]) -> ScriptInfo {
    fn fixed<const N: usize>(data: &[u8]) -> Option<[u8; N]> {
        data.try_into().ok()
    }

    if let Some(c) = match_template(script, P2PKH_TEMPLATE) {
        if let Some(hash160) = fixed(c[0]) {
            return ScriptInfo::P2pkh { hash160 };
        }
    }
    if let Some(c) = match_template(script, P2SH_TEMPLATE) {
        if let Some(hash160) = fixed(c[0]) {
            return ScriptInfo::P2sh { hash160 };
        }
    }
    if let Some(c) = match_template(script, P2WPKH_TEMPLATE) {
        if let Some(hash160) = fixed(c[0]) {
            return ScriptInfo::P2wpkh { hash160 };
        }
    }
    if let Some(c) = match_template(script, P2WSH_TEMPLATE) {
        if let Some(hash256) = fixed(c[0]) {
            return ScriptInfo::P2wsh { hash256 };
        }
    }
    if let Some(c) = match_template(script, P2PK_TEMPLATE) {
        return ScriptInfo::P2pk { sec: c[0].to_vec() };
    }
    if let Some(info) = match_multisig(script) {
        return info;
    }
    if let Some(c) = match_template(script, NULLDATA_TEMPLATE) {
        return ScriptInfo::Nulldata {
            data: c.first().map(|d| d.to_vec()).unwrap_or_default(),
        };
    }
    ScriptInfo::Unknown {
        script: script.to_vec(),
    }
}
