//! Text form of scripts
//!
//! `compile` reads the notation of Bitcoin Core's script test vectors:
//!
//! | token | meaning |
//! |-------|---------|
//! | `DUP`, `OP_DUP` | opcode by name |
//! | `-1`..`16` | `OP_1NEGATE`, `OP_0`..`OP_16` |
//! | other decimals | script-number push |
//! | `0x4c01ff` | raw bytes, inserted verbatim |
//! | `'text'` | push of the UTF-8 bytes |
//! | `[abcd]` | push of the hex bytes |
//!
//! `disassemble` renders opcode names and `[hex]` pushes.

use crate::error::{ConsensusError, Result};
use crate::opcodes::*;
use crate::script::number::int_to_script_bytes;
use crate::script::stream::{compile_push_bytes, instructions};
use std::borrow::Cow;

fn syntax_error(token: &str) -> ConsensusError {
    ConsensusError::Serialization(Cow::Owned(format!("cannot compile script token {token:?}")))
}

fn compile_token(token: &str, out: &mut Vec<u8>) -> Result<()> {
    if let Some(hex_digits) = token.strip_prefix("0x") {
        out.extend_from_slice(&hex::decode(hex_digits).map_err(|_| syntax_error(token))?);
        return Ok(());
    }
    if let Some(inner) = token.strip_prefix('[').and_then(|t| t.strip_suffix(']')) {
        let data = hex::decode(inner).map_err(|_| syntax_error(token))?;
        out.extend_from_slice(&compile_push_bytes(&data));
        return Ok(());
    }
    if token.len() >= 2 && token.starts_with('\'') && token.ends_with('\'') {
        out.extend_from_slice(&compile_push_bytes(token[1..token.len() - 1].as_bytes()));
        return Ok(());
    }
    let is_number = {
        let digits = token.strip_prefix('-').unwrap_or(token);
        !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
    };
    if is_number {
        let value: i64 = token.parse().map_err(|_| syntax_error(token))?;
        match value {
            -1 => out.push(OP_1NEGATE),
            0 => out.push(OP_0),
            1..=16 => out.push(OP_1 + value as u8 - 1),
            _ => out.extend_from_slice(&compile_push_bytes(&int_to_script_bytes(value))),
        }
        return Ok(());
    }
    let opcode = opcode_by_name(token).ok_or_else(|| syntax_error(token))?;
    out.push(opcode);
    Ok(())
}

/// Assembles `text` into script bytes.
pub fn compile(text: &str) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    let mut rest = text.trim_start();
    while !rest.is_empty() {
        // quoted strings may contain spaces
        let end = if rest.starts_with('\'') {
            rest[1..]
                .find('\'')
                .map(|i| i + 2)
                .ok_or_else(|| syntax_error(rest))?
        } else {
            rest.find(char::is_whitespace).unwrap_or(rest.len())
        };
        compile_token(&rest[..end], &mut out)?;
        rest = rest[end..].trim_start();
    }
    Ok(out)
}

/// Renders `script` as text. Undecodable tails are shown as `[error]`.
pub fn disassemble(script: &[u8]) -> String {
    let mut parts: Vec<Cow<'_, str>> = Vec::new();
    for ins in instructions(script) {
        match ins {
            Ok(ins) => match ins.data {
                Some([]) => parts.push(Cow::Borrowed("OP_0")),
                Some(data) => parts.push(Cow::Owned(format!("[{}]", hex::encode(data)))),
                None => parts.push(opcode_name(ins.opcode)),
            },
            Err(_) => {
                parts.push(Cow::Borrowed("[error]"));
                break;
            }
        }
    }
    parts.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_tokens() {
        assert_eq!(compile("DUP OP_HASH160").unwrap(), vec![OP_DUP, OP_HASH160]);
        assert_eq!(compile("-1 0 1 16").unwrap(), vec![OP_1NEGATE, OP_0, OP_1, OP_16]);
        assert_eq!(compile("17").unwrap(), vec![0x01, 0x11]);
        assert_eq!(compile("-2").unwrap(), vec![0x01, 0x82]);
        assert_eq!(compile("128").unwrap(), vec![0x02, 0x80, 0x00]);
        assert_eq!(compile("0x4c01ff").unwrap(), vec![OP_PUSHDATA1, 0x01, 0xff]);
        assert_eq!(compile("'ab c'").unwrap(), vec![0x04, b'a', b'b', b' ', b'c']);
        assert_eq!(compile("''").unwrap(), vec![OP_0]);
        assert_eq!(compile("[0102]").unwrap(), vec![0x02, 0x01, 0x02]);
        assert_eq!(compile("  ").unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn test_compile_errors() {
        assert!(compile("NOT_AN_OP").is_err());
        assert!(compile("0xzz").is_err());
        assert!(compile("'unterminated").is_err());
    }

    #[test]
    fn test_disassemble() {
        let script = compile("DUP HASH160 [00112233445566778899aabbccddeeff00112233] EQUALVERIFY CHECKSIG")
            .unwrap();
        assert_eq!(
            disassemble(&script),
            "OP_DUP OP_HASH160 [00112233445566778899aabbccddeeff00112233] OP_EQUALVERIFY OP_CHECKSIG"
        );
        assert_eq!(compile(&disassemble(&script)).unwrap(), script);
        assert_eq!(disassemble(&[OP_0, OP_1]), "OP_0 OP_1");
        assert_eq!(disassemble(&[0x02, 0x01]), "[error]");
    }
}
