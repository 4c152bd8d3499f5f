//! Opcode stream encoding and decoding
//!
//! Decoding yields one [`Instruction`] per opcode: the opcode byte, the
//! pushed data for push opcodes (`OP_0`..=`OP_PUSHDATA4`) and the offset of
//! the next opcode. A push running past the end of the script is
//! `BAD_OPCODE`, matching Core's `GetOp`.

use crate::error::{ScriptError, ScriptErrorKind};
use crate::opcodes::*;

/// One decoded opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction<'a> {
    pub opcode: u8,
    pub data: Option<&'a [u8]>,
    pub pc: usize,
    pub next_pc: usize,
}

impl Instruction<'_> {
    pub fn is_push(&self) -> bool {
        self.data.is_some()
    }
}

/// Decodes the opcode at `pc`.
pub fn get_opcode(script: &[u8], pc: usize) -> Result<Instruction<'_>, ScriptError> {
    let bad = || ScriptError::at(ScriptErrorKind::BadOpcode, pc);
    let opcode = *script.get(pc).ok_or_else(bad)?;
    let mut cursor = pc + 1;
    let len = match opcode {
        OP_0 => 0,
        0x01..=0x4b => opcode as usize,
        OP_PUSHDATA1 => {
            let b = script.get(cursor..cursor + 1).ok_or_else(bad)?;
            cursor += 1;
            b[0] as usize
        }
        OP_PUSHDATA2 => {
            let b = script.get(cursor..cursor + 2).ok_or_else(bad)?;
            cursor += 2;
            u16::from_le_bytes([b[0], b[1]]) as usize
        }
        OP_PUSHDATA4 => {
            let b = script.get(cursor..cursor + 4).ok_or_else(bad)?;
            cursor += 4;
            u32::from_le_bytes([b[0], b[1], b[2], b[3]]) as usize
        }
        _ => {
            return Ok(Instruction {
                opcode,
                data: None,
                pc,
                next_pc: cursor,
            })
        }
    };
    let end = cursor.checked_add(len).ok_or_else(bad)?;
    let data = script.get(cursor..end).ok_or_else(bad)?;
    Ok(Instruction {
        opcode,
        data: Some(data),
        pc,
        next_pc: end,
    })
}

/// Iterator over the instructions of a script. Stops after the first
/// decoding error.
#[derive(Debug, Clone)]
pub struct Instructions<'a> {
    script: &'a [u8],
    pc: usize,
    failed: bool,
}

impl<'a> Iterator for Instructions<'a> {
    type Item = Result<Instruction<'a>, ScriptError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.pc >= self.script.len() {
            return None;
        }
        match get_opcode(self.script, self.pc) {
            Ok(ins) => {
                self.pc = ins.next_pc;
                Some(Ok(ins))
            }
            Err(err) => {
                self.failed = true;
                Some(Err(err))
            }
        }
    }
}

pub fn instructions(script: &[u8]) -> Instructions<'_> {
    Instructions {
        script,
        pc: 0,
        failed: false,
    }
}

/// Encodes `blob` with the shortest legal push, converting one-byte values
/// 1..=16 and 0x81 to `OP_1`..`OP_16` and `OP_1NEGATE`.
pub fn compile_push_data(blob: &[u8]) -> Vec<u8> {
    if blob.len() == 1 {
        match blob[0] {
            v @ 1..=16 => return vec![OP_1 + v - 1],
            0x81 => return vec![OP_1NEGATE],
            _ => {}
        }
    }
    compile_push_bytes(blob)
}

/// Encodes `blob` as a length-prefixed push without small-integer
/// conversion, the way Core's `CScript << vector` does.
pub fn compile_push_bytes(blob: &[u8]) -> Vec<u8> {
    let len = blob.len();
    let mut out = Vec::with_capacity(len + 5);
    if len <= 0x4b {
        out.push(len as u8);
    } else if len <= 0xff {
        out.push(OP_PUSHDATA1);
        out.push(len as u8);
    } else if len <= 0xffff {
        out.push(OP_PUSHDATA2);
        out.extend_from_slice(&(len as u16).to_le_bytes());
    } else {
        out.push(OP_PUSHDATA4);
        out.extend_from_slice(&(len as u32).to_le_bytes());
    }
    out.extend_from_slice(blob);
    out
}

/// Concatenated minimal pushes of every item, bottom of the stack first.
pub fn compile_push_data_list<I, B>(items: I) -> Vec<u8>
where
    I: IntoIterator<Item = B>,
    B: AsRef<[u8]>,
{
    items
        .into_iter()
        .flat_map(|item| compile_push_data(item.as_ref()))
        .collect()
}

/// True if `opcode` is the encoding [`compile_push_data`] picks for `data`.
pub fn is_minimal_push(opcode: u8, data: &[u8]) -> bool {
    match data.len() {
        0 => opcode == OP_0,
        1 if (1..=16).contains(&data[0]) => opcode == OP_1 + data[0] - 1,
        1 if data[0] == 0x81 => opcode == OP_1NEGATE,
        len @ 1..=0x4b => opcode as usize == len,
        0x4c..=0xff => opcode == OP_PUSHDATA1,
        0x100..=0xffff => opcode == OP_PUSHDATA2,
        _ => true,
    }
}

/// Every opcode is a push or a small-integer constant.
pub fn is_push_only(script: &[u8]) -> bool {
    instructions(script).all(|ins| matches!(ins, Ok(ins) if ins.opcode <= OP_16))
}

/// Data pushed by a push-only script, `None` otherwise.
pub fn push_data_list(script: &[u8]) -> Option<Vec<Vec<u8>>> {
    instructions(script)
        .map(|ins| {
            let ins = ins.ok()?;
            match (ins.data, ins.opcode) {
                (Some(data), _) => Some(data.to_vec()),
                (None, OP_1NEGATE) => Some(vec![0x81]),
                (None, op) => small_int_value(op).map(|v| vec![v]),
            }
        })
        .collect()
}

/// Removes every `opcode` from `script`, walking opcode boundaries.
/// Anything after an undecodable push is kept verbatim.
pub fn delete_opcode(script: &[u8], opcode: u8) -> Vec<u8> {
    let mut out = Vec::with_capacity(script.len());
    let mut start = 0;
    let mut pc = 0;
    while pc < script.len() {
        let Ok(ins) = get_opcode(script, pc) else {
            break;
        };
        if ins.opcode == opcode {
            out.extend_from_slice(&script[start..pc]);
            start = ins.next_pc;
        }
        pc = ins.next_pc;
    }
    out.extend_from_slice(&script[start..]);
    out
}

/// Core's `FindAndDelete`: drops every occurrence of `pattern` that starts
/// on an opcode boundary. Returns the new script and the number of matches.
pub fn find_and_delete(script: &[u8], pattern: &[u8]) -> (Vec<u8>, usize) {
    if pattern.is_empty() {
        return (script.to_vec(), 0);
    }
    let mut out = Vec::with_capacity(script.len());
    let mut found = 0;
    let mut pc = 0;
    let mut kept_from = 0;
    loop {
        out.extend_from_slice(&script[kept_from..pc]);
        while script.len() - pc >= pattern.len() && script[pc..].starts_with(pattern) {
            pc += pattern.len();
            found += 1;
        }
        kept_from = pc;
        if pc >= script.len() {
            break;
        }
        match get_opcode(script, pc) {
            Ok(ins) => pc = ins.next_pc,
            Err(_) => break,
        }
    }
    if found == 0 {
        return (script.to_vec(), 0);
    }
    out.extend_from_slice(&script[kept_from..]);
    (out, found)
}

/// Number of non-push opcodes, the quantity bounded by the op-count limit.
pub fn count_ops(script: &[u8]) -> usize {
    instructions(script)
        .filter_map(|ins| ins.ok())
        .filter(|ins| ins.opcode > OP_16)
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_compile_push_data_forms() {
        assert_eq!(compile_push_data(&[]), vec![OP_0]);
        assert_eq!(compile_push_data(&[5]), vec![0x55]);
        assert_eq!(compile_push_data(&[0x81]), vec![OP_1NEGATE]);
        assert_eq!(compile_push_data(&[0]), vec![0x01, 0x00]);
        assert_eq!(compile_push_data(&[17]), vec![0x01, 17]);
        let blob = vec![0xaa; 75];
        assert_eq!(compile_push_data(&blob)[0], 75);
        let blob = vec![0xaa; 76];
        assert_eq!(&compile_push_data(&blob)[..2], &[OP_PUSHDATA1, 76]);
        let blob = vec![0xaa; 256];
        assert_eq!(&compile_push_data(&blob)[..3], &[OP_PUSHDATA2, 0x00, 0x01]);
        let blob = vec![0xaa; 0x10000];
        assert_eq!(
            &compile_push_data(&blob)[..5],
            &[OP_PUSHDATA4, 0x00, 0x00, 0x01, 0x00]
        );
    }

    #[test]
    fn test_get_opcode_truncated_push() {
        let script = [0x4c, 0x05, 0x01];
        let err = get_opcode(&script, 0).unwrap_err();
        assert_eq!(err.kind, ScriptErrorKind::BadOpcode);
        let script = [0x4d, 0x01];
        assert!(get_opcode(&script, 0).is_err());
    }

    #[test]
    fn test_minimal_push_detection() {
        assert!(is_minimal_push(OP_0, &[]));
        assert!(!is_minimal_push(0x01, &[0x05]));
        assert!(is_minimal_push(0x55, &[0x05]));
        assert!(!is_minimal_push(OP_PUSHDATA1, &[0xaa; 10]));
        assert!(is_minimal_push(OP_PUSHDATA1, &[0xaa; 80]));
        assert!(!is_minimal_push(OP_PUSHDATA2, &[0xaa; 80]));
    }

    #[test]
    fn test_push_only() {
        assert!(is_push_only(&[0x00, 0x51, 0x4f, 0x02, 0xaa, 0xbb]));
        assert!(!is_push_only(&[0x51, OP_DUP]));
        assert!(!is_push_only(&[0x02, 0xaa]));
        assert!(is_push_only(&[]));
    }

    #[test]
    fn test_delete_codeseparator_aligned() {
        // the 0xab inside the push must survive
        let script = [OP_CODESEPARATOR, 0x01, OP_CODESEPARATOR, OP_DUP, OP_CODESEPARATOR];
        assert_eq!(delete_opcode(&script, OP_CODESEPARATOR), vec![0x01, 0xab, OP_DUP]);
    }

    #[test]
    fn test_find_and_delete_matches_on_boundaries() {
        let pattern = [0x02, 0xaa, 0xbb];
        let script = [0x02, 0xaa, 0xbb, OP_DUP, 0x02, 0xaa, 0xbb];
        let (out, n) = find_and_delete(&script, &pattern);
        assert_eq!(out, vec![OP_DUP]);
        assert_eq!(n, 2);

        // pattern occurs only inside a push
        let script = [0x04, 0x02, 0xaa, 0xbb, 0xcc];
        let (out, n) = find_and_delete(&script, &pattern);
        assert_eq!(out, script.to_vec());
        assert_eq!(n, 0);
    }

    #[test]
    fn test_push_data_list() {
        let script = compile_push_data_list([vec![], vec![3u8], vec![0xde, 0xad]]);
        assert_eq!(
            push_data_list(&script),
            Some(vec![vec![], vec![3], vec![0xde, 0xad]])
        );
        assert_eq!(push_data_list(&[OP_DUP]), None);
    }

    #[test]
    fn test_count_ops() {
        assert_eq!(count_ops(&[0x51, OP_DUP, 0x01, 0xac, OP_CHECKSIG]), 2);
    }

    proptest! {
        #[test]
        fn prop_compiled_push_decodes_minimally(data in prop::collection::vec(any::<u8>(), 0..600)) {
            let script = compile_push_data(&data);
            let ins = get_opcode(&script, 0).unwrap();
            prop_assert_eq!(ins.next_pc, script.len());
            prop_assert!(is_push_only(&script));
            prop_assert_eq!(push_data_list(&script).unwrap(), vec![data.clone()]);
            if let Some(pushed) = ins.data {
                prop_assert!(is_minimal_push(ins.opcode, pushed));
            }
        }
    }
}
