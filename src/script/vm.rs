//! Script execution engine
//!
//! `eval_script` is Bitcoin Core's `EvalScript`, generic over the stack item
//! type so the same control flow serves concrete verification (`Vec<u8>`)
//! and the solver's symbolic run. Everything a script can observe about its
//! transaction comes in through [`ScriptEnv`]; [`ExecutionHooks`] let a
//! caller watch each step or take over selected opcodes.

use crate::constants::*;
use crate::curve::Curve;
use crate::error::{ScriptError, ScriptErrorKind};
use crate::hashing::{double_sha256, hash160, ripemd160, sha1, sha256};
use crate::opcodes::*;
use crate::script::conditional::ConditionStack;
use crate::script::der::{check_pubkey_encoding, check_signature_encoding, parse_der_signature};
use crate::script::flags::ScriptFlags;
use crate::script::number::{bool_to_script_bytes, cast_to_bool, int_to_script_bytes, script_num};
use crate::script::stack::{StackItem, VmStack};
use crate::script::stream::{compile_push_bytes, find_and_delete, get_opcode, is_minimal_push, Instruction};
use crate::types::{Hash, SigVersion};
use tracing::trace;

/// Computes the digest a signature commits to, given the script code and
/// the signature's hash type.
pub type SighashFn<'a> = dyn Fn(&[u8], u32) -> Result<Hash, ScriptError> + 'a;

/// What a running script can see of the outside world.
pub struct ScriptEnv<'a> {
    pub flags: ScriptFlags,
    pub sig_version: SigVersion,
    pub curve: &'a dyn Curve,
    pub sighash: &'a SighashFn<'a>,
    /// STRICTENC accepts (and fork-id chains require) `SIGHASH_FORKID`
    pub uses_fork_id: bool,
    pub tx_version: u32,
    pub lock_time: u32,
    pub sequence: u32,
}

impl std::fmt::Debug for ScriptEnv<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptEnv")
            .field("flags", &self.flags)
            .field("sig_version", &self.sig_version)
            .field("uses_fork_id", &self.uses_fork_id)
            .field("tx_version", &self.tx_version)
            .field("lock_time", &self.lock_time)
            .field("sequence", &self.sequence)
            .finish()
    }
}

impl<'a> ScriptEnv<'a> {
    /// The same environment evaluating under other flags or script version.
    pub fn with(&self, flags: ScriptFlags, sig_version: SigVersion) -> ScriptEnv<'a> {
        ScriptEnv {
            flags,
            sig_version,
            curve: self.curve,
            sighash: self.sighash,
            uses_fork_id: self.uses_fork_id,
            tx_version: self.tx_version,
            lock_time: self.lock_time,
            sequence: self.sequence,
        }
    }
}

/// Observation and interception points of [`eval_script`].
pub trait ExecutionHooks<T: StackItem> {
    /// Called for every decoded opcode, executed or not.
    fn before_op(&mut self, _ins: &Instruction<'_>, _stack: &[T], _executing: bool) {}

    /// Offered every executed non-push opcode first. Returning `true`
    /// means the hook performed the opcode itself.
    fn intercept(
        &mut self,
        _opcode: u8,
        _stack: &mut VmStack<T>,
        _script_code: &[u8],
        _env: &ScriptEnv<'_>,
    ) -> Result<bool, ScriptError> {
        Ok(false)
    }
}

/// No hooks.
impl<T: StackItem> ExecutionHooks<T> for () {}

/// Hands every step to a closure.
pub struct Tracer<F>(pub F);

impl<T, F> ExecutionHooks<T> for Tracer<F>
where
    T: StackItem,
    F: FnMut(&Instruction<'_>, &[T], bool),
{
    fn before_op(&mut self, ins: &Instruction<'_>, stack: &[T], executing: bool) {
        (self.0)(ins, stack, executing)
    }
}

/// EvalScript: 𝕊 × Stack × Env → Stack ∪ {error}
///
/// For each opcode at pc, with exec = all open IF frames true:
/// 1. decode (truncated push → BAD_OPCODE); |push| ≤ 520
/// 2. opcodes above OP_16 count towards the 201 op limit
/// 3. disabled opcodes fail even when not executed
/// 4. exec ∧ push: enforce MINIMALDATA, push
/// 5. exec ∨ op ∈ [OP_IF, OP_ENDIF]: run the opcode
/// 6. |stack| + |altstack| ≤ 1000
///
/// Afterwards every IF must be closed.
pub fn eval_script<T, H>(
    stack: &mut VmStack<T>,
    script: &[u8],
    env: &ScriptEnv<'_>,
    hooks: &mut H,
) -> Result<(), ScriptError>
where
    T: StackItem,
    H: ExecutionHooks<T>,
{
    if script.len() > MAX_SCRIPT_LENGTH {
        return Err(ScriptErrorKind::ScriptSize.into());
    }
    let mut vm = Interpreter {
        script,
        env,
        stack,
        altstack: Vec::new(),
        conditions: ConditionStack::new(),
        op_count: 0,
        begin_code_hash: 0,
    };
    vm.run(hooks)
}

struct Interpreter<'s, 'e, T> {
    script: &'s [u8],
    env: &'s ScriptEnv<'e>,
    stack: &'s mut VmStack<T>,
    altstack: Vec<T>,
    conditions: ConditionStack,
    op_count: usize,
    begin_code_hash: usize,
}

impl<T: StackItem> Interpreter<'_, '_, T> {
    fn run<H: ExecutionHooks<T>>(&mut self, hooks: &mut H) -> Result<(), ScriptError> {
        let mut pc = 0;
        while pc < self.script.len() {
            let executing = self.conditions.all_if_true();
            let ins = get_opcode(self.script, pc)?;
            hooks.before_op(&ins, self.stack.items(), executing);
            trace!(
                pc = ins.pc,
                opcode = %opcode_name(ins.opcode),
                depth = self.stack.len(),
                executing,
                "step"
            );
            pc = ins.next_pc;
            self.step(&ins, executing, hooks)
                .map_err(|err| err.with_pc(ins.pc))?;
        }
        if !self.conditions.is_empty() {
            return Err(ScriptErrorKind::UnbalancedConditional.into());
        }
        Ok(())
    }

    fn step<H: ExecutionHooks<T>>(
        &mut self,
        ins: &Instruction<'_>,
        executing: bool,
        hooks: &mut H,
    ) -> Result<(), ScriptError> {
        let opcode = ins.opcode;
        if let Some(data) = ins.data {
            if data.len() > MAX_BLOB_LENGTH {
                return Err(ScriptErrorKind::PushSize.into());
            }
        }
        if opcode > OP_16 {
            self.op_count += 1;
            if self.op_count > MAX_OP_COUNT {
                return Err(ScriptErrorKind::OpCount.into());
            }
        }
        if is_disabled(opcode) {
            return Err(ScriptErrorKind::DisabledOpcode.into());
        }

        match ins.data {
            Some(data) if executing => {
                if self.env.flags.contains(ScriptFlags::MINIMALDATA) && !is_minimal_push(opcode, data) {
                    return Err(ScriptErrorKind::MinimalData.into());
                }
                self.stack.push_data(data.to_vec());
            }
            _ if executing || (OP_IF..=OP_ENDIF).contains(&opcode) => {
                let script_code = &self.script[self.begin_code_hash..];
                let handled = executing && hooks.intercept(opcode, self.stack, script_code, self.env)?;
                if !handled {
                    self.execute(ins, executing)?;
                }
            }
            _ => {}
        }

        if self.stack.len() + self.altstack.len() > MAX_STACK_SIZE {
            return Err(ScriptErrorKind::StackSize.into());
        }
        Ok(())
    }

    fn flag(&self, flag: ScriptFlags) -> bool {
        self.env.flags.contains(flag)
    }

    fn require_minimal(&self) -> bool {
        self.flag(ScriptFlags::MINIMALDATA)
    }

    fn need(&mut self, n: usize) -> Result<(), ScriptError> {
        self.stack.ensure(n)
    }

    fn pop_data(&mut self) -> Result<Vec<u8>, ScriptError> {
        let item = self.stack.pop()?;
        item.require_data().map(<[u8]>::to_vec)
    }

    fn peek_data(&mut self, depth: usize) -> Result<Vec<u8>, ScriptError> {
        self.stack.peek(depth)?.require_data().map(<[u8]>::to_vec)
    }

    fn peek_num(&mut self, depth: usize, max_len: usize) -> Result<i64, ScriptError> {
        let require_minimal = self.require_minimal();
        let item = self.stack.peek(depth)?;
        script_num(item.require_data()?, require_minimal, max_len)
    }

    fn push_num(&mut self, n: i64) {
        self.stack.push_data(int_to_script_bytes(n));
    }

    fn push_bool(&mut self, value: bool) {
        self.stack.push_data(bool_to_script_bytes(value));
    }

    fn discourage_nop(&self) -> Result<(), ScriptError> {
        if self.flag(ScriptFlags::DISCOURAGE_UPGRADABLE_NOPS) {
            return Err(ScriptErrorKind::DiscourageUpgradableNops.into());
        }
        Ok(())
    }

    fn execute(&mut self, ins: &Instruction<'_>, executing: bool) -> Result<(), ScriptError> {
        let opcode = ins.opcode;
        match opcode {
            OP_1NEGATE => self.push_num(-1),
            OP_1..=OP_16 => self.push_num(i64::from(opcode - OP_1 + 1)),

            OP_NOP => {}
            OP_CHECKLOCKTIMEVERIFY => {
                if self.flag(ScriptFlags::CHECKLOCKTIMEVERIFY) {
                    self.check_lock_time()?;
                } else {
                    self.discourage_nop()?;
                }
            }
            OP_CHECKSEQUENCEVERIFY => {
                if self.flag(ScriptFlags::CHECKSEQUENCEVERIFY) {
                    self.check_sequence()?;
                } else {
                    self.discourage_nop()?;
                }
            }
            OP_NOP1 | OP_NOP4..=OP_NOP10 => self.discourage_nop()?,

            OP_IF | OP_NOTIF => {
                let mut value = false;
                if executing {
                    self.need(1)
                        .map_err(|_| ScriptError::new(ScriptErrorKind::UnbalancedConditional))?;
                    let top = self.pop_data()?;
                    if self.env.sig_version == SigVersion::WitnessV0
                        && self.flag(ScriptFlags::MINIMALIF)
                        && (top.len() > 1 || (top.len() == 1 && top[0] != 1))
                    {
                        return Err(ScriptErrorKind::MinimalIf.into());
                    }
                    value = cast_to_bool(&top);
                    if opcode == OP_NOTIF {
                        value = !value;
                    }
                }
                self.conditions.push(value);
            }
            OP_ELSE => {
                if !self.conditions.toggle_top() {
                    return Err(ScriptErrorKind::UnbalancedConditional.into());
                }
            }
            OP_ENDIF => {
                if !self.conditions.pop() {
                    return Err(ScriptErrorKind::UnbalancedConditional.into());
                }
            }
            OP_VERIFY => {
                let top = self.pop_data()?;
                if !cast_to_bool(&top) {
                    return Err(ScriptErrorKind::Verify.into());
                }
            }
            OP_RETURN => return Err(ScriptErrorKind::OpReturn.into()),

            OP_TOALTSTACK => {
                let item = self.stack.pop()?;
                self.altstack.push(item);
            }
            OP_FROMALTSTACK => {
                let item = self
                    .altstack
                    .pop()
                    .ok_or_else(|| ScriptError::new(ScriptErrorKind::InvalidAltstackOperation))?;
                self.stack.push(item);
            }
            OP_2DROP => {
                self.need(2)?;
                self.stack.pop()?;
                self.stack.pop()?;
            }
            OP_2DUP => {
                self.need(2)?;
                let a = self.stack.peek(1)?.clone();
                let b = self.stack.peek(0)?.clone();
                self.stack.push(a);
                self.stack.push(b);
            }
            OP_3DUP => {
                self.need(3)?;
                let a = self.stack.peek(2)?.clone();
                let b = self.stack.peek(1)?.clone();
                let c = self.stack.peek(0)?.clone();
                self.stack.push(a);
                self.stack.push(b);
                self.stack.push(c);
            }
            OP_2OVER => {
                self.need(4)?;
                let a = self.stack.peek(3)?.clone();
                let b = self.stack.peek(2)?.clone();
                self.stack.push(a);
                self.stack.push(b);
            }
            OP_2ROT => {
                self.need(6)?;
                let a = self.stack.remove(5)?;
                let b = self.stack.remove(4)?;
                self.stack.push(a);
                self.stack.push(b);
            }
            OP_2SWAP => {
                self.need(4)?;
                self.stack.swap(3, 1)?;
                self.stack.swap(2, 0)?;
            }
            OP_IFDUP => {
                let top = self.peek_data(0)?;
                if cast_to_bool(&top) {
                    self.stack.push_data(top);
                }
            }
            OP_DEPTH => {
                let depth = self.stack.len() as i64;
                self.push_num(depth);
            }
            OP_DROP => {
                self.stack.pop()?;
            }
            OP_DUP => {
                let top = self.stack.peek(0)?.clone();
                self.stack.push(top);
            }
            OP_NIP => {
                self.stack.remove(1)?;
            }
            OP_OVER => {
                let item = self.stack.peek(1)?.clone();
                self.stack.push(item);
            }
            OP_PICK | OP_ROLL => {
                self.need(2)?;
                let n = self.peek_num(0, SCRIPT_NUM_MAX_LEN)?;
                self.stack.pop()?;
                if n < 0 {
                    return Err(ScriptErrorKind::InvalidStackOperation.into());
                }
                let n = n as usize;
                let item = if opcode == OP_PICK {
                    self.stack.peek(n)?.clone()
                } else {
                    self.stack.remove(n)?
                };
                self.stack.push(item);
            }
            OP_ROT => {
                self.need(3)?;
                self.stack.swap(2, 1)?;
                self.stack.swap(1, 0)?;
            }
            OP_SWAP => {
                self.need(2)?;
                self.stack.swap(1, 0)?;
            }
            OP_TUCK => {
                self.need(2)?;
                let top = self.stack.peek(0)?.clone();
                self.stack.insert(2, top)?;
            }

            OP_SIZE => {
                let len = self.peek_data(0)?.len() as i64;
                self.push_num(len);
            }

            OP_EQUAL | OP_EQUALVERIFY => {
                self.need(2)?;
                let b = self.pop_data()?;
                let a = self.pop_data()?;
                let equal = a == b;
                self.push_bool(equal);
                if opcode == OP_EQUALVERIFY {
                    if !equal {
                        return Err(ScriptErrorKind::EqualVerify.into());
                    }
                    self.stack.pop()?;
                }
            }

            OP_1ADD | OP_1SUB | OP_NEGATE | OP_ABS | OP_NOT | OP_0NOTEQUAL => {
                let n = self.peek_num(0, SCRIPT_NUM_MAX_LEN)?;
                self.stack.pop()?;
                let result = match opcode {
                    OP_1ADD => n + 1,
                    OP_1SUB => n - 1,
                    OP_NEGATE => -n,
                    OP_ABS => n.abs(),
                    OP_NOT => i64::from(n == 0),
                    _ => i64::from(n != 0),
                };
                self.push_num(result);
            }

            OP_ADD | OP_SUB | OP_BOOLAND | OP_BOOLOR | OP_NUMEQUAL | OP_NUMEQUALVERIFY
            | OP_NUMNOTEQUAL | OP_LESSTHAN | OP_GREATERTHAN | OP_LESSTHANOREQUAL
            | OP_GREATERTHANOREQUAL | OP_MIN | OP_MAX => {
                self.need(2)?;
                let a = self.peek_num(1, SCRIPT_NUM_MAX_LEN)?;
                let b = self.peek_num(0, SCRIPT_NUM_MAX_LEN)?;
                self.stack.pop()?;
                self.stack.pop()?;
                let result = match opcode {
                    OP_ADD => a + b,
                    OP_SUB => a - b,
                    OP_BOOLAND => i64::from(a != 0 && b != 0),
                    OP_BOOLOR => i64::from(a != 0 || b != 0),
                    OP_NUMEQUAL | OP_NUMEQUALVERIFY => i64::from(a == b),
                    OP_NUMNOTEQUAL => i64::from(a != b),
                    OP_LESSTHAN => i64::from(a < b),
                    OP_GREATERTHAN => i64::from(a > b),
                    OP_LESSTHANOREQUAL => i64::from(a <= b),
                    OP_GREATERTHANOREQUAL => i64::from(a >= b),
                    OP_MIN => a.min(b),
                    _ => a.max(b),
                };
                self.push_num(result);
                if opcode == OP_NUMEQUALVERIFY {
                    if result == 0 {
                        return Err(ScriptErrorKind::NumEqualVerify.into());
                    }
                    self.stack.pop()?;
                }
            }
            OP_WITHIN => {
                self.need(3)?;
                let x = self.peek_num(2, SCRIPT_NUM_MAX_LEN)?;
                let min = self.peek_num(1, SCRIPT_NUM_MAX_LEN)?;
                let max = self.peek_num(0, SCRIPT_NUM_MAX_LEN)?;
                for _ in 0..3 {
                    self.stack.pop()?;
                }
                self.push_bool(min <= x && x < max);
            }

            OP_RIPEMD160 | OP_SHA1 | OP_SHA256 | OP_HASH160 | OP_HASH256 => {
                let data = self.pop_data()?;
                let digest = match opcode {
                    OP_RIPEMD160 => ripemd160(&data).to_vec(),
                    OP_SHA1 => sha1(&data).to_vec(),
                    OP_SHA256 => sha256(&data).to_vec(),
                    OP_HASH160 => hash160(&data).to_vec(),
                    _ => double_sha256(&data).to_vec(),
                };
                self.stack.push_data(digest);
            }
            OP_CODESEPARATOR => self.begin_code_hash = ins.next_pc,
            OP_CHECKSIG | OP_CHECKSIGVERIFY => self.op_checksig(opcode == OP_CHECKSIGVERIFY)?,
            OP_CHECKMULTISIG | OP_CHECKMULTISIGVERIFY => {
                self.op_checkmultisig(opcode == OP_CHECKMULTISIGVERIFY)?
            }

            _ => return Err(ScriptErrorKind::BadOpcode.into()),
        }
        Ok(())
    }

    /// Script code for signature checks, with `sigs` removed in legacy scripts.
    fn script_code(&self, sigs: &[Vec<u8>]) -> Vec<u8> {
        let mut script_code = self.script[self.begin_code_hash..].to_vec();
        if self.env.sig_version == SigVersion::Base {
            for sig in sigs {
                script_code = find_and_delete(&script_code, &compile_push_bytes(sig)).0;
            }
        }
        script_code
    }

    fn check_encodings(&self, sig: &[u8], pubkey: &[u8]) -> Result<(), ScriptError> {
        let order = self.env.curve.order();
        check_signature_encoding(sig, self.env.flags, &order, self.env.uses_fork_id)?;
        check_pubkey_encoding(pubkey, self.env.flags, self.env.sig_version)
    }

    /// ECDSA check of one signature blob. Malformed keys or signatures are
    /// simply invalid; only the sighash callback can raise an error.
    fn check_sig(&self, sig: &[u8], pubkey: &[u8], script_code: &[u8]) -> Result<bool, ScriptError> {
        let Some((&hash_type, der)) = sig.split_last() else {
            return Ok(false);
        };
        let Some(point) = self.env.curve.parse_sec(pubkey) else {
            return Ok(false);
        };
        let Some(signature) = parse_der_signature(der) else {
            return Ok(false);
        };
        let digest = (self.env.sighash)(script_code, u32::from(hash_type))?;
        let signature = signature.normalize_s(&self.env.curve.order());
        Ok(self.env.curve.verify(&point, &digest, &signature))
    }

    fn op_checksig(&mut self, verify: bool) -> Result<(), ScriptError> {
        self.need(2)?;
        let sig = self.peek_data(1)?;
        let pubkey = self.peek_data(0)?;
        let script_code = self.script_code(std::slice::from_ref(&sig));
        self.check_encodings(&sig, &pubkey)?;
        let success = self.check_sig(&sig, &pubkey, &script_code)?;
        if !success && self.flag(ScriptFlags::NULLFAIL) && !sig.is_empty() {
            return Err(ScriptErrorKind::NullFail.into());
        }
        self.stack.pop()?;
        self.stack.pop()?;
        self.push_bool(success);
        if verify {
            if !success {
                return Err(ScriptErrorKind::CheckSigVerify.into());
            }
            self.stack.pop()?;
        }
        Ok(())
    }

    /// Keys are matched top-down against signatures top-down; a key that
    /// fails is skipped, a signature that finds no key fails the check.
    fn op_checkmultisig(&mut self, verify: bool) -> Result<(), ScriptError> {
        // depth of the key count
        let mut i = 0;
        self.need(i + 1)?;
        let n_keys = self.peek_num(i, SCRIPT_NUM_MAX_LEN)?;
        if !(0..=MAX_PUBKEYS_PER_MULTISIG).contains(&n_keys) {
            return Err(ScriptErrorKind::PubkeyCount.into());
        }
        let mut n_keys = n_keys as usize;
        self.op_count += n_keys;
        if self.op_count > MAX_OP_COUNT {
            return Err(ScriptErrorKind::OpCount.into());
        }
        i += 1;
        let mut key_depth = i;
        // keys still to pop before the signature region when cleaning up
        let mut keys_region = n_keys + 2;
        i += n_keys;
        self.need(i + 1)?;
        let n_sigs = self.peek_num(i, SCRIPT_NUM_MAX_LEN)?;
        if n_sigs < 0 || n_sigs as usize > n_keys {
            return Err(ScriptErrorKind::SigCount.into());
        }
        let mut n_sigs = n_sigs as usize;
        i += 1;
        let mut sig_depth = i;
        i += n_sigs;
        self.need(i + 1)?;

        let sigs = (0..n_sigs)
            .map(|k| self.peek_data(sig_depth + k))
            .collect::<Result<Vec<_>, _>>()?;
        let script_code = self.script_code(&sigs);

        let mut success = true;
        while success && n_sigs > 0 {
            let sig = self.peek_data(sig_depth)?;
            let pubkey = self.peek_data(key_depth)?;
            self.check_encodings(&sig, &pubkey)?;
            if self.check_sig(&sig, &pubkey, &script_code)? {
                sig_depth += 1;
                n_sigs -= 1;
            }
            key_depth += 1;
            n_keys -= 1;
            if n_sigs > n_keys {
                success = false;
            }
        }

        // n, keys, m and the signatures
        for _ in 0..i {
            if !success && self.flag(ScriptFlags::NULLFAIL) && keys_region == 0 && !self.peek_data(0)?.is_empty() {
                return Err(ScriptErrorKind::NullFail.into());
            }
            keys_region = keys_region.saturating_sub(1);
            self.stack.pop()?;
        }

        self.need(1)?;
        if self.flag(ScriptFlags::NULLDUMMY) && !self.peek_data(0)?.is_empty() {
            return Err(ScriptErrorKind::SigNullDummy.into());
        }
        self.stack.pop()?;

        self.push_bool(success);
        if verify {
            if !success {
                return Err(ScriptErrorKind::CheckMultiSigVerify.into());
            }
            self.stack.pop()?;
        }
        Ok(())
    }

    /// BIP-65: the top item is a lock time the transaction must have reached.
    fn check_lock_time(&mut self) -> Result<(), ScriptError> {
        let lock_time = self.peek_num(0, SCRIPT_NUM_LOCKTIME_LEN)?;
        if lock_time < 0 {
            return Err(ScriptErrorKind::NegativeLocktime.into());
        }
        let tx_lock_time = i64::from(self.env.lock_time);
        let threshold = i64::from(LOCKTIME_THRESHOLD);
        let same_kind = (tx_lock_time < threshold) == (lock_time < threshold);
        if !same_kind || lock_time > tx_lock_time || self.env.sequence == SEQUENCE_FINAL {
            return Err(ScriptErrorKind::UnsatisfiedLocktime.into());
        }
        Ok(())
    }

    /// BIP-112: the top item is a relative lock the input's sequence must meet.
    fn check_sequence(&mut self) -> Result<(), ScriptError> {
        let sequence = self.peek_num(0, SCRIPT_NUM_LOCKTIME_LEN)?;
        if sequence < 0 {
            return Err(ScriptErrorKind::NegativeLocktime.into());
        }
        if sequence & i64::from(SEQUENCE_LOCKTIME_DISABLE_FLAG) != 0 {
            return Ok(());
        }
        let tx_sequence = i64::from(self.env.sequence);
        let mask = i64::from(SEQUENCE_LOCKTIME_TYPE_FLAG | SEQUENCE_LOCKTIME_MASK);
        let type_flag = i64::from(SEQUENCE_LOCKTIME_TYPE_FLAG);
        let tx_masked = tx_sequence & mask;
        let masked = sequence & mask;
        let satisfied = self.env.tx_version >= 2
            && tx_sequence & i64::from(SEQUENCE_LOCKTIME_DISABLE_FLAG) == 0
            && (tx_masked < type_flag) == (masked < type_flag)
            && masked <= tx_masked;
        if !satisfied {
            return Err(ScriptErrorKind::UnsatisfiedLocktime.into());
        }
        Ok(())
    }
}
