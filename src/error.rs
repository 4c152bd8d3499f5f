//! Error types for transaction parsing, script evaluation and signing

use std::borrow::Cow;
use std::fmt;
use thiserror::Error;

/// Failure kinds raised by the script VM and the solution checker.
///
/// Names render exactly as Bitcoin Core spells them (`EVAL_FALSE`,
/// `SIG_DER`, ...) so conformance vectors can be compared textually.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScriptErrorKind {
    UnknownError,
    EvalFalse,
    OpReturn,
    ScriptSize,
    PushSize,
    OpCount,
    StackSize,
    SigCount,
    PubkeyCount,
    Verify,
    EqualVerify,
    CheckMultiSigVerify,
    CheckSigVerify,
    NumEqualVerify,
    BadOpcode,
    DisabledOpcode,
    InvalidStackOperation,
    InvalidAltstackOperation,
    UnbalancedConditional,
    NegativeLocktime,
    UnsatisfiedLocktime,
    SigHashType,
    SigDer,
    MinimalData,
    SigPushOnly,
    SigHighS,
    SigNullDummy,
    PubkeyType,
    CleanStack,
    MinimalIf,
    NullFail,
    DiscourageUpgradableNops,
    DiscourageUpgradableWitnessProgram,
    WitnessProgramWrongLength,
    WitnessProgramWitnessEmpty,
    WitnessProgramMismatch,
    WitnessMalleated,
    WitnessMalleatedP2sh,
    WitnessUnexpected,
    WitnessPubkeyType,
}

const KIND_NAMES: &[(ScriptErrorKind, &str)] = &[
    (ScriptErrorKind::UnknownError, "UNKNOWN_ERROR"),
    (ScriptErrorKind::EvalFalse, "EVAL_FALSE"),
    (ScriptErrorKind::OpReturn, "OP_RETURN"),
    (ScriptErrorKind::ScriptSize, "SCRIPT_SIZE"),
    (ScriptErrorKind::PushSize, "PUSH_SIZE"),
    (ScriptErrorKind::OpCount, "OP_COUNT"),
    (ScriptErrorKind::StackSize, "STACK_SIZE"),
    (ScriptErrorKind::SigCount, "SIG_COUNT"),
    (ScriptErrorKind::PubkeyCount, "PUBKEY_COUNT"),
    (ScriptErrorKind::Verify, "VERIFY"),
    (ScriptErrorKind::EqualVerify, "EQUALVERIFY"),
    (ScriptErrorKind::CheckMultiSigVerify, "CHECKMULTISIGVERIFY"),
    (ScriptErrorKind::CheckSigVerify, "CHECKSIGVERIFY"),
    (ScriptErrorKind::NumEqualVerify, "NUMEQUALVERIFY"),
    (ScriptErrorKind::BadOpcode, "BAD_OPCODE"),
    (ScriptErrorKind::DisabledOpcode, "DISABLED_OPCODE"),
    (ScriptErrorKind::InvalidStackOperation, "INVALID_STACK_OPERATION"),
    (ScriptErrorKind::InvalidAltstackOperation, "INVALID_ALTSTACK_OPERATION"),
    (ScriptErrorKind::UnbalancedConditional, "UNBALANCED_CONDITIONAL"),
    (ScriptErrorKind::NegativeLocktime, "NEGATIVE_LOCKTIME"),
    (ScriptErrorKind::UnsatisfiedLocktime, "UNSATISFIED_LOCKTIME"),
    (ScriptErrorKind::SigHashType, "SIG_HASHTYPE"),
    (ScriptErrorKind::SigDer, "SIG_DER"),
    (ScriptErrorKind::MinimalData, "MINIMALDATA"),
    (ScriptErrorKind::SigPushOnly, "SIG_PUSHONLY"),
    (ScriptErrorKind::SigHighS, "SIG_HIGH_S"),
    (ScriptErrorKind::SigNullDummy, "SIG_NULLDUMMY"),
    (ScriptErrorKind::PubkeyType, "PUBKEYTYPE"),
    (ScriptErrorKind::CleanStack, "CLEANSTACK"),
    (ScriptErrorKind::MinimalIf, "MINIMALIF"),
    (ScriptErrorKind::NullFail, "NULLFAIL"),
    (ScriptErrorKind::DiscourageUpgradableNops, "DISCOURAGE_UPGRADABLE_NOPS"),
    (
        ScriptErrorKind::DiscourageUpgradableWitnessProgram,
        "DISCOURAGE_UPGRADABLE_WITNESS_PROGRAM",
    ),
    (ScriptErrorKind::WitnessProgramWrongLength, "WITNESS_PROGRAM_WRONG_LENGTH"),
    (ScriptErrorKind::WitnessProgramWitnessEmpty, "WITNESS_PROGRAM_WITNESS_EMPTY"),
    (ScriptErrorKind::WitnessProgramMismatch, "WITNESS_PROGRAM_MISMATCH"),
    (ScriptErrorKind::WitnessMalleated, "WITNESS_MALLEATED"),
    (ScriptErrorKind::WitnessMalleatedP2sh, "WITNESS_MALLEATED_P2SH"),
    (ScriptErrorKind::WitnessUnexpected, "WITNESS_UNEXPECTED"),
    (ScriptErrorKind::WitnessPubkeyType, "WITNESS_PUBKEYTYPE"),
];

impl ScriptErrorKind {
    pub fn name(self) -> &'static str {
        KIND_NAMES
            .iter()
            .find(|(kind, _)| *kind == self)
            .map(|(_, name)| *name)
            .unwrap_or("UNKNOWN_ERROR")
    }

    /// Looks a kind up by its Bitcoin Core name.
    pub fn from_name(name: &str) -> Option<Self> {
        KIND_NAMES
            .iter()
            .find(|(_, n)| *n == name)
            .map(|(kind, _)| *kind)
    }
}

impl fmt::Display for ScriptErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A VM or checker failure, optionally tagged with the program counter
/// of the opcode that raised it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptError {
    pub kind: ScriptErrorKind,
    pub pc: Option<usize>,
}

impl ScriptError {
    pub fn new(kind: ScriptErrorKind) -> Self {
        Self { kind, pc: None }
    }

    pub fn at(kind: ScriptErrorKind, pc: usize) -> Self {
        Self { kind, pc: Some(pc) }
    }

    /// Attaches a program counter if none was recorded yet.
    pub fn with_pc(mut self, pc: usize) -> Self {
        if self.pc.is_none() {
            self.pc = Some(pc);
        }
        self
    }
}

impl From<ScriptErrorKind> for ScriptError {
    fn from(kind: ScriptErrorKind) -> Self {
        ScriptError::new(kind)
    }
}

impl fmt::Display for ScriptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.pc {
            Some(pc) => write!(f, "script error {} at pc {}", self.kind, pc),
            None => write!(f, "script error {}", self.kind),
        }
    }
}

impl std::error::Error for ScriptError {}

/// Raised by the solver when it cannot produce a solution for an input.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SolvingError {
    #[error("input index {0} out of range")]
    InputIndex(usize),

    #[error("no unspent attached for input {0}")]
    MissingUnspent(usize),

    #[error("unknown redeem script for hash {0}")]
    UnknownScript(String),

    #[error("unsolved stack slots: {0}")]
    Unsolved(String),
}

/// Raised by the transaction-level sanity check.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("validation failure: {message}")]
pub struct ValidationFailureError {
    pub message: Cow<'static, str>,
}

impl ValidationFailureError {
    pub fn new(message: impl Into<Cow<'static, str>>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConsensusError {
    #[error("Serialization error: {0}")]
    Serialization(Cow<'static, str>),

    #[error("Invalid hex: {0}")]
    Hex(#[from] hex::FromHexError),

    #[error(transparent)]
    Script(#[from] ScriptError),

    #[error(transparent)]
    Solving(#[from] SolvingError),

    #[error(transparent)]
    Validation(#[from] ValidationFailureError),

    #[error("Invalid input index: {0}")]
    InvalidInputIndex(usize),

    #[error("Invalid signature: {0}")]
    InvalidSignature(Cow<'static, str>),

    #[error("Invalid key: {0}")]
    InvalidKey(Cow<'static, str>),

    #[error("Configuration error: {0}")]
    Config(Cow<'static, str>),
}

pub type Result<T> = std::result::Result<T, ConsensusError>;
