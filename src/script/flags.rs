//! Script verification flags

use crate::error::{ConsensusError, Result};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use std::ops::{BitAnd, BitOr, BitOrAssign, Not};

/// Bitset of verification rules, bit positions as in Bitcoin Core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScriptFlags(u32);

impl ScriptFlags {
    pub const NONE: Self = Self(0);
    /// Evaluate P2SH (BIP16) subscripts
    pub const P2SH: Self = Self(1 << 0);
    /// Enforce strict public key and sighash type encoding
    pub const STRICTENC: Self = Self(1 << 1);
    /// Enforce strict DER (BIP66)
    pub const DERSIG: Self = Self(1 << 2);
    /// Require low-S signatures
    pub const LOW_S: Self = Self(1 << 3);
    /// CHECKMULTISIG dummy must be empty (BIP147)
    pub const NULLDUMMY: Self = Self(1 << 4);
    /// scriptSig must be push-only
    pub const SIGPUSHONLY: Self = Self(1 << 5);
    /// Pushes and numbers must be minimally encoded
    pub const MINIMALDATA: Self = Self(1 << 6);
    pub const DISCOURAGE_UPGRADABLE_NOPS: Self = Self(1 << 7);
    /// Exactly one item left after evaluation
    pub const CLEANSTACK: Self = Self(1 << 8);
    pub const CHECKLOCKTIMEVERIFY: Self = Self(1 << 9);
    pub const CHECKSEQUENCEVERIFY: Self = Self(1 << 10);
    /// Evaluate segwit programs (BIP141)
    pub const WITNESS: Self = Self(1 << 11);
    pub const DISCOURAGE_UPGRADABLE_WITNESS_PROGRAM: Self = Self(1 << 12);
    /// IF/NOTIF argument must be empty or `0x01` in segwit scripts
    pub const MINIMALIF: Self = Self(1 << 13);
    /// Failed signature checks require empty signatures
    pub const NULLFAIL: Self = Self(1 << 14);
    /// Only compressed keys inside segwit scripts
    pub const WITNESS_PUBKEYTYPE: Self = Self(1 << 15);

    /// Flags applied when the caller does not choose any.
    pub const DEFAULT: Self = Self(Self::P2SH.0 | Self::WITNESS.0);

    /// Relay policy set.
    pub const STANDARD: Self = Self(
        Self::P2SH.0
            | Self::STRICTENC.0
            | Self::DERSIG.0
            | Self::LOW_S.0
            | Self::NULLDUMMY.0
            | Self::MINIMALDATA.0
            | Self::DISCOURAGE_UPGRADABLE_NOPS.0
            | Self::CLEANSTACK.0
            | Self::CHECKLOCKTIMEVERIFY.0
            | Self::CHECKSEQUENCEVERIFY.0
            | Self::WITNESS.0
            | Self::DISCOURAGE_UPGRADABLE_WITNESS_PROGRAM.0
            | Self::MINIMALIF.0
            | Self::NULLFAIL.0
            | Self::WITNESS_PUBKEYTYPE.0,
    );

    const NAMES: [(&'static str, ScriptFlags); 16] = [
        ("P2SH", Self::P2SH),
        ("STRICTENC", Self::STRICTENC),
        ("DERSIG", Self::DERSIG),
        ("LOW_S", Self::LOW_S),
        ("NULLDUMMY", Self::NULLDUMMY),
        ("SIGPUSHONLY", Self::SIGPUSHONLY),
        ("MINIMALDATA", Self::MINIMALDATA),
        ("DISCOURAGE_UPGRADABLE_NOPS", Self::DISCOURAGE_UPGRADABLE_NOPS),
        ("CLEANSTACK", Self::CLEANSTACK),
        ("CHECKLOCKTIMEVERIFY", Self::CHECKLOCKTIMEVERIFY),
        ("CHECKSEQUENCEVERIFY", Self::CHECKSEQUENCEVERIFY),
        ("WITNESS", Self::WITNESS),
        (
            "DISCOURAGE_UPGRADABLE_WITNESS_PROGRAM",
            Self::DISCOURAGE_UPGRADABLE_WITNESS_PROGRAM,
        ),
        ("MINIMALIF", Self::MINIMALIF),
        ("NULLFAIL", Self::NULLFAIL),
        ("WITNESS_PUBKEYTYPE", Self::WITNESS_PUBKEYTYPE),
    ];

    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    #[must_use]
    pub const fn with(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    #[must_use]
    pub const fn without(self, other: Self) -> Self {
        Self(self.0 & !other.0)
    }

    /// Parses flag names, the way Core's test vectors spell them.
    /// `NONE` and empty names are ignored.
    pub fn from_names<I, S>(names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut flags = Self::NONE;
        for name in names {
            let name = name.as_ref().trim();
            if name.is_empty() || name == "NONE" {
                continue;
            }
            let flag = Self::NAMES
                .iter()
                .find(|(n, _)| *n == name)
                .map(|(_, f)| *f)
                .ok_or_else(|| {
                    ConsensusError::Config(Cow::Owned(format!("unknown script flag {name}")))
                })?;
            flags |= flag;
        }
        Ok(flags)
    }

    /// Comma-separated form, e.g. `"P2SH,STRICTENC"`.
    pub fn parse_list(text: &str) -> Result<Self> {
        Self::from_names(text.split(','))
    }

    pub fn names(self) -> Vec<&'static str> {
        Self::NAMES
            .iter()
            .filter(|(_, f)| self.contains(*f))
            .map(|(n, _)| *n)
            .collect()
    }
}

impl BitOr for ScriptFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for ScriptFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for ScriptFlags {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

impl Not for ScriptFlags {
    type Output = Self;

    fn not(self) -> Self {
        Self(!self.0)
    }
}

impl fmt::Display for ScriptFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = self.names();
        if names.is_empty() {
            f.write_str("NONE")
        } else {
            f.write_str(&names.join(","))
        }
    }
}
