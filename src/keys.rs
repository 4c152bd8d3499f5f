//! Key and script lookups consulted by the solver

use crate::curve::{Curve, PublicPoint};
use crate::error::Result;
use crate::hashing::{hash160, sha256};
use num_bigint::BigUint;
use std::collections::HashMap;
use std::fmt;

/// A private key together with the public point and the SEC form its
/// hash160 was registered under.
#[derive(Clone, PartialEq, Eq)]
pub struct KeyRecord {
    pub secret_exponent: BigUint,
    pub public_point: PublicPoint,
    pub is_compressed: bool,
}

impl KeyRecord {
    pub fn sec(&self) -> Vec<u8> {
        self.public_point.to_sec(self.is_compressed)
    }
}

impl fmt::Debug for KeyRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // never print the secret
        f.debug_struct("KeyRecord")
            .field("public_point", &self.public_point)
            .field("is_compressed", &self.is_compressed)
            .finish()
    }
}

/// hash160(SEC) → key.
pub trait Hash160Db {
    fn get(&self, hash160: &[u8]) -> Option<&KeyRecord>;
}

/// hash160 or SHA-256 of a script → script.
pub trait ScriptDb {
    fn get(&self, hash: &[u8]) -> Option<&[u8]>;
}

/// In-memory [`Hash160Db`].
#[derive(Debug, Default, Clone)]
pub struct KeyStore {
    records: HashMap<[u8; 20], KeyRecord>,
}

impl KeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `secret` under the hash160 of both its compressed and
    /// uncompressed SEC encodings.
    pub fn add_secret_exponent(&mut self, curve: &dyn Curve, secret: &BigUint) -> Result<()> {
        let public_point = curve.derive_public_point(secret)?;
        for is_compressed in [true, false] {
            let record = KeyRecord {
                secret_exponent: secret.clone(),
                public_point: public_point.clone(),
                is_compressed,
            };
            self.records.insert(hash160(&record.sec()), record);
        }
        Ok(())
    }

    pub fn from_secret_exponents<'s, I>(curve: &dyn Curve, secrets: I) -> Result<Self>
    where
        I: IntoIterator<Item = &'s BigUint>,
    {
        let mut store = Self::new();
        for secret in secrets {
            store.add_secret_exponent(curve, secret)?;
        }
        Ok(store)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl Hash160Db for KeyStore {
    fn get(&self, hash160: &[u8]) -> Option<&KeyRecord> {
        let key: [u8; 20] = hash160.try_into().ok()?;
        self.records.get(&key)
    }
}

/// In-memory [`ScriptDb`] holding P2SH redeem scripts and P2WSH witness
/// scripts.
#[derive(Debug, Default, Clone)]
pub struct ScriptStore {
    scripts: HashMap<Vec<u8>, Vec<u8>>,
}

impl ScriptStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `script` findable by its hash160 and by its SHA-256.
    pub fn add(&mut self, script: Vec<u8>) {
        self.scripts.insert(hash160(&script).to_vec(), script.clone());
        self.scripts.insert(sha256(&script).to_vec(), script);
    }

    pub fn from_scripts<I: IntoIterator<Item = Vec<u8>>>(scripts: I) -> Self {
        let mut store = Self::new();
        for script in scripts {
            store.add(script);
        }
        store
    }
}

impl ScriptDb for ScriptStore {
    fn get(&self, hash: &[u8]) -> Option<&[u8]> {
        self.scripts.get(hash).map(Vec::as_slice)
    }
}

/// The empty lookup.
impl Hash160Db for () {
    fn get(&self, _hash160: &[u8]) -> Option<&KeyRecord> {
        None
    }
}

impl ScriptDb for () {
    fn get(&self, _hash: &[u8]) -> Option<&[u8]> {
        None
    }
}
