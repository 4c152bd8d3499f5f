//! VM stack, generic over the item type
//!
//! Concrete evaluation uses `Vec<u8>` items. The solver evaluates with
//! symbolic items and a stack that never underflows: popping past the
//! bottom conjures a fresh atom for the next unfilled scriptSig or witness
//! slot, so the script itself tells the solver what it expects to find.

use crate::error::{ScriptError, ScriptErrorKind};
use std::fmt;

/// A slot of the solution the solver still has to fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Slot {
    /// `x_i`: the i-th item of the scriptSig, counted from the top
    ScriptSig(usize),
    /// `w_i`: the i-th item of the witness, counted from the top
    Witness(usize),
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Slot::ScriptSig(i) => write!(f, "x_{i}"),
            Slot::Witness(i) => write!(f, "w_{i}"),
        }
    }
}

/// Which family of slots an underflowing stack draws atoms from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotFamily {
    ScriptSig,
    Witness,
}

impl SlotFamily {
    fn slot(self, index: usize) -> Slot {
        match self {
            SlotFamily::ScriptSig => Slot::ScriptSig(index),
            SlotFamily::Witness => Slot::Witness(index),
        }
    }
}

/// Something the VM can keep on its stack.
pub trait StackItem: Clone + fmt::Debug + PartialEq {
    fn from_data(data: Vec<u8>) -> Self;

    /// Concrete bytes, `None` for symbolic values.
    fn data(&self) -> Option<&[u8]>;

    /// A placeholder for `slot`; only symbolic item types have one.
    fn atom(slot: Slot) -> Option<Self>;

    /// Concrete bytes, or `UNKNOWN_ERROR` for a symbolic value.
    fn require_data(&self) -> Result<&[u8], ScriptError> {
        self.data()
            .ok_or_else(|| ScriptError::new(ScriptErrorKind::UnknownError))
    }
}

impl StackItem for Vec<u8> {
    fn from_data(data: Vec<u8>) -> Self {
        data
    }

    fn data(&self) -> Option<&[u8]> {
        Some(self)
    }

    fn atom(_slot: Slot) -> Option<Self> {
        None
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VmStack<T> {
    items: Vec<T>,
    fill: Option<(SlotFamily, usize)>,
}

impl<T: StackItem> Default for VmStack<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: StackItem> VmStack<T> {
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            fill: None,
        }
    }

    pub fn from_items(items: Vec<T>) -> Self {
        Self { items, fill: None }
    }

    /// A stack that fills underflows with atoms of `family`, numbering them
    /// from `first_index`.
    pub fn with_fill(items: Vec<T>, family: SlotFamily, first_index: usize) -> Self {
        Self {
            items,
            fill: Some((family, first_index)),
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn into_items(self) -> Vec<T> {
        self.items
    }

    /// Index of the next atom the stack would create.
    pub fn next_atom_index(&self) -> Option<usize> {
        self.fill.map(|(_, next)| next)
    }

    /// Makes sure at least `n` items are present, conjuring atoms at the
    /// bottom if this stack fills.
    pub fn ensure(&mut self, n: usize) -> Result<(), ScriptError> {
        while self.items.len() < n {
            let atom = match &mut self.fill {
                Some((family, next)) => {
                    let atom = T::atom(family.slot(*next));
                    *next += 1;
                    atom
                }
                None => None,
            };
            match atom {
                Some(atom) => self.items.insert(0, atom),
                None => return Err(ScriptErrorKind::InvalidStackOperation.into()),
            }
        }
        Ok(())
    }

    pub fn push(&mut self, item: T) {
        self.items.push(item);
    }

    pub fn push_data(&mut self, data: Vec<u8>) {
        self.items.push(T::from_data(data));
    }

    pub fn pop(&mut self) -> Result<T, ScriptError> {
        self.ensure(1)?;
        self.items
            .pop()
            .ok_or_else(|| ScriptErrorKind::InvalidStackOperation.into())
    }

    /// Item `depth` positions below the top (0 is the top).
    pub fn peek(&mut self, depth: usize) -> Result<&T, ScriptError> {
        self.ensure(depth + 1)?;
        let idx = self.items.len() - 1 - depth;
        Ok(&self.items[idx])
    }

    /// Removes the item `depth` positions below the top.
    pub fn remove(&mut self, depth: usize) -> Result<T, ScriptError> {
        self.ensure(depth + 1)?;
        let idx = self.items.len() - 1 - depth;
        Ok(self.items.remove(idx))
    }

    /// Swaps the items `a` and `b` positions below the top.
    pub fn swap(&mut self, a: usize, b: usize) -> Result<(), ScriptError> {
        self.ensure(a.max(b) + 1)?;
        let len = self.items.len();
        self.items.swap(len - 1 - a, len - 1 - b);
        Ok(())
    }

    /// Inserts `item` so that it ends up `depth` positions below the top.
    pub fn insert(&mut self, depth: usize, item: T) -> Result<(), ScriptError> {
        self.ensure(depth)?;
        let idx = self.items.len() - depth;
        self.items.insert(idx, item);
        Ok(())
    }

    pub fn last(&self) -> Option<&T> {
        self.items.last()
    }
}
