//! Bitcoin Script: encoding, numbers, signatures, the VM and the checker

pub mod checker;
pub mod conditional;
pub mod der;
pub mod flags;
pub mod number;
pub mod stack;
pub mod stream;
pub mod tools;
pub mod vm;

pub use checker::{check_witness_program, SolutionChecker, TxContext};
pub use flags::ScriptFlags;
pub use stack::{Slot, SlotFamily, StackItem, VmStack};
pub use tools::{compile, disassemble};
pub use vm::{eval_script, ExecutionHooks, ScriptEnv, Tracer};
