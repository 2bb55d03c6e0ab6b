//! Concat Core: the stack substrate shared by every stack-based program run
//!
//! This crate provides the language-agnostic primitives that the runtime
//! builds on. It knows nothing about effects or continuations; it only knows
//! how to hold values in a named, ordered stack and shuffle them around.
//!
//! Key design principles:
//! - Stack: a named, growable sequence where the top is the last element
//! - Every operation documents its exact stack effect
//! - Underflow is always reported to the caller, never silently recovered
//!
//! # Modules
//!
//! - `error`: `StackError` (underflow reporting)
//! - `stack`: `Stack<V>` and the shuffle words (dup, swap, over, rot, roll, ...)

pub mod error;
pub mod stack;

pub use error::StackError;
pub use stack::{STASH, STACK, Stack};
