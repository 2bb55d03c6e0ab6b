//! Named stack implementation
//!
//! A `Stack<V>` is an ordered sequence whose top is the last element. Two of
//! them make up a program run: the operand stack and the scratch stack
//! ("stash") used to park values while something else is computed.
//!
//! Every operation below documents its stack effect in the usual notation,
//! e.g. `( a b -- b a )` for swap, where the rightmost item is the top.
//!
//! When tracing is enabled each mutation emits a `trace` event with the
//! stack name and resulting depth.

use crate::error::StackError;
use std::ops::Range;
use tracing::{trace, warn};

/// Conventional name of the operand stack
pub const STACK: &str = "stack";

/// Conventional name of the scratch stack
pub const STASH: &str = "stash";

/// A named, growable stack of values
#[derive(Debug, Clone)]
pub struct Stack<V> {
    name: &'static str,
    items: Vec<V>,
    trace: bool,
}

impl<V> Stack<V> {
    /// Create an empty stack
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            items: Vec::new(),
            trace: false,
        }
    }

    /// Create an empty stack, reserving room for `capacity` values
    ///
    /// The capacity is a hint: if it cannot be reserved the stack starts
    /// empty and grows on demand.
    pub fn with_capacity(name: &'static str, capacity: usize) -> Self {
        let mut items = Vec::new();
        if let Err(e) = items.try_reserve(capacity) {
            warn!(stack = name, capacity, error = %e, "could not reserve stack capacity");
        }
        Self {
            name,
            items,
            trace: false,
        }
    }

    /// Turn per-mutation tracing on or off
    pub fn set_trace(&mut self, enabled: bool) {
        self.trace = enabled;
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Values bottom-to-top
    pub fn as_slice(&self) -> &[V] {
        &self.items
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.traced("clear");
    }

    /// Push a value
    ///
    /// Stack effect: ( -- a )
    pub fn push(&mut self, value: V) {
        self.items.push(value);
        self.traced("push");
    }

    /// Pop the top value
    ///
    /// Stack effect: ( a -- )
    pub fn pop(&mut self) -> Result<V, StackError> {
        let value = self.items.pop().ok_or_else(|| self.underflow("pop", 1))?;
        self.traced("pop");
        Ok(value)
    }

    /// Pop the top `n` values, returned bottom-to-top
    ///
    /// Stack effect: ( x1 .. xn -- )
    pub fn pop_n(&mut self, n: usize) -> Result<Vec<V>, StackError> {
        self.require("pop_n", n)?;
        let values = self.items.split_off(self.items.len() - n);
        self.traced("pop_n");
        Ok(values)
    }

    /// Borrow the top value
    pub fn peek(&self) -> Option<&V> {
        self.items.last()
    }

    /// Borrow the value `depth` positions below the top (0 is the top)
    pub fn peek_at(&self, depth: usize) -> Option<&V> {
        self.items
            .len()
            .checked_sub(depth)?
            .checked_sub(1)
            .and_then(|index| self.items.get(index))
    }

    /// Replace the top `n` values with `values`
    pub fn replace_top<I>(&mut self, n: usize, values: I) -> Result<(), StackError>
    where
        I: IntoIterator<Item = V>,
    {
        self.require("replace_top", n)?;
        let start = self.items.len() - n;
        self.items.splice(start.., values);
        self.traced("replace_top");
        Ok(())
    }

    /// Replace an arbitrary bottom-relative range with `values`
    pub fn splice<I>(&mut self, range: Range<usize>, values: I) -> Result<(), StackError>
    where
        I: IntoIterator<Item = V>,
    {
        if range.start > range.end || range.end > self.items.len() {
            return Err(self.underflow("splice", range.end.max(range.start)));
        }
        self.items.splice(range, values);
        self.traced("splice");
        Ok(())
    }

    /// Stack effect: ( a -- )
    pub fn drop_top(&mut self) -> Result<(), StackError> {
        self.pop().map(|_| ())
    }

    /// Stack effect: ( a b -- b a )
    pub fn swap(&mut self) -> Result<(), StackError> {
        self.require("swap", 2)?;
        let len = self.items.len();
        self.items.swap(len - 1, len - 2);
        self.traced("swap");
        Ok(())
    }

    /// Stack effect: ( a b -- b )
    pub fn nip(&mut self) -> Result<(), StackError> {
        self.require("nip", 2)?;
        let len = self.items.len();
        self.items.remove(len - 2);
        self.traced("nip");
        Ok(())
    }

    /// Stack effect: ( a b c -- c )
    pub fn nip2(&mut self) -> Result<(), StackError> {
        self.require("nip2", 3)?;
        let len = self.items.len();
        self.items.drain(len - 3..len - 1);
        self.traced("nip2");
        Ok(())
    }

    /// Stack effect: ( a b c -- b c a )
    pub fn rot(&mut self) -> Result<(), StackError> {
        self.roll(3)
    }

    /// Move the `n`th value from the top to the top
    ///
    /// Stack effect: ( x1 x2 .. xn -- x2 .. xn x1 )
    ///
    /// `roll(0)` and `roll(1)` leave the stack unchanged.
    pub fn roll(&mut self, n: usize) -> Result<(), StackError> {
        if n <= 1 {
            return self.require("roll", n);
        }
        self.require("roll", n)?;
        let len = self.items.len();
        self.items[len - n..].rotate_left(1);
        self.traced("roll");
        Ok(())
    }

    fn require(&self, op: &'static str, needed: usize) -> Result<(), StackError> {
        if self.items.len() < needed {
            Err(self.underflow(op, needed))
        } else {
            Ok(())
        }
    }

    fn underflow(&self, op: &'static str, needed: usize) -> StackError {
        StackError::Underflow {
            stack: self.name,
            op,
            needed,
            available: self.items.len(),
        }
    }

    fn traced(&self, op: &'static str) {
        if self.trace {
            trace!(stack = self.name, op, depth = self.items.len(), "stack mutated");
        }
    }
}

impl<V: Clone> Stack<V> {
    /// Stack effect: ( a -- a a )
    pub fn dup(&mut self) -> Result<(), StackError> {
        let top = self.peek().cloned().ok_or_else(|| self.underflow("dup", 1))?;
        self.push(top);
        Ok(())
    }

    /// Stack effect: ( a b -- a b a )
    pub fn over(&mut self) -> Result<(), StackError> {
        let second = self
            .peek_at(1)
            .cloned()
            .ok_or_else(|| self.underflow("over", 2))?;
        self.push(second);
        Ok(())
    }

    /// Stack effect: ( a b -- a b a b )
    pub fn dup2(&mut self) -> Result<(), StackError> {
        self.require("dup2", 2)?;
        let len = self.items.len();
        self.items.extend_from_within(len - 2..);
        self.traced("dup2");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stack_of(values: &[i64]) -> Stack<i64> {
        let mut stack = Stack::new(STACK);
        for v in values {
            stack.push(*v);
        }
        stack
    }

    #[test]
    fn test_push_pop() {
        let mut stack = stack_of(&[1, 2]);
        assert_eq!(stack.pop(), Ok(2));
        assert_eq!(stack.pop(), Ok(1));
        assert!(stack.is_empty());
    }

    #[test]
    fn test_pop_empty_underflows() {
        let mut stash: Stack<i64> = Stack::new(STASH);
        let err = stash.pop().unwrap_err();
        assert_eq!(
            err,
            StackError::Underflow {
                stack: "stash",
                op: "pop",
                needed: 1,
                available: 0,
            }
        );
    }

    #[test]
    fn test_pop_n_returns_bottom_to_top() {
        let mut stack = stack_of(&[1, 2, 3, 4]);
        assert_eq!(stack.pop_n(3), Ok(vec![2, 3, 4]));
        assert_eq!(stack.as_slice(), &[1]);
        assert!(stack.pop_n(2).is_err());
        assert_eq!(stack.as_slice(), &[1]);
    }

    #[test]
    fn test_peek_at() {
        let stack = stack_of(&[1, 2, 3]);
        assert_eq!(stack.peek(), Some(&3));
        assert_eq!(stack.peek_at(2), Some(&1));
        assert_eq!(stack.peek_at(3), None);
        assert_eq!(stack.peek_at(usize::MAX), None);
    }

    #[test]
    fn test_with_capacity_is_a_hint() {
        let mut stack: Stack<i32> = Stack::with_capacity(STACK, usize::MAX);
        assert!(stack.is_empty());
        stack.push(7);
        assert_eq!(stack.as_slice(), &[7]);
    }

    #[test]
    fn test_replace_top() {
        let mut stack = stack_of(&[1, 2, 3]);
        stack.replace_top(2, [5]).unwrap();
        assert_eq!(stack.as_slice(), &[1, 5]);

        stack.replace_top(0, [7, 8]).unwrap();
        assert_eq!(stack.as_slice(), &[1, 5, 7, 8]);

        assert!(stack.replace_top(5, []).is_err());
    }

    #[test]
    fn test_splice() {
        let mut stack = stack_of(&[1, 2, 3, 4]);
        stack.splice(1..3, [9]).unwrap();
        assert_eq!(stack.as_slice(), &[1, 9, 4]);
        assert!(stack.splice(2..5, []).is_err());
    }

    #[test]
    fn test_shuffle_words() {
        let mut stack = stack_of(&[1, 2]);
        stack.swap().unwrap();
        assert_eq!(stack.as_slice(), &[2, 1]);

        stack.over().unwrap();
        assert_eq!(stack.as_slice(), &[2, 1, 2]);

        stack.nip().unwrap();
        assert_eq!(stack.as_slice(), &[2, 2]);

        stack.dup().unwrap();
        stack.push(5);
        stack.nip2().unwrap();
        assert_eq!(stack.as_slice(), &[2, 5]);

        stack.dup2().unwrap();
        assert_eq!(stack.as_slice(), &[2, 5, 2, 5]);

        stack.drop_top().unwrap();
        assert_eq!(stack.as_slice(), &[2, 5, 2]);
    }

    #[test]
    fn test_rot_and_roll() {
        let mut stack = stack_of(&[1, 2, 3]);
        stack.rot().unwrap();
        assert_eq!(stack.as_slice(), &[2, 3, 1]);

        let mut stack = stack_of(&[1, 2, 3, 4]);
        stack.roll(4).unwrap();
        assert_eq!(stack.as_slice(), &[2, 3, 4, 1]);

        stack.roll(1).unwrap();
        assert_eq!(stack.as_slice(), &[2, 3, 4, 1]);

        assert!(stack.roll(5).is_err());
    }

    #[test]
    fn test_shuffle_underflow_leaves_stack_untouched() {
        let mut stack = stack_of(&[1]);
        assert!(stack.swap().is_err());
        assert!(stack.over().is_err());
        assert!(stack.dup2().is_err());
        assert_eq!(stack.as_slice(), &[1]);
    }
}
