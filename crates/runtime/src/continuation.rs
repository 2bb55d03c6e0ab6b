//! One-shot continuations over suspendable computations
//!
//! [`as_continuation`] turns a suspendable computation into a continuation
//! that operates on the machine's stacks:
//!
//! Stack effect of invoking it: ( value -- produced next )
//!
//! It pops the resume value, resumes the computation, and pushes what the
//! computation produced followed by either a fresh continuation for the rest
//! or `Nil` when the computation has finished.
//!
//! ## One-shot enforcement
//!
//! [`OneShot::invoke`] consumes the handle. Values can still be duplicated on
//! the stack though, and every copy shares the same slot, so the slot is
//! emptied on first use and a second invocation through any copy fails with
//! `ReentrantContinuation`.

use crate::error::RuntimeError;
use crate::machine::Machine;
use crate::suspend::{Resumed, Suspendable};
use crate::value::Value;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use tracing::debug;

type Slot = Rc<RefCell<Option<Box<dyn Suspendable>>>>;

/// A resumable "rest of the computation", usable exactly once
#[derive(Clone)]
pub struct OneShot {
    id: u64,
    slot: Slot,
}

/// Capture a suspendable computation as a one-shot continuation
pub fn as_continuation(machine: &mut Machine, computation: Box<dyn Suspendable>) -> OneShot {
    let id = machine.fresh_continuation_id();
    debug!(id, "captured one-shot continuation");
    OneShot {
        id,
        slot: Rc::new(RefCell::new(Some(computation))),
    }
}

impl OneShot {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Whether this continuation (or a copy of it) was already invoked
    pub fn is_spent(&self) -> bool {
        self.slot.borrow().is_none()
    }

    /// Resume the captured computation
    ///
    /// Stack effect: ( value -- produced next )
    pub fn invoke(self, machine: &mut Machine) -> Result<(), RuntimeError> {
        let computation = self
            .slot
            .borrow_mut()
            .take()
            .ok_or(RuntimeError::ReentrantContinuation { id: self.id })?;
        let input = match machine.pop() {
            Ok(input) => input,
            Err(e) => {
                // Nothing ran, so the continuation is still usable
                *self.slot.borrow_mut() = Some(computation);
                return Err(e);
            }
        };

        let (produced, next) = match computation.resume(machine, input)? {
            Resumed::Yielded(value, rest) => {
                let rest = as_continuation(machine, rest);
                (value, Value::Continuation(rest))
            }
            Resumed::Done(value) => {
                debug!(id = self.id, "suspendable computation finished");
                (value, Value::Nil)
            }
        };
        machine.push(produced);
        machine.push(next);
        Ok(())
    }
}

impl fmt::Debug for OneShot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OneShot")
            .field("id", &self.id)
            .field("spent", &self.is_spent())
            .finish()
    }
}

/// Invoke the continuation on top of the stack
///
/// Stack effect: ( value continuation -- produced next )
pub fn resume_continuation(machine: &mut Machine) -> Result<(), RuntimeError> {
    let continuation = machine.pop()?.into_continuation("resume_continuation")?;
    continuation.invoke(machine)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::suspend::Steps;

    fn two_step(machine: &mut Machine) -> OneShot {
        let steps = Steps::new()
            .then(|_, _| Ok(Value::Int(1)))
            .returning(|_, input| Ok(input));
        as_continuation(machine, Box::new(steps))
    }

    #[test]
    fn test_invoke_pushes_value_and_next() {
        let mut m = Machine::new();
        let k = two_step(&mut m);
        m.push(Value::Nil);
        k.invoke(&mut m).unwrap();

        let next = m.pop().unwrap().into_continuation("test").unwrap();
        assert_eq!(m.pop().unwrap(), Value::Int(1));

        m.push(Value::from("final"));
        next.invoke(&mut m).unwrap();
        assert_eq!(m.stack.as_slice(), &[Value::from("final"), Value::Nil]);
    }

    #[test]
    fn test_second_invocation_is_rejected() {
        let mut m = Machine::new();
        let k = two_step(&mut m);
        let copy = k.clone();
        m.push(Value::Nil);
        k.invoke(&mut m).unwrap();
        assert!(copy.is_spent());

        m.push(Value::Nil);
        let err = copy.invoke(&mut m).unwrap_err();
        assert!(matches!(err, RuntimeError::ReentrantContinuation { .. }));
    }

    #[test]
    fn test_underflow_does_not_spend() {
        let mut m = Machine::new();
        let k = two_step(&mut m);
        let copy = k.clone();
        assert!(matches!(k.invoke(&mut m), Err(RuntimeError::Stack(_))));
        assert!(!copy.is_spent());
    }

    #[test]
    fn test_resume_continuation_word() {
        let mut m = Machine::new();
        let k = two_step(&mut m);
        m.push(Value::Nil);
        m.push(Value::Continuation(k.clone()));
        resume_continuation(&mut m).unwrap();
        assert_eq!(m.stack.len(), 2);
        assert!(matches!(m.stack.peek(), Some(Value::Continuation(next)) if next.id() != k.id()));
    }
}
