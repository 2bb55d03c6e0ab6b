//! Suspendable computations
//!
//! A suspendable computation is an explicit state machine: resuming it with
//! a value either yields a value together with the state to resume next, or
//! finishes with a final value. Resumption takes the state by value, so a
//! given state can only ever be resumed once.

use crate::error::RuntimeError;
use crate::machine::Machine;
use crate::value::Value;
use std::collections::VecDeque;

/// Outcome of resuming a suspendable computation
pub enum Resumed {
    /// Paused after producing a value; the rest of the computation follows
    Yielded(Value, Box<dyn Suspendable>),
    /// Finished with a final value
    Done(Value),
}

/// A computation that can pause and later resume with a supplied value
///
/// The machine is passed in so the computation can read and write the
/// shared stacks between suspensions.
pub trait Suspendable {
    fn resume(self: Box<Self>, machine: &mut Machine, input: Value)
    -> Result<Resumed, RuntimeError>;
}

type StepFn = Box<dyn FnOnce(&mut Machine, Value) -> Result<Value, RuntimeError>>;

/// A computation assembled from one closure per suspension
///
/// The first resume runs the first step with the resume value and yields
/// what it returns; the next resume runs the second step, and so on. Once
/// the steps are exhausted, resuming runs the `returning` closure (if any)
/// and finishes with its value, or with `Nil`.
#[derive(Default)]
pub struct Steps {
    steps: VecDeque<StepFn>,
    finish: Option<StepFn>,
}

impl Steps {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a step that yields the value it returns
    pub fn then<F>(mut self, step: F) -> Self
    where
        F: FnOnce(&mut Machine, Value) -> Result<Value, RuntimeError> + 'static,
    {
        self.steps.push_back(Box::new(step));
        self
    }

    /// Set the code that runs after the last yield and produces the result
    pub fn returning<F>(mut self, finish: F) -> Self
    where
        F: FnOnce(&mut Machine, Value) -> Result<Value, RuntimeError> + 'static,
    {
        self.finish = Some(Box::new(finish));
        self
    }

    pub fn remaining(&self) -> usize {
        self.steps.len()
    }
}

impl Suspendable for Steps {
    fn resume(
        mut self: Box<Self>,
        machine: &mut Machine,
        input: Value,
    ) -> Result<Resumed, RuntimeError> {
        match self.steps.pop_front() {
            Some(step) => {
                let produced = step(machine, input)?;
                Ok(Resumed::Yielded(produced, self))
            }
            None => match self.finish.take() {
                Some(finish) => Ok(Resumed::Done(finish(machine, input)?)),
                None => Ok(Resumed::Done(Value::Nil)),
            },
        }
    }
}

/// A single-transition computation built from a closure
pub struct FromFn<F>(F);

/// Wrap a closure as a suspendable computation
///
/// The closure decides the transition itself, which makes it easy to build
/// hand-written state machines that hand back another `from_fn` as the rest.
pub fn from_fn<F>(f: F) -> FromFn<F>
where
    F: FnOnce(&mut Machine, Value) -> Result<Resumed, RuntimeError> + 'static,
{
    FromFn(f)
}

impl<F> Suspendable for FromFn<F>
where
    F: FnOnce(&mut Machine, Value) -> Result<Resumed, RuntimeError> + 'static,
{
    fn resume(
        self: Box<Self>,
        machine: &mut Machine,
        input: Value,
    ) -> Result<Resumed, RuntimeError> {
        (self.0)(machine, input)
    }
}
