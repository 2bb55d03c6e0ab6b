//! Algebraic effects with dynamically scoped handlers
//!
//! An [`Effect`] describes an action to be interpreted rather than performed.
//! Interpretation is looked up in the machine's [`HandlerTable`], a stack of
//! `(tag, handler)` pairs scanned from the most recently installed entry
//! down. Installing a handler is scoped: [`Machine::with_handler`] pushes the
//! pair for the extent of a body and pops it on every exit path, so nested
//! installs shadow outer ones and restore them on exit without any
//! bookkeeping by the caller.
//!
//! ## API
//!
//! - `bind(effect, k)`: a `Continuation` effect that dispatches `effect` to
//!   its handler and then runs `k`
//! - `do_effects`: ( resume computation -- effect ) one step of the drive loop
//! - `run(computation)`: drive a suspendable computation to completion
//! - `handle_effect`: ( body handler tag -- ... ) scoped install as a word
//!
//! ## Dispatch
//!
//! A handler is an ordinary quotation. It is called with the effect itself on
//! top of the stack and is expected to consume it.

use crate::continuation::{OneShot, as_continuation};
use crate::error::RuntimeError;
use crate::machine::Machine;
use crate::suspend::Suspendable;
use crate::value::{Quotation, Value};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, trace};

/// First id handed out by [`EffectTag::new`]; lower ids are reserved
const FIRST_USER_TAG: u64 = 16;

static NEXT_TAG: AtomicU64 = AtomicU64::new(FIRST_USER_TAG);

/// Identity of an effect variant
///
/// Tags compare by id, so two libraries that both call their effect "Log"
/// still get distinct handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EffectTag {
    id: u64,
    name: &'static str,
}

impl EffectTag {
    pub const PURE: EffectTag = EffectTag::reserved(0, "Pure");
    pub const CONTINUATION: EffectTag = EffectTag::reserved(1, "Continuation");

    /// Mint a fresh tag for a new effect variant
    pub fn new(name: &'static str) -> Self {
        Self {
            id: NEXT_TAG.fetch_add(1, Ordering::Relaxed),
            name,
        }
    }

    pub(crate) const fn reserved(id: u64, name: &'static str) -> Self {
        Self { id, name }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl fmt::Display for EffectTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.name, self.id)
    }
}

/// A tagged description of an action
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// A finished computation's value
    Pure(Value),
    /// The rest of a computation, run against the machine's stacks
    Continuation(Quotation),
    /// An extension variant (I/O, suspension, ...) identified by its tag
    Custom { tag: EffectTag, payload: Value },
}

impl Effect {
    pub fn custom(tag: EffectTag, payload: impl Into<Value>) -> Self {
        Effect::Custom {
            tag,
            payload: payload.into(),
        }
    }

    /// The key used for handler lookup
    pub fn tag(&self) -> EffectTag {
        match self {
            Effect::Pure(_) => EffectTag::PURE,
            Effect::Continuation(_) => EffectTag::CONTINUATION,
            Effect::Custom { tag, .. } => *tag,
        }
    }

    /// The payload of a `Pure` or custom effect
    pub fn payload(&self) -> Option<&Value> {
        match self {
            Effect::Pure(value) | Effect::Custom { payload: value, .. } => Some(value),
            Effect::Continuation(_) => None,
        }
    }

    /// Interpret this effect
    ///
    /// A `Continuation` effect runs its continuation and then keeps running
    /// any `Continuation` effects the previous step left on top of the stack.
    /// Every other effect is dispatched once to its innermost handler.
    pub fn run_effect(self, machine: &mut Machine) -> Result<(), RuntimeError> {
        let mut current = match self {
            Effect::Continuation(k) => k,
            other => return other.dispatch(machine),
        };
        loop {
            current.call(machine)?;
            match take_chained_continuation(machine)? {
                Some(next) => current = next,
                None => return Ok(()),
            }
        }
    }

    /// Push this effect and call the innermost handler for its tag
    pub fn dispatch(self, machine: &mut Machine) -> Result<(), RuntimeError> {
        let tag = self.tag();
        let handler = machine
            .handlers
            .lookup(tag)
            .cloned()
            .ok_or(RuntimeError::UnhandledEffect { tag })?;
        if machine.config().trace_effects {
            trace!(%tag, handler = handler.name(), "dispatching effect");
        }
        machine.push(self);
        handler.call(machine)
    }
}

fn take_chained_continuation(machine: &mut Machine) -> Result<Option<Quotation>, RuntimeError> {
    let chained = matches!(
        machine.stack.peek(),
        Some(Value::Effect(effect)) if matches!(**effect, Effect::Continuation(_))
    );
    if !chained {
        return Ok(None);
    }
    match machine.pop()?.into_effect("run_effect")? {
        Effect::Continuation(k) => Ok(Some(k)),
        _ => Ok(None),
    }
}

/// The dynamically scoped handler stack
///
/// Starts with the built-in handlers for `Pure` and `Continuation`, which
/// user code may shadow like any other.
#[derive(Debug, Clone)]
pub struct HandlerTable {
    entries: Vec<(EffectTag, Quotation)>,
}

impl Default for HandlerTable {
    fn default() -> Self {
        Self {
            entries: vec![
                (EffectTag::PURE, Quotation::named("handle-pure", handle_pure)),
                (
                    EffectTag::CONTINUATION,
                    Quotation::named("handle-continuation", handle_continuation),
                ),
            ],
        }
    }
}

impl HandlerTable {
    /// Innermost handler for `tag`
    pub fn lookup(&self, tag: EffectTag) -> Option<&Quotation> {
        self.entries
            .iter()
            .rev()
            .find(|(entry_tag, _)| *entry_tag == tag)
            .map(|(_, handler)| handler)
    }

    pub fn depth(&self) -> usize {
        self.entries.len()
    }

    fn push(&mut self, tag: EffectTag, handler: Quotation) {
        self.entries.push((tag, handler));
    }

    fn truncate(&mut self, depth: usize) {
        self.entries.truncate(depth);
    }
}

/// Built-in `Pure` handler
///
/// Stack effect: ( Pure(x) -- x )
fn handle_pure(machine: &mut Machine) -> Result<(), RuntimeError> {
    match machine.pop()?.into_effect("handle-pure")? {
        Effect::Pure(value) => {
            machine.push(value);
            Ok(())
        }
        other => Err(RuntimeError::type_mismatch(
            "handle-pure",
            "Pure effect",
            other.tag().name(),
        )),
    }
}

/// Built-in `Continuation` handler
///
/// Stack effect: ( Continuation(k) -- ... ) then whatever `k` does
fn handle_continuation(machine: &mut Machine) -> Result<(), RuntimeError> {
    match machine.pop()?.into_effect("handle-continuation")? {
        Effect::Continuation(k) => k.call(machine),
        other => Err(RuntimeError::type_mismatch(
            "handle-continuation",
            "Continuation effect",
            other.tag().name(),
        )),
    }
}

impl Machine {
    /// Install `handler` for `tag` while `body` runs
    ///
    /// The pair is removed when `body` returns, whether it succeeded, failed
    /// or is unwinding an escape continuation. Handlers that `body` itself
    /// installed are gone by then too, so the table is always restored to
    /// its depth on entry.
    pub fn with_handler<T, F>(
        &mut self,
        tag: EffectTag,
        handler: Quotation,
        body: F,
    ) -> Result<T, RuntimeError>
    where
        F: FnOnce(&mut Machine) -> Result<T, RuntimeError>,
    {
        let depth = self.handlers.depth();
        debug!(%tag, handler = handler.name(), depth, "installing effect handler");
        self.handlers.push(tag, handler);
        let result = body(self);
        self.handlers.truncate(depth);
        debug!(%tag, depth, "released effect handler");
        result
    }
}

/// Bind an effect to the computation that follows it
///
/// The handler is chosen now, from the handlers installed at the time of
/// the call. The returned effect, when run, pushes `effect`, calls that
/// handler and then calls `continuation`.
pub fn bind(
    machine: &Machine,
    effect: Effect,
    continuation: Quotation,
) -> Result<Effect, RuntimeError> {
    let tag = effect.tag();
    let handler = machine
        .handlers
        .lookup(tag)
        .cloned()
        .ok_or(RuntimeError::UnhandledEffect { tag })?;
    if machine.config().trace_effects {
        trace!(%tag, handler = handler.name(), "binding effect");
    }
    Ok(Effect::Continuation(Quotation::named(
        "bound-effect",
        move |m| {
            m.push(effect.clone());
            handler.call(m)?;
            continuation.call(m)
        },
    )))
}

/// One step of the drive loop
///
/// Stack effect: ( resume computation -- effect )
///
/// Resumes `computation` with `resume`. If it finished, the result (wrapped
/// in `Pure` unless it already is an effect) is left on the stack. Otherwise
/// the produced effect is bound to a continuation that resumes the rest of
/// the computation with `Nil` and continues the loop.
pub fn do_effects(machine: &mut Machine) -> Result<(), RuntimeError> {
    let continuation = machine.pop()?.into_continuation("do_effects")?;
    drive(machine, continuation)
}

fn drive(machine: &mut Machine, continuation: OneShot) -> Result<(), RuntimeError> {
    continuation.invoke(machine)?;
    let next = machine.pop()?;
    let produced = machine.pop()?;
    let effect = match produced {
        Value::Effect(effect) => *effect,
        other => Effect::Pure(other),
    };
    let next = match next {
        Value::Nil => {
            machine.push(effect);
            return Ok(());
        }
        other => other.into_continuation("do_effects")?,
    };
    let resume = Quotation::named("resume-computation", move |m| {
        m.push(Value::Nil);
        drive(m, next.clone())
    });
    let bound = bind(machine, effect, resume)?;
    machine.push(bound);
    Ok(())
}

/// Drive a suspendable computation to completion
///
/// Stack effect: ( -- result )
///
/// Each effect the computation yields is handled by the innermost matching
/// handler before the computation is resumed. The final result is unwrapped
/// from `Pure`; a final custom effect is dispatched to its handler.
pub fn run(machine: &mut Machine, computation: Box<dyn Suspendable>) -> Result<(), RuntimeError> {
    let continuation = as_continuation(machine, computation);
    machine.push(Value::Nil);
    machine.push(Value::Continuation(continuation));
    do_effects(machine)?;

    let mut effect = machine.pop()?.into_effect("run")?;
    loop {
        match effect {
            Effect::Continuation(_) => {
                effect.run_effect(machine)?;
                effect = match machine.pop()? {
                    Value::Effect(next) => *next,
                    other => {
                        machine.push(other);
                        return Ok(());
                    }
                };
            }
            other => return other.dispatch(machine),
        }
    }
}

/// Install a handler around a quotation
///
/// Stack effect: ( body handler tag -- ... )
pub fn handle_effect(machine: &mut Machine) -> Result<(), RuntimeError> {
    let tag = machine.pop()?.into_tag("handle_effect")?;
    let handler = machine.pop()?.into_quotation("handle_effect")?;
    let body = machine.pop()?.into_quotation("handle_effect")?;
    machine.with_handler(tag, handler, |m| body.call(m))
}

/// Stack effect: ( x -- Pure(x) )
pub fn pure_effect(machine: &mut Machine) -> Result<(), RuntimeError> {
    let value = machine.pop()?;
    machine.push(Effect::Pure(value));
    Ok(())
}

/// Stack effect: ( effect continuation -- effect' )
pub fn bind_effect(machine: &mut Machine) -> Result<(), RuntimeError> {
    let continuation = machine.pop()?.into_quotation("bind_effect")?;
    let effect = machine.pop()?.into_effect("bind_effect")?;
    let bound = bind(machine, effect, continuation)?;
    machine.push(bound);
    Ok(())
}

/// Stack effect: ( effect -- ... )
pub fn run_effect(machine: &mut Machine) -> Result<(), RuntimeError> {
    let effect = machine.pop()?.into_effect("run_effect")?;
    effect.run_effect(machine)
}
