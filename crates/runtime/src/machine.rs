//! The machine: one program run's worth of mutable state
//!
//! A `Machine` owns the operand stack, the stash, the handler table and the
//! current `with_return` target. Nothing here is global: independent program
//! runs get independent machines and never observe each other.

use crate::config::RuntimeConfig;
use crate::effects::HandlerTable;
use crate::error::RuntimeError;
use crate::escape::EscapeToken;
use crate::value::{Quotation, Value};
use concat_core::{STASH, STACK, Stack};
use tracing::warn;

pub struct Machine {
    /// Operand stack
    pub stack: Stack<Value>,
    /// Scratch stack for temporarily relocated values
    pub stash: Stack<Value>,
    pub(crate) handlers: HandlerTable,
    pub(crate) return_token: Option<EscapeToken>,
    next_token: u64,
    next_continuation: u64,
    config: RuntimeConfig,
}

impl Machine {
    pub fn new() -> Self {
        Self::with_config(RuntimeConfig::default())
    }

    pub fn with_config(config: RuntimeConfig) -> Self {
        let mut stack = Stack::with_capacity(STACK, config.stack_capacity);
        let mut stash = Stack::with_capacity(STASH, config.stack_capacity);
        stack.set_trace(config.trace_stacks);
        stash.set_trace(config.trace_stacks);
        Self {
            stack,
            stash,
            handlers: HandlerTable::default(),
            return_token: None,
            next_token: 1,
            next_continuation: 1,
            config,
        }
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn handlers(&self) -> &HandlerTable {
        &self.handlers
    }

    /// Stack effect: ( -- a )
    pub fn push(&mut self, value: impl Into<Value>) {
        self.stack.push(value.into());
    }

    /// Stack effect: ( a -- )
    pub fn pop(&mut self) -> Result<Value, RuntimeError> {
        Ok(self.stack.pop()?)
    }

    /// Run a quotation as a top-level program step
    ///
    /// An escape signal that arrives here matched no live `callcc` frame;
    /// it is reported as `UnmatchedEscape` instead of being passed on.
    pub fn execute(&mut self, quotation: &Quotation) -> Result<(), RuntimeError> {
        match quotation.call(self) {
            Err(RuntimeError::Escape(token)) => {
                warn!(%token, "escape signal reached top level");
                Err(RuntimeError::UnmatchedEscape { token })
            }
            other => other,
        }
    }

    /// Move the top of the stack to the stash (`_r`)
    ///
    /// Stack effect: ( a -- ) stash: ( -- a )
    pub fn to_stash(&mut self) -> Result<(), RuntimeError> {
        let value = self.stack.pop()?;
        self.stash.push(value);
        Ok(())
    }

    /// Move the top of the stash back to the stack (`r_`)
    ///
    /// Stack effect: ( -- a ) stash: ( a -- )
    pub fn from_stash(&mut self) -> Result<(), RuntimeError> {
        let value = self.stash.pop()?;
        self.stack.push(value);
        Ok(())
    }

    /// Collect the top `n` values into a list
    ///
    /// Stack effect: ( x1 .. xn n -- [x1 .. xn] )
    pub fn to_list(&mut self) -> Result<(), RuntimeError> {
        let n = self.pop()?.into_int("to_list")?;
        let n = usize::try_from(n)
            .map_err(|_| RuntimeError::type_mismatch("to_list", "non-negative Int", "Int"))?;
        let items = self.stack.pop_n(n)?;
        self.stack.push(Value::List(items));
        Ok(())
    }

    /// Spread a list onto the stack
    ///
    /// Stack effect: ( [x1 .. xn] -- x1 .. xn )
    pub fn unlist(&mut self) -> Result<(), RuntimeError> {
        let items = self.pop()?.into_list("unlist")?;
        self.stack.replace_top(0, items)?;
        Ok(())
    }

    pub(crate) fn fresh_token(&mut self) -> EscapeToken {
        let token = EscapeToken::new(self.next_token);
        self.next_token += 1;
        token
    }

    pub(crate) fn fresh_continuation_id(&mut self) -> u64 {
        let id = self.next_continuation;
        self.next_continuation += 1;
        id
    }
}

impl Default for Machine {
    fn default() -> Self {
        Self::new()
    }
}
