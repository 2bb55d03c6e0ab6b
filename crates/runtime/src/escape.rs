//! Escape continuations (reified jumps)
//!
//! `callcc` pushes a fresh token and runs a procedure. Invoking the token
//! with `continue_with` unwinds straight back to the end of that `callcc`,
//! skipping everything in between. These are one-way jumps: nothing after
//! the invocation point ever runs, and a token is useless once its `callcc`
//! has returned.
//!
//! The unwind travels as `RuntimeError::Escape(token)` through ordinary
//! `Result` propagation. Each capture frame compares the token with its own
//! and either absorbs the signal or passes it on, so nested captures only
//! ever catch their own escapes.
//!
//! ## API
//!
//! - `callcc`: ( quot -- ... ) runs `quot` with ( -- token ) pushed
//! - `continue_with`: ( token -- ) never returns normally
//! - `with_return`: ( body -- ... ) runs `body` with a `do_return` target
//! - `do_return`: ( -- ) jumps to the end of the innermost `with_return`

use crate::error::RuntimeError;
use crate::machine::Machine;
use crate::value::Value;
use std::fmt;
use tracing::trace;

/// Identity of one `callcc` frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EscapeToken(u64);

impl EscapeToken {
    pub(crate) fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn id(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for EscapeToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#<escape {}>", self.0)
    }
}

/// Run `body` under a fresh capture frame
///
/// `body` receives the frame's token. An escape carrying that token ends
/// the frame normally; any other outcome is returned unchanged.
pub fn capture<F>(machine: &mut Machine, body: F) -> Result<(), RuntimeError>
where
    F: FnOnce(&mut Machine, EscapeToken) -> Result<(), RuntimeError>,
{
    let token = machine.fresh_token();
    let result = body(machine, token);
    absorb(token, result)
}

fn absorb(token: EscapeToken, result: Result<(), RuntimeError>) -> Result<(), RuntimeError> {
    match result {
        Err(RuntimeError::Escape(signal)) if signal == token => {
            trace!(%token, "escape absorbed by its capture frame");
            Ok(())
        }
        other => other,
    }
}

/// Call a procedure with the current (escape) continuation
///
/// Stack effect: ( quot -- ... ) where `quot` sees ( -- token )
pub fn callcc(machine: &mut Machine) -> Result<(), RuntimeError> {
    let procedure = machine.pop()?.into_quotation("callcc")?;
    capture(machine, |m, token| {
        m.push(Value::Token(token));
        procedure.call(m)
    })
}

/// Jump to the end of the `callcc` that minted the token
///
/// Stack effect: ( token -- ) and never returns normally
pub fn continue_with(machine: &mut Machine) -> Result<(), RuntimeError> {
    let token = machine.pop()?.into_token("continue_with")?;
    trace!(%token, "raising escape signal");
    Err(RuntimeError::Escape(token))
}

/// Run a body that may leave early with `do_return`
///
/// Stack effect: ( body -- ... )
///
/// The previous return target is restored when the body finishes, however
/// it finishes.
pub fn with_return(machine: &mut Machine) -> Result<(), RuntimeError> {
    let body = machine.pop()?.into_quotation("with_return")?;
    capture(machine, |m, token| {
        let previous = m.return_token.replace(token);
        let result = body.call(m);
        m.return_token = previous;
        result
    })
}

/// Leave the innermost `with_return` block
///
/// Stack effect: ( -- ) and never returns normally
pub fn do_return(machine: &mut Machine) -> Result<(), RuntimeError> {
    let token = machine
        .return_token
        .ok_or(RuntimeError::ReturnOutsideBlock)?;
    Err(RuntimeError::Escape(token))
}
