//! Runtime Error Handling
//!
//! Every runtime operation returns `Result<_, RuntimeError>`. Besides real
//! failures the enum carries one control signal, `Escape`, which is how an
//! escape continuation unwinds: it travels up through `?` until the `callcc`
//! frame that minted the token absorbs it. If it reaches
//! [`Machine::execute`](crate::machine::Machine::execute) instead, it is
//! turned into `UnmatchedEscape`.

use crate::effects::EffectTag;
use crate::escape::EscapeToken;
use concat_core::StackError;

/// Error (or in-flight unwind signal) produced by the runtime
#[derive(Debug)]
pub enum RuntimeError {
    /// A stack operation ran out of values
    Stack(StackError),
    /// No installed handler matches the effect's tag
    UnhandledEffect { tag: EffectTag },
    /// A one-shot continuation was invoked a second time
    ReentrantContinuation { id: u64 },
    /// An escape signal reached the top level without meeting its capture frame
    UnmatchedEscape { token: EscapeToken },
    /// `do_return` was used outside any `with_return` block
    ReturnOutsideBlock,
    /// A value of the wrong kind was found on the stack
    TypeMismatch {
        op: &'static str,
        expected: &'static str,
        found: &'static str,
    },
    /// An I/O device behind a handler failed
    Io(std::io::Error),
    /// Invalid runtime configuration
    Config(String),
    /// Unwind signal for the escape continuation `token` (not an error while in flight)
    Escape(EscapeToken),
}

impl RuntimeError {
    pub(crate) fn type_mismatch(
        op: &'static str,
        expected: &'static str,
        found: &'static str,
    ) -> Self {
        RuntimeError::TypeMismatch {
            op,
            expected,
            found,
        }
    }
}

impl std::fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RuntimeError::Stack(e) => write!(f, "{}", e),
            RuntimeError::UnhandledEffect { tag } => {
                write!(f, "Unhandled effect: no handler installed for {}", tag)
            }
            RuntimeError::ReentrantContinuation { id } => {
                write!(f, "One-shot continuation #{} was already resumed", id)
            }
            RuntimeError::UnmatchedEscape { token } => write!(
                f,
                "Escape {} has no live capture frame (its callcc already returned)",
                token
            ),
            RuntimeError::ReturnOutsideBlock => {
                write!(f, "do_return used outside of a with_return block")
            }
            RuntimeError::TypeMismatch {
                op,
                expected,
                found,
            } => write!(f, "{}: expected {}, got {}", op, expected, found),
            RuntimeError::Io(e) => write!(f, "I/O error: {}", e),
            RuntimeError::Config(msg) => write!(f, "Invalid configuration: {}", msg),
            RuntimeError::Escape(token) => write!(f, "Escape signal for {}", token),
        }
    }
}

impl std::error::Error for RuntimeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RuntimeError::Stack(e) => Some(e),
            RuntimeError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<StackError> for RuntimeError {
    fn from(e: StackError) -> Self {
        RuntimeError::Stack(e)
    }
}

impl From<std::io::Error> for RuntimeError {
    fn from(e: std::io::Error) -> Self {
        RuntimeError::Io(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_stack_error_converts_and_keeps_source() {
        let err: RuntimeError = StackError::Underflow {
            stack: "stack",
            op: "pop",
            needed: 1,
            available: 0,
        }
        .into();
        assert!(matches!(err, RuntimeError::Stack(_)));
        assert!(err.source().is_some());
        assert_eq!(err.to_string(), "pop: stack underflow (needed 1, found 0)");
    }

    #[test]
    fn test_type_mismatch_display() {
        let err = RuntimeError::type_mismatch("callcc", "Quotation", "Int");
        assert_eq!(err.to_string(), "callcc: expected Quotation, got Int");
    }
}
