//! Stack errors
//!
//! The only failure a bare stack can produce is running out of values.
//! Stack effects are a caller contract: popping past the bottom is reported,
//! never patched over.

/// Error raised by stack operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StackError {
    /// An operation needed more values than the stack holds
    Underflow {
        /// Name of the stack that ran dry ("stack" or "stash")
        stack: &'static str,
        /// Operation that was attempted
        op: &'static str,
        /// Number of values the operation needed
        needed: usize,
        /// Number of values actually present
        available: usize,
    },
}

impl std::fmt::Display for StackError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StackError::Underflow {
                stack,
                op,
                needed,
                available,
            } => write!(
                f,
                "{}: {} underflow (needed {}, found {})",
                op, stack, needed, available
            ),
        }
    }
}

impl std::error::Error for StackError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_underflow_display() {
        let err = StackError::Underflow {
            stack: "stash",
            op: "pop",
            needed: 1,
            available: 0,
        };
        assert_eq!(err.to_string(), "pop: stash underflow (needed 1, found 0)");
    }
}
