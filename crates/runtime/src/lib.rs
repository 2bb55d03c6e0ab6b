//! Concat Runtime: control flow for a concatenative language
//!
//! Key design principles:
//! - Machine: one program run's stacks, handler table and return target,
//!   passed explicitly so independent runs never share state
//! - Effects: tagged descriptions of actions, interpreted by dynamically
//!   scoped handlers (innermost wins, restored on scope exit)
//! - Continuations: one-shot resumptions of suspendable computations, and
//!   escape tokens that unwind through `Result` to their capture frame
//! - Cont: a pure continuation monad, the reference model for the above

pub mod config;
pub mod console;
pub mod cont;
pub mod continuation;
pub mod effects;
pub mod error;
pub mod escape;
pub mod machine;
pub mod suspend;
pub mod value;

pub use config::RuntimeConfig;
pub use error::RuntimeError;
pub use machine::Machine;
pub use value::{Quotation, Value};

// Effect system
pub use effects::{
    Effect, EffectTag, HandlerTable, bind, bind_effect, do_effects, handle_effect, pure_effect,
    run, run_effect,
};

// Suspension and one-shot capture
pub use continuation::{OneShot, as_continuation, resume_continuation};
pub use suspend::{Resumed, Steps, Suspendable, from_fn};

// Escape continuations
pub use escape::{EscapeToken, callcc, capture, continue_with, do_return, with_return};

// Continuation monad
pub use cont::{
    Cont, Func, Outcome, bind_cont, call_with_current_continuation, cont_from_cps, cont_pure,
    eval_cont,
};
