//! The continuation monad
//!
//! A `Cont<R, A>` wraps a function `(A -> R) -> R`: given "what to do with
//! the eventual `A`", it produces the final `R`. Values are immutable and
//! cheap to clone, and the monad itself never touches a machine; this is the
//! reference model continuation semantics are checked against.
//!
//! ## API
//!
//! - `pure(x)`: hands `x` to the continuation, unchanged
//! - `map(f)`, `apply(arg)`, `bind(f)`: functor, applicative and monad
//! - `call_with_current_continuation(f)`: `f` receives an exit function; the
//!   value passed to it becomes the result of the whole capture, and whatever
//!   `f` would have done afterwards is discarded
//! - `eval()`: run with the identity continuation (only when `R = A`)
//!
//! ## Stack words
//!
//! On the stack a `Cont` is a `Cont<Outcome, Value>`: the final result is a
//! `Result`, so a quotation that fails while the computation runs ends it
//! with that error instead of calling the rest.
//!
//! - `cont_pure` ( x -- cont )
//! - `eval_cont` ( cont -- x )
//! - `bind_cont` ( cont quot -- cont' ) where quot is ( a -- cont )
//! - `cont_from_cps` ( quot -- cont ) where quot is ( k -- r ) and k is ( a -- r )
//! - `call_with_current_continuation` ( quot -- cont ) where quot is
//!   ( exit -- cont ) and exit is ( a -- cont )
//!
//! Quotations handed to these words run on a scratch machine that holds
//! only their argument, since they run whenever the computation does and
//! not while the word itself executes.

use crate::config::RuntimeConfig;
use crate::error::RuntimeError;
use crate::machine::Machine;
use crate::value::{Quotation, Value};
use std::fmt;
use std::rc::Rc;

/// A shared single-argument function
pub type Func<A, B> = Rc<dyn Fn(A) -> B>;

/// Final result of a continuation-monad value built by the stack words
pub type Outcome = Result<Value, RuntimeError>;

pub struct Cont<R, A> {
    run: Rc<dyn Fn(Func<A, R>) -> R>,
}

impl<R, A> Clone for Cont<R, A> {
    fn clone(&self) -> Self {
        Self {
            run: Rc::clone(&self.run),
        }
    }
}

impl<R, A> fmt::Debug for Cont<R, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Cont({:p})", Rc::as_ptr(&self.run))
    }
}

impl<R: 'static, A: 'static> Cont<R, A> {
    pub fn new<F>(run: F) -> Self
    where
        F: Fn(Func<A, R>) -> R + 'static,
    {
        Self { run: Rc::new(run) }
    }

    /// Wrap an already shared CPS function
    pub fn from_cps(run: Rc<dyn Fn(Func<A, R>) -> R>) -> Self {
        Self { run }
    }

    pub fn run<K>(&self, continuation: K) -> R
    where
        K: Fn(A) -> R + 'static,
    {
        self.run_with(Rc::new(continuation))
    }

    pub fn run_with(&self, continuation: Func<A, R>) -> R {
        (self.run)(continuation)
    }

    pub fn pure(value: A) -> Self
    where
        A: Clone,
    {
        Self::new(move |k| k(value.clone()))
    }

    pub fn map<B, F>(&self, f: F) -> Cont<R, B>
    where
        B: 'static,
        F: Fn(A) -> B + 'static,
    {
        let m = self.clone();
        let f = Rc::new(f);
        Cont::new(move |k: Func<B, R>| {
            let f = Rc::clone(&f);
            m.run_with(Rc::new(move |a: A| k(f(a))))
        })
    }

    pub fn bind<B, F>(&self, f: F) -> Cont<R, B>
    where
        B: 'static,
        F: Fn(A) -> Cont<R, B> + 'static,
    {
        let m = self.clone();
        let f = Rc::new(f);
        Cont::new(move |k: Func<B, R>| {
            let f = Rc::clone(&f);
            m.run_with(Rc::new(move |a: A| f(a).run_with(Rc::clone(&k))))
        })
    }

    /// Capture the current continuation as an exit function
    ///
    /// Calling the exit with `a` yields a computation that ignores its own
    /// continuation and hands `a` straight to the one captured here.
    pub fn call_with_current_continuation<C, F>(f: F) -> Self
    where
        A: Clone,
        C: 'static,
        F: Fn(Func<A, Cont<R, C>>) -> Cont<R, A> + 'static,
    {
        Self::new(move |k: Func<A, R>| {
            let captured = Rc::clone(&k);
            let exit: Func<A, Cont<R, C>> = Rc::new(move |a: A| {
                let captured = Rc::clone(&captured);
                Cont::new(move |_: Func<C, R>| captured(a.clone()))
            });
            f(exit).run_with(k)
        })
    }

    /// Whether both values share the same underlying function
    pub fn same_as(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.run, &other.run)
    }
}

impl<R: 'static, B: 'static, C: 'static> Cont<R, Func<B, C>> {
    /// Apply a wrapped function to a wrapped argument
    ///
    /// The function side runs first, then the argument side.
    pub fn apply(&self, argument: &Cont<R, B>) -> Cont<R, C> {
        let m = self.clone();
        let argument = argument.clone();
        Cont::new(move |k: Func<C, R>| {
            let argument = argument.clone();
            m.run_with(Rc::new(move |f: Func<B, C>| {
                let k = Rc::clone(&k);
                argument.run_with(Rc::new(move |b: B| k(f(b))))
            }))
        })
    }
}

impl<R: 'static> Cont<R, R> {
    pub fn eval(&self) -> R {
        self.run(|x| x)
    }
}

/// Stack effect: ( x -- cont )
pub fn cont_pure(machine: &mut Machine) -> Result<(), RuntimeError> {
    let value = machine.pop()?;
    machine.push(Value::Cont(Cont::pure(value)));
    Ok(())
}

/// Stack effect: ( cont -- x )
pub fn eval_cont(machine: &mut Machine) -> Result<(), RuntimeError> {
    let cont = machine.pop()?.into_cont("eval_cont")?;
    let result = cont.run(Ok)?;
    machine.push(result);
    Ok(())
}

/// Stack effect: ( cont quot -- cont' )
///
/// `quot` is ( a -- cont ): it receives the value `cont` produces and
/// leaves the computation to continue with.
pub fn bind_cont(machine: &mut Machine) -> Result<(), RuntimeError> {
    let quotation = machine.pop()?.into_quotation("bind_cont")?;
    let cont = machine.pop()?.into_cont("bind_cont")?;
    let config = machine.config().clone();
    let bound = cont.bind(move |a| deferred("bind_cont", config.clone(), quotation.clone(), a));
    machine.push(Value::Cont(bound));
    Ok(())
}

/// Stack effect: ( quot -- cont )
///
/// `quot` is ( k -- r ), written in continuation-passing style: `k` is a
/// word ( a -- r ) standing for the rest of the computation.
pub fn cont_from_cps(machine: &mut Machine) -> Result<(), RuntimeError> {
    let quotation = machine.pop()?.into_quotation("cont_from_cps")?;
    let config = machine.config().clone();
    let cont = Cont::new(move |k: Func<Value, Outcome>| {
        let rest = Quotation::named("k", move |m| {
            let a = m.pop()?;
            let r = k(a)?;
            m.push(r);
            Ok(())
        });
        run_isolated(&config, &quotation, Value::Quotation(rest))
    });
    machine.push(Value::Cont(cont));
    Ok(())
}

/// Stack effect: ( quot -- cont )
///
/// `quot` is ( exit -- cont ). `exit` is a word ( a -- cont ) whose result
/// abandons the rest of what `quot` built and makes `a` the result of the
/// whole capture.
pub fn call_with_current_continuation(machine: &mut Machine) -> Result<(), RuntimeError> {
    let quotation = machine.pop()?.into_quotation("call_with_current_continuation")?;
    let config = machine.config().clone();
    let cont = Cont::call_with_current_continuation(move |exit: Func<Value, Cont<Outcome, Value>>| {
        let exit_word = Quotation::named("exit", move |m| {
            let a = m.pop()?;
            m.push(Value::Cont(exit(a)));
            Ok(())
        });
        deferred(
            "call_with_current_continuation",
            config.clone(),
            quotation.clone(),
            Value::Quotation(exit_word),
        )
    });
    machine.push(Value::Cont(cont));
    Ok(())
}

/// A computation that, once run, applies `quotation` to `argument` and
/// continues with the `Cont` it leaves behind
fn deferred(
    op: &'static str,
    config: RuntimeConfig,
    quotation: Quotation,
    argument: Value,
) -> Cont<Outcome, Value> {
    Cont::new(move |k| {
        run_isolated(&config, &quotation, argument.clone())?
            .into_cont(op)?
            .run_with(k)
    })
}

/// Run `quotation` on a fresh machine holding just `argument` and take the
/// value it leaves on top
fn run_isolated(
    config: &RuntimeConfig,
    quotation: &Quotation,
    argument: Value,
) -> Result<Value, RuntimeError> {
    let mut scratch = Machine::with_config(config.clone());
    scratch.push(argument);
    quotation.call(&mut scratch)?;
    scratch.pop()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[test]
    fn test_apply_runs_function_side_first() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let function_log = Rc::clone(&log);
        let function: Cont<i64, Func<i64, i64>> = Cont::new(move |k| {
            function_log.borrow_mut().push("function");
            let increment: Func<i64, i64> = Rc::new(|x| x + 1);
            k(increment)
        });
        let argument_log = Rc::clone(&log);
        let argument: Cont<i64, i64> = Cont::new(move |k| {
            argument_log.borrow_mut().push("argument");
            k(41)
        });
        assert_eq!(function.apply(&argument).eval(), 42);
        assert_eq!(*log.borrow(), vec!["function", "argument"]);
    }

    #[test]
    fn test_exit_aborts_only_inside_capture() {
        let cont = Cont::<i64, i64>::call_with_current_continuation(
            |exit: Func<i64, Cont<i64, i64>>| exit(5).map(|x| x * 100),
        )
        .map(|x| x + 1);
        assert_eq!(cont.eval(), 6);
    }

    #[test]
    fn test_run_with_custom_continuation() {
        let cont = Cont::<String, i64>::pure(7);
        assert_eq!(cont.run(|x| format!("got {}", x)), "got 7");
    }

    #[test]
    fn test_from_cps_shares_function() {
        let run: Rc<dyn Fn(Func<i64, i64>) -> i64> = Rc::new(|k| k(3));
        let a = Cont::from_cps(Rc::clone(&run));
        let b = a.clone();
        assert!(a.same_as(&b));
        assert!(!a.same_as(&Cont::pure(3)));
        assert_eq!(a.eval(), 3);
    }

    #[test]
    fn test_stack_words() {
        let mut m = Machine::new();
        m.push("hello");
        cont_pure(&mut m).unwrap();
        assert!(matches!(m.stack.peek(), Some(Value::Cont(_))));
        eval_cont(&mut m).unwrap();
        assert_eq!(m.stack.as_slice(), &[Value::from("hello")]);
    }

    #[test]
    fn test_eval_cont_requires_cont() {
        let mut m = Machine::new();
        m.push(1i64);
        assert!(matches!(
            eval_cont(&mut m),
            Err(RuntimeError::TypeMismatch { op: "eval_cont", .. })
        ));
    }

    fn increment_cont() -> Quotation {
        Quotation::new(|m| {
            let n = m.pop()?.into_int("increment")?;
            m.push(n + 1);
            cont_pure(m)
        })
    }

    #[test]
    fn test_bind_cont() {
        let mut m = Machine::new();
        m.push(20i64);
        cont_pure(&mut m).unwrap();
        m.push(increment_cont());
        bind_cont(&mut m).unwrap();
        m.push(increment_cont());
        bind_cont(&mut m).unwrap();
        eval_cont(&mut m).unwrap();
        assert_eq!(m.stack.as_slice(), &[Value::Int(22)]);
    }

    #[test]
    fn test_bind_cont_quotation_must_leave_cont() {
        let mut m = Machine::new();
        m.push(1i64);
        cont_pure(&mut m).unwrap();
        m.push(Quotation::new(|_| Ok(())));
        bind_cont(&mut m).unwrap();
        let err = eval_cont(&mut m).unwrap_err();
        assert!(matches!(
            err,
            RuntimeError::TypeMismatch { op: "bind_cont", found: "Int", .. }
        ));
    }

    #[test]
    fn test_cont_from_cps_calls_k() {
        let mut m = Machine::new();
        // k 5, then double whatever k produced
        m.push(Quotation::new(|m| {
            let k = m.pop()?.into_quotation("cps")?;
            m.push(5i64);
            k.call(m)?;
            let r = m.pop()?.into_int("cps")?;
            m.push(r * 2);
            Ok(())
        }));
        cont_from_cps(&mut m).unwrap();
        m.push(increment_cont());
        bind_cont(&mut m).unwrap();
        eval_cont(&mut m).unwrap();
        assert_eq!(m.stack.as_slice(), &[Value::Int(12)]);
    }

    #[test]
    fn test_cont_from_cps_ignoring_k() {
        let mut m = Machine::new();
        m.push(Quotation::new(|m| {
            m.pop()?;
            m.push(99i64);
            Ok(())
        }));
        cont_from_cps(&mut m).unwrap();
        m.push(increment_cont());
        bind_cont(&mut m).unwrap();
        eval_cont(&mut m).unwrap();
        assert_eq!(m.stack.as_slice(), &[Value::Int(99)]);
    }

    #[test]
    fn test_call_with_current_continuation_word_aborts() {
        let mut m = Machine::new();
        // exit 5, then try to multiply by 100
        m.push(Quotation::new(|m| {
            let exit = m.pop()?.into_quotation("body")?;
            m.push(5i64);
            exit.call(m)?;
            m.push(Quotation::new(|m| {
                let n = m.pop()?.into_int("body")?;
                m.push(n * 100);
                cont_pure(m)
            }));
            bind_cont(m)
        }));
        call_with_current_continuation(&mut m).unwrap();
        m.push(increment_cont());
        bind_cont(&mut m).unwrap();
        eval_cont(&mut m).unwrap();
        assert_eq!(m.stack.as_slice(), &[Value::Int(6)]);
    }

    #[test]
    fn test_call_with_current_continuation_word_without_exit() {
        let mut m = Machine::new();
        m.push(Quotation::new(|m| {
            m.pop()?;
            m.push(7i64);
            cont_pure(m)
        }));
        call_with_current_continuation(&mut m).unwrap();
        eval_cont(&mut m).unwrap();
        assert_eq!(m.stack.as_slice(), &[Value::Int(7)]);
    }

    #[test]
    fn test_quotation_errors_surface_at_eval() {
        let mut m = Machine::new();
        m.push(Quotation::new(|m| m.pop().map(|_| ())));
        call_with_current_continuation(&mut m).unwrap();
        // nothing runs until evaluation
        assert_eq!(m.stack.len(), 1);
        assert!(matches!(eval_cont(&mut m), Err(RuntimeError::Stack(_))));
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        type IntFn = Func<i64, i64>;

        fn adder(n: i64) -> IntFn {
            Rc::new(move |x: i64| x.wrapping_add(n))
        }

        fn constant(i: i64) -> Cont<i64, i64> {
            Cont::new(move |k| k(i))
        }

        proptest! {
            #[test]
            fn prop_functor_identity(i in any::<i64>()) {
                let cont = constant(i);
                prop_assert_eq!(cont.map(|x| x).eval(), cont.eval());
            }

            #[test]
            fn prop_functor_composition(i in any::<i64>(), j in any::<i64>(), l in any::<i64>()) {
                let f = move |x: i64| x.wrapping_add(j);
                let g = move |x: i64| x.wrapping_add(l);
                let cont = constant(i);
                prop_assert_eq!(cont.map(move |x| f(g(x))).eval(), cont.map(g).map(f).eval());
            }

            #[test]
            fn prop_applicative_identity(i in any::<i64>()) {
                let id: IntFn = Rc::new(|x| x);
                let cont = constant(i);
                prop_assert_eq!(Cont::pure(id).apply(&cont).eval(), cont.eval());
            }

            #[test]
            fn prop_applicative_homomorphism(i in any::<i64>(), x in any::<i64>()) {
                let f = adder(i);
                let lhs = Cont::<i64, IntFn>::pure(Rc::clone(&f)).apply(&Cont::pure(x));
                let rhs = Cont::<i64, i64>::pure(f(x));
                prop_assert_eq!(lhs.eval(), rhs.eval());
            }

            #[test]
            fn prop_applicative_interchange(i in any::<i64>(), y in any::<i64>()) {
                let u = Cont::<i64, IntFn>::pure(adder(i));
                let pass_y: Func<IntFn, i64> = Rc::new(move |f: IntFn| f(y));
                let lhs = u.apply(&Cont::pure(y));
                let rhs = Cont::<i64, Func<IntFn, i64>>::pure(pass_y).apply(&u);
                prop_assert_eq!(lhs.eval(), rhs.eval());
            }

            #[test]
            fn prop_applicative_composition(i in any::<i64>(), j in any::<i64>(), w in any::<i64>()) {
                let compose: Func<IntFn, Func<IntFn, IntFn>> = Rc::new(|f: IntFn| {
                    Rc::new(move |g: IntFn| {
                        let f = Rc::clone(&f);
                        Rc::new(move |x: i64| f(g(x))) as IntFn
                    }) as Func<IntFn, IntFn>
                });
                let u = Cont::<i64, IntFn>::pure(adder(i));
                let v = Cont::<i64, IntFn>::pure(adder(j));
                let w = Cont::<i64, i64>::pure(w);

                let with_compose = Cont::<i64, _>::pure(compose).apply(&u).apply(&v).apply(&w);
                let without = u.apply(&v.apply(&w));
                prop_assert_eq!(with_compose.eval(), without.eval());
            }

            #[test]
            fn prop_monad_left_identity(a in any::<i64>(), j in any::<i64>()) {
                let h = move |x: i64| Cont::<i64, i64>::pure(x.wrapping_add(j));
                prop_assert_eq!(Cont::pure(a).bind(h).eval(), h(a).eval());
            }

            #[test]
            fn prop_monad_right_identity(a in any::<i64>()) {
                let m = constant(a);
                prop_assert_eq!(m.bind(Cont::pure).eval(), m.eval());
            }

            #[test]
            fn prop_monad_associativity(a in any::<i64>(), j in any::<i64>(), l in any::<i64>()) {
                let g = move |x: i64| Cont::<i64, i64>::pure(x.wrapping_add(j));
                let h = move |x: i64| Cont::<i64, i64>::pure(x.wrapping_add(l));
                let m = Cont::<i64, i64>::pure(a);
                prop_assert_eq!(m.bind(g).bind(h).eval(), m.bind(move |x| g(x).bind(h)).eval());
            }

            #[test]
            fn prop_unused_exit_is_transparent(i in any::<i64>()) {
                let cont = Cont::<i64, i64>::call_with_current_continuation(
                    move |_exit: Func<i64, Cont<i64, i64>>| Cont::pure(i),
                );
                prop_assert_eq!(cont.eval(), i);
            }

            #[test]
            fn prop_exit_discards_rest(i in any::<i64>(), j in any::<i64>()) {
                let cont = Cont::<i64, i64>::call_with_current_continuation(
                    move |exit: Func<i64, Cont<i64, i64>>| exit(i).map(move |x| x.wrapping_mul(j)),
                );
                prop_assert_eq!(cont.eval(), i);
            }
        }
    }
}
