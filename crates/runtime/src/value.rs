//! Runtime values
//!
//! `Value` is the open, dynamic value type carried on both stacks. Control
//! objects (quotations, effects, continuations, escape tokens) are ordinary
//! values so compiled code can shuffle them like anything else.

use crate::cont::{Cont, Outcome};
use crate::continuation::OneShot;
use crate::effects::{Effect, EffectTag};
use crate::error::RuntimeError;
use crate::escape::EscapeToken;
use crate::machine::Machine;
use std::fmt;
use std::rc::Rc;

type Body = dyn Fn(&mut Machine) -> Result<(), RuntimeError>;

/// A first-class word: code that operates on the machine's stacks
///
/// Cloning is O(1); equality is identity.
#[derive(Clone)]
pub struct Quotation {
    name: &'static str,
    body: Rc<Body>,
}

impl Quotation {
    pub fn new<F>(body: F) -> Self
    where
        F: Fn(&mut Machine) -> Result<(), RuntimeError> + 'static,
    {
        Self::named("<quotation>", body)
    }

    pub fn named<F>(name: &'static str, body: F) -> Self
    where
        F: Fn(&mut Machine) -> Result<(), RuntimeError> + 'static,
    {
        Self {
            name,
            body: Rc::new(body),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Run the quotation against the machine's stacks
    pub fn call(&self, machine: &mut Machine) -> Result<(), RuntimeError> {
        (self.body)(machine)
    }
}

impl fmt::Debug for Quotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Quotation({})", self.name)
    }
}

impl PartialEq for Quotation {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.body, &other.body)
    }
}

/// Value: what programs push, pop and pass around
#[derive(Debug, Clone)]
pub enum Value {
    Nil,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    List(Vec<Value>),
    Quotation(Quotation),
    Effect(Box<Effect>),
    /// An effect variant tag, used when installing handlers
    Tag(EffectTag),
    /// A one-shot continuation over a suspendable computation
    Continuation(OneShot),
    /// An escape-continuation token minted by `callcc`
    Token(EscapeToken),
    /// A continuation-monad value
    Cont(Cont<Outcome, Value>),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "Nil",
            Value::Bool(_) => "Bool",
            Value::Int(_) => "Int",
            Value::Float(_) => "Float",
            Value::String(_) => "String",
            Value::List(_) => "List",
            Value::Quotation(_) => "Quotation",
            Value::Effect(_) => "Effect",
            Value::Tag(_) => "Tag",
            Value::Continuation(_) => "Continuation",
            Value::Token(_) => "Token",
            Value::Cont(_) => "Cont",
        }
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    pub fn into_int(self, op: &'static str) -> Result<i64, RuntimeError> {
        match self {
            Value::Int(n) => Ok(n),
            other => Err(RuntimeError::type_mismatch(op, "Int", other.type_name())),
        }
    }

    pub fn into_string(self, op: &'static str) -> Result<String, RuntimeError> {
        match self {
            Value::String(s) => Ok(s),
            other => Err(RuntimeError::type_mismatch(op, "String", other.type_name())),
        }
    }

    pub fn into_list(self, op: &'static str) -> Result<Vec<Value>, RuntimeError> {
        match self {
            Value::List(items) => Ok(items),
            other => Err(RuntimeError::type_mismatch(op, "List", other.type_name())),
        }
    }

    pub fn into_quotation(self, op: &'static str) -> Result<Quotation, RuntimeError> {
        match self {
            Value::Quotation(q) => Ok(q),
            other => Err(RuntimeError::type_mismatch(
                op,
                "Quotation",
                other.type_name(),
            )),
        }
    }

    pub fn into_effect(self, op: &'static str) -> Result<Effect, RuntimeError> {
        match self {
            Value::Effect(effect) => Ok(*effect),
            other => Err(RuntimeError::type_mismatch(op, "Effect", other.type_name())),
        }
    }

    pub fn into_tag(self, op: &'static str) -> Result<EffectTag, RuntimeError> {
        match self {
            Value::Tag(tag) => Ok(tag),
            other => Err(RuntimeError::type_mismatch(op, "Tag", other.type_name())),
        }
    }

    pub fn into_continuation(self, op: &'static str) -> Result<OneShot, RuntimeError> {
        match self {
            Value::Continuation(k) => Ok(k),
            other => Err(RuntimeError::type_mismatch(
                op,
                "Continuation",
                other.type_name(),
            )),
        }
    }

    pub fn into_token(self, op: &'static str) -> Result<EscapeToken, RuntimeError> {
        match self {
            Value::Token(token) => Ok(token),
            other => Err(RuntimeError::type_mismatch(op, "Token", other.type_name())),
        }
    }

    pub fn into_cont(self, op: &'static str) -> Result<Cont<Outcome, Value>, RuntimeError> {
        match self {
            Value::Cont(cont) => Ok(cont),
            other => Err(RuntimeError::type_mismatch(op, "Cont", other.type_name())),
        }
    }
}

impl From<Effect> for Value {
    fn from(effect: Effect) -> Self {
        Value::Effect(Box::new(effect))
    }
}

impl From<Quotation> for Value {
    fn from(q: Quotation) -> Self {
        Value::Quotation(q)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

// Control values compare by identity
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Quotation(a), Value::Quotation(b)) => a == b,
            (Value::Effect(a), Value::Effect(b)) => a == b,
            (Value::Tag(a), Value::Tag(b)) => a == b,
            (Value::Continuation(a), Value::Continuation(b)) => a.id() == b.id(),
            (Value::Token(a), Value::Token(b)) => a == b,
            (Value::Cont(a), Value::Cont(b)) => a.same_as(b),
            _ => false,
        }
    }
}
