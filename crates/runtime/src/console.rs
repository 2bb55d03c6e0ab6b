//! Console effects: `Read(prompt)` and `Write(text)`
//!
//! The effect system never touches a device itself. Programs yield these
//! effects, and whichever handlers are installed decide where the text goes
//! and where input comes from: a terminal, a file, or an in-memory buffer in
//! tests. The handler factories here are generic over `std::io` devices.

use crate::effects::{Effect, EffectTag};
use crate::error::RuntimeError;
use crate::machine::Machine;
use crate::value::{Quotation, Value};
use std::cell::RefCell;
use std::io::{self, BufRead, Write};
use std::rc::Rc;
use tracing::trace;

pub const READ: EffectTag = EffectTag::reserved(2, "Read");
pub const WRITE: EffectTag = EffectTag::reserved(3, "Write");

/// Printed after every read prompt
pub const PROMPT_SUFFIX: &str = "~~~> ";

pub fn read(prompt: impl Into<String>) -> Effect {
    Effect::custom(READ, prompt.into())
}

pub fn write(text: impl Into<String>) -> Effect {
    Effect::custom(WRITE, text.into())
}

/// Stack effect: ( prompt -- Read(prompt) )
pub fn read_effect(machine: &mut Machine) -> Result<(), RuntimeError> {
    let prompt = machine.pop()?.into_string("read_effect")?;
    machine.push(read(prompt));
    Ok(())
}

/// Stack effect: ( text -- Write(text) )
pub fn write_effect(machine: &mut Machine) -> Result<(), RuntimeError> {
    let text = machine.pop()?.into_string("write_effect")?;
    machine.push(write(text));
    Ok(())
}

fn take_text(
    machine: &mut Machine,
    expected: EffectTag,
    op: &'static str,
) -> Result<String, RuntimeError> {
    match machine.pop()?.into_effect(op)? {
        Effect::Custom { tag, payload } if tag == expected => payload.into_string(op),
        other => Err(RuntimeError::type_mismatch(
            op,
            expected.name(),
            other.tag().name(),
        )),
    }
}

/// Handler for `Write`: prints the text and a newline
///
/// Stack effect: ( Write(text) -- )
pub fn write_handler<W>(out: Rc<RefCell<W>>) -> Quotation
where
    W: Write + 'static,
{
    Quotation::named("write-handler", move |m| {
        let text = take_text(m, WRITE, "write-handler")?;
        trace!(bytes = text.len(), "console write");
        let mut out = out.borrow_mut();
        writeln!(out, "{}", text)?;
        out.flush()?;
        Ok(())
    })
}

/// Handler for `Read`: shows the prompt, reads one line
///
/// Stack effect: ( Read(prompt) -- line )
///
/// The line is pushed without its terminator. End of input is an error.
pub fn read_handler<R, W>(input: Rc<RefCell<R>>, prompt_out: Rc<RefCell<W>>) -> Quotation
where
    R: BufRead + 'static,
    W: Write + 'static,
{
    Quotation::named("read-handler", move |m| {
        let prompt = take_text(m, READ, "read-handler")?;
        {
            let mut out = prompt_out.borrow_mut();
            write!(out, "{}{}", prompt, PROMPT_SUFFIX)?;
            out.flush()?;
        }

        let mut line = String::new();
        if input.borrow_mut().read_line(&mut line)? == 0 {
            return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "no input for Read").into());
        }
        let len = line.trim_end_matches(['\n', '\r']).len();
        line.truncate(len);
        trace!(bytes = len, "console read");
        m.push(Value::String(line));
        Ok(())
    })
}

/// Run `body` with `Read` and `Write` handled by the process's stdin/stdout
pub fn with_stdio<T, F>(machine: &mut Machine, body: F) -> Result<T, RuntimeError>
where
    F: FnOnce(&mut Machine) -> Result<T, RuntimeError>,
{
    let stdout = Rc::new(RefCell::new(io::stdout()));
    let stdin = Rc::new(RefCell::new(io::stdin().lock()));
    let read = read_handler(stdin, Rc::clone(&stdout));
    let write = write_handler(stdout);
    machine.with_handler(READ, read, |m| m.with_handler(WRITE, write, body))
}
