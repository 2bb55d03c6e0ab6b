//! Abstract Syntax Tree fragment for definitions
//!
//! Only what dependency analysis needs: which definitions exist and which
//! words their bodies mention. Parsing is done elsewhere.

/// A whole compilation unit
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Program {
    pub words: Vec<WordDef>,
}

/// A named definition: `: name body ;`
#[derive(Debug, Clone, PartialEq)]
pub struct WordDef {
    pub name: String,
    pub body: Vec<Statement>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// Integer literal: pushes value onto stack
    IntLiteral(i64),

    /// Floating-point literal: pushes IEEE 754 double onto stack
    FloatLiteral(f64),

    /// Boolean literal: pushes true/false onto stack
    BoolLiteral(bool),

    /// String literal: pushes string onto stack
    StringLiteral(String),

    /// Word call: a user definition or a builtin
    WordCall { name: String },

    /// Quotation: [ ... ]
    ///
    /// Deferred code pushed as a value; its body still refers to the words
    /// it mentions.
    Quotation { body: Vec<Statement> },
}

impl WordDef {
    pub fn new(name: impl Into<String>, body: Vec<Statement>) -> Self {
        WordDef {
            name: name.into(),
            body,
        }
    }
}

impl Statement {
    pub fn call(name: impl Into<String>) -> Self {
        Statement::WordCall { name: name.into() }
    }
}

impl Program {
    pub fn find_word(&self, name: &str) -> Option<&WordDef> {
        self.words.iter().find(|w| w.name == name)
    }
}
