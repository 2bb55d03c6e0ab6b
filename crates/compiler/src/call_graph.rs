//! Definition dependency analysis
//!
//! Builds the graph of which definitions mention which other definitions and
//! resolves it into groups with [`crate::graph::cycles`]. Groups with more
//! than one member are mutually recursive definitions that have to be
//! processed together.
//!
//! # Usage
//!
//! ```ignore
//! let graph = DefinitionGraph::build(&program);
//! for group in graph.groups() {
//!     // process the definitions in `group` together
//! }
//! ```
//!
//! # Implementation Details
//!
//! - **Builtins**: references to names that are not definitions in the
//!   program are left out of the graph
//! - **Quotations**: references inside quotation bodies count
//! - **Grouping**: inherits the resolver's peel-one-cycle behaviour, so when
//!   cycles overlap a word can end up outside the group it also cycles with

use crate::ast::{Program, Statement};
use crate::graph::cycles;
use std::collections::HashSet;
use tracing::debug;

/// Which definitions refer to which, and the resulting groups
#[derive(Debug, Clone)]
pub struct DefinitionGraph {
    /// (definition, definitions it refers to), in program order
    edges: Vec<(String, Vec<String>)>,
    groups: Vec<Vec<String>>,
}

impl DefinitionGraph {
    /// Build the graph for a program
    pub fn build(program: &Program) -> Self {
        let known: HashSet<&str> = program.words.iter().map(|w| w.name.as_str()).collect();

        let edges: Vec<(String, Vec<String>)> = program
            .words
            .iter()
            .map(|word| {
                let mut refs = Vec::new();
                extract_references(&word.body, &known, &mut refs);
                (word.name.clone(), refs)
            })
            .collect();

        let groups: Vec<Vec<String>> = cycles(edges.clone()).collect();
        debug!(
            definitions = edges.len(),
            groups = groups.len(),
            "resolved definition groups"
        );

        DefinitionGraph { edges, groups }
    }

    /// Resolver output: every definition, in processing groups
    pub fn groups(&self) -> &[Vec<String>] {
        &self.groups
    }

    /// Groups that involve recursion: several members, or one member that
    /// refers to itself
    pub fn recursive_groups(&self) -> Vec<&[String]> {
        self.groups
            .iter()
            .filter(|group| match group.as_slice() {
                [] => false,
                [single] => self.refers_to(single, single),
                _ => true,
            })
            .map(|group| group.as_slice())
            .collect()
    }

    /// Whether `word` is part of a recursive group
    pub fn is_recursive(&self, word: &str) -> bool {
        self.recursive_groups()
            .iter()
            .any(|group| group.iter().any(|w| w == word))
    }

    /// Whether both words sit in the same recursive group
    pub fn are_mutually_recursive(&self, first: &str, second: &str) -> bool {
        self.recursive_groups().iter().any(|group| {
            group.iter().any(|w| w == first) && group.iter().any(|w| w == second)
        })
    }

    /// The definitions `word` refers to, in order of first mention
    pub fn references(&self, word: &str) -> Option<&[String]> {
        self.edges
            .iter()
            .find(|(name, _)| name == word)
            .map(|(_, refs)| refs.as_slice())
    }

    fn refers_to(&self, from: &str, to: &str) -> bool {
        self.references(from)
            .is_some_and(|refs| refs.iter().any(|r| r == to))
    }
}

/// Collect references to known definitions, descending into quotations
fn extract_references(statements: &[Statement], known: &HashSet<&str>, refs: &mut Vec<String>) {
    for stmt in statements {
        match stmt {
            Statement::WordCall { name } => {
                if known.contains(name.as_str()) && !refs.contains(name) {
                    refs.push(name.clone());
                }
            }
            Statement::Quotation { body } => extract_references(body, known, refs),
            // Literals don't refer to anything
            Statement::IntLiteral(_)
            | Statement::FloatLiteral(_)
            | Statement::BoolLiteral(_)
            | Statement::StringLiteral(_) => {}
        }
    }
}
