//! Identifier-format grammar compilation and fuzzy OCR correction
//!
//! A declarative format string like `[ZS]d(2,5)L(3)` compiles into the set of
//! concrete fixed-length patterns it can denote; raw OCR text is then coerced
//! onto each length-compatible pattern through a glyph-confusion table and
//! ranked by how many characters had to change.

mod compiler;
mod matcher;

pub use compiler::compile;
pub use matcher::{correct, Correction};

/// One concrete component of a fixed-length pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Component {
    /// Literal text copied verbatim into the corrected output.
    Fixed(String),
    /// A run of exactly `n` digit characters.
    Digits(usize),
    /// A run of exactly `n` letter characters.
    Letters(usize),
}

impl Component {
    fn len(&self) -> usize {
        match self {
            Component::Fixed(text) => text.len(),
            Component::Digits(n) | Component::Letters(n) => *n,
        }
    }
}

/// A fully expanded pattern with a fixed per-component and total length.
///
/// Immutable after construction; `total_len` is cached and never recomputed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    components: Vec<Component>,
    total_len: usize,
}

impl Pattern {
    pub(crate) fn new(components: Vec<Component>) -> Self {
        let total_len = components.iter().map(Component::len).sum();
        Self {
            components,
            total_len,
        }
    }

    pub fn components(&self) -> &[Component] {
        &self.components
    }

    pub fn total_len(&self) -> usize {
        self.total_len
    }
}
