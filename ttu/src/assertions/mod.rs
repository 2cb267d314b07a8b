use std::fmt::Display;

use ttu_proc_macro::wraps_base_error;

pub mod checker;
pub use checker::{AssertionsChecker, NamedPredicate};

pub mod subject;
pub use subject::{ComponentMatcher, LayersTraceSubject, WindowManagerTraceSubject};

/// One itemized piece of a failure report
#[derive(Debug, Clone, PartialEq)]
pub struct Fact {
    pub key: String,
    pub value: String,
}

impl Fact {
    pub fn new<K: ToString + ?Sized, V: ToString + ?Sized>(key: &K, value: &V) -> Self {
        Self {
            key: key.to_string(),
            value: value.to_string(),
        }
    }
}

impl Display for Fact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.key, self.value)
    }
}

/// A failed check, reported as facts rather than one opaque string so a test
/// runner can render each item on its own line
#[derive(Debug, Clone)]
pub struct AssertionFailure {
    facts: Vec<Fact>,
}

impl AssertionFailure {
    pub fn new(facts: Vec<Fact>) -> Self {
        Self { facts }
    }

    pub fn facts(&self) -> &[Fact] {
        &self.facts
    }
}

impl Display for AssertionFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, fact) in self.facts.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", fact)?;
        }
        Ok(())
    }
}

#[wraps_base_error]
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("assertion failed:\n{0}")]
    Failed(AssertionFailure),
}

impl Error {
    pub fn failed(facts: Vec<Fact>) -> Self {
        Self::Failed(AssertionFailure::new(facts))
    }

    /// The itemized facts of a failure, if this is one
    pub fn facts(&self) -> Option<&[Fact]> {
        match self {
            Self::Failed(failure) => Some(failure.facts()),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
