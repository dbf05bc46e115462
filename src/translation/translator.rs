//! Translator facade
//!
//! Picks a backend from a [`TranslatorConfig`], drives a
//! [`TranslationVisitor`] against it and hands back the result.

use super::bytecode::BytecodeSteps;
use super::groovy;
use super::step::Program;
use super::steps::GremlinSteps;
use crate::error::{Error, Result};
use crate::metrics;
use crate::traversal::{Traversal, TraversalSteps};
use std::fmt;
use tracing::debug;

/// Anything that can describe itself as a sequence of builder calls, such as
/// a parsed Cypher query.
pub trait TranslationVisitor {
    fn visit<S: GremlinSteps>(&self, steps: &mut S) -> Result<()>;
}

/// Backend selection.
#[derive(Debug, Clone)]
pub enum TranslatorConfig {
    /// Emit a portable [`Program`].
    Bytecode,
    /// Emit Gremlin-Groovy source text.
    GremlinGroovy,
    /// Build onto the given live traversal.
    Traversal(Traversal),
}

/// Result of a translation.
#[derive(Debug, Clone)]
pub enum Translation {
    Program(Program),
    Text(String),
    Traversal(Traversal),
}

impl Translation {
    pub fn into_program(self) -> Result<Program> {
        match self {
            Translation::Program(p) => Ok(p),
            Translation::Traversal(t) => Ok(t.bytecode().clone()),
            Translation::Text(_) => Err(Error::TranslationError(
                "text translation has no program form".to_string(),
            )),
        }
    }

    pub fn into_traversal(self) -> Result<Traversal> {
        match self {
            Translation::Traversal(t) => Ok(t),
            _ => Err(Error::TranslationError(
                "translation is not a live traversal".to_string(),
            )),
        }
    }
}

impl fmt::Display for Translation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Translation::Program(p) => write!(f, "{}", p),
            Translation::Text(text) => f.write_str(text),
            Translation::Traversal(t) => write!(f, "{}", t),
        }
    }
}

pub struct Translator {
    config: TranslatorConfig,
}

pub struct TranslatorBuilder;

impl TranslatorBuilder {
    pub fn bytecode(self) -> Translator {
        Translator::new(TranslatorConfig::Bytecode)
    }

    pub fn gremlin_groovy(self) -> Translator {
        Translator::new(TranslatorConfig::GremlinGroovy)
    }

    pub fn traversal(self, traversal: Traversal) -> Translator {
        Translator::new(TranslatorConfig::Traversal(traversal))
    }
}

impl Translator {
    pub fn new(config: TranslatorConfig) -> Self {
        Self { config }
    }

    pub fn builder() -> TranslatorBuilder {
        TranslatorBuilder
    }

    pub fn config(&self) -> &TranslatorConfig {
        &self.config
    }

    /// Run the visitor against the configured backend.
    pub fn translate<V: TranslationVisitor + ?Sized>(self, visitor: &V) -> Result<Translation> {
        metrics::global_metrics().record_translation();
        let translation = match self.config {
            TranslatorConfig::Bytecode => {
                let mut steps = BytecodeSteps::new();
                visitor.visit(&mut steps)?;
                Translation::Program(steps.current())
            }
            TranslatorConfig::GremlinGroovy => {
                let mut steps = BytecodeSteps::new();
                visitor.visit(&mut steps)?;
                Translation::Text(groovy::to_groovy(&steps.current()))
            }
            TranslatorConfig::Traversal(traversal) => {
                let mut steps = TraversalSteps::new(traversal);
                visitor.visit(&mut steps)?;
                Translation::Traversal(steps.into_traversal())
            }
        };
        debug!("translation: {}", translation);
        Ok(translation)
    }
}
