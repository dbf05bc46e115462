//! Cypher 到 Gremlin 的翻译层
//!
//! 步骤构建契约、可移植程序表示以及发射式后端

pub mod bytecode;
pub mod function;
pub mod groovy;
pub mod predicate;
pub mod step;
pub mod steps;
pub mod token;
pub mod translator;

pub use bytecode::BytecodeSteps;
pub use function::CustomFunction;
pub use groovy::to_groovy;
pub use predicate::P;
pub use step::{Argument, Program, Step, StepKind};
pub use steps::{GremlinSteps, StepArg};
pub use token::{Cardinality, Column, Order, Pop, Scope, T};
pub use translator::{
    Translation, TranslationVisitor, Translator, TranslatorBuilder, TranslatorConfig,
};
