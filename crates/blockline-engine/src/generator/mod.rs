//! Code generation seam.
//!
//! The highlighter only talks to a [`CodeGenerator`]; [`PythonGenerator`] is
//! the reference implementation driven by a template [`Catalog`].

pub mod catalog;
pub mod python;

use crate::workspace::{BlockGraph, BlockId};

pub use catalog::{BlockShape, BlockTemplate, Catalog};
pub use python::PythonGenerator;

/// Operator precedence of an expression, lower binds tighter
pub type Order = u8;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenerateError {
    #[error("Block not found: {0}")]
    MissingBlock(BlockId),
    #[error("Unknown block kind '{kind}' on block {id}")]
    UnknownBlockKind { id: BlockId, kind: String },
    #[error("Block {id} has no value for '{name}'")]
    MissingField { id: BlockId, name: String },
    #[error("Block {id} of kind '{kind}' cannot be used as {expected}")]
    WrongShape {
        id: BlockId,
        kind: String,
        expected: &'static str,
    },
    #[error("Block connections loop back to block {0}")]
    Cycle(BlockId),
}

/// Output of generating a single block: statement text, or an expression
/// with its precedence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockCode {
    Statement(String),
    Expression(String, Order),
}

impl BlockCode {
    pub fn text(&self) -> &str {
        match self {
            Self::Statement(text) | Self::Expression(text, _) => text,
        }
    }

    pub fn into_text(self) -> String {
        match self {
            Self::Statement(text) | Self::Expression(text, _) => text,
        }
    }
}

/// How a generator quotes a block id substituted into a hook template
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum IdQuote {
    Bare,
    #[default]
    Single,
    Double,
}

impl IdQuote {
    pub fn wrap(self, id: &BlockId) -> String {
        match self {
            Self::Bare => id.to_string(),
            Self::Single => format!("'{id}'"),
            Self::Double => format!("\"{id}\""),
        }
    }
}

/// Text emitted around every generated statement.
///
/// [`StatementHooks::ID_PLACEHOLDER`] is replaced by the emitting block's id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatementHooks {
    pub prefix: Option<String>,
    pub suffix: Option<String>,
}

impl StatementHooks {
    pub const ID_PLACEHOLDER: &str = "%1";

    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: Some(prefix.into()),
            suffix: None,
        }
    }

    /// Substitute the placeholder with the quoted block id
    pub fn inject(template: &str, id: &BlockId, quote: IdQuote) -> String {
        template.replace(Self::ID_PLACEHOLDER, &quote.wrap(id))
    }
}

/// The code generator collaborator.
///
/// Implementations hold the statement hook configuration as mutable state;
/// callers that change it must restore it and call [`CodeGenerator::init`]
/// again afterwards.
pub trait CodeGenerator {
    type Workspace: BlockGraph + ?Sized;

    /// Reset per-run generator state for `workspace`
    fn init(&mut self, workspace: &Self::Workspace);

    /// Code for one block on its own, never including its successors
    fn block_to_code(
        &mut self,
        workspace: &Self::Workspace,
        id: &BlockId,
    ) -> Result<BlockCode, GenerateError>;

    fn workspace_to_code(&mut self, workspace: &Self::Workspace) -> Result<String, GenerateError>;

    fn statement_hooks(&self) -> &StatementHooks;

    fn set_statement_hooks(&mut self, hooks: StatementHooks);
}
