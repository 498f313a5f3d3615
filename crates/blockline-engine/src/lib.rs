pub mod generator;
pub mod highlight;
pub mod io;
pub mod workspace;

#[cfg(test)]
pub mod tests;

// Re-export key types for easier usage
pub use generator::{CodeGenerator, GenerateError, PythonGenerator, StatementHooks};
pub use highlight::{HighlightError, HighlightPayload, HighlightResult, Highlighter, LineRange};
pub use io::*;
pub use workspace::{Block, BlockGraph, BlockId, ClickTarget, Workspace, WorkspaceEvent};
