use crate::generator::{
    BlockCode, CodeGenerator, GenerateError, PythonGenerator, StatementHooks,
};
use crate::workspace::{Block, BlockId, Workspace};
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

/// Create a temporary workspace directory
pub fn create_test_workspace_dir() -> TempDir {
    tempfile::tempdir().unwrap()
}

/// Create a test file with content
pub fn create_test_file(dir: &TempDir, filename: &str, content: &str) -> PathBuf {
    let file_path = dir.path().join(filename);
    fs::write(&file_path, content).unwrap();
    file_path
}

/// `variables_set` block producing `var = value`
pub fn assign(id: &str, var: &str, value: &str) -> Block {
    Block::new("variables_set")
        .with_id(id)
        .with_field("VAR", var)
        .with_field("VALUE", value)
}

/// Assignments linked into one chain, in order
pub fn chain_workspace(steps: &[(&str, &str, &str)]) -> Workspace {
    let blocks = steps.iter().enumerate().map(|(index, (id, var, value))| {
        let block = assign(id, var, value);
        match steps.get(index + 1) {
            Some((next, _, _)) => block.with_next(*next),
            None => block,
        }
    });
    Workspace::from_blocks(blocks)
}

/// Python generator with injectable failures that counts `init` calls
pub struct FlakyGenerator {
    inner: PythonGenerator,
    fail_marked: bool,
    failing_block: Option<BlockId>,
    pub init_calls: usize,
}

impl FlakyGenerator {
    /// Whole-workspace generation fails while a statement prefix is installed
    pub fn failing_when_marked() -> Self {
        Self {
            inner: PythonGenerator::default(),
            fail_marked: true,
            failing_block: None,
            init_calls: 0,
        }
    }

    /// `block_to_code` fails for `id` only
    pub fn failing_on_block(id: &str) -> Self {
        Self {
            inner: PythonGenerator::default(),
            fail_marked: false,
            failing_block: Some(BlockId::from(id)),
            init_calls: 0,
        }
    }
}

impl CodeGenerator for FlakyGenerator {
    type Workspace = Workspace;

    fn init(&mut self, workspace: &Workspace) {
        self.init_calls += 1;
        self.inner.init(workspace);
    }

    fn block_to_code(
        &mut self,
        workspace: &Workspace,
        id: &BlockId,
    ) -> Result<BlockCode, GenerateError> {
        if self.failing_block.as_ref() == Some(id) {
            return Err(GenerateError::MissingBlock(id.clone()));
        }
        self.inner.block_to_code(workspace, id)
    }

    fn workspace_to_code(&mut self, workspace: &Workspace) -> Result<String, GenerateError> {
        if self.fail_marked && self.inner.statement_hooks().prefix.is_some() {
            return Err(GenerateError::MissingBlock(BlockId::from("marker-run")));
        }
        self.inner.workspace_to_code(workspace)
    }

    fn statement_hooks(&self) -> &StatementHooks {
        self.inner.statement_hooks()
    }

    fn set_statement_hooks(&mut self, hooks: StatementHooks) {
        self.inner.set_statement_hooks(hooks);
    }
}
