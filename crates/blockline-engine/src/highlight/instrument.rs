use super::MARKER_TEMPLATE;
use crate::generator::{CodeGenerator, GenerateError, StatementHooks};
use crate::workspace::BlockId;
use std::ops::{Deref, DerefMut};

/// Temporarily installs statement hooks on a generator.
///
/// The previous hooks are put back, and the generator re-initialised, when
/// the scope is dropped, whichever way the scope is left.
pub struct HookScope<'g, G: CodeGenerator> {
    generator: &'g mut G,
    workspace: &'g G::Workspace,
    saved: StatementHooks,
}

impl<'g, G: CodeGenerator> HookScope<'g, G> {
    pub fn enter(generator: &'g mut G, workspace: &'g G::Workspace, hooks: StatementHooks) -> Self {
        let saved = generator.statement_hooks().clone();
        generator.set_statement_hooks(hooks);
        generator.init(workspace);
        Self {
            generator,
            workspace,
            saved,
        }
    }
}

impl<G: CodeGenerator> Deref for HookScope<'_, G> {
    type Target = G;

    fn deref(&self) -> &G {
        &*self.generator
    }
}

impl<G: CodeGenerator> DerefMut for HookScope<'_, G> {
    fn deref_mut(&mut self) -> &mut G {
        &mut *self.generator
    }
}

impl<G: CodeGenerator> Drop for HookScope<'_, G> {
    fn drop(&mut self) {
        let saved = std::mem::take(&mut self.saved);
        self.generator.set_statement_hooks(saved);
        self.generator.init(self.workspace);
    }
}

/// The texts produced for one click
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instrumented {
    /// Code of the clicked block alone
    pub block_code: String,
    /// Whole-workspace code with a marker line before every statement; empty
    /// when instrumented generation failed
    pub marked: String,
    /// Whole-workspace code as the user sees it
    pub clean: String,
    /// Code of the last block of the clicked chain, when that is a different block
    pub last_block_code: Option<String>,
}

/// Whole-workspace code with marker comments, hooks restored afterwards
pub fn marked_workspace_code<G: CodeGenerator>(
    generator: &mut G,
    workspace: &G::Workspace,
) -> Result<String, GenerateError> {
    let hooks = StatementHooks::with_prefix(MARKER_TEMPLATE);
    let mut scope = HookScope::enter(generator, workspace, hooks);
    scope.workspace_to_code(workspace)
}

/// Generate every text the line mapping needs for a click on `block`.
///
/// A failure of the instrumented run only loses the markers, and a failure on
/// the chain end only loses `last_block_code`. Failures of the clicked block
/// and the clean workspace are returned.
pub fn instrument<G: CodeGenerator>(
    generator: &mut G,
    workspace: &G::Workspace,
    block: &BlockId,
    chain_end: Option<&BlockId>,
) -> Result<Instrumented, GenerateError> {
    let block_code = generator.block_to_code(workspace, block)?.into_text();

    let marked = match marked_workspace_code(generator, workspace) {
        Ok(marked) => marked,
        Err(err) => {
            log::error!("marker generation failed for block {block}: {err}");
            String::new()
        }
    };

    let clean = generator.workspace_to_code(workspace)?;

    let last_block_code = chain_end.and_then(|end| {
        match generator.block_to_code(workspace, end) {
            Ok(code) => Some(code.into_text()),
            Err(err) => {
                log::error!("chain end generation failed for block {end}: {err}");
                None
            }
        }
    });

    Ok(Instrumented {
        block_code,
        marked,
        clean,
        last_block_code,
    })
}
