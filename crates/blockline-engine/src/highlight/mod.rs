/*!
 * # Block Click Highlighting
 *
 * Maps a click on a block to the range of lines that block (and, for the head
 * of a chain, the whole chain) occupies in the generated program.
 *
 * ## How a click is resolved
 *
 * 1. **Instrument** (`instrument`): generate the clicked block's own code,
 *    then the whole program twice: once with a `# block_id:<id>` comment
 *    injected before every statement, once clean. The marker hooks are
 *    installed through `HookScope`, which restores the generator's previous
 *    hooks when it goes out of scope.
 * 2. **Resolve** (`resolver`): find the marker line for the clicked block
 *    (and the chain's last block), scoring candidates against the block's own
 *    code when the id matches more than one marker.
 * 3. **Remap** (`remap`): count code lines ahead of the marker to predict the
 *    clean line, confirm by content, fall back to the nearest content match,
 *    then extend the start line over the block's non-blank lines.
 *
 * Every step works on fresh strings; nothing outlives the call except the
 * generator, whose hook configuration is unchanged afterwards.
 *
 * ## Usage
 *
 * ```rust
 * use blockline_engine::generator::PythonGenerator;
 * use blockline_engine::highlight::Highlighter;
 * use blockline_engine::workspace::{Block, Workspace, WorkspaceEvent};
 *
 * let workspace = Workspace::from_blocks([
 *     Block::new("variables_set").with_id("b1").with_field("VAR", "x").with_field("VALUE", "1"),
 * ]);
 * let highlighter = Highlighter::new(PythonGenerator::default());
 *
 * let mut listener = highlighter.block_click_listener(
 *     &workspace,
 *     |result| println!("lines {}..={}", result.start_line(), result.end_line()),
 *     |err| eprintln!("{err}"),
 * );
 * listener(&WorkspaceEvent::click("b1"));
 * ```
 */

pub mod chain;
pub mod instrument;
pub mod remap;
pub mod resolver;

use crate::generator::{CodeGenerator, GenerateError};
use crate::workspace::{BlockGraph, BlockId, ClickTarget, WorkspaceEvent};
use parking_lot::Mutex;
use serde::Serialize;

pub use instrument::{HookScope, Instrumented};
pub use remap::ContentFallback;
pub use resolver::{
    CONTAINED_LINE_SCORE, ContentScorer, EXACT_LINE_SCORE, LineScorer, MAX_COMPARED_LINES,
};

/// Start of every marker comment line
pub const MARKER_PREFIX: &str = "# block_id:";
/// Statement prefix installed while generating instrumented code
pub const MARKER_TEMPLATE: &str = "# block_id:%1\n";

#[derive(Debug, thiserror::Error)]
pub enum HighlightError {
    #[error("Code generation failed: {0}")]
    Generate(#[from] GenerateError),
}

/// Inclusive, zero-based range of lines in the clean code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LineRange {
    pub start: usize,
    pub end: usize,
}

impl LineRange {
    pub fn contains(&self, line: usize) -> bool {
        (self.start..=self.end).contains(&line)
    }

    pub fn overlaps(&self, other: &LineRange) -> bool {
        self.start <= other.end && other.start <= self.end
    }
}

/// Outcome delivered to the success callback
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HighlightResult {
    pub block_code: String,
    pub workspace_code: String,
    /// `None` when the block could not be located in the clean code
    pub range: Option<LineRange>,
    /// Set for clicks on empty canvas: drop any current highlight
    pub clear: bool,
}

impl HighlightResult {
    pub fn cleared() -> Self {
        Self {
            clear: true,
            ..Self::default()
        }
    }

    /// First highlighted line, `-1` when unresolved
    pub fn start_line(&self) -> i64 {
        self.range.map_or(-1, |range| range.start as i64)
    }

    /// Last highlighted line, `-1` when unresolved
    pub fn end_line(&self) -> i64 {
        self.range.map_or(-1, |range| range.end as i64)
    }

    pub fn to_payload(&self) -> HighlightPayload {
        HighlightPayload {
            block_code: self.block_code.clone(),
            workspace_code: self.workspace_code.clone(),
            start_line: self.start_line(),
            end_line: self.end_line(),
            clear: self.clear.then_some(true),
        }
    }
}

/// Wire shape of a [`HighlightResult`] for UI layers
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HighlightPayload {
    pub block_code: String,
    pub workspace_code: String,
    pub start_line: i64,
    pub end_line: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clear: Option<bool>,
}

/// Knobs of the line matching heuristics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchTuning {
    /// Block code lines compared when ranking marker candidates
    pub max_compared_lines: usize,
    pub fallback: ContentFallback,
}

impl Default for MatchTuning {
    fn default() -> Self {
        Self {
            max_compared_lines: MAX_COMPARED_LINES,
            fallback: ContentFallback::default(),
        }
    }
}

/// Resolves block clicks against a code generator.
///
/// The generator sits behind a mutex: instrumentation swaps its statement
/// hooks, so every generation call made through the highlighter, including
/// [`Highlighter::workspace_code`], is serialised with click handling.
pub struct Highlighter<G, S = ContentScorer> {
    generator: Mutex<G>,
    scorer: S,
    tuning: MatchTuning,
}

impl<G: CodeGenerator> Highlighter<G> {
    pub fn new(generator: G) -> Self {
        Self {
            generator: Mutex::new(generator),
            scorer: ContentScorer::default(),
            tuning: MatchTuning::default(),
        }
    }
}

impl<G: CodeGenerator, S: LineScorer> Highlighter<G, S> {
    pub fn with_tuning(mut self, tuning: MatchTuning) -> Self {
        self.tuning = tuning;
        self
    }

    pub fn with_scorer<T: LineScorer>(self, scorer: T) -> Highlighter<G, T> {
        Highlighter {
            generator: self.generator,
            scorer,
            tuning: self.tuning,
        }
    }

    pub fn tuning(&self) -> &MatchTuning {
        &self.tuning
    }

    pub fn scorer(&self) -> &S {
        &self.scorer
    }

    /// Run `f` with exclusive access to the generator
    pub fn with_generator<R>(&self, f: impl FnOnce(&mut G) -> R) -> R {
        f(&mut self.generator.lock())
    }

    /// Clean whole-workspace code, for live code views
    pub fn workspace_code(&self, workspace: &G::Workspace) -> Result<String, GenerateError> {
        self.generator.lock().workspace_to_code(workspace)
    }

    /// Generate code for `block_id` and locate it in the clean output.
    ///
    /// `Ok(None)` means the id does not name a block in `workspace`.
    pub fn highlight(
        &self,
        workspace: &G::Workspace,
        block_id: &BlockId,
    ) -> Result<Option<HighlightResult>, HighlightError> {
        if !workspace.contains(block_id) {
            return Ok(None);
        }

        let chain_end = chain::last_in_chain(workspace, block_id);
        let chain_end = (chain_end != *block_id).then_some(chain_end);

        let texts = {
            let mut generator = self.generator.lock();
            instrument::instrument(&mut *generator, workspace, block_id, chain_end.as_ref())?
        };

        let range = self.locate(&texts, block_id, chain_end.as_ref());
        log::debug!("block {block_id} resolved to {range:?}");

        Ok(Some(HighlightResult {
            block_code: texts.block_code,
            workspace_code: texts.clean,
            range,
            clear: false,
        }))
    }

    fn locate(
        &self,
        texts: &Instrumented,
        block_id: &BlockId,
        chain_end: Option<&BlockId>,
    ) -> Option<LineRange> {
        let marked_lines: Vec<&str> = texts.marked.lines().collect();
        let clean_lines: Vec<&str> = texts.clean.lines().collect();
        let max_compared = self.tuning.max_compared_lines;
        let fallback = self.tuning.fallback;

        let start_marker = resolver::resolve_marker(
            &marked_lines,
            block_id,
            &texts.block_code,
            &self.scorer,
            max_compared,
        )?;
        let start = remap::marker_to_clean_line(&marked_lines, start_marker, &clean_lines, fallback)?;
        let mut end = remap::extend_over_block(
            &clean_lines,
            start,
            remap::count_non_blank(&texts.block_code),
        );

        if let (Some(last), Some(last_code)) = (chain_end, texts.last_block_code.as_deref())
            && let Some(end_marker) = resolver::resolve_marker(
                &marked_lines,
                last,
                last_code,
                &self.scorer,
                max_compared,
            )
            && end_marker > start_marker
            && let Some(last_start) =
                remap::marker_to_clean_line(&marked_lines, end_marker, &clean_lines, fallback)
        {
            let last_end =
                remap::extend_over_block(&clean_lines, last_start, remap::count_non_blank(last_code));
            end = last_end.max(start);
        }

        Some(LineRange { start, end })
    }

    /// Handle one workspace event.
    ///
    /// Returns `true` only when the event was a click on a live block and its
    /// code was generated; the result then went to `on_success`. Clicks on
    /// empty canvas send [`HighlightResult::cleared`] to `on_success` and
    /// return `false`. Generation errors go to `on_error`.
    pub fn handle_block_click<F, E>(
        &self,
        event: &WorkspaceEvent,
        workspace: &G::Workspace,
        mut on_success: F,
        mut on_error: E,
    ) -> bool
    where
        F: FnMut(HighlightResult),
        E: FnMut(HighlightError),
    {
        let block_id = match event.click_target() {
            ClickTarget::Ignored => return false,
            ClickTarget::EmptyCanvas => {
                on_success(HighlightResult::cleared());
                return false;
            }
            ClickTarget::Block(block_id) => block_id,
        };

        match self.highlight(workspace, &block_id) {
            Ok(Some(result)) => {
                on_success(result);
                true
            }
            Ok(None) => false,
            Err(err) => {
                log::error!("highlighting block {block_id} failed: {err}");
                on_error(err);
                false
            }
        }
    }

    /// A listener for a workspace event stream that feeds every event to
    /// [`Highlighter::handle_block_click`]
    pub fn block_click_listener<'a, F, E>(
        &'a self,
        workspace: &'a G::Workspace,
        mut on_success: F,
        mut on_error: E,
    ) -> impl FnMut(&WorkspaceEvent) + 'a
    where
        F: FnMut(HighlightResult) + 'a,
        E: FnMut(HighlightError) + 'a,
    {
        move |event| {
            self.handle_block_click(event, workspace, &mut on_success, &mut on_error);
        }
    }
}
