use super::catalog::{BlockShape, BlockTemplate, Catalog, ORDER_ATOMIC};
use super::{BlockCode, CodeGenerator, GenerateError, IdQuote, Order, StatementHooks};
use crate::workspace::{Block, BlockId, Workspace};
use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

const PASS: &str = "pass\n";

fn placeholder_regex() -> &'static Regex {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER.get_or_init(|| {
        Regex::new(r"\{([A-Z][A-Z0-9_]*)\}").expect("Invalid placeholder regex")
    })
}

fn splice_regex() -> &'static Regex {
    static SPLICE: OnceLock<Regex> = OnceLock::new();
    SPLICE.get_or_init(|| {
        Regex::new(r"^(\s*)\{>([A-Z][A-Z0-9_]*)\}\s*$").expect("Invalid splice regex")
    })
}

/// Template-driven Python generator.
///
/// Top-level chains are emitted in workspace order with no separator, so the
/// generated program has exactly the lines the blocks produce, preceded by
/// the collected imports and one blank line when any block declares imports.
#[derive(Debug, Clone)]
pub struct PythonGenerator {
    catalog: Catalog,
    hooks: StatementHooks,
    id_quote: IdQuote,
    definitions: Vec<String>,
}

impl Default for PythonGenerator {
    fn default() -> Self {
        Self::new(Catalog::builtin())
    }
}

impl PythonGenerator {
    pub fn new(catalog: Catalog) -> Self {
        Self {
            catalog,
            hooks: StatementHooks::default(),
            id_quote: IdQuote::default(),
            definitions: Vec::new(),
        }
    }

    /// Change how ids are quoted when injected into statement hooks
    pub fn with_id_quote(mut self, quote: IdQuote) -> Self {
        self.id_quote = quote;
        self
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    fn emitter<'a>(&'a mut self, workspace: &'a Workspace) -> Emitter<'a> {
        let Self {
            catalog,
            hooks,
            id_quote,
            definitions,
        } = self;
        Emitter {
            catalog,
            hooks,
            id_quote: *id_quote,
            workspace,
            definitions,
            in_progress: HashSet::new(),
        }
    }
}

impl CodeGenerator for PythonGenerator {
    type Workspace = Workspace;

    fn init(&mut self, _workspace: &Workspace) {
        self.definitions.clear();
    }

    fn block_to_code(
        &mut self,
        workspace: &Workspace,
        id: &BlockId,
    ) -> Result<BlockCode, GenerateError> {
        let mut emitter = self.emitter(workspace);
        let block = emitter.block(id)?;
        match emitter.template(block)?.shape {
            BlockShape::Statement => emitter.statement(id).map(BlockCode::Statement),
            BlockShape::Expression(_) => emitter
                .expression(id)
                .map(|(text, order)| BlockCode::Expression(text, order)),
        }
    }

    fn workspace_to_code(&mut self, workspace: &Workspace) -> Result<String, GenerateError> {
        self.init(workspace);

        let mut emitter = self.emitter(workspace);
        let mut body = String::new();
        for top in workspace.top_blocks() {
            match emitter.template(top)?.shape {
                BlockShape::Statement => body.push_str(&emitter.chain(&top.id)?),
                BlockShape::Expression(_) => {
                    let (text, _) = emitter.expression(&top.id)?;
                    body.push_str(&text);
                    body.push('\n');
                }
            }
        }

        if self.definitions.is_empty() {
            return Ok(body);
        }
        let mut code = self.definitions.join("\n");
        code.push_str("\n\n");
        code.push_str(&body);
        Ok(code)
    }

    fn statement_hooks(&self) -> &StatementHooks {
        &self.hooks
    }

    fn set_statement_hooks(&mut self, hooks: StatementHooks) {
        self.hooks = hooks;
    }
}

/// One generation pass with the generator's fields borrowed separately
struct Emitter<'a> {
    catalog: &'a Catalog,
    hooks: &'a StatementHooks,
    id_quote: IdQuote,
    workspace: &'a Workspace,
    definitions: &'a mut Vec<String>,
    /// Blocks whose code is being emitted further up the call stack
    in_progress: HashSet<BlockId>,
}

impl<'a> Emitter<'a> {
    fn block(&self, id: &BlockId) -> Result<&'a Block, GenerateError> {
        let workspace: &'a Workspace = self.workspace;
        workspace
            .get(id)
            .ok_or_else(|| GenerateError::MissingBlock(id.clone()))
    }

    fn template(&self, block: &Block) -> Result<&'a BlockTemplate, GenerateError> {
        let catalog: &'a Catalog = self.catalog;
        catalog
            .get(&block.kind)
            .ok_or_else(|| GenerateError::UnknownBlockKind {
                id: block.id.clone(),
                kind: block.kind.clone(),
            })
    }

    fn note_imports(&mut self, template: &BlockTemplate) {
        for line in &template.imports {
            if !self.definitions.contains(line) {
                self.definitions.push(line.clone());
            }
        }
    }

    /// Run `emit` for `id`, refusing to re-enter a block it is already inside
    fn guarded<T>(
        &mut self,
        id: &BlockId,
        emit: impl FnOnce(&mut Self) -> Result<T, GenerateError>,
    ) -> Result<T, GenerateError> {
        if !self.in_progress.insert(id.clone()) {
            return Err(GenerateError::Cycle(id.clone()));
        }
        let result = emit(self);
        self.in_progress.remove(id);
        result
    }

    /// A statement chain starting at `first`, following next connections
    fn chain(&mut self, first: &BlockId) -> Result<String, GenerateError> {
        let mut code = String::new();
        let mut visited = HashSet::new();
        let mut current = Some(first);
        while let Some(id) = current {
            if !visited.insert(id) {
                return Err(GenerateError::Cycle(id.clone()));
            }
            code.push_str(&self.statement(id)?);
            current = self.block(id)?.next.as_ref();
        }
        Ok(code)
    }

    /// One statement block with hooks applied
    fn statement(&mut self, id: &BlockId) -> Result<String, GenerateError> {
        self.guarded(id, |emitter| emitter.statement_lines(id))
    }

    fn statement_lines(&mut self, id: &BlockId) -> Result<String, GenerateError> {
        let block = self.block(id)?;
        let template = self.template(block)?;
        if template.shape != BlockShape::Statement {
            return Err(GenerateError::WrongShape {
                id: id.clone(),
                kind: block.kind.clone(),
                expected: "a statement",
            });
        }
        self.note_imports(template);

        let mut code = String::new();
        if let Some(prefix) = &self.hooks.prefix {
            code.push_str(&StatementHooks::inject(prefix, id, self.id_quote));
        }
        for line in &template.lines {
            if let Some(captures) = splice_regex().captures(line) {
                let indent = &captures[1];
                let nested = match block.statements.get(&captures[2]) {
                    Some(first) => self.chain(first)?,
                    None => PASS.to_string(),
                };
                for nested_line in nested.split_inclusive('\n') {
                    if !nested_line.trim().is_empty() {
                        code.push_str(indent);
                    }
                    code.push_str(nested_line);
                }
            } else {
                code.push_str(&self.substitute(line, block, template, false)?);
                code.push('\n');
            }
        }
        if let Some(suffix) = &self.hooks.suffix {
            code.push_str(&StatementHooks::inject(suffix, id, self.id_quote));
        }
        Ok(code)
    }

    fn expression(&mut self, id: &BlockId) -> Result<(String, Order), GenerateError> {
        self.guarded(id, |emitter| emitter.expression_text(id))
    }

    fn expression_text(&mut self, id: &BlockId) -> Result<(String, Order), GenerateError> {
        let block = self.block(id)?;
        let template = self.template(block)?;
        let BlockShape::Expression(order) = template.shape else {
            return Err(GenerateError::WrongShape {
                id: id.clone(),
                kind: block.kind.clone(),
                expected: "an expression",
            });
        };
        self.note_imports(template);

        let mut text = String::new();
        for line in &template.lines {
            text.push_str(&self.substitute(line, block, template, true)?);
        }
        Ok((text, order))
    }

    /// Fill `{NAME}` placeholders; `wrap` parenthesizes non-atomic inputs
    fn substitute(
        &mut self,
        line: &str,
        block: &Block,
        template: &BlockTemplate,
        wrap: bool,
    ) -> Result<String, GenerateError> {
        let mut out = String::with_capacity(line.len());
        let mut last = 0;
        for captures in placeholder_regex().captures_iter(line) {
            let Some(whole) = captures.get(0) else {
                continue;
            };
            let name = &captures[1];
            out.push_str(&line[last..whole.start()]);
            last = whole.end();

            if let Some(value) = block.fields.get(name) {
                out.push_str(value);
            } else if let Some(child) = block.inputs.get(name) {
                let (code, order) = self.expression(child)?;
                if wrap && order > ORDER_ATOMIC {
                    out.push('(');
                    out.push_str(&code);
                    out.push(')');
                } else {
                    out.push_str(&code);
                }
            } else if let Some(default) = template.defaults.get(name) {
                out.push_str(default);
            } else {
                return Err(GenerateError::MissingField {
                    id: block.id.clone(),
                    name: name.to_string(),
                });
            }
        }
        out.push_str(&line[last..]);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::catalog::ORDER_ADDITIVE;
    use crate::tests::{assign, chain_workspace};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_top_level_blocks_concatenate() {
        let workspace = Workspace::from_blocks([assign("b1", "x", "1"), assign("b2", "y", "2")]);
        let mut generator = PythonGenerator::default();

        let code = generator.workspace_to_code(&workspace).unwrap();
        assert_eq!(code, "x = 1\ny = 2\n");
    }

    #[test]
    fn test_block_to_code_excludes_successors() {
        let workspace = chain_workspace(&[("b1", "a", "1"), ("b2", "b", "2")]);
        let mut generator = PythonGenerator::default();

        let code = generator.block_to_code(&workspace, &"b1".into()).unwrap();
        assert_eq!(code, BlockCode::Statement("a = 1\n".to_string()));
    }

    #[test]
    fn test_prefix_marks_every_statement() {
        let workspace = Workspace::from_blocks([
            Block::new("controls_repeat_ext")
                .with_id("loop")
                .with_field("TIMES", "3")
                .with_statement("DO", "p"),
            Block::new("text_print").with_id("p").with_field("TEXT", "'hi'"),
        ]);
        let mut generator = PythonGenerator::default();
        generator.set_statement_hooks(StatementHooks::with_prefix("# block_id:%1\n"));

        let code = generator.workspace_to_code(&workspace).unwrap();
        assert_eq!(
            code,
            "# block_id:'loop'\nfor count in range(3):\n    # block_id:'p'\n    print('hi')\n"
        );
    }

    #[test]
    fn test_empty_statement_input_emits_pass() {
        let workspace = Workspace::from_blocks([Block::new("controls_if").with_id("if")]);
        let mut generator = PythonGenerator::default();

        let code = generator.workspace_to_code(&workspace).unwrap();
        assert_eq!(code, "if False:\n    pass\n");
    }

    #[test]
    fn test_value_inputs_and_parenthesization() {
        let workspace = Workspace::from_blocks([
            Block::new("variables_set")
                .with_id("set")
                .with_field("VAR", "total")
                .with_input("VALUE", "sum"),
            Block::new("math_arithmetic")
                .with_id("sum")
                .with_input("A", "inner")
                .with_field("B", "3"),
            Block::new("math_arithmetic")
                .with_id("inner")
                .with_field("A", "1")
                .with_field("B", "2"),
        ]);
        let mut generator = PythonGenerator::default();

        let code = generator.workspace_to_code(&workspace).unwrap();
        assert_eq!(code, "total = (1 + 2) + 3\n");
    }

    #[test]
    fn test_imports_are_hoisted_once() {
        let workspace = Workspace::from_blocks([
            Block::new("face_ai_init_globals").with_id("g1"),
            Block::new("face_ai_init_globals").with_id("g2"),
        ]);
        let mut generator = PythonGenerator::default();

        let code = generator.workspace_to_code(&workspace).unwrap();
        assert!(code.starts_with("import cv2\nimport os\nimport numpy as np\n\n# shared lesson state\n"));
        assert_eq!(code.matches("import cv2").count(), 1);
    }

    #[test]
    fn test_expression_block_to_code() {
        let workspace = Workspace::from_blocks([Block::new("face_ai_rgb")
            .with_id("c")
            .with_field("R", "1")
            .with_field("G", "2")
            .with_field("B", "3")]);
        let mut generator = PythonGenerator::default();

        let code = generator.block_to_code(&workspace, &"c".into()).unwrap();
        assert_eq!(code, BlockCode::Expression("(1, 2, 3)".to_string(), ORDER_ATOMIC));
    }

    #[test]
    fn test_unknown_kind_fails() {
        let workspace = Workspace::from_blocks([Block::new("mystery").with_id("m")]);
        let mut generator = PythonGenerator::default();

        let err = generator.workspace_to_code(&workspace).unwrap_err();
        assert_eq!(
            err,
            GenerateError::UnknownBlockKind {
                id: "m".into(),
                kind: "mystery".to_string()
            }
        );
    }

    #[test]
    fn test_missing_field_without_default_fails() {
        let mut catalog = Catalog::new();
        catalog.register(BlockTemplate::statement("needs_name", ["hello({NAME})"]));
        let workspace = Workspace::from_blocks([Block::new("needs_name").with_id("n")]);
        let mut generator = PythonGenerator::new(catalog);

        let err = generator.block_to_code(&workspace, &"n".into()).unwrap_err();
        assert!(matches!(err, GenerateError::MissingField { ref name, .. } if name == "NAME"));
    }

    #[test]
    fn test_next_cycle_is_an_error() {
        let workspace = Workspace::from_blocks([
            Block::new("text_print").with_id("root").with_next("a"),
            Block::new("text_print").with_id("a").with_next("b"),
            Block::new("text_print").with_id("b").with_next("a"),
        ]);
        let mut generator = PythonGenerator::default();

        let err = generator.workspace_to_code(&workspace).unwrap_err();
        assert_eq!(err, GenerateError::Cycle("a".into()));
    }

    #[test]
    fn test_statement_input_self_loop_is_an_error() {
        let workspace = Workspace::from_blocks([Block::new("controls_if")
            .with_id("a")
            .with_statement("DO0", "a")]);
        let mut generator = PythonGenerator::default();

        let err = generator.block_to_code(&workspace, &"a".into()).unwrap_err();
        assert_eq!(err, GenerateError::Cycle("a".into()));
    }

    #[test]
    fn test_statement_input_back_to_ancestor_is_an_error() {
        let workspace = Workspace::from_blocks([
            Block::new("controls_repeat_ext").with_id("outer").with_statement("DO", "inner"),
            Block::new("controls_if").with_id("inner").with_statement("DO0", "outer"),
        ]);
        let mut generator = PythonGenerator::default();

        let err = generator.block_to_code(&workspace, &"outer".into()).unwrap_err();
        assert_eq!(err, GenerateError::Cycle("outer".into()));
    }

    #[test]
    fn test_value_input_loop_is_an_error() {
        let workspace = Workspace::from_blocks([
            Block::new("math_arithmetic")
                .with_id("a")
                .with_input("A", "b")
                .with_field("B", "1"),
            Block::new("math_arithmetic")
                .with_id("b")
                .with_input("A", "a")
                .with_field("B", "2"),
        ]);
        let mut generator = PythonGenerator::default();

        let err = generator.block_to_code(&workspace, &"a".into()).unwrap_err();
        assert_eq!(err, GenerateError::Cycle("a".into()));
    }

    #[test]
    fn test_shared_value_input_is_not_a_loop() {
        let workspace = Workspace::from_blocks([
            Block::new("math_arithmetic")
                .with_id("sum")
                .with_input("A", "n")
                .with_input("B", "n"),
            Block::new("math_number").with_id("n").with_field("NUM", "4"),
        ]);
        let mut generator = PythonGenerator::default();

        let code = generator.block_to_code(&workspace, &"sum".into()).unwrap();
        assert_eq!(code, BlockCode::Expression("4 + 4".to_string(), ORDER_ADDITIVE));
    }

    #[test]
    fn test_expression_as_statement_input_is_wrong_shape() {
        let workspace = Workspace::from_blocks([
            Block::new("controls_if").with_id("if").with_statement("DO0", "n"),
            Block::new("math_number").with_id("n"),
        ]);
        let mut generator = PythonGenerator::default();

        let err = generator.workspace_to_code(&workspace).unwrap_err();
        assert!(matches!(err, GenerateError::WrongShape { expected: "a statement", .. }));
    }
}
