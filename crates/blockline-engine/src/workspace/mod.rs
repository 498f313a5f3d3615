pub mod event;

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;

pub use event::{ClickTarget, WorkspaceEvent};

/// Identifier of a block within a workspace
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockId(pub String);

impl BlockId {
    /// Create a fresh random identifier
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BlockId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for BlockId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// A single visual block.
///
/// Blocks reference each other by id only; the owning [`Workspace`] resolves
/// the references.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    #[serde(default = "BlockId::generate")]
    pub id: BlockId,
    /// Block type, used to look up the generator template
    pub kind: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub fields: BTreeMap<String, String>,
    /// Value inputs: input name -> id of the plugged-in expression block
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub inputs: BTreeMap<String, BlockId>,
    /// Statement inputs: input name -> id of the first block of the nested chain
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub statements: BTreeMap<String, BlockId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<BlockId>,
}

impl Block {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            id: BlockId::generate(),
            kind: kind.into(),
            fields: BTreeMap::new(),
            inputs: BTreeMap::new(),
            statements: BTreeMap::new(),
            next: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<BlockId>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn with_input(mut self, name: impl Into<String>, block: impl Into<BlockId>) -> Self {
        self.inputs.insert(name.into(), block.into());
        self
    }

    pub fn with_statement(mut self, name: impl Into<String>, block: impl Into<BlockId>) -> Self {
        self.statements.insert(name.into(), block.into());
        self
    }

    pub fn with_next(mut self, block: impl Into<BlockId>) -> Self {
        self.next = Some(block.into());
        self
    }

    /// Every block id this block points at
    fn references(&self) -> impl Iterator<Item = &BlockId> {
        self.next
            .iter()
            .chain(self.inputs.values())
            .chain(self.statements.values())
    }
}

/// Read-only view of block connectivity needed by the highlighter
pub trait BlockGraph {
    fn contains(&self, id: &BlockId) -> bool;

    /// The block connected to `id`'s next-statement connection
    fn next_block(&self, id: &BlockId) -> Option<&BlockId>;
}

/// Flattened entry of [`Workspace::outline`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutlineItem {
    pub id: BlockId,
    pub kind: String,
    pub depth: usize,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct WorkspaceFile {
    #[serde(default)]
    blocks: Vec<Block>,
}

/// Container of all blocks in an editing session.
///
/// Keeps blocks in insertion order; that order decides the order of the
/// top-level chains in generated code.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "WorkspaceFile", into = "WorkspaceFile")]
pub struct Workspace {
    blocks: Vec<Block>,
    index: HashMap<BlockId, usize>,
}

impl From<WorkspaceFile> for Workspace {
    fn from(file: WorkspaceFile) -> Self {
        Self::from_blocks(file.blocks)
    }
}

impl From<Workspace> for WorkspaceFile {
    fn from(workspace: Workspace) -> Self {
        Self {
            blocks: workspace.blocks,
        }
    }
}

impl Workspace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_blocks(blocks: impl IntoIterator<Item = Block>) -> Self {
        let mut workspace = Self::new();
        for block in blocks {
            workspace.add_block(block);
        }
        workspace
    }

    /// Add a block, replacing any existing block with the same id.
    ///
    /// Returns the id of the stored block
    pub fn add_block(&mut self, block: Block) -> BlockId {
        let id = block.id.clone();
        match self.index.get(&id) {
            Some(&position) => self.blocks[position] = block,
            None => {
                self.index.insert(id.clone(), self.blocks.len());
                self.blocks.push(block);
            }
        }
        id
    }

    pub fn get(&self, id: &BlockId) -> Option<&Block> {
        self.index.get(id).map(|&position| &self.blocks[position])
    }

    pub fn blocks(&self) -> impl Iterator<Item = &Block> {
        self.blocks.iter()
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Blocks that no other block references, in insertion order
    pub fn top_blocks(&self) -> Vec<&Block> {
        let referenced: HashSet<&BlockId> =
            self.blocks.iter().flat_map(Block::references).collect();
        self.blocks
            .iter()
            .filter(|block| !referenced.contains(&block.id))
            .collect()
    }

    /// Depth-annotated listing of every reachable block, chains in order and
    /// nested inputs one level deeper than their parent.
    pub fn outline(&self) -> Vec<OutlineItem> {
        let mut items = Vec::new();
        let mut seen = HashSet::new();
        for top in self.top_blocks() {
            self.outline_chain(&top.id, 0, &mut seen, &mut items);
        }
        items
    }

    fn outline_chain(
        &self,
        first: &BlockId,
        depth: usize,
        seen: &mut HashSet<BlockId>,
        items: &mut Vec<OutlineItem>,
    ) {
        let mut current = Some(first.clone());
        while let Some(id) = current {
            let Some(block) = self.get(&id) else {
                return;
            };
            if !seen.insert(id.clone()) {
                return;
            }
            items.push(OutlineItem {
                id: id.clone(),
                kind: block.kind.clone(),
                depth,
            });
            for child in block.inputs.values().chain(block.statements.values()) {
                self.outline_chain(child, depth + 1, seen, items);
            }
            current = block.next.clone();
        }
    }
}

impl BlockGraph for Workspace {
    fn contains(&self, id: &BlockId) -> bool {
        self.index.contains_key(id)
    }

    fn next_block(&self, id: &BlockId) -> Option<&BlockId> {
        self.get(id).and_then(|block| block.next.as_ref())
    }
}
