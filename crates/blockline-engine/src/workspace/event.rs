use super::BlockId;

/// UI element name carried by click events
pub const CLICK_ELEMENT: &str = "click";

/// An entry on the workspace change-event stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkspaceEvent {
    /// Pure UI interaction (click, selection, ...); does not change blocks
    Ui {
        element: String,
        block_id: Option<BlockId>,
    },
    Create {
        block_id: BlockId,
    },
    Delete {
        block_id: BlockId,
    },
    Move {
        block_id: BlockId,
    },
    Change {
        block_id: BlockId,
        name: String,
    },
}

/// What a workspace event means for click handling
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickTarget {
    Block(BlockId),
    EmptyCanvas,
    Ignored,
}

impl WorkspaceEvent {
    pub fn click(block_id: impl Into<BlockId>) -> Self {
        Self::Ui {
            element: CLICK_ELEMENT.to_string(),
            block_id: Some(block_id.into()),
        }
    }

    pub fn canvas_click() -> Self {
        Self::Ui {
            element: CLICK_ELEMENT.to_string(),
            block_id: None,
        }
    }

    /// Classify the event once so downstream code never re-tests strings
    pub fn click_target(&self) -> ClickTarget {
        match self {
            Self::Ui { element, block_id } if element == CLICK_ELEMENT => match block_id {
                Some(id) if !id.as_str().is_empty() => ClickTarget::Block(id.clone()),
                _ => ClickTarget::EmptyCanvas,
            },
            _ => ClickTarget::Ignored,
        }
    }
}
