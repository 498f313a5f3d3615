use crate::workspace::{BlockGraph, BlockId};
use std::collections::HashSet;

/// Last block reached by following next-statement links from `start`.
///
/// Returns `start` itself when it has no successor. A link back to an already
/// visited block ends the walk at the block before it.
pub fn last_in_chain<W: BlockGraph + ?Sized>(workspace: &W, start: &BlockId) -> BlockId {
    let mut visited = HashSet::from([start]);
    let mut last = start;
    while let Some(next) = workspace.next_block(last) {
        if !visited.insert(next) {
            log::warn!("next-statement links from {start} loop back to {next}");
            break;
        }
        if !workspace.contains(next) {
            break;
        }
        last = next;
    }
    last.clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::{assign, chain_workspace};
    use crate::workspace::{Block, Workspace};

    #[test]
    fn test_single_block_is_its_own_end() {
        let workspace = Workspace::from_blocks([assign("b1", "x", "1")]);
        assert_eq!(last_in_chain(&workspace, &"b1".into()), BlockId::from("b1"));
    }

    #[test]
    fn test_follows_next_links() {
        let workspace = chain_workspace(&[("b1", "a", "1"), ("b2", "b", "2"), ("b3", "c", "3")]);
        assert_eq!(last_in_chain(&workspace, &"b1".into()), BlockId::from("b3"));
        assert_eq!(last_in_chain(&workspace, &"b2".into()), BlockId::from("b3"));
    }

    #[test]
    fn test_stops_on_cycle() {
        let workspace = Workspace::from_blocks([
            Block::new("text_print").with_id("a").with_next("b"),
            Block::new("text_print").with_id("b").with_next("a"),
        ]);
        assert_eq!(last_in_chain(&workspace, &"a".into()), BlockId::from("b"));
    }

    #[test]
    fn test_dangling_next_is_ignored() {
        let workspace = Workspace::from_blocks([assign("b1", "x", "1").with_next("gone")]);
        assert_eq!(last_in_chain(&workspace, &"b1".into()), BlockId::from("b1"));
    }
}
