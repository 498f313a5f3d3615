// Benchmark helper functions - Rust's dead code analysis doesn't understand
// that these are used by benchmark files in the same directory
// See: https://users.rust-lang.org/t/cargo-rustc-benches-awarnings/110111/2
use blockline_engine::workspace::{Block, Workspace};

/// `chains` top-level chains of `length` assignments each
#[allow(dead_code)]
pub fn generate_chained_workspace(chains: usize, length: usize) -> Workspace {
    let mut blocks = Vec::with_capacity(chains * length);
    for chain in 0..chains {
        for step in 0..length {
            let block = Block::new("variables_set")
                .with_id(format!("c{chain}_s{step}"))
                .with_field("VAR", format!("v{chain}_{step}"))
                .with_field("VALUE", step.to_string());
            blocks.push(if step + 1 < length {
                block.with_next(format!("c{chain}_s{}", step + 1))
            } else {
                block
            });
        }
    }
    Workspace::from_blocks(blocks)
}

/// The same statement in every top-level block
#[allow(dead_code)]
pub fn generate_repetitive_workspace(chains: usize) -> Workspace {
    let blocks = (0..chains).map(|chain| {
        Block::new("text_print")
            .with_id(format!("p{chain}"))
            .with_field("TEXT", "'same'")
    });
    Workspace::from_blocks(blocks)
}
