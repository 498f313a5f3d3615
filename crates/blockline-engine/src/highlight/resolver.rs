//! Locating a block's marker comment in instrumented output.
//!
//! Several marker lines can match one id (a block can be emitted more than
//! once, and a generator that appends to the marker line leaves only
//! substring matches, where `b1` also matches inside `b10`). Candidates are ranked by how well the code following each marker
//! agrees with the block's own code. The ranking is a best-effort heuristic:
//! two candidates followed by byte-identical code cannot be told apart and
//! the earliest wins.

use super::MARKER_PREFIX;
use crate::workspace::BlockId;

/// Score for a following line equal to the expected block line
pub const EXACT_LINE_SCORE: u32 = 20;
/// Score for a following line containing, or contained in, the expected line
pub const CONTAINED_LINE_SCORE: u32 = 5;
/// Block code lines compared per candidate
pub const MAX_COMPARED_LINES: usize = 10;

/// Scores how well one generated line matches one expected line.
///
/// Both arguments are trimmed and non-empty.
pub trait LineScorer {
    fn score(&self, actual: &str, expected: &str) -> u32;
}

/// Exact equality beats containment beats nothing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentScorer {
    pub exact: u32,
    pub contained: u32,
}

impl Default for ContentScorer {
    fn default() -> Self {
        Self {
            exact: EXACT_LINE_SCORE,
            contained: CONTAINED_LINE_SCORE,
        }
    }
}

impl LineScorer for ContentScorer {
    fn score(&self, actual: &str, expected: &str) -> u32 {
        if actual == expected {
            self.exact
        } else if actual.contains(expected) || expected.contains(actual) {
            self.contained
        } else {
            0
        }
    }
}

/// Marker spellings for `id`: bare, single-quoted and double-quoted
pub fn marker_variants(id: &BlockId) -> [String; 3] {
    [
        format!("{MARKER_PREFIX}{id}"),
        format!("{MARKER_PREFIX}'{id}'"),
        format!("{MARKER_PREFIX}\"{id}\""),
    ]
}

/// Indices of the lines carrying a marker for `id`.
///
/// This narrows the usual candidate set (every line that equals or contains a
/// marker, left to the scorer to rank). Lines that are exactly a marker for
/// `id` win, so a bare `b1` never picks up the marker line of `b10`. Only when
/// no exact line exists do lines merely containing a marker count, and the
/// scorer then ranks those.
pub fn marker_candidates(marked_lines: &[&str], id: &BlockId) -> Vec<usize> {
    let variants = marker_variants(id);
    let matching = |exact: bool| -> Vec<usize> {
        marked_lines
            .iter()
            .enumerate()
            .filter(|(_, line)| {
                let line = line.trim();
                variants.iter().any(|marker| {
                    if exact {
                        line == marker.as_str()
                    } else {
                        line.contains(marker.as_str())
                    }
                })
            })
            .map(|(index, _)| index)
            .collect()
    };

    let exact = matching(true);
    if exact.is_empty() { matching(false) } else { exact }
}

/// Sum of line scores for the code following the marker at `marker_index`
pub fn score_candidate(
    marked_lines: &[&str],
    marker_index: usize,
    block_lines: &[&str],
    scorer: &impl LineScorer,
) -> u32 {
    block_lines
        .iter()
        .zip(marked_lines.iter().skip(marker_index + 1))
        .map(|(expected, actual)| (actual.trim(), expected.trim()))
        .filter(|(actual, expected)| !actual.is_empty() && !expected.is_empty())
        .map(|(actual, expected)| scorer.score(actual, expected))
        .sum()
}

/// Index in `marked_lines` of the marker that belongs to block `id`.
///
/// `block_code` is the block's own generated code, used to pick between
/// several candidates. Returns `None` when no line carries a marker for `id`.
pub fn resolve_marker(
    marked_lines: &[&str],
    id: &BlockId,
    block_code: &str,
    scorer: &impl LineScorer,
    max_compared_lines: usize,
) -> Option<usize> {
    let candidates = marker_candidates(marked_lines, id);
    match candidates.as_slice() {
        [] => None,
        [only] => Some(*only),
        [first, ..] => {
            let block_lines: Vec<&str> = block_code
                .lines()
                .filter(|line| !line.trim().is_empty())
                .take(max_compared_lines)
                .collect();

            let mut best = *first;
            let mut best_score = 0;
            for &candidate in &candidates {
                let score = score_candidate(marked_lines, candidate, &block_lines, scorer);
                log::debug!("marker candidate {candidate} for {id} scored {score}");
                if score > best_score {
                    best = candidate;
                    best_score = score;
                }
            }
            Some(best)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn lines(text: &str) -> Vec<&str> {
        text.lines().collect()
    }

    #[rstest]
    #[case::bare("# block_id:b1")]
    #[case::single_quoted("# block_id:'b1'")]
    #[case::double_quoted("# block_id:\"b1\"")]
    #[case::indented("        # block_id:'b1'")]
    fn test_every_quoting_variant_matches(#[case] marker_line: &str) {
        let marked = format!("a = 0\n{marker_line}\nx = 1\n");
        let marked_lines = lines(&marked);
        let found = resolve_marker(
            &marked_lines,
            &"b1".into(),
            "x = 1\n",
            &ContentScorer::default(),
            MAX_COMPARED_LINES,
        );
        assert_eq!(found, Some(1));
    }

    #[test]
    fn test_no_marker_is_none() {
        let marked_lines = lines("# block_id:'other'\nx = 1\n");
        let found = resolve_marker(
            &marked_lines,
            &"b1".into(),
            "x = 1\n",
            &ContentScorer::default(),
            MAX_COMPARED_LINES,
        );
        assert_eq!(found, None);
    }

    #[test]
    fn test_scoring_picks_matching_candidate() {
        // Trailing text on the marker lines leaves only substring matches,
        // and the marker for b1 is a prefix of the marker for b10
        let marked_lines = lines("# block_id:b10 end\ny = 2\n# block_id:b1 end\nx = 1\n");
        let found = resolve_marker(
            &marked_lines,
            &"b1".into(),
            "x = 1\n",
            &ContentScorer::default(),
            MAX_COMPARED_LINES,
        );
        assert_eq!(found, Some(2));
    }

    #[test]
    fn test_exact_marker_beats_prefix_match() {
        // b10 comes first and is followed by the same code
        let marked_lines = lines("# block_id:b10\nx = 1\n# block_id:b1\nx = 1\n");
        assert_eq!(marker_candidates(&marked_lines, &"b1".into()), vec![2]);
    }

    #[test]
    fn test_substring_markers_used_when_no_exact_line() {
        let marked_lines = lines("# block_id:b1 (loop)\nx = 1\n# block_id:b10 (loop)\ny = 2\n");
        let found = resolve_marker(
            &marked_lines,
            &"b1".into(),
            "x = 1\n",
            &ContentScorer::default(),
            MAX_COMPARED_LINES,
        );
        assert_eq!(marker_candidates(&marked_lines, &"b1".into()), vec![0, 2]);
        assert_eq!(found, Some(0));
    }

    #[test]
    fn test_contained_lines_score_lower_than_exact() {
        let marked_lines = lines("# block_id:b1\nprint(x = 1)\n# block_id:b1\nx = 1\n");
        let scorer = ContentScorer::default();
        let block_lines = ["x = 1"];

        assert_eq!(
            score_candidate(&marked_lines, 0, &block_lines, &scorer),
            CONTAINED_LINE_SCORE
        );
        assert_eq!(
            score_candidate(&marked_lines, 2, &block_lines, &scorer),
            EXACT_LINE_SCORE
        );
    }

    #[test]
    fn test_ties_keep_earliest_candidate() {
        let marked_lines = lines("# block_id:'b1'\nx = 1\n# block_id:'b1'\nx = 1\n");
        let found = resolve_marker(
            &marked_lines,
            &"b1".into(),
            "x = 1\n",
            &ContentScorer::default(),
            MAX_COMPARED_LINES,
        );
        assert_eq!(found, Some(0));
    }

    #[test]
    fn test_blank_lines_are_skipped_in_scoring() {
        let marked_lines = lines("# block_id:'b1'\n\nx = 1\n");
        let score = score_candidate(
            &marked_lines,
            0,
            &["x = 1", "y = 2"],
            &ContentScorer::default(),
        );
        // The blank line pairs with "x = 1" and scores nothing; "x = 1" then
        // pairs with "y = 2" and does not match either
        assert_eq!(score, 0);
    }

    #[test]
    fn test_compared_lines_are_capped() {
        let block_code = "a\nb\nc\n";
        let marked_lines = lines("# block_id:b\nz\nb\nc\n# block_id:b\na\nq\nq\n");
        let scorer = ContentScorer::default();

        let full = resolve_marker(&marked_lines, &"b".into(), block_code, &scorer, 10);
        let capped = resolve_marker(&marked_lines, &"b".into(), block_code, &scorer, 1);

        assert_eq!(full, Some(0));
        assert_eq!(capped, Some(4));
    }

    /// Rewards lines that only partially match
    struct ContainmentOnly;

    impl LineScorer for ContainmentOnly {
        fn score(&self, actual: &str, expected: &str) -> u32 {
            u32::from(actual != expected && actual.contains(expected))
        }
    }

    #[test]
    fn test_custom_scorer_is_used() {
        let marked_lines = lines("# block_id:b\nprint(q)\n# block_id:b\nq\n");

        let default_pick = resolve_marker(
            &marked_lines,
            &"b".into(),
            "q\n",
            &ContentScorer::default(),
            MAX_COMPARED_LINES,
        );
        let custom_pick = resolve_marker(
            &marked_lines,
            &"b".into(),
            "q\n",
            &ContainmentOnly,
            MAX_COMPARED_LINES,
        );

        assert_eq!(default_pick, Some(2));
        assert_eq!(custom_pick, Some(0));
    }
}
