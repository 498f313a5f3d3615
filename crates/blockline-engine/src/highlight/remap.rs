//! Translating marker positions in instrumented output to clean-code lines.

use super::MARKER_PREFIX;

/// What to do when the line at the expected position does not match the
/// marker's code line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentFallback {
    /// Give up; the block stays unresolved
    Disabled,
    /// Take the matching line closest to the expected position, optionally
    /// no further away than `max_distance` lines
    Nearest { max_distance: Option<usize> },
}

impl Default for ContentFallback {
    fn default() -> Self {
        Self::Nearest { max_distance: None }
    }
}

pub fn is_marker_line(line: &str) -> bool {
    line.trim().starts_with(MARKER_PREFIX)
}

fn is_blank(line: &str) -> bool {
    line.trim().is_empty()
}

/// Equal, or one contains the other. Both sides trimmed and non-empty.
fn lines_correspond(clean: &str, target: &str) -> bool {
    clean == target || clean.contains(target) || target.contains(clean)
}

/// Non-blank, non-marker lines strictly before `index`
pub fn code_lines_before(marked_lines: &[&str], index: usize) -> usize {
    marked_lines
        .iter()
        .take(index)
        .filter(|line| !is_blank(line) && !is_marker_line(line))
        .count()
}

/// Clean-code line holding the statement that follows the marker at
/// `marker_index`.
///
/// The position is predicted by counting code lines ahead of the marker and
/// accepted when its content agrees; otherwise `fallback` decides.
pub fn marker_to_clean_line(
    marked_lines: &[&str],
    marker_index: usize,
    clean_lines: &[&str],
    fallback: ContentFallback,
) -> Option<usize> {
    let expected = code_lines_before(marked_lines, marker_index);
    let target = marked_lines.get(marker_index + 1)?.trim();
    if target.is_empty() {
        return None;
    }

    let positional = clean_lines
        .iter()
        .enumerate()
        .filter(|(_, line)| !is_blank(line))
        .nth(expected);
    if let Some((index, line)) = positional
        && lines_correspond(line.trim(), target)
    {
        return Some(index);
    }

    let ContentFallback::Nearest { max_distance } = fallback else {
        return None;
    };
    let nearest = clean_lines
        .iter()
        .enumerate()
        .filter(|(_, line)| !is_blank(line) && lines_correspond(line.trim(), target))
        .map(|(index, _)| (index, index.abs_diff(expected)))
        .filter(|(_, distance)| max_distance.is_none_or(|max| *distance <= max))
        .min_by_key(|(_, distance)| *distance)
        .map(|(index, _)| index);
    if let Some(index) = nearest {
        log::debug!("content fallback placed '{target}' at line {index}, expected near {expected}");
    }
    nearest
}

/// Last clean line of a block starting at `start` that spans
/// `non_blank_lines` non-blank lines. Blank lines inside the span are covered
/// but not counted. Never runs past the end of `clean_lines`.
pub fn extend_over_block(clean_lines: &[&str], start: usize, non_blank_lines: usize) -> usize {
    if non_blank_lines == 0 || start >= clean_lines.len() {
        return start;
    }

    let mut seen = 0;
    let mut end = start;
    for (index, line) in clean_lines.iter().enumerate().skip(start) {
        end = index;
        if !is_blank(line) {
            seen += 1;
            if seen >= non_blank_lines {
                break;
            }
        }
    }
    end
}

pub fn count_non_blank(code: &str) -> usize {
    code.lines().filter(|line| !is_blank(line)).count()
}
