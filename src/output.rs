// SPDX-License-Identifier: MIT OR Apache-2.0

//! Output and color utilities for consistent terminal formatting
//!
//! Provides shared color functions respecting NO_COLOR environment variable.

use colored::Colorize;

use crate::query::VerseResult;

/// Check if colors should be used (respects NO_COLOR env var)
pub fn use_colors() -> bool {
    std::env::var("NO_COLOR").is_err()
}

/// Colorize verse reference (cyan)
pub fn colorize_reference(text: &str, use_color: bool) -> String {
    if use_color {
        text.cyan().to_string()
    } else {
        text.to_string()
    }
}

/// Colorize distance (yellow)
pub fn colorize_distance(distance: f32, use_color: bool) -> String {
    let formatted = format!("{:.4}", distance);
    if use_color {
        formatted.yellow().to_string()
    } else {
        formatted
    }
}

/// Colorize headings (bold)
pub fn colorize_heading(text: &str, use_color: bool) -> String {
    if use_color {
        text.bold().to_string()
    } else {
        text.to_string()
    }
}

/// Colorize warnings (red bold)
pub fn colorize_warning(text: &str, use_color: bool) -> String {
    if use_color {
        text.red().bold().to_string()
    } else {
        text.to_string()
    }
}

/// Human-readable verse reference, e.g. `Genesis 1:1`
pub fn reference(result: &VerseResult) -> String {
    format!("{} {}:{}", result.book, result.chapter, result.verse)
}

/// Renders a ranked result list for the terminal.
pub fn format_results(results: &[VerseResult], use_color: bool) -> String {
    let mut out = String::new();
    for (rank, result) in results.iter().enumerate() {
        out.push_str(&format!(
            "{}. {}\n   Text: {}\n   Distance: {}\n",
            rank + 1,
            colorize_reference(&reference(result), use_color),
            result.text,
            colorize_distance(result.distance, use_color)
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::VerseId;

    #[test]
    fn plain_results_format() {
        let results = vec![VerseResult {
            id: VerseId(1),
            book: "Gen".into(),
            chapter: 1,
            verse: 1,
            text: "In the beginning".into(),
            distance: 0.125,
        }];

        let rendered = format_results(&results, false);
        assert_eq!(
            rendered,
            "1. Gen 1:1\n   Text: In the beginning\n   Distance: 0.1250\n"
        );
    }
}
