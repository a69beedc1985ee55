use crate::error::IngestError;
use crate::extractor::PageText;
use crate::models::CleaningOptions;
use regex::Regex;
use std::collections::{HashMap, HashSet};

const PAGE_NUMBER_PATTERN: &str = r"(?i)^\s*(?:Page\s*)?\d+(?:\s+of\s+\d+)?\s*$";
const LIST_MARKER_PATTERN: &str = r"^\s*(?:\d+\.\s*|[•◦]+\s*)$";
const HYPHEN_BREAK_PATTERN: &str = r"(\w+)-\s*\n\s*(\w+)";
const HORIZONTAL_SPACE_PATTERN: &str = r"[ \t]+";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepeatedLines {
    pub headers: HashSet<String>,
    pub footers: HashSet<String>,
}

impl RepeatedLines {
    pub fn contains(&self, line: &str) -> bool {
        let trimmed = line.trim();
        self.headers.contains(trimmed) || self.footers.contains(trimmed)
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_empty() && self.footers.is_empty()
    }
}

/// Finds lines repeated in the top or bottom `hf_lines` non-empty lines of
/// more than half of the pages.
///
/// A line is counted at most once per page block, and the threshold is
/// strict: on `n` pages a line must appear in at least `n / 2 + 1` blocks.
pub fn detect_repeated_lines(pages: &[PageText], hf_lines: usize) -> RepeatedLines {
    if pages.len() < 2 || hf_lines == 0 {
        return RepeatedLines::default();
    }

    let mut top_counts: HashMap<String, usize> = HashMap::new();
    let mut bottom_counts: HashMap<String, usize> = HashMap::new();

    for page in pages {
        let lines = page
            .text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect::<Vec<_>>();

        let top = lines.iter().take(hf_lines).copied().collect::<HashSet<_>>();
        let bottom = lines
            .iter()
            .skip(lines.len().saturating_sub(hf_lines))
            .copied()
            .collect::<HashSet<_>>();

        for line in top {
            *top_counts.entry(line.to_string()).or_default() += 1;
        }
        for line in bottom {
            *bottom_counts.entry(line.to_string()).or_default() += 1;
        }
    }

    let threshold = pages.len() / 2;
    let over_threshold = |counts: HashMap<String, usize>| {
        counts
            .into_iter()
            .filter(|(_, count)| *count > threshold)
            .map(|(line, _)| line)
            .collect::<HashSet<_>>()
    };

    RepeatedLines {
        headers: over_threshold(top_counts),
        footers: over_threshold(bottom_counts),
    }
}

#[derive(Debug, Clone)]
pub struct TextCleaner {
    options: CleaningOptions,
    page_number: Regex,
    list_marker: Regex,
    hyphen_break: Regex,
    horizontal_space: Regex,
}

impl TextCleaner {
    pub fn new(options: CleaningOptions) -> Result<Self, IngestError> {
        Ok(Self {
            options,
            page_number: Regex::new(PAGE_NUMBER_PATTERN)?,
            list_marker: Regex::new(LIST_MARKER_PATTERN)?,
            hyphen_break: Regex::new(HYPHEN_BREAK_PATTERN)?,
            horizontal_space: Regex::new(HORIZONTAL_SPACE_PATTERN)?,
        })
    }

    pub fn options(&self) -> &CleaningOptions {
        &self.options
    }

    pub fn is_page_number_line(&self, line: &str) -> bool {
        self.page_number.is_match(line)
    }

    pub fn is_list_marker_line(&self, line: &str) -> bool {
        self.list_marker.is_match(line)
    }

    pub fn clean_document(&self, pages: &[PageText]) -> String {
        let repeated = if self.options.remove_headers_footers {
            detect_repeated_lines(pages, self.options.hf_lines)
        } else {
            RepeatedLines::default()
        };

        pages
            .iter()
            .map(|page| self.clean_page(&page.text, &repeated))
            .collect::<Vec<_>>()
            .join(&self.options.line_sep)
    }

    pub fn clean_page(&self, raw: &str, repeated: &RepeatedLines) -> String {
        let kept = raw
            .lines()
            .filter(|line| !repeated.contains(line))
            .filter(|line| !self.is_page_number_line(line) && !self.is_list_marker_line(line))
            .collect::<Vec<_>>();

        let mut text = kept.join(&self.options.line_sep);

        if self.options.cleanup_hyphens {
            text = self.hyphen_break.replace_all(&text, "${1}${2}").into_owned();
        }

        if self.options.normalize_whitespace {
            text = self.horizontal_space.replace_all(&text, " ").into_owned();
        }

        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(number: u32, text: &str) -> PageText {
        PageText {
            number,
            text: text.to_string(),
        }
    }

    fn cleaner() -> TextCleaner {
        TextCleaner::new(CleaningOptions::default()).unwrap()
    }

    #[test]
    fn page_number_lines_are_recognized() {
        let cleaner = cleaner();
        assert!(cleaner.is_page_number_line("12"));
        assert!(cleaner.is_page_number_line("  Page 3  "));
        assert!(cleaner.is_page_number_line("page 7"));
        assert!(cleaner.is_page_number_line("Page 3 of 10"));
        assert!(cleaner.is_page_number_line("3 of 10"));
        assert!(!cleaner.is_page_number_line("Chapter 3"));
        assert!(!cleaner.is_page_number_line("3 apples"));
    }

    #[test]
    fn list_markers_and_bullets_are_recognized() {
        let cleaner = cleaner();
        assert!(cleaner.is_list_marker_line("58."));
        assert!(cleaner.is_list_marker_line("  59.  "));
        assert!(cleaner.is_list_marker_line("•"));
        assert!(cleaner.is_list_marker_line("◦◦ "));
        assert!(!cleaner.is_list_marker_line("1. First item"));
        assert!(!cleaner.is_list_marker_line("• bullet with text"));
    }

    #[test]
    fn page_number_line_is_dropped_but_chapter_heading_kept() {
        let cleaned = cleaner().clean_page(
            "Chapter 3\nIn a village of La Mancha\nPage 3 of 10",
            &RepeatedLines::default(),
        );
        assert_eq!(cleaned, "Chapter 3\nIn a village of La Mancha");
    }

    #[test]
    fn header_on_majority_of_pages_is_removed_everywhere() {
        let pages = vec![
            page(1, "Don Quixote\nFirst body line\nMore text"),
            page(2, "Don Quixote\nSecond body line\nMore text"),
            page(3, "Don Quixote\nThird body line\nMore text"),
            page(4, "Fourth body line\nMore text\nDon Quixote appears here? no\nDon Quixote"),
        ];

        let repeated = detect_repeated_lines(&pages, 1);
        assert!(repeated.headers.contains("Don Quixote"));

        let cleaned = cleaner().clean_document(&pages);
        assert!(!cleaned.lines().any(|line| line == "Don Quixote"));
        assert!(cleaned.contains("Don Quixote appears here? no"));
    }

    #[test]
    fn header_threshold_is_strictly_more_than_half() {
        for total in 2..=9usize {
            let boundary = total / 2;
            let build = |hits: usize| {
                (0..total)
                    .map(|index| {
                        let text = if index < hits {
                            format!("Running Title\nbody {index}")
                        } else {
                            format!("Other {index}\nbody {index}")
                        };
                        page(index as u32 + 1, &text)
                    })
                    .collect::<Vec<_>>()
            };

            let at_boundary = detect_repeated_lines(&build(boundary), 1);
            assert!(
                !at_boundary.headers.contains("Running Title"),
                "{boundary} of {total} pages must not be a header"
            );

            let above = detect_repeated_lines(&build(boundary + 1), 1);
            assert!(
                above.headers.contains("Running Title"),
                "{} of {total} pages must be a header",
                boundary + 1
            );
        }
    }

    #[test]
    fn footers_are_detected_from_the_bottom_block() {
        let pages = vec![
            page(1, "alpha\nbeta\nACME Manual"),
            page(2, "gamma\ndelta\nACME Manual\n\n"),
            page(3, "epsilon\nzeta\nsomething else"),
        ];

        let repeated = detect_repeated_lines(&pages, 1);
        assert!(repeated.footers.contains("ACME Manual"));
        assert!(repeated.headers.is_empty());
    }

    #[test]
    fn repeated_line_counts_once_per_page() {
        let pages = vec![
            page(1, "Twice\nTwice\nbody"),
            page(2, "first\nsecond\nbody two"),
            page(3, "third\nfourth\nbody three"),
        ];

        let repeated = detect_repeated_lines(&pages, 3);
        assert!(!repeated.headers.contains("Twice"));
    }

    #[test]
    fn single_page_documents_keep_their_lines() {
        let pages = vec![page(1, "Title\nBody")];
        assert!(detect_repeated_lines(&pages, 3).is_empty());
        assert_eq!(cleaner().clean_document(&pages), "Title\nBody");
    }

    #[test]
    fn empty_document_cleans_to_empty_string() {
        assert_eq!(cleaner().clean_document(&[]), "");
    }

    #[test]
    fn hyphenated_line_breaks_are_joined() {
        let cleaned = cleaner().clean_page(
            "the ingenious gentle-\nman of La Mancha",
            &RepeatedLines::default(),
        );
        assert_eq!(cleaned, "the ingenious gentleman of La Mancha");
    }

    #[test]
    fn hyphen_cleanup_can_be_disabled() {
        let options = CleaningOptions {
            cleanup_hyphens: false,
            ..CleaningOptions::default()
        };
        let cleaner = TextCleaner::new(options).unwrap();
        let cleaned = cleaner.clean_page("gentle-\nman", &RepeatedLines::default());
        assert_eq!(cleaned, "gentle-\nman");
    }

    #[test]
    fn spaces_and_tabs_collapse_but_newlines_survive() {
        let cleaned = cleaner().clean_page("A  \t lot   of\nspacing\t\there", &RepeatedLines::default());
        assert_eq!(cleaned, "A lot of\nspacing here");
    }

    #[test]
    fn pages_are_joined_with_the_separator() {
        let options = CleaningOptions {
            line_sep: " | ".to_string(),
            remove_headers_footers: false,
            ..CleaningOptions::default()
        };
        let cleaner = TextCleaner::new(options).unwrap();
        let pages = vec![page(1, "one\ntwo"), page(2, "three")];
        assert_eq!(cleaner.clean_document(&pages), "one | two | three");
    }
}
