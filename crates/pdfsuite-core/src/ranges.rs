//! Page range parsing and page targeting
//!
//! Range strings are user-entered and 1-based ("1, 3-5, 8"); everything
//! downstream works with 0-based page indices.

use crate::error::PdfSuiteError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Parse a page ranges string into a sorted, deduplicated list of 0-based page indices.
///
/// Parsing is lenient: tokens that are not numbers, and pages outside
/// `1..=page_count`, are dropped silently. A range contributes only its
/// in-bounds pages. An empty result is a normal outcome.
///
/// ```
/// use pdfsuite_core::ranges::parse_page_ranges;
///
/// assert_eq!(parse_page_ranges("1, 3-5, 8", 10), vec![0, 2, 3, 4, 7]);
/// assert_eq!(parse_page_ranges("1,1,1", 10), vec![0]);
/// assert!(parse_page_ranges("0, 99", 10).is_empty());
/// ```
pub fn parse_page_ranges(range_str: &str, page_count: usize) -> Vec<usize> {
    let mut pages = BTreeSet::new();

    for part in range_str.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }

        if let Some((start, end)) = part.split_once('-') {
            // Range like "1-3"
            if let (Ok(start), Ok(end)) =
                (start.trim().parse::<usize>(), end.trim().parse::<usize>())
            {
                let start = start.max(1);
                let end = end.min(page_count);
                for page in start..=end {
                    pages.insert(page - 1);
                }
            }
        } else if let Ok(page) = part.parse::<usize>() {
            // Single page like "5"
            if page >= 1 && page <= page_count {
                pages.insert(page - 1);
            }
        }
    }

    pages.into_iter().collect()
}

/// Turn an empty selection into an error at a tool boundary.
pub fn require_pages(indices: Vec<usize>) -> Result<Vec<usize>, PdfSuiteError> {
    if indices.is_empty() {
        Err(PdfSuiteError::OutOfRangeSelection)
    } else {
        Ok(indices)
    }
}

/// Describe the first problem in a range string, for inline hints.
///
/// Returns None if every token is valid. This never blocks parsing, which
/// stays lenient.
pub fn validate_page_range(range_str: &str, page_count: usize) -> Option<String> {
    if range_str.trim().is_empty() {
        return Some("Page range cannot be empty".to_string());
    }

    for part in range_str.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }

        if let Some((start, end)) = part.split_once('-') {
            match (start.trim().parse::<usize>(), end.trim().parse::<usize>()) {
                (Ok(s), Ok(e)) => {
                    if s > e {
                        return Some(format!("Invalid range: start {} > end {}", s, e));
                    }
                    if s < 1 {
                        return Some(format!("Page number must be >= 1, got {}", s));
                    }
                    if e > page_count {
                        return Some(format!("Page {} exceeds total pages {}", e, page_count));
                    }
                }
                _ => return Some(format!("Invalid numbers in range: {}", part)),
            }
        } else {
            match part.parse::<usize>() {
                Ok(0) => return Some("Page number must be >= 1, got 0".to_string()),
                Ok(n) if n > page_count => {
                    return Some(format!("Page {} exceeds total pages {}", n, page_count))
                }
                Ok(_) => {}
                Err(_) => return Some(format!("Invalid page number: {}", part)),
            }
        }
    }

    None
}

/// Which pages an edit applies to.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "type", content = "pages")]
pub enum TargetPages {
    #[default]
    All,
    Indices(Vec<usize>),
}

impl TargetPages {
    /// Ascending, deduplicated indices that exist in a document of `page_count` pages.
    pub fn resolve(&self, page_count: usize) -> Vec<usize> {
        match self {
            TargetPages::All => (0..page_count).collect(),
            TargetPages::Indices(indices) => {
                let set: BTreeSet<usize> = indices
                    .iter()
                    .copied()
                    .filter(|&i| {
                        let valid = i < page_count;
                        if !valid {
                            tracing::debug!(index = i, page_count, "Skipping out-of-range page");
                        }
                        valid
                    })
                    .collect();
                set.into_iter().collect()
            }
        }
    }

    pub fn single(index: usize) -> Self {
        TargetPages::Indices(vec![index])
    }
}
