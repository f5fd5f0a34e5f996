//! Locates bookmark markers in a Markdown document.
//!
//! A marker is the sentinel line followed by an image-style reference whose
//! destination is the page to turn into a card:
//!
//! ```text
//! %%bookmarkthis%%
//! ![alt text](https://example.com/page)
//! ```

use std::sync::LazyLock;

pub const SENTINEL: &str = "%%bookmarkthis%%";

static MARKER: LazyLock<regex::Regex> =
    LazyLock::new(|| regex::Regex::new(r"%%bookmarkthis%%\n!\[[^\]]*\]\(([^)]+)\)").unwrap());

/// One matched marker. Offsets are byte offsets into the document that was
/// scanned, never into a rewritten copy of it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerOccurrence {
    pub raw_span: String,
    pub target_url: String,
    pub start: usize,
    pub end: usize,
}

impl MarkerOccurrence {
    /// The `![..](..)` line of the marker, without the sentinel.
    pub fn reference_line(&self) -> &str {
        self.raw_span
            .strip_prefix(SENTINEL)
            .and_then(|rest| rest.strip_prefix('\n'))
            .unwrap_or(&self.raw_span)
    }
}

/// Returns every marker in `text`, ordered by position and non-overlapping.
pub fn scan(text: &str) -> Vec<MarkerOccurrence> {
    MARKER
        .captures_iter(text)
        .filter_map(|captures| {
            let whole = captures.get(0)?;
            let url = captures.get(1)?;
            Some(MarkerOccurrence {
                raw_span: whole.as_str().to_owned(),
                target_url: url.as_str().to_owned(),
                start: whole.start(),
                end: whole.end(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{SENTINEL, scan};

    #[test]
    fn test_scan_no_marker() {
        assert!(scan("").is_empty());
        assert!(scan("# heading\n\n![img](https://a.test)\n").is_empty());
    }

    #[test]
    fn test_scan_single_marker() {
        let text = "intro\n%%bookmarkthis%%\n![alt text](https://example.com/page)\noutro";
        let found = scan(text);
        assert_eq!(found.len(), 1);
        let marker = &found[0];
        assert_eq!(marker.target_url, "https://example.com/page");
        assert_eq!(marker.start, 6);
        assert_eq!(&text[marker.start..marker.end], marker.raw_span);
        assert_eq!(
            marker.raw_span,
            "%%bookmarkthis%%\n![alt text](https://example.com/page)"
        );
        assert_eq!(
            marker.reference_line(),
            "![alt text](https://example.com/page)"
        );
    }

    #[test]
    fn test_scan_multiple_markers_in_order() {
        let text = "%%bookmarkthis%%\n![x](https://a.test)\n\nsome text\n\n%%bookmarkthis%%\n![y](https://b.test)";
        let found = scan(text);
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].target_url, "https://a.test");
        assert_eq!(found[1].target_url, "https://b.test");
        assert!(found[0].end <= found[1].start);
        for marker in &found {
            assert_eq!(&text[marker.start..marker.end], marker.raw_span);
        }
    }

    #[test]
    fn test_scan_requires_reference_on_next_line() {
        assert!(scan("%%bookmarkthis%%\n\n![x](https://a.test)").is_empty());
        assert!(scan("%%bookmarkthis%% ![x](https://a.test)").is_empty());
        assert!(scan("%%bookmarkthis%%\n[x](https://a.test)").is_empty());
    }

    #[test]
    fn test_scan_empty_alt_and_malformed_url() {
        let found = scan("%%bookmarkthis%%\n![](not a url)");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].target_url, "not a url");
    }

    #[test]
    fn test_scan_byte_offsets_after_multibyte_text() {
        let text = "書籤：\n%%bookmarkthis%%\n![中文](https://a.test/頁)";
        let found = scan(text);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].start, "書籤：\n".len());
        assert_eq!(found[0].end, text.len());
        assert_eq!(found[0].target_url, "https://a.test/頁");
    }

    #[test]
    fn test_scan_is_repeatable() {
        let text = format!("{SENTINEL}\n![a](https://a.test)\n{SENTINEL}\n![b](https://b.test)");
        assert_eq!(scan(&text), scan(&text));
    }
}
