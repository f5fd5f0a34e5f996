//! Markup for a resolved marker.

use std::fmt::Write;

use html_escape::{encode_double_quoted_attribute, encode_text};

use crate::{
    resolver::{Metadata, MetadataResult, UNKNOWN_ERROR},
    scanner::MarkerOccurrence,
};

pub const FAILURE_PREFIX: &str = "%% 轉換失敗: ";
pub const FAILURE_SUFFIX: &str = " %%";
const UNTITLED: &str = "無標題";
const NO_DESCRIPTION: &str = "無描述";

/// Renders the replacement for `occurrence`.
pub fn render(result: &MetadataResult, occurrence: &MarkerOccurrence) -> String {
    match result {
        MetadataResult::Success(metadata) => render_card(metadata),
        MetadataResult::Failure { reason } => render_failure(reason, occurrence),
    }
}

fn or_fallback<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    if value.is_empty() { fallback } else { value }
}

/// A bookmark card in the markup of Ghost's `kg-bookmark-card`. Optional
/// parts are left out entirely when the metadata has no value for them.
pub fn render_card(metadata: &Metadata) -> String {
    let mut html = String::new();
    // Writing into a String cannot fail.
    let _ = write_card(&mut html, metadata);
    html
}

fn write_card<W: Write>(out: &mut W, metadata: &Metadata) -> std::fmt::Result {
    let title = encode_text(or_fallback(&metadata.title, UNTITLED));
    let description = encode_text(or_fallback(&metadata.description, NO_DESCRIPTION));
    let href = encode_double_quoted_attribute(&metadata.url);

    writeln!(out, r#"<figure class="kg-card kg-bookmark-card">"#)?;
    writeln!(out, r#"    <a href="{href}" class="kg-bookmark-container">"#)?;
    writeln!(out, r#"        <div class="kg-bookmark-content">"#)?;
    writeln!(out, r#"            <div class="kg-bookmark-title">{title}</div>"#)?;
    writeln!(
        out,
        r#"            <div class="kg-bookmark-description">{description}</div>"#
    )?;
    writeln!(out, r#"            <div class="kg-bookmark-metadata">"#)?;
    if !metadata.logo.is_empty() {
        writeln!(
            out,
            r#"                <img src="{}" class="kg-bookmark-icon">"#,
            encode_double_quoted_attribute(&metadata.logo)
        )?;
    }
    if !metadata.author.is_empty() {
        writeln!(
            out,
            r#"                <span class="kg-bookmark-author">{}</span>"#,
            encode_text(&metadata.author)
        )?;
    }
    if !metadata.publisher.is_empty() {
        writeln!(
            out,
            r#"                <span class="kg-bookmark-publisher">{}</span>"#,
            encode_text(&metadata.publisher)
        )?;
    }
    writeln!(out, "            </div>")?;
    writeln!(out, "        </div>")?;
    if !metadata.image.is_empty() {
        writeln!(out, r#"        <div class="kg-bookmark-thumbnail">"#)?;
        writeln!(
            out,
            r#"            <img src="{}">"#,
            encode_double_quoted_attribute(&metadata.image)
        )?;
        writeln!(out, "        </div>")?;
    }
    writeln!(out, "    </a>")?;
    write!(out, "</figure>")
}

/// The sentinel line becomes an annotation carrying `reason`; the reference
/// line stays as written so the marker can be inspected or restored.
pub fn render_failure(reason: &str, occurrence: &MarkerOccurrence) -> String {
    format!(
        "{FAILURE_PREFIX}{}{FAILURE_SUFFIX}\n{}",
        or_fallback(comment_safe(reason).trim(), UNKNOWN_ERROR),
        occurrence.reference_line()
    )
}

/// The reason must stay a single-line `%% .. %%` comment.
fn comment_safe(reason: &str) -> String {
    reason.replace("%%", "").replace(['\r', '\n'], " ")
}
