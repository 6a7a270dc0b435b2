//! Rendering a record list into one chat-message text block.

use crate::record::CourseRecord;

/// Marker appended when a body is cut at the truncation limit.
const ELLIPSIS: &str = "...";

/// Render records into a reply.
///
/// An empty list returns `empty_message` untouched: the per-source empty
/// and unreachable strings are distinct and callers rely on getting them
/// back verbatim. Otherwise the reply is `header`, a blank line, then one
/// 1-indexed entry per record in the order given. `body_limit` caps the
/// title at that many characters (social posts carry whole paragraphs).
pub fn render(
    records: &[CourseRecord],
    empty_message: &str,
    header: &str,
    body_limit: Option<usize>,
) -> String {
    if records.is_empty() {
        return empty_message.to_owned();
    }

    let entries: Vec<String> = records
        .iter()
        .enumerate()
        .map(|(index, record)| {
            let title = match body_limit {
                Some(limit) => clip(&record.title, limit),
                None => record.title.clone(),
            };
            format!(
                "{}. {title}\n📅 {}\n👨‍🏫 {}\n🔗 {}",
                index + 1,
                record.date_text,
                record.author,
                record.url
            )
        })
        .collect();

    format!("{header}\n\n{}", entries.join("\n\n"))
}

/// First `limit` characters plus an ellipsis marker, or the text unchanged
/// when it already fits.
fn clip(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((cut, _)) => format!("{}{ELLIPSIS}", &text[..cut]),
        None => text.to_owned(),
    }
}
