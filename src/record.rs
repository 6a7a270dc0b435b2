//! The extracted course record and its field sentinels.

/// Placeholder for a card with no recognizable title.
pub const NO_TITLE: &str = "無標題";
/// Placeholder for a card with no date element.
pub const NO_DATE: &str = "無日期";
/// Placeholder for a card with no lecturer element.
pub const NO_AUTHOR: &str = "無講師";
/// Placeholder for a card with no enclosing link.
pub const NO_URL: &str = "無連結";

/// One course item as captured from a rendered page.
///
/// All four fields are always populated: a field missing on the page is
/// replaced by its sentinel, never left empty. Records are built fresh on
/// every page load and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CourseRecord {
    pub title: String,
    /// Raw date token exactly as it appeared on the page.
    pub date_text: String,
    pub author: String,
    pub url: String,
}
