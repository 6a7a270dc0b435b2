//! Month-window selection over extracted records.
//!
//! Only the calendar-month policy lives here. Keyword selection is not a
//! post-hoc filter at all: it is delegated to the course site's own search
//! box (see `source::keyword_search`), which returns an already-filtered
//! page.

use crate::date;
use crate::record::CourseRecord;

/// Keep the records whose date text parses to the given year and month.
///
/// Records whose date text cannot be parsed are dropped without comment:
/// an unreadable date cannot confirm membership in the month, and treating
/// it as non-membership is the policy, not an error. Relative order is
/// preserved.
pub fn by_month(records: Vec<CourseRecord>, year: i32, month: u32) -> Vec<CourseRecord> {
    records
        .into_iter()
        .filter(|record| {
            date::normalize(&record.date_text)
                .is_some_and(|parsed| parsed.year == year && parsed.month == month)
        })
        .collect()
}
