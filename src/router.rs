//! Query dispatch: one inbound message in, one reply out.

use std::sync::Arc;

use crate::source::{self, PageSource};

/// Exact message that asks for the monthly digest.
pub const MONTHLY_TRIGGER: &str = "查詢本月牙科課程";
/// Reply for faults the per-source guards did not absorb.
pub const GENERIC_FAILURE: &str = "發生未預期的錯誤，請稍後再試。";

/// What an inbound message asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Query {
    /// The literal trigger phrase: this month's courses from both sources.
    MonthlyDigest,
    /// Anything else: a keyword for the course site's own search.
    Keyword(String),
}

impl Query {
    pub fn parse(text: &str) -> Self {
        let text = text.trim();
        if text == MONTHLY_TRIGGER {
            Self::MonthlyDigest
        } else {
            Self::Keyword(text.to_owned())
        }
    }
}

/// Stateless dispatcher; every message is an independent run.
pub struct QueryRouter {
    source: Arc<dyn PageSource>,
}

impl QueryRouter {
    pub fn new(source: Arc<dyn PageSource>) -> Self {
        Self { source }
    }

    /// Answer one message. Never fails: source problems are already reply
    /// text, and anything that still escapes becomes the generic failure
    /// message with the detail kept in the log.
    pub async fn answer(&self, text: &str) -> String {
        match self.try_answer(text).await {
            Ok(reply) => reply,
            Err(err) => {
                tracing::error!(?err, "query dispatch failed");
                GENERIC_FAILURE.to_owned()
            }
        }
    }

    async fn try_answer(&self, text: &str) -> anyhow::Result<String> {
        match Query::parse(text) {
            Query::MonthlyDigest => {
                let (courses, posts) = tokio::join!(
                    source::month_digest(&*self.source),
                    source::social_digest(&*self.source),
                );
                let courses = courses?;
                let posts = posts?;
                // a failed social fetch contributes an empty segment;
                // leave it out rather than dangle a blank line
                if posts.is_empty() {
                    Ok(courses)
                } else {
                    Ok(format!("{courses}\n\n{posts}"))
                }
            }
            Query::Keyword(keyword) => source::keyword_search(&*self.source, &keyword).await,
        }
    }
}
