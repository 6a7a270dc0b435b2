//! The two scrape sources, each wrapped in its own guarded pipeline.
//!
//! A pipeline owns everything between "which page" and "what text goes back
//! to the user": fetch the rendered page through a [`PageSource`], extract
//! cards, filter, format. Fetch problems surface as fixed reply strings; a
//! broken source degrades its slice of the answer without failing the whole
//! dispatch.

use anyhow::Context as _;
use async_trait::async_trait;
use chrono::Datelike as _;
use url::Url;

use crate::extract::{self, COURSE_CARDS, SOCIAL_CARDS};
use crate::filter;
use crate::reply;

/// Course-listing site entity page.
pub const COURSE_ENTITY_URL: &str = "https://www.dentall.io/course_entity";
/// Clinic group page on the social site.
pub const SOCIAL_PAGE_URL: &str = "https://www.facebook.com/whitedentalgroup";
/// Search box on the course-listing site.
pub const SEARCH_INPUT: &str = "input[name='keyword']";

pub const BROWSER_NOT_READY: &str = "瀏覽器尚未啟動";
pub const MONTH_FETCH_FAILED: &str = "抓取牙醫通課程時錯誤";
pub const MONTH_EMPTY: &str = "本月沒有牙科通課程";
pub const MONTH_HEADER: &str = "【台灣牙醫通】本月課程：";
pub const KEYWORD_FETCH_FAILED: &str = "查詢課程發生錯誤";
pub const KEYWORD_EMPTY: &str = "找不到相關課程喔嗚嗚！";
pub const KEYWORD_HEADER: &str = "找到以下相關課程：";
pub const SOCIAL_EMPTY: &str = "本月 Facebook 無課程貼文";
pub const SOCIAL_HEADER: &str = "【White Dental Group】本月課程貼文：";

/// Social post bodies are whole paragraphs; cap them in the reply.
pub const SOCIAL_BODY_LIMIT: usize = 100;

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// The shared browser never started; nothing can be fetched until the
    /// process restarts.
    #[error("browser is not running")]
    NotReady,
    #[error(transparent)]
    Failed(#[from] anyhow::Error),
}

/// How to treat the ready element while settling a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadyWait {
    /// The element must appear; a page without it is a failed fetch.
    Require,
    /// Scrape whatever rendered; zero cards is an empty result, not an
    /// error (the social page often renders none for logged-out visitors).
    BestEffort,
}

/// Rendered-page access, the seam between pipelines and the browser.
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Navigate to `url` and return the rendered HTML once `ready_selector`
    /// has settled per `wait`.
    async fn rendered_html(
        &self,
        url: &str,
        ready_selector: &str,
        wait: ReadyWait,
    ) -> Result<String, SourceError>;

    /// Navigate to `url`, submit `keyword` through the site's own search
    /// input, and return the rendered results. Filtering is the site's job;
    /// callers extract from whatever comes back.
    async fn search_html(
        &self,
        url: &str,
        input_selector: &str,
        keyword: &str,
        ready_selector: &str,
    ) -> Result<String, SourceError>;
}

/// Source A, month mode: this month's courses from the listing site.
pub async fn month_digest(source: &dyn PageSource) -> anyhow::Result<String> {
    let cards = COURSE_CARDS.compile().context("compile course selectors")?;

    let html = match source
        .rendered_html(COURSE_ENTITY_URL, COURSE_CARDS.card, ReadyWait::Require)
        .await
    {
        Ok(html) => html,
        Err(SourceError::NotReady) => return Ok(BROWSER_NOT_READY.to_owned()),
        Err(SourceError::Failed(err)) => {
            tracing::warn!(?err, url = COURSE_ENTITY_URL, "course page fetch failed");
            return Ok(MONTH_FETCH_FAILED.to_owned());
        }
    };

    let base = Url::parse(COURSE_ENTITY_URL).context("parse course entity url")?;
    let extraction = extract::extract_records(&html, &cards, Some(&base));
    if extraction.defaulted_fields > 0 {
        tracing::debug!(
            defaulted_fields = extraction.defaulted_fields,
            "course cards with missing fields"
        );
    }

    let now = chrono::Local::now();
    let matched = filter::by_month(extraction.records, now.year(), now.month());
    Ok(reply::render(&matched, MONTH_EMPTY, MONTH_HEADER, None))
}

/// Source A, keyword mode: the listing site's own search does the
/// narrowing; whatever it returns is the result set.
pub async fn keyword_search(source: &dyn PageSource, keyword: &str) -> anyhow::Result<String> {
    let cards = COURSE_CARDS.compile().context("compile course selectors")?;

    let html = match source
        .search_html(COURSE_ENTITY_URL, SEARCH_INPUT, keyword, COURSE_CARDS.card)
        .await
    {
        Ok(html) => html,
        Err(SourceError::NotReady) => return Ok(BROWSER_NOT_READY.to_owned()),
        Err(SourceError::Failed(err)) => {
            tracing::warn!(?err, keyword, "course search failed");
            return Ok(KEYWORD_FETCH_FAILED.to_owned());
        }
    };

    let base = Url::parse(COURSE_ENTITY_URL).context("parse course entity url")?;
    let extraction = extract::extract_records(&html, &cards, Some(&base));
    if extraction.defaulted_fields > 0 {
        tracing::debug!(
            defaulted_fields = extraction.defaulted_fields,
            "course cards with missing fields"
        );
    }

    Ok(reply::render(
        &extraction.records,
        KEYWORD_EMPTY,
        KEYWORD_HEADER,
        None,
    ))
}

/// Source B: course-related posts from the social page. A failed fetch
/// yields the empty string so the merged digest simply omits this source.
pub async fn social_digest(source: &dyn PageSource) -> anyhow::Result<String> {
    let cards = SOCIAL_CARDS.compile().context("compile social selectors")?;

    let html = match source
        .rendered_html(SOCIAL_PAGE_URL, SOCIAL_CARDS.card, ReadyWait::BestEffort)
        .await
    {
        Ok(html) => html,
        Err(err) => {
            tracing::warn!(?err, url = SOCIAL_PAGE_URL, "social page fetch failed");
            return Ok(String::new());
        }
    };

    let extraction = extract::extract_records(&html, &cards, None);
    Ok(reply::render(
        &extraction.records,
        SOCIAL_EMPTY,
        SOCIAL_HEADER,
        Some(SOCIAL_BODY_LIMIT),
    ))
}
