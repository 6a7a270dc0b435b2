//! Card extraction: turn a rendered page into a list of course records.
//!
//! All knowledge of a source site's markup lives in its [`CardSelectors`]
//! table. When a site's markup drifts, the table changes; the extraction
//! walk does not.

use anyhow::Context as _;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::record::{self, CourseRecord};

/// Per-source table of CSS selectors describing one card shape.
#[derive(Debug, Clone, Copy)]
pub struct CardSelectors {
    /// Matches every card container on the page.
    pub card: &'static str,
    /// Candidate title sub-elements, tried in order.
    pub title: &'static [&'static str],
    /// Candidate date sub-elements, tried in order.
    pub date: &'static [&'static str],
    /// Candidate author/lecturer sub-elements, tried in order.
    pub author: &'static [&'static str],
    /// Use the card's own text as the title when no title selector matches.
    pub card_text_title: bool,
    /// Keep only cards whose title text contains this substring.
    pub keyword_gate: Option<&'static str>,
}

/// Course-listing site: one card per course entity.
pub const COURSE_CARDS: CardSelectors = CardSelectors {
    card: ".course-card-content",
    title: &[".course-card-name"],
    date: &[".course-card-date"],
    author: &[".course-card-lecturer"],
    card_text_title: false,
    keyword_gate: None,
};

/// Social page: one article per post. Posts mention courses in free text,
/// so the gate keeps only course-related ones, and the message body doubles
/// as the title.
pub const SOCIAL_CARDS: CardSelectors = CardSelectors {
    card: "div[role='article']",
    title: &["[data-ad-preview='message']"],
    date: &["abbr", "time"],
    author: &[],
    card_text_title: true,
    keyword_gate: Some("課程"),
};

impl CardSelectors {
    pub fn compile(&self) -> anyhow::Result<CompiledCards> {
        Ok(CompiledCards {
            card: compile_one(self.card)?,
            title: compile_list(self.title)?,
            date: compile_list(self.date)?,
            author: compile_list(self.author)?,
            card_text_title: self.card_text_title,
            keyword_gate: self.keyword_gate,
        })
    }
}

/// A selector table parsed into `scraper` selectors, ready for extraction.
pub struct CompiledCards {
    card: Selector,
    title: Vec<Selector>,
    date: Vec<Selector>,
    author: Vec<Selector>,
    card_text_title: bool,
    keyword_gate: Option<&'static str>,
}

fn compile_one(raw: &str) -> anyhow::Result<Selector> {
    Selector::parse(raw)
        .map_err(|err| anyhow::anyhow!("{err}"))
        .with_context(|| format!("invalid selector: {raw}"))
}

fn compile_list(raw: &[&str]) -> anyhow::Result<Vec<Selector>> {
    raw.iter().map(|&sel| compile_one(sel)).collect()
}

/// Extraction output: records in document order, plus a count of fields
/// that fell back to a sentinel, for callers that log substitution rates.
#[derive(Debug, Default)]
pub struct Extraction {
    pub records: Vec<CourseRecord>,
    pub defaulted_fields: usize,
}

/// Pull one record out of every card on the page.
///
/// Cards are processed independently: a card missing a field yields a
/// sentinel for that field and nothing else, and never aborts its
/// neighbours. Relative detail links are absolutized against `base`.
pub fn extract_records(html: &str, cards: &CompiledCards, base: Option<&Url>) -> Extraction {
    let document = Html::parse_document(html);
    let mut out = Extraction::default();

    for card in document.select(&cards.card) {
        let title = first_text(card, &cards.title).or_else(|| {
            cards
                .card_text_title
                .then(|| own_text(card))
                .filter(|text| !text.is_empty())
        });

        if let Some(gate) = cards.keyword_gate {
            let is_course = title.as_deref().is_some_and(|text| text.contains(gate));
            if !is_course {
                continue;
            }
        }

        let date_text = first_text(card, &cards.date);
        let author = first_text(card, &cards.author);
        let url = enclosing_link(card, base);

        let mut field = |value: Option<String>, sentinel: &str| match value {
            Some(value) => value,
            None => {
                out.defaulted_fields += 1;
                sentinel.to_owned()
            }
        };

        let record = CourseRecord {
            title: field(title, record::NO_TITLE),
            date_text: field(date_text, record::NO_DATE),
            author: field(author, record::NO_AUTHOR),
            url: field(url, record::NO_URL),
        };
        out.records.push(record);
    }

    out
}

/// Text of the first matching sub-element, trimmed; `None` when no selector
/// matches or the match is blank.
fn first_text(card: ElementRef<'_>, selectors: &[Selector]) -> Option<String> {
    selectors
        .iter()
        .filter_map(|selector| card.select(selector).next())
        .map(element_text)
        .find(|text| !text.is_empty())
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_owned()
}

fn own_text(card: ElementRef<'_>) -> String {
    card.text().collect::<String>().trim().to_owned()
}

/// Href of the nearest enclosing `<a>`, absolutized when a base is known.
fn enclosing_link(card: ElementRef<'_>, base: Option<&Url>) -> Option<String> {
    let href = card
        .ancestors()
        .filter_map(ElementRef::wrap)
        .find(|ancestor| ancestor.value().name() == "a")
        .and_then(|anchor| anchor.value().attr("href"))
        .map(str::trim)
        .filter(|href| !href.is_empty())?;

    match base {
        Some(base) => Some(
            base.join(href)
                .map(|url| url.to_string())
                .unwrap_or_else(|_| href.to_owned()),
        ),
        None => Some(href.to_owned()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record;

    const COURSE_PAGE: &str = r#"<!doctype html>
<html><body>
  <a href="/course_entity/101">
    <div class="course-card-content">
      <div class="course-card-name"> 全口重建研討會 </div>
      <div class="course-card-date">2024/03/10 - 2024/03/11</div>
      <div class="course-card-lecturer">王大明</div>
    </div>
  </a>
  <a href="https://www.dentall.io/course_entity/102">
    <div class="course-card-content">
      <div class="course-card-name">矯正入門</div>
      <div class="course-card-date">2024/04/02</div>
    </div>
  </a>
  <div class="course-card-content">
    <div class="course-card-name">植牙實作</div>
    <div class="course-card-lecturer">李醫師</div>
  </div>
</body></html>"#;

    fn course_cards() -> CompiledCards {
        COURSE_CARDS.compile().unwrap()
    }

    fn base() -> Url {
        Url::parse("https://www.dentall.io/course_entity").unwrap()
    }

    #[test]
    fn extracts_cards_in_document_order() {
        let out = extract_records(COURSE_PAGE, &course_cards(), Some(&base()));
        let titles: Vec<&str> = out.records.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, ["全口重建研討會", "矯正入門", "植牙實作"]);
    }

    #[test]
    fn trims_text_and_absolutizes_relative_links() {
        let out = extract_records(COURSE_PAGE, &course_cards(), Some(&base()));
        let first = &out.records[0];
        assert_eq!(first.title, "全口重建研討會");
        assert_eq!(first.date_text, "2024/03/10 - 2024/03/11");
        assert_eq!(first.author, "王大明");
        assert_eq!(first.url, "https://www.dentall.io/course_entity/101");
    }

    #[test]
    fn missing_fields_default_independently() {
        let out = extract_records(COURSE_PAGE, &course_cards(), Some(&base()));

        let second = &out.records[1];
        assert_eq!(second.author, record::NO_AUTHOR);
        assert_eq!(second.url, "https://www.dentall.io/course_entity/102");

        let third = &out.records[2];
        assert_eq!(third.date_text, record::NO_DATE);
        assert_eq!(third.url, record::NO_URL);
        assert_eq!(third.author, "李醫師");

        // one miss on card two, two on card three
        assert_eq!(out.defaulted_fields, 3);
    }

    #[test]
    fn extraction_is_idempotent() {
        let first = extract_records(COURSE_PAGE, &course_cards(), Some(&base()));
        let second = extract_records(COURSE_PAGE, &course_cards(), Some(&base()));
        assert_eq!(first.records, second.records);
    }

    #[test]
    fn no_cards_yields_no_records() {
        let out = extract_records("<html><body><p>maintenance</p></body></html>", &course_cards(), None);
        assert!(out.records.is_empty());
        assert_eq!(out.defaulted_fields, 0);
    }

    const SOCIAL_PAGE: &str = r#"<!doctype html>
<html><body>
  <div role="article">
    <div data-ad-preview="message">三月份植牙課程開放報名，名額有限。</div>
    <abbr>3月1日</abbr>
  </div>
  <div role="article">
    <div data-ad-preview="message">祝大家新年快樂！</div>
    <time>2月10日</time>
  </div>
  <div role="article">
    <span>院內公告：四月課程表已更新</span>
    <time>3月20日</time>
  </div>
</body></html>"#;

    #[test]
    fn social_gate_keeps_only_course_posts() {
        let cards = SOCIAL_CARDS.compile().unwrap();
        let out = extract_records(SOCIAL_PAGE, &cards, None);
        assert_eq!(out.records.len(), 2);
        assert_eq!(out.records[0].title, "三月份植牙課程開放報名，名額有限。");
        // the greeting post carries no gate word and is dropped at extraction
        assert!(out.records.iter().all(|r| !r.title.contains("新年快樂")));
    }

    #[test]
    fn social_falls_back_to_card_text_and_time_element() {
        let cards = SOCIAL_CARDS.compile().unwrap();
        let out = extract_records(SOCIAL_PAGE, &cards, None);

        // first post: message element plus abbr date
        assert_eq!(out.records[0].date_text, "3月1日");
        // third post has no message element; its own text carries the gate
        // word, so the card survives with its full text as the title
        assert!(out.records[1].title.contains("院內公告：四月課程表已更新"));
        assert_eq!(out.records[1].date_text, "3月20日");
        assert_eq!(out.records[1].author, record::NO_AUTHOR);
        assert_eq!(out.records[1].url, record::NO_URL);
    }
}
