//! The shared headless-browser handle and its page-level plumbing.
//!
//! One browser process serves the whole bot. Each scrape checks out a fresh
//! tab and a drop guard closes it on every exit path. The `headless_chrome`
//! API blocks, so scrapes run on the blocking pool, capped by an outer
//! deadline so a wedged page load cannot stall its pipeline forever.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context as _;
use async_trait::async_trait;
use headless_chrome::{Browser, LaunchOptions, Tab};

use crate::source::{PageSource, ReadyWait, SourceError};

/// Hard ceiling on one scrape round-trip, navigation included.
const SCRAPE_DEADLINE: Duration = Duration::from_secs(45);
/// Cap on each element wait inside the browser.
const ELEMENT_TIMEOUT: Duration = Duration::from_secs(15);
/// Poll interval while waiting for the card count to stop changing.
const SETTLE_POLL: Duration = Duration::from_millis(250);
/// Give up settling after this long and scrape what is there.
const SETTLE_DEADLINE: Duration = Duration::from_secs(5);

/// Process-scoped browser owner. Launched once at startup; requests borrow
/// tabs from it and its lifecycle is independent of any request's outcome.
pub struct BrowserSource {
    browser: Option<Browser>,
}

impl BrowserSource {
    /// Launch the shared browser. A failed launch is logged and leaves the
    /// handle empty; every scrape then reports not-ready until the process
    /// is restarted.
    pub fn launch() -> Self {
        let browser = match Browser::new(LaunchOptions {
            headless: true,
            ..Default::default()
        }) {
            Ok(browser) => {
                tracing::info!("headless browser started");
                Some(browser)
            }
            Err(err) => {
                tracing::error!(?err, "headless browser failed to start");
                None
            }
        };
        Self { browser }
    }

    fn handle(&self) -> Result<Browser, SourceError> {
        self.browser.clone().ok_or(SourceError::NotReady)
    }
}

#[async_trait]
impl PageSource for BrowserSource {
    async fn rendered_html(
        &self,
        url: &str,
        ready_selector: &str,
        wait: ReadyWait,
    ) -> Result<String, SourceError> {
        let browser = self.handle()?;
        let url = url.to_owned();
        let ready_selector = ready_selector.to_owned();
        scrape(move || render_page(&browser, &url, &ready_selector, wait)).await
    }

    async fn search_html(
        &self,
        url: &str,
        input_selector: &str,
        keyword: &str,
        ready_selector: &str,
    ) -> Result<String, SourceError> {
        let browser = self.handle()?;
        let url = url.to_owned();
        let input_selector = input_selector.to_owned();
        let keyword = keyword.to_owned();
        let ready_selector = ready_selector.to_owned();
        scrape(move || run_search(&browser, &url, &input_selector, &keyword, &ready_selector))
            .await
    }
}

/// Run one blocking scrape under the outer deadline.
async fn scrape<F>(op: F) -> Result<String, SourceError>
where
    F: FnOnce() -> anyhow::Result<String> + Send + 'static,
{
    match tokio::time::timeout(SCRAPE_DEADLINE, tokio::task::spawn_blocking(op)).await {
        Err(_) => Err(SourceError::Failed(anyhow::anyhow!(
            "scrape deadline exceeded ({}s)",
            SCRAPE_DEADLINE.as_secs()
        ))),
        Ok(Err(join_err)) => Err(SourceError::Failed(anyhow::anyhow!(
            "scrape task failed: {join_err}"
        ))),
        Ok(Ok(result)) => result.map_err(SourceError::Failed),
    }
}

/// Closes its tab when the scrape is done, error paths included.
struct ScopedTab(Arc<Tab>);

impl ScopedTab {
    fn open(browser: &Browser) -> anyhow::Result<Self> {
        let tab = browser.new_tab().context("open browser tab")?;
        tab.set_default_timeout(ELEMENT_TIMEOUT);
        Ok(Self(tab))
    }
}

impl Drop for ScopedTab {
    fn drop(&mut self) {
        if let Err(err) = self.0.close(true) {
            tracing::debug!(?err, "tab close failed");
        }
    }
}

fn render_page(
    browser: &Browser,
    url: &str,
    ready_selector: &str,
    wait: ReadyWait,
) -> anyhow::Result<String> {
    let tab = ScopedTab::open(browser)?;
    tab.0
        .navigate_to(url)
        .with_context(|| format!("navigate to {url}"))?;
    tab.0.wait_until_navigated().context("wait for navigation")?;

    match wait {
        ReadyWait::Require => {
            tab.0
                .wait_for_element(ready_selector)
                .with_context(|| format!("wait for {ready_selector}"))?;
        }
        ReadyWait::BestEffort => {
            if let Err(err) = tab.0.wait_for_element(ready_selector) {
                tracing::debug!(?err, ready_selector, "ready element never appeared");
            }
        }
    }

    wait_for_stable_count(&tab.0, ready_selector);
    tab.0.get_content().context("read rendered html")
}

fn run_search(
    browser: &Browser,
    url: &str,
    input_selector: &str,
    keyword: &str,
    ready_selector: &str,
) -> anyhow::Result<String> {
    let tab = ScopedTab::open(browser)?;
    tab.0
        .navigate_to(url)
        .with_context(|| format!("navigate to {url}"))?;
    tab.0.wait_until_navigated().context("wait for navigation")?;

    let input = tab
        .0
        .wait_for_element(input_selector)
        .with_context(|| format!("find search input {input_selector}"))?;
    input.click().context("focus search input")?;
    tab.0.type_str(keyword).context("type keyword")?;
    tab.0.press_key("Enter").context("submit search")?;

    // The site swaps the result list in place after the search request.
    // The count poll cannot tell "search done" from "search not yet
    // started" on a slow backend; see DESIGN.md.
    wait_for_stable_count(&tab.0, ready_selector);
    tab.0.get_content().context("read search results")
}

/// Block until two consecutive polls see the same non-zero number of
/// matches, or the settle deadline passes.
fn wait_for_stable_count(tab: &Tab, selector: &str) {
    let deadline = Instant::now() + SETTLE_DEADLINE;
    let mut last = usize::MAX;
    while Instant::now() < deadline {
        let count = tab
            .find_elements(selector)
            .map(|elements| elements.len())
            .unwrap_or(0);
        if count > 0 && count == last {
            return;
        }
        last = count;
        std::thread::sleep(SETTLE_POLL);
    }
}
