use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::time::{Duration, Instant};

use headless_chrome::{Browser, LaunchOptions};
use reqwest::header::CONTENT_TYPE;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Request headers, name → value. `User-Agent` is applied specially by the browser fetcher.
pub type Headers = BTreeMap<String, String>;

/// Extra time the browser may sit idle beyond the page timeout before Chrome is torn down.
const IDLE_GRACE: Duration = Duration::from_secs(30);

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("headless Chrome is required but could not be launched: {0}")]
    Launch(String),

    #[error("browser error: {0}")]
    Browser(String),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error("HTTP status {0}")]
    Status(u16),
}

/// Raw markup of one page plus the text encoding it was decoded with.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub markup: String,
    pub encoding: String,
}

/// Fetch capability: one blocking GET (or render) per call.
pub trait PageFetcher {
    fn fetch(&self, url: &str, timeout: Duration, headers: &Headers) -> Result<FetchedPage, FetchError>;
}

pub fn default_headers(user_agent: &str) -> Headers {
    let mut headers = Headers::new();
    headers.insert("User-Agent".to_string(), user_agent.to_string());
    headers
}

// ── Headless browser ──

/// Renders pages in headless Chromium so client-side scripts populate the player list.
pub struct ChromeFetcher {
    browser: Browser,
    ready_selector: Option<String>,
}

impl ChromeFetcher {
    /// Launch Chromium up front so a missing browser fails before any work is done.
    pub fn launch(
        chrome_path: Option<PathBuf>,
        timeout: Duration,
        ready_selector: Option<String>,
    ) -> Result<Self, FetchError> {
        let options = LaunchOptions::default_builder()
            .headless(true)
            .sandbox(false)
            .path(chrome_path)
            .idle_browser_timeout(timeout + IDLE_GRACE)
            .build()
            .map_err(|e| FetchError::Launch(e.to_string()))?;

        let browser = Browser::new(options).map_err(|e| FetchError::Launch(format!("{:#}", e)))?;
        debug!("Headless Chrome launched");
        Ok(Self {
            browser,
            ready_selector,
        })
    }

    fn render(&self, url: &str, timeout: Duration, headers: &Headers) -> anyhow::Result<String> {
        let tab = self.browser.new_tab()?;
        tab.set_default_timeout(timeout);

        if let Some(ua) = header_value(headers, "user-agent") {
            tab.set_user_agent(ua, None, None)?;
        }
        let extra: HashMap<&str, &str> = headers
            .iter()
            .filter(|(k, _)| !k.eq_ignore_ascii_case("user-agent"))
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        if !extra.is_empty() {
            tab.set_extra_http_headers(extra)?;
        }

        let started = Instant::now();
        tab.navigate_to(url)?.wait_until_navigated()?;

        // The player list is injected by script after load; wait for it, but hand back
        // whatever rendered if it never shows so the caller can report an empty page.
        if let Some(selector) = &self.ready_selector {
            let remaining = wait_budget(timeout, started.elapsed());
            if let Err(e) = tab.wait_for_element_with_custom_timeout(selector, remaining) {
                warn!(
                    "Player elements did not appear within the remaining {:?} of {:?}: {}",
                    remaining, timeout, e
                );
            }
        }

        let content = tab.get_content()?;
        if let Err(e) = tab.close(true) {
            debug!("Closing tab for {} failed: {}", url, e);
        }
        Ok(content)
    }
}

impl PageFetcher for ChromeFetcher {
    fn fetch(&self, url: &str, timeout: Duration, headers: &Headers) -> Result<FetchedPage, FetchError> {
        let markup = self
            .render(url, timeout, headers)
            .map_err(|e| FetchError::Browser(format!("{:#}", e)))?;
        info!("Rendered {} ({} bytes)", url, markup.len());
        Ok(FetchedPage {
            markup,
            encoding: "utf-8".to_string(),
        })
    }
}

// ── Plain HTTP ──

/// Static GET without script execution. Useful for checking reachability and headers.
#[derive(Default)]
pub struct HttpFetcher;

impl PageFetcher for HttpFetcher {
    fn fetch(&self, url: &str, timeout: Duration, headers: &Headers) -> Result<FetchedPage, FetchError> {
        let client = reqwest::blocking::Client::builder().timeout(timeout).build()?;
        let mut request = client.get(url);
        for (name, value) in headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request.send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let encoding = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(charset_of)
            .unwrap_or_else(|| "utf-8".to_string());
        let markup = response.text()?;
        info!("Fetched {} ({} bytes, {})", url, markup.len(), encoding);

        Ok(FetchedPage { markup, encoding })
    }
}

fn header_value<'a>(headers: &'a Headers, name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

/// `text/html; charset=Shift_JIS` → `shift_jis`
/// Time left for the marker wait once navigation has used `elapsed` of the budget.
fn wait_budget(timeout: Duration, elapsed: Duration) -> Duration {
    timeout.saturating_sub(elapsed)
}

fn charset_of(content_type: &str) -> Option<String> {
    content_type.split(';').skip(1).find_map(|param| {
        let (key, value) = param.split_once('=')?;
        if key.trim().eq_ignore_ascii_case("charset") {
            Some(value.trim().trim_matches('"').to_ascii_lowercase())
        } else {
            None
        }
    })
}
