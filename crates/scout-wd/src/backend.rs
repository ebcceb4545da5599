use async_trait::async_trait;
use fantoccini::{Client, ClientBuilder, Locator as WdLocator, elements::Element};
use scout_common::Locator;
use scout_engine::browser::{Browser, BrowserError, ElementSnapshot};
use serde_json::{Map, Value, json};
use std::collections::HashMap;
use tracing::{debug, info};

/// Attributes worth carrying into a snapshot; these are the ones
/// selector derivation and diagnostics actually look at.
const SNAPSHOT_ATTRS: [&str; 6] = ["name", "id", "type", "placeholder", "class", "href"];

/// A [`Browser`] over a fantoccini WebDriver session.
pub struct WdBrowser {
    client: Option<Client>,
    webdriver_url: String,
    headless: bool,
}

impl WdBrowser {
    /// Connect lazily: the session starts on [`Browser::launch`], not
    /// here, so construction never fails.
    pub fn new(webdriver_url: impl Into<String>, headless: bool) -> Self {
        Self {
            client: None,
            webdriver_url: webdriver_url.into(),
            headless,
        }
    }

    fn client(&mut self) -> Result<&mut Client, BrowserError> {
        self.client.as_mut().ok_or(BrowserError::NotReady)
    }

    async fn find_all(&mut self, locator: &Locator) -> Result<Vec<Element>, BrowserError> {
        let compiled = Compiled::from(locator);
        let client = self.client()?;
        client
            .find_all(compiled.as_wd())
            .await
            .map_err(|e| BrowserError::Query(e.to_string()))
    }

    async fn find_first(&mut self, locator: &Locator) -> Result<Element, BrowserError> {
        let compiled = Compiled::from(locator);
        let client = self.client()?;
        client
            .find(compiled.as_wd())
            .await
            .map_err(|e| BrowserError::Interaction(format!("{locator}: {e}")))
    }

    async fn snapshot(element: &Element) -> ElementSnapshot {
        let tag = element.tag_name().await.unwrap_or_default();
        let text = element.text().await.ok();
        let displayed = element.is_displayed().await.unwrap_or(false);

        let mut attributes = HashMap::new();
        for key in SNAPSHOT_ATTRS {
            if let Ok(Some(value)) = element.attr(key).await {
                attributes.insert(key.to_string(), value);
            }
        }

        ElementSnapshot {
            tag,
            text,
            attributes,
            displayed,
        }
    }
}

#[async_trait]
impl Browser for WdBrowser {
    async fn launch(&mut self) -> Result<(), BrowserError> {
        if self.client.is_some() {
            return Ok(());
        }
        info!(url = %self.webdriver_url, headless = self.headless, "connecting to webdriver");
        let client = ClientBuilder::native()
            .capabilities(chrome_capabilities(self.headless))
            .connect(&self.webdriver_url)
            .await
            .map_err(|e| {
                BrowserError::Other(format!(
                    "failed to connect to webdriver at {}: {e}",
                    self.webdriver_url
                ))
            })?;
        self.client = Some(client);
        Ok(())
    }

    async fn close(&mut self) -> Result<(), BrowserError> {
        if let Some(client) = self.client.take() {
            client
                .close()
                .await
                .map_err(|e| BrowserError::Other(format!("failed to close session: {e}")))?;
        }
        Ok(())
    }

    async fn navigate(&mut self, url: &str) -> Result<(), BrowserError> {
        info!(url, "navigating");
        self.client()?
            .goto(url)
            .await
            .map_err(|e| BrowserError::Navigation(e.to_string()))
    }

    async fn current_url(&mut self) -> Result<String, BrowserError> {
        self.client()?
            .current_url()
            .await
            .map(|u| u.to_string())
            .map_err(|e| BrowserError::Query(e.to_string()))
    }

    async fn query(&mut self, locator: &Locator) -> Result<Vec<ElementSnapshot>, BrowserError> {
        let elements = self.find_all(locator).await?;
        debug!(%locator, matches = elements.len(), "query");
        let mut snapshots = Vec::with_capacity(elements.len());
        for element in &elements {
            snapshots.push(Self::snapshot(element).await);
        }
        Ok(snapshots)
    }

    async fn click(&mut self, locator: &Locator) -> Result<(), BrowserError> {
        let element = self.find_first(locator).await?;
        element
            .click()
            .await
            .map_err(|e| BrowserError::Interaction(format!("click {locator}: {e}")))
    }

    async fn fill(&mut self, locator: &Locator, value: &str) -> Result<(), BrowserError> {
        let element = self.find_first(locator).await?;
        element
            .clear()
            .await
            .map_err(|e| BrowserError::Interaction(format!("clear {locator}: {e}")))?;
        element
            .send_keys(value)
            .await
            .map_err(|e| BrowserError::Interaction(format!("fill {locator}: {e}")))
    }
}

/// An engine locator lowered to something WebDriver can run: CSS stays
/// CSS, everything else (raw XPath, text matches) goes through XPath.
enum Compiled {
    Css(String),
    XPath(String),
}

impl Compiled {
    fn from(locator: &Locator) -> Self {
        match locator.to_xpath() {
            Some(xpath) => Compiled::XPath(xpath),
            None => Compiled::Css(locator.as_stored()),
        }
    }

    fn as_wd(&self) -> WdLocator<'_> {
        match self {
            Compiled::Css(s) => WdLocator::Css(s),
            Compiled::XPath(s) => WdLocator::XPath(s),
        }
    }
}

fn chrome_capabilities(headless: bool) -> Map<String, Value> {
    let mut args = vec!["--disable-gpu", "--window-size=1280,900", "--no-first-run"];
    if headless {
        args.push("--headless=new");
    }
    let mut caps = Map::new();
    caps.insert("goog:chromeOptions".to_string(), json!({ "args": args }));
    caps
}
