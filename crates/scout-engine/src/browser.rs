//! The browser capability surface.
//!
//! Everything the flow needs from a browser session: navigate, query a
//! locator into element snapshots, click, fill, read the current URL.
//! Backends (WebDriver, mocks in tests) implement this trait; the core
//! never reaches past it.

use async_trait::async_trait;
use scout_common::Locator;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("browser session not ready")]
    NotReady,
    #[error("navigation failed: {0}")]
    Navigation(String),
    #[error("locator query failed: {0}")]
    Query(String),
    #[error("interaction failed: {0}")]
    Interaction(String),
    #[error("{0}")]
    Other(String),
}

/// A point-in-time snapshot of a matched element, enough to judge
/// usability and to derive a stable selector worth storing.
#[derive(Debug, Clone, Default)]
pub struct ElementSnapshot {
    pub tag: String,
    pub text: Option<String>,
    pub attributes: HashMap<String, String>,
    /// Attached to the document and visible.
    pub displayed: bool,
}

impl ElementSnapshot {
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    /// Derive the most stable concrete selector for this element:
    /// `tag[name=..]`, then `#id`, then the expression that found it.
    /// Mirrors how the original scouting derived `input[name="..."]`
    /// from whatever heuristic matched first.
    pub fn derived_selector(&self, found_by: &Locator) -> String {
        if let Some(name) = self.attr("name")
            && !name.is_empty()
        {
            return format!("{}[name=\"{}\"]", self.tag, name);
        }
        if let Some(id) = self.attr("id")
            && !id.is_empty()
        {
            return format!("#{id}");
        }
        found_by.as_stored()
    }
}

#[async_trait]
pub trait Browser: Send + Sync {
    /// Start (or connect to) the browser session.
    async fn launch(&mut self) -> Result<(), BrowserError>;

    /// Tear the session down.
    async fn close(&mut self) -> Result<(), BrowserError>;

    async fn navigate(&mut self, url: &str) -> Result<(), BrowserError>;

    async fn current_url(&mut self) -> Result<String, BrowserError>;

    /// All elements matching the locator, in document order. An empty
    /// vec is a normal answer, not an error.
    async fn query(&mut self, locator: &Locator) -> Result<Vec<ElementSnapshot>, BrowserError>;

    /// Click the first element matching the locator.
    async fn click(&mut self, locator: &Locator) -> Result<(), BrowserError>;

    /// Clear and type into the first element matching the locator.
    async fn fill(&mut self, locator: &Locator, value: &str) -> Result<(), BrowserError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_selector_prefers_name_then_id() {
        let found_by = Locator::css("input[type=\"tel\"], input[name*=\"mobile\" i]");

        let mut snap = ElementSnapshot {
            tag: "input".into(),
            displayed: true,
            ..Default::default()
        };
        snap.attributes.insert("name".into(), "mobile".into());
        snap.attributes.insert("id".into(), "mob-1".into());
        assert_eq!(snap.derived_selector(&found_by), "input[name=\"mobile\"]");

        snap.attributes.remove("name");
        assert_eq!(snap.derived_selector(&found_by), "#mob-1");

        snap.attributes.remove("id");
        assert_eq!(
            snap.derived_selector(&found_by),
            "input[type=\"tel\"], input[name*=\"mobile\" i]"
        );
    }
}
