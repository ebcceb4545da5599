//! Locator expressions for page elements.
//!
//! Stored selectors are plain strings in the book; at the boundary they
//! are parsed into one of three shapes: CSS, raw XPath, or a text-content
//! match that compiles to case-insensitive XPath. WebDriver has no
//! `:has-text()` pseudo-class, so text matching goes through
//! `contains(translate(...))`.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    /// A CSS selector (possibly a comma-separated candidate list).
    Css(String),
    /// A raw XPath expression.
    XPath(String),
    /// Case-insensitive text-content match over one or more tags,
    /// accepting any of the needles ("SUBMIT" or "VERIFY").
    Text {
        tags: Vec<String>,
        needles: Vec<String>,
    },
}

const LOWER: &str = "abcdefghijklmnopqrstuvwxyz";
const UPPER: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ";

impl Locator {
    pub fn css(selector: impl Into<String>) -> Self {
        Locator::Css(selector.into())
    }

    pub fn xpath(expr: impl Into<String>) -> Self {
        Locator::XPath(expr.into())
    }

    pub fn text(tags: &[&str], needles: &[&str]) -> Self {
        Locator::Text {
            tags: tags.iter().map(|t| t.to_string()).collect(),
            needles: needles.iter().map(|n| n.to_string()).collect(),
        }
    }

    /// Parse a stored selector string. XPath is recognized by shape,
    /// anything else is treated as CSS.
    pub fn parse(stored: &str) -> Self {
        let s = stored.trim();
        if s.starts_with('/') || s.starts_with("(//") || s.starts_with("./") {
            Locator::XPath(s.to_string())
        } else {
            Locator::Css(s.to_string())
        }
    }

    /// The durable string form written into the selector book.
    pub fn as_stored(&self) -> String {
        match self {
            Locator::Css(s) => s.clone(),
            Locator::XPath(x) => x.clone(),
            Locator::Text { .. } => self.to_xpath().expect("text locator compiles to xpath"),
        }
    }

    /// Compile to XPath where the backing query engine needs one.
    /// CSS locators return `None`; they are queried natively.
    pub fn to_xpath(&self) -> Option<String> {
        match self {
            Locator::Css(_) => None,
            Locator::XPath(x) => Some(x.clone()),
            Locator::Text { tags, needles } => {
                let clause = needles
                    .iter()
                    .map(|n| {
                        format!(
                            "contains(translate(normalize-space(.), '{LOWER}', '{UPPER}'), '{}')",
                            xpath_escape(&n.to_uppercase())
                        )
                    })
                    .collect::<Vec<_>>()
                    .join(" or ");
                let unions = tags
                    .iter()
                    .map(|tag| format!("//{tag}[{clause}]"))
                    .collect::<Vec<_>>()
                    .join(" | ");
                Some(unions)
            }
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Css(s) => write!(f, "css `{s}`"),
            Locator::XPath(x) => write!(f, "xpath `{x}`"),
            Locator::Text { tags, needles } => {
                write!(f, "text {:?} in <{}>", needles, tags.join(","))
            }
        }
    }
}

/// Strip characters that would break out of a single-quoted XPath
/// literal. Needles come from the role catalog or config, never from
/// page content, so dropping quotes is enough.
fn xpath_escape(s: &str) -> String {
    s.chars().filter(|c| *c != '\'' && *c != '"').collect()
}
