//! The selector knowledge base: section → role → locator string.
//!
//! The durable record is a JSON object keyed by page section. Known
//! sections with string-valued roles become typed entries; everything
//! else in the document is carried opaquely and written back verbatim,
//! so hand-edited notes or keys from newer versions survive a run.

use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Page sections the flow knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Section {
    Product,
    Cart,
    Login,
    Payment,
}

impl Section {
    pub const ALL: [Section; 4] = [
        Section::Product,
        Section::Cart,
        Section::Login,
        Section::Payment,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Section::Product => "product",
            Section::Cart => "cart",
            Section::Login => "login",
            Section::Payment => "payment",
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum BookError {
    #[error("selector book root must be a JSON object, got {0}")]
    NotAnObject(&'static str),
}

/// Selectors newly confirmed during one run, section → role → selector.
///
/// Last resolution wins when the same role is visited twice (e.g. "Pay
/// Now" clicked on both the cart and the payment return).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunFindings {
    entries: BTreeMap<Section, BTreeMap<String, String>>,
}

impl RunFindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a confirmed selector. Empty selectors are dropped; they
    /// must never overwrite a previously working entry in the book.
    pub fn record(&mut self, section: Section, role: &str, selector: &str) {
        if selector.is_empty() {
            return;
        }
        self.entries
            .entry(section)
            .or_default()
            .insert(role.to_string(), selector.to_string());
    }

    pub fn get(&self, section: Section, role: &str) -> Option<&str> {
        self.entries
            .get(&section)
            .and_then(|roles| roles.get(role))
            .map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.values().all(BTreeMap::is_empty)
    }

    pub fn len(&self) -> usize {
        self.entries.values().map(BTreeMap::len).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Section, &str, &str)> {
        self.entries.iter().flat_map(|(section, roles)| {
            roles
                .iter()
                .map(move |(role, sel)| (*section, role.as_str(), sel.as_str()))
        })
    }

    pub fn to_value(&self) -> Value {
        let mut root = Map::new();
        for (section, roles) in &self.entries {
            let mut obj = Map::new();
            for (role, sel) in roles {
                obj.insert(role.clone(), Value::String(sel.clone()));
            }
            root.insert(section.as_str().to_string(), Value::Object(obj));
        }
        Value::Object(root)
    }
}

/// Best-known locator per (section, role), loadable and savable as a
/// durable JSON record.
#[derive(Debug, Clone, Default)]
pub struct SelectorBook {
    sections: BTreeMap<Section, BTreeMap<String, String>>,
    /// The original document, kept for opaque passthrough of keys the
    /// typed model does not cover.
    raw: Map<String, Value>,
}

impl SelectorBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate a loaded JSON document into a typed book.
    ///
    /// String-valued roles under the known sections become typed
    /// entries; other keys stay in the raw document untouched.
    pub fn from_value(value: Value) -> Result<Self, BookError> {
        let raw = match value {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            Value::Array(_) => return Err(BookError::NotAnObject("array")),
            Value::String(_) => return Err(BookError::NotAnObject("string")),
            Value::Number(_) => return Err(BookError::NotAnObject("number")),
            Value::Bool(_) => return Err(BookError::NotAnObject("bool")),
        };

        let mut sections: BTreeMap<Section, BTreeMap<String, String>> = BTreeMap::new();
        for section in Section::ALL {
            if let Some(Value::Object(roles)) = raw.get(section.as_str()) {
                let typed = sections.entry(section).or_default();
                for (role, v) in roles {
                    if let Value::String(sel) = v
                        && !sel.is_empty()
                    {
                        typed.insert(role.clone(), sel.clone());
                    }
                }
            }
        }

        Ok(Self { sections, raw })
    }

    /// Re-emit the document: the raw record overlaid with every typed
    /// entry, so merged findings replace stale strings while unknown
    /// keys pass through unchanged.
    pub fn to_value(&self) -> Value {
        let mut root = self.raw.clone();
        for (section, roles) in &self.sections {
            let slot = root
                .entry(section.as_str().to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !slot.is_object() {
                *slot = Value::Object(Map::new());
            }
            if let Value::Object(obj) = slot {
                for (role, sel) in roles {
                    obj.insert(role.clone(), Value::String(sel.clone()));
                }
            }
        }
        Value::Object(root)
    }

    /// The stored locator for a role, if one has been proven before.
    pub fn stored(&self, section: Section, role: &str) -> Option<&str> {
        self.sections
            .get(&section)
            .and_then(|roles| roles.get(role))
            .map(String::as_str)
    }

    pub fn roles(&self, section: Section) -> impl Iterator<Item = (&str, &str)> {
        self.sections
            .get(&section)
            .into_iter()
            .flat_map(|roles| roles.iter().map(|(r, s)| (r.as_str(), s.as_str())))
    }

    pub fn is_empty(&self) -> bool {
        self.sections.values().all(BTreeMap::is_empty)
    }

    /// Merge run findings into the book. Only adds or replaces with
    /// newly succeeded resolutions; sections and roles absent from the
    /// findings are untouched.
    pub fn merge(&mut self, findings: &RunFindings) {
        for (section, role, selector) in findings.iter() {
            if selector.is_empty() {
                continue;
            }
            self.sections
                .entry(section)
                .or_default()
                .insert(role.to_string(), selector.to_string());
        }
    }
}

impl PartialEq for SelectorBook {
    fn eq(&self, other: &Self) -> bool {
        self.to_value() == other.to_value()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn findings_with(section: Section, role: &str, sel: &str) -> RunFindings {
        let mut f = RunFindings::new();
        f.record(section, role, sel);
        f
    }

    #[test]
    fn from_value_extracts_known_sections() {
        let book = SelectorBook::from_value(json!({
            "product": { "addButton": "button.btn.btn-primary" },
            "login": { "mobileInput": "input[name=\"mobile\"]" }
        }))
        .unwrap();

        assert_eq!(
            book.stored(Section::Product, "addButton"),
            Some("button.btn.btn-primary")
        );
        assert_eq!(
            book.stored(Section::Login, "mobileInput"),
            Some("input[name=\"mobile\"]")
        );
        assert_eq!(book.stored(Section::Cart, "payNowButton"), None);
    }

    #[test]
    fn rejects_non_object_root() {
        assert!(SelectorBook::from_value(json!([1, 2])).is_err());
        assert!(SelectorBook::from_value(json!("nope")).is_err());
    }

    #[test]
    fn unknown_keys_survive_round_trip() {
        let doc = json!({
            "product": { "addButton": "button.add", "retries": 3 },
            "notes": "hand-maintained",
            "confirmation": { "successBanner": ".ok" }
        });
        let book = SelectorBook::from_value(doc.clone()).unwrap();
        let out = book.to_value();

        assert_eq!(out["notes"], json!("hand-maintained"));
        assert_eq!(out["product"]["retries"], json!(3));
        assert_eq!(out["confirmation"]["successBanner"], json!(".ok"));
        assert_eq!(out["product"]["addButton"], json!("button.add"));
    }

    #[test]
    fn merge_adds_and_replaces_only_non_empty() {
        let mut book = SelectorBook::from_value(json!({
            "product": { "addButton": "button.stale" }
        }))
        .unwrap();

        let mut f = RunFindings::new();
        f.record(Section::Product, "addButton", "button.fresh");
        f.record(Section::Product, "viewCartLink", "a[href*=\"/cart\"]");
        f.record(Section::Cart, "payNowButton", "");
        book.merge(&f);

        assert_eq!(book.stored(Section::Product, "addButton"), Some("button.fresh"));
        assert_eq!(
            book.stored(Section::Product, "viewCartLink"),
            Some("a[href*=\"/cart\"]")
        );
        // Empty value never written.
        assert_eq!(book.stored(Section::Cart, "payNowButton"), None);
    }

    #[test]
    fn merge_is_idempotent() {
        let mut book = SelectorBook::new();
        let f = findings_with(Section::Login, "emailInput", "input[name=\"email\"]");
        book.merge(&f);
        let once = book.clone();
        book.merge(&f);
        assert_eq!(book, once);
    }

    #[test]
    fn empty_findings_leave_sections_untouched() {
        let mut book = SelectorBook::from_value(json!({
            "login": { "mobileInput": "input[type=\"tel\"]", "getOtpButton": "#otp" }
        }))
        .unwrap();
        let before = book.clone();
        book.merge(&RunFindings::new());
        assert_eq!(book, before);
    }

    #[test]
    fn findings_last_resolution_wins() {
        let mut f = RunFindings::new();
        f.record(Section::Cart, "payNowButton", "button.first");
        f.record(Section::Cart, "payNowButton", "button.second");
        assert_eq!(f.get(Section::Cart, "payNowButton"), Some("button.second"));
        assert_eq!(f.len(), 1);
    }
}
