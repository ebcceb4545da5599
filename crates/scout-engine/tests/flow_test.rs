use async_trait::async_trait;
use scout_common::{CardDetails, Config, Locator, Section, SelectorBook, UserDetails};
use scout_engine::browser::{Browser, BrowserError, ElementSnapshot};
use scout_engine::flow::{FlowController, FlowError, FlowStage, FlowStatus, FlowTarget};
use scout_engine::gate::ScriptedGate;
use scout_engine::report::RunReport;
use serde_json::json;
use std::collections::HashMap;

const PRODUCT_URL: &str = "https://shop.example/vouchers";
const CART_URL: &str = "https://shop.example/amex/cart";
const PAYMENT_URL: &str = "https://pay.example/payment/select";

/// Side effect a click fires. Each click on an element consumes the
/// next effect in its list, so the same button can open a modal on the
/// first click and navigate on the second, like the real storefront.
#[derive(Clone)]
enum Effect {
    Goto(&'static str),
    Reveal(&'static str),
    Remove(&'static str),
}

#[derive(Clone)]
struct MockElement {
    /// Overlay group this element belongs to; "" for page-native.
    group: &'static str,
    /// Substrings matched against css/xpath locator expressions.
    keys: Vec<&'static str>,
    tag: &'static str,
    text: &'static str,
    attrs: Vec<(&'static str, &'static str)>,
    effects: Vec<Effect>,
    fired: usize,
}

impl MockElement {
    fn new(tag: &'static str, text: &'static str, keys: Vec<&'static str>) -> Self {
        Self {
            group: "",
            keys,
            tag,
            text,
            attrs: vec![],
            effects: vec![],
            fired: 0,
        }
    }

    fn group(mut self, g: &'static str) -> Self {
        self.group = g;
        self
    }

    fn attr(mut self, key: &'static str, value: &'static str) -> Self {
        self.attrs.push((key, value));
        self
    }

    fn on_click(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    fn matches(&self, locator: &Locator) -> bool {
        match locator {
            Locator::Css(s) | Locator::XPath(s) => self.keys.iter().any(|k| s.contains(k)),
            Locator::Text { tags, needles } => {
                tags.iter().any(|t| t == self.tag)
                    && needles
                        .iter()
                        .any(|n| self.text.to_uppercase().contains(&n.to_uppercase()))
            }
        }
    }

    fn snapshot(&self) -> ElementSnapshot {
        let mut attributes = HashMap::new();
        for (k, v) in &self.attrs {
            attributes.insert(k.to_string(), v.to_string());
        }
        ElementSnapshot {
            tag: self.tag.to_string(),
            text: Some(self.text.to_string()),
            attributes,
            displayed: true,
        }
    }
}

/// A scripted three-page storefront: vouchers page, cart with a login
/// modal, external payment page.
struct MockStorefront {
    url: String,
    elements: Vec<MockElement>,
    pages: HashMap<&'static str, Vec<MockElement>>,
    groups: HashMap<&'static str, Vec<MockElement>>,
    filled: Vec<(String, String)>,
}

impl MockStorefront {
    fn new() -> Self {
        let mut pages: HashMap<&'static str, Vec<MockElement>> = HashMap::new();
        pages.insert(
            PRODUCT_URL,
            vec![
                MockElement::new("button", "₹250", vec!["'250'"]),
                MockElement::new("button", "ADD", vec!["button.btn.btn-primary"]),
                MockElement::new("a", "VIEW CART", vec![r#"a[href*="/cart"]"#])
                    .on_click(Effect::Goto(CART_URL)),
            ],
        );
        pages.insert(
            CART_URL,
            vec![
                MockElement::new("button", "PAY NOW", vec![])
                    .attr("id", "pay-now-btn")
                    .on_click(Effect::Reveal("login-modal"))
                    .on_click(Effect::Goto(PAYMENT_URL)),
            ],
        );
        pages.insert(
            PAYMENT_URL,
            vec![
                MockElement::new("div", "AMEX ****4321", vec![r#"[class*="card"]"#, "'4321'"]),
                MockElement::new("input", "", vec!["cvv"]).attr("name", "cvv"),
                MockElement::new("button", "CONTINUE", vec![])
                    .attr("id", "continue-btn")
                    .on_click(Effect::Reveal("payment-otp")),
                MockElement::new("button", "PAY ₹250", vec![])
                    .attr("id", "pay-submit")
                    .on_click(Effect::Reveal("success-banner")),
            ],
        );

        let mut groups: HashMap<&'static str, Vec<MockElement>> = HashMap::new();
        groups.insert(
            "login-modal",
            vec![
                MockElement::new("div", "Login", vec!["#login"])
                    .group("login-modal")
                    .attr("id", "login-modal"),
                MockElement::new("input", "", vec!["mobile"])
                    .group("login-modal")
                    .attr("name", "mobile"),
                MockElement::new("input", "", vec!["email"])
                    .group("login-modal")
                    .attr("name", "email"),
                MockElement::new("button", "GET OTP", vec![])
                    .group("login-modal")
                    .attr("id", "get-otp")
                    .on_click(Effect::Reveal("otp-entry")),
                MockElement::new("button", "SUBMIT", vec![])
                    .group("login-modal")
                    .attr("id", "verify-otp")
                    .on_click(Effect::Remove("login-modal")),
            ],
        );
        groups.insert(
            "otp-entry",
            vec![
                MockElement::new("input", "", vec!["otp"])
                    .group("otp-entry")
                    .attr("name", "otp"),
            ],
        );
        groups.insert(
            "payment-otp",
            vec![
                MockElement::new("input", "", vec!["otp"])
                    .group("payment-otp")
                    .attr("name", "otp"),
            ],
        );
        groups.insert(
            "success-banner",
            vec![
                MockElement::new("div", "Payment Successful", vec!["success"])
                    .group("success-banner"),
            ],
        );

        Self {
            url: String::new(),
            elements: Vec::new(),
            pages,
            groups,
            filled: Vec::new(),
        }
    }

    fn load(&mut self, url: &str) {
        self.url = url.to_string();
        self.elements = self.pages.get(url).cloned().unwrap_or_default();
    }

    fn apply(&mut self, effect: Effect) {
        match effect {
            Effect::Goto(url) => self.load(url),
            Effect::Reveal(group) => {
                if !self.elements.iter().any(|e| e.group == group) {
                    self.elements
                        .extend(self.groups.get(group).cloned().unwrap_or_default());
                }
            }
            Effect::Remove(group) => self.elements.retain(|e| e.group != group),
        }
    }

    /// Replace the click effects of a page element, to model a broken
    /// handler (no modal, no navigation).
    fn set_effects(&mut self, page: &'static str, text: &'static str, effects: Vec<Effect>) {
        if let Some(elements) = self.pages.get_mut(page) {
            for el in elements.iter_mut().filter(|e| e.text == text) {
                el.effects = effects.clone();
            }
        }
    }

    /// Drop an element from a page before it is loaded.
    fn remove_from_page(&mut self, page: &'static str, text: &'static str) {
        if let Some(elements) = self.pages.get_mut(page) {
            elements.retain(|e| e.text != text);
        }
    }

    fn filled_value(&self, field: &str) -> Option<&str> {
        self.filled
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, v)| v.as_str())
    }
}

#[async_trait]
impl Browser for MockStorefront {
    async fn launch(&mut self) -> Result<(), BrowserError> {
        Ok(())
    }
    async fn close(&mut self) -> Result<(), BrowserError> {
        Ok(())
    }
    async fn navigate(&mut self, url: &str) -> Result<(), BrowserError> {
        self.load(url);
        Ok(())
    }
    async fn current_url(&mut self) -> Result<String, BrowserError> {
        Ok(self.url.clone())
    }
    async fn query(&mut self, locator: &Locator) -> Result<Vec<ElementSnapshot>, BrowserError> {
        Ok(self
            .elements
            .iter()
            .filter(|e| e.matches(locator))
            .map(MockElement::snapshot)
            .collect())
    }
    async fn click(&mut self, locator: &Locator) -> Result<(), BrowserError> {
        let Some(idx) = self.elements.iter().position(|e| e.matches(locator)) else {
            return Err(BrowserError::Interaction(format!("no element for {locator}")));
        };
        let effect = {
            let el = &mut self.elements[idx];
            let effect = el.effects.get(el.fired).cloned();
            el.fired += 1;
            effect
        };
        if let Some(effect) = effect {
            self.apply(effect);
        }
        Ok(())
    }
    async fn fill(&mut self, locator: &Locator, value: &str) -> Result<(), BrowserError> {
        let Some(el) = self.elements.iter().find(|e| e.matches(locator)) else {
            return Err(BrowserError::Interaction(format!("no element for {locator}")));
        };
        let name = el
            .attrs
            .iter()
            .find(|(k, _)| *k == "name")
            .map(|(_, v)| v.to_string())
            .unwrap_or_else(|| el.tag.to_string());
        self.filled.push((name, value.to_string()));
        Ok(())
    }
}

fn test_config(with_credentials: bool) -> Config {
    let mut config = Config {
        target_amount: 250,
        available_denominations: vec![250, 500],
        ..Default::default()
    };
    if with_credentials {
        config.user_details = Some(UserDetails {
            mobile: "9999999999".into(),
            email: "a@b.com".into(),
        });
        config.card_details = Some(CardDetails {
            last4_digits: "4321".into(),
            card_name: None,
        });
    }
    config.scout.url = PRODUCT_URL.into();
    config.scout.slow_mo = 0;
    config.scout.timeout = 400;
    config
}

#[tokio::test(start_paused = true)]
async fn blank_otp_ends_partial_with_findings_merged() {
    let mut browser = MockStorefront::new();
    let mut gate = ScriptedGate::new(&[""]);
    let mut report = RunReport::new();

    let mut book = SelectorBook::from_value(json!({
        "product": { "addButton": "#stale" }
    }))
    .unwrap();

    let controller = FlowController::new(test_config(true), book.clone(), FlowTarget::Full);
    let status = controller
        .run(&mut browser, &mut gate, &mut report)
        .await
        .unwrap();

    assert_eq!(status, FlowStatus::Partial);
    // The gate fires before any OTP step runs, so the last recorded
    // step is the credential fill.
    assert_eq!(report.last_stage(), Some(FlowStage::CredentialFill));
    assert_eq!(gate.asked.len(), 1);

    // Everything up to the OTP gate was discovered.
    let findings = report.findings();
    assert_eq!(
        findings.get(Section::Product, "addButton"),
        Some("button.btn.btn-primary")
    );
    assert_eq!(
        findings.get(Section::Product, "viewCartLink"),
        Some(r#"a[href*="/cart"]"#)
    );
    assert_eq!(findings.get(Section::Cart, "payNowButton"), Some("#pay-now-btn"));
    assert_eq!(
        findings.get(Section::Login, "mobileInput"),
        Some("input[name=\"mobile\"]")
    );
    assert_eq!(
        findings.get(Section::Login, "emailInput"),
        Some("input[name=\"email\"]")
    );
    assert_eq!(findings.get(Section::Login, "getOtpButton"), Some("#get-otp"));

    // Credentials were filled before the gate.
    assert_eq!(browser.filled_value("mobile"), Some("9999999999"));
    assert_eq!(browser.filled_value("email"), Some("a@b.com"));
    // No OTP and no CVV ever reached the page.
    assert!(browser.filled_value("otp").is_none());
    assert!(browser.filled_value("cvv").is_none());

    // The stale stored selector is healed on merge.
    book.merge(findings);
    assert_eq!(
        book.stored(Section::Product, "addButton"),
        Some("button.btn.btn-primary")
    );
}

#[tokio::test(start_paused = true)]
async fn unplannable_amount_fails_before_touching_selectors() {
    let mut browser = MockStorefront::new();
    let mut gate = ScriptedGate::new(&[]);
    let mut report = RunReport::new();

    let mut config = test_config(true);
    config.target_amount = 9999;

    let controller = FlowController::new(config, SelectorBook::new(), FlowTarget::Full);
    let err = controller
        .run(&mut browser, &mut gate, &mut report)
        .await
        .unwrap_err();

    assert!(matches!(err, FlowError::DenominationNotFound(9999)));
    assert!(report.findings().is_empty());
    assert!(gate.asked.is_empty());
    // The navigate step ran; nothing past the product page did.
    assert_eq!(report.last_stage(), Some(FlowStage::ProductPage));
}

#[tokio::test(start_paused = true)]
async fn no_credentials_stops_at_discovery() {
    let mut browser = MockStorefront::new();
    let mut gate = ScriptedGate::new(&[]);
    let mut report = RunReport::new();

    let controller = FlowController::new(test_config(false), SelectorBook::new(), FlowTarget::Full);
    let status = controller
        .run(&mut browser, &mut gate, &mut report)
        .await
        .unwrap();

    assert_eq!(status, FlowStatus::DiscoveryOnly);
    assert!(gate.asked.is_empty());
    // Login selectors are still discovered, just never filled.
    assert!(report.findings().get(Section::Login, "mobileInput").is_some());
    assert!(browser.filled.is_empty());
}

#[tokio::test(start_paused = true)]
async fn product_target_ends_after_product_page() {
    let mut browser = MockStorefront::new();
    let mut gate = ScriptedGate::new(&[]);
    let mut report = RunReport::new();

    let controller =
        FlowController::new(test_config(true), SelectorBook::new(), FlowTarget::Product);
    let status = controller
        .run(&mut browser, &mut gate, &mut report)
        .await
        .unwrap();

    assert_eq!(status, FlowStatus::DiscoveryOnly);
    assert_eq!(report.last_stage(), Some(FlowStage::ProductPage));
    assert!(report.findings().get(Section::Cart, "payNowButton").is_none());
}

#[tokio::test(start_paused = true)]
async fn full_run_completes_through_payment() {
    let mut browser = MockStorefront::new();
    // Login OTP, CVV, payment confirmation, payment OTP.
    let mut gate = ScriptedGate::new(&["123456", "123", "y", "654321"]);
    let mut report = RunReport::new();

    let controller = FlowController::new(test_config(true), SelectorBook::new(), FlowTarget::Full);
    let status = controller
        .run(&mut browser, &mut gate, &mut report)
        .await
        .unwrap();

    assert_eq!(status, FlowStatus::Completed);
    assert_eq!(gate.asked.len(), 4);
    assert_eq!(browser.url, PAYMENT_URL);

    // Gated secrets went to the right fields, in order.
    assert_eq!(
        browser.filled,
        vec![
            ("mobile".to_string(), "9999999999".to_string()),
            ("email".to_string(), "a@b.com".to_string()),
            ("otp".to_string(), "123456".to_string()),
            ("cvv".to_string(), "123".to_string()),
            ("otp".to_string(), "654321".to_string()),
        ]
    );

    let findings = report.findings();
    assert_eq!(
        findings.get(Section::Payment, "cvvInput"),
        Some("input[name=\"cvv\"]")
    );
    assert_eq!(
        findings.get(Section::Payment, "continueButton"),
        Some("#continue-btn")
    );
    assert!(findings.get(Section::Payment, "successIndicator").is_some());

    // "CONTINUE" and "PAY ₹250" both match the continue-button text
    // lookup; the first in document order won and the match was flagged.
    assert!(report.ambiguous_count() >= 1);
}

#[tokio::test(start_paused = true)]
async fn declined_confirmation_never_submits() {
    let mut browser = MockStorefront::new();
    let mut gate = ScriptedGate::new(&["123456", "123", "n"]);
    let mut report = RunReport::new();

    let controller = FlowController::new(test_config(true), SelectorBook::new(), FlowTarget::Full);
    let status = controller
        .run(&mut browser, &mut gate, &mut report)
        .await
        .unwrap();

    assert_eq!(status, FlowStatus::Partial);
    // CVV was typed, but the continue button was never clicked.
    assert_eq!(browser.filled_value("cvv"), Some("123"));
    assert!(browser
        .elements
        .iter()
        .all(|e| e.group != "payment-otp" && e.group != "success-banner"));
}

#[tokio::test(start_paused = true)]
async fn cart_url_never_arriving_is_navigation_timeout() {
    let mut browser = MockStorefront::new();
    // View Cart clicks but the page never leaves the product URL.
    browser.set_effects(PRODUCT_URL, "VIEW CART", vec![]);
    let mut gate = ScriptedGate::new(&[]);
    let mut report = RunReport::new();

    let controller = FlowController::new(test_config(true), SelectorBook::new(), FlowTarget::Full);
    let err = controller
        .run(&mut browser, &mut gate, &mut report)
        .await
        .unwrap_err();

    assert!(matches!(err, FlowError::NavigationTimeout(_)));
    // Product-page findings survive the fatal stop.
    let findings = report.findings();
    assert_eq!(
        findings.get(Section::Product, "addButton"),
        Some("button.btn.btn-primary")
    );
    assert_eq!(
        findings.get(Section::Product, "viewCartLink"),
        Some(r#"a[href*="/cart"]"#)
    );
    assert!(findings.get(Section::Cart, "payNowButton").is_none());
}

#[tokio::test(start_paused = true)]
async fn missing_login_modal_is_fatal_but_keeps_findings() {
    let mut browser = MockStorefront::new();
    // Pay Now clicks but no modal ever appears.
    browser.set_effects(CART_URL, "PAY NOW", vec![]);
    let mut gate = ScriptedGate::new(&[]);
    let mut report = RunReport::new();

    let controller = FlowController::new(test_config(true), SelectorBook::new(), FlowTarget::Full);
    let err = controller
        .run(&mut browser, &mut gate, &mut report)
        .await
        .unwrap_err();

    assert!(matches!(err, FlowError::ModalNotShown));
    let findings = report.findings();
    assert_eq!(findings.get(Section::Cart, "payNowButton"), Some("#pay-now-btn"));
    assert!(findings.get(Section::Login, "mobileInput").is_none());
}

#[tokio::test(start_paused = true)]
async fn payment_redirect_timeout_is_recoverable() {
    let mut browser = MockStorefront::new();
    // Pay Now opens the login modal but the second click never
    // redirects to the payment host.
    browser.set_effects(CART_URL, "PAY NOW", vec![Effect::Reveal("login-modal")]);
    let mut gate = ScriptedGate::new(&["123456"]);
    let mut report = RunReport::new();

    let controller = FlowController::new(test_config(true), SelectorBook::new(), FlowTarget::Full);
    let status = controller
        .run(&mut browser, &mut gate, &mut report)
        .await
        .unwrap();

    assert_eq!(status, FlowStatus::Partial);
    assert_eq!(browser.url, CART_URL);
    // Login selectors discovered before the timeout are kept.
    assert_eq!(
        report.findings().get(Section::Login, "mobileInput"),
        Some("input[name=\"mobile\"]")
    );
    assert!(report.findings().get(Section::Payment, "cvvInput").is_none());
}

#[tokio::test(start_paused = true)]
async fn missing_continue_button_ends_partial_after_cvv() {
    let mut browser = MockStorefront::new();
    browser.remove_from_page(PAYMENT_URL, "CONTINUE");
    browser.remove_from_page(PAYMENT_URL, "PAY ₹250");
    let mut gate = ScriptedGate::new(&["123456", "123", "y"]);
    let mut report = RunReport::new();

    let controller = FlowController::new(test_config(true), SelectorBook::new(), FlowTarget::Full);
    let status = controller
        .run(&mut browser, &mut gate, &mut report)
        .await
        .unwrap();

    // A confirmed submit with no continue control stops partial, not
    // fatal; the CVV selector is still in the findings.
    assert_eq!(status, FlowStatus::Partial);
    assert_eq!(gate.asked.len(), 3);
    assert_eq!(browser.filled_value("cvv"), Some("123"));
    assert_eq!(
        report.findings().get(Section::Payment, "cvvInput"),
        Some("input[name=\"cvv\"]")
    );
}
