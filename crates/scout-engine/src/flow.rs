//! The checkout state machine.
//!
//! Product → Cart → LoginModal → CredentialFill → OtpWait → PaymentPage
//! → PaymentSelectors → terminal. The controller owns step ordering,
//! branch decisions (skip login when no credentials are configured) and
//! the human-gate suspend points. Optional lookups that fail are logged
//! and skipped; only load-bearing steps unwind the flow, and even then
//! the findings gathered so far survive in the report.

use crate::browser::{Browser, BrowserError};
use crate::gate::HumanGate;
use crate::report::RunReport;
use crate::resolver::{self, Candidate, LocatorResolver, Resolution};
use crate::roles;
use crate::step::{StepKind, StepRunner};
use scout_common::{Config, Locator, Section, SelectorBook, StepOutcome, plan_combination};
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowStage {
    ProductPage,
    CartPage,
    LoginModal,
    CredentialFill,
    OtpWait,
    PaymentPage,
    PaymentSelectors,
}

impl fmt::Display for FlowStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FlowStage::ProductPage => "product-page",
            FlowStage::CartPage => "cart-page",
            FlowStage::LoginModal => "login-modal",
            FlowStage::CredentialFill => "credential-fill",
            FlowStage::OtpWait => "otp-wait",
            FlowStage::PaymentPage => "payment-page",
            FlowStage::PaymentSelectors => "payment-selectors",
        };
        f.write_str(s)
    }
}

/// How far a run should drive the flow. The narrower targets match the
/// standalone scouting passes: product-page discovery only, or through
/// the login modal without touching credentials.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowTarget {
    Product,
    Login,
    Full,
}

/// Terminal status of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowStatus {
    /// Payment was submitted.
    Completed,
    /// Selectors were discovered but login/payment was intentionally
    /// not attempted (no credentials, or a narrower target).
    DiscoveryOnly,
    /// The flow short-circuited earlier — operator skip or a
    /// recoverable miss. Findings up to that point are kept.
    Partial,
}

impl fmt::Display for FlowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FlowStatus::Completed => "completed",
            FlowStatus::DiscoveryOnly => "discovery-only",
            FlowStatus::Partial => "partial",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Error)]
pub enum FlowError {
    #[error("invalid storefront url: {0}")]
    BadUrl(#[from] url::ParseError),
    #[error("no denomination control matches {0}")]
    DenominationNotFound(u32),
    #[error("navigation timed out waiting for '{0}'")]
    NavigationTimeout(String),
    #[error("login modal did not appear after Pay Now")]
    ModalNotShown,
    #[error("required element '{role}' on {section} could not be resolved")]
    MissingRole { section: Section, role: String },
    #[error("step '{step}' failed: {reason}")]
    StepFailed { step: String, reason: String },
    #[error(transparent)]
    Browser(#[from] BrowserError),
    #[error("operator channel failed: {0}")]
    Gate(#[from] std::io::Error),
}

/// Position plus accumulated context for one run. Never persisted;
/// every run starts from a clean browsing context.
#[derive(Debug, Clone)]
struct FlowState {
    stage: FlowStage,
    login_submitted: bool,
    payment_reached: bool,
}

impl FlowState {
    fn new() -> Self {
        Self {
            stage: FlowStage::ProductPage,
            login_submitted: false,
            payment_reached: false,
        }
    }

    fn advance(&mut self, stage: FlowStage) {
        info!(stage = %stage, "entering stage");
        self.stage = stage;
    }
}

/// Controls resolved on the login modal, reused after the OTP gate so
/// the modal-close wait targets the element that was actually found.
#[derive(Default)]
struct LoginControls {
    modal: Option<Locator>,
    mobile: Option<Locator>,
    email: Option<Locator>,
    get_otp: Option<Locator>,
    submit: Option<Locator>,
}

pub struct FlowController {
    config: Config,
    book: SelectorBook,
    target: FlowTarget,
    runner: StepRunner,
    resolver: LocatorResolver,
}

impl FlowController {
    pub fn new(config: Config, book: SelectorBook, target: FlowTarget) -> Self {
        let timeout = Duration::from_millis(config.scout.timeout);
        let slow_mo = Duration::from_millis(config.scout.slow_mo);
        Self {
            config,
            book,
            target,
            runner: StepRunner::new(timeout, slow_mo),
            resolver: LocatorResolver::new(),
        }
    }

    /// Drive the whole flow. Fatal failures come back as `Err`; the
    /// report already holds every finding gathered before the failure,
    /// so the caller can persist them regardless.
    pub async fn run<B, G>(
        &self,
        browser: &mut B,
        gate: &mut G,
        report: &mut RunReport,
    ) -> Result<FlowStatus, FlowError>
    where
        B: Browser + ?Sized,
        G: HumanGate + ?Sized,
    {
        url::Url::parse(&self.config.scout.url)?;
        let mut state = FlowState::new();

        self.product_stage(browser, report).await?;
        if self.target == FlowTarget::Product {
            return Ok(FlowStatus::DiscoveryOnly);
        }

        state.advance(FlowStage::CartPage);
        self.cart_stage(browser, report).await?;

        state.advance(FlowStage::LoginModal);
        let controls = self.login_modal_stage(browser, report).await?;
        if self.target == FlowTarget::Login {
            return Ok(FlowStatus::DiscoveryOnly);
        }

        let Some(user) = self.config.user_details.clone() else {
            info!("no credentials configured; ending at selector discovery");
            return Ok(FlowStatus::DiscoveryOnly);
        };

        state.advance(FlowStage::CredentialFill);
        self.credential_stage(browser, report, &controls, &user)
            .await?;

        state.advance(FlowStage::OtpWait);
        let otp = gate.prompt("Enter login OTP (blank to stop): ").await?;
        if otp.is_empty() {
            info!("blank OTP, stopping here by operator choice");
            return Ok(FlowStatus::Partial);
        }
        if !self.submit_otp(browser, report, &controls, &otp).await? {
            return Ok(FlowStatus::Partial);
        }
        state.login_submitted = true;

        state.advance(FlowStage::PaymentPage);
        if !self.payment_nav_stage(browser, report).await? {
            return Ok(FlowStatus::Partial);
        }
        state.payment_reached = true;

        state.advance(FlowStage::PaymentSelectors);
        let status = self.payment_stage(browser, gate, report).await?;
        info!(
            login_submitted = state.login_submitted,
            payment_reached = state.payment_reached,
            %status,
            "flow finished"
        );
        Ok(status)
    }

    fn wait(&self) -> Duration {
        self.runner.timeout
    }

    /// Resolve a role from stored selector + built-in heuristics,
    /// recording the outcome and any confirmed selector.
    async fn resolve_role<B: Browser + ?Sized>(
        &self,
        browser: &mut B,
        report: &mut RunReport,
        stage: FlowStage,
        section: Section,
        role: &str,
    ) -> Resolution {
        let candidates =
            resolver::candidates_for(self.book.stored(section, role), roles::heuristics(section, role));
        self.resolve_candidates(browser, report, stage, section, role, candidates)
            .await
    }

    async fn resolve_candidates<B: Browser + ?Sized>(
        &self,
        browser: &mut B,
        report: &mut RunReport,
        stage: FlowStage,
        section: Section,
        role: &str,
        candidates: Vec<Candidate>,
    ) -> Resolution {
        let res = self
            .resolver
            .resolve(&candidates, browser, self.wait())
            .await;
        report.record(stage, role, &res.outcome);
        match res.outcome.selector() {
            Some(selector) => {
                info!(%section, role, selector, "resolved");
                report.confirm(section, role, selector);
            }
            None => warn!(%section, role, outcome = %res.outcome, "unresolved"),
        }
        res
    }

    /// Run an action step and record it; failures are fatal.
    async fn act<B: Browser + ?Sized>(
        &self,
        browser: &mut B,
        report: &mut RunReport,
        stage: FlowStage,
        step: &str,
        kind: StepKind<'_>,
        target: Option<&Locator>,
    ) -> Result<StepOutcome, FlowError> {
        let outcome = self.runner.run(browser, kind, target).await;
        report.record(stage, step, &outcome);
        if outcome.is_success() {
            Ok(outcome)
        } else {
            Err(FlowError::StepFailed {
                step: step.to_string(),
                reason: outcome.to_string(),
            })
        }
    }

    fn require(section: Section, role: &str, res: &Resolution) -> Result<Locator, FlowError> {
        res.locator.clone().ok_or_else(|| FlowError::MissingRole {
            section,
            role: role.to_string(),
        })
    }

    async fn product_stage<B: Browser + ?Sized>(
        &self,
        browser: &mut B,
        report: &mut RunReport,
    ) -> Result<(), FlowError> {
        let stage = FlowStage::ProductPage;
        self.act(
            browser,
            report,
            stage,
            "navigate",
            StepKind::Navigate(&self.config.scout.url),
            None,
        )
        .await?;

        // Pick the denomination to buy. With a configured catalogue the
        // target must decompose exactly; the catalogue is assumed
        // stable within a run, so a failed plan is final.
        let amount = self.config.effective_target();
        let (denomination, quantity) = if self.config.available_denominations.is_empty() {
            (amount, 1)
        } else {
            let plan = plan_combination(amount, &self.config.available_denominations)
                .ok_or(FlowError::DenominationNotFound(amount))?;
            let first = &plan[0];
            if plan.len() > 1 {
                info!(
                    target = amount,
                    "target spans {} denominations; buying the largest leg first",
                    plan.len()
                );
            }
            (first.denomination, first.quantity)
        };
        info!(denomination, quantity, "selecting denomination");

        let denom = self
            .resolve_candidates(
                browser,
                report,
                stage,
                Section::Product,
                "denominationRow",
                resolver::candidates_for(
                    self.book.stored(Section::Product, "denominationRow"),
                    roles::denomination(denomination),
                ),
            )
            .await;
        let Some(denom_locator) = denom.locator else {
            return Err(FlowError::DenominationNotFound(denomination));
        };
        self.act(
            browser,
            report,
            stage,
            "selectDenomination",
            StepKind::Click,
            Some(&denom_locator),
        )
        .await?;

        let add = self
            .resolve_role(browser, report, stage, Section::Product, "addButton")
            .await;
        let add_locator = Self::require(Section::Product, "addButton", &add)?;
        self.act(
            browser,
            report,
            stage,
            "clickAdd",
            StepKind::Click,
            Some(&add_locator),
        )
        .await?;

        // Quantity controls are optional: discover them, bump the
        // quantity when needed, and skip quietly when they are missing.
        let inc = self
            .resolve_role(browser, report, stage, Section::Product, "incrementButton")
            .await;
        if quantity > 1 {
            match &inc.locator {
                Some(inc_locator) => {
                    for _ in 1..quantity {
                        self.act(
                            browser,
                            report,
                            stage,
                            "incrementQuantity",
                            StepKind::Click,
                            Some(inc_locator),
                        )
                        .await?;
                    }
                }
                None => warn!(quantity, "quantity controls not found, staying at 1"),
            }
        }
        self.resolve_role(browser, report, stage, Section::Product, "decrementButton")
            .await;

        let view_cart = self
            .resolve_role(browser, report, stage, Section::Product, "viewCartLink")
            .await;
        let view_cart_locator = Self::require(Section::Product, "viewCartLink", &view_cart)?;
        self.act(
            browser,
            report,
            stage,
            "clickViewCart",
            StepKind::Click,
            Some(&view_cart_locator),
        )
        .await?;

        Ok(())
    }

    async fn cart_stage<B: Browser + ?Sized>(
        &self,
        browser: &mut B,
        report: &mut RunReport,
    ) -> Result<(), FlowError> {
        let stage = FlowStage::CartPage;
        let pattern = &self.config.scout.cart_url_pattern;
        let outcome = self
            .runner
            .run(browser, StepKind::WaitUrlPattern(pattern), None)
            .await;
        report.record(stage, "cartUrl", &outcome);
        if !outcome.is_success() {
            return Err(FlowError::NavigationTimeout(pattern.clone()));
        }

        let pay_now = self
            .resolve_role(browser, report, stage, Section::Cart, "payNowButton")
            .await;
        let pay_now_locator = Self::require(Section::Cart, "payNowButton", &pay_now)?;
        self.act(
            browser,
            report,
            stage,
            "clickPayNow",
            StepKind::Click,
            Some(&pay_now_locator),
        )
        .await?;
        Ok(())
    }

    /// Wait for the login modal and inspect its controls. The modal is
    /// load-bearing; the inner fields are discovery here and only
    /// become required once credentials are actually filled.
    async fn login_modal_stage<B: Browser + ?Sized>(
        &self,
        browser: &mut B,
        report: &mut RunReport,
    ) -> Result<LoginControls, FlowError> {
        let stage = FlowStage::LoginModal;
        let modal = self
            .resolve_role(browser, report, stage, Section::Login, "modal")
            .await;
        let Some(modal_locator) = modal.locator else {
            return Err(FlowError::ModalNotShown);
        };

        let mut controls = LoginControls {
            modal: Some(modal_locator),
            ..Default::default()
        };
        controls.mobile = self
            .resolve_role(browser, report, stage, Section::Login, "mobileInput")
            .await
            .locator;
        controls.email = self
            .resolve_role(browser, report, stage, Section::Login, "emailInput")
            .await
            .locator;
        controls.get_otp = self
            .resolve_role(browser, report, stage, Section::Login, "getOtpButton")
            .await
            .locator;
        // The OTP input typically appears only after "Get OTP"; record
        // it if visible already, otherwise it is re-resolved later.
        self.resolve_role(browser, report, stage, Section::Login, "otpInput")
            .await;
        controls.submit = self
            .resolve_role(browser, report, stage, Section::Login, "submitButton")
            .await
            .locator;

        Ok(controls)
    }

    async fn credential_stage<B: Browser + ?Sized>(
        &self,
        browser: &mut B,
        report: &mut RunReport,
        controls: &LoginControls,
        user: &scout_common::UserDetails,
    ) -> Result<(), FlowError> {
        let stage = FlowStage::CredentialFill;
        let mobile = controls.mobile.as_ref().ok_or(FlowError::MissingRole {
            section: Section::Login,
            role: "mobileInput".into(),
        })?;
        let email = controls.email.as_ref().ok_or(FlowError::MissingRole {
            section: Section::Login,
            role: "emailInput".into(),
        })?;
        let get_otp = controls.get_otp.as_ref().ok_or(FlowError::MissingRole {
            section: Section::Login,
            role: "getOtpButton".into(),
        })?;

        self.act(
            browser,
            report,
            stage,
            "fillMobile",
            StepKind::Fill(&user.mobile),
            Some(mobile),
        )
        .await?;
        self.act(
            browser,
            report,
            stage,
            "fillEmail",
            StepKind::Fill(&user.email),
            Some(email),
        )
        .await?;
        self.act(
            browser,
            report,
            stage,
            "clickGetOtp",
            StepKind::Click,
            Some(get_otp),
        )
        .await?;
        Ok(())
    }

    /// Fill and submit the login OTP. Returns `false` when the
    /// modal-close wait times out — a recoverable partial outcome.
    async fn submit_otp<B: Browser + ?Sized>(
        &self,
        browser: &mut B,
        report: &mut RunReport,
        controls: &LoginControls,
        otp: &str,
    ) -> Result<bool, FlowError> {
        let stage = FlowStage::OtpWait;

        // Fresh resolution pass: the input usually appears only after
        // "Get OTP" was clicked.
        let otp_input = self
            .resolve_role(browser, report, stage, Section::Login, "otpInput")
            .await;
        let otp_locator = Self::require(Section::Login, "otpInput", &otp_input)?;
        self.act(
            browser,
            report,
            stage,
            "fillOtp",
            StepKind::Fill(otp),
            Some(&otp_locator),
        )
        .await?;

        let submit_locator = match &controls.submit {
            Some(l) => l.clone(),
            None => {
                let res = self
                    .resolve_role(browser, report, stage, Section::Login, "submitButton")
                    .await;
                Self::require(Section::Login, "submitButton", &res)?
            }
        };
        self.act(
            browser,
            report,
            stage,
            "clickSubmitOtp",
            StepKind::Click,
            Some(&submit_locator),
        )
        .await?;

        if let Some(modal_locator) = &controls.modal {
            let outcome = self
                .runner
                .run(browser, StepKind::WaitHidden, Some(modal_locator))
                .await;
            report.record(stage, "modalClose", &outcome);
            if !outcome.is_success() {
                warn!("login modal never closed; keeping findings and stopping");
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Second "Pay Now" and the redirect to the payment host. Timeouts
    /// here are recoverable: selectors found so far are still merged.
    async fn payment_nav_stage<B: Browser + ?Sized>(
        &self,
        browser: &mut B,
        report: &mut RunReport,
    ) -> Result<bool, FlowError> {
        let stage = FlowStage::PaymentPage;
        let pay_now = self
            .resolve_role(browser, report, stage, Section::Cart, "payNowButton")
            .await;
        let Some(pay_now_locator) = pay_now.locator else {
            warn!("Pay Now not found after login; stopping with findings");
            return Ok(false);
        };

        let click = self
            .runner
            .run(browser, StepKind::Click, Some(&pay_now_locator))
            .await;
        report.record(stage, "clickPayNow", &click);
        if !click.is_success() {
            return Ok(false);
        }

        let pattern = &self.config.scout.payment_url_pattern;
        let outcome = self
            .runner
            .run(browser, StepKind::WaitUrlPattern(pattern), None)
            .await;
        report.record(stage, "paymentUrl", &outcome);
        if !outcome.is_success() {
            warn!(pattern, "payment redirect never arrived");
            return Ok(false);
        }
        Ok(true)
    }

    /// Discover payment selectors and, gated twice on the operator,
    /// submit. Payment is financially irreversible, so nothing here
    /// auto-submits: a blank CVV or an unconfirmed gate ends the run
    /// as partial with everything discovered so far intact.
    async fn payment_stage<B, G>(
        &self,
        browser: &mut B,
        gate: &mut G,
        report: &mut RunReport,
    ) -> Result<FlowStatus, FlowError>
    where
        B: Browser + ?Sized,
        G: HumanGate + ?Sized,
    {
        let stage = FlowStage::PaymentSelectors;

        self.resolve_role(browser, report, stage, Section::Payment, "cardList")
            .await;

        if let Some(card) = &self.config.card_details {
            let res = self
                .resolve_candidates(
                    browser,
                    report,
                    stage,
                    Section::Payment,
                    "cardOption",
                    resolver::candidates_for(
                        self.book.stored(Section::Payment, "cardOption"),
                        roles::card_option(&card.last4_digits),
                    ),
                )
                .await;
            match res.locator {
                Some(card_locator) => {
                    self.act(
                        browser,
                        report,
                        stage,
                        "selectCard",
                        StepKind::Click,
                        Some(&card_locator),
                    )
                    .await?;
                }
                None => warn!(
                    last4 = card.last4_digits,
                    name = card.card_name.as_deref().unwrap_or("-"),
                    "configured card not found in the list"
                ),
            }
        }

        let cvv = self
            .resolve_role(browser, report, stage, Section::Payment, "cvvInput")
            .await;
        let continue_btn = self
            .resolve_role(browser, report, stage, Section::Payment, "continueButton")
            .await;

        let Some(cvv_locator) = cvv.locator else {
            warn!("CVV input not found; payment selectors reported, not submitting");
            return Ok(FlowStatus::Partial);
        };

        let cvv_value = gate
            .prompt("Enter CVV (blank to stop before payment): ")
            .await?;
        if cvv_value.is_empty() {
            return Ok(FlowStatus::Partial);
        }
        self.act(
            browser,
            report,
            stage,
            "fillCvv",
            StepKind::Fill(&cvv_value),
            Some(&cvv_locator),
        )
        .await?;

        if !gate
            .confirm("Submit payment? This cannot be undone. (y/N): ")
            .await?
        {
            info!("payment submit not confirmed; stopping");
            return Ok(FlowStatus::Partial);
        }

        // Misses from here on are payment-stage misses: findings are
        // already gathered, so stop partial instead of failing the run.
        let Some(continue_locator) = continue_btn.locator else {
            warn!("continue button not found after CVV; stopping with findings");
            return Ok(FlowStatus::Partial);
        };
        self.act(
            browser,
            report,
            stage,
            "clickContinue",
            StepKind::Click,
            Some(&continue_locator),
        )
        .await?;

        // Payment OTP leg.
        let otp_input = self
            .resolve_role(browser, report, stage, Section::Payment, "otpInput")
            .await;
        let Some(otp_locator) = otp_input.locator else {
            warn!("payment OTP input never appeared");
            return Ok(FlowStatus::Partial);
        };
        let payment_otp = gate.prompt("Enter payment OTP (blank to stop): ").await?;
        if payment_otp.is_empty() {
            return Ok(FlowStatus::Partial);
        }
        self.act(
            browser,
            report,
            stage,
            "fillPaymentOtp",
            StepKind::Fill(&payment_otp),
            Some(&otp_locator),
        )
        .await?;

        let submit = self
            .resolve_role(browser, report, stage, Section::Payment, "submitOtpButton")
            .await;
        let Some(submit_locator) = submit.locator else {
            warn!("payment submit button not found; OTP entered but not submitted");
            return Ok(FlowStatus::Partial);
        };
        self.act(
            browser,
            report,
            stage,
            "clickSubmitPayment",
            StepKind::Click,
            Some(&submit_locator),
        )
        .await?;

        // Success banner is informational; the submit already happened.
        self.resolve_role(browser, report, stage, Section::Payment, "successIndicator")
            .await;

        Ok(FlowStatus::Completed)
    }
}
