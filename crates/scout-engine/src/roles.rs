//! Built-in heuristic candidates per (section, role).
//!
//! These are the fallbacks tried when the selector book has nothing, or
//! when a stored selector has gone stale. The expressions come from
//! field observation of the storefront; a role with no entry here can
//! only resolve through a stored selector.

use crate::resolver::Candidate;
use scout_common::{Locator, Section, Strategy};

fn attr(css: &str) -> Candidate {
    Candidate {
        strategy: Strategy::Attribute,
        locator: Locator::css(css),
    }
}

fn text(tags: &[&str], needles: &[&str]) -> Candidate {
    Candidate {
        strategy: Strategy::TextContent,
        locator: Locator::text(tags, needles),
    }
}

/// Fallback candidates for a role, in priority order.
pub fn heuristics(section: Section, role: &str) -> Vec<Candidate> {
    match (section, role) {
        (Section::Product, "addButton") => vec![
            attr("button.btn.btn-primary"),
            text(&["button"], &["ADD"]),
        ],
        (Section::Product, "incrementButton") => {
            vec![attr("span.inc.button"), text(&["button", "span"], &["+"])]
        }
        (Section::Product, "decrementButton") => {
            vec![attr("span.dec.button"), text(&["button", "span"], &["-"])]
        }
        (Section::Product, "viewCartLink") => vec![
            attr("a[href*=\"/cart\"]"),
            text(&["a", "button"], &["VIEW CART"]),
        ],

        (Section::Cart, "payNowButton") => vec![text(&["button", "a"], &["PAY NOW"])],

        (Section::Login, "modal") => {
            vec![attr("#login, [role=\"dialog\"], [class*=\"modal\"]")]
        }
        (Section::Login, "mobileInput") => vec![attr(
            "input[type=\"tel\"], input[name*=\"mobile\" i], input[placeholder*=\"mobile\" i]",
        )],
        (Section::Login, "emailInput") => vec![attr(
            "input[type=\"email\"], input[name*=\"email\" i], input[placeholder*=\"email\" i]",
        )],
        (Section::Login, "getOtpButton") => vec![text(&["button"], &["GET OTP"])],
        (Section::Login, "otpInput") => vec![attr(
            "input[name*=\"otp\" i], input[placeholder*=\"otp\" i]",
        )],
        (Section::Login, "submitButton") => vec![text(&["button"], &["SUBMIT", "VERIFY"])],

        (Section::Payment, "cardList") => vec![attr("[class*=\"card\"]")],
        (Section::Payment, "cvvInput") => vec![attr(
            "input[name*=\"cvv\" i], input[placeholder*=\"cvv\" i]",
        )],
        (Section::Payment, "continueButton") => {
            vec![text(&["button"], &["CONTINUE", "PAY"])]
        }
        (Section::Payment, "otpInput") => vec![attr(
            "input[name*=\"otp\" i], input[placeholder*=\"otp\" i]",
        )],
        (Section::Payment, "submitOtpButton") => vec![text(&["button"], &["SUBMIT", "PAY"])],
        (Section::Payment, "successIndicator") => {
            vec![attr("[class*=\"success\"], .payment-success")]
        }

        _ => vec![],
    }
}

/// Candidates for the denomination control carrying a given face value.
/// The storefront renders one row per denomination with the amount as
/// its text; the clickable control is matched by that text.
pub fn denomination(amount: u32) -> Vec<Candidate> {
    let needle = amount.to_string();
    vec![
        Candidate {
            strategy: Strategy::Attribute,
            locator: Locator::xpath(format!(
                "//*[contains(@class,'vg-gread-row')][.//*[contains(@class,'fv')]\
                 [contains(normalize-space(.), '{needle}')]]"
            )),
        },
        Candidate {
            strategy: Strategy::TextContent,
            locator: Locator::text(&["button"], &[&needle]),
        },
    ]
}

/// Candidates for the stored-card entry ending in the given digits.
pub fn card_option(last4: &str) -> Vec<Candidate> {
    let digits: String = last4.chars().filter(char::is_ascii_digit).collect();
    vec![Candidate {
        strategy: Strategy::TextContent,
        locator: Locator::xpath(format!(
            "//*[contains(@class,'card')][contains(normalize-space(.), '{digits}')]"
        )),
    }]
}
