//! Shared data model for the voucher checkout scout.
//!
//! Everything in this crate is pure data: the selector knowledge base,
//! locator expressions, per-step outcomes, run findings and the user
//! configuration schema. No I/O and no browser coupling lives here.

pub mod book;
pub mod combine;
pub mod config;
pub mod locator;
pub mod outcome;

pub use book::{RunFindings, Section, SelectorBook};
pub use combine::{VoucherCombination, plan_combination};
pub use config::{CardDetails, Config, ScoutConfig, UserDetails};
pub use locator::Locator;
pub use outcome::{StepOutcome, Strategy};
