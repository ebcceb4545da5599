//! The resilient checkout core: selector resolution, bounded step
//! execution, the flow state machine, human gates and run reporting.
//!
//! The browser is an opaque capability behind [`browser::Browser`];
//! backends implement it, the engine never depends on a concrete one.

pub mod browser;
pub mod config;
pub mod flow;
pub mod gate;
pub mod report;
pub mod resolver;
pub mod roles;
pub mod step;
pub mod store;

pub use browser::{Browser, BrowserError, ElementSnapshot};
pub use flow::{FlowController, FlowError, FlowStage, FlowStatus, FlowTarget};
pub use gate::{HumanGate, StdioGate};
pub use report::{RunReport, StepRecord};
pub use resolver::{Candidate, LocatorResolver, Resolution};
pub use step::{StepKind, StepRunner};
pub use store::{SelectorStore, StoreError};
