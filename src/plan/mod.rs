//! Maintenance plan domain model and planning engine
//!
//! Submodules:
//! - `model`: elements, spaces, task groups, tasks and reserve-fund records
//! - `state`: the plan snapshot and its state-transition function
//! - `intent`: the mutations the snapshot accepts
//! - `builder`: task group drafts, validation and submission
//! - `expansion`: periodic expansion of a task group into occurrences
//! - `cashflow`: per-year cost totals, cash projection and saldo classification
//! - `timeline`: the years × task groups read model
//! - `dates`: calendar month arithmetic

pub mod builder;
pub mod cashflow;
pub mod dates;
pub mod expansion;
mod intent;
mod model;
mod state;
pub mod timeline;

// Re-export all public types
pub use builder::{ElementLabel, SubmitMode, TaskGroupDraft, ValidatedTaskGroup};
pub use cashflow::{CashStatus, SaldoColor, SaldoPolicy, YearCashFlow};
pub use dates::local_date_today;
pub use intent::PlanIntent;
pub use model::{
    CashInfo, Document, Element, GeneralInfo, Mjop, OfferGroup, Periodicity, Pricing, Space, Task,
    TaskGroup,
};
pub use state::{FORMAT_VERSION, PlanState};
pub use timeline::{Timeline, TimelineGroupEntry, TimelineYear};
