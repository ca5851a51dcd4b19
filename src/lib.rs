//! View-state and derived-metrics model for a program-management dashboard.
//!
//! ```text
//! ┌──────────────┐  set_*   ┌──────────────┐  notify   ┌──────────────┐
//! │  Selection   │─────────►│   Session    │──────────►│  Observers   │
//! │  events      │          │ (owns state) │           │ (re-render)  │
//! └──────────────┘          └──────┬───────┘           └──────────────┘
//!                                  │ derived_metrics()
//!                                  ▼
//!                   ┌──────────────────────────────┐
//!                   │ metrics (pure, over records) │
//!                   └──────────────────────────────┘
//! ```

pub mod error;
pub mod format;
pub mod logging;
pub mod metrics;
pub mod records;
pub mod session;
pub mod state;

pub use error::DashboardError;
pub use metrics::{get_derived_metrics, DerivedMetrics, Metric};
pub use records::RecordSets;
pub use session::Session;
pub use state::{AlertFilter, Config, OrgFilter, Selection, View};
