//! The import engine
//!
//! - [`sync`] reconciles a channel snapshot against stored jobs
//! - [`lifecycle`] owns import status transitions and the metric ledger
//! - [`runner`] drives one run from fetching to a terminal status
//! - [`publishing`] announces changed and vanished jobs downstream
//! - [`action`] loads an import by id and runs it

pub mod action;
pub mod lifecycle;
pub mod publishing;
pub mod runner;
pub mod sync;

pub use action::ImportAction;
pub use lifecycle::{ImportService, LifecycleError};
pub use publishing::{PublishReport, PublishingError, PublishingStage};
pub use runner::{ImportError, ImportRunner};
pub use sync::{Decision, DecisionKind, JobSyncer, SaveFailure, SyncError};
