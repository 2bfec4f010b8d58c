//! # labelkeep
//!
//! Reconciles the labels of a GitHub repository against a declarative
//! specification, reporting differences and optionally applying them.
//!
//! ## Features
//! - Spec merging from multiple sources with alias and optional labels
//! - Deterministic, replayable reconciliation reports
//! - Per-operation-kind gating and interactive confirmation on apply
//!
//! The reconciliation engine itself is a pure function:
//!
//! ```
//! use labelkeep::report::ObservedLabel;
//! use labelkeep::spec::LabelSpec;
//! use labelkeep::{reconcile, Disposition, ReconcileOptions};
//!
//! let desired = vec![LabelSpec {
//!     name: "bug".into(),
//!     description: None,
//!     color: Some("d73a4a".into()),
//!     optional: false,
//!     aliases: Vec::new(),
//! }];
//! let observed = vec![ObservedLabel {
//!     name: "bug".into(),
//!     color: "D73A4A".into(),
//!     description: None,
//! }];
//!
//! let report = reconcile(
//!     &desired,
//!     &observed,
//!     "octo",
//!     "widgets",
//!     &[],
//!     ReconcileOptions::default(),
//! );
//! assert_eq!(report.entries[0].disposition, Disposition::Unchanged);
//! ```

pub mod apply;
pub mod error;
pub mod github;
pub mod reconcile;
pub mod render;
pub mod report;
pub mod spec;

pub use apply::{Applier, ApplyOptions, ApplyOutcome, ApplyStatus};
pub use error::{Error, Result};
pub use github::{GitHubClient, LabelStore};
pub use reconcile::{reconcile, ReconcileOptions};
pub use report::{Disposition, Report};
pub use spec::LabelSpec;
