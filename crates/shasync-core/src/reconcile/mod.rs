//! Manifest generation, comparison and repair of remote copies

mod compare;
mod engine;
mod mismatch_log;

pub use compare::{Comparison, MismatchRecord, compare};
pub use engine::{ReconcileMode, ReconcileReport, ReconcileTarget, RecheckOutcome, Reconciler};
pub use mismatch_log::MismatchLog;
