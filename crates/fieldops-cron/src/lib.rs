// SPDX-FileCopyrightText: 2026 Fieldops Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Recurring-job scheduler for the Fieldops bot.
//!
//! One ticker fans out over every enabled job. [`guards::evaluate`] decides
//! whether a job is due, [`executors::Executors`] carries out its kind, and
//! each run is recorded on the job and in the in-memory [`log::ExecutionLog`].

pub mod executors;
pub mod guards;
pub mod log;
pub mod scheduler;

pub use executors::{ExecContext, Executors, RunReport};
pub use guards::{evaluate, evaluate_manual, GuardPolicy, SkipReason, Verdict};
pub use log::{ExecutionLog, LogEntry, Severity};
pub use scheduler::{Dispatch, Scheduler, SchedulerSettings};
