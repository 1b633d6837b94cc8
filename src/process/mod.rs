//! External inference process invocation.
//!
//! The segmentation model runs as an OS child process behind a fixed,
//! versioned CLI contract. This module builds the command, executes it
//! through a mockable [`CommandInvoker`] seam, and interprets the
//! exit-code / stdout / result-artifact triple deterministically.
//!
//! # Exchange contract
//!
//! The child must emit exactly one JSON object on stdout when it
//! terminates, successfully or not. stderr carries free-text diagnostics
//! and is logged, never parsed.
//!
//! - success (exit 0): stdout may carry `{"n_polygons": <int>,
//!   "runtime_sec": <float>}`; absence of either field is not an error.
//! - failure (exit != 0): stdout may carry `{"message": <string>}` with
//!   the user-facing reason; anything else falls back to a generic
//!   message referencing the log file.
//! - after a zero exit the result artifact `polygons.geojson` must exist
//!   in the output directory, otherwise the run is a failure despite the
//!   exit code.

mod exchange;
mod invoker;
mod runner;

pub use exchange::{failure_reason, success_summary, FailureReport, SuccessReport, SuccessSummary};
pub use invoker::{CommandInvoker, CommandSpec, ProcessOutput, TokioInvoker};
pub use runner::{ProcessRunner, RunReport, TimedOutput, RUNNER_PROGRAM, RUNNER_SUBCOMMAND};
