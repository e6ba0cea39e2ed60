//! Optional observability helpers for relay operations.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit structured spans named `flow_relay.op` with the `op`
//!   (operation) and `stage` (call site) fields, plus retry warnings carrying the last
//!   upstream status.
//! - Enable `metrics` to increment the `flow_relay_op_total` counter for every
//!   attempt/success/failure/rate-limit/retry, labeled by `op` + `outcome`.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Relay operations observed by the guard layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RelayOp {
	/// Upstream health probe.
	Health,
	/// Flow creation.
	CreateFlow,
	/// Flow execution.
	ExecuteFlow,
	/// Run status lookup.
	RunStatus,
	/// Generic allow-listed proxy call.
	Proxy,
}
impl RelayOp {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			RelayOp::Health => "health",
			RelayOp::CreateFlow => "create_flow",
			RelayOp::ExecuteFlow => "execute_flow",
			RelayOp::RunStatus => "run_status",
			RelayOp::Proxy => "proxy",
		}
	}
}
impl Display for RelayOp {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RelayOutcome {
	/// Entry to a guarded operation.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
	/// Rejected locally by the rate limiter.
	RateLimited,
	/// One transient failure absorbed by the retry budget.
	Retry,
}
impl RelayOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			RelayOutcome::Attempt => "attempt",
			RelayOutcome::Success => "success",
			RelayOutcome::Failure => "failure",
			RelayOutcome::RateLimited => "rate_limited",
			RelayOutcome::Retry => "retry",
		}
	}
}
impl Display for RelayOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
