// self
use crate::obs::{RelayOp, RelayOutcome};

/// Records an operation outcome via the global metrics recorder (when enabled).
pub fn record_op_outcome(op: RelayOp, outcome: RelayOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"flow_relay_op_total",
			"op" => op.as_str(),
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (op, outcome);
	}
}
