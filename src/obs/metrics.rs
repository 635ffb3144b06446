//! `metrics`-backed counters for crate flows.

// self
use crate::obs::{FlowKind, FlowOutcome};

/// Records a flow outcome via the global metrics recorder.
pub fn record_flow_outcome(kind: FlowKind, outcome: FlowOutcome) {
	metrics::counter!(
		"account_connections_flow_total",
		"flow" => kind.as_str(),
		"outcome" => outcome.as_str()
	)
	.increment(1);
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn record_flow_outcome_does_not_panic() {
		record_flow_outcome(FlowKind::BrokerageCall, FlowOutcome::Failure);
	}
}
