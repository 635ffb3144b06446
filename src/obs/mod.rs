//! Observability helpers shared across brokerage calls, institution flows, and sync loops.
//!
//! Emits structured spans named `account_connections.flow` with `flow` and `stage` fields, and
//! increments the `account_connections_flow_total` counter for every attempt/success/failure,
//! labeled by `flow` + `outcome`.

pub mod metrics;
pub mod tracing;

pub use metrics::record_flow_outcome;
pub use tracing::FlowSpan;

// self
use crate::_prelude::*;

/// Flow kinds observed across the crate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowKind {
	/// A single brokerage HTTP call.
	BrokerageCall,
	/// `InstitutionService::login`.
	Login,
	/// `InstitutionService::verify_mfa`.
	VerifyMfa,
	/// `InstitutionService::get_recent_holdings`, including the driving sync pass.
	HoldingsSync,
	/// `InstitutionService::refresh_token`, including the driving refresh pass.
	TokenRefresh,
}
impl FlowKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowKind::BrokerageCall => "brokerage_call",
			FlowKind::Login => "login",
			FlowKind::VerifyMfa => "verify_mfa",
			FlowKind::HoldingsSync => "holdings_sync",
			FlowKind::TokenRefresh => "token_refresh",
		}
	}
}
impl Display for FlowKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowOutcome {
	/// Entry to an instrumented call.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
}
impl FlowOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowOutcome::Attempt => "attempt",
			FlowOutcome::Success => "success",
			FlowOutcome::Failure => "failure",
		}
	}
}
impl Display for FlowOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
