//! Errors raised by [`crate::brokerage::BrokerageClient`] implementations.

// self
use crate::_prelude::*;

/// Failure modes of a brokerage API call, per the response-handling rules in C2.
#[derive(Debug, ThisError)]
pub enum BrokerageError {
	/// The brokerage returned HTTP 401.
	#[error("Brokerage rejected the request as unauthorized.")]
	Unauthorized,
	/// The brokerage returned a non-2xx status with a `{detail}` body.
	#[error("Brokerage API error ({status}): {detail}.")]
	Api {
		/// HTTP status code returned by the brokerage.
		status: u16,
		/// `detail` field from the brokerage's error body.
		detail: String,
	},
	/// The response body was not valid JSON, or did not match the expected shape.
	#[error("Brokerage transport error ({status}): {body}.")]
	Transport {
		/// HTTP status code returned by the brokerage, if one was received.
		status: u16,
		/// Raw response body, for diagnostics.
		body: String,
	},
	/// The underlying HTTP request itself failed (DNS, TCP, TLS, timeout).
	#[error("Brokerage request failed.")]
	Request(#[source] reqwest::Error),
}
