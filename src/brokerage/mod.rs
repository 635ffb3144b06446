//! Typed request/response wrapper around one brokerage's REST API.

pub mod client;
pub mod error;
pub mod model;

pub use client::{BrokerageClient, BrokerageFuture, ReqwestBrokerageClient};
pub use error::BrokerageError;
pub use model::{GrantType, LoginPayload, PositionRow};
