//! Links end-user brokerage accounts, encrypts credentials and tokens at rest, and keeps
//! holdings in sync with the upstream brokerage.

#![deny(clippy::all, unused_crate_dependencies)]

pub mod brokerage;
pub mod config;
pub mod crypto;
pub mod domain;
pub mod error;
pub mod http;
pub mod institution;
pub mod obs;
pub mod store;
pub mod sync;

mod _prelude {
	pub use std::{
		collections::HashMap,
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use parking_lot::{Mutex, RwLock};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

pub use reqwest;
pub use url;
