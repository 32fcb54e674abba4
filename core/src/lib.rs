//! Synchronous client for the Smotreshka (lfstrm.tv) account API.
//!
//! # Overview
//! `SmotreshkaClient` maps one method to each REST endpoint of a tenant's
//! `http://{operator}.{node}.lfstrm.tv/v2/` API and returns the response body
//! as raw JSON text. Error responses are normalized: the provider's JSON error
//! object is passed through, anything else becomes `{"error":"<reason>"}`.
//!
//! # Design
//! - The client holds only the base address and a `Transport`; it is safe to
//!   share between threads.
//! - Every operation has a `build_*` twin that returns the plain-data
//!   `HttpRequest`, so request construction is testable without I/O.
//! - Responses are not decoded. `decode` offers typed decoding for callers
//!   that want it.
//!
//! ```no_run
//! use smotreshka_core::{NewAccount, SmotreshkaClient};
//!
//! # fn main() -> Result<(), smotreshka_core::ApiError> {
//! let client = SmotreshkaClient::new("operator", "node")?;
//! let created = client.create_account(&NewAccount::new("viewer@example.com").purchase("basic"))?;
//! println!("{created}");
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod decode;
pub mod error;
pub mod http;
pub mod types;

pub use client::{normalize_response, SmotreshkaClient};
pub use config::ClientConfig;
pub use decode::{decode, error_message};
pub use error::ApiError;
pub use http::{HttpMethod, HttpRequest, HttpResponse, Transport, UreqTransport};
pub use types::{AccountInfo, NewAccount};
