//! Session-aware HTTP client for the lockbox API.
//!
//! Every request goes through [`ApiClient::send`], which attaches the cookie
//! jar, classifies the response and, when the access credential has expired,
//! renews it through a per-client [`SingleFlight`] coordinator before
//! replaying the request once.

pub mod client;
pub mod config;
pub mod error;
pub mod single_flight;
pub mod types;

pub use client::{ApiClient, RequestSpec, SessionExpiredHandler};
pub use config::ClientConfig;
pub use error::{ClientError, ForbiddenKind};
pub use single_flight::{Joined, SingleFlight};
