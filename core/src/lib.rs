//! Blocking client for the Open5e reference API (spells, monsters, magic
//! items).
//!
//! # Overview
//! Each query accepts arbitrary named filters, keeps only the keys the
//! resource's allow-list knows, sends a GET to the resource's fixed endpoint
//! and returns the decoded JSON body untouched.
//!
//! ```no_run
//! use open5e_core::{Filters, Open5eClient};
//!
//! let client = Open5eClient::new()?;
//! let page = client.spells(&Filters::new().with("level", 3).with("school__key", "evocation"))?;
//! println!("{} spells", page["count"]);
//! client.close();
//! # Ok::<(), open5e_core::ApiError>(())
//! ```
//!
//! # Design
//! - Allow-lists are `const` slices; unknown and unset filters are dropped.
//! - Requests and responses are plain data (`HttpRequest` / `HttpResponse`),
//!   so request construction and response parsing are testable offline.
//! - The bundled `Transport` uses one pooled `ureq` agent and retries only
//!   connection failures.
//! - Errors are explicit: `TransportError`, `HttpError`, `DecodeError`.

pub mod client;
pub mod config;
pub mod error;
pub mod filters;
pub mod http;
mod transport;
pub mod types;

pub use client::Open5eClient;
pub use config::ClientConfig;
pub use error::ApiError;
pub use filters::{only_allowed, MAGIC_ITEMS_FILTERS, MONSTERS_FILTERS, SPELLS_FILTERS};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use types::{FilterValue, Filters, QueryParams, Resource, UnknownResource};
