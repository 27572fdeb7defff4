//! Client core for the Basecamp project-management service.
//!
//! # Overview
//! Two protocols share one authenticated [`Connection`]:
//!
//! - the legacy RPC-style API ([`legacy::LegacyClient`]), which POSTs-as-GET
//!   parameters in a `<request>` envelope or YAML and reads back untyped
//!   records;
//! - the REST resources ([`resources`]), addressed by path and exchanged as
//!   `type`-annotated XML through [`resource::ResourceClient`].
//!
//! Both decode responses into a [`node::ParsedNode`] tree and run it through
//! [`typecast::typecast`], so every payload ends up as [`Value`]s read through
//! a [`Record`].
//!
//! # Design
//! - The connection is an explicit value; nothing is process-global.
//! - HTTP goes through the [`http::Transport`] trait. `ureq` backs it in
//!   production and, behind the `testing` feature, `testing::StubTransport` in
//!   tests.
//! - No retries, no caching. Every failure surfaces as an [`Error`].

pub mod attachment;
pub mod config;
pub mod connection;
pub mod encode;
pub mod error;
pub mod http;
pub mod legacy;
pub mod node;
pub mod path;
pub mod record;
pub mod resource;
pub mod resources;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod typecast;

pub use attachment::Attachment;
pub use config::{ConnectionConfig, WireFormat};
pub use connection::Connection;
pub use error::{Error, Result};
pub use http::{HttpMethod, HttpRequest, HttpResponse, Transport};
pub use legacy::{LegacyClient, MilestoneFilter};
pub use path::{Params, PrefixOptions, ResourceDescriptor};
pub use record::{Field, Record};
pub use resource::{Resource, ResourceClient};
pub use typecast::Value;
