//! Async client core for the Trello REST API.
//!
//! # Overview
//! Every endpoint call goes through one dispatcher, [`Trello::request`]. It
//! parses the verb, merges the client's `key`/`token` with the caller's query
//! parameters, sends exactly one request through a pluggable [`Transport`]
//! and normalizes the outcome into a JSON payload or a [`TrelloError`].
//!
//! # Design
//! - `Trello` holds only immutable data (credentials, base URL, shared
//!   transport), so clones can dispatch concurrently without locking.
//! - Results are delivered either as a [`PendingRequest`] future or to a
//!   completion callback (`request_with`, [`Call::send_with`]); the entry
//!   point chosen decides which, per call.
//! - Argument errors are returned synchronously, before any I/O. Everything
//!   after dispatch arrives through the chosen delivery path.
//! - Endpoint methods return an inspectable [`Call`]; the request and
//!   response halves are also exposed (`build_request`, `parse_response`)
//!   for hosts that do their own I/O.
//!
//! ```no_run
//! # async fn run() -> Result<(), trello_core::TrelloError> {
//! let trello = trello_core::Trello::new("key", "token");
//! let board = trello.add_board("Roadmap", Some("Q3 plans"), None).send()?.await?;
//! let list = trello
//!     .add_list_to_board(board["id"].as_str().unwrap_or_default(), "Backlog")
//!     .send()?
//!     .json::<trello_core::List>()
//!     .await?;
//! println!("created list {}", list.id);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod endpoints;
pub mod error;
pub mod http;
pub mod mock;
pub mod options;
pub mod transport;
pub mod types;

pub use client::{ClientConfig, Credentials, PendingRequest, Trello, TrelloBuilder};
pub use endpoints::{Call, Sticker};
pub use error::{ErrorKind, InvalidArgument, TransportError, TrelloError};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use options::{Params, QueryValue, RequestOptions};
pub use transport::{Transport, TransportFuture, UreqTransport};
pub use types::{Board, Card, CheckItem, Checklist, Label, List, Member, Organization, Webhook};
