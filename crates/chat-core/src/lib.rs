//! # chat-core
//!
//! Transport-independent core of the chat router: who is connected, which
//! username each connection holds, and where each inbound frame goes.
//!
//! The crate has no sockets and no async runtime.  The surrounding transport
//! (see the `chat-server` crate) hands it an object implementing
//! [`Connection`] for every live client and feeds it text frames; everything
//! else happens here.
//!
//! # Architecture overview
//!
//! ```text
//!   transport ──connect──►  SessionManager ──► ChatRouter (named | broadcast)
//!             ──frame────►  Session        ──►   │
//!             ──close────►  Session        ──►   ├── IdentityRegistry
//!                                                └── Connection::send_text
//! ```
//!
//! - **`domain`** – Plain data: usernames, connection ids, wire messages,
//!   timestamps, and the error taxonomy.
//! - **`connection`** – The [`Connection`] trait the transport implements.
//! - **`registry`** – The [`IdentityRegistry`]: a bidirectional
//!   username ↔ connection map behind one lock.
//! - **`router`** – Interprets frames.  [`NamedRouter`] speaks the JSON
//!   protocol (usernames, private messages, user lists); [`BroadcastRouter`]
//!   relays every plain-text line to everyone.
//! - **`lifecycle`** – [`SessionManager`] and [`Session`]: connect, frame
//!   dispatch, and exactly-once disconnect cleanup.

pub mod connection;
pub mod domain;
pub mod lifecycle;
pub mod registry;
pub mod router;

pub use connection::{Connection, ConnectionRef, SendError};
pub use domain::clock::{Clock, SystemClock};
pub use domain::error::{ChatError, ErrorKind};
pub use domain::ids::{ConnectionId, ConnectionIdAllocator};
pub use domain::messages::{InboundMessage, OutboundMessage};
pub use domain::mode::ChatMode;
pub use domain::username::Username;
pub use lifecycle::{Session, SessionManager};
pub use registry::{IdentityRegistry, Registration, RegistryError};
pub use router::{BroadcastRouter, ChatRouter, NamedRouter};
