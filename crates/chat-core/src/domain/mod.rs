//! Domain layer for chat-core.
//!
//! Pure data types with no I/O, no locks, and no async.  Everything the
//! router, registry, and lifecycle manager pass around is defined here.
//!
//! # What belongs in the domain layer?
//!
//! - Identity types (`Username`, `ConnectionId`)
//! - Wire message types (the JSON "language" between client and server)
//! - The error taxonomy and its client-facing reply strings
//! - Timestamp formatting

pub mod clock;
pub mod error;
pub mod ids;
pub mod messages;
pub mod mode;
pub mod username;

pub use clock::{Clock, SystemClock};
pub use error::{ChatError, ErrorKind};
pub use ids::{ConnectionId, ConnectionIdAllocator};
pub use messages::{InboundMessage, OutboundMessage};
pub use mode::ChatMode;
pub use username::Username;
