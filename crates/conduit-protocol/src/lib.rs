//! Wire protocol shared by `conduit` clients and the `conduitd` server.
//!
//! Clients talk to the server exclusively through named pipes. A single
//! server-owned request channel receives one newline-terminated record per
//! request; each waiting client creates a private response channel before
//! publishing and reads back a three-byte acknowledgement, a three-byte status
//! and zero or more payload lines.
//!
//! The crate is split along that flow:
//!
//! - [`command`] and [`record`] validate tokens and encode or decode records.
//! - [`wire`] defines the handshake tokens and the [`Response`] body.
//! - [`request`] owns the shared request channel on both ends.
//! - [`response`] owns the per-client response channel on both ends.
//! - [`exchange`] sequences one blocking exchange as a chain of states, so a
//!   client cannot wait for a status before it has seen the acknowledgement.
//!
//! Every record fits in one atomic pipe write ([`MAX_RECORD_BYTES`]), so
//! concurrent clients never interleave their requests.

pub mod command;
pub mod error;
pub mod exchange;
mod fifo;
pub mod record;
pub mod request;
pub mod response;
pub mod wire;

pub use self::command::{Command, CommandError, MAX_RECORD_BYTES};
pub use self::error::ChannelError;
pub use self::exchange::{
    AwaitingAck, AwaitingStatus, BlockingRequest, DrainEnd, ExchangeError, Payload,
};
pub use self::record::{ANONYMOUS_SENTINEL, ClientId, EncodedRecord, Recipient, Record, RecordError};
pub use self::request::{RequestChannel, RequestPublisher};
pub use self::response::{ResponseChannel, ResponseSink};
pub use self::wire::{ACK_TOKEN, ERROR_TOKEN, Response, SUCCESS_TOKEN, Status, TOKEN_LEN};
