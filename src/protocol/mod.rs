//! Client-server protocol for distributed modular factorials.
//!
//! A client splits `1..=k` into one span per server and sends each server a
//! [`ComputationRequest`]. The server splits its span again across its own worker threads,
//! multiplies the partial products together and answers with a [`ComputationReply`]. The
//! client multiplies every reply it gets back into the final residue.
//!
//! # Binary Format
//!
//! Messages have no header and no length prefix; their size alone frames them.
//!
//! - Request, 24 bytes: `begin | end | modulus`, each a `u64`.
//! - Reply, 8 bytes: `result`, a `u64`.
//! - All integers are big-endian, whatever the byte order of either host.
//!
//! A connection may carry any number of request/reply pairs in sequence. Either side may
//! close it between pairs; that is an orderly end of the session, not an error. Closing in
//! the middle of a message is a protocol violation.
//!
//! # Key Components
//!
//! - [`FactorialServer`]: accepts connections and serves them on a bounded set of handler
//!   threads, computing each request with a [`WorkerPool`](crate::pool::WorkerPool).
//! - [`Dispatcher`]: fans a computation out over a static server list and folds the replies.
//! - [`ProtocolTransport`]: fixed-size message framing over any `Read + Write` stream.
mod client;
mod request;
mod response;
mod server;
mod thread;
mod transport;

pub use client::{Assignment, DispatchError, DispatchReport, Dispatcher, PlanError};
pub use request::{ComputationRequest, RequestError};
pub use response::{ComputationReply, PartialResult};
pub use server::{FactorialServer, ServerConfig, ServerError, SessionError};
pub use thread::{ThreadPool, ThreadPoolError};
pub use transport::{ProtocolTransport, REPLY_SIZE, REQUEST_SIZE, TransportError};
