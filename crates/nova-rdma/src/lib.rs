//! The RDMA-facing half of the LTC: an asynchronous `RemoteBlockClient` (component C2) plus a
//! completion-queue abstraction, and a [`LoopbackStoC`] transport for running the rest of the
//! engine without real RDMA hardware.

mod client;
mod completion;
mod loopback;
mod operation;
mod request_id;
mod transport;

pub use client::RemoteBlockClient;
pub use loopback::LoopbackStoC;
pub use operation::{Opcode, Operation, TransportError};
pub use request_id::RequestId;
pub use transport::StoCTransport;
