//! Membership RPC spoken with coordinators.
//!
//! Each call opens one TCP connection, writes a single JSON line request,
//! and reads a single JSON line response. The wire types are shared with the
//! stub servers.

mod client;
mod errors;
mod protocol;

pub use client::{CoordinatorProxy, MembershipClient, RpcContext};
pub use errors::RpcError;
pub use protocol::{
    MAX_MESSAGE_BYTES, RpcRequest, RpcResponse, WorkerEntry, read_message, write_message,
};

const RPC_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::rpc");
