//! # Ports Module
//!
//! Inbound API, outbound collaborators and the RPC shapes they exchange.

pub mod inbound;
pub mod outbound;
pub mod rpc;

pub use inbound::*;
pub use outbound::*;
pub use rpc::{RpcMethod, RpcRequest, RpcResponse};
