//! JSON-RPC API Layer
//!
//! JSON-RPC 2.0 server for the Quartermaster operational endpoints:
//! `partition.check.v1`, `partition.list.v1`, `admin.maintenance.v1`,
//! `admin.status.v1`.

pub mod error;
pub mod handler;
pub mod server;
pub mod types;

pub use server::{RpcServer, RpcServerConfig, DEFAULT_RPC_PORT};
