//! Remote field gateways.
//!
//! The engine talks to the remote schema only through [`RemoteFieldGateway`];
//! [`BitableGateway`] is the HTTP implementation for the Bitable-style field API.

pub mod bitable;
pub mod remote;

pub use bitable::{BitableConfig, BitableGateway};
pub use remote::RemoteFieldGateway;
