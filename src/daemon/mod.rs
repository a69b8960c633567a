//! Socket-serving surface: the inventory daemon, its wire protocol, and
//! the matching client.

pub mod client;
pub mod core;
pub mod protocol;

pub use client::{ClientConfig, InventoryClient};
pub use core::{DaemonConfig, InventoryDaemon};
