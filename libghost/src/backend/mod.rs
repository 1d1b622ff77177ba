//! Cluster backend implementations.
//!
//! Each backend module provides a concrete type that implements
//! [`ClusterClient`](crate::inventory::ClusterClient).

pub mod kubectl;
pub mod memory;
