//! Storage gateway: the bucket operations the bot needs, behind one trait.
//!
//! - [`StorageGateway`] - ensure-bucket, put, list, get, presign
//! - [`S3Gateway`] - S3 / MinIO implementation on `aws-sdk-s3`
//! - [`MemoryGateway`] - in-process implementation for tests and local runs
//!
//! A gateway is created once at startup and shared as an
//! `Arc<dyn StorageGateway>`. Implementations must be `Send + Sync`: the
//! transport is free to dispatch events concurrently.

pub mod error;
pub mod gateway;
pub mod memory;
pub mod s3;

pub use {
    error::{Result, StorageError},
    gateway::StorageGateway,
    memory::MemoryGateway,
    s3::{S3Gateway, S3Options},
};
