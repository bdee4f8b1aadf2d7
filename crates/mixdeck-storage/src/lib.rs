//! Cloudflare R2 storage client.
//!
//! This crate provides:
//! - Validated uploads (MIME allow-list, size limit, collision-resistant keys)
//! - Downloads through short-lived presigned URLs into local scratch space
//! - Object deletion and existence checks
//! - URL <-> key resolution for records that store public URLs

pub mod client;
pub mod config;
pub mod error;
pub mod reference;
pub mod store;
pub mod upload;

pub use client::ObjectStorageClient;
pub use config::StorageConfig;
pub use error::{StorageError, StorageResult};
pub use reference::KeyResolver;
pub use store::MediaStore;
pub use upload::{content_type_for_path, UploadFile, UploadOptions, UploadedObject};
