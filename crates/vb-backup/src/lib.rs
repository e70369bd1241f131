//! Velero backup requests
//!
//! This crate builds Velero `Backup` objects from caller options and submits
//! them to a cluster running Velero:
//!
//! - **request**: `BackupOptions` + `RequestDefaults` -> immutable `Backup`
//! - **submit**: snapshot-location validation and the create call
//! - **client**: `VeleroClient` trait and its kube-rs implementation
//! - **velero**: Typed structs for Velero resources (Backup, Schedule, VSL)
//! - **selector** / **duration**: label-query and Go duration syntax

pub mod client;
pub mod duration;
pub mod error;
pub mod kube_utils;
pub mod request;
pub mod selector;
pub mod submit;
pub mod velero;

pub use client::{VeleroClient, VeleroClientImpl};
pub use duration::KubeDuration;
pub use error::{Error, Result};
pub use request::{BackupOptions, RequestDefaults, DEFAULT_BACKUP_TTL};
pub use selector::LabelSelector;
pub use submit::{BackupHandle, BackupSubmitter};
pub use velero::{Backup, BackupSpec, VELERO_NAMESPACE};
