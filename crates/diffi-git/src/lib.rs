//! # diffi-git
//!
//! Git object store access and change resolution for diffi.
//!
//! This crate turns a repository on disk into a flat list of changed paths,
//! either between two revisions or between HEAD and the live working tree.
//!
//! ## Key Types
//!
//! - [`Repo`] - An open repository; owns the native handle
//! - [`FileChange`] - One changed path with its [`ChangeStatus`]
//! - [`GitError`] - Typed failures carrying the libgit2 error code
//!
//! ## Usage
//!
//! ```rust,ignore
//! use diffi_git::{resolve_diff, resolve_working_tree_changes};
//! use std::path::Path;
//!
//! let repo = Path::new("/path/to/repo");
//!
//! for change in resolve_diff(repo, "HEAD~1", "HEAD")? {
//!     println!("{}\t{}", change.status().code(), change.path());
//! }
//!
//! let pending = resolve_working_tree_changes(repo, true)?;
//! ```
//!
//! ## Status Precedence
//!
//! When a path is changed in both the index and the working tree, the
//! working-tree side decides both the reported path and its status.

mod diff;
mod error;
mod repo;
mod service;
mod status;

pub use diff::{ChangeStatus, FileChange};
pub use error::{GitError, NativeCode, NativeError};
pub use repo::{ObjectAddress, Repo};
pub use service::{
    resolve_diff, resolve_status, resolve_working_tree_changes, resolve_working_tree_diff,
    show_file,
};
