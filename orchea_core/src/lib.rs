//! `orchea_core` is the core library for orchea, a tool that assembles
//! documents out of reusable markdown snippets. It owns the on-disk layout of
//! a project and everything that can be done to it without a network.
//!
//! ## Project Layout
//!
//! ```text
//! orchea.toml                     optional configuration
//! repository/<name>.md            snippet content
//! repository/<name>.yaml          snippet sidecar: title, labels, lastUpdate
//! documents/<slug>/config.yaml    document manifest: title, version, date, markdown_files
//! documents/<slug>/index.html     page generated from the index template
//! templates/document-index.html   optional index template
//! ```
//!
//! ## Modules
//!
//! - [`manifest`]: Parser and writer for the YAML subset used by sidecars
//!   and manifests.
//! - [`render`]: The built-in line based markdown renderer and the
//!   CommonMark flavor.
//! - `repository`: Snippet files and their sidecars.
//! - `documents`: Document directories.
//! - `builder`: Assembling a document from its snippets.
//! - `tags` and `search`: Label statistics and snippet search.
//! - [`config`]: Loading `orchea.toml`.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use orchea_core::Workspace;
//!
//! let workspace = Workspace::open(".").unwrap();
//! for document in workspace.documents().list().unwrap() {
//!     let built = workspace.build(&document.slug, None).unwrap();
//!     println!("{}: {} bytes", built.title, built.html.len());
//! }
//! ```

pub use builder::*;
pub use config::*;
pub use documents::*;
pub use error::*;
pub use render::Flavor;
pub use repository::*;
pub use search::*;
pub use tags::*;
pub use template::*;
pub use workspace::*;

mod builder;
pub mod config;
mod documents;
#[allow(unused_assignments)]
mod error;
pub mod manifest;
pub mod render;
mod repository;
mod search;
mod tags;
mod template;
mod workspace;

#[cfg(test)]
mod __tests;
