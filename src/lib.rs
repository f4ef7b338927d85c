//! Docent is a terminal client for a document-grounded chat backend.
//!
//! The crate is organized around a small set of collaborating layers:
//! - [`core`] owns session state: the conversation timeline with its one
//!   outstanding question, and the ingestion tracker that follows each
//!   uploaded file from drop to completion or failure.
//! - [`api`] defines the chat and upload wire payloads and the [`api::Backend`]
//!   seam, with an HTTP implementation in [`api::http`].
//! - [`utils`] holds URL joining and the transcript log.
//!
//! Runtime entrypoints live in the binary crate (`src/main.rs`) and route
//! through [`crate::cli::main`], which resolves settings once and drives the
//! managers from a single task.

pub mod api;
pub mod cli;
pub mod core;
pub mod utils;
