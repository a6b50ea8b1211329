//! Core library for gl2jira
//!
//! This crate implements the **Functional Core** of the gl2jira exporter,
//! following the Functional Core - Imperative Shell architectural pattern.
//!
//! # Architecture Overview
//!
//! - **`gl2jira_core`** (this crate): Pure transformation functions with zero I/O
//! - **`gl2jira`**: GitLab HTTP access, CLI parsing and printing (the Imperative Shell)
//!
//! The shell fetches GitLab records page by page and hands them to the
//! [`export::Exporter`], which turns them into a JIRA import document. Nothing
//! in this crate talks to the network or the filesystem, so every
//! transformation can be tested with plain fixture data.
//!
//! # Module Organization
//!
//! - [`key`]: Project key allocation with collision resolution
//! - [`markup`]: GitLab Markdown to JIRA Wiki markup conversion
//! - [`gitlab`]: GitLab REST payloads consumed by the exporter
//! - [`jira`]: JIRA JSON importer records and field mapping
//! - [`filter`]: Project, date and `key=value` mapping filters
//! - [`pagination`]: Page cursor used by the shell's page streams
//! - [`export`]: Assembles one export run into an import document
//!
//! # Example Usage
//!
//! ```rust
//! use gl2jira_core::key::KeyRegistry;
//! use gl2jira_core::markup::{MarkupConverter, MarkupOptions};
//!
//! let mut keys = KeyRegistry::new();
//! assert_eq!(keys.allocate("Foo Bar").unwrap(), "FB");
//! assert_eq!(keys.allocate("Fizz Buzz").unwrap(), "FBA");
//!
//! let converter = MarkupConverter::new(MarkupOptions::default());
//! assert_eq!(converter.convert(Some("Hello :+1: @bob")), "Hello (y) [~bob]\n");
//! ```

pub mod export;
pub mod filter;
pub mod gitlab;
pub mod jira;
pub mod key;
pub mod markup;
pub mod pagination;
