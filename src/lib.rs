//! docweave - generate Ginkgo E2E test files from tagged documentation.
//!
//! Documentation files (Markdown, AsciiDoc, plain text) are scanned for
//! tagged code blocks and comment-embedded grouping markers, converted into
//! test specifications, and rendered into Go test source files.

pub mod cli;
pub mod config;
pub mod converter;
pub mod domain;
pub mod error;
pub mod generator;
pub mod parser;
pub mod scanner;
pub mod template;
