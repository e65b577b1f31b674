//! Core types and the normalization engine for the Lucera ingredient table.
//!
//! This crate is deliberately free of database and file-format dependencies.
//! Storage backends implement [`store::IngredientStore`]; extract codecs build
//! and consume [`merge::Extract`].

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod error;
pub mod group;
pub mod ingredient;
pub mod merge;
pub mod pipeline;
pub mod split;
pub mod store;

pub use error::{Error, Result};
