//! Command implementations for the vitrine CLI

pub mod cache;
pub mod candidates;
pub mod gallery;
pub mod profile;
pub mod resolve;
