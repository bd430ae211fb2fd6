//! # arrive-std
//!
//! Standard implementations for the Arrive element-arrival dispatch library.
//!
//! This crate provides:
//! - **Tree**: an in-memory element tree with change notification
//!   ([`tree::Document`], [`tree::Element`])
//! - **Selectors**: a CSS-style selector engine plugging into the criteria
//!   model ([`selector::Selector`])
//! - **Sources**: the live and polling observation strategies
//!   ([`sources::LiveSource`], [`sources::PollingSource`])
//! - **Testing**: callback doubles ([`testing::RecordingCallback`])

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

// Re-export core traits
pub use arrive_core;

// Modules
pub mod selector;
pub mod sources;
pub mod testing;
pub mod tree;
