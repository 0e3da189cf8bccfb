//! The Archivist - Conversational Cataloging Assistant Core
//!
//! This crate implements the session/dialogue engine behind the Archivist:
//! a multi-turn interviewer that extracts structured entity fields from
//! free-form conversation and tool invocations, tracks confidence and
//! conflicts across turns, and gates committing a finished entity behind a
//! deterministic completeness check.
//!
//! Persistence, the HTTP surface, vision analysis, and the language-model
//! service itself are external collaborators consumed through [`ports`].

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
