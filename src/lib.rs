//! Cosmic Excuse: procedurally generated excuses for software errors.
//!
//! Classifies an error message by severity, then assembles an excuse from
//! categorized phrase fragments, a Markov-chain jargon fill and a deliberately
//! arbitrary quality score.

pub mod core;
pub mod schema;
