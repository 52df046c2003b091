//! Core engine for Oni
//!
//! Oni scans Python AST dumps for regular-expression literals, classifies
//! each pattern with structural backtracking heuristics, and confirms the
//! dangerous ones by timing adversarial inputs inside a killable worker
//! process.

pub mod analysis;
pub mod ast;
pub mod config;
pub mod corpus;
pub mod extract;
pub mod fuzz;
pub mod matcher;
pub mod report;
pub mod rules;
pub mod sandbox;
