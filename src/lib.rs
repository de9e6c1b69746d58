//! # Backchain
//!
//! A small backward-chaining logic engine: Prolog-style facts and rules,
//! syntactic unification and depth-first resolution with backtracking.
//!
//! ## Features
//!
//! - Terms built from atoms, logic variables and compound relations
//! - Immutable variable bindings with cycle-safe lookup
//! - Unification with an opt-in occurs check
//! - Native primitives that own the rest of the search
//! - Lazy solution enumeration through a [`QueryDriver`]
//! - Optional depth limit for runaway recursion
//!
//! ## Example
//!
//! ```rust
//! use backchain::{LogicEngine, Relation, Term};
//!
//! let mut engine = LogicEngine::new();
//! engine.add_fact(Relation::new("likes", vec![Term::atom("kim"), Term::atom("robin")]))?;
//! engine.add_rule(
//!     Relation::new("likes", vec![Term::atom("sandy"), Term::var("x")]),
//!     vec![Relation::new("likes", vec![Term::var("x"), Term::atom("robin")])],
//! )?;
//!
//! let solutions = engine.query(&[Relation::new(
//!     "likes",
//!     vec![Term::atom("sandy"), Term::var("who")],
//! )])?;
//! assert_eq!(solutions.len(), 1);
//! assert_eq!(solutions[0].to_string(), "?who = kim");
//! # Ok::<(), backchain::EngineError>(())
//! ```

/// Variable bindings.
pub mod bindings;
/// Engine configuration.
pub mod config;
/// Clause and primitive storage.
pub mod database;
/// Query facade.
pub mod engine;
/// Error types.
pub mod error;
/// Resolution.
pub mod prover;
/// Solution enumeration.
pub mod solutions;
/// Atoms, variables, relations and clauses.
pub mod term;
/// Unification.
pub mod unify;

pub use bindings::Bindings;
pub use config::EngineConfig;
pub use database::{Database, Primitive, Procedure};
pub use engine::LogicEngine;
pub use error::{EngineError, Result};
pub use prover::{prove, prove_all, resolve_args, Prover};
pub use solutions::{solve, CollectSolutions, QueryDriver, Solution, REPORT_SOLUTION};
pub use term::{Atom, Clause, Relation, Renaming, Term, Variable};
pub use unify::{unify, unify_checked, unify_clauses, unify_relations};
