use thiserror::Error;

/// Errors surfaced to callers of the engine.
///
/// Failing to prove a goal is never an error: proofs return `None` for that.
/// These variants cover setup mistakes and resource exhaustion only.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// A primitive was defined under a predicate that already holds clauses.
    #[error("predicate `{0}` already has clauses and cannot be redefined as a primitive")]
    PrimitiveOverClauses(String),

    /// A clause was stored under a predicate that is bound to a primitive.
    #[error("predicate `{0}` is a primitive and cannot hold clauses")]
    ClauseOverPrimitive(String),

    /// A clause, primitive or query used a predicate name the engine keeps
    /// for itself.
    #[error("predicate `{0}` is reserved by the engine")]
    ReservedPredicate(String),

    /// The search failed after hitting the configured depth limit somewhere.
    #[error("proof search exceeded the maximum depth of {0}")]
    DepthExceeded(usize),

    /// The engine configuration could not be loaded.
    #[error("invalid engine configuration: {0}")]
    InvalidConfig(String),
}

/// Result type used across the crate.
pub type Result<T> = std::result::Result<T, EngineError>;
