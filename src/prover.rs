//! Depth-first resolution with chronological backtracking.
//!
//! A conjunction is a single list of pending goals. Proving a goal with a rule
//! prepends the rule body to that list, so a rule's own subgoals and the goals
//! that were already waiting are treated alike, and "try the next clause" is
//! the only backtracking step needed.
//!
//! The search is not complete: left-recursive predicates, or recursion without
//! a base case, recurse forever (or until the configured depth limit). Each
//! goal activation is a native call frame, so very deep proofs need a
//! correspondingly large stack.

use indexmap::IndexMap;
use log::{debug, warn};
use std::cell::{Cell, RefCell};
use std::fmt;

use crate::bindings::Bindings;
use crate::config::EngineConfig;
use crate::database::{Database, Primitive, Procedure};
use crate::term::{Relation, Term};
use crate::unify::unify_relations;

/// The body of an active clause, located by suffix length in the goal list.
///
/// A pending goal is identified by how many goals, itself included, are left
/// from it to the end of the list. That number never changes while the goal
/// waits, because new goals are only ever prepended.
#[derive(Debug, Clone, Copy)]
struct Frame {
    low: usize,
    high: usize,
    depth: usize,
}

/// Proves goals against a borrowed [`Database`].
///
/// A prover may additionally carry query-scoped primitives (see
/// [`Prover::install`]) that shadow database entries of the same name without
/// modifying the database.
///
/// Depth is counted per goal: goals of a query are at depth 1 and the body
/// goals of a clause used for a goal at depth `d` are at depth `d + 1`. Goals
/// waiting in the conjunction keep their own depth however long the chain
/// in front of them grows.
pub struct Prover<'a> {
    database: &'a Database,
    config: EngineConfig,
    scoped: IndexMap<String, &'a dyn Primitive>,
    frames: RefCell<Vec<Frame>>,
    limit_reached: Cell<bool>,
}

impl fmt::Debug for Prover<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Prover")
            .field("database", self.database)
            .field("config", &self.config)
            .field("scoped", &self.scoped.keys().collect::<Vec<_>>())
            .field("frames", &self.frames.borrow().len())
            .field("limit_reached", &self.limit_reached.get())
            .finish()
    }
}

impl<'a> Prover<'a> {
    /// A prover with the default configuration
    #[must_use]
    pub fn new(database: &'a Database) -> Self {
        Self::with_config(database, EngineConfig::default())
    }

    /// A prover with an explicit configuration
    #[must_use]
    pub fn with_config(database: &'a Database, config: EngineConfig) -> Self {
        Self {
            database,
            config,
            scoped: IndexMap::new(),
            frames: RefCell::new(Vec::new()),
            limit_reached: Cell::new(false),
        }
    }

    /// The database goals are proved against
    #[must_use]
    pub fn database(&self) -> &'a Database {
        self.database
    }

    /// The active configuration
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Register a primitive for this prover only. It takes precedence over
    /// whatever the database holds under `name`.
    pub fn install(&mut self, name: impl Into<String>, primitive: &'a dyn Primitive) {
        self.scoped.insert(name.into(), primitive);
    }

    /// Whether some branch was cut off by [`EngineConfig::max_depth`]
    #[must_use]
    pub fn limit_reached(&self) -> bool {
        self.limit_reached.get()
    }

    /// Resolve a predicate name, scoped primitives first
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<Procedure<'a>> {
        match self.scoped.get(name) {
            Some(primitive) => Some(Procedure::Primitive(*primitive)),
            None => self.database.lookup(name),
        }
    }

    /// Prove every goal in order. An empty list succeeds with `env` itself.
    #[must_use]
    pub fn prove_all(&self, goals: &[Relation], env: &Bindings) -> Option<Bindings> {
        match goals.split_first() {
            None => Some(env.clone()),
            Some((goal, remaining)) => self.prove(goal, env, remaining),
        }
    }

    /// Prove `goal` and then every goal in `remaining`.
    ///
    /// Returns the bindings of the first complete proof, trying candidate
    /// clauses in insertion order, or `None` if no clause leads to one.
    #[must_use]
    pub fn prove(
        &self,
        goal: &Relation,
        env: &Bindings,
        remaining: &[Relation],
    ) -> Option<Bindings> {
        debug!("prove {goal} (bindings={env})");

        let clauses = match self.lookup(&goal.predicate) {
            None => {
                debug!("no definition for `{}`", goal.predicate);
                return None;
            }
            Some(Procedure::Primitive(primitive)) => {
                return primitive.call(&goal.args, env, self, remaining);
            }
            Some(Procedure::Clauses(clauses)) => clauses,
        };

        let depth = self.depth_of(remaining.len() + 1);
        if let Some(limit) = self.config.max_depth {
            if depth > limit {
                if !self.limit_reached.replace(true) {
                    warn!("depth limit {limit} reached while proving {goal}");
                }
                return None;
            }
        }

        debug!("{} candidate clauses for {goal} at depth {depth}", clauses.len());
        for clause in clauses {
            let renamed = clause.rename_fresh();
            let occurs_check = self.config.occurs_check;
            let Some(unified) = unify_relations(goal, &renamed.head, env, occurs_check) else {
                continue;
            };

            // A clause whose body repeats its own head can only loop.
            if renamed
                .body
                .iter()
                .any(|body_goal| unified.relations_resolve_equal(body_goal, &renamed.head))
            {
                debug!("skipping self-referential {}", renamed.resolve(&unified));
                continue;
            }

            let body_len = renamed.body.len();
            let mut goals = renamed.body;
            goals.extend_from_slice(remaining);
            if body_len > 0 {
                self.frames.borrow_mut().push(Frame {
                    low: remaining.len() + 1,
                    high: remaining.len() + body_len,
                    depth: depth + 1,
                });
            }
            let solved = self.prove_all(&goals, &unified);
            if body_len > 0 {
                self.frames.borrow_mut().pop();
            }
            if solved.is_some() {
                return solved;
            }
        }

        debug!("failed to prove {goal}");
        None
    }

    /// Depth of the pending goal that has `suffix` goals left from it to the end
    fn depth_of(&self, suffix: usize) -> usize {
        self.frames
            .borrow()
            .iter()
            .rev()
            .find(|frame| frame.low <= suffix && suffix <= frame.high)
            .map_or(1, |frame| frame.depth)
    }
}

/// Prove `goal`, then `remaining`, against `db` with the default configuration
#[must_use]
pub fn prove(
    goal: &Relation,
    env: &Bindings,
    db: &Database,
    remaining: &[Relation],
) -> Option<Bindings> {
    Prover::new(db).prove(goal, env, remaining)
}

/// Prove every goal in `goals` against `db` with the default configuration
#[must_use]
pub fn prove_all(goals: &[Relation], env: &Bindings, db: &Database) -> Option<Bindings> {
    Prover::new(db).prove_all(goals, env)
}

/// Convenience for primitives: resolve the arguments of a goal
#[must_use]
pub fn resolve_args(args: &[Term], env: &Bindings) -> Vec<Term> {
    args.iter().map(|arg| env.resolve(arg)).collect()
}
