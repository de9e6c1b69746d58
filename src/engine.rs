use log::debug;

use crate::bindings::Bindings;
use crate::config::EngineConfig;
use crate::database::Database;
use crate::error::Result;
use crate::prover::Prover;
use crate::solutions::{solve, CollectSolutions, QueryDriver, Solution};
use crate::term::{Clause, Relation, Term};

/// A clause database together with the configuration used to query it
#[derive(Debug, Clone, Default)]
pub struct LogicEngine {
    database: Database,
    config: EngineConfig,
}

impl LogicEngine {
    /// Create an engine with an empty database
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an engine with an empty database and the given configuration
    #[must_use]
    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            database: Database::new(),
            config,
        }
    }

    /// The active configuration
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Replace the configuration used by later queries
    pub fn set_config(&mut self, config: EngineConfig) {
        self.config = config;
    }

    /// The underlying clause database
    #[must_use]
    pub fn database(&self) -> &Database {
        &self.database
    }

    /// Store a fact or rule
    ///
    /// # Errors
    ///
    /// Fails if the head predicate is defined as a primitive, or if the clause
    /// uses the reserved [`REPORT_SOLUTION`](crate::REPORT_SOLUTION).
    pub fn store(&mut self, clause: Clause) -> Result<()> {
        self.database.store(clause)
    }

    /// Store a clause with an empty body
    ///
    /// # Errors
    ///
    /// Fails if the predicate is defined as a primitive.
    pub fn add_fact(&mut self, fact: Relation) -> Result<()> {
        self.store(Clause::fact(fact))
    }

    /// Store `head :- body`
    ///
    /// # Errors
    ///
    /// Fails if the head predicate is defined as a primitive.
    pub fn add_rule(&mut self, head: Relation, body: Vec<Relation>) -> Result<()> {
        self.store(Clause::rule(head, body))
    }

    /// Install a native procedure, see [`Database::define_primitive`]
    ///
    /// # Errors
    ///
    /// Fails if `name` already holds clauses or is the reserved
    /// [`REPORT_SOLUTION`](crate::REPORT_SOLUTION).
    pub fn define_primitive<F>(&mut self, name: impl Into<String>, procedure: F) -> Result<()>
    where
        F: Fn(&[Term], &Bindings, &Prover<'_>, &[Relation]) -> Option<Bindings>
            + Send
            + Sync
            + 'static,
    {
        self.database.define_primitive(name, procedure)
    }

    /// Run a query, handing each solution to `driver`; see [`solve`]
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::DepthExceeded`](crate::EngineError::DepthExceeded)
    /// if the search failed after hitting the depth limit. Solutions reported
    /// to `driver` before that stay with the driver.
    pub fn solve<D: QueryDriver>(
        &self,
        goals: &[Relation],
        driver: &mut D,
    ) -> Result<Option<Bindings>> {
        debug!("query {goals:?}");
        solve(&self.database, self.config, goals, driver)
    }

    /// All solutions of `goals`, in the order the search finds them.
    ///
    /// Does not return for queries with infinitely many solutions; use
    /// [`LogicEngine::query_limit`] for those.
    ///
    /// # Errors
    ///
    /// See [`LogicEngine::solve`]. On
    /// [`EngineError::DepthExceeded`](crate::EngineError::DepthExceeded) the
    /// solutions found before the limit are discarded; run
    /// [`LogicEngine::solve`] with a [`CollectSolutions`] to keep them.
    pub fn query(&self, goals: &[Relation]) -> Result<Vec<Solution>> {
        self.collect(goals, CollectSolutions::new())
    }

    /// At most `limit` solutions of `goals`
    ///
    /// # Errors
    ///
    /// As for [`LogicEngine::query`], partial results are discarded on error.
    pub fn query_limit(&self, goals: &[Relation], limit: usize) -> Result<Vec<Solution>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        self.collect(goals, CollectSolutions::with_limit(limit))
    }

    /// The first solution of `goals`, if any
    ///
    /// # Errors
    ///
    /// See [`LogicEngine::solve`].
    pub fn first(&self, goals: &[Relation]) -> Result<Option<Solution>> {
        Ok(self.query_limit(goals, 1)?.into_iter().next())
    }

    /// Whether `goals` can be proved at all
    ///
    /// # Errors
    ///
    /// See [`LogicEngine::solve`].
    pub fn ask(&self, goals: &[Relation]) -> Result<bool> {
        Ok(self.first(goals)?.is_some())
    }

    fn collect(&self, goals: &[Relation], mut driver: CollectSolutions) -> Result<Vec<Solution>> {
        self.solve(goals, &mut driver)?;
        Ok(driver.into_solutions())
    }
}
