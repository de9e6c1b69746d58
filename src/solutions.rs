//! Enumerating solutions one at a time.
//!
//! [`solve`] appends a `report_solution(?v1, ..., ?vn)` goal holding every
//! query variable to the user's goals and installs a primitive under that name.
//! When resolution reaches it, a solution has been found: the primitive hands
//! the bindings to the [`QueryDriver`] and asks whether to keep going. Going on
//! means failing on purpose, which makes the prover backtrack into the most
//! recent choice and look for the next solution.

use indexmap::{IndexMap, IndexSet};
use log::debug;
use std::cell::RefCell;
use std::fmt;

use crate::bindings::Bindings;
use crate::config::EngineConfig;
use crate::database::{Database, Primitive};
use crate::error::{EngineError, Result};
use crate::prover::Prover;
use crate::term::{Relation, Term, Variable};

/// Name of the goal appended to every query by [`solve`].
///
/// The name is reserved: clauses, primitives and query goals using it are
/// rejected with [`EngineError::ReservedPredicate`].
pub const REPORT_SOLUTION: &str = "report_solution";

/// Receives solutions as the search finds them
pub trait QueryDriver {
    /// Called once per solution, in the order the search finds them
    fn report(&mut self, solution: &Solution);

    /// Whether to look for another solution after the one just reported
    fn should_continue(&mut self) -> bool;
}

/// The values of a query's variables in one solution
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Solution {
    /// Query variables in first-seen order with their resolved values.
    /// A variable left unbound maps to a variable.
    pub bindings: IndexMap<Variable, Term>,
}

impl Solution {
    /// Resolve every variable in `vars` under `env`
    #[must_use]
    pub fn from_vars<'v>(vars: impl IntoIterator<Item = &'v Variable>, env: &Bindings) -> Self {
        Self {
            bindings: vars
                .into_iter()
                .map(|var| (var.clone(), env.resolve(&Term::Var(var.clone()))))
                .collect(),
        }
    }

    /// The value of the variable called `name`
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Term> {
        self.bindings
            .iter()
            .find(|(var, _)| var.name() == name)
            .map(|(_, term)| term)
    }

    /// True for queries without variables
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

impl fmt::Display for Solution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.bindings.is_empty() {
            return f.write_str("yes");
        }
        for (i, (var, term)) in self.bindings.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{var} = {term}")?;
        }
        Ok(())
    }
}

/// A driver that keeps every solution, optionally stopping after `limit`
#[derive(Debug, Clone, Default)]
pub struct CollectSolutions {
    solutions: Vec<Solution>,
    limit: Option<usize>,
}

impl CollectSolutions {
    /// Collect until the search is exhausted
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Collect at most `limit` solutions
    #[must_use]
    pub fn with_limit(limit: usize) -> Self {
        Self {
            solutions: Vec::new(),
            limit: Some(limit),
        }
    }

    /// Solutions so far
    #[must_use]
    pub fn solutions(&self) -> &[Solution] {
        &self.solutions
    }

    /// Take the collected solutions
    #[must_use]
    pub fn into_solutions(self) -> Vec<Solution> {
        self.solutions
    }
}

impl QueryDriver for CollectSolutions {
    fn report(&mut self, solution: &Solution) {
        self.solutions.push(solution.clone());
    }

    fn should_continue(&mut self) -> bool {
        self.limit.map_or(true, |limit| self.solutions.len() < limit)
    }
}

/// The query-scoped primitive behind [`REPORT_SOLUTION`]
struct ReportSolution<'d, D> {
    driver: RefCell<&'d mut D>,
}

impl<D: QueryDriver> Primitive for ReportSolution<'_, D> {
    fn call(
        &self,
        args: &[Term],
        env: &Bindings,
        prover: &Prover<'_>,
        remaining: &[Relation],
    ) -> Option<Bindings> {
        let solution = Solution::from_vars(args.iter().filter_map(Term::as_var), env);
        debug!("solution: {solution}");

        let more = {
            let mut driver = self.driver.borrow_mut();
            driver.report(&solution);
            driver.should_continue()
        };
        if more {
            return None;
        }
        prover.prove_all(remaining, env)
    }
}

/// Search for solutions of the conjunction `goals`, reporting each to `driver`.
///
/// Returns the final bindings when the driver stopped the search after a
/// solution, and `Ok(None)` once every alternative has been tried. A query
/// without goals is trivially true and reports a single empty solution.
///
/// # Errors
///
/// Returns [`EngineError::ReservedPredicate`] if a goal, or a clause in
/// `database`, uses [`REPORT_SOLUTION`].
///
/// Returns [`EngineError::DepthExceeded`] when the search fails after some
/// branch hit [`EngineConfig::max_depth`]. Solutions already handed to the
/// driver are still valid, but the enumeration is incomplete.
pub fn solve<D: QueryDriver>(
    database: &Database,
    config: EngineConfig,
    goals: &[Relation],
    driver: &mut D,
) -> Result<Option<Bindings>> {
    if goals.iter().any(|goal| goal.predicate == REPORT_SOLUTION)
        || database.mentions(REPORT_SOLUTION)
    {
        return Err(EngineError::ReservedPredicate(REPORT_SOLUTION.to_string()));
    }

    let mut vars = IndexSet::new();
    for goal in goals {
        goal.collect_vars(&mut vars);
    }

    let reporter = ReportSolution {
        driver: RefCell::new(driver),
    };
    let mut prover = Prover::with_config(database, config);
    prover.install(REPORT_SOLUTION, &reporter);

    let mut conjunction = goals.to_vec();
    conjunction.push(Relation::new(
        REPORT_SOLUTION,
        vars.into_iter().map(Term::Var).collect(),
    ));

    match prover.prove_all(&conjunction, &Bindings::new()) {
        Some(env) => Ok(Some(env)),
        None => match config.max_depth {
            Some(limit) if prover.limit_reached() => Err(EngineError::DepthExceeded(limit)),
            _ => Ok(None),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::term::Clause;

    /// Answers `should_continue` from a fixed script, then stops
    struct Scripted {
        answers: Vec<bool>,
        reports: Vec<Solution>,
    }

    impl Scripted {
        fn new(answers: &[bool]) -> Self {
            Self {
                answers: answers.iter().rev().copied().collect(),
                reports: Vec::new(),
            }
        }
    }

    impl QueryDriver for Scripted {
        fn report(&mut self, solution: &Solution) {
            self.reports.push(solution.clone());
        }

        fn should_continue(&mut self) -> bool {
            self.answers.pop().unwrap_or(false)
        }
    }

    fn colors() -> Database {
        [
            Clause::fact(Relation::new("color", vec![Term::atom("red")])),
            Clause::fact(Relation::new("color", vec![Term::atom("green")])),
        ]
        .into_iter()
        .collect()
    }

    fn color_goal() -> Vec<Relation> {
        vec![Relation::new("color", vec![Term::var("c")])]
    }

    #[test]
    fn test_continue_once_then_stop() {
        let db = colors();
        let mut driver = Scripted::new(&[true, false]);

        let env = solve(&db, EngineConfig::default(), &color_goal(), &mut driver).unwrap();

        assert_eq!(driver.reports.len(), 2);
        assert_eq!(driver.reports[0].get("c"), Some(&Term::atom("red")));
        assert_eq!(driver.reports[1].get("c"), Some(&Term::atom("green")));
        assert_ne!(driver.reports[0], driver.reports[1]);
        assert_eq!(env.unwrap().resolve(&Term::var("c")), Term::atom("green"));
    }

    #[test]
    fn test_stop_at_first_solution() {
        let db = colors();
        let mut driver = Scripted::new(&[false]);

        let env = solve(&db, EngineConfig::default(), &color_goal(), &mut driver).unwrap();

        assert_eq!(driver.reports.len(), 1);
        assert!(env.is_some());
    }

    #[test]
    fn test_exhausting_the_search_ends_without_bindings() {
        let db = colors();
        let mut driver = CollectSolutions::new();

        let env = solve(&db, EngineConfig::default(), &color_goal(), &mut driver).unwrap();

        assert!(env.is_none());
        let shown: Vec<String> = driver.solutions().iter().map(ToString::to_string).collect();
        assert_eq!(shown, vec!["?c = red", "?c = green"]);
    }

    #[test]
    fn test_collect_with_limit() {
        let db = colors();
        let mut driver = CollectSolutions::with_limit(1);
        let env = solve(&db, EngineConfig::default(), &color_goal(), &mut driver).unwrap();
        assert!(env.is_some());
        assert_eq!(driver.into_solutions().len(), 1);
    }

    #[test]
    fn test_ground_query_reports_yes() {
        let db = colors();
        let mut driver = CollectSolutions::new();
        let goals = [Relation::new("color", vec![Term::atom("red")])];

        solve(&db, EngineConfig::default(), &goals, &mut driver).unwrap();

        assert_eq!(driver.solutions().len(), 1);
        assert!(driver.solutions()[0].is_empty());
        assert_eq!(driver.solutions()[0].to_string(), "yes");
    }

    #[test]
    fn test_unprovable_query_reports_nothing() {
        let db = colors();
        let mut driver = CollectSolutions::new();
        let goals = [Relation::new("color", vec![Term::atom("blue")])];

        assert_eq!(
            solve(&db, EngineConfig::default(), &goals, &mut driver),
            Ok(None)
        );
        assert!(driver.solutions().is_empty());
    }

    #[test]
    fn test_empty_query_is_trivially_true() {
        let mut driver = CollectSolutions::new();
        solve(&Database::new(), EngineConfig::default(), &[], &mut driver).unwrap();
        assert_eq!(driver.solutions(), &[Solution::default()]);
    }

    #[test]
    fn test_variables_shared_between_goals_are_reported_once() {
        let db: Database = [
            Clause::fact(Relation::new(
                "edge",
                vec![Term::atom("a"), Term::atom("b")],
            )),
            Clause::fact(Relation::new(
                "edge",
                vec![Term::atom("b"), Term::atom("c")],
            )),
        ]
        .into_iter()
        .collect();
        let goals = [
            Relation::new("edge", vec![Term::var("x"), Term::var("y")]),
            Relation::new("edge", vec![Term::var("y"), Term::var("z")]),
        ];
        let mut driver = CollectSolutions::new();
        solve(&db, EngineConfig::default(), &goals, &mut driver).unwrap();

        assert_eq!(driver.solutions().len(), 1);
        assert_eq!(driver.solutions()[0].to_string(), "?x = a, ?y = b, ?z = c");
    }

    #[test]
    fn test_depth_exceeded_is_reported() {
        let db: Database = [Clause::rule(
            Relation::new("grow", vec![Term::var("x")]),
            vec![Relation::new(
                "grow",
                vec![Term::relation("s", vec![Term::var("x")])],
            )],
        )]
        .into_iter()
        .collect();
        let goals = [Relation::new("grow", vec![Term::atom("zero")])];
        let mut driver = CollectSolutions::new();

        let result = solve(&db, EngineConfig::new().with_max_depth(32), &goals, &mut driver);
        assert_eq!(result, Err(EngineError::DepthExceeded(32)));
    }

    #[test]
    fn test_depth_exceeded_keeps_earlier_reports() {
        // nat(zero). nat(s(?x)) :- nat(?x).
        let db = Database::from_clauses([
            Clause::fact(Relation::new("nat", vec![Term::atom("zero")])),
            Clause::rule(
                Relation::new("nat", vec![Term::relation("s", vec![Term::var("x")])]),
                vec![Relation::new("nat", vec![Term::var("x")])],
            ),
        ]);
        let goals = [Relation::new("nat", vec![Term::var("n")])];
        let mut driver = CollectSolutions::new();

        let result = solve(&db, EngineConfig::new().with_max_depth(4), &goals, &mut driver);

        assert_eq!(result, Err(EngineError::DepthExceeded(4)));
        let shown: Vec<String> = driver.solutions().iter().map(ToString::to_string).collect();
        assert_eq!(
            shown,
            vec!["?n = zero", "?n = s(zero)", "?n = s(s(zero))", "?n = s(s(s(zero)))"]
        );
    }

    #[test]
    fn test_reserved_goal_is_rejected() {
        let db = colors();
        let goals = [Relation::new(REPORT_SOLUTION, vec![Term::var("c")])];
        let mut driver = CollectSolutions::new();

        let result = solve(&db, EngineConfig::default(), &goals, &mut driver);
        assert_eq!(
            result,
            Err(EngineError::ReservedPredicate(REPORT_SOLUTION.to_string()))
        );
        assert!(driver.solutions().is_empty());
    }

    #[test]
    fn test_reserved_name_in_collected_database_is_rejected() {
        let db = Database::from_clauses([Clause::rule(
            Relation::new("shadow", vec![Term::var("x")]),
            vec![Relation::new(REPORT_SOLUTION, vec![Term::var("x")])],
        )]);
        let goals = [Relation::new("shadow", vec![Term::atom("a")])];
        let mut driver = CollectSolutions::new();

        let result = solve(&db, EngineConfig::default(), &goals, &mut driver);
        assert_eq!(
            result,
            Err(EngineError::ReservedPredicate(REPORT_SOLUTION.to_string()))
        );
    }
}
