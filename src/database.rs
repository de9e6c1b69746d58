use indexmap::map::Entry;
use indexmap::IndexMap;
use log::{debug, warn};
use std::fmt;
use std::sync::Arc;

use crate::bindings::Bindings;
use crate::error::{EngineError, Result};
use crate::prover::Prover;
use crate::solutions::REPORT_SOLUTION;
use crate::term::{Clause, Relation, Term};

/// A native procedure standing in for a predicate's clauses.
///
/// It receives the goal's arguments, the current bindings, the running prover
/// and the goals still pending after this one. It owns the continuation: to
/// succeed it must prove `remaining` itself (usually through
/// [`Prover::prove_all`]) and return the resulting bindings.
pub trait Primitive {
    /// Run the procedure for one goal
    fn call(
        &self,
        args: &[Term],
        env: &Bindings,
        prover: &Prover<'_>,
        remaining: &[Relation],
    ) -> Option<Bindings>;
}

impl<F> Primitive for F
where
    F: Fn(&[Term], &Bindings, &Prover<'_>, &[Relation]) -> Option<Bindings>,
{
    fn call(
        &self,
        args: &[Term],
        env: &Bindings,
        prover: &Prover<'_>,
        remaining: &[Relation],
    ) -> Option<Bindings> {
        self(args, env, prover, remaining)
    }
}

/// What a predicate name is bound to
#[derive(Clone)]
enum Definition {
    Clauses(Vec<Clause>),
    Primitive(Arc<dyn Primitive + Send + Sync>),
}

impl fmt::Debug for Definition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Definition::Clauses(clauses) => f.debug_tuple("Clauses").field(clauses).finish(),
            Definition::Primitive(_) => f.write_str("Primitive(..)"),
        }
    }
}

/// The result of looking a predicate up
#[derive(Clone, Copy)]
pub enum Procedure<'a> {
    /// Stored clauses, in insertion order
    Clauses(&'a [Clause]),
    /// A native procedure
    Primitive(&'a dyn Primitive),
}

impl fmt::Debug for Procedure<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Procedure::Clauses(clauses) => f.debug_tuple("Clauses").field(clauses).finish(),
            Procedure::Primitive(_) => f.write_str("Primitive(..)"),
        }
    }
}

/// Clauses and primitives indexed by predicate name.
///
/// A name holds either a clause list or a primitive, never both. The database
/// is meant to be filled before querying; provers only borrow it, so the
/// borrow checker rules out storing while a query runs.
///
/// Primitives must be `Send + Sync`, which makes the database itself `Send`
/// and `Sync`: one database can serve queries from several threads.
#[derive(Debug, Clone, Default)]
pub struct Database {
    definitions: IndexMap<String, Definition>,
}

impl Database {
    /// Create an empty database
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a database from facts and rules, keeping their order.
    ///
    /// Unlike [`Database::store`] this does not check for the reserved
    /// [`REPORT_SOLUTION`] name; [`crate::solve`] rejects such a database.
    #[must_use]
    pub fn from_clauses(clauses: impl IntoIterator<Item = Clause>) -> Self {
        clauses.into_iter().collect()
    }

    /// Append `clause` to the clauses of its head predicate
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::ClauseOverPrimitive`] if the predicate is
    /// defined as a primitive, and [`EngineError::ReservedPredicate`] if the
    /// head or a body goal uses [`REPORT_SOLUTION`].
    pub fn store(&mut self, clause: Clause) -> Result<()> {
        debug!("store {clause}");
        if std::iter::once(&clause.head)
            .chain(&clause.body)
            .any(|goal| goal.predicate == REPORT_SOLUTION)
        {
            return Err(EngineError::ReservedPredicate(REPORT_SOLUTION.to_string()));
        }
        match self.definitions.entry(clause.head.predicate.clone()) {
            Entry::Occupied(mut slot) => match slot.get_mut() {
                Definition::Clauses(clauses) => clauses.push(clause),
                Definition::Primitive(_) => {
                    return Err(EngineError::ClauseOverPrimitive(clause.head.predicate));
                }
            },
            Entry::Vacant(slot) => {
                slot.insert(Definition::Clauses(vec![clause]));
            }
        }
        Ok(())
    }

    /// Install a native procedure under `name`.
    ///
    /// Redefining an existing primitive replaces it.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::PrimitiveOverClauses`] if `name` already holds
    /// clauses, and [`EngineError::ReservedPredicate`] for [`REPORT_SOLUTION`].
    pub fn define_primitive<F>(&mut self, name: impl Into<String>, procedure: F) -> Result<()>
    where
        F: Fn(&[Term], &Bindings, &Prover<'_>, &[Relation]) -> Option<Bindings>
            + Send
            + Sync
            + 'static,
    {
        let name = name.into();
        if name == REPORT_SOLUTION {
            return Err(EngineError::ReservedPredicate(name));
        }
        match self.definitions.get(&name) {
            Some(Definition::Clauses(_)) => return Err(EngineError::PrimitiveOverClauses(name)),
            Some(Definition::Primitive(_)) => warn!("redefining primitive `{name}`"),
            None => debug!("define primitive `{name}`"),
        }
        self.definitions
            .insert(name, Definition::Primitive(Arc::new(procedure)));
        Ok(())
    }

    /// Look up what `name` is bound to, if anything
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<Procedure<'_>> {
        self.definitions.get(name).map(|definition| match definition {
            Definition::Clauses(clauses) => Procedure::Clauses(clauses),
            Definition::Primitive(primitive) => Procedure::Primitive(&**primitive),
        })
    }

    /// Clauses stored under `name`; empty for unknown names and primitives
    #[must_use]
    pub fn clauses(&self, name: &str) -> &[Clause] {
        match self.definitions.get(name) {
            Some(Definition::Clauses(clauses)) => clauses,
            _ => &[],
        }
    }

    /// Whether `name` is defined at all
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.definitions.contains_key(name)
    }

    /// Defined predicate names in definition order
    pub fn predicates(&self) -> impl Iterator<Item = &str> {
        self.definitions.keys().map(String::as_str)
    }

    /// Whether any clause head or body goal uses the predicate `name`
    pub(crate) fn mentions(&self, name: &str) -> bool {
        self.definitions.values().any(|definition| match definition {
            Definition::Clauses(clauses) => clauses.iter().any(|clause| {
                clause.head.predicate == name
                    || clause.body.iter().any(|goal| goal.predicate == name)
            }),
            Definition::Primitive(_) => false,
        })
    }

    /// Number of defined predicates
    #[must_use]
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    /// Whether nothing is defined
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

impl FromIterator<Clause> for Database {
    fn from_iter<I: IntoIterator<Item = Clause>>(iter: I) -> Self {
        let mut definitions: IndexMap<String, Definition> = IndexMap::new();
        for clause in iter {
            if let Definition::Clauses(clauses) = definitions
                .entry(clause.head.predicate.clone())
                .or_insert_with(|| Definition::Clauses(Vec::new()))
            {
                clauses.push(clause);
            }
        }
        Self { definitions }
    }
}

impl fmt::Display for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let clauses = self.definitions.values().flat_map(|definition| match definition {
            Definition::Clauses(clauses) => clauses.as_slice(),
            Definition::Primitive(_) => &[][..],
        });
        for (i, clause) in clauses.enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            clause.fmt(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn likes_fact() -> Clause {
        Clause::fact(Relation::new("likes", vec![Term::var("x"), Term::var("y")]))
    }

    fn likes_rule() -> Clause {
        Clause::rule(
            Relation::new("likes", vec![Term::var("x"), Term::var("y")]),
            vec![Relation::new("cool", vec![Term::var("y")])],
        )
    }

    #[test]
    fn test_store_keeps_insertion_order() {
        let mut db = Database::new();
        db.store(likes_fact()).unwrap();
        db.store(likes_rule()).unwrap();

        assert_eq!(db.clauses("likes"), &[likes_fact(), likes_rule()]);
        assert!(matches!(db.lookup("likes"), Some(Procedure::Clauses(c)) if c.len() == 2));
        assert_eq!(db.len(), 1);
    }

    #[test]
    fn test_lookup_unknown_predicate() {
        let db = Database::new();
        assert!(db.lookup("likes").is_none());
        assert!(db.clauses("likes").is_empty());
        assert!(db.is_empty());
    }

    #[test]
    fn test_define_primitive_is_looked_up() {
        let mut db = Database::new();
        db.define_primitive("succeed", |_, env, _, _| Some(env.clone()))
            .unwrap();

        let Some(Procedure::Primitive(primitive)) = db.lookup("succeed") else {
            panic!("expected a primitive");
        };
        let prover = Prover::new(&db);
        let env = Bindings::new().bind(crate::term::Variable::new("x"), Term::atom("a"));
        assert_eq!(primitive.call(&[], &env, &prover, &[]), Some(env.clone()));
        assert!(db.clauses("succeed").is_empty());
    }

    #[test]
    fn test_primitive_and_clauses_do_not_mix() {
        let mut db = Database::new();
        db.store(likes_fact()).unwrap();
        let err = db.define_primitive("likes", |_, _, _, _| None).unwrap_err();
        assert_eq!(err, EngineError::PrimitiveOverClauses("likes".to_string()));

        db.define_primitive("cool", |_, _, _, _| None).unwrap();
        let err = db
            .store(Clause::fact(Relation::new("cool", vec![Term::atom("ice")])))
            .unwrap_err();
        assert_eq!(err, EngineError::ClauseOverPrimitive("cool".to_string()));
    }

    #[test]
    fn test_redefining_a_primitive_replaces_it() {
        let mut db = Database::new();
        db.define_primitive("p", |_, _, _, _| None).unwrap();
        db.define_primitive("p", |_, env, _, _| Some(env.clone()))
            .unwrap();

        let prover = Prover::new(&db);
        let Some(Procedure::Primitive(primitive)) = db.lookup("p") else {
            panic!("expected a primitive");
        };
        assert!(primitive.call(&[], &Bindings::new(), &prover, &[]).is_some());
    }

    #[test]
    fn test_from_clauses_and_display() {
        let db = Database::from_clauses([
            likes_fact(),
            Clause::fact(Relation::new("cool", vec![Term::atom("ice")])),
            likes_rule(),
        ]);

        assert_eq!(db.predicates().collect::<Vec<_>>(), vec!["likes", "cool"]);
        assert_eq!(
            db.to_string(),
            "likes(?x, ?y)\nlikes(?x, ?y) :- cool(?y)\ncool(ice)"
        );
    }

    #[test]
    fn test_reserved_name_is_rejected() {
        let mut db = Database::new();
        let reporter = Relation::new(REPORT_SOLUTION, vec![Term::var("x")]);

        let err = db.store(Clause::fact(reporter.clone())).unwrap_err();
        assert_eq!(err, EngineError::ReservedPredicate(REPORT_SOLUTION.to_string()));

        let err = db
            .store(Clause::rule(
                Relation::new("p", vec![Term::var("x")]),
                vec![reporter],
            ))
            .unwrap_err();
        assert_eq!(err, EngineError::ReservedPredicate(REPORT_SOLUTION.to_string()));

        let err = db
            .define_primitive(REPORT_SOLUTION, |_, _, _, _| None)
            .unwrap_err();
        assert_eq!(err, EngineError::ReservedPredicate(REPORT_SOLUTION.to_string()));
        assert!(db.is_empty());
    }

    #[test]
    fn test_database_is_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Database>();

        let mut db = Database::new();
        db.store(Clause::fact(Relation::new("cool", vec![Term::atom("ice")])))
            .unwrap();
        db.define_primitive("succeed", |_, env, _, _| Some(env.clone()))
            .unwrap();
        let db = Arc::new(db);

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let db = Arc::clone(&db);
                std::thread::spawn(move || {
                    db.clauses("cool").len() + usize::from(db.contains("succeed"))
                })
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), 2);
        }
    }
}
