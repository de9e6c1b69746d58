use indexmap::{IndexMap, IndexSet};
use log::trace;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::bindings::Bindings;

/// Process-wide source of fresh variable names.
static FRESH_VARIABLES: AtomicUsize = AtomicUsize::new(0);

/// A variable-to-variable renaming used to instantiate clauses.
pub type Renaming = IndexMap<Variable, Variable>;

/// A literal value (symbol, number or string) treated as an opaque token
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct Atom(String);

impl Atom {
    /// Create an atom from any token
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The token text
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Atom {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Atom {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<i64> for Atom {
    fn from(value: i64) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A logic variable, identified by its name
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct Variable {
    name: String,
}

impl Variable {
    /// Create a variable with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// Mint a variable that has never been handed out before (`var0`, `var1`, ...).
    ///
    /// Names come from a process-wide counter. Authored variables should not
    /// use the `var<N>` shape or they may collide with minted ones.
    #[must_use]
    pub fn fresh() -> Self {
        let id = FRESH_VARIABLES.fetch_add(1, Ordering::Relaxed);
        Self {
            name: format!("var{id}"),
        }
    }

    /// The variable name, without the `?` sigil
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "?{}", self.name)
    }
}

/// Any term: an atom, a variable or a compound relation
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Term {
    /// A literal value (e.g. `kim`, `42`)
    Atom(Atom),
    /// A placeholder that can be bound during unification (e.g. `?x`)
    Var(Variable),
    /// A compound term (e.g. `pair(?x, nil)`)
    Relation(Relation),
}

impl Term {
    /// Shorthand for an atom term
    pub fn atom(value: impl Into<Atom>) -> Self {
        Term::Atom(value.into())
    }

    /// Shorthand for a variable term
    pub fn var(name: impl Into<String>) -> Self {
        Term::Var(Variable::new(name))
    }

    /// Shorthand for a compound term
    pub fn relation(predicate: impl Into<String>, args: Vec<Term>) -> Self {
        Term::Relation(Relation::new(predicate, args))
    }

    /// The variable, if this term is one
    #[must_use]
    pub fn as_var(&self) -> Option<&Variable> {
        match self {
            Term::Var(var) => Some(var),
            _ => None,
        }
    }

    /// Variables in first-seen order, without duplicates
    #[must_use]
    pub fn vars(&self) -> Vec<Variable> {
        let mut vars = IndexSet::new();
        self.collect_vars(&mut vars);
        vars.into_iter().collect()
    }

    /// Add the variables of this term to `vars`, preserving first-seen order
    pub fn collect_vars(&self, vars: &mut IndexSet<Variable>) {
        match self {
            Term::Atom(_) => {}
            Term::Var(var) => {
                vars.insert(var.clone());
            }
            Term::Relation(relation) => relation.collect_vars(vars),
        }
    }

    /// Replace variables that appear as keys in `renaming`
    #[must_use]
    pub fn substitute(&self, renaming: &Renaming) -> Term {
        match self {
            Term::Atom(_) => self.clone(),
            Term::Var(var) => renaming
                .get(var)
                .map_or_else(|| self.clone(), |renamed| Term::Var(renamed.clone())),
            Term::Relation(relation) => Term::Relation(relation.substitute(renaming)),
        }
    }

    /// Fully dereference every variable reachable from this term
    #[must_use]
    pub fn resolve(&self, env: &Bindings) -> Term {
        env.resolve(self)
    }
}

impl From<Atom> for Term {
    fn from(atom: Atom) -> Self {
        Term::Atom(atom)
    }
}

impl From<Variable> for Term {
    fn from(var: Variable) -> Self {
        Term::Var(var)
    }
}

impl From<Relation> for Term {
    fn from(relation: Relation) -> Self {
        Term::Relation(relation)
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Atom(atom) => atom.fmt(f),
            Term::Var(var) => var.fmt(f),
            Term::Relation(relation) => relation.fmt(f),
        }
    }
}

/// A predicate applied to arguments (e.g. `likes(kim, ?who)`)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Relation {
    /// The predicate name, used to index the database
    pub predicate: String,
    /// The argument terms, shared between copies of the relation
    pub args: Arc<[Term]>,
}

impl Relation {
    /// Create a relation
    pub fn new(predicate: impl Into<String>, args: Vec<Term>) -> Self {
        Self {
            predicate: predicate.into(),
            args: args.into(),
        }
    }

    /// Number of arguments
    #[must_use]
    pub fn arity(&self) -> usize {
        self.args.len()
    }

    /// Variables in first-seen order, without duplicates
    #[must_use]
    pub fn vars(&self) -> Vec<Variable> {
        let mut vars = IndexSet::new();
        self.collect_vars(&mut vars);
        vars.into_iter().collect()
    }

    /// Add the variables of every argument to `vars`
    pub fn collect_vars(&self, vars: &mut IndexSet<Variable>) {
        for arg in self.args.iter() {
            arg.collect_vars(vars);
        }
    }

    /// Rename variables in every argument
    #[must_use]
    pub fn substitute(&self, renaming: &Renaming) -> Relation {
        Relation {
            predicate: self.predicate.clone(),
            args: self.args.iter().map(|arg| arg.substitute(renaming)).collect(),
        }
    }

    /// Fully dereference every argument
    #[must_use]
    pub fn resolve(&self, env: &Bindings) -> Relation {
        env.resolve_relation(self)
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.predicate)?;
        if self.args.is_empty() {
            return Ok(());
        }
        f.write_str("(")?;
        for (i, arg) in self.args.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            arg.fmt(f)?;
        }
        f.write_str(")")
    }
}

/// A head relation and a body of goals.
///
/// An empty body makes the clause a fact; otherwise it is a rule stating that
/// the head holds whenever every body goal holds.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Clause {
    /// The conclusion
    pub head: Relation,
    /// The conditions, proved left to right
    pub body: Vec<Relation>,
}

impl Clause {
    /// Create a clause
    #[must_use]
    pub fn new(head: Relation, body: Vec<Relation>) -> Self {
        Self { head, body }
    }

    /// A clause with an empty body
    #[must_use]
    pub fn fact(head: Relation) -> Self {
        Self::new(head, Vec::new())
    }

    /// A clause whose head holds if all `body` goals hold
    #[must_use]
    pub fn rule(head: Relation, body: Vec<Relation>) -> Self {
        Self::new(head, body)
    }

    /// Whether the body is empty
    #[must_use]
    pub fn is_fact(&self) -> bool {
        self.body.is_empty()
    }

    /// Variables of head then body, in first-seen order, without duplicates
    #[must_use]
    pub fn vars(&self) -> Vec<Variable> {
        let mut vars = IndexSet::new();
        self.head.collect_vars(&mut vars);
        for goal in &self.body {
            goal.collect_vars(&mut vars);
        }
        vars.into_iter().collect()
    }

    /// Rename variables in head and body
    #[must_use]
    pub fn substitute(&self, renaming: &Renaming) -> Clause {
        Clause {
            head: self.head.substitute(renaming),
            body: self.body.iter().map(|goal| goal.substitute(renaming)).collect(),
        }
    }

    /// A copy of this clause with every variable replaced by a fresh one
    #[must_use]
    pub fn rename_fresh(&self) -> Clause {
        let renaming: Renaming = self
            .vars()
            .into_iter()
            .map(|var| (var, Variable::fresh()))
            .collect();
        trace!("renamed vars: {renaming:?}");
        self.substitute(&renaming)
    }

    /// Fully dereference head and body under `env`
    #[must_use]
    pub fn resolve(&self, env: &Bindings) -> Clause {
        Clause {
            head: env.resolve_relation(&self.head),
            body: self
                .body
                .iter()
                .map(|goal| env.resolve_relation(goal))
                .collect(),
        }
    }
}

impl fmt::Display for Clause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.head.fmt(f)?;
        for (i, goal) in self.body.iter().enumerate() {
            f.write_str(if i == 0 { " :- " } else { ", " })?;
            goal.fmt(f)?;
        }
        Ok(())
    }
}
