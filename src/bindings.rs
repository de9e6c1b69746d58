use im::OrdMap;
use indexmap::IndexSet;
use log::trace;
use std::fmt;

use crate::term::{Relation, Term, Variable};

/// A substitution from variables to terms.
///
/// Extending a `Bindings` never mutates it: [`Bindings::bind`] returns a new
/// environment, so backtracking is simply going back to an older value. The
/// map is persistent, so cloning is O(1) and a bind shares all but O(log n)
/// of the older environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bindings {
    map: OrdMap<Variable, Term>,
}

impl Bindings {
    /// An empty environment
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A copy of this environment with `var` bound to `term`
    #[must_use]
    pub fn bind(&self, var: Variable, term: Term) -> Bindings {
        trace!("bind {var} -> {term}");
        Bindings {
            map: self.map.update(var, term),
        }
    }

    /// The term `var` is directly bound to, without following chains
    #[must_use]
    pub fn get(&self, var: &Variable) -> Option<&Term> {
        self.map.get(var)
    }

    /// Whether `var` has a direct binding
    #[must_use]
    pub fn contains(&self, var: &Variable) -> bool {
        self.map.contains_key(var)
    }

    /// Number of bound variables
    #[must_use]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Whether nothing is bound
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Direct bindings, ordered by variable name
    pub fn iter(&self) -> impl Iterator<Item = (&Variable, &Term)> {
        self.map.iter()
    }

    /// Follow the bindings of `var` transitively.
    ///
    /// Stops at the first non-variable term, at an unbound variable, or right
    /// before revisiting a variable already seen on the chain (`?x -> ?y -> ?x`
    /// yields `?y`). Returns `None` when `var` itself is unbound.
    #[must_use]
    pub fn lookup(&self, var: &Variable) -> Option<&Term> {
        let mut current = self.map.get(var)?;
        let mut seen: IndexSet<&Variable> = IndexSet::new();
        seen.insert(var);

        while let Term::Var(next) = current {
            let Some(bound) = self.map.get(next) else {
                break;
            };
            if matches!(bound, Term::Var(v) if seen.contains(v)) {
                break;
            }
            seen.insert(next);
            current = bound;
        }
        Some(current)
    }

    /// Dereference `term` one level: a bound variable is replaced by what it
    /// looks up to, anything else is returned as is
    #[must_use]
    pub fn walk<'a>(&'a self, term: &'a Term) -> &'a Term {
        match term {
            Term::Var(var) => self.lookup(var).unwrap_or(term),
            _ => term,
        }
    }

    /// Replace every bound variable reachable from `term` by its value,
    /// expanding nested relations.
    ///
    /// A variable met again while its own value is being expanded is left in
    /// place, so self-referential bindings such as `?x -> f(?x)` resolve to
    /// `f(?x)` instead of diverging.
    #[must_use]
    pub fn resolve(&self, term: &Term) -> Term {
        self.resolve_guarded(term, &mut Vec::new())
    }

    /// [`Bindings::resolve`] applied to every argument of `relation`
    #[must_use]
    pub fn resolve_relation(&self, relation: &Relation) -> Relation {
        self.resolve_args(relation, &mut Vec::new())
    }

    /// Whether `a` and `b` resolve to the same term.
    ///
    /// Same answer as comparing [`Bindings::resolve`] of both sides, but
    /// stops at the first difference without building either term.
    #[must_use]
    pub fn resolves_equal(&self, a: &Term, b: &Term) -> bool {
        self.equal_guarded(a, b, &mut Vec::new(), &mut Vec::new())
    }

    /// [`Bindings::resolves_equal`] for two relations
    #[must_use]
    pub fn relations_resolve_equal(&self, a: &Relation, b: &Relation) -> bool {
        a.predicate == b.predicate
            && a.arity() == b.arity()
            && a.args
                .iter()
                .zip(b.args.iter())
                .all(|(x, y)| self.resolves_equal(x, y))
    }

    /// One step of `resolve`: the term a variable stands for, plus the
    /// variable itself when its value is a relation about to be expanded
    fn expand<'t>(
        &'t self,
        term: &'t Term,
        expanding: &[Variable],
    ) -> (&'t Term, Option<&'t Variable>) {
        match term {
            Term::Var(var) if !expanding.contains(var) => match self.lookup(var) {
                Some(value @ Term::Relation(_)) => (value, Some(var)),
                Some(value) => (value, None),
                None => (term, None),
            },
            _ => (term, None),
        }
    }

    fn equal_guarded(
        &self,
        a: &Term,
        b: &Term,
        left: &mut Vec<Variable>,
        right: &mut Vec<Variable>,
    ) -> bool {
        let (a, a_var) = self.expand(a, left);
        let (b, b_var) = self.expand(b, right);
        match (a, b) {
            (Term::Relation(x), Term::Relation(y)) => {
                if x.predicate != y.predicate || x.arity() != y.arity() {
                    return false;
                }
                left.extend(a_var.cloned());
                right.extend(b_var.cloned());
                let equal = x
                    .args
                    .iter()
                    .zip(y.args.iter())
                    .all(|(s, t)| self.equal_guarded(s, t, left, right));
                if a_var.is_some() {
                    left.pop();
                }
                if b_var.is_some() {
                    right.pop();
                }
                equal
            }
            _ => a == b,
        }
    }

    fn resolve_guarded(&self, term: &Term, expanding: &mut Vec<Variable>) -> Term {
        match term {
            Term::Atom(_) => term.clone(),
            Term::Relation(relation) => Term::Relation(self.resolve_args(relation, expanding)),
            Term::Var(var) => {
                if expanding.contains(var) {
                    return term.clone();
                }
                match self.lookup(var) {
                    None => term.clone(),
                    Some(Term::Relation(relation)) => {
                        expanding.push(var.clone());
                        let resolved = self.resolve_args(relation, expanding);
                        expanding.pop();
                        Term::Relation(resolved)
                    }
                    Some(value) => value.clone(),
                }
            }
        }
    }

    fn resolve_args(&self, relation: &Relation, expanding: &mut Vec<Variable>) -> Relation {
        Relation {
            predicate: relation.predicate.clone(),
            args: relation
                .args
                .iter()
                .map(|arg| self.resolve_guarded(arg, expanding))
                .collect(),
        }
    }
}

impl FromIterator<(Variable, Term)> for Bindings {
    fn from_iter<I: IntoIterator<Item = (Variable, Term)>>(iter: I) -> Self {
        Self {
            map: iter.into_iter().collect(),
        }
    }
}

impl fmt::Display for Bindings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (var, term)) in self.map.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{var}: {term}")?;
        }
        f.write_str("}")
    }
}
