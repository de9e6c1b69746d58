//! Syntactic unification over [`Bindings`].
//!
//! Every function returns `None` on failure and a new environment on success;
//! the environment passed in is never modified. Chaining calls with `?` or
//! `Option::and_then` gives the short-circuit propagation of failure.

use log::trace;

use crate::bindings::Bindings;
use crate::term::{Clause, Relation, Term, Variable};

/// Unify `x` and `y` under `env`, without an occurs check.
///
/// A variable may end up bound to a term that contains it. Such bindings are
/// accepted; [`Bindings::resolve`] stays finite on them, but unifying two
/// distinct cyclic terms against each other does not terminate.
#[must_use]
pub fn unify(x: &Term, y: &Term, env: &Bindings) -> Option<Bindings> {
    unify_terms(x, y, env, false)
}

/// Unify `x` and `y` under `env`, refusing to bind a variable to a term that
/// contains it
#[must_use]
pub fn unify_checked(x: &Term, y: &Term, env: &Bindings) -> Option<Bindings> {
    unify_terms(x, y, env, true)
}

/// Unify two relations: same predicate, same arity, then every argument pair
/// left to right.
#[must_use]
pub fn unify_relations(
    a: &Relation,
    b: &Relation,
    env: &Bindings,
    occurs_check: bool,
) -> Option<Bindings> {
    if a.predicate != b.predicate || a.arity() != b.arity() {
        trace!("predicate mismatch: {a} vs {b}");
        return None;
    }
    a.args
        .iter()
        .zip(b.args.iter())
        .try_fold(env.clone(), |env, (x, y)| unify_terms(x, y, &env, occurs_check))
}

/// Unify two clauses: bodies of equal length, heads and body goals pairwise
#[must_use]
pub fn unify_clauses(a: &Clause, b: &Clause, env: &Bindings) -> Option<Bindings> {
    if a.body.len() != b.body.len() {
        return None;
    }
    let env = unify_relations(&a.head, &b.head, env, false)?;
    a.body
        .iter()
        .zip(&b.body)
        .try_fold(env, |env, (x, y)| unify_relations(x, y, &env, false))
}

fn unify_terms(x: &Term, y: &Term, env: &Bindings, occurs_check: bool) -> Option<Bindings> {
    trace!("unify {x} and {y} (bindings={env})");

    let x = env.walk(x);
    let y = env.walk(y);
    if x == y {
        return Some(env.clone());
    }

    match (x, y) {
        (Term::Var(var), other) | (other, Term::Var(var)) => {
            bind_var(var, other, env, occurs_check)
        }
        (Term::Relation(a), Term::Relation(b)) => unify_relations(a, b, env, occurs_check),
        _ => None,
    }
}

fn bind_var(var: &Variable, term: &Term, env: &Bindings, occurs_check: bool) -> Option<Bindings> {
    if occurs_check && occurs(var, term, env) {
        trace!("occurs check: {var} in {term}");
        return None;
    }
    Some(env.bind(var.clone(), term.clone()))
}

fn occurs(var: &Variable, term: &Term, env: &Bindings) -> bool {
    match env.walk(term) {
        Term::Var(other) => other == var,
        Term::Relation(relation) => relation.args.iter().any(|arg| occurs(var, arg, env)),
        Term::Atom(_) => false,
    }
}
