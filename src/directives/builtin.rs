use super::Directive;
use crate::error::{EngineError, Result};
use crate::session::Environment;
use std::cmp::Ordering;

pub(super) fn all() -> Vec<(&'static str, Directive)> {
    vec![
        ("define", Directive::action(define).with_arity(2)),
        ("delete", Directive::action(delete).with_arity(1).by_name()),
        ("isdefined", Directive::predicate(is_defined).with_arity(1).by_name()),
        ("isnotdefined", Directive::predicate(|p, env| is_defined(p, env).map(|d| !d)).with_arity(1).by_name()),
        ("equal", comparison(Ordering::is_eq)),
        ("notequal", comparison(Ordering::is_ne)),
        ("greaterthan", comparison(Ordering::is_gt)),
        ("lessthan", comparison(Ordering::is_lt)),
        ("greaterequal", comparison(Ordering::is_ge)),
        ("lessequal", comparison(Ordering::is_le)),
    ]
}

fn param<'p>(params: &'p [String], index: usize, directive: &str) -> Result<&'p str> {
    params.get(index).map(String::as_str).ok_or_else(|| EngineError::Directive {
        name: directive.to_string(),
        message: format!("missing parameter {}", index + 1),
    })
}

fn define(params: &[String], env: &mut Environment) -> Result<()> {
    let (variable, value) = (param(params, 0, "define")?, param(params, 1, "define")?);
    env.active_session_mut()?.set_local(variable, value);
    Ok(())
}

fn delete(params: &[String], env: &mut Environment) -> Result<()> {
    let variable = param(params, 0, "delete")?;
    env.active_session_mut()?.remove_local(variable);
    Ok(())
}

fn is_defined(params: &[String], env: &Environment) -> Result<bool> {
    let variable = param(params, 0, "isdefined")?;
    Ok(env.active_session()?.local(variable).is_some())
}

fn comparison(accept: fn(Ordering) -> bool) -> Directive {
    Directive::predicate(move |params, _| {
        let (left, right) = (param(params, 0, "comparison")?, param(params, 1, "comparison")?);
        Ok(accept(compare(left, right)))
    })
    .with_arity(2)
}

/// Numeric ordering when both sides parse as numbers, string ordering
/// otherwise.
fn compare(left: &str, right: &str) -> Ordering {
    match (left.trim().parse::<f64>(), right.trim().parse::<f64>()) {
        (Ok(l), Ok(r)) => l.partial_cmp(&r).unwrap_or_else(|| left.cmp(right)),
        _ => left.cmp(right),
    }
}
