//! Variable substitution for output and parameter templates.
//!
//! ```text
//! "Hi <star>, I am <botname>. You like <color>?"
//!      │             │                  └─ session local
//!      │             └─ global
//!      └─ first star of the last successful match
//! ```
//!
//! Token grammar inside `<...>`: `star`, `star N` (zero-based), or any other
//! name. Names resolve against globals first, then the active session's
//! locals, and fall back to the empty string. A star index past the captured
//! stars is an error, not an empty substitution.
//!
//! Rendering only reads the environment, so every token in one template sees
//! the same state.

use crate::error::{EngineError, Result};
use crate::session::{Environment, Session};

fn star_index(name: &str) -> Option<usize> {
    let rest = name.strip_prefix("star")?;
    if rest.is_empty() {
        return Some(0);
    }
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }
    rest.trim().parse().ok()
}

fn resolve<'e>(name: &str, env: &'e Environment) -> Result<&'e str> {
    if let Some(index) = star_index(name) {
        let stars = env.active_session().map(Session::stars).unwrap_or(&[]);
        return stars.get(index).map(String::as_str).ok_or(EngineError::StarIndex { index, len: stars.len() });
    }
    if let Some(value) = env.global(name) {
        return Ok(value);
    }
    Ok(env.active_session().ok().and_then(|session| session.local(name)).unwrap_or(""))
}

/// The variable name when `template` is exactly one `<name>` token that is
/// not a star.
pub(crate) fn bare_variable(template: &str) -> Option<&str> {
    let whole = crate::regex!(r"^\s*<([^<>]+)>\s*$");
    let name = whole.captures(template)?.get(1)?.as_str().trim();
    if star_index(name).is_some() { None } else { Some(name) }
}

/// Substitute every `<token>` in `template`.
pub fn render(template: &str, env: &Environment) -> Result<String> {
    let token = crate::regex!(r"<([^<>]+)>");

    let mut out = String::with_capacity(template.len());
    let mut last = 0;
    for caps in token.captures_iter(template) {
        let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        out.push_str(&template[last..whole.start()]);
        out.push_str(resolve(name.as_str().trim(), env)?);
        last = whole.end();
    }
    out.push_str(&template[last..]);
    Ok(out)
}
