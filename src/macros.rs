/// Compile a regex literal once and hand out a `&'static Regex`.
///
/// Only used for literals that are known to be valid, so the `unwrap` inside
/// can never fire at runtime.
#[macro_export]
macro_rules! regex {
    ($pat:literal) => {{
        static RE: once_cell::sync::Lazy<regex::Regex> =
            once_cell::sync::Lazy::new(|| regex::Regex::new($pat).unwrap());
        &*RE
    }};
}
