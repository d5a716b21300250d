//! Dependency matching for exported packages
//!
//! Export only links packages that were discovered on disk. A declared
//! dependency matches a discovered package by exact `name@version` after the
//! range operator is stripped, falling back to the bare name. Anything else
//! is left out without a diagnostic: this is not a semver solver.

use std::collections::HashSet;

/// Strip a single leading range operator (`^`, `~`, `=`, `>=`) and a `v`.
pub fn strip_range_prefix(range: &str) -> &str {
    let range = range.trim();
    let range = range
        .strip_prefix(">=")
        .or_else(|| range.strip_prefix('^'))
        .or_else(|| range.strip_prefix('~'))
        .or_else(|| range.strip_prefix('='))
        .unwrap_or(range)
        .trim_start();
    range.strip_prefix('v').unwrap_or(range)
}

/// Match one declared dependency against the known output names.
pub fn match_dependency<F>(name: &str, range: &str, is_known: F) -> Option<String>
where
    F: Fn(&str) -> bool,
{
    let full = format!("{}@{}", name, strip_range_prefix(range));
    if is_known(&full) {
        Some(full)
    } else if is_known(name) {
        Some(name.to_string())
    } else {
        None
    }
}

/// Resolve declared dependencies to known output names, in declaration order.
pub fn resolve_dependencies<'a, I, F>(declared: I, is_known: F) -> Vec<String>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
    F: Fn(&str) -> bool,
{
    let mut resolved = Vec::new();
    for (name, range) in declared {
        if let Some(out) = match_dependency(name, range, &is_known) {
            if !resolved.contains(&out) {
                resolved.push(out);
            }
        }
    }
    resolved
}

/// Depth-first transitive closure of `root`'s dependencies.
///
/// Output is in first-visit order and never contains `root`. Cycles are
/// tolerated.
pub fn transitive_closure<F>(root: &str, direct_of: F) -> Vec<String>
where
    F: Fn(&str) -> Vec<String>,
{
    let mut seen: HashSet<String> = HashSet::new();
    let mut order = Vec::new();
    seen.insert(root.to_string());
    visit(root, &direct_of, &mut seen, &mut order);
    order
}

fn visit<F>(node: &str, direct_of: &F, seen: &mut HashSet<String>, order: &mut Vec<String>)
where
    F: Fn(&str) -> Vec<String>,
{
    for dep in direct_of(node) {
        if seen.insert(dep.clone()) {
            order.push(dep.clone());
            visit(&dep, direct_of, seen, order);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use std::collections::HashMap;

    #[rstest]
    #[case("^1.2.0", "1.2.0")]
    #[case("~1.2.0", "1.2.0")]
    #[case(">=1.2.0", "1.2.0")]
    #[case("=1.2.0", "1.2.0")]
    #[case("v1.2.0", "1.2.0")]
    #[case(" ^ 1.2.0", "1.2.0")]
    #[case("1.2.0", "1.2.0")]
    fn test_strip_range_prefix(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(strip_range_prefix(input), expected);
    }

    #[test]
    fn test_caret_resolves_exact_full_name() {
        let known = ["foo@1.2.0"];
        let out = match_dependency("foo", "^1.2.0", |n| known.contains(&n));
        assert_eq!(out.as_deref(), Some("foo@1.2.0"));
    }

    #[test]
    fn test_falls_back_to_bare_name() {
        let known = ["foo"];
        let out = match_dependency("foo", "^3.0.0", |n| known.contains(&n));
        assert_eq!(out.as_deref(), Some("foo"));
    }

    #[test]
    fn test_missing_is_dropped() {
        let declared = vec![("foo", "^1.0.0"), ("bar", "2.0.0")];
        let known = ["bar@2.0.0"];
        let out = resolve_dependencies(declared, |n| known.contains(&n));
        assert_eq!(out, vec!["bar@2.0.0".to_string()]);
    }

    #[test]
    fn test_closure_order_and_self_exclusion() {
        let graph: HashMap<&str, Vec<&str>> = [
            ("app", vec!["a", "b"]),
            ("a", vec!["c", "app"]),
            ("b", vec!["c"]),
            ("c", vec!["a"]),
        ]
        .into_iter()
        .collect();

        let closure = transitive_closure("app", |n| {
            graph
                .get(n)
                .map(|v| v.iter().map(|s| s.to_string()).collect())
                .unwrap_or_default()
        });

        assert_eq!(closure, vec!["a", "c", "b"]);
    }
}
