//! Dependency graph over checks.
//!
//! Checks live in the manifest's flat vector; the graph works on indices and
//! `requires` edges only. The loader rejects cycles up front with a DFS that
//! names the cycle path; [`levels`] re-checks with Kahn's algorithm when
//! scheduling, since it operates on a filtered subset.

use crate::model::Check;
use std::collections::{BTreeMap, HashMap};

/// Tri-colour DFS cycle detection.
///
/// Returns the first cycle found as a path of check indices, e.g. `[a, b, a]`,
/// or `None` when the `requires` graph is acyclic.
pub fn find_cycle(checks: &[Check]) -> Option<Vec<usize>> {
    #[derive(Clone, Copy, PartialEq)]
    enum Colour {
        White,
        Grey,
        Black,
    }

    let by_id: HashMap<&str, usize> = checks
        .iter()
        .enumerate()
        .map(|(i, c)| (c.id.as_str(), i))
        .collect();

    let mut colour = vec![Colour::White; checks.len()];
    let mut stack = Vec::new();

    fn visit(
        node: usize,
        checks: &[Check],
        by_id: &HashMap<&str, usize>,
        colour: &mut [Colour],
        stack: &mut Vec<usize>,
    ) -> Option<Vec<usize>> {
        colour[node] = Colour::Grey;
        stack.push(node);

        for dep in &checks[node].requires {
            let Some(&next) = by_id.get(dep.as_str()) else {
                continue; // dangling refs are a separate validation error
            };
            match colour[next] {
                Colour::Grey => {
                    let start = stack.iter().position(|&n| n == next).unwrap_or(0);
                    let mut path: Vec<usize> = stack[start..].to_vec();
                    path.push(next);
                    return Some(path);
                }
                Colour::White => {
                    if let Some(path) = visit(next, checks, by_id, colour, stack) {
                        return Some(path);
                    }
                }
                Colour::Black => {}
            }
        }

        stack.pop();
        colour[node] = Colour::Black;
        None
    }

    for start in 0..checks.len() {
        if colour[start] == Colour::White {
            if let Some(path) = visit(start, checks, &by_id, &mut colour, &mut stack) {
                return Some(path);
            }
        }
    }
    None
}

/// Topological layering via Kahn's algorithm over a subset of checks.
///
/// `eligible` holds manifest indices; edges are `requires` relations whose
/// both endpoints are eligible. Level 0 contains every source; each later
/// level contains the nodes whose remaining in-edges all terminated in
/// earlier levels. Manifest order is preserved inside a level so runs are
/// deterministic.
pub fn levels(checks: &[Check], eligible: &[usize]) -> Result<Vec<Vec<usize>>, String> {
    let by_id: HashMap<&str, usize> = eligible
        .iter()
        .map(|&i| (checks[i].id.as_str(), i))
        .collect();

    // in-degree and reverse adjacency, restricted to the eligible set
    let mut in_degree: BTreeMap<usize, usize> = eligible.iter().map(|&i| (i, 0)).collect();
    let mut dependents: HashMap<usize, Vec<usize>> = HashMap::new();

    for &i in eligible {
        for dep in &checks[i].requires {
            if let Some(&d) = by_id.get(dep.as_str()) {
                *in_degree.get_mut(&i).expect("eligible node") += 1;
                dependents.entry(d).or_default().push(i);
            }
        }
    }

    let mut result = Vec::new();
    let mut remaining = eligible.len();
    let mut frontier: Vec<usize> = in_degree
        .iter()
        .filter(|(_, &deg)| deg == 0)
        .map(|(&i, _)| i)
        .collect();
    frontier.sort_unstable();

    while !frontier.is_empty() {
        remaining -= frontier.len();
        let mut next = Vec::new();
        for &node in &frontier {
            for &succ in dependents.get(&node).map(Vec::as_slice).unwrap_or(&[]) {
                let deg = in_degree.get_mut(&succ).expect("eligible node");
                *deg -= 1;
                if *deg == 0 {
                    next.push(succ);
                }
            }
        }
        next.sort_unstable();
        result.push(std::mem::take(&mut frontier));
        frontier = next;
    }

    if remaining > 0 {
        return Err("dependency graph contains a cycle".to_string());
    }
    Ok(result)
}

/// Render a cycle path as `a → b → a` using check ids.
pub fn cycle_path(checks: &[Check], path: &[usize]) -> String {
    path.iter()
        .map(|&i| checks[i].id.as_str())
        .collect::<Vec<_>>()
        .join(" → ")
}
