//! Stable topological sorting over explicit dependency edges.
//!
//! [`topological_sort`] produces a total order consistent with a set of
//! "must come before" edges, breaking ties by original input position so the
//! result is deterministic for a deterministic input. [`sort_by_given_order`]
//! permutes an arbitrary item list to match an order computed earlier,
//! which lets callers cache a type-level order and re-apply it to freshly
//! constructed instances without recomputing dependencies.

use core::cmp::Reverse;
use core::fmt;
use core::hash::Hash;
use hashbrown::HashMap;
use std::collections::BinaryHeap;
use thiserror::Error;

// ─────────────────────────────────────────────────────────────────────────────
// Errors
// ─────────────────────────────────────────────────────────────────────────────

/// The dependency graph contains a cycle; no valid order exists.
///
/// `nodes` holds the display renderings of every node still caught in the
/// cycle (or reachable only through it) when the sort gave up.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("circular dependency detected among: {}", .nodes.join(", "))]
pub struct CycleError {
    /// Renderings of the nodes participating in (or blocked behind) the cycle.
    pub nodes: Vec<String>,
}

/// An item's key does not appear in the order it should be sorted by.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot apply the given order: key '{key}' is not part of the computed order")]
pub struct OrderError {
    /// Rendering of the key that was missing from the order.
    pub key: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Topological sort
// ─────────────────────────────────────────────────────────────────────────────

/// Orders `nodes` so that for every edge `(before, after)` with both endpoints
/// present, `before` precedes `after` in the output.
///
/// The output contains exactly the input nodes, each exactly once. Nodes with
/// no edge constraint between them keep their original relative order, so
/// repeated calls on the same input return the same output. Edges naming a
/// node outside `nodes` carry no constraint and are ignored; this mirrors a
/// dependency on something ordered elsewhere.
///
/// # Errors
///
/// Returns [`CycleError`] naming the participating nodes when the edges admit
/// no valid order.
///
/// # Example
///
/// ```
/// use tessera_graph::topological_sort;
///
/// let sorted = topological_sort(&[3, 1, 2], &[(2, 3), (1, 2)]).unwrap();
/// assert_eq!(sorted, vec![1, 2, 3]);
/// ```
pub fn topological_sort<T>(nodes: &[T], edges: &[(T, T)]) -> Result<Vec<T>, CycleError>
where
    T: Clone + Eq + Hash + fmt::Display,
{
    let mut index_of: HashMap<&T, usize> = HashMap::with_capacity(nodes.len());
    for (i, node) in nodes.iter().enumerate() {
        index_of.insert(node, i);
    }

    let n = nodes.len();
    let mut in_degree = vec![0usize; n];
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); n];

    for (before, after) in edges {
        let (Some(&b), Some(&a)) = (index_of.get(before), index_of.get(after)) else {
            continue;
        };
        dependents[b].push(a);
        in_degree[a] += 1;
    }

    // Kahn's algorithm. The ready set is a min-heap over input positions so
    // unconstrained nodes keep their original relative order.
    let mut ready: BinaryHeap<Reverse<usize>> = in_degree
        .iter()
        .enumerate()
        .filter(|&(_, &deg)| deg == 0)
        .map(|(i, _)| Reverse(i))
        .collect();

    let mut sorted: Vec<usize> = Vec::with_capacity(n);
    while let Some(Reverse(i)) = ready.pop() {
        sorted.push(i);
        for &dependent in &dependents[i] {
            in_degree[dependent] -= 1;
            if in_degree[dependent] == 0 {
                ready.push(Reverse(dependent));
            }
        }
    }

    if sorted.len() != n {
        let nodes = in_degree
            .iter()
            .enumerate()
            .filter(|&(_, &deg)| deg > 0)
            .map(|(i, _)| nodes[i].to_string())
            .collect();
        return Err(CycleError { nodes });
    }

    Ok(sorted.into_iter().map(|i| nodes[i].clone()).collect())
}

// ─────────────────────────────────────────────────────────────────────────────
// Order application
// ─────────────────────────────────────────────────────────────────────────────

/// Permutes `items` to match a previously computed key order.
///
/// `key_of` extracts the ordering key from each item; items are rearranged so
/// their keys follow the first occurrence of each key in `order`. Items
/// sharing a key keep their original relative order (the underlying sort is
/// stable).
///
/// This is the companion to [`topological_sort`]: compute an order over keys
/// once, then apply it to any number of freshly built item lists.
///
/// # Errors
///
/// Returns [`OrderError`] when an item's key does not appear in `order`.
pub fn sort_by_given_order<I, K, F>(
    items: &mut Vec<I>,
    order: &[K],
    key_of: F,
) -> Result<(), OrderError>
where
    K: Eq + Hash + fmt::Display,
    F: Fn(&I) -> K,
{
    let mut position: HashMap<&K, usize> = HashMap::with_capacity(order.len());
    for (i, key) in order.iter().enumerate() {
        position.entry(key).or_insert(i);
    }

    // Resolve every position up front so the permutation below cannot fail
    // halfway through and leave `items` partially drained.
    let mut positions: Vec<usize> = Vec::with_capacity(items.len());
    for item in items.iter() {
        let key = key_of(item);
        match position.get(&key) {
            Some(&p) => positions.push(p),
            None => {
                return Err(OrderError {
                    key: key.to_string(),
                });
            }
        }
    }

    let mut tagged: Vec<(usize, I)> = positions.into_iter().zip(items.drain(..)).collect();
    tagged.sort_by_key(|(pos, _)| *pos);
    items.extend(tagged.into_iter().map(|(_, item)| item));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sorts_chain() {
        let sorted = topological_sort(&["A", "B", "C"], &[("A", "B"), ("B", "C")]).unwrap();
        assert_eq!(sorted, vec!["A", "B", "C"]);
    }

    #[test]
    fn respects_edges_over_input_order() {
        let sorted = topological_sort(&["C", "B", "A"], &[("A", "B"), ("B", "C")]).unwrap();
        assert_eq!(sorted, vec!["A", "B", "C"]);
    }

    #[test]
    fn unconstrained_nodes_keep_input_order() {
        let sorted = topological_sort(&["x", "y", "z"], &[]).unwrap();
        assert_eq!(sorted, vec!["x", "y", "z"]);
    }

    #[test]
    fn ties_break_by_input_position() {
        // "b" and "c" both depend on "a" only; their relative order must
        // match the input.
        let sorted = topological_sort(&["c", "b", "a"], &[("a", "b"), ("a", "c")]).unwrap();
        assert_eq!(sorted, vec!["a", "c", "b"]);
    }

    #[test]
    fn two_node_cycle_names_both_nodes() {
        let err = topological_sort(&["A", "B"], &[("A", "B"), ("B", "A")]).unwrap_err();
        assert!(err.nodes.contains(&"A".to_string()));
        assert!(err.nodes.contains(&"B".to_string()));
        let message = err.to_string();
        assert!(message.contains('A') && message.contains('B'));
    }

    #[test]
    fn self_edge_is_a_cycle() {
        let err = topological_sort(&["A"], &[("A", "A")]).unwrap_err();
        assert_eq!(err.nodes, vec!["A".to_string()]);
    }

    #[test]
    fn edges_to_unknown_nodes_are_ignored() {
        let sorted = topological_sort(&["A", "B"], &[("external", "A"), ("A", "B")]).unwrap();
        assert_eq!(sorted, vec!["A", "B"]);
    }

    #[test]
    fn repeated_calls_are_deterministic() {
        let nodes = ["d", "a", "c", "b"];
        let edges = [("a", "b"), ("a", "c")];
        let first = topological_sort(&nodes, &edges).unwrap();
        let second = topological_sort(&nodes, &edges).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn applies_given_order() {
        let mut items = vec![("G1", 10), ("G2", 20), ("G3", 30)];
        let order = ["G3", "G1", "G2"];
        sort_by_given_order(&mut items, &order, |item| item.0).unwrap();
        assert_eq!(items, vec![("G3", 30), ("G1", 10), ("G2", 20)]);
    }

    #[test]
    fn missing_key_in_order_is_an_error() {
        let mut items = vec![("G1", 1), ("G9", 9)];
        let order = ["G1"];
        let err = sort_by_given_order(&mut items, &order, |item| item.0).unwrap_err();
        assert_eq!(err.key, "G9");
    }

    #[test]
    fn duplicate_keys_keep_relative_order() {
        let mut items = vec![("a", 1), ("b", 2), ("a", 3)];
        let order = ["b", "a"];
        sort_by_given_order(&mut items, &order, |item| item.0).unwrap();
        assert_eq!(items, vec![("b", 2), ("a", 1), ("a", 3)]);
    }
}
