//! Deterministic topological ordering with pin and pairwise constraints.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;

/// A partial ordering rule over items identified by index.
///
/// Items are opaque indices in `0..count`. `First` and `Last` pin an
/// item into the leading or trailing group; `Before`/`After` order two
/// specific items relative to each other. `After(i, j)` is equivalent
/// to `Before(j, i)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Constraint {
    /// The item must precede every unpinned item.
    First(usize),
    /// The item must follow every item not pinned last.
    Last(usize),
    /// The first item must precede the second.
    Before(usize, usize),
    /// The first item must follow the second.
    After(usize, usize),
}

/// Two items whose constraints cannot both be satisfied.
///
/// `earlier` and `later` name the edge that closed a cycle in the
/// constraint graph: some constraint demands `earlier` precede `later`,
/// while the remaining constraints demand the opposite.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
#[error("conflicting ordering constraints between items {earlier} and {later}")]
pub struct OrderingConflict {
    pub earlier: usize,
    pub later: usize,
}

/// Produce a total order over `0..count` satisfying every constraint.
///
/// The result is a permutation of `0..count` in which all `First`
/// items precede all unpinned items, which precede all `Last` items,
/// and every `Before`/`After` pair appears in the required order.
/// Ties are broken by original index, so the output is deterministic:
/// solving the same input always yields the same permutation.
///
/// Ordering is all-or-nothing. If the constraints are cyclic the
/// conflicting pair is returned and no partial order is produced;
/// callers typically fall back to the input order and report the
/// conflict.
///
/// # Example
///
/// ```
/// use cascade::ordering::{solve, Constraint};
///
/// let order = solve(3, &[Constraint::Before(2, 0), Constraint::Last(1)]).unwrap();
/// assert_eq!(order, vec![2, 0, 1]);
///
/// let conflict = solve(2, &[Constraint::Before(0, 1), Constraint::Before(1, 0)]);
/// assert!(conflict.is_err());
/// ```
pub fn solve(count: usize, constraints: &[Constraint]) -> Result<Vec<usize>, OrderingConflict> {
    if count == 0 {
        return Ok(Vec::new());
    }

    let mut first = vec![false; count];
    let mut last = vec![false; count];

    for constraint in constraints {
        match *constraint {
            Constraint::First(i) if i < count => first[i] = true,
            Constraint::Last(i) if i < count => last[i] = true,
            _ => {}
        }
    }

    let mut edges: Vec<(usize, usize)> = Vec::new();

    // Pin groups become real edges so that a pairwise constraint which
    // contradicts a pin shows up as a cycle instead of being silently
    // reordered.
    for i in 0..count {
        if first[i] {
            for j in 0..count {
                if j != i && !first[j] {
                    edges.push((i, j));
                }
            }
        }
        if last[i] {
            for j in 0..count {
                if j != i && !last[j] {
                    edges.push((j, i));
                }
            }
        }
    }

    for constraint in constraints {
        match *constraint {
            Constraint::Before(i, j) if i < count && j < count => edges.push((i, j)),
            Constraint::After(i, j) if i < count && j < count => edges.push((j, i)),
            _ => {}
        }
    }

    for &(i, j) in &edges {
        if i == j {
            return Err(OrderingConflict {
                earlier: i,
                later: j,
            });
        }
    }

    let mut successors: Vec<Vec<usize>> = vec![Vec::new(); count];
    let mut indegree = vec![0usize; count];

    for &(i, j) in &edges {
        successors[i].push(j);
        indegree[j] += 1;
    }

    // Kahn's algorithm with a sorted ready set: the smallest available
    // index always goes next, which makes the output stable.
    let mut ready: BTreeSet<usize> = (0..count).filter(|&i| indegree[i] == 0).collect();
    let mut order = Vec::with_capacity(count);

    while let Some(&next) = ready.iter().next() {
        ready.remove(&next);
        order.push(next);

        for &succ in &successors[next] {
            indegree[succ] -= 1;
            if indegree[succ] == 0 {
                ready.insert(succ);
            }
        }
    }

    if order.len() == count {
        Ok(order)
    } else {
        Err(find_cycle_edge(count, &successors, &indegree))
    }
}

/// Walk the unresolved remainder of the graph and report the edge that
/// closes the first cycle found, preferring lower indices.
fn find_cycle_edge(
    count: usize,
    successors: &[Vec<usize>],
    indegree: &[usize],
) -> OrderingConflict {
    let remaining: Vec<bool> = (0..count).map(|i| indegree[i] > 0).collect();

    let mut on_stack = vec![false; count];
    let mut visited = vec![false; count];

    for start in 0..count {
        if !remaining[start] || visited[start] {
            continue;
        }
        if let Some(conflict) = dfs_cycle(
            start,
            successors,
            &remaining,
            &mut visited,
            &mut on_stack,
        ) {
            return conflict;
        }
    }

    // Unreachable for a well-formed incomplete sort, but keep a sane
    // answer rather than panicking.
    OrderingConflict {
        earlier: 0,
        later: 0,
    }
}

fn dfs_cycle(
    node: usize,
    successors: &[Vec<usize>],
    remaining: &[bool],
    visited: &mut [bool],
    on_stack: &mut [bool],
) -> Option<OrderingConflict> {
    visited[node] = true;
    on_stack[node] = true;

    for &succ in &successors[node] {
        if !remaining[succ] {
            continue;
        }
        if on_stack[succ] {
            return Some(OrderingConflict {
                earlier: node,
                later: succ,
            });
        }
        if !visited[succ] {
            if let Some(conflict) = dfs_cycle(succ, successors, remaining, visited, on_stack) {
                return Some(conflict);
            }
        }
    }

    on_stack[node] = false;
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_solves_to_empty_order() {
        assert_eq!(solve(0, &[]), Ok(Vec::new()));
    }

    #[test]
    fn unconstrained_items_keep_index_order() {
        assert_eq!(solve(4, &[]), Ok(vec![0, 1, 2, 3]));
    }

    #[test]
    fn before_constraint_is_respected() {
        let order = solve(3, &[Constraint::Before(2, 0)]).unwrap();
        let pos = |i: usize| order.iter().position(|&x| x == i).unwrap();
        assert!(pos(2) < pos(0));
    }

    #[test]
    fn after_mirrors_before() {
        assert_eq!(
            solve(3, &[Constraint::After(0, 2)]),
            solve(3, &[Constraint::Before(2, 0)]),
        );
    }

    #[test]
    fn first_items_precede_unpinned_items() {
        let order = solve(4, &[Constraint::First(3)]).unwrap();
        assert_eq!(order[0], 3);
    }

    #[test]
    fn last_items_follow_unpinned_items() {
        let order = solve(4, &[Constraint::Last(0)]).unwrap();
        assert_eq!(order[3], 0);
    }

    #[test]
    fn first_and_last_groups_surround_the_middle() {
        let order = solve(
            5,
            &[
                Constraint::First(4),
                Constraint::First(2),
                Constraint::Last(0),
            ],
        )
        .unwrap();

        assert_eq!(&order[..2], &[2, 4]);
        assert_eq!(order[4], 0);
    }

    #[test]
    fn pairwise_cycle_reports_conflict() {
        let result = solve(2, &[Constraint::Before(0, 1), Constraint::Before(1, 0)]);
        assert_eq!(
            result,
            Err(OrderingConflict {
                earlier: 1,
                later: 0
            })
        );
    }

    #[test]
    fn constraint_against_pin_reports_conflict() {
        // Item 1 is pinned first, but item 0 claims to come before it.
        let result = solve(2, &[Constraint::First(1), Constraint::Before(0, 1)]);
        assert!(result.is_err());
    }

    #[test]
    fn item_pinned_first_and_last_conflicts() {
        let result = solve(2, &[Constraint::First(0), Constraint::Last(0)]);
        assert!(result.is_err());
    }

    #[test]
    fn self_constraint_reports_conflict() {
        let result = solve(2, &[Constraint::Before(1, 1)]);
        assert_eq!(
            result,
            Err(OrderingConflict {
                earlier: 1,
                later: 1
            })
        );
    }

    #[test]
    fn longer_cycle_is_detected() {
        let result = solve(
            4,
            &[
                Constraint::Before(0, 1),
                Constraint::Before(1, 2),
                Constraint::Before(2, 0),
            ],
        );
        assert!(result.is_err());
    }

    #[test]
    fn out_of_range_indices_are_ignored() {
        let order = solve(2, &[Constraint::Before(0, 7), Constraint::First(9)]).unwrap();
        assert_eq!(order, vec![0, 1]);
    }

    #[test]
    fn solving_is_deterministic() {
        let constraints = [
            Constraint::First(5),
            Constraint::Last(1),
            Constraint::Before(4, 2),
            Constraint::After(3, 0),
        ];

        let a = solve(6, &constraints).unwrap();
        let b = solve(6, &constraints).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn result_is_a_permutation() {
        let order = solve(5, &[Constraint::Before(3, 1), Constraint::Last(2)]).unwrap();
        let mut sorted = order.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn conflict_never_returns_partial_order() {
        let result = solve(
            3,
            &[Constraint::Before(0, 1), Constraint::After(0, 1)],
        );
        assert!(result.is_err());
    }
}
