//! Reachability over the course prerequisite relation.
//!
//! Only forward edges (`course -> prerequisite`) are stored. The reverse view
//! (dependents) is answered by the store through an index, not kept here.

use std::collections::{HashMap, HashSet};

/// A proposed prerequisite would close a cycle back to the course being edited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("prerequisite {prerequisite} would introduce a cycle through course {course}")]
pub struct CycleDetected {
    pub course: i32,
    pub prerequisite: i32,
}

/// In-memory snapshot of the prerequisite edges, keyed by course id.
#[derive(Debug, Default, Clone)]
pub struct PrerequisiteGraph {
    edges: HashMap<i32, Vec<i32>>,
}

impl PrerequisiteGraph {
    /// Build a graph from `(course_id, prerequisite_id)` pairs.
    pub fn from_edges(edges: impl IntoIterator<Item = (i32, i32)>) -> Self {
        let mut map: HashMap<i32, Vec<i32>> = HashMap::new();
        for (course, prerequisite) in edges {
            map.entry(course).or_default().push(prerequisite);
        }
        Self { edges: map }
    }

    pub fn prerequisites_of(&self, course: i32) -> &[i32] {
        self.edges.get(&course).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn edge_count(&self) -> usize {
        self.edges.values().map(Vec::len).sum()
    }

    /// Check that giving `course` the prerequisite set `candidates` keeps the
    /// relation acyclic.
    ///
    /// One visited set is shared across all candidates, so the whole check
    /// touches each node at most once.
    pub fn check_candidates(&self, course: i32, candidates: &[i32]) -> Result<(), CycleDetected> {
        let mut visited = HashSet::new();
        for &prerequisite in candidates {
            if self.search(prerequisite, course, &mut visited) {
                return Err(CycleDetected {
                    course,
                    prerequisite,
                });
            }
        }
        Ok(())
    }

    /// Iterative depth-first search that never expands a node twice.
    fn search(&self, from: i32, target: i32, visited: &mut HashSet<i32>) -> bool {
        let mut stack = vec![from];
        while let Some(node) = stack.pop() {
            if node == target {
                return true;
            }
            if !visited.insert(node) {
                continue;
            }
            for &next in self.prerequisites_of(node) {
                if !visited.contains(&next) {
                    stack.push(next);
                }
            }
        }
        false
    }
}
