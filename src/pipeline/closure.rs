use std::collections::BTreeSet;

use log::debug;

use super::types::Dag;
use crate::error::{CidagError, Result};

/// Expands every job's needs into the full set of jobs that must complete
/// before it.
///
/// Runs full passes over the map until a pass adds nothing to any job. Within
/// a pass a job may read a neighbour whose expansion is still partial; the
/// next pass picks up whatever it missed. Applying it to its own output is a
/// no-op.
///
/// # Errors
///
/// Returns `CyclicDependency` if some job ends up needing itself.
pub fn traverse_dag_needs(dag: Dag) -> Result<Dag> {
    let (dag, passes) = close(dag);
    debug!("DAG closure reached a fixpoint after {passes} passes");

    if let Some((job, _)) = dag.iter().find(|(job, needs)| needs.contains(*job)) {
        return Err(CidagError::CyclicDependency { job: job.clone() });
    }

    Ok(dag)
}

/// Fixpoint loop. Returns the closed DAG and the number of passes it took,
/// including the final pass that changed nothing.
///
/// Need sets only ever grow and are bounded by the key set, so this also
/// terminates on cyclic input.
fn close(mut dag: Dag) -> (Dag, usize) {
    let mut passes = 0;

    loop {
        passes += 1;
        let mut changed = false;

        for index in 0..dag.len() {
            changed |= expand_job(&mut dag, index);
        }

        if !changed {
            return (dag, passes);
        }
    }
}

/// Unions the needs of the job's needs into its own set until a rescan adds
/// nothing. Returns whether the set grew.
fn expand_job(dag: &mut Dag, index: usize) -> bool {
    let mut grown = false;

    loop {
        let Some((_, needs)) = dag.get_index(index) else {
            return grown;
        };

        // Names missing from the map count as having no needs
        let next_depth: BTreeSet<String> = needs
            .iter()
            .filter_map(|dep| dag.get(dep))
            .flatten()
            .filter(|name| !needs.contains(*name))
            .cloned()
            .collect();

        if next_depth.is_empty() {
            return grown;
        }

        if let Some((_, needs)) = dag.get_index_mut(index) {
            needs.extend(next_depth);
        }
        grown = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dag(entries: &[(&str, &[&str])]) -> Dag {
        entries
            .iter()
            .map(|(job, needs)| {
                (
                    job.to_string(),
                    needs.iter().map(ToString::to_string).collect(),
                )
            })
            .collect()
    }

    fn set(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(ToString::to_string).collect()
    }

    mod traverse_dag_needs_tests {
        use super::*;

        #[test]
        fn expands_a_linear_chain() {
            let input = dag(&[("a", &[]), ("b", &["a"]), ("c", &["b"]), ("d", &["c"])]);

            let closed = traverse_dag_needs(input).unwrap();

            assert!(closed["a"].is_empty());
            assert_eq!(closed["b"], set(&["a"]));
            assert_eq!(closed["c"], set(&["a", "b"]));
            assert_eq!(closed["d"], set(&["a", "b", "c"]));
        }

        #[test]
        fn expands_a_diamond() {
            let input = dag(&[
                ("root", &[]),
                ("left", &["root"]),
                ("right", &["root"]),
                ("join", &["left", "right"]),
            ]);

            let closed = traverse_dag_needs(input).unwrap();

            assert_eq!(closed["join"], set(&["left", "right", "root"]));
        }

        #[test]
        fn is_idempotent() {
            let input = dag(&[
                ("e", &["d"]),
                ("d", &["b", "c"]),
                ("c", &["a"]),
                ("b", &["a"]),
                ("a", &[]),
            ]);

            let once = traverse_dag_needs(input).unwrap();
            let twice = traverse_dag_needs(once.clone()).unwrap();

            assert_eq!(once, twice);
        }

        #[test]
        fn missing_keys_are_treated_as_empty() {
            let input = dag(&[("b", &["a"])]);

            let closed = traverse_dag_needs(input).unwrap();

            assert_eq!(closed["b"], set(&["a"]));
            assert!(!closed.contains_key("a"));
        }

        #[test]
        fn detects_a_self_need() {
            let input = dag(&[("a", &["a"])]);

            let result = traverse_dag_needs(input);

            assert!(matches!(result, Err(CidagError::CyclicDependency { job }) if job == "a"));
        }

        #[test]
        fn detects_a_longer_cycle() {
            let input = dag(&[("a", &["c"]), ("b", &["a"]), ("c", &["b"]), ("d", &[])]);

            let result = traverse_dag_needs(input);

            assert!(matches!(result, Err(CidagError::CyclicDependency { .. })));
        }
    }

    mod close_tests {
        use super::*;

        #[test]
        fn pass_count_is_bounded_by_longest_path() {
            // Listed leaf-last, the worst order for a forward scan
            let input = dag(&[
                ("f", &["e"]),
                ("e", &["d"]),
                ("d", &["c"]),
                ("c", &["b"]),
                ("b", &["a"]),
                ("a", &[]),
            ]);
            let longest_path = 5;

            let (closed, passes) = close(input);

            assert!(passes <= longest_path + 1, "took {passes} passes");
            assert_eq!(closed["f"], set(&["a", "b", "c", "d", "e"]));
        }

        #[test]
        fn already_closed_dag_takes_one_pass() {
            let input = dag(&[("a", &[]), ("b", &["a"]), ("c", &["a", "b"])]);

            let (_, passes) = close(input);

            assert_eq!(passes, 1);
        }

        #[test]
        fn empty_dag_takes_one_pass() {
            let (closed, passes) = close(Dag::new());

            assert!(closed.is_empty());
            assert_eq!(passes, 1);
        }

        #[test]
        fn terminates_on_cycles() {
            let input = dag(&[("a", &["b"]), ("b", &["a"])]);

            let (closed, _) = close(input);

            assert_eq!(closed["a"], set(&["a", "b"]));
            assert_eq!(closed["b"], set(&["a", "b"]));
        }
    }
}
