//! Entry validation and `depend_on` ordering

use rustc_hash::FxHashMap;

use crate::error::{BuildError, BuildResult};
use crate::graph::{Entry, ModuleGraph};

/// Check every entry and return their indices with `depend_on` bases first
///
/// Entries without a dependency relation keep their declaration order.
pub(super) fn validate_entries(graph: &ModuleGraph) -> BuildResult<Vec<usize>> {
    let entries = graph.entries();
    let by_name: FxHashMap<&str, usize> = entries
        .iter()
        .enumerate()
        .map(|(i, e)| (e.name.as_str(), i))
        .collect();

    for entry in entries {
        for module in &entry.modules {
            if module.index() >= graph.len() {
                return Err(BuildError::UnknownEntryModule {
                    entry: entry.name.clone(),
                    module: module.index(),
                });
            }
        }
        if entry.runtime.is_some() && !entry.depend_on.is_empty() {
            return Err(BuildError::ConflictingEntryOptions(entry.name.clone()));
        }
        for base in &entry.depend_on {
            if !by_name.contains_key(base.as_str()) {
                return Err(BuildError::UnknownDependOn {
                    entry: entry.name.clone(),
                    depend_on: base.clone(),
                });
            }
        }
    }

    let mut state = vec![Visit::New; entries.len()];
    let mut order = Vec::with_capacity(entries.len());
    for index in 0..entries.len() {
        visit(index, entries, &by_name, &mut state, &mut order)?;
    }
    Ok(order)
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Visit {
    New,
    Active,
    Done,
}

fn visit(
    index: usize,
    entries: &[Entry],
    by_name: &FxHashMap<&str, usize>,
    state: &mut [Visit],
    order: &mut Vec<usize>,
) -> BuildResult<()> {
    match state[index] {
        Visit::Done => return Ok(()),
        Visit::Active => return Err(BuildError::DependOnCycle(entries[index].name.clone())),
        Visit::New => {}
    }
    state[index] = Visit::Active;
    for base in &entries[index].depend_on {
        if let Some(&base_index) = by_name.get(base.as_str()) {
            visit(base_index, entries, by_name, state, order)?;
        }
    }
    state[index] = Visit::Done;
    order.push(index);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Module, ModuleId};
    use pretty_assertions::assert_eq;

    fn graph_with(entries: Vec<Entry>) -> ModuleGraph {
        let mut graph = ModuleGraph::new();
        graph.add_module(Module::new("./a.js")).unwrap();
        for entry in entries {
            graph.add_entry(entry).unwrap();
        }
        graph
    }

    fn entry(name: &str) -> Entry {
        Entry::new(name, ModuleId::from_index(0))
    }

    #[test]
    fn test_bases_come_first() {
        let graph = graph_with(vec![
            entry("app").depend_on("shared"),
            entry("shared"),
            entry("admin"),
        ]);
        assert_eq!(validate_entries(&graph).unwrap(), vec![1, 0, 2]);
    }

    #[test]
    fn test_rejects_cycles() {
        let graph = graph_with(vec![entry("a").depend_on("b"), entry("b").depend_on("a")]);
        assert!(matches!(
            validate_entries(&graph),
            Err(BuildError::DependOnCycle(_))
        ));
    }

    #[test]
    fn test_rejects_unknown_base_and_runtime_conflict() {
        let graph = graph_with(vec![entry("a").depend_on("missing")]);
        assert!(matches!(
            validate_entries(&graph),
            Err(BuildError::UnknownDependOn { .. })
        ));

        let graph = graph_with(vec![entry("b"), entry("a").depend_on("b").with_runtime("rt")]);
        assert!(matches!(
            validate_entries(&graph),
            Err(BuildError::ConflictingEntryOptions(_))
        ));
    }

    #[test]
    fn test_rejects_unknown_module() {
        let graph = graph_with(vec![Entry::new("main", ModuleId::from_index(7))]);
        assert!(matches!(
            validate_entries(&graph),
            Err(BuildError::UnknownEntryModule { module: 7, .. })
        ));
    }
}
