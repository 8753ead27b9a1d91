//! Available-modules pass
//!
//! A module that every parent path already loaded does not need to be part
//! of a child group again. Sets are bitsets keyed by module index.

use crate::chunk_graph::ChunkGraph;
use crate::graph::ModuleId;
use crate::utils::BitSet;

/// Drop modules that are already available in `group_modules[g]`, keeping
/// each group's roots. Returns the number of dropped modules.
///
/// A group's available set is the intersection over everything that loads
/// it, back edges included. Sets start out unknown and only shrink, so the
/// rounds stop once nothing changes.
pub(super) fn remove_available_modules(
    chunk_graph: &ChunkGraph,
    group_modules: &mut [Vec<ModuleId>],
    roots: &[BitSet],
) -> usize {
    let order = chunk_graph.topological_groups();
    // `None` is "not computed yet", which acts as the full set
    let mut loaded: Vec<Option<BitSet>> = vec![None; chunk_graph.group_count()];
    let mut available: Vec<BitSet> = vec![BitSet::new(); chunk_graph.group_count()];

    let mut changed = true;
    while changed {
        changed = false;
        for &key in &order {
            let g = key.index();
            let mut avail: Option<BitSet> = None;
            let mut has_loaders = false;
            for loader in chunk_graph.group(key).loaders() {
                has_loaders = true;
                if let Some(set) = &loaded[loader.index()] {
                    match &mut avail {
                        Some(avail) => avail.intersect_with(set),
                        None => avail = Some(set.clone()),
                    }
                }
            }
            if !has_loaders {
                avail = Some(BitSet::new());
            }
            let Some(avail) = avail else {
                continue;
            };

            let mut next = avail.clone();
            next.extend(group_modules[g].iter().map(|m| m.index()));
            if loaded[g].as_ref() != Some(&next) {
                loaded[g] = Some(next);
                available[g] = avail;
                changed = true;
            }
        }
    }

    let mut dropped = 0;
    for key in order {
        let g = key.index();
        let before = group_modules[g].len();
        group_modules[g].retain(|m| roots[g].contains(m.index()) || !available[g].contains(m.index()));
        dropped += before - group_modules[g].len();
    }

    tracing::trace!("available modules removed {} module placements", dropped);
    dropped
}
