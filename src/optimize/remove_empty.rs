//! Remove chunks left without modules

use tracing::debug;

use crate::chunk_graph::ChunkGraph;

/// Drop empty chunks that do not host an entry or a runtime
pub(crate) fn remove_empty_chunks(chunk_graph: &mut ChunkGraph) -> usize {
    let empty: Vec<_> = chunk_graph
        .chunks()
        .filter(|c| c.is_empty() && !c.has_entry_module())
        .map(|c| c.key())
        .filter(|&c| !chunk_graph.has_runtime(c))
        .filter(|&c| !chunk_graph.groups().any(|g| g.entrypoint_chunk() == Some(c)))
        .collect();

    for &chunk in &empty {
        debug!("Removing empty chunk {}", chunk);
        chunk_graph.remove_chunk(chunk);
    }
    empty.len()
}
