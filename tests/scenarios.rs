use component_chunks::build::{build_chunk_graph, BuildOptions};
use component_chunks::chunk_graph::ChunkGraph;
use component_chunks::graph::{Entry, Module, ModuleGraph, ModuleId};
use component_chunks::ids::{IdOptions, IdPolicy};
use component_chunks::optimize::{CacheGroup, OptimizationOptions, Optimizer, SplitChunksOptions};
use component_chunks::stats::Stats;
use component_chunks::{Bundler, BundlerOptions};
use pretty_assertions::assert_eq;

fn modules_of(cg: &ChunkGraph, graph: &ModuleGraph, chunk: component_chunks::chunk_graph::ChunkKey) -> Vec<String> {
    let mut ids: Vec<String> = cg
        .chunk(chunk)
        .modules()
        .map(|m| graph.module(m).identifier.clone())
        .collect();
    ids.sort();
    ids
}

fn entry_with_lazy_import() -> (ModuleGraph, ModuleId) {
    let mut graph = ModuleGraph::new();
    let main = graph.add_module(Module::new("./main.js")).unwrap();
    let a = graph.add_module(Module::new("./a.js")).unwrap();
    let lazy = graph.add_module(Module::new("./lazy.js")).unwrap();
    graph.add_sync_dependency(main, a).unwrap();
    graph.add_dynamic_import(a, lazy, None).unwrap();
    graph.add_entry(Entry::new("main", main)).unwrap();
    (graph, lazy)
}

#[test]
fn entry_with_lazy_import_gets_one_child_group() {
    let (graph, lazy) = entry_with_lazy_import();
    let cg = build_chunk_graph(&graph, BuildOptions::default()).unwrap();

    let entry = cg.entrypoint("main").unwrap();
    let entry_chunks = cg.group(entry).chunks().to_vec();
    assert_eq!(entry_chunks.len(), 1);
    assert_eq!(modules_of(&cg, &graph, entry_chunks[0]), vec!["./a.js", "./main.js"]);

    let children: Vec<_> = cg.group(entry).children().collect();
    assert_eq!(children.len(), 1);
    let child_chunks = cg.group(children[0]).chunks();
    assert_eq!(child_chunks.len(), 1);
    assert_eq!(modules_of(&cg, &graph, child_chunks[0]), vec!["./lazy.js"]);
    assert!(!cg.group(children[0]).is_initial());
    assert_eq!(cg.module_chunk_count(lazy), 1);
}

#[test]
fn shared_module_moves_into_one_shared_chunk() {
    let mut graph = ModuleGraph::new();
    let x = graph.add_module(Module::new("./x.js")).unwrap();
    let y = graph.add_module(Module::new("./y.js")).unwrap();
    let s = graph.add_module(Module::new("./s.js").with_size(1)).unwrap();
    graph.add_sync_dependency(x, s).unwrap();
    graph.add_sync_dependency(y, s).unwrap();
    graph.add_entry(Entry::new("x", x)).unwrap();
    graph.add_entry(Entry::new("y", y)).unwrap();

    let options = OptimizationOptions {
        split_chunks: Some(SplitChunksOptions {
            cache_groups: vec![CacheGroup::new("shared").min_chunks(2).min_size(0)],
            ..Default::default()
        }),
        ..Default::default()
    };
    let cg = build_chunk_graph(&graph, BuildOptions::default()).unwrap();
    let (cg, _) = Optimizer::new(&graph, &options).optimize(cg);

    let shared: Vec<_> = cg.module_chunks(s).collect();
    assert_eq!(shared.len(), 1);
    for name in ["x", "y"] {
        let group = cg.group(cg.entrypoint(name).unwrap());
        assert!(group.contains_chunk(shared[0]));
        let own = group.entrypoint_chunk().unwrap();
        assert!(!cg.chunk(own).contains_module(s));
    }
    assert!(cg.check_invariants().is_empty());
}

#[test]
fn two_blocks_to_the_same_target_make_two_groups() {
    let build = |hint: Option<&str>| {
        let mut graph = ModuleGraph::new();
        let a = graph.add_module(Module::new("./a.js")).unwrap();
        let b = graph.add_module(Module::new("./b.js")).unwrap();
        graph.add_dynamic_import(a, b, hint).unwrap();
        graph.add_dynamic_import(a, b, hint).unwrap();
        graph.add_entry(Entry::new("main", a)).unwrap();
        build_chunk_graph(&graph, BuildOptions::default()).unwrap()
    };

    assert_eq!(build(None).group_count(), 3);
    assert_eq!(build(Some("b")).group_count(), 2);
}

#[test]
fn async_cycle_terminates_with_one_extra_group() {
    let mut graph = ModuleGraph::new();
    let a = graph.add_module(Module::new("./a.js")).unwrap();
    let b = graph.add_module(Module::new("./b.js")).unwrap();
    graph.add_sync_dependency(a, b).unwrap();
    graph.add_dynamic_import(b, a, None).unwrap();
    graph.add_entry(Entry::new("main", a)).unwrap();

    let cg = build_chunk_graph(&graph, BuildOptions::default()).unwrap();
    assert_eq!(cg.group_count(), 2);

    let entry = cg.entrypoint("main").unwrap();
    let child = cg.group(entry).children().next().unwrap();
    let chunk = cg.group(child).chunks()[0];
    assert!(cg.chunk(chunk).contains_module(a));
}

#[test]
fn json_graph_through_the_whole_pipeline() {
    let graph = ModuleGraph::from_json(
        r#"{
          "modules": [
            { "identifier": "./src/index.js", "size": 500, "hash": "i1",
              "dependencies": ["./node_modules/react/index.js"],
              "blocks": [{ "chunkName": "settings", "dependencies": ["./src/settings.js"] }] },
            { "identifier": "./src/admin.js", "size": 300,
              "dependencies": ["./node_modules/react/index.js"] },
            { "identifier": "./src/settings.js", "size": 200 },
            { "identifier": "./node_modules/react/index.js", "size": 40000 }
          ],
          "entries": [
            { "name": "main", "import": "./src/index.js" },
            { "name": "admin", "import": "./src/admin.js" }
          ]
        }"#,
    )
    .unwrap();

    let mut options = BundlerOptions::default();
    options.ids = IdOptions {
        chunk_ids: IdPolicy::Named,
        ..Default::default()
    };
    let output = Bundler::new(options).run(&graph).unwrap();
    let stats = Stats::from_sealed(&output.sealed, &graph);

    let vendors = stats
        .chunks
        .iter()
        .find(|c| c.id_hints.contains(&"vendors".to_string()))
        .expect("vendors chunk");
    assert_eq!(vendors.modules, vec!["./node_modules/react/index.js".to_string()]);
    assert!(vendors.initial);

    assert_eq!(stats.entrypoints["main"].chunks.len(), 2);
    assert_eq!(stats.entrypoints["admin"].chunks.len(), 2);
    assert!(stats.chunks.iter().any(|c| c.name.as_deref() == Some("settings")));
    assert_eq!(stats.hash.len(), 20);
}
