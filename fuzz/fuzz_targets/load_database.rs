#![no_main]

use libfuzzer_sys::fuzz_target;
use parley_core::graph::diagnostics::analyze;
use parley_core::graph::{DialogueGraph, valid_children};
use parley_core::model::RawDatabase;

// Arbitrary JSON must never panic the loader, and every node of a graph
// that loads must resolve its children to a value or a typed error.
fuzz_target!(|data: &[u8]| {
    let Ok(raw) = RawDatabase::from_reader(data) else {
        return;
    };
    let Ok(graph) = DialogueGraph::from_raw(raw) else {
        return;
    };
    for node in graph.nodes() {
        let _ = valid_children(&graph, node.id);
    }
    let report = analyze(&graph);
    let _ = serde_json::to_string(&report);
});
