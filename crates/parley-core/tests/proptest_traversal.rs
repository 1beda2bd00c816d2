use proptest::prelude::*;

use parley_core::config::DisplayConfig;
use parley_core::graph::{Step, next_step, valid_children};
use parley_core::model::NodeKind;
use parley_core::overlay::NoOverlay;
use parley_core::session::{HISTORY_PAGE_HOPS, NavigationSession, Outcome};
use parley_core::text::TextResolver;

use generators::arb_acyclic_graph;

proptest! {
    #![proptest_config(proptest::test_runner::Config::with_cases(512))]

    #[test]
    fn valid_children_never_contain_obsolete_or_textless(graph in arb_acyclic_graph()) {
        for node in graph.nodes() {
            let children = valid_children(&graph, node.id).expect("acyclic graph resolves");
            for child in children {
                let child = graph.node(child).expect("child exists");
                prop_assert!(!child.is_obsolete());
                prop_assert!(child.has_text());
            }
        }
    }

    #[test]
    fn link_to_obsolete_target_has_no_children(graph in arb_acyclic_graph()) {
        for node in graph.nodes().filter(|n| n.kind == NodeKind::Link) {
            let Some(target) = node.linked_target() else { continue };
            if graph.node(target).expect("target exists").is_obsolete() {
                prop_assert!(valid_children(&graph, node.id).expect("resolves").is_empty());
            }
        }
    }

    #[test]
    fn descent_stops_only_at_choice_or_end(graph in arb_acyclic_graph()) {
        let resolver = TextResolver::new(&graph, &NoOverlay, DisplayConfig::default());
        for node in graph.nodes() {
            let mut session = NavigationSession::new(resolver);
            let outcome = session.start(node.id).expect("acyclic graph navigates");
            match outcome {
                Outcome::Stalled => prop_assert!(node.is_obsolete()),
                Outcome::Ended => {
                    let current = session.current().expect("active");
                    prop_assert_eq!(next_step(&graph, current).expect("resolves"), Step::End);
                }
                Outcome::AwaitingChoice(count) => {
                    prop_assert!(count >= 2);
                    prop_assert_eq!(session.pending_choices().map(<[_]>::len), Some(count));
                }
            }
        }
    }

    #[test]
    fn history_is_bounded_and_stops_at_root(graph in arb_acyclic_graph()) {
        let resolver = TextResolver::new(&graph, &NoOverlay, DisplayConfig::default());
        for node in graph.nodes() {
            let mut session = NavigationSession::new(resolver);
            session.start(node.id).expect("acyclic graph navigates");
            loop {
                let before = session.oldest();
                let added = session.load_more_history().expect("history resolves");
                prop_assert!(added <= HISTORY_PAGE_HOPS);
                if session.oldest() == before {
                    prop_assert_eq!(added, 0);
                    break;
                }
            }
            let oldest = session.oldest().expect("history cursor set");
            prop_assert!(graph.node(oldest).expect("exists").parent.is_none());
            prop_assert_eq!(session.load_more_history().expect("noop"), 0);
        }
    }

    #[test]
    fn text_resolution_is_idempotent(graph in arb_acyclic_graph()) {
        let display = DisplayConfig { show_dialogue_id: true, ..DisplayConfig::default() };
        let resolver = TextResolver::new(&graph, &NoOverlay, display);
        for node in graph.nodes() {
            let first = resolver.narrative_block(node.id).expect("resolves");
            let second = resolver.narrative_block(node.id).expect("resolves");
            prop_assert_eq!(first, second);
        }
    }
}
