#![allow(missing_docs)]

use std::collections::BTreeSet;
use std::sync::{Arc, Once};

use cellgraph::{
    model::EdgeRefSelection, Authorizations, Direction, Element, ElementId, FetchHints, Graph,
    GraphError, GraphOptions, InMemoryStorage, Result, Timestamp, Visibility,
};
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("cellgraph=debug"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_ansi(false)
            .try_init();
    });
}

fn vis(expression: &str) -> Visibility {
    Visibility::parse(expression).unwrap()
}

/// `a -knows-> b`, plus the vertices themselves.
fn knows_graph() -> Result<Graph> {
    init_tracing();
    let g = Graph::open(GraphOptions::new(Arc::new(InMemoryStorage::new())));
    let auths = Authorizations::empty();
    g.save(g.prepare_vertex("a", Visibility::empty()), &auths)?;
    g.save(g.prepare_vertex("b", Visibility::empty()), &auths)?;
    g.save(
        g.prepare_edge("e1", "a", "b", "knows", Visibility::empty())
            .add_property("", "since", 2020i64, Visibility::empty()),
        &auths,
    )?;
    Ok(g)
}

fn id(s: &str) -> ElementId {
    ElementId::new(s)
}

#[test]
fn edges_are_linked_from_both_endpoints() -> Result<()> {
    let g = knows_graph()?;
    let ctx = g.read_context(Authorizations::empty());

    let a = g.vertex_required(&id("a"), &ctx)?;
    assert_eq!(a.edge_ids(Direction::Out)?, vec![&id("e1")]);
    assert!(a.edge_ids(Direction::In)?.is_empty());
    assert_eq!(a.vertex_ids(Direction::Both)?, vec![&id("b")]);

    let b = g.vertex_required(&id("b"), &ctx)?;
    assert_eq!(b.edge_count(Direction::In)?, 1);
    assert_eq!(b.vertex_ids(Direction::In)?, vec![&id("a")]);

    let edges = g.edges_of(&a, Direction::Out, &ctx)?;
    assert_eq!(edges.len(), 1);
    assert_eq!(edges[0].label(), "knows");
    assert_eq!(edges[0].out_vertex_id(), &id("a"));
    assert_eq!(edges[0].other_vertex_id(&id("a")), Some(&id("b")));

    let (out, inn) = g.edge_vertices(&edges[0], &ctx)?;
    assert_eq!(out.map(|v| v.id().clone()), Some(id("a")));
    assert_eq!(inn.map(|v| v.id().clone()), Some(id("b")));
    Ok(())
}

#[test]
fn relabelled_edge_reports_new_label_everywhere() -> Result<()> {
    let g = knows_graph()?;
    let auths = Authorizations::empty();
    g.save(g.mutate_edge("e1").alter_edge_label("likes"), &auths)?;

    let ctx = g.read_context(auths);
    assert_eq!(g.edge_required(&id("e1"), &ctx)?.label(), "likes");
    let a = g.vertex_required(&id("a"), &ctx)?;
    assert_eq!(a.edge_labels(Direction::Out)?, BTreeSet::from(["likes"]));
    Ok(())
}

#[test]
fn unreadable_and_hidden_edges_drop_out_of_vertex_refs() -> Result<()> {
    let g = knows_graph()?;
    let writer = Authorizations::new(["s"]);
    g.save(
        g.prepare_edge("e2", "a", "b", "secret", vis("s")),
        &writer,
    )?;

    let outsider = g.read_context(Authorizations::empty());
    let a = g.vertex_required(&id("a"), &outsider)?;
    assert_eq!(a.edge_count(Direction::Out)?, 1);
    assert!(g.edge(&id("e2"), &outsider)?.is_none());

    let insider = g.read_context(writer.clone());
    assert_eq!(g.vertex_required(&id("a"), &insider)?.edge_count(Direction::Out)?, 2);

    g.save(g.mutate_edge("e1").mark_hidden(vis("s")), &writer)?;
    let a = g.vertex_required(&id("a"), &insider)?;
    assert_eq!(a.edge_ids(Direction::Out)?, vec![&id("e2")]);

    let with_hidden = g.vertex_required(
        &id("a"),
        &g.read_context(writer).with_hints(FetchHints::all_including_hidden()),
    )?;
    let infos = with_hidden.edge_infos(Direction::Out)?;
    assert_eq!(infos.len(), 2);
    assert!(infos.iter().any(|info| info.edge_id == id("e1") && info.hidden));
    Ok(())
}

#[test]
fn deleting_a_vertex_deletes_its_edges() -> Result<()> {
    let g = knows_graph()?;
    let auths = Authorizations::empty();
    let deleted_at = g.save(g.mutate_vertex("a").soft_delete(), &auths)?;

    let ctx = g.read_context(auths.clone());
    assert!(g.vertex(&id("a"), &ctx)?.is_none());
    assert!(g.edge(&id("e1"), &ctx)?.is_none());
    assert_eq!(g.vertex_required(&id("b"), &ctx)?.edge_count(Direction::Both)?, 0);

    let before = g.read_context(auths).as_of(Timestamp(deleted_at.0 - 1));
    assert!(g.edge(&id("e1"), &before)?.is_some());
    Ok(())
}

#[test]
fn deleting_an_edge_leaves_vertices_in_place() -> Result<()> {
    let g = knows_graph()?;
    let auths = Authorizations::empty();
    g.save(g.mutate_edge("e1").soft_delete(), &auths)?;

    let ctx = g.read_context(auths);
    let a = g.vertex_required(&id("a"), &ctx)?;
    assert!(a.edge_ids(Direction::Both)?.is_empty());
    assert!(g.vertex(&id("b"), &ctx)?.is_some());
    Ok(())
}

#[test]
fn counts_only_hints_hide_edge_ids() -> Result<()> {
    let g = knows_graph()?;
    let hints = FetchHints::builder()
        .edge_refs(EdgeRefSelection::Both)
        .edge_labels_and_counts_only(true)
        .build();
    let ctx = g.read_context(Authorizations::empty()).with_hints(hints);
    let a = g.vertex_required(&id("a"), &ctx)?;
    assert_eq!(a.edge_count(Direction::Out)?, 1);
    assert_eq!(a.edge_labels(Direction::Out)?, BTreeSet::from(["knows"]));
    assert!(a.edge_ids(Direction::Out).is_err());

    let no_edges = g.read_context(Authorizations::empty()).with_hints(FetchHints::none());
    let a = g.vertex_required(&id("a"), &no_edges)?;
    assert!(a.edge_count(Direction::Out).is_err());
    Ok(())
}

#[test]
fn one_sided_edge_hints_reject_the_other_direction() -> Result<()> {
    let g = knows_graph()?;
    let in_only = g
        .read_context(Authorizations::empty())
        .with_hints(FetchHints::builder().edge_refs(EdgeRefSelection::InOnly).build());
    let a = g.vertex_required(&id("a"), &in_only)?;
    assert!(a.edge_ids(Direction::In)?.is_empty());
    assert!(matches!(
        a.edge_ids(Direction::Out),
        Err(GraphError::FetchHintsViolation(_))
    ));
    let b = g.vertex_required(&id("b"), &in_only)?;
    assert_eq!(b.edge_ids(Direction::In)?, vec![&id("e1")]);

    let out_only = g
        .read_context(Authorizations::empty())
        .with_hints(FetchHints::builder().edge_refs(EdgeRefSelection::OutOnly).build());
    let a = g.vertex_required(&id("a"), &out_only)?;
    assert_eq!(a.edge_ids(Direction::Out)?, vec![&id("e1")]);
    assert!(matches!(
        a.edge_ids(Direction::In),
        Err(GraphError::FetchHintsViolation(_))
    ));
    Ok(())
}

#[test]
fn self_loop_is_seen_in_both_directions() -> Result<()> {
    let g = knows_graph()?;
    let auths = Authorizations::empty();
    g.save(g.prepare_edge("loop", "a", "a", "self", Visibility::empty()), &auths)?;

    let a = g.vertex_required(&id("a"), &g.read_context(auths))?;
    assert_eq!(a.edge_count(Direction::In)?, 1);
    assert_eq!(a.edge_count(Direction::Out)?, 2);
    assert!(a.edge_ids(Direction::Both)?.contains(&&id("loop")));
    assert_eq!(a.edge_ids(Direction::Both)?.len(), 2);
    Ok(())
}

#[test]
fn edge_scans_follow_id_order() -> Result<()> {
    let g = knows_graph()?;
    let auths = Authorizations::empty();
    g.save(g.prepare_edge("e0", "b", "a", "follows", Visibility::empty()), &auths)?;
    g.save(g.prepare_edge("x1", "b", "a", "follows", Visibility::empty()), &auths)?;

    let ctx = g.read_context(auths);
    let ids: Vec<_> = g
        .edges_with_prefix("e", &ctx)?
        .into_iter()
        .map(|edge| edge.id().clone())
        .collect();
    assert_eq!(ids, vec![id("e0"), id("e1")]);

    let ranged = g.edges_in_range(Some(id("e1")), None, &ctx)?;
    assert_eq!(ranged.len(), 2);
    Ok(())
}
