#![allow(missing_docs)]

use std::sync::{Arc, Once};

use cellgraph::{
    model::FetchHints, security, Authorizations, Element, ElementId, ElementType, Graph,
    GraphError, GraphOptions, InMemoryStorage, PropertyValue, Result, Timestamp, Visibility,
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

fn graph() -> Graph {
    init_tracing();
    Graph::open(GraphOptions::new(Arc::new(InMemoryStorage::new())))
}

fn vis(expression: &str) -> Visibility {
    Visibility::parse(expression).unwrap()
}

fn auths(labels: &[&str]) -> Authorizations {
    Authorizations::new(labels.iter().copied())
}

#[test]
fn visibility_algebra() -> Result<()> {
    let a = auths(&["a"]);
    let ab = auths(&["a", "b"]);
    let b = auths(&["b"]);
    assert!(security::can_read("", &Authorizations::empty())?);
    assert!(security::can_read("", &ab)?);
    assert!(!security::can_read("a&b", &a)?);
    assert!(security::can_read("a&b", &ab)?);
    assert!(security::can_read("(a)|b", &b)?);
    Ok(())
}

#[test]
fn malformed_visibility_is_reported() {
    let err = Visibility::parse("a&(b").unwrap_err();
    assert!(matches!(err, GraphError::MalformedVisibility { .. }));
    assert!(security::can_read("a||", &Authorizations::empty()).is_err());
}

#[test]
fn re_deleting_a_deleted_vertex_keeps_it_absent() -> Result<()> {
    let g = graph();
    let writer = auths(&["a"]);
    let id = ElementId::new("v1");
    g.save(g.prepare_vertex("v1", vis("a")), &writer)?;
    g.save(g.mutate_vertex("v1").soft_delete(), &writer)?;
    assert!(g.vertex(&id, &g.read_context(writer.clone()))?.is_none());

    g.save(g.mutate_vertex("v1").soft_delete(), &writer)?;
    assert!(g.vertex(&id, &g.read_context(writer.clone()))?.is_none());
    assert!(matches!(
        g.vertex_required(&id, &g.read_context(writer)),
        Err(GraphError::NotFound { .. })
    ));
    Ok(())
}

#[test]
fn resurrected_vertex_starts_empty() -> Result<()> {
    let g = graph();
    let writer = auths(&["a"]);
    let id = ElementId::new("v1");
    g.save(
        g.prepare_vertex("v1", vis("a"))
            .add_property("", "name", "old", vis("a")),
        &writer,
    )?;
    g.save(g.mutate_vertex("v1").soft_delete(), &writer)?;
    g.save(g.prepare_vertex("v1", Visibility::empty()), &writer)?;

    for reader in [Authorizations::empty(), auths(&["a"]), auths(&["z"])] {
        let v = g.vertex_required(&id, &g.read_context(reader))?;
        assert!(v.visibility().is_empty());
        assert!(v.properties()?.is_empty());
    }
    Ok(())
}

#[test]
fn values_under_different_visibilities_coexist() -> Result<()> {
    let g = graph();
    let writer = auths(&["a", "b"]);
    let id = ElementId::new("v1");
    g.save(
        g.prepare_vertex("v1", Visibility::empty())
            .add_property("", "prop1", "value1a", vis("a"))
            .add_property("", "prop1", "value1b", vis("b")),
        &writer,
    )?;

    let both = g.vertex_required(&id, &g.read_context(auths(&["a", "b"])))?;
    assert_eq!(both.properties()?.len(), 2);

    let only_a = g.vertex_required(&id, &g.read_context(auths(&["a"])))?;
    assert_eq!(only_a.property_values("prop1")?, vec![&PropertyValue::from("value1a")]);

    let only_b = g.vertex_required(&id, &g.read_context(auths(&["b"])))?;
    assert_eq!(only_b.property_values("prop1")?, vec![&PropertyValue::from("value1b")]);

    let none = g.vertex_required(&id, &g.read_context(Authorizations::empty()))?;
    assert!(none.properties()?.is_empty());
    Ok(())
}

#[test]
fn hide_then_unhide_restores_the_vertex() -> Result<()> {
    let g = graph();
    let holder = auths(&["a"]);
    let outsider = Authorizations::empty();
    let id = ElementId::new("v1");
    g.save(
        g.prepare_vertex("v1", Visibility::empty())
            .add_property("", "p", 1i64, Visibility::empty()),
        &holder,
    )?;
    let before = g.vertex_required(&id, &g.read_context(holder.clone()))?;

    g.save(g.mutate_vertex("v1").mark_hidden(vis("a")), &holder)?;
    assert!(g.vertex(&id, &g.read_context(holder.clone()))?.is_none());
    let hidden = g.vertex_required(
        &id,
        &g.read_context(holder.clone())
            .with_hints(FetchHints::all_including_hidden()),
    )?;
    assert!(hidden.is_hidden());
    assert_eq!(hidden.hidden_visibilities(), &[vis("a")]);
    let outside = g.vertex_required(&id, &g.read_context(outsider.clone()))?;
    assert!(!outside.is_hidden());

    g.save(g.mutate_vertex("v1").mark_visible(vis("a")), &holder)?;
    let after = g.vertex_required(&id, &g.read_context(holder))?;
    assert!(!after.is_hidden());
    assert_eq!(after.visibility(), before.visibility());
    assert_eq!(after.properties()?.len(), before.properties()?.len());
    assert!(!g.vertex_required(&id, &g.read_context(outsider))?.is_hidden());
    Ok(())
}

#[test]
fn hidden_property_is_flagged_only_when_requested() -> Result<()> {
    let g = graph();
    let reader = auths(&["a"]);
    let id = ElementId::new("v1");
    g.save(
        g.prepare_vertex("v1", Visibility::empty())
            .add_property("", "p", 1i64, Visibility::empty())
            .add_property("", "q", 2i64, Visibility::empty()),
        &reader,
    )?;
    g.save(
        g.mutate_vertex("v1")
            .mark_property_hidden("", "p", Visibility::empty(), vis("a")),
        &reader,
    )?;

    let plain = g.vertex_required(&id, &g.read_context(reader.clone()))?;
    assert!(plain.property("", "p")?.is_none());
    assert!(plain.property("", "q")?.is_some());

    let with_hidden = g.vertex_required(
        &id,
        &g.read_context(reader).with_hints(FetchHints::all_including_hidden()),
    )?;
    let p = with_hidden.property("", "p")?.unwrap();
    assert!(p.is_hidden());
    Ok(())
}

#[test]
fn fetch_hints_gate_property_access() -> Result<()> {
    let g = graph();
    let reader = Authorizations::empty();
    let id = ElementId::new("v1");
    g.save(
        g.prepare_vertex("v1", Visibility::empty())
            .add_property("", "name", "x", Visibility::empty()),
        &reader,
    )?;

    let bare = g.vertex_required(
        &id,
        &g.read_context(reader.clone()).with_hints(FetchHints::none()),
    )?;
    assert!(matches!(bare.properties(), Err(GraphError::FetchHintsViolation(_))));
    assert!(matches!(
        bare.property_value("name"),
        Err(GraphError::FetchHintsViolation(_))
    ));

    let only_age = g.vertex_required(
        &id,
        &g.read_context(reader.clone())
            .with_hints(FetchHints::builder().property_names(["age"]).build()),
    )?;
    assert!(only_age.property_value("name").is_err());
    assert_eq!(only_age.property_value("age")?, None);

    let full = g.vertex_required(&id, &g.read_context(reader))?;
    assert_eq!(full.property_value("name")?, Some(&PropertyValue::from("x")));
    Ok(())
}

#[test]
fn element_visibility_change_applies_to_later_reads() -> Result<()> {
    let g = graph();
    let writer = auths(&["a"]);
    let id = ElementId::new("v1");
    g.save(g.prepare_vertex("v1", Visibility::empty()).at(Timestamp(10)), &writer)?;
    g.save(
        g.mutate_vertex("v1")
            .alter_element_visibility(vis("a"))
            .at(Timestamp(20)),
        &writer,
    )?;

    let outsider = g.read_context(Authorizations::empty());
    assert!(g.vertex(&id, &outsider)?.is_none());
    assert!(g.vertex(&id, &outsider.clone().as_of(Timestamp(15)))?.is_some());
    assert_eq!(g.vertex_required(&id, &g.read_context(writer))?.visibility(), &vis("a"));
    Ok(())
}

#[test]
fn ensure_readable_distinguishes_missing_from_unreadable() -> Result<()> {
    let g = graph();
    let writer = auths(&["a"]);
    g.save(g.prepare_vertex("open", Visibility::empty()), &writer)?;
    g.save(g.prepare_vertex("secret", vis("a")), &writer)?;
    let ids = [ElementId::new("open"), ElementId::new("secret")];

    g.ensure_readable(ElementType::Vertex, &ids, &writer)?;
    assert!(matches!(
        g.ensure_readable(ElementType::Vertex, &ids, &Authorizations::empty()),
        Err(GraphError::Security(_))
    ));
    assert!(matches!(
        g.ensure_readable(ElementType::Vertex, &[ElementId::new("gone")], &writer),
        Err(GraphError::NotFound { .. })
    ));
    Ok(())
}

#[test]
fn strict_writes_reject_unreadable_visibilities() -> Result<()> {
    init_tracing();
    let g = Graph::open(
        GraphOptions::new(Arc::new(InMemoryStorage::new())).strict_write_visibility(true),
    );
    let writer = auths(&["a"]);
    g.save(g.prepare_vertex("v1", vis("a")), &writer)?;
    let err = g
        .save(
            g.mutate_vertex("v1").add_property("", "p", 1i64, vis("b")),
            &writer,
        )
        .unwrap_err();
    assert!(matches!(err, GraphError::Security(_)));
    Ok(())
}
