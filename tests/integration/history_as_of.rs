#![allow(missing_docs)]

use std::sync::{Arc, Once};

use cellgraph::{
    Authorizations, Element, ElementId, ElementType, FetchHints, Graph, GraphError,
    GraphOptions, HistoryQuery, InMemoryStorage, Metadata, PropertyValue, Result, Timestamp, Visibility,
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

fn write_at(g: &Graph, id: &str, ts: u64, value: i64) -> Result<Timestamp> {
    g.save(
        g.mutate_vertex(id)
            .add_property("", "age", value, Visibility::empty())
            .at(Timestamp(ts)),
        &Authorizations::empty(),
    )
}

#[test]
fn history_is_newest_first_and_as_of_reads_follow_it() -> Result<()> {
    let g = graph();
    let reader = Authorizations::empty();
    let id = ElementId::new("v1");
    g.save(
        g.prepare_vertex("v1", Visibility::empty()).at(Timestamp(10)),
        &reader,
    )?;
    write_at(&g, "v1", 25, 25)?;
    write_at(&g, "v1", 30, 30)?;

    let history = g.history(
        ElementType::Vertex,
        &id,
        &HistoryQuery::property("", "age"),
        &reader,
    )?;
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].value, PropertyValue::Int(30));
    assert_eq!(history[0].timestamp, Timestamp(30));
    assert_eq!(history[1].value, PropertyValue::Int(25));
    assert!(history.iter().all(|entry| !entry.deleted));

    let current = g.vertex_required(&id, &g.read_context(reader.clone()))?;
    assert_eq!(current.property_value("age")?, Some(&PropertyValue::Int(30)));

    let at_25 = g.vertex_required(&id, &g.read_context(reader.clone()).as_of(Timestamp(25)))?;
    assert_eq!(at_25.property_value("age")?, Some(&PropertyValue::Int(25)));
    assert_eq!(at_25.as_of(), Some(Timestamp(25)));

    assert!(g
        .vertex(&id, &g.read_context(reader).as_of(Timestamp(5)))?
        .is_none());
    Ok(())
}

#[test]
fn history_window_and_deletes() -> Result<()> {
    let g = graph();
    let reader = Authorizations::empty();
    let id = ElementId::new("v1");
    g.save(
        g.prepare_vertex("v1", Visibility::empty()).at(Timestamp(1)),
        &reader,
    )?;
    write_at(&g, "v1", 10, 1)?;
    write_at(&g, "v1", 20, 2)?;
    g.save(
        g.mutate_vertex("v1")
            .soft_delete_property("", "age", None)
            .at(Timestamp(30)),
        &reader,
    )?;

    let all = g.history(ElementType::Vertex, &id, &HistoryQuery::all(), &reader)?;
    assert_eq!(all.len(), 3);
    assert!(all[0].deleted);
    assert_eq!(all[0].value, PropertyValue::Int(2));

    let window = g.history(
        ElementType::Vertex,
        &id,
        &HistoryQuery::property("", "age").between(Some(Timestamp(15)), Some(Timestamp(25))),
        &reader,
    )?;
    assert_eq!(window.len(), 1);
    assert_eq!(window[0].timestamp, Timestamp(20));

    let v = g.vertex_required(&id, &g.read_context(reader))?;
    assert_eq!(v.property_value("age")?, None);
    Ok(())
}

#[test]
fn history_survives_element_delete() -> Result<()> {
    let g = graph();
    let reader = Authorizations::empty();
    let id = ElementId::new("v1");
    g.save(
        g.prepare_vertex("v1", Visibility::empty()).at(Timestamp(1)),
        &reader,
    )?;
    write_at(&g, "v1", 5, 7)?;
    g.save(g.mutate_vertex("v1").soft_delete().at(Timestamp(9)), &reader)?;

    assert!(g.vertex(&id, &g.read_context(reader.clone()))?.is_none());
    let history = g.history(ElementType::Vertex, &id, &HistoryQuery::all(), &reader)?;
    assert_eq!(history.len(), 2);
    assert!(history[0].deleted);
    assert_eq!(history[0].timestamp, Timestamp(9));
    assert_eq!(history[0].value, PropertyValue::Int(7));
    assert!(!history[1].deleted);
    assert_eq!(history[1].timestamp, Timestamp(5));

    g.save(
        g.prepare_vertex("v1", Visibility::empty()).at(Timestamp(12)),
        &reader,
    )?;
    write_at(&g, "v1", 13, 8)?;
    let history = g.history(ElementType::Vertex, &id, &HistoryQuery::all(), &reader)?;
    let timeline: Vec<_> = history
        .iter()
        .map(|h| (h.timestamp.0, h.deleted))
        .collect();
    assert_eq!(timeline, vec![(13, false), (9, true), (5, false)]);
    Ok(())
}

#[test]
fn history_of_unknown_or_unreadable_element_is_not_found() -> Result<()> {
    let g = graph();
    let writer = Authorizations::new(["a"]);
    g.save(g.prepare_vertex("secret", vis("a")), &writer)?;

    for id in ["secret", "missing"] {
        let err = g
            .history(
                ElementType::Vertex,
                &ElementId::new(id),
                &HistoryQuery::all(),
                &Authorizations::empty(),
            )
            .unwrap_err();
        assert!(matches!(err, GraphError::NotFound { .. }), "{id}: {err}");
    }
    Ok(())
}

#[test]
fn history_filters_unreadable_slots() -> Result<()> {
    let g = graph();
    let writer = Authorizations::new(["a"]);
    let id = ElementId::new("v1");
    g.save(
        g.prepare_vertex("v1", Visibility::empty())
            .add_property("", "p", "public", Visibility::empty())
            .add_property("", "p", "secret", vis("a")),
        &writer,
    )?;

    let public = g.history(ElementType::Vertex, &id, &HistoryQuery::all(), &Authorizations::empty())?;
    assert_eq!(public.len(), 1);
    assert_eq!(public[0].value, PropertyValue::from("public"));

    let only_a = g.history(
        ElementType::Vertex,
        &id,
        &HistoryQuery::all().with_visibility(vis("a")),
        &writer,
    )?;
    assert_eq!(only_a.len(), 1);
    assert_eq!(only_a[0].value, PropertyValue::from("secret"));
    Ok(())
}

#[test]
fn altering_property_visibility_moves_the_slot() -> Result<()> {
    let g = graph();
    let reader = Authorizations::new(["a", "b"]);
    let id = ElementId::new("v1");
    g.save(
        g.prepare_vertex("v1", Visibility::empty())
            .add_property("", "p", 1i64, vis("a"))
            .at(Timestamp(10)),
        &reader,
    )?;
    g.save(
        g.mutate_vertex("v1")
            .alter_property_visibility("", "p", vis("a"), vis("b"))
            .at(Timestamp(20)),
        &reader,
    )?;

    let v = g.vertex_required(&id, &g.read_context(reader.clone()))?;
    let props = v.properties_named("p")?;
    assert_eq!(props.len(), 1);
    assert_eq!(props[0].visibility(), &vis("b"));
    assert_eq!(props[0].value(), &PropertyValue::Int(1));

    let only_a = g.vertex_required(&id, &g.read_context(Authorizations::new(["a"])))?;
    assert!(only_a.property_value("p")?.is_none());

    let history = g.history(ElementType::Vertex, &id, &HistoryQuery::property("", "p"), &reader)?;
    assert_eq!(history.len(), 3);
    assert_eq!(history[0].timestamp, Timestamp(20));
    Ok(())
}

#[test]
fn metadata_follows_the_property_and_history() -> Result<()> {
    let g = graph();
    let reader = Authorizations::new(["a"]);
    let id = ElementId::new("v1");
    let metadata = Metadata::new()
        .with("source", "import", Visibility::empty())
        .with("confidence", 0.5, vis("a"));
    g.save(
        g.prepare_vertex("v1", Visibility::empty())
            .add_property_with("", "name", "x", metadata, Visibility::empty(), Some(Timestamp(10)))
            .at(Timestamp(10)),
        &reader,
    )?;
    g.save(
        g.mutate_vertex("v1")
            .set_property_metadata("", "name", Visibility::empty(), "source", "manual", Visibility::empty())
            .at(Timestamp(20)),
        &reader,
    )?;

    let v = g.vertex_required(&id, &g.read_context(reader.clone()))?;
    let name = v.property("", "name")?.unwrap();
    assert_eq!(name.metadata_value("source")?, Some(&PropertyValue::from("manual")));
    assert_eq!(name.metadata()?.len(), 2);

    let outsider = g.vertex_required(&id, &g.read_context(Authorizations::empty()))?;
    assert_eq!(outsider.property("", "name")?.unwrap().metadata()?.len(), 1);

    let history = g.history(ElementType::Vertex, &id, &HistoryQuery::all(), &reader)?;
    assert_eq!(history.len(), 1);
    Ok(())
}

#[test]
fn metadata_hints_select_keys() -> Result<()> {
    let g = graph();
    let reader = Authorizations::new(["a"]);
    let id = ElementId::new("v1");
    let metadata = Metadata::new()
        .with("source", "import", Visibility::empty())
        .with("confidence", 0.5, vis("a"))
        .with("reviewer", "kim", Visibility::empty());
    g.save(
        g.prepare_vertex("v1", Visibility::empty()).add_property_with(
            "",
            "name",
            "x",
            metadata,
            Visibility::empty(),
            None,
        ),
        &reader,
    )?;

    let hints = FetchHints::builder()
        .all_properties()
        .metadata_keys(["source", "confidence"])
        .build();
    let v = g.vertex_required(&id, &g.read_context(reader.clone()).with_hints(hints))?;
    let name = v.property("", "name")?.unwrap();
    let keys: Vec<_> = name.metadata()?.entries().map(|entry| entry.key()).collect();
    assert_eq!(keys, vec!["confidence", "source"]);
    assert_eq!(name.metadata_value("source")?, Some(&PropertyValue::from("import")));
    assert!(matches!(
        name.metadata_value("reviewer"),
        Err(GraphError::FetchHintsViolation(_))
    ));

    let no_metadata = FetchHints::builder().all_properties().build();
    let v = g.vertex_required(&id, &g.read_context(reader).with_hints(no_metadata))?;
    let name = v.property("", "name")?.unwrap();
    assert!(matches!(name.metadata(), Err(GraphError::FetchHintsViolation(_))));
    Ok(())
}
