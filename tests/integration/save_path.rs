#![allow(missing_docs)]

use std::sync::atomic::Ordering;
use std::sync::{Arc, Once};

use cellgraph::{
    storage::CounterMetrics, Authorizations, Element, ElementId, ElementType, Graph, GraphError,
    GraphEvent, GraphEventListener, GraphOptions, InMemoryStorage, PropertyValue, Result,
    Timestamp, Visibility,
};
use parking_lot::Mutex;
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

#[derive(Default)]
struct Recorder {
    events: Mutex<Vec<GraphEvent>>,
}

impl GraphEventListener for Recorder {
    fn on_graph_event(&self, event: &GraphEvent) {
        self.events.lock().push(event.clone());
    }
}

impl Recorder {
    fn take(&self) -> Vec<GraphEvent> {
        std::mem::take(&mut *self.events.lock())
    }
}

fn graph() -> Graph {
    init_tracing();
    Graph::open(GraphOptions::new(Arc::new(InMemoryStorage::new())))
}

fn id(s: &str) -> ElementId {
    ElementId::new(s)
}

#[test]
fn events_fire_once_per_logical_change() -> Result<()> {
    let g = graph();
    let recorder = Arc::new(Recorder::default());
    g.add_event_listener(recorder.clone());
    let auths = Authorizations::empty();

    let ts = g.save(
        g.prepare_vertex("v1", Visibility::empty())
            .add_property("", "name", "x", Visibility::empty()),
        &auths,
    )?;
    assert_eq!(
        recorder.take(),
        vec![
            GraphEvent::AddVertex {
                id: id("v1"),
                timestamp: ts,
            },
            GraphEvent::AddProperty {
                element_type: ElementType::Vertex,
                id: id("v1"),
                key: String::new(),
                name: "name".into(),
                visibility: Visibility::empty(),
                timestamp: ts,
            },
        ]
    );

    g.save(g.prepare_vertex("v2", Visibility::empty()), &auths)?;
    let ts = g.save(
        g.prepare_edge("e1", "v1", "v2", "knows", Visibility::empty()),
        &auths,
    )?;
    let events = recorder.take();
    assert_eq!(events.len(), 2);
    assert_eq!(
        events[1],
        GraphEvent::AddEdge {
            id: id("e1"),
            out_vertex_id: id("v1"),
            in_vertex_id: id("v2"),
            label: "knows".into(),
            timestamp: ts,
        }
    );

    let ts = g.save(g.mutate_vertex("v1").soft_delete(), &auths)?;
    let events = recorder.take();
    assert_eq!(events.len(), 2);
    assert!(events.contains(&GraphEvent::DeleteElement {
        element_type: ElementType::Edge,
        id: id("e1"),
        timestamp: ts,
    }));
    assert!(events.iter().all(|event| event.timestamp() == ts));

    g.save(g.mutate_vertex("v1").soft_delete(), &auths)?;
    assert!(recorder.take().is_empty());
    Ok(())
}

#[test]
fn failed_saves_fire_no_events() {
    let g = graph();
    let recorder = Arc::new(Recorder::default());
    g.add_event_listener(recorder.clone());

    let err = g
        .save(
            g.mutate_vertex("missing")
                .add_property("", "p", 1i64, Visibility::empty()),
            &Authorizations::empty(),
        )
        .unwrap_err();
    assert!(matches!(err, GraphError::NotFound { .. }));
    assert!(recorder.take().is_empty());
}

#[test]
fn metrics_count_appends_and_reads() -> Result<()> {
    init_tracing();
    let metrics = Arc::new(CounterMetrics::default());
    let g = Graph::open(
        GraphOptions::new(Arc::new(InMemoryStorage::new())).metrics(metrics.clone()),
    );
    let auths = Authorizations::empty();
    g.save(
        g.prepare_vertex("v1", Visibility::empty())
            .add_property("", "p", 1i64, Visibility::empty()),
        &auths,
    )?;
    assert_eq!(metrics.vertex_mutations.load(Ordering::Relaxed), 2);
    assert_eq!(metrics.batches.load(Ordering::Relaxed), 1);

    let ctx = g.read_context(auths);
    g.vertex(&id("v1"), &ctx)?;
    g.vertex(&id("nope"), &ctx)?;
    assert_eq!(metrics.reconstructions_found.load(Ordering::Relaxed), 1);
    assert_eq!(metrics.reconstructions_missing.load(Ordering::Relaxed), 1);
    Ok(())
}

#[test]
fn save_all_applies_batches_in_order() -> Result<()> {
    let g = graph();
    let auths = Authorizations::empty();
    let stamps = g.save_all(
        [
            g.prepare_vertex("v1", Visibility::empty()),
            g.mutate_vertex("v1").add_property("", "p", 1i64, Visibility::empty()),
            g.mutate_vertex("v1").add_property("", "p", 2i64, Visibility::empty()),
        ],
        &auths,
    )?;
    assert_eq!(stamps.len(), 3);
    assert!(stamps.windows(2).all(|pair| pair[0] < pair[1]));

    let v = g.vertex_required(&id("v1"), &g.read_context(auths))?;
    assert_eq!(v.property_value("p")?, Some(&PropertyValue::Int(2)));
    assert_eq!(v.timestamp(), stamps[2]);
    Ok(())
}

#[test]
fn explicit_property_timestamps_are_kept() -> Result<()> {
    let g = graph();
    let auths = Authorizations::empty();
    g.save(
        g.prepare_vertex("v1", Visibility::empty()).at(Timestamp(100)),
        &auths,
    )?;
    g.save(
        g.mutate_vertex("v1").add_property_with(
            "",
            "p",
            "early",
            Default::default(),
            Visibility::empty(),
            Some(Timestamp(150)),
        ),
        &auths,
    )?;

    let v = g.vertex_required(&id("v1"), &g.read_context(auths))?;
    assert_eq!(v.property("", "p")?.unwrap().timestamp(), Timestamp(150));
    Ok(())
}

#[test]
fn vertex_scans_use_prefix_and_range() -> Result<()> {
    let g = graph();
    let writer = Authorizations::new(["a"]);
    for name in ["user:1", "user:2", "user:3", "item:1"] {
        g.save(g.prepare_vertex(name, Visibility::empty()), &writer)?;
    }
    g.save(
        g.prepare_vertex("user:4", Visibility::parse("a")?),
        &writer,
    )?;

    let public = g.read_context(Authorizations::empty());
    let users: Vec<_> = g
        .vertices_with_prefix("user:", &public)?
        .iter()
        .map(|v| v.id().as_str().to_owned())
        .collect();
    assert_eq!(users, vec!["user:1", "user:2", "user:3"]);
    assert_eq!(g.vertices_with_prefix("user:", &g.read_context(writer))?.len(), 4);

    let ranged = g.vertices_in_range(Some(id("item:1")), Some(id("user:2")), &public)?;
    assert_eq!(ranged.len(), 2);
    Ok(())
}

#[test]
fn graph_metadata_round_trips() -> Result<()> {
    let g = graph();
    assert_eq!(g.get_graph_metadata("schema.version")?, None);
    g.set_graph_metadata("schema.version", 3i64)?;
    assert_eq!(
        g.get_graph_metadata("schema.version")?,
        Some(PropertyValue::Int(3))
    );
    Ok(())
}
