#![allow(missing_docs)]

use std::io::Read;
use std::sync::{Arc, Once};

use bytes::Bytes;
use cellgraph::{
    error::StorageError, Authorizations, Element, ElementId, Graph, GraphError, GraphOptions,
    InMemoryStorage, PropertyValue, Result, StorageAdapter, StreamingPropertyValue,
    StreamingValueRef, Visibility,
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

fn payload(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

fn open(options: impl FnOnce(GraphOptions) -> GraphOptions) -> (Arc<InMemoryStorage>, Graph) {
    init_tracing();
    let storage = Arc::new(InMemoryStorage::new());
    let graph = Graph::open(options(GraphOptions::new(storage.clone())));
    (storage, graph)
}

fn stored_ref(g: &Graph, name: &str) -> Result<StreamingValueRef> {
    let v = g.vertex_required(&ElementId::new("v1"), &g.read_context(Authorizations::empty()))?;
    match v.property_value(name)? {
        Some(PropertyValue::Streaming(reference)) => Ok(reference.clone()),
        other => panic!("expected a streaming value, got {other:?}"),
    }
}

#[test]
fn large_value_reads_back_identically_twice() -> Result<()> {
    let (storage, g) = open(|o| o);
    let data = payload(200 * 1024);
    g.save(
        g.prepare_vertex("v1", Visibility::empty()).add_streaming_property(
            "",
            "doc",
            StreamingPropertyValue::new("application/pdf", data.clone()),
            Visibility::empty(),
        ),
        &Authorizations::empty(),
    )?;

    let reference = stored_ref(&g, "doc")?;
    assert_eq!(reference.length, data.len() as u64);
    assert_eq!(reference.value_type, "application/pdf");

    let first = g.open_stream(&reference)?.read_to_vec()?;
    let second = g.open_stream(&reference)?.read_to_vec()?;
    assert_eq!(first, data);
    assert_eq!(first, second);
    assert_eq!(storage.streaming_resolve_count(), 2);
    Ok(())
}

#[test]
fn mark_and_reset_do_not_refetch() -> Result<()> {
    let (storage, g) = open(|o| o);
    let data = payload(4096);
    g.save(
        g.prepare_vertex("v1", Visibility::empty()).add_streaming_property(
            "",
            "doc",
            StreamingPropertyValue::new("bytes", data.clone()),
            Visibility::empty(),
        ),
        &Authorizations::empty(),
    )?;
    let reference = stored_ref(&g, "doc")?;

    let mut stream = g.open_stream(&reference)?;
    let mut head = [0u8; 100];
    stream.read_exact(&mut head)?;
    stream.mark(1024);
    let mut first = [0u8; 512];
    stream.read_exact(&mut first)?;
    stream.reset()?;
    let mut again = [0u8; 512];
    stream.read_exact(&mut again)?;

    assert_eq!(first, again);
    assert_eq!(&again[..], &data[100..612]);
    assert_eq!(storage.streaming_resolve_count(), 1);
    Ok(())
}

#[test]
fn long_streams_spool_to_a_temp_file() -> Result<()> {
    let (_, g) = open(|o| o.streaming_spool_threshold(1024));
    let data = payload(16 * 1024);
    g.save(
        g.prepare_vertex("v1", Visibility::empty()).add_streaming_property(
            "",
            "doc",
            StreamingPropertyValue::new("bytes", data.clone()),
            Visibility::empty(),
        ),
        &Authorizations::empty(),
    )?;
    let reference = stored_ref(&g, "doc")?;

    let mut stream = g.open_stream(&reference)?;
    assert!(stream.is_spooled());
    assert_eq!(stream.len(), data.len() as u64);
    assert_eq!(stream.read_to_vec()?, data);
    Ok(())
}

#[test]
fn oversized_inline_values_are_moved_out_of_line() -> Result<()> {
    let (_, g) = open(|o| o.max_inline_value_len(Some(16)));
    let text = "x".repeat(100);
    g.save(
        g.prepare_vertex("v1", Visibility::empty())
            .add_property("", "short", "tiny", Visibility::empty())
            .add_property("", "long", text.clone(), Visibility::empty()),
        &Authorizations::empty(),
    )?;

    let v = g.vertex_required(&ElementId::new("v1"), &g.read_context(Authorizations::empty()))?;
    assert_eq!(v.property_value("short")?, Some(&PropertyValue::from("tiny")));

    let reference = stored_ref(&g, "long")?;
    assert_eq!(reference.value_type, "text/plain");
    assert_eq!(g.open_stream(&reference)?.read_to_vec()?, text.into_bytes());
    Ok(())
}

#[test]
fn tampered_payload_fails_checksum() -> Result<()> {
    let (storage, g) = open(|o| o);
    g.save(
        g.prepare_vertex("v1", Visibility::empty()).add_streaming_property(
            "",
            "doc",
            StreamingPropertyValue::new("bytes", payload(64)),
            Visibility::empty(),
        ),
        &Authorizations::empty(),
    )?;
    let reference = stored_ref(&g, "doc")?;

    storage.store_streaming_value(&reference.key, Bytes::from(vec![0u8; 64]))?;
    let err = g.open_stream(&reference).unwrap_err();
    assert!(matches!(
        err,
        GraphError::Storage(StorageError::ChecksumMismatch { .. })
    ));

    storage.store_streaming_value(&reference.key, Bytes::from_static(b"short"))?;
    assert!(matches!(
        g.open_stream(&reference).unwrap_err(),
        GraphError::Storage(StorageError::Corruption(_))
    ));
    Ok(())
}

#[test]
fn streaming_values_keep_their_property_history() -> Result<()> {
    let (_, g) = open(|o| o);
    let auths = Authorizations::empty();
    g.save(
        g.prepare_vertex("v1", Visibility::empty()).add_streaming_property(
            "",
            "doc",
            StreamingPropertyValue::new("bytes", payload(32)),
            Visibility::empty(),
        ),
        &auths,
    )?;
    let first = stored_ref(&g, "doc")?;
    g.save(
        g.mutate_vertex("v1").add_streaming_property(
            "",
            "doc",
            StreamingPropertyValue::new("bytes", payload(48)),
            Visibility::empty(),
        ),
        &auths,
    )?;
    let second = stored_ref(&g, "doc")?;

    assert_ne!(first.key, second.key);
    assert_eq!(g.open_stream(&first)?.read_to_vec()?, payload(32));
    assert_eq!(g.open_stream(&second)?.len(), 48);
    Ok(())
}
