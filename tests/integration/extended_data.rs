#![allow(missing_docs)]

use std::collections::BTreeSet;
use std::sync::{Arc, Once};

use cellgraph::{
    model::TableSelection, Authorizations, Element, ElementId, ElementType, FetchHints, Graph,
    GraphError, GraphOptions, InMemoryStorage, PropertyValue, Result, Visibility,
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

/// Vertex `v1` with a public row `notes/r1`, a secret row `notes/r2` and a
/// public row `tags/t1`.
fn graph_with_rows() -> Result<Graph> {
    init_tracing();
    let g = Graph::open(GraphOptions::new(Arc::new(InMemoryStorage::new())));
    let writer = Authorizations::new(["s"]);
    g.save(
        g.prepare_vertex("v1", Visibility::empty())
            .add_extended_data("notes", "r1", "text", "", "hello", Visibility::empty())
            .add_extended_data("notes", "r1", "author", "", "ann", Visibility::empty())
            .add_extended_data("notes", "r2", "text", "", "classified", vis("s"))
            .add_extended_data("tags", "t1", "tag", "", "red", Visibility::empty()),
        &writer,
    )?;
    Ok(g)
}

fn v1() -> ElementId {
    ElementId::new("v1")
}

#[test]
fn rows_are_filtered_by_column_visibility() -> Result<()> {
    let g = graph_with_rows()?;

    let public = g.read_context(Authorizations::empty());
    let rows = g.extended_data_rows(ElementType::Vertex, &v1(), Some("notes"), &public)?;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].id().row_id, "r1");
    assert_eq!(rows[0].value("text"), Some(&PropertyValue::from("hello")));
    assert_eq!(rows[0].column_names(), vec!["author", "text"]);

    let insider = g.read_context(Authorizations::new(["s"]));
    let rows = g.extended_data_rows(ElementType::Vertex, &v1(), Some("notes"), &insider)?;
    assert_eq!(rows.len(), 2);

    let all = g.extended_data_rows(ElementType::Vertex, &v1(), None, &insider)?;
    assert_eq!(all.len(), 3);
    Ok(())
}

#[test]
fn table_names_require_fetch_hints() -> Result<()> {
    let g = graph_with_rows()?;
    let reader = Authorizations::empty();

    let v = g.vertex_required(&v1(), &g.read_context(reader.clone()))?;
    assert_eq!(
        v.extended_data_table_names()?,
        &BTreeSet::from(["notes".to_owned(), "tags".to_owned()])
    );

    let only_tags = FetchHints::builder()
        .extended_data_tables(TableSelection::Names(BTreeSet::from(["tags".to_owned()])))
        .build();
    let v = g.vertex_required(&v1(), &g.read_context(reader.clone()).with_hints(only_tags))?;
    assert_eq!(
        v.extended_data_table_names()?,
        &BTreeSet::from(["tags".to_owned()])
    );

    let v = g.vertex_required(&v1(), &g.read_context(reader).with_hints(FetchHints::none()))?;
    assert!(matches!(
        v.extended_data_table_names(),
        Err(GraphError::FetchHintsViolation(_))
    ));
    Ok(())
}

#[test]
fn columns_and_rows_can_be_deleted() -> Result<()> {
    let g = graph_with_rows()?;
    let writer = Authorizations::new(["s"]);
    g.save(
        g.mutate_vertex("v1")
            .delete_extended_data("notes", "r1", "author", "", None)
            .delete_extended_data_row("tags", "t1"),
        &writer,
    )?;

    let ctx = g.read_context(Authorizations::empty());
    let notes = g.extended_data_rows(ElementType::Vertex, &v1(), Some("notes"), &ctx)?;
    assert_eq!(notes[0].column_names(), vec!["text"]);
    assert!(g
        .extended_data_rows(ElementType::Vertex, &v1(), Some("tags"), &ctx)?
        .is_empty());

    let v = g.vertex_required(&v1(), &ctx)?;
    assert_eq!(
        v.extended_data_table_names()?,
        &BTreeSet::from(["notes".to_owned()])
    );
    Ok(())
}

#[test]
fn hidden_columns_need_include_hidden() -> Result<()> {
    let g = graph_with_rows()?;
    let reader = Authorizations::new(["h"]);
    g.save(
        g.mutate_vertex("v1").mark_extended_data_hidden(
            "tags",
            "t1",
            "tag",
            "",
            Visibility::empty(),
            vis("h"),
            true,
        ),
        &reader,
    )?;

    let plain = g.read_context(reader.clone());
    assert!(g
        .extended_data_rows(ElementType::Vertex, &v1(), Some("tags"), &plain)?
        .is_empty());

    let with_hidden = g.read_context(reader.clone()).with_hints(FetchHints::all_including_hidden());
    let rows = g.extended_data_rows(ElementType::Vertex, &v1(), Some("tags"), &with_hidden)?;
    assert_eq!(rows.len(), 1);
    assert!(rows[0].values()[0].hidden);

    g.save(
        g.mutate_vertex("v1").mark_extended_data_hidden(
            "tags",
            "t1",
            "tag",
            "",
            Visibility::empty(),
            vis("h"),
            false,
        ),
        &reader,
    )?;
    assert_eq!(
        g.extended_data_rows(ElementType::Vertex, &v1(), Some("tags"), &plain)?
            .len(),
        1
    );
    Ok(())
}

#[test]
fn column_visibility_can_be_altered() -> Result<()> {
    let g = graph_with_rows()?;
    let writer = Authorizations::new(["s"]);
    g.save(
        g.mutate_vertex("v1").alter_extended_data_visibility(
            "tags",
            "t1",
            "tag",
            "",
            Visibility::empty(),
            vis("s"),
        ),
        &writer,
    )?;

    let public = g.read_context(Authorizations::empty());
    assert!(g
        .extended_data_rows(ElementType::Vertex, &v1(), Some("tags"), &public)?
        .is_empty());
    let rows = g.extended_data_rows(ElementType::Vertex, &v1(), Some("tags"), &g.read_context(writer))?;
    assert_eq!(rows[0].values()[0].visibility, vis("s"));
    Ok(())
}

#[test]
fn rows_of_a_deleted_owner_are_unreachable() -> Result<()> {
    let g = graph_with_rows()?;
    let reader = Authorizations::empty();
    let deleted_at = g.save(g.mutate_vertex("v1").soft_delete(), &reader)?;

    let ctx = g.read_context(reader.clone());
    assert!(g
        .extended_data_rows(ElementType::Vertex, &v1(), None, &ctx)?
        .is_empty());

    let before = g
        .read_context(reader)
        .as_of(cellgraph::Timestamp(deleted_at.0 - 1));
    assert_eq!(
        g.extended_data_rows(ElementType::Vertex, &v1(), None, &before)?
            .len(),
        2
    );
    Ok(())
}

#[test]
fn extended_data_on_a_missing_owner_is_rejected() {
    init_tracing();
    let g = Graph::open(GraphOptions::new(Arc::new(InMemoryStorage::new())));
    let err = g
        .save(
            g.mutate_edge("nope")
                .add_extended_data("t", "r", "c", "", 1i64, Visibility::empty()),
            &Authorizations::empty(),
        )
        .unwrap_err();
    assert!(matches!(err, GraphError::NotFound { .. }));
}
