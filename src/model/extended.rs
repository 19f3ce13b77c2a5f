#![forbid(unsafe_code)]

use std::fmt;

use crate::security::Visibility;
use crate::types::{ElementId, ElementType, Timestamp};
use crate::value::PropertyValue;

use super::log::ExtendedDataLog;

/// Identity of an extended-data row.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct ExtendedDataRowId {
    /// Namespace of the owning element.
    pub element_type: ElementType,
    /// Owning element.
    pub element_id: ElementId,
    /// Table the row belongs to.
    pub table_name: String,
    /// Row id, unique within the table.
    pub row_id: String,
}

impl ExtendedDataRowId {
    /// Builds a row id.
    pub fn new(
        element_type: ElementType,
        element_id: ElementId,
        table_name: impl Into<String>,
        row_id: impl Into<String>,
    ) -> Self {
        Self {
            element_type,
            element_id,
            table_name: table_name.into(),
            row_id: row_id.into(),
        }
    }
}

impl fmt::Display for ExtendedDataRowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}/{}",
            self.element_type, self.element_id, self.table_name, self.row_id
        )
    }
}

/// A stored row: its identity and its own mutation log.
#[derive(Clone, Debug, PartialEq)]
pub struct ExtendedDataRow {
    /// Row identity.
    pub id: ExtendedDataRowId,
    /// Row mutations.
    pub log: ExtendedDataLog,
}

/// One readable column value of a materialized row.
#[derive(Clone, Debug, PartialEq)]
pub struct ExtendedDataValue {
    /// Column name.
    pub column: String,
    /// Column key.
    pub key: String,
    /// Value.
    pub value: PropertyValue,
    /// Column visibility.
    pub visibility: Visibility,
    /// Timestamp of the write.
    pub timestamp: Timestamp,
    /// Whether the column is hidden from the caller.
    pub hidden: bool,
}

/// A row materialized for one caller.
#[derive(Clone, Debug)]
pub struct ExtendedDataRowView {
    pub(crate) id: ExtendedDataRowId,
    pub(crate) timestamp: Timestamp,
    pub(crate) values: Vec<ExtendedDataValue>,
}

impl ExtendedDataRowView {
    /// Row identity.
    pub fn id(&self) -> &ExtendedDataRowId {
        &self.id
    }

    /// Newest contributing timestamp.
    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    /// Every readable column value.
    pub fn values(&self) -> &[ExtendedDataValue] {
        &self.values
    }

    /// First value of `column`.
    pub fn value(&self, column: &str) -> Option<&PropertyValue> {
        self.values
            .iter()
            .find(|v| v.column == column)
            .map(|v| &v.value)
    }

    /// Every value of `column`, across keys and visibilities.
    pub fn column_values(&self, column: &str) -> Vec<&PropertyValue> {
        self.values
            .iter()
            .filter(|v| v.column == column)
            .map(|v| &v.value)
            .collect()
    }

    /// Distinct column names present in the view.
    pub fn column_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.values.iter().map(|v| v.column.as_str()).collect();
        names.dedup();
        names
    }
}
