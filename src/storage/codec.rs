#![forbid(unsafe_code)]

//! Binary encoding of mutation batches.
//!
//! A batch is stored as one frame:
//!
//! ```text
//! kind:u8 | payload_len:varint | payload | crc32(kind ++ payload):u32le
//! ```
//!
//! The payload is a varint entry count followed by `timestamp:varint tag:u8
//! fields...` per entry. Integers use LEB128 varints (signed values are
//! zigzag encoded), strings and byte arrays are length prefixed and
//! visibilities are stored as their expression text.

use bytes::Bytes;

use crate::error::{GraphError, Result, StorageError};
use crate::model::{ExtendedDataMutation, LogEntry, Metadata, Mutation};
use crate::security::Visibility;
use crate::streaming::{ResolutionKey, StreamingValueRef};
use crate::types::{Direction, ElementId, ElementType, Timestamp};
use crate::value::PropertyValue;

use super::checksum::frame_crc32;

/// Frame kind of an element mutation batch.
pub const FRAME_MUTATIONS: u8 = 1;
/// Frame kind of an extended-data batch.
pub const FRAME_EXTENDED: u8 = 2;

const TYPE_NULL: u8 = 0;
const TYPE_BOOL: u8 = 1;
const TYPE_INT: u8 = 2;
const TYPE_FLOAT: u8 = 3;
const TYPE_STR: u8 = 4;
const TYPE_BYTES: u8 = 5;
const TYPE_DATETIME: u8 = 6;
const TYPE_DATE: u8 = 7;
const TYPE_STREAMING: u8 = 8;

const M_CREATE: u8 = 0;
const M_ADD_PROPERTY: u8 = 1;
const M_SOFT_DELETE_PROPERTY: u8 = 2;
const M_ALTER_PROPERTY_VISIBILITY: u8 = 3;
const M_SET_PROPERTY_METADATA: u8 = 4;
const M_MARK_PROPERTY_HIDDEN: u8 = 5;
const M_MARK_PROPERTY_VISIBLE: u8 = 6;
const M_SOFT_DELETE_ELEMENT: u8 = 7;
const M_MARK_ELEMENT_HIDDEN: u8 = 8;
const M_MARK_ELEMENT_VISIBLE: u8 = 9;
const M_ALTER_ELEMENT_VISIBILITY: u8 = 10;
const M_EDGE_SETUP: u8 = 11;
const M_ALTER_EDGE_LABEL: u8 = 12;
const M_ADD_EDGE_REF: u8 = 13;

const X_ADD_COLUMN: u8 = 0;
const X_DELETE_COLUMN: u8 = 1;
const X_ALTER_COLUMN_VISIBILITY: u8 = 2;
const X_MARK_COLUMN_HIDDEN: u8 = 3;
const X_MARK_COLUMN_VISIBLE: u8 = 4;
const X_SOFT_DELETE_ROW: u8 = 5;

/// Encodes an element mutation batch as one frame.
pub fn encode_mutations(batch: &[LogEntry<Mutation>]) -> Bytes {
    let mut payload = Vec::with_capacity(batch.len() * 32);
    write_var_u64(batch.len() as u64, &mut payload);
    for entry in batch {
        write_var_u64(entry.timestamp.0, &mut payload);
        encode_mutation(&entry.mutation, &mut payload);
    }
    seal(FRAME_MUTATIONS, payload)
}

/// Decodes a frame produced by [`encode_mutations`].
pub fn decode_mutations(frame: &[u8]) -> Result<Vec<LogEntry<Mutation>>> {
    let payload = open(FRAME_MUTATIONS, frame)?;
    let mut reader = Reader::new(payload);
    let count = reader.len()?;
    let mut out = Vec::with_capacity(count.min(1024));
    for _ in 0..count {
        let timestamp = Timestamp(reader.var_u64()?);
        let mutation = decode_mutation(&mut reader)?;
        out.push(LogEntry::new(timestamp, mutation));
    }
    reader.finish()?;
    Ok(out)
}

/// Encodes an extended-data batch as one frame.
pub fn encode_extended(batch: &[LogEntry<ExtendedDataMutation>]) -> Bytes {
    let mut payload = Vec::with_capacity(batch.len() * 32);
    write_var_u64(batch.len() as u64, &mut payload);
    for entry in batch {
        write_var_u64(entry.timestamp.0, &mut payload);
        encode_extended_mutation(&entry.mutation, &mut payload);
    }
    seal(FRAME_EXTENDED, payload)
}

/// Decodes a frame produced by [`encode_extended`].
pub fn decode_extended(frame: &[u8]) -> Result<Vec<LogEntry<ExtendedDataMutation>>> {
    let payload = open(FRAME_EXTENDED, frame)?;
    let mut reader = Reader::new(payload);
    let count = reader.len()?;
    let mut out = Vec::with_capacity(count.min(1024));
    for _ in 0..count {
        let timestamp = Timestamp(reader.var_u64()?);
        let mutation = decode_extended_mutation(&mut reader)?;
        out.push(LogEntry::new(timestamp, mutation));
    }
    reader.finish()?;
    Ok(out)
}

fn seal(kind: u8, payload: Vec<u8>) -> Bytes {
    let mut frame = Vec::with_capacity(payload.len() + 10);
    frame.push(kind);
    write_var_u64(payload.len() as u64, &mut frame);
    frame.extend_from_slice(&payload);
    frame.extend_from_slice(&frame_crc32(kind, &payload).to_le_bytes());
    Bytes::from(frame)
}

fn open(expected_kind: u8, frame: &[u8]) -> Result<&[u8]> {
    let Some((&kind, rest)) = frame.split_first() else {
        return Err(corruption("empty frame"));
    };
    if kind != expected_kind {
        return Err(corruption("unexpected frame kind"));
    }
    let mut cursor = 0usize;
    let len = usize::try_from(read_var_u64(rest, &mut cursor)?)
        .map_err(|_| corruption("length overflow"))?;
    let end = cursor
        .checked_add(len)
        .filter(|end| end.checked_add(4) == Some(rest.len()))
        .ok_or_else(|| corruption("frame length mismatch"))?;
    let payload = &rest[cursor..end];
    let mut crc = [0u8; 4];
    crc.copy_from_slice(&rest[end..]);
    let expected = u32::from_le_bytes(crc);
    let actual = frame_crc32(kind, payload);
    if expected != actual {
        return Err(StorageError::ChecksumMismatch { expected, actual }.into());
    }
    Ok(payload)
}

fn corruption(reason: &'static str) -> GraphError {
    StorageError::Corruption(reason).into()
}

fn encode_mutation(mutation: &Mutation, out: &mut Vec<u8>) {
    match mutation {
        Mutation::CreateElement { visibility } => {
            out.push(M_CREATE);
            write_visibility(visibility, out);
        }
        Mutation::AddProperty {
            key,
            name,
            value,
            metadata,
            visibility,
        } => {
            out.push(M_ADD_PROPERTY);
            write_str(key, out);
            write_str(name, out);
            write_value(value, out);
            write_metadata(metadata, out);
            write_visibility(visibility, out);
        }
        Mutation::SoftDeleteProperty {
            key,
            name,
            visibility,
        } => {
            out.push(M_SOFT_DELETE_PROPERTY);
            write_str(key, out);
            write_str(name, out);
            write_opt_visibility(visibility.as_ref(), out);
        }
        Mutation::AlterPropertyVisibility {
            key,
            name,
            old_visibility,
            new_visibility,
        } => {
            out.push(M_ALTER_PROPERTY_VISIBILITY);
            write_str(key, out);
            write_str(name, out);
            write_visibility(old_visibility, out);
            write_visibility(new_visibility, out);
        }
        Mutation::SetPropertyMetadata {
            key,
            name,
            property_visibility,
            metadata_key,
            metadata_value,
            metadata_visibility,
        } => {
            out.push(M_SET_PROPERTY_METADATA);
            write_str(key, out);
            write_str(name, out);
            write_visibility(property_visibility, out);
            write_str(metadata_key, out);
            write_value(metadata_value, out);
            write_visibility(metadata_visibility, out);
        }
        Mutation::MarkPropertyHidden {
            key,
            name,
            property_visibility,
            hide_visibility,
        }
        | Mutation::MarkPropertyVisible {
            key,
            name,
            property_visibility,
            hide_visibility,
        } => {
            let tag = if matches!(mutation, Mutation::MarkPropertyHidden { .. }) {
                M_MARK_PROPERTY_HIDDEN
            } else {
                M_MARK_PROPERTY_VISIBLE
            };
            out.push(tag);
            write_str(key, out);
            write_str(name, out);
            write_visibility(property_visibility, out);
            write_visibility(hide_visibility, out);
        }
        Mutation::SoftDeleteElement => out.push(M_SOFT_DELETE_ELEMENT),
        Mutation::MarkElementHidden { hide_visibility } => {
            out.push(M_MARK_ELEMENT_HIDDEN);
            write_visibility(hide_visibility, out);
        }
        Mutation::MarkElementVisible { hide_visibility } => {
            out.push(M_MARK_ELEMENT_VISIBLE);
            write_visibility(hide_visibility, out);
        }
        Mutation::AlterElementVisibility { new_visibility } => {
            out.push(M_ALTER_ELEMENT_VISIBILITY);
            write_visibility(new_visibility, out);
        }
        Mutation::EdgeSetup {
            out_vertex_id,
            in_vertex_id,
            label,
        } => {
            out.push(M_EDGE_SETUP);
            write_str(out_vertex_id.as_str(), out);
            write_str(in_vertex_id.as_str(), out);
            write_str(label, out);
        }
        Mutation::AlterEdgeLabel { new_label } => {
            out.push(M_ALTER_EDGE_LABEL);
            write_str(new_label, out);
        }
        Mutation::AddEdgeRef {
            edge_id,
            direction,
            other_vertex_id,
            label,
        } => {
            out.push(M_ADD_EDGE_REF);
            write_str(edge_id.as_str(), out);
            out.push(direction.tag());
            write_str(other_vertex_id.as_str(), out);
            write_str(label, out);
        }
    }
}

fn decode_mutation(reader: &mut Reader<'_>) -> Result<Mutation> {
    let mutation = match reader.u8()? {
        M_CREATE => Mutation::CreateElement {
            visibility: reader.visibility()?,
        },
        M_ADD_PROPERTY => Mutation::AddProperty {
            key: reader.string()?,
            name: reader.string()?,
            value: reader.value()?,
            metadata: reader.metadata()?,
            visibility: reader.visibility()?,
        },
        M_SOFT_DELETE_PROPERTY => Mutation::SoftDeleteProperty {
            key: reader.string()?,
            name: reader.string()?,
            visibility: reader.opt_visibility()?,
        },
        M_ALTER_PROPERTY_VISIBILITY => Mutation::AlterPropertyVisibility {
            key: reader.string()?,
            name: reader.string()?,
            old_visibility: reader.visibility()?,
            new_visibility: reader.visibility()?,
        },
        M_SET_PROPERTY_METADATA => Mutation::SetPropertyMetadata {
            key: reader.string()?,
            name: reader.string()?,
            property_visibility: reader.visibility()?,
            metadata_key: reader.string()?,
            metadata_value: reader.value()?,
            metadata_visibility: reader.visibility()?,
        },
        M_MARK_PROPERTY_HIDDEN => Mutation::MarkPropertyHidden {
            key: reader.string()?,
            name: reader.string()?,
            property_visibility: reader.visibility()?,
            hide_visibility: reader.visibility()?,
        },
        M_MARK_PROPERTY_VISIBLE => Mutation::MarkPropertyVisible {
            key: reader.string()?,
            name: reader.string()?,
            property_visibility: reader.visibility()?,
            hide_visibility: reader.visibility()?,
        },
        M_SOFT_DELETE_ELEMENT => Mutation::SoftDeleteElement,
        M_MARK_ELEMENT_HIDDEN => Mutation::MarkElementHidden {
            hide_visibility: reader.visibility()?,
        },
        M_MARK_ELEMENT_VISIBLE => Mutation::MarkElementVisible {
            hide_visibility: reader.visibility()?,
        },
        M_ALTER_ELEMENT_VISIBILITY => Mutation::AlterElementVisibility {
            new_visibility: reader.visibility()?,
        },
        M_EDGE_SETUP => Mutation::EdgeSetup {
            out_vertex_id: reader.element_id()?,
            in_vertex_id: reader.element_id()?,
            label: reader.string()?,
        },
        M_ALTER_EDGE_LABEL => Mutation::AlterEdgeLabel {
            new_label: reader.string()?,
        },
        M_ADD_EDGE_REF => Mutation::AddEdgeRef {
            edge_id: reader.element_id()?,
            direction: Direction::from_tag(reader.u8()?)
                .ok_or_else(|| corruption("unknown direction tag"))?,
            other_vertex_id: reader.element_id()?,
            label: reader.string()?,
        },
        _ => return Err(corruption("unknown mutation tag")),
    };
    Ok(mutation)
}

fn encode_extended_mutation(mutation: &ExtendedDataMutation, out: &mut Vec<u8>) {
    match mutation {
        ExtendedDataMutation::AddColumn {
            column,
            key,
            value,
            visibility,
        } => {
            out.push(X_ADD_COLUMN);
            write_str(column, out);
            write_str(key, out);
            write_value(value, out);
            write_visibility(visibility, out);
        }
        ExtendedDataMutation::DeleteColumn {
            column,
            key,
            visibility,
        } => {
            out.push(X_DELETE_COLUMN);
            write_str(column, out);
            write_str(key, out);
            write_opt_visibility(visibility.as_ref(), out);
        }
        ExtendedDataMutation::AlterColumnVisibility {
            column,
            key,
            old_visibility,
            new_visibility,
        } => {
            out.push(X_ALTER_COLUMN_VISIBILITY);
            write_str(column, out);
            write_str(key, out);
            write_visibility(old_visibility, out);
            write_visibility(new_visibility, out);
        }
        ExtendedDataMutation::MarkColumnHidden {
            column,
            key,
            column_visibility,
            hide_visibility,
        } => {
            out.push(X_MARK_COLUMN_HIDDEN);
            write_str(column, out);
            write_str(key, out);
            write_visibility(column_visibility, out);
            write_visibility(hide_visibility, out);
        }
        ExtendedDataMutation::MarkColumnVisible {
            column,
            key,
            column_visibility,
            hide_visibility,
        } => {
            out.push(X_MARK_COLUMN_VISIBLE);
            write_str(column, out);
            write_str(key, out);
            write_visibility(column_visibility, out);
            write_visibility(hide_visibility, out);
        }
        ExtendedDataMutation::SoftDeleteRow => out.push(X_SOFT_DELETE_ROW),
    }
}

fn decode_extended_mutation(reader: &mut Reader<'_>) -> Result<ExtendedDataMutation> {
    let mutation = match reader.u8()? {
        X_ADD_COLUMN => ExtendedDataMutation::AddColumn {
            column: reader.string()?,
            key: reader.string()?,
            value: reader.value()?,
            visibility: reader.visibility()?,
        },
        X_DELETE_COLUMN => ExtendedDataMutation::DeleteColumn {
            column: reader.string()?,
            key: reader.string()?,
            visibility: reader.opt_visibility()?,
        },
        X_ALTER_COLUMN_VISIBILITY => ExtendedDataMutation::AlterColumnVisibility {
            column: reader.string()?,
            key: reader.string()?,
            old_visibility: reader.visibility()?,
            new_visibility: reader.visibility()?,
        },
        X_MARK_COLUMN_HIDDEN => ExtendedDataMutation::MarkColumnHidden {
            column: reader.string()?,
            key: reader.string()?,
            column_visibility: reader.visibility()?,
            hide_visibility: reader.visibility()?,
        },
        X_MARK_COLUMN_VISIBLE => ExtendedDataMutation::MarkColumnVisible {
            column: reader.string()?,
            key: reader.string()?,
            column_visibility: reader.visibility()?,
            hide_visibility: reader.visibility()?,
        },
        X_SOFT_DELETE_ROW => ExtendedDataMutation::SoftDeleteRow,
        _ => return Err(corruption("unknown extended data tag")),
    };
    Ok(mutation)
}

fn write_value(value: &PropertyValue, out: &mut Vec<u8>) {
    match value {
        PropertyValue::Null => out.push(TYPE_NULL),
        PropertyValue::Bool(v) => {
            out.push(TYPE_BOOL);
            out.push(u8::from(*v));
        }
        PropertyValue::Int(v) => {
            out.push(TYPE_INT);
            write_var_i64(*v, out);
        }
        PropertyValue::Float(v) => {
            out.push(TYPE_FLOAT);
            out.extend_from_slice(&v.to_bits().to_le_bytes());
        }
        PropertyValue::Str(v) => {
            out.push(TYPE_STR);
            write_str(v, out);
        }
        PropertyValue::Bytes(v) => {
            out.push(TYPE_BYTES);
            write_bytes(v, out);
        }
        PropertyValue::DateTime(v) => {
            out.push(TYPE_DATETIME);
            write_var_i64(*v, out);
        }
        PropertyValue::Date(v) => {
            out.push(TYPE_DATE);
            write_var_i64(*v, out);
        }
        PropertyValue::Streaming(r) => {
            out.push(TYPE_STREAMING);
            write_str(&r.value_type, out);
            write_var_u64(r.length, out);
            out.extend_from_slice(&r.checksum.to_le_bytes());
            out.push(r.key.element_type.tag());
            write_str(r.key.element_id.as_str(), out);
            write_str(&r.key.property_key, out);
            write_str(&r.key.property_name, out);
            write_str(&r.key.visibility, out);
            write_var_u64(r.key.timestamp.0, out);
        }
    }
}

fn write_metadata(metadata: &Metadata, out: &mut Vec<u8>) {
    write_var_u64(metadata.len() as u64, out);
    for entry in metadata.entries() {
        write_str(entry.key(), out);
        write_value(entry.value(), out);
        write_visibility(entry.visibility(), out);
    }
}

fn write_visibility(visibility: &Visibility, out: &mut Vec<u8>) {
    write_str(visibility.as_str(), out);
}

fn write_opt_visibility(visibility: Option<&Visibility>, out: &mut Vec<u8>) {
    match visibility {
        None => out.push(0),
        Some(v) => {
            out.push(1);
            write_visibility(v, out);
        }
    }
}

fn write_str(s: &str, out: &mut Vec<u8>) {
    write_bytes(s.as_bytes(), out);
}

fn write_bytes(bytes: &[u8], out: &mut Vec<u8>) {
    write_var_u64(bytes.len() as u64, out);
    out.extend_from_slice(bytes);
}

fn write_var_u64(mut v: u64, out: &mut Vec<u8>) {
    loop {
        let byte = (v & 0x7f) as u8;
        v >>= 7;
        if v == 0 {
            out.push(byte);
            break;
        }
        out.push(byte | 0x80);
    }
}

fn write_var_i64(v: i64, out: &mut Vec<u8>) {
    write_var_u64(((v << 1) ^ (v >> 63)) as u64, out);
}

fn read_var_u64(buf: &[u8], cursor: &mut usize) -> Result<u64> {
    let mut result = 0u64;
    let mut shift = 0u32;
    for _ in 0..10 {
        let Some(&byte) = buf.get(*cursor) else {
            return Err(corruption("varint truncated"));
        };
        *cursor += 1;
        result |= ((byte & 0x7f) as u64) << shift;
        if byte & 0x80 == 0 {
            return Ok(result);
        }
        shift += 7;
    }
    Err(corruption("varint too long"))
}

struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn finish(&self) -> Result<()> {
        if self.pos == self.buf.len() {
            Ok(())
        } else {
            Err(corruption("trailing bytes in frame"))
        }
    }

    fn u8(&mut self) -> Result<u8> {
        let byte = *self
            .buf
            .get(self.pos)
            .ok_or_else(|| corruption("frame truncated"))?;
        self.pos += 1;
        Ok(byte)
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|end| *end <= self.buf.len())
            .ok_or_else(|| corruption("frame truncated"))?;
        let slice = &self.buf[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn var_u64(&mut self) -> Result<u64> {
        read_var_u64(self.buf, &mut self.pos)
    }

    fn var_i64(&mut self) -> Result<i64> {
        let raw = self.var_u64()?;
        Ok(((raw >> 1) as i64) ^ (-((raw & 1) as i64)))
    }

    fn len(&mut self) -> Result<usize> {
        usize::try_from(self.var_u64()?).map_err(|_| corruption("length overflow"))
    }

    fn u32_le(&mut self) -> Result<u32> {
        let mut raw = [0u8; 4];
        raw.copy_from_slice(self.take(4)?);
        Ok(u32::from_le_bytes(raw))
    }

    fn bytes(&mut self) -> Result<Vec<u8>> {
        let len = self.len()?;
        Ok(self.take(len)?.to_vec())
    }

    fn string(&mut self) -> Result<String> {
        String::from_utf8(self.bytes()?).map_err(|_| corruption("string is not utf8"))
    }

    fn element_id(&mut self) -> Result<ElementId> {
        Ok(ElementId::new(self.string()?))
    }

    fn visibility(&mut self) -> Result<Visibility> {
        Visibility::parse(self.string()?).map_err(|_| corruption("stored visibility is malformed"))
    }

    fn opt_visibility(&mut self) -> Result<Option<Visibility>> {
        match self.u8()? {
            0 => Ok(None),
            1 => Ok(Some(self.visibility()?)),
            _ => Err(corruption("invalid option tag")),
        }
    }

    fn metadata(&mut self) -> Result<Metadata> {
        let count = self.len()?;
        let mut metadata = Metadata::new();
        for _ in 0..count {
            let key = self.string()?;
            let value = self.value()?;
            let visibility = self.visibility()?;
            metadata.set(key, value, visibility);
        }
        Ok(metadata)
    }

    fn value(&mut self) -> Result<PropertyValue> {
        let value = match self.u8()? {
            TYPE_NULL => PropertyValue::Null,
            TYPE_BOOL => match self.u8()? {
                0 => PropertyValue::Bool(false),
                1 => PropertyValue::Bool(true),
                _ => return Err(corruption("invalid bool")),
            },
            TYPE_INT => PropertyValue::Int(self.var_i64()?),
            TYPE_FLOAT => {
                let mut raw = [0u8; 8];
                raw.copy_from_slice(self.take(8)?);
                PropertyValue::Float(f64::from_bits(u64::from_le_bytes(raw)))
            }
            TYPE_STR => PropertyValue::Str(self.string()?),
            TYPE_BYTES => PropertyValue::Bytes(self.bytes()?),
            TYPE_DATETIME => PropertyValue::DateTime(self.var_i64()?),
            TYPE_DATE => PropertyValue::Date(self.var_i64()?),
            TYPE_STREAMING => {
                let value_type = self.string()?;
                let length = self.var_u64()?;
                let checksum = self.u32_le()?;
                let element_type = ElementType::from_tag(self.u8()?)
                    .ok_or_else(|| corruption("unknown element type tag"))?;
                let key = ResolutionKey {
                    element_type,
                    element_id: self.element_id()?,
                    property_key: self.string()?,
                    property_name: self.string()?,
                    visibility: self.string()?,
                    timestamp: Timestamp(self.var_u64()?),
                };
                PropertyValue::Streaming(StreamingValueRef {
                    value_type,
                    length,
                    checksum,
                    key,
                })
            }
            _ => return Err(corruption("unknown value type")),
        };
        Ok(value)
    }
}
