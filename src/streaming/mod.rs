//! Out-of-line storage for large property values.
//!
//! A mutation log never embeds a large payload. It stores a
//! [`StreamingValueRef`] (type, length, checksum and the [`ResolutionKey`]
//! the backend files the bytes under) and the bytes are fetched only when a
//! caller opens the value.

#![forbid(unsafe_code)]

mod markable;

use std::fmt;
use std::io::{self, Cursor, Read, Seek, SeekFrom, Write};

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tempfile::SpooledTempFile;
use tracing::{trace, warn};

use crate::error::{Result, StorageError};
use crate::storage::checksum::{Checksum, Crc32Fast};
use crate::types::{ElementId, ElementType, Timestamp};

pub use markable::MarkableReader;

/// Default in-memory limit before a resolved stream is spooled to disk.
pub const DEFAULT_SPOOL_THRESHOLD: usize = 1024 * 1024;

const COPY_CHUNK: usize = 64 * 1024;

/// Backend lookup key for a streaming value.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct ResolutionKey {
    /// Namespace of the owning element.
    pub element_type: ElementType,
    /// Owning element.
    pub element_id: ElementId,
    /// Property key.
    pub property_key: String,
    /// Property name.
    pub property_name: String,
    /// Property visibility expression.
    pub visibility: String,
    /// Timestamp of the property write that stored the value.
    pub timestamp: Timestamp,
}

impl fmt::Display for ResolutionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}/{}/[{}]@{}",
            self.element_type,
            self.element_id,
            self.property_key,
            self.property_name,
            self.visibility,
            self.timestamp
        )
    }
}

/// Inline placeholder recorded in a mutation instead of the payload.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct StreamingValueRef {
    /// Caller supplied type tag, e.g. `text/plain` or `bytes`.
    pub value_type: String,
    /// Payload length in bytes.
    pub length: u64,
    /// CRC32 of the payload.
    pub checksum: u32,
    /// Where the backend keeps the payload.
    pub key: ResolutionKey,
}

/// Payload handed to a mutation builder for out-of-line storage.
#[derive(Clone, Debug)]
pub struct StreamingPropertyValue {
    value_type: String,
    data: Bytes,
}

impl StreamingPropertyValue {
    /// Wraps an in-memory payload.
    pub fn new(value_type: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            value_type: value_type.into(),
            data: data.into(),
        }
    }

    /// Drains `reader` into a payload.
    pub fn from_reader(value_type: impl Into<String>, mut reader: impl Read) -> Result<Self> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        Ok(Self::new(value_type, data))
    }

    /// Type tag.
    pub fn value_type(&self) -> &str {
        &self.value_type
    }

    /// Payload bytes.
    pub fn data(&self) -> &Bytes {
        &self.data
    }

    /// Builds the reference recorded in the log for this payload under `key`.
    pub fn to_ref(&self, key: ResolutionKey) -> StreamingValueRef {
        let mut crc = Crc32Fast::default();
        crc.update(&self.data);
        StreamingValueRef {
            value_type: self.value_type.clone(),
            length: self.data.len() as u64,
            checksum: crc.finalize(),
            key,
        }
    }
}

enum Source {
    Memory(Cursor<Bytes>),
    Spooled(SpooledTempFile),
}

impl Read for Source {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Source::Memory(cursor) => cursor.read(buf),
            Source::Spooled(file) => file.read(buf),
        }
    }
}

/// A resolved streaming value.
///
/// Payloads up to the spool threshold are buffered in memory; longer ones are
/// copied into a [`SpooledTempFile`] that is removed when the value is dropped.
/// The backend stream is consumed exactly once during resolution, and the
/// length and checksum are verified before the value is handed out.
pub struct StreamingValue {
    reader: MarkableReader<Source>,
    value_type: String,
    length: u64,
    spooled: bool,
}

impl StreamingValue {
    /// Consumes `backend` into a local buffer or spool file.
    pub fn materialize(
        mut backend: impl Read,
        reference: &StreamingValueRef,
        spool_threshold: usize,
    ) -> Result<Self> {
        let mut crc = Crc32Fast::default();
        let (source, copied, spooled) = if reference.length as usize <= spool_threshold {
            let mut buf = Vec::with_capacity(reference.length as usize);
            backend.read_to_end(&mut buf)?;
            crc.update(&buf);
            let copied = buf.len() as u64;
            (Source::Memory(Cursor::new(Bytes::from(buf))), copied, false)
        } else {
            let mut file = SpooledTempFile::new(spool_threshold);
            let mut chunk = vec![0u8; COPY_CHUNK];
            let mut copied = 0u64;
            loop {
                let n = backend.read(&mut chunk)?;
                if n == 0 {
                    break;
                }
                crc.update(&chunk[..n]);
                file.write_all(&chunk[..n])?;
                copied += n as u64;
            }
            file.seek(SeekFrom::Start(0))?;
            let rolled = file.is_rolled();
            (Source::Spooled(file), copied, rolled)
        };
        if copied != reference.length {
            warn!(
                key = %reference.key,
                expected = reference.length,
                actual = copied,
                "streaming.length_mismatch"
            );
            return Err(StorageError::Corruption("streaming value length mismatch").into());
        }
        let actual = crc.finalize();
        if actual != reference.checksum {
            warn!(key = %reference.key, "streaming.checksum_mismatch");
            return Err(StorageError::ChecksumMismatch {
                expected: reference.checksum,
                actual,
            }
            .into());
        }
        trace!(key = %reference.key, len = copied, spooled, "streaming.materialized");
        Ok(Self {
            reader: MarkableReader::new(source),
            value_type: reference.value_type.clone(),
            length: copied,
            spooled,
        })
    }

    /// Type tag recorded with the value.
    pub fn value_type(&self) -> &str {
        &self.value_type
    }

    /// Payload length in bytes.
    pub fn len(&self) -> u64 {
        self.length
    }

    /// Returns `true` for a zero-length payload.
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Returns `true` when the payload was spooled to a temporary file.
    pub fn is_spooled(&self) -> bool {
        self.spooled
    }

    /// See [`MarkableReader::mark`].
    pub fn mark(&mut self, read_limit: usize) {
        self.reader.mark(read_limit);
    }

    /// See [`MarkableReader::reset`].
    pub fn reset(&mut self) -> Result<()> {
        self.reader.reset()?;
        Ok(())
    }

    /// Reads the remainder of the value into a vector.
    pub fn read_to_vec(&mut self) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(self.length as usize);
        self.reader.read_to_end(&mut out)?;
        Ok(out)
    }
}

impl Read for StreamingValue {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.reader.read(buf)
    }
}

impl fmt::Debug for StreamingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamingValue")
            .field("value_type", &self.value_type)
            .field("length", &self.length)
            .field("spooled", &self.spooled)
            .finish()
    }
}
