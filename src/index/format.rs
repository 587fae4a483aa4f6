// SPDX-License-Identifier: MIT OR Apache-2.0

//! On-disk format for [`FlatIndex`].
//!
//! Layout (little-endian):
//!
//! ```text
//! magic "VGIX" | version u32 | dimension u32 | count u64 | corpus_epoch u64
//! model_len u32 | model_id bytes
//! count x ( identity i64 | dimension x f32 )
//! blake3 checksum of everything above (32 bytes)
//! ```
//!
//! Saves go to a temporary sibling file that is renamed over the target, so a
//! failed save leaves the previous index intact.

use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::flat::{FlatIndex, IndexMeta};
use crate::corpus::VerseId;
use crate::errors::IndexError;

const MAGIC: &[u8; 4] = b"VGIX";
const FORMAT_VERSION: u32 = 1;
const CHECKSUM_LEN: usize = 32;
/// magic + version + dimension + count + epoch + model_len
const FIXED_HEADER_LEN: usize = 4 + 4 + 4 + 8 + 8 + 4;

struct ChecksumWriter<W: Write> {
    inner: W,
    hasher: blake3::Hasher,
}

impl<W: Write> ChecksumWriter<W> {
    fn put(&mut self, bytes: &[u8]) -> std::io::Result<()> {
        self.hasher.update(bytes);
        self.inner.write_all(bytes)
    }

    fn finish(mut self) -> std::io::Result<W> {
        let digest = self.hasher.finalize();
        self.inner.write_all(digest.as_bytes())?;
        Ok(self.inner)
    }
}

struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn take(&mut self, n: usize, what: &str) -> Result<&'a [u8], IndexError> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|&end| end <= self.buf.len())
            .ok_or_else(|| IndexError::Corrupt(format!("truncated while reading {}", what)))?;
        let slice = &self.buf[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn u32(&mut self, what: &str) -> Result<u32, IndexError> {
        let mut raw = [0u8; 4];
        raw.copy_from_slice(self.take(4, what)?);
        Ok(u32::from_le_bytes(raw))
    }

    fn u64(&mut self, what: &str) -> Result<u64, IndexError> {
        let mut raw = [0u8; 8];
        raw.copy_from_slice(self.take(8, what)?);
        Ok(u64::from_le_bytes(raw))
    }

    fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }
}

impl FlatIndex {
    /// Persists every `(identity, vector)` pair plus the index metadata.
    pub fn save(&self, path: &Path) -> Result<(), IndexError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let tmp = temp_sibling(path);
        let written = self.write_to(&tmp);
        if let Err(err) = written {
            let _ = fs::remove_file(&tmp);
            return Err(err);
        }
        fs::rename(&tmp, path)?;

        info!(
            "Saved vector index ({} entries, dim {}) to {}",
            self.len(),
            self.dimension,
            path.display()
        );
        Ok(())
    }

    fn write_to(&self, path: &Path) -> Result<(), IndexError> {
        let dimension = u32::try_from(self.dimension)
            .map_err(|_| IndexError::Corrupt(format!("dimension {} too large", self.dimension)))?;
        let model = self.meta.model_id.as_bytes();
        let model_len = u32::try_from(model.len())
            .map_err(|_| IndexError::Corrupt("model id too long".into()))?;

        let file = File::create(path)?;
        let mut out = ChecksumWriter {
            inner: BufWriter::new(file),
            hasher: blake3::Hasher::new(),
        };

        out.put(MAGIC)?;
        out.put(&FORMAT_VERSION.to_le_bytes())?;
        out.put(&dimension.to_le_bytes())?;
        out.put(&(self.len() as u64).to_le_bytes())?;
        out.put(&self.meta.corpus_epoch.to_le_bytes())?;
        out.put(&model_len.to_le_bytes())?;
        out.put(model)?;

        for (id, vector) in self.entries() {
            out.put(&id.0.to_le_bytes())?;
            for value in vector {
                out.put(&value.to_le_bytes())?;
            }
        }

        let writer = out.finish()?;
        let file = writer.into_inner().map_err(|e| e.into_error())?;
        file.sync_all()?;
        Ok(())
    }

    /// Restores an index written by [`FlatIndex::save`].
    pub fn load(path: &Path) -> Result<Self, IndexError> {
        if !path.exists() {
            return Err(IndexError::NotFound(path.to_path_buf()));
        }
        if !path.is_file() {
            return Err(IndexError::Corrupt(format!(
                "{} is not a regular file",
                path.display()
            )));
        }

        let bytes = fs::read(path)
            .map_err(|e| IndexError::Corrupt(format!("cannot read {}: {}", path.display(), e)))?;
        if bytes.len() < FIXED_HEADER_LEN + CHECKSUM_LEN {
            return Err(IndexError::Corrupt(format!(
                "file is only {} bytes",
                bytes.len()
            )));
        }

        let index = Self::decode(&bytes)?;

        debug!(
            "Loaded vector index ({} entries, dim {}) from {}",
            index.len(),
            index.dimension,
            path.display()
        );
        Ok(index)
    }

    fn decode(bytes: &[u8]) -> Result<Self, IndexError> {
        let (body, stored) = bytes.split_at(bytes.len() - CHECKSUM_LEN);
        if blake3::hash(body).as_bytes() != stored {
            return Err(IndexError::Corrupt("checksum mismatch".into()));
        }

        let mut cur = Cursor { buf: body, pos: 0 };
        if cur.take(4, "magic")? != MAGIC {
            return Err(IndexError::Corrupt("not a versegrep index file".into()));
        }
        let version = cur.u32("version")?;
        if version != FORMAT_VERSION {
            return Err(IndexError::Corrupt(format!(
                "unsupported format version {}",
                version
            )));
        }

        let dimension = cur.u32("dimension")? as usize;
        let count = usize::try_from(cur.u64("entry count")?)
            .map_err(|_| IndexError::Corrupt("entry count overflows".into()))?;
        let corpus_epoch = cur.u64("corpus epoch")?;
        let model_len = cur.u32("model id length")? as usize;
        let model_id = std::str::from_utf8(cur.take(model_len, "model id")?)
            .map_err(|_| IndexError::Corrupt("model id is not UTF-8".into()))?
            .to_string();

        if count > 0 && dimension == 0 {
            return Err(IndexError::Corrupt(
                "recorded dimension is zero for a non-empty index".into(),
            ));
        }
        let record_len = dimension
            .checked_mul(4)
            .and_then(|v| v.checked_add(8))
            .ok_or_else(|| IndexError::Corrupt("recorded dimension overflows".into()))?;
        let expected = count
            .checked_mul(record_len)
            .ok_or_else(|| IndexError::Corrupt("entry count overflows".into()))?;
        if cur.remaining() != expected {
            return Err(IndexError::Corrupt(format!(
                "recorded dimension {} and count {} need {} bytes of entries, found {}",
                dimension,
                count,
                expected,
                cur.remaining()
            )));
        }

        let mut seen = HashSet::with_capacity(count);
        let mut ids = Vec::with_capacity(count);
        let mut vectors = Vec::with_capacity(count * dimension);
        for _ in 0..count {
            let id = VerseId(cur.u64("identity")? as i64);
            if !seen.insert(id) {
                return Err(IndexError::Corrupt(format!("duplicate identity {}", id)));
            }
            ids.push(id);
            for raw in cur.take(dimension * 4, "vector")?.chunks_exact(4) {
                vectors.push(f32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]));
            }
        }

        Ok(FlatIndex {
            dimension,
            ids,
            vectors,
            meta: IndexMeta {
                model_id,
                corpus_epoch,
            },
        })
    }
}

fn temp_sibling(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "index".into());
    name.push(".tmp");
    path.with_file_name(name)
}
