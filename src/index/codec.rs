//! Binary formats for persisting fingerprints.
//!
//! Two layouts share `bincode` as the payload codec:
//!
//! - **Framed**: `[u64 big-endian length][payload]` repeated once per blob,
//!   no header, terminated by EOF. Records can be written and read one at a
//!   time without holding the whole index in memory.
//! - **Monolithic**: the whole index (`root_dir` and `blobs`) as a single
//!   payload, used for cache files.
//!
//! Neither layout carries a version tag; the format version lives in the
//! cache file name (see [`crate::utils::cache_path_for`]).

use crate::error::{Error, Result};
use crate::index::repo::RepoIndex;
use crate::index::types::BlobFingerprint;
use bincode::Options;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::info;

/// Size of the framed record length prefix
pub const FRAME_HEADER_LEN: usize = 8;

#[derive(Serialize)]
struct IndexPayloadRef<'a> {
    root_dir: Option<&'a str>,
    blobs: &'a [BlobFingerprint],
}

#[derive(Deserialize)]
struct IndexPayload {
    root_dir: Option<String>,
    blobs: Vec<BlobFingerprint>,
}

/// Append one length-prefixed record
pub fn write_blob<W: Write + ?Sized>(writer: &mut W, blob: &BlobFingerprint) -> Result<()> {
    let payload = bincode::serialize(blob).map_err(Error::Encode)?;
    writer.write_all(&(payload.len() as u64).to_be_bytes())?;
    writer.write_all(&payload)?;
    Ok(())
}

/// Read the next record, or `None` at a clean end of stream.
///
/// A record whose declared length exceeds the bytes left is rejected with
/// [`Error::LengthMismatch`] rather than partially decoded.
pub fn read_blob<R: Read + ?Sized>(reader: &mut R) -> Result<Option<BlobFingerprint>> {
    let mut header = [0u8; FRAME_HEADER_LEN];
    let got = read_up_to(reader, &mut header)?;
    if got == 0 {
        return Ok(None);
    }
    if got < FRAME_HEADER_LEN {
        return Err(Error::LengthMismatch {
            expected: FRAME_HEADER_LEN as u64,
            actual: got as u64,
        });
    }

    let expected = u64::from_be_bytes(header);
    let mut payload = Vec::new();
    let actual = reader.take(expected).read_to_end(&mut payload)? as u64;
    if actual != expected {
        return Err(Error::LengthMismatch { expected, actual });
    }

    bincode::deserialize(&payload).map(Some).map_err(Error::Decode)
}

/// Write every blob of `blobs` as framed records, returning how many were written
pub fn write_blobs_framed<'a, W, I>(writer: &mut W, blobs: I) -> Result<usize>
where
    W: Write + ?Sized,
    I: IntoIterator<Item = &'a BlobFingerprint>,
{
    let mut count = 0;
    for blob in blobs {
        write_blob(writer, blob)?;
        count += 1;
    }
    Ok(count)
}

/// Fill `buf` from `reader`, stopping early only at EOF
fn read_up_to<R: Read + ?Sized>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// Streaming iterator over a framed file.
///
/// Yields records until EOF; stops after the first error.
pub struct BlobReader<R> {
    reader: R,
    done: bool,
}

impl<R: Read> BlobReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            done: false,
        }
    }
}

impl<R: Read> Iterator for BlobReader<R> {
    type Item = Result<BlobFingerprint>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match read_blob(&mut self.reader) {
            Ok(Some(blob)) => Some(Ok(blob)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

/// Encode the whole index as a single payload
pub fn serialize<W: Write>(index: &RepoIndex, writer: W) -> Result<()> {
    let payload = IndexPayloadRef {
        root_dir: index.root_dir(),
        blobs: index.blobs(),
    };
    bincode::serialize_into(writer, &payload).map_err(Error::Encode)
}

/// Decode an index written by [`serialize`]. No filesystem is attached; see
/// [`RepoIndex::filesystem`].
///
/// The whole stream is buffered first, so a corrupt length prefix can never
/// declare more than the bytes actually present.
pub fn deserialize<R: Read>(mut reader: R) -> Result<RepoIndex> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;
    decode_payload(&bytes)
}

fn decode_payload(bytes: &[u8]) -> Result<RepoIndex> {
    // Same encoding as `bincode::serialize_into`, capped at the input size
    let payload: IndexPayload = bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .allow_trailing_bytes()
        .with_limit(bytes.len() as u64)
        .deserialize(bytes)
        .map_err(Error::Decode)?;
    Ok(RepoIndex::new(payload.root_dir, payload.blobs))
}

/// Write `index` to `path` in the monolithic format.
///
/// Parent directories are created as needed. The payload goes to a temporary
/// file in the destination directory that is renamed over `path` only once
/// fully written.
pub fn serialize_to_file(index: &RepoIndex, path: &Path) -> Result<()> {
    write_atomically(path, |writer| serialize(index, writer))?;
    info!(path = %path.display(), blobs = index.len(), "wrote index");
    Ok(())
}

/// Read an index written by [`serialize_to_file`]
pub fn deserialize_from_file(path: &Path) -> Result<RepoIndex> {
    let bytes = fs::read(path).map_err(|e| Error::read(path.display().to_string(), e))?;
    decode_payload(&bytes)
}

/// Write every blob of `index` to `path` in the framed format, atomically
pub fn write_framed_file(index: &RepoIndex, path: &Path) -> Result<usize> {
    let mut count = 0;
    write_atomically(path, |writer| {
        count = write_blobs_framed(writer, index.blobs())?;
        Ok(())
    })?;
    Ok(count)
}

/// Open a framed file for streaming reads
pub fn open_framed_file(path: &Path) -> Result<BlobReader<BufReader<File>>> {
    let file = File::open(path).map_err(|e| Error::read(path.display().to_string(), e))?;
    Ok(BlobReader::new(BufReader::new(file)))
}

fn write_atomically<F>(path: &Path, write: F) -> Result<()>
where
    F: FnOnce(&mut BufWriter<NamedTempFile>) -> Result<()>,
{
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent)?;

    let mut writer = BufWriter::new(NamedTempFile::new_in(parent)?);
    write(&mut writer)?;
    let tmp = writer.into_inner().map_err(|e| e.into_error())?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| Error::Io(e.error))?;
    Ok(())
}
