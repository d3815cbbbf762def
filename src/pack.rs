use std::io::{self, BufRead, Read};

use flate2::bufread::ZlibDecoder;
use sha1::{Digest as _, Sha1};

use crate::delta;
use crate::errors::PackError;
use crate::object::{Digest, ObjectKind};
use crate::store::Store;

type Result<T> = std::result::Result<T, PackError>;

const PACK_MAGIC: [u8; 4] = *b"PACK";

/// One decoded pack record: a plain object, or a REF_DELTA carrying
/// the digest of its base.
#[derive(Debug)]
pub enum PackRecord {
    Plain { kind: ObjectKind, data: Vec<u8> },
    RefDelta { base: Digest, delta: Vec<u8> },
}

/// Streaming reader for the packfile wire format. Per record:
/// size-and-type header, optional base digest, then exactly one zlib
/// stream; after `count` records, a SHA-1 trailer over everything
/// before it.
pub struct PackReader<R: BufRead> {
    input: HashingReader<R>,
    count: u32,
    remaining: u32,
}

impl<R: BufRead> PackReader<R> {
    /// Parses the pack header. Versions 2 and 3 share the record
    /// format.
    pub fn new(input: R) -> Result<Self> {
        let mut input = HashingReader::new(input);

        let mut header = [0u8; 12];
        input
            .read_exact(&mut header)
            .map_err(|e| truncated(e, "pack header"))?;

        if header[..4] != PACK_MAGIC {
            return Err(PackError::BadMagic);
        }

        let version = u32::from_be_bytes(header[4..8].try_into().expect("4-byte slice"));
        if !(2..=3).contains(&version) {
            return Err(PackError::UnsupportedVersion(version));
        }

        let count = u32::from_be_bytes(header[8..12].try_into().expect("4-byte slice"));

        Ok(Self {
            input,
            count,
            remaining: count,
        })
    }

    /// Number of records the header declares.
    pub fn count(&self) -> u32 {
        self.count
    }

    /// The next record, or `None` once all declared records have been
    /// read.
    pub fn next_record(&mut self) -> Result<Option<PackRecord>> {
        if self.remaining == 0 {
            return Ok(None);
        }
        self.remaining -= 1;

        let (type_code, size) = self.read_size_and_type()?;

        let record = match type_code {
            1 => PackRecord::Plain {
                kind: ObjectKind::Commit,
                data: self.inflate(size)?,
            },
            2 => PackRecord::Plain {
                kind: ObjectKind::Tree,
                data: self.inflate(size)?,
            },
            3 => PackRecord::Plain {
                kind: ObjectKind::Blob,
                data: self.inflate(size)?,
            },
            4 => PackRecord::Plain {
                kind: ObjectKind::Tag,
                data: self.inflate(size)?,
            },
            6 => {
                // OBJ_OFS_DELTA: read its offset to keep the stream
                // aligned before refusing the record
                self.read_ofs_offset()?;
                return Err(PackError::UnsupportedDeltaForm);
            }
            7 => {
                let mut base = [0u8; 20];
                self.input
                    .read_exact(&mut base)
                    .map_err(|e| truncated(e, "REF_DELTA base digest"))?;
                PackRecord::RefDelta {
                    base,
                    delta: self.inflate(size)?,
                }
            }
            other => return Err(PackError::UnknownType(other)),
        };

        Ok(Some(record))
    }

    /// Verifies the SHA-1 trailer and that nothing follows it. Must be
    /// called only after `next_record` has returned `None`.
    pub fn finish(self) -> Result<Digest> {
        let (computed, mut inner) = self.input.finalize();

        let mut stored = [0u8; 20];
        inner
            .read_exact(&mut stored)
            .map_err(|e| truncated(e, "pack trailer"))?;

        if computed != stored {
            return Err(PackError::TrailerMismatch {
                computed: hex::encode(computed),
                stored: hex::encode(stored),
            });
        }

        // the declared count must account for the entire pack
        match inner.read(&mut [0u8])? {
            0 => Ok(stored),
            _ => Err(PackError::CountMismatch),
        }
    }

    /// The record header: type in bits 6..4 of the first byte, size in
    /// its low 4 bits plus 7-bit little-endian continuation groups.
    fn read_size_and_type(&mut self) -> Result<(u8, usize)> {
        let first = self.read_byte("object header")?;
        let type_code = (first >> 4) & 0b111;

        let mut size = (first & 0x0f) as usize;
        let mut shift = 4u32;
        let mut byte = first;
        while byte & 0x80 != 0 {
            byte = self.read_byte("object size")?;

            let contrib = (byte & 0x7f) as usize;
            if shift >= usize::BITS || contrib << shift >> shift != contrib {
                return Err(PackError::OversizedVarint);
            }

            size |= contrib << shift;
            shift += 7;
        }

        Ok((type_code, size))
    }

    /// The OFS_DELTA offset varint, which adds one between groups:
    /// `n = (n + 1) << 7 | (b & 0x7f)`.
    fn read_ofs_offset(&mut self) -> Result<u64> {
        let mut byte = self.read_byte("delta offset")?;
        let mut offset = (byte & 0x7f) as u64;
        while byte & 0x80 != 0 {
            byte = self.read_byte("delta offset")?;
            offset = ((offset + 1) << 7) | (byte & 0x7f) as u64;
        }
        Ok(offset)
    }

    fn read_byte(&mut self, what: &'static str) -> Result<u8> {
        let mut buf = [0u8; 1];
        self.input
            .read_exact(&mut buf)
            .map_err(|e| truncated(e, what))?;
        Ok(buf[0])
    }

    /// Inflates exactly one zlib stream off the input. The bufread
    /// decoder consumes only the bytes belonging to the stream, leaving
    /// the next record header in place; the declared size is checked
    /// against what actually came out, never used to advance the input.
    fn inflate(&mut self, declared: usize) -> Result<Vec<u8>> {
        let mut decoder = ZlibDecoder::new(&mut self.input);
        let mut data = Vec::with_capacity(declared);
        decoder
            .read_to_end(&mut data)
            .map_err(PackError::Decompression)?;

        if data.len() != declared {
            return Err(PackError::SizeMismatch {
                expected: declared,
                actual: data.len(),
            });
        }

        Ok(data)
    }
}

fn truncated(e: io::Error, what: &'static str) -> PackError {
    match e.kind() {
        io::ErrorKind::UnexpectedEof => PackError::Truncated(what),
        _ => PackError::Io(e),
    }
}

/// Outcome of ingesting one pack.
#[derive(Debug)]
pub struct UnpackOutcome {
    /// Plain objects stored directly.
    pub received: usize,
    /// REF_DELTA records reconstructed and stored.
    pub deltas: usize,
    /// The pack's own SHA-1 checksum.
    pub checksum: Digest,
}

/// Reads a whole pack into the store. REF_DELTA bases may sit earlier
/// or later in the same pack, or already in the store; unresolved
/// deltas are buffered and applied once their base materializes.
pub fn unpack<R: BufRead>(input: R, store: &Store) -> Result<UnpackOutcome> {
    let mut reader = PackReader::new(input)?;

    let mut received = 0;
    let mut deltas = 0;
    let mut pending: Vec<(Digest, Vec<u8>)> = Vec::new();

    while let Some(record) = reader.next_record()? {
        match record {
            PackRecord::Plain { kind, data } => {
                store.put(kind, &data)?;
                received += 1;
            }
            PackRecord::RefDelta { base, delta } => pending.push((base, delta)),
        }
    }

    let checksum = reader.finish()?;

    // iterate to a fixpoint so delta chains resolve in any order
    while !pending.is_empty() {
        let before = pending.len();
        let mut unresolved = Vec::new();

        for (base, delta) in pending {
            if !store.exists(&base) {
                unresolved.push((base, delta));
                continue;
            }

            let base_obj = store.get(&base)?;
            let target = delta::apply(&base_obj.data, &delta)?;
            store.put(base_obj.kind, &target)?;
            deltas += 1;
        }

        if unresolved.len() == before {
            return Err(PackError::MissingBase(hex::encode(unresolved[0].0)));
        }
        pending = unresolved;
    }

    Ok(UnpackOutcome {
        received,
        deltas,
        checksum,
    })
}

/// Wraps the pack input and hashes every byte handed out, so the
/// trailer can be verified without buffering the stream.
struct HashingReader<R> {
    inner: R,
    hasher: Sha1,
}

impl<R: BufRead> HashingReader<R> {
    fn new(inner: R) -> Self {
        Self {
            inner,
            hasher: Sha1::new(),
        }
    }

    /// Finalizes the running hash and hands back the inner reader so
    /// the trailer itself can be read unhashed.
    fn finalize(self) -> (Digest, R) {
        (self.hasher.finalize().into(), self.inner)
    }
}

impl<R: BufRead> Read for HashingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.hasher.update(&buf[..n]);
        Ok(n)
    }
}

impl<R: BufRead> BufRead for HashingReader<R> {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        self.inner.fill_buf()
    }

    fn consume(&mut self, amt: usize) {
        if amt == 0 {
            return;
        }
        // fill_buf re-returns the buffer the caller just inspected
        let buf = self
            .inner
            .fill_buf()
            .expect("fill_buf succeeded before consume");
        self.hasher.update(&buf[..amt.min(buf.len())]);
        self.inner.consume(amt);
    }
}
