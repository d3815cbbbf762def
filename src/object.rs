use std::fmt;

use sha1::{Digest as _, Sha1};

use crate::errors::StoreError;

/// 20-byte object id, the SHA-1 of the framed form.
pub type Digest = [u8; 20];

/// The four kinds of objects the database stores.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ObjectKind {
    Blob,
    Tree,
    Commit,
    Tag,
}

impl ObjectKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ObjectKind::Blob => "blob",
            ObjectKind::Tree => "tree",
            ObjectKind::Commit => "commit",
            ObjectKind::Tag => "tag",
        }
    }

    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        match bytes {
            b"blob" => Some(ObjectKind::Blob),
            b"tree" => Some(ObjectKind::Tree),
            b"commit" => Some(ObjectKind::Commit),
            b"tag" => Some(ObjectKind::Tag),
            _ => None,
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fully materialized object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Object {
    pub kind: ObjectKind,
    pub data: Vec<u8>,
}

/// Canonical framing `<kind> SP <decimal-size> NUL <payload>`.
/// Both the digest and the on-disk bytes are derived from this form.
pub fn frame(kind: ObjectKind, data: &[u8]) -> Vec<u8> {
    let mut framed = header(kind, data.len());
    framed.extend_from_slice(data);
    framed
}

pub fn header(kind: ObjectKind, size: usize) -> Vec<u8> {
    format!("{kind} {size}\0").into_bytes()
}

/// SHA-1 over the framed form, feeding header and payload separately
/// into one hasher state.
pub fn hash_object(kind: ObjectKind, data: &[u8]) -> Digest {
    let mut hasher = Sha1::new();
    hasher.update(header(kind, data.len()));
    hasher.update(data);
    hasher.finalize().into()
}

/// Parses a loose-object header as read off disk, including the
/// terminating NUL.
pub fn parse_header(raw: &[u8]) -> Result<(ObjectKind, usize), StoreError> {
    let malformed = || StoreError::MalformedHeader(String::from_utf8_lossy(raw).into_owned());

    let header = raw.strip_suffix(&[0]).ok_or_else(malformed)?;
    let header = std::str::from_utf8(header).map_err(|_| malformed())?;
    let (kind, size) = header.split_once(' ').ok_or_else(malformed)?;

    let kind = ObjectKind::from_bytes(kind.as_bytes()).ok_or_else(malformed)?;
    let size = size.parse::<usize>().map_err(|_| malformed())?;

    Ok((kind, size))
}

/// Parses a 40-character lowercase hex digest.
pub fn digest_from_hex(hash: &str) -> Option<Digest> {
    let bytes = hex::decode(hash).ok()?;
    bytes.try_into().ok()
}
