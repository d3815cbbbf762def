use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::PathBuf;

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use tempfile::NamedTempFile;

use crate::errors::StoreError;
use crate::object::{self, Digest, Object, ObjectKind};

type Result<T> = std::result::Result<T, StoreError>;

/// The loose-object database: zlib-compressed framed objects under
/// `objects/`, fanned out by the first digest byte.
pub struct Store {
    objects_dir: PathBuf,
}

impl Store {
    pub fn new(objects_dir: impl Into<PathBuf>) -> Self {
        Self {
            objects_dir: objects_dir.into(),
        }
    }

    fn object_path(&self, digest: &Digest) -> PathBuf {
        let hash = hex::encode(digest);
        self.objects_dir.join(&hash[..2]).join(&hash[2..])
    }

    /// Content-addressed, write-once insert. An object already on disk
    /// is never rewritten. New objects are streamed through zlib into a
    /// sibling temp file and renamed onto the final path, so a crashed
    /// or racing writer cannot leave a partial object behind.
    pub fn put(&self, kind: ObjectKind, data: &[u8]) -> Result<Digest> {
        let digest = object::hash_object(kind, data);
        let path = self.object_path(&digest);
        if path.exists() {
            return Ok(digest);
        }

        let dir = path.parent().expect("object path has a fan-out parent");
        fs::create_dir_all(dir)?;

        let tmp = NamedTempFile::new_in(dir)?;
        let mut encoder = ZlibEncoder::new(tmp, Compression::default());
        encoder.write_all(&object::header(kind, data.len()))?;
        encoder.write_all(data)?;
        let tmp = encoder.finish()?;
        tmp.persist(&path).map_err(|e| StoreError::Io(e.error))?;

        Ok(digest)
    }

    /// Reads an object back in full. The inflated payload must match
    /// the size declared in the header exactly.
    pub fn get(&self, digest: &Digest) -> Result<Object> {
        let (kind, size, mut decoder) = self.open(digest)?;

        let mut data = Vec::with_capacity(size);
        decoder
            .read_to_end(&mut data)
            .map_err(StoreError::Decompression)?;

        if data.len() != size {
            return Err(StoreError::SizeMismatch {
                expected: size,
                actual: data.len(),
            });
        }

        Ok(Object { kind, data })
    }

    /// Kind and declared size without reading the payload.
    pub fn stat(&self, digest: &Digest) -> Result<(ObjectKind, usize)> {
        let (kind, size, _) = self.open(digest)?;
        Ok((kind, size))
    }

    pub fn exists(&self, digest: &Digest) -> bool {
        self.object_path(digest).exists()
    }

    fn open(&self, digest: &Digest) -> Result<(ObjectKind, usize, BufReader<ZlibDecoder<File>>)> {
        let path = self.object_path(digest);
        let file = File::open(&path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => StoreError::NotFound(hex::encode(digest)),
            _ => StoreError::Io(e),
        })?;

        let mut decoder = BufReader::new(ZlibDecoder::new(file));

        let mut header = Vec::new();
        decoder
            .read_until(0, &mut header)
            .map_err(StoreError::Decompression)?;
        let (kind, size) = object::parse_header(&header)?;

        Ok((kind, size, decoder))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::hash_object;

    fn temp_store() -> (tempfile::TempDir, Store) {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::new(dir.path().join("objects"));
        (dir, store)
    }

    /// Writes raw framed bytes at the path the given digest maps to,
    /// bypassing `put`, to simulate corrupt on-disk objects.
    fn plant(store: &Store, digest: &Digest, framed: &[u8]) {
        let path = store.object_path(digest);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(framed).unwrap();
        fs::write(path, encoder.finish().unwrap()).unwrap();
    }

    #[test]
    fn put_get_round_trip() {
        let (_dir, store) = temp_store();

        let digest = store.put(ObjectKind::Blob, b"hello world").unwrap();
        assert_eq!(hex::encode(digest), "95d09f2b10159347eece71399a7e2e907ea3df4f");

        let object = store.get(&digest).unwrap();
        assert_eq!(object.kind, ObjectKind::Blob);
        assert_eq!(object.data, b"hello world");
    }

    #[test]
    fn stat_reports_kind_and_size_without_payload() {
        let (_dir, store) = temp_store();

        let digest = store.put(ObjectKind::Commit, b"tree abc\n").unwrap();
        let (kind, size) = store.stat(&digest).unwrap();
        assert_eq!(kind, ObjectKind::Commit);
        assert_eq!(size, 9);
    }

    #[test]
    fn put_is_idempotent() {
        let (_dir, store) = temp_store();

        let first = store.put(ObjectKind::Blob, b"same").unwrap();
        let bytes_before = fs::read(store.object_path(&first)).unwrap();

        let second = store.put(ObjectKind::Blob, b"same").unwrap();
        assert_eq!(first, second);
        assert_eq!(fs::read(store.object_path(&second)).unwrap(), bytes_before);
    }

    #[test]
    fn exists_and_not_found() {
        let (_dir, store) = temp_store();

        let digest = store.put(ObjectKind::Blob, b"here").unwrap();
        assert!(store.exists(&digest));

        let missing = hash_object(ObjectKind::Blob, b"not here");
        assert!(!store.exists(&missing));
        assert!(matches!(store.get(&missing), Err(StoreError::NotFound(_))));
        assert!(matches!(store.stat(&missing), Err(StoreError::NotFound(_))));
    }

    #[test]
    fn get_rejects_size_mismatch() {
        let (_dir, store) = temp_store();

        let digest = hash_object(ObjectKind::Blob, b"xxxxx");
        plant(&store, &digest, b"blob 5\0xx");
        assert!(matches!(
            store.get(&digest),
            Err(StoreError::SizeMismatch { expected: 5, actual: 2 })
        ));
    }

    #[test]
    fn get_rejects_malformed_header() {
        let (_dir, store) = temp_store();

        let digest = hash_object(ObjectKind::Blob, b"zzz");
        plant(&store, &digest, b"weird 3\0zzz");
        assert!(matches!(
            store.get(&digest),
            Err(StoreError::MalformedHeader(_))
        ));
    }

    #[test]
    fn get_rejects_garbage_compression() {
        let (_dir, store) = temp_store();

        let digest = hash_object(ObjectKind::Blob, b"q");
        let path = store.object_path(&digest);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"this is not zlib data").unwrap();

        assert!(matches!(
            store.get(&digest),
            Err(StoreError::Decompression(_) | StoreError::MalformedHeader(_))
        ));
    }
}
