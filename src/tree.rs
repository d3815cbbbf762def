use std::fs;
use std::path::Path;

use anyhow::Context;

use crate::errors::ParseError;
use crate::object::{Digest, ObjectKind};
use crate::repo::GIT_DIR_NAME;
use crate::store::Store;

/// One `mode SP name NUL digest20` record of a tree payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    /// Mode exactly as stored, e.g. `100644` or `40000`.
    pub mode: String,
    pub name: String,
    pub digest: Digest,
}

impl TreeEntry {
    pub fn is_tree(&self) -> bool {
        matches!(self.mode.as_str(), "40000" | "040000")
    }

    /// Kind of the object the entry points at.
    pub fn kind(&self) -> ObjectKind {
        if self.is_tree() {
            ObjectKind::Tree
        } else {
            ObjectKind::Blob
        }
    }

    /// Mode column as git prints it, zero-padded to six digits.
    pub fn mode_padded(&self) -> String {
        format!("{:0>6}", self.mode)
    }
}

/// Parses a tree payload into its entries, in stored order. Rejects
/// truncation and trailing garbage; the mode string is preserved for
/// re-emission.
pub fn parse_tree(payload: &[u8]) -> Result<Vec<TreeEntry>, ParseError> {
    let mut entries = Vec::new();
    let mut rest = payload;

    while !rest.is_empty() {
        let sp = rest
            .iter()
            .position(|&b| b == b' ')
            .ok_or_else(|| ParseError::tree("entry has no space after the mode"))?;
        let (mode, tail) = rest.split_at(sp);
        let tail = &tail[1..];

        let nul = tail
            .iter()
            .position(|&b| b == 0)
            .ok_or_else(|| ParseError::tree("entry name is not NUL-terminated"))?;
        let (name, tail) = tail.split_at(nul);
        let tail = &tail[1..];

        let digest: Digest = tail
            .get(..20)
            .ok_or_else(|| ParseError::tree("entry digest is truncated"))?
            .try_into()
            .expect("slice is 20 bytes");

        let mode = std::str::from_utf8(mode)
            .map_err(|_| ParseError::tree("mode is not ASCII"))?;
        if mode.is_empty() || !mode.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ParseError::tree(format!("bad mode {mode:?}")));
        }

        let name = std::str::from_utf8(name)
            .map_err(|_| ParseError::tree("entry name is not valid UTF-8"))?;
        if name.is_empty() {
            return Err(ParseError::tree("empty entry name"));
        }
        if name.contains('/') {
            return Err(ParseError::tree(format!("entry name {name:?} contains a slash")));
        }

        entries.push(TreeEntry {
            mode: mode.to_owned(),
            name: name.to_owned(),
            digest,
        });
        rest = &tail[20..];
    }

    Ok(entries)
}

/// Builds and stores the tree of `path`, returning its digest. An
/// empty directory yields the canonical empty tree.
pub fn write_tree(store: &Store, path: &Path) -> anyhow::Result<Digest> {
    match write_tree_for(store, path)? {
        Some(digest) => Ok(digest),
        None => Ok(store.put(ObjectKind::Tree, &[])?),
    }
}

fn write_tree_for(store: &Store, path: &Path) -> anyhow::Result<Option<Digest>> {
    let mut children = Vec::new();
    let dir = fs::read_dir(path)
        .with_context(|| format!("opening directory {}", path.display()))?;

    for entry in dir {
        let entry =
            entry.with_context(|| format!("bad directory entry in {}", path.display()))?;

        let file_name = entry.file_name();
        if file_name == GIT_DIR_NAME {
            continue;
        }

        let metadata = entry.metadata().context("metadata for directory entry")?;
        children.push((file_name, metadata, entry.path()));
    }

    // byte-wise order, directories compared as if their name ended in /
    children.sort_unstable_by(|a, b| {
        let mut aname = a.0.as_encoded_bytes().to_vec();
        let mut bname = b.0.as_encoded_bytes().to_vec();
        if a.1.is_dir() {
            aname.push(b'/');
        }
        if b.1.is_dir() {
            bname.push(b'/');
        }
        aname.cmp(&bname)
    });

    let mut tree = Vec::new();
    for (file_name, metadata, child_path) in children {
        let (mode, digest) = if metadata.is_dir() {
            match write_tree_for(store, &child_path)? {
                Some(digest) => ("40000", digest),
                // empty directory, no entry
                None => continue,
            }
        } else if metadata.is_symlink() {
            let target = fs::read_link(&child_path)
                .with_context(|| format!("reading symlink {}", child_path.display()))?;
            let digest = store.put(ObjectKind::Blob, target.as_os_str().as_encoded_bytes())?;
            ("120000", digest)
        } else {
            let data = fs::read(&child_path)
                .with_context(|| format!("reading {}", child_path.display()))?;
            (file_mode(&metadata), store.put(ObjectKind::Blob, &data)?)
        };

        // <mode> <name>\0<20_byte_sha>
        tree.extend(mode.as_bytes());
        tree.push(b' ');
        tree.extend(file_name.as_encoded_bytes());
        tree.push(0);
        tree.extend(digest);
    }

    if tree.is_empty() {
        return Ok(None);
    }

    Ok(Some(store.put(ObjectKind::Tree, &tree)?))
}

#[cfg(unix)]
fn file_mode(metadata: &fs::Metadata) -> &'static str {
    use std::os::unix::fs::PermissionsExt;
    if metadata.permissions().mode() & 0o111 != 0 {
        "100755"
    } else {
        "100644"
    }
}

#[cfg(not(unix))]
fn file_mode(_metadata: &fs::Metadata) -> &'static str {
    "100644"
}
