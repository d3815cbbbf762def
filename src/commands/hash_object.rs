use std::fs;
use std::io::Read;
use std::path::Path;

use anyhow::Context;

use crate::object::{self, ObjectKind};
use crate::repo::Repo;

/// git hash-object command
pub fn invoke(file: Option<&Path>, use_stdin: bool, write: bool) -> anyhow::Result<()> {
    let data = if use_stdin {
        let mut buf = Vec::new();
        std::io::stdin()
            .lock()
            .read_to_end(&mut buf)
            .context("reading object from stdin")?;
        buf
    } else {
        let file = file.context("no file given")?;
        fs::read(file).with_context(|| format!("reading {}", file.display()))?
    };

    let digest = if write {
        // compress and write to disk
        let store = Repo::discover()?.store();
        store.put(ObjectKind::Blob, &data)?
    } else {
        // just compute the object hash
        object::hash_object(ObjectKind::Blob, &data)
    };

    println!("{}", hex::encode(digest));
    Ok(())
}
