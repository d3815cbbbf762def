use std::io::Write;

use anyhow::Context;

use crate::object::{digest_from_hex, ObjectKind};
use crate::repo::Repo;
use crate::tree;

/// git cat-file command
pub fn invoke(hash: &str, type_only: bool, size_only: bool, exists: bool) -> anyhow::Result<()> {
    let store = Repo::discover()?.store();
    let digest =
        digest_from_hex(hash).with_context(|| format!("not a valid object name {hash}"))?;

    if exists {
        if !store.exists(&digest) {
            std::process::exit(1);
        }
        return Ok(());
    }

    if type_only || size_only {
        let (kind, size) = store.stat(&digest)?;
        if type_only {
            println!("{kind}");
        } else {
            println!("{size}");
        }
        return Ok(());
    }

    let object = store.get(&digest)?;
    let mut stdout = std::io::stdout().lock();

    match object.kind {
        // trees are binary; pretty-print them the way ls-tree does
        ObjectKind::Tree => {
            for entry in tree::parse_tree(&object.data)? {
                writeln!(
                    stdout,
                    "{} {} {}\t{}",
                    entry.mode_padded(),
                    entry.kind(),
                    hex::encode(entry.digest),
                    entry.name
                )?;
            }
        }
        _ => stdout
            .write_all(&object.data)
            .context("streaming object content to stdout")?,
    }

    Ok(())
}
