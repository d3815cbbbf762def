use std::io::Write;

use anyhow::Context;

use crate::object::{digest_from_hex, ObjectKind};
use crate::repo::Repo;
use crate::tree;

/// git ls-tree command
pub fn invoke(hash: &str, long: bool, name_only: bool, object_only: bool) -> anyhow::Result<()> {
    let store = Repo::discover()?.store();
    let digest =
        digest_from_hex(hash).with_context(|| format!("not a valid object name {hash}"))?;

    let object = store.get(&digest)?;
    anyhow::ensure!(
        object.kind == ObjectKind::Tree,
        "incorrect object type '{}'",
        object.kind
    );

    let mut stdout = std::io::stdout().lock();
    for entry in tree::parse_tree(&object.data)? {
        if name_only {
            writeln!(stdout, "{}", entry.name)?;
            continue;
        }
        if object_only {
            writeln!(stdout, "{}", hex::encode(entry.digest))?;
            continue;
        }

        if long {
            let size = match entry.kind() {
                ObjectKind::Tree => "-".to_owned(),
                _ => {
                    let (_, size) = store.stat(&entry.digest).with_context(|| {
                        format!("reading size of entry {}", entry.name)
                    })?;
                    size.to_string()
                }
            };
            writeln!(
                stdout,
                "{} {} {} {:>7}\t{}",
                entry.mode_padded(),
                entry.kind(),
                hex::encode(entry.digest),
                size,
                entry.name
            )?;
        } else {
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

    Ok(())
}
