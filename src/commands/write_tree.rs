use std::path::Path;

use anyhow::Context;

use crate::repo::Repo;
use crate::tree;

/// git write-tree command
pub fn invoke() -> anyhow::Result<()> {
    let store = Repo::discover()?.store();
    let digest =
        tree::write_tree(&store, Path::new(".")).context("constructing root tree object")?;

    println!("{}", hex::encode(digest));
    Ok(())
}
