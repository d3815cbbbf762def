use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use anyhow::Context;

use crate::pack;
use crate::repo::Repo;

/// git unpack-objects command
pub fn invoke(pack_path: Option<&Path>) -> anyhow::Result<()> {
    let store = Repo::discover()?.store();

    let outcome = match pack_path {
        Some(path) => {
            let file =
                File::open(path).with_context(|| format!("opening pack {}", path.display()))?;
            pack::unpack(BufReader::new(file), &store)
        }
        None => pack::unpack(std::io::stdin().lock(), &store),
    }
    .context("unpacking objects")?;

    println!("Received objects: {}", outcome.received);
    println!("Resolved deltas: {}", outcome.deltas);
    println!("Pack checksum: {}", hex::encode(outcome.checksum));
    Ok(())
}
