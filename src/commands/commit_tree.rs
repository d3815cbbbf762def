use std::env;
use std::process::Command;
use std::time::SystemTime;

use anyhow::Context;

use crate::commit::{self, Signature};
use crate::object::{digest_from_hex, ObjectKind};
use crate::repo::Repo;

/// git commit-tree command
pub fn invoke(tree_hash: &str, parent_hashes: &[String], message: &str) -> anyhow::Result<()> {
    let store = Repo::discover()?.store();

    let tree = digest_from_hex(tree_hash)
        .with_context(|| format!("not a valid object name {tree_hash}"))?;
    let (kind, _) = store
        .stat(&tree)
        .with_context(|| format!("tree object {tree_hash} does not exist"))?;
    anyhow::ensure!(kind == ObjectKind::Tree, "{tree_hash} is a {kind}, not a tree");

    let mut parents = Vec::new();
    for hash in parent_hashes {
        let parent =
            digest_from_hex(hash).with_context(|| format!("not a valid object name {hash}"))?;
        let object = store
            .get(&parent)
            .with_context(|| format!("parent object {hash} does not exist"))?;
        anyhow::ensure!(
            object.kind == ObjectKind::Commit,
            "{hash} is a {}, not a commit",
            object.kind
        );
        commit::parse_commit(&object.data)
            .with_context(|| format!("parent {hash} is not a well-formed commit"))?;
        parents.push(parent);
    }

    let (name, email) = identity()?;
    let timestamp = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .context("current system time is before UNIX epoch")?
        .as_secs() as i64;

    let author = Signature {
        name,
        email,
        timestamp,
        tz_offset_secs: 0,
    };
    let committer = author.clone();

    let payload = commit::format_commit(&tree, &parents, &author, &committer, message);
    let digest = store.put(ObjectKind::Commit, &payload)?;

    println!("{}", hex::encode(digest));
    Ok(())
}

/// `user.name` and `user.email` from the environment when both are
/// set, else from `git config` run as an external process.
fn identity() -> anyhow::Result<(String, String)> {
    match (env::var("GIT_AUTHOR_NAME"), env::var("GIT_AUTHOR_EMAIL")) {
        (Ok(name), Ok(email)) => Ok((name, email)),
        _ => Ok((git_config("user.name")?, git_config("user.email")?)),
    }
}

fn git_config(key: &str) -> anyhow::Result<String> {
    let output = Command::new("git")
        .args(["config", key])
        .output()
        .with_context(|| format!("running git config {key}"))?;
    anyhow::ensure!(
        output.status.success(),
        "git config {key} failed; set GIT_AUTHOR_NAME and GIT_AUTHOR_EMAIL to bypass config lookup"
    );

    let value = String::from_utf8(output.stdout)
        .with_context(|| format!("git config {key} output is not UTF-8"))?;
    Ok(value.trim().to_owned())
}
