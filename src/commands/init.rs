use std::fs;
use std::path::Path;

use anyhow::Context;

use crate::repo::Repo;

/// git init command
pub fn invoke(dir: Option<&Path>) -> anyhow::Result<()> {
    let workdir = dir.unwrap_or(Path::new("."));
    let repo = Repo::init(workdir).context("creating git directories")?;

    let shown = fs::canonicalize(repo.git_dir()).unwrap_or_else(|_| repo.git_dir().to_path_buf());
    println!("Initialized empty Git repository in {}", shown.display());
    Ok(())
}
