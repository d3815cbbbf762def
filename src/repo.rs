use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::store::Store;

/// Name of the repository metadata directory.
pub const GIT_DIR_NAME: &str = ".git";

/// Handle on a repository's metadata directory.
pub struct Repo {
    git_dir: PathBuf,
}

impl Repo {
    /// Creates the repository layout under `workdir`: the metadata
    /// directory with `objects/`, `refs/heads/` and a `HEAD` pointing
    /// at master.
    pub fn init(workdir: &Path) -> anyhow::Result<Repo> {
        fs::create_dir_all(workdir)
            .with_context(|| format!("creating directory {}", workdir.display()))?;

        let git_dir = workdir.join(GIT_DIR_NAME);
        fs::create_dir(&git_dir)?;
        fs::create_dir(git_dir.join("objects"))?;
        fs::create_dir(git_dir.join("refs"))?;
        fs::create_dir(git_dir.join("refs/heads"))?;
        fs::write(git_dir.join("HEAD"), "ref: refs/heads/master\n")?;

        Ok(Repo { git_dir })
    }

    /// Locates the repository serving the current directory: `GIT_DIR`
    /// when set, otherwise the nearest `.git` walking up from the
    /// working directory.
    pub fn discover() -> anyhow::Result<Repo> {
        if let Some(dir) = env::var_os("GIT_DIR") {
            let git_dir = PathBuf::from(dir);
            anyhow::ensure!(
                git_dir.is_dir(),
                "GIT_DIR {} is not a directory",
                git_dir.display()
            );
            return Ok(Repo { git_dir });
        }

        let cwd = env::current_dir().context("getting working directory")?;
        for dir in cwd.ancestors() {
            let git_dir = dir.join(GIT_DIR_NAME);
            if git_dir.is_dir() {
                return Ok(Repo { git_dir });
            }
        }

        anyhow::bail!("not a git repository (or any of the parent directories)")
    }

    pub fn git_dir(&self) -> &Path {
        &self.git_dir
    }

    pub fn store(&self) -> Store {
        Store::new(self.git_dir.join("objects"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_creates_repository_layout() {
        let dir = tempfile::tempdir().unwrap();
        let repo = Repo::init(dir.path()).unwrap();

        let git_dir = repo.git_dir();
        assert!(git_dir.join("objects").is_dir());
        assert!(git_dir.join("refs/heads").is_dir());
        assert_eq!(
            fs::read(git_dir.join("HEAD")).unwrap(),
            b"ref: refs/heads/master\n"
        );

        let mut names: Vec<_> = fs::read_dir(git_dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        names.sort();
        assert_eq!(names, ["HEAD", "objects", "refs"]);
    }

    #[test]
    fn init_refuses_an_existing_repository() {
        let dir = tempfile::tempdir().unwrap();
        Repo::init(dir.path()).unwrap();
        assert!(Repo::init(dir.path()).is_err());
    }
}
