use anyhow::{Context, Result};
use git2::{Oid, Repository, Signature, Time};
use log::{debug, info};
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

/// Commits the plan file to the git repository that contains it
#[derive(Clone)]
pub struct GitOps {
    repo: Option<Arc<Mutex<Repository>>>,
}

impl GitOps {
    /// Look for a repository containing the file's directory
    pub fn discover(file_path: &Path) -> Self {
        let dir = match file_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let repo = Repository::discover(dir).ok().map(|r| Arc::new(Mutex::new(r)));
        Self { repo }
    }

    /// Check if the file is under git version control
    pub fn is_git_managed(&self) -> bool {
        self.repo.is_some()
    }

    /// Stage and commit the file
    ///
    /// Returns `None` without committing when the staged tree equals HEAD, so
    /// retrying a save with unchanged content adds no empty commits.
    pub fn commit(&self, file_path: &Path, message: &str) -> Result<Option<Oid>> {
        let Some(repo) = &self.repo else {
            return Ok(None);
        };
        let repo = repo.lock().unwrap_or_else(PoisonError::into_inner);

        let workdir = repo
            .workdir()
            .context("Repository has no working directory")?;
        let absolute = file_path
            .canonicalize()
            .with_context(|| format!("Failed to resolve {}", file_path.display()))?;
        let workdir = workdir
            .canonicalize()
            .context("Failed to resolve repository working directory")?;
        let relative = absolute
            .strip_prefix(&workdir)
            .context("Plan file is not inside the repository")?;

        let mut index = repo.index()?;
        index.add_path(relative)?;
        index.write()?;
        let tree = repo.find_tree(index.write_tree()?)?;

        let parent = match repo.head() {
            Ok(head) => Some(head.peel_to_commit()?),
            Err(_) => None,
        };
        if let Some(parent) = &parent
            && parent.tree_id() == tree.id()
        {
            debug!("event=git_commit_skipped reason=unchanged");
            return Ok(None);
        }

        let signature = Self::signature(&repo)?;
        let parents: Vec<_> = parent.iter().collect();
        let oid = repo.commit(Some("HEAD"), &signature, &signature, message, &tree, &parents)?;
        info!("event=git_commit oid={} message={:?}", oid, message);
        Ok(Some(oid))
    }

    /// Push the current branch to `origin` when that remote exists
    pub fn push(&self) -> Result<()> {
        let Some(repo) = &self.repo else {
            return Ok(());
        };
        let repo = repo.lock().unwrap_or_else(PoisonError::into_inner);

        let Ok(mut remote) = repo.find_remote("origin") else {
            debug!("event=git_push_skipped reason=no_origin");
            return Ok(());
        };
        let head = repo.head().context("Failed to get HEAD")?;
        let branch = head.shorthand().context("Failed to get branch name")?;
        let refspec = format!("refs/heads/{}", branch);
        remote
            .push(&[&refspec], None)
            .context("Failed to push to origin")?;
        Ok(())
    }

    fn signature(repo: &Repository) -> Result<Signature<'static>> {
        let config = repo.config()?;
        let name = config
            .get_string("user.name")
            .unwrap_or_else(|_| "MJOP MCP Server".to_string());
        let email = config
            .get_string("user.email")
            .unwrap_or_else(|_| "mjop-mcp@localhost".to_string());

        match Signature::now(&name, &email) {
            Ok(sig) => Ok(sig),
            Err(_) => Signature::new(&name, &email, &Time::new(1_700_000_000, 0))
                .context("Failed to create signature"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn setup_repo() -> (TempDir, Repository) {
        let temp_dir = TempDir::new().unwrap();
        let repo = Repository::init(temp_dir.path()).unwrap();
        let mut config = repo.config().unwrap();
        config.set_str("user.name", "Test User").unwrap();
        config.set_str("user.email", "test@example.com").unwrap();
        (temp_dir, repo)
    }

    #[test]
    fn test_outside_repository() {
        let temp_dir = TempDir::new().unwrap();
        let git = GitOps::discover(&temp_dir.path().join("plan.toml"));
        assert!(!git.is_git_managed());
        assert_eq!(git.commit(&temp_dir.path().join("plan.toml"), "noop").unwrap(), None);
        assert!(git.push().is_ok());
    }

    #[test]
    fn test_commit_then_skip_unchanged() {
        let (temp_dir, repo) = setup_repo();
        let file_path = temp_dir.path().join("plan.toml");
        fs::write(&file_path, "format_version = 1\n").unwrap();

        let git = GitOps::discover(&file_path);
        assert!(git.is_git_managed());

        let first = git.commit(&file_path, "Save plan").unwrap();
        assert!(first.is_some());
        let head = repo.head().unwrap().peel_to_commit().unwrap();
        assert_eq!(head.message(), Some("Save plan"));

        // Same content again: nothing to commit
        assert_eq!(git.commit(&file_path, "Save plan").unwrap(), None);

        fs::write(&file_path, "format_version = 1\ntask_counter = 3\n").unwrap();
        assert!(git.commit(&file_path, "Save plan again").unwrap().is_some());
    }

    #[test]
    fn test_push_without_origin_is_noop() {
        let (temp_dir, _repo) = setup_repo();
        let file_path = temp_dir.path().join("plan.toml");
        fs::write(&file_path, "").unwrap();
        let git = GitOps::discover(&file_path);
        assert!(git.push().is_ok());
    }
}
