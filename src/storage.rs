use crate::git_ops::GitOps;
use crate::plan::{FORMAT_VERSION, PlanState};
use anyhow::{Context, Result, bail};
use log::{info, warn};
use std::fs;
use std::path::{Path, PathBuf};

/// File-based TOML storage for the plan, with optional git history
#[derive(Clone)]
pub struct Storage {
    file_path: PathBuf,
    git: Option<GitOps>,
}

impl Storage {
    /// Create storage for a plan file; `sync_git` commits every save
    pub fn new(file_path: impl AsRef<Path>, sync_git: bool) -> Self {
        let file_path = file_path.as_ref().to_path_buf();
        let git = if sync_git {
            let git = GitOps::discover(&file_path);
            if !git.is_git_managed() {
                warn!(
                    "event=git_sync_disabled reason=not_a_repository path={}",
                    file_path.display()
                );
            }
            Some(git)
        } else {
            None
        };
        Self { file_path, git }
    }

    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    /// Load the plan; a missing file is an empty plan
    pub fn load(&self) -> Result<PlanState> {
        if !self.file_path.exists() {
            info!(
                "event=plan_load status=new path={}",
                self.file_path.display()
            );
            return Ok(PlanState::new());
        }

        let content = fs::read_to_string(&self.file_path)
            .with_context(|| format!("Failed to read {}", self.file_path.display()))?;
        let state: PlanState = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", self.file_path.display()))?;

        if state.format_version > FORMAT_VERSION {
            bail!(
                "Plan file format version {} is newer than supported version {}",
                state.format_version,
                FORMAT_VERSION
            );
        }

        for issue in state.consistency_report() {
            warn!("event=plan_consistency_issue issue={}", issue);
        }
        info!(
            "event=plan_load status=ok path={} elements={} task_groups={}",
            self.file_path.display(),
            state.global_elements.len(),
            state.mjop.task_groups.len()
        );
        Ok(state)
    }

    /// Write the whole plan and record it in git when enabled
    ///
    /// The file is written to a sibling temp file and renamed into place, so a
    /// failed write leaves the previous file intact.
    pub fn save(&self, state: &PlanState, message: &str) -> Result<()> {
        let content = toml::to_string_pretty(state).context("Failed to serialize plan")?;

        let tmp_path = self.file_path.with_extension("toml.tmp");
        fs::write(&tmp_path, content)
            .with_context(|| format!("Failed to write {}", tmp_path.display()))?;
        fs::rename(&tmp_path, &self.file_path)
            .with_context(|| format!("Failed to replace {}", self.file_path.display()))?;

        if let Some(git) = &self.git {
            git.commit(&self.file_path, message)
                .context("Failed to commit plan")?;
            if let Err(e) = git.push() {
                warn!("event=git_push_failed error={:#}", e);
            }
        }

        info!(
            "event=plan_save status=ok path={} message={:?}",
            self.file_path.display(),
            message
        );
        Ok(())
    }
}
