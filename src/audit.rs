// src/audit.rs

//! Best-effort change auditing through git
//!
//! After a store writes or deletes a file it hands the path to a
//! [`ChangeAuditor`]. The git implementation stages the change and commits
//! it with the acting user as author. Auditing never fails the file
//! operation: every problem is logged and swallowed.
//!
//! Each invocation keeps its state (working directory, command output) in
//! locals, so one auditor is safe to share across concurrent requests.

use serde::{Deserialize, Serialize};
use std::ffi::OsStr;
use std::fmt;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};
use wait_timeout::ChildExt;

/// Who is making a change
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub username: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: String,
}

impl Actor {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            ..Default::default()
        }
    }

    pub fn with_name(mut self, first: impl Into<String>, last: impl Into<String>) -> Self {
        self.first_name = first.into();
        self.last_name = last.into();
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = email.into();
        self
    }

    /// "First Last", or the username when both are blank
    pub fn display_name(&self) -> String {
        let full = format!("{} {}", self.first_name, self.last_name);
        let full = full.trim();
        if full.is_empty() {
            self.username.clone()
        } else {
            full.to_string()
        }
    }

    /// Email on file, or `username@app_name`
    pub fn email_or_synthetic(&self, app_name: &str) -> String {
        if self.email.trim().is_empty() {
            format!("{}@{}", self.username, app_name)
        } else {
            self.email.clone()
        }
    }
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.username)
    }
}

/// What happened to a file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    /// Created or overwritten
    Written,
    /// Removed from disk
    Removed,
}

/// Receiver of file changes made by the stores
pub trait ChangeAuditor: Send + Sync {
    /// Record a change to `path` made by `actor`; must not fail
    fn record_change(&self, path: &Path, actor: &Actor, change: ChangeKind);
}

/// Commit-message verb derived from the staged status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitAction {
    Created,
    Modified,
    Deleted,
    Other,
}

impl fmt::Display for CommitAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommitAction::Created => write!(f, "created"),
            CommitAction::Modified => write!(f, "modified"),
            CommitAction::Deleted => write!(f, "deleted"),
            CommitAction::Other => write!(f, "did something with"),
        }
    }
}

impl CommitAction {
    /// Classify from `git status --porcelain` output for one path
    pub fn from_porcelain(output: &str) -> Self {
        let Some(line) = output.lines().find(|line| line.len() >= 2) else {
            return CommitAction::Other;
        };
        match line.as_bytes()[0] {
            b'A' => CommitAction::Created,
            b'M' | b'R' | b'T' => CommitAction::Modified,
            b'D' => CommitAction::Deleted,
            _ => CommitAction::Other,
        }
    }
}

/// Result of auditing one change
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuditOutcome {
    Committed {
        action: CommitAction,
        message: String,
    },
    /// Path is outside a work tree or ignored
    Skipped(&'static str),
}

/// Failures inside the git connector; logged, never propagated
#[derive(Debug, Error)]
pub enum AuditError {
    #[error("failed to run {git}: {source}")]
    Spawn {
        git: String,
        source: std::io::Error,
    },

    #[error("git {command} timed out after {} seconds", .timeout.as_secs())]
    Timeout { command: String, timeout: Duration },

    #[error("git {command} exited with {code:?}: {stderr}")]
    Failed {
        command: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("{0} has no parent directory")]
    NoParent(String),
}

/// Output of a single git invocation
#[derive(Debug, Clone)]
struct GitOutput {
    stdout: String,
    stderr: String,
    code: Option<i32>,
}

impl GitOutput {
    fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Read a child pipe to the end on its own thread
fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> JoinHandle<String> {
    thread::spawn(move || {
        let mut text = String::new();
        if let Some(mut pipe) = pipe {
            let mut bytes = Vec::new();
            if pipe.read_to_end(&mut bytes).is_ok() {
                text = String::from_utf8_lossy(&bytes).into_owned();
            }
        }
        text
    })
}

/// Commits repository changes with the acting user as author
#[derive(Debug, Clone)]
pub struct GitAuditor {
    git: PathBuf,
    repo_root: PathBuf,
    app_name: String,
    timeout: Option<Duration>,
}

impl GitAuditor {
    pub fn new(git: impl Into<PathBuf>, repo_root: impl Into<PathBuf>, app_name: &str) -> Self {
        Self {
            git: git.into(),
            repo_root: repo_root.into(),
            app_name: app_name.to_string(),
            timeout: None,
        }
    }

    /// Kill git invocations that run longer than `timeout`
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    fn run<I, S>(&self, cwd: &Path, args: I) -> Result<GitOutput, AuditError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let args: Vec<_> = args.into_iter().map(|a| a.as_ref().to_owned()).collect();
        let command = args
            .first()
            .map(|a| a.to_string_lossy().into_owned())
            .unwrap_or_default();
        debug!("Running git {:?} in {}", args, cwd.display());

        let mut child = Command::new(&self.git)
            .args(&args)
            .current_dir(cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| AuditError::Spawn {
                git: self.git.display().to_string(),
                source,
            })?;

        let spawn_error = |source| AuditError::Spawn {
            git: self.git.display().to_string(),
            source,
        };

        let Some(timeout) = self.timeout else {
            let output = child.wait_with_output().map_err(spawn_error)?;
            return Ok(GitOutput {
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                code: output.status.code(),
            });
        };

        // Pipes are drained while waiting so a chatty git never blocks on a full pipe
        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());
        let status = match child.wait_timeout(timeout) {
            Ok(Some(status)) => status,
            Ok(None) => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(AuditError::Timeout { command, timeout });
            }
            Err(source) => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(spawn_error(source));
            }
        };

        Ok(GitOutput {
            stdout: stdout.join().unwrap_or_default(),
            stderr: stderr.join().unwrap_or_default(),
            code: status.code(),
        })
    }

    fn parent_of(path: &Path) -> Result<&Path, AuditError> {
        path.parent()
            .ok_or_else(|| AuditError::NoParent(path.display().to_string()))
    }

    /// True when `path` lies inside a git work tree
    pub fn is_in_work_tree(&self, path: &Path) -> bool {
        let Ok(cwd) = Self::parent_of(path) else {
            return false;
        };
        self.run(cwd, [OsStr::new("status"), path.as_os_str()])
            .map(|out| out.success())
            .unwrap_or(false)
    }

    /// True when git would ignore `path`
    pub fn is_ignored(&self, path: &Path) -> bool {
        let Ok(cwd) = Self::parent_of(path) else {
            return false;
        };
        self.run(cwd, [OsStr::new("check-ignore"), OsStr::new("-q"), path.as_os_str()])
            .map(|out| out.success())
            .unwrap_or(false)
    }

    /// Commit message for a change
    pub fn commit_message(&self, actor: &Actor, action: CommitAction, path: &Path) -> String {
        let item = path
            .strip_prefix(&self.repo_root)
            .map(crate::walk::to_posix)
            .unwrap_or_else(|_| path.display().to_string());
        format!(
            "{} {} '{}' via {}",
            actor.display_name(),
            action,
            item,
            self.app_name
        )
    }

    /// `--author` value for `actor`
    pub fn author(&self, actor: &Actor) -> String {
        format!(
            "{} <{}>",
            actor.display_name(),
            actor.email_or_synthetic(&self.app_name)
        )
    }

    /// Stage `path` (add or rm) and commit it
    pub fn commit_change(
        &self,
        path: &Path,
        actor: &Actor,
        change: ChangeKind,
    ) -> Result<AuditOutcome, AuditError> {
        if !self.is_in_work_tree(path) {
            debug!("{} is not in a git repo", path.display());
            return Ok(AuditOutcome::Skipped("not in a git work tree"));
        }
        if self.is_ignored(path) {
            debug!("{} is ignored by git", path.display());
            return Ok(AuditOutcome::Skipped("ignored by git"));
        }

        let cwd = Self::parent_of(path)?;
        let stage = match change {
            ChangeKind::Written => "add",
            ChangeKind::Removed => "rm",
        };
        let mut stage_args = vec![OsStr::new(stage)];
        if change == ChangeKind::Removed {
            stage_args.push(OsStr::new("--cached"));
            stage_args.push(OsStr::new("--ignore-unmatch"));
        }
        stage_args.push(OsStr::new("--"));
        stage_args.push(path.as_os_str());
        let staged = self.run(cwd, stage_args)?;
        if !staged.success() {
            return Err(AuditError::Failed {
                command: stage.to_string(),
                code: staged.code,
                stderr: staged.stderr.trim().to_string(),
            });
        }

        let status = self.run(
            cwd,
            [
                OsStr::new("status"),
                OsStr::new("--porcelain"),
                OsStr::new("--"),
                path.as_os_str(),
            ],
        )?;
        let action = CommitAction::from_porcelain(&status.stdout);
        let message = self.commit_message(actor, action, path);
        let author = self.author(actor);

        info!("Doing git commit for {}", path.display());
        debug!("{}", message);
        let committed = self.run(
            cwd,
            [
                OsStr::new("commit"),
                OsStr::new("-m"),
                OsStr::new(&message),
                OsStr::new("--author"),
                OsStr::new(&author),
                OsStr::new("--"),
                path.as_os_str(),
            ],
        )?;
        if !committed.success() {
            return Err(AuditError::Failed {
                command: "commit".to_string(),
                code: committed.code,
                stderr: committed.stderr.trim().to_string(),
            });
        }

        Ok(AuditOutcome::Committed { action, message })
    }
}

impl ChangeAuditor for GitAuditor {
    fn record_change(&self, path: &Path, actor: &Actor, change: ChangeKind) {
        match self.commit_change(path, actor, change) {
            Ok(AuditOutcome::Committed { message, .. }) => debug!("Committed: {}", message),
            Ok(AuditOutcome::Skipped(reason)) => debug!("Not auditing {}: {}", path.display(), reason),
            Err(e) => warn!("Could not audit change to {}: {}", path.display(), e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_actor_display_name() {
        let actor = Actor::new("jdoe").with_name("Jane", "Doe");
        assert_eq!(actor.display_name(), "Jane Doe");

        let actor = Actor::new("jdoe");
        assert_eq!(actor.display_name(), "jdoe");

        let actor = Actor::new("jdoe").with_name("Jane", "");
        assert_eq!(actor.display_name(), "Jane");
    }

    #[test]
    fn test_actor_email_fallback() {
        let actor = Actor::new("jdoe");
        assert_eq!(actor.email_or_synthetic("MunkiWebAdmin"), "jdoe@MunkiWebAdmin");

        let actor = actor.with_email("jane@example.com");
        assert_eq!(actor.email_or_synthetic("MunkiWebAdmin"), "jane@example.com");
    }

    #[test]
    fn test_commit_message_format() {
        let auditor = GitAuditor::new("git", "/srv/munki", "MunkiWebAdmin");
        let actor = Actor::new("jdoe").with_name("Jane", "Doe");
        let message = auditor.commit_message(
            &actor,
            CommitAction::Modified,
            Path::new("/srv/munki/manifests/site_default"),
        );
        assert_eq!(message, "Jane Doe modified 'manifests/site_default' via MunkiWebAdmin");
        assert_eq!(auditor.author(&actor), "Jane Doe <jdoe@MunkiWebAdmin>");
    }

    #[test]
    fn test_porcelain_classification() {
        assert_eq!(CommitAction::from_porcelain("A  pkgsinfo/a.plist\n"), CommitAction::Created);
        assert_eq!(CommitAction::from_porcelain("M  manifests/x\n"), CommitAction::Modified);
        assert_eq!(CommitAction::from_porcelain("D  pkgs/a.dmg\n"), CommitAction::Deleted);
        assert_eq!(CommitAction::from_porcelain(""), CommitAction::Other);
        assert_eq!(CommitAction::Other.to_string(), "did something with");
    }

    #[test]
    fn test_missing_git_is_not_fatal() {
        let temp = tempfile::TempDir::new().unwrap();
        let file = temp.path().join("manifest");
        std::fs::write(&file, b"x").unwrap();

        let auditor = GitAuditor::new("/nonexistent/git", temp.path(), "MunkiWebAdmin");
        assert!(!auditor.is_in_work_tree(&file));
        // Must not panic or propagate
        auditor.record_change(&file, &Actor::new("jdoe"), ChangeKind::Written);
    }

    #[cfg(unix)]
    fn noisy_git(dir: &Path) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let script = dir.join("git");
        // 256 KiB on stdout and stderr, well past any pipe buffer
        std::fs::write(
            &script,
            "#!/bin/sh\nhead -c 262144 /dev/zero | tr '\\0' x\nhead -c 262144 /dev/zero | tr '\\0' y >&2\nexit 0\n",
        )
        .unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
        script
    }

    #[cfg(unix)]
    fn finishes_within(auditor: GitAuditor, file: PathBuf) -> bool {
        let (done, finished) = std::sync::mpsc::channel();
        std::thread::spawn(move || {
            let out = auditor.run(file.parent().unwrap(), ["status"]);
            let _ = done.send(out.map(|o| (o.stdout.len(), o.stderr.len())).ok());
        });
        match finished.recv_timeout(Duration::from_secs(30)) {
            Ok(lengths) => lengths == Some((262_144, 262_144)),
            Err(_) => false,
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_large_git_output_does_not_block() {
        let temp = tempfile::TempDir::new().unwrap();
        let git = noisy_git(temp.path());
        let file = temp.path().join("manifest");
        std::fs::write(&file, b"x").unwrap();

        let auditor = GitAuditor::new(&git, temp.path(), "MunkiWebAdmin");
        assert!(finishes_within(auditor.clone(), file.clone()));
        assert!(finishes_within(
            auditor.with_timeout(Duration::from_secs(20)),
            file.clone()
        ));

        // The full audit path runs every git step through the same pipes
        let auditor = GitAuditor::new(&git, temp.path(), "MunkiWebAdmin");
        let (done, finished) = std::sync::mpsc::channel();
        std::thread::spawn(move || {
            auditor.record_change(&file, &Actor::new("jdoe"), ChangeKind::Written);
            let _ = done.send(());
        });
        assert!(finished.recv_timeout(Duration::from_secs(30)).is_ok());
    }
}
