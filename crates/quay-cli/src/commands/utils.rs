use std::env;
use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result, bail};
use quay_core::{CommandDispatcher, Config, Pending};
use quay_git::{FileStatus, Repository, WorkingCopyStatus};

use crate::host;

/// A dispatcher bound to the repository around the current directory.
pub struct Session {
    pub dispatcher: CommandDispatcher<Repository>,
    pub config: Config,
    pub workdir: PathBuf,
}

/// Open the repository, load its config and bind a dispatcher to it.
pub fn open_session(assume_yes: bool) -> Result<Session> {
    open_session_with(assume_yes, |_| {})
}

/// Like [`open_session`], letting command-line flags override the loaded
/// config before the dispatcher is built.
pub fn open_session_with(
    assume_yes: bool,
    adjust: impl FnOnce(&mut Config),
) -> Result<Session> {
    let repo = Repository::open(".").context("Not inside a git repository")?;
    let workdir = repo
        .workdir()
        .context("Cannot run in bare repository")?
        .to_path_buf();

    let config_path = Config::path_in(repo.git_dir());
    let mut config = Config::load(&config_path)
        .with_context(|| format!("Failed to load {}", config_path.display()))?;
    adjust(&mut config);
    let repo = repo.with_default_remote(config.general.default_remote.clone());

    let dispatcher = CommandDispatcher::new(host::terminal(assume_yes), &config)?;
    dispatcher.bind(repo);

    Ok(Session {
        dispatcher,
        config,
        workdir,
    })
}

/// Wait for a queued result, attaching `what` to any failure.
pub fn wait<T>(pending: Pending<T>, what: &str) -> Result<T> {
    pending.wait().with_context(|| format!("Failed to {what}"))
}

impl Session {
    /// Scan the working copy through the queue.
    pub fn status(&self) -> Result<WorkingCopyStatus> {
        wait(self.dispatcher.file_status()?, "read the working copy status")
    }

    /// Turn a path given on the command line into a path relative to the
    /// working copy root.
    pub fn repo_path(&self, arg: &str) -> Result<String> {
        let cwd = env::current_dir().context("Cannot read the current directory")?;
        to_repo_path(&self.workdir, &cwd, arg)
    }

    /// Look up each path in `candidates`, failing on paths without changes.
    pub fn select(&self, candidates: &[FileStatus], paths: &[String]) -> Result<Vec<FileStatus>> {
        paths
            .iter()
            .map(|arg| {
                let path = self.repo_path(arg)?;
                candidates
                    .iter()
                    .find(|file| file.path == path)
                    .cloned()
                    .with_context(|| format!("'{path}' has no changes to act on"))
            })
            .collect()
    }
}

fn to_repo_path(workdir: &Path, cwd: &Path, arg: &str) -> Result<String> {
    let workdir = workdir.canonicalize().unwrap_or_else(|_| workdir.to_path_buf());
    let cwd = cwd.canonicalize().unwrap_or_else(|_| cwd.to_path_buf());

    let joined = if Path::new(arg).is_absolute() {
        PathBuf::from(arg)
    } else {
        cwd.join(arg)
    };

    let mut parts: Vec<String> = Vec::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                parts.pop();
            }
            Component::Normal(part) => parts.push(part.to_string_lossy().into_owned()),
            Component::RootDir | Component::Prefix(_) => parts.clear(),
        }
    }
    let normalized: PathBuf = joined
        .components()
        .take_while(|c| matches!(c, Component::Prefix(_) | Component::RootDir))
        .map(|c| c.as_os_str().to_owned())
        .chain(parts.iter().map(Into::into))
        .collect();

    let Ok(relative) = normalized.strip_prefix(&workdir) else {
        bail!("'{arg}' is outside the working copy");
    };
    let path = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/");
    if path.is_empty() {
        bail!("'{arg}' is the working copy root, not a file");
    }
    Ok(path)
}
