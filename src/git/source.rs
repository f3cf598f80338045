use std::{
    cell::Cell,
    os::raw::c_int,
    path::Path,
    time::{Duration, Instant},
};

use git2::{
    build::RepoBuilder, AutotagOption, Config, Cred, CredentialType, ErrorCode, FetchOptions,
    RemoteCallbacks, Repository,
};
use log::{debug, trace, warn};

use super::{RepositorySource, SourceError, WorkingCopy};

/// Clones and inspects repositories with libgit2.
pub struct GitSource {
    git_config: Option<Config>,
    timeout: Option<Duration>,
}

impl GitSource {
    /// `timeout` bounds a single clone. It caps the connect and every socket
    /// read, and the transfer as a whole. `None` waits for as long as the
    /// transfer takes.
    ///
    /// libgit2 keeps the socket timeouts process-wide, so the most recently
    /// created source with a timeout sets them for every clone.
    pub fn new(timeout: Option<Duration>) -> GitSource {
        let git_config = match Config::open_default() {
            Ok(config) => Some(config),
            Err(error) => {
                debug!("No default git configuration available: {}", error);
                None
            }
        };
        if let Some(timeout) = timeout {
            set_server_timeouts(timeout);
        }
        GitSource {
            git_config,
            timeout,
        }
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    fn fetch_options<'a>(
        &'a self,
        deadline: Option<Instant>,
        expired: &'a Cell<bool>,
    ) -> FetchOptions<'a> {
        let mut callbacks = RemoteCallbacks::new();
        callbacks.credentials(move |url, username, allowed_types| {
            trace!(
                "Requested credentials for {}, username {:?}, allowed types {:?}",
                url,
                username,
                allowed_types
            );
            if allowed_types.contains(CredentialType::USERNAME) {
                return Cred::username("git");
            }
            if allowed_types.contains(CredentialType::SSH_KEY) {
                return Cred::ssh_key_from_agent(username.unwrap_or("git"));
            }
            if allowed_types.contains(CredentialType::USER_PASS_PLAINTEXT) {
                if let Some(git_config) = &self.git_config {
                    return Cred::credential_helper(git_config, url, username);
                }
            }
            Err(git2::Error::from_str("no valid authentication available"))
        });

        // Returning false from the progress callback aborts the transfer.
        callbacks.transfer_progress(move |progress| match deadline {
            Some(deadline) if Instant::now() >= deadline => {
                trace!(
                    "Transfer deadline passed after {}/{} objects",
                    progress.received_objects(),
                    progress.total_objects()
                );
                expired.set(true);
                false
            }
            _ => true,
        });

        let mut fetch_options = FetchOptions::new();
        fetch_options
            .remote_callbacks(callbacks)
            .download_tags(AutotagOption::None);
        fetch_options
    }
}

fn set_server_timeouts(timeout: Duration) {
    let millis = c_int::try_from(timeout.as_millis()).unwrap_or(c_int::MAX);
    // SAFETY: both setters store a single integer in libgit2's global options.
    // A clone racing with the store reads either the old or the new value.
    let applied = unsafe {
        git2::opts::set_server_connect_timeout_in_milliseconds(millis)
            .and_then(|_| git2::opts::set_server_timeout_in_milliseconds(millis))
    };
    if let Err(error) = applied {
        warn!("Could not apply a {}ms server timeout: {}", millis, error);
    }
}

impl RepositorySource for GitSource {
    fn acquire(&self, locator: &str, destination: &Path) -> Result<(), SourceError> {
        let deadline = self.timeout.map(|timeout| Instant::now() + timeout);
        let expired = Cell::new(false);

        let mut builder = RepoBuilder::new();
        builder.fetch_options(self.fetch_options(deadline, &expired));

        trace!("Cloning {} into {}", locator, destination.display());
        match builder.clone(locator, destination) {
            Ok(_) => Ok(()),
            Err(error)
                if expired.get()
                    || error.code() == ErrorCode::Timeout
                    || deadline.is_some_and(|at| Instant::now() >= at) =>
            {
                debug!("Clone of {} gave up at its deadline: {}", locator, error);
                Err(SourceError::TimedOut {
                    after: self.timeout.unwrap_or_default(),
                })
            }
            Err(error) => Err(error.into()),
        }
    }

    fn inspect(&self, workspace: &Path) -> Result<WorkingCopy, SourceError> {
        trace!("Opening existing repository at {}", workspace.display());
        let repo = Repository::open(workspace)?;

        let origin = match repo.find_remote("origin") {
            Ok(remote) => remote.url().map(str::to_owned),
            Err(error) if error.code() == ErrorCode::NotFound => None,
            Err(error) => return Err(error.into()),
        };

        Ok(WorkingCopy {
            bare: repo.is_bare(),
            empty: repo.is_empty()?,
            origin,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;

    #[test]
    fn inspect_reports_origin_of_fresh_repository() {
        let dir = tempfile::tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        repo.remote("origin", "https://github.com/example/repo")
            .unwrap();

        let copy = GitSource::new(None).inspect(dir.path()).unwrap();
        assert_eq!(
            copy,
            WorkingCopy {
                bare: false,
                empty: true,
                origin: Some("https://github.com/example/repo".to_owned()),
            }
        );
    }

    #[test]
    fn inspect_without_origin() {
        let dir = tempfile::tempdir().unwrap();
        Repository::init_bare(dir.path()).unwrap();

        let copy = GitSource::new(None).inspect(dir.path()).unwrap();
        assert!(copy.bare);
        assert_eq!(copy.origin, None);
    }

    #[test]
    fn inspect_plain_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(GitSource::new(None).inspect(dir.path()).is_err());
    }

    #[test]
    fn acquire_missing_local_source_fails() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing");
        let destination = dir.path().join("clone");
        std::fs::create_dir(&destination).unwrap();

        let result = GitSource::new(None).acquire(missing.to_str().unwrap(), &destination);
        assert!(matches!(result, Err(SourceError::Git(_))));
    }
}
