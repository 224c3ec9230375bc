//! Remote operations.
//!
//! Fetch only updates remote-tracking refs. Its failures are folded into the
//! three kinds callers know how to ignore: [`Error::AuthRequired`],
//! [`Error::NoPrivateAccess`] and [`Error::RemoteUnavailable`].

use std::cell::Cell;

use git2::{Cred, CredentialType, ErrorClass, ErrorCode, FetchOptions, RemoteCallbacks};

use crate::Repository;
use crate::error::{Error, Result};

/// Give up after this many credential callbacks; libgit2 keeps asking otherwise.
const MAX_CREDENTIAL_ATTEMPTS: usize = 3;

impl Repository {
    /// Name of the remote the current branch fetches from.
    ///
    /// Falls back to the configured default remote when the branch has no
    /// `branch.<name>.remote` entry or HEAD is detached.
    #[must_use]
    pub fn fetch_remote_name(&self) -> String {
        self.full_branch()
            .ok()
            .flatten()
            .and_then(|refname| self.inner().branch_upstream_remote(&refname).ok())
            .and_then(|buf| buf.as_str().map(String::from))
            .unwrap_or_else(|| self.default_remote().to_string())
    }

    /// Fetch the current branch's remote, updating remote-tracking refs.
    ///
    /// Local branches are never touched.
    ///
    /// # Errors
    /// Returns `AuthRequired`, `NoPrivateAccess` or `RemoteUnavailable`.
    pub fn fetch(&self) -> Result<()> {
        let remote_name = self.fetch_remote_name();
        let mut remote = self
            .inner()
            .find_remote(&remote_name)
            .map_err(|e| Error::RemoteUnavailable {
                remote: remote_name.clone(),
                message: e.message().to_string(),
            })?;

        let config = self.inner().config().ok();
        let attempts = Cell::new(0_usize);

        let mut callbacks = RemoteCallbacks::new();
        callbacks.credentials(|url, username_from_url, allowed| {
            attempts.set(attempts.get() + 1);
            if attempts.get() > MAX_CREDENTIAL_ATTEMPTS {
                return Err(git2::Error::new(
                    ErrorCode::Auth,
                    ErrorClass::Callback,
                    "no usable credentials",
                ));
            }

            let username = username_from_url.unwrap_or("git");
            if allowed.contains(CredentialType::SSH_KEY) {
                Cred::ssh_key_from_agent(username)
            } else if allowed.contains(CredentialType::USER_PASS_PLAINTEXT) {
                config.as_ref().map_or_else(
                    || Err(git2::Error::from_str("no git config for credential helper")),
                    |config| Cred::credential_helper(config, url, username_from_url),
                )
            } else {
                Cred::default()
            }
        });

        let mut opts = FetchOptions::new();
        opts.remote_callbacks(callbacks);

        log::debug!("fetching from {remote_name}");
        remote
            .fetch(&[] as &[&str], Some(&mut opts), None)
            .map_err(|e| classify_fetch_error(&remote_name, &e))
    }
}

/// Map a libgit2 fetch failure onto the fetch failure kinds.
fn classify_fetch_error(remote: &str, err: &git2::Error) -> Error {
    let message = err.message().to_ascii_lowercase();

    if message.contains("403") || message.contains("404") || message.contains("not found") {
        return Error::NoPrivateAccess(remote.to_string());
    }

    if err.code() == ErrorCode::Auth
        || (err.class() == ErrorClass::Ssh && message.contains("auth"))
        || message.contains("401")
        || message.contains("authentication")
        || message.contains("credentials")
        || message.contains("passphrase")
    {
        return Error::AuthRequired(remote.to_string());
    }

    Error::RemoteUnavailable {
        remote: remote.to_string(),
        message: err.message().to_string(),
    }
}
