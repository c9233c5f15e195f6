//! Profile and repository slices plus the handle that publishes their snapshots.
//!
//! Every transition on [`UserDataState`] is pure: it borrows the current
//! snapshot and returns the next one. [`UserDataStore`] swaps snapshots
//! atomically so readers never observe a half-applied transition.

use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use shared::{
    domain::Login,
    protocol::{PageInfos, ProfileRecord, RepositoryPage, RepositoryRecord},
};
use tokio::sync::{broadcast, watch};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileSlice {
    pub pristine_login: Login,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<ProfileRecord>,
    pub fetching: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ProfileSlice {
    fn empty(login: Login) -> Self {
        Self {
            pristine_login: login,
            data: None,
            fetching: false,
            error: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepositoriesSlice {
    /// Login the last dispatched or successful repository request targeted.
    pub pristine_login: Login,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Vec<RepositoryRecord>>,
    /// Kept across failed fetches so pagination context survives an error.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub infos: Option<PageInfos>,
    pub fetching: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RepositoriesSlice {
    fn empty(login: Login) -> Self {
        Self {
            pristine_login: login,
            data: None,
            infos: None,
            fetching: false,
            error: None,
        }
    }
}

/// Snapshot handed to the view layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserDataState {
    pub profile: ProfileSlice,
    pub repositories: RepositoriesSlice,
}

impl UserDataState {
    pub fn initialize(login: impl Into<Login>) -> Self {
        let login = login.into();
        Self {
            profile: ProfileSlice::empty(login.clone()),
            repositories: RepositoriesSlice::empty(login),
        }
    }

    pub fn begin_profile_fetch(&self) -> Self {
        let mut next = self.clone();
        next.profile.fetching = true;
        next
    }

    pub fn resolve_profile_success(&self, data: ProfileRecord) -> Self {
        let mut next = self.clone();
        next.profile = ProfileSlice {
            pristine_login: self.profile.pristine_login.clone(),
            data: Some(data),
            fetching: false,
            error: None,
        };
        next
    }

    pub fn resolve_profile_error(&self, message: impl Into<String>) -> Self {
        let mut next = self.clone();
        next.profile = ProfileSlice {
            pristine_login: self.profile.pristine_login.clone(),
            data: None,
            fetching: false,
            error: Some(message.into()),
        };
        next
    }

    pub fn begin_repositories_fetch(&self) -> Self {
        let mut next = self.clone();
        next.repositories.fetching = true;
        next
    }

    /// Commits a fetched page for `login`, which becomes the new pristine login.
    pub fn resolve_repositories_success(&self, login: Login, page: RepositoryPage) -> Self {
        let mut next = self.clone();
        next.repositories = RepositoriesSlice {
            pristine_login: login,
            data: Some(page.data),
            infos: Some(page.infos),
            fetching: false,
            error: None,
        };
        next
    }

    pub fn resolve_repositories_error(&self, message: impl Into<String>) -> Self {
        let mut next = self.clone();
        next.repositories = RepositoriesSlice {
            pristine_login: self.repositories.pristine_login.clone(),
            data: None,
            infos: self.repositories.infos.clone(),
            fetching: false,
            error: Some(message.into()),
        };
        next
    }
}

/// Shared handle over the current [`UserDataState`].
///
/// Clones share the same snapshot; the orchestrator and the view each hold one.
/// The watch side always holds the latest snapshot, while the commit log
/// carries every committed snapshot in order.
#[derive(Debug, Clone)]
pub struct UserDataStore {
    tx: Arc<watch::Sender<UserDataState>>,
    commits: broadcast::Sender<UserDataState>,
    commit: Arc<Mutex<()>>,
}

impl UserDataStore {
    pub fn new(initial: UserDataState) -> Self {
        let (tx, _) = watch::channel(initial);
        let (commits, _) = broadcast::channel(1024);
        Self {
            tx: Arc::new(tx),
            commits,
            commit: Arc::new(Mutex::new(())),
        }
    }

    pub fn for_login(login: impl Into<Login>) -> Self {
        Self::new(UserDataState::initialize(login))
    }

    pub fn snapshot(&self) -> UserDataState {
        self.tx.borrow().clone()
    }

    /// Receiver holding the latest snapshot; intermediate commits may be skipped.
    pub fn subscribe(&self) -> watch::Receiver<UserDataState> {
        self.tx.subscribe()
    }

    /// Receiver of every snapshot committed after this call, in commit order.
    pub fn subscribe_commits(&self) -> broadcast::Receiver<UserDataState> {
        self.commits.subscribe()
    }

    pub fn replace(&self, state: UserDataState) {
        self.apply(|_| state);
    }

    pub(crate) fn apply(&self, transition: impl FnOnce(&UserDataState) -> UserDataState) {
        self.apply_with(|state| (transition(state), ()));
    }

    /// Commits `transition` and hands back the value it computed alongside the new state.
    pub(crate) fn apply_with<R>(
        &self,
        transition: impl FnOnce(&UserDataState) -> (UserDataState, R),
    ) -> R {
        let _commit = self.commit.lock().unwrap_or_else(PoisonError::into_inner);
        let (next, output) = transition(&self.tx.borrow());
        // published while holding the commit guard so the log matches commit order
        let _ = self.commits.send(next.clone());
        self.tx.send_replace(next);
        output
    }
}

#[cfg(test)]
#[path = "tests/store_tests.rs"]
mod tests;
