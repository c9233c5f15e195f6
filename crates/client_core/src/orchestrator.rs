//! Drives the profile and repository slices through fetch lifecycles.

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use shared::{domain::Login, protocol::ServerRenderedData};
use tracing::{debug, info, warn};

use crate::{
    config::ClientSettings,
    gateway::RemoteUserGateway,
    pagination::{PaginationRequest, PaginationRequestBuilder},
    store::{UserDataState, UserDataStore},
};

/// Ticket identifying one dispatched request for a slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RequestTicket(u64);

#[derive(Debug, Default)]
struct TicketCounter(AtomicU64);

impl TicketCounter {
    fn issue(&self) -> RequestTicket {
        RequestTicket(self.0.fetch_add(1, Ordering::SeqCst) + 1)
    }

    fn is_latest(&self, ticket: RequestTicket) -> bool {
        self.0.load(Ordering::SeqCst) == ticket.0
    }
}

pub struct FetchOrchestrator {
    gateway: Arc<dyn RemoteUserGateway>,
    store: UserDataStore,
    pagination: PaginationRequestBuilder,
    discard_stale_responses: bool,
    profile_tickets: TicketCounter,
    repositories_tickets: TicketCounter,
}

impl FetchOrchestrator {
    pub fn new(gateway: Arc<dyn RemoteUserGateway>, store: UserDataStore) -> Self {
        Self::with_settings(gateway, store, &ClientSettings::default())
    }

    pub fn with_settings(
        gateway: Arc<dyn RemoteUserGateway>,
        store: UserDataStore,
        settings: &ClientSettings,
    ) -> Self {
        Self {
            gateway,
            store,
            pagination: PaginationRequestBuilder::new(settings.default_per_page),
            discard_stale_responses: settings.discard_stale_responses,
            profile_tickets: TicketCounter::default(),
            repositories_tickets: TicketCounter::default(),
        }
    }

    pub fn store(&self) -> &UserDataStore {
        &self.store
    }

    pub fn snapshot(&self) -> UserDataState {
        self.store.snapshot()
    }

    /// Starts over with empty slices for `login`.
    ///
    /// Results of requests still in flight are committed when they land unless
    /// stale responses are discarded.
    pub fn reset(&self, login: impl Into<Login>) {
        let login = login.into();
        debug!(%login, "user: resetting slices");
        self.profile_tickets.issue();
        self.repositories_tickets.issue();
        self.store.replace(UserDataState::initialize(login));
    }

    /// Commits data fetched upstream without contacting the gateway.
    pub fn hydrate_from_server_data(&self, data: ServerRenderedData) {
        let ServerRenderedData {
            profile,
            repositories,
        } = data;
        info!(
            repositories = repositories.data.len(),
            page = repositories.infos.page,
            "user: hydrating from server-rendered data"
        );
        self.profile_tickets.issue();
        self.repositories_tickets.issue();
        self.store.apply(move |state| {
            let login = state.repositories.pristine_login.clone();
            state
                .resolve_profile_success(profile)
                .resolve_repositories_success(login, repositories)
        });
    }

    /// Fetches the profile and the first repository page of `login` concurrently.
    pub async fn load_for_username(&self, login: impl Into<Login>) {
        let login = login.into();
        info!(%login, "user: loading profile and repositories");

        let profile_ticket = self.profile_tickets.issue();
        let repositories_ticket = self.repositories_tickets.issue();
        self.store
            .apply(|state| state.begin_profile_fetch().begin_repositories_fetch());

        let request = self.pagination.first_page(login.clone());
        tokio::join!(
            self.fetch_profile(profile_ticket, login),
            self.fetch_repositories(repositories_ticket, request),
        );
    }

    /// Fetches `requested_page` for the login the repository slice was last loaded for.
    pub async fn goto_page(&self, requested_page: u32) {
        let ticket = self.repositories_tickets.issue();
        let request = self.store.apply_with(|state| {
            let request = self.pagination.build(&state.repositories, requested_page);
            (state.begin_repositories_fetch(), request)
        });
        self.fetch_repositories(ticket, request).await;
    }

    /// Reloads page 1 of the pristine login with a different page size.
    ///
    /// Sizes outside what the API accepts are clamped into `1..=100`.
    pub async fn change_per_page(&self, per_page: u32) {
        let ticket = self.repositories_tickets.issue();
        let request = self.store.apply_with(|state| {
            let request = self.pagination.build_resized(&state.repositories, per_page);
            (state.begin_repositories_fetch(), request)
        });
        self.fetch_repositories(ticket, request).await;
    }

    fn accepts(&self, counter: &TicketCounter, ticket: RequestTicket) -> bool {
        !self.discard_stale_responses || counter.is_latest(ticket)
    }

    async fn fetch_profile(&self, ticket: RequestTicket, login: Login) {
        let result = self.gateway.get_profile(&login).await;
        if !self.accepts(&self.profile_tickets, ticket) {
            debug!(%login, "user: discarding stale profile response");
            return;
        }

        match result {
            Ok(response) => {
                debug!(%login, "user: profile loaded");
                self.store
                    .apply(move |state| state.resolve_profile_success(response.data));
            }
            Err(err) => {
                warn!(%login, error = %err, "user: profile fetch failed");
                let message = err.human_message();
                self.store
                    .apply(move |state| state.resolve_profile_error(message));
            }
        }
    }

    async fn fetch_repositories(&self, ticket: RequestTicket, request: PaginationRequest) {
        let PaginationRequest { login, params } = request;
        let result = self.gateway.get_repositories(&login, &params).await;
        if !self.accepts(&self.repositories_tickets, ticket) {
            debug!(
                %login,
                page = params.page,
                "user: discarding stale repositories response"
            );
            return;
        }

        match result {
            Ok(page) => {
                debug!(
                    %login,
                    page = page.infos.page,
                    per_page = page.infos.per_page,
                    count = page.data.len(),
                    "user: repositories loaded"
                );
                self.store
                    .apply(move |state| state.resolve_repositories_success(login, page));
            }
            Err(err) => {
                warn!(
                    %login,
                    page = params.page,
                    error = %err,
                    "user: repositories fetch failed"
                );
                let message = err.human_message();
                self.store
                    .apply(move |state| state.resolve_repositories_error(message));
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/orchestrator_tests.rs"]
mod tests;
