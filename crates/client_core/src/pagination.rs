use shared::{
    domain::{Login, RepositorySort},
    protocol::{PaginationParams, DEFAULT_PER_PAGE, MAX_PER_PAGE},
};

use tracing::warn;

use crate::store::RepositoriesSlice;

/// Page sizes outside `1..=MAX_PER_PAGE` are pulled back into range.
fn clamp_per_page(per_page: u32) -> u32 {
    let clamped = per_page.clamp(1, MAX_PER_PAGE);
    if clamped != per_page {
        warn!(requested = per_page, used = clamped, "user: page size out of range");
    }
    clamped
}

/// A repository page request: who to ask for, and which page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaginationRequest {
    pub login: Login,
    pub params: PaginationParams,
}

#[derive(Debug, Clone, Copy)]
pub struct PaginationRequestBuilder {
    default_per_page: u32,
}

impl Default for PaginationRequestBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_PER_PAGE)
    }
}

impl PaginationRequestBuilder {
    pub fn new(default_per_page: u32) -> Self {
        Self {
            default_per_page: clamp_per_page(default_per_page),
        }
    }

    pub fn default_per_page(&self) -> u32 {
        self.default_per_page
    }

    /// Request for page 1 of a user that has no pagination context yet.
    pub fn first_page(&self, login: Login) -> PaginationRequest {
        PaginationRequest {
            login,
            params: PaginationParams::first_page(self.default_per_page),
        }
    }

    /// Follow-up request against the slice's pristine login.
    ///
    /// `requested_page` is forwarded untouched, including zero or pages past
    /// the end; the page size comes from the last successful `infos`.
    pub fn build(&self, slice: &RepositoriesSlice, requested_page: u32) -> PaginationRequest {
        let per_page = slice
            .infos
            .as_ref()
            .map(|infos| clamp_per_page(infos.per_page))
            .unwrap_or(self.default_per_page);
        PaginationRequest {
            login: slice.pristine_login.clone(),
            params: PaginationParams {
                page: requested_page,
                sort: RepositorySort::Updated,
                per_page,
            },
        }
    }

    /// Restart from page 1 with a new page size, clamped to what the API accepts.
    pub fn build_resized(&self, slice: &RepositoriesSlice, per_page: u32) -> PaginationRequest {
        PaginationRequest {
            login: slice.pristine_login.clone(),
            params: PaginationParams::first_page(clamp_per_page(per_page)),
        }
    }
}

#[cfg(test)]
mod tests {
    use shared::protocol::{PageInfos, PageLinks};

    use super::*;
    use crate::store::UserDataState;

    fn slice_with_infos(login: &str, per_page: u32) -> RepositoriesSlice {
        let mut slice = UserDataState::initialize(login).repositories;
        slice.infos = Some(PageInfos {
            page: 1,
            per_page,
            total: Some(42),
            links: PageLinks::default(),
        });
        slice
    }

    #[test]
    fn falls_back_to_default_page_size_without_infos() {
        let slice = UserDataState::initialize("octocat").repositories;
        let request = PaginationRequestBuilder::default().build(&slice, 2);
        assert_eq!(request.login, Login::from("octocat"));
        assert_eq!(request.params.per_page, DEFAULT_PER_PAGE);
        assert_eq!(request.params.sort, RepositorySort::Updated);
        assert_eq!(request.params.page, 2);
    }

    #[test]
    fn reuses_page_size_learned_from_infos() {
        let slice = slice_with_infos("octocat", 30);
        let request = PaginationRequestBuilder::default().build(&slice, 3);
        assert_eq!(request.params.per_page, 30);
        assert_eq!(request.params.page, 3);
    }

    #[test]
    fn out_of_range_pages_are_passed_through() {
        let slice = slice_with_infos("octocat", 15);
        let builder = PaginationRequestBuilder::default();
        assert_eq!(builder.build(&slice, 0).params.page, 0);
        assert_eq!(builder.build(&slice, 999).params.page, 999);
    }

    #[test]
    fn resize_restarts_at_first_page_for_pristine_login() {
        let slice = slice_with_infos("hubot", 15);
        let request = PaginationRequestBuilder::default().build_resized(&slice, 50);
        assert_eq!(request.login, Login::from("hubot"));
        assert_eq!(request.params, PaginationParams::first_page(50));
    }

    #[test]
    fn resize_clamps_page_size_into_api_range() {
        let slice = slice_with_infos("octocat", 15);
        let builder = PaginationRequestBuilder::default();
        assert_eq!(builder.build_resized(&slice, 0).params.per_page, 1);
        assert_eq!(builder.build_resized(&slice, 500).params.per_page, MAX_PER_PAGE);
        assert_eq!(builder.build_resized(&slice, 100).params.per_page, 100);
    }

    #[test]
    fn zero_page_size_in_infos_is_not_reused() {
        let slice = slice_with_infos("octocat", 0);
        let request = PaginationRequestBuilder::default().build(&slice, 2);
        assert_eq!(request.params.per_page, 1);
        assert_eq!(PaginationRequestBuilder::new(0).default_per_page(), 1);
    }
}
