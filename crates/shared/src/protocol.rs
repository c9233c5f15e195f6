use serde::{Deserialize, Serialize};

use crate::domain::RepositorySort;

/// Page size used for the very first repository fetch of a user.
pub const DEFAULT_PER_PAGE: u32 = 15;

/// Largest page size the remote API honours.
pub const MAX_PER_PAGE: u32 = 100;

/// Profile document as returned by the remote API. Interpreted by the view only.
pub type ProfileRecord = serde_json::Value;

/// Repository document as returned by the remote API. Interpreted by the view only.
pub type RepositoryRecord = serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationParams {
    pub page: u32,
    pub sort: RepositorySort,
    pub per_page: u32,
}

impl PaginationParams {
    pub fn first_page(per_page: u32) -> Self {
        Self {
            page: 1,
            sort: RepositorySort::Updated,
            per_page,
        }
    }

    pub fn query_pairs(&self) -> [(&'static str, String); 3] {
        [
            ("page", self.page.to_string()),
            ("sort", self.sort.as_str().to_string()),
            ("per_page", self.per_page.to_string()),
        ]
    }
}

/// Page numbers advertised by an RFC 5988 `Link` header.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageLinks {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prev: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last: Option<u32>,
}

impl PageLinks {
    /// Parses `<https://host/path?page=2&per_page=15>; rel="next", ...`.
    ///
    /// Entries without a `page` query parameter or with an unknown relation
    /// are ignored.
    pub fn parse_link_header(header: &str) -> Self {
        let mut links = Self::default();
        for entry in header.split(',') {
            let mut parts = entry.split(';');
            let Some(target) = parts.next() else {
                continue;
            };
            let target = target.trim();
            let Some(url) = target
                .strip_prefix('<')
                .and_then(|rest| rest.strip_suffix('>'))
            else {
                continue;
            };
            let Some(page) = page_query_param(url) else {
                continue;
            };

            for param in parts {
                let Some((key, value)) = param.trim().split_once('=') else {
                    continue;
                };
                if key.trim() != "rel" {
                    continue;
                }
                for rel in value.trim().trim_matches('"').split_whitespace() {
                    match rel {
                        "first" => links.first = Some(page),
                        "prev" => links.prev = Some(page),
                        "next" => links.next = Some(page),
                        "last" => links.last = Some(page),
                        _ => {}
                    }
                }
            }
        }
        links
    }
}

fn page_query_param(url: &str) -> Option<u32> {
    let (_, query) = url.split_once('?')?;
    let query = query.split('#').next().unwrap_or_default();
    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| *key == "page")
        .and_then(|(_, value)| value.parse().ok())
}

/// Pagination metadata of one repository page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageInfos {
    pub page: u32,
    pub per_page: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
    #[serde(default)]
    pub links: PageLinks,
}

impl PageInfos {
    /// Derives metadata for a page fetched with `params` that held `item_count` items.
    ///
    /// `total` is exact on the last page and an upper bound when only the
    /// `last` link is known. An empty page past the first says nothing about
    /// how many items precede it.
    pub fn from_page(params: &PaginationParams, links: PageLinks, item_count: usize) -> Self {
        let per_page = u64::from(params.per_page);
        let past_the_end = item_count == 0 && params.page > 1;
        let total = if links.next.is_none() && !past_the_end {
            let preceding = u64::from(params.page.saturating_sub(1)) * per_page;
            Some(preceding + item_count as u64)
        } else {
            links.last.map(|last| u64::from(last) * per_page)
        };
        Self {
            page: params.page,
            per_page: params.per_page,
            total,
            links,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileResponse {
    pub data: ProfileRecord,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepositoryPage {
    pub data: Vec<RepositoryRecord>,
    pub infos: PageInfos,
}

/// Data fetched upstream (e.g. during server-side rendering) and handed to the client as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerRenderedData {
    pub profile: ProfileRecord,
    pub repositories: RepositoryPage,
}

#[cfg(test)]
mod tests {
    use super::*;

    const LINK: &str = "<https://api.github.com/user/583231/repos?page=2&per_page=15&sort=updated>; rel=\"next\", \
        <https://api.github.com/user/583231/repos?page=3&per_page=15&sort=updated>; rel=\"last\"";

    #[test]
    fn parses_next_and_last_links() {
        let links = PageLinks::parse_link_header(LINK);
        assert_eq!(links.next, Some(2));
        assert_eq!(links.last, Some(3));
        assert_eq!(links.prev, None);
        assert_eq!(links.first, None);
    }

    #[test]
    fn per_page_param_is_not_mistaken_for_page() {
        let links = PageLinks::parse_link_header(
            "<https://api.github.com/users/x/repos?per_page=15&page=4>; rel=\"prev\"",
        );
        assert_eq!(links.prev, Some(4));
    }

    #[test]
    fn garbage_header_yields_no_links() {
        assert_eq!(PageLinks::parse_link_header("nonsense"), PageLinks::default());
        assert_eq!(PageLinks::parse_link_header(""), PageLinks::default());
    }

    #[test]
    fn total_is_exact_on_last_page() {
        let params = PaginationParams {
            page: 3,
            sort: RepositorySort::Updated,
            per_page: 15,
        };
        let links = PageLinks {
            first: Some(1),
            prev: Some(2),
            next: None,
            last: None,
        };
        let infos = PageInfos::from_page(&params, links, 12);
        assert_eq!(infos.total, Some(42));
        assert_eq!(infos.page, 3);
    }

    #[test]
    fn total_is_bounded_by_last_link_mid_listing() {
        let infos = PageInfos::from_page(
            &PaginationParams::first_page(DEFAULT_PER_PAGE),
            PageLinks::parse_link_header(LINK),
            15,
        );
        assert_eq!(infos.total, Some(45));
        assert_eq!(infos.per_page, 15);
    }

    #[test]
    fn empty_page_past_the_end_does_not_invent_a_total() {
        let params = PaginationParams {
            page: 10,
            sort: RepositorySort::Updated,
            per_page: 15,
        };
        let links = PageLinks {
            first: Some(1),
            prev: Some(9),
            next: None,
            last: Some(3),
        };
        let infos = PageInfos::from_page(&params, links, 0);
        assert_eq!(infos.total, Some(45));
        assert_eq!(infos.page, 10);

        let infos = PageInfos::from_page(&params, PageLinks::default(), 0);
        assert_eq!(infos.total, None);
    }

    #[test]
    fn empty_first_page_means_no_items() {
        let infos = PageInfos::from_page(
            &PaginationParams::first_page(DEFAULT_PER_PAGE),
            PageLinks::default(),
            0,
        );
        assert_eq!(infos.total, Some(0));
    }

    #[test]
    fn first_page_params_sort_by_update_time() {
        let params = PaginationParams::first_page(30);
        assert_eq!(
            params.query_pairs(),
            [
                ("page", "1".to_string()),
                ("sort", "updated".to_string()),
                ("per_page", "30".to_string()),
            ]
        );
    }
}
