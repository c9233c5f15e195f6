//! Access to the remote user API.

use async_trait::async_trait;
use reqwest::{
    header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, LINK, USER_AGENT},
    Client, Response, StatusCode,
};
use shared::{
    domain::Login,
    error::{ApiErrorBody, FetchError},
    protocol::{
        PageInfos, PageLinks, PaginationParams, ProfileRecord, ProfileResponse, RepositoryPage,
        RepositoryRecord,
    },
};
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

use crate::config::ClientSettings;

const ACCEPT_GITHUB_V3: &str = "application/vnd.github.v3+json";
const RATE_LIMIT_REMAINING: &str = "x-ratelimit-remaining";

#[async_trait]
pub trait RemoteUserGateway: Send + Sync {
    async fn get_profile(&self, login: &Login) -> Result<ProfileResponse, FetchError>;
    async fn get_repositories(
        &self,
        login: &Login,
        params: &PaginationParams,
    ) -> Result<RepositoryPage, FetchError>;
}

#[derive(Debug, Error)]
pub enum GatewayInitError {
    #[error("invalid api base url '{0}'")]
    InvalidBaseUrl(String),
    #[error("invalid header value for {0}")]
    InvalidHeader(&'static str),
    #[error("failed to build http client: {0}")]
    Client(#[from] reqwest::Error),
}

/// [`RemoteUserGateway`] over the GitHub REST API.
#[derive(Debug, Clone)]
pub struct HttpUserGateway {
    http: Client,
    base_url: Url,
}

impl HttpUserGateway {
    pub fn new(settings: &ClientSettings) -> Result<Self, GatewayInitError> {
        let base_url = Url::parse(&settings.api_base_url)
            .ok()
            .filter(|url| !url.cannot_be_a_base())
            .ok_or_else(|| GatewayInitError::InvalidBaseUrl(settings.api_base_url.clone()))?;

        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&settings.user_agent)
                .map_err(|_| GatewayInitError::InvalidHeader("user agent"))?,
        );
        headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_GITHUB_V3));
        if let Some(token) = &settings.access_token {
            let mut value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|_| GatewayInitError::InvalidHeader("access token"))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let http = Client::builder().default_headers(headers).build()?;
        Ok(Self { http, base_url })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, FetchError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| FetchError::Transport(format!("base url {} has no path", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

#[async_trait]
impl RemoteUserGateway for HttpUserGateway {
    async fn get_profile(&self, login: &Login) -> Result<ProfileResponse, FetchError> {
        let url = self.endpoint(&["users", login.as_str()])?;
        debug!(%login, %url, "github: requesting profile");

        let response = self.http.get(url).send().await.map_err(map_reqwest_error)?;
        let response = ensure_success(response).await?;
        let data: ProfileRecord = response.json().await.map_err(map_reqwest_error)?;
        Ok(ProfileResponse { data })
    }

    async fn get_repositories(
        &self,
        login: &Login,
        params: &PaginationParams,
    ) -> Result<RepositoryPage, FetchError> {
        let url = self.endpoint(&["users", login.as_str(), "repos"])?;
        debug!(
            %login,
            page = params.page,
            per_page = params.per_page,
            sort = %params.sort,
            "github: requesting repositories"
        );

        let response = self
            .http
            .get(url)
            .query(&params.query_pairs())
            .send()
            .await
            .map_err(map_reqwest_error)?;
        let response = ensure_success(response).await?;

        let links = response
            .headers()
            .get(LINK)
            .and_then(|value| value.to_str().ok())
            .map(PageLinks::parse_link_header)
            .unwrap_or_default();
        let data: Vec<RepositoryRecord> = response.json().await.map_err(map_reqwest_error)?;
        let infos = PageInfos::from_page(params, links, data.len());
        Ok(RepositoryPage { data, infos })
    }
}

async fn ensure_success(response: Response) -> Result<Response, FetchError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let rate_limited = response
        .headers()
        .get(RATE_LIMIT_REMAINING)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|remaining| remaining.trim() == "0");
    let body = response.text().await.unwrap_or_default();
    let message = human_message_for(status, &body);
    warn!(status = status.as_u16(), %message, "github: request failed");

    if rate_limited && matches!(status.as_u16(), 403 | 429) {
        Err(FetchError::rate_limited(status.as_u16(), message))
    } else {
        Err(FetchError::api(status.as_u16(), message))
    }
}

/// The API's own `message` when it sent one, otherwise the status reason phrase.
fn human_message_for(status: StatusCode, body: &str) -> String {
    serde_json::from_str::<ApiErrorBody>(body)
        .ok()
        .map(|body| body.message)
        .filter(|message| !message.trim().is_empty())
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("Request failed")
                .to_string()
        })
}

fn map_reqwest_error(err: reqwest::Error) -> FetchError {
    if err.is_decode() {
        FetchError::Decode(err.to_string())
    } else {
        FetchError::Transport(err.to_string())
    }
}

#[cfg(test)]
#[path = "tests/gateway_tests.rs"]
mod tests;
