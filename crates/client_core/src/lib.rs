//! Orchestration of a code-hosting user's profile and repository listing.
//!
//! [`FetchOrchestrator`] fetches through a [`RemoteUserGateway`] and commits
//! every outcome into a [`UserDataStore`], whose snapshot is what a view
//! renders.

pub mod config;
pub mod gateway;
pub mod orchestrator;
pub mod pagination;
pub mod store;

pub use config::{ClientSettings, SettingsError};
pub use gateway::{GatewayInitError, HttpUserGateway, RemoteUserGateway};
pub use orchestrator::FetchOrchestrator;
pub use pagination::{PaginationRequest, PaginationRequestBuilder};
pub use store::{ProfileSlice, RepositoriesSlice, UserDataState, UserDataStore};
