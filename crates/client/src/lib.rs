//! TuckBox client library.
//!
//! Signs users in, keeps the session, and reads and writes the remote
//! store. Front-ends (the CLI, tests) supply configuration, a transport and,
//! for federated sign-in, a user agent.
//!
//! # Modules
//!
//! - [`auth`] - `SessionManager`, identity provider calls, OAuth PKCE
//! - [`store`] - `RemoteDataGateway` and order assembly
//! - [`flows`] - order placement, registration, profile, history
//! - [`transport`] - the HTTP seam
//! - [`config`] - `ClientConfig`

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod auth;
pub mod config;
pub mod flows;
pub mod store;
pub mod transport;

pub use auth::{OAuthSignIn, Session, SessionManager, SessionState};
pub use config::ClientConfig;
pub use store::{FailureMode, RemoteDataGateway, StoreError};
pub use transport::{HttpTransport, ReqwestTransport};
