//! Registration and profile maintenance.
//!
//! The remote store holds the profile of record. A [`LocalMirror`] keeps a
//! copy on the device; writing it is best effort and never fails a flow.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use tracing::{info, instrument, warn};
use tuckbox_core::{CredentialError, Email, Password, ProfileChanges, UserId, UserProfile};

use crate::auth::{Session, SessionManager};
use crate::store::{RemoteDataGateway, StoreError, recheck_once};

/// Local mirror failures.
#[derive(Debug, Error)]
pub enum MirrorError {
    #[error("mirror I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("mirror encoding failed: {0}")]
    Encode(#[from] serde_json::Error),
}

/// On-device copy of the signed-in user's profile.
#[async_trait]
pub trait LocalMirror: Send + Sync {
    async fn save_profile(&self, profile: &UserProfile) -> Result<(), MirrorError>;
    async fn load_profile(&self, user_id: &UserId) -> Result<Option<UserProfile>, MirrorError>;
}

/// Why a profile flow did not complete.
#[derive(Debug, Error)]
pub enum ProfileError {
    #[error(transparent)]
    InvalidCredentials(#[from] CredentialError),

    #[error("first name is required")]
    FirstNameRequired,

    #[error("sign-up failed")]
    SignUpFailed,

    #[error("not signed in")]
    NotSignedIn,

    #[error("no profile stored for this user")]
    NotFound,

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ProfileError {
    /// Text suitable for showing to the user.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidCredentials(CredentialError::PasswordTooShort { min }) => {
                format!("Password must be at least {min} characters.")
            }
            Self::InvalidCredentials(_) => "Please enter a valid email address.".to_string(),
            Self::FirstNameRequired => "Please enter your first name.".to_string(),
            Self::SignUpFailed => "Registration failed. Please try again.".to_string(),
            Self::NotSignedIn => "Please sign in first.".to_string(),
            Self::NotFound => "Your profile could not be loaded.".to_string(),
            Self::Store(_) => "We couldn't save your details. Please try again.".to_string(),
        }
    }
}

/// The registration form.
#[derive(Debug, Clone)]
pub struct Registration {
    pub email: String,
    pub password: SecretString,
    pub first_name: String,
    pub last_name: String,
    pub mobile: String,
}

/// Create an account, sign into it and write the initial profile.
///
/// The profile write is retried once if the store has not yet accepted the
/// fresh token.
///
/// # Errors
///
/// Returns `InvalidCredentials` or `FirstNameRequired` before any network
/// call, `SignUpFailed` if the identity provider refuses, or the store
/// error if the profile cannot be written.
#[instrument(skip_all, fields(email = %form.email))]
pub async fn register(
    sessions: &mut SessionManager,
    gateway: &RemoteDataGateway,
    mirror: &dyn LocalMirror,
    form: &Registration,
    propagation_delay: Duration,
    now: DateTime<Utc>,
) -> Result<UserProfile, ProfileError> {
    let email = Email::parse(&form.email)?;
    Password::parse(form.password.expose_secret())?;
    if form.first_name.trim().is_empty() {
        return Err(ProfileError::FirstNameRequired);
    }

    let user_id = sessions
        .sign_up(email.as_str(), form.password.expose_secret())
        .await
        .ok_or(ProfileError::SignUpFailed)?;
    let session = sessions.session().ok_or(ProfileError::NotSignedIn)?;

    let profile = UserProfile::new(
        user_id,
        &email,
        &form.first_name,
        &form.last_name,
        &form.mobile,
        now,
    );
    let profile_ref = &profile;
    recheck_once(propagation_delay, move || {
        gateway.upsert_user_profile(session, profile_ref)
    })
    .await?;

    mirror_best_effort(mirror, &profile).await;
    info!(user_id = %profile.user_id, "registered");
    Ok(profile)
}

/// The signed-in user's stored profile.
///
/// # Errors
///
/// Returns `NotSignedIn`, `NotFound`, or the store error.
pub async fn load_profile(
    gateway: &RemoteDataGateway,
    session: Option<&Session>,
) -> Result<UserProfile, ProfileError> {
    let session = session.ok_or(ProfileError::NotSignedIn)?;
    gateway
        .get_user_profile(session, session.user_id())
        .await?
        .ok_or(ProfileError::NotFound)
}

/// Apply form changes to the stored profile.
///
/// # Errors
///
/// Returns `NotSignedIn` or `FirstNameRequired` before any network call,
/// `NotFound` if no profile is stored, or the store error.
#[instrument(skip_all)]
pub async fn update_profile(
    gateway: &RemoteDataGateway,
    mirror: &dyn LocalMirror,
    session: Option<&Session>,
    changes: ProfileChanges,
    now: DateTime<Utc>,
) -> Result<UserProfile, ProfileError> {
    let session = session.ok_or(ProfileError::NotSignedIn)?;
    if changes.first_name.trim().is_empty() {
        return Err(ProfileError::FirstNameRequired);
    }

    let mut profile = load_profile(gateway, Some(session)).await?;
    profile.apply(changes, now);
    gateway.upsert_user_profile(session, &profile).await?;

    mirror_best_effort(mirror, &profile).await;
    info!(user_id = %profile.user_id, "profile updated");
    Ok(profile)
}

async fn mirror_best_effort(mirror: &dyn LocalMirror, profile: &UserProfile) {
    if let Err(e) = mirror.save_profile(profile).await {
        warn!(user_id = %profile.user_id, error = %e, "local mirror not updated");
    }
}
