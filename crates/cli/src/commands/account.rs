//! Account commands: registration and profile.
//!
//! # Usage
//!
//! ```bash
//! # Create an account and its profile
//! tuckbox sign-up -e ana@example.nz -p '...' --first-name Ana --last-name Lee --mobile "021 555 0100"
//!
//! # Show the stored profile
//! tuckbox --email ana@example.nz --password '...' profile
//!
//! # Change some fields; the rest keep their stored values
//! tuckbox --google update-profile --mobile "021 555 0199" --city Wellington
//! ```
//!
//! # Environment Variables
//!
//! - `TUCKBOX_MIRROR_DIR` - Where the local profile copy is written

use std::io::Write;

use chrono::Utc;
use secrecy::SecretString;
use tracing::warn;
use tuckbox_client::flows::{self, LocalMirror, ProfileError, Registration};
use tuckbox_core::{City, ProfileChanges, UserProfile};

use super::ordering::find;
use super::{AuthArgs, CommandError, Context};
use crate::mirror::JsonFileMirror;

/// Arguments of the `sign-up` command.
#[derive(Debug, Clone)]
pub struct SignUpArgs {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub mobile: String,
}

/// Arguments of the `update-profile` command. `None` keeps the stored value.
#[derive(Debug, Clone, Default)]
pub struct ProfileArgs {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub mobile: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
}

/// `tuckbox sign-up`
///
/// # Errors
///
/// Returns the profile error for bad input or a refused sign-up, or a
/// mirror error if the mirror directory cannot be created.
pub async fn sign_up(
    ctx: &mut Context,
    args: SignUpArgs,
    out: &mut impl Write,
) -> Result<(), CommandError> {
    let mirror = JsonFileMirror::open(&ctx.config.mirror_dir).await?;
    let form = Registration {
        email: args.email,
        password: SecretString::from(args.password),
        first_name: args.first_name,
        last_name: args.last_name,
        mobile: args.mobile,
    };

    let profile = flows::register(
        &mut ctx.sessions,
        &ctx.gateway,
        &mirror,
        &form,
        ctx.config.client.business.propagation_delay,
        Utc::now(),
    )
    .await?;

    writeln!(out, "Welcome, {}!", profile.display_name())?;
    writeln!(out, "Your user id is {}.", profile.user_id)?;
    Ok(())
}

/// `tuckbox profile`
///
/// Falls back to the local copy, marked as such, when the store cannot be
/// reached.
///
/// # Errors
///
/// Returns sign-in failures or the profile error when there is no local
/// copy to fall back on.
pub async fn show_profile(
    ctx: &mut Context,
    auth: &AuthArgs,
    out: &mut impl Write,
) -> Result<(), CommandError> {
    ctx.sign_in(auth).await?;
    let session = ctx.sessions.session();

    match flows::load_profile(&ctx.gateway, session).await {
        Ok(profile) => write_profile(out, &profile, false)?,
        Err(ProfileError::Store(e)) => {
            warn!(error = %e, "store unavailable, trying local copy");
            let mirror = JsonFileMirror::open(&ctx.config.mirror_dir).await?;
            let user_id = session.map(|s| s.user_id().clone()).unwrap_or_default();
            match mirror.load_profile(&user_id).await? {
                Some(profile) => write_profile(out, &profile, true)?,
                None => return Err(ProfileError::Store(e).into()),
            }
        }
        Err(e) => return Err(e.into()),
    }
    Ok(())
}

/// `tuckbox update-profile`
///
/// # Errors
///
/// Returns sign-in failures, `UnknownChoice` for a city not on the list,
/// or the profile error.
pub async fn update_profile(
    ctx: &mut Context,
    auth: &AuthArgs,
    args: ProfileArgs,
    out: &mut impl Write,
) -> Result<(), CommandError> {
    ctx.sign_in(auth).await?;
    let mirror = JsonFileMirror::open(&ctx.config.mirror_dir).await?;
    let session = ctx.sessions.session();

    let current = flows::load_profile(&ctx.gateway, session).await?;
    let city = match &args.city {
        Some(value) => {
            let cities: Vec<City> = ctx
                .gateway
                .get_cities(session)
                .await?
                .into_values()
                .collect();
            Some(find(&cities, "city", value, |c: &City| {
                (c.id.as_str(), c.name.as_str())
            })?)
        }
        None => None,
    };

    let changes = merge_changes(&current, args, city);
    let profile =
        flows::update_profile(&ctx.gateway, &mirror, session, changes, Utc::now()).await?;

    writeln!(out, "Profile updated.")?;
    write_profile(out, &profile, false)?;
    Ok(())
}

/// Fill unspecified fields from the stored profile.
fn merge_changes(current: &UserProfile, args: ProfileArgs, city: Option<City>) -> ProfileChanges {
    ProfileChanges {
        first_name: args
            .first_name
            .unwrap_or_else(|| current.first_name.clone()),
        last_name: args.last_name.unwrap_or_else(|| current.last_name.clone()),
        mobile: args.mobile.unwrap_or_else(|| current.mobile.clone()),
        address_text: args
            .address
            .unwrap_or_else(|| current.address_text.clone()),
        city,
    }
}

fn write_profile(out: &mut impl Write, profile: &UserProfile, offline: bool) -> std::io::Result<()> {
    if offline {
        writeln!(out, "(offline copy, may be out of date)")?;
    }
    writeln!(out, "Name:    {}", profile.display_name())?;
    writeln!(out, "Email:   {}", profile.email)?;
    writeln!(out, "Mobile:  {}", profile.mobile)?;
    writeln!(
        out,
        "City:    {}",
        profile.city_name.as_deref().unwrap_or("-")
    )?;
    writeln!(out, "Address: {}", profile.address_text)
}
