//! Who is acting, and whether they may write.
//!
//! Anyone may read reports, announcements and winner history. Writes need an
//! admin: a verified identity whose email is the configured admin email.
//! An email a client merely claims never makes it an admin.

use crate::config::AppConfig;
use crate::model::UserProfile;
use crate::store::{Collection, Store};
use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Principal {
    Admin(String),
    Member(String),
    Guest,
}

impl Principal {
    pub fn is_admin(&self) -> bool {
        matches!(self, Principal::Admin(_))
    }

    pub fn require_admin(&self) -> Result<()> {
        match self {
            Principal::Admin(_) => Ok(()),
            Principal::Member(uid) => Err(Error::Forbidden(format!(
                "pengguna '{}' bukan admin",
                uid
            ))),
            Principal::Guest => Err(Error::Forbidden("tamu hanya dapat membaca data".into())),
        }
    }
}

/// Where a sign-in's identity comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trust {
    /// The operator from config, or a sign-in made by an admin session.
    Verified,
    /// Whatever the client says about itself.
    Claimed,
}

fn is_admin_email(config: &AppConfig, email: Option<&str>) -> bool {
    email.is_some_and(|e| e.trim().eq_ignore_ascii_case(config.admin_email.trim()))
}

pub fn list_users(store: &Store) -> Result<Vec<UserProfile>> {
    store.read(Collection::Users)
}

/// Record a sign-in, creating or merging the user's profile.
///
/// Fields that are `None` keep their stored value. A verified sign-in
/// recomputes the admin flag from the email. A claimed one creates new
/// profiles without admin and leaves existing profiles untouched.
pub fn sign_in(
    store: &Store,
    config: &AppConfig,
    uid: &str,
    email: Option<String>,
    display_name: Option<String>,
    trust: Trust,
) -> Result<UserProfile> {
    if uid.trim().is_empty() {
        return Err(Error::Validation("Uid tidak boleh kosong".into()));
    }
    let mut users = list_users(store)?;
    let profile = match users.iter_mut().find(|u| u.uid == uid) {
        Some(existing) if trust == Trust::Claimed => {
            tracing::info!(uid = %existing.uid, "claimed sign-in to an existing profile");
            return Ok(existing.clone());
        }
        Some(existing) => {
            if email.is_some() {
                existing.email = email;
            }
            if display_name.is_some() {
                existing.display_name = display_name;
            }
            existing.is_admin = is_admin_email(config, existing.email.as_deref());
            existing.clone()
        }
        None => {
            let profile = UserProfile {
                uid: uid.to_string(),
                is_admin: trust == Trust::Verified && is_admin_email(config, email.as_deref()),
                email,
                display_name,
            };
            users.push(profile.clone());
            profile
        }
    };
    store.write(Collection::Users, &users)?;
    tracing::info!(uid = %profile.uid, admin = profile.is_admin, "signed in");
    Ok(profile)
}

/// The principal a session acts as after signing in with `trust`.
pub fn principal_of(profile: &UserProfile, trust: Trust) -> Principal {
    if profile.is_admin && trust == Trust::Verified {
        Principal::Admin(profile.uid.clone())
    } else {
        Principal::Member(profile.uid.clone())
    }
}

/// Resolve the operator identity from config. No operator means a guest.
pub fn principal_for(store: &Store, config: &AppConfig) -> Result<Principal> {
    let Some(email) = config.operator_email.as_deref().filter(|e| !e.trim().is_empty()) else {
        return Ok(Principal::Guest);
    };
    let existing = list_users(store)?
        .into_iter()
        .find(|u| u.email.as_deref().is_some_and(|e| e.eq_ignore_ascii_case(email)));
    let profile = match existing {
        Some(p) => sign_in(store, config, &p.uid, None, None, Trust::Verified)?,
        None => sign_in(
            store,
            config,
            email,
            Some(email.to_string()),
            None,
            Trust::Verified,
        )?,
    };
    Ok(principal_of(&profile, Trust::Verified))
}
