//! User business logic - Profiles and the admin role flag.
//!
//! Authentication itself happens elsewhere; this module only sees the user id it
//! produces. A signed-in user without a profile is treated as a regular, active user.

use crate::{
    core::{cart::require_user_id, plan::require_text},
    entities::{User, user},
    errors::{Error, Result},
    models::{Role, UserProfile},
};
use sea_orm::{Set, prelude::*};
use tracing::{info, instrument};

/// Creates the profile for a newly signed-up account as an active regular user.
///
/// # Errors
/// Returns an error if:
/// - The id or name is blank, or the email has no `@`
/// - A profile already exists for the id
/// - The database insert fails
#[instrument(skip(db, name, email))]
pub async fn register_user(
    db: &DatabaseConnection,
    user_id: &str,
    name: &str,
    email: &str,
) -> Result<UserProfile> {
    let user_id = require_user_id(user_id)?;
    let name = require_text("Name", name)?;
    let email = require_text("Email", email)?;
    if !email.contains('@') {
        return Err(Error::Validation {
            message: format!("{email} is not an email address"),
        });
    }
    if User::find_by_id(user_id.to_string()).one(db).await?.is_some() {
        return Err(Error::Validation {
            message: format!("User {user_id} is already registered"),
        });
    }

    let created = user::ActiveModel {
        id: Set(user_id.to_string()),
        name: Set(name),
        email: Set(email),
        role: Set(Role::User.as_str().to_string()),
        active: Set(true),
    }
    .insert(db)
    .await?;
    info!("User registered");
    UserProfile::try_from(created)
}

/// Retrieves a user profile, returning None if there is none.
pub async fn get_user(db: &DatabaseConnection, user_id: &str) -> Result<Option<UserProfile>> {
    User::find_by_id(user_id.to_string())
        .one(db)
        .await?
        .map(UserProfile::try_from)
        .transpose()
}

/// Decides which home a signed-in user lands on.
///
/// # Errors
/// Returns [`Error::AccountDisabled`] for deactivated accounts.
pub async fn resolve_role(db: &DatabaseConnection, user_id: &str) -> Result<Role> {
    match get_user(db, user_id).await? {
        None => Ok(Role::User),
        Some(profile) if !profile.active => Err(Error::AccountDisabled {
            user_id: profile.id,
        }),
        Some(profile) => Ok(profile.role),
    }
}

/// Fails unless the user is an active admin.
pub async fn require_admin(db: &DatabaseConnection, user_id: &str) -> Result<()> {
    match resolve_role(db, user_id).await? {
        Role::Admin => Ok(()),
        Role::User => Err(Error::NotAdmin {
            user_id: user_id.to_string(),
        }),
    }
}

async fn update_user(db: &DatabaseConnection, model: user::ActiveModel) -> Result<UserProfile> {
    UserProfile::try_from(model.update(db).await?)
}

async fn require_user(db: &DatabaseConnection, user_id: &str) -> Result<user::Model> {
    User::find_by_id(user_id.to_string())
        .one(db)
        .await?
        .ok_or_else(|| Error::UserNotFound {
            id: user_id.to_string(),
        })
}

/// Changes a user's role.
#[instrument(skip(db))]
pub async fn set_role(db: &DatabaseConnection, user_id: &str, role: Role) -> Result<UserProfile> {
    let mut active: user::ActiveModel = require_user(db, user_id).await?.into();
    active.role = Set(role.as_str().to_string());
    update_user(db, active).await
}

/// Activates or deactivates an account.
#[instrument(skip(db))]
pub async fn set_active(db: &DatabaseConnection, user_id: &str, enabled: bool) -> Result<UserProfile> {
    let mut active: user::ActiveModel = require_user(db, user_id).await?.into();
    active.active = Set(enabled);
    update_user(db, active).await
}
