//! Admin role assignment from environment variables.
//!
//! `ADMIN_USER_IDS` holds a comma-separated list of account ids that get the admin
//! role at startup. Accounts that have not signed up yet get a placeholder profile so
//! the role is in place on their first sign-in.

use crate::{
    core::user::{get_user, set_role},
    entities::user,
    errors::Result,
    models::Role,
};
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};
use tracing::{info, instrument};

/// Environment variable listing the admin account ids.
pub const ADMIN_USER_IDS_VAR: &str = "ADMIN_USER_IDS";

/// Splits a comma-separated id list, dropping blanks and repeats.
#[must_use]
pub fn parse_user_ids(raw: &str) -> Vec<String> {
    let mut ids: Vec<String> = Vec::new();
    for id in raw.split(',').map(str::trim).filter(|id| !id.is_empty()) {
        if !ids.iter().any(|known| known == id) {
            ids.push(id.to_string());
        }
    }
    ids
}

/// Reads the admin account ids from `ADMIN_USER_IDS`. Unset means no admins.
#[must_use]
pub fn admin_user_ids() -> Vec<String> {
    std::env::var(ADMIN_USER_IDS_VAR)
        .map(|raw| parse_user_ids(&raw))
        .unwrap_or_default()
}

/// Gives every listed account the admin role.
///
/// # Errors
/// Returns an error if a database operation fails.
#[instrument(skip_all, fields(count = user_ids.len()))]
pub async fn promote_admins(db: &DatabaseConnection, user_ids: &[String]) -> Result<()> {
    for user_id in user_ids {
        match get_user(db, user_id).await? {
            Some(profile) if profile.role == Role::Admin => {}
            Some(_) => {
                set_role(db, user_id, Role::Admin).await?;
                info!(user_id = %user_id, "Promoted to admin");
            }
            None => {
                user::ActiveModel {
                    id: Set(user_id.clone()),
                    name: Set(user_id.clone()),
                    email: Set(String::new()),
                    role: Set(Role::Admin.as_str().to_string()),
                    active: Set(true),
                }
                .insert(db)
                .await?;
                info!(user_id = %user_id, "Created admin placeholder profile");
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::{
        core::user::{register_user, resolve_role},
        test_utils::*,
    };

    #[test]
    fn test_parse_user_ids() {
        assert_eq!(parse_user_ids(" a, b ,,a,c "), vec!["a", "b", "c"]);
        assert!(parse_user_ids("").is_empty());
        assert!(parse_user_ids(" , ").is_empty());
    }

    #[tokio::test]
    async fn test_promote_existing_and_unknown_users() -> Result<()> {
        let db = setup_test_db().await?;
        register_user(&db, "known", "Kim", "kim@example.com").await?;

        let ids = parse_user_ids("known,newcomer");
        promote_admins(&db, &ids).await?;
        promote_admins(&db, &ids).await?;

        assert_eq!(resolve_role(&db, "known").await?, Role::Admin);
        assert_eq!(resolve_role(&db, "newcomer").await?, Role::Admin);
        let known = get_user(&db, "known").await?.unwrap();
        assert_eq!(known.email, "kim@example.com");
        Ok(())
    }
}
