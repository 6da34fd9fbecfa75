//! Cover image business logic - Uploads plan covers and links them to plans.

use crate::{
    blob::{BlobStore, PLAN_COVERS_PREFIX},
    core::plan::{create_plan, get_plan, set_image_url},
    errors::{Error, Result},
    models::{NewPlan, Plan},
};
use chrono::Utc;
use sea_orm::DatabaseConnection;
use tracing::{info, instrument, warn};

fn require_image(bytes: &[u8]) -> Result<()> {
    if bytes.is_empty() {
        return Err(Error::Validation {
            message: "Cover image is empty".to_string(),
        });
    }
    Ok(())
}

/// Creates a plan, uploading its cover first when one is given.
///
/// # Errors
/// Returns an error if the cover is empty, the upload fails, or plan creation fails.
/// A failed upload creates no plan.
#[instrument(skip_all, fields(name = %new_plan.name))]
pub async fn create_plan_with_cover<B>(
    db: &DatabaseConnection,
    blobs: &B,
    mut new_plan: NewPlan,
    cover: Option<&[u8]>,
) -> Result<Plan>
where
    B: BlobStore,
{
    if let Some(bytes) = cover {
        require_image(bytes)?;
        let path = format!("{PLAN_COVERS_PREFIX}/{}.jpg", Utc::now().timestamp_millis());
        new_plan.image_url = blobs.put(&path, bytes).await?;
    }
    create_plan(db, new_plan).await
}

/// Removes a superseded cover object. Failures only leave an orphaned file behind.
async fn discard_object<B>(blobs: &B, old_url: &str)
where
    B: BlobStore,
{
    let Some(path) = blobs.object_path(old_url) else {
        return;
    };
    if let Err(e) = blobs.delete(&path).await {
        warn!(error = %e, path = %path, "Could not remove previous cover");
    }
}

/// Uploads a new cover for an existing plan and points the plan at it. The previous
/// cover object, if this store holds it, is removed afterwards.
#[instrument(skip(db, blobs, bytes), fields(size = bytes.len()))]
pub async fn upload_cover<B>(
    db: &DatabaseConnection,
    blobs: &B,
    plan_id: i64,
    bytes: &[u8],
) -> Result<Plan>
where
    B: BlobStore,
{
    require_image(bytes)?;
    let previous = get_plan(db, plan_id)
        .await?
        .ok_or(Error::PlanNotFound { id: plan_id })?;
    let path = format!(
        "{PLAN_COVERS_PREFIX}/{plan_id}_{}.jpg",
        Utc::now().timestamp_millis()
    );
    let url = blobs.put(&path, bytes).await?;
    let plan = set_image_url(db, plan_id, &url).await?;
    if previous.image_url != url {
        discard_object(blobs, &previous.image_url).await;
    }
    info!(plan_id, "Cover uploaded");
    Ok(plan)
}

/// Detaches the cover from a plan and removes the stored object.
pub async fn clear_cover<B>(db: &DatabaseConnection, blobs: &B, plan_id: i64) -> Result<Plan>
where
    B: BlobStore,
{
    let previous = get_plan(db, plan_id)
        .await?
        .ok_or(Error::PlanNotFound { id: plan_id })?;
    let plan = set_image_url(db, plan_id, "").await?;
    discard_object(blobs, &previous.image_url).await;
    Ok(plan)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::{blob::LocalBlobStore, test_utils::*};

    fn stored_files(root: &std::path::Path) -> Result<usize> {
        let dir = root.join(PLAN_COVERS_PREFIX);
        if !dir.exists() {
            return Ok(0);
        }
        Ok(std::fs::read_dir(dir)?.count())
    }

    #[tokio::test]
    async fn test_upload_cover_sets_image_url() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let blobs = LocalBlobStore::new(dir.path(), "https://cdn.test");
        let (db, plan) = setup_with_plan().await?;

        let updated = upload_cover(&db, &blobs, plan.id, b"cover").await?;

        let prefix = format!("https://cdn.test/plan_covers/{}_", plan.id);
        assert!(updated.image_url.starts_with(&prefix));
        assert!(updated.image_url.ends_with(".jpg"));
        assert_eq!(stored_files(dir.path())?, 1);

        let cleared = clear_cover(&db, &blobs, plan.id).await?;
        assert_eq!(cleared.image_url, "");
        assert_eq!(stored_files(dir.path())?, 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_replacing_cover_removes_previous_object() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let blobs = LocalBlobStore::new(dir.path(), "https://cdn.test");
        let (db, plan) = setup_with_plan().await?;

        let first = upload_cover(&db, &blobs, plan.id, b"one").await?;
        std::thread::sleep(std::time::Duration::from_millis(5));
        let second = upload_cover(&db, &blobs, plan.id, b"two").await?;

        assert_ne!(first.image_url, second.image_url);
        assert_eq!(stored_files(dir.path())?, 1);
        let path = blobs.object_path(&second.image_url).unwrap();
        assert_eq!(std::fs::read(dir.path().join(path))?, b"two");
        Ok(())
    }

    #[tokio::test]
    async fn test_foreign_cover_url_is_left_alone() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let blobs = LocalBlobStore::new(dir.path(), "https://cdn.test");
        let (db, plan) = setup_with_plan().await?;
        set_image_url(&db, plan.id, "https://elsewhere.test/cover.jpg").await?;

        let cleared = clear_cover(&db, &blobs, plan.id).await?;
        assert_eq!(cleared.image_url, "");
        Ok(())
    }

    #[tokio::test]
    async fn test_upload_cover_for_missing_plan_stores_nothing() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let blobs = LocalBlobStore::new(dir.path(), "https://cdn.test");
        let db = setup_test_db().await?;

        let result = upload_cover(&db, &blobs, 12, b"cover").await;
        assert!(matches!(result, Err(Error::PlanNotFound { id: 12 })));
        assert!(!dir.path().join(PLAN_COVERS_PREFIX).exists());
        Ok(())
    }

    #[tokio::test]
    async fn test_create_plan_with_cover() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let blobs = LocalBlobStore::new(dir.path(), "https://cdn.test");
        let db = setup_test_db().await?;

        let plan = create_plan_with_cover(
            &db,
            &blobs,
            NewPlan {
                name: "Yoga".to_string(),
                description: "Daily flow".to_string(),
                price: 1500,
                stock: 10,
                image_url: String::new(),
            },
            Some(b"img".as_slice()),
        )
        .await?;
        assert!(plan.image_url.starts_with("https://cdn.test/plan_covers/"));

        let empty = create_plan_with_cover(
            &db,
            &blobs,
            NewPlan {
                name: "Pilates".to_string(),
                description: "Core".to_string(),
                price: 1500,
                stock: 10,
                image_url: String::new(),
            },
            Some(b"".as_slice()),
        )
        .await;
        assert!(matches!(empty, Err(Error::Validation { .. })));
        Ok(())
    }
}
