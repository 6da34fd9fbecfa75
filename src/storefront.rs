//! Storefront facade - What a presentation layer talks to.
//!
//! [`Storefront`] bundles the store handle, the live cart feed, the cover blob store and
//! the tuning settings.
//! Cart mutations publish the new cart contents to subscribers once they are
//! persisted. Checkout runs on its own task so that an abandoned caller does not abort
//! a transaction that is already under way.

use crate::{
    blob::LocalBlobStore,
    config::settings::{AppConfig, CatalogSettings, CheckoutSettings},
    core::{
        cart::{self, cart_plan_ids},
        catalog::{self, CartView},
        checkout::checkout,
        cover,
    },
    errors::{Error, Result},
    models::{NewPlan, Plan},
};
use sea_orm::DatabaseConnection;
use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError},
};
use tokio::{sync::watch, task::JoinError};
use tracing::{instrument, warn};

/// Fan-out of cart contents to live subscribers, one channel per user.
#[derive(Debug, Default)]
pub struct CartFeed {
    channels: Mutex<HashMap<String, watch::Sender<Vec<i64>>>>,
}

impl CartFeed {
    /// Creates an empty feed.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribes to a user's cart, seeding the channel with `current`.
    pub fn subscribe(&self, user_id: &str, current: Vec<i64>) -> CartSubscription {
        let mut channels = self.channels.lock().unwrap_or_else(PoisonError::into_inner);
        let sender = channels
            .entry(user_id.to_string())
            .or_insert_with(|| watch::channel(Vec::new()).0);
        replace_if_changed(sender, current);
        CartSubscription {
            receiver: sender.subscribe(),
        }
    }

    /// Publishes a user's cart contents. Users nobody subscribes to are skipped, and
    /// channels whose subscribers have all gone are dropped.
    pub fn publish(&self, user_id: &str, plan_ids: Vec<i64>) {
        let mut channels = self.channels.lock().unwrap_or_else(PoisonError::into_inner);
        channels.retain(|_, sender| sender.receiver_count() > 0);
        if let Some(sender) = channels.get(user_id) {
            replace_if_changed(sender, plan_ids);
        }
    }
}

fn replace_if_changed(sender: &watch::Sender<Vec<i64>>, plan_ids: Vec<i64>) {
    sender.send_if_modified(|held| {
        if *held == plan_ids {
            false
        } else {
            *held = plan_ids;
            true
        }
    });
}

/// A live view of one user's cart.
///
/// Dropping it ends the subscription; subscribing again starts a fresh one.
#[derive(Debug)]
pub struct CartSubscription {
    receiver: watch::Receiver<Vec<i64>>,
}

impl CartSubscription {
    /// The most recently published contents.
    #[must_use]
    pub fn current(&self) -> Vec<i64> {
        self.receiver.borrow().clone()
    }

    /// Waits for the cart to change and returns the new contents, or `None` once the
    /// feed is gone.
    pub async fn next(&mut self) -> Option<Vec<i64>> {
        self.receiver.changed().await.ok()?;
        Some(self.receiver.borrow_and_update().clone())
    }
}

/// Unwraps a finished background task. A panic inside the task resumes on the caller.
fn task_outcome<T>(joined: std::result::Result<T, JoinError>) -> Result<T> {
    match joined {
        Ok(value) => Ok(value),
        Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
        Err(e) => Err(Error::CheckoutTask {
            message: e.to_string(),
        }),
    }
}

/// Entry point for cart, catalog and checkout operations.
#[derive(Debug, Clone)]
pub struct Storefront {
    database: Arc<DatabaseConnection>,
    cart_feed: Arc<CartFeed>,
    blobs: LocalBlobStore,
    checkout: CheckoutSettings,
    catalog: CatalogSettings,
}

impl Storefront {
    /// Creates a storefront over `database` using the checkout, catalog and blob
    /// settings of `config`.
    #[must_use]
    pub fn new(database: DatabaseConnection, config: &AppConfig) -> Self {
        Self {
            database: Arc::new(database),
            cart_feed: Arc::new(CartFeed::new()),
            blobs: LocalBlobStore::new(config.blobs.root.clone(), config.blobs.base_url()),
            checkout: config.checkout,
            catalog: config.catalog,
        }
    }

    /// The underlying store handle.
    #[must_use]
    pub fn database(&self) -> &DatabaseConnection {
        &self.database
    }

    /// The store holding plan cover images.
    #[must_use]
    pub const fn blobs(&self) -> &LocalBlobStore {
        &self.blobs
    }

    /// Adds a plan to the user's cart and notifies subscribers.
    pub async fn add_to_cart(&self, user_id: &str, plan_id: i64) -> Result<Vec<i64>> {
        let user_id = user_id.trim();
        let plan_ids = cart::add_plan(self.database(), user_id, plan_id).await?;
        self.cart_feed.publish(user_id, plan_ids.clone());
        Ok(plan_ids)
    }

    /// Removes a plan from the user's cart and notifies subscribers.
    pub async fn remove_from_cart(&self, user_id: &str, plan_id: i64) -> Result<Vec<i64>> {
        let user_id = user_id.trim();
        let plan_ids = cart::remove_plan(self.database(), user_id, plan_id).await?;
        self.cart_feed.publish(user_id, plan_ids.clone());
        Ok(plan_ids)
    }

    /// Subscribes to live updates of the user's cart, starting from its stored contents.
    pub async fn subscribe_cart(&self, user_id: &str) -> Result<CartSubscription> {
        let user_id = user_id.trim();
        let plan_ids = cart_plan_ids(self.database(), user_id).await?;
        Ok(self.cart_feed.subscribe(user_id, plan_ids))
    }

    /// Looks up plans by id, paging by the configured batch size.
    pub async fn resolve_plans(&self, plan_ids: &[i64]) -> Result<Vec<Plan>> {
        catalog::resolve_plans(self.database(), plan_ids, self.catalog.lookup_batch_size).await
    }

    /// The user's cart joined with the current catalog.
    pub async fn cart_view(&self, user_id: &str) -> Result<CartView> {
        catalog::cart_view(self.database(), user_id, self.catalog.lookup_batch_size).await
    }

    /// Checks out the user's current cart.
    ///
    /// # Returns
    /// The id of the new order.
    ///
    /// # Errors
    /// Returns [`Error::Validation`] for an empty cart and [`Error::Checkout`] for any
    /// checkout failure, including a committed order whose cart was not cleared.
    #[instrument(skip(self))]
    pub async fn place_order(&self, user_id: &str) -> Result<String> {
        let user_id = user_id.trim().to_string();
        let plan_ids = cart_plan_ids(self.database(), &user_id).await?;
        if plan_ids.is_empty() {
            return Err(Error::Validation {
                message: "Cart is empty".to_string(),
            });
        }

        let database = Arc::clone(&self.database);
        let max_attempts = self.checkout.max_attempts;
        let buyer = user_id.clone();
        let joined = tokio::spawn(async move {
            checkout(&*database, &buyer, &plan_ids, max_attempts).await
        })
        .await;
        let outcome = task_outcome(joined)?;

        self.refresh_cart(&user_id).await;
        outcome.map_err(Into::into)
    }

    /// Creates a plan, storing its cover first when one is given.
    pub async fn create_plan_with_cover(
        &self,
        new_plan: NewPlan,
        cover: Option<&[u8]>,
    ) -> Result<Plan> {
        cover::create_plan_with_cover(self.database(), &self.blobs, new_plan, cover).await
    }

    /// Replaces a plan's cover image.
    pub async fn upload_cover(&self, plan_id: i64, bytes: &[u8]) -> Result<Plan> {
        cover::upload_cover(self.database(), &self.blobs, plan_id, bytes).await
    }

    /// Removes a plan's cover image.
    pub async fn clear_cover(&self, plan_id: i64) -> Result<Plan> {
        cover::clear_cover(self.database(), &self.blobs, plan_id).await
    }

    async fn refresh_cart(&self, user_id: &str) {
        match cart_plan_ids(self.database(), user_id).await {
            Ok(plan_ids) => self.cart_feed.publish(user_id, plan_ids),
            Err(e) => warn!(error = %e, "Could not refresh cart subscribers"),
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::{
        blob::BlobStore,
        core::{order::get_order, plan::get_plan},
        errors::CheckoutError,
        test_utils::*,
    };

    async fn storefront() -> Result<Storefront> {
        let db = setup_test_db().await?;
        Ok(Storefront::new(db, &AppConfig::default()))
    }

    #[tokio::test]
    async fn test_subscription_sees_cart_changes() -> Result<()> {
        let store = storefront().await?;
        let plan = create_test_plan(store.database(), "Plan").await?;

        let mut subscription = store.subscribe_cart("user-1").await?;
        assert!(subscription.current().is_empty());

        store.add_to_cart("user-1", plan.id).await?;
        assert_eq!(subscription.next().await, Some(vec![plan.id]));

        store.remove_from_cart("user-1", plan.id).await?;
        assert_eq!(subscription.next().await, Some(Vec::new()));
        Ok(())
    }

    #[tokio::test]
    async fn test_resubscribe_starts_from_stored_cart() -> Result<()> {
        let store = storefront().await?;
        let plan = create_test_plan(store.database(), "Plan").await?;
        store.add_to_cart("user-1", plan.id).await?;

        let subscription = store.subscribe_cart("user-1").await?;
        assert_eq!(subscription.current(), vec![plan.id]);
        drop(subscription);

        let again = store.subscribe_cart("user-1").await?;
        assert_eq!(again.current(), vec![plan.id]);
        Ok(())
    }

    #[tokio::test]
    async fn test_place_order_empties_cart_and_notifies() -> Result<()> {
        let store = storefront().await?;
        let plan = create_custom_plan(store.database(), "Plan", 4900, 3).await?;
        store.add_to_cart("user-1", plan.id).await?;
        let mut subscription = store.subscribe_cart("user-1").await?;

        let order_id = store.place_order("user-1").await?;

        assert_eq!(subscription.next().await, Some(Vec::new()));
        let order = get_order(store.database(), &order_id).await?.unwrap();
        assert_eq!(order.total, 4900);
        assert_eq!(get_plan(store.database(), plan.id).await?.unwrap().stock, 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_place_order_rejects_empty_cart() -> Result<()> {
        let store = storefront().await?;
        let result = store.place_order("user-1").await;
        assert!(matches!(result, Err(Error::Validation { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_place_order_reports_business_abort() -> Result<()> {
        let store = storefront().await?;
        let plan = create_custom_plan(store.database(), "Sold out", 100, 0).await?;
        store.add_to_cart("user-1", plan.id).await?;

        let result = store.place_order("user-1").await;
        assert!(matches!(
            result,
            Err(Error::Checkout(CheckoutError::OutOfStock { .. }))
        ));
        assert_eq!(store.cart_view("user-1").await?.plan_ids, vec![plan.id]);
        Ok(())
    }

    #[test]
    fn test_publish_without_subscribers_is_noop() {
        let feed = CartFeed::new();
        feed.publish("nobody", vec![1, 2]);
        let subscription = feed.subscribe("nobody", vec![3]);
        assert_eq!(subscription.current(), vec![3]);
    }

    #[test]
    fn test_publish_drops_abandoned_channels() {
        let feed = CartFeed::new();
        let kept = feed.subscribe("kept", vec![1]);
        drop(feed.subscribe("gone", vec![2]));
        assert_eq!(feed.channels.lock().unwrap().len(), 2);

        feed.publish("kept", vec![1, 4]);

        let channels = feed.channels.lock().unwrap();
        assert_eq!(channels.len(), 1);
        assert!(channels.contains_key("kept"));
        drop(channels);
        assert_eq!(kept.current(), vec![1, 4]);
    }

    #[tokio::test]
    async fn test_cancelled_task_is_reported_separately() {
        let handle = tokio::spawn(std::future::pending::<()>());
        handle.abort();

        let result = task_outcome(handle.await);
        assert!(matches!(result, Err(Error::CheckoutTask { .. })));
    }

    #[tokio::test]
    #[should_panic(expected = "checkout exploded")]
    async fn test_task_panic_resumes_on_caller() {
        let handle = tokio::spawn(async {
            let plan_ids: Vec<i64> = Vec::new();
            assert!(!plan_ids.is_empty(), "checkout exploded");
            plan_ids
        });
        let _ = task_outcome(handle.await);
    }

    #[tokio::test]
    async fn test_covers_use_configured_blob_store() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let mut config = AppConfig::default();
        config.blobs.root = dir.path().to_path_buf();
        config.blobs.public_base_url = Some("https://cdn.test".to_string());
        let store = Storefront::new(setup_test_db().await?, &config);
        let plan = create_test_plan(store.database(), "Plan").await?;

        let updated = store.upload_cover(plan.id, b"cover").await?;
        assert!(updated.image_url.starts_with("https://cdn.test/plan_covers/"));
        let path = store.blobs().object_path(&updated.image_url).unwrap();
        assert!(dir.path().join(&path).exists());

        store.clear_cover(plan.id).await?;
        assert!(!dir.path().join(&path).exists());
        Ok(())
    }
}
