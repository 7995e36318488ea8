//! Baseline checklist items every installation needs.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, error, info};

use crate::model::ChecklistItemDefinition;
use crate::ports::{ChecklistDefinitionGateway, SourceError};

/// Revision of [`DEFAULT_CHECKLIST_ITEMS`]; bump when the list changes.
pub const DEFAULT_CHECKLIST_VERSION: u32 = 1;

/// Key and label of each default pre-trip checklist item, in form order.
pub const DEFAULT_CHECKLIST_ITEMS: [(&str, &str); 8] = [
    ("tires", "Tire condition and pressure"),
    ("brakes", "Brakes responding normally"),
    ("lights", "Headlights, brake lights and indicators"),
    ("oil_level", "Engine oil level"),
    ("coolant_level", "Coolant level"),
    ("mirrors", "Mirrors intact and adjusted"),
    ("seat_belts", "Seat belts working"),
    ("fire_extinguisher", "Fire extinguisher present and charged"),
];

/// Definitions built from [`DEFAULT_CHECKLIST_ITEMS`].
#[must_use]
pub fn default_checklist_items() -> Vec<ChecklistItemDefinition> {
    (1_u32..)
        .zip(DEFAULT_CHECKLIST_ITEMS)
        .map(|(position, (key, label))| ChecklistItemDefinition::new(key, label, position))
        .collect()
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("Creating default checklist item '{key}' failed: {source}")]
/// A default item could not be created; later items were not attempted.
pub struct InitializationError {
    /// Key of the item that failed.
    pub key: String,
    /// Store failure.
    pub source: SourceError,
    /// Items created by this run before the failure.
    pub created: Vec<ChecklistItemDefinition>,
}

/// Makes sure the default checklist items exist, creating only missing ones.
///
/// Each item goes through the store's conditional create, so concurrent runs
/// from several processes cannot duplicate a row. Runs in the same process are
/// additionally serialised.
pub struct DefaultDataInitializer {
    gateway: Arc<dyn ChecklistDefinitionGateway>,
    defaults: Vec<ChecklistItemDefinition>,
    running: Mutex<()>,
}

impl DefaultDataInitializer {
    /// Initializer for the built-in default set.
    #[must_use]
    pub fn new(gateway: Arc<dyn ChecklistDefinitionGateway>) -> Self {
        Self::with_defaults(gateway, default_checklist_items())
    }

    /// Initializer for a custom default set.
    #[must_use]
    pub fn with_defaults(
        gateway: Arc<dyn ChecklistDefinitionGateway>,
        defaults: Vec<ChecklistItemDefinition>,
    ) -> Self {
        Self {
            gateway,
            defaults,
            running: Mutex::new(()),
        }
    }

    /// Create every missing default item and return the ones created.
    ///
    /// An empty result means all defaults already existed.
    ///
    /// # Errors
    ///
    /// Returns [`InitializationError`] for the first item the store fails to
    /// create; the remaining items are not attempted.
    #[tracing::instrument(
        name = "ensure_defaults",
        skip_all,
        fields(version = DEFAULT_CHECKLIST_VERSION, items = self.defaults.len())
    )]
    pub async fn ensure_defaults(&self) -> Result<Vec<ChecklistItemDefinition>, InitializationError> {
        let _running = self.running.lock().await;
        let mut created = Vec::new();

        for definition in &self.defaults {
            match self.gateway.create_definition_if_absent(definition).await {
                Ok(true) => {
                    info!(key = %definition.key, "default checklist item created");
                    created.push(definition.clone());
                }
                Ok(false) => debug!(key = %definition.key, "default checklist item already present"),
                Err(source) => {
                    error!(
                        key = %definition.key,
                        kind = %source.kind,
                        error = %source,
                        "default checklist initialization stopped"
                    );
                    return Err(InitializationError {
                        key: definition.key.clone(),
                        source,
                        created,
                    });
                }
            }
        }

        info!(created = created.len(), "default checklist items ensured");
        Ok(created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateways::Gateways;
    use crate::memory::{MemoryData, MemoryStore};
    use crate::ports::{Source, SourceErrorKind};

    #[test]
    fn default_items_have_unique_keys_and_ordered_positions() {
        let items = default_checklist_items();
        let mut keys: Vec<&str> = items.iter().map(|item| item.key.as_str()).collect();
        keys.sort_unstable();
        keys.dedup();

        assert_eq!(keys.len(), DEFAULT_CHECKLIST_ITEMS.len(), "keys are unique");
        assert!(
            items
                .iter()
                .zip(1..)
                .all(|(item, position)| item.position == position),
            "positions follow the list"
        );
    }

    #[tokio::test]
    async fn second_run_creates_nothing() {
        let store = Arc::new(MemoryStore::default());
        let initializer = DefaultDataInitializer::new(Gateways::from_store(Arc::clone(&store)).checklist_definitions);

        let first = initializer.ensure_defaults().await.expect("first run");
        let second = initializer.ensure_defaults().await.expect("second run");

        assert_eq!(first.len(), DEFAULT_CHECKLIST_ITEMS.len(), "empty store gets every default");
        assert!(second.is_empty(), "nothing left to create");
        assert_eq!(store.definitions().await.len(), DEFAULT_CHECKLIST_ITEMS.len(), "no duplicates");
    }

    #[tokio::test]
    async fn only_missing_items_are_returned() {
        let existing = default_checklist_items().into_iter().take(3).collect();
        let store = Arc::new(MemoryStore::new(MemoryData {
            definitions: existing,
            ..MemoryData::default()
        }));
        let initializer = DefaultDataInitializer::new(store);

        let created = initializer.ensure_defaults().await.expect("run");

        assert_eq!(created.len(), DEFAULT_CHECKLIST_ITEMS.len() - 3, "three already existed");
        assert_eq!(
            created.first().map(|item| item.key.as_str()),
            Some("oil_level"),
            "continues with the first missing key"
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn concurrent_initializers_never_duplicate() {
        let store = Arc::new(MemoryStore::default());
        let left = DefaultDataInitializer::new(Gateways::from_store(Arc::clone(&store)).checklist_definitions);
        let right = DefaultDataInitializer::new(Gateways::from_store(Arc::clone(&store)).checklist_definitions);

        let (left_created, right_created) = tokio::join!(left.ensure_defaults(), right.ensure_defaults());
        let total = left_created.expect("left").len() + right_created.expect("right").len();

        assert_eq!(total, DEFAULT_CHECKLIST_ITEMS.len(), "each item created by exactly one caller");
        assert_eq!(store.definitions().await.len(), DEFAULT_CHECKLIST_ITEMS.len(), "single row per key");
    }

    #[tokio::test]
    async fn store_failure_stops_the_run() {
        let store = Arc::new(
            MemoryStore::default().with_failure(Source::ChecklistDefinitions, SourceErrorKind::Unknown),
        );
        let initializer = DefaultDataInitializer::new(Gateways::from_store(Arc::clone(&store)).checklist_definitions);

        let err = initializer.ensure_defaults().await.expect_err("store down");

        assert_eq!(err.key, "tires", "first item reported");
        assert!(err.created.is_empty(), "nothing created before the failure");
        assert_eq!(store.calls(Source::ChecklistDefinitions).await, 1, "later items not attempted");
    }
}
