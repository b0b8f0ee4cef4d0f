use uuid::Uuid;
use water_client::domain::{ActivityEntry, NewActivity};

use crate::store::{Store, StoreError};

pub const DEFAULT_LIMIT: i64 = 50;
pub const MAX_LIMIT: i64 = 500;

/// Best-effort audit entry. A failed insert is logged and counted but never
/// reaches the caller.
pub async fn record(
    store: &dyn Store,
    actor: Option<Uuid>,
    action: &str,
    entity: &str,
    entity_id: Option<Uuid>,
    details: Option<String>,
) {
    let entry = NewActivity {
        user_id: actor,
        action: action.to_string(),
        entity: entity.to_string(),
        entity_id,
        details,
    };

    if let Err(e) = store.log_activity(entry).await {
        metrics::counter!("activity_log_failures_total").increment(1);
        tracing::warn!(error = %e, action, entity, "failed to write activity log entry");
    }
}

pub async fn recent(store: &dyn Store, limit: Option<i64>) -> Result<Vec<ActivityEntry>, StoreError> {
    let limit = limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    store.recent_activity(limit).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;

    #[tokio::test]
    async fn records_and_lists_newest_first() {
        let store = MemoryStore::new();
        record(&store, None, "create", "customer", None, Some("first".into())).await;
        record(&store, None, "update", "customer", None, Some("second".into())).await;

        let entries = recent(&store, None).await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].action, "update");
        assert_eq!(entries[1].details.as_deref(), Some("first"));
    }

    #[tokio::test]
    async fn failed_write_is_swallowed() {
        let store = MemoryStore::new();
        store.fail_activity_writes();

        record(&store, None, "delete", "bill", None, None).await;

        assert!(recent(&store, Some(10)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn limit_is_clamped() {
        let store = MemoryStore::new();
        for i in 0..3 {
            record(&store, None, "create", "meter", None, Some(i.to_string())).await;
        }
        assert_eq!(recent(&store, Some(0)).await.unwrap().len(), 1);
        assert_eq!(recent(&store, Some(10_000)).await.unwrap().len(), 3);
    }
}
