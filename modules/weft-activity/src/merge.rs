use std::collections::HashSet;
use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::{debug, info};
use weft_common::{ActivityItem, Session, WeftError};

use crate::client::{ActivityQuery, ActivitySource};

/// Scope filter for a single space: items pass when their object or target
/// reference matches the identifier (string-normalized), or when the payload
/// embeds a matching numeric space id — either check suffices.
#[derive(Debug, Clone)]
pub struct SpaceScope {
    pub identifier: String,
    pub numeric_id: Option<i64>,
}

/// Merges 1–2 overlapping event-stream queries into one deduplicated,
/// recency-ordered feed.
///
/// Failure of any underlying query aborts the whole merge; a partial feed
/// would misrepresent the scope, so surviving results are discarded.
pub struct ActivityMergeEngine {
    source: Arc<dyn ActivitySource>,
    lookback: Duration,
    query_limit: usize,
}

impl ActivityMergeEngine {
    pub fn new(source: Arc<dyn ActivitySource>, lookback_days: i64, query_limit: usize) -> Self {
        Self {
            source,
            lookback: Duration::days(lookback_days),
            query_limit,
        }
    }

    /// Fetch and merge the feed. With a scope, an object-scoped and a
    /// target-scoped query run in parallel; without one, a single global
    /// query is issued.
    pub async fn merged_feed(
        &self,
        session: &Session,
        scope: Option<&SpaceScope>,
    ) -> Result<Vec<ActivityItem>, WeftError> {
        let since = Utc::now() - self.lookback;

        let mut items = match scope {
            Some(scope) => {
                let by_object =
                    ActivityQuery::for_object(&scope.identifier, since, self.query_limit);
                let by_target =
                    ActivityQuery::for_target(&scope.identifier, since, self.query_limit);
                let (a, b) = tokio::try_join!(
                    self.source.fetch(session, &by_object),
                    self.source.fetch(session, &by_target),
                )?;
                let mut items = a;
                items.extend(b);
                items
            }
            None => {
                let query = ActivityQuery::global(since, self.query_limit);
                self.source.fetch(session, &query).await?
            }
        };

        let fetched = items.len();
        items = dedup_by_id(items);

        items.sort_by(|a, b| b.published.cmp(&a.published));

        if let Some(scope) = scope {
            items.retain(|item| matches_scope(item, scope));
        }

        // The upstream "since" parameter is advisory; enforce the boundary.
        items.retain(|item| item.published >= since);

        info!(
            fetched,
            merged = items.len(),
            scoped = scope.is_some(),
            "Activity feed merged"
        );
        Ok(items)
    }
}

/// First-seen-wins dedup by item id. Items without an id are dropped — they
/// cannot participate in identity-based merging.
fn dedup_by_id(items: Vec<ActivityItem>) -> Vec<ActivityItem> {
    let mut seen: HashSet<String> = HashSet::with_capacity(items.len());
    items
        .into_iter()
        .filter(|item| !item.id.is_empty() && seen.insert(item.id.clone()))
        .collect()
}

fn matches_scope(item: &ActivityItem, scope: &SpaceScope) -> bool {
    let normalized = scope.identifier.trim();
    let reference_matches = [item.object.as_deref(), item.target.as_deref()]
        .into_iter()
        .flatten()
        .any(|r| r.trim().eq_ignore_ascii_case(normalized));
    if reference_matches {
        return true;
    }

    if let Some(numeric_id) = scope.numeric_id {
        if let Some(payload_id) = item.payload.get("space_id").and_then(|v| v.as_i64()) {
            if payload_id == numeric_id {
                return true;
            }
        }
    }

    debug!(item = item.id.as_str(), "Activity item outside scope");
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use weft_common::ActorRef;

    fn item(id: &str, hours_ago: i64) -> ActivityItem {
        ActivityItem {
            id: id.to_string(),
            actor: ActorRef::Name("alice".to_string()),
            object: None,
            target: None,
            published: Utc::now() - Duration::hours(hours_ago),
            summary: format!("did something ({id})"),
            payload: serde_json::Value::Null,
        }
    }

    /// Responds to object-scoped, target-scoped, and global queries with
    /// separate canned lists.
    struct MockSource {
        global: Vec<ActivityItem>,
        by_object: Vec<ActivityItem>,
        by_target: Vec<ActivityItem>,
        fail_target_query: bool,
        calls: Mutex<usize>,
    }

    impl MockSource {
        fn global(items: Vec<ActivityItem>) -> Self {
            Self {
                global: items,
                by_object: vec![],
                by_target: vec![],
                fail_target_query: false,
                calls: Mutex::new(0),
            }
        }

        fn scoped(by_object: Vec<ActivityItem>, by_target: Vec<ActivityItem>) -> Self {
            Self {
                global: vec![],
                by_object,
                by_target,
                fail_target_query: false,
                calls: Mutex::new(0),
            }
        }
    }

    #[async_trait]
    impl ActivitySource for MockSource {
        async fn fetch(
            &self,
            _session: &Session,
            query: &ActivityQuery,
        ) -> Result<Vec<ActivityItem>, WeftError> {
            *self.calls.lock().unwrap() += 1;
            if query.target.is_some() {
                if self.fail_target_query {
                    return Err(WeftError::Transient("stream down".to_string()));
                }
                Ok(self.by_target.clone())
            } else if query.object.is_some() {
                Ok(self.by_object.clone())
            } else {
                Ok(self.global.clone())
            }
        }
    }

    fn engine(source: MockSource) -> ActivityMergeEngine {
        ActivityMergeEngine::new(Arc::new(source), 30, 100)
    }

    fn session() -> Session {
        Session::new("tester")
    }

    #[tokio::test]
    async fn repeated_ids_appear_exactly_once() {
        let source = MockSource::global(vec![item("a", 1), item("b", 2), item("a", 3)]);
        let feed = engine(source).merged_feed(&session(), None).await.unwrap();

        let ids: Vec<&str> = feed.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        // First-seen wins: the 1-hour-old "a", not the 3-hour-old one.
        assert!(feed[0].published > Utc::now() - Duration::hours(2));
    }

    #[tokio::test]
    async fn output_is_sorted_descending_by_published() {
        let source = MockSource::global(vec![item("old", 20), item("new", 1), item("mid", 5)]);
        let feed = engine(source).merged_feed(&session(), None).await.unwrap();

        let ids: Vec<&str> = feed.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["new", "mid", "old"]);
        assert!(feed.windows(2).all(|w| w[0].published >= w[1].published));
    }

    #[tokio::test]
    async fn items_without_id_are_dropped() {
        let source = MockSource::global(vec![item("", 1), item("a", 2)]);
        let feed = engine(source).merged_feed(&session(), None).await.unwrap();
        assert_eq!(feed.len(), 1);
        assert_eq!(feed[0].id, "a");
    }

    #[tokio::test]
    async fn items_past_the_lookback_boundary_are_cut() {
        // Upstream ignored "since" and returned something ancient.
        let source = MockSource::global(vec![item("recent", 2), item("ancient", 31 * 24)]);
        let feed = engine(source).merged_feed(&session(), None).await.unwrap();
        assert_eq!(feed.len(), 1);
        assert_eq!(feed[0].id, "recent");
    }

    #[tokio::test]
    async fn scoped_merge_issues_both_queries_and_overlap_dedups() {
        let shared = item("shared", 2);
        let mut obj_item = item("obj-only", 1);
        obj_item.object = Some("spaces/42".to_string());
        let mut shared_obj = shared.clone();
        shared_obj.object = Some("spaces/42".to_string());
        let mut shared_tgt = shared;
        shared_tgt.target = Some("spaces/42".to_string());

        let source = MockSource::scoped(vec![shared_obj, obj_item], vec![shared_tgt]);
        let scope = SpaceScope {
            identifier: "spaces/42".to_string(),
            numeric_id: None,
        };
        let engine = engine(source);
        let feed = engine.merged_feed(&session(), Some(&scope)).await.unwrap();

        let ids: Vec<&str> = feed.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["obj-only", "shared"]);
    }

    #[tokio::test]
    async fn scope_matches_reference_case_insensitively_or_payload_id() {
        let mut by_ref = item("by-ref", 1);
        by_ref.target = Some(" SPACES/42 ".to_string());
        let mut by_payload = item("by-payload", 2);
        by_payload.payload = serde_json::json!({ "space_id": 42 });
        let unrelated = item("unrelated", 3);

        let source = MockSource::scoped(vec![by_ref, by_payload, unrelated], vec![]);
        let scope = SpaceScope {
            identifier: "spaces/42".to_string(),
            numeric_id: Some(42),
        };
        let feed = engine(source)
            .merged_feed(&session(), Some(&scope))
            .await
            .unwrap();

        let ids: Vec<&str> = feed.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["by-ref", "by-payload"]);
    }

    #[tokio::test]
    async fn one_failed_query_aborts_the_whole_merge() {
        let mut source = MockSource::scoped(vec![item("a", 1)], vec![]);
        source.fail_target_query = true;
        let scope = SpaceScope {
            identifier: "spaces/42".to_string(),
            numeric_id: None,
        };

        let err = engine(source)
            .merged_feed(&session(), Some(&scope))
            .await
            .unwrap_err();
        assert!(matches!(err, WeftError::Transient(_)));
    }
}
