use std::collections::HashSet;

use async_trait::async_trait;
use tracing::info;
use uuid::Uuid;
use weft_common::{PropertyStatement, WeftError};
use weft_graph::{GraphReader, GraphWriter};

/// Persistence seam for the reconciler: submit a node's new statement list
/// and read back what the authoritative store actually holds.
#[async_trait]
pub trait StatementStore: Send + Sync {
    async fn replace_statements(
        &self,
        node_id: Uuid,
        statements: &[PropertyStatement],
    ) -> Result<(), WeftError>;

    async fn fetch_statements(&self, node_id: Uuid) -> Result<Vec<PropertyStatement>, WeftError>;
}

/// The graph store as a [`StatementStore`].
pub struct GraphStatementStore {
    pub writer: GraphWriter,
    pub reader: GraphReader,
}

#[async_trait]
impl StatementStore for GraphStatementStore {
    async fn replace_statements(
        &self,
        node_id: Uuid,
        statements: &[PropertyStatement],
    ) -> Result<(), WeftError> {
        self.writer.replace_node_statements(node_id, statements).await
    }

    async fn fetch_statements(&self, node_id: Uuid) -> Result<Vec<PropertyStatement>, WeftError> {
        self.reader.node_statements(node_id).await
    }
}

/// Merges a node's attached statements with the full candidate list from
/// the external knowledge base and tracks which statement ids the user has
/// chosen to keep.
///
/// Selection membership is independent per statement; group-level toggles
/// are derived bulk operations, not stored state.
pub struct Reconciler {
    node_id: Uuid,
    candidates: Vec<PropertyStatement>,
    selection: HashSet<String>,
}

impl Reconciler {
    /// Build from the provider's candidate list and the statements currently
    /// attached in the store. Attached statements missing from the candidate
    /// list (removed upstream) are retained so the user can still see and
    /// deselect them; the initial selection is exactly the attached set.
    pub fn new(
        node_id: Uuid,
        candidates: Vec<PropertyStatement>,
        attached: &[PropertyStatement],
    ) -> Self {
        let mut merged = candidates;
        for statement in attached {
            if !merged.iter().any(|c| c.statement_id == statement.statement_id) {
                merged.push(statement.clone());
            }
        }
        let selection = attached
            .iter()
            .map(|s| s.statement_id.clone())
            .collect();

        Self {
            node_id,
            candidates: merged,
            selection,
        }
    }

    pub fn candidates(&self) -> &[PropertyStatement] {
        &self.candidates
    }

    pub fn is_selected(&self, statement_id: &str) -> bool {
        self.selection.contains(statement_id)
    }

    pub fn selected_count(&self) -> usize {
        self.selection.len()
    }

    /// Grouping key for display: property id when present, else the label.
    /// Statements with neither are ungrouped but still listed and
    /// individually selectable.
    pub fn group_key(statement: &PropertyStatement) -> Option<&str> {
        match statement.property_id.as_deref() {
            Some(p) if !p.is_empty() => Some(p),
            _ => {
                let label = statement.label.trim();
                (!label.is_empty()).then_some(label)
            }
        }
    }

    /// Candidate groups in first-appearance order, each with the statements
    /// that share its key.
    pub fn groups(&self) -> Vec<(String, Vec<&PropertyStatement>)> {
        let mut groups: Vec<(String, Vec<&PropertyStatement>)> = Vec::new();
        for statement in &self.candidates {
            let Some(key) = Self::group_key(statement) else {
                continue;
            };
            match groups.iter_mut().find(|(k, _)| k.as_str() == key) {
                Some((_, members)) => members.push(statement),
                None => groups.push((key.to_string(), vec![statement])),
            }
        }
        groups
    }

    /// Flip one statement's membership. Unknown ids are ignored.
    pub fn toggle(&mut self, statement_id: &str) {
        if !self
            .candidates
            .iter()
            .any(|c| c.statement_id == statement_id)
        {
            return;
        }
        if !self.selection.remove(statement_id) {
            self.selection.insert(statement_id.to_string());
        }
    }

    /// Bulk-toggle a group: if every member is selected, deselect them all;
    /// otherwise select the missing ones, so a partially-selected group
    /// becomes fully selected.
    pub fn toggle_group(&mut self, group_key: &str) {
        let member_ids: Vec<String> = self
            .candidates
            .iter()
            .filter(|s| Self::group_key(s) == Some(group_key))
            .map(|s| s.statement_id.clone())
            .collect();
        self.bulk_toggle(member_ids);
    }

    /// Global version of [`toggle_group`](Self::toggle_group) across every
    /// known statement id.
    pub fn toggle_all(&mut self) {
        let all_ids: Vec<String> = self
            .candidates
            .iter()
            .map(|s| s.statement_id.clone())
            .collect();
        self.bulk_toggle(all_ids);
    }

    fn bulk_toggle(&mut self, ids: Vec<String>) {
        if ids.is_empty() {
            return;
        }
        let all_selected = ids.iter().all(|id| self.selection.contains(id));
        if all_selected {
            for id in &ids {
                self.selection.remove(id);
            }
        } else {
            for id in ids {
                self.selection.insert(id);
            }
        }
    }

    /// The selected statements, in candidate order.
    pub fn selected_statements(&self) -> Vec<PropertyStatement> {
        self.candidates
            .iter()
            .filter(|s| self.selection.contains(&s.statement_id))
            .cloned()
            .collect()
    }

    /// Submit the selection as the node's new property list, then refetch
    /// from the authoritative store and re-derive the selection from what it
    /// actually holds. Failures surface verbatim with no partial apply; the
    /// local selection is left untouched so the user can retry.
    pub async fn commit(&mut self, store: &dyn StatementStore) -> Result<(), WeftError> {
        let submitted = self.selected_statements();
        store.replace_statements(self.node_id, &submitted).await?;

        let attached = store.fetch_statements(self.node_id).await?;
        self.selection = attached
            .iter()
            .map(|s| s.statement_id.clone())
            .collect();
        for statement in attached {
            if !self
                .candidates
                .iter()
                .any(|c| c.statement_id == statement.statement_id)
            {
                self.candidates.push(statement);
            }
        }

        info!(node = %self.node_id, selected = self.selection.len(), "Statement selection committed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use weft_common::StatementValue;

    fn stmt(id: &str, property: Option<&str>, label: &str) -> PropertyStatement {
        PropertyStatement {
            statement_id: id.to_string(),
            property_id: property.map(str::to_string),
            label: label.to_string(),
            value: StatementValue::Scalar(format!("value of {id}")),
        }
    }

    fn candidates() -> Vec<PropertyStatement> {
        vec![
            stmt("s1", Some("P17"), "country"),
            stmt("s2", Some("P17"), "country"),
            stmt("s3", Some("P17"), "country"),
            stmt("s4", Some("P131"), "located in"),
            stmt("s5", None, "note"),
        ]
    }

    #[test]
    fn selection_starts_from_attached_statements() {
        let attached = vec![stmt("s1", Some("P17"), "country")];
        let r = Reconciler::new(Uuid::new_v4(), candidates(), &attached);
        assert!(r.is_selected("s1"));
        assert!(!r.is_selected("s2"));
    }

    #[test]
    fn attached_statements_missing_upstream_are_retained() {
        let attached = vec![stmt("gone", Some("P999"), "stale")];
        let r = Reconciler::new(Uuid::new_v4(), candidates(), &attached);
        assert!(r.candidates().iter().any(|c| c.statement_id == "gone"));
        assert!(r.is_selected("gone"));
    }

    #[test]
    fn toggle_flips_membership() {
        let mut r = Reconciler::new(Uuid::new_v4(), candidates(), &[]);
        r.toggle("s1");
        assert!(r.is_selected("s1"));
        r.toggle("s1");
        assert!(!r.is_selected("s1"));
        // Unknown ids never enter the selection.
        r.toggle("nope");
        assert_eq!(r.selected_count(), 0);
    }

    #[test]
    fn partially_selected_group_becomes_fully_selected() {
        let mut r = Reconciler::new(Uuid::new_v4(), candidates(), &[]);
        r.toggle("s1");
        r.toggle("s2");

        // 2 of 3 selected in group P17: toggling fills, not clears.
        r.toggle_group("P17");
        assert!(r.is_selected("s1"));
        assert!(r.is_selected("s2"));
        assert!(r.is_selected("s3"));

        // Now fully selected: toggling clears.
        r.toggle_group("P17");
        assert!(!r.is_selected("s1"));
        assert!(!r.is_selected("s2"));
        assert!(!r.is_selected("s3"));
    }

    #[test]
    fn toggle_all_is_the_global_group_toggle() {
        let mut r = Reconciler::new(Uuid::new_v4(), candidates(), &[]);
        r.toggle("s4");

        r.toggle_all();
        assert_eq!(r.selected_count(), 5);

        r.toggle_all();
        assert_eq!(r.selected_count(), 0);
    }

    #[test]
    fn grouping_falls_back_to_label_when_property_id_is_absent() {
        let r = Reconciler::new(Uuid::new_v4(), candidates(), &[]);
        let groups = r.groups();
        let keys: Vec<&str> = groups.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["P17", "P131", "note"]);
        assert_eq!(groups[0].1.len(), 3);
    }

    struct MockStore {
        replaced: Mutex<Vec<Vec<PropertyStatement>>>,
        fetch_result: Mutex<Vec<PropertyStatement>>,
        fail_replace: bool,
    }

    impl MockStore {
        fn new() -> Self {
            Self {
                replaced: Mutex::new(Vec::new()),
                fetch_result: Mutex::new(Vec::new()),
                fail_replace: false,
            }
        }
    }

    #[async_trait]
    impl StatementStore for MockStore {
        async fn replace_statements(
            &self,
            _node_id: Uuid,
            statements: &[PropertyStatement],
        ) -> Result<(), WeftError> {
            if self.fail_replace {
                return Err(WeftError::Transient("store unavailable".to_string()));
            }
            self.replaced.lock().unwrap().push(statements.to_vec());
            *self.fetch_result.lock().unwrap() = statements.to_vec();
            Ok(())
        }

        async fn fetch_statements(
            &self,
            _node_id: Uuid,
        ) -> Result<Vec<PropertyStatement>, WeftError> {
            Ok(self.fetch_result.lock().unwrap().clone())
        }
    }

    #[tokio::test]
    async fn commit_submits_selection_and_rederives_from_refetch() {
        let mut r = Reconciler::new(Uuid::new_v4(), candidates(), &[]);
        r.toggle("s1");
        r.toggle("s4");

        let store = MockStore::new();
        r.commit(&store).await.unwrap();

        let submitted = &store.replaced.lock().unwrap()[0];
        let ids: Vec<&str> = submitted.iter().map(|s| s.statement_id.as_str()).collect();
        assert_eq!(ids, vec!["s1", "s4"]);
        assert!(r.is_selected("s1"));
        assert!(r.is_selected("s4"));
        assert_eq!(r.selected_count(), 2);
    }

    #[tokio::test]
    async fn failed_commit_leaves_selection_untouched() {
        let mut r = Reconciler::new(Uuid::new_v4(), candidates(), &[]);
        r.toggle("s1");

        let store = MockStore {
            fail_replace: true,
            ..MockStore::new()
        };
        let err = r.commit(&store).await.unwrap_err();
        assert!(matches!(err, WeftError::Transient(_)));
        assert!(r.is_selected("s1"));
    }

    #[tokio::test]
    async fn commit_rederives_selection_from_store_truth() {
        // The store keeps only one of the two submitted statements; the
        // re-derived selection reflects the store, not the submission.
        struct DroppingStore;

        #[async_trait]
        impl StatementStore for DroppingStore {
            async fn replace_statements(
                &self,
                _node_id: Uuid,
                _statements: &[PropertyStatement],
            ) -> Result<(), WeftError> {
                Ok(())
            }

            async fn fetch_statements(
                &self,
                _node_id: Uuid,
            ) -> Result<Vec<PropertyStatement>, WeftError> {
                Ok(vec![stmt("s1", Some("P17"), "country")])
            }
        }

        let mut r = Reconciler::new(Uuid::new_v4(), candidates(), &[]);
        r.toggle("s1");
        r.toggle("s2");

        r.commit(&DroppingStore).await.unwrap();
        assert!(r.is_selected("s1"));
        assert!(!r.is_selected("s2"));
    }
}
