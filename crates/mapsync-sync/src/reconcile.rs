//! Delta reconciliation between rendered features and fetched records.

use std::collections::{BTreeSet, HashMap};

use mapsync_core::{FeatureId, Record};

/// Identifiers currently believed to be on the overlay.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderedSet {
    ids: BTreeSet<FeatureId>,
}

impl RenderedSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FeatureId> {
        self.ids.iter()
    }

    pub(crate) fn clear(&mut self) {
        self.ids.clear();
    }

    pub(crate) fn insert(&mut self, id: FeatureId) {
        self.ids.insert(id);
    }

    pub(crate) fn remove(&mut self, id: &str) {
        self.ids.remove(id);
    }
}

impl FromIterator<FeatureId> for RenderedSet {
    fn from_iter<I: IntoIterator<Item = FeatureId>>(iter: I) -> Self {
        Self {
            ids: iter.into_iter().collect(),
        }
    }
}

impl<'a> FromIterator<&'a str> for RenderedSet {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        iter.into_iter().map(str::to_string).collect()
    }
}

/// Result of one diff: what to add, what to remove, and the set afterwards.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reconciliation {
    /// Records not yet rendered, in input order.
    pub to_add: Vec<Record>,
    /// Rendered ids missing from the latest records.
    pub to_remove: Vec<FeatureId>,
    /// `current ∪ ids(to_add) − to_remove`.
    pub rendered: RenderedSet,
}

impl Reconciliation {
    /// True when neither list has work; callers skip host calls entirely.
    pub fn is_noop(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }
}

/// Diff `latest` against `current`.
///
/// Duplicate ids in `latest` keep the position of their first occurrence and
/// the value of their last one.
pub fn reconcile(current: &RenderedSet, latest: Vec<Record>) -> Reconciliation {
    let mut position_by_id: HashMap<FeatureId, usize> = HashMap::with_capacity(latest.len());
    let mut unique: Vec<Record> = Vec::with_capacity(latest.len());

    for record in latest {
        match position_by_id.get(&record.id) {
            Some(&pos) => unique[pos] = record,
            None => {
                position_by_id.insert(record.id.clone(), unique.len());
                unique.push(record);
            }
        }
    }

    let to_remove: Vec<FeatureId> = current
        .iter()
        .filter(|id| !position_by_id.contains_key(*id))
        .cloned()
        .collect();

    let to_add: Vec<Record> = unique
        .into_iter()
        .filter(|r| !current.contains(&r.id))
        .collect();

    let mut rendered = current.clone();
    for record in &to_add {
        rendered.insert(record.id.clone());
    }
    for id in &to_remove {
        rendered.remove(id);
    }

    Reconciliation {
        to_add,
        to_remove,
        rendered,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(id: &str) -> Record {
        Record::new(id, 0.0, 0.0)
    }

    fn ids(records: &[Record]) -> Vec<&str> {
        records.iter().map(|r| r.id.as_str()).collect()
    }

    #[test]
    fn test_add_and_remove() {
        let current: RenderedSet = ["a", "b"].into_iter().collect();
        let r = reconcile(&current, vec![rec("b"), rec("c")]);

        assert_eq!(ids(&r.to_add), vec!["c"]);
        assert_eq!(r.to_remove, vec!["a".to_string()]);
        let expected: RenderedSet = ["b", "c"].into_iter().collect();
        assert_eq!(r.rendered, expected);
        assert!(!r.is_noop());
    }

    #[test]
    fn test_empty_to_empty_is_noop() {
        let r = reconcile(&RenderedSet::new(), Vec::new());
        assert!(r.to_add.is_empty());
        assert!(r.to_remove.is_empty());
        assert!(r.rendered.is_empty());
        assert!(r.is_noop());
    }

    #[test]
    fn test_empty_latest_removes_everything() {
        let current: RenderedSet = ["x", "y", "z"].into_iter().collect();
        let r = reconcile(&current, Vec::new());
        assert!(r.to_add.is_empty());
        assert_eq!(r.to_remove.len(), 3);
        assert!(r.rendered.is_empty());
    }

    #[test]
    fn test_second_pass_is_idempotent() {
        let records = vec![rec("a"), rec("b"), rec("c")];
        let first = reconcile(&RenderedSet::new(), records.clone());
        assert_eq!(first.to_add.len(), 3);

        let second = reconcile(&first.rendered, records);
        assert!(second.is_noop());
        assert_eq!(second.rendered, first.rendered);
    }

    #[test]
    fn test_add_preserves_input_order() {
        let r = reconcile(&RenderedSet::new(), vec![rec("q"), rec("a"), rec("m")]);
        assert_eq!(ids(&r.to_add), vec!["q", "a", "m"]);
    }

    #[test]
    fn test_duplicate_ids_last_write_wins() {
        let first = Record::new("dup", 1.0, 1.0).with_name("first");
        let last = Record::new("dup", 2.0, 2.0).with_name("last");
        let r = reconcile(&RenderedSet::new(), vec![first, rec("other"), last]);

        assert_eq!(ids(&r.to_add), vec!["dup", "other"]);
        assert_eq!(r.to_add[0].name, "last");
        assert_eq!(r.rendered.len(), 2);
    }

    #[test]
    fn test_attribute_changes_do_not_re_add() {
        let current: RenderedSet = ["a"].into_iter().collect();
        let moved = Record::new("a", 10.0, 10.0).with_name("renamed");
        assert!(reconcile(&current, vec![moved]).is_noop());
    }

    #[test]
    fn test_sound_and_minimal_across_shapes() {
        let cases: Vec<(Vec<&str>, Vec<&str>)> = vec![
            (vec![], vec!["a"]),
            (vec!["a"], vec![]),
            (vec!["a", "b", "c"], vec!["c", "d", "a"]),
            (vec!["a", "b"], vec!["a", "b"]),
            (vec!["a"], vec!["b", "b", "a"]),
        ];

        for (current, latest) in cases {
            let current_set: RenderedSet = current.iter().copied().collect();
            let latest_records: Vec<Record> = latest.iter().map(|id| rec(id)).collect();
            let r = reconcile(&current_set, latest_records);

            let expected: RenderedSet = latest.iter().copied().collect();
            assert_eq!(r.rendered, expected, "rendered must equal latest ids");
            for record in &r.to_add {
                assert!(!current_set.contains(&record.id));
            }
            for id in &r.to_remove {
                assert!(!latest.contains(&id.as_str()));
            }
        }
    }
}
