use std::{
    cmp::Ordering,
    collections::{HashMap, HashSet},
};

/// Union-Find (Disjoint-Set Union) over sparse ids.
///
/// The parents and ranks are kept in hash maps keyed by id, so the ids do not
/// need to be dense. [`DisjointSet::find`] does not modify the structure;
/// call [`DisjointSet::compress_sets`] once all unions are done to make every
/// id point directly to its root.
#[derive(Debug, Clone, Default)]
pub struct DisjointSet {
    /// Parent pointers (id of the parent, or the id itself if root).
    parent: HashMap<usize, usize>,
    /// Rank for union by rank.
    rank: HashMap<usize, usize>,
}

impl DisjointSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(n: usize) -> Self {
        DisjointSet {
            parent: HashMap::with_capacity(n),
            rank: HashMap::with_capacity(n),
        }
    }

    /// Number of tracked ids.
    pub fn len(&self) -> usize {
        self.parent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parent.is_empty()
    }

    /// Start tracking `id` as a singleton set. Returns `false` if `id` is
    /// already tracked, in which case nothing changes.
    pub fn make_set(&mut self, id: usize) -> bool {
        if self.parent.contains_key(&id) {
            return false;
        }
        self.parent.insert(id, id);
        self.rank.insert(id, 0);
        true
    }

    pub fn contains(&self, id: usize) -> bool {
        self.parent.contains_key(&id)
    }

    pub fn parent(&self, id: usize) -> Option<usize> {
        self.parent.get(&id).copied()
    }

    /// Find the root of the set containing `id`, without path compression.
    pub fn find(&self, id: usize) -> Option<usize> {
        let mut current = id;
        loop {
            let parent = self.parent(current)?;
            if parent == current {
                return Some(current);
            }
            current = parent;
        }
    }

    /// Make the root with the lower rank a child of the other, using union by
    /// rank. Both ids must be roots. Returns the root of the merged set.
    pub fn link(&mut self, root_x: usize, root_y: usize) -> usize {
        if root_x == root_y {
            return root_x;
        }
        let rank_x = self.rank.get(&root_x).copied().unwrap_or(0);
        let rank_y = self.rank.get(&root_y).copied().unwrap_or(0);
        match rank_x.cmp(&rank_y) {
            Ordering::Less => {
                self.parent.insert(root_x, root_y);
                root_y
            }
            Ordering::Greater => {
                self.parent.insert(root_y, root_x);
                root_x
            }
            Ordering::Equal => {
                self.parent.insert(root_y, root_x);
                self.rank.insert(root_x, rank_x + 1);
                root_x
            }
        }
    }

    /// Union the sets containing `x` and `y`. Returns the root of the merged
    /// set, or `None` if either id is not tracked.
    pub fn union_set(&mut self, x: usize, y: usize) -> Option<usize> {
        let root_x = self.find(x)?;
        let root_y = self.find(y)?;
        Some(self.link(root_x, root_y))
    }

    /// Point every id in `ids` directly to its root.
    pub fn compress_sets(&mut self, ids: impl IntoIterator<Item = usize>) {
        for id in ids {
            if let Some(root) = self.find(id) {
                self.parent.insert(id, root);
            }
        }
    }

    /// Number of distinct sets among the tracked ids in `ids`.
    pub fn count_sets(&self, ids: impl IntoIterator<Item = usize>) -> usize {
        ids.into_iter()
            .filter_map(|id| self.find(id))
            .collect::<HashSet<_>>()
            .len()
    }
}

#[cfg(test)]
mod test {
    use proptest::prelude::*;

    use super::DisjointSet;

    #[test]
    fn t_singletons() {
        let mut dset = DisjointSet::new();
        assert!(dset.make_set(10));
        assert!(dset.make_set(1_000_000));
        assert!(!dset.make_set(10));
        assert_eq!(dset.len(), 2);
        assert_eq!(dset.find(10), Some(10));
        assert_eq!(dset.find(3), None);
        assert!(!dset.contains(3));
        assert_eq!(dset.count_sets([10, 1_000_000, 3]), 2);
    }

    #[test]
    fn t_union_by_rank() {
        let mut dset = DisjointSet::new();
        for id in [1, 2, 3, 4] {
            dset.make_set(id);
        }
        let r12 = dset.union_set(1, 2).expect("Ids must be tracked");
        assert_eq!(r12, 1);
        // The deeper tree absorbs the singleton.
        assert_eq!(dset.union_set(3, 2), Some(1));
        assert_eq!(dset.parent(3), Some(1));
        assert_eq!(dset.union_set(4, 5), None);
        assert_eq!(dset.union_set(1, 3), Some(1));
        assert_eq!(dset.count_sets([1, 2, 3, 4]), 2);
    }

    #[test]
    fn t_compress() {
        let mut dset = DisjointSet::new();
        for id in 0..8 {
            dset.make_set(id);
        }
        // Build a chain by linking roots of equal rank.
        dset.union_set(0, 1);
        dset.union_set(2, 3);
        dset.union_set(0, 2);
        dset.union_set(4, 5);
        dset.union_set(6, 7);
        dset.union_set(4, 6);
        dset.union_set(0, 4);
        assert_eq!(dset.parent(3), Some(2));
        dset.compress_sets(0..8);
        for id in 0..8 {
            assert_eq!(dset.parent(id), Some(0));
        }
    }

    proptest! {
        #[test]
        fn t_matches_naive_partition(
            pairs in prop::collection::vec((0usize..32, 0usize..32), 0..48)
        ) {
            let mut dset = DisjointSet::with_capacity(32);
            let mut labels: Vec<usize> = (0..32).collect();
            for id in 0..32 {
                dset.make_set(id * 7);
            }
            for (a, b) in pairs {
                dset.union_set(a * 7, b * 7);
                let (from, to) = (labels[a], labels[b]);
                for l in labels.iter_mut().filter(|l| **l == from) {
                    *l = to;
                }
            }
            dset.compress_sets((0..32).map(|i| i * 7));
            for a in 0..32 {
                prop_assert_eq!(dset.parent(a * 7), dset.find(a * 7));
                for b in 0..32 {
                    prop_assert_eq!(
                        dset.find(a * 7) == dset.find(b * 7),
                        labels[a] == labels[b]
                    );
                }
            }
            let mut distinct = labels.clone();
            distinct.sort();
            distinct.dedup();
            prop_assert_eq!(dset.count_sets((0..32).map(|i| i * 7)), distinct.len());
        }
    }
}
