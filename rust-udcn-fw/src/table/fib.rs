//! Forwarding Information Base (spec §4.2): longest-prefix-match from Name
//! to a set of (Face, cost) next hops.

use std::cell::RefCell;
use std::rc::Rc;

use rust_udcn_common::ndn::Name;

use crate::face::FaceId;
use crate::table::name_tree::NameTree;

/// One (Face, cost) next hop. Ordered within an entry by `(cost asc,
/// FaceId asc)` so strategies that iterate "in order" see a deterministic
/// rotation (spec §4.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NextHop {
    pub face: FaceId,
    pub cost: u64,
}

/// A FIB entry: a prefix and its ordered next-hop list. The sentinel
/// returned by a failed longest-prefix-match has an empty Name and no next
/// hops, so callers can uniformly consult the strategy (spec §4.2).
#[derive(Debug, Default)]
pub struct EntryData {
    pub prefix: Name,
    next_hops: Vec<NextHop>,
}

impl EntryData {
    pub fn next_hops(&self) -> &[NextHop] {
        &self.next_hops
    }

    fn sort(&mut self) {
        self.next_hops
            .sort_by(|a, b| a.cost.cmp(&b.cost).then(a.face.cmp(&b.face)));
    }

    fn add_or_update_next_hop(&mut self, face: FaceId, cost: u64) {
        match self.next_hops.iter_mut().find(|nh| nh.face == face) {
            Some(nh) => nh.cost = cost,
            None => self.next_hops.push(NextHop { face, cost }),
        }
        self.sort();
    }

    fn remove_next_hop(&mut self, face: FaceId) {
        self.next_hops.retain(|nh| nh.face != face);
    }
}

pub type Entry = Rc<RefCell<EntryData>>;

/// The Forwarding Information Base. Backed by the shared `NameTree` trie
/// used by Measurements, giving both tables the same
/// `O(name.component_count())` longest-prefix-match bound (spec §4.2's
/// "Guarantees"). A flat side index (keyed by prefix) supports the
/// administrative operations (`erase`, `remove_face`) that need to walk
/// every entry rather than a single root-to-leaf path.
pub struct Fib {
    tree: NameTree<Entry>,
    by_prefix: RefCell<std::collections::HashMap<Name, Entry>>,
}

impl Fib {
    pub fn new() -> Self {
        Self {
            tree: NameTree::new(),
            by_prefix: RefCell::new(std::collections::HashMap::new()),
        }
    }

    /// `insert(prefix)` → (entry, inserted?); idempotent.
    pub fn insert(&self, prefix: &Name) -> (Entry, bool) {
        let node = self.tree.get_or_insert(prefix);
        let mut node_mut = node.borrow_mut();
        if let Some(entry) = &node_mut.value {
            return (entry.clone(), false);
        }
        let entry: Entry = Rc::new(RefCell::new(EntryData {
            prefix: prefix.clone(),
            next_hops: Vec::new(),
        }));
        node_mut.value = Some(entry.clone());
        drop(node_mut);
        self.by_prefix.borrow_mut().insert(prefix.clone(), entry.clone());
        (entry, true)
    }

    /// Longest-prefix match; always returns a valid entry — an empty-prefix
    /// sentinel with no next hops when nothing matches (spec §4.2).
    pub fn find_longest_prefix_match(&self, name: &Name) -> Entry {
        self.tree
            .longest_prefix_match(name, |_| true)
            .and_then(|node| node.borrow().value.clone())
            .unwrap_or_else(|| {
                Rc::new(RefCell::new(EntryData {
                    prefix: Name::new(),
                    next_hops: Vec::new(),
                }))
            })
    }

    pub fn erase(&self, prefix: &Name) {
        if let Some(node) = self.tree.get(prefix) {
            node.borrow_mut().value = None;
        }
        self.tree.erase(prefix);
        self.by_prefix.borrow_mut().remove(prefix);
    }

    pub fn add_or_update_next_hop(&self, entry: &Entry, face: FaceId, cost: u64) {
        entry.borrow_mut().add_or_update_next_hop(face, cost);
    }

    pub fn remove_next_hop(&self, entry: &Entry, face: FaceId) {
        entry.borrow_mut().remove_next_hop(face);
    }

    /// Removes `face` from every FIB entry's next-hop list (called from
    /// `FaceTable::before_remove`, per §5's ordering guarantee).
    pub fn remove_face(&self, face: FaceId) {
        for entry in self.by_prefix.borrow().values() {
            entry.borrow_mut().remove_next_hop(face);
        }
    }
}

impl Default for Fib {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_is_idempotent() {
        let fib = Fib::new();
        let (e1, inserted1) = fib.insert(&Name::from_string("/a"));
        let (e2, inserted2) = fib.insert(&Name::from_string("/a"));
        assert!(inserted1);
        assert!(!inserted2);
        assert!(Rc::ptr_eq(&e1, &e2));
    }

    #[test]
    fn longest_prefix_match_finds_deepest_entry() {
        let fib = Fib::new();
        let (root, _) = fib.insert(&Name::from_string("/"));
        fib.add_or_update_next_hop(&root, FaceId(1), 10);
        let (a, _) = fib.insert(&Name::from_string("/a"));
        fib.add_or_update_next_hop(&a, FaceId(2), 10);

        let matched = fib.find_longest_prefix_match(&Name::from_string("/a/b/c"));
        assert_eq!(matched.borrow().prefix, Name::from_string("/a"));
    }

    #[test]
    fn no_match_returns_empty_sentinel() {
        let fib = Fib::new();
        let matched = fib.find_longest_prefix_match(&Name::from_string("/nope"));
        assert!(matched.borrow().next_hops().is_empty());
    }

    #[test]
    fn next_hops_ordered_by_cost_then_face_id() {
        let fib = Fib::new();
        let (entry, _) = fib.insert(&Name::from_string("/a"));
        fib.add_or_update_next_hop(&entry, FaceId(3), 20);
        fib.add_or_update_next_hop(&entry, FaceId(1), 10);
        fib.add_or_update_next_hop(&entry, FaceId(2), 10);

        let hops: Vec<_> = entry.borrow().next_hops().to_vec();
        assert_eq!(
            hops,
            vec![
                NextHop { face: FaceId(1), cost: 10 },
                NextHop { face: FaceId(2), cost: 10 },
                NextHop { face: FaceId(3), cost: 20 },
            ]
        );
    }

    #[test]
    fn remove_next_hop_drops_it() {
        let fib = Fib::new();
        let (entry, _) = fib.insert(&Name::from_string("/a"));
        fib.add_or_update_next_hop(&entry, FaceId(1), 10);
        fib.remove_next_hop(&entry, FaceId(1));
        assert!(entry.borrow().next_hops().is_empty());
    }

    #[test]
    fn remove_face_purges_it_from_every_entry() {
        let fib = Fib::new();
        let (a, _) = fib.insert(&Name::from_string("/a"));
        let (b, _) = fib.insert(&Name::from_string("/b"));
        fib.add_or_update_next_hop(&a, FaceId(1), 10);
        fib.add_or_update_next_hop(&b, FaceId(1), 20);
        fib.remove_face(FaceId(1));
        assert!(a.borrow().next_hops().is_empty());
        assert!(b.borrow().next_hops().is_empty());
    }
}
