//! StrategyChoice table (spec §4.6): a name-tree mapping prefixes to the
//! `Strategy` instance effective for Interests under them.
//!
//! The root (`/`) always has an effective strategy — `install` at the root
//! with a default strategy is mandatory before `find_effective_strategy`
//! can be relied upon, mirroring NFD's requirement that the root
//! StrategyChoice entry always exists.

use std::rc::Rc;

use rust_udcn_common::ndn::Name;

use crate::strategy::Strategy;
use crate::table::name_tree::NameTree;

#[derive(Clone)]
struct Entry {
    strategy: Rc<dyn Strategy>,
}

/// Maps Name prefixes to the `Strategy` instance that governs Interests
/// under them. Every PIT entry captures its effective strategy at creation
/// time (`pit::Entry::chosen_strategy`); a later `StrategyChoice` change
/// does not affect already-pending Interests (spec §4.5/§4.6).
pub struct StrategyChoice {
    tree: NameTree<Entry>,
}

impl StrategyChoice {
    pub fn new() -> Self {
        Self {
            tree: NameTree::new(),
        }
    }

    /// Binds `strategy` to `prefix`, replacing any previous binding at
    /// exactly that prefix (finer-grained descendant bindings are
    /// untouched). Returns the previously-effective strategy at `prefix`,
    /// if narrower than an inherited ancestor binding.
    pub fn insert(&self, prefix: &Name, strategy: Rc<dyn Strategy>) {
        let node = self.tree.get_or_insert(prefix);
        node.borrow_mut().value = Some(Entry { strategy });
    }

    /// Removes the binding at exactly `prefix`, if any. Prefixes with no
    /// explicit binding inherit their nearest ancestor's strategy via
    /// `find_effective_strategy`.
    pub fn erase(&self, prefix: &Name) {
        if let Some(node) = self.tree.get(prefix) {
            node.borrow_mut().value = None;
        }
        self.tree.erase(prefix);
    }

    pub fn has_strategy(&self, prefix: &Name) -> bool {
        self.tree
            .get(prefix)
            .is_some_and(|node| node.borrow().value.is_some())
    }

    /// Longest-prefix match: the strategy bound to the nearest ancestor
    /// (including `name` itself) that has one. Panics if no root binding
    /// exists — call `install` with a default strategy at `/` first.
    pub fn find_effective_strategy(&self, name: &Name) -> Rc<dyn Strategy> {
        self.tree
            .longest_prefix_match(name, |_| true)
            .and_then(|node| node.borrow().value.as_ref().map(|e| e.strategy.clone()))
            .expect("StrategyChoice has no root binding; call install() at / first")
    }

    /// Installs `strategy` at `prefix`, used at startup for the mandatory
    /// root binding and by management to configure per-prefix strategies.
    pub fn install(&self, prefix: &Name, strategy: Rc<dyn Strategy>) {
        self.insert(prefix, strategy);
    }
}

impl Default for StrategyChoice {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::face::FaceId;
    use crate::strategy::StrategyApi;
    use crate::table::pit;
    use rust_udcn_common::ndn::Interest;
    use std::cell::RefCell;

    struct NamedStrategy {
        name: Name,
    }

    impl Strategy for NamedStrategy {
        fn instance_name(&self) -> &Name {
            &self.name
        }
        fn after_receive_interest(
            &self,
            _api: &StrategyApi<'_>,
            _pit_entry: &Rc<RefCell<pit::Entry>>,
            _in_face: FaceId,
            _interest: &Interest,
        ) {
        }
    }

    fn strategy(name: &str) -> Rc<dyn Strategy> {
        Rc::new(NamedStrategy {
            name: Name::from_string(name),
        })
    }

    #[test]
    fn root_binding_is_inherited_by_descendants() {
        let sc = StrategyChoice::new();
        sc.install(&Name::from_string("/"), strategy("/default"));
        let effective = sc.find_effective_strategy(&Name::from_string("/a/b/c"));
        assert_eq!(effective.instance_name(), &Name::from_string("/default"));
    }

    #[test]
    fn more_specific_binding_overrides_root() {
        let sc = StrategyChoice::new();
        sc.install(&Name::from_string("/"), strategy("/default"));
        sc.install(&Name::from_string("/a"), strategy("/special"));

        assert_eq!(
            sc.find_effective_strategy(&Name::from_string("/a/b"))
                .instance_name(),
            &Name::from_string("/special")
        );
        assert_eq!(
            sc.find_effective_strategy(&Name::from_string("/other"))
                .instance_name(),
            &Name::from_string("/default")
        );
    }

    #[test]
    fn erase_falls_back_to_ancestor_binding() {
        let sc = StrategyChoice::new();
        sc.install(&Name::from_string("/"), strategy("/default"));
        sc.install(&Name::from_string("/a"), strategy("/special"));
        sc.erase(&Name::from_string("/a"));

        assert_eq!(
            sc.find_effective_strategy(&Name::from_string("/a/b"))
                .instance_name(),
            &Name::from_string("/default")
        );
    }

    #[test]
    fn has_strategy_reflects_explicit_bindings_only() {
        let sc = StrategyChoice::new();
        sc.install(&Name::from_string("/"), strategy("/default"));
        assert!(sc.has_strategy(&Name::from_string("/")));
        assert!(!sc.has_strategy(&Name::from_string("/a")));
    }
}
