//! Polymorphic strategy-info slots on PIT and Measurements entries.
//!
//! The source keeps a type-id + dynamic-cast pattern so each strategy can
//! stash its own bookkeeping on a shared table entry without every strategy
//! knowing about every other strategy's data. The idiomatic replacement
//! (per §9 Design Notes) is a `TypeId -> Box<dyn StrategyInfo>` map: each
//! strategy downcasts its own slot out and leaves everyone else's alone.
//!
//! Because the map owns its `Box<dyn StrategyInfo>` values, dropping the map
//! (which happens when its containing PIT/Measurements entry is erased)
//! drops every strategy-info block, which in turn drops any `ScopedEventId`
//! it holds — satisfying the "destroying an entry cancels its timers"
//! invariant for free, rather than needing an explicit cleanup pass.

use std::any::{Any, TypeId};
use std::collections::HashMap;

/// Marker trait for strategy-specific bookkeeping stored on a table entry.
/// Implementors are typically small structs holding a `RttEstimator`, a
/// `ScopedEventId`, or a `FaceId`.
pub trait StrategyInfo: Any {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> StrategyInfo for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// A per-entry map from `TypeId` to boxed strategy-info. Each strategy
/// should only ever touch the slot keyed by its own info type(s);
/// `MeasurementsAccessor` enforces this for Measurements, the PIT relies on
/// strategies behaving (as in the source).
#[derive(Default)]
pub struct StrategyInfoMap {
    slots: HashMap<TypeId, Box<dyn StrategyInfo>>,
}

impl StrategyInfoMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get<T: StrategyInfo + 'static>(&self) -> Option<&T> {
        self.slots
            .get(&TypeId::of::<T>())
            .and_then(|b| b.as_any().downcast_ref::<T>())
    }

    pub fn get_mut<T: StrategyInfo + 'static>(&mut self) -> Option<&mut T> {
        self.slots
            .get_mut(&TypeId::of::<T>())
            .and_then(|b| b.as_any_mut().downcast_mut::<T>())
    }

    /// Inserts a value, replacing (and dropping) any previous value of the
    /// same type. Returns the previous value's slot as dropped, matching
    /// `HashMap::insert`'s semantics of returning the old value if present.
    pub fn insert<T: StrategyInfo + 'static>(&mut self, value: T) {
        self.slots.insert(TypeId::of::<T>(), Box::new(value));
    }

    pub fn remove<T: StrategyInfo + 'static>(&mut self) {
        self.slots.remove(&TypeId::of::<T>());
    }

    pub fn contains<T: StrategyInfo + 'static>(&self) -> bool {
        self.slots.contains_key(&TypeId::of::<T>())
    }

    /// Gets the slot for `T`, inserting `default()`'s result if absent.
    pub fn get_or_insert_with<T: StrategyInfo + 'static>(
        &mut self,
        default: impl FnOnce() -> T,
    ) -> &mut T {
        self.slots
            .entry(TypeId::of::<T>())
            .or_insert_with(|| Box::new(default()))
            .as_any_mut()
            .downcast_mut::<T>()
            .expect("type-id keyed slot holds a mismatched type")
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Drops every strategy-info slot, canceling any timers they own.
    pub fn clear(&mut self) {
        self.slots.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Foo {
        value: u32,
    }
    struct Bar {
        value: &'static str,
    }

    #[test]
    fn insert_and_get_round_trip_by_type() {
        let mut map = StrategyInfoMap::new();
        map.insert(Foo { value: 42 });
        map.insert(Bar { value: "hello" });

        assert_eq!(map.get::<Foo>().unwrap().value, 42);
        assert_eq!(map.get::<Bar>().unwrap().value, "hello");
    }

    #[test]
    fn get_mut_allows_in_place_update() {
        let mut map = StrategyInfoMap::new();
        map.insert(Foo { value: 1 });
        map.get_mut::<Foo>().unwrap().value = 2;
        assert_eq!(map.get::<Foo>().unwrap().value, 2);
    }

    #[test]
    fn remove_clears_only_that_type() {
        let mut map = StrategyInfoMap::new();
        map.insert(Foo { value: 1 });
        map.insert(Bar { value: "x" });
        map.remove::<Foo>();
        assert!(map.get::<Foo>().is_none());
        assert!(map.get::<Bar>().is_some());
    }

    #[test]
    fn get_or_insert_with_only_constructs_once() {
        let mut map = StrategyInfoMap::new();
        let mut constructed = 0;
        {
            let foo = map.get_or_insert_with(|| {
                constructed += 1;
                Foo { value: 7 }
            });
            foo.value += 1;
        }
        map.get_or_insert_with(|| {
            constructed += 1;
            Foo { value: 99 }
        });
        assert_eq!(constructed, 1);
        assert_eq!(map.get::<Foo>().unwrap().value, 8);
    }

    #[test]
    fn dropping_the_map_drops_every_slot() {
        use std::cell::RefCell;
        use std::rc::Rc;

        struct DropSpy(Rc<RefCell<bool>>);
        impl Drop for DropSpy {
            fn drop(&mut self) {
                *self.0.borrow_mut() = true;
            }
        }

        let dropped = Rc::new(RefCell::new(false));
        let mut map = StrategyInfoMap::new();
        map.insert(DropSpy(dropped.clone()));
        assert!(!*dropped.borrow());
        drop(map);
        assert!(*dropped.borrow());
    }
}
