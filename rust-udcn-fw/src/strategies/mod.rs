//! Reference strategies (spec §4.9): the seven out-of-the-box forwarding
//! policies a prefix can be bound to via `StrategyChoice`. Each lives in its
//! own module and is wired into a fresh `StrategyRegistry` by
//! `register_builtins`, mirroring NFD's `available-strategies.cpp`.

mod access;
mod asf;
mod best_route;
mod multicast;
mod ncc;
mod random;
mod self_learning;

use std::cell::RefCell;
use std::rc::Rc;

use crate::algorithm::{self, NackCombination};
use crate::face::FaceId;
use crate::strategy::StrategyApi;
use crate::table::{fib, pit};
use crate::StrategyRegistry;
use rust_udcn_common::ndn::NackReason;

/// Whether `next_hop` is a legal forwarding target for `pit_entry`'s
/// Interest, given it arrived on `in_face`: not the downstream itself, no
/// unexpired out-record already outstanding on it, its face still
/// resolvable, and scope-compliant (spec §4.9's "eligible next-hop"; used
/// by every reference strategy except multicast, which manages its own
/// per-face retransmission timing instead of the blanket unexpired check).
pub(crate) fn is_next_hop_eligible(
    api: &StrategyApi<'_>,
    pit_entry: &Rc<RefCell<pit::Entry>>,
    in_face: FaceId,
    next_hop: FaceId,
) -> bool {
    if next_hop == in_face {
        return false;
    }
    let (interest, has_unexpired_out) = {
        let entry = pit_entry.borrow();
        (entry.interest.clone(), entry.has_unexpired_out_record_for(next_hop))
    };
    if has_unexpired_out {
        return false;
    }
    let Some(out_face_obj) = api.get_face(next_hop) else {
        return false;
    };
    let Some(in_face_obj) = api.get_face(in_face) else {
        return true;
    };
    !algorithm::would_violate_scope(in_face_obj.as_ref(), &interest, out_face_obj.as_ref())
}

/// Same eligibility rule minus the unexpired-out-record check, for
/// strategies (multicast) that decide per-face retransmission timing
/// themselves via `RetxSuppressionExponentialPerFace`.
pub(crate) fn is_eligible_ignoring_out_record(
    api: &StrategyApi<'_>,
    pit_entry: &Rc<RefCell<pit::Entry>>,
    in_face: FaceId,
    next_hop: FaceId,
) -> bool {
    if next_hop == in_face {
        return false;
    }
    let Some(out_face_obj) = api.get_face(next_hop) else {
        return false;
    };
    let interest = pit_entry.borrow().interest.clone();
    let Some(in_face_obj) = api.get_face(in_face) else {
        return true;
    };
    !algorithm::would_violate_scope(in_face_obj.as_ref(), &interest, out_face_obj.as_ref())
}

/// Walks `fib_entry`'s next hops in their canonical `(cost, FaceId)` order
/// as a ring, starting just after `start_after` (or at the beginning, if
/// `None`), and returns the first eligible one encountered. Used by
/// best-route for both the initial lowest-cost pick (`start_after = None`)
/// and the "next eligible nexthop after the last one used, wrapping around"
/// retransmission rule (spec §4.9).
pub(crate) fn next_eligible_hop(
    api: &StrategyApi<'_>,
    pit_entry: &Rc<RefCell<pit::Entry>>,
    in_face: FaceId,
    fib_entry: &fib::Entry,
    start_after: Option<FaceId>,
) -> Option<FaceId> {
    let hops: Vec<FaceId> = fib_entry.borrow().next_hops().iter().map(|nh| nh.face).collect();
    if hops.is_empty() {
        return None;
    }
    let start_idx = match start_after {
        Some(face) => hops.iter().position(|&f| f == face).map(|i| (i + 1) % hops.len()).unwrap_or(0),
        None => 0,
    };
    (0..hops.len())
        .map(|i| hops[(start_idx + i) % hops.len()])
        .find(|&candidate| is_next_hop_eligible(api, pit_entry, in_face, candidate))
}

/// `ProcessNackTraits::processNack` (spec §4.10), the reaction shared by
/// every reference strategy that reacts to Nacks at all: fold the PIT
/// entry's out-record Nacks and either wait, Nack the lone un-Nacked
/// downstream-doubling face, or Nack every downstream.
pub(crate) fn process_nack(api: &StrategyApi<'_>, pit_entry: &Rc<RefCell<pit::Entry>>) {
    match algorithm::combine_nacks(&pit_entry.borrow()) {
        NackCombination::Wait => {}
        NackCombination::NackOne { face, reason } => {
            let _ = api.send_nack(pit_entry, face, reason);
        }
        NackCombination::NackAll { reason } => {
            api.send_nacks(pit_entry, reason);
        }
    }
}

/// Forwards to every eligible next-hop in `fib_entry`, except those in
/// `exclude`; rejects the entry with Nack(NoRoute) if nothing could be sent
/// and no out-record is outstanding from an earlier attempt. Shared by
/// multicast's fallback paths and access-strategy's multicast fallback.
pub(crate) fn multicast_except(
    api: &StrategyApi<'_>,
    pit_entry: &Rc<RefCell<pit::Entry>>,
    in_face: FaceId,
    fib_entry: &fib::Entry,
    exclude: &[FaceId],
) -> bool {
    let hops: Vec<FaceId> = fib_entry.borrow().next_hops().iter().map(|nh| nh.face).collect();
    let mut any_sent = false;
    for hop in hops {
        if exclude.contains(&hop) {
            continue;
        }
        if !is_next_hop_eligible(api, pit_entry, in_face, hop) {
            continue;
        }
        if api.send_interest(pit_entry, hop, true).is_ok() {
            any_sent = true;
        }
    }
    if !any_sent && !pit_entry.borrow().has_unexpired_out_records() {
        api.send_nacks(pit_entry, NackReason::NoRoute);
        api.reject_pending_interest(pit_entry);
    }
    any_sent
}

/// Registers the seven reference strategies under their canonical short
/// names (spec §4.9). `StrategyRegistry::builtin()` is the usual entry
/// point; `Forwarder` installs `best-route` at `/` by default (spec §6
/// `default_strategy`).
pub fn register_builtins(registry: &mut StrategyRegistry) {
    registry.register("best-route", best_route::BestRoute::new);
    registry.register("multicast", multicast::Multicast::new);
    registry.register("access", access::Access::new);
    registry.register("asf", asf::Asf::new);
    registry.register("ncc", ncc::Ncc::new);
    registry.register("random", random::Random::new);
    registry.register("self-learning", self_learning::SelfLearning::new);
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_udcn_common::ndn::Name;

    #[test]
    fn register_builtins_covers_all_seven_reference_strategies() {
        let registry = StrategyRegistry::builtin();
        for name in [
            "best-route",
            "multicast",
            "access",
            "asf",
            "ncc",
            "random",
            "self-learning",
        ] {
            assert!(registry.is_registered(name), "{name} should be registered");
        }
    }

    #[test]
    fn builtin_factories_construct_successfully() {
        let registry = StrategyRegistry::builtin();
        let created = registry
            .create(&Name::from_string("/localhost/nfd/strategy/best-route"))
            .unwrap();
        assert!(created.is_some());
    }

    #[test]
    fn builtin_factories_reject_an_unsupported_version() {
        let registry = StrategyRegistry::builtin();
        let err = registry
            .create(&Name::from_string("/localhost/nfd/strategy/best-route/%FD99"))
            .unwrap_err();
        assert!(matches!(err, crate::Error::Strategy(_)));
    }

    #[test]
    fn builtin_factories_reject_an_unknown_parameter() {
        let registry = StrategyRegistry::builtin();
        let err = registry
            .create(&Name::from_string("/localhost/nfd/strategy/random/bogus~1"))
            .unwrap_err();
        assert!(matches!(err, crate::Error::Strategy(_)));
    }

    #[test]
    fn builtin_factories_accept_a_named_version_for_every_strategy() {
        let registry = StrategyRegistry::builtin();
        for name in [
            "/localhost/nfd/strategy/best-route/%FD05",
            "/localhost/nfd/strategy/multicast/%FD01",
            "/localhost/nfd/strategy/access/%FD01",
            "/localhost/nfd/strategy/asf/%FD01",
            "/localhost/nfd/strategy/ncc/%FD01",
            "/localhost/nfd/strategy/random/%FD01",
            "/localhost/nfd/strategy/self-learning/%FD01",
        ] {
            let created = registry.create(&Name::from_string(name)).unwrap();
            assert!(created.is_some(), "{name} should construct");
        }
    }
}
