//! Multicast (spec §4.9): forward a new Interest to every eligible
//! next-hop; suppress a retransmission from the same downstream within the
//! per-face exponential window, otherwise re-fan-out to eligible upstreams
//! that haven't been retried recently.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Duration;

use rust_udcn_common::ndn::{Interest, Name, NackReason};

use crate::algorithm::{RetxSuppressionExponentialPerFace, RetxSuppressionResult};
use crate::face::FaceId;
use crate::strategy::{parse_instance_name, parse_known_parameters, require_supported_version, Strategy, StrategyApi};
use crate::table::pit;

/// The only instance-name version this strategy implements.
const SUPPORTED_VERSION: u64 = 1;

/// Per-out-face suppression intervals, stored as PIT-entry strategy-info
/// (mirrors NFD's multicast strategy keeping its own retx bookkeeping
/// rather than relying on the entry-wide `RetxSuppressionExponential`).
#[derive(Default)]
struct MulticastInfo {
    intervals: HashMap<FaceId, Duration>,
}

pub struct Multicast {
    name: Name,
    suppression: RetxSuppressionExponentialPerFace,
}

impl Multicast {
    /// Constructs multicast from an instance name of the form
    /// `/localhost/nfd/strategy/multicast[/%FD01]` (spec §4.7). Fails with
    /// `Error::Strategy` on an unsupported version or any parameter — this
    /// strategy takes none.
    pub fn new(name: Name) -> crate::Result<Rc<dyn Strategy>> {
        let parsed = parse_instance_name(&name);
        require_supported_version(&parsed, SUPPORTED_VERSION)?;
        parse_known_parameters(&parsed, &[])?;
        Ok(Rc::new(Self {
            name,
            suppression: RetxSuppressionExponentialPerFace::default(),
        }))
    }
}

impl Strategy for Multicast {
    fn instance_name(&self) -> &Name {
        &self.name
    }

    fn after_receive_interest(
        &self,
        api: &StrategyApi<'_>,
        pit_entry: &Rc<RefCell<pit::Entry>>,
        in_face: FaceId,
        interest: &Interest,
    ) {
        let fib_entry = api.lookup_fib(interest);
        let hops: Vec<FaceId> = fib_entry.borrow().next_hops().iter().map(|nh| nh.face).collect();

        let mut any_sent = false;
        for hop in hops {
            if !super::is_eligible_ignoring_out_record(api, pit_entry, in_face, hop) {
                continue;
            }
            let (last_renewed, current_interval) = {
                let entry = pit_entry.borrow();
                let last = entry.get_out_record(hop).map(|r| r.last_renewed);
                let interval = entry
                    .strategy_info
                    .get::<MulticastInfo>()
                    .and_then(|i| i.intervals.get(&hop).copied());
                (last, interval)
            };
            let (decision, next_interval) = self.suppression.decide(last_renewed, current_interval);
            if matches!(decision, RetxSuppressionResult::Suppress) {
                continue;
            }
            if api.send_interest(pit_entry, hop, true).is_ok() {
                any_sent = true;
                pit_entry
                    .borrow_mut()
                    .strategy_info
                    .get_or_insert_with(MulticastInfo::default)
                    .intervals
                    .insert(hop, next_interval);
            }
        }

        if !any_sent && !pit_entry.borrow().has_unexpired_out_records() {
            api.send_nacks(pit_entry, NackReason::NoRoute);
            api.reject_pending_interest(pit_entry);
        }
    }

    fn after_receive_nack(
        &self,
        api: &StrategyApi<'_>,
        pit_entry: &Rc<RefCell<pit::Entry>>,
        _in_face: FaceId,
        _nack: &rust_udcn_common::ndn::Nack,
    ) {
        super::process_nack(api, pit_entry);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::face::{FaceState, LinkType, Persistency, Scope};
    use crate::forwarder::Forwarder;
    use std::cell::RefCell as StdRefCell;

    struct RecordingFace {
        id: FaceId,
        scope: Scope,
        sent_interests: StdRefCell<Vec<Interest>>,
    }

    impl RecordingFace {
        fn new(id: u64, scope: Scope) -> Rc<Self> {
            Rc::new(Self {
                id: FaceId(id),
                scope,
                sent_interests: StdRefCell::new(Vec::new()),
            })
        }
    }

    impl crate::Face for RecordingFace {
        fn id(&self) -> FaceId {
            self.id
        }
        fn scope(&self) -> Scope {
            self.scope
        }
        fn link_type(&self) -> LinkType {
            LinkType::PointToPoint
        }
        fn persistency(&self) -> Persistency {
            Persistency::Persistent
        }
        fn local_uri(&self) -> &str {
            "test://local"
        }
        fn remote_uri(&self) -> &str {
            "test://remote"
        }
        fn state(&self) -> FaceState {
            FaceState::Up
        }
        fn send_interest(&self, interest: Interest) -> crate::Result<()> {
            self.sent_interests.borrow_mut().push(interest);
            Ok(())
        }
        fn send_data(&self, _data: rust_udcn_common::ndn::Data) -> crate::Result<()> {
            Ok(())
        }
        fn send_nack(&self, _nack: rust_udcn_common::ndn::Nack) -> crate::Result<()> {
            Ok(())
        }
    }

    fn setup(forwarder: &Rc<Forwarder>) {
        let strategy = Multicast::new(Name::from_string("/localhost/nfd/strategy/multicast")).unwrap();
        forwarder.strategy_choice.install(&Name::from_string("/"), strategy);
    }

    #[test]
    fn new_interest_fans_out_to_every_eligible_nexthop() {
        let forwarder = Forwarder::new();
        setup(&forwarder);
        let consumer = RecordingFace::new(1, Scope::NonLocal);
        let hop_a = RecordingFace::new(2, Scope::NonLocal);
        let hop_b = RecordingFace::new(3, Scope::NonLocal);
        forwarder.faces.add_reserved(consumer, FaceId(1)).unwrap();
        forwarder.faces.add_reserved(hop_a.clone(), FaceId(2)).unwrap();
        forwarder.faces.add_reserved(hop_b.clone(), FaceId(3)).unwrap();

        let (fib_entry, _) = forwarder.fib.insert(&Name::from_string("/a"));
        forwarder.fib.add_or_update_next_hop(&fib_entry, FaceId(2), 10);
        forwarder.fib.add_or_update_next_hop(&fib_entry, FaceId(3), 10);

        forwarder.on_incoming_interest(FaceId(1), Interest::new(Name::from_string("/a/b")));

        assert_eq!(hop_a.sent_interests.borrow().len(), 1);
        assert_eq!(hop_b.sent_interests.borrow().len(), 1);
    }

    #[test]
    fn scope_violation_prevents_localhop_crossing_non_local_to_non_local() {
        let forwarder = Forwarder::new();
        setup(&forwarder);
        let consumer = RecordingFace::new(1, Scope::NonLocal);
        let hop = RecordingFace::new(2, Scope::NonLocal);
        forwarder.faces.add_reserved(consumer, FaceId(1)).unwrap();
        forwarder.faces.add_reserved(hop.clone(), FaceId(2)).unwrap();

        let (fib_entry, _) = forwarder.fib.insert(&Name::from_string("/localhop/x"));
        forwarder.fib.add_or_update_next_hop(&fib_entry, FaceId(2), 10);

        forwarder.on_incoming_interest(FaceId(1), Interest::new(Name::from_string("/localhop/x/y")));

        assert!(hop.sent_interests.borrow().is_empty());
    }

    #[test]
    fn retransmission_within_suppression_window_is_suppressed() {
        let forwarder = Forwarder::new();
        setup(&forwarder);
        let consumer = RecordingFace::new(1, Scope::NonLocal);
        let hop = RecordingFace::new(2, Scope::NonLocal);
        forwarder.faces.add_reserved(consumer, FaceId(1)).unwrap();
        forwarder.faces.add_reserved(hop.clone(), FaceId(2)).unwrap();

        let (fib_entry, _) = forwarder.fib.insert(&Name::from_string("/a"));
        forwarder.fib.add_or_update_next_hop(&fib_entry, FaceId(2), 10);

        let interest = Interest::new(Name::from_string("/a/b")).with_nonce(1);
        forwarder.on_incoming_interest(FaceId(1), interest.clone());
        forwarder.on_incoming_interest(FaceId(1), interest.clone().with_nonce(2));

        assert_eq!(hop.sent_interests.borrow().len(), 1);
    }

    #[test]
    fn rejects_an_unsupported_version() {
        let err = Multicast::new(Name::from_string("/localhost/nfd/strategy/multicast/%FD99")).unwrap_err();
        assert!(matches!(err, crate::Error::Strategy(_)));
    }

    #[test]
    fn rejects_an_unrecognized_parameter() {
        let err = Multicast::new(Name::from_string("/localhost/nfd/strategy/multicast/%FD01/bogus~1")).unwrap_err();
        assert!(matches!(err, crate::Error::Strategy(_)));
    }
}
