//! Random (spec §4.9): collect every eligible next-hop, shuffle, and send
//! to whichever lands first. No retransmission handling beyond reusing the
//! same eligible set each time a retry comes through.

use std::cell::RefCell;
use std::rc::Rc;

use rand::seq::SliceRandom;

use rust_udcn_common::ndn::{Interest, Name, NackReason};

use crate::face::FaceId;
use crate::strategy::{parse_instance_name, parse_known_parameters, require_supported_version, Strategy, StrategyApi};
use crate::table::pit;

/// The only instance-name version this strategy implements.
const SUPPORTED_VERSION: u64 = 1;

pub struct Random {
    name: Name,
}

impl Random {
    /// Constructs random from an instance name of the form
    /// `/localhost/nfd/strategy/random[/%FD01]` (spec §4.7). Fails with
    /// `Error::Strategy` on an unsupported version or any parameter — this
    /// strategy takes none.
    pub fn new(name: Name) -> crate::Result<Rc<dyn Strategy>> {
        let parsed = parse_instance_name(&name);
        require_supported_version(&parsed, SUPPORTED_VERSION)?;
        parse_known_parameters(&parsed, &[])?;
        Ok(Rc::new(Self { name }))
    }
}

impl Strategy for Random {
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
        let mut hops: Vec<FaceId> = fib_entry
            .borrow()
            .next_hops()
            .iter()
            .map(|nh| nh.face)
            .filter(|&hop| super::is_next_hop_eligible(api, pit_entry, in_face, hop))
            .collect();

        if hops.is_empty() {
            if !pit_entry.borrow().has_unexpired_out_records() {
                api.send_nacks(pit_entry, NackReason::NoRoute);
                api.reject_pending_interest(pit_entry);
            }
            return;
        }

        hops.shuffle(&mut rand::thread_rng());
        let _ = api.send_interest(pit_entry, hops[0], true);
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
        sent_interests: StdRefCell<Vec<Interest>>,
    }

    impl RecordingFace {
        fn new(id: u64) -> Rc<Self> {
            Rc::new(Self {
                id: FaceId(id),
                sent_interests: StdRefCell::new(Vec::new()),
            })
        }
    }

    impl crate::Face for RecordingFace {
        fn id(&self) -> FaceId {
            self.id
        }
        fn scope(&self) -> Scope {
            Scope::NonLocal
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
        let strategy = Random::new(Name::from_string("/localhost/nfd/strategy/random")).unwrap();
        forwarder.strategy_choice.install(&Name::from_string("/"), strategy);
    }

    #[test]
    fn sends_to_exactly_one_eligible_nexthop() {
        let forwarder = Forwarder::new();
        setup(&forwarder);
        let consumer = RecordingFace::new(1);
        let hop_a = RecordingFace::new(2);
        let hop_b = RecordingFace::new(3);
        forwarder.faces.add_reserved(consumer, FaceId(1)).unwrap();
        forwarder.faces.add_reserved(hop_a.clone(), FaceId(2)).unwrap();
        forwarder.faces.add_reserved(hop_b.clone(), FaceId(3)).unwrap();

        let (fib_entry, _) = forwarder.fib.insert(&Name::from_string("/a"));
        forwarder.fib.add_or_update_next_hop(&fib_entry, FaceId(2), 10);
        forwarder.fib.add_or_update_next_hop(&fib_entry, FaceId(3), 10);

        forwarder.on_incoming_interest(FaceId(1), Interest::new(Name::from_string("/a/b")));

        let total = hop_a.sent_interests.borrow().len() + hop_b.sent_interests.borrow().len();
        assert_eq!(total, 1);
    }

    #[test]
    fn no_eligible_nexthop_rejects_with_no_route() {
        let forwarder = Forwarder::new();
        setup(&forwarder);
        let consumer = RecordingFace::new(1);
        forwarder.faces.add_reserved(consumer.clone(), FaceId(1)).unwrap();

        forwarder.on_incoming_interest(FaceId(1), Interest::new(Name::from_string("/nowhere")));
        assert!(consumer.sent_interests.borrow().is_empty());
    }

    #[test]
    fn rejects_an_unsupported_version() {
        let err = Random::new(Name::from_string("/localhost/nfd/strategy/random/%FD99")).unwrap_err();
        assert!(matches!(err, crate::Error::Strategy(_)));
    }

    #[test]
    fn rejects_an_unrecognized_parameter() {
        let err = Random::new(Name::from_string("/localhost/nfd/strategy/random/%FD01/bogus~1")).unwrap_err();
        assert!(matches!(err, crate::Error::Strategy(_)));
    }
}
