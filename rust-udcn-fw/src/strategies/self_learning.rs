//! Self-learning (spec §4.9): discover a route by broadcasting when the FIB
//! has nothing for a name, then learn it from a returning
//! `PrefixAnnouncement` so later Interests on that downstream unicast along
//! the learned path instead of broadcasting again.
//!
//! Signature validation of the announcement is explicitly out of scope —
//! that belongs to an external RIB/validator (spec §9 Open Questions); this
//! strategy only round-trips whatever the producer attached.

use std::cell::RefCell;
use std::rc::Rc;

use rust_udcn_common::ndn::{Data, Interest, Name, NackReason};

use crate::face::{FaceId, Scope};
use crate::strategy::{parse_instance_name, parse_known_parameters, require_supported_version, Strategy, StrategyApi};
use crate::table::pit;

/// Cost assigned to a route materialized from a learned `PrefixAnnouncement`.
/// Kept low so an administratively configured route still wins ties.
const LEARNED_ROUTE_COST: u64 = 1;

/// The only instance-name version this strategy implements.
const SUPPORTED_VERSION: u64 = 1;

pub struct SelfLearning {
    name: Name,
}

impl SelfLearning {
    /// Constructs self-learning from an instance name of the form
    /// `/localhost/nfd/strategy/self-learning[/%FD01]` (spec §4.7). Fails
    /// with `Error::Strategy` on an unsupported version or any parameter —
    /// this strategy takes none.
    pub fn new(name: Name) -> crate::Result<Rc<dyn Strategy>> {
        let parsed = parse_instance_name(&name);
        require_supported_version(&parsed, SUPPORTED_VERSION)?;
        parse_known_parameters(&parsed, &[])?;
        Ok(Rc::new(Self { name }))
    }

    fn is_discovery(&self, pit_entry: &Rc<RefCell<pit::Entry>>, in_face: FaceId) -> bool {
        match pit_entry.borrow().get_in_record(in_face) {
            Some(record) => !record.is_non_discovery,
            None => true,
        }
    }
}

impl Strategy for SelfLearning {
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
        let has_route = !fib_entry.borrow().next_hops().is_empty();

        if has_route {
            let mut any_sent = false;
            let hops: Vec<FaceId> = fib_entry.borrow().next_hops().iter().map(|nh| nh.face).collect();
            for hop in hops {
                if !super::is_next_hop_eligible(api, pit_entry, in_face, hop) {
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
            return;
        }

        if !self.is_discovery(pit_entry, in_face) {
            if !pit_entry.borrow().has_unexpired_out_records() {
                api.send_nacks(pit_entry, NackReason::NoRoute);
                api.reject_pending_interest(pit_entry);
            }
            return;
        }

        let mut any_sent = false;
        for face_id in api.faces.ids() {
            if face_id == in_face {
                continue;
            }
            let Some(face) = api.faces.get(face_id) else { continue };
            if face.scope() != Scope::NonLocal {
                continue;
            }
            if !super::is_eligible_ignoring_out_record(api, pit_entry, in_face, face_id) {
                continue;
            }
            if api.send_interest(pit_entry, face_id, true).is_ok() {
                any_sent = true;
            }
        }

        if !any_sent && !pit_entry.borrow().has_unexpired_out_records() {
            api.send_nacks(pit_entry, NackReason::NoRoute);
            api.reject_pending_interest(pit_entry);
        }
    }

    fn after_receive_data(
        &self,
        api: &StrategyApi<'_>,
        pit_entry: &Rc<RefCell<pit::Entry>>,
        in_face: FaceId,
        data: &Data,
    ) {
        let Some(announcement) = &data.prefix_announcement else {
            return;
        };
        api.add_nexthop(&announcement.name, in_face, LEARNED_ROUTE_COST);

        let downstream_faces: Vec<FaceId> = pit_entry.borrow().in_records().map(|r| r.face).collect();
        let mut entry = pit_entry.borrow_mut();
        for face in downstream_faces {
            entry.set_in_record_non_discovery(face, true);
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
    use crate::face::{FaceState, LinkType, Persistency};
    use crate::forwarder::Forwarder;
    use rust_udcn_common::ndn::PrefixAnnouncement;
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
        fn send_data(&self, _data: Data) -> crate::Result<()> {
            Ok(())
        }
        fn send_nack(&self, _nack: rust_udcn_common::ndn::Nack) -> crate::Result<()> {
            Ok(())
        }
    }

    fn setup(forwarder: &Rc<Forwarder>) {
        let strategy = SelfLearning::new(Name::from_string("/localhost/nfd/strategy/self-learning")).unwrap();
        forwarder.strategy_choice.install(&Name::from_string("/"), strategy);
    }

    #[test]
    fn no_route_broadcasts_to_non_local_faces_except_ingress() {
        let forwarder = Forwarder::new();
        setup(&forwarder);
        let consumer = RecordingFace::new(1, Scope::NonLocal);
        let hop_a = RecordingFace::new(2, Scope::NonLocal);
        let hop_b = RecordingFace::new(3, Scope::NonLocal);
        forwarder.faces.add_reserved(consumer, FaceId(1)).unwrap();
        forwarder.faces.add_reserved(hop_a.clone(), FaceId(2)).unwrap();
        forwarder.faces.add_reserved(hop_b.clone(), FaceId(3)).unwrap();

        forwarder.on_incoming_interest(FaceId(1), Interest::new(Name::from_string("/a/b")));

        assert_eq!(hop_a.sent_interests.borrow().len(), 1);
        assert_eq!(hop_b.sent_interests.borrow().len(), 1);
    }

    #[test]
    fn prefix_announcement_on_data_installs_a_learned_route() {
        let forwarder = Forwarder::new();
        setup(&forwarder);
        let consumer = RecordingFace::new(1, Scope::NonLocal);
        let producer_face = RecordingFace::new(2, Scope::NonLocal);
        forwarder.faces.add_reserved(consumer, FaceId(1)).unwrap();
        forwarder.faces.add_reserved(producer_face, FaceId(2)).unwrap();

        forwarder.on_incoming_interest(FaceId(1), Interest::new(Name::from_string("/a/b")));

        let data = Data::new(Name::from_string("/a/b"), bytes::Bytes::new())
            .with_prefix_announcement(PrefixAnnouncement::new(Name::from_string("/a"), 60_000));
        forwarder.on_incoming_data(FaceId(2), data);

        let fib_entry = forwarder.fib.find_longest_prefix_match(&Name::from_string("/a/b"));
        assert!(fib_entry
            .borrow()
            .next_hops()
            .iter()
            .any(|nh| nh.face == FaceId(2)));
    }

    #[test]
    fn rejects_an_unsupported_version() {
        let err = SelfLearning::new(Name::from_string("/localhost/nfd/strategy/self-learning/%FD99")).unwrap_err();
        assert!(matches!(err, crate::Error::Strategy(_)));
    }

    #[test]
    fn rejects_an_unrecognized_parameter() {
        let err =
            SelfLearning::new(Name::from_string("/localhost/nfd/strategy/self-learning/%FD01/bogus~1")).unwrap_err();
        assert!(matches!(err, crate::Error::Strategy(_)));
    }
}
