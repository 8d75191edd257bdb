//! NDN packet types and structures.
//!
//! This module provides the core data structures that represent NDN packets
//! in the µDCN implementation.

use crate::error::Error;
use crate::tlv::{self, TlvElement};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, Instant};

/// Maximum length of an NDN name component.
pub const MAX_NAME_COMPONENT_LENGTH: usize = 255;
/// Maximum number of components in an NDN name.
pub const MAX_NAME_COMPONENTS: usize = 16;
/// Maximum size of an NDN packet.
pub const MAX_NDN_PACKET_SIZE: usize = 8800;

/* ---------------------------------------------------------------- *\
 * Name and NameComponent
\* ---------------------------------------------------------------- */

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NameComponent(pub Bytes);

impl NameComponent {
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &Bytes {
        &self.0
    }

    pub fn to_tlv(&self) -> TlvElement {
        TlvElement::new(tlv::TLV_COMPONENT, self.0.clone())
    }

    pub fn from_tlv(element: &TlvElement) -> Result<Self, Error> {
        if element.tlv_type != tlv::TLV_COMPONENT {
            return Err(Error::NdnPacket(format!(
                "Expected name component TLV type {}, got {}",
                tlv::TLV_COMPONENT, element.tlv_type
            )));
        }
        Ok(Self(element.value.clone()))
    }
}

impl fmt::Display for NameComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let printable = self
            .0
            .iter()
            .all(|&b| (b.is_ascii_graphic() || b == b' '));
        if printable {
            write!(f, "{}", String::from_utf8_lossy(&self.0))
        } else {
            write!(f, "0x")?;
            for &b in &self.0 {
                write!(f, "{:02x}", b)?;
            }
            Ok(())
        }
    }
}

impl From<&str> for NameComponent {
    fn from(s: &str) -> Self {
        Self::new(s.as_bytes().to_vec())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct Name {
    components: Vec<NameComponent>,
}

impl Name {
    pub fn new() -> Self {
        Self {
            components: Vec::new(),
        }
    }

    pub fn from_string(s: &str) -> Self {
        let components = s
            .split('/')
            .filter(|comp| !comp.is_empty())
            .map(NameComponent::from)
            .collect();
        Self { components }
    }

    pub fn push(&mut self, component: NameComponent) -> &mut Self {
        self.components.push(component);
        self
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    /// Number of name components. Named to match NDN terminology used
    /// throughout the forwarding core (`name.component_count()+1` bound on
    /// longest-prefix-match traversal).
    pub fn component_count(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub fn components(&self) -> impl Iterator<Item = &NameComponent> {
        self.components.iter()
    }

    pub fn get(&self, index: usize) -> Option<&NameComponent> {
        self.components.get(index)
    }

    /// Prefix of the first `len` components.
    pub fn prefix(&self, len: usize) -> Self {
        Self {
            components: self.components.iter().take(len).cloned().collect(),
        }
    }

    /// All but the last `n` components (NFD's `Name::getPrefix(-n)`).
    /// Returns the empty name if `n >= len()`.
    pub fn prefix_dropping_last(&self, n: usize) -> Self {
        let keep = self.components.len().saturating_sub(n);
        self.prefix(keep)
    }

    pub fn is_prefix_of(&self, other: &Self) -> bool {
        self.components.len() <= other.components.len()
            && self
                .components
                .iter()
                .zip(other.components.iter())
                .all(|(a, b)| a == b)
    }

    pub fn to_tlv(&self) -> Result<TlvElement, Error> {
        let mut buf = BytesMut::new();
        for component in &self.components {
            component.to_tlv().encode(&mut buf);
        }
        Ok(TlvElement::new(tlv::TLV_NAME, buf.freeze()))
    }

    pub fn from_tlv(element: &TlvElement) -> Result<Self, Error> {
        if element.tlv_type != tlv::TLV_NAME {
            return Err(Error::NdnPacket(format!(
                "Expected name TLV type {}, got {}",
                tlv::TLV_NAME, element.tlv_type
            )));
        }

        let mut components = Vec::new();
        let mut buf = element.value.clone();
        while buf.has_remaining() {
            let e = TlvElement::decode(&mut buf)?;
            components.push(NameComponent::from_tlv(&e)?);
        }
        Ok(Self { components })
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.components.is_empty() {
            return write!(f, "/");
        }
        for component in &self.components {
            write!(f, "/{}", component)?;
        }
        Ok(())
    }
}

impl From<&str> for Name {
    fn from(s: &str) -> Self {
        Self::from_string(s)
    }
}

/* ---------------------------------------------------------------- *\
 * Selectors and Exclude
\* ---------------------------------------------------------------- */

/// A simplified Exclude filter: an explicit set of excluded name components.
///
/// The reference NDN Exclude also supports "any" ranges between components;
/// the forwarding core only ever needs equality comparison between two
/// Interests' selectors (for PIT keying), so the simplified explicit-set form
/// is sufficient and is compared structurally like every other selector.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct Exclude {
    pub components: Vec<NameComponent>,
}

impl Exclude {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }
}

/// Interest selectors beyond Name: everything the PIT uses, together with
/// Name and ForwardingHint, to decide whether two Interests are "the same
/// shape" (see spec §4.3).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct Selectors {
    pub min_suffix_components: Option<u32>,
    pub max_suffix_components: Option<u32>,
    pub publisher_public_key_locator: Option<Bytes>,
    pub exclude: Option<Exclude>,
    pub child_selector: Option<u8>,
}

impl Selectors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.min_suffix_components.is_none()
            && self.max_suffix_components.is_none()
            && self.publisher_public_key_locator.is_none()
            && self.exclude.as_ref().map_or(true, Exclude::is_empty)
            && self.child_selector.is_none()
    }
}

/* ---------------------------------------------------------------- *\
 * Interest
\* ---------------------------------------------------------------- */

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Interest {
    pub name: Name,
    pub nonce: u32,
    pub lifetime_ms: u32,
    pub hop_limit: Option<u8>,
    pub can_be_prefix: bool,
    pub must_be_fresh: bool,
    /// Selectors beyond must_be_fresh (MinSuffixComponents, MaxSuffixComponents,
    /// PublisherPublicKeyLocator, Exclude, ChildSelector). Kept separate from
    /// `must_be_fresh` for backward compatibility with callers that only set
    /// the common flag.
    #[serde(default)]
    pub selectors: Selectors,
    /// Optional ForwardingHint: an alternate Name the FIB should match
    /// against instead of `name` when present.
    #[serde(default)]
    pub forwarding_hint: Option<Name>,
    /// Opaque PIT token, round-tripped onto the matching Data's `pit_token`
    /// without participating in Interest/Data matching (see SPEC_FULL §10.6).
    #[serde(default)]
    pub pit_token: Option<Bytes>,
}

impl Interest {
    pub fn new(name: Name) -> Self {
        use std::time::{SystemTime, UNIX_EPOCH};

        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_else(|_| Duration::from_secs(0));
        let nonce = (now.as_millis() % u32::MAX as u128) as u32;

        Self {
            name,
            nonce,
            lifetime_ms: 4000,
            hop_limit: Some(32),
            can_be_prefix: false,
            must_be_fresh: true,
            selectors: Selectors::default(),
            forwarding_hint: None,
            pit_token: None,
        }
    }

    pub fn name(&self) -> &Name {
        &self.name
    }

    pub fn with_lifetime(mut self, lifetime_ms: u32) -> Self {
        self.lifetime_ms = lifetime_ms;
        self
    }
    pub fn with_nonce(mut self, nonce: u32) -> Self {
        self.nonce = nonce;
        self
    }
    pub fn with_can_be_prefix(mut self, can_be_prefix: bool) -> Self {
        self.can_be_prefix = can_be_prefix;
        self
    }
    pub fn with_must_be_fresh(mut self, must_be_fresh: bool) -> Self {
        self.must_be_fresh = must_be_fresh;
        self
    }
    pub fn with_selectors(mut self, selectors: Selectors) -> Self {
        self.selectors = selectors;
        self
    }
    pub fn with_forwarding_hint(mut self, hint: Name) -> Self {
        self.forwarding_hint = Some(hint);
        self
    }
    pub fn with_pit_token(mut self, token: impl Into<Bytes>) -> Self {
        self.pit_token = Some(token.into());
        self
    }

    /// The Name the FIB should be consulted with: the ForwardingHint if
    /// present, otherwise the Interest Name.
    pub fn fib_lookup_name(&self) -> &Name {
        self.forwarding_hint.as_ref().unwrap_or(&self.name)
    }

    /// True iff `self` and `other` would produce the same PIT entry, per
    /// spec §4.3: Name, selectors, and ForwardingHint all equal (Nonce and
    /// lifetime never participate).
    pub fn matches_pit_key(&self, other: &Interest) -> bool {
        self.name == other.name
            && self.can_be_prefix == other.can_be_prefix
            && self.must_be_fresh == other.must_be_fresh
            && self.selectors == other.selectors
            && self.forwarding_hint == other.forwarding_hint
    }

    /// Whether Data would satisfy this Interest, per NDN matching rules:
    /// Name equality (or, if `can_be_prefix`, Name is a prefix of Data's
    /// Name), and MustBeFresh is honored against the Data's freshness.
    pub fn is_satisfied_by(&self, data: &Data) -> bool {
        let name_matches = if self.can_be_prefix {
            self.name.is_prefix_of(&data.name)
        } else {
            self.name == data.name
        };
        if !name_matches {
            return false;
        }
        if self.must_be_fresh && data.is_expired() {
            return false;
        }
        true
    }

    pub fn wire_size(&self) -> Result<usize, Error> {
        Ok(self.name.to_tlv()?.len() + 20) // rough estimate
    }

    pub fn can_be_prefix(&self) -> bool {
        self.can_be_prefix
    }
    pub fn must_be_fresh(&self) -> bool {
        self.must_be_fresh
    }
    pub fn set_can_be_prefix(&mut self, can_be_prefix: bool) {
        self.can_be_prefix = can_be_prefix;
    }
    pub fn set_must_be_fresh(&mut self, must_be_fresh: bool) {
        self.must_be_fresh = must_be_fresh;
    }

    /// Encodes this Interest as a single NDN-TLV element (outer type
    /// [`tlv::TLV_INTEREST`]) into `buf`.
    pub fn encode(&self, buf: &mut BytesMut) -> Result<(), Error> {
        let mut inner = BytesMut::new();
        self.name.to_tlv()?.encode(&mut inner);
        TlvElement::new(tlv::TLV_NONCE, self.nonce.to_be_bytes().to_vec()).encode(&mut inner);
        TlvElement::new(tlv::TLV_INTEREST_LIFETIME, self.lifetime_ms.to_be_bytes().to_vec())
            .encode(&mut inner);
        if let Some(hop_limit) = self.hop_limit {
            TlvElement::new(tlv::TLV_HOP_LIMIT, vec![hop_limit]).encode(&mut inner);
        }
        let flags = (self.can_be_prefix as u8) | ((self.must_be_fresh as u8) << 1);
        TlvElement::new(tlv::TLV_FLAGS, vec![flags]).encode(&mut inner);
        if let Some(hint) = &self.forwarding_hint {
            let mut wrapped = BytesMut::new();
            hint.to_tlv()?.encode(&mut wrapped);
            TlvElement::new(tlv::TLV_FORWARDING_HINT, wrapped.freeze()).encode(&mut inner);
        }
        if let Some(token) = &self.pit_token {
            TlvElement::new(tlv::TLV_PIT_TOKEN, token.clone()).encode(&mut inner);
        }
        TlvElement::new(tlv::TLV_INTEREST, inner.freeze()).encode(buf);
        Ok(())
    }

    /// Decodes an Interest previously written by [`Interest::encode`].
    /// Selectors beyond `can_be_prefix`/`must_be_fresh` are not carried on
    /// the wire and always decode as empty.
    pub fn decode(bytes: &[u8]) -> Result<Self, Error> {
        let mut buf = Bytes::copy_from_slice(bytes);
        let outer = TlvElement::decode(&mut buf)?;
        if outer.tlv_type != tlv::TLV_INTEREST {
            return Err(Error::NdnPacket(format!(
                "Expected Interest TLV type {}, got {}",
                tlv::TLV_INTEREST,
                outer.tlv_type
            )));
        }

        let mut inner = outer.value;
        let mut name = None;
        let mut nonce = 0u32;
        let mut lifetime_ms = 4000u32;
        let mut hop_limit = None;
        let mut can_be_prefix = false;
        let mut must_be_fresh = false;
        let mut forwarding_hint = None;
        let mut pit_token = None;

        while inner.has_remaining() {
            let element = TlvElement::decode(&mut inner)?;
            match element.tlv_type {
                t if t == tlv::TLV_NAME => name = Some(Name::from_tlv(&element)?),
                t if t == tlv::TLV_NONCE => nonce = element.value.clone().get_u32(),
                t if t == tlv::TLV_INTEREST_LIFETIME => lifetime_ms = element.value.clone().get_u32(),
                t if t == tlv::TLV_HOP_LIMIT => hop_limit = element.value.first().copied(),
                t if t == tlv::TLV_FLAGS => {
                    if let Some(&flags) = element.value.first() {
                        can_be_prefix = flags & 0x01 != 0;
                        must_be_fresh = flags & 0x02 != 0;
                    }
                }
                t if t == tlv::TLV_FORWARDING_HINT => {
                    let mut wrapped = element.value.clone();
                    let hint_element = TlvElement::decode(&mut wrapped)?;
                    forwarding_hint = Some(Name::from_tlv(&hint_element)?);
                }
                t if t == tlv::TLV_PIT_TOKEN => pit_token = Some(element.value.clone()),
                _ => {}
            }
        }

        let name = name.ok_or_else(|| Error::NdnPacket("Interest missing Name".into()))?;
        Ok(Self {
            name,
            nonce,
            lifetime_ms,
            hop_limit,
            can_be_prefix,
            must_be_fresh,
            selectors: Selectors::default(),
            forwarding_hint,
            pit_token,
        })
    }
}

/* ---------------------------------------------------------------- *\
 * Data
\* ---------------------------------------------------------------- */

/// A route announcement carried on Data in response to a self-learning
/// discovery Interest (spec §4.9 self-learning; SPEC_FULL §10.6). The core
/// only round-trips this; signature validation is delegated to an external
/// RIB/validator (spec §9 Open Questions), never performed here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrefixAnnouncement {
    pub name: Name,
    pub expiration_ms: u32,
}

impl PrefixAnnouncement {
    pub fn new(name: Name, expiration_ms: u32) -> Self {
        Self { name, expiration_ms }
    }
}

/// Helper used only for deserialisation of `Data`.
#[derive(Deserialize)]
struct DataHelper {
    name: Name,
    content: Bytes,
    ttl_ms: u32,
    #[serde(default)]
    pit_token: Option<Bytes>,
    #[serde(default)]
    prefix_announcement: Option<PrefixAnnouncement>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Data {
    pub name: Name,
    pub content: Bytes,
    pub ttl_ms: u32,

    /// Creation timestamp – not serialised, regenerated on deserialisation.
    #[serde(skip_serializing)]
    pub creation_time: Instant,

    /// Opaque token copied from the in-record of the downstream this Data
    /// is being returned to; see SPEC_FULL §10.6 ("PIT tokens").
    #[serde(default)]
    pub pit_token: Option<Bytes>,

    /// Present when this Data answers a self-learning discovery Interest
    /// and the producer-side forwarder is not directly connected to the
    /// consumer (spec §4.9 self-learning; SPEC_FULL §10.6).
    #[serde(default)]
    pub prefix_announcement: Option<PrefixAnnouncement>,
}

impl<'de> Deserialize<'de> for Data {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let helper = DataHelper::deserialize(deserializer)?;
        Ok(Self {
            name: helper.name,
            content: helper.content,
            ttl_ms: helper.ttl_ms,
            creation_time: Instant::now(), // fresh timestamp
            pit_token: helper.pit_token,
            prefix_announcement: helper.prefix_announcement,
        })
    }
}

impl Data {
    pub fn new(name: Name, content: impl Into<Bytes>) -> Self {
        Self {
            name,
            content: content.into(),
            ttl_ms: 10_000,
            creation_time: Instant::now(),
            pit_token: None,
            prefix_announcement: None,
        }
    }

    pub fn name(&self) -> &Name {
        &self.name
    }

    pub fn content(&self) -> &Bytes {
        &self.content
    }

    pub fn freshness_period_ms(&self) -> u32 {
        self.ttl_ms
    }

    pub fn set_freshness_period_ms(&mut self, ttl_ms: u32) {
        self.ttl_ms = ttl_ms;
    }

    pub fn with_ttl(mut self, ttl_ms: u32) -> Self {
        self.ttl_ms = ttl_ms;
        self
    }

    pub fn with_pit_token(mut self, token: impl Into<Bytes>) -> Self {
        self.pit_token = Some(token.into());
        self
    }

    pub fn with_prefix_announcement(mut self, announcement: PrefixAnnouncement) -> Self {
        self.prefix_announcement = Some(announcement);
        self
    }

    pub fn is_expired(&self) -> bool {
        self.creation_time.elapsed() > Duration::from_millis(self.ttl_ms as u64)
    }

    pub fn wire_size(&self) -> Result<usize, Error> {
        Ok(self.name.to_tlv()?.len() + self.content.len() + 20)
    }

    /// Encodes this Data as a single NDN-TLV element (outer type
    /// [`tlv::TLV_DATA`]) into `buf`.
    pub fn encode(&self, buf: &mut BytesMut) -> Result<(), Error> {
        let mut inner = BytesMut::new();
        self.name.to_tlv()?.encode(&mut inner);
        TlvElement::new(tlv::TLV_CONTENT, self.content.clone()).encode(&mut inner);
        TlvElement::new(tlv::TLV_TTL, self.ttl_ms.to_be_bytes().to_vec()).encode(&mut inner);
        if let Some(token) = &self.pit_token {
            TlvElement::new(tlv::TLV_PIT_TOKEN, token.clone()).encode(&mut inner);
        }
        if let Some(announcement) = &self.prefix_announcement {
            let mut wrapped = BytesMut::new();
            announcement.name.to_tlv()?.encode(&mut wrapped);
            wrapped.put_u32(announcement.expiration_ms);
            TlvElement::new(tlv::TLV_PREFIX_ANNOUNCEMENT, wrapped.freeze()).encode(&mut inner);
        }
        TlvElement::new(tlv::TLV_DATA, inner.freeze()).encode(buf);
        Ok(())
    }

    /// Decodes a Data packet previously written by [`Data::encode`].
    pub fn decode(bytes: &[u8]) -> Result<Self, Error> {
        let mut buf = Bytes::copy_from_slice(bytes);
        let outer = TlvElement::decode(&mut buf)?;
        if outer.tlv_type != tlv::TLV_DATA {
            return Err(Error::NdnPacket(format!(
                "Expected Data TLV type {}, got {}",
                tlv::TLV_DATA,
                outer.tlv_type
            )));
        }

        let mut inner = outer.value;
        let mut name = None;
        let mut content = Bytes::new();
        let mut ttl_ms = 10_000u32;
        let mut pit_token = None;
        let mut prefix_announcement = None;

        while inner.has_remaining() {
            let element = TlvElement::decode(&mut inner)?;
            match element.tlv_type {
                t if t == tlv::TLV_NAME => name = Some(Name::from_tlv(&element)?),
                t if t == tlv::TLV_CONTENT => content = element.value.clone(),
                t if t == tlv::TLV_TTL => ttl_ms = element.value.clone().get_u32(),
                t if t == tlv::TLV_PIT_TOKEN => pit_token = Some(element.value.clone()),
                t if t == tlv::TLV_PREFIX_ANNOUNCEMENT => {
                    let mut wrapped = element.value.clone();
                    let name_element = TlvElement::decode(&mut wrapped)?;
                    let announcement_name = Name::from_tlv(&name_element)?;
                    let expiration_ms = wrapped.get_u32();
                    prefix_announcement =
                        Some(PrefixAnnouncement::new(announcement_name, expiration_ms));
                }
                _ => {}
            }
        }

        let name = name.ok_or_else(|| Error::NdnPacket("Data missing Name".into()))?;
        Ok(Self {
            name,
            content,
            ttl_ms,
            creation_time: Instant::now(),
            pit_token,
            prefix_announcement,
        })
    }
}

/* ---------------------------------------------------------------- *\
 * Nack
\* ---------------------------------------------------------------- */

/// Negative-acknowledgment reason lattice (spec §4.10): `NoRoute < Duplicate
/// < Congestion`, more severe overrides when combining Nacks from multiple
/// upstreams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NackReason {
    None,
    NoRoute,
    Duplicate,
    Congestion,
}

impl NackReason {
    fn severity(self) -> u8 {
        match self {
            NackReason::None => 0,
            NackReason::NoRoute => 1,
            NackReason::Duplicate => 2,
            NackReason::Congestion => 3,
        }
    }

    /// `true` if `self` is less severe than `other` on the lattice.
    pub fn is_less_severe_than(self, other: NackReason) -> bool {
        self.severity() < other.severity()
    }

    /// Combine two Nack reasons, keeping the least-severe one (more severe
    /// dominates): `combine(NoRoute, Congestion) == Congestion`.
    pub fn combine(self, other: NackReason) -> NackReason {
        if self.severity() >= other.severity() {
            self
        } else {
            other
        }
    }
}

impl fmt::Display for NackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            NackReason::None => "None",
            NackReason::NoRoute => "NoRoute",
            NackReason::Duplicate => "Duplicate",
            NackReason::Congestion => "Congestion",
        };
        write!(f, "{}", s)
    }
}

/// A negative acknowledgment: carries the Interest it responds to (matched
/// by Name+Nonce against an out-record) plus a reason.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Nack {
    pub interest: Interest,
    pub reason: NackReason,
}

impl Nack {
    pub fn new(interest: Interest, reason: NackReason) -> Self {
        Self { interest, reason }
    }

    fn reason_to_byte(reason: NackReason) -> u8 {
        match reason {
            NackReason::None => 0,
            NackReason::NoRoute => 1,
            NackReason::Duplicate => 2,
            NackReason::Congestion => 3,
        }
    }

    fn reason_from_byte(byte: u8) -> NackReason {
        match byte {
            1 => NackReason::NoRoute,
            2 => NackReason::Duplicate,
            3 => NackReason::Congestion,
            _ => NackReason::None,
        }
    }

    /// Encodes this Nack as a single NDN-TLV element (outer type
    /// [`tlv::TLV_NACK`]), wrapping the full Interest it responds to.
    pub fn encode(&self, buf: &mut BytesMut) -> Result<(), Error> {
        let mut inner = BytesMut::new();
        self.interest.encode(&mut inner)?;
        TlvElement::new(tlv::TLV_NACK_REASON, vec![Self::reason_to_byte(self.reason)])
            .encode(&mut inner);
        TlvElement::new(tlv::TLV_NACK, inner.freeze()).encode(buf);
        Ok(())
    }

    /// Decodes a Nack previously written by [`Nack::encode`].
    pub fn decode(bytes: &[u8]) -> Result<Self, Error> {
        let mut buf = Bytes::copy_from_slice(bytes);
        let outer = TlvElement::decode(&mut buf)?;
        if outer.tlv_type != tlv::TLV_NACK {
            return Err(Error::NdnPacket(format!(
                "Expected Nack TLV type {}, got {}",
                tlv::TLV_NACK,
                outer.tlv_type
            )));
        }

        let mut inner = outer.value;
        let mut interest = None;
        let mut reason = NackReason::None;

        while inner.has_remaining() {
            let element = TlvElement::decode(&mut inner)?;
            match element.tlv_type {
                t if t == tlv::TLV_INTEREST => {
                    let mut wrapped = BytesMut::new();
                    element.encode(&mut wrapped);
                    interest = Some(Interest::decode(&wrapped)?);
                }
                t if t == tlv::TLV_NACK_REASON => {
                    reason = element
                        .value
                        .first()
                        .copied()
                        .map(Self::reason_from_byte)
                        .unwrap_or(NackReason::None);
                }
                _ => {}
            }
        }

        let interest = interest.ok_or_else(|| Error::NdnPacket("Nack missing Interest".into()))?;
        Ok(Self { interest, reason })
    }
}

/* ---------------------------------------------------------------- *\
 * Misc
\* ---------------------------------------------------------------- */

/// Outcome of a client-side `express_interest` call (see
/// `rust-udcn-quic::Face`), as distinct from the forwarding core's own
/// pending-Interest bookkeeping (`rust_udcn_fw::table::pit`).
#[derive(Debug, Clone)]
pub enum InterestResult {
    Data(Data),
    Nacked(Nack),
    Timeout,
    NetworkError(String),
}

#[cfg(test)]
mod tests;
