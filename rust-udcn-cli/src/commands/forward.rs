//! `forward` subcommand: runs the forwarding core (`rust-udcn-fw`) against
//! live QUIC faces.
//!
//! `rust-udcn-fw::Forwarder` is `Rc`-owned and expects synchronous,
//! non-blocking faces; `rust-udcn-quic::Face` is `Arc`-owned and async. This
//! module bridges the two: `FwFace` wraps a QUIC face and satisfies
//! `rust_udcn_fw::Face` by spawning a fire-and-forget send for every
//! outbound packet, and the whole forwarder runs inside a single
//! `LocalSet` task so its `Rc`s never have to cross an executor thread.

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use log::{debug, info, warn};
use rust_udcn_common::ndn::{Data, Interest, Name, Nack};
use rust_udcn_fw::face::{FaceId, FaceState, LinkType, Persistency, Scope};
use rust_udcn_fw::forwarder::DEFAULT_STRAGGLER_TIMEOUT;
use rust_udcn_fw::{Face as FwFaceTrait, Forwarder, StrategyRegistry};
use rust_udcn_quic::{
    ClientOptions, Face as QuicFace, NdnQuicTransport, ServerOptions, TransportConfig,
    TransportEvent, TransportMode, NDN_QUIC_PORT,
};
use serde::Deserialize;

/// Adapts a QUIC face onto the forwarding core's `Face` trait. `send_*`
/// enqueue the actual write as a spawned task and return immediately,
/// matching the non-blocking contract `rust_udcn_fw::face::Face` requires;
/// the forwarder never awaits these calls.
struct FwFace {
    inner: Arc<QuicFace>,
    // `FaceTable::add` is the only thing that knows the assigned id, and it
    // only knows it after taking ownership of the face; set once, right
    // after registration, by `register_face`.
    id: std::cell::Cell<FaceId>,
}

impl FwFace {
    fn new(inner: Arc<QuicFace>) -> Rc<Self> {
        Rc::new(Self {
            inner,
            id: std::cell::Cell::new(FaceId::INVALID),
        })
    }
}

impl FwFaceTrait for FwFace {
    fn id(&self) -> FaceId {
        self.id.get()
    }

    /// QUIC faces always reach a remote peer over the network.
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
        "quic://0.0.0.0"
    }

    fn remote_uri(&self) -> &str {
        self.inner.id()
    }

    fn state(&self) -> FaceState {
        FaceState::Up
    }

    fn send_interest(&self, interest: Interest) -> rust_udcn_fw::Result<()> {
        let inner = Arc::clone(&self.inner);
        let face_id = self.inner.id().to_string();
        tokio::spawn(async move {
            if let Err(e) = inner.send_interest(interest).await {
                warn!("forward: send Interest on {} failed: {}", face_id, e);
            }
        });
        Ok(())
    }

    fn send_data(&self, data: Data) -> rust_udcn_fw::Result<()> {
        let inner = Arc::clone(&self.inner);
        let face_id = self.inner.id().to_string();
        tokio::spawn(async move {
            if let Err(e) = inner.send_data(data).await {
                warn!("forward: send Data on {} failed: {}", face_id, e);
            }
        });
        Ok(())
    }

    fn send_nack(&self, nack: Nack) -> rust_udcn_fw::Result<()> {
        let inner = Arc::clone(&self.inner);
        let face_id = self.inner.id().to_string();
        tokio::spawn(async move {
            if let Err(e) = inner.send_nack(nack).await {
                warn!("forward: send Nack on {} failed: {}", face_id, e);
            }
        });
        Ok(())
    }
}

/// Mirrors spec §6's "Configuration surface", loaded the same way
/// `rust-udcn-quic::config` builds `ServerOptions`/`ClientOptions`: defaults
/// overlaid with an optional config file.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ForwarderConfig {
    pub default_strategy: String,
    pub dead_nonce_list: DeadNonceListConfig,
    pub pit: PitConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DeadNonceListConfig {
    pub lifetime_ms: u64,
    pub capacity: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PitConfig {
    pub straggler_timeout_ms: u64,
}

impl Default for ForwarderConfig {
    fn default() -> Self {
        Self {
            default_strategy: rust_udcn_fw::forwarder::DEFAULT_STRATEGY.to_string(),
            dead_nonce_list: DeadNonceListConfig::default(),
            pit: PitConfig::default(),
        }
    }
}

impl Default for DeadNonceListConfig {
    fn default() -> Self {
        Self {
            lifetime_ms: rust_udcn_fw::table::dead_nonce_list::DEFAULT_LIFETIME.as_millis() as u64,
            capacity: rust_udcn_fw::table::dead_nonce_list::DEFAULT_CAPACITY,
        }
    }
}

impl Default for PitConfig {
    fn default() -> Self {
        Self {
            straggler_timeout_ms: DEFAULT_STRAGGLER_TIMEOUT.as_millis() as u64,
        }
    }
}

impl ForwarderConfig {
    /// Loads `path` if given, else `udcn-forward.{toml,yaml,json,...}` in the
    /// current directory if present; falls back to defaults either way.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();
        builder = match path {
            Some(path) => builder.add_source(config::File::from(path)),
            None => builder.add_source(config::File::with_name("udcn-forward").required(false)),
        };
        let cfg = builder.build().context("failed to load forward config")?;
        cfg.try_deserialize()
            .context("failed to parse forward config")
    }
}

/// A static route to install at startup: dial `connect_addr`, then add a
/// FIB next-hop for `prefix` over that connection at `cost`.
pub struct StaticRoute {
    pub prefix: String,
    pub connect_addr: String,
    pub cost: u64,
}

/// Parses `PREFIX@ADDR:COST` (e.g. `/a/b@127.0.0.1:6368:10`).
pub fn parse_static_route(s: &str) -> Result<StaticRoute> {
    let (prefix, rest) = s
        .split_once('@')
        .with_context(|| format!("route '{}' is missing '@' separator", s))?;
    let (connect_addr, cost) = rest
        .rsplit_once(':')
        .with_context(|| format!("route '{}' is missing a ':<cost>' suffix", s))?;
    let cost: u64 = cost
        .parse()
        .with_context(|| format!("route '{}' has a non-numeric cost", s))?;
    Ok(StaticRoute {
        prefix: prefix.to_string(),
        connect_addr: connect_addr.to_string(),
        cost,
    })
}

/// Runs the forwarder until interrupted with Ctrl+C.
pub async fn run(
    listen_addr: Option<String>,
    cert_path: Option<PathBuf>,
    key_path: Option<PathBuf>,
    config_path: Option<PathBuf>,
    routes: Vec<String>,
) -> Result<()> {
    let config = ForwarderConfig::load(config_path.as_deref())?;
    let routes = routes
        .iter()
        .map(|s| parse_static_route(s))
        .collect::<Result<Vec<_>>>()?;

    let local = tokio::task::LocalSet::new();
    local
        .run_until(run_inner(listen_addr, cert_path, key_path, config, routes))
        .await
}

async fn run_inner(
    listen_addr: Option<String>,
    cert_path: Option<PathBuf>,
    key_path: Option<PathBuf>,
    config: ForwarderConfig,
    routes: Vec<StaticRoute>,
) -> Result<()> {
    let (cert_path, key_path) = match (cert_path, key_path) {
        (Some(cert), Some(key)) => (cert, key),
        _ => {
            let dir = std::env::temp_dir().join("udcn-forward-certs");
            generate_self_signed_certificates(&dir).await?
        }
    };

    let listen_addr_display = listen_addr
        .clone()
        .unwrap_or_else(|| format!("0.0.0.0:{}", NDN_QUIC_PORT));
    let server_options = ServerOptions {
        listen_addr: listen_addr_display.clone(),
        cert_path,
        key_path,
        ..Default::default()
    };

    let transport_config = TransportConfig {
        mode: TransportMode::Dual,
        server_options: Some(server_options),
        client_options: ClientOptions {
            verify_certificate: false,
            ..Default::default()
        },
        ..Default::default()
    };

    let transport = NdnQuicTransport::new(transport_config)
        .await
        .context("failed to start QUIC transport")?;

    let forwarder = Forwarder::with_straggler_timeout(Duration::from_millis(
        config.pit.straggler_timeout_ms,
    ));
    if config.default_strategy != rust_udcn_fw::forwarder::DEFAULT_STRATEGY {
        let registry = StrategyRegistry::builtin();
        let instance_name = Name::from_string(&config.default_strategy);
        match registry.create(&instance_name) {
            Ok(Some(strategy)) => forwarder.strategy_choice.install(&Name::from_string("/"), strategy),
            Ok(None) => anyhow::bail!("unknown strategy: {}", config.default_strategy),
            Err(e) => return Err(anyhow::anyhow!("failed to construct strategy: {}", e)),
        }
    }
    *forwarder.dead_nonce_list.borrow_mut() =
        rust_udcn_fw::table::dead_nonce_list::DeadNonceList::with_capacity(
            config.dead_nonce_list.capacity,
        );

    let quic_to_fw: Rc<RefCell<HashMap<String, FaceId>>> = Rc::new(RefCell::new(HashMap::new()));

    for route in routes {
        let face = transport
            .connect(route.connect_addr.as_str())
            .await
            .with_context(|| format!("failed to connect to {}", route.connect_addr))?;
        let fw_id = face_id_for(&forwarder, &quic_to_fw, face);
        let (entry, _) = forwarder.fib.insert(&Name::from_string(&route.prefix));
        forwarder.fib.add_or_update_next_hop(&entry, fw_id, route.cost);
        info!(
            "forward: static route {} -> {} (cost {})",
            route.prefix, route.connect_addr, route.cost
        );
    }

    println!("Forwarding core listening on {}", listen_addr_display);
    println!("Press Ctrl+C to stop the forwarder");
    info!("forward: forwarder running");

    loop {
        tokio::select! {
            event = transport.next_event() => {
                let Some(event) = event else {
                    warn!("forward: transport event stream ended");
                    break;
                };
                handle_transport_event(&forwarder, &quic_to_fw, &transport, event).await;
            }
            _ = tokio::signal::ctrl_c() => {
                println!("Shutting down forwarder...");
                break;
            }
        }
    }

    transport.close().await?;
    Ok(())
}

/// Finds or creates the `FwFace` wrapping the QUIC face identified by
/// `quic_id`, registering it with the `Forwarder`'s `FaceTable` the first
/// time it is seen.
fn face_id_for(
    forwarder: &Rc<Forwarder>,
    quic_to_fw: &Rc<RefCell<HashMap<String, FaceId>>>,
    quic_face: Arc<QuicFace>,
) -> FaceId {
    if let Some(id) = quic_to_fw.borrow().get(quic_face.id()) {
        return *id;
    }
    register_face(forwarder, quic_to_fw, quic_face)
}

fn register_face(
    forwarder: &Rc<Forwarder>,
    quic_to_fw: &Rc<RefCell<HashMap<String, FaceId>>>,
    quic_face: Arc<QuicFace>,
) -> FaceId {
    let quic_id = quic_face.id().to_string();
    let fw_face = FwFace::new(quic_face);
    let fw_id = forwarder.faces.add(fw_face.clone());
    fw_face.id.set(fw_id);
    quic_to_fw.borrow_mut().insert(quic_id, fw_id);
    fw_id
}

async fn handle_transport_event(
    forwarder: &Rc<Forwarder>,
    quic_to_fw: &Rc<RefCell<HashMap<String, FaceId>>>,
    transport: &NdnQuicTransport,
    event: TransportEvent,
) {
    match event {
        TransportEvent::FaceCreated(quic_id) => {
            if let Some(face) = find_quic_face(transport, &quic_id).await {
                face_id_for(forwarder, quic_to_fw, face);
                debug!("forward: face {} added", quic_id);
            }
        }
        TransportEvent::FaceClosed(quic_id) => {
            if let Some(fw_id) = quic_to_fw.borrow_mut().remove(&quic_id) {
                forwarder.faces.remove(fw_id);
                debug!("forward: face {} removed", quic_id);
            }
        }
        TransportEvent::InterestReceived { interest, face_id } => {
            if let Some(fw_id) = quic_to_fw.borrow().get(&face_id).copied() {
                forwarder.on_incoming_interest(fw_id, interest);
            }
        }
        TransportEvent::DataReceived { data, face_id } => {
            if let Some(fw_id) = quic_to_fw.borrow().get(&face_id).copied() {
                forwarder.on_incoming_data(fw_id, data);
            }
        }
        TransportEvent::NackReceived { nack, face_id } => {
            if let Some(fw_id) = quic_to_fw.borrow().get(&face_id).copied() {
                forwarder.on_incoming_nack(fw_id, nack);
            }
        }
        TransportEvent::Error(err) => {
            warn!("forward: transport error: {}", err);
        }
    }
}

async fn find_quic_face(transport: &NdnQuicTransport, quic_id: &str) -> Option<Arc<QuicFace>> {
    transport
        .get_faces()
        .await
        .into_iter()
        .find(|f| f.id() == quic_id)
}

/// Generates a throwaway self-signed certificate for the forwarder's QUIC
/// listener, the same way `publish.rs`'s demo server does.
async fn generate_self_signed_certificates(dir: &std::path::Path) -> Result<(PathBuf, PathBuf)> {
    use rcgen::{Certificate, CertificateParams, DnType, KeyPair, KeyUsagePurpose, SanType};
    use std::fs::File;
    use std::io::Write;

    std::fs::create_dir_all(dir)?;

    let key_pair = KeyPair::generate()?;
    let mut params = CertificateParams::default();
    params.key_pair = Some(key_pair);
    params.distinguished_name.push(DnType::CommonName, "localhost");
    params.subject_alt_names = vec![
        SanType::DnsName("localhost".to_string()),
        SanType::IpAddress(std::net::IpAddr::V4(std::net::Ipv4Addr::new(127, 0, 0, 1))),
    ];
    params.is_ca = rcgen::IsCa::SelfSignedOnly;
    params.key_usages = vec![
        KeyUsagePurpose::DigitalSignature,
        KeyUsagePurpose::KeyEncipherment,
        KeyUsagePurpose::KeyAgreement,
    ];

    let cert = Certificate::from_params(params)?;
    let cert_pem = cert.serialize_pem()?;
    let key_pem = cert.serialize_private_key_pem();

    let cert_path = dir.join("cert.pem");
    let key_path = dir.join("key.pem");
    File::create(&cert_path)?.write_all(cert_pem.as_bytes())?;
    File::create(&key_path)?.write_all(key_pem.as_bytes())?;

    Ok((cert_path, key_path))
}
