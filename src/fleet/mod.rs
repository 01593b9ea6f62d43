//! Fleet scheduler: binds one UDP socket per simulated device and drives
//! each device's read loop, trap delivery, and cron ticker as one unit.
//!
//! Grounded on the teacher's top-level client construction (`new` validates
//! and resolves configuration without touching the network; binding and
//! spawning happen in a separate `connect`/`start` step) generalized from
//! "one socket" to "one socket per agent", and on `trap::cron::CronTicker`'s
//! sleep-then-check-handle shape reused here for the fleet's own shutdown
//! polling.

pub mod buffer_pool;
mod listener;

use crate::agent::{AgentConfig, VirtualAgent};
use crate::config::{RoutingConfig, V3UserConfig, VariationConfig};
use crate::dataset::{Dataset, DatasetStore};
use crate::error::{ConfigErrorKind, Error, Result};
use crate::oid::Oid;
use crate::recording;
use crate::router::Router;
use crate::trap::cron::CronTicker;
use crate::trap::{
    DEFAULT_QUEUE_CAPACITY, DEFAULT_SEND_TIMEOUT, TrapDestination, TrapManager, TrapManagerHandle,
};
use crate::transport::AgentUdpTransport;
use crate::v3::{EngineBootsStore, EngineState};
use crate::variation::VariationBinder;
use buffer_pool::BufferPool;
use bytes::Bytes;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Construction-time configuration for a fleet of simulated devices.
pub struct FleetOptions {
    pub listen_addr: IpAddr,
    pub port_start: u16,
    pub port_end: u16,
    pub num_devices: usize,
    /// `.snmprec` file backing the default dataset every agent starts from.
    pub dataset_path: PathBuf,
    pub routes: Option<RoutingConfig>,
    pub variations: Option<VariationConfig>,
    pub v3_users: Vec<V3UserConfig>,
    pub trap_destinations: Vec<TrapDestination>,
    /// Standard five-field cron expression driving the scheduled trap
    /// source; `None` runs the fleet with no cron ticker.
    pub cron_expr: Option<String>,
    pub set_trap_oids: Option<Vec<Oid>>,
    /// Where each agent's `engineBoots` counter is persisted across
    /// restarts. Required so RFC 3414's non-repeating-boots guarantee
    /// survives a fleet restart.
    pub engine_boots_path: PathBuf,
    pub community: String,
}

/// A fleet of simulated SNMP devices sharing one process.
///
/// `new` resolves configuration and constructs every agent without
/// touching the network; `start` binds one socket per agent and spawns
/// its read loop, trap delivery task, and (if configured) cron ticker.
pub struct Fleet {
    listen_addr: IpAddr,
    agents: Vec<Arc<VirtualAgent>>,
    hooks: Vec<TrapManagerHandle>,
    managers: Option<Vec<TrapManager>>,
    pool: Arc<BufferPool>,
    cron_expr: Option<String>,
    shutdown: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl Fleet {
    pub async fn new(options: FleetOptions) -> Result<Self> {
        if options.port_start > options.port_end {
            return Err(Error::config(ConfigErrorKind::OutOfRange {
                detail: "port_start must not exceed port_end".into(),
            }));
        }
        let available_ports = (options.port_end - options.port_start) as usize + 1;
        if options.num_devices == 0 || options.num_devices > available_ports {
            return Err(Error::config(ConfigErrorKind::OutOfRange {
                detail: format!(
                    "{} devices requested but only {} ports available in range",
                    options.num_devices, available_ports
                ),
            }));
        }

        check_fd_limit(options.num_devices);

        let records = recording::load_file(&options.dataset_path)?;
        let default_store = recording::build_store(&records, None, None);
        let mut datasets = DatasetStore::new(Dataset::new(default_store));

        let router = match options.routes {
            Some(cfg) => {
                let rules = cfg.into_rules()?;
                for rule in &rules {
                    if let Some(path) = &rule.dataset {
                        if datasets.names().any(|n| n == path.as_str()) {
                            continue;
                        }
                        let recs = recording::load_file(path)?;
                        let store = recording::build_store(&recs, None, None);
                        datasets.insert(path.clone(), Dataset::new(store));
                    }
                }
                Router::new(rules)
            }
            None => Router::new(Vec::new()),
        };
        let router = Arc::new(router);
        let datasets = Arc::new(datasets);

        let variation = match options.variations {
            Some(cfg) => VariationBinder::new(cfg.into_bindings()?),
            None => VariationBinder::empty(),
        };

        let boots_store = EngineBootsStore::new(options.engine_boots_path.clone());
        let mut agents = Vec::with_capacity(options.num_devices);
        let mut hooks = Vec::with_capacity(options.num_devices);
        let mut managers = Vec::with_capacity(options.num_devices);

        for i in 0..options.num_devices {
            let port = options.port_start + i as u16;
            let device_id = format!("device-{i}");
            let engine_id = engine_id_for(&device_id);
            let engine_boots = boots_store.bump_boots(&engine_id)?;

            let mut users = Vec::with_capacity(options.v3_users.len());
            for user in &options.v3_users {
                users.push(user.clone().into_credentials(&engine_id)?);
            }

            let uptime_origin = Instant::now();
            let (hook, manager) = TrapManager::new(
                options.trap_destinations.clone(),
                EngineState::new(Bytes::from(engine_id.clone()), engine_boots),
                uptime_origin,
                DEFAULT_QUEUE_CAPACITY,
                DEFAULT_SEND_TIMEOUT,
            );

            let config = AgentConfig {
                device_id: device_id.clone(),
                port,
                sys_name: device_id.clone(),
                sys_location: "simulated".into(),
                community: options.community.clone(),
                engine_id: Bytes::from(engine_id),
                users,
                router: Arc::clone(&router),
                datasets: Arc::clone(&datasets),
                variation: Arc::clone(&variation),
                trap_hook: Some(hook.clone()),
                set_trap_oids: options.set_trap_oids.clone(),
            };

            agents.push(Arc::new(VirtualAgent::new(config, engine_boots)));
            hooks.push(hook);
            managers.push(manager);
        }

        Ok(Self {
            listen_addr: options.listen_addr,
            agents,
            hooks,
            managers: Some(managers),
            pool: Arc::new(BufferPool::new()),
            cron_expr: options.cron_expr,
            shutdown: CancellationToken::new(),
            tasks: Vec::new(),
        })
    }

    /// Bind every agent's socket, then spawn its read loop, its trap
    /// manager's delivery task, and (if configured) its cron ticker.
    /// Idempotent only insofar as calling it twice re-binds already-bound
    /// sockets; callers should call it exactly once per `Fleet`.
    pub async fn start(&mut self) -> Result<()> {
        for agent in &self.agents {
            let addr = SocketAddr::new(self.listen_addr, agent.port());
            let transport = Arc::new(AgentUdpTransport::bind(addr).await?);
            self.tasks.push(tokio::spawn(listener::run(
                Arc::clone(agent),
                transport,
                Arc::clone(&self.pool),
                self.shutdown.clone(),
            )));
        }

        if let Some(managers) = self.managers.take() {
            for manager in managers {
                self.tasks.push(tokio::spawn(manager.run()));
            }
        }

        if let Some(expr) = &self.cron_expr {
            let ticker_template = CronTicker::parse(expr)?;
            for hook in &self.hooks {
                let ticker = ticker_template.clone();
                let hook = hook.clone();
                self.tasks.push(tokio::spawn(ticker.run(hook)));
            }
        }

        Ok(())
    }

    /// Signal every spawned task to stop and wait for them to exit.
    ///
    /// Read-loop tasks observe cancellation on their next 1s poll and return
    /// on their own; the trap manager and cron ticker tasks have no
    /// cancellation point of their own (they block on a channel recv / a
    /// sleep until the next tick respectively, and their sender handles are
    /// kept alive by this same `Fleet` for introspection), so they are
    /// aborted directly rather than joined cooperatively.
    pub async fn stop(&mut self) {
        self.shutdown.cancel();
        for task in self.tasks.drain(..) {
            task.abort();
            let _ = task.await;
        }
    }

    pub fn agents(&self) -> &[Arc<VirtualAgent>] {
        &self.agents
    }
}

/// Best-effort fd-limit warning (spec: "must report requested count against
/// fd limit at startup and warn if insufficient"). Not fatal: an operator
/// running with a tight limit may still want the fleet to start and fail
/// individual binds instead.
#[cfg(unix)]
fn check_fd_limit(num_devices: usize) {
    let mut limit = libc::rlimit { rlim_cur: 0, rlim_max: 0 };
    let rc = unsafe { libc::getrlimit(libc::RLIMIT_NOFILE, &mut limit) };
    if rc != 0 {
        return;
    }
    // One fd per agent socket, plus headroom for stdio, config files, and
    // the persisted engineBoots store.
    let required = num_devices as u64 + 16;
    if limit.rlim_cur < required {
        tracing::warn!(
            requested = num_devices,
            rlimit_cur = limit.rlim_cur,
            "open file descriptor limit may be too low for this fleet size"
        );
    }
}

#[cfg(not(unix))]
fn check_fd_limit(_num_devices: usize) {}

/// Derive a locally-administered engine ID for one device (RFC 3411 format:
/// enterprise bit set, 4-byte pseudo-enterprise number, format byte 0x80
/// meaning "text", followed by the identifying text).
fn engine_id_for(device_id: &str) -> Vec<u8> {
    let mut id = vec![0x80, 0x00, 0x1f, 0x88, 0x80];
    id.extend_from_slice(device_id.as_bytes());
    id
}
