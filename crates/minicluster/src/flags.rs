//! Command-line flag construction for spawned daemons.
//!
//! Extra flags from [`ClusterOptions`](minicluster_config::ClusterOptions) are
//! parsed once into [`FlagTemplate`]s. Each template is a sequence of literal
//! text and index slots, so rendering a flag for instance `i` is a pure
//! function of the template and `i`.

use std::fmt::Display;

use camino::Utf8Path;
use minicluster_config::INDEX_PLACEHOLDER;

/// Data directory for a coordinator.
pub const COORDINATOR_BASE_DIR: &str = "coordinator_base_dir";
/// RPC bind address for a coordinator.
pub const COORDINATOR_RPC_BIND_ADDRESSES: &str = "coordinator_rpc_bind_addresses";
/// HTTP port for a coordinator.
pub const COORDINATOR_WEB_PORT: &str = "coordinator_web_port";
/// Marks the coordinator at index 0 of a distributed topology.
pub const LEADER: &str = "leader";
/// Comma-separated follower addresses.
pub const FOLLOWER_ADDRESSES: &str = "follower_addresses";
/// Fixed address of the leader, passed to followers.
pub const LEADER_ADDRESS: &str = "leader_address";
/// Data directory for a worker.
pub const WORKER_BASE_DIR: &str = "worker_base_dir";
/// RPC bind address for a worker.
pub const WORKER_RPC_BIND_ADDRESSES: &str = "worker_rpc_bind_addresses";
/// HTTP port for a worker.
pub const WORKER_WEB_PORT: &str = "worker_web_port";
/// Comma-separated coordinator addresses, passed to workers.
pub const WORKER_COORDINATOR_ADDRS: &str = "worker_coordinator_addrs";
/// Path the daemon writes its status artefact to.
pub const SERVER_DUMP_INFO_PATH: &str = "server_dump_info_path";
/// Serialisation format of the status artefact.
pub const SERVER_DUMP_INFO_FORMAT: &str = "server_dump_info_format";
/// Status artefact format requested from every daemon.
pub const STATUS_FORMAT: &str = "json";

/// Formats `--name=value`.
#[must_use]
pub fn flag(name: &str, value: impl Display) -> String {
    format!("--{name}={value}")
}

/// Formats a boolean switch `--name`.
#[must_use]
pub fn switch(name: &str) -> String {
    format!("--{name}")
}

/// Flags every daemon receives after its caller-supplied and extra flags.
#[must_use]
pub fn framework_flags(status_path: &Utf8Path) -> Vec<String> {
    vec![
        flag(SERVER_DUMP_INFO_PATH, status_path),
        flag(SERVER_DUMP_INFO_FORMAT, STATUS_FORMAT),
        switch("logtostderr"),
        flag("logbuflevel", -1),
        flag("webserver_interface", "localhost"),
    ]
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Index,
}

/// One extra flag split into literal text and instance-index slots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlagTemplate {
    segments: Vec<Segment>,
}

impl FlagTemplate {
    /// Splits `raw` on every occurrence of the index placeholder.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let mut segments = Vec::new();
        let mut pieces = raw.split(INDEX_PLACEHOLDER).peekable();
        while let Some(piece) = pieces.next() {
            if !piece.is_empty() {
                segments.push(Segment::Literal(piece.to_owned()));
            }
            if pieces.peek().is_some() {
                segments.push(Segment::Index);
            }
        }
        Self { segments }
    }

    /// Returns `true` when rendering depends on the instance index.
    #[must_use]
    pub fn is_indexed(&self) -> bool {
        self.segments.contains(&Segment::Index)
    }

    /// Renders the flag for the instance at `index`.
    #[must_use]
    pub fn render(&self, index: usize) -> String {
        self.segments
            .iter()
            .map(|segment| match segment {
                Segment::Literal(text) => text.clone(),
                Segment::Index => index.to_string(),
            })
            .collect()
    }
}

/// Per-role extra flags, resolved for a given instance index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstanceFlags {
    templates: Vec<FlagTemplate>,
}

impl InstanceFlags {
    /// Parses every raw flag into a template.
    #[must_use]
    pub fn parse<S: AsRef<str>>(raw: &[S]) -> Self {
        Self {
            templates: raw
                .iter()
                .map(|flag| FlagTemplate::parse(flag.as_ref()))
                .collect(),
        }
    }

    /// Renders the flags for the instance at `index`.
    #[must_use]
    pub fn resolve(&self, index: usize) -> Vec<String> {
        self.templates
            .iter()
            .map(|template| template.render(index))
            .collect()
    }

    /// Number of templates.
    #[must_use]
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    /// Returns `true` when there are no extra flags.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}
