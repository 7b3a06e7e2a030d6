//! Command-line contract shared with the engine's flag builders.
//!
//! Flag names are the engine's `--role_*` flags verbatim, so a stub can be
//! launched by an unmodified [`ClusterController`](minicluster::ClusterController).
//! Flags may repeat; the last occurrence wins, which is how extra flags
//! override role flags.

use camino::Utf8PathBuf;
use clap::{Args, Parser};
use minicluster::flags::STATUS_FORMAT;
use minicluster::{HostPort, HostPortParseError};
use minicluster_config::DEFAULT_LOG_FILTER;

/// Flags every stub daemon accepts.
#[derive(Debug, Clone, Args)]
pub struct CommonArgs {
    /// Where to publish the status artefact once listeners are bound.
    #[arg(long = "server_dump_info_path")]
    pub server_dump_info_path: Utf8PathBuf,
    /// Status artefact format; only `json` is supported.
    #[arg(long = "server_dump_info_format", default_value = STATUS_FORMAT)]
    pub server_dump_info_format: String,
    /// Accepted for compatibility; logs always go to stderr.
    #[arg(long = "logtostderr")]
    pub log_to_stderr: bool,
    /// Accepted for compatibility.
    #[arg(long = "logbuflevel", default_value_t = 0, allow_hyphen_values = true)]
    pub log_buf_level: i32,
    /// Interface the HTTP listener binds to.
    #[arg(long = "webserver_interface", default_value = "localhost")]
    pub webserver_interface: String,
    /// Exit with this code before publishing anything.
    #[arg(long = "stub_exit_code")]
    pub exit_code: Option<u8>,
    /// Bind listeners but never publish the status artefact.
    #[arg(long = "stub_never_ready")]
    pub never_ready: bool,
    /// Free-form label echoed to stdout at startup.
    #[arg(long = "stub_tag")]
    pub tag: Option<String>,
    /// Tracing filter for the stub's own telemetry.
    #[arg(long = "stub_log_filter", default_value = DEFAULT_LOG_FILTER)]
    pub log_filter: String,
}

/// Arguments of `stub-coordinator`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "stub-coordinator",
    about = "Minimal coordinator serving worker membership",
    args_override_self = true
)]
pub struct CoordinatorArgs {
    /// Data directory.
    #[arg(long = "coordinator_base_dir")]
    pub base_dir: Utf8PathBuf,
    /// RPC bind address; port 0 picks a free port.
    #[arg(long = "coordinator_rpc_bind_addresses", default_value = "127.0.0.1:0")]
    pub rpc_bind_address: HostPort,
    /// HTTP port; 0 picks a free port.
    #[arg(long = "coordinator_web_port", default_value_t = 0)]
    pub web_port: u16,
    /// Marks this coordinator as the leader of a distributed topology.
    #[arg(long = "leader")]
    pub leader: bool,
    /// Leader address, given to followers.
    #[arg(long = "leader_address")]
    pub leader_address: Option<HostPort>,
    /// Comma-separated follower addresses.
    #[arg(long = "follower_addresses", default_value = "")]
    pub follower_addresses: String,
    /// Flags shared by every stub.
    #[command(flatten)]
    pub common: CommonArgs,
}

/// Whether a coordinator answers membership listings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Role {
    /// Answers every request.
    Leader,
    /// Accepts registrations but refuses listings.
    Follower {
        /// Address of the leader, quoted in refusals.
        leader: HostPort,
    },
}

impl CoordinatorArgs {
    /// A coordinator told about a leader other than itself is a follower.
    #[must_use]
    pub fn role(&self) -> Role {
        match (&self.leader_address, self.leader) {
            (Some(leader), false) => Role::Follower {
                leader: leader.clone(),
            },
            _ => Role::Leader,
        }
    }

    /// Parsed follower addresses.
    ///
    /// # Errors
    ///
    /// Returns the first malformed address.
    pub fn followers(&self) -> Result<Vec<HostPort>, HostPortParseError> {
        parse_address_list(&self.follower_addresses)
    }
}

/// Arguments of `stub-worker`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "stub-worker",
    about = "Minimal worker that registers with every coordinator",
    args_override_self = true
)]
pub struct WorkerArgs {
    /// Data directory.
    #[arg(long = "worker_base_dir")]
    pub base_dir: Utf8PathBuf,
    /// RPC bind address; port 0 picks a free port.
    #[arg(long = "worker_rpc_bind_addresses", default_value = "127.0.0.1:0")]
    pub rpc_bind_address: HostPort,
    /// HTTP port; 0 picks a free port.
    #[arg(long = "worker_web_port", default_value_t = 0)]
    pub web_port: u16,
    /// Comma-separated coordinator addresses.
    #[arg(long = "worker_coordinator_addrs")]
    pub coordinator_addrs: String,
    /// Flags shared by every stub.
    #[command(flatten)]
    pub common: CommonArgs,
}

impl WorkerArgs {
    /// Parsed coordinator addresses.
    ///
    /// # Errors
    ///
    /// Returns the first malformed address.
    pub fn coordinators(&self) -> Result<Vec<HostPort>, HostPortParseError> {
        parse_address_list(&self.coordinator_addrs)
    }
}

/// Splits a comma-separated address list, ignoring empty entries.
///
/// # Errors
///
/// Returns the first malformed address.
pub fn parse_address_list(raw: &str) -> Result<Vec<HostPort>, HostPortParseError> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(str::parse)
        .collect()
}
