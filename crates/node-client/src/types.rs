//! Typed records returned by the node.
//!
//! Unknown fields are ignored and missing optional fields fall back to their defaults, so a
//! node that adds or drops a column does not break decoding.

use std::fmt;

use serde::{de, Deserialize, Deserializer, Serialize};

/// Treats an explicit `null` the same as a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// A block header as listed by `GTAS_getBlocks`. Keyed by `hash`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct BlockRecord {
    pub height: u64,
    pub hash: String,
    #[serde(default)]
    pub pre_hash: String,
    #[serde(default)]
    pub pre_time: String,
    #[serde(default)]
    pub cur_time: String,
    #[serde(default)]
    pub castor: String,
    #[serde(default)]
    pub group_id: String,
    /// Number of transactions in the block.
    #[serde(default)]
    pub txs: u64,
    #[serde(default)]
    pub qn: u64,
    #[serde(default)]
    pub total_qn: u64,
}

/// A consensus group as listed by `GTAS_getGroupsAfter`. Keyed by `group_id`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct GroupRecord {
    #[serde(alias = "group_height")]
    pub height: u64,
    #[serde(alias = "id")]
    pub group_id: String,
    #[serde(default)]
    pub g_hash: String,
    #[serde(default)]
    pub parent: String,
    #[serde(default)]
    pub pre: String,
    #[serde(default)]
    pub create_height: u64,
    #[serde(default)]
    pub begin_height: u64,
    #[serde(default)]
    pub dismiss_height: u64,
    #[serde(default)]
    pub threshold: u64,
    #[serde(default)]
    pub mem_size: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub members: Vec<String>,
}

/// Mining state the node reports for itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(from = "String", into = "String")]
pub enum NodeStatus {
    Running,
    Stopped,
    /// Anything else the node says, e.g. "node not ready".
    Other(String),
}

impl NodeStatus {
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running)
    }
}

impl Default for NodeStatus {
    fn default() -> Self {
        Self::Other(String::new())
    }
}

impl From<String> for NodeStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "running" => Self::Running,
            "stopped" => Self::Stopped,
            _ => Self::Other(s),
        }
    }
}

impl From<NodeStatus> for String {
    fn from(status: NodeStatus) -> Self {
        status.to_string()
    }
}

impl fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Running => f.write_str("running"),
            Self::Stopped => f.write_str("stopped"),
            Self::Other(s) => f.write_str(s),
        }
    }
}

/// One stake engagement of the node.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
pub struct StakeInfo {
    #[serde(default)]
    pub stake: u64,
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub apply_height: u64,
    #[serde(default, rename = "miner_status")]
    pub status: String,
}

/// A connected peer.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
pub struct PeerInfo {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub ip: String,
    #[serde(default, deserialize_with = "port_from_str_or_num")]
    pub tcp_port: String,
}

impl PeerInfo {
    /// Last octet of a dotted IPv4 address, if the address is one.
    pub fn last_octet(&self) -> Option<u8> {
        self.ip.rsplit('.').next()?.trim().parse().ok()
    }
}

/// Nodes disagree on whether the port is a string or a number.
fn port_from_str_or_num<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Port {
        Str(String),
        Num(u64),
        Null(()),
    }

    match Port::deserialize(deserializer) {
        Ok(Port::Str(s)) => Ok(s),
        Ok(Port::Num(n)) => Ok(n.to_string()),
        Ok(Port::Null(())) => Ok(String::new()),
        Err(_) => Err(de::Error::custom("tcp_port must be a string or a number")),
    }
}

#[derive(Debug, Default, Deserialize)]
struct NodeInfoWire {
    #[serde(default)]
    id: String,
    #[serde(default)]
    balance: f64,
    #[serde(default)]
    status: NodeStatus,
    #[serde(default)]
    n_type: String,
    #[serde(default)]
    w_group_num: u64,
    #[serde(default)]
    a_group_num: u64,
    #[serde(default)]
    tx_pool_num: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    mort_gages: Vec<StakeInfo>,
}

/// Wire shape of `GTAS_dashboard`.
#[derive(Debug, Deserialize)]
pub(crate) struct DashboardWire {
    #[serde(default)]
    block_height: u64,
    #[serde(default)]
    group_height: u64,
    #[serde(default)]
    work_g_num: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    node_info: NodeInfoWire,
    #[serde(default, deserialize_with = "null_as_default")]
    conns: Vec<PeerInfo>,
}

/// Everything the dashboard shows about the node, replaced wholesale on each poll.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct NodeSnapshot {
    pub id: String,
    pub balance: f64,
    pub status: NodeStatus,
    /// Role of the node, e.g. proposer or verifier.
    pub node_type: String,
    pub joined_groups: u64,
    pub active_groups: u64,
    pub pending_txs: u64,
    /// Number of groups currently qualified to work.
    pub work_groups: u64,
    pub block_height: u64,
    pub group_height: u64,
    pub stakes: Vec<StakeInfo>,
    /// Sorted by the last octet of the peer address; non-IPv4 peers last.
    pub peers: Vec<PeerInfo>,
}

impl NodeSnapshot {
    /// Snapshot used when the node cannot be reached.
    pub fn stopped() -> Self {
        Self {
            status: NodeStatus::Stopped,
            ..Default::default()
        }
    }
}

impl From<DashboardWire> for NodeSnapshot {
    fn from(wire: DashboardWire) -> Self {
        let DashboardWire {
            block_height,
            group_height,
            work_g_num,
            node_info,
            mut conns,
        } = wire;

        conns.sort_by_key(|p| match p.last_octet() {
            Some(octet) => (false, octet),
            None => (true, 0),
        });

        Self {
            id: node_info.id,
            balance: node_info.balance,
            status: node_info.status,
            node_type: node_info.n_type,
            joined_groups: node_info.w_group_num,
            active_groups: node_info.a_group_num,
            pending_txs: node_info.tx_pool_num,
            work_groups: work_g_num,
            block_height,
            group_height,
            stakes: node_info.mort_gages,
            peers: conns,
        }
    }
}
