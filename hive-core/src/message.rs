//! Messages the transport delivers into the swarm layer
//!
//! Each known event kind has its own variant; anything the layer does not
//! understand is carried as [`SwarmMessage::Opaque`] rather than dropped.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{InteractionResult, InteractionType, ResourceAnnouncement};

/// Errors decoding a message frame
#[derive(Debug, Error)]
pub enum MessageError {
    #[error("Malformed message: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Empty frame")]
    Empty,
}

/// Inbound swarm event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SwarmMessage {
    /// A peer connected or disconnected
    PeerStatus {
        peer_id: String,
        connected: bool,
        #[serde(default)]
        regions: Vec<String>,
        #[serde(default)]
        capabilities: Vec<String>,
    },

    /// Outcome of an interaction with a peer
    Interaction {
        peer_id: String,
        interaction: InteractionType,
        result: InteractionResult,
    },

    /// Fresh QoS measurement towards a peer
    NetworkSample {
        peer_id: String,
        latency_ms: f64,
        bandwidth_mbps: f64,
        packet_loss: f64,
    },

    /// Measured link between two peers
    EdgeSample {
        source: String,
        target: String,
        latency_ms: f64,
        bandwidth_mbps: f64,
        quality: f64,
    },

    /// A peer advertising a resource
    ResourceAnnouncement(ResourceAnnouncement),

    /// Anything else, passed through untouched
    Opaque { kind: String, payload: Vec<u8> },
}

impl SwarmMessage {
    /// Decode a JSON frame
    pub fn decode(frame: &[u8]) -> Result<Self, MessageError> {
        if frame.is_empty() {
            return Err(MessageError::Empty);
        }
        Ok(serde_json::from_slice(frame)?)
    }

    /// Encode as a JSON frame
    pub fn encode(&self) -> Result<Vec<u8>, MessageError> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Short name of the variant, for logging
    pub fn kind(&self) -> &str {
        match self {
            SwarmMessage::PeerStatus { .. } => "peer_status",
            SwarmMessage::Interaction { .. } => "interaction",
            SwarmMessage::NetworkSample { .. } => "network_sample",
            SwarmMessage::EdgeSample { .. } => "edge_sample",
            SwarmMessage::ResourceAnnouncement(_) => "resource_announcement",
            SwarmMessage::Opaque { kind, .. } => kind,
        }
    }
}
