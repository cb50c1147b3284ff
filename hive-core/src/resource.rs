//! Resource metadata and announcements
//!
//! A resource is a named, versioned, content-hashed artifact. Peers announce
//! the resources they hold; announcements expire and must be refreshed.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Metadata describing a resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceInfo {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub resource_type: String,
    pub version: String,
    pub size: u64,
    /// Hex-encoded SHA-256 of the content, empty when unknown
    pub hash: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ResourceInfo {
    pub fn new(id: &str, name: &str, resource_type: &str, version: &str) -> Self {
        let now = Utc::now();
        Self {
            id: id.to_string(),
            name: name.to_string(),
            resource_type: resource_type.to_string(),
            version: version.to_string(),
            size: 0,
            hash: String::new(),
            description: String::new(),
            tags: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_tags(mut self, tags: &[&str]) -> Self {
        self.tags = tags.iter().map(|t| t.to_string()).collect();
        self
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    /// Fill `size` and `hash` from the resource content
    pub fn with_content(mut self, content: &[u8]) -> Self {
        self.size = content.len() as u64;
        self.hash = content_hash(content);
        self
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    /// Whether `content` matches the advertised hash
    pub fn verify_content(&self, content: &[u8]) -> bool {
        !self.hash.is_empty() && self.hash == content_hash(content)
    }
}

/// Hex-encoded SHA-256 digest
pub fn content_hash(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    format!("{:x}", hasher.finalize())
}

/// A peer advertising that it holds a resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceAnnouncement {
    pub id: Uuid,
    pub peer_id: String,
    pub resource: ResourceInfo,
    pub expires_at: DateTime<Utc>,
}

impl ResourceAnnouncement {
    pub fn new(peer_id: &str, resource: ResourceInfo, ttl: Duration) -> Self {
        Self {
            id: Uuid::new_v4(),
            peer_id: peer_id.to_string(),
            resource,
            expires_at: Utc::now() + ttl,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Search filter over known resources
///
/// Every populated field must match (AND). Tags use superset semantics: a
/// resource matches when it carries every queried tag.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceQuery {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "type")]
    pub resource_type: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl ResourceQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn resource_type(mut self, resource_type: &str) -> Self {
        self.resource_type = Some(resource_type.to_string());
        self
    }

    pub fn version(mut self, version: &str) -> Self {
        self.version = Some(version.to_string());
        self
    }

    pub fn tags(mut self, tags: &[&str]) -> Self {
        self.tags = tags.iter().map(|t| t.to_string()).collect();
        self
    }

    pub fn matches(&self, resource: &ResourceInfo) -> bool {
        if self.name.as_ref().is_some_and(|n| *n != resource.name) {
            return false;
        }
        if self
            .resource_type
            .as_ref()
            .is_some_and(|t| *t != resource.resource_type)
        {
            return false;
        }
        if self.version.as_ref().is_some_and(|v| *v != resource.version) {
            return false;
        }
        self.tags.iter().all(|tag| resource.has_tag(tag))
    }
}
