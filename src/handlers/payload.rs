//! Typed task payloads.
//!
//! The free-form `task_metadata` a step handler reads is modeled as a tagged
//! union with one schema per handler binding, so a malformed handler contract
//! fails at deserialization instead of deep inside a provider call. The
//! engine itself never branches on resource-specific fields; it only moves
//! the payload between the store and the handler.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Desired state for a virtual network
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkSpec {
    pub name: String,
    pub cidr: String,
    pub region: String,
}

/// Desired state for a subnet within a network
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubnetSpec {
    pub name: String,
    pub cidr: String,
    /// Provider id of the parent network, known once the network exists
    #[serde(default)]
    pub network_provider_id: Option<String>,
}

/// Listener configuration for a load balancer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListenerSpec {
    pub port: u16,
    pub protocol: String,
}

/// Desired state for a load balancer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadBalancerSpec {
    pub name: String,
    pub subnet_provider_id: String,
    pub listeners: Vec<ListenerSpec>,
}

/// Desired state for a storage bucket
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BucketSpec {
    pub name: String,
    pub region: String,
}

/// The input payload a step handler works from, persisted on the task node
/// and mutated by the handler across repeated invocations (the action phase
/// stashes the provider-assigned id here so the wait phase can poll it).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TaskPayload {
    CreateNetwork {
        spec: NetworkSpec,
        #[serde(default)]
        provider_id: Option<String>,
    },
    CreateSubnet {
        spec: SubnetSpec,
        #[serde(default)]
        provider_id: Option<String>,
    },
    CreateLoadBalancer {
        spec: LoadBalancerSpec,
        #[serde(default)]
        provider_id: Option<String>,
    },
    CreateBucket {
        spec: BucketSpec,
        #[serde(default)]
        provider_id: Option<String>,
    },
    /// Deletion of an already-provisioned resource; the provider id is known
    /// at graph-construction time
    DeleteResource { provider_id: String },
    /// Detachment of a shared resource from one referencer
    DetachGateway {
        gateway_provider_id: String,
        subnet_provider_id: String,
    },
    /// Prerequisite validation of an original request payload
    ValidateRequest { request: Value },
    /// Full resource sync for one cloud account
    SyncAccount { account_id: Uuid },
    /// Flaky remote-shell operation driven by an explicit retry policy
    RemoteShell { command: String },
    /// Nodes that carry no handler input (e.g. back-filled prerequisites)
    Empty,
}

impl TaskPayload {
    /// Provider-assigned id stashed by the action phase, if any
    pub fn provider_id(&self) -> Option<&str> {
        match self {
            Self::CreateNetwork { provider_id, .. }
            | Self::CreateSubnet { provider_id, .. }
            | Self::CreateLoadBalancer { provider_id, .. }
            | Self::CreateBucket { provider_id, .. } => provider_id.as_deref(),
            Self::DeleteResource { provider_id } => Some(provider_id),
            Self::DetachGateway {
                gateway_provider_id, ..
            } => Some(gateway_provider_id),
            _ => None,
        }
    }

    /// Stash the provider-assigned correlation id for later polling
    pub fn set_provider_id(&mut self, id: String) {
        match self {
            Self::CreateNetwork { provider_id, .. }
            | Self::CreateSubnet { provider_id, .. }
            | Self::CreateLoadBalancer { provider_id, .. }
            | Self::CreateBucket { provider_id, .. } => *provider_id = Some(id),
            Self::DeleteResource { provider_id } => *provider_id = id,
            _ => {}
        }
    }

    /// The resource spec serialized for the provider's mutating call, when
    /// this payload describes a creation
    pub fn spec_value(&self) -> Option<Value> {
        match self {
            Self::CreateNetwork { spec, .. } => serde_json::to_value(spec).ok(),
            Self::CreateSubnet { spec, .. } => serde_json::to_value(spec).ok(),
            Self::CreateLoadBalancer { spec, .. } => serde_json::to_value(spec).ok(),
            Self::CreateBucket { spec, .. } => serde_json::to_value(spec).ok(),
            _ => None,
        }
    }
}

impl Default for TaskPayload {
    fn default() -> Self {
        Self::Empty
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_serde_tagging() {
        let payload = TaskPayload::CreateNetwork {
            spec: NetworkSpec {
                name: "prod-vpc".to_string(),
                cidr: "10.0.0.0/16".to_string(),
                region: "us-east".to_string(),
            },
            provider_id: None,
        };

        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["kind"], "create_network");
        assert_eq!(json["spec"]["cidr"], "10.0.0.0/16");

        let back: TaskPayload = serde_json::from_value(json).unwrap();
        assert_eq!(back, payload);
    }

    #[test]
    fn test_provider_id_stashing() {
        let mut payload = TaskPayload::CreateSubnet {
            spec: SubnetSpec {
                name: "web-a".to_string(),
                cidr: "10.0.1.0/24".to_string(),
                network_provider_id: Some("net-123".to_string()),
            },
            provider_id: None,
        };
        assert!(payload.provider_id().is_none());

        payload.set_provider_id("subnet-456".to_string());
        assert_eq!(payload.provider_id(), Some("subnet-456"));
    }

    #[test]
    fn test_delete_payload_carries_id_up_front() {
        let payload = TaskPayload::DeleteResource {
            provider_id: "lb-789".to_string(),
        };
        assert_eq!(payload.provider_id(), Some("lb-789"));
        assert!(payload.spec_value().is_none());
    }
}
