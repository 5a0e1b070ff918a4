//! Cascading deletion graph builder.
//!
//! Turns a network's resource topology into a delete-order DAG: every child
//! resource's delete node precedes its parent's, shared resources get exactly
//! one node regardless of how many parents reference them, and shared
//! gateways are detached from each subnet before their own deletion. The
//! graph is built fully in memory and committed in one transaction.

use crate::constants::{
    attachment_resource_type, resource_types, NodeStatus, RootStatus, TaskType, WorkflowNature,
};
use crate::error::{Result, StratusError};
use crate::graph::TaskGraph;
use crate::handlers::TaskPayload;
use crate::lifecycle::provider::{classify_lifecycle, LifecyclePhase};
use crate::models::{Root, TaskNode};
use crate::store::Store;
use serde_json::json;
use std::collections::HashMap;
use tracing::{debug, instrument};
use uuid::Uuid;

/// Locally tracked resource plus the provider-side facts the builder needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRef {
    pub id: Uuid,
    pub provider_id: String,
    pub lifecycle_state: String,
}

impl ResourceRef {
    pub fn new(id: Uuid, provider_id: impl Into<String>, lifecycle_state: impl Into<String>) -> Self {
        Self {
            id,
            provider_id: provider_id.into(),
            lifecycle_state: lifecycle_state.into(),
        }
    }
}

/// One subnet and everything provisioned inside it.
#[derive(Debug, Clone, Default)]
pub struct SubnetTopology {
    pub subnet: Option<ResourceRef>,
    pub load_balancers: Vec<ResourceRef>,
    pub instances: Vec<ResourceRef>,
    pub clusters: Vec<ResourceRef>,
    pub vpn_gateways: Vec<ResourceRef>,
}

impl SubnetTopology {
    pub fn new(subnet: ResourceRef) -> Self {
        Self {
            subnet: Some(subnet),
            ..Default::default()
        }
    }

    fn children(&self) -> impl Iterator<Item = (&'static str, &ResourceRef)> {
        let lbs = self
            .load_balancers
            .iter()
            .map(|r| (resource_types::LOAD_BALANCER, r));
        let instances = self.instances.iter().map(|r| (resource_types::INSTANCE, r));
        let clusters = self.clusters.iter().map(|r| (resource_types::CLUSTER, r));
        let vpns = self
            .vpn_gateways
            .iter()
            .map(|r| (resource_types::VPN_GATEWAY, r));
        lbs.chain(instances).chain(clusters).chain(vpns)
    }
}

/// A shared public gateway and the subnets it is attached to.
#[derive(Debug, Clone)]
pub struct GatewayAttachment {
    pub gateway: ResourceRef,
    pub attached_subnets: Vec<ResourceRef>,
}

/// Full cascade input for one network.
#[derive(Debug, Clone)]
pub struct NetworkTopology {
    pub network: ResourceRef,
    pub subnets: Vec<SubnetTopology>,
    pub public_gateways: Vec<GatewayAttachment>,
}

/// Build the deletion root and its DAG for one network topology.
///
/// Fails eagerly, before anything is persisted, when a shared gateway is
/// still converging on the provider side: detaching a half-created gateway
/// leaves the attachment in a state the provider cannot resolve.
#[instrument(skip(topology), fields(network = %topology.network.provider_id))]
pub fn build_deletion_graph(topology: &NetworkTopology) -> Result<(Root, TaskGraph)> {
    for attachment in &topology.public_gateways {
        if classify_lifecycle(&attachment.gateway.lifecycle_state) == LifecyclePhase::InProgress {
            return Err(StratusError::Validation(format!(
                "public gateway {} is still {}; wait for it to settle before deleting network {}",
                attachment.gateway.provider_id,
                attachment.gateway.lifecycle_state,
                topology.network.provider_id,
            )));
        }
    }

    let mut graph = TaskGraph::new();
    // one delete node per distinct resource, shared children included
    let mut node_for: HashMap<Uuid, Uuid> = HashMap::new();

    let network_node = delete_node(&mut graph, &mut node_for, resource_types::NETWORK, &topology.network)?;

    for subnet_topology in &topology.subnets {
        let Some(subnet) = &subnet_topology.subnet else {
            continue;
        };
        let subnet_node =
            delete_node(&mut graph, &mut node_for, resource_types::SUBNET, subnet)?;
        graph.add_edge(subnet_node, network_node)?;

        for (resource_type, child) in subnet_topology.children() {
            let child_node = delete_node(&mut graph, &mut node_for, resource_type, child)?;
            graph.add_edge(child_node, subnet_node)?;
        }
    }

    for attachment in &topology.public_gateways {
        let gateway_node = delete_node(
            &mut graph,
            &mut node_for,
            resource_types::PUBLIC_GATEWAY,
            &attachment.gateway,
        )?;
        graph.add_edge(gateway_node, network_node)?;

        for subnet in &attachment.attached_subnets {
            let detach = graph.insert_node(TaskNode::new(
                TaskType::Detach,
                attachment_resource_type(resource_types::PUBLIC_GATEWAY, resource_types::SUBNET),
                TaskPayload::DetachGateway {
                    gateway_provider_id: attachment.gateway.provider_id.clone(),
                    subnet_provider_id: subnet.provider_id.clone(),
                },
            ))?;
            graph.add_edge(detach, gateway_node)?;
            // the subnet cannot go away while the gateway still references it
            if let Some(subnet_node) = node_for.get(&subnet.id) {
                graph.add_edge(detach, *subnet_node)?;
            }
        }
    }

    debug!(nodes = graph.len(), "deletion graph assembled");

    let root = Root::new(
        format!("delete network {}", topology.network.provider_id),
        resource_types::NETWORK,
        WorkflowNature::Delete,
        json!({
            "network_provider_id": topology.network.provider_id,
            "subnet_count": topology.subnets.len(),
            "gateway_count": topology.public_gateways.len(),
        }),
    )
    .with_status(RootStatus::Ready);

    Ok((root, graph))
}

/// Build the graph and persist it atomically.
pub async fn build_and_commit(store: &dyn Store, topology: &NetworkTopology) -> Result<Root> {
    let (root, graph) = build_deletion_graph(topology)?;
    store.commit_graph(&root, &graph).await?;
    Ok(root)
}

/// One delete node per distinct resource id. Resources the provider already
/// reports gone are back-filled SUCCESSFUL so they satisfy their parents
/// without a dispatch.
fn delete_node(
    graph: &mut TaskGraph,
    node_for: &mut HashMap<Uuid, Uuid>,
    resource_type: &str,
    resource: &ResourceRef,
) -> Result<Uuid> {
    if let Some(existing) = node_for.get(&resource.id) {
        return Ok(*existing);
    }

    let mut node = TaskNode::new(
        TaskType::Delete,
        resource_type,
        TaskPayload::DeleteResource {
            provider_id: resource.provider_id.clone(),
        },
    )
    .with_resource(resource.id);

    if resource.lifecycle_state == "deleted" {
        node = node.with_status(NodeStatus::Successful);
    }

    let id = graph.insert_node(node)?;
    node_for.insert(resource.id, id);
    Ok(id)
}
