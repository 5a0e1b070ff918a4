//! End-to-end orchestration scenarios against the in-memory store: a small
//! dispatch loop wires discovery, execution, and result processing together
//! the way an embedding service would.

use parking_lot::Mutex;
use serde_json::json;
use std::collections::VecDeque;
use std::sync::Arc;
use stratus_core::constants::{resource_types, NodeStatus, RootStatus, TaskType, WorkflowNature};
use stratus_core::error::ProviderError;
use stratus_core::events::EventPublisher;
use stratus_core::graph::TaskGraph;
use stratus_core::handlers::payload::NetworkSpec;
use stratus_core::handlers::{StepHandler, TaskPayload};
use stratus_core::lifecycle::{
    CreateResourceHandler, DeleteResourceHandler, DetachGatewayHandler, ProviderClient,
    ProviderResource, RelatedResourceResolver,
};
use stratus_core::models::{Root, TaskNode};
use stratus_core::orchestration::{
    build_and_commit, Enqueuer, GatewayAttachment, NetworkTopology, ResourceRef, ResultProcessor,
    StepExecutor, SubnetTopology, ViableNodeDiscovery,
};
use stratus_core::registry::HandlerRegistry;
use stratus_core::store::{MemoryStore, Store};
use tokio_test::assert_ok;
use uuid::Uuid;

#[derive(Default)]
struct QueueEnqueuer {
    queue: Mutex<VecDeque<Uuid>>,
}

#[async_trait::async_trait]
impl Enqueuer for QueueEnqueuer {
    async fn enqueue(&self, node_id: Uuid) -> stratus_core::Result<()> {
        self.queue.lock().push_back(node_id);
        Ok(())
    }
}

struct Harness {
    store: Arc<MemoryStore>,
    registry: Arc<HandlerRegistry>,
    executor: StepExecutor,
    processor: ResultProcessor,
    discovery: ViableNodeDiscovery,
}

impl Harness {
    fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let registry = Arc::new(HandlerRegistry::new());
        let publisher = EventPublisher::new(64);
        Self {
            executor: StepExecutor::new(store.clone(), registry.clone(), publisher.clone()),
            processor: ResultProcessor::new(store.clone(), publisher.clone()),
            discovery: ViableNodeDiscovery::new(store.clone(), publisher),
            store,
            registry,
        }
    }

    /// Drive one root until the queue drains.
    async fn run_to_quiescence(&self, root_id: Uuid) -> anyhow::Result<()> {
        let enqueuer = QueueEnqueuer::default();
        for node in self.discovery.discover(root_id, 50).await? {
            enqueuer.enqueue(node.id).await?;
        }

        let mut budget = 200usize;
        loop {
            let next = enqueuer.queue.lock().pop_front();
            let Some(node_id) = next else { break };
            budget = budget
                .checked_sub(1)
                .ok_or_else(|| anyhow::anyhow!("dispatch loop did not converge"))?;
            self.executor.execute(node_id).await?;
            self.processor.process(node_id, &enqueuer).await?;
        }
        Ok(())
    }
}

/// Handler double committing a fixed terminal status.
struct Fixed(NodeStatus);

#[async_trait::async_trait]
impl StepHandler for Fixed {
    async fn handle(&self, node_id: Uuid, store: &dyn Store) -> stratus_core::Result<()> {
        let mut node = store.node(node_id).await?;
        match self.0 {
            NodeStatus::Failed => node.mark_failed("request rejected by validation"),
            _ => node.mark_successful(json!({"ok": true}), None),
        }
        store.update_node(&node).await
    }
}

/// Provider double that records call order and resolves everything on the
/// first call.
#[derive(Default)]
struct RecordingProvider {
    calls: Mutex<Vec<String>>,
    missing: Vec<String>,
}

impl RecordingProvider {
    fn done(&self, provider_id: &str) -> Result<ProviderResource, ProviderError> {
        if self.missing.iter().any(|m| m == provider_id) {
            return Err(ProviderError::Execute {
                status_code: 404,
                message: format!("no such resource {provider_id}"),
            });
        }
        Ok(ProviderResource {
            provider_id: provider_id.to_string(),
            lifecycle_state: "deleted".to_string(),
            attributes: json!({}),
            related_provider_ids: vec![],
        })
    }
}

#[async_trait::async_trait]
impl ProviderClient for RecordingProvider {
    async fn create_resource(
        &self,
        _resource_type: &str,
        spec: &serde_json::Value,
    ) -> Result<ProviderResource, ProviderError> {
        let name = spec["name"].as_str().unwrap_or("unnamed").to_string();
        self.calls.lock().push(format!("create:{name}"));
        Ok(ProviderResource {
            provider_id: format!("{name}-pid"),
            lifecycle_state: "available".to_string(),
            attributes: spec.clone(),
            related_provider_ids: vec![],
        })
    }

    async fn delete_resource(
        &self,
        _resource_type: &str,
        provider_id: &str,
    ) -> Result<ProviderResource, ProviderError> {
        self.calls.lock().push(format!("delete:{provider_id}"));
        self.done(provider_id)
    }

    async fn detach_resource(
        &self,
        _resource_type: &str,
        provider_id: &str,
        from_provider_id: &str,
    ) -> Result<ProviderResource, ProviderError> {
        self.calls
            .lock()
            .push(format!("detach:{provider_id}:{from_provider_id}"));
        Ok(ProviderResource {
            provider_id: provider_id.to_string(),
            lifecycle_state: "available".to_string(),
            attributes: json!({}),
            related_provider_ids: vec![],
        })
    }

    async fn poll_resource(
        &self,
        _resource_type: &str,
        provider_id: &str,
    ) -> Result<ProviderResource, ProviderError> {
        self.calls.lock().push(format!("poll:{provider_id}"));
        self.done(provider_id)
    }
}

struct NoResolver;

#[async_trait::async_trait]
impl RelatedResourceResolver for NoResolver {
    async fn resolve(
        &self,
        _resource_type: &str,
        _provider_id: &str,
    ) -> stratus_core::Result<Option<Uuid>> {
        Ok(None)
    }
}

#[tokio::test]
async fn failed_validation_blocks_create_while_sibling_branch_finishes() -> anyhow::Result<()> {
    let harness = Harness::new();
    harness
        .registry
        .register(TaskType::Validate, resource_types::NETWORK, Arc::new(Fixed(NodeStatus::Failed)));
    harness
        .registry
        .register(TaskType::Create, resource_types::NETWORK, Arc::new(Fixed(NodeStatus::Successful)));
    harness
        .registry
        .register(TaskType::Create, resource_types::BUCKET, Arc::new(Fixed(NodeStatus::Successful)));

    // two independent branches under one root: validate -> create network,
    // and a lone bucket creation
    let root = Root::new(
        "create network with bucket",
        resource_types::NETWORK,
        WorkflowNature::Create,
        json!({}),
    )
    .with_status(RootStatus::Ready);

    let mut graph = TaskGraph::new();
    let validate = graph.insert_node(TaskNode::new(
        TaskType::Validate,
        resource_types::NETWORK,
        TaskPayload::Empty,
    ))?;
    let create = graph.insert_node(TaskNode::new(
        TaskType::Create,
        resource_types::NETWORK,
        TaskPayload::Empty,
    ))?;
    let bucket = graph.insert_node(TaskNode::new(
        TaskType::Create,
        resource_types::BUCKET,
        TaskPayload::Empty,
    ))?;
    graph.add_edge(validate, create)?;
    harness.store.commit_graph(&root, &graph).await?;

    harness.run_to_quiescence(root.id).await?;

    let validate_node = harness.store.node(validate).await?;
    assert_eq!(validate_node.status, Some(NodeStatus::Failed));

    // the gated create was never dispatched
    let create_node = harness.store.node(create).await?;
    assert_eq!(create_node.status, None);

    // the sibling branch ran to completion despite the failure
    let bucket_node = harness.store.node(bucket).await?;
    assert_eq!(bucket_node.status, Some(NodeStatus::Successful));

    let root = harness.store.root(root.id).await?;
    assert_eq!(root.status, RootStatus::CompletedWithFailure);
    assert!(root.completed_at.is_some());
    Ok(())
}

#[tokio::test]
async fn two_phase_create_converges_through_repoll() -> anyhow::Result<()> {
    // provider that answers "pending" to the action call and "available" to
    // the wait-phase poll
    struct SlowProvider;

    #[async_trait::async_trait]
    impl ProviderClient for SlowProvider {
        async fn create_resource(
            &self,
            _resource_type: &str,
            _spec: &serde_json::Value,
        ) -> Result<ProviderResource, ProviderError> {
            Ok(ProviderResource {
                provider_id: "net-42".to_string(),
                lifecycle_state: "pending".to_string(),
                attributes: json!({}),
                related_provider_ids: vec![],
            })
        }
        async fn delete_resource(
            &self,
            _resource_type: &str,
            _provider_id: &str,
        ) -> Result<ProviderResource, ProviderError> {
            unreachable!("creation flow only")
        }
        async fn detach_resource(
            &self,
            _resource_type: &str,
            _provider_id: &str,
            _from_provider_id: &str,
        ) -> Result<ProviderResource, ProviderError> {
            unreachable!("creation flow only")
        }
        async fn poll_resource(
            &self,
            _resource_type: &str,
            provider_id: &str,
        ) -> Result<ProviderResource, ProviderError> {
            Ok(ProviderResource {
                provider_id: provider_id.to_string(),
                lifecycle_state: "available".to_string(),
                attributes: json!({"name": "prod-vpc"}),
                related_provider_ids: vec![],
            })
        }
    }

    let harness = Harness::new();
    harness.registry.register(
        TaskType::Create,
        resource_types::NETWORK,
        Arc::new(CreateResourceHandler::new(
            Arc::new(SlowProvider),
            Arc::new(NoResolver),
            resource_types::SUBNET,
        )),
    );

    let root = Root::new(
        "create network",
        resource_types::NETWORK,
        WorkflowNature::Create,
        json!({}),
    )
    .with_status(RootStatus::Ready);

    let mut graph = TaskGraph::new();
    let node_id = graph.add_next(TaskNode::new(
        TaskType::Create,
        resource_types::NETWORK,
        TaskPayload::CreateNetwork {
            spec: NetworkSpec {
                name: "prod-vpc".to_string(),
                cidr: "10.0.0.0/16".to_string(),
                region: "us-east".to_string(),
            },
            provider_id: None,
        },
    ))?;
    harness.store.commit_graph(&root, &graph).await?;

    harness.run_to_quiescence(root.id).await?;

    let node = harness.store.node(node_id).await?;
    assert_eq!(node.status, Some(NodeStatus::Successful));
    assert_eq!(node.task_metadata.provider_id(), Some("net-42"));

    let root = harness.store.root(root.id).await?;
    assert_eq!(root.status, RootStatus::CompletedSuccessfully);
    Ok(())
}

#[tokio::test]
async fn cascading_deletion_respects_topology_order() -> anyhow::Result<()> {
    let harness = Harness::new();
    let provider = Arc::new(RecordingProvider::default());
    harness.registry.register(
        TaskType::Delete,
        resource_types::NETWORK,
        Arc::new(DeleteResourceHandler::new(provider.clone())),
    );
    harness.registry.register(
        TaskType::Delete,
        resource_types::SUBNET,
        Arc::new(DeleteResourceHandler::new(provider.clone())),
    );
    harness.registry.register(
        TaskType::Delete,
        resource_types::INSTANCE,
        Arc::new(DeleteResourceHandler::new(provider.clone())),
    );
    harness.registry.register(
        TaskType::Delete,
        resource_types::PUBLIC_GATEWAY,
        Arc::new(DeleteResourceHandler::new(provider.clone())),
    );
    harness.registry.register(
        TaskType::Detach,
        "public_gateway-subnet",
        Arc::new(DetachGatewayHandler::new(provider.clone())),
    );

    let subnet = ResourceRef::new(Uuid::new_v4(), "subnet-1", "available");
    let mut subnet_topology = SubnetTopology::new(subnet.clone());
    subnet_topology
        .instances
        .push(ResourceRef::new(Uuid::new_v4(), "vm-1", "available"));

    let topology = NetworkTopology {
        network: ResourceRef::new(Uuid::new_v4(), "net-1", "available"),
        subnets: vec![subnet_topology],
        public_gateways: vec![GatewayAttachment {
            gateway: ResourceRef::new(Uuid::new_v4(), "pgw-1", "available"),
            attached_subnets: vec![subnet],
        }],
    };

    let root = build_and_commit(harness.store.as_ref(), &topology).await?;
    harness.run_to_quiescence(root.id).await?;

    let root = harness.store.root(root.id).await?;
    assert_eq!(root.status, RootStatus::CompletedSuccessfully);

    let calls = provider.calls.lock().clone();
    let position = |call: &str| {
        calls
            .iter()
            .position(|c| c == call)
            .unwrap_or_else(|| panic!("missing call {call} in {calls:?}"))
    };
    assert!(position("delete:vm-1") < position("delete:subnet-1"));
    assert!(position("detach:pgw-1:subnet-1") < position("delete:pgw-1"));
    assert!(position("detach:pgw-1:subnet-1") < position("delete:subnet-1"));
    assert!(position("delete:subnet-1") < position("delete:net-1"));
    assert!(position("delete:pgw-1") < position("delete:net-1"));
    Ok(())
}

#[tokio::test]
async fn deleting_an_already_gone_resource_succeeds() -> anyhow::Result<()> {
    let harness = Harness::new();
    let provider = Arc::new(RecordingProvider {
        calls: Mutex::new(Vec::new()),
        missing: vec!["subnet-ghost".to_string()],
    });
    harness.registry.register(
        TaskType::Delete,
        resource_types::SUBNET,
        Arc::new(DeleteResourceHandler::new(provider)),
    );

    let root = Root::new(
        "delete subnet",
        resource_types::SUBNET,
        WorkflowNature::Delete,
        json!({}),
    )
    .with_status(RootStatus::Ready);
    let mut graph = TaskGraph::new();
    let node_id = graph.add_next(
        TaskNode::new(
            TaskType::Delete,
            resource_types::SUBNET,
            TaskPayload::DeleteResource {
                provider_id: "subnet-ghost".to_string(),
            },
        )
        .with_resource(Uuid::new_v4()),
    )?;
    harness.store.commit_graph(&root, &graph).await?;

    assert_ok!(harness.run_to_quiescence(root.id).await);

    let node = harness.store.node(node_id).await?;
    assert_eq!(node.status, Some(NodeStatus::Successful));
    assert_eq!(node.result.unwrap()["already_deleted"], true);

    let root = harness.store.root(root.id).await?;
    assert_eq!(root.status, RootStatus::CompletedSuccessfully);
    Ok(())
}
