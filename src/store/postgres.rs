//! Postgres store.
//!
//! Logical layout: a root table, a task node table, one association table per
//! edge relation, a workspace table, and a cloud account table. Statuses are
//! stored as their snake_case wire strings; payloads as JSONB.

use crate::constants::RootStatus;
use crate::error::{Result, StratusError};
use crate::graph::TaskGraph;
use crate::models::{CloudAccount, Root, TaskNode, Workspace};
use crate::store::Store;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[derive(Debug, FromRow)]
struct RootRow {
    id: Uuid,
    workflow_name: String,
    resource_type: String,
    workflow_nature: String,
    user_id: Option<Uuid>,
    project_id: Option<Uuid>,
    account_id: Option<Uuid>,
    fe_request_data: serde_json::Value,
    status: String,
    created_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}

impl RootRow {
    fn into_model(self) -> Result<Root> {
        Ok(Root {
            id: self.id,
            workflow_name: self.workflow_name,
            resource_type: self.resource_type,
            workflow_nature: self
                .workflow_nature
                .parse()
                .map_err(StratusError::Storage)?,
            user_id: self.user_id,
            project_id: self.project_id,
            account_id: self.account_id,
            fe_request_data: self.fe_request_data,
            status: self.status.parse().map_err(StratusError::Storage)?,
            created_at: self.created_at,
            completed_at: self.completed_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct TaskNodeRow {
    id: Uuid,
    root_id: Uuid,
    task_type: String,
    resource_type: String,
    resource_id: Option<Uuid>,
    status: Option<String>,
    message: Option<String>,
    task_metadata: serde_json::Value,
    result: Option<serde_json::Value>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TaskNodeRow {
    fn into_model(self) -> Result<TaskNode> {
        let status = self
            .status
            .map(|s| s.parse().map_err(StratusError::Storage))
            .transpose()?;
        Ok(TaskNode {
            id: self.id,
            root_id: self.root_id,
            task_type: self.task_type.parse().map_err(StratusError::Storage)?,
            resource_type: self.resource_type,
            resource_id: self.resource_id,
            status,
            message: self.message,
            task_metadata: serde_json::from_value(self.task_metadata)?,
            result: self.result,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct WorkspaceRow {
    id: Uuid,
    name: String,
    user_id: Option<Uuid>,
    project_id: Option<Uuid>,
    status: String,
    root_ids: Vec<Uuid>,
    recently_provisioned_roots: Vec<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl WorkspaceRow {
    fn into_model(self) -> Result<Workspace> {
        Ok(Workspace {
            id: self.id,
            name: self.name,
            user_id: self.user_id,
            project_id: self.project_id,
            status: self.status.parse().map_err(StratusError::Storage)?,
            root_ids: self.root_ids,
            recently_provisioned_roots: self.recently_provisioned_roots,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct CloudAccountRow {
    id: Uuid,
    name: String,
    valid: bool,
    marked_for_deletion: bool,
    created_at: DateTime<Utc>,
}

impl CloudAccountRow {
    fn into_model(self) -> CloudAccount {
        CloudAccount {
            id: self.id,
            name: self.name,
            valid: self.valid,
            marked_for_deletion: self.marked_for_deletion,
            created_at: self.created_at,
        }
    }
}

const INSERT_ROOT: &str = r#"
    INSERT INTO stratus_roots
        (id, workflow_name, resource_type, workflow_nature, user_id, project_id,
         account_id, fe_request_data, status, created_at, completed_at)
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
"#;

const INSERT_NODE: &str = r#"
    INSERT INTO stratus_task_nodes
        (id, root_id, task_type, resource_type, resource_id, status, message,
         task_metadata, result, created_at, updated_at)
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
"#;

#[async_trait::async_trait]
impl Store for PgStore {
    async fn create_root(&self, root: &Root) -> Result<()> {
        sqlx::query(INSERT_ROOT)
            .bind(root.id)
            .bind(&root.workflow_name)
            .bind(&root.resource_type)
            .bind(root.workflow_nature.to_string())
            .bind(root.user_id)
            .bind(root.project_id)
            .bind(root.account_id)
            .bind(&root.fe_request_data)
            .bind(root.status.to_string())
            .bind(root.created_at)
            .bind(root.completed_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn root(&self, id: Uuid) -> Result<Root> {
        let row = sqlx::query_as::<_, RootRow>("SELECT * FROM stratus_roots WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StratusError::RootNotFound(id))?;
        row.into_model()
    }

    async fn update_root_status(
        &self,
        id: Uuid,
        status: RootStatus,
        completed_at: Option<DateTime<Utc>>,
    ) -> Result<()> {
        let result = sqlx::query(
            "UPDATE stratus_roots SET status = $2, completed_at = COALESCE($3, completed_at) WHERE id = $1",
        )
        .bind(id)
        .bind(status.to_string())
        .bind(completed_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StratusError::RootNotFound(id));
        }
        Ok(())
    }

    async fn link_roots(&self, from: Uuid, to: Uuid) -> Result<()> {
        sqlx::query(
            "INSERT INTO stratus_root_edges (from_root_id, to_root_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(from)
        .bind(to)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn root_links(&self, id: Uuid) -> Result<(Vec<Uuid>, Vec<Uuid>)> {
        let previous: Vec<(Uuid,)> =
            sqlx::query_as("SELECT from_root_id FROM stratus_root_edges WHERE to_root_id = $1")
                .bind(id)
                .fetch_all(&self.pool)
                .await?;
        let next: Vec<(Uuid,)> =
            sqlx::query_as("SELECT to_root_id FROM stratus_root_edges WHERE from_root_id = $1")
                .bind(id)
                .fetch_all(&self.pool)
                .await?;
        Ok((
            previous.into_iter().map(|(id,)| id).collect(),
            next.into_iter().map(|(id,)| id).collect(),
        ))
    }

    async fn commit_graph(&self, root: &Root, graph: &TaskGraph) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(INSERT_ROOT)
            .bind(root.id)
            .bind(&root.workflow_name)
            .bind(&root.resource_type)
            .bind(root.workflow_nature.to_string())
            .bind(root.user_id)
            .bind(root.project_id)
            .bind(root.account_id)
            .bind(&root.fe_request_data)
            .bind(root.status.to_string())
            .bind(root.created_at)
            .bind(root.completed_at)
            .execute(&mut *tx)
            .await?;

        for node in graph.nodes() {
            sqlx::query(INSERT_NODE)
                .bind(node.id)
                .bind(root.id)
                .bind(node.task_type.to_string())
                .bind(&node.resource_type)
                .bind(node.resource_id)
                .bind(node.status.map(|s| s.to_string()))
                .bind(&node.message)
                .bind(serde_json::to_value(&node.task_metadata)?)
                .bind(&node.result)
                .bind(node.created_at)
                .bind(node.updated_at)
                .execute(&mut *tx)
                .await?;
        }

        for (from, to) in graph.edges() {
            sqlx::query(
                "INSERT INTO stratus_task_node_edges (from_node_id, to_node_id) VALUES ($1, $2)",
            )
            .bind(from)
            .bind(to)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn node(&self, id: Uuid) -> Result<TaskNode> {
        let row =
            sqlx::query_as::<_, TaskNodeRow>("SELECT * FROM stratus_task_nodes WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?
                .ok_or(StratusError::NodeNotFound(id))?;
        row.into_model()
    }

    async fn nodes_for_root(&self, root_id: Uuid) -> Result<Vec<TaskNode>> {
        let rows = sqlx::query_as::<_, TaskNodeRow>(
            "SELECT * FROM stratus_task_nodes WHERE root_id = $1 ORDER BY created_at ASC",
        )
        .bind(root_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(TaskNodeRow::into_model).collect()
    }

    async fn update_node(&self, node: &TaskNode) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE stratus_task_nodes
            SET status = $2, message = $3, resource_id = $4, task_metadata = $5,
                result = $6, updated_at = $7
            WHERE id = $1
            "#,
        )
        .bind(node.id)
        .bind(node.status.map(|s| s.to_string()))
        .bind(&node.message)
        .bind(node.resource_id)
        .bind(serde_json::to_value(&node.task_metadata)?)
        .bind(&node.result)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StratusError::NodeNotFound(node.id));
        }
        Ok(())
    }

    async fn node_predecessors(&self, id: Uuid) -> Result<Vec<TaskNode>> {
        let rows = sqlx::query_as::<_, TaskNodeRow>(
            r#"
            SELECT n.* FROM stratus_task_nodes n
            INNER JOIN stratus_task_node_edges e ON e.from_node_id = n.id
            WHERE e.to_node_id = $1
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(TaskNodeRow::into_model).collect()
    }

    async fn node_successors(&self, id: Uuid) -> Result<Vec<TaskNode>> {
        let rows = sqlx::query_as::<_, TaskNodeRow>(
            r#"
            SELECT n.* FROM stratus_task_nodes n
            INNER JOIN stratus_task_node_edges e ON e.to_node_id = n.id
            WHERE e.from_node_id = $1
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(TaskNodeRow::into_model).collect()
    }

    async fn create_workspace(&self, workspace: &Workspace) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO stratus_workspaces
                (id, name, user_id, project_id, status, root_ids,
                 recently_provisioned_roots, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(workspace.id)
        .bind(&workspace.name)
        .bind(workspace.user_id)
        .bind(workspace.project_id)
        .bind(workspace.status.to_string())
        .bind(&workspace.root_ids)
        .bind(&workspace.recently_provisioned_roots)
        .bind(workspace.created_at)
        .bind(workspace.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn workspace(&self, id: Uuid) -> Result<Workspace> {
        let row =
            sqlx::query_as::<_, WorkspaceRow>("SELECT * FROM stratus_workspaces WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?
                .ok_or(StratusError::WorkspaceNotFound(id))?;
        row.into_model()
    }

    async fn update_workspace(&self, workspace: &Workspace) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE stratus_workspaces
            SET status = $2, recently_provisioned_roots = $3, updated_at = $4
            WHERE id = $1
            "#,
        )
        .bind(workspace.id)
        .bind(workspace.status.to_string())
        .bind(&workspace.recently_provisioned_roots)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StratusError::WorkspaceNotFound(workspace.id));
        }
        Ok(())
    }

    async fn delete_workspace(&self, id: Uuid) -> Result<()> {
        let result = sqlx::query("DELETE FROM stratus_workspaces WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StratusError::WorkspaceNotFound(id));
        }
        Ok(())
    }

    async fn upsert_cloud_account(&self, account: &CloudAccount) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO stratus_cloud_accounts (id, name, valid, marked_for_deletion, created_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (id) DO UPDATE
            SET name = $2, valid = $3, marked_for_deletion = $4
            "#,
        )
        .bind(account.id)
        .bind(&account.name)
        .bind(account.valid)
        .bind(account.marked_for_deletion)
        .bind(account.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn cloud_account(&self, id: Uuid) -> Result<CloudAccount> {
        let row = sqlx::query_as::<_, CloudAccountRow>(
            "SELECT * FROM stratus_cloud_accounts WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StratusError::AccountNotFound(id))?;
        Ok(row.into_model())
    }

    async fn mark_account_invalid(&self, id: Uuid) -> Result<()> {
        let result = sqlx::query("UPDATE stratus_cloud_accounts SET valid = FALSE WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StratusError::AccountNotFound(id));
        }
        Ok(())
    }

    async fn accounts_marked_for_deletion(&self) -> Result<Vec<CloudAccount>> {
        let rows = sqlx::query_as::<_, CloudAccountRow>(
            "SELECT * FROM stratus_cloud_accounts WHERE marked_for_deletion = TRUE",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(CloudAccountRow::into_model).collect())
    }
}
