use crate::error::ClientError;
use crate::models::{SortMode, StatusFilter, Task, TaskDraft, TaskFilter, TaskPatch};

/// Boundary to the remote task collection.
#[allow(async_fn_in_trait)]
pub trait TaskStore {
    async fn list_tasks(&self, filter: &TaskFilter, sort: SortMode)
        -> Result<Vec<Task>, ClientError>;
    /// `position` is the collection size at submission time, so the new task lands last.
    async fn create_task(&self, draft: &TaskDraft, position: i64) -> Result<Task, ClientError>;
    async fn update_task(&self, id: &str, patch: &TaskPatch) -> Result<(), ClientError>;
    async fn delete_task(&self, id: &str) -> Result<(), ClientError>;
}

/// Query parameters for `GET /tasks/`. Default predicates are left out.
pub fn list_query(filter: &TaskFilter, sort: SortMode) -> Vec<(&'static str, String)> {
    let mut params = Vec::new();
    let search = filter.search.trim();
    if !search.is_empty() {
        params.push(("search", search.to_string()));
    }
    match filter.status {
        StatusFilter::All => {}
        StatusFilter::Active => params.push(("status", "false".to_string())),
        StatusFilter::Completed => params.push(("status", "true".to_string())),
    }
    if let Some(priority) = filter.priority {
        params.push(("priority", priority.as_str().to_string()));
    }
    let category = filter.category.trim();
    if !category.is_empty() {
        params.push(("category", category.to_string()));
    }
    let tag = filter.tag.trim();
    if !tag.is_empty() {
        params.push(("tag", tag.to_string()));
    }
    params.push(("sort_by", sort.as_str().to_string()));
    params
}

#[cfg(feature = "app")]
pub use http::HttpTaskStore;

#[cfg(feature = "app")]
mod http {
    use std::time::Duration;

    use reqwest::header::ACCEPT;

    use super::{list_query, TaskStore};
    use crate::config::ClientConfig;
    use crate::error::ClientError;
    use crate::models::{SortMode, Task, TaskDraft, TaskFilter, TaskPatch};

    pub struct HttpTaskStore {
        client: reqwest::Client,
        config: ClientConfig,
    }

    impl HttpTaskStore {
        pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
            let client = reqwest::Client::builder()
                .timeout(Duration::from_secs(config.request_timeout_secs))
                .build()
                .map_err(|err| ClientError::Network(format!("failed to build http client: {err}")))?;
            Ok(Self { client, config })
        }

        async fn read_body(resp: reqwest::Response) -> Result<String, ClientError> {
            let status = resp.status();
            let text = resp
                .text()
                .await
                .map_err(|err| ClientError::Network(format!("failed to read response: {err}")))?;
            if !status.is_success() {
                return Err(ClientError::RemoteRejection {
                    status: status.as_u16(),
                    body: text,
                });
            }
            Ok(text)
        }
    }

    impl TaskStore for HttpTaskStore {
        async fn list_tasks(
            &self,
            filter: &TaskFilter,
            sort: SortMode,
        ) -> Result<Vec<Task>, ClientError> {
            let resp = self
                .client
                .get(self.config.tasks_url())
                .query(&list_query(filter, sort))
                .header(ACCEPT, "application/json")
                .send()
                .await?;
            let text = Self::read_body(resp).await?;
            let tasks: Vec<Task> = serde_json::from_str(&text)?;
            log::debug!("store: listed count={} sort={}", tasks.len(), sort.as_str());
            Ok(tasks)
        }

        async fn create_task(&self, draft: &TaskDraft, position: i64) -> Result<Task, ClientError> {
            let resp = self
                .client
                .post(self.config.tasks_url())
                .header(ACCEPT, "application/json")
                .json(&draft.to_create_body(position))
                .send()
                .await?;
            let text = Self::read_body(resp).await?;
            let task: Task = serde_json::from_str(&text)?;
            log::info!("store: created id={} position={}", task.id, task.position);
            Ok(task)
        }

        async fn update_task(&self, id: &str, patch: &TaskPatch) -> Result<(), ClientError> {
            let resp = self
                .client
                .put(self.config.task_url(id))
                .header(ACCEPT, "application/json")
                .json(patch)
                .send()
                .await?;
            Self::read_body(resp).await?;
            log::info!("store: updated id={id}");
            Ok(())
        }

        async fn delete_task(&self, id: &str) -> Result<(), ClientError> {
            let resp = self
                .client
                .delete(self.config.task_url(id))
                .header(ACCEPT, "application/json")
                .send()
                .await?;
            Self::read_body(resp).await?;
            log::info!("store: deleted id={id}");
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Priority;

    #[test]
    fn default_filter_sends_only_sort() {
        let params = list_query(&TaskFilter::default(), SortMode::Position);
        assert_eq!(params, vec![("sort_by", "position".to_string())]);
    }

    #[test]
    fn every_predicate_maps_to_a_query_param() {
        let filter = TaskFilter {
            search: "  milk ".to_string(),
            status: StatusFilter::Active,
            priority: Some(Priority::High),
            category: "Дом".to_string(),
            tag: "errand".to_string(),
        };
        let params = list_query(&filter, SortMode::Date);
        assert_eq!(
            params,
            vec![
                ("search", "milk".to_string()),
                ("status", "false".to_string()),
                ("priority", "high".to_string()),
                ("category", "Дом".to_string()),
                ("tag", "errand".to_string()),
                ("sort_by", "date".to_string()),
            ]
        );

        let completed = TaskFilter {
            status: StatusFilter::Completed,
            ..TaskFilter::default()
        };
        assert_eq!(list_query(&completed, SortMode::Title)[0], ("status", "true".to_string()));
    }

    #[cfg(feature = "app")]
    #[test]
    fn http_store_builds_from_config() {
        let store = HttpTaskStore::new(crate::config::ClientConfig::default());
        assert!(store.is_ok());
    }
}
