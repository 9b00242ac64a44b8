use std::collections::HashMap;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::errors::StorageError;
use crate::storage::EntryStore;

/// Datastore kind holding all entries.
const ENTRY_KIND: &str = "strings";

/// Entry store backed by Google Cloud Datastore over its REST API
/// (`:runQuery` / `:lookup` / `:commit`).
///
/// All entries live under one kind in a fixed namespace partition baked in
/// at construction. The endpoint is configurable so the adapter also talks
/// to the Datastore emulator, which speaks the same protocol without auth.
#[derive(Clone)]
pub struct DatastoreStore {
    client: reqwest::Client,
    endpoint: String,
    project_id: String,
    namespace: String,
    token: Option<String>,
}

impl DatastoreStore {
    pub fn new(endpoint: &str, project_id: &str, namespace: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.trim_end_matches('/').to_string(),
            project_id: project_id.to_string(),
            namespace: namespace.to_string(),
            token: None,
        }
    }

    /// Attach an OAuth bearer token to every request. The emulator needs
    /// none, production Datastore does.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// The storage key for a logical entry name: a named key of
    /// `ENTRY_KIND` in this adapter's namespace. Deterministic, so equal
    /// names always address the same document.
    fn key(&self, name: &str) -> serde_json::Value {
        json!({
            "partitionId": { "namespaceId": self.namespace },
            "path": [{ "kind": ENTRY_KIND, "name": name }]
        })
    }

    async fn call<T: DeserializeOwned>(
        &self,
        verb: &str,
        body: serde_json::Value,
    ) -> Result<T, StorageError> {
        let url = format!("{}/v1/projects/{}:{}", self.endpoint, self.project_id, verb);
        debug!(%verb, "datastore request");

        let mut request = self.client.post(&url).json(&body);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| StorageError::Transport(e.to_string()))?;
        if !response.status().is_success() {
            return Err(StorageError::Transport(format!(
                "datastore {} returned {}",
                verb,
                response.status()
            )));
        }
        response
            .json::<T>()
            .await
            .map_err(|e| StorageError::Response(e.to_string()))
    }
}

#[async_trait]
impl EntryStore for DatastoreStore {
    async fn list(&self) -> Result<Vec<String>, StorageError> {
        // Projection query: only the `name` property, ordered ascending.
        let body = json!({
            "partitionId": { "namespaceId": self.namespace },
            "query": {
                "kind": [{ "name": ENTRY_KIND }],
                "projection": [{ "property": { "name": "name" } }],
                "order": [{ "property": { "name": "name" }, "direction": "ASCENDING" }]
            }
        });

        let response: RunQueryResponse = self.call("runQuery", body).await?;
        let names = response
            .batch
            .map(|batch| batch.entity_results)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|result| result.entity.property_string("name"))
            .collect();
        Ok(names)
    }

    async fn get(&self, name: &str) -> Result<String, StorageError> {
        let body = json!({ "keys": [self.key(name)] });

        let response: LookupResponse = self.call("lookup", body).await?;
        // Entity missing and `val` property absent both read as empty.
        let value = response
            .found
            .into_iter()
            .next()
            .and_then(|result| result.entity.property_string("val"))
            .unwrap_or_default();
        Ok(value)
    }

    async fn put(&self, name: &str, value: &str) -> Result<(), StorageError> {
        // Values are free text; keep `val` out of the indexes so long
        // bodies do not hit the indexed-value size limit.
        let body = json!({
            "mode": "NON_TRANSACTIONAL",
            "mutations": [{
                "upsert": {
                    "key": self.key(name),
                    "properties": {
                        "name": { "stringValue": name },
                        "val": { "stringValue": value, "excludeFromIndexes": true }
                    }
                }
            }]
        });

        let _: serde_json::Value = self.call("commit", body).await?;
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct RunQueryResponse {
    batch: Option<QueryBatch>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryBatch {
    #[serde(default)]
    entity_results: Vec<EntityResult>,
}

#[derive(Debug, Deserialize)]
struct LookupResponse {
    #[serde(default)]
    found: Vec<EntityResult>,
}

#[derive(Debug, Deserialize)]
struct EntityResult {
    entity: Entity,
}

#[derive(Debug, Deserialize)]
struct Entity {
    #[serde(default)]
    properties: HashMap<String, PropertyValue>,
}

impl Entity {
    fn property_string(&self, name: &str) -> Option<String> {
        self.properties.get(name).and_then(|p| p.string_value.clone())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PropertyValue {
    string_value: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn store_for(server: &MockServer) -> DatastoreStore {
        DatastoreStore::new(&server.base_url(), "demo-project", "jacek")
    }

    #[tokio::test]
    async fn list_runs_projection_query_and_maps_names() -> Result<(), anyhow::Error> {
        let server = MockServer::start();
        let query_mock = server.mock(|when, then| {
            when.method(POST)
                .path("/v1/projects/demo-project:runQuery")
                .json_body_partial(
                    r#"{ "partitionId": { "namespaceId": "jacek" } }"#,
                );
            then.status(200).json_body(serde_json::json!({
                "batch": {
                    "entityResults": [
                        { "entity": { "properties": { "name": { "stringValue": "alpha" } } } },
                        { "entity": { "properties": { "name": { "stringValue": "beta" } } } }
                    ]
                }
            }));
        });

        let names = store_for(&server).list().await?;
        assert_eq!(names, vec!["alpha", "beta"]);
        query_mock.assert();
        Ok(())
    }

    #[tokio::test]
    async fn list_with_no_results_is_empty() -> Result<(), anyhow::Error> {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/v1/projects/demo-project:runQuery");
            then.status(200).json_body(serde_json::json!({}));
        });

        assert!(store_for(&server).list().await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn get_returns_val_property_of_found_entity() -> Result<(), anyhow::Error> {
        let server = MockServer::start();
        let lookup_mock = server.mock(|when, then| {
            when.method(POST)
                .path("/v1/projects/demo-project:lookup")
                .json_body_partial(
                    r#"{ "keys": [ { "path": [ { "kind": "strings", "name": "first" } ] } ] }"#,
                );
            then.status(200).json_body(serde_json::json!({
                "found": [
                    { "entity": { "properties": { "val": { "stringValue": "hello" } } } }
                ]
            }));
        });

        assert_eq!(store_for(&server).get("first").await?, "hello");
        lookup_mock.assert();
        Ok(())
    }

    #[tokio::test]
    async fn get_of_missing_entity_is_empty_string() -> Result<(), anyhow::Error> {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/v1/projects/demo-project:lookup");
            then.status(200).json_body(serde_json::json!({
                "missing": [ { "entity": { "key": {} } } ]
            }));
        });

        assert_eq!(store_for(&server).get("neverset").await?, "");
        Ok(())
    }

    #[tokio::test]
    async fn get_without_val_property_is_empty_string() -> Result<(), anyhow::Error> {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/v1/projects/demo-project:lookup");
            then.status(200).json_body(serde_json::json!({
                "found": [
                    { "entity": { "properties": { "name": { "stringValue": "bare" } } } }
                ]
            }));
        });

        assert_eq!(store_for(&server).get("bare").await?, "");
        Ok(())
    }

    #[tokio::test]
    async fn put_commits_an_upsert_mutation() -> Result<(), anyhow::Error> {
        let server = MockServer::start();
        let commit_mock = server.mock(|when, then| {
            when.method(POST)
                .path("/v1/projects/demo-project:commit")
                .json_body_partial(r#"{ "mode": "NON_TRANSACTIONAL" }"#);
            then.status(200).json_body(serde_json::json!({
                "mutationResults": [ {} ]
            }));
        });

        store_for(&server).put("first", "hello").await?;
        commit_mock.assert();
        Ok(())
    }

    #[tokio::test]
    async fn backend_error_status_surfaces_as_storage_error() -> Result<(), anyhow::Error> {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/v1/projects/demo-project:runQuery");
            then.status(500);
        });

        let err = store_for(&server).list().await.unwrap_err();
        assert!(matches!(err, StorageError::Transport(_)));
        Ok(())
    }

    #[tokio::test]
    async fn unreachable_backend_surfaces_as_storage_error() {
        // Nothing listens on this port.
        let store = DatastoreStore::new("http://127.0.0.1:1", "demo-project", "jacek");
        let err = store.list().await.unwrap_err();
        assert!(matches!(err, StorageError::Transport(_)));
    }

    #[tokio::test]
    async fn non_json_body_surfaces_as_response_error() -> Result<(), anyhow::Error> {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/v1/projects/demo-project:lookup");
            then.status(200).body("not json");
        });

        let err = store_for(&server).get("first").await.unwrap_err();
        assert!(matches!(err, StorageError::Response(_)));
        Ok(())
    }
}
