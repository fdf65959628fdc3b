//! HTTP client for the remote layout store.
//!
//! Speaks the CMS-style REST contract:
//!
//! ```text
//! GET    {base}/api/{collection}?filters[componentId][$eq]=..&filters[breakpoint][$eq]=..
//! POST   {base}/api/{collection}                 { "data": { componentId, breakpoint, x, .. } }
//! PUT    {base}/api/{collection}/{documentId}    { "data": { .. } }
//! DELETE {base}/api/{collection}/{documentId}
//! ```
//!
//! Responses wrap records in `{ "data": .. }`. Both flat records and records
//! nesting their fields under `attributes` are accepted.

use super::{BoxFuture, LayoutFields, PersistedRecord, RemoteError, RemoteResult, RemoteStore};
use crate::settings::RemoteConfig;
use serde::{Deserialize, Serialize};
use url::Url;

/// Remote store reached over HTTP.
pub struct HttpRemoteStore {
    client: reqwest::Client,
    collection_url: Url,
}

#[derive(Serialize)]
struct DataBody<'a> {
    data: &'a LayoutFields,
}

#[derive(Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum WireRecord {
    Nested {
        #[serde(default)]
        id: Option<serde_json::Value>,
        #[serde(rename = "documentId", default)]
        document_id: Option<String>,
        attributes: LayoutFields,
    },
    Flat {
        #[serde(default)]
        id: Option<serde_json::Value>,
        #[serde(rename = "documentId", default)]
        document_id: Option<String>,
        #[serde(flatten)]
        fields: LayoutFields,
    },
}

impl WireRecord {
    fn into_record(self) -> RemoteResult<PersistedRecord> {
        let (id, document_id, fields) = match self {
            WireRecord::Nested { id, document_id, attributes } => (id, document_id, attributes),
            WireRecord::Flat { id, document_id, fields } => (id, document_id, fields),
        };
        let document_id = document_id
            .filter(|d| !d.is_empty())
            .or_else(|| {
                id.map(|v| match v {
                    serde_json::Value::String(s) => s,
                    other => other.to_string(),
                })
            })
            .ok_or_else(|| {
                RemoteError::Decode(format!("record for {} has no id", fields.component_id))
            })?;
        Ok(PersistedRecord { document_id, fields })
    }
}

/// Decode a `{ "data": [ .. ] }` list response.
pub(crate) fn decode_list(body: &str) -> RemoteResult<Vec<PersistedRecord>> {
    let envelope: Envelope<Vec<WireRecord>> =
        serde_json::from_str(body).map_err(|e| RemoteError::Decode(e.to_string()))?;
    envelope.data.into_iter().map(WireRecord::into_record).collect()
}

/// Decode a `{ "data": { .. } }` single-record response.
pub(crate) fn decode_one(body: &str) -> RemoteResult<PersistedRecord> {
    let envelope: Envelope<WireRecord> =
        serde_json::from_str(body).map_err(|e| RemoteError::Decode(e.to_string()))?;
    envelope.data.into_record()
}

impl HttpRemoteStore {
    /// Create a client for the store described by `config`.
    pub fn new(config: &RemoteConfig) -> RemoteResult<Self> {
        let base = format!("{}/", config.base_url.trim_end_matches('/'));
        let collection_url = Url::parse(&base)
            .and_then(|url| url.join(&format!("api/{}", config.collection)))
            .map_err(|e| RemoteError::Transport(format!("Invalid store URL {}: {}", config.base_url, e)))?;

        #[allow(unused_mut)]
        let mut builder = reqwest::Client::builder();
        #[cfg(not(target_arch = "wasm32"))]
        {
            builder = builder.timeout(config.timeout());
        }
        let client = builder
            .build()
            .map_err(|e| RemoteError::Transport(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, collection_url })
    }

    /// Collection endpoint.
    pub fn collection_url(&self) -> &Url {
        &self.collection_url
    }

    fn query_url(&self, component_id: &str, breakpoint: Option<&str>) -> Url {
        let mut url = self.collection_url.clone();
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("filters[componentId][$eq]", component_id);
            if let Some(bp) = breakpoint {
                pairs.append_pair("filters[breakpoint][$eq]", bp);
            }
        }
        url
    }

    fn record_url(&self, document_id: &str) -> RemoteResult<Url> {
        let mut url = self.collection_url.clone();
        url.path_segments_mut()
            .map_err(|_| RemoteError::Transport(format!("{} cannot hold a record path", self.collection_url)))?
            .push(document_id);
        Ok(url)
    }

    async fn read_body(response: reqwest::Response) -> RemoteResult<String> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| RemoteError::Transport(e.to_string()))?;
        if status.is_success() {
            Ok(body)
        } else {
            Err(RemoteError::Status {
                status: status.as_u16(),
                body,
            })
        }
    }
}

fn transport(e: reqwest::Error) -> RemoteError {
    RemoteError::Transport(e.to_string())
}

impl RemoteStore for HttpRemoteStore {
    fn query(&self, component_id: &str, breakpoint: Option<&str>) -> BoxFuture<'_, RemoteResult<Vec<PersistedRecord>>> {
        let url = self.query_url(component_id, breakpoint);
        Box::pin(async move {
            let response = self.client.get(url).send().await.map_err(transport)?;
            decode_list(&Self::read_body(response).await?)
        })
    }

    fn create(&self, fields: &LayoutFields) -> BoxFuture<'_, RemoteResult<PersistedRecord>> {
        let fields = fields.clone();
        Box::pin(async move {
            let response = self
                .client
                .post(self.collection_url.clone())
                .json(&DataBody { data: &fields })
                .send()
                .await
                .map_err(transport)?;
            decode_one(&Self::read_body(response).await?)
        })
    }

    fn update(&self, document_id: &str, fields: &LayoutFields) -> BoxFuture<'_, RemoteResult<PersistedRecord>> {
        let url = self.record_url(document_id);
        let fields = fields.clone();
        Box::pin(async move {
            let response = self
                .client
                .put(url?)
                .json(&DataBody { data: &fields })
                .send()
                .await
                .map_err(transport)?;
            decode_one(&Self::read_body(response).await?)
        })
    }

    fn delete(&self, document_id: &str) -> BoxFuture<'_, RemoteResult<()>> {
        let url = self.record_url(document_id);
        Box::pin(async move {
            let response = self.client.delete(url?).send().await.map_err(transport)?;
            Self::read_body(response).await.map(|_| ())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(base: &str) -> HttpRemoteStore {
        HttpRemoteStore::new(&RemoteConfig {
            base_url: base.to_string(),
            ..RemoteConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_collection_url() {
        assert_eq!(
            store("http://localhost:1337").collection_url().as_str(),
            "http://localhost:1337/api/component-layouts"
        );
        assert_eq!(
            store("https://cms.example/layouts/").collection_url().as_str(),
            "https://cms.example/layouts/api/component-layouts"
        );
    }

    #[test]
    fn test_query_url_filters() {
        let url = store("http://localhost:1337").query_url("valve X00", Some("xxl"));
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(
            pairs,
            vec![
                ("filters[componentId][$eq]".to_string(), "valve X00".to_string()),
                ("filters[breakpoint][$eq]".to_string(), "xxl".to_string()),
            ]
        );
    }

    #[test]
    fn test_record_url_escapes_id() {
        let url = store("http://localhost:1337").record_url("a/b").unwrap();
        assert_eq!(url.as_str(), "http://localhost:1337/api/component-layouts/a%2Fb");
    }

    #[test]
    fn test_decode_flat_records() {
        let body = r#"{"data":[{"id":3,"documentId":"abc","componentId":"valve-1","breakpoint":"xxl",
            "x":10,"y":20,"width":30,"height":40,"scale":1,"zIndex":15,"opacity":1,"rotation":0}],
            "meta":{"pagination":{"total":1}}}"#;
        let records = decode_list(body).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].document_id, "abc");
        assert_eq!(records[0].fields.z_index, 15);
    }

    #[test]
    fn test_decode_nested_records_use_numeric_id() {
        let body = r#"{"data":{"id":7,"attributes":{"componentId":"motor-1","breakpoint":"lg",
            "x":1,"y":2,"width":3,"height":4}}}"#;
        let record = decode_one(body).unwrap();
        assert_eq!(record.document_id, "7");
        assert_eq!(record.fields.scale, 1.0);
        assert_eq!(record.fields.rotation, 0.0);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(decode_list("<html>"), Err(RemoteError::Decode(_))));
        let no_id = r#"{"data":[{"componentId":"a","breakpoint":"lg","x":1,"y":2,"width":3,"height":4}]}"#;
        assert!(matches!(decode_list(no_id), Err(RemoteError::Decode(_))));
    }
}
