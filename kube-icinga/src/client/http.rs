use super::{ClientError, ClientResult, IcingaClient};
use crate::config::IcingaConfig;
use crate::models::{IcingaObject, ObjectDefinition, ObjectKind};
use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::{Client, Method, RequestBuilder, StatusCode, Url};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

/// `{"results": [...]}` envelope returned by object queries.
#[derive(Debug, Deserialize)]
struct ResultsEnvelope {
    #[serde(default)]
    results: Vec<IcingaObject>,
}

/// [`IcingaClient`] over the Icinga 2 REST API (`/v1/objects`).
#[derive(Clone)]
pub struct HttpIcingaClient {
    http: Client,
    base: Url,
    username: String,
    password: String,
}

impl HttpIcingaClient {
    pub fn new(config: &IcingaConfig) -> ClientResult<Self> {
        let base = Url::parse(&config.url)
            .map_err(|e| ClientError::InvalidUrl(format!("{}: {e}", config.url)))?;
        if base.cannot_be_a_base() {
            return Err(ClientError::InvalidUrl(config.url.clone()));
        }

        let mut builder = Client::builder().danger_accept_invalid_certs(config.accept_invalid_certs);
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }

        Ok(Self {
            http: builder.build()?,
            base,
            username: config.username.clone(),
            password: config.password.clone(),
        })
    }

    /// `<base>/v1/objects/<collection>[/<name>]`, name percent-encoded as one segment.
    fn object_url(&self, kind: ObjectKind, name: Option<&str>) -> ClientResult<Url> {
        let mut url = self.base.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| ClientError::InvalidUrl(self.base.to_string()))?;
            segments
                .pop_if_empty()
                .extend(["v1", "objects", kind.collection()]);
            if let Some(name) = name {
                segments.push(name);
            }
        }
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.http
            .request(method, url)
            .basic_auth(&self.username, Some(&self.password))
            .header(ACCEPT, "application/json")
    }

    async fn send(&self, request: RequestBuilder) -> ClientResult<Value> {
        let response = request.send().await?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(ClientError::NotFound);
        }

        let body = response.text().await?;
        if !status.is_success() {
            return Err(ClientError::Status {
                status: status.as_u16(),
                body,
            });
        }
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&body)?)
    }

    async fn lookup(&self, kind: ObjectKind, name: &str) -> ClientResult<IcingaObject> {
        let url = self.object_url(kind, Some(name))?;
        debug!(%url, "icinga lookup");
        let body = self.send(self.request(Method::GET, url)).await?;
        let envelope: ResultsEnvelope = serde_json::from_value(body)?;
        envelope.results.into_iter().next().ok_or(ClientError::NotFound)
    }

    async fn create(&self, kind: ObjectKind, name: &str, payload: Value) -> ClientResult<Value> {
        let url = self.object_url(kind, Some(name))?;
        debug!(%url, "icinga create");
        self.send(self.request(Method::PUT, url).json(&payload)).await
    }

    async fn delete(&self, kind: ObjectKind, name: &str) -> ClientResult<Value> {
        let mut url = self.object_url(kind, Some(name))?;
        url.query_pairs_mut().append_pair("cascade", "1");
        debug!(%url, "icinga delete");
        self.send(self.request(Method::DELETE, url)).await
    }

    async fn list(&self, kind: ObjectKind, filter: &str) -> ClientResult<Vec<IcingaObject>> {
        let url = self.object_url(kind, None)?;
        debug!(%url, filter, "icinga filtered listing");
        let request = self
            .request(Method::POST, url)
            .header("X-HTTP-Method-Override", "GET")
            .json(&json!({ "filter": filter }));
        let body = self.send(request).await?;
        let envelope: ResultsEnvelope = serde_json::from_value(body)?;
        Ok(envelope.results)
    }
}

fn service_name(host: &str, name: &str) -> String {
    format!("{host}!{name}")
}

fn group_payload(display_name: &str) -> Value {
    json!({ "attrs": { "display_name": display_name } })
}

#[async_trait]
impl IcingaClient for HttpIcingaClient {
    async fn get_check_command(&self, name: &str) -> ClientResult<IcingaObject> {
        self.lookup(ObjectKind::CheckCommand, name).await
    }

    async fn get_host_group(&self, name: &str) -> ClientResult<IcingaObject> {
        self.lookup(ObjectKind::HostGroup, name).await
    }

    async fn create_host_group(&self, name: &str, display_name: &str) -> ClientResult<Value> {
        self.create(ObjectKind::HostGroup, name, group_payload(display_name))
            .await
    }

    async fn get_service_group(&self, name: &str) -> ClientResult<IcingaObject> {
        self.lookup(ObjectKind::ServiceGroup, name).await
    }

    async fn create_service_group(&self, name: &str, display_name: &str) -> ClientResult<Value> {
        self.create(ObjectKind::ServiceGroup, name, group_payload(display_name))
            .await
    }

    async fn get_host(&self, name: &str) -> ClientResult<IcingaObject> {
        self.lookup(ObjectKind::Host, name).await
    }

    async fn create_host(&self, name: &str, definition: &ObjectDefinition) -> ClientResult<Value> {
        self.create(ObjectKind::Host, name, serde_json::to_value(definition)?)
            .await
    }

    async fn delete_host(&self, name: &str) -> ClientResult<Value> {
        self.delete(ObjectKind::Host, name).await
    }

    async fn get_service(&self, host: &str, name: &str) -> ClientResult<IcingaObject> {
        self.lookup(ObjectKind::Service, &service_name(host, name))
            .await
    }

    async fn create_service(
        &self,
        host: &str,
        name: &str,
        definition: &ObjectDefinition,
    ) -> ClientResult<Value> {
        self.create(
            ObjectKind::Service,
            &service_name(host, name),
            serde_json::to_value(definition)?,
        )
        .await
    }

    async fn delete_service(&self, host: &str, name: &str) -> ClientResult<Value> {
        self.delete(ObjectKind::Service, &service_name(host, name))
            .await
    }

    async fn list_hosts(&self, filter: &str) -> ClientResult<Vec<IcingaObject>> {
        self.list(ObjectKind::Host, filter).await
    }

    async fn list_services(&self, filter: &str) -> ClientResult<Vec<IcingaObject>> {
        self.list(ObjectKind::Service, filter).await
    }
}
