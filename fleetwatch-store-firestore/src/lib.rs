//! Source gateways backed by the Firestore REST API.

mod document;
mod error;
mod query;
mod value;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use fleetwatch_core::{
    model::{Checklist, ChecklistItemDefinition, Fine, Incident, Maintenance, UsageLog, User},
    ports::{
        ChecklistDefinitionGateway, ChecklistGateway, ChecklistQuery, FineGateway, FineQuery,
        IncidentGateway, IncidentQuery, MaintenanceGateway, MaintenanceQuery, Source, SourceError,
        SourceErrorKind, UsageLogGateway, UsageLogQuery, UserGateway,
    },
};

use crate::document::{FromDocument, NewDocument, QueryResult};
use crate::query::{QueryBuilder, RunQueryRequest};

const DEFAULT_BASE_URL: &str = "https://firestore.googleapis.com/v1";

/// Database the project uses when none is named.
pub const DEFAULT_DATABASE: &str = "(default)";

/// Where and how to reach a Firestore database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirestoreConfig {
    /// Google Cloud project id.
    pub project_id: String,
    /// Database id, usually `(default)`.
    pub database: String,
    /// REST root up to and including the API version.
    pub base_url: String,
    /// OAuth bearer token; the emulator accepts requests without one.
    pub access_token: Option<String>,
}

impl FirestoreConfig {
    /// Production endpoint for `project_id`.
    #[must_use]
    pub fn new(project_id: &str) -> Self {
        Self {
            project_id: project_id.to_owned(),
            database: DEFAULT_DATABASE.to_owned(),
            base_url: DEFAULT_BASE_URL.to_owned(),
            access_token: None,
        }
    }

    /// Local emulator listening on `host` (e.g. `localhost:8080`).
    #[must_use]
    pub fn with_emulator(mut self, host: &str) -> Self {
        self.base_url = format!("http://{host}/v1");
        self
    }

    /// Use a database other than `(default)`.
    #[must_use]
    pub fn with_database(mut self, database: &str) -> Self {
        database.clone_into(&mut self.database);
        self
    }

    /// Authenticate every request with `token`.
    #[must_use]
    pub fn with_access_token(mut self, token: &str) -> Self {
        self.access_token = Some(token.to_owned());
        self
    }

    /// Root of the document tree.
    #[must_use]
    pub fn documents_url(&self) -> String {
        format!(
            "{}/projects/{}/databases/{}/documents",
            self.base_url.trim_end_matches('/'),
            self.project_id,
            self.database
        )
    }
}

/// Every gateway of the system served from one Firestore database.
pub struct FirestoreStore {
    client: Client,
    config: FirestoreConfig,
}

impl FirestoreStore {
    /// Create a store using `client` for all requests.
    #[must_use]
    pub fn new(client: Client, config: FirestoreConfig) -> Self {
        Self { client, config }
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.config.access_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn run_query<T: FromDocument>(
        &self,
        source: Source,
        body: &RunQueryRequest,
    ) -> Result<Vec<T>, SourceError> {
        let url = format!("{}:runQuery", self.config.documents_url());
        let request = self.authorized(self.client.post(url));
        let results: Vec<QueryResult> = send_json(source, request, body).await?;

        // One undecodable document fails the query; a shorter list would skew every count.
        let records = results
            .into_iter()
            .filter_map(|result| result.document)
            .map(|document| T::from_document(&document))
            .collect::<Result<Vec<T>, _>>()
            .map_err(|err| {
                warn!(collection = %source, error = %err, "malformed document in query result");
                SourceError::new(source, SourceErrorKind::Unknown, err.to_string())
            })?;

        debug!(collection = %source, documents = records.len(), "query answered");
        Ok(records)
    }
}

fn collection(source: Source) -> &'static str {
    match source {
        Source::Users => "users",
        Source::UsageLogs => "vehicleUsageLogs",
        Source::Incidents => "incidents",
        Source::Checklists => "checklists",
        Source::Fines => "fines",
        Source::Maintenances => "maintenances",
        Source::ChecklistDefinitions => "checklistItemDefinitions",
    }
}

async fn send(source: Source, request: RequestBuilder) -> Result<Response, SourceError> {
    request
        .send()
        .await
        .map_err(|err| error::from_transport(source, &err))
}

async fn failure(source: Source, response: Response) -> SourceError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    error::from_response(source, status, &body)
}

// POST `body` and decode a successful json answer.
async fn send_json<B, T>(source: Source, request: RequestBuilder, body: &B) -> Result<T, SourceError>
where
    B: Serialize + ?Sized,
    T: DeserializeOwned,
{
    let response = send(source, request.json(body)).await?;
    if !response.status().is_success() {
        return Err(failure(source, response).await);
    }
    response
        .json()
        .await
        .map_err(|err| error::from_transport(source, &err))
}

#[async_trait]
impl UserGateway for FirestoreStore {
    async fn fetch_users(&self) -> Result<Vec<User>, SourceError> {
        let body = QueryBuilder::new(collection(Source::Users)).build();
        self.run_query(Source::Users, &body).await
    }
}

#[async_trait]
impl UsageLogGateway for FirestoreStore {
    async fn fetch_usage_logs(&self, query: &UsageLogQuery) -> Result<Vec<UsageLog>, SourceError> {
        let body = query::usage_logs(collection(Source::UsageLogs), query);
        self.run_query(Source::UsageLogs, &body).await
    }
}

#[async_trait]
impl IncidentGateway for FirestoreStore {
    async fn fetch_incidents(&self, query: &IncidentQuery) -> Result<Vec<Incident>, SourceError> {
        let body = query::incidents(collection(Source::Incidents), query);
        self.run_query(Source::Incidents, &body).await
    }
}

#[async_trait]
impl ChecklistGateway for FirestoreStore {
    async fn fetch_checklists(&self, query: &ChecklistQuery) -> Result<Vec<Checklist>, SourceError> {
        let body = query::checklists(collection(Source::Checklists), query);
        self.run_query(Source::Checklists, &body).await
    }
}

#[async_trait]
impl FineGateway for FirestoreStore {
    async fn fetch_fines(&self, query: &FineQuery) -> Result<Vec<Fine>, SourceError> {
        let body = query::fines(collection(Source::Fines), query);
        self.run_query(Source::Fines, &body).await
    }
}

#[async_trait]
impl MaintenanceGateway for FirestoreStore {
    async fn fetch_maintenances(
        &self,
        query: &MaintenanceQuery,
    ) -> Result<Vec<Maintenance>, SourceError> {
        let body = query::maintenances(collection(Source::Maintenances), query);
        self.run_query(Source::Maintenances, &body).await
    }
}

#[async_trait]
impl ChecklistDefinitionGateway for FirestoreStore {
    async fn list_definitions(&self) -> Result<Vec<ChecklistItemDefinition>, SourceError> {
        let body = QueryBuilder::new(collection(Source::ChecklistDefinitions))
            .ascending("position")
            .build();
        self.run_query(Source::ChecklistDefinitions, &body).await
    }

    async fn create_definition_if_absent(
        &self,
        definition: &ChecklistItemDefinition,
    ) -> Result<bool, SourceError> {
        let source = Source::ChecklistDefinitions;
        let url = format!("{}/{}", self.config.documents_url(), collection(source));
        let request = self
            .authorized(self.client.post(url))
            .query(&[("documentId", definition.key.as_str())])
            .json(&NewDocument::from(definition));

        let response = send(source, request).await?;
        let status = response.status();
        if status.is_success() {
            debug!(key = %definition.key, "definition created");
            return Ok(true);
        }

        let body = response.text().await.unwrap_or_default();
        // Some proxies rewrite the HTTP status but keep the canonical body.
        if status == StatusCode::CONFLICT
            || error::status_name(&body).as_deref() == Some("ALREADY_EXISTS")
        {
            return Ok(false);
        }
        Err(error::from_response(source, status, &body))
    }
}
