//! Firestore REST document store
//!
//! Talks to Cloud Firestore (or the local emulator) over its public REST
//! protocol. Server timestamps are requested with `REQUEST_TIME` field
//! transforms, and donations are written with an `updateTime` precondition so
//! two donors cannot both claim the same request.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::{json, Map, Value};

use super::error::BackendError;
use super::value::{encode_fields, FirestoreDocument};
use super::DocumentStore;
use crate::model::{
    BloodRequest, DonationClaim, DonorProfile, NewRequest, RequestDocument, RequestStatus,
    VersionedRequest, REQUESTS_COLLECTION, USERS_COLLECTION,
};

/// Top-level request fields holding timestamps
const REQUEST_TIMESTAMP_FIELDS: &[&str] = &["createdAt", "donationTimestamp"];

/// Fields removed again by undo
const DONATION_FIELDS: &[&str] = &["donorEmail", "donorId", "donorName", "donationTimestamp"];

/// Whether a call may be sent again after a failure that leaves its outcome
/// unknown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Replay {
    /// Reads, queries and whole-document `PATCH`
    Safe,
    /// `documents:commit`: preconditions and server transforms make a
    /// repeated write fail or differ
    Never,
}

/// Whether `error` is worth another attempt of a call with the given replay
fn should_retry(error: &BackendError, replay: Replay) -> bool {
    match replay {
        Replay::Safe => error.is_transient(),
        // 429 is rejected before the write is applied
        Replay::Never => matches!(error, BackendError::RateLimited),
    }
}

/// Map a non-success Firestore response to a typed error
fn classify_error(status: StatusCode, body: &str) -> BackendError {
    let parsed: Option<GoogleErrorBody> = serde_json::from_str(body).ok();
    let (code, message) = parsed
        .map(|b| (b.error.status, b.error.message))
        .unwrap_or_else(|| (String::new(), body.to_string()));

    match (status, code.as_str()) {
        (_, "FAILED_PRECONDITION") | (_, "ABORTED") | (_, "ALREADY_EXISTS") => {
            BackendError::Conflict(message)
        }
        (StatusCode::NOT_FOUND, _) | (_, "NOT_FOUND") => BackendError::NotFound(message),
        (StatusCode::TOO_MANY_REQUESTS, _) | (_, "RESOURCE_EXHAUSTED") => {
            BackendError::RateLimited
        }
        (StatusCode::SERVICE_UNAVAILABLE, _) | (_, "UNAVAILABLE") => BackendError::Unavailable,
        _ => BackendError::Api {
            status: status.as_u16(),
            message,
        },
    }
}

/// Connection settings for the Firestore REST API
#[derive(Debug, Clone)]
pub struct FirestoreConfig {
    /// Google Cloud project id
    pub project_id: String,
    /// Database id, `(default)` unless a named database is used
    pub database_id: String,
    /// Base URL, e.g. `https://firestore.googleapis.com` or the emulator
    pub endpoint: String,
    /// Web API key, appended as `?key=` when no access token is set
    pub api_key: Option<String>,
    /// OAuth bearer token for a service identity (`owner` on the emulator)
    pub access_token: Option<String>,
    /// Request timeout in milliseconds
    pub request_timeout_ms: u64,
    /// Maximum attempts for transient failures
    pub max_retries: u32,
}

impl Default for FirestoreConfig {
    fn default() -> Self {
        Self {
            project_id: "bloodnet".to_string(),
            database_id: "(default)".to_string(),
            endpoint: "https://firestore.googleapis.com".to_string(),
            api_key: None,
            access_token: None,
            request_timeout_ms: 5000,
            max_retries: 3,
        }
    }
}

impl FirestoreConfig {
    /// Settings for the local Firestore emulator (`host:port`)
    pub fn emulator(host: &str, project_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            endpoint: format!("http://{}", host.trim_end_matches('/')),
            access_token: Some("owner".to_string()),
            ..Default::default()
        }
    }
}

/// Document store backed by the Firestore REST API
pub struct FirestoreStore {
    client: Client,
    config: FirestoreConfig,
}

impl FirestoreStore {
    pub fn new(config: FirestoreConfig) -> Result<Self, BackendError> {
        if config.project_id.trim().is_empty() {
            return Err(BackendError::Config("firestore project id is empty".to_string()));
        }

        let client = Client::builder()
            .timeout(std::time::Duration::from_millis(config.request_timeout_ms))
            .build()
            .map_err(|e| BackendError::Config(format!("http client: {e}")))?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &FirestoreConfig {
        &self.config
    }

    /// `projects/{project}/databases/{database}`
    fn database_path(&self) -> String {
        format!(
            "projects/{}/databases/{}",
            self.config.project_id, self.config.database_id
        )
    }

    /// Full resource name of a document
    fn document_name(&self, collection: &str, id: &str) -> String {
        format!("{}/documents/{}/{}", self.database_path(), collection, id)
    }

    /// URL for a document, with the id segment percent-encoded
    fn document_url(&self, collection: &str, id: &str) -> String {
        format!(
            "{}/v1/{}/documents/{}/{}",
            self.config.endpoint,
            self.database_path(),
            collection,
            urlencoding::encode(id)
        )
    }

    /// URL for a database-level RPC such as `:commit` or `:runQuery`
    fn rpc_url(&self, method: &str) -> String {
        format!(
            "{}/v1/{}/documents:{}",
            self.config.endpoint,
            self.database_path(),
            method
        )
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        match (&self.config.access_token, &self.config.api_key) {
            (Some(token), _) => builder.bearer_auth(token),
            (None, Some(key)) => builder.query(&[("key", key)]),
            (None, None) => builder,
        }
    }

    /// Send a request, retrying transient failures with backoff
    ///
    /// Calls with [`Replay::Never`] are only repeated when the server
    /// rejected them outright.
    async fn send<F>(&self, replay: Replay, make: F) -> Result<Response, BackendError>
    where
        F: Fn() -> RequestBuilder,
    {
        let attempts = self.config.max_retries.max(1);
        let mut attempt = 0;

        loop {
            let error = match self.authorize(make()).send().await {
                Ok(response) if response.status() == StatusCode::TOO_MANY_REQUESTS => {
                    BackendError::RateLimited
                }
                Ok(response) if response.status() == StatusCode::SERVICE_UNAVAILABLE => {
                    BackendError::Unavailable
                }
                Ok(response) => return Ok(response),
                Err(e) => BackendError::from_transport(e),
            };

            attempt += 1;
            if attempt >= attempts || !should_retry(&error, replay) {
                return Err(error);
            }

            tracing::debug!(attempt, error = %error, "Firestore request failed, retrying");
            // 1s, 4s, 9s...
            let delay = std::time::Duration::from_secs(u64::from(attempt).pow(2));
            tokio::time::sleep(delay).await;
        }
    }

    async fn error_from(response: Response) -> BackendError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        classify_error(status, &body)
    }

    async fn get_document(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<Option<FirestoreDocument>, BackendError> {
        let url = self.document_url(collection, id);
        let response = self.send(Replay::Safe, || self.client.get(&url)).await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(Self::error_from(response).await);
        }

        let doc: FirestoreDocument = response.json().await.map_err(BackendError::Request)?;
        Ok(Some(doc))
    }

    /// Apply writes atomically through `documents:commit`
    async fn commit(&self, writes: Vec<Value>) -> Result<(), BackendError> {
        let url = self.rpc_url("commit");
        let body = json!({ "writes": writes });
        let response = self
            .send(Replay::Never, || self.client.post(&url).json(&body))
            .await?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(Self::error_from(response).await)
        }
    }

    async fn run_query(
        &self,
        structured_query: Value,
    ) -> Result<Vec<FirestoreDocument>, BackendError> {
        let url = self.rpc_url("runQuery");
        let body = json!({ "structuredQuery": structured_query });
        let response = self
            .send(Replay::Safe, || self.client.post(&url).json(&body))
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_from(response).await);
        }

        // One element per result; an empty result still carries a readTime
        let rows: Vec<RunQueryRow> = response.json().await.map_err(BackendError::Request)?;
        Ok(rows.into_iter().filter_map(|row| row.document).collect())
    }

    fn decode_request(doc: &FirestoreDocument) -> Result<BloodRequest, BackendError> {
        let plain = doc.to_json_with_id()?;
        let request: BloodRequest = serde_json::from_value(plain)
            .map_err(|e| BackendError::Decode(format!("request {}: {}", doc.id(), e)))?;
        Ok(request)
    }

    /// Decode query results, skipping documents that do not decode
    fn decode_requests(docs: &[FirestoreDocument]) -> Vec<BloodRequest> {
        docs.iter()
            .filter_map(|doc| match Self::decode_request(doc) {
                Ok(request) => Some(request),
                // Loosely-typed collection
                Err(e) => {
                    tracing::warn!(document = %doc.name, error = %e, "Skipping request");
                    None
                }
            })
            .collect()
    }

    /// Claim write, applied only while the request is at `expected_version`
    fn donation_write(&self, id: &str, claim: &DonationClaim, expected_version: &str) -> Value {
        let plain = json!({
            "status": RequestStatus::Donated.as_str(),
            "donorEmail": claim.donor_email,
            "donorId": claim.donor_id,
            "donorName": claim.donor_name,
        });

        json!({
            "update": {
                "name": self.document_name(REQUESTS_COLLECTION, id),
                "fields": encode_fields(&into_object(plain), &[]),
            },
            "updateMask": { "fieldPaths": ["status", "donorEmail", "donorId", "donorName"] },
            "updateTransforms": [
                { "fieldPath": "donationTimestamp", "setToServerValue": "REQUEST_TIME" }
            ],
            "currentDocument": { "updateTime": expected_version },
        })
    }

    /// Undo write, applied only while the request is at `expected_version`
    fn undo_write(&self, id: &str, expected_version: &str) -> Value {
        let plain = json!({ "status": RequestStatus::Active.as_str() });

        // Masked fields absent from `fields` are deleted
        let mut mask = vec!["status"];
        mask.extend_from_slice(DONATION_FIELDS);

        json!({
            "update": {
                "name": self.document_name(REQUESTS_COLLECTION, id),
                "fields": encode_fields(&into_object(plain), &[]),
            },
            "updateMask": { "fieldPaths": mask },
            "currentDocument": { "updateTime": expected_version },
        })
    }

    async fn fetch_request(&self, id: &str) -> Result<BloodRequest, BackendError> {
        self.get_document(REQUESTS_COLLECTION, id)
            .await?
            .ok_or_else(|| BackendError::NotFound(format!("request {id}")))
            .and_then(|doc| Self::decode_request(&doc))
    }
}

/// Plain JSON object for a record, without the synthetic `id`
fn to_object<T: serde::Serialize>(record: &T) -> Result<Map<String, Value>, BackendError> {
    match serde_json::to_value(record)? {
        Value::Object(mut map) => {
            map.remove("id");
            Ok(map)
        }
        other => Err(BackendError::Decode(format!("expected object, got {other}"))),
    }
}

fn into_object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

#[async_trait]
impl DocumentStore for FirestoreStore {
    fn name(&self) -> &str {
        "firestore"
    }

    async fn health_check(&self) -> Result<(), BackendError> {
        let url = format!(
            "{}/v1/{}/documents/{}",
            self.config.endpoint,
            self.database_path(),
            REQUESTS_COLLECTION
        );
        let response = self
            .send(Replay::Safe, || {
                self.client.get(&url).query(&[("pageSize", "1")])
            })
            .await?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(Self::error_from(response).await)
        }
    }

    async fn create_request(&self, request: NewRequest) -> Result<BloodRequest, BackendError> {
        let id = uuid::Uuid::new_v4().simple().to_string();
        let record = request.into_request(id.clone(), None);
        let fields = encode_fields(
            &to_object(&RequestDocument::from(record))?,
            REQUEST_TIMESTAMP_FIELDS,
        );

        let write = json!({
            "update": {
                "name": self.document_name(REQUESTS_COLLECTION, &id),
                "fields": fields,
            },
            "updateTransforms": [
                { "fieldPath": "createdAt", "setToServerValue": "REQUEST_TIME" }
            ],
            "currentDocument": { "exists": false },
        });
        self.commit(vec![write]).await?;

        tracing::info!(request_id = %id, "Created request");
        self.fetch_request(&id).await
    }

    async fn get_request(&self, id: &str) -> Result<Option<VersionedRequest>, BackendError> {
        let Some(doc) = self.get_document(REQUESTS_COLLECTION, id).await? else {
            return Ok(None);
        };

        let request = Self::decode_request(&doc)?;
        let version = doc
            .update_time
            .clone()
            .ok_or_else(|| BackendError::Decode(format!("request {id} has no updateTime")))?;

        Ok(Some(VersionedRequest { request, version }))
    }

    async fn list_requests(&self) -> Result<Vec<BloodRequest>, BackendError> {
        let query = json!({
            "from": [{ "collectionId": REQUESTS_COLLECTION }],
            "orderBy": [{
                "field": { "fieldPath": "createdAt" },
                "direction": "DESCENDING",
            }],
        });

        let docs = self.run_query(query).await?;
        Ok(Self::decode_requests(&docs))
    }

    async fn list_donations(&self, donor_id: &str) -> Result<Vec<BloodRequest>, BackendError> {
        let query = json!({
            "from": [{ "collectionId": REQUESTS_COLLECTION }],
            "where": {
                "fieldFilter": {
                    "field": { "fieldPath": "donorId" },
                    "op": "EQUAL",
                    "value": { "stringValue": donor_id },
                }
            },
        });

        let docs = self.run_query(query).await?;
        Ok(Self::decode_requests(&docs))
    }

    async fn record_donation(
        &self,
        id: &str,
        claim: &DonationClaim,
        expected_version: &str,
    ) -> Result<BloodRequest, BackendError> {
        self.commit(vec![self.donation_write(id, claim, expected_version)]).await?;

        tracing::info!(request_id = %id, donor_id = %claim.donor_id, "Recorded donation");
        self.fetch_request(id).await
    }

    async fn clear_donation(
        &self,
        id: &str,
        expected_version: &str,
    ) -> Result<BloodRequest, BackendError> {
        self.commit(vec![self.undo_write(id, expected_version)]).await?;

        tracing::info!(request_id = %id, "Cleared donation");
        self.fetch_request(id).await
    }

    async fn get_profile(&self, uid: &str) -> Result<Option<DonorProfile>, BackendError> {
        let Some(doc) = self.get_document(USERS_COLLECTION, uid).await? else {
            return Ok(None);
        };

        let mut plain = doc.to_json_with_id()?;
        if let Value::Object(map) = &mut plain {
            map.remove("id");
            map.entry("uid").or_insert_with(|| Value::String(uid.to_string()));
        }

        let profile = serde_json::from_value(plain)
            .map_err(|e| BackendError::Decode(format!("profile {uid}: {e}")))?;
        Ok(Some(profile))
    }

    async fn put_profile(&self, profile: &DonorProfile) -> Result<(), BackendError> {
        let url = self.document_url(USERS_COLLECTION, &profile.uid);
        let body = json!({ "fields": encode_fields(&to_object(profile)?, &[]) });
        let response = self
            .send(Replay::Safe, || self.client.patch(&url).json(&body))
            .await?;

        if response.status().is_success() {
            tracing::debug!(uid = %profile.uid, "Saved profile");
            Ok(())
        } else {
            Err(Self::error_from(response).await)
        }
    }
}

// ============================================
// REST DTOs
// ============================================

#[derive(Debug, Deserialize)]
struct RunQueryRow {
    #[serde(default)]
    document: Option<FirestoreDocument>,
}

#[derive(Debug, Deserialize)]
struct GoogleErrorBody {
    error: GoogleError,
}

#[derive(Debug, Deserialize)]
struct GoogleError {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> FirestoreStore {
        FirestoreStore::new(FirestoreConfig {
            project_id: "demo-bloodnet".to_string(),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_default_config() {
        let config = FirestoreConfig::default();
        assert_eq!(config.database_id, "(default)");
        assert_eq!(config.endpoint, "https://firestore.googleapis.com");
        assert_eq!(config.max_retries, 3);
    }

    #[test]
    fn test_emulator_config() {
        let config = FirestoreConfig::emulator("localhost:8080/", "demo");
        assert_eq!(config.endpoint, "http://localhost:8080");
        assert_eq!(config.access_token.as_deref(), Some("owner"));
    }

    #[test]
    fn test_resource_paths() {
        let store = store();
        assert_eq!(
            store.document_name("requests", "abc"),
            "projects/demo-bloodnet/databases/(default)/documents/requests/abc"
        );
        assert_eq!(
            store.rpc_url("runQuery"),
            "https://firestore.googleapis.com/v1/projects/demo-bloodnet/databases/(default)/documents:runQuery"
        );
        assert!(store.document_url("users", "a b").ends_with("/documents/users/a%20b"));
    }

    #[test]
    fn test_empty_project_rejected() {
        let result = FirestoreStore::new(FirestoreConfig {
            project_id: " ".to_string(),
            ..Default::default()
        });
        assert!(matches!(result, Err(BackendError::Config(_))));
    }

    #[test]
    fn test_request_fields_omit_id_and_encode_types() {
        let record = NewRequest {
            patient_name: "Asha".to_string(),
            hospital: "General".to_string(),
            hospital_address: None,
            location: None,
            blood_type: crate::model::BloodType::APositive,
            units: 2,
            urgency: crate::model::Urgency::Medium,
        }
        .into_request("abc".to_string(), None);

        let object = to_object(&RequestDocument::from(record)).unwrap();
        assert!(!object.contains_key("id"));

        let fields = encode_fields(&object, REQUEST_TIMESTAMP_FIELDS);
        assert_eq!(fields["units"], json!({ "integerValue": "2" }));
        assert_eq!(fields["bloodType"], json!({ "stringValue": "A+" }));
        assert_eq!(fields["status"], json!({ "stringValue": "Active" }));
    }

    #[test]
    fn test_decode_request_document() {
        let doc: FirestoreDocument = serde_json::from_value(json!({
            "name": "projects/p/databases/(default)/documents/requests/r1",
            "fields": {
                "patientName": { "stringValue": "Asha" },
                "hospital": { "stringValue": "General" },
                "bloodType": { "stringValue": "O-" },
                "units": { "integerValue": "4" },
                "urgency": { "stringValue": "High" },
                "status": { "stringValue": "Donated" },
                "createdAt": { "timestampValue": "2024-05-01T10:00:00.123Z" },
                "donorEmail": { "stringValue": "d@x.org" },
                "donorId": { "stringValue": "u1" },
                "donorName": { "stringValue": "Dev" },
                "donationTimestamp": { "timestampValue": "2024-05-02T08:00:00Z" },
            },
            "updateTime": "2024-05-02T08:00:00.000001Z",
        }))
        .unwrap();

        let request = FirestoreStore::decode_request(&doc).unwrap();
        assert_eq!(request.id, "r1");
        assert_eq!(request.units, 4);
        assert!(request.created_at.is_some());
        let donation = request.donation.unwrap();
        assert_eq!(donation.donor_name, "Dev");
        assert!(donation.donation_timestamp.is_some());
    }

    #[test]
    fn test_error_mapping() {
        let precondition = r#"{"error":{"code":400,"message":"the stored version does not match","status":"FAILED_PRECONDITION"}}"#;
        assert!(matches!(
            classify_error(StatusCode::BAD_REQUEST, precondition),
            BackendError::Conflict(msg) if msg.contains("version")
        ));

        let exists = r#"{"error":{"code":409,"message":"Document already exists","status":"ALREADY_EXISTS"}}"#;
        assert!(matches!(
            classify_error(StatusCode::CONFLICT, exists),
            BackendError::Conflict(_)
        ));

        let aborted = r#"{"error":{"code":409,"message":"Too much contention","status":"ABORTED"}}"#;
        assert!(matches!(
            classify_error(StatusCode::CONFLICT, aborted),
            BackendError::Conflict(_)
        ));

        assert!(matches!(
            classify_error(StatusCode::NOT_FOUND, "no json here"),
            BackendError::NotFound(msg) if msg == "no json here"
        ));
        assert!(matches!(
            classify_error(StatusCode::TOO_MANY_REQUESTS, ""),
            BackendError::RateLimited
        ));

        let denied = r#"{"error":{"code":403,"message":"Missing or insufficient permissions.","status":"PERMISSION_DENIED"}}"#;
        assert!(matches!(
            classify_error(StatusCode::FORBIDDEN, denied),
            BackendError::Api { status: 403, .. }
        ));
    }

    #[test]
    fn test_commits_are_not_replayed_after_timeouts() {
        assert!(should_retry(&BackendError::Timeout, Replay::Safe));
        assert!(should_retry(&BackendError::Unavailable, Replay::Safe));
        assert!(!should_retry(&BackendError::Timeout, Replay::Never));
        assert!(!should_retry(&BackendError::Unavailable, Replay::Never));

        assert!(should_retry(&BackendError::RateLimited, Replay::Never));
        assert!(!should_retry(&BackendError::Conflict("x".into()), Replay::Safe));
    }

    #[test]
    fn test_claim_and_undo_writes_carry_version_precondition() {
        let store = store();
        let claim = DonationClaim {
            donor_email: "d@x.org".to_string(),
            donor_id: "u1".to_string(),
            donor_name: "Dev".to_string(),
        };
        let version = "2024-05-02T08:00:00.000001Z";

        let donate = store.donation_write("r1", &claim, version);
        assert_eq!(donate["currentDocument"], json!({ "updateTime": version }));
        assert_eq!(donate["update"]["fields"]["donorId"], json!({ "stringValue": "u1" }));

        let undo = store.undo_write("r1", version);
        assert_eq!(undo["currentDocument"], json!({ "updateTime": version }));
        assert_eq!(undo["update"]["fields"]["status"], json!({ "stringValue": "Active" }));
        let mask = undo["updateMask"]["fieldPaths"].as_array().unwrap();
        assert!(mask.contains(&json!("donorId")));
        assert!(undo["update"]["fields"].get("donorId").is_none());
    }

    #[test]
    fn test_undecodable_documents_are_skipped() {
        let docs: Vec<FirestoreDocument> = serde_json::from_value(json!([
            {
                "name": "projects/p/databases/(default)/documents/requests/good",
                "fields": {
                    "patientName": { "stringValue": "Asha" },
                    "hospital": { "stringValue": "General" },
                    "bloodType": { "stringValue": "A+" },
                    "units": { "integerValue": "1" },
                    "urgency": { "stringValue": "Low" },
                    "status": { "stringValue": "Active" },
                },
            },
            {
                "name": "projects/p/databases/(default)/documents/requests/bad",
                "fields": {
                    "bloodType": { "stringValue": "Z" },
                },
            },
        ]))
        .unwrap();

        let requests = FirestoreStore::decode_requests(&docs);
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].id, "good");
    }
}
