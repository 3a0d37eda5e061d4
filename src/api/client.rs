use crate::api::cache::ResponseCache;
use crate::api::shapes::{
    AccountLogin, AccountProfile, AccountRegistered, AddPlaceResponse, ApiMessage, AuthCheck,
    CreateGroupResponse, CsvUploadResponse, DensityReport, ErrorBody, ExportPayload, GroupDetails,
    GroupSummary, GroupsResponse, HealthStatus, ImportSummary, PermissionReport, PlaceDraft,
    PlacePage, PlaceStatus, PlacesPayload, RoleLogin, StateAnalytics, Stats,
};
use crate::api::{ExportFormat, PlacesApi, SearchParams, SearchQuery};
use crate::core::config::ApiConfig;
use crate::core::geo::LatLng;
use crate::core::place::{ListKind, PlaceId};
use crate::session::store::{CredentialSlot, CredentialStore};
use crate::Result;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// Shared async HTTP client reused by every `HttpApi` instance
pub(crate) static HTTP_CLIENT: Lazy<reqwest::Client> = Lazy::new(|| {
    reqwest::Client::builder()
        .user_agent("placelet/0.1.0")
        .timeout(std::time::Duration::from_secs(30))
        .tcp_keepalive(std::time::Duration::from_secs(30))
        .pool_idle_timeout(std::time::Duration::from_secs(90))
        .pool_max_idle_per_host(16)
        .build()
        .expect("failed to build reqwest async client")
});

/// Production [`PlacesApi`] implementation over HTTP.
///
/// Tokens are read from the shared [`CredentialStore`] on every request:
/// account endpoints (`/api/...`) get the account token, everything else
/// gets the role token. Both the `Authorization: Bearer` and
/// `X-Auth-Token` headers are sent because the backend checks either.
pub struct HttpApi {
    base_url: String,
    request_timeout: Duration,
    credentials: Arc<dyn CredentialStore>,
    cache: ResponseCache,
}

impl HttpApi {
    pub fn new(config: &ApiConfig, credentials: Arc<dyn CredentialStore>) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            request_timeout: config.request_timeout,
            credentials,
            cache: ResponseCache::new(config.cache_capacity, config.cache_ttl),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Which credential slot a path authenticates against
    fn slot_for(path: &str) -> CredentialSlot {
        if path.starts_with("/api/") {
            CredentialSlot::Account
        } else {
            CredentialSlot::Role
        }
    }

    fn authorize(&self, path: &str, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.credentials.get(Self::slot_for(path)) {
            Some(token) => request
                .bearer_auth(&token)
                .header("X-Auth-Token", token),
            None => request,
        }
    }

    /// Sends the request and turns any non-2xx response into
    /// [`crate::Error::Api`], pulling the message out of the body's
    /// `error`/`message` field when one is decodable.
    async fn execute(
        &self,
        path: &str,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response> {
        log::debug!("request: {path}");
        let response = self
            .authorize(path, request)
            .timeout(self.request_timeout)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let code = status.as_u16();
        let reason = status.canonical_reason().unwrap_or("request failed");
        let body = response.text().await.unwrap_or_default();
        let error = api_error(code, reason, &body);
        log::debug!("request failed: {path} -> {error}");
        Err(error)
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        let text = response.text().await?;
        Ok(serde_json::from_str(&text)?)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let request = HTTP_CLIENT.get(self.url(path)).query(query);
        let response = self.execute(path, request).await?;
        Self::decode(response).await
    }

    /// GET with the response cache in front
    async fn get_json_cached<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let key = cache_key(path, query);
        if let Some(value) = self.cache.get(&key) {
            log::debug!("response cache hit: {key}");
            return Ok(serde_json::from_value((*value).clone())?);
        }
        let value: Value = self.get_json(path, query).await?;
        self.cache.store(key, value.clone());
        Ok(serde_json::from_value(value)?)
    }

    async fn post_json<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &(impl Serialize + Sync),
    ) -> Result<T> {
        let request = HTTP_CLIENT.post(self.url(path)).json(body);
        let response = self.execute(path, request).await?;
        Self::decode(response).await
    }

    async fn delete(&self, path: &str) -> Result<ApiMessage> {
        let request = HTTP_CLIENT.delete(self.url(path));
        let response = self.execute(path, request).await?;
        Self::decode(response).await
    }
}

/// Builds the [`crate::Error::Api`] for a failed response, preferring
/// the body's `error`/`message` text over the status line
fn api_error(code: u16, reason: &str, body: &str) -> crate::Error {
    let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();
    let message = parsed.text().unwrap_or_else(|| reason.to_string());
    crate::Error::api(code, message)
}

fn cache_key(path: &str, query: &[(&str, String)]) -> String {
    if query.is_empty() {
        return path.to_string();
    }
    let pairs = query
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");
    format!("{path}?{pairs}")
}

#[async_trait]
impl PlacesApi for HttpApi {
    async fn health(&self) -> Result<HealthStatus> {
        self.get_json("/health", &[]).await
    }

    async fn check_role_auth(&self) -> Result<AuthCheck> {
        self.get_json("/auth/check", &[]).await
    }

    async fn login_role(&self, username: &str, password: &str) -> Result<RoleLogin> {
        let body = serde_json::json!({ "username": username, "password": password });
        self.post_json("/auth/login", &body).await
    }

    async fn logout_role(&self) -> Result<()> {
        let _: ApiMessage = self.post_json("/auth/logout", &serde_json::json!({})).await?;
        Ok(())
    }

    async fn permissions(&self) -> Result<PermissionReport> {
        self.get_json("/security/permissions", &[]).await
    }

    async fn search(&self, query: &SearchQuery, params: &SearchParams) -> Result<PlacePage> {
        query.validate()?;

        let mut pairs: Vec<(&str, String)> = Vec::new();
        let path = match query {
            SearchQuery::Radius { center, km } => {
                pairs.push(("lat", center.lat.to_string()));
                pairs.push(("lon", center.lng.to_string()));
                pairs.push(("km", km.to_string()));
                "/within_radius"
            }
            SearchQuery::Nearest { center, k } => {
                pairs.push(("lat", center.lat.to_string()));
                pairs.push(("lon", center.lng.to_string()));
                pairs.push(("k", k.to_string()));
                "/nearest"
            }
            SearchQuery::BoundingBox { bounds } => {
                pairs.push(("min_lat", bounds.south_west.lat.to_string()));
                pairs.push(("min_lon", bounds.south_west.lng.to_string()));
                pairs.push(("max_lat", bounds.north_east.lat.to_string()));
                pairs.push(("max_lon", bounds.north_east.lng.to_string()));
                "/within_bbox"
            }
        };
        pairs.extend(params.query_pairs());

        let payload: PlacesPayload = self.get_json(path, &pairs).await?;
        Ok(payload.into_page())
    }

    async fn stats(&self) -> Result<Stats> {
        self.get_json_cached("/stats", &[]).await
    }

    async fn state_analytics(&self) -> Result<StateAnalytics> {
        self.get_json_cached("/analytics/states", &[]).await
    }

    async fn density(
        &self,
        center: LatLng,
        radius_km: Option<f64>,
    ) -> Result<DensityReport> {
        if !center.is_valid() {
            return Err(crate::Error::InvalidCoordinates(format!(
                "lat {}, lon {}",
                center.lat, center.lng
            )));
        }
        let mut pairs = vec![
            ("lat", center.lat.to_string()),
            ("lon", center.lng.to_string()),
        ];
        if let Some(radius) = radius_km {
            pairs.push(("radius", radius.to_string()));
        }
        self.get_json_cached("/analytics/density", &pairs).await
    }

    async fn export(&self, format: ExportFormat, params: &SearchParams) -> Result<ExportPayload> {
        let path = format.path();
        let pairs = params.query_pairs();
        let request = HTTP_CLIENT.get(self.url(path)).query(&pairs);
        let response = self.execute(path, request).await?;

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("application/octet-stream")
            .to_string();
        let bytes = response.bytes().await?.to_vec();
        Ok(ExportPayload {
            content_type,
            bytes,
        })
    }

    async fn add_place(&self, draft: &PlaceDraft) -> Result<AddPlaceResponse> {
        draft.validate()?;
        let response: AddPlaceResponse = self.post_json("/places/add", draft).await?;
        self.cache.invalidate_all();
        Ok(response)
    }

    async fn upload_csv(&self, file_name: &str, bytes: Vec<u8>) -> Result<ImportSummary> {
        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str("text/csv")?;
        let form = reqwest::multipart::Form::new().part("file", part);

        let path = "/places/upload-csv";
        let request = HTTP_CLIENT.post(self.url(path)).multipart(form);
        let response = self.execute(path, request).await?;
        let upload: CsvUploadResponse = Self::decode(response).await?;
        self.cache.invalidate_all();
        Ok(upload.into_summary())
    }

    async fn register_account(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<AccountRegistered> {
        let body = serde_json::json!({
            "username": username,
            "email": email,
            "password": password,
        });
        self.post_json("/api/users/register", &body).await
    }

    async fn login_account(&self, username: &str, password: &str) -> Result<AccountLogin> {
        let body = serde_json::json!({ "username": username, "password": password });
        self.post_json("/api/users/login", &body).await
    }

    async fn profile(&self) -> Result<AccountProfile> {
        self.get_json("/api/users/profile", &[]).await
    }

    async fn personal_list(
        &self,
        kind: ListKind,
        reference: Option<LatLng>,
    ) -> Result<PlacePage> {
        let mut pairs: Vec<(&str, String)> = Vec::new();
        if let Some(reference) = reference {
            if !reference.is_valid() {
                return Err(crate::Error::InvalidCoordinates(format!(
                    "lat {}, lon {}",
                    reference.lat, reference.lng
                )));
            }
            pairs.push(("lat", reference.lat.to_string()));
            pairs.push(("lon", reference.lng.to_string()));
        }
        let path = format!("/api/user/{}", kind.as_str());
        let payload: PlacesPayload = self.get_json(&path, &pairs).await?;
        Ok(payload.into_page())
    }

    async fn add_to_list(
        &self,
        kind: ListKind,
        place_id: PlaceId,
        notes: Option<&str>,
    ) -> Result<()> {
        let mut body = serde_json::json!({ "place_id": place_id });
        if let Some(notes) = notes {
            body["notes"] = Value::from(notes);
        }
        let path = format!("/api/user/{}", kind.as_str());
        let _: ApiMessage = self.post_json(&path, &body).await?;
        Ok(())
    }

    async fn remove_from_list(&self, kind: ListKind, place_id: PlaceId) -> Result<()> {
        let path = format!("/api/user/{}/{}", kind.as_str(), place_id);
        let _ = self.delete(&path).await?;
        Ok(())
    }

    async fn place_status(&self, place_id: PlaceId) -> Result<PlaceStatus> {
        let path = format!("/api/user/place-status/{place_id}");
        self.get_json(&path, &[]).await
    }

    async fn create_group(&self, name: &str, description: &str) -> Result<GroupSummary> {
        let body = serde_json::json!({ "name": name, "description": description });
        let response: CreateGroupResponse = self.post_json("/api/groups", &body).await?;
        Ok(response.group)
    }

    async fn my_groups(&self) -> Result<Vec<GroupSummary>> {
        let response: GroupsResponse = self.get_json("/api/groups", &[]).await?;
        Ok(response.groups)
    }

    async fn group_details(&self, group_id: i64) -> Result<GroupDetails> {
        let path = format!("/api/groups/{group_id}");
        self.get_json(&path, &[]).await
    }

    async fn add_group_member(&self, group_id: i64, username: &str) -> Result<()> {
        let path = format!("/api/groups/{group_id}/members");
        let body = serde_json::json!({ "username": username });
        let _: ApiMessage = self.post_json(&path, &body).await?;
        Ok(())
    }

    async fn remove_group_member(&self, group_id: i64, member_id: i64) -> Result<()> {
        let path = format!("/api/groups/{group_id}/members/{member_id}");
        let _ = self.delete(&path).await?;
        Ok(())
    }

    async fn group_places(&self, group_id: i64) -> Result<PlacePage> {
        let path = format!("/api/groups/{group_id}/places");
        let payload: PlacesPayload = self.get_json(&path, &[]).await?;
        Ok(payload.into_page())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::store::MemoryCredentialStore;

    fn api() -> HttpApi {
        HttpApi::new(
            &ApiConfig::default(),
            Arc::new(MemoryCredentialStore::new()),
        )
    }

    #[test]
    fn test_url_building_strips_trailing_slash() {
        let config = ApiConfig {
            base_url: "http://localhost:8001/".to_string(),
            ..ApiConfig::default()
        };
        let api = HttpApi::new(&config, Arc::new(MemoryCredentialStore::new()));
        assert_eq!(api.url("/stats"), "http://localhost:8001/stats");
    }

    #[test]
    fn test_slot_selection_by_endpoint_family() {
        assert_eq!(
            HttpApi::slot_for("/api/users/profile"),
            CredentialSlot::Account
        );
        assert_eq!(HttpApi::slot_for("/api/user/visited"), CredentialSlot::Account);
        assert_eq!(HttpApi::slot_for("/auth/check"), CredentialSlot::Role);
        assert_eq!(HttpApi::slot_for("/within_radius"), CredentialSlot::Role);
        assert_eq!(HttpApi::slot_for("/places/add"), CredentialSlot::Role);
    }

    #[test]
    fn test_cache_key_format() {
        assert_eq!(cache_key("/stats", &[]), "/stats");
        assert_eq!(
            cache_key(
                "/analytics/density",
                &[("lat", "40".to_string()), ("lon", "-74".to_string())]
            ),
            "/analytics/density?lat=40&lon=-74"
        );
    }

    #[test]
    fn test_api_error_carries_server_body_text() {
        let error = api_error(400, "Bad Request", r#"{"error": "km must be between 0.1 and 1000"}"#);
        match &error {
            crate::Error::Api { status, message } => {
                assert_eq!(*status, 400);
                assert_eq!(message, "km must be between 0.1 and 1000");
            }
            other => panic!("unexpected error: {other:?}"),
        }

        // `error` wins over `message` when both are present
        let error = api_error(500, "Internal Server Error", r#"{"error": "a", "message": "b"}"#);
        assert_eq!(error.user_message(), "a");

        // `message` is the fallback field
        let error = api_error(409, "Conflict", r#"{"message": "place already exists"}"#);
        assert_eq!(error.user_message(), "place already exists");
    }

    #[test]
    fn test_api_error_falls_back_to_status_reason() {
        let error = api_error(502, "Bad Gateway", "<html>upstream died</html>");
        assert_eq!(error.user_message(), "Bad Gateway");
        assert_eq!(error.status(), Some(502));

        // 401/403 keep their fixed user-facing phrasings regardless of body
        let error = api_error(401, "Unauthorized", r#"{"error": "token expired"}"#);
        assert!(error.is_unauthorized());
        assert_eq!(error.user_message(), "Please log in to continue.");
    }

    #[test]
    fn test_default_config_produces_api() {
        // Constructor should not touch the network
        let api = api();
        assert_eq!(api.base_url, "http://localhost:8001");
    }
}
