pub mod http_auth_driven_ports;
pub mod http_country_log_driven_ports;
pub mod http_expense_driven_ports;
pub mod http_meeting_driven_ports;
pub mod http_notification_driven_ports;
pub mod http_task_driven_ports;

use crate::app_env::ClientConfig;
use crate::domain::DrivenPortError;
use crate::domain::filters::{MonthFilter, PageQuery};
use crate::domain::session::driven_ports::SessionRefresher;
use crate::domain::session::{RefreshCoordinator, SessionError};
use crate::dto::envelope::{SuccessEnvelope, failure_message};
use crate::external_connections::{ApiRequest, ApiResponse, HttpTransport};
use anyhow::{Context, anyhow};
use reqwest::header::CONTENT_TYPE;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_tracing::TracingMiddleware;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

/// Failure talking to the backend
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("the server answered {status}: {message}")]
    Api { status: u16, message: String },
    #[error("the session expired: {0}")]
    SessionExpired(String),
    #[error("could not reach the server: {0:#}")]
    Transport(anyhow::Error),
    #[error("could not encode the request body: {0:#}")]
    Encode(anyhow::Error),
    #[error("could not read the server's response: {0:#}")]
    Decode(anyhow::Error),
}

impl From<ClientError> for DrivenPortError {
    fn from(value: ClientError) -> Self {
        match value {
            ClientError::Api { status: 404, .. } => DrivenPortError::DoesNotExist,
            ClientError::Api { status, message } => DrivenPortError::Rejected { status, message },
            ClientError::SessionExpired(reason) => DrivenPortError::SessionExpired(reason),
            ClientError::Transport(err) | ClientError::Encode(err) | ClientError::Decode(err) => {
                DrivenPortError::CommsFailure(err)
            }
        }
    }
}

impl From<SessionError> for ClientError {
    fn from(value: SessionError) -> Self {
        ClientError::SessionExpired(value.to_string())
    }
}

/// [HttpTransport] over reqwest. Keeps a cookie store so the session cookies set by login and
/// refresh ride along on every later request, and traces every outgoing call.
#[derive(Clone)]
pub struct ReqwestTransport {
    http_client: ClientWithMiddleware,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self, anyhow::Error> {
        let base_client = reqwest::Client::builder()
            .use_rustls_tls()
            .cookie_store(true)
            .build()
            .context("building the HTTP client")?;
        let http_client = ClientBuilder::new(base_client)
            .with(TracingMiddleware::default())
            .build();

        Ok(ReqwestTransport { http_client })
    }
}

impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, anyhow::Error> {
        let mut builder = self
            .http_client
            .request(request.method.clone(), request.url.clone());
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder
                .header(CONTENT_TYPE, "application/json")
                .body(serde_json::to_vec(body).context("serializing request body")?);
        }

        let response = builder
            .send()
            .await
            .with_context(|| format!("sending {} {}", request.method, request.url))?;
        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .context("reading response body")?
            .to_vec();

        Ok(ApiResponse { status, body })
    }
}

/// Client for the productivity backend. Every request goes through one place that renews the
/// session when it expires and replays the request once afterwards.
pub struct ApiClient<T: HttpTransport> {
    transport: T,
    api_base_url: Url,
    notification_api_url: Url,
    session: RefreshCoordinator,
}

impl ApiClient<ReqwestTransport> {
    pub fn from_config(config: &ClientConfig) -> Result<Self, anyhow::Error> {
        Ok(Self::new(
            ReqwestTransport::new()?,
            config.api_base_url.clone(),
            config.notification_api_url.clone(),
        ))
    }
}

impl<T: HttpTransport> ApiClient<T> {
    pub fn new(transport: T, api_base_url: Url, notification_api_url: Url) -> Self {
        ApiClient {
            transport,
            api_base_url,
            notification_api_url,
            session: RefreshCoordinator::new(),
        }
    }

    pub fn session(&self) -> &RefreshCoordinator {
        &self.session
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Full URL of an API path such as `/task/insert`
    pub(crate) fn endpoint(&self, path: &str) -> Result<Url, ClientError> {
        join_url(&self.api_base_url, path)
    }

    pub(crate) fn notification_endpoint(&self, path: &str) -> Result<Url, ClientError> {
        join_url(&self.notification_api_url, path)
    }

    /// Sends a request, renewing the session and replaying the request once if the server says
    /// the session is no longer valid. Statuses the request accepts come back as is; any other
    /// non-2xx status is an error.
    #[tracing::instrument(skip_all, fields(method = %request.method, url = %request.url))]
    pub async fn send(&self, mut request: ApiRequest) -> Result<ApiResponse, ClientError> {
        loop {
            let seen_generation = self.session.generation();
            let response = self
                .transport
                .send(&request)
                .await
                .map_err(ClientError::Transport)?;

            if response.is_success() || request.accepted.contains(&response.status) {
                return Ok(response);
            }

            if response.is_auth_failure() && request.refresh_on_auth_failure {
                if request.retried {
                    warn!(
                        status = response.status,
                        "Request was rejected again after the session was refreshed"
                    );
                    return Err(api_error(&response));
                }

                self.session.refresh_after(seen_generation, self).await?;
                debug!("Replaying request with the refreshed session");
                request.retried = true;
                continue;
            }

            return Err(api_error(&response));
        }
    }

    /// Sends a request and unwraps the `data` field of the success envelope
    pub async fn call<R: DeserializeOwned>(&self, request: ApiRequest) -> Result<R, ClientError> {
        let response = self.send(request).await?;
        decode_envelope(&response)
    }

    /// Sends a request whose answer is a bare JSON document rather than an envelope
    pub async fn call_bare<R: DeserializeOwned>(&self, request: ApiRequest) -> Result<R, ClientError> {
        let response = self.send(request).await?;
        serde_json::from_slice(&response.body)
            .context("parsing response body")
            .map_err(ClientError::Decode)
    }

    /// Sends a request whose answer is plain text
    pub async fn call_text(&self, request: ApiRequest) -> Result<String, ClientError> {
        let response = self.send(request).await?;
        String::from_utf8(response.body)
            .context("response body is not UTF-8")
            .map_err(ClientError::Decode)
    }
}

impl<T: HttpTransport> SessionRefresher for ApiClient<T> {
    /// Goes straight to the transport. A refresh that fails with an auth error must not start
    /// another refresh.
    async fn refresh_session(&self) -> Result<(), anyhow::Error> {
        let request = ApiRequest::get(self.endpoint("/auth/refresh-token")?).without_refresh();
        let response = self.transport.send(&request).await?;
        if response.is_success() {
            return Ok(());
        }

        Err(anyhow!(
            "the server refused to refresh the session ({}): {}",
            response.status,
            failure_message(response.status, &response.body)
        ))
    }
}

fn join_url(base: &Url, path: &str) -> Result<Url, ClientError> {
    let joined = format!("{}{}", base.as_str().trim_end_matches('/'), path);
    Url::parse(&joined)
        .with_context(|| format!("building URL for {path}"))
        .map_err(ClientError::Transport)
}

/// Query string shared by the `get-by-paging` endpoints: paging, owner, the month when the list
/// is per month, ordering, then the search text
pub(crate) fn page_params(
    paging: &PageQuery,
    user_id: i64,
    month: Option<&MonthFilter>,
) -> Vec<(&'static str, String)> {
    let mut params = paging.paging_params();
    params.push(("userId", user_id.to_string()));
    if let Some(month) = month {
        params.extend(month.params());
    }
    params.push(("sortDir", paging.sort.to_string()));
    if let Some(search) = &paging.search {
        params.push(("q", search.clone()));
    }

    params
}

/// Attaches a JSON body to a request
pub(crate) fn with_body(
    request: ApiRequest,
    body: &impl serde::Serialize,
) -> Result<ApiRequest, ClientError> {
    request
        .with_json(body)
        .map_err(|err| ClientError::Encode(err.into()))
}

fn api_error(response: &ApiResponse) -> ClientError {
    ClientError::Api {
        status: response.status,
        message: failure_message(response.status, &response.body),
    }
}

fn decode_envelope<R: DeserializeOwned>(response: &ApiResponse) -> Result<R, ClientError> {
    let envelope: SuccessEnvelope<R> = serde_json::from_slice(&response.body)
        .context("parsing response envelope")
        .map_err(ClientError::Decode)?;

    Ok(envelope.data)
}
