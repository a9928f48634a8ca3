// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Deploy pipeline - publishes the catalog file to a Netlify site
//!
//! Stages: prepare the JSON document, verify the site, create a deploy
//! carrying the file, then poll the deploy until it is ready, fails, or the
//! wait budget runs out. Nothing is retried. A run can be cancelled from
//! another thread through its [`CancelToken`].

use crate::config::Settings;
use crate::project::CATALOG_FILE;
use crate::types::Wreath;
use base64::Engine as _;
use serde::Deserialize;
use serde_json::{json, Value};
use std::fmt;
use std::sync::mpsc::{self, Receiver};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info, warn};

// =============================================================================
// Transport
// =============================================================================

/// Status and body of an API reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    /// HTTP status code
    pub status: u16,
    /// Response body
    pub body: String,
}

impl ApiResponse {
    /// Reply with a JSON body
    #[must_use]
    pub fn json(status: u16, body: &Value) -> Self {
        Self { status, body: body.to_string() }
    }

    /// 2xx status
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Body parsed as JSON
    #[must_use]
    pub fn parsed(&self) -> Option<Value> {
        serde_json::from_str(&self.body).ok()
    }
}

/// A request that never produced a reply
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The request timed out
    #[error("request timed out")]
    Timeout,
    /// The host could not be reached
    #[error("connection error: {0}")]
    Connect(String),
    /// Any other client failure
    #[error("request failed: {0}")]
    Other(String),
}

/// The deploy API as the pipeline sees it
pub trait SiteApi: Send {
    /// Authenticated GET of `path` (relative to the API root)
    fn get(&self, path: &str) -> Result<ApiResponse, TransportError>;

    /// Authenticated POST of a JSON body to `path`
    fn post_json(&self, path: &str, body: &Value) -> Result<ApiResponse, TransportError>;
}

/// Netlify REST client with bearer-token auth
pub struct NetlifyClient {
    client: reqwest::blocking::Client,
    base_url: String,
    token: String,
}

impl NetlifyClient {
    /// Client for `base_url` with a per-request timeout
    pub fn new(base_url: &str, token: &str, timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!("wreathkeeper/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(classify)?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.trim().to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn finish(response: reqwest::blocking::Response) -> Result<ApiResponse, TransportError> {
        let status = response.status().as_u16();
        let body = response.text().map_err(classify)?;
        Ok(ApiResponse { status, body })
    }
}

impl SiteApi for NetlifyClient {
    fn get(&self, path: &str) -> Result<ApiResponse, TransportError> {
        debug!("GET {}", path);
        let response = self
            .client
            .get(self.url(path))
            .bearer_auth(&self.token)
            .send()
            .map_err(classify)?;
        Self::finish(response)
    }

    fn post_json(&self, path: &str, body: &Value) -> Result<ApiResponse, TransportError> {
        debug!("POST {}", path);
        let response = self
            .client
            .post(self.url(path))
            .bearer_auth(&self.token)
            .json(body)
            .send()
            .map_err(classify)?;
        Self::finish(response)
    }
}

fn classify(e: reqwest::Error) -> TransportError {
    if e.is_timeout() {
        TransportError::Timeout
    } else if e.is_connect() {
        TransportError::Connect(e.to_string())
    } else {
        TransportError::Other(e.to_string())
    }
}

// =============================================================================
// Pipeline types
// =============================================================================

/// Pipeline stages, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployStage {
    /// Serializing the catalog
    Preparing,
    /// Opening the API session
    Connecting,
    /// Checking the site exists and the token works
    VerifyingSite,
    /// Creating the deploy
    Uploading,
    /// Waiting for the deploy to finish
    Polling,
}

impl fmt::Display for DeployStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Preparing => "Preparing catalog",
            Self::Connecting => "Connecting to Netlify",
            Self::VerifyingSite => "Verifying site",
            Self::Uploading => "Uploading catalog",
            Self::Polling => "Waiting for deploy",
        })
    }
}

/// Site metadata from `GET /sites/{id}`
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SiteInfo {
    /// Site name
    #[serde(default)]
    pub name: String,
    /// Public URL
    #[serde(default)]
    pub url: String,
}

/// Progress reported while the pipeline runs
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeployEvent {
    /// Entered a stage
    Stage(DeployStage),
    /// Catalog serialized
    Prepared {
        /// Records in the document
        records: usize,
        /// Document size in bytes
        bytes: usize,
    },
    /// Site found and token accepted
    SiteVerified(SiteInfo),
    /// The deploy currently live on the site
    LiveDeploy {
        /// Deploy id
        id: String,
    },
    /// New deploy created
    DeployCreated {
        /// Deploy id
        id: String,
        /// Preview URL, when reported
        url: Option<String>,
    },
    /// One status check
    Polled {
        /// Reported state (`new`, `uploading`, `ready`, ...)
        state: String,
    },
}

/// Why a deploy failed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeployFailure {
    /// Site id or token not configured
    #[error("Netlify site ID and access token are required; set them with `wreathkeeper settings set`")]
    MissingCredentials,
    /// 401 from the site endpoint
    #[error("invalid credentials")]
    InvalidCredentials,
    /// 404 from the site endpoint
    #[error("site not found")]
    SiteNotFound,
    /// Other non-2xx from the site endpoint
    #[error("site error {0}")]
    SiteError(u16),
    /// Non-2xx when creating the deploy
    #[error("deploy creation error {status}: {body}")]
    DeployCreation {
        /// HTTP status
        status: u16,
        /// Start of the response body
        body: String,
    },
    /// The host reported the deploy as failed
    #[error("deploy failed: {0}")]
    Remote(String),
    /// A request timed out
    #[error("connection timed out")]
    Timeout,
    /// The host could not be reached
    #[error("{0}")]
    Connection(String),
    /// A reply did not have the expected shape
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),
    /// The catalog could not be serialized
    #[error("could not prepare catalog: {0}")]
    Prepare(String),
    /// The worker thread died
    #[error("deploy worker stopped unexpectedly")]
    WorkerPanicked,
}

impl From<TransportError> for DeployFailure {
    fn from(e: TransportError) -> Self {
        match e {
            TransportError::Timeout => Self::Timeout,
            TransportError::Connect(_) | TransportError::Other(_) => Self::Connection(e.to_string()),
        }
    }
}

/// A finished deploy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploySummary {
    /// Deploy id
    pub deploy_id: String,
    /// Site name
    pub site_name: String,
    /// Live URL
    pub url: String,
    /// Records published
    pub records: usize,
    /// Status checks made
    pub polls: usize,
}

/// Terminal status of a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeployOutcome {
    /// The deploy is live
    Succeeded(DeploySummary),
    /// The run stopped on an error
    Failed(DeployFailure),
    /// Gave up waiting; the deploy may still finish on its own
    TimedOut {
        /// Deploy id to check later
        deploy_id: String,
    },
    /// Stopped on request
    Cancelled,
}

impl DeployOutcome {
    /// The deploy is known to be live
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded(_))
    }
}

/// How the file travels in the deploy request
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PayloadEncoding {
    /// Base64 of the UTF-8 document
    #[default]
    Base64,
    /// The document text as-is
    Raw,
}

/// Pipeline tuning
#[derive(Debug, Clone)]
pub struct DeployOptions {
    /// Name of the file on the site
    pub file_name: String,
    /// File encoding inside the request
    pub payload: PayloadEncoding,
    /// Delay between status checks
    pub poll_interval: Duration,
    /// Overall wait budget for the deploy to finish
    pub max_wait: Duration,
}

impl Default for DeployOptions {
    fn default() -> Self {
        Self {
            file_name: CATALOG_FILE.to_string(),
            payload: PayloadEncoding::Base64,
            poll_interval: Duration::from_secs(5),
            max_wait: Duration::from_secs(300),
        }
    }
}

// =============================================================================
// Cancellation
// =============================================================================

/// Shared cancel flag; clones observe the same flag
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl CancelToken {
    /// Fresh, not cancelled
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation and wake any waiter
    pub fn cancel(&self) {
        let (lock, cvar) = &*self.inner;
        *lock.lock().unwrap_or_else(PoisonError::into_inner) = true;
        cvar.notify_all();
    }

    /// Cancellation was requested
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        *self.inner.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Sleep up to `timeout`, waking early on cancel.
    /// Returns whether cancellation was requested.
    #[must_use]
    pub fn wait(&self, timeout: Duration) -> bool {
        let (lock, cvar) = &*self.inner;
        let guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
        let (guard, _) = cvar
            .wait_timeout_while(guard, timeout, |cancelled| !*cancelled)
            .unwrap_or_else(PoisonError::into_inner);
        *guard
    }
}

// =============================================================================
// Deployer
// =============================================================================

/// Runs the pipeline against one site
pub struct Deployer<A> {
    api: A,
    site_id: String,
    options: DeployOptions,
}

impl Deployer<NetlifyClient> {
    /// Netlify deployer from saved settings
    pub fn from_settings(settings: &Settings, payload: PayloadEncoding) -> Result<Self, DeployFailure> {
        if !settings.has_deploy_credentials() {
            return Err(DeployFailure::MissingCredentials);
        }
        let api = NetlifyClient::new(
            &settings.netlify_api_url,
            &settings.netlify_access_token,
            Duration::from_secs(60),
        )?;
        let options = DeployOptions {
            payload,
            poll_interval: settings.poll_interval(),
            max_wait: settings.max_wait(),
            ..DeployOptions::default()
        };
        Ok(Self::new(api, settings.netlify_site_id.trim(), options))
    }
}

impl<A: SiteApi> Deployer<A> {
    /// Deployer for `site_id` over `api`
    pub fn new(api: A, site_id: impl Into<String>, options: DeployOptions) -> Self {
        Self {
            api,
            site_id: site_id.into(),
            options,
        }
    }

    /// The transport
    pub fn api(&self) -> &A {
        &self.api
    }

    /// Verify the site and token without deploying
    pub fn check_site(&self) -> Result<SiteInfo, DeployFailure> {
        if self.site_id.trim().is_empty() {
            return Err(DeployFailure::MissingCredentials);
        }
        let response = self.api.get(&format!("/sites/{}", self.site_id))?;
        match response.status {
            401 => return Err(DeployFailure::InvalidCredentials),
            404 => return Err(DeployFailure::SiteNotFound),
            s if !response.is_success() => return Err(DeployFailure::SiteError(s)),
            _ => {}
        }

        let mut site: SiteInfo = serde_json::from_str(&response.body).unwrap_or_default();
        if site.name.is_empty() {
            site.name.clone_from(&self.site_id);
        }
        Ok(site)
    }

    /// Run the whole pipeline and return its terminal status
    pub fn run(
        &self,
        records: &[Wreath],
        cancel: &CancelToken,
        on_event: &mut dyn FnMut(DeployEvent),
    ) -> DeployOutcome {
        let outcome = match self.execute(records, cancel, on_event) {
            Ok(outcome) => outcome,
            Err(failure) => DeployOutcome::Failed(failure),
        };

        match &outcome {
            DeployOutcome::Succeeded(s) => info!("Deploy {} is live at {}", s.deploy_id, s.url),
            DeployOutcome::Failed(f) => warn!("Deploy failed: {}", f),
            DeployOutcome::TimedOut { deploy_id } => {
                warn!("Deploy {} still not ready after {:?}", deploy_id, self.options.max_wait);
            }
            DeployOutcome::Cancelled => info!("Deploy cancelled"),
        }
        outcome
    }

    fn execute(
        &self,
        records: &[Wreath],
        cancel: &CancelToken,
        emit: &mut dyn FnMut(DeployEvent),
    ) -> Result<DeployOutcome, DeployFailure> {
        emit(DeployEvent::Stage(DeployStage::Preparing));
        if self.site_id.trim().is_empty() {
            return Err(DeployFailure::MissingCredentials);
        }
        let document = serde_json::to_string_pretty(records).map_err(|e| DeployFailure::Prepare(e.to_string()))?;
        info!("Prepared {} wreaths ({} bytes) for upload", records.len(), document.len());
        emit(DeployEvent::Prepared {
            records: records.len(),
            bytes: document.len(),
        });
        if cancel.is_cancelled() {
            return Ok(DeployOutcome::Cancelled);
        }

        emit(DeployEvent::Stage(DeployStage::Connecting));
        emit(DeployEvent::Stage(DeployStage::VerifyingSite));
        let site = self.check_site()?;
        info!("Connected to site {} ({})", site.name, site.url);
        emit(DeployEvent::SiteVerified(site.clone()));
        self.report_live_deploy(emit);
        if cancel.is_cancelled() {
            return Ok(DeployOutcome::Cancelled);
        }

        emit(DeployEvent::Stage(DeployStage::Uploading));
        let (deploy_id, preview_url) = self.create_deploy(&document)?;
        info!("Created deploy {}", deploy_id);
        emit(DeployEvent::DeployCreated {
            id: deploy_id.clone(),
            url: preview_url,
        });

        emit(DeployEvent::Stage(DeployStage::Polling));
        self.poll(&deploy_id, &site, records.len(), cancel, emit)
    }

    fn report_live_deploy(&self, emit: &mut dyn FnMut(DeployEvent)) {
        let path = format!("/sites/{}/deploys?per_page=1", self.site_id);
        match self.api.get(&path) {
            Ok(r) if r.is_success() => {
                let id = r
                    .parsed()
                    .and_then(|v| v.get(0).and_then(|d| d.get("id")).and_then(Value::as_str).map(str::to_string));
                match id {
                    Some(id) => emit(DeployEvent::LiveDeploy { id }),
                    None => debug!("Site has no previous deploys"),
                }
            }
            Ok(r) => debug!("Listing deploys returned {}", r.status),
            Err(e) => debug!("Listing deploys failed: {}", e),
        }
    }

    fn create_deploy(&self, document: &str) -> Result<(String, Option<String>), DeployFailure> {
        let content = match self.options.payload {
            PayloadEncoding::Base64 => base64::engine::general_purpose::STANDARD.encode(document),
            PayloadEncoding::Raw => document.to_string(),
        };
        let mut files = serde_json::Map::new();
        files.insert(self.options.file_name.clone(), Value::String(content));
        let body = json!({ "files": files });

        let response = self.api.post_json(&format!("/sites/{}/deploys", self.site_id), &body)?;
        if !response.is_success() {
            return Err(DeployFailure::DeployCreation {
                status: response.status,
                body: response.body.chars().take(200).collect(),
            });
        }

        let created = response
            .parsed()
            .ok_or_else(|| DeployFailure::UnexpectedResponse("deploy reply is not JSON".into()))?;
        let id = created
            .get("id")
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| DeployFailure::UnexpectedResponse("deploy reply has no id".into()))?
            .to_string();
        let url = ["deploy_ssl_url", "deploy_url"]
            .iter()
            .find_map(|k| created.get(*k).and_then(Value::as_str))
            .map(str::to_string);
        Ok((id, url))
    }

    fn poll(
        &self,
        deploy_id: &str,
        site: &SiteInfo,
        records: usize,
        cancel: &CancelToken,
        emit: &mut dyn FnMut(DeployEvent),
    ) -> Result<DeployOutcome, DeployFailure> {
        let started = Instant::now();
        let mut polls = 0;

        loop {
            if cancel.is_cancelled() {
                return Ok(DeployOutcome::Cancelled);
            }

            let response = self.api.get(&format!("/deploys/{deploy_id}"))?;
            polls += 1;

            if response.is_success() {
                let status = response.parsed().unwrap_or(Value::Null);
                let state = status.get("state").and_then(Value::as_str).unwrap_or("unknown");
                debug!("Deploy {} state: {}", deploy_id, state);
                emit(DeployEvent::Polled { state: state.to_string() });

                match state {
                    "ready" => {
                        let url = ["deploy_ssl_url", "ssl_url", "url"]
                            .iter()
                            .find_map(|k| status.get(*k).and_then(Value::as_str))
                            .unwrap_or(&site.url)
                            .to_string();
                        return Ok(DeployOutcome::Succeeded(DeploySummary {
                            deploy_id: deploy_id.to_string(),
                            site_name: site.name.clone(),
                            url,
                            records,
                            polls,
                        }));
                    }
                    "error" | "failed" => {
                        let message = status
                            .get("error_message")
                            .and_then(Value::as_str)
                            .unwrap_or("Unknown error");
                        return Err(DeployFailure::Remote(message.to_string()));
                    }
                    _ => {}
                }
            } else {
                debug!("Status check for {} returned {}", deploy_id, response.status);
            }

            let elapsed = started.elapsed();
            if elapsed >= self.options.max_wait {
                return Ok(DeployOutcome::TimedOut {
                    deploy_id: deploy_id.to_string(),
                });
            }
            let pause = self.options.poll_interval.min(self.options.max_wait - elapsed);
            if cancel.wait(pause) {
                return Ok(DeployOutcome::Cancelled);
            }
        }
    }
}

// =============================================================================
// Background worker
// =============================================================================

/// A pipeline running on its own thread
pub struct DeployHandle {
    cancel: CancelToken,
    events: Receiver<DeployEvent>,
    join: JoinHandle<DeployOutcome>,
}

impl DeployHandle {
    /// Token that stops this run
    #[must_use]
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Progress events; the channel closes when the run ends
    #[must_use]
    pub fn events(&self) -> &Receiver<DeployEvent> {
        &self.events
    }

    /// Wait for the terminal status
    #[must_use]
    pub fn wait(self) -> DeployOutcome {
        self.join
            .join()
            .unwrap_or(DeployOutcome::Failed(DeployFailure::WorkerPanicked))
    }
}

/// Run `deployer` over a snapshot of `records` on a background thread
pub fn spawn<A: SiteApi + 'static>(deployer: Deployer<A>, records: Vec<Wreath>) -> DeployHandle {
    let cancel = CancelToken::new();
    let (tx, events) = mpsc::channel();
    let worker_cancel = cancel.clone();

    let join = thread::spawn(move || {
        deployer.run(&records, &worker_cancel, &mut |event| {
            // The receiver may have been dropped; the run continues regardless
            let _ = tx.send(event);
        })
    });

    DeployHandle { cancel, events, join }
}
