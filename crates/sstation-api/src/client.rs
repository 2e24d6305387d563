// Web API HTTP client
//
// Wraps `reqwest::Client` with Surveillance Station URL construction,
// envelope unwrapping, and session management. Endpoint groups (camera,
// event, home mode) are implemented as inherent methods in separate files
// to keep this module focused on transport and session mechanics.

use std::sync::Arc;

use arc_swap::ArcSwapOption;
use secrecy::SecretString;
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;
use tracing::{debug, warn};
use url::Url;

use crate::auth::{ApiName, Session};
use crate::error::{Error, SESSION_ERROR_CODES, describe_code};
use crate::models::Envelope;
use crate::transport::TransportConfig;

/// Raw HTTP client for one Surveillance Station appliance.
///
/// Holds at most one session. Reads of the current session are lock-free;
/// logins are single-flighted through an async mutex so concurrent callers
/// that all observe an expired sid trigger exactly one re-login. The client
/// caches nothing else: every camera or home-mode read goes to the appliance.
pub struct SurveillanceClient {
    http: reqwest::Client,
    base_url: Url,
    username: String,
    password: SecretString,
    session: ArcSwapOption<Session>,
    login_lock: Mutex<()>,
}

impl SurveillanceClient {
    /// Create a client from a `TransportConfig`. Does NOT log in.
    ///
    /// The `base_url` is the DSM root (e.g. `https://nas.local:5001`).
    pub fn new(
        base_url: Url,
        username: String,
        password: SecretString,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self::with_client(http, base_url, username, password))
    }

    /// Create a client with a pre-built `reqwest::Client`.
    pub fn with_client(
        http: reqwest::Client,
        base_url: Url,
        username: String,
        password: SecretString,
    ) -> Self {
        Self {
            http,
            base_url,
            username,
            password,
            session: ArcSwapOption::empty(),
            login_lock: Mutex::new(()),
        }
    }

    /// Create a client and authenticate immediately.
    ///
    /// Fails fast on bad credentials or an unreachable appliance, which is
    /// what host setup wants.
    pub async fn connect(
        base_url: Url,
        username: String,
        password: SecretString,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let client = Self::new(base_url, username, password, transport)?;
        client.authenticate().await?;
        Ok(client)
    }

    /// The underlying HTTP client.
    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// The appliance base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub(crate) fn password(&self) -> &SecretString {
        &self.password
    }

    /// Whether a session is currently held.
    pub fn has_session(&self) -> bool {
        self.session.load().is_some()
    }

    // ── Session management ───────────────────────────────────────────

    /// Establish a new session, replacing any existing one.
    pub async fn authenticate(&self) -> Result<Arc<Session>, Error> {
        let current = self.session.load_full();
        self.relogin(current.as_ref()).await
    }

    /// The current session, logging in first if there is none.
    pub(crate) async fn session(&self) -> Result<Arc<Session>, Error> {
        if let Some(session) = self.session.load_full() {
            return Ok(session);
        }
        self.relogin(None).await
    }

    pub(crate) fn take_session(&self) -> Option<Arc<Session>> {
        self.session.swap(None)
    }

    /// Log in again unless another task already replaced `stale`.
    async fn relogin(&self, stale: Option<&Arc<Session>>) -> Result<Arc<Session>, Error> {
        let _guard = self.login_lock.lock().await;

        if let Some(current) = self.session.load_full() {
            if stale.is_none_or(|s| !Arc::ptr_eq(s, &current)) {
                return Ok(current);
            }
        }

        let catalog = match stale {
            Some(session) => session.catalog().clone(),
            None => self.discover().await?,
        };

        match self.login(catalog).await {
            Ok(session) => {
                let session = Arc::new(session);
                self.session.store(Some(Arc::clone(&session)));
                Ok(session)
            }
            Err(e) => {
                self.session.store(None);
                Err(e)
            }
        }
    }

    /// Run `op` with the current session, re-authenticating once if the
    /// appliance reports the session as expired. Nothing else is retried.
    pub(crate) async fn with_session<T, F, Fut>(&self, op: F) -> Result<T, Error>
    where
        F: Fn(Arc<Session>) -> Fut,
        Fut: Future<Output = Result<T, Error>>,
    {
        let session = self.session().await?;
        match op(Arc::clone(&session)).await {
            Err(e) if e.is_auth_expired() => {
                warn!(error = %e, "session rejected, logging in again");
                let fresh = self.relogin(Some(&session)).await?;
                op(fresh).await
            }
            other => other,
        }
    }

    // ── URL builders ─────────────────────────────────────────────────

    /// `{base}/webapi/{path}`
    pub(crate) fn webapi_url(&self, path: &str) -> Result<Url, Error> {
        let base = self.base_url.as_str().trim_end_matches('/');
        let path = path.trim_start_matches('/');
        Ok(Url::parse(&format!("{base}/webapi/{path}"))?)
    }

    /// Fully-qualified URL for `api`/`method` with the session id attached.
    pub(crate) fn method_url(
        &self,
        session: &Session,
        api: ApiName,
        method: &str,
        params: &[(&str, String)],
    ) -> Result<Url, Error> {
        let endpoint = session.catalog().endpoint(api)?;
        let mut url = self.webapi_url(&endpoint.path)?;
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("api", api.as_str())
                .append_pair("method", method)
                .append_pair("version", &endpoint.version.to_string());
            for (key, value) in params {
                query.append_pair(key, value);
            }
            query.append_pair("_sid", session.sid());
        }
        Ok(url)
    }

    // ── Request helpers ──────────────────────────────────────────────

    /// Send a GET for `api`/`method` and return the raw response.
    pub(crate) async fn send(
        &self,
        session: &Session,
        api: ApiName,
        method: &str,
        params: &[(&str, String)],
    ) -> Result<reqwest::Response, Error> {
        let url = self.method_url(session, api, method, params)?;
        debug!(api = %api, method, "GET {}{}", url.origin().ascii_serialization(), url.path());
        Ok(self.http.get(url).send().await?)
    }

    /// Call `api`/`method` and unwrap the envelope's `data`.
    pub(crate) async fn call<T: DeserializeOwned>(
        &self,
        api: ApiName,
        method: &str,
        params: &[(&str, String)],
    ) -> Result<T, Error> {
        self.with_session(|session| async move {
            let resp = self.send(&session, api, method, params).await?;
            Self::parse_envelope(resp)
                .await?
                .ok_or_else(|| Error::Deserialization {
                    message: format!("{api} {method} response has no data"),
                    body: String::new(),
                })
        })
        .await
    }

    /// Call `api`/`method` for its side effect only.
    pub(crate) async fn call_unit(
        &self,
        api: ApiName,
        method: &str,
        params: &[(&str, String)],
    ) -> Result<(), Error> {
        self.with_session(|session| async move {
            let resp = self.send(&session, api, method, params).await?;
            let _: Option<serde_json::Value> = Self::parse_envelope(resp).await?;
            Ok(())
        })
        .await
    }

    /// Parse the `{ success, data, error }` envelope.
    ///
    /// Session-class error codes become [`Error::SessionExpired`] so that
    /// [`with_session`](Self::with_session) can re-authenticate.
    pub(crate) async fn parse_envelope<T: DeserializeOwned>(
        resp: reqwest::Response,
    ) -> Result<Option<T>, Error> {
        let status = resp.status();

        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Http {
                status: status.as_u16(),
                message: body.chars().take(200).collect(),
            });
        }

        let body = resp.text().await?;
        Self::parse_envelope_body(&body)
    }

    pub(crate) fn parse_envelope_body<T: DeserializeOwned>(body: &str) -> Result<Option<T>, Error> {
        let envelope: Envelope<T> = serde_json::from_str(body).map_err(|e| {
            let preview: String = body.chars().take(200).collect();
            Error::Deserialization {
                message: format!("{e} (body preview: {preview:?})"),
                body: body.to_owned(),
            }
        })?;

        if envelope.success {
            return Ok(envelope.data);
        }

        let code = envelope.error.map_or(100, |e| e.code);
        if SESSION_ERROR_CODES.contains(&code) {
            return Err(Error::SessionExpired { code });
        }
        Err(Error::Api {
            code,
            message: describe_code(code).into(),
        })
    }
}
