// Web API discovery and session authentication
//
// `SYNO.API.Info` tells us where each API lives and which versions it
// speaks; `SYNO.API.Auth` trades the account credentials for a session id
// (`sid`) that every later call carries as `_sid`.

use std::collections::HashMap;
use std::fmt;

use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, info};

use crate::client::SurveillanceClient;
use crate::error::{Error, describe_code};
use crate::models::{ApiInfoMap, LoginData};

/// Session name requested at login; scopes the sid to Surveillance Station.
const SESSION_NAME: &str = "SurveillanceStation";

/// The Web APIs this client talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiName {
    Info,
    Auth,
    Camera,
    CameraEvent,
    HomeMode,
    VideoStreaming,
}

impl ApiName {
    pub const DISCOVERABLE: [Self; 5] = [
        Self::Auth,
        Self::Camera,
        Self::CameraEvent,
        Self::HomeMode,
        Self::VideoStreaming,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Info => "SYNO.API.Info",
            Self::Auth => "SYNO.API.Auth",
            Self::Camera => "SYNO.SurveillanceStation.Camera",
            Self::CameraEvent => "SYNO.SurveillanceStation.Camera.Event",
            Self::HomeMode => "SYNO.SurveillanceStation.HomeMode",
            Self::VideoStreaming => "SYNO.SurveillanceStation.VideoStreaming",
        }
    }

    /// Highest version whose response shape this client understands.
    fn preferred_version(self) -> u32 {
        match self {
            Self::Auth => 6,
            Self::Camera => 9,
            Self::Info | Self::CameraEvent | Self::HomeMode | Self::VideoStreaming => 1,
        }
    }
}

impl fmt::Display for ApiName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where an API lives (`webapi/{path}`) and the version we call it with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiEndpoint {
    pub path: String,
    pub version: u32,
}

/// The resolved endpoints of one appliance.
#[derive(Debug, Clone, Default)]
pub struct ApiCatalog {
    endpoints: HashMap<ApiName, ApiEndpoint>,
}

impl ApiCatalog {
    /// Resolve the catalog from a `SYNO.API.Info` `Query` payload.
    ///
    /// The preferred version is clamped into the advertised range.
    pub(crate) fn from_info(info: &ApiInfoMap) -> Self {
        let endpoints = ApiName::DISCOVERABLE
            .into_iter()
            .filter_map(|api| {
                let entry = info.get(api.as_str())?;
                let version = api
                    .preferred_version()
                    .clamp(entry.min_version, entry.max_version.max(entry.min_version));
                Some((
                    api,
                    ApiEndpoint {
                        path: entry.path.clone(),
                        version,
                    },
                ))
            })
            .collect();
        Self { endpoints }
    }

    pub fn endpoint(&self, api: ApiName) -> Result<&ApiEndpoint, Error> {
        self.endpoints
            .get(&api)
            .ok_or(Error::UnsupportedApi(api.as_str()))
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }
}

/// An authenticated session: the sid plus the catalog it was issued against.
pub struct Session {
    sid: SecretString,
    catalog: ApiCatalog,
}

impl Session {
    pub fn new(sid: SecretString, catalog: ApiCatalog) -> Self {
        Self { sid, catalog }
    }

    pub(crate) fn sid(&self) -> &str {
        self.sid.expose_secret()
    }

    pub fn catalog(&self) -> &ApiCatalog {
        &self.catalog
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("sid", &"[REDACTED]")
            .field("apis", &self.catalog.len())
            .finish()
    }
}

impl SurveillanceClient {
    /// Query `SYNO.API.Info` for the paths and versions of every API we use.
    ///
    /// `GET webapi/query.cgi?api=SYNO.API.Info&method=Query&version=1&query=...`
    pub(crate) async fn discover(&self) -> Result<ApiCatalog, Error> {
        let url = self.webapi_url("query.cgi")?;
        let query = ApiName::DISCOVERABLE.map(ApiName::as_str).join(",");

        debug!("discovering APIs at {}", url);

        let resp = self
            .http()
            .get(url)
            .query(&[
                ("api", ApiName::Info.as_str()),
                ("method", "Query"),
                ("version", "1"),
                ("query", query.as_str()),
            ])
            .send()
            .await?;

        let info: ApiInfoMap = Self::parse_envelope(resp)
            .await?
            .ok_or_else(|| Error::Deserialization {
                message: "API info response has no data".into(),
                body: String::new(),
            })?;

        let catalog = ApiCatalog::from_info(&info);
        debug!(apis = catalog.len(), "API discovery complete");
        Ok(catalog)
    }

    /// Log in with the configured account and return a fresh session.
    ///
    /// Credentials travel in a POST form body, never in the query string.
    pub(crate) async fn login(&self, catalog: ApiCatalog) -> Result<Session, Error> {
        let endpoint = catalog.endpoint(ApiName::Auth)?;
        let url = self.webapi_url(&endpoint.path)?;
        let version = endpoint.version.to_string();

        debug!(username = %self.username(), "logging in at {}", url);

        let resp = self
            .http()
            .post(url)
            .form(&[
                ("api", ApiName::Auth.as_str()),
                ("method", "Login"),
                ("version", version.as_str()),
                ("account", self.username()),
                ("passwd", self.password().expose_secret()),
                ("session", SESSION_NAME),
                ("format", "sid"),
            ])
            .send()
            .await?;

        let data: Option<LoginData> = Self::parse_envelope(resp).await.map_err(|e| match e {
            // Every failure of the login call itself is an authentication failure.
            Error::Api { code, .. } | Error::SessionExpired { code } => Error::Authentication {
                code: Some(code),
                message: describe_code(code).into(),
            },
            other => other,
        })?;

        let sid = data.map(|d| d.sid).ok_or_else(|| Error::Authentication {
            code: None,
            message: "login response carried no session id".into(),
        })?;

        info!(username = %self.username(), "login successful");
        Ok(Session::new(SecretString::from(sid), catalog))
    }

    /// End the current session, if any.
    ///
    /// `SYNO.API.Auth` `Logout` with `session=SurveillanceStation`.
    pub async fn logout(&self) -> Result<(), Error> {
        let Some(session) = self.take_session() else {
            return Ok(());
        };
        let endpoint = session.catalog().endpoint(ApiName::Auth)?;
        let url = self.webapi_url(&endpoint.path)?;
        let version = endpoint.version.to_string();

        debug!("logging out at {}", url);

        let resp = self
            .http()
            .get(url)
            .query(&[
                ("api", ApiName::Auth.as_str()),
                ("method", "Logout"),
                ("version", version.as_str()),
                ("session", SESSION_NAME),
                ("_sid", session.sid()),
            ])
            .send()
            .await?;
        let _: Option<serde_json::Value> = Self::parse_envelope(resp).await?;

        debug!("logout complete");
        Ok(())
    }
}
