// ── Host registry ──
//
// Built once at startup: every configured host is connected concurrently,
// then recorded in configuration order so a repeated name replaces the
// earlier entry, whose session is logged out. Hosts that fail to connect are logged, listed in the
// `SetupReport`, and left out. The registry is read-only afterwards and is
// shared as `Arc<HostRegistry>`.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::future::join_all;
use indexmap::IndexMap;
use sstation_api::SurveillanceClient;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::config::{HostConfig, Whitelist};
use crate::error::CoreError;
use crate::proxy::StreamProxy;
use crate::remote::RemoteClient;

// ── Connector ────────────────────────────────────────────────────────

/// Turns a host configuration into an authenticated client.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, config: &HostConfig) -> Result<Arc<dyn RemoteClient>, CoreError>;
}

/// Connects with [`SurveillanceClient`], logging in eagerly.
#[derive(Debug, Clone, Copy, Default)]
pub struct SurveillanceConnector;

#[async_trait]
impl Connector for SurveillanceConnector {
    async fn connect(&self, config: &HostConfig) -> Result<Arc<dyn RemoteClient>, CoreError> {
        let client = SurveillanceClient::connect(
            config.url.clone(),
            config.username.clone(),
            config.password.clone(),
            &config.transport(),
        )
        .await?;
        Ok(Arc::new(client))
    }
}

// ── Entries ──────────────────────────────────────────────────────────

/// Everything the integration keeps for one connected host.
pub struct HostEntry {
    name: String,
    client: Arc<dyn RemoteClient>,
    whitelist: Whitelist,
    verify_ssl: bool,
    proxy: Arc<StreamProxy>,
    home_mode_lock: Arc<Mutex<()>>,
}

impl HostEntry {
    pub fn new(config: &HostConfig, client: Arc<dyn RemoteClient>, proxy: StreamProxy) -> Self {
        Self {
            name: config.name.clone(),
            client,
            whitelist: config.whitelist.clone(),
            verify_ssl: config.verify_ssl,
            proxy: Arc::new(proxy),
            home_mode_lock: Arc::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn client(&self) -> &Arc<dyn RemoteClient> {
        &self.client
    }

    pub fn whitelist(&self) -> &Whitelist {
        &self.whitelist
    }

    pub fn verify_ssl(&self) -> bool {
        self.verify_ssl
    }

    pub fn proxy(&self) -> &Arc<StreamProxy> {
        &self.proxy
    }

    /// Serializes home mode changes on this host.
    pub fn home_mode_lock(&self) -> &Arc<Mutex<()>> {
        &self.home_mode_lock
    }
}

impl fmt::Debug for HostEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostEntry")
            .field("name", &self.name)
            .field("whitelist", &self.whitelist)
            .field("verify_ssl", &self.verify_ssl)
            .finish_non_exhaustive()
    }
}

// ── Setup report ─────────────────────────────────────────────────────

/// A host that could not be set up.
#[derive(Debug)]
pub struct HostFailure {
    pub host: String,
    pub error: CoreError,
}

/// Outcome of [`HostRegistry::build`].
#[derive(Debug, Default)]
pub struct SetupReport {
    pub connected: Vec<String>,
    pub failed: Vec<HostFailure>,
}

impl SetupReport {
    /// `false` when any configured host failed.
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

// ── Registry ─────────────────────────────────────────────────────────

/// Connected hosts keyed by name, in configuration order.
#[derive(Debug, Default)]
pub struct HostRegistry {
    hosts: IndexMap<String, HostEntry>,
}

impl HostRegistry {
    /// Connect every host and build the registry.
    ///
    /// Never fails as a whole: per-host failures end up in the report.
    pub async fn build(configs: Vec<HostConfig>, connector: &dyn Connector) -> (Self, SetupReport) {
        let attempts = join_all(configs.iter().map(|config| async move {
            let proxy = StreamProxy::new(&config.transport()).map_err(CoreError::from)?;
            let client = connector.connect(config).await?;
            Ok::<_, CoreError>(HostEntry::new(config, client, proxy))
        }))
        .await;

        let mut hosts = IndexMap::new();
        let mut report = SetupReport::default();

        for (config, attempt) in configs.iter().zip(attempts) {
            match attempt {
                Ok(entry) => {
                    info!(host = %config.name, url = %config.url.origin().ascii_serialization(), "host connected");
                    if let Some(replaced) = hosts.insert(config.name.clone(), entry) {
                        warn!(host = %config.name, "duplicate host name, later entry replaces earlier one");
                        if let Err(e) = replaced.client.logout().await {
                            warn!(host = %config.name, error = %e, "logout of replaced session failed (non-fatal)");
                        }
                    }
                    report.connected.push(config.name.clone());
                }
                Err(e) => {
                    error!(host = %config.name, error = %e, "host setup failed");
                    report.failed.push(HostFailure {
                        host: config.name.clone(),
                        error: e,
                    });
                }
            }
        }

        (Self { hosts }, report)
    }

    pub(crate) fn from_entries(entries: impl IntoIterator<Item = HostEntry>) -> Self {
        Self {
            hosts: entries.into_iter().map(|e| (e.name.clone(), e)).collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&HostEntry> {
        self.hosts.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &HostEntry> {
        self.hosts.values()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.hosts.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }

    /// End every host's session. Failures are logged, not returned.
    pub async fn logout_all(&self) {
        for entry in self.hosts.values() {
            if let Err(e) = entry.client.logout().await {
                warn!(host = %entry.name, error = %e, "logout failed (non-fatal)");
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
impl HostEntry {
    pub(crate) fn for_test(name: &str, client: Arc<dyn RemoteClient>) -> Self {
        let mut config = HostConfig::new(
            url::Url::parse("https://nas.invalid:5001").unwrap(),
            "admin",
            secrecy::SecretString::from("pw".to_string()),
        );
        config.name = name.to_owned();
        let proxy = StreamProxy::new(&config.transport()).unwrap();
        Self::new(&config, client, proxy)
    }

    pub(crate) fn with_whitelist(mut self, whitelist: Whitelist) -> Self {
        self.whitelist = whitelist;
        self
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use pretty_assertions::assert_eq;
    use secrecy::SecretString;
    use url::Url;

    use super::*;
    use crate::testing::FakeClient;

    /// Connector that succeeds for known URLs and fails for the rest.
    #[derive(Default)]
    struct FakeConnector {
        clients: HashMap<String, Arc<FakeClient>>,
    }

    impl FakeConnector {
        fn with(mut self, url: &str, client: &Arc<FakeClient>) -> Self {
            self.clients.insert(url.to_owned(), Arc::clone(client));
            self
        }
    }

    #[async_trait]
    impl Connector for FakeConnector {
        async fn connect(&self, config: &HostConfig) -> Result<Arc<dyn RemoteClient>, CoreError> {
            self.clients
                .get(config.url.as_str())
                .map(|c| Arc::clone(c) as Arc<dyn RemoteClient>)
                .ok_or_else(|| CoreError::AuthenticationFailed {
                    message: "no such account or incorrect password".into(),
                })
        }
    }

    fn host(name: &str, url: &str) -> HostConfig {
        let mut config = HostConfig::new(
            Url::parse(url).unwrap(),
            "admin",
            SecretString::from("pw".to_string()),
        );
        config.name = name.into();
        config
    }

    #[tokio::test]
    async fn one_entry_per_name_with_last_write_wins() {
        let first = Arc::new(FakeClient::default());
        let second = Arc::new(FakeClient::default());
        let connector = FakeConnector::default()
            .with("https://a.local/", &first)
            .with("https://b.local/", &second);

        let mut replaced = host("nas", "https://b.local");
        replaced.verify_ssl = false;
        let (registry, report) = HostRegistry::build(
            vec![host("nas", "https://a.local"), host("other", "https://a.local"), replaced],
            &connector,
        )
        .await;

        assert!(report.is_complete());
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["nas", "other"]);

        let nas = registry.get("nas").unwrap();
        assert!(!nas.verify_ssl());
        nas.client().get_home_mode().await.unwrap();
        assert_eq!(second.call_count("get_home_mode"), 1);
        assert_eq!(first.call_count("get_home_mode"), 0);
    }

    #[tokio::test]
    async fn replaced_duplicate_is_logged_out() {
        let earlier = Arc::new(FakeClient::default());
        let later = Arc::new(FakeClient::default());
        let connector = FakeConnector::default()
            .with("https://a.local/", &earlier)
            .with("https://b.local/", &later);

        let (registry, _) = HostRegistry::build(
            vec![host("nas", "https://a.local"), host("nas", "https://b.local")],
            &connector,
        )
        .await;

        assert_eq!(registry.len(), 1);
        assert_eq!(earlier.call_count("logout"), 1);
        assert_eq!(later.call_count("logout"), 0);
    }

    #[tokio::test]
    async fn failed_host_is_reported_and_others_survive() {
        let good = Arc::new(FakeClient::default());
        let connector = FakeConnector::default().with("https://good.local/", &good);

        let (registry, report) = HostRegistry::build(
            vec![host("bad", "https://bad.local"), host("good", "https://good.local")],
            &connector,
        )
        .await;

        assert!(!report.is_complete());
        assert_eq!(report.connected, vec!["good".to_string()]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].host, "bad");
        assert!(report.failed[0].error.is_auth());
        assert!(registry.get("bad").is_none());
        assert!(registry.get("good").is_some());
    }

    #[tokio::test]
    async fn unreadable_ca_cert_fails_only_that_host() {
        let good = Arc::new(FakeClient::default());
        let connector = FakeConnector::default().with("https://good.local/", &good);
        let mut broken = host("broken", "https://good.local");
        broken.ca_cert = Some("/nonexistent/ca.pem".into());

        let (registry, report) =
            HostRegistry::build(vec![broken, host("good", "https://good.local")], &connector).await;

        assert_eq!(registry.len(), 1);
        assert_eq!(report.failed[0].host, "broken");
    }

    #[tokio::test]
    async fn logout_all_reaches_every_host() {
        let a = Arc::new(FakeClient::default());
        let b = Arc::new(FakeClient::default());
        let registry = HostRegistry::from_entries([
            HostEntry::for_test("a", Arc::clone(&a) as Arc<dyn RemoteClient>),
            HostEntry::for_test("b", Arc::clone(&b) as Arc<dyn RemoteClient>),
        ]);

        registry.logout_all().await;

        assert_eq!(a.call_count("logout"), 1);
        assert_eq!(b.call_count("logout"), 1);
    }
}
