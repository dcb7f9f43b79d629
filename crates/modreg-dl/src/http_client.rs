use std::{
    sync::{Arc, LazyLock, PoisonError, RwLock},
    time::Duration,
};

use ureq::{
    http::{self, HeaderMap, Uri},
    typestate::WithoutBody,
    Agent, Proxy, RequestBuilder,
};

#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub user_agent: Option<String>,
    pub headers: Option<HeaderMap>,
    pub proxy: Option<Proxy>,
    pub timeout: Option<Duration>,
}

impl Default for ClientConfig {
    /// A `modreg/<version>` user agent, no proxy, no extra headers and no
    /// timeout.
    ///
    /// # Examples
    ///
    /// ```
    /// use modreg_dl::http_client::ClientConfig;
    ///
    /// let cfg = ClientConfig::default();
    /// assert!(cfg.user_agent.as_deref().unwrap().starts_with("modreg/"));
    /// assert!(cfg.timeout.is_none());
    /// ```
    fn default() -> Self {
        Self {
            user_agent: Some(concat!("modreg/", env!("CARGO_PKG_VERSION")).into()),
            proxy: None,
            headers: None,
            timeout: None,
        }
    }
}

impl ClientConfig {
    /// Builds an HTTP `Agent` with the configured proxy, global timeout and
    /// user agent.
    pub fn build(&self) -> Agent {
        let mut config = ureq::Agent::config_builder()
            .proxy(self.proxy.clone())
            .timeout_global(self.timeout);

        if let Some(user_agent) = &self.user_agent {
            config = config.user_agent(user_agent);
        }

        config.build().into()
    }
}

struct SharedClient {
    agent: Agent,
    config: ClientConfig,
}

static SHARED_CLIENT_STATE: LazyLock<Arc<RwLock<SharedClient>>> = LazyLock::new(|| {
    let config = ClientConfig::default();
    let agent = config.build();

    Arc::new(RwLock::new(SharedClient {
        agent,
        config,
    }))
});

/// Handle to the process-wide HTTP agent.
#[derive(Clone, Default)]
pub struct SharedAgent;

impl SharedAgent {
    pub fn new() -> Self {
        Self
    }

    /// Create a GET request builder for the given URI using the shared agent.
    ///
    /// Any global headers configured in the shared client are applied.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use modreg_dl::http_client::SHARED_AGENT;
    ///
    /// let response = SHARED_AGENT
    ///     .get("https://bcr.bazel.build/modules/zlib/metadata.json")
    ///     .call();
    /// ```
    pub fn get<T>(&self, uri: T) -> RequestBuilder<WithoutBody>
    where
        Uri: TryFrom<T>,
        <Uri as TryFrom<T>>::Error: Into<http::Error>,
    {
        let state = SHARED_CLIENT_STATE
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        let req = state.agent.get(uri);
        apply_headers(req, &state.config.headers)
    }
}

fn apply_headers<B>(mut req: RequestBuilder<B>, headers: &Option<HeaderMap>) -> RequestBuilder<B> {
    if let Some(headers) = headers {
        for (key, value) in headers.iter() {
            req = req.header(key, value);
        }
    }
    req
}

pub static SHARED_AGENT: LazyLock<SharedAgent> = LazyLock::new(SharedAgent::new);

/// Updates the shared HTTP client configuration and rebuilds its agent.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use modreg_dl::http_client::configure_http_client;
///
/// configure_http_client(|cfg| {
///     cfg.timeout = Some(Duration::from_secs(30));
/// });
/// ```
pub fn configure_http_client<F>(updater: F)
where
    F: FnOnce(&mut ClientConfig),
{
    let mut state = SHARED_CLIENT_STATE
        .write()
        .unwrap_or_else(PoisonError::into_inner);
    let mut new_config = state.config.clone();
    updater(&mut new_config);
    state.agent = new_config.build();
    state.config = new_config;
}
