//! HTTP transport backed by `ureq`.

use std::time::Duration;

use reconcile::CallContext;
use url::Url;

use crate::error::{Error, Result};
use crate::transport::{Method, Request, Response, Transport, ensure_live};

/// Default Pulumi Cloud endpoint.
pub const DEFAULT_SERVICE_URL: &str = "https://api.pulumi.com";

/// API version the provider speaks.
const ACCEPT: &str = "application/vnd.pulumi+8";

/// Real transport to the Pulumi Cloud REST API.
pub struct HttpTransport {
    /// HTTP agent for requests.
    agent: ureq::Agent,
    /// Service URL without the `/api` suffix.
    service_url: String,
    /// Access token sent as `Authorization: token <value>`.
    access_token: String,
    /// Upper bound for a single request.
    timeout: Duration,
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport")
            .field("service_url", &self.service_url)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl HttpTransport {
    /// Create a transport for `service_url`.
    #[must_use]
    pub fn new(
        service_url: impl Into<String>,
        access_token: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .build()
            .into();
        Self {
            agent,
            service_url: service_url.into().trim_end_matches('/').to_string(),
            access_token: access_token.into(),
            timeout,
        }
    }

    /// Get the current service URL.
    #[must_use]
    pub fn service_url(&self) -> &str {
        &self.service_url
    }

    /// Resolve an escaped relative path under `<service_url>/api/`.
    fn url(&self, path: &str) -> Result<Url> {
        let mut base = Url::parse(&self.service_url)?;
        base.path_segments_mut()
            .map_err(|()| {
                Error::InvalidArgument(format!("{} cannot be a base URL", self.service_url))
            })?
            .pop_if_empty()
            .push("api")
            .push("");
        Ok(base.join(path.trim_start_matches('/'))?)
    }

    /// The tighter of the transport timeout and the context deadline.
    fn timeout_for(&self, ctx: &CallContext) -> Duration {
        ctx.remaining()
            .map_or(self.timeout, |left| left.min(self.timeout))
    }

    fn prepare<B>(&self, builder: ureq::RequestBuilder<B>, timeout: Duration) -> ureq::RequestBuilder<B> {
        builder
            .config()
            .timeout_global(Some(timeout))
            .build()
            .header("X-Pulumi-Source", "provider")
            .header("Accept", ACCEPT)
            .header("Content-Type", "application/json")
            .header("Authorization", format!("token {}", self.access_token))
    }
}

impl Transport for HttpTransport {
    fn send(&self, ctx: &CallContext, request: &Request) -> Result<Response> {
        ensure_live(ctx)?;

        let url = self.url(&request.path)?;
        let url = url.as_str();
        let timeout = self.timeout_for(ctx);
        log::debug!("{} {}", request.method, url);

        let mut response = match request.method {
            Method::Get => self.prepare(self.agent.get(url), timeout).call()?,
            Method::Delete => self.prepare(self.agent.delete(url), timeout).call()?,
            Method::Post | Method::Patch => {
                let builder = if request.method == Method::Post {
                    self.agent.post(url)
                } else {
                    self.agent.patch(url)
                };
                let builder = self.prepare(builder, timeout);
                match &request.body {
                    Some(body) => builder.send_json(body)?,
                    None => builder.send_empty()?,
                }
            }
        };

        let status = response.status().as_u16();
        let body = response.body_mut().read_to_string()?;
        log::debug!("{} {} -> {}", request.method, url, status);
        Ok(Response { status, body })
    }
}
