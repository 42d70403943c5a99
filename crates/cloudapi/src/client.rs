//! The API client shared by every entity module.

use std::time::Duration;

use reconcile::CallContext;
use serde::Serialize;
use serde::de::DeserializeOwned;
use url::Url;

use crate::error::{Error, Result};
use crate::transport::http::HttpTransport;
use crate::transport::{Request, Response, Transport};

/// Pulumi Cloud API client.
///
/// Implements every narrow entity trait in this crate; resources receive
/// it as the trait they need. Safe to share between threads.
#[derive(Debug)]
pub struct Client {
    transport: Box<dyn Transport>,
}

impl Client {
    /// Create a client over any transport.
    pub fn new(transport: impl Transport + 'static) -> Self {
        Self {
            transport: Box::new(transport),
        }
    }

    /// Create a client that talks HTTP to `service_url`.
    pub fn http(service_url: &str, access_token: &str, timeout: Duration) -> Self {
        Self::new(HttpTransport::new(service_url, access_token, timeout))
    }

    fn send(&self, ctx: &CallContext, request: &Request) -> Result<Response> {
        let response = self.transport.send(ctx, request)?;
        if response.is_success() {
            Ok(response)
        } else {
            Err(Error::from_response(response.status, &response.body))
        }
    }

    pub(crate) fn get_json<T: DeserializeOwned>(&self, ctx: &CallContext, path: &str) -> Result<T> {
        let response = self.send(ctx, &Request::get(path))?;
        Ok(serde_json::from_str(&response.body)?)
    }

    /// GET that maps 404 to `None`.
    pub(crate) fn get_optional<T: DeserializeOwned>(
        &self,
        ctx: &CallContext,
        path: &str,
    ) -> Result<Option<T>> {
        match self.get_json(ctx, path) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.status() == Some(404) => {
                log::debug!("GET {path} -> not found");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    pub(crate) fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        ctx: &CallContext,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let response = self.send(ctx, &Request::post(path, serde_json::to_value(body)?))?;
        Ok(serde_json::from_str(&response.body)?)
    }

    pub(crate) fn post_unit<B: Serialize>(&self, ctx: &CallContext, path: &str, body: &B) -> Result<()> {
        self.send(ctx, &Request::post(path, serde_json::to_value(body)?))?;
        Ok(())
    }

    pub(crate) fn patch_json<B: Serialize, T: DeserializeOwned>(
        &self,
        ctx: &CallContext,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let response = self.send(ctx, &Request::patch(path, serde_json::to_value(body)?))?;
        Ok(serde_json::from_str(&response.body)?)
    }

    pub(crate) fn patch_unit<B: Serialize>(&self, ctx: &CallContext, path: &str, body: &B) -> Result<()> {
        self.send(ctx, &Request::patch(path, serde_json::to_value(body)?))?;
        Ok(())
    }

    pub(crate) fn delete(&self, ctx: &CallContext, path: &str) -> Result<()> {
        self.send(ctx, &Request::delete(path))?;
        Ok(())
    }
}

/// Base the relative paths are built against; only its path is kept.
const PATH_BASE: &str = "http://localhost/";

/// Join segments into a relative path, percent-encoding each one.
pub(crate) fn path(segments: &[&str]) -> Result<String> {
    let mut url = Url::parse(PATH_BASE)?;
    url.path_segments_mut()
        .map_err(|()| Error::InvalidArgument(format!("{PATH_BASE} cannot carry a path")))?
        .clear()
        .extend(segments);
    Ok(url.path().trim_start_matches('/').to_string())
}
