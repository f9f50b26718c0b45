// SPDX-FileCopyrightText: 2026 Fieldops Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Low-level HTTP plumbing for the ERP API.
//!
//! [`ErpHttp`] owns the `reqwest` client, builds URLs under the configured
//! base, and turns every failure into [`FieldopsError::Erp`] (or
//! [`FieldopsError::Timeout`]) so callers only see one error shape.

use std::time::Duration;

use fieldops_core::FieldopsError;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use reqwest::{Method, StatusCode, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

/// Largest response body kept on an error, in bytes.
const MAX_ERROR_BODY: usize = 2048;

#[derive(Debug, Clone)]
pub struct ErpHttp {
    client: reqwest::Client,
    base_url: Url,
    timeout: Duration,
}

/// Outcome of a lookup that may legitimately find nothing.
pub(crate) enum Lookup<T> {
    Found(T),
    Missing,
}

impl ErpHttp {
    pub fn new(
        base_url: &str,
        api_token: Option<&str>,
        timeout: Duration,
    ) -> Result<Self, FieldopsError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| FieldopsError::Config(format!("invalid erp.base_url {base_url:?}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(FieldopsError::Config(format!(
                "erp.base_url {base_url} cannot carry paths"
            )));
        }

        let mut headers = HeaderMap::new();
        if let Some(token) = api_token {
            let mut value = HeaderValue::from_str(&format!("Bearer {token}")).map_err(|e| {
                FieldopsError::Config(format!("invalid erp.api_token header value: {e}"))
            })?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| FieldopsError::Erp {
                status: None,
                message: format!("failed to build HTTP client: {e}"),
                body: None,
            })?;

        Ok(Self {
            client,
            base_url,
            timeout,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// `base_url` with `segments` appended, each percent-encoded.
    pub fn url(&self, segments: &[&str], query: &[(&str, &str)]) -> Result<Url, FieldopsError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| FieldopsError::Config(format!("erp.base_url {} cannot carry paths", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }

    pub async fn get<T: DeserializeOwned>(&self, url: Url) -> Result<T, FieldopsError> {
        let response = self.send(Method::GET, url, None::<&()>).await?;
        decode(response).await
    }

    /// GET where a 404 means "no such entity" rather than a failure.
    pub(crate) async fn lookup<T: DeserializeOwned>(
        &self,
        url: Url,
    ) -> Result<Lookup<T>, FieldopsError> {
        match self.send(Method::GET, url, None::<&()>).await {
            Ok(response) => decode(response).await.map(Lookup::Found),
            Err(FieldopsError::Erp {
                status: Some(404), ..
            }) => Ok(Lookup::Missing),
            Err(e) => Err(e),
        }
    }

    pub async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        url: Url,
        body: &B,
    ) -> Result<T, FieldopsError> {
        let response = self.send(Method::POST, url, Some(body)).await?;
        decode(response).await
    }

    /// POST whose response body is ignored.
    pub async fn post_unit<B: Serialize + ?Sized>(
        &self,
        url: Url,
        body: &B,
    ) -> Result<(), FieldopsError> {
        self.send(Method::POST, url, Some(body)).await.map(|_| ())
    }

    /// Plain GET used by health checks. Returns the status without judging it.
    pub async fn status_of(&self, url: Url) -> Result<StatusCode, FieldopsError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| self.network_error(e))?;
        Ok(response.status())
    }

    async fn send<B: Serialize + ?Sized>(
        &self,
        method: Method,
        url: Url,
        body: Option<&B>,
    ) -> Result<reqwest::Response, FieldopsError> {
        debug!(%method, path = url.path(), "erp request");
        let mut request = self.client.request(method.clone(), url.clone());
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = request.send().await.map_err(|e| self.network_error(e))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let mut body = response.text().await.unwrap_or_default();
        if body.len() > MAX_ERROR_BODY {
            let mut cut = MAX_ERROR_BODY;
            while !body.is_char_boundary(cut) {
                cut -= 1;
            }
            body.truncate(cut);
        }
        if status != StatusCode::NOT_FOUND {
            warn!(%method, path = url.path(), status = status.as_u16(), "erp returned an error status");
        }
        Err(FieldopsError::Erp {
            status: Some(status.as_u16()),
            message: format!("{method} {} returned {status}", url.path()),
            body: (!body.is_empty()).then_some(body),
        })
    }

    fn network_error(&self, e: reqwest::Error) -> FieldopsError {
        if e.is_timeout() {
            return FieldopsError::Timeout {
                duration: self.timeout,
            };
        }
        FieldopsError::Erp {
            status: None,
            message: format!("HTTP request failed: {e}"),
            body: None,
        }
    }
}

async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, FieldopsError> {
    let status = response.status();
    let text = response.text().await.map_err(|e| FieldopsError::Erp {
        status: Some(status.as_u16()),
        message: format!("failed to read response body: {e}"),
        body: None,
    })?;
    serde_json::from_str(&text).map_err(|e| FieldopsError::Erp {
        status: Some(status.as_u16()),
        message: format!("failed to parse erp response: {e}"),
        body: Some(text),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn http(base: &str) -> ErpHttp {
        ErpHttp::new(base, Some("secret"), Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn url_appends_encoded_segments() {
        let erp = http("https://erp.example.com/api/");
        let url = erp.url(&["clientes", "C 01/x"], &[]).unwrap();
        assert_eq!(url.as_str(), "https://erp.example.com/api/clientes/C%2001%2Fx");
    }

    #[test]
    fn url_without_trailing_slash() {
        let erp = http("https://erp.example.com/api");
        let url = erp
            .url(&["chamados"], &[("status", "aberto"), ("cliente", "C001")])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://erp.example.com/api/chamados?status=aberto&cliente=C001"
        );
    }

    #[test]
    fn rejects_unusable_base_urls() {
        assert!(matches!(
            ErpHttp::new("not a url", None, Duration::from_secs(1)),
            Err(FieldopsError::Config(_))
        ));
        assert!(matches!(
            ErpHttp::new("mailto:erp@example.com", None, Duration::from_secs(1)),
            Err(FieldopsError::Config(_))
        ));
    }
}
