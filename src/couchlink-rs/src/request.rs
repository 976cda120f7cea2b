use crate::{ClientError, Result};
use reqwest::header::{CONTENT_TYPE, COOKIE};
use reqwest::{Client as HttpClient, Method, Request, Url};
use serde::Serialize;
use std::time::Duration;

enum Body {
    Empty,
    Json(Vec<u8>),
    Form(Vec<(String, String)>),
}

/// Method, URL, body and deadline of a request that has not been sent yet.
///
/// The session cookie is only attached in [`RequestSpec::build`], after the
/// caller has had a chance to authenticate.
pub(crate) struct RequestSpec {
    method: Method,
    url: Url,
    body: Body,
    timeout: Option<Duration>,
}

impl RequestSpec {
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            body: Body::Empty,
            timeout: None,
        }
    }

    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self> {
        self.body = Body::Json(serde_json::to_vec(body)?);
        Ok(self)
    }

    pub fn form(mut self, pairs: Vec<(String, String)>) -> Self {
        self.body = Body::Form(pairs);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn build(
        self,
        http: &HttpClient,
        cookie: Option<&str>,
    ) -> std::result::Result<Request, reqwest::Error> {
        let mut builder = http.request(self.method, self.url);

        if let Some(cookie) = cookie {
            builder = builder.header(COOKIE, cookie);
        }

        builder = match self.body {
            Body::Empty => builder,
            Body::Json(bytes) => builder.header(CONTENT_TYPE, "application/json").body(bytes),
            Body::Form(pairs) => builder.form(&pairs),
        };

        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }

        builder.build()
    }
}

/// Joins `segments` onto `base_url` with `/` and appends the query pairs,
/// percent-encoded, only when there are any.
pub(crate) fn endpoint(base_url: &str, segments: &[&str], query: &[(&str, &str)]) -> Result<Url> {
    let mut raw = base_url.trim_end_matches('/').to_string();
    for segment in segments {
        raw.push('/');
        raw.push_str(segment);
    }

    let mut url = Url::parse(&raw).map_err(|e| ClientError::InvalidUrl(format!("{raw}: {e}")))?;
    if !query.is_empty() {
        url.query_pairs_mut().extend_pairs(query);
    }
    Ok(url)
}
