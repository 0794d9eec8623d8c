use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use bytes::Bytes;
use futures_util::stream::Stream;
use reqwest::{Client, Response, StatusCode};
use serde::{de::DeserializeOwned, Serialize};

use crate::config::HttpCfg;
use crate::error::{CoreResult, SummaryError};

/// A boxed stream of raw body chunks, one item per transport read.
pub type ByteStream = Pin<Box<dyn Stream<Item = CoreResult<Bytes>> + Send>>;

/// A boxed stream of `\n`-separated body lines (terminator stripped).
pub type LineStreamBox = Pin<Box<dyn Stream<Item = CoreResult<String>> + Send>>;

/// Thin wrapper around reqwest::Client with defaults and helpers.
#[derive(Debug, Clone)]
pub struct HttpClient {
    inner: Client,
    user_agent: String,
}

impl HttpClient {
    pub fn new(cfg: &HttpCfg) -> CoreResult<Self> {
        let mut builder = Client::builder().connect_timeout(Duration::from_millis(cfg.connect_timeout_ms));
        if let Some(ms) = cfg.request_timeout_ms {
            builder = builder.timeout(Duration::from_millis(ms));
        }
        if let Some(n) = cfg.pool_max_idle_per_host {
            builder = builder.pool_max_idle_per_host(n);
        }
        let inner = builder
            .build()
            .map_err(|e| SummaryError::Other(anyhow::anyhow!("http client build failed: {e}")))?;
        Ok(Self {
            inner,
            user_agent: cfg.user_agent.clone(),
        })
    }

    pub fn new_default() -> CoreResult<Self> {
        Self::new(&HttpCfg::default())
    }

    /// POST a JSON body and hand back the raw response, whatever its status.
    /// Only transport failures are mapped here.
    pub async fn post<T: Serialize + ?Sized>(
        &self,
        provider: &str,
        url: &str,
        body: &T,
        headers: &[(&str, &str)],
    ) -> CoreResult<Response> {
        let mut req = self
            .inner
            .post(url)
            .json(body)
            .header("User-Agent", &self.user_agent);
        for (k, v) in headers {
            req = req.header(*k, *v);
        }

        req.send().await.map_err(|e| {
            tracing::debug!(provider, error = %e, "request send failed");
            SummaryError::Unavailable {
                provider: provider.to_string(),
            }
        })
    }

    /// POST JSON and decode the whole (2xx) response body as `R`.
    pub async fn post_json<T: Serialize + ?Sized, R: DeserializeOwned>(
        &self,
        provider: &str,
        url: &str,
        body: &T,
        headers: &[(&str, &str)],
    ) -> CoreResult<R> {
        let resp = self.post(provider, url, body, headers).await?;
        let resp = ensure_success(provider, resp).await?;
        resp.json::<R>()
            .await
            .map_err(|e| SummaryError::StreamDecode {
                provider: provider.to_string(),
                message: format!("json decode error: {e}"),
            })
    }

    /// POST JSON and return the (2xx) body as a stream of raw chunks.
    pub async fn post_stream<T: Serialize + ?Sized>(
        &self,
        provider: &str,
        url: &str,
        body: &T,
        headers: &[(&str, &str)],
    ) -> CoreResult<ByteStream> {
        let resp = self.post(provider, url, body, headers).await?;
        let resp = ensure_success(provider, resp).await?;

        let provider = provider.to_string();
        let stream = futures_util::StreamExt::map(resp.bytes_stream(), move |chunk| {
            chunk.map_err(|e| {
                tracing::debug!(provider = %provider, error = %e, "body read failed");
                SummaryError::Unavailable {
                    provider: provider.clone(),
                }
            })
        });
        Ok(Box::pin(stream))
    }
}

async fn ensure_success(provider: &str, resp: Response) -> CoreResult<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    tracing::warn!(provider, status = status.as_u16(), "upstream returned non-success status");
    Err(map_http_error(provider, status, &body))
}

fn map_http_error(provider: &str, status: StatusCode, body: &str) -> SummaryError {
    SummaryError::Upstream {
        provider: provider.to_string(),
        code: status.as_u16().to_string(),
        message: truncate(body, 300),
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() > max {
        let mut cut = max;
        while !s.is_char_boundary(cut) {
            cut -= 1;
        }
        let mut t = s[..cut].to_string();
        t.push_str("...");
        t
    } else {
        s.to_string()
    }
}

/// Incremental UTF-8 decoder: multi-byte sequences split across reads are
/// held back until the next chunk completes them.
#[derive(Debug, Default)]
pub struct Utf8Decoder {
    pending: Vec<u8>,
}

impl Utf8Decoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn decode(&mut self, chunk: &[u8]) -> String {
        self.pending.extend_from_slice(chunk);
        let mut out = String::new();
        let mut rest: &[u8] = &self.pending;
        loop {
            match std::str::from_utf8(rest) {
                Ok(s) => {
                    out.push_str(s);
                    rest = &[];
                    break;
                }
                Err(e) => {
                    let valid = e.valid_up_to();
                    out.push_str(std::str::from_utf8(&rest[..valid]).unwrap_or_default());
                    match e.error_len() {
                        Some(bad) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            rest = &rest[valid + bad..];
                        }
                        None => {
                            // incomplete sequence at the end, wait for more bytes
                            rest = &rest[valid..];
                            break;
                        }
                    }
                }
            }
        }
        let tail = rest.to_vec();
        self.pending = tail;
        out
    }

    /// Flush whatever is still pending (lossy).
    pub fn finish(&mut self) -> String {
        let tail = std::mem::take(&mut self.pending);
        String::from_utf8_lossy(&tail).into_owned()
    }
}

/// Line splitter over a byte stream; yields lines separated by `\n`.
/// `\r\n` endings are normalized and an unterminated tail is flushed at EOF.
pub struct LineStream {
    inner: ByteStream,
    buf: Vec<u8>,
    flushed_tail: bool,
}

impl LineStream {
    pub fn new(inner: ByteStream) -> Self {
        Self {
            inner,
            buf: Vec::new(),
            flushed_tail: false,
        }
    }

    pub fn boxed(inner: ByteStream) -> LineStreamBox {
        Box::pin(Self::new(inner))
    }
}

impl Stream for LineStream {
    type Item = CoreResult<String>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        loop {
            // If we already have a newline in the buffer, split and yield immediately.
            if let Some(idx) = self.buf.iter().position(|b| *b == b'\n') {
                let mut line: Vec<u8> = self.buf.drain(..=idx).collect();
                line.pop();
                if line.last() == Some(&b'\r') {
                    line.pop();
                }
                return Poll::Ready(Some(Ok(String::from_utf8_lossy(&line).into_owned())));
            }

            match self.inner.as_mut().poll_next(cx) {
                Poll::Ready(Some(Ok(chunk))) => {
                    self.buf.extend_from_slice(&chunk);
                    continue;
                }
                Poll::Ready(Some(Err(e))) => return Poll::Ready(Some(Err(e))),
                Poll::Ready(None) => {
                    if !self.flushed_tail && !self.buf.is_empty() {
                        self.flushed_tail = true;
                        let line = std::mem::take(&mut self.buf);
                        return Poll::Ready(Some(Ok(String::from_utf8_lossy(&line).into_owned())));
                    }
                    return Poll::Ready(None);
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}
