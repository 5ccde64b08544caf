//! The remote fetch capability used for both catalogs and book content.
use crate::error::FetchError;
use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use log::debug;

pub type ByteStream = BoxStream<'static, Result<Vec<u8>, FetchError>>;

#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Opens `url` and yields its body in chunks. Non-success responses fail
    /// before any chunk is produced.
    async fn open(&self, url: &str) -> Result<ByteStream, FetchError>;

    /// Fetches the whole body of `url` into memory.
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let mut stream = self.open(url).await?;
        let mut body = Vec::new();
        while let Some(chunk) = stream.next().await {
            body.extend_from_slice(&chunk?);
        }
        Ok(body)
    }
}

pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| FetchError::transport("", e))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn open(&self, url: &str) -> Result<ByteStream, FetchError> {
        debug!("GET {}", url);
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::transport(url, e))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::status(
                url,
                status.as_u16(),
                status.canonical_reason().unwrap_or(""),
            ));
        }

        let owned_url = url.to_string();
        let stream = resp.bytes_stream().map(move |chunk| {
            chunk
                .map(|bytes| bytes.to_vec())
                .map_err(|e| FetchError::transport(&owned_url, e))
        });
        Ok(stream.boxed())
    }
}
