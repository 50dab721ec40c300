use reqwest::Client;
use std::time::Duration;

use crate::error::{Error, Result};

/// Download a remote file in full.
///
/// Connection and timeout failures are retried with a linear backoff, up to
/// `max_retry` attempts. Any other failure, including a non-success status,
/// is returned immediately.
pub async fn fetch_bytes(client: &Client, url: &str, max_retry: u32) -> Result<Vec<u8>> {
    let mut retry_count = 0;

    loop {
        let result = client.get(url).send().await;

        match result {
            Ok(resp) => {
                let resp = resp.error_for_status()?;
                let bytes = resp.bytes().await?;
                tracing::debug!(url, len = bytes.len(), "fetched remote file");
                return Ok(bytes.to_vec());
            }
            Err(e) if e.is_timeout() || e.is_connect() => {
                retry_count += 1;
                if retry_count >= max_retry {
                    return Err(Error::Http(e));
                }
                tracing::warn!(
                    "Connection error, retry {}/{}: {}",
                    retry_count,
                    max_retry,
                    e
                );
                tokio::time::sleep(Duration::from_millis(500 * retry_count as u64)).await;
            }
            Err(e) => return Err(e.into()),
        }
    }
}
