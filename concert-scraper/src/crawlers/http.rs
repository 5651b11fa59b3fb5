use std::time::Duration;

use rand::Rng;
use reqwest::Client;
use tracing::warn;

const MAX_ATTEMPTS: u32 = 3;
const BASE_BACKOFF: Duration = Duration::from_secs(1);
const MIN_BACKOFF: Duration = Duration::from_secs(2);
const MAX_BACKOFF: Duration = Duration::from_secs(10);

/// Browser-shaped GET with Korean locale headers and bounded retry on
/// transient failures only. Never retries 4xx or parse errors — those are
/// the crawler's problem, not the network's.
pub async fn fetch_html(client: &Client, url: &str) -> Option<String> {
    let mut attempt = 0u32;
    loop {
        attempt += 1;
        let result = client
            .get(url)
            .header(
                "User-Agent",
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
            )
            .header("Accept-Language", "ko-KR,ko;q=0.9,en-US;q=0.8,en;q=0.7")
            .timeout(Duration::from_secs(15))
            .send()
            .await;

        match result {
            Ok(resp) if resp.status().is_success() => {
                return resp.text().await.ok();
            }
            Ok(resp) if resp.status().is_server_error() && attempt < MAX_ATTEMPTS => {
                warn!(status = %resp.status(), %url, attempt, "transient HTTP error, retrying");
                sleep_backoff(attempt).await;
            }
            Ok(resp) => {
                warn!(status = %resp.status(), %url, "non-2xx response, giving up");
                return None;
            }
            Err(e) if is_connect_error(&e) && attempt < MAX_ATTEMPTS => {
                warn!(error = %e, %url, attempt, "connect error, retrying");
                sleep_backoff(attempt).await;
            }
            Err(e) => {
                warn!(error = %e, %url, "request failed, giving up");
                return None;
            }
        }
    }
}

fn is_connect_error(e: &reqwest::Error) -> bool {
    e.is_connect() || e.is_timeout()
}

async fn sleep_backoff(attempt: u32) {
    let exp = BASE_BACKOFF * 2u32.pow(attempt - 1);
    let bounded = exp.clamp(MIN_BACKOFF, MAX_BACKOFF);
    let jitter_ms = rand::thread_rng().gen_range(0..250);
    tokio::time::sleep(bounded + Duration::from_millis(jitter_ms)).await;
}
