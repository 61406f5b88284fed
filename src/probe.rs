/// One-shot byte-range capability check.
///
/// Asks for the first two bytes of the resource and reports whether the
/// server answered with 206 Partial Content. The result is informational;
/// the monitor always fetches full snapshots.
use crate::fetch::{FetchError, RangeFetch};

const PARTIAL_CONTENT: u16 = 206;

pub async fn supports_partial_content<R: RangeFetch>(
    fetcher: &R,
    verbose: bool,
) -> Result<bool, FetchError> {
    let response = fetcher.fetch_range(0, 1).await?;

    if verbose {
        tracing::info!(status = response.status, "range probe response");
        for (name, value) in &response.headers {
            tracing::info!("{name} : {value}");
        }
    }

    let supported = response.status == PARTIAL_CONTENT;
    if supported {
        tracing::info!("byte ranges available");
    } else {
        tracing::info!(status = response.status, "byte ranges NOT available");
    }
    Ok(supported)
}
