//! Downloading the release archive into scratch space.

use anyhow::{Context, Result};
use log::info;
use std::path::Path;

use crate::failure::{Failure, ensure_failure};
use crate::http::HttpClient;
use crate::runtime::Runtime;

/// Downloads the archive at `url` to `temp_path`. Network failures and
/// non-success HTTP statuses surface as [`Failure::Download`] carrying the
/// offending URL.
#[tracing::instrument(skip(runtime, temp_path, http_client))]
pub async fn download_file<R: Runtime>(
    runtime: &R,
    url: &str,
    temp_path: &Path,
    http_client: &HttpClient,
) -> Result<()> {
    info!("Downloading {}...", url);

    let temp_path = temp_path.to_path_buf();
    http_client
        .download_file(url, || {
            runtime
                .create_file(&temp_path)
                .with_context(|| format!("Failed to create temporary file at {:?}", temp_path))
        })
        .await
        .map_err(|e| {
            ensure_failure(e, |reason| Failure::Download {
                url: url.to_string(),
                reason,
            })
        })?;

    info!("Download complete.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::failure;
    use crate::runtime::MockRuntime;
    use reqwest::Client;

    #[test_log::test(tokio::test)]
    async fn test_download_file() {
        let mut server = mockito::Server::new_async().await;
        let url = server.url();

        let mock = server
            .mock("GET", "/test.file")
            .with_status(200)
            .with_body("test content")
            .create_async()
            .await;

        let mut runtime = MockRuntime::new();
        runtime
            .expect_create_file()
            .with(mockall::predicate::eq(Path::new("test.file").to_path_buf()))
            .returning(|_| Ok(Box::new(std::io::sink())));

        let temp_path = Path::new("test.file");
        let http_client = HttpClient::new(Client::new());

        let result = download_file(
            &runtime,
            &format!("{}/test.file", url),
            temp_path,
            &http_client,
        )
        .await;

        mock.assert_async().await;
        assert!(result.is_ok());
    }

    #[test_log::test(tokio::test)]
    async fn test_download_file_not_found_maps_to_download_failure() {
        let mut server = mockito::Server::new_async().await;
        let url = server.url();

        let mock = server
            .mock("GET", "/test.file")
            .with_status(404)
            .create_async()
            .await;

        // No expectations = strict mode (panics if any method called)
        let runtime = MockRuntime::new();

        let temp_path = Path::new("test.file");
        let http_client = HttpClient::new(Client::new());

        let result = download_file(
            &runtime,
            &format!("{}/test.file", url),
            temp_path,
            &http_client,
        )
        .await;

        mock.assert_async().await;
        let error = result.unwrap_err();
        assert_eq!(failure::exit_code(&error), 3);
        assert!(error.to_string().contains("/test.file"));
    }
}
