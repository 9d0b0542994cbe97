use crate::Result;
use camino::Utf8Path;
use futures_util::StreamExt;
use ohno::{IntoAppError, bail};
use tokio::io::AsyncWriteExt;
use url::Url;

/// Log target for downloads
const LOG_TARGET: &str = "     fetch";

const USER_AGENT: &str = concat!("opendata-pg/", env!("CARGO_PKG_VERSION"));

/// Download one source archive into the download directory.
///
/// An already-present archive is left alone, so re-running `fetch` is cheap.
/// The body is streamed to a `.part` file that is renamed into place only
/// once the download completes, so an interrupted run never leaves a
/// truncated archive behind.
pub async fn download(url: &str, dest: &Utf8Path) -> Result<()> {
    if dest.exists() {
        log::info!(target: LOG_TARGET, "'{dest}' already present, skipping download");
        return Ok(());
    }

    let url = Url::parse(url).into_app_err_with(|| format!("invalid source URL '{url}'"))?;
    log::info!(target: LOG_TARGET, "downloading {url} to '{dest}'");

    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .into_app_err_with(|| format!("could not create download directory '{parent}'"))?;
    }

    let response = reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .build()
        .into_app_err("unable to create HTTP client")?
        .get(url.clone())
        .send()
        .await
        .into_app_err_with(|| format!("unable to start downloading {url}"))?;

    if !response.status().is_success() {
        bail!("unable to download {url}: HTTP {}", response.status());
    }

    let part_path = dest.with_extension(format!("{}.part", dest.extension().unwrap_or_default()));
    let mut file = tokio::fs::File::create(&part_path)
        .await
        .into_app_err_with(|| format!("could not create '{part_path}'"))?;

    let mut downloaded: u64 = 0;
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.into_app_err_with(|| format!("error while downloading {url}"))?;
        downloaded += chunk.len() as u64;
        file.write_all(&chunk)
            .await
            .into_app_err_with(|| format!("could not write to '{part_path}'"))?;
    }

    file.flush().await.into_app_err_with(|| format!("could not flush '{part_path}'"))?;
    drop(file);

    tokio::fs::rename(&part_path, dest)
        .await
        .into_app_err_with(|| format!("could not move '{part_path}' into place"))?;

    log::info!(target: LOG_TARGET, "downloaded {} MB to '{dest}'", downloaded / (1024 * 1024));
    Ok(())
}
