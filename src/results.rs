use std::path::{Path, PathBuf};

/// Pick a local file name for a result video URL. Falls back to a
/// timestamped name when the URL has no usable last segment.
pub fn video_file_name(url: &str) -> String {
    let last = url
        .split(['?', '#'])
        .next()
        .unwrap_or("")
        .rsplit('/')
        .next()
        .unwrap_or("");
    let safe: String = last
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
        .collect();

    if safe.is_empty() || safe.starts_with('.') || !safe.contains('.') {
        let now = chrono::Local::now();
        format!("analysis-{}.webm", now.format("%Y%m%d-%H%M%S"))
    } else {
        safe
    }
}

/// Stream the processed video at `url` into `dir`.
/// `on_progress(bytes_downloaded, total_bytes)`: total may be 0 if unknown.
pub async fn save_video<F>(
    client: &reqwest::Client,
    url: &str,
    dir: &Path,
    on_progress: F,
) -> Result<PathBuf, Box<dyn std::error::Error + Send + Sync>>
where
    F: Fn(u64, u64) + Send,
{
    use futures_util::StreamExt;
    use tokio::io::AsyncWriteExt;

    tokio::fs::create_dir_all(dir).await?;

    let response = client.get(url).send().await?.error_for_status()?;
    let total = response.content_length().unwrap_or(0);
    let mut downloaded: u64 = 0;

    let path = dir.join(video_file_name(url));
    let mut file = tokio::fs::File::create(&path).await?;
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await?;
        downloaded += chunk.len() as u64;
        on_progress(downloaded, total);
    }

    file.flush().await?;
    log::info!("Result video saved to {}", path.display());
    Ok(path)
}
