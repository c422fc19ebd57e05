use std::path::PathBuf;
use trackcore::device::{decode_batch, DeviceReading};
use trackcore::plan::{load_map, MapBundle};

pub async fn fetch_devices(
    client: reqwest::Client,
    url: String,
) -> Result<Vec<DeviceReading>, String> {
    let response = client
        .get(&url)
        .send()
        .await
        .and_then(|response| response.error_for_status())
        .map_err(|e| e.to_string())?;
    let body = response.bytes().await.map_err(|e| e.to_string())?;
    decode_batch(&body).map_err(|e| e.to_string())
}

/// Fire-and-forget session signal (`/start`, `/record/start`, `/record/stop`).
pub async fn post_signal(client: reqwest::Client, url: String) -> Result<String, String> {
    let response = client.post(&url).send().await.map_err(|e| e.to_string())?;
    if response.status().is_success() {
        Ok(format!("{} acknowledged", url))
    } else {
        let status = response.status();
        let text = response.text().await.unwrap_or_else(|_| "".into());
        Err(format!("{}: {}", status, text))
    }
}

pub async fn read_map(path: PathBuf) -> Result<MapBundle, String> {
    tokio::task::spawn_blocking(move || load_map(&path))
        .await
        .map_err(|e| e.to_string())?
        .map_err(|e| e.to_string())
}
