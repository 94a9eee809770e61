//! W3C WebDriver implementation of [`Surface`].
//!
//! Speaks the WebDriver wire protocol over HTTP against a chromedriver-style
//! endpoint. Downloads are intercepted by pointing the browser's download
//! directory at a known location and watching it for a new, fully-written
//! file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::time::Instant;

use super::{BoundingBox, ElementHandle, Surface, SurfaceError};

/// W3C element identifier key in protocol payloads.
const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

/// Interval between element-presence checks inside `wait_for`.
const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Interval between download-directory scans.
const DOWNLOAD_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Per-request HTTP timeout. Long enough for slow page loads.
const HTTP_TIMEOUT: Duration = Duration::from_secs(180);

/// Extensions of in-flight browser downloads, skipped while scanning.
const PARTIAL_EXTENSIONS: &[&str] = &["crdownload", "part", "tmp"];

#[derive(Debug, Deserialize)]
struct WdResponse<T> {
    value: T,
}

#[derive(Debug, Deserialize)]
struct WdErrorBody {
    error: String,
    message: String,
}

#[derive(Debug, Deserialize)]
struct WdRect {
    x: f64,
    y: f64,
    width: f64,
    height: f64,
}

/// A live WebDriver session against the remote editor.
pub struct WebDriverSurface {
    http: reqwest::Client,
    session_url: String,
    session_id: String,
    download_dir: PathBuf,
}

impl WebDriverSurface {
    /// Start a new session on `endpoint`, configuring the browser to write
    /// native downloads into `download_dir`.
    pub async fn connect(
        endpoint: &str,
        download_dir: &Path,
        page_load_timeout: Duration,
    ) -> Result<Self, SurfaceError> {
        std::fs::create_dir_all(download_dir)?;

        let http = reqwest::Client::builder().timeout(HTTP_TIMEOUT).build()?;

        let capabilities = json!({
            "capabilities": {
                "alwaysMatch": {
                    "goog:chromeOptions": {
                        "prefs": {
                            "download.default_directory": download_dir.display().to_string(),
                            "download.prompt_for_download": false
                        }
                    }
                }
            }
        });

        let response = http
            .post(format!("{}/session", endpoint.trim_end_matches('/')))
            .json(&capabilities)
            .send()
            .await?;
        let body: WdResponse<Value> = Self::decode(response).await?;
        let session_id = body
            .value
            .get("sessionId")
            .and_then(Value::as_str)
            .ok_or_else(|| SurfaceError::Protocol("session response lacks sessionId".into()))?
            .to_string();

        let surface = Self {
            http,
            session_url: format!(
                "{}/session/{}",
                endpoint.trim_end_matches('/'),
                session_id
            ),
            session_id,
            download_dir: download_dir.to_path_buf(),
        };

        surface
            .post::<Value>(
                "timeouts",
                json!({ "pageLoad": page_load_timeout.as_millis() as u64 }),
            )
            .await?;

        Ok(surface)
    }

    /// Session id of the underlying WebDriver session.
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// End the session. The browser stays alive only if the driver keeps it.
    pub async fn close(self) -> Result<(), SurfaceError> {
        let response = self.http.delete(&self.session_url).send().await?;
        Self::decode::<Value>(response).await?;
        Ok(())
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, SurfaceError> {
        let status = response.status();
        let bytes = response.bytes().await?;

        if status.is_success() {
            let body: WdResponse<T> = serde_json::from_slice(&bytes)
                .map_err(|e| SurfaceError::Protocol(format!("malformed response: {}", e)))?;
            return Ok(body.value);
        }

        match serde_json::from_slice::<WdResponse<WdErrorBody>>(&bytes) {
            Ok(body) if body.value.error == "stale element reference" => Err(SurfaceError::Stale),
            Ok(body) => Err(SurfaceError::Protocol(format!(
                "{}: {}",
                body.value.error, body.value.message
            ))),
            Err(_) => Err(SurfaceError::Protocol(format!(
                "unexpected status {}",
                status
            ))),
        }
    }

    async fn post<T: DeserializeOwned>(&self, path: &str, body: Value) -> Result<T, SurfaceError> {
        let response = self
            .http
            .post(format!("{}/{}", self.session_url, path))
            .json(&body)
            .send()
            .await?;
        Self::decode(response).await
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, SurfaceError> {
        let response = self
            .http
            .get(format!("{}/{}", self.session_url, path))
            .send()
            .await?;
        Self::decode(response).await
    }

    fn handles_from(values: Vec<Value>) -> Vec<ElementHandle> {
        values
            .into_iter()
            .filter_map(|v| {
                v.get(ELEMENT_KEY)
                    .and_then(Value::as_str)
                    .map(|id| ElementHandle(id.to_string()))
            })
            .collect()
    }

    fn element_arg(element: &ElementHandle) -> Value {
        json!({ ELEMENT_KEY: element.0 })
    }

    fn is_partial(path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| PARTIAL_EXTENSIONS.iter().any(|p| e.eq_ignore_ascii_case(p)))
            .unwrap_or(false)
    }

    /// Newest non-partial file in the download directory created after
    /// `since`, if any.
    fn scan_downloads(&self, since: std::time::SystemTime) -> Option<PathBuf> {
        let entries = std::fs::read_dir(&self.download_dir).ok()?;
        let mut newest: Option<(std::time::SystemTime, PathBuf)> = None;
        for entry in entries.flatten() {
            let path = entry.path();
            if !path.is_file() || Self::is_partial(&path) {
                continue;
            }
            let Some(modified) = entry.metadata().ok().and_then(|m| m.modified().ok()) else {
                continue;
            };
            if modified < since {
                continue;
            }
            if newest.as_ref().map(|(t, _)| modified > *t).unwrap_or(true) {
                newest = Some((modified, path));
            }
        }
        newest.map(|(_, path)| path)
    }
}

#[async_trait]
impl Surface for WebDriverSurface {
    async fn goto(&self, url: &str) -> Result<(), SurfaceError> {
        self.post::<Value>("url", json!({ "url": url }))
            .await
            .map_err(|e| SurfaceError::Navigation(e.to_string()))?;
        Ok(())
    }

    async fn wait_for(
        &self,
        selector: &str,
        timeout: Duration,
    ) -> Result<ElementHandle, SurfaceError> {
        let deadline = Instant::now() + timeout;
        loop {
            let matches = self.query_all(selector).await?;
            if let Some(first) = matches.into_iter().next() {
                return Ok(first);
            }
            if Instant::now() + WAIT_POLL_INTERVAL > deadline {
                return Err(SurfaceError::WaitTimeout {
                    selector: selector.to_string(),
                    timeout,
                });
            }
            tokio::time::sleep(WAIT_POLL_INTERVAL).await;
        }
    }

    async fn query_all(&self, selector: &str) -> Result<Vec<ElementHandle>, SurfaceError> {
        let values: Vec<Value> = self
            .post(
                "elements",
                json!({ "using": "css selector", "value": selector }),
            )
            .await?;
        Ok(Self::handles_from(values))
    }

    async fn query_within(
        &self,
        element: &ElementHandle,
        selector: &str,
    ) -> Result<Option<ElementHandle>, SurfaceError> {
        let values: Vec<Value> = self
            .post(
                &format!("element/{}/elements", element.0),
                json!({ "using": "css selector", "value": selector }),
            )
            .await?;
        Ok(Self::handles_from(values).into_iter().next())
    }

    async fn text(&self, element: &ElementHandle) -> Result<String, SurfaceError> {
        self.get(&format!("element/{}/text", element.0)).await
    }

    async fn attribute(
        &self,
        element: &ElementHandle,
        name: &str,
    ) -> Result<Option<String>, SurfaceError> {
        self.get(&format!("element/{}/attribute/{}", element.0, name))
            .await
    }

    async fn click(&self, element: &ElementHandle) -> Result<(), SurfaceError> {
        match self
            .post::<Value>(&format!("element/{}/click", element.0), json!({}))
            .await
        {
            Ok(_) => Ok(()),
            Err(SurfaceError::Stale) => Err(SurfaceError::Stale),
            Err(e) => Err(SurfaceError::Click(e.to_string())),
        }
    }

    async fn bounding_box(
        &self,
        element: &ElementHandle,
    ) -> Result<Option<BoundingBox>, SurfaceError> {
        match self
            .get::<WdRect>(&format!("element/{}/rect", element.0))
            .await
        {
            Ok(rect) => Ok(Some(BoundingBox {
                x: rect.x,
                y: rect.y,
                width: rect.width,
                height: rect.height,
            })),
            Err(SurfaceError::Stale) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn drag(
        &self,
        from: (f64, f64),
        to: (f64, f64),
        steps: u32,
    ) -> Result<(), SurfaceError> {
        let steps = steps.max(1);
        let mut actions = vec![
            json!({ "type": "pointerMove", "duration": 0,
                    "x": from.0 as i64, "y": from.1 as i64 }),
            json!({ "type": "pointerDown", "button": 0 }),
        ];
        for i in 1..=steps {
            let t = f64::from(i) / f64::from(steps);
            let x = from.0 + (to.0 - from.0) * t;
            let y = from.1 + (to.1 - from.1) * t;
            actions.push(json!({ "type": "pointerMove", "duration": 20,
                                 "x": x as i64, "y": y as i64 }));
        }
        actions.push(json!({ "type": "pointerUp", "button": 0 }));

        let body = json!({
            "actions": [{
                "type": "pointer",
                "id": "mouse",
                "parameters": { "pointerType": "mouse" },
                "actions": actions
            }]
        });

        self.post::<Value>("actions", body)
            .await
            .map_err(|e| SurfaceError::Pointer(e.to_string()))?;
        Ok(())
    }

    async fn eval(&self, script: &str) -> Result<Value, SurfaceError> {
        match self
            .post::<Value>(
                "execute/sync",
                json!({ "script": script, "args": [] }),
            )
            .await
        {
            Ok(value) => Ok(value),
            Err(SurfaceError::Stale) => Err(SurfaceError::Stale),
            Err(e) => Err(SurfaceError::Script(e.to_string())),
        }
    }

    async fn eval_on(
        &self,
        element: &ElementHandle,
        script: &str,
    ) -> Result<Value, SurfaceError> {
        match self
            .post::<Value>(
                "execute/sync",
                json!({ "script": script, "args": [Self::element_arg(element)] }),
            )
            .await
        {
            Ok(value) => Ok(value),
            Err(SurfaceError::Stale) => Err(SurfaceError::Stale),
            Err(e) => Err(SurfaceError::Script(e.to_string())),
        }
    }

    async fn wait_for_download(&self, timeout: Duration) -> Result<PathBuf, SurfaceError> {
        let since = std::time::SystemTime::now();
        let deadline = Instant::now() + timeout;
        let mut candidate: Option<(PathBuf, u64)> = None;

        loop {
            if let Some(path) = self.scan_downloads(since) {
                let size = std::fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
                match candidate.take() {
                    // Same file, size stable across two scans: done writing.
                    Some((prev, prev_size)) if prev == path && prev_size == size && size > 0 => {
                        return Ok(path);
                    }
                    _ => candidate = Some((path, size)),
                }
            }
            if Instant::now() + DOWNLOAD_POLL_INTERVAL > deadline {
                return Err(SurfaceError::DownloadTimeout(timeout));
            }
            tokio::time::sleep(DOWNLOAD_POLL_INTERVAL).await;
        }
    }
}
