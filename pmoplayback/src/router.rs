//! Stream routing: which engine plays a URL, and at which canonical address.

use async_trait::async_trait;
use tracing::debug;
use url::Url;

use crate::errors::PlaybackError;
use crate::model::{Engine, StreamRoute};

/// URL schemes a session accepts.
pub const SUPPORTED_SCHEMES: [&str; 5] = ["http", "https", "rtsp", "rtmp", "mms"];

/// Returns true when `candidate` parses and uses a supported scheme.
pub fn is_supported_url(candidate: &str) -> bool {
    match Url::parse(candidate.trim()) {
        Ok(url) => SUPPORTED_SCHEMES.contains(&url.scheme()),
        Err(_) => false,
    }
}

/// Resolves a candidate URL into a route. Single-shot, keeps no state.
#[async_trait]
pub trait StreamRouter: Send + Sync {
    async fn resolve(&self, url: &str) -> Result<StreamRoute, PlaybackError>;
}

/// Extensions the primary engine cannot open and the alternate engine handles.
const ALTERNATE_EXTENSIONS: [&str; 8] = ["ts", "mkv", "avi", "flv", "wmv", "mpg", "mpeg", "webm"];

/// Router deciding from the scheme and the path extension alone.
#[derive(Debug, Clone, Default)]
pub struct ExtensionRouter;

impl ExtensionRouter {
    pub fn new() -> Self {
        Self
    }

    /// Pure routing decision, shared by the async trait implementation.
    pub fn route(&self, candidate: &str) -> Result<StreamRoute, PlaybackError> {
        let url = Url::parse(candidate.trim())
            .map_err(|err| PlaybackError::UnsupportedUrl(format!("{candidate}: {err}")))?;

        let scheme = url.scheme();
        if !SUPPORTED_SCHEMES.contains(&scheme) {
            return Err(PlaybackError::UnsupportedUrl(candidate.to_string()));
        }

        let (engine, reason) = if matches!(scheme, "rtsp" | "rtmp" | "mms") {
            (
                Engine::Alternate,
                format!("{scheme} streams need the alternate engine"),
            )
        } else {
            let extension = url
                .path_segments()
                .and_then(|segments| segments.last())
                .and_then(|last| last.rsplit_once('.'))
                .map(|(_, ext)| ext.to_ascii_lowercase());

            match extension {
                Some(ext) if ALTERNATE_EXTENSIONS.contains(&ext.as_str()) => (
                    Engine::Alternate,
                    format!(".{ext} container is not supported natively"),
                ),
                Some(ext) => (Engine::Primary, format!(".{ext} is played natively")),
                None => (
                    Engine::Primary,
                    "no extension, trying the native engine".to_string(),
                ),
            }
        };

        debug!(url = %url, %engine, %reason, "Stream routed");
        Ok(StreamRoute {
            engine,
            url: url.to_string(),
            reason,
        })
    }
}

#[async_trait]
impl StreamRouter for ExtensionRouter {
    async fn resolve(&self, url: &str) -> Result<StreamRoute, PlaybackError> {
        self.route(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supported_schemes() {
        assert!(is_supported_url("http://host/live.m3u8"));
        assert!(is_supported_url("  https://host/movie.mp4 "));
        assert!(is_supported_url("rtsp://cam.local/stream"));
        assert!(is_supported_url("rtmp://host/app/key"));
        assert!(is_supported_url("mms://host/stream"));
        assert!(!is_supported_url("ftp://x/y"));
        assert!(!is_supported_url("file:///tmp/movie.mp4"));
        assert!(!is_supported_url("not a url"));
        assert!(!is_supported_url(""));
    }

    #[test]
    fn test_route_by_extension() {
        let router = ExtensionRouter::new();

        let route = router.route("http://host/live/1/2/3.m3u8").unwrap();
        assert_eq!(route.engine, Engine::Primary);

        let route = router.route("http://host/live/1/2/3.ts").unwrap();
        assert_eq!(route.engine, Engine::Alternate);

        let route = router.route("http://host/movie/1/2/3.MKV").unwrap();
        assert_eq!(route.engine, Engine::Alternate);

        let route = router.route("http://host:8080/1/2/3").unwrap();
        assert_eq!(route.engine, Engine::Primary);
        assert_eq!(route.url, "http://host:8080/1/2/3");
    }

    #[test]
    fn test_route_by_scheme() {
        let route = ExtensionRouter::new().route("rtsp://cam.local/stream.mp4").unwrap();
        assert_eq!(route.engine, Engine::Alternate);
        assert!(route.reason.contains("rtsp"));
    }

    #[test]
    fn test_route_rejects_unsupported() {
        assert!(matches!(
            ExtensionRouter::new().route("ftp://x/y"),
            Err(PlaybackError::UnsupportedUrl(_))
        ));
    }

    #[tokio::test]
    async fn test_resolve_trims() {
        let route = ExtensionRouter::new()
            .resolve(" http://host/a.mp4\n")
            .await
            .unwrap();
        assert_eq!(route.url, "http://host/a.mp4");
    }
}
