//! Local content server
//!
//! Serves the player page, the bridge script and the currently loaded file
//! on `127.0.0.1:<port>`. The egui shell drives it synchronously; the server
//! itself runs as a task on the shared tokio runtime.
//!
//! ```text
//! ContentServer::start ──► axum::serve ──► create_router
//!        │                      ▲
//!        └── stop ── CancellationToken (graceful shutdown + SSE streams)
//! ```

pub mod routes;
pub mod static_files;

use std::net::{Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;
use tokio::runtime::{Handle, RuntimeFlavor};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::bridge::{BridgeMessage, ContentBridge, EventBridge};
use crate::config::ServerConfig;
use crate::mapping::KeyIntent;
use routes::{create_router, ServerState};

/// Upper bound on waiting for a stopped server to give up its socket.
const STOP_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },

    #[error("Listener setup failed: {0}")]
    Io(#[from] std::io::Error),
}

struct RunningServer {
    local_addr: SocketAddr,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

pub struct ContentServer {
    config: ServerConfig,
    runtime: Handle,
    bridge: EventBridge,
    content: watch::Sender<Option<PathBuf>>,
    running: Option<RunningServer>,
    /// Task of the last stopped server, until it has let go of the listener.
    stopping: Option<JoinHandle<()>>,
}

impl ContentServer {
    pub fn new(config: ServerConfig, bridge: EventBridge, runtime: Handle) -> Self {
        let (content, _) = watch::channel(None);
        Self {
            config,
            runtime,
            bridge,
            content,
            running: None,
            stopping: None,
        }
    }

    /// Binds the loopback socket and spawns the server. A second call while
    /// running returns the existing address.
    pub fn start(&mut self) -> Result<SocketAddr, ServerError> {
        if let Some(running) = &self.running {
            if !running.task.is_finished() {
                debug!("Content server already running on {}", running.local_addr);
                return Ok(running.local_addr);
            }
        }

        self.wait_for_stopped();

        let addr = SocketAddr::from((Ipv4Addr::LOCALHOST, self.config.port));
        let std_listener =
            std::net::TcpListener::bind(addr).map_err(|source| ServerError::Bind { addr, source })?;
        std_listener.set_nonblocking(true)?;
        let local_addr = std_listener.local_addr()?;

        let listener = {
            let _guard = self.runtime.enter();
            tokio::net::TcpListener::from_std(std_listener)?
        };

        let cancel = CancellationToken::new();
        let router = create_router(ServerState {
            bridge: self.bridge.clone(),
            content: self.content.subscribe(),
            shutdown: cancel.clone(),
        });

        let shutdown = cancel.clone();
        let task = self.runtime.spawn(async move {
            info!("Content server listening on http://{}", local_addr);
            let result = axum::serve(listener, router)
                .with_graceful_shutdown(shutdown.cancelled_owned())
                .await;
            match result {
                Ok(()) => info!("Content server on {} stopped", local_addr),
                Err(e) => error!("Content server on {} failed: {}", local_addr, e),
            }
        });

        self.running = Some(RunningServer {
            local_addr,
            cancel,
            task,
        });
        Ok(local_addr)
    }

    /// Cancels the server and open event streams. Safe to call repeatedly.
    pub fn stop(&mut self) {
        match self.running.take() {
            Some(running) => {
                info!("Stopping content server on {}", running.local_addr);
                running.cancel.cancel();
                self.stopping = Some(running.task);
            }
            None => debug!("Content server not running"),
        }
    }

    /// Dispatches `releases` to attached pages, then stops. Event streams
    /// deliver everything queued before they close.
    pub fn release_and_stop(&mut self, releases: impl IntoIterator<Item = KeyIntent>) {
        for intent in releases {
            self.bridge.dispatch_key(intent);
        }
        self.stop();
    }

    /// Blocks until the previously stopped server task has finished, so its
    /// port can be bound again.
    fn wait_for_stopped(&mut self) {
        let Some(task) = self.stopping.take() else {
            return;
        };
        if task.is_finished() {
            return;
        }
        if self.runtime.runtime_flavor() != RuntimeFlavor::MultiThread {
            warn!("Previous content server still shutting down, not waiting");
            return;
        }

        debug!("Waiting for previous content server to shut down");
        let runtime = self.runtime.clone();
        let finished = tokio::task::block_in_place(|| {
            runtime.block_on(tokio::time::timeout(STOP_TIMEOUT, task))
        });
        if finished.is_err() {
            warn!("Previous content server did not shut down within {:?}", STOP_TIMEOUT);
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
            .as_ref()
            .is_some_and(|running| !running.task.is_finished())
    }

    /// Makes `path` the file served at `/content.swf`.
    pub fn load_file(&self, path: &Path) {
        info!("Loading content: {}", path.display());
        self.content.send_replace(Some(path.to_path_buf()));
    }

    pub fn current_file(&self) -> Option<PathBuf> {
        self.content.borrow().clone()
    }

    /// Asks attached pages to reload once the reload delay has passed.
    pub fn schedule_reload(&self) {
        let bridge = self.bridge.clone();
        let delay = Duration::from_millis(self.config.reload_delay_ms);
        self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            bridge.dispatch(BridgeMessage::Reload);
        });
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.running.as_ref().map(|running| running.local_addr)
    }

    /// Page URL; uses the bound port once started.
    pub fn url(&self) -> String {
        let port = self
            .local_addr()
            .map(|addr| addr.port())
            .unwrap_or(self.config.port);
        format!("http://localhost:{}", port)
    }
}

impl Drop for ContentServer {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::translator;
    use crate::persistence::Settings;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    fn test_server(bridge: EventBridge) -> ContentServer {
        let config = ServerConfig {
            port: 0,
            reload_delay_ms: 10,
            ..Default::default()
        };
        ContentServer::new(config, bridge, Handle::current())
    }

    async fn http_get(addr: SocketAddr, path: &str) -> String {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        let request = format!("GET {path} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n");
        stream.write_all(request.as_bytes()).await.unwrap();
        let mut response = Vec::new();
        stream.read_to_end(&mut response).await.unwrap();
        String::from_utf8_lossy(&response).into_owned()
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn serves_over_loopback_until_stopped() {
        let mut server = test_server(EventBridge::new());
        assert!(!server.is_running());

        let addr = server.start().unwrap();
        assert!(addr.ip().is_loopback());
        assert_eq!(server.url(), format!("http://localhost:{}", addr.port()));

        let response = http_get(addr, "/health").await;
        assert!(response.starts_with("HTTP/1.1 200"));
        assert!(response.contains(r#""loaded":false"#));

        server.stop();
        server.stop();
        assert!(!server.is_running());
        assert_eq!(server.local_addr(), None);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn restart_rebinds_the_same_port() {
        let port = {
            let free = std::net::TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).unwrap();
            free.local_addr().unwrap().port()
        };
        let config = ServerConfig {
            port,
            reload_delay_ms: 10,
            ..Default::default()
        };
        let mut server = ContentServer::new(config, EventBridge::new(), Handle::current());

        let first = server.start().unwrap();
        assert!(http_get(first, "/health").await.starts_with("HTTP/1.1 200"));
        server.stop();

        let second = server.start().unwrap();
        assert_eq!(first, second);
        assert!(http_get(second, "/health").await.starts_with("HTTP/1.1 200"));
        server.stop();
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn attached_page_receives_releases_before_stop() {
        let bridge = EventBridge::new();
        let mut server = test_server(bridge.clone());
        let addr = server.start().unwrap();

        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(b"GET /events HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
            .await
            .unwrap();
        tokio::time::timeout(Duration::from_secs(1), async {
            while bridge.page_count() == 0 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("page never attached");

        let releases = translator::release_all(&Settings::default());
        assert_eq!(releases.len(), 8);
        server.release_and_stop(releases);

        let mut response = Vec::new();
        tokio::time::timeout(Duration::from_secs(2), stream.read_to_end(&mut response))
            .await
            .expect("event stream did not close")
            .unwrap();
        let response = String::from_utf8_lossy(&response);
        assert_eq!(response.matches(r#""type":"keyup""#).count(), 8);
        assert!(!server.is_running());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn start_is_idempotent() {
        let mut server = test_server(EventBridge::new());
        let first = server.start().unwrap();
        let second = server.start().unwrap();
        assert_eq!(first, second);
        server.stop();
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn load_file_switches_served_content() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("game.swf");
        std::fs::write(&path, b"CWS").unwrap();

        let mut server = test_server(EventBridge::new());
        let addr = server.start().unwrap();
        assert!(http_get(addr, "/content.swf").await.starts_with("HTTP/1.1 404"));

        server.load_file(&path);
        assert_eq!(server.current_file(), Some(path));
        let response = http_get(addr, "/content.swf").await;
        assert!(response.starts_with("HTTP/1.1 200"));
        assert!(response.contains("application/x-shockwave-flash"));
        assert!(response.ends_with("CWS"));
        server.stop();
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn reload_arrives_after_delay() {
        let bridge = EventBridge::new();
        let mut page = bridge.subscribe();
        let server = test_server(bridge);

        server.schedule_reload();
        let message = tokio::time::timeout(Duration::from_secs(1), page.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(message, BridgeMessage::Reload);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn occupied_port_is_a_bind_error() {
        let blocker = std::net::TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).unwrap();
        let port = blocker.local_addr().unwrap().port();

        let config = ServerConfig {
            port,
            reload_delay_ms: 10,
            ..Default::default()
        };
        let mut server = ContentServer::new(config, EventBridge::new(), Handle::current());
        assert!(matches!(server.start(), Err(ServerError::Bind { .. })));
    }
}
