use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio::task::{JoinHandle, JoinSet};

use crate::error::AuthError;

/// How long a forced shutdown waits for the serving task to finish.
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(1);

const READ_TIMEOUT: Duration = Duration::from_secs(5);
const MAX_REQUEST_HEAD: usize = 8 * 1024;

const SUCCESS_PAGE: &str = "<!DOCTYPE html><html><body>\
    <h1>Successfully authenticated, you may close this page.</h1>\
    <script>window.close();</script></body></html>";

const DENIED_PAGE: &str = "<!DOCTYPE html><html><body>\
    <h1>Authentication was not completed, you may close this page.</h1>\
    </body></html>";

/// Where the local callback listener binds and what the redirect URI points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackAddress {
    pub host: String,
    /// Port 0 binds an ephemeral port.
    pub port: u16,
    pub path: String,
}

impl Default for CallbackAddress {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 1337,
            path: "/".to_string(),
        }
    }
}

/// Outcome delivered by the listener for one authorization attempt.
#[derive(Debug)]
pub struct CallbackResult {
    pub code: String,
    pub error: Option<AuthError>,
}

/// A running loopback listener waiting for the provider redirect.
///
/// Publishes at most one [`CallbackResult`] on the receiver returned by
/// [`CallbackListener::start`], then stops serving on its own. Dropping the
/// handle aborts the serving task.
#[derive(Debug)]
pub struct CallbackListener {
    local_addr: SocketAddr,
    redirect_uri: String,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl CallbackListener {
    pub async fn start(
        address: &CallbackAddress,
        expected_state: String,
    ) -> Result<(Self, oneshot::Receiver<CallbackResult>), AuthError> {
        let listener = TcpListener::bind((address.host.as_str(), address.port)).await?;
        let local_addr = listener.local_addr()?;
        let redirect_uri = format!(
            "http://{}:{}{}",
            address.host,
            local_addr.port(),
            address.path
        );

        tracing::debug!(
            port = local_addr.port(),
            path = %address.path,
            "listening for callback for new authorization code"
        );

        let (result_tx, result_rx) = oneshot::channel();
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let task = tokio::spawn(serve(
            listener,
            address.path.clone(),
            expected_state,
            result_tx,
            shutdown_rx,
        ));

        Ok((
            Self {
                local_addr,
                redirect_uri,
                shutdown_tx: Some(shutdown_tx),
                task: Some(task),
            },
            result_rx,
        ))
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// The redirect URI matching the bound host, port and path.
    pub fn redirect_uri(&self) -> &str {
        &self.redirect_uri
    }

    /// Stop serving and wait up to [`SHUTDOWN_GRACE`] for the socket to close.
    /// Failures are logged, never returned.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            // Err means the task already stopped after delivering a result.
            let _ = tx.send(());
        }
        let Some(mut task) = self.task.take() else {
            return;
        };
        match tokio::time::timeout(SHUTDOWN_GRACE, &mut task).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::warn!(error = %e, "callback listener task failed"),
            Err(_) => {
                task.abort();
                tracing::warn!("callback listener did not stop within grace period, aborted");
            }
        }
    }
}

impl Drop for CallbackListener {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

async fn serve(
    listener: TcpListener,
    path: String,
    expected_state: String,
    result_tx: oneshot::Sender<CallbackResult>,
    mut shutdown_rx: oneshot::Receiver<()>,
) {
    let path: Arc<str> = path.into();
    let expected_state: Arc<str> = expected_state.into();
    let mut connections = JoinSet::new();
    let mut result_tx = Some(result_tx);

    loop {
        tokio::select! {
            _ = &mut shutdown_rx => break,
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    let path = path.clone();
                    let expected_state = expected_state.clone();
                    connections.spawn(async move {
                        handle_connection(stream, peer, &path, &expected_state).await
                    });
                }
                Err(e) => tracing::warn!(error = %e, "failed to accept callback connection"),
            },
            Some(joined) = connections.join_next() => {
                let Ok(Some(result)) = joined else {
                    continue;
                };
                if let Some(tx) = result_tx.take() {
                    if tx.send(result).is_err() {
                        tracing::debug!("callback arrived after the flow stopped waiting, discarded");
                    }
                }
                break;
            }
        }
    }

    // Connections still in flight (idle or slow peers) are aborted here.
    connections.abort_all();
    drop(listener);
    tracing::debug!("shut down local callback listener");
}

async fn handle_connection(
    mut stream: TcpStream,
    peer: SocketAddr,
    path: &str,
    expected_state: &str,
) -> Option<CallbackResult> {
    let head = match tokio::time::timeout(READ_TIMEOUT, read_request_head(&mut stream)).await {
        Ok(Ok(head)) => head,
        Ok(Err(e)) => {
            tracing::debug!(%peer, error = %e, "could not read callback request");
            return None;
        }
        Err(_) => {
            tracing::debug!(%peer, "timed out reading callback request");
            return None;
        }
    };

    let routed = route(&head, path, expected_state);
    if let Err(e) = write_response(&mut stream, routed.status, routed.body).await {
        tracing::debug!(%peer, error = %e, "could not write callback response");
    }
    routed.result
}

async fn read_request_head(stream: &mut TcpStream) -> io::Result<String> {
    let mut buf = Vec::with_capacity(1024);
    let mut chunk = [0u8; 1024];
    loop {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
        if buf.windows(4).any(|w| w == b"\r\n\r\n") || buf.len() >= MAX_REQUEST_HEAD {
            break;
        }
    }
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

async fn write_response(stream: &mut TcpStream, status: u16, body: &str) -> io::Result<()> {
    let response = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: text/html; charset=UTF-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        reason_phrase(status),
        body.len(),
        body
    );
    stream.write_all(response.as_bytes()).await?;
    stream.shutdown().await
}

fn reason_phrase(status: u16) -> &'static str {
    match status {
        200 => "OK",
        400 => "Bad Request",
        404 => "Not Found",
        405 => "Method Not Allowed",
        _ => "",
    }
}

/// The listener's decision for one request.
#[derive(Debug)]
struct Routed {
    status: u16,
    body: &'static str,
    result: Option<CallbackResult>,
}

impl Routed {
    fn reject(status: u16) -> Self {
        Self {
            status,
            body: "",
            result: None,
        }
    }
}

fn route(request_head: &str, path: &str, expected_state: &str) -> Routed {
    let Some(request_line) = request_head.lines().next() else {
        return Routed::reject(400);
    };
    let mut parts = request_line.split_whitespace();
    let (Some(method), Some(target)) = (parts.next(), parts.next()) else {
        return Routed::reject(400);
    };
    if !target.starts_with('/') {
        return Routed::reject(400);
    }
    let Ok(url) = reqwest::Url::parse(&format!("http://localhost{target}")) else {
        return Routed::reject(400);
    };

    if url.path() != path {
        tracing::debug!(path = url.path(), "invalid callback path");
        return Routed::reject(404);
    }
    if method != "GET" {
        return Routed::reject(405);
    }

    let query_param = |name: &str| {
        url.query_pairs()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.into_owned())
    };

    let given_state = query_param("state").unwrap_or_default();
    if given_state != expected_state {
        tracing::warn!(
            given_state = %given_state,
            "{}, ignoring request",
            AuthError::StateMismatch
        );
        return Routed::reject(400);
    }

    if let Some(error) = query_param("error") {
        tracing::warn!(error = %error, "provider returned an authorization error");
        return Routed {
            status: 200,
            body: DENIED_PAGE,
            result: Some(CallbackResult {
                code: String::new(),
                error: Some(AuthError::Denied {
                    error,
                    description: query_param("error_description"),
                }),
            }),
        };
    }

    let code = query_param("code").unwrap_or_default();
    tracing::debug!("callback successfully got code");
    Routed {
        status: 200,
        body: SUCCESS_PAGE,
        result: Some(CallbackResult { code, error: None }),
    }
}
