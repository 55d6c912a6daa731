//! # Build Cache Prune
//!
//! File: cli/src/common/docker/build_cache.rs
//!
//! ## Overview
//!
//! `bollard` has no call for `POST /build/prune`, so the transport sends this
//! one request itself: a single HTTP/1 exchange over the engine's unix socket,
//! addressed with the API version negotiated at connect time.
//!
//! The reply is decoded into the engine's own `BuildPruneResponse`. Non-2xx
//! replies become `OctoError::EngineReject` with the engine's message, the
//! same way `bollard` errors are mapped everywhere else.
//!
use crate::core::error::{OctoError, Result};
use anyhow::{anyhow, Context};
use bollard::models::BuildPruneResponse;
use bollard::ClientVersion;
use hyper::StatusCode;
use std::path::Path;
use tracing::debug;

/// Engine socket used when no address is configured.
pub const DEFAULT_SOCKET_PATH: &str = "/var/run/docker.sock";

/// Request target for a build cache prune.
pub fn prune_path(version: &ClientVersion, all: bool) -> String {
    format!(
        "/v{}.{}/build/prune?all={}",
        version.major_version, version.minor_version, all
    )
}

/// Reads the bytes reclaimed out of the engine's reply.
pub fn parse_prune_response(status: StatusCode, body: &[u8]) -> Result<u64> {
    if !status.is_success() {
        return Err(anyhow!(OctoError::EngineReject {
            status: status.as_u16(),
            message: engine_message(body),
        }));
    }
    let response: BuildPruneResponse =
        serde_json::from_slice(body).context("Failed to parse build cache prune response")?;
    debug!(
        "Engine deleted {} build cache entries",
        response.caches_deleted.map(|c| c.len()).unwrap_or(0)
    );
    Ok(response.space_reclaimed.unwrap_or(0).max(0) as u64)
}

/// The `message` field of an engine error body, or the body as text.
fn engine_message(body: &[u8]) -> String {
    serde_json::from_slice::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_string))
        .unwrap_or_else(|| String::from_utf8_lossy(body).trim().to_string())
}

fn transport(context: &str, e: impl std::fmt::Display) -> anyhow::Error {
    anyhow!(OctoError::Transport(format!("{}: {}", context, e)))
}

/// Prunes the build cache through the engine socket at `socket`.
#[cfg(unix)]
pub async fn prune(socket: &Path, version: &ClientVersion, all: bool) -> Result<u64> {
    use bytes::Bytes;
    use http_body_util::{BodyExt, Empty};
    use hyper::{Method, Request};
    use hyper_util::rt::TokioIo;
    use tokio::net::UnixStream;

    let stream = UnixStream::connect(socket)
        .await
        .map_err(|e| transport(&format!("Failed to connect to {}", socket.display()), e))?;
    let (mut sender, conn) = hyper::client::conn::http1::handshake(TokioIo::new(stream))
        .await
        .map_err(|e| transport("HTTP handshake failed", e))?;
    tokio::spawn(async move {
        if let Err(e) = conn.await {
            debug!("Build cache prune connection closed: {}", e);
        }
    });

    let request = Request::builder()
        .method(Method::POST)
        .uri(prune_path(version, all))
        .header("Host", "localhost")
        .body(Empty::<Bytes>::new())
        .context("Failed to build build cache prune request")?;
    let response = sender
        .send_request(request)
        .await
        .map_err(|e| transport("Build cache prune request failed", e))?;
    let status = response.status();
    let body = response
        .into_body()
        .collect()
        .await
        .map_err(|e| transport("Failed to read build cache prune response", e))?
        .to_bytes();
    parse_prune_response(status, &body)
}

#[cfg(not(unix))]
pub async fn prune(_socket: &Path, _version: &ClientVersion, _all: bool) -> Result<u64> {
    Err(anyhow!(OctoError::Transport(
        "build cache prune needs a unix socket engine".to_string()
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    const V1_47: ClientVersion = ClientVersion {
        major_version: 1,
        minor_version: 47,
    };

    #[test]
    fn test_prune_path_carries_version_and_scope() {
        assert_eq!(prune_path(&V1_47, true), "/v1.47/build/prune?all=true");
        assert_eq!(prune_path(&V1_47, false), "/v1.47/build/prune?all=false");
    }

    #[test]
    fn test_parse_prune_response() {
        let body = br#"{"CachesDeleted":["k1","k2"],"SpaceReclaimed":4096}"#;
        assert_eq!(parse_prune_response(StatusCode::OK, body).unwrap(), 4096);
        assert_eq!(parse_prune_response(StatusCode::OK, b"{}").unwrap(), 0);

        let err = parse_prune_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            br#"{"message":"builder is busy"}"#,
        )
        .unwrap_err();
        match err.downcast_ref::<OctoError>() {
            Some(OctoError::EngineReject { status, message }) => {
                assert_eq!(*status, 500);
                assert_eq!(message, "builder is busy");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_prune_over_unix_socket() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};
        use tokio::net::UnixListener;

        let dir = tempfile::tempdir().unwrap();
        let socket = dir.path().join("engine.sock");
        let listener = UnixListener::bind(&socket).unwrap();
        let server = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = stream.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }
            let body = r#"{"CachesDeleted":["k1"],"SpaceReclaimed":2048}"#;
            let reply = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n{}",
                body.len(),
                body
            );
            stream.write_all(reply.as_bytes()).await.unwrap();
            String::from_utf8(request).unwrap()
        });

        assert_eq!(prune(&socket, &V1_47, true).await.unwrap(), 2048);
        let request = server.await.unwrap();
        assert!(request.starts_with("POST /v1.47/build/prune?all=true HTTP/1.1\r\n"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_prune_without_engine_is_transport_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = prune(&dir.path().join("missing.sock"), &V1_47, false)
            .await
            .unwrap_err();
        assert!(OctoError::is_transport(&err));
    }
}
