use log::{error, info, warn};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

use crate::error::FileServerError;
use crate::error::handlers::{aborts_connection, handle_error};
use crate::middleware::logging::{log_connection, log_request};
use crate::protocol::{
    Body, Outcome, RequestLimits, Response, error_response, handle_request, read_request_head,
};
use crate::storage::FileStore;

/// How long unread request bytes are drained after the final response
const LINGER_TIMEOUT: Duration = Duration::from_secs(2);

/// Serves HTTP requests on one connection until it closes.
///
/// Requests are handled one after another; the connection stays open
/// between them unless the client asks otherwise, a body was left
/// unread, or the request could not be parsed.
pub async fn handle_client(
    stream: TcpStream,
    client_addr: SocketAddr,
    store: Arc<FileStore>,
    limits: RequestLimits,
) {
    log_connection(client_addr);
    let mut stream = BufReader::new(stream);

    loop {
        let head = match read_request_head(&mut stream, &limits).await {
            Ok(Some(head)) => head,
            Ok(None) => {
                info!("Connection closed by client {}", client_addr);
                return;
            }
            Err(e) => {
                reject(&mut stream, client_addr, FileServerError::from(e), &limits).await;
                return;
            }
        };

        let started = Instant::now();

        let mut body = match Body::new(&head) {
            Ok(body) => body,
            Err(e) => {
                reject(&mut stream, client_addr, FileServerError::from(e), &limits).await;
                return;
            }
        };

        match handle_request(&store, &head, &mut body, &mut stream, &limits).await {
            Outcome::Respond(response) => {
                let keep_alive = head.keep_alive() && body.is_drained();
                log_request(
                    client_addr,
                    &head.method,
                    &head.target,
                    response.status,
                    started.elapsed(),
                );

                if let Err(e) = send(&mut stream, &response, keep_alive).await {
                    warn!("Failed to write response to {}: {}", client_addr, e);
                    return;
                }

                if !keep_alive {
                    close(&mut stream, client_addr, &limits).await;
                    return;
                }
            }
            Outcome::Abort(err) => {
                warn!("Resetting connection from {}: {}", client_addr, err);
                reset(stream);
                return;
            }
        }
    }
}

/// Answers a request that could not be framed, then closes
async fn reject(
    stream: &mut BufReader<TcpStream>,
    client_addr: SocketAddr,
    err: FileServerError,
    limits: &RequestLimits,
) {
    handle_error(&err);
    if aborts_connection(&err) {
        return;
    }

    if let Err(e) = send(stream, &error_response(&err), false).await {
        warn!("Failed to write response to {}: {}", client_addr, e);
        return;
    }
    close(stream, client_addr, limits).await;
}

async fn send(
    stream: &mut BufReader<TcpStream>,
    response: &Response,
    keep_alive: bool,
) -> std::io::Result<()> {
    let socket = stream.get_mut();
    socket.write_all(&response.encode(keep_alive)).await?;
    socket.flush().await
}

/// Half-closes the connection and drains what the client is still sending,
/// so the kernel does not reset the socket before the response is read.
async fn close(stream: &mut BufReader<TcpStream>, client_addr: SocketAddr, limits: &RequestLimits) {
    if let Err(e) = stream.get_mut().shutdown().await {
        warn!("Failed to shut down connection to {}: {}", client_addr, e);
        return;
    }

    let max_drain = limits.max_body_bytes.saturating_mul(2) as u64;
    let mut sink = tokio::io::sink();
    let mut remaining = (&mut *stream).take(max_drain);
    let drain = tokio::io::copy(&mut remaining, &mut sink);
    if tokio::time::timeout(LINGER_TIMEOUT, drain).await.is_err() {
        warn!("Timed out draining connection from {}", client_addr);
    }
    info!("Client {} disconnected", client_addr);
}

/// Drops the connection with a TCP reset instead of an orderly close
fn reset(stream: BufReader<TcpStream>) {
    let socket = stream.into_inner();
    if let Err(e) = socket.set_linger(Some(Duration::ZERO)) {
        error!("Failed to set linger before reset: {}", e);
    }
    drop(socket);
}
