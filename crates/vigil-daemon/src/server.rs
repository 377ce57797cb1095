use crate::actors::{DeliveryHandle, TrackerHandle};
use anyhow::{Context, Result};
use interprocess::local_socket::{
    tokio::{prelude::*, Stream},
    GenericFilePath, ListenerOptions,
};
use std::path::PathBuf;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, error, info, instrument};
use vigil_protocol::{Request, Response};

const MAX_FRAME_BYTES: usize = 64 * 1024;

pub struct Server {
    socket_path: PathBuf,
    tracker: TrackerHandle,
    delivery: DeliveryHandle,
}

impl Server {
    pub fn new(tracker: TrackerHandle, delivery: DeliveryHandle) -> Self {
        Self::with_socket_path(vigil_protocol::socket_path(), tracker, delivery)
    }

    pub fn with_socket_path(
        socket_path: PathBuf,
        tracker: TrackerHandle,
        delivery: DeliveryHandle,
    ) -> Self {
        Self {
            socket_path,
            tracker,
            delivery,
        }
    }

    fn cleanup_stale_socket(&self) -> Result<()> {
        if self.socket_path.exists() {
            std::fs::remove_file(&self.socket_path).context("failed to remove stale socket")?;
            debug!("removed stale socket file");
        }
        Ok(())
    }

    #[instrument(skip(self, shutdown))]
    pub async fn run(&self, mut shutdown: tokio::sync::broadcast::Receiver<()>) -> Result<()> {
        self.cleanup_stale_socket()?;

        let listener = ListenerOptions::new()
            .name(self.socket_path.as_os_str().to_fs_name::<GenericFilePath>()?)
            .create_tokio()
            .with_context(|| format!("failed to listen on {}", self.socket_path.display()))?;

        info!(path = %self.socket_path.display(), "server listening");

        loop {
            tokio::select! {
                accept_result = listener.accept() => {
                    match accept_result {
                        Ok(stream) => {
                            let tracker = self.tracker.clone();
                            let delivery = self.delivery.clone();
                            tokio::spawn(async move {
                                let result = handle_connection(stream, tracker, delivery).await;
                                if let Err(error) = result {
                                    error!(%error, "connection handler failed");
                                }
                            });
                        }
                        Err(error) => {
                            error!(%error, "failed to accept connection");
                        }
                    }
                }
                _ = shutdown.recv() => {
                    info!("shutdown signal received");
                    break;
                }
            }
        }

        self.cleanup_socket();
        Ok(())
    }

    fn cleanup_socket(&self) {
        if let Err(error) = std::fs::remove_file(&self.socket_path) {
            debug!(%error, "socket file already removed");
        } else {
            debug!("socket file cleaned up");
        }
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        self.cleanup_socket();
    }
}

async fn handle_connection(
    mut stream: Stream,
    tracker: TrackerHandle,
    delivery: DeliveryHandle,
) -> Result<()> {
    debug!("new connection accepted");

    let request: Request = read_frame(&mut stream).await?;
    debug!(?request, "received request");

    let response = handle_request(request, &tracker, &delivery).await;
    debug!(?response, "sending response");

    write_frame(&mut stream, &response).await
}

async fn read_frame<R, T>(reader: &mut R) -> Result<T>
where
    R: AsyncRead + Unpin,
    T: serde::de::DeserializeOwned,
{
    let mut length_buffer = [0u8; 4];
    reader.read_exact(&mut length_buffer).await?;
    let length = u32::from_le_bytes(length_buffer) as usize;

    anyhow::ensure!(length <= MAX_FRAME_BYTES, "frame too large: {} bytes", length);

    let mut payload = vec![0u8; length];
    reader.read_exact(&mut payload).await?;

    bincode::deserialize(&payload).context("failed to deserialize request")
}

async fn write_frame<W>(writer: &mut W, response: &Response) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let frame = vigil_protocol::encode_frame(response).context("failed to serialize response")?;
    writer.write_all(&frame).await?;
    writer.flush().await?;
    Ok(())
}

async fn handle_request(
    request: Request,
    tracker: &TrackerHandle,
    delivery: &DeliveryHandle,
) -> Response {
    match request {
        Request::Ping => Response::Pong,

        Request::Start => match tracker.start().await {
            Some(()) => Response::Ok,
            None => tracker_unavailable(),
        },

        Request::Stop => match tracker.stop().await {
            Some(()) => Response::Ok,
            None => tracker_unavailable(),
        },

        Request::GetStatus => match tracker.get_status().await {
            Some(status) => Response::Status {
                running: status.running,
                active_package: status.active_package,
                active_since_ms: status.active_since_ms,
                pending_reports: status.pending_reports,
            },
            None => tracker_unavailable(),
        },

        Request::FlushNow => Response::Flushed {
            outcome: delivery.flush_now().await,
        },

        Request::CheckInterruption => match tracker.check_interruption().await {
            Some(Ok(interruption)) => Response::InterruptionChecked { interruption },
            Some(Err(message)) => Response::Error { message },
            None => tracker_unavailable(),
        },
    }
}

fn tracker_unavailable() -> Response {
    Response::Error {
        message: "tracker actor unavailable".to_string(),
    }
}
