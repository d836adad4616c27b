//! Live notification feed over a WebSocket. A background task keeps the socket open, appends
//! every pushed notification to a [NotificationFeed], and reconnects after unexpected closes until
//! it runs out of attempts.

use crate::app_env::ClientConfig;
use crate::domain::notification::{ConnectionStatus, Notification, NotificationFeed};
use crate::dto::notification::{NotificationDto, SubscribeMessage};
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, error, info, warn};
use url::Url;

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

#[derive(Debug, Clone)]
pub struct ChannelSettings {
    pub ws_url: Url,
    pub reconnect_delay: Duration,
    pub max_reconnect_attempts: u32,
}

impl From<&ClientConfig> for ChannelSettings {
    fn from(value: &ClientConfig) -> Self {
        ChannelSettings {
            ws_url: value.ws_url.clone(),
            reconnect_delay: value.reconnect_delay,
            max_reconnect_attempts: value.max_reconnect_attempts,
        }
    }
}

impl ChannelSettings {
    fn url_for(&self, user_id: i64) -> Url {
        let mut url = self.ws_url.clone();
        url.query_pairs_mut()
            .append_pair("user_id", &user_id.to_string());
        url
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Reconnect,
    Shutdown,
}

/// How one connected session ended
#[derive(Debug, PartialEq, Eq)]
enum SessionEnd {
    /// The server closed the socket normally. No reconnect until asked.
    Closed,
    /// The socket failed or closed abnormally
    Dropped,
    /// A reconnect was requested while connected
    Restart,
    Shutdown,
}

/// Handle to the background connection of one user
pub struct NotificationChannel {
    feed: Arc<NotificationFeed>,
    status: watch::Receiver<ConnectionStatus>,
    commands: mpsc::UnboundedSender<Command>,
    worker: JoinHandle<()>,
}

impl NotificationChannel {
    /// Starts connecting in the background. Must be called from within a tokio runtime.
    pub fn open(settings: ChannelSettings, user_id: i64) -> Self {
        let feed = Arc::new(NotificationFeed::new());
        let (status_sender, status) = watch::channel(ConnectionStatus::Connecting);
        let (commands, command_receiver) = mpsc::unbounded_channel();

        let connection = Connection {
            url: settings.url_for(user_id),
            user_id,
            reconnect_delay: settings.reconnect_delay,
            max_reconnect_attempts: settings.max_reconnect_attempts,
            feed: Arc::clone(&feed),
            status: status_sender,
            commands: command_receiver,
        };
        let worker = tokio::spawn(connection.run());

        NotificationChannel {
            feed,
            status,
            commands,
            worker,
        }
    }

    pub fn status(&self) -> ConnectionStatus {
        *self.status.borrow()
    }

    pub fn watch_status(&self) -> watch::Receiver<ConnectionStatus> {
        self.status.clone()
    }

    pub fn feed(&self) -> &NotificationFeed {
        &self.feed
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.feed.snapshot()
    }

    pub fn clear(&self) {
        self.feed.clear();
    }

    /// Connects again with a fresh attempt budget, closing the current socket if there is one
    pub fn reconnect(&self) {
        if self.commands.send(Command::Reconnect).is_err() {
            warn!("Notification channel is already shut down, not reconnecting");
        }
    }

    /// Closes the socket with a normal close and stops reconnecting
    pub async fn shutdown(self) {
        // The worker may have stopped already
        let _ = self.commands.send(Command::Shutdown);
        if let Err(err) = self.worker.await {
            error!("Notification worker ended abnormally: {err}");
        }
    }
}

struct Connection {
    url: Url,
    user_id: i64,
    reconnect_delay: Duration,
    max_reconnect_attempts: u32,
    feed: Arc<NotificationFeed>,
    status: watch::Sender<ConnectionStatus>,
    commands: mpsc::UnboundedReceiver<Command>,
}

impl Connection {
    #[tracing::instrument(skip_all, fields(user_id = self.user_id))]
    async fn run(mut self) {
        let mut attempts: u32 = 0;

        loop {
            self.status.send_replace(ConnectionStatus::Connecting);
            let connected = tokio::select! {
                connected = connect_async(self.url.as_str()) => connected,
                command = self.commands.recv() => match command {
                    Some(Command::Reconnect) => {
                        attempts = 0;
                        continue;
                    }
                    Some(Command::Shutdown) | None => break,
                },
            };
            let end = match connected {
                Ok((socket, _)) => {
                    attempts = 0;
                    self.session(socket).await
                }
                Err(err) => {
                    error!("Could not connect to the notification service: {err}");
                    self.status.send_replace(ConnectionStatus::Error);
                    SessionEnd::Dropped
                }
            };

            match end {
                SessionEnd::Shutdown => break,
                SessionEnd::Restart => {
                    attempts = 0;
                    continue;
                }
                SessionEnd::Closed => {
                    info!("Notification service closed the connection");
                    self.status.send_replace(ConnectionStatus::Disconnected);
                    if !self.wait_for_reconnect().await {
                        break;
                    }
                    attempts = 0;
                    continue;
                }
                SessionEnd::Dropped => {}
            }

            if attempts >= self.max_reconnect_attempts {
                warn!("Giving up on the notification service after {attempts} reconnect attempts");
                self.status.send_replace(ConnectionStatus::Disconnected);
                if !self.wait_for_reconnect().await {
                    break;
                }
                attempts = 0;
                continue;
            }

            attempts += 1;
            warn!(
                "Reconnecting to the notification service in {:?} (attempt {attempts}/{})",
                self.reconnect_delay, self.max_reconnect_attempts
            );
            tokio::select! {
                _ = tokio::time::sleep(self.reconnect_delay) => {}
                command = self.commands.recv() => match command {
                    Some(Command::Reconnect) => attempts = 0,
                    Some(Command::Shutdown) | None => break,
                },
            }
        }

        self.status.send_replace(ConnectionStatus::Disconnected);
        info!("Notification channel shut down");
    }

    /// Parks until [NotificationChannel::reconnect]. False when the channel should stop instead.
    async fn wait_for_reconnect(&mut self) -> bool {
        matches!(self.commands.recv().await, Some(Command::Reconnect))
    }

    async fn session(&mut self, socket: Socket) -> SessionEnd {
        let (mut sink, mut stream) = socket.split();

        let subscribe = match serde_json::to_string(&SubscribeMessage::for_user(self.user_id)) {
            Ok(subscribe) => subscribe,
            Err(err) => {
                error!("Could not encode the subscribe message: {err}");
                self.status.send_replace(ConnectionStatus::Error);
                return SessionEnd::Dropped;
            }
        };
        if let Err(err) = sink.send(Message::Text(subscribe)).await {
            error!("Could not subscribe to notifications: {err}");
            self.status.send_replace(ConnectionStatus::Error);
            return SessionEnd::Dropped;
        }
        self.status.send_replace(ConnectionStatus::Connected);
        info!("Connected to the notification service");

        loop {
            tokio::select! {
                frame = stream.next() => match frame {
                    Some(Ok(Message::Text(text))) => receive_frame(&self.feed, &text),
                    Some(Ok(Message::Close(frame))) => {
                        let normal = frame
                            .as_ref()
                            .is_some_and(|frame| frame.code == CloseCode::Normal);
                        return if normal {
                            SessionEnd::Closed
                        } else {
                            warn!("Notification socket closed unexpectedly: {frame:?}");
                            self.status.send_replace(ConnectionStatus::Disconnected);
                            SessionEnd::Dropped
                        };
                    }
                    Some(Ok(_)) => {}
                    Some(Err(err)) => {
                        error!("Notification socket failed: {err}");
                        self.status.send_replace(ConnectionStatus::Error);
                        return SessionEnd::Dropped;
                    }
                    None => {
                        warn!("Notification socket ended without a close frame");
                        self.status.send_replace(ConnectionStatus::Disconnected);
                        return SessionEnd::Dropped;
                    }
                },
                command = self.commands.recv() => {
                    let end = match command {
                        Some(Command::Reconnect) => SessionEnd::Restart,
                        Some(Command::Shutdown) | None => SessionEnd::Shutdown,
                    };
                    let close = Message::Close(Some(CloseFrame {
                        code: CloseCode::Normal,
                        reason: "client closed the connection".into(),
                    }));
                    if let Err(err) = sink.send(close).await {
                        debug!("Notification socket was gone before it could be closed: {err}");
                    }
                    return end;
                }
            }
        }
    }
}

/// Appends a pushed notification to the feed. Frames that aren't notifications are logged and
/// dropped.
fn receive_frame(feed: &NotificationFeed, text: &str) {
    match serde_json::from_str::<NotificationDto>(text) {
        Ok(notification) => {
            debug!(id = notification.id, "Received notification");
            feed.push(notification.into());
        }
        Err(err) => error!("Could not read notification frame: {err}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use speculoos::prelude::*;

    #[test]
    fn appends_user_id_to_socket_url() {
        let settings = ChannelSettings {
            ws_url: Url::parse("ws://notify.test/ws").expect("valid url"),
            reconnect_delay: Duration::from_millis(10),
            max_reconnect_attempts: 1,
        };

        assert_eq!("ws://notify.test/ws?user_id=4", settings.url_for(4).as_str());
    }

    mod receive_frame {
        use super::*;

        #[test]
        fn keeps_notifications() {
            let feed = NotificationFeed::new();

            receive_frame(
                &feed,
                r#"{"id": 1, "user_id": 4, "source_type": "task", "source_id": 9,
                    "title": "Pay rent", "message": "Due today",
                    "notify_at": "2025-06-01T09:00:00Z", "sent": false}"#,
            );

            assert_eq!(1, feed.len());
            assert_that!(feed.unsent()).has_length(1);
        }

        #[test]
        fn skips_garbage() {
            let feed = NotificationFeed::new();

            receive_frame(&feed, "pong");
            receive_frame(&feed, r#"{"action": "subscribed"}"#);

            assert!(feed.is_empty());
        }
    }
}
