use crate::assistant::Assistant;
use crate::flows::Generator;
use crate::models::websocket::{ ClientMessage, ServerMessage };
use crate::views::{ ChatState, ChatView, PendingExchange, SessionStore, ViewError };

use std::error::Error;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::{ TcpListener, TcpStream };
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::protocol::Message;

use futures::{ Sink, SinkExt, StreamExt };
use log::{ info, warn, error };

const MAX_MESSAGE_SIZE: usize = 1 * 1024 * 1024;

pub async fn start_ws_server(
    addr: &str,
    assistant: Arc<Assistant>,
    store: SessionStore,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let listener = TcpListener::bind(addr).await?;
    info!("WS server listening on: {}", addr);
    serve(listener, assistant.generator(), store).await
}

pub async fn serve(
    listener: TcpListener,
    generator: Arc<Generator>,
    store: SessionStore,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    loop {
        let (stream, peer) = listener.accept().await?;
        info!("Incoming connection from: {}", peer);

        let generator = Arc::clone(&generator);
        let store = store.clone();
        tokio::spawn(async move {
            if let Err(e) = process_connection(peer, stream, generator, store).await {
                error!("Failed to process connection for {}: {}", peer, e);
            }
        });
    }
}

async fn process_connection(
    peer: SocketAddr,
    stream: TcpStream,
    generator: Arc<Generator>,
    store: SessionStore,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let websocket = accept_async(stream).await?;
    info!("New WebSocket connection: {}", peer);

    let (mut tx, mut rx) = websocket.split();
    let mut view = ChatView::new();

    while let Some(msg) = rx.next().await {
        let message = match msg {
            Ok(message) => message,
            Err(e) => {
                error!("Error receiving message from {}: {}", peer, e);
                break;
            }
        };

        if message.len() > MAX_MESSAGE_SIZE {
            warn!("Message from {} exceeds size limit ({} > {})", peer, message.len(), MAX_MESSAGE_SIZE);
            send(&mut tx, &ServerMessage::Error { message: "Message too large".to_string() }).await;
            break;
        }

        match message {
            Message::Text(text) => {
                let client_message = match serde_json::from_str::<ClientMessage>(&text) {
                    Ok(m) => m,
                    Err(e) => {
                        warn!("Invalid message format from {}: {}", peer, e);
                        let reply = ServerMessage::Error { message: "Invalid message format".to_string() };
                        if !send(&mut tx, &reply).await {
                            break;
                        }
                        continue;
                    }
                };

                if !dispatch(&mut view, &generator, &store, client_message, &mut tx).await {
                    break;
                }
            }
            Message::Close(_) => {
                info!("Client {} disconnected", peer);
                break;
            }
            Message::Ping(payload) => {
                if tx.send(Message::Pong(payload)).await.is_err() {
                    break;
                }
            }
            _ => {}
        }
    }

    info!("Connection closed: {}", peer);
    Ok(())
}

/// Applies one client frame to the connection's chat view, writing every reply to `tx`.
/// Returns `false` once the socket can no longer be written.
pub async fn dispatch<S>(
    view: &mut ChatView,
    generator: &Generator,
    store: &SessionStore,
    message: ClientMessage,
    tx: &mut S,
) -> bool
    where S: Sink<Message> + Unpin
{
    match message {
        ClientMessage::Chat { content } => {
            let pending = view.begin_submit(&content);
            exchange(view, generator, store, pending, tx).await
        }
        ClientMessage::Action { task } => {
            let pending = view.begin_action(task);
            exchange(view, generator, store, pending, tx).await
        }
        ClientMessage::NewChat => {
            view.new_chat();
            send(tx, &ServerMessage::View { view: view.clone() }).await
        }
        ClientMessage::Open { id } => {
            let opened = view.open(&id, &*store.lock().await);
            match opened {
                Ok(()) => send(tx, &ServerMessage::View { view: view.clone() }).await,
                Err(e) => send(tx, &rejection(e)).await,
            }
        }
        ClientMessage::SetLanguage { language } => {
            view.set_language(language);
            send(tx, &ServerMessage::View { view: view.clone() }).await
        }
        ClientMessage::History => {
            let conversations = store.lock().await.summaries();
            send(tx, &ServerMessage::History { conversations }).await
        }
    }
}

async fn exchange<S>(
    view: &mut ChatView,
    generator: &Generator,
    store: &SessionStore,
    pending: Result<PendingExchange, ViewError>,
    tx: &mut S,
) -> bool
    where S: Sink<Message> + Unpin
{
    let pending = match pending {
        Ok(p) => p,
        Err(e) => return send(tx, &rejection(e)).await,
    };
    if !send(tx, &ServerMessage::Processing).await {
        return false;
    }

    let outcome = generator.understand_context_provide_solutions(pending.request()).await;
    let message = view.complete(pending, outcome, &mut *store.lock().await);
    let conversation_id = match view.state() {
        ChatState::ActiveConversation { id } => Some(id.clone()),
        _ => None,
    };
    send(tx, &ServerMessage::Response { conversation_id, message }).await
}

fn rejection(e: ViewError) -> ServerMessage {
    match e {
        ViewError::Validation(schema) => ServerMessage::Invalid { errors: schema.fields },
        other => ServerMessage::Error { message: other.to_string() },
    }
}

async fn send<S>(tx: &mut S, message: &ServerMessage) -> bool
    where S: Sink<Message> + Unpin
{
    let json = match serde_json::to_string(message) {
        Ok(json) => json,
        Err(e) => {
            error!("Failed to serialize server message: {}", e);
            return true;
        }
    };
    if tx.send(Message::Text(json)).await.is_err() {
        error!("Failed to send message to client");
        return false;
    }
    true
}
