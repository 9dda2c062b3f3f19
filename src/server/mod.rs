pub mod api;
pub mod websocket;

use crate::assistant::Assistant;
use crate::cli::Args;
use crate::views::{ ConversationStore, SessionStore };
use std::error::Error;
use std::sync::Arc;

pub struct Server {
    addr: String,
    http_port: Option<u16>,
    assistant: Arc<Assistant>,
    store: SessionStore,
}

impl Server {
    pub fn new(args: &Args, assistant: Arc<Assistant>) -> Self {
        Self {
            addr: args.server_addr.clone(),
            http_port: args.http_port,
            assistant,
            store: ConversationStore::shared(),
        }
    }

    pub async fn run(&self) -> Result<(), Box<dyn Error + Send + Sync>> {
        if let Some(http_port) = self.http_port {
            self.start_http_server(http_port).await?;
        }

        self.start_ws_server().await?;

        Ok(())
    }

    async fn start_http_server(&self, http_port: u16) -> Result<(), Box<dyn Error + Send + Sync>> {
        api::start_http_server(
            http_port,
            self.assistant.clone(),
            self.store.clone(),
        ).await
    }

    async fn start_ws_server(&self) -> Result<(), Box<dyn Error + Send + Sync>> {
        websocket::start_ws_server(
            &self.addr,
            self.assistant.clone(),
            self.store.clone(),
        ).await
    }
}
