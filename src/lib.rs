pub mod assistant;
pub mod cli;
pub mod config;
pub mod flows;
pub mod llm;
pub mod models;
pub mod schema;
pub mod server;
pub mod views;

use assistant::Assistant;
use cli::Args;
use log::info;
use server::Server;
use std::error::Error;
use std::sync::Arc;

pub async fn run(args: Args) -> Result<(), Box<dyn Error + Send + Sync>> {
    info!("--- Core Configuration ---");
    info!("Server Address: {}", args.server_addr);
    info!("HTTP Port: {}", args.http_port.map(|p| p.to_string()).unwrap_or_else(|| "disabled".into()));
    info!("Chat LLM Type: {}", args.chat_llm_type);
    info!("Chat Model: {}", args.chat_model.as_deref().unwrap_or("adapter default"));
    info!("Prompts Path: {}", args.prompts_path.as_deref().unwrap_or("built-in"));
    info!("Debug: {}", args.debug);
    info!("-------------------------");

    let assistant = Arc::new(Assistant::new(&args)?);
    info!("Starting server on: {}", args.server_addr);
    let server = Server::new(&args, assistant);
    server.run().await?;

    Ok(())
}
