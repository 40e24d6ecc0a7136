use std::sync::Arc;
use actix_files::Files;
use actix_web::{cookie::Key, middleware::Logger, web, App, HttpServer};
use log::{info, warn};
use JournalChatAgent::config;
use JournalChatAgent::routes::{self, app_state::AppState};
use JournalChatAgent::services::llm_service::{ChatModel, GeminiClient};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    config::load_env();
    config::init_logging();

    // A missing key still lets the page load; chat requests report the error
    let model: Option<Arc<dyn ChatModel>> = match config::api_key() {
        Ok(api_key) => {
            let client = GeminiClient::new(api_key, config::model_name())?;
            info!("Using model {}", client.model());
            Some(Arc::new(client))
        }
        Err(e) => {
            warn!("{}; set GOOGLE_API_KEY or add google_api_key to {}", e, config::secrets_path());
            None
        }
    };

    let max_exchanges = config::max_exchanges();
    let state = web::Data::new(AppState::new(model, max_exchanges));
    let key = Key::generate();
    let address = config::bind_address();

    info!("Starting server on http://{} (limit {} exchanges)", address, max_exchanges);
    HttpServer::new(move || {
        App::new()
            // Use the Logger middleware to log incoming requests.
            .wrap(Logger::default())
            .wrap(routes::session_middleware(key.clone()))
            .app_data(state.clone())
            .configure(routes::init_routes)
            // Serve static files (including index.html) from the "./static" directory.
            .service(Files::new("/", "./static").index_file("index.html"))
    })
    .bind(address)?
    .run()
    .await?;

    Ok(())
}
