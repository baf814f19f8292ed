use graphite3d::{logger, server, Config, RenderService};

#[actix_web::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let env_loaded = dotenv::dotenv().is_ok();

    logger::init()?;

    if env_loaded {
        log::info!("✅ .env file loaded successfully");
    } else {
        log::warn!("⚠️  No .env file found, using system environment variables");
    }

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            log::error!("❌ Invalid configuration: {}", e);
            return Err(e.into());
        }
    };

    logger::log_startup_info("Graphite3D", env!("CARGO_PKG_VERSION"), &config);
    logger::log_config_info(&config);

    log::info!("🔄 Creating render service...");
    let service = match RenderService::from_config(&config).await {
        Ok(service) => {
            log::info!("✅ Render service initialized successfully");
            service
        }
        Err(e) => {
            log::error!("❌ Failed to initialize render service: {}", e);
            return Err(e.into());
        }
    };

    server::run(&config, service).await?;
    log::info!("👋 Server stopped");
    Ok(())
}
