use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpServer};
use anyhow::Context;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use jewel_forge::{
    infrastructure::{connect_store, ModelRegistry},
    AppState, Config, NAME, VERSION,
};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Chargement de la configuration
    let config = Config::from_env().context("❌ Impossible de charger la configuration")?;

    // Initialisation du logging
    setup_tracing(&config);
    info!("🚀 Démarrage de {} v{}", NAME, VERSION);
    info!("🔧 Mode: {}", config.run_mode);

    // Initialisation des services
    let store = connect_store(&config)
        .await
        .context("❌ Impossible d'initialiser le stockage")?;

    let registry = ModelRegistry::load(&config.model_dir);
    let loaded: Vec<&str> = registry.loaded_kinds().iter().map(|kind| kind.tag()).collect();
    info!("🧠 Modèles chargés: {:?}", loaded);

    let host = config.server_host.clone();
    let port = config.server_port;
    let workers = config.workers;

    // Création de l'état de l'application
    let app_state = web::Data::new(
        AppState::build(config, registry, store).context("❌ Impossible d'assembler les services")?,
    );

    // Configuration du serveur Actix-Web
    let server = HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .app_data(app_state.clone())
            .configure(jewel_forge::api::config)
    })
    .bind((host.as_str(), port))?
    .workers(workers)
    .shutdown_timeout(10);

    info!("✅ Backend démarré avec succès!");
    info!("🔗 API disponible sur http://{}:{}", host, port);

    server.run().await?;
    Ok(())
}

/// Configure le tracing pour le logging structuré
fn setup_tracing(config: &Config) {
    let log_level = config.log_level.parse().unwrap_or(tracing::Level::INFO);

    let subscriber = tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(if config.log_format == "json" {
            Box::new(
                tracing_subscriber::fmt::layer()
                    .json()
                    .flatten_event(true)
                    .with_current_span(true)
                    .with_span_list(true),
            ) as Box<dyn tracing_subscriber::Layer<_> + Send + Sync>
        } else {
            Box::new(
                tracing_subscriber::fmt::layer()
                    .compact()
                    .with_line_number(true)
                    .with_file(true),
            ) as Box<dyn tracing_subscriber::Layer<_> + Send + Sync>
        });

    subscriber.init();
}
