use anyhow::{Context as _, Result};
use serenity::{model::gateway::GatewayIntents, Client};
use songbird::{SerenityInit, Songbird};
use std::sync::Arc;
use tracing::{error, info, warn};

mod bot;
mod config;
mod error;
mod player;
mod sources;
mod ui;
mod voice;

use crate::bot::JukeBot;
use crate::config::Config;
use crate::player::spawn_player;
use crate::sources::YtDlp;
use crate::voice::SongbirdSink;

#[tokio::main]
async fn main() -> Result<()> {
    // Inicializar logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("jukebot=debug".parse()?)
                .add_directive("serenity=info".parse()?)
                .add_directive("songbird=info".parse()?),
        )
        .init();

    // Manejar health check si es necesario
    if std::env::args().any(|arg| arg == "--health-check") {
        return health_check().await;
    }

    info!("🎵 Iniciando Jukebot v{}", env!("CARGO_PKG_VERSION"));

    // Cargar configuración
    let config = Config::load()?;
    info!("{}", config.summary());

    // yt-dlp es la única vía de resolución; avisar temprano si falta
    if let Err(e) = YtDlp::verify().await {
        warn!("⚠️ yt-dlp no disponible ({}); /play va a fallar hasta instalarlo", e);
    }

    // El manager de voz se comparte entre el sink y el cliente
    let manager = Songbird::serenity();

    let resolver = Arc::new(YtDlp::new(config.max_playlist_size));
    let sink = Arc::new(SongbirdSink::new(manager.clone()));
    let player = spawn_player(resolver.clone(), sink);

    // Intents mínimos: guilds para el caché y voice states para saber en
    // qué canal está cada solicitante
    let intents = GatewayIntents::GUILDS | GatewayIntents::GUILD_VOICE_STATES;

    let events = player.subscribe();
    let bot = JukeBot::new(config.clone(), player, resolver);
    let announce_channel = bot.announce_channel_handle();

    let mut client = Client::builder(&config.discord_token, intents)
        .event_handler(bot)
        .register_songbird_with(manager)
        .await
        .context("No se pudo construir el cliente de Discord")?;

    // Anunciador de "Reproduciendo" para cada avance, automático o no
    bot::spawn_announcer(client.http.clone(), events, announce_channel);

    // Manejar shutdown graceful
    tokio::spawn(async move {
        tokio::signal::ctrl_c()
            .await
            .expect("Error al registrar Ctrl+C");
        info!("⚠️ Señal de shutdown recibida, cerrando...");
        std::process::exit(0);
    });

    // Iniciar bot
    info!("🚀 Bot iniciado exitosamente");
    if let Err(why) = client.start().await {
        error!("Error al ejecutar cliente: {:?}", why);
    }

    Ok(())
}

async fn health_check() -> Result<()> {
    // Verificar dependencias críticas
    YtDlp::verify().await?;
    println!("OK");
    Ok(())
}
