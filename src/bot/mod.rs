//! # Bot Module
//!
//! Discord front end for the jukebox: slash command registration,
//! interaction dispatch, and the announcement forwarder that mirrors
//! player events into the text channel that last asked for music.
//!
//! The bot itself holds no playback state; every action becomes a message
//! to the player actor through its [`PlayerHandle`].

use std::sync::Arc;

use anyhow::Result;
use parking_lot::RwLock;
use serenity::{
    all::{ChannelId, Context, EventHandler, GuildId, Interaction, Ready},
    async_trait,
    http::Http,
};
use tokio::sync::broadcast;
use tracing::{error, info, warn};

pub mod commands;
pub mod handlers;

use crate::{
    config::Config,
    player::{PlayerEvent, PlayerHandle},
    sources::TrackResolver,
};

pub struct JukeBot {
    /// Configuración cargada del entorno
    pub config: Arc<Config>,
    /// Mando del actor de reproducción
    pub player: PlayerHandle,
    /// Resolutor de URLs a tracks (yt-dlp en producción)
    pub resolver: Arc<dyn TrackResolver>,
    /// Canal de texto del último /play, destino de los anuncios
    announce_channel: Arc<RwLock<Option<ChannelId>>>,
}

impl JukeBot {
    pub fn new(config: Config, player: PlayerHandle, resolver: Arc<dyn TrackResolver>) -> Self {
        Self {
            config: Arc::new(config),
            player,
            resolver,
            announce_channel: Arc::new(RwLock::new(None)),
        }
    }

    /// Cambia el canal de texto al que van los anuncios de reproducción.
    pub fn set_announce_channel(&self, channel: ChannelId) {
        *self.announce_channel.write() = Some(channel);
    }

    /// Referencia compartida al canal de anuncios, para el forwarder.
    pub fn announce_channel_handle(&self) -> Arc<RwLock<Option<ChannelId>>> {
        self.announce_channel.clone()
    }

    /// Registra los comandos slash, globales o por guild según config.
    async fn register_commands(&self, ctx: &Context) -> Result<()> {
        info!("📝 Registrando comandos slash...");

        match self.config.guild_id {
            Some(guild_id) => {
                let guild_id = GuildId::from(guild_id);
                if !ctx.cache.guilds().contains(&guild_id) {
                    warn!("⚠️ El bot no está en la guild especificada: {}", guild_id);
                    return Ok(());
                }
                commands::register_guild_commands(ctx, guild_id).await?;
                info!("✅ Comandos registrados para guild {}", guild_id);
            }
            None => {
                commands::register_global_commands(ctx).await?;
                info!("✅ Comandos globales registrados");
            }
        }

        Ok(())
    }
}

#[async_trait]
impl EventHandler for JukeBot {
    async fn ready(&self, ctx: Context, ready: Ready) {
        info!("🤖 {} está en línea!", ready.user.name);
        info!("📊 Conectado a {} servidores", ready.guilds.len());

        if let Err(e) = self.register_commands(&ctx).await {
            error!("Error al registrar comandos: {:?}", e);
        }
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        if let Interaction::Command(command) = interaction {
            if let Err(e) = handlers::handle_command(&ctx, command, self).await {
                error!("Error manejando comando: {:?}", e);
            }
        }
    }
}

/// Lanza la tarea que espeja los eventos del reproductor al canal de texto
/// del último /play. Los avances automáticos también se anuncian por aquí.
pub fn spawn_announcer(
    http: Arc<Http>,
    mut events: broadcast::Receiver<PlayerEvent>,
    announce_channel: Arc<RwLock<Option<ChannelId>>>,
) {
    tokio::spawn(async move {
        loop {
            let event = match events.recv().await {
                Ok(event) => event,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("⚠️ Anunciador atrasado; {} eventos perdidos", skipped);
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => break,
            };

            let Some(channel) = *announce_channel.read() else {
                // Nadie pidió música todavía; no hay dónde anunciar.
                continue;
            };

            let content = match event {
                PlayerEvent::NowPlaying { title } => format!("🎵 Reproduciendo: **{title}**"),
                PlayerEvent::JoinFailed { title } => format!(
                    "❌ No me pude conectar al canal de voz; **{title}** quedó sin reproducir"
                ),
            };

            if let Err(e) = channel.say(&http, content).await {
                warn!("⚠️ No se pudo anunciar en {}: {}", channel, e);
            }
        }
    });
}
