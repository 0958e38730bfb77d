use anyhow::Result;
use serenity::{
    builder::{
        CreateInteractionResponse, CreateInteractionResponseMessage, EditInteractionResponse,
    },
    model::{
        application::CommandInteraction,
        id::{ChannelId, GuildId, UserId},
    },
    prelude::Context,
};
use tracing::{info, warn};
use url::Url;

use crate::{
    bot::JukeBot,
    sources::{is_playlist_url, TrackResolver},
    ui::embeds,
    voice::VoiceTarget,
};

/// Maneja comandos slash
pub async fn handle_command(ctx: &Context, command: CommandInteraction, bot: &JukeBot) -> Result<()> {
    let guild_id = command
        .guild_id
        .ok_or_else(|| anyhow::anyhow!("Comando usado fuera de un servidor"))?;

    info!(
        "📝 Comando /{} usado por {} en guild {}",
        command.data.name, command.user.name, guild_id
    );

    match command.data.name.as_str() {
        "play" => handle_play(ctx, command, bot, guild_id).await?,
        "skip" => handle_skip(ctx, command, bot).await?,
        "stop" => handle_stop(ctx, command, bot).await?,
        "queue" => handle_queue(ctx, command, bot).await?,
        "help" => handle_help(ctx, command).await?,
        _ => {
            command
                .create_response(
                    &ctx.http,
                    CreateInteractionResponse::Message(
                        CreateInteractionResponseMessage::new()
                            .content("❌ Comando no reconocido")
                            .ephemeral(true),
                    ),
                )
                .await?;
        }
    }

    Ok(())
}

async fn handle_play(
    ctx: &Context,
    command: CommandInteraction,
    bot: &JukeBot,
    guild_id: GuildId,
) -> Result<()> {
    let query = command
        .data
        .options
        .iter()
        .find(|opt| opt.name == "url")
        .and_then(|opt| opt.value.as_str())
        .ok_or_else(|| anyhow::anyhow!("Falta la opción url"))?;

    if Url::parse(query).is_err() {
        command
            .create_response(
                &ctx.http,
                CreateInteractionResponse::Message(
                    CreateInteractionResponseMessage::new()
                        .content("❌ Eso no parece una URL válida")
                        .ephemeral(true),
                ),
            )
            .await?;
        return Ok(());
    }

    // El solicitante tiene que estar en un canal de voz; se captura aquí y
    // la conexión se intenta recién al reproducir.
    let Some(channel) = get_user_voice_channel(ctx, guild_id, command.user.id) else {
        command
            .create_response(
                &ctx.http,
                CreateInteractionResponse::Message(
                    CreateInteractionResponseMessage::new()
                        .content("❌ Debes estar en un canal de voz para reproducir música")
                        .ephemeral(true),
                ),
            )
            .await?;
        return Ok(());
    };
    let target = VoiceTarget {
        guild: guild_id,
        channel,
    };

    // Los anuncios de reproducción van al canal de texto del último /play.
    bot.set_announce_channel(command.channel_id);

    // La resolución puede tardar más que la ventana de respuesta.
    command
        .create_response(
            &ctx.http,
            CreateInteractionResponse::Defer(CreateInteractionResponseMessage::new()),
        )
        .await?;

    // Una URL con el marcador de playlist se expande; cualquier otra se
    // trata como un video individual.
    let response = if is_playlist_url(query) {
        match bot.resolver.expand_playlist(query).await {
            Ok(tracks) => {
                let count = tracks.len();
                bot.player.submit(tracks, Some(target));
                EditInteractionResponse::new().embed(embeds::create_playlist_added_embed(count, query))
            }
            Err(error) => {
                warn!("❌ No se pudo expandir la playlist {}: {}", query, error);
                EditInteractionResponse::new()
                    .content(format!("❌ No se pudo cargar la playlist: {error}"))
            }
        }
    } else {
        match bot.resolver.resolve_single(query).await {
            Ok(track) => {
                let title = track.title.clone();
                bot.player.submit(vec![track], Some(target));
                EditInteractionResponse::new().embed(embeds::create_track_added_embed(&title, query))
            }
            Err(error) => {
                warn!("❌ No se pudo resolver {}: {}", query, error);
                EditInteractionResponse::new()
                    .content(format!("❌ No se pudo obtener el video: {error}"))
            }
        }
    };

    command.edit_response(&ctx.http, response).await?;

    Ok(())
}

async fn handle_skip(ctx: &Context, command: CommandInteraction, bot: &JukeBot) -> Result<()> {
    let skipped = bot.player.skip().await;

    let message = if skipped {
        CreateInteractionResponseMessage::new().content("⏭️ Canción saltada")
    } else {
        CreateInteractionResponseMessage::new()
            .content("❌ No hay nada reproduciéndose")
            .ephemeral(true)
    };

    command
        .create_response(&ctx.http, CreateInteractionResponse::Message(message))
        .await?;

    Ok(())
}

async fn handle_stop(ctx: &Context, command: CommandInteraction, bot: &JukeBot) -> Result<()> {
    let was_connected = bot.player.stop().await;

    let message = if was_connected {
        CreateInteractionResponseMessage::new().content("⏹️ Reproducción detenida y cola limpiada")
    } else {
        CreateInteractionResponseMessage::new()
            .content("❌ No estoy conectado a un canal de voz")
            .ephemeral(true)
    };

    command
        .create_response(&ctx.http, CreateInteractionResponse::Message(message))
        .await?;

    Ok(())
}

async fn handle_queue(ctx: &Context, command: CommandInteraction, bot: &JukeBot) -> Result<()> {
    let snapshot = bot.player.snapshot(bot.config.queue_display_limit).await;
    let embed = embeds::create_queue_embed(&snapshot);

    command
        .create_response(
            &ctx.http,
            CreateInteractionResponse::Message(CreateInteractionResponseMessage::new().embed(embed)),
        )
        .await?;

    Ok(())
}

async fn handle_help(ctx: &Context, command: CommandInteraction) -> Result<()> {
    command
        .create_response(
            &ctx.http,
            CreateInteractionResponse::Message(
                CreateInteractionResponseMessage::new()
                    .embed(embeds::create_help_embed())
                    .ephemeral(true),
            ),
        )
        .await?;

    Ok(())
}

// Funciones auxiliares

/// Canal de voz del usuario según el caché de la guild, si está en alguno.
fn get_user_voice_channel(ctx: &Context, guild_id: GuildId, user_id: UserId) -> Option<ChannelId> {
    let guild = guild_id.to_guild_cached(&ctx.cache)?;

    guild
        .voice_states
        .get(&user_id)
        .and_then(|voice_state| voice_state.channel_id)
}
