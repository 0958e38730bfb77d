use serenity::{
    all::Timestamp,
    builder::{CreateEmbed, CreateEmbedFooter},
};

use crate::player::QueueSnapshot;

/// Paleta de colores estandarizada para el bot
pub mod colors {
    use serenity::all::Colour;

    pub const SUCCESS_GREEN: Colour = Colour::from_rgb(67, 181, 129);
    pub const INFO_BLUE: Colour = Colour::from_rgb(52, 144, 220);
    pub const MUSIC_PURPLE: Colour = Colour::from_rgb(138, 43, 226);
    pub const NEUTRAL_GRAY: Colour = Colour::from_rgb(108, 117, 125);
}

/// Footer estandarizado para todos los embeds
const STANDARD_FOOTER: &str = "🎵 Jukebot";

/// Crea un embed para mostrar que se agregó una canción
pub fn create_track_added_embed(title: &str, url: &str) -> CreateEmbed {
    CreateEmbed::default()
        .title("✅ Canción Agregada")
        .description(format!(
            "**{title}** se ha agregado a la cola de reproducción"
        ))
        .color(colors::SUCCESS_GREEN)
        .url(url)
        .timestamp(Timestamp::now())
        .footer(CreateEmbedFooter::new(
            "🎵 Se reproducirá automáticamente si no hay música sonando",
        ))
}

/// Crea un embed para mostrar que una playlist fue agregada
pub fn create_playlist_added_embed(track_count: usize, playlist_url: &str) -> CreateEmbed {
    let description = if track_count == 1 {
        "Se agregó **1 canción** de la playlist a la cola de reproducción".to_string()
    } else {
        format!("Se agregaron **{track_count} canciones** de la playlist a la cola de reproducción")
    };

    let mut embed = CreateEmbed::default()
        .title("📋 Playlist Agregada")
        .description(description)
        .color(colors::MUSIC_PURPLE)
        .field("📊 Canciones agregadas", track_count.to_string(), true);

    // Extraer el ID de la playlist para mostrar
    if let Some(list_start) = playlist_url.find("list=") {
        let list_id = &playlist_url[list_start + 5..];
        let clean_list_id = list_id.split('&').next().unwrap_or(list_id);
        embed = embed.field("🆔 Playlist ID", format!("`{clean_list_id}`"), true);
    }

    embed
        .url(playlist_url)
        .timestamp(Timestamp::now())
        .footer(CreateEmbedFooter::new(STANDARD_FOOTER))
}

/// Crea un embed con la cola de reproducción pendiente
pub fn create_queue_embed(snapshot: &QueueSnapshot) -> CreateEmbed {
    let embed = CreateEmbed::default()
        .title("📋 Cola de Reproducción")
        .footer(CreateEmbedFooter::new(STANDARD_FOOTER))
        .timestamp(Timestamp::now());

    if snapshot.is_empty() {
        return embed
            .description("😴 **La cola está vacía**\n\n💡 Usa `/play <url>` para agregar música")
            .color(colors::NEUTRAL_GRAY);
    }

    let mut description = String::new();
    for (i, title) in snapshot.titles.iter().enumerate() {
        description.push_str(&format!("**{}**. {}\n", i + 1, title));
    }
    if snapshot.overflow() > 0 {
        description.push_str(&format!("… y {} más en la cola\n", snapshot.overflow()));
    }

    embed
        .color(colors::INFO_BLUE)
        .field("Próximas canciones", description, false)
        .field(
            "Información",
            format!("**Total:** {} canciones", snapshot.total),
            false,
        )
}

/// Crea un embed de ayuda general
pub fn create_help_embed() -> CreateEmbed {
    CreateEmbed::default()
        .title("🎵 Jukebot - Guía de Comandos")
        .color(colors::INFO_BLUE)
        .description("Bot de música para YouTube: pega una URL y suena en tu canal de voz")
        .field(
            "🎵 Reproducción",
            "• `/play <url>` - Reproduce un video o una playlist\n\
            • `/skip` - Salta la canción actual\n\
            • `/stop` - Detiene todo y vacía la cola",
            false,
        )
        .field(
            "📜 Cola",
            "• `/queue` - Muestra las canciones pendientes",
            false,
        )
        .field(
            "💡 Consejos",
            "• Tienes que estar en un canal de voz para usar `/play`\n\
            • Las URLs con `playlist` se cargan completas, en orden",
            false,
        )
        .footer(CreateEmbedFooter::new(STANDARD_FOOTER))
        .timestamp(Timestamp::now())
}
