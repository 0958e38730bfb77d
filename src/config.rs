use anyhow::Result;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    // Discord
    pub discord_token: String,
    pub application_id: u64,
    pub guild_id: Option<u64>, // Para comandos de desarrollo

    // Resolución
    pub max_playlist_size: usize,

    // Presentación
    pub queue_display_limit: usize,
}

impl Config {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            // Discord
            discord_token: std::env::var("DISCORD_TOKEN")?,
            application_id: std::env::var("APPLICATION_ID")?.parse()?,
            guild_id: std::env::var("GUILD_ID").ok().and_then(|s| s.parse().ok()),

            // Resolución
            max_playlist_size: std::env::var("MAX_PLAYLIST_SIZE")
                .unwrap_or_else(|_| "100".to_string())
                .parse()?,

            // Presentación
            queue_display_limit: std::env::var("QUEUE_DISPLAY_LIMIT")
                .unwrap_or_else(|_| "10".to_string())
                .parse()?,
        };

        config.validate()?;

        Ok(config)
    }

    /// Sanidad de los valores cargados; atrapa configuraciones sin sentido
    /// antes de arrancar el bot.
    pub fn validate(&self) -> Result<()> {
        if self.discord_token.trim().is_empty() {
            anyhow::bail!("DISCORD_TOKEN no puede estar vacío");
        }

        if self.application_id == 0 {
            anyhow::bail!("APPLICATION_ID no puede ser 0");
        }

        if self.guild_id == Some(0) {
            anyhow::bail!("GUILD_ID no puede ser 0");
        }

        if self.max_playlist_size == 0 {
            anyhow::bail!("MAX_PLAYLIST_SIZE debe ser mayor que 0");
        }

        if self.queue_display_limit == 0 {
            anyhow::bail!("QUEUE_DISPLAY_LIMIT debe ser mayor que 0");
        }

        Ok(())
    }

    /// Resumen apto para logs (sin el token).
    pub fn summary(&self) -> String {
        format!(
            "Config: App ID {} (Guild: {}), playlists hasta {} entradas, cola muestra {}",
            self.application_id,
            self.guild_id
                .map_or("global".to_string(), |id| id.to_string()),
            self.max_playlist_size,
            self.queue_display_limit,
        )
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            // Discord (sin defaults, deben proveerse)
            discord_token: String::new(),
            application_id: 0,
            guild_id: None,

            max_playlist_size: 100,
            queue_display_limit: 10,
        }
    }
}
