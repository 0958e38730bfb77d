pub mod songbird;

pub use self::songbird::SongbirdSink;

use std::sync::Arc;

use async_trait::async_trait;
use serenity::model::id::{ChannelId, GuildId};

use crate::error::{ConnectError, PlaybackError};

/// Canal de voz al que conectar, capturado al momento del comando.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoiceTarget {
    pub guild: GuildId,
    pub channel: ChannelId,
}

/// Aviso de fin de reproducción. El sink lo dispara exactamente una vez por
/// `play`, desde su propio scheduler de eventos, cuando el stream termina
/// por cualquier motivo: fin natural, stop forzado o error del driver (en
/// ese caso con `Some(error)`).
pub type EndNotifier = Arc<dyn Fn(Option<PlaybackError>) + Send + Sync>;

/// Salida de audio: una conexión de voz que reproduce un stream a la vez.
#[async_trait]
pub trait AudioSink: Send + Sync {
    /// Conecta al canal indicado, reutilizando la conexión viva si ya
    /// existe. Sin `target` y sin conexión viva falla con `NoVoiceChannel`.
    async fn connect(&self, target: Option<VoiceTarget>) -> Result<(), ConnectError>;

    /// Inicia la reproducción de `stream_url` y registra `on_end` como
    /// aviso de fin. No espera a que el stream termine.
    async fn play(&self, stream_url: &str, on_end: EndNotifier) -> Result<(), PlaybackError>;

    /// Fuerza el fin de la reproducción en curso; su aviso de fin se
    /// dispara igual que en un fin natural.
    async fn stop(&self);

    /// Abandona el canal de voz. Devuelve si había una conexión viva.
    async fn disconnect(&self) -> bool;

    /// Si hay un stream sonando (o pausado) en el sink.
    async fn is_playing(&self) -> bool;
}
