use thiserror::Error;

/// Errores al resolver una URL de petición a un track reproducible.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("la URL no pertenece a un proveedor soportado: {0}")]
    UnsupportedUrl(String),

    #[error("la URL no es una playlist o no tiene entradas: {0}")]
    NotAPlaylist(String),

    #[error("no se pudo ejecutar yt-dlp: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("yt-dlp terminó con error: {0}")]
    Extractor(String),

    #[error("respuesta de yt-dlp ilegible: {0}")]
    Metadata(#[from] serde_json::Error),
}

/// Errores al conectar con el canal de voz de salida.
#[derive(Debug, Error)]
pub enum ConnectError {
    #[error("el solicitante no está en un canal de voz")]
    NoVoiceChannel,

    #[error("no se pudo conectar al canal de voz: {0}")]
    Join(#[from] songbird::error::JoinError),
}

/// Fallo reportado por el sink después de entregarle un stream.
///
/// Se registra en el log y cuenta como fin de reproducción: la cola
/// avanza en lugar de quedarse atascada en la entrada fallida.
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct PlaybackError(pub String);
