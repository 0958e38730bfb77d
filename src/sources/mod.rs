pub mod ytdlp;

use async_trait::async_trait;

use crate::error::ResolveError;

pub use ytdlp::YtDlp;

/// Marcador que clasifica una URL como playlist.
///
/// Heurística heredada del comportamiento de referencia: basta con que la
/// URL contenga la subcadena en cualquier posición, así que una URL de
/// video que la incluya por casualidad también se clasifica como playlist.
const PLAYLIST_MARKER: &str = "playlist";

/// Un track encolable: de dónde sacarlo y cómo mostrarlo.
///
/// `url` es un localizador opaco que el resolver convierte en un stream
/// directo en el momento de reproducir. Para peticiones individuales es la
/// URL canónica del video; para miembros de playlist es el identificador
/// ligero que reporta la enumeración plana.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Track {
    pub url: String,
    pub title: String,
}

impl Track {
    pub fn new(url: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: title.into(),
        }
    }
}

/// Contrato del resolver de medios.
///
/// Dos velocidades de resolución: los metadatos (título + localizador) se
/// obtienen al encolar, el stream directo recién al reproducir. Expandir
/// una playlist enumera metadatos ligeros y nunca pre-resuelve streams,
/// para no pagar por entradas que quizá se salten antes de sonar.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TrackResolver: Send + Sync {
    /// Resuelve una URL individual a un track encolable.
    async fn resolve_single(&self, url: &str) -> Result<Track, ResolveError>;

    /// Enumera los miembros de una playlist, en orden.
    async fn expand_playlist(&self, url: &str) -> Result<Vec<Track>, ResolveError>;

    /// Resuelve el localizador almacenado a una URL de audio directa.
    async fn stream_url(&self, locator: &str) -> Result<String, ResolveError>;
}

/// Clasifica una petición como playlist o como item individual.
pub fn is_playlist_url(url: &str) -> bool {
    url.contains(PLAYLIST_MARKER)
}
