use std::sync::LazyLock;

use async_process::Command;
use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use super::{Track, TrackResolver};
use crate::error::ResolveError;

/// URLs que el proveedor soportado sabe resolver.
static SUPPORTED_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(https?://)?(www\.|m\.)?(youtube\.com/(watch\?v=|playlist\?|embed/|v/)|youtu\.be/|music\.youtube\.com/)",
    )
    .expect("patrón de URL soportada inválido")
});

/// Cliente para interactuar con yt-dlp.
///
/// Toda la resolución pasa por el binario externo en modo silencioso
/// (`--no-warnings`, salida JSON); no hay más efectos que el I/O del
/// subproceso y la red que éste use.
pub struct YtDlp {
    // Limitar subprocesos concurrentes para evitar rate limiting
    limiter: Semaphore,
    max_playlist: usize,
}

/// Línea de `--dump-json`: metadatos de un video o de un miembro plano.
#[derive(Debug, Deserialize)]
struct YtDlpEntry {
    title: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    webpage_url: Option<String>,
}

/// Objeto de `--dump-single-json` con extracción plana: una playlist trae
/// `entries`; un video individual no.
#[derive(Debug, Deserialize)]
struct YtDlpPlaylist {
    #[serde(default)]
    entries: Option<Vec<YtDlpEntry>>,
}

impl YtDlp {
    pub fn new(max_playlist: usize) -> Self {
        Self {
            limiter: Semaphore::new(3),
            max_playlist,
        }
    }

    /// Verifica que yt-dlp esté instalado y pueda ejecutarse.
    pub async fn verify() -> Result<(), ResolveError> {
        let output = Command::new("yt-dlp").arg("--version").output().await?;

        if output.status.success() {
            let version = String::from_utf8_lossy(&output.stdout);
            info!("✅ yt-dlp versión: {}", version.trim());
            Ok(())
        } else {
            Err(ResolveError::Extractor(
                "yt-dlp no puede ejecutarse correctamente".to_string(),
            ))
        }
    }

    /// Verifica si una URL pertenece al proveedor soportado.
    pub fn is_supported_url(url: &str) -> bool {
        SUPPORTED_URL.is_match(url)
    }

    fn check_supported(url: &str) -> Result<(), ResolveError> {
        if Self::is_supported_url(url) {
            Ok(())
        } else {
            Err(ResolveError::UnsupportedUrl(url.to_string()))
        }
    }

    /// Ejecuta yt-dlp y devuelve su stdout como texto.
    async fn run(&self, args: &[&str]) -> Result<String, ResolveError> {
        let _permit = self
            .limiter
            .acquire()
            .await
            .map_err(|_| ResolveError::Extractor("limitador de peticiones cerrado".to_string()))?;

        let output = Command::new("yt-dlp").args(args).output().await?;

        if !output.status.success() {
            let error = String::from_utf8_lossy(&output.stderr);
            return Err(ResolveError::Extractor(error.trim().to_string()));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[async_trait]
impl TrackResolver for YtDlp {
    async fn resolve_single(&self, url: &str) -> Result<Track, ResolveError> {
        Self::check_supported(url)?;

        debug!("📊 Obteniendo metadatos de: {}", url);

        let stdout = self
            .run(&["--no-playlist", "--dump-json", "--no-warnings", url])
            .await?;

        let line = stdout
            .lines()
            .next()
            .ok_or_else(|| ResolveError::Extractor("yt-dlp no devolvió metadatos".to_string()))?;
        let entry: YtDlpEntry = serde_json::from_str(line)?;

        Ok(entry_to_track(entry, url))
    }

    async fn expand_playlist(&self, url: &str) -> Result<Vec<Track>, ResolveError> {
        Self::check_supported(url)?;

        info!("📋 Expandiendo playlist: {}", url);

        let cap = self.max_playlist.to_string();
        let stdout = self
            .run(&[
                "--flat-playlist",
                "--dump-single-json",
                "--playlist-end",
                &cap,
                "--no-warnings",
                url,
            ])
            .await?;

        let playlist: YtDlpPlaylist = serde_json::from_str(stdout.trim())?;
        let entries = match playlist.entries {
            Some(entries) => entries,
            None => return Err(ResolveError::NotAPlaylist(url.to_string())),
        };

        // Miembros sin URL (videos borrados o privados) se descartan.
        let tracks: Vec<Track> = entries
            .into_iter()
            .filter_map(|entry| {
                let locator = entry.url.clone()?;
                Some(entry_to_track(entry, &locator))
            })
            .collect();

        if tracks.is_empty() {
            return Err(ResolveError::NotAPlaylist(url.to_string()));
        }

        info!("📋 Playlist con {} entradas reproducibles", tracks.len());
        Ok(tracks)
    }

    async fn stream_url(&self, locator: &str) -> Result<String, ResolveError> {
        debug!("🎵 Obteniendo URL de stream para: {}", locator);

        let stdout = self
            .run(&[
                "--no-playlist",
                "-f",
                "bestaudio/best",
                "--get-url",
                "--no-warnings",
                locator,
            ])
            .await?;

        let stream = stdout.trim();
        if stream.is_empty() {
            warn!("⚠️ yt-dlp no produjo URL de stream para: {}", locator);
            return Err(ResolveError::Extractor(
                "no se pudo obtener URL de stream".to_string(),
            ));
        }

        // Con formatos combinados yt-dlp puede imprimir más de una URL;
        // la primera es la pista de audio pedida.
        Ok(stream.lines().next().unwrap_or(stream).to_string())
    }
}

fn entry_to_track(entry: YtDlpEntry, fallback_url: &str) -> Track {
    let locator = entry
        .webpage_url
        .or(entry.url)
        .unwrap_or_else(|| fallback_url.to_string());
    let title = entry
        .title
        .unwrap_or_else(|| "(sin título)".to_string());

    Track::new(locator, title)
}
