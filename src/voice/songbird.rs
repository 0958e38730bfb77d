use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::Client;
use songbird::{
    input::HttpRequest,
    tracks::{PlayMode, TrackHandle},
    Call, Event, EventContext, EventHandler as VoiceEventHandler, Songbird, TrackEvent,
};
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, info, warn};

use super::{AudioSink, EndNotifier, VoiceTarget};
use crate::error::{ConnectError, PlaybackError};

/// Salida de voz real sobre songbird.
///
/// Mantiene a lo sumo una llamada viva (bot de un solo guild) y el handle
/// del track en curso. El stream llega por HTTP con la URL directa que ya
/// resolvió yt-dlp.
pub struct SongbirdSink {
    manager: Arc<Songbird>,
    http: Client,
    session: Mutex<Option<Session>>,
    current: Mutex<Option<TrackHandle>>,
}

#[derive(Clone)]
struct Session {
    target: VoiceTarget,
    call: Arc<AsyncMutex<Call>>,
}

impl SongbirdSink {
    pub fn new(manager: Arc<Songbird>) -> Self {
        Self {
            manager,
            http: Client::new(),
            session: Mutex::new(None),
            current: Mutex::new(None),
        }
    }
}

#[async_trait]
impl AudioSink for SongbirdSink {
    async fn connect(&self, target: Option<VoiceTarget>) -> Result<(), ConnectError> {
        let session = self.session.lock().clone();
        match (target, session) {
            // La llamada viva sirve tal cual.
            (Some(target), Some(session)) if session.target == target => Ok(()),
            (None, Some(_)) => Ok(()),
            (None, None) => Err(ConnectError::NoVoiceChannel),
            (Some(target), _) => {
                let call = self.manager.join(target.guild, target.channel).await?;
                *self.session.lock() = Some(Session { target, call });
                info!("🔊 Conectado al canal de voz {}", target.channel);
                Ok(())
            }
        }
    }

    async fn play(&self, stream_url: &str, on_end: EndNotifier) -> Result<(), PlaybackError> {
        let call = match self.session.lock().as_ref() {
            Some(session) => session.call.clone(),
            None => return Err(PlaybackError("sin conexión de voz".to_string())),
        };

        let input = HttpRequest::new(self.http.clone(), stream_url.to_string());
        let handle = call.lock().await.play_input(input.into());

        let _ = handle.set_volume(0.5);

        // Fin y error se relevan por el mismo aviso; la bandera compartida
        // garantiza un solo disparo aunque el driver emita ambos.
        let fired = Arc::new(AtomicBool::new(false));
        handle
            .add_event(
                Event::Track(TrackEvent::End),
                EndRelay {
                    notifier: on_end.clone(),
                    fired: fired.clone(),
                },
            )
            .map_err(|e| PlaybackError(format!("no se pudo registrar el aviso de fin: {e}")))?;
        handle
            .add_event(
                Event::Track(TrackEvent::Error),
                EndRelay {
                    notifier: on_end,
                    fired,
                },
            )
            .map_err(|e| PlaybackError(format!("no se pudo registrar el aviso de error: {e}")))?;

        *self.current.lock() = Some(handle);
        Ok(())
    }

    async fn stop(&self) {
        let handle = self.current.lock().take();
        if let Some(track) = handle {
            // El stop del driver dispara TrackEvent::End para este track.
            let _ = track.stop();
            debug!("⏹️ Track detenido a la fuerza");
        }
    }

    async fn disconnect(&self) -> bool {
        let session = self.session.lock().take();
        *self.current.lock() = None;
        match session {
            Some(session) => {
                if let Err(error) = self.manager.remove(session.target.guild).await {
                    warn!("⚠️ Error al desconectar de voz: {}", error);
                }
                info!("👋 Desconectado del canal de voz");
                true
            }
            None => false,
        }
    }

    async fn is_playing(&self) -> bool {
        let handle = self.current.lock().clone();
        match handle {
            Some(track) => match track.get_info().await {
                Ok(info) => matches!(info.playing, PlayMode::Play | PlayMode::Pause),
                Err(_) => false,
            },
            None => false,
        }
    }
}

/// Releva un evento de track del scheduler de songbird al aviso de fin.
struct EndRelay {
    notifier: EndNotifier,
    fired: Arc<AtomicBool>,
}

#[async_trait]
impl VoiceEventHandler for EndRelay {
    async fn act(&self, ctx: &EventContext<'_>) -> Option<Event> {
        if self.fired.swap(true, Ordering::SeqCst) {
            // El otro relevo ya avisó por este track.
            return None;
        }

        let error = match ctx {
            EventContext::Track(tracks) => tracks.iter().find_map(|(state, _)| {
                if let PlayMode::Errored(error) = &state.playing {
                    Some(PlaybackError(error.to_string()))
                } else {
                    None
                }
            }),
            _ => None,
        };

        (*self.notifier)(error);
        None
    }
}
