use std::sync::Arc;

use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, info, warn};

use super::queue::{QueueSnapshot, TrackQueue};
use crate::error::PlaybackError;
use crate::sources::{Track, TrackResolver};
use crate::voice::{AudioSink, EndNotifier, VoiceTarget};

/// Mensajes del buzón del reproductor.
///
/// Todos los disparadores entran por aquí: los comandos del usuario desde
/// las tareas de interacción y los avisos de fin desde el scheduler del
/// sink. El actor los consume en serie, así que no hay carreras entre un
/// skip y un fin natural, ni entre dos fines seguidos.
enum PlayerCommand {
    Submit {
        tracks: Vec<Track>,
        target: Option<VoiceTarget>,
    },
    Skip {
        respond_to: oneshot::Sender<bool>,
    },
    Stop {
        respond_to: oneshot::Sender<bool>,
    },
    Snapshot {
        limit: usize,
        respond_to: oneshot::Sender<QueueSnapshot>,
    },
    TrackEnded {
        seq: u64,
        error: Option<PlaybackError>,
    },
}

/// Eventos que el reproductor publica para la capa de presentación.
#[derive(Debug, Clone)]
pub enum PlayerEvent {
    NowPlaying { title: String },
    JoinFailed { title: String },
}

#[derive(Debug)]
enum PlaybackState {
    Idle,
    Playing { track: Track, seq: u64 },
}

/// Mando del reproductor: encola comandos y reparte sus eventos.
#[derive(Clone)]
pub struct PlayerHandle {
    tx: mpsc::UnboundedSender<PlayerCommand>,
    events: broadcast::Sender<PlayerEvent>,
}

impl PlayerHandle {
    /// Encola tracks para reproducir. `target` es el canal de voz del
    /// solicitante al momento del comando; los avances siguientes conectan
    /// ahí. No espera respuesta: la confirmación al usuario sale de los
    /// metadatos ya resueltos.
    pub fn submit(&self, tracks: Vec<Track>, target: Option<VoiceTarget>) {
        let _ = self.tx.send(PlayerCommand::Submit { tracks, target });
    }

    /// Corta el track en curso. Devuelve si había algo sonando.
    pub async fn skip(&self) -> bool {
        let (respond_to, reply) = oneshot::channel();
        if self.tx.send(PlayerCommand::Skip { respond_to }).is_err() {
            return false;
        }
        reply.await.unwrap_or(false)
    }

    /// Vacía la cola y desconecta de voz. Devuelve si había conexión.
    pub async fn stop(&self) -> bool {
        let (respond_to, reply) = oneshot::channel();
        if self.tx.send(PlayerCommand::Stop { respond_to }).is_err() {
            return false;
        }
        reply.await.unwrap_or(false)
    }

    /// Vista de la cola pendiente, con hasta `limit` títulos.
    pub async fn snapshot(&self, limit: usize) -> QueueSnapshot {
        let (respond_to, reply) = oneshot::channel();
        if self
            .tx
            .send(PlayerCommand::Snapshot { limit, respond_to })
            .is_err()
        {
            return QueueSnapshot::default();
        }
        reply.await.unwrap_or_default()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PlayerEvent> {
        self.events.subscribe()
    }
}

/// Lanza el actor del reproductor y devuelve su mando.
pub fn spawn_player(resolver: Arc<dyn TrackResolver>, sink: Arc<dyn AudioSink>) -> PlayerHandle {
    let (tx, rx) = mpsc::unbounded_channel();
    let (events, _) = broadcast::channel(64);

    let player = Player {
        queue: TrackQueue::new(),
        state: PlaybackState::Idle,
        target: None,
        next_seq: 0,
        resolver,
        sink,
        mailbox: tx.clone(),
        events: events.clone(),
    };
    tokio::spawn(player.run(rx));

    PlayerHandle { tx, events }
}

/// El secuenciador de reproducción. Dueño único de la cola y del estado,
/// vive en su propia tarea y solo habla por mensajes.
struct Player {
    queue: TrackQueue,
    state: PlaybackState,
    /// Último canal de voz conocido de un solicitante.
    target: Option<VoiceTarget>,
    next_seq: u64,
    resolver: Arc<dyn TrackResolver>,
    sink: Arc<dyn AudioSink>,
    /// Remitente propio, para fabricar avisos de fin.
    mailbox: mpsc::UnboundedSender<PlayerCommand>,
    events: broadcast::Sender<PlayerEvent>,
}

impl Player {
    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<PlayerCommand>) {
        info!("🎵 Reproductor listo");
        while let Some(command) = rx.recv().await {
            self.handle(command).await;
        }
    }

    async fn handle(&mut self, command: PlayerCommand) {
        match command {
            PlayerCommand::Submit { tracks, target } => {
                if target.is_some() {
                    self.target = target;
                }
                for track in tracks {
                    self.queue.push(track);
                }
                if matches!(self.state, PlaybackState::Idle) {
                    self.advance().await;
                }
            }
            PlayerCommand::Skip { respond_to } => {
                let playing = match &self.state {
                    PlaybackState::Playing { track, .. } => Some(track.title.clone()),
                    PlaybackState::Idle => None,
                };
                match playing {
                    Some(title) => {
                        info!("⏭️ Saltando: {}", title);
                        // El stop forzado dispara el mismo aviso de fin que
                        // un fin natural; el avance ocurre al recibirlo.
                        self.sink.stop().await;
                        let _ = respond_to.send(true);
                    }
                    None => {
                        debug!("⏭️ Skip sin nada sonando");
                        let _ = respond_to.send(false);
                    }
                }
            }
            PlayerCommand::Stop { respond_to } => {
                info!("⏹️ Deteniendo reproducción y vaciando la cola");
                self.queue.clear();
                self.state = PlaybackState::Idle;
                let was_connected = self.sink.disconnect().await;
                let _ = respond_to.send(was_connected);
            }
            PlayerCommand::Snapshot { limit, respond_to } => {
                let _ = respond_to.send(self.queue.snapshot(limit));
            }
            PlayerCommand::TrackEnded { seq, error } => {
                let current = match &self.state {
                    PlaybackState::Playing { seq, .. } => Some(*seq),
                    PlaybackState::Idle => None,
                };
                if current != Some(seq) {
                    // Fin de una instrucción vieja (stop + submit de por
                    // medio, o el driver avisó dos veces); no toca nada.
                    debug!("Aviso de fin obsoleto (seq {}), ignorado", seq);
                    return;
                }
                if let Some(error) = error {
                    warn!("⚠️ La reproducción terminó con error: {}", error);
                }
                self.state = PlaybackState::Idle;
                self.advance().await;
            }
        }
    }

    /// Saca la siguiente entrada de la cola y la pone a sonar.
    ///
    /// Solo se llama en estado `Idle`. Con la cola vacía no hace nada, así
    /// que un avance de más (tras un stop, por ejemplo) es inofensivo.
    async fn advance(&mut self) {
        loop {
            let track = match self.queue.pop_front() {
                Some(track) => track,
                None => {
                    debug!("📭 Cola vacía, reproductor en reposo");
                    return;
                }
            };

            if let Err(error) = self.sink.connect(self.target).await {
                // La entrada ya salió de la cola y se pierde; las demás
                // quedan pendientes hasta el próximo submit.
                warn!("❌ No se pudo conectar a voz: {}", error);
                let _ = self.events.send(PlayerEvent::JoinFailed { title: track.title });
                return;
            }

            let stream = match self.resolver.stream_url(&track.url).await {
                Ok(stream) => stream,
                Err(error) => {
                    // Cuenta como fin con error: se pasa a la siguiente.
                    warn!("⚠️ No se pudo resolver {}: {}", track.url, error);
                    continue;
                }
            };

            self.next_seq += 1;
            let seq = self.next_seq;

            match self.sink.play(&stream, self.end_notifier(seq)).await {
                Ok(()) => {
                    info!("▶️ Reproduciendo: {}", track.title);
                    let _ = self.events.send(PlayerEvent::NowPlaying {
                        title: track.title.clone(),
                    });
                    self.state = PlaybackState::Playing { track, seq };
                    return;
                }
                Err(error) => {
                    warn!("⚠️ El sink rechazó el stream de {}: {}", track.title, error);
                    continue;
                }
            }
        }
    }

    /// Aviso de fin para la instrucción `seq`: cruza del scheduler del sink
    /// al buzón del actor. Los avisos cuyo seq ya no es el vigente se
    /// descartan al procesarlos.
    fn end_notifier(&self, seq: u64) -> EndNotifier {
        let mailbox = self.mailbox.clone();
        Arc::new(move |error| {
            let _ = mailbox.send(PlayerCommand::TrackEnded { seq, error });
        })
    }
}

#[cfg(test)]
mod tests {
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;
    use serenity::model::id::{ChannelId, GuildId};

    use super::*;
    use crate::error::{ConnectError, ResolveError};
    use crate::sources::MockTrackResolver;

    /// Sink de mentira: registra conexiones y reproducciones, y deja que el
    /// test dispare los avisos de fin a mano.
    #[derive(Default)]
    struct FakeSink {
        state: Mutex<FakeSinkState>,
        fail_connect: bool,
    }

    #[derive(Default)]
    struct FakeSinkState {
        connected: bool,
        playing: Option<EndNotifier>,
        plays: Vec<String>,
        connects: Vec<Option<VoiceTarget>>,
        double_play: bool,
    }

    impl FakeSink {
        fn new() -> Arc<Self> {
            Arc::new(Self::default())
        }

        fn failing_connect() -> Arc<Self> {
            Arc::new(Self {
                fail_connect: true,
                ..Self::default()
            })
        }

        /// Termina el track en curso, como un fin natural.
        fn finish(&self) {
            let notifier = self.state.lock().playing.take();
            match notifier {
                Some(notifier) => (*notifier)(None),
                None => panic!("no hay nada sonando que terminar"),
            }
        }

        fn finish_with_error(&self, message: &str) {
            let notifier = self.state.lock().playing.take();
            match notifier {
                Some(notifier) => (*notifier)(Some(PlaybackError(message.to_string()))),
                None => panic!("no hay nada sonando que terminar"),
            }
        }

        /// Clona el aviso de fin vigente sin consumirlo, para simular
        /// avisos duplicados u obsoletos.
        fn current_notifier(&self) -> EndNotifier {
            self.state
                .lock()
                .playing
                .clone()
                .expect("no hay nada sonando")
        }

        fn plays(&self) -> Vec<String> {
            self.state.lock().plays.clone()
        }

        fn connects(&self) -> Vec<Option<VoiceTarget>> {
            self.state.lock().connects.clone()
        }

        fn connected(&self) -> bool {
            self.state.lock().connected
        }

        fn saw_double_play(&self) -> bool {
            self.state.lock().double_play
        }
    }

    #[async_trait::async_trait]
    impl AudioSink for FakeSink {
        async fn connect(&self, target: Option<VoiceTarget>) -> Result<(), ConnectError> {
            let mut state = self.state.lock();
            state.connects.push(target);
            if self.fail_connect || (target.is_none() && !state.connected) {
                return Err(ConnectError::NoVoiceChannel);
            }
            state.connected = true;
            Ok(())
        }

        async fn play(&self, stream_url: &str, on_end: EndNotifier) -> Result<(), PlaybackError> {
            let mut state = self.state.lock();
            if state.playing.is_some() {
                state.double_play = true;
                return Err(PlaybackError("ya hay un stream sonando".to_string()));
            }
            state.plays.push(stream_url.to_string());
            state.playing = Some(on_end);
            Ok(())
        }

        async fn stop(&self) {
            let notifier = self.state.lock().playing.take();
            if let Some(notifier) = notifier {
                (*notifier)(None);
            }
        }

        async fn disconnect(&self) -> bool {
            let (was_connected, notifier) = {
                let mut state = self.state.lock();
                let was = state.connected;
                state.connected = false;
                (was, state.playing.take())
            };
            if let Some(notifier) = notifier {
                (*notifier)(None);
            }
            was_connected
        }

        async fn is_playing(&self) -> bool {
            self.state.lock().playing.is_some()
        }
    }

    fn resolver_ok() -> Arc<MockTrackResolver> {
        let mut mock = MockTrackResolver::new();
        mock.expect_stream_url()
            .returning(|locator| Ok(format!("stream:{locator}")));
        Arc::new(mock)
    }

    fn track(name: &str) -> Track {
        Track::new(format!("https://example.com/{name}"), name)
    }

    fn target() -> Option<VoiceTarget> {
        Some(VoiceTarget {
            guild: GuildId::new(1),
            channel: ChannelId::new(42),
        })
    }

    /// Barrera: cuando la respuesta llega, todo lo anterior del buzón ya
    /// fue procesado.
    async fn settle(handle: &PlayerHandle) {
        let _ = handle.snapshot(0).await;
    }

    fn drain(events: &mut broadcast::Receiver<PlayerEvent>) -> Vec<PlayerEvent> {
        let mut seen = Vec::new();
        while let Ok(event) = events.try_recv() {
            seen.push(event);
        }
        seen
    }

    fn now_playing(events: &mut broadcast::Receiver<PlayerEvent>) -> Vec<String> {
        drain(events)
            .into_iter()
            .filter_map(|event| match event {
                PlayerEvent::NowPlaying { title } => Some(title),
                PlayerEvent::JoinFailed { .. } => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_submit_single_starts_playback() {
        let sink = FakeSink::new();
        let handle = spawn_player(resolver_ok(), sink.clone());
        let mut events = handle.subscribe();

        handle.submit(vec![track("a")], target());
        settle(&handle).await;

        assert_eq!(now_playing(&mut events), vec!["a"]);
        assert_eq!(sink.plays(), vec!["stream:https://example.com/a"]);
        assert_eq!(sink.connects(), vec![target()]);
        assert!(handle.snapshot(10).await.is_empty());
    }

    #[tokio::test]
    async fn test_submit_playlist_plays_first_and_queues_rest() {
        let sink = FakeSink::new();
        let handle = spawn_player(resolver_ok(), sink.clone());
        let mut events = handle.subscribe();

        handle.submit(vec![track("uno"), track("dos"), track("tres")], target());
        settle(&handle).await;

        assert_eq!(now_playing(&mut events), vec!["uno"]);
        let snapshot = handle.snapshot(10).await;
        assert_eq!(snapshot.titles, vec!["dos", "tres"]);
        assert_eq!(snapshot.total, 2);
    }

    #[tokio::test]
    async fn test_tracks_play_in_submission_order() {
        let sink = FakeSink::new();
        let handle = spawn_player(resolver_ok(), sink.clone());
        let mut events = handle.subscribe();

        handle.submit(vec![track("a")], target());
        settle(&handle).await;
        handle.submit(vec![track("b")], target());
        handle.submit(vec![track("c")], target());
        settle(&handle).await;

        // Fin natural de cada uno, en cadena.
        for _ in 0..3 {
            sink.finish();
            settle(&handle).await;
        }

        assert_eq!(now_playing(&mut events), vec!["a", "b", "c"]);
        assert!(!sink.saw_double_play());
        assert!(!sink.is_playing().await);
        assert!(handle.snapshot(10).await.is_empty());
    }

    #[tokio::test]
    async fn test_display_follows_playback() {
        let sink = FakeSink::new();
        let handle = spawn_player(resolver_ok(), sink.clone());
        let mut events = handle.subscribe();

        handle.submit(vec![track("a")], target());
        settle(&handle).await;
        handle.submit(vec![track("b"), track("c")], None);

        let snapshot = handle.snapshot(10).await;
        assert_eq!(snapshot.titles, vec!["b", "c"]);

        sink.finish();
        settle(&handle).await;

        assert_eq!(now_playing(&mut events), vec!["a", "b"]);
        assert_eq!(handle.snapshot(10).await.titles, vec!["c"]);
    }

    #[tokio::test]
    async fn test_skip_forces_advance() {
        let sink = FakeSink::new();
        let handle = spawn_player(resolver_ok(), sink.clone());
        let mut events = handle.subscribe();

        handle.submit(vec![track("a"), track("b")], target());
        settle(&handle).await;

        assert!(handle.skip().await);
        settle(&handle).await;

        assert_eq!(now_playing(&mut events), vec!["a", "b"]);
        assert_eq!(sink.plays().len(), 2);
        assert!(!sink.saw_double_play());
    }

    #[tokio::test]
    async fn test_skip_with_empty_queue_goes_idle() {
        let sink = FakeSink::new();
        let handle = spawn_player(resolver_ok(), sink.clone());
        let mut events = handle.subscribe();

        handle.submit(vec![track("a")], target());
        settle(&handle).await;

        assert!(handle.skip().await);
        settle(&handle).await;

        assert_eq!(now_playing(&mut events), vec!["a"]);
        assert!(!sink.is_playing().await);
        // En reposo, otro skip ya no tiene nada que cortar.
        assert!(!handle.skip().await);
    }

    #[tokio::test]
    async fn test_skip_while_idle_reports_nothing() {
        let handle = spawn_player(resolver_ok(), FakeSink::new());
        assert!(!handle.skip().await);
    }

    #[tokio::test]
    async fn test_stop_clears_queue_and_disconnects() {
        let sink = FakeSink::new();
        let handle = spawn_player(resolver_ok(), sink.clone());
        let mut events = handle.subscribe();

        handle.submit(vec![track("a"), track("b"), track("c")], target());
        settle(&handle).await;

        assert!(handle.stop().await);

        assert_eq!(now_playing(&mut events), vec!["a"]);
        assert!(handle.snapshot(10).await.is_empty());
        assert!(!sink.connected());
        assert!(!handle.skip().await);
    }

    #[tokio::test]
    async fn test_stop_while_idle_reports_not_connected() {
        let handle = spawn_player(resolver_ok(), FakeSink::new());
        assert!(!handle.stop().await);
    }

    #[tokio::test]
    async fn test_stale_completion_does_not_resurrect() {
        let sink = FakeSink::new();
        let handle = spawn_player(resolver_ok(), sink.clone());
        let mut events = handle.subscribe();

        handle.submit(vec![track("a")], target());
        settle(&handle).await;

        // Aviso de fin de "a" retenido; stop + submit de por medio.
        let stale = sink.current_notifier();
        assert!(handle.stop().await);
        handle.submit(vec![track("b")], target());
        settle(&handle).await;

        (*stale)(None);
        settle(&handle).await;

        // "b" sigue sonando; el aviso viejo no avanzó nada.
        assert!(sink.is_playing().await);
        assert_eq!(now_playing(&mut events), vec!["a", "b"]);
        assert_eq!(sink.plays().len(), 2);
        assert!(!sink.saw_double_play());
    }

    #[tokio::test]
    async fn test_duplicate_end_advances_once() {
        let sink = FakeSink::new();
        let handle = spawn_player(resolver_ok(), sink.clone());
        let mut events = handle.subscribe();

        handle.submit(vec![track("a"), track("b")], target());
        settle(&handle).await;

        // El driver puede avisar dos veces (error y luego fin) por el
        // mismo stream.
        let duplicate = sink.current_notifier();
        sink.finish_with_error("stream cortado");
        (*duplicate)(None);
        settle(&handle).await;

        assert_eq!(now_playing(&mut events), vec!["a", "b"]);
        assert_eq!(sink.plays().len(), 2);
        assert!(!sink.saw_double_play());
    }

    #[tokio::test]
    async fn test_unresolvable_head_skips_to_next() {
        let sink = FakeSink::new();
        let mut mock = MockTrackResolver::new();
        mock.expect_stream_url().returning(|locator| {
            if locator.contains("malo") {
                Err(ResolveError::Extractor("sin formatos".to_string()))
            } else {
                Ok(format!("stream:{locator}"))
            }
        });
        let handle = spawn_player(Arc::new(mock), sink.clone());
        let mut events = handle.subscribe();

        handle.submit(vec![track("malo"), track("bueno")], target());
        settle(&handle).await;

        assert_eq!(now_playing(&mut events), vec!["bueno"]);
        assert_eq!(sink.plays(), vec!["stream:https://example.com/bueno"]);
    }

    #[tokio::test]
    async fn test_connect_failure_drops_head_keeps_rest() {
        let sink = FakeSink::failing_connect();
        let handle = spawn_player(resolver_ok(), sink.clone());
        let mut events = handle.subscribe();

        handle.submit(vec![track("a"), track("b")], target());
        settle(&handle).await;

        let seen = drain(&mut events);
        assert!(matches!(
            seen.as_slice(),
            [PlayerEvent::JoinFailed { title }] if title == "a"
        ));
        // "a" se perdió; "b" queda pendiente para el próximo submit.
        assert_eq!(handle.snapshot(10).await.titles, vec!["b"]);
        assert!(sink.plays().is_empty());
    }

    #[tokio::test]
    async fn test_submit_without_voice_target_fails_join() {
        let sink = FakeSink::new();
        let handle = spawn_player(resolver_ok(), sink.clone());
        let mut events = handle.subscribe();

        handle.submit(vec![track("a")], None);
        settle(&handle).await;

        let seen = drain(&mut events);
        assert!(matches!(seen.as_slice(), [PlayerEvent::JoinFailed { .. }]));
        assert!(sink.plays().is_empty());
    }
}
