use std::collections::VecDeque;

use tracing::{debug, info};

use crate::sources::Track;

/// Vista de solo lectura de la cola, para mostrar al usuario.
///
/// Se construye dentro del actor a partir del mismo almacén que alimenta la
/// reproducción, así que títulos y total siempre son consistentes entre sí.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueueSnapshot {
    /// Títulos de las primeras entradas, en orden de reproducción.
    pub titles: Vec<String>,
    /// Total de entradas pendientes, contando las que no entraron en `titles`.
    pub total: usize,
}

impl QueueSnapshot {
    /// Entradas pendientes que quedaron fuera de la vista.
    pub fn overflow(&self) -> usize {
        self.total.saturating_sub(self.titles.len())
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }
}

/// Cola FIFO de tracks pendientes.
///
/// Es propiedad exclusiva del actor del reproductor: toda mutación llega
/// como mensaje por su buzón, así que no necesita sincronización propia.
#[derive(Debug, Default)]
pub struct TrackQueue {
    items: VecDeque<Track>,
}

impl TrackQueue {
    pub fn new() -> Self {
        Self {
            items: VecDeque::new(),
        }
    }

    /// Agrega un track al final de la cola
    pub fn push(&mut self, track: Track) {
        debug!("➕ Agregado a la cola: {}", track.title);
        self.items.push_back(track);
    }

    /// Saca el siguiente track en orden FIFO
    pub fn pop_front(&mut self) -> Option<Track> {
        self.items.pop_front()
    }

    /// Vacía la cola por completo
    pub fn clear(&mut self) {
        let dropped = self.items.len();
        self.items.clear();
        if dropped > 0 {
            info!("🗑️ Cola vaciada ({} entradas descartadas)", dropped);
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Vista de hasta `limit` títulos desde el frente, más el total pendiente.
    pub fn snapshot(&self, limit: usize) -> QueueSnapshot {
        QueueSnapshot {
            titles: self
                .items
                .iter()
                .take(limit)
                .map(|track| track.title.clone())
                .collect(),
            total: self.items.len(),
        }
    }
}
