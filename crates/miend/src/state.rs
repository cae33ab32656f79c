use crate::config::Config;
use crate::engine::EngineHandle;
use mien_core::{Embedding, Person};
use std::time::Instant;
use tokio::sync::RwLock;

/// In-memory gallery of enrolled people.
///
/// Order is enrollment order, and the matcher breaks similarity ties in favor
/// of earlier entries, so the ordering is behavior, not presentation.
#[derive(Default)]
pub struct Gallery {
    people: RwLock<Vec<Person>>,
}

impl Gallery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an embedding under a name.
    ///
    /// A re-enrolled name keeps its position and gets the new embedding; a new
    /// name goes to the back. Returns true when an existing enrollment was
    /// replaced.
    pub async fn enroll(&self, name: &str, embedding: Embedding) -> bool {
        let enrolled_at = chrono::Utc::now().to_rfc3339();
        let mut people = self.people.write().await;
        if let Some(person) = people.iter_mut().find(|p| p.name == name) {
            person.embedding = embedding;
            person.enrolled_at = enrolled_at;
            true
        } else {
            people.push(Person {
                name: name.to_string(),
                embedding,
                enrolled_at,
            });
            false
        }
    }

    /// Names in enrollment order.
    pub async fn names(&self) -> Vec<String> {
        self.people.read().await.iter().map(|p| p.name.clone()).collect()
    }

    /// Clone of the gallery for the engine to match against.
    pub async fn snapshot(&self) -> Vec<Person> {
        self.people.read().await.clone()
    }

    /// Remove one enrollment; true when the name existed.
    pub async fn remove(&self, name: &str) -> bool {
        let mut people = self.people.write().await;
        let before = people.len();
        people.retain(|p| p.name != name);
        people.len() != before
    }

    pub async fn count(&self) -> usize {
        self.people.read().await.len()
    }
}

/// Shared daemon state.
pub struct AppState {
    pub config: Config,
    pub engine: EngineHandle,
    pub gallery: Gallery,
    pub started: Instant,
}

impl AppState {
    pub fn new(config: Config, engine: EngineHandle) -> Self {
        Self {
            config,
            engine,
            gallery: Gallery::new(),
            started: Instant::now(),
        }
    }
}
