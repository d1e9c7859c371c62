use notify::{
    Config, EventKind, RecommendedWatcher, RecursiveMode, Watcher, event::ModifyKind,
};
use std::path::Path;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::{Stream, StreamExt};

pub struct Watch {
    _watcher: RecommendedWatcher,
    channel: broadcast::Sender<Event>,
}

// Every change reloads every page, so there's only the one kind for now.
#[derive(Debug, Clone)]
pub enum Event {
    Reload,
}

/// Does this filesystem event change what the site would render?
fn is_content_change(kind: &EventKind) -> bool {
    match kind {
        EventKind::Modify(ModifyKind::Metadata(_)) => false,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_) => true,
        _ => false,
    }
}

impl Watch {
    /// Start watching `path` recursively.
    pub fn new(path: &Path) -> notify::Result<Self> {
        let (tx, _) = broadcast::channel(16);
        let channel = tx.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<notify::Event>| match res {
                Ok(event) if is_content_change(&event.kind) => {
                    tracing::debug!("changed: {:?}", event.paths);
                    // We ignore errors when sending events: it's OK to
                    // silently drop messages when there are no subscribers.
                    let _ = tx.send(Event::Reload);
                }
                Ok(_) => (),
                Err(e) => tracing::warn!("watch error: {e}"),
            },
            Config::default(),
        )?;

        watcher.watch(path, RecursiveMode::Recursive)?;

        Ok(Self {
            _watcher: watcher,
            channel,
        })
    }

    /// A stream of change events from now on. Events missed by a slow
    /// subscriber are skipped.
    pub fn stream(&self) -> impl Stream<Item = Event> + use<> {
        BroadcastStream::new(self.channel.subscribe()).filter_map(|res| res.ok())
    }
}
