//! The history capability the router drives, and an in-memory version.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use url::form_urlencoded;

use super::context::State;

/// A path plus its raw query string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Location {
    pub path: String,
    pub query: String,
}

impl Location {
    /// Location for `path` carrying `state` as its query string.
    pub fn new(path: impl Into<String>, state: &State) -> Self {
        let query = form_urlencoded::Serializer::new(String::new())
            .extend_pairs(state.iter())
            .finish();
        Self {
            path: path.into(),
            query,
        }
    }

    /// Split an href such as `/a/b?x=1#top`. The fragment is dropped.
    pub fn parse(href: &str) -> Self {
        let href = href.split_once('#').map_or(href, |(before, _)| before);
        let (path, query) = href.split_once('?').unwrap_or((href, ""));
        Self {
            path: if path.is_empty() { "/".to_owned() } else { path.to_owned() },
            query: query.to_owned(),
        }
    }

    /// The query string decoded into key/value state.
    pub fn state(&self) -> State {
        form_urlencoded::parse(self.query.as_bytes())
            .into_owned()
            .collect()
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.query.is_empty() {
            f.write_str(&self.path)
        } else {
            write!(f, "{}?{}", self.path, self.query)
        }
    }
}

/// Called with the new location whenever the history cursor moves.
pub type HistoryListener = Arc<dyn Fn(&Location) + Send + Sync>;

/// Session history as seen by the router.
///
/// `push_state` records an entry without notifying listeners; `back` and
/// `forward` notify them when the cursor actually moves.
pub trait History: Send + Sync {
    fn location(&self) -> Location;

    fn push_state(&self, location: Location);

    /// Step back one entry. Returns `false` at the start of history.
    fn back(&self) -> bool;

    /// Step forward one entry. Returns `false` at the end of history.
    fn forward(&self) -> bool;

    fn subscribe(&self, listener: HistoryListener);
}

struct Entries {
    stack: Vec<Location>,
    cursor: usize,
    listeners: Vec<HistoryListener>,
}

/// In-memory [`History`]: a stack of entries and a cursor.
pub struct MemoryHistory {
    inner: Mutex<Entries>,
}

impl MemoryHistory {
    /// History with a single entry at `/`.
    pub fn new() -> Self {
        Self::starting_at("/")
    }

    /// History with a single entry at `href`.
    pub fn starting_at(href: &str) -> Self {
        Self {
            inner: Mutex::new(Entries {
                stack: vec![Location::parse(href)],
                cursor: 0,
                listeners: Vec::new(),
            }),
        }
    }

    /// Every entry, oldest first.
    pub fn entries(&self) -> Vec<Location> {
        self.inner.lock().stack.clone()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().stack.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().stack.is_empty()
    }

    fn step(&self, forward: bool) -> bool {
        let (location, listeners) = {
            let mut inner = self.inner.lock();
            let target = if forward {
                inner.cursor + 1
            } else {
                match inner.cursor.checked_sub(1) {
                    Some(c) => c,
                    None => return false,
                }
            };
            if target >= inner.stack.len() {
                return false;
            }
            inner.cursor = target;
            (inner.stack[target].clone(), inner.listeners.clone())
        };
        for listener in &listeners {
            listener(&location);
        }
        true
    }
}

impl Default for MemoryHistory {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MemoryHistory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("MemoryHistory")
            .field("entries", &inner.stack.len())
            .field("cursor", &inner.cursor)
            .finish()
    }
}

impl History for MemoryHistory {
    fn location(&self) -> Location {
        let inner = self.inner.lock();
        inner.stack[inner.cursor].clone()
    }

    fn push_state(&self, location: Location) {
        let mut inner = self.inner.lock();
        let keep = inner.cursor + 1;
        inner.stack.truncate(keep);
        inner.stack.push(location);
        inner.cursor = keep;
    }

    fn back(&self) -> bool {
        self.step(false)
    }

    fn forward(&self) -> bool {
        self.step(true)
    }

    fn subscribe(&self, listener: HistoryListener) {
        self.inner.lock().listeners.push(listener);
    }
}
