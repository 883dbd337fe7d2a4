// overlay.rs - Modal overlays stacked above the game list.
//
// Four overlay types exist: the detail view, the edit form, the review form
// and the dashboard. Different types may stack (edit over detail, review form
// over detail) but each type is open at most once.
//
// Two pieces of page-wide state hang off the overlays:
//   1. the background scroll lock, held while *any* overlay is open
//   2. one Escape-key listener per open overlay
// Both are handed out as RAII guards stored next to the overlay, so closing an
// overlay (dropping its entry) releases exactly what opening it acquired.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};

use crate::error::OverlayError;
use crate::models::{GameId, GameRecord, ReviewRecord};

// ---------------------------------------------------------------------------
// Overlay identities
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlayKind {
    Detail,
    Edit,
    ReviewForm,
    Dashboard,
}

/// An open overlay together with the data it shows.
#[derive(Debug, Clone, PartialEq)]
pub enum Overlay {
    Detail(GameRecord),
    Edit(GameRecord),
    /// `review` is `None` when creating a new review.
    ReviewForm { game_id: GameId, review: Option<ReviewRecord> },
    Dashboard,
}

impl Overlay {
    pub fn kind(&self) -> OverlayKind {
        match self {
            Overlay::Detail(_) => OverlayKind::Detail,
            Overlay::Edit(_) => OverlayKind::Edit,
            Overlay::ReviewForm { .. } => OverlayKind::ReviewForm,
            Overlay::Dashboard => OverlayKind::Dashboard,
        }
    }

    /// The game this overlay is about, if any.
    pub fn game_id(&self) -> Option<&GameId> {
        match self {
            Overlay::Detail(g) | Overlay::Edit(g) => Some(&g.id),
            Overlay::ReviewForm { game_id, .. } => Some(game_id),
            Overlay::Dashboard => None,
        }
    }
}

/// Where a click on an overlay landed. The UI shell reports `Content` for
/// any click that bubbled up from inside the overlay's panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClickRegion {
    Backdrop,
    Content,
}

// ---------------------------------------------------------------------------
// Scroll lock
// ---------------------------------------------------------------------------

/// Reference-counted background scroll lock.
/// RUST NOTE: cloning a ScrollLock clones the `Arc`, so every clone points at
/// the same counter.
#[derive(Debug, Clone, Default)]
pub struct ScrollLock {
    holders: Arc<AtomicUsize>,
}

impl ScrollLock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn acquire(&self) -> ScrollGuard {
        self.holders.fetch_add(1, Ordering::SeqCst);
        ScrollGuard { holders: Arc::clone(&self.holders) }
    }

    pub fn is_locked(&self) -> bool {
        self.holders() > 0
    }

    pub fn holders(&self) -> usize {
        self.holders.load(Ordering::SeqCst)
    }
}

/// One hold on the scroll lock; released on drop.
#[derive(Debug)]
pub struct ScrollGuard {
    holders: Arc<AtomicUsize>,
}

impl Drop for ScrollGuard {
    fn drop(&mut self) {
        self.holders.fetch_sub(1, Ordering::SeqCst);
    }
}

// ---------------------------------------------------------------------------
// Key listeners
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct ListenerTable {
    next_id: u64,
    active:  Vec<(u64, OverlayKind)>,
}

/// Registry of global Escape-key listeners, newest last.
#[derive(Debug, Clone, Default)]
pub struct KeyListeners {
    table: Arc<Mutex<ListenerTable>>,
}

// A panic while holding the lock cannot leave the table half-edited, so a
// poisoned lock is still safe to use.
fn lock(table: &Mutex<ListenerTable>) -> MutexGuard<'_, ListenerTable> {
    table.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl KeyListeners {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, owner: OverlayKind) -> ListenerGuard {
        let mut table = lock(&self.table);
        table.next_id += 1;
        let id = table.next_id;
        table.active.push((id, owner));
        ListenerGuard { id, table: Arc::clone(&self.table) }
    }

    pub fn count(&self) -> usize {
        lock(&self.table).active.len()
    }

    pub fn is_registered(&self, owner: OverlayKind) -> bool {
        lock(&self.table).active.iter().any(|(_, kind)| *kind == owner)
    }

    /// The overlay whose listener was attached last; it receives the key.
    pub fn topmost(&self) -> Option<OverlayKind> {
        lock(&self.table).active.last().map(|(_, kind)| *kind)
    }
}

/// A registered listener; detached on drop.
#[derive(Debug)]
pub struct ListenerGuard {
    id:    u64,
    table: Arc<Mutex<ListenerTable>>,
}

impl Drop for ListenerGuard {
    fn drop(&mut self) {
        lock(&self.table).active.retain(|(id, _)| *id != self.id);
    }
}

// ---------------------------------------------------------------------------
// Coordinator
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct OpenOverlay {
    overlay: Overlay,
    _keys:   ListenerGuard,
    _scroll: ScrollGuard,
}

/// Stack of open overlays, bottom first.
#[derive(Debug, Default)]
pub struct OverlayCoordinator {
    stack:  Vec<OpenOverlay>,
    scroll: ScrollLock,
    keys:   KeyListeners,
}

impl OverlayCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a coordinator that shares page-wide resources with other owners.
    pub fn with_resources(scroll: ScrollLock, keys: KeyListeners) -> Self {
        OverlayCoordinator { stack: Vec::new(), scroll, keys }
    }

    pub fn scroll_lock(&self) -> &ScrollLock {
        &self.scroll
    }

    pub fn key_listeners(&self) -> &KeyListeners {
        &self.keys
    }

    pub fn is_open(&self, kind: OverlayKind) -> bool {
        self.position(kind).is_some()
    }

    pub fn any_open(&self) -> bool {
        !self.stack.is_empty()
    }

    pub fn top(&self) -> Option<&Overlay> {
        self.stack.last().map(|o| &o.overlay)
    }

    pub fn get(&self, kind: OverlayKind) -> Option<&Overlay> {
        self.position(kind).map(|i| &self.stack[i].overlay)
    }

    /// Open overlay types, bottom first.
    pub fn open_kinds(&self) -> Vec<OverlayKind> {
        self.stack.iter().map(|o| o.overlay.kind()).collect()
    }

    /// The game shown in the detail overlay, if it is open.
    pub fn detail_game(&self) -> Option<&GameRecord> {
        match self.get(OverlayKind::Detail) {
            Some(Overlay::Detail(game)) => Some(game),
            _ => None,
        }
    }

    /// Show one game. Replaces whatever was open.
    pub fn open_detail(&mut self, game: GameRecord) -> Vec<OverlayKind> {
        let closed = self.truncate(0);
        self.push(Overlay::Detail(game));
        closed
    }

    /// Open the edit form. An open detail overlay stays underneath it;
    /// everything else is closed.
    pub fn open_edit(&mut self, game: GameRecord) -> Vec<OverlayKind> {
        let keep = self.position(OverlayKind::Detail).map_or(0, |i| i + 1);
        let closed = self.truncate(keep);
        self.push(Overlay::Edit(game));
        closed
    }

    /// Open the review form above the detail overlay.
    pub fn open_review_form(
        &mut self,
        review: Option<ReviewRecord>,
    ) -> Result<Vec<OverlayKind>, OverlayError> {
        let detail = self.position(OverlayKind::Detail).ok_or(OverlayError::DetailNotOpen)?;
        let game_id = match &self.stack[detail].overlay {
            Overlay::Detail(game) => game.id.clone(),
            _ => return Err(OverlayError::DetailNotOpen),
        };
        let closed = self.truncate(detail + 1);
        self.push(Overlay::ReviewForm { game_id, review });
        Ok(closed)
    }

    /// The dashboard is the only overlay while it is open.
    pub fn open_dashboard(&mut self) -> Vec<OverlayKind> {
        let closed = self.truncate(0);
        self.push(Overlay::Dashboard);
        closed
    }

    /// Close `kind` and everything stacked above it. Returns the closed
    /// types, topmost first.
    pub fn close(&mut self, kind: OverlayKind) -> Vec<OverlayKind> {
        match self.position(kind) {
            Some(i) => self.truncate(i),
            None => Vec::new(),
        }
    }

    pub fn close_all(&mut self) -> Vec<OverlayKind> {
        self.truncate(0)
    }

    /// Escape closes only the topmost overlay of this coordinator's own
    /// stack, whatever else is registered in a shared `KeyListeners`.
    pub fn press_escape(&mut self) -> Option<OverlayKind> {
        let target = self.top()?.kind();
        self.close(target).into_iter().last()
    }

    /// A click on `kind`. Only clicks on the dimmed backdrop close it.
    pub fn click(&mut self, kind: OverlayKind, region: ClickRegion) -> Vec<OverlayKind> {
        match region {
            ClickRegion::Content => Vec::new(),
            ClickRegion::Backdrop => self.close(kind),
        }
    }

    /// Show fresh data for a game that was just updated.
    pub fn refresh_game(&mut self, game: &GameRecord) {
        for open in &mut self.stack {
            match &mut open.overlay {
                Overlay::Detail(g) | Overlay::Edit(g) if g.id == game.id => *g = game.clone(),
                _ => {}
            }
        }
    }

    /// Close every overlay that is about `id` (the game was deleted).
    pub fn close_for_game(&mut self, id: &GameId) -> Vec<OverlayKind> {
        match self.stack.iter().position(|o| o.overlay.game_id() == Some(id)) {
            Some(i) => self.truncate(i),
            None => Vec::new(),
        }
    }

    fn position(&self, kind: OverlayKind) -> Option<usize> {
        self.stack.iter().position(|o| o.overlay.kind() == kind)
    }

    fn push(&mut self, overlay: Overlay) {
        log::debug!("overlay opened: {:?}", overlay.kind());
        let kind = overlay.kind();
        self.stack.push(OpenOverlay {
            overlay,
            _keys: self.keys.register(kind),
            _scroll: self.scroll.acquire(),
        });
    }

    fn truncate(&mut self, len: usize) -> Vec<OverlayKind> {
        let mut closed = Vec::new();
        while self.stack.len() > len {
            if let Some(open) = self.stack.pop() {
                log::debug!("overlay closed: {:?}", open.overlay.kind());
                closed.push(open.overlay.kind());
            }
        }
        closed
    }
}
