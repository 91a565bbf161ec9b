//! The host page: document, location, listeners, focus, timers.
//!
//! Listeners are typed [`Handler`]s rather than closures, so the page can
//! dispatch events to the wired behavior without shared ownership of the
//! document. Events bubble from the target to the document, then the
//! default action runs unless a handler suppressed it.

use std::time::Duration;

use url::Url;

use crate::dom::{Document, NodeId};
use crate::menu::Menu;
use crate::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventTarget {
    Document,
    Node(NodeId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Click,
    KeyDown,
}

/// What a listener does when its event fires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Handler {
    /// Navigate the page to the target right away.
    Navigate(String),
    /// Navigate after `delay` of page time.
    NavigateAfter { target: String, delay: Duration },
    ToggleMenu,
    /// Close the menu if the click landed outside it.
    DismissMenu,
    /// Escape and focus trapping while the menu is open.
    MenuKeys,
}

#[derive(Debug, Clone)]
struct Registration {
    id: ListenerId,
    target: EventTarget,
    kind: EventKind,
    handler: Handler,
}

#[derive(Debug, Clone, Default)]
pub struct Listeners {
    next_id: u64,
    entries: Vec<Registration>,
}

impl Listeners {
    pub fn add(&mut self, target: EventTarget, kind: EventKind, handler: Handler) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.entries.push(Registration {
            id,
            target,
            kind,
            handler,
        });
        id
    }

    /// Returns whether `id` was registered.
    pub fn remove(&mut self, id: ListenerId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|entry| entry.id != id);
        self.entries.len() != before
    }

    pub fn count(&self, target: EventTarget, kind: EventKind) -> usize {
        self.entries
            .iter()
            .filter(|entry| entry.target == target && entry.kind == kind)
            .count()
    }

    pub fn handlers(&self, target: EventTarget, kind: EventKind) -> Vec<Handler> {
        self.entries
            .iter()
            .filter(|entry| entry.target == target && entry.kind == kind)
            .map(|entry| entry.handler.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Key {
    Escape,
    Tab,
    Enter,
    Other(String),
}

impl Key {
    /// Maps a DOM `KeyboardEvent.key` value. `Esc` is the legacy name some
    /// browsers still report for Escape.
    pub fn from_name(name: &str) -> Self {
        match name {
            "Escape" | "Esc" => Key::Escape,
            "Tab" => Key::Tab,
            "Enter" => Key::Enter,
            other => Key::Other(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyEvent {
    pub key: Key,
    pub shift: bool,
}

impl KeyEvent {
    pub fn new(key: Key) -> Self {
        Self { key, shift: false }
    }

    pub fn with_shift(key: Key) -> Self {
        Self { key, shift: true }
    }
}

#[derive(Debug, Clone)]
struct Timer {
    due: Duration,
    target: String,
}

enum Event<'a> {
    Click(NodeId),
    Key(&'a KeyEvent),
}

#[derive(Debug)]
pub struct Page {
    document: Document,
    location: Url,
    script_src: Option<String>,
    listeners: Listeners,
    menu: Option<Menu>,
    injected: Option<NodeId>,
    timers: Vec<Timer>,
    now: Duration,
    history: Vec<Url>,
}

impl Page {
    pub fn new(location: Url, document: Document) -> Self {
        Self {
            document,
            location,
            script_src: None,
            listeners: Listeners::default(),
            menu: None,
            injected: None,
            timers: Vec::new(),
            now: Duration::ZERO,
            history: Vec::new(),
        }
    }

    /// Builds a page at `location` whose body holds `body_html`.
    pub fn parse(location: &str, body_html: &str) -> Result<Self, Error> {
        let location = Url::parse(location)?;
        let document = Document::with_body(body_html)?;
        Ok(Self::new(location, document))
    }

    /// Records the `src` of the script doing the include, as
    /// `document.currentScript.src` would report it.
    pub fn with_script_src(mut self, src: impl Into<String>) -> Self {
        self.script_src = Some(src.into());
        self
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.document
    }

    pub fn location(&self) -> &Url {
        &self.location
    }

    pub fn script_src(&self) -> Option<&str> {
        self.script_src.as_deref()
    }

    pub fn listeners(&self) -> &Listeners {
        &self.listeners
    }

    pub fn menu(&self) -> Option<&Menu> {
        self.menu.as_ref()
    }

    /// The injected fragment root, once wiring has run.
    pub fn injected(&self) -> Option<NodeId> {
        self.injected
    }

    /// Every navigation so far, oldest first.
    pub fn history(&self) -> &[Url] {
        &self.history
    }

    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    pub(crate) fn parts_mut(&mut self) -> (&mut Document, &mut Listeners) {
        (&mut self.document, &mut self.listeners)
    }

    pub(crate) fn set_menu(&mut self, menu: Menu) {
        self.menu = Some(menu);
    }

    pub(crate) fn set_injected(&mut self, root: NodeId) {
        self.injected = Some(root);
    }

    /// Opens the menu programmatically. Returns `false` when there is none.
    pub fn open_menu(&mut self) -> bool {
        match self.menu.as_mut() {
            Some(menu) => {
                menu.open(&mut self.document, &mut self.listeners);
                true
            }
            None => false,
        }
    }

    /// Closes the menu programmatically. Returns `false` when there is none.
    pub fn close_menu(&mut self) -> bool {
        match self.menu.as_mut() {
            Some(menu) => {
                menu.close(&mut self.document, &mut self.listeners);
                true
            }
            None => false,
        }
    }

    /// Dispatches a click on `target`. Returns whether the default action
    /// (following an enclosing link) was suppressed.
    pub fn click(&mut self, target: NodeId) -> bool {
        let mut suppressed = false;
        let mut current = Some(target);
        while let Some(node) = current {
            for handler in self.listeners.handlers(EventTarget::Node(node), EventKind::Click) {
                suppressed |= self.run(&handler, &Event::Click(target));
            }
            current = self.document.parent(node);
        }
        for handler in self.listeners.handlers(EventTarget::Document, EventKind::Click) {
            suppressed |= self.run(&handler, &Event::Click(target));
        }

        if !suppressed {
            if let Some(href) = self.enclosing_link(target) {
                self.navigate(&href);
            }
        }
        suppressed
    }

    /// Dispatches a key press to the document. Returns whether the default
    /// action (sequential focus movement for Tab) was suppressed.
    pub fn key_down(&mut self, event: &KeyEvent) -> bool {
        let mut suppressed = false;
        for handler in self.listeners.handlers(EventTarget::Document, EventKind::KeyDown) {
            suppressed |= self.run(&handler, &Event::Key(event));
        }
        if !suppressed && event.key == Key::Tab {
            self.move_focus(event.shift);
        }
        suppressed
    }

    /// Advances page time and fires the timers that came due, in order.
    pub fn advance(&mut self, by: Duration) {
        self.now += by;
        let (mut due, pending): (Vec<Timer>, Vec<Timer>) =
            self.timers.drain(..).partition(|timer| timer.due <= self.now);
        self.timers = pending;
        due.sort_by_key(|timer| timer.due);
        for timer in due {
            self.navigate(&timer.target);
        }
    }

    /// Sets the location, resolving `href` against the current one.
    pub fn navigate(&mut self, href: &str) {
        match self.location.join(href) {
            Ok(url) => {
                tracing::debug!(to = %url, "navigating");
                self.history.push(url.clone());
                self.location = url;
            }
            Err(err) => tracing::debug!(%href, %err, "ignoring navigation to malformed URL"),
        }
    }

    fn run(&mut self, handler: &Handler, event: &Event<'_>) -> bool {
        match (handler, event) {
            (Handler::Navigate(target), _) => {
                self.navigate(target);
                true
            }
            (Handler::NavigateAfter { target, delay }, _) => {
                self.timers.push(Timer {
                    due: self.now + *delay,
                    target: target.clone(),
                });
                true
            }
            (Handler::ToggleMenu, _) => {
                if let Some(menu) = self.menu.as_mut() {
                    menu.toggle(&mut self.document, &mut self.listeners);
                }
                false
            }
            (Handler::DismissMenu, Event::Click(target)) => {
                if let Some(menu) = self.menu.as_mut() {
                    menu.dismiss_outside(&mut self.document, &mut self.listeners, *target);
                }
                false
            }
            (Handler::MenuKeys, Event::Key(key)) => match self.menu.as_mut() {
                Some(menu) => menu.handle_key(&mut self.document, &mut self.listeners, key),
                None => false,
            },
            _ => false,
        }
    }

    fn enclosing_link(&self, target: NodeId) -> Option<String> {
        let mut current = Some(target);
        while let Some(node) = current {
            if self.document.tag_name(node) == Some("a") {
                return self.document.attr(node, "href").map(str::to_string);
            }
            current = self.document.parent(node);
        }
        None
    }

    fn move_focus(&mut self, backwards: bool) {
        let doc = &mut self.document;
        let order: Vec<NodeId> = doc
            .focusables(doc.root())
            .into_iter()
            .filter(|node| doc.is_rendered(*node))
            .collect();
        if order.is_empty() {
            return;
        }
        let position = doc
            .active_element()
            .and_then(|active| order.iter().position(|node| *node == active));
        let next = match (position, backwards) {
            (None, false) => 0,
            (None, true) => order.len() - 1,
            (Some(i), false) => (i + 1) % order.len(),
            (Some(i), true) => (i + order.len() - 1) % order.len(),
        };
        doc.focus(order[next]);
    }
}
