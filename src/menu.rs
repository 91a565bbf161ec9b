//! Disclosure menu: a toggle control that opens and closes a panel.
//!
//! [`Menu`] owns the open/closed state. The `aria-*` attributes and the
//! hidden class on the two elements are rendered from that state after every
//! transition and are never read back.

use crate::dom::{Document, NodeId};
use crate::page::{EventKind, EventTarget, Handler, Key, KeyEvent, ListenerId, Listeners};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuState {
    Closed,
    /// `restore_focus` is the element focused when the menu opened.
    Open { restore_focus: Option<NodeId> },
}

#[derive(Debug)]
pub struct Menu {
    toggle: NodeId,
    panel: NodeId,
    hidden_class: String,
    state: MenuState,
    key_listener: Option<ListenerId>,
}

impl Menu {
    /// Renders the closed state and installs the toggle and outside-click
    /// listeners. Both stay for the page's lifetime.
    pub fn attach(
        doc: &mut Document,
        listeners: &mut Listeners,
        toggle: NodeId,
        panel: NodeId,
        hidden_class: &str,
    ) -> Self {
        doc.hide_with_class(hidden_class);
        let menu = Self {
            toggle,
            panel,
            hidden_class: hidden_class.to_string(),
            state: MenuState::Closed,
            key_listener: None,
        };
        menu.render(doc);
        listeners.add(EventTarget::Node(toggle), EventKind::Click, Handler::ToggleMenu);
        listeners.add(EventTarget::Document, EventKind::Click, Handler::DismissMenu);
        menu
    }

    pub fn state(&self) -> MenuState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        matches!(self.state, MenuState::Open { .. })
    }

    pub fn panel(&self) -> NodeId {
        self.panel
    }

    pub fn open(&mut self, doc: &mut Document, listeners: &mut Listeners) {
        if self.is_open() {
            return;
        }
        self.state = MenuState::Open {
            restore_focus: doc.active_element(),
        };
        self.render(doc);

        let first = doc
            .focusables(self.panel)
            .into_iter()
            .find(|node| doc.is_rendered(*node));
        if let Some(first) = first {
            doc.focus(first);
        }
        self.key_listener =
            Some(listeners.add(EventTarget::Document, EventKind::KeyDown, Handler::MenuKeys));
    }

    pub fn close(&mut self, doc: &mut Document, listeners: &mut Listeners) {
        let MenuState::Open { restore_focus } = self.state else {
            return;
        };
        self.state = MenuState::Closed;
        self.render(doc);

        if let Some(id) = self.key_listener.take() {
            listeners.remove(id);
        }

        let restored = restore_focus.is_some_and(|node| doc.focus(node));
        if !restored && doc.active_element().is_some_and(|node| !doc.is_rendered(node)) {
            doc.blur();
        }
    }

    pub fn toggle(&mut self, doc: &mut Document, listeners: &mut Listeners) {
        if self.is_open() {
            self.close(doc, listeners);
        } else {
            self.open(doc, listeners);
        }
    }

    /// Closes the menu when a click lands outside both the panel and the
    /// toggle. No-op while closed.
    pub fn dismiss_outside(&mut self, doc: &mut Document, listeners: &mut Listeners, target: NodeId) {
        if !self.is_open() {
            return;
        }
        if !doc.contains(self.panel, target) && !doc.contains(self.toggle, target) {
            self.close(doc, listeners);
        }
    }

    /// Escape closes; Tab and Shift+Tab wrap around the panel's rendered
    /// focusables. Returns whether the key's default action is suppressed.
    pub fn handle_key(
        &mut self,
        doc: &mut Document,
        listeners: &mut Listeners,
        event: &KeyEvent,
    ) -> bool {
        match event.key {
            Key::Escape => {
                self.close(doc, listeners);
                true
            }
            Key::Tab => self.trap_tab(doc, event.shift),
            _ => false,
        }
    }

    fn trap_tab(&self, doc: &mut Document, backwards: bool) -> bool {
        let focusables: Vec<NodeId> = doc
            .focusables(self.panel)
            .into_iter()
            .filter(|node| doc.is_rendered(*node))
            .collect();
        let (Some(&first), Some(&last)) = (focusables.first(), focusables.last()) else {
            return false;
        };
        let active = doc.active_element();
        let (edge, wrap_to) = if backwards { (first, last) } else { (last, first) };
        if active == Some(edge) {
            doc.focus(wrap_to);
            true
        } else {
            false
        }
    }

    fn render(&self, doc: &mut Document) {
        let open = self.is_open();
        if open {
            doc.remove_class(self.panel, &self.hidden_class);
        } else {
            doc.add_class(self.panel, &self.hidden_class);
        }
        doc.set_attr(self.panel, "aria-hidden", if open { "false" } else { "true" });
        doc.set_attr(self.toggle, "aria-expanded", if open { "true" } else { "false" });
    }
}
