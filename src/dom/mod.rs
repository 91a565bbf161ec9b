//! In-memory document tree the fragment is parsed into and wired onto.
//!
//! Nodes live in an arena and are addressed by [`NodeId`]. Detached nodes
//! (parsed fragments that have not been inserted yet) stay in the arena with
//! no parent until [`Document::insert_before`] attaches them.

mod parse;
mod serialize;

pub use parse::ParseError;

use std::collections::HashSet;

use crate::role::{Role, RoleSet};

/// Handle to a node in a [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

#[derive(Debug, Clone)]
enum NodeKind {
    Document,
    Element(Element),
    Text(String),
}

#[derive(Debug, Clone)]
struct Node {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    kind: NodeKind,
}

#[derive(Debug, Clone)]
struct Element {
    tag: String,
    attrs: Vec<(String, String)>,
    roles: RoleSet,
}

impl Element {
    fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
    root: NodeId,
    body: NodeId,
    active: Option<NodeId>,
    hidden_classes: HashSet<String>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Creates an empty document containing only a `<body>`.
    pub fn new() -> Self {
        let root = Node {
            parent: None,
            children: Vec::new(),
            kind: NodeKind::Document,
        };
        let mut doc = Self {
            nodes: vec![root],
            root: NodeId(0),
            body: NodeId(0),
            active: None,
            hidden_classes: HashSet::new(),
        };
        doc.body = doc.create_element(Some(doc.root), "body", Vec::new());
        doc
    }

    /// Creates a document whose body holds the given markup.
    pub fn with_body(html: &str) -> Result<Self, ParseError> {
        let mut doc = Self::new();
        let body = doc.body;
        parse::parse_into(&mut doc, body, html)?;
        Ok(doc)
    }

    /// Parses markup into a detached `<div>` container and returns it.
    ///
    /// Nothing reachable from the document root changes, whether or not
    /// parsing succeeds.
    pub fn parse_fragment(&mut self, html: &str) -> Result<NodeId, ParseError> {
        let container = self.create_element(None, "div", Vec::new());
        parse::parse_into(self, container, html)?;
        Ok(container)
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn body(&self) -> NodeId {
        self.body
    }

    fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    fn element(&self, id: NodeId) -> Option<&Element> {
        match &self.node(id)?.kind {
            NodeKind::Element(el) => Some(el),
            _ => None,
        }
    }

    fn element_mut(&mut self, id: NodeId) -> Option<&mut Element> {
        match &mut self.nodes.get_mut(id.0)?.kind {
            NodeKind::Element(el) => Some(el),
            _ => None,
        }
    }

    pub(crate) fn create_element(
        &mut self,
        parent: Option<NodeId>,
        tag: &str,
        attrs: Vec<(String, String)>,
    ) -> NodeId {
        self.push_node(
            parent,
            NodeKind::Element(Element {
                tag: tag.to_ascii_lowercase(),
                attrs,
                roles: RoleSet::default(),
            }),
        )
    }

    pub(crate) fn create_text(&mut self, parent: NodeId, text: String) -> NodeId {
        self.push_node(Some(parent), NodeKind::Text(text))
    }

    fn push_node(&mut self, parent: Option<NodeId>, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            parent,
            children: Vec::new(),
            kind,
        });
        if let Some(parent) = parent {
            self.nodes[parent.0].children.push(id);
        }
        id
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        self.element(id).is_some()
    }

    pub fn tag_name(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(|el| el.tag.as_str())
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id)?.parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.node(id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    pub fn first_element_child(&self, id: NodeId) -> Option<NodeId> {
        self.children(id)
            .iter()
            .copied()
            .find(|child| self.is_element(*child))
    }

    /// All nodes below `id` in document order, excluding `id` itself.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.children(next).iter().rev().copied());
        }
        out
    }

    /// `id` followed by its element descendants, in document order.
    pub fn subtree_elements(&self, id: NodeId) -> Vec<NodeId> {
        std::iter::once(id)
            .chain(self.descendants(id))
            .filter(|node| self.is_element(*node))
            .collect()
    }

    /// Inclusive containment, like `Node.contains`.
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.parent(id);
        }
        false
    }

    pub fn is_attached(&self, id: NodeId) -> bool {
        self.contains(self.root, id)
    }

    pub fn element_by_id(&self, element_id: &str) -> Option<NodeId> {
        self.descendants(self.root)
            .into_iter()
            .find(|node| self.attr(*node, "id") == Some(element_id))
    }

    /// Moves `child` under `parent`, before `reference` (or last when `None`).
    pub fn insert_before(&mut self, parent: NodeId, child: NodeId, reference: Option<NodeId>) {
        if self.node(parent).is_none() || self.node(child).is_none() || self.contains(child, parent)
        {
            return;
        }
        self.detach(child);
        let siblings = &mut self.nodes[parent.0].children;
        let at = reference
            .and_then(|r| siblings.iter().position(|c| *c == r))
            .unwrap_or(siblings.len());
        siblings.insert(at, child);
        self.nodes[child.0].parent = Some(parent);
    }

    pub fn prepend(&mut self, parent: NodeId, child: NodeId) {
        let first = self.children(parent).first().copied();
        self.insert_before(parent, child, first);
    }

    pub fn detach(&mut self, child: NodeId) {
        if let Some(parent) = self.parent(child) {
            self.nodes[parent.0].children.retain(|c| *c != child);
            self.nodes[child.0].parent = None;
        }
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id)?.attr(name)
    }

    pub fn has_attr(&self, id: NodeId, name: &str) -> bool {
        self.attr(id, name).is_some()
    }

    pub fn set_attr(&mut self, id: NodeId, name: &str, value: &str) {
        let Some(el) = self.element_mut(id) else {
            return;
        };
        match el.attrs.iter_mut().find(|(key, _)| key == name) {
            Some((_, existing)) => *existing = value.to_string(),
            None => el.attrs.push((name.to_string(), value.to_string())),
        }
    }

    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.attr(id, "class")
            .is_some_and(|list| list.split_ascii_whitespace().any(|c| c == class))
    }

    pub fn add_class(&mut self, id: NodeId, class: &str) {
        if !self.is_element(id) || self.has_class(id, class) {
            return;
        }
        let list = match self.attr(id, "class") {
            Some(existing) if !existing.trim().is_empty() => format!("{} {class}", existing.trim()),
            _ => class.to_string(),
        };
        self.set_attr(id, "class", &list);
    }

    pub fn remove_class(&mut self, id: NodeId, class: &str) {
        let Some(existing) = self.attr(id, "class") else {
            return;
        };
        let list = existing
            .split_ascii_whitespace()
            .filter(|c| *c != class)
            .collect::<Vec<_>>()
            .join(" ");
        self.set_attr(id, "class", &list);
    }

    /// Reads one declaration from the inline `style` attribute.
    pub fn style(&self, id: NodeId, property: &str) -> Option<String> {
        let style = self.attr(id, "style")?;
        style_declarations(style)
            .into_iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(property))
            .map(|(_, value)| value)
    }

    /// Sets one declaration in the inline `style` attribute, keeping the others.
    pub fn set_style(&mut self, id: NodeId, property: &str, value: &str) {
        if !self.is_element(id) {
            return;
        }
        let mut decls = self
            .attr(id, "style")
            .map(style_declarations)
            .unwrap_or_default();
        match decls
            .iter_mut()
            .find(|(name, _)| name.eq_ignore_ascii_case(property))
        {
            Some((_, existing)) => *existing = value.to_string(),
            None => decls.push((property.to_string(), value.to_string())),
        }
        let style = decls
            .iter()
            .map(|(name, value)| format!("{name}: {value};"))
            .collect::<Vec<_>>()
            .join(" ");
        self.set_attr(id, "style", &style);
    }

    pub fn roles(&self, id: NodeId) -> RoleSet {
        self.element(id).map(|el| el.roles).unwrap_or_default()
    }

    pub fn add_role(&mut self, id: NodeId, role: Role) {
        if let Some(el) = self.element_mut(id) {
            el.roles.insert(role);
        }
    }

    /// Elements in `id`'s subtree (inclusive) carrying `role`.
    pub fn with_role(&self, id: NodeId, role: Role) -> Vec<NodeId> {
        self.subtree_elements(id)
            .into_iter()
            .filter(|node| self.roles(*node).contains(role))
            .collect()
    }

    /// Treats elements carrying `class` as `display: none`.
    pub fn hide_with_class(&mut self, class: &str) {
        self.hidden_classes.insert(class.to_string());
    }

    /// Whether the element takes part in layout: attached, and neither it
    /// nor an ancestor is hidden by attribute, inline style or hidden class.
    pub fn is_rendered(&self, id: NodeId) -> bool {
        if !self.is_element(id) || !self.is_attached(id) {
            return false;
        }
        let mut current = Some(id);
        while let Some(node) = current {
            if self.is_element(node) && self.hides_itself(node) {
                return false;
            }
            current = self.parent(node);
        }
        true
    }

    fn hides_itself(&self, id: NodeId) -> bool {
        self.has_attr(id, "hidden")
            || self
                .style(id, "display")
                .is_some_and(|display| display.trim().eq_ignore_ascii_case("none"))
            || self
                .hidden_classes
                .iter()
                .any(|class| self.has_class(id, class))
    }

    /// Matches `a[href], button:not([disabled]), input:not([disabled]),
    /// textarea:not([disabled]), select:not([disabled]),
    /// [tabindex]:not([tabindex="-1"])`.
    pub fn is_focusable(&self, id: NodeId) -> bool {
        let Some(tag) = self.tag_name(id) else {
            return false;
        };
        let natively = match tag {
            "a" => self.has_attr(id, "href"),
            "button" | "input" | "textarea" | "select" => !self.has_attr(id, "disabled"),
            _ => false,
        };
        natively || self.attr(id, "tabindex").is_some_and(|t| t.trim() != "-1")
    }

    /// Focusable descendants of `id` in document order.
    pub fn focusables(&self, id: NodeId) -> Vec<NodeId> {
        self.descendants(id)
            .into_iter()
            .filter(|node| self.is_focusable(*node))
            .collect()
    }

    /// The focused element, or `None` when focus rests on the body.
    pub fn active_element(&self) -> Option<NodeId> {
        self.active
    }

    /// Moves focus to `id` if it can receive focus. Returns whether it did.
    pub fn focus(&mut self, id: NodeId) -> bool {
        if self.is_focusable(id) && self.is_rendered(id) {
            self.active = Some(id);
            true
        } else {
            false
        }
    }

    pub fn blur(&mut self) {
        self.active = None;
    }

    pub fn text_content(&self, id: NodeId) -> String {
        match self.node(id).map(|n| &n.kind) {
            Some(NodeKind::Text(text)) => text.clone(),
            Some(_) => self
                .children(id)
                .iter()
                .map(|child| self.text_content(*child))
                .collect(),
            None => String::new(),
        }
    }
}

fn style_declarations(style: &str) -> Vec<(String, String)> {
    style
        .split(';')
        .filter_map(|decl| {
            let (name, value) = decl.split_once(':')?;
            let name = name.trim();
            (!name.is_empty()).then(|| (name.to_string(), value.trim().to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_document_has_body() {
        let doc = Document::new();
        assert_eq!(doc.tag_name(doc.body()), Some("body"));
        assert!(doc.is_attached(doc.body()));
        assert_eq!(doc.active_element(), None);
    }

    #[test]
    fn test_parse_fragment_stays_detached() {
        let mut doc = Document::with_body("<main>page</main>").unwrap();
        let container = doc.parse_fragment("<header id=\"top\"></header>").unwrap();

        let header = doc.first_element_child(container).unwrap();
        assert!(!doc.is_attached(header));
        assert_eq!(doc.element_by_id("top"), None);
        assert_eq!(doc.children(doc.body()).len(), 1);
    }

    #[test]
    fn test_prepend_moves_before_existing_content() {
        let mut doc = Document::with_body("<main id=\"main\"></main>").unwrap();
        let container = doc.parse_fragment("<header id=\"top\"></header>").unwrap();
        let header = doc.first_element_child(container).unwrap();

        doc.prepend(doc.body(), header);

        assert_eq!(doc.children(doc.body())[0], header);
        assert_eq!(doc.element_by_id("top"), Some(header));
        assert!(doc.children(container).is_empty());
    }

    #[test]
    fn test_class_list_editing() {
        let mut doc = Document::with_body("<div id=\"m\" class=\"a  hidden b\"></div>").unwrap();
        let m = doc.element_by_id("m").unwrap();

        doc.remove_class(m, "hidden");
        assert_eq!(doc.attr(m, "class"), Some("a b"));
        doc.add_class(m, "hidden");
        doc.add_class(m, "hidden");
        assert_eq!(doc.attr(m, "class"), Some("a b hidden"));
    }

    #[test]
    fn test_set_style_keeps_other_declarations() {
        let mut doc = Document::with_body("<div id=\"d\" style=\"color: red\"></div>").unwrap();
        let d = doc.element_by_id("d").unwrap();

        doc.set_style(d, "cursor", "pointer");

        assert_eq!(doc.style(d, "cursor").as_deref(), Some("pointer"));
        assert_eq!(doc.style(d, "color").as_deref(), Some("red"));
    }

    #[test]
    fn test_focusable_selector() {
        let doc = Document::with_body(
            r#"<a id="l" href="/x">x</a><a id="bare">y</a>
               <button id="b"></button><button id="bd" disabled></button>
               <div id="t" tabindex="0"></div><div id="tn" tabindex="-1"></div>"#,
        )
        .unwrap();
        let is = |id| doc.is_focusable(doc.element_by_id(id).unwrap());

        assert!(is("l"));
        assert!(!is("bare"));
        assert!(is("b"));
        assert!(!is("bd"));
        assert!(is("t"));
        assert!(!is("tn"));
    }

    #[test]
    fn test_rendering_follows_hidden_ancestors() {
        let mut doc = Document::with_body(
            r#"<div id="p" class="hidden"><a id="in" href="/">in</a></div>
               <div style="display:none"><a id="styled" href="/">s</a></div>
               <a id="out" href="/">out</a>"#,
        )
        .unwrap();
        let inner = doc.element_by_id("in").unwrap();
        let styled = doc.element_by_id("styled").unwrap();
        let out = doc.element_by_id("out").unwrap();

        assert!(doc.is_rendered(inner));
        doc.hide_with_class("hidden");
        assert!(!doc.is_rendered(inner));
        assert!(!doc.is_rendered(styled));
        assert!(doc.is_rendered(out));

        assert!(!doc.focus(inner));
        assert!(doc.focus(out));
        assert_eq!(doc.active_element(), Some(out));
    }

    #[test]
    fn test_contains_is_inclusive() {
        let doc = Document::with_body("<nav id=\"n\"><span id=\"s\"></span></nav>").unwrap();
        let n = doc.element_by_id("n").unwrap();
        let s = doc.element_by_id("s").unwrap();

        assert!(doc.contains(n, s));
        assert!(doc.contains(n, n));
        assert!(!doc.contains(s, n));
    }
}
