//! Fragment wiring: parse, resolve links, inject, attach behavior.
//!
//! Everything here is synchronous and runs once, after the fetch completed.
//! The fragment is parsed and its links resolved while still detached, so a
//! failure leaves the page untouched.

use url::Url;

use crate::config::{RootPolicy, Settings};
use crate::dom::{Document, NodeId};
use crate::fetch::LoadedFragment;
use crate::links::{is_active, PathMatch, SiteRoot};
use crate::menu::Menu;
use crate::page::{EventKind, EventTarget, Handler, Listeners, Page};
use crate::role::{tag_roles, Role};
use crate::Error;

/// What wiring did to the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Wiring {
    /// The injected fragment root, now the first child of `<body>`.
    pub root: NodeId,
    pub site_root: SiteRoot,
    /// Elements whose link target was rewritten.
    pub resolved_links: usize,
    /// Elements that received a click listener.
    pub click_targets: usize,
    pub menu_attached: bool,
    /// Nav links marked as pointing at the current page.
    pub active_links: Vec<NodeId>,
}

/// The single click behavior an element gets, chosen by role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ClickBehavior {
    Deferred,
    CallToAction,
    Resolved,
}

pub fn wire(page: &mut Page, fragment: &LoadedFragment, settings: &Settings) -> Result<Wiring, Error> {
    if page.injected().is_some() {
        return Err(Error::AlreadyInjected);
    }

    let location = page.location().clone();
    let container = page.document_mut().parse_fragment(&fragment.html)?;
    let root = page
        .document()
        .first_element_child(container)
        .ok_or(Error::EmptyFragment)?;

    let site_root = site_root_for(&settings.root, &fragment.served_url, &location, settings);

    let (doc, listeners) = page.parts_mut();
    tag_roles(doc, root, settings);
    let resolved_links = resolve_links(doc, root, &site_root, settings);

    let body = doc.body();
    doc.prepend(body, root);

    let click_targets = wire_clicks(doc, listeners, root, settings);
    let menu = find_menu(doc, root, settings)
        .map(|(toggle, panel)| Menu::attach(doc, listeners, toggle, panel, &settings.menu.hidden_class));
    let active_links = mark_active_links(doc, root, &location, settings);

    let menu_attached = menu.is_some();
    if let Some(menu) = menu {
        page.set_menu(menu);
    }
    page.set_injected(root);

    tracing::info!(
        site_root = %site_root,
        resolved_links,
        click_targets,
        menu_attached,
        active_links = active_links.len(),
        "wired nav fragment"
    );

    Ok(Wiring {
        root,
        site_root,
        resolved_links,
        click_targets,
        menu_attached,
        active_links,
    })
}

fn site_root_for(policy: &RootPolicy, served_url: &str, location: &Url, settings: &Settings) -> SiteRoot {
    match policy {
        RootPolicy::Fixed { path } => SiteRoot::fixed(path),
        RootPolicy::Discovered => {
            SiteRoot::discover(served_url, location, settings.fragment_path()).unwrap_or_else(|| {
                tracing::debug!(%served_url, "site root undeterminable, resolving links root-relative");
                SiteRoot::root_relative()
            })
        }
    }
}

/// Anchors get the resolved target as `href`; other elements carry it in the
/// resolved-target attribute for click wiring.
fn resolve_links(doc: &mut Document, root: NodeId, site_root: &SiteRoot, settings: &Settings) -> usize {
    let attrs = &settings.attributes;
    let marked = doc.with_role(root, Role::LinkTarget);
    for &node in &marked {
        let target = doc.attr(node, &attrs.link_target).unwrap_or_default();
        let resolved = site_root.resolve(target);
        if doc.tag_name(node) == Some("a") {
            doc.set_attr(node, "href", &resolved);
        } else {
            doc.set_attr(node, &attrs.resolved_target, &resolved);
        }
    }
    marked.len()
}

fn click_behavior(doc: &Document, node: NodeId, settings: &Settings) -> Option<ClickBehavior> {
    let roles = doc.roles(node);
    if roles.contains(Role::MobileLink) {
        Some(ClickBehavior::Deferred)
    } else if roles.contains(Role::CallToAction) {
        Some(ClickBehavior::CallToAction)
    } else if doc.has_attr(node, &settings.attributes.resolved_target) {
        Some(ClickBehavior::Resolved)
    } else {
        None
    }
}

/// Resolved target, else the raw link-target attribute, else `href`.
/// Resolved anchors keep their resolved target in `href`.
fn navigation_target(doc: &Document, node: NodeId, settings: &Settings) -> Option<String> {
    let attrs = &settings.attributes;
    let resolved = if doc.tag_name(node) == Some("a") && doc.roles(node).contains(Role::LinkTarget) {
        "href"
    } else {
        attrs.resolved_target.as_str()
    };
    [resolved, attrs.link_target.as_str(), "href"]
        .into_iter()
        .find_map(|name| doc.attr(node, name).filter(|value| !value.is_empty()))
        .map(str::to_string)
}

fn wire_clicks(doc: &mut Document, listeners: &mut Listeners, root: NodeId, settings: &Settings) -> usize {
    let mut wired = 0;
    for node in doc.subtree_elements(root) {
        if doc.has_attr(node, &settings.attributes.resolved_target) {
            doc.set_style(node, "cursor", "pointer");
        }
        let Some(behavior) = click_behavior(doc, node, settings) else {
            continue;
        };
        let Some(target) = navigation_target(doc, node, settings) else {
            continue;
        };
        let handler = match behavior {
            ClickBehavior::Deferred => Handler::NavigateAfter {
                target,
                delay: settings.mobile_nav_delay(),
            },
            ClickBehavior::CallToAction | ClickBehavior::Resolved => Handler::Navigate(target),
        };
        listeners.add(EventTarget::Node(node), EventKind::Click, handler);
        wired += 1;
    }
    wired
}

/// Controls tagged inside the fragment win; otherwise the ids are looked up
/// in the whole page, so a host page may supply its own controls.
fn find_menu(doc: &Document, root: NodeId, settings: &Settings) -> Option<(NodeId, NodeId)> {
    let tagged = |role| doc.with_role(root, role).into_iter().next();
    let toggle = tagged(Role::MenuToggle).or_else(|| doc.element_by_id(&settings.menu.toggle_id));
    let panel = tagged(Role::MenuPanel).or_else(|| doc.element_by_id(&settings.menu.panel_id));
    match (toggle, panel) {
        (Some(toggle), Some(panel)) => Some((toggle, panel)),
        _ => {
            tracing::debug!(
                toggle = toggle.is_some(),
                panel = panel.is_some(),
                "menu controls missing, menu stays inert"
            );
            None
        }
    }
}

fn mark_active_links(doc: &mut Document, root: NodeId, location: &Url, settings: &Settings) -> Vec<NodeId> {
    let mode = match settings.root {
        RootPolicy::Discovered => PathMatch::Exact,
        RootPolicy::Fixed { .. } => PathMatch::Suffix,
    };
    let mut active = Vec::new();
    for node in doc.with_role(root, Role::NavLink) {
        let target = doc
            .attr(node, "href")
            .or_else(|| doc.attr(node, &settings.attributes.link_target))
            .filter(|href| !href.is_empty());
        let Some(target) = target else {
            continue;
        };
        if is_active(target, location, mode) {
            active.push(node);
        }
    }
    for &node in &active {
        for class in &settings.classes.active {
            doc.add_class(node, class);
        }
    }
    active
}
