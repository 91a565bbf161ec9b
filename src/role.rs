//! Typed role tags for fragment elements.
//!
//! Roles are attached once, right after the fragment is parsed, from the
//! marker attributes and classes named in [`Settings`]. Wiring dispatches on
//! the tags instead of re-reading attribute strings.

use crate::config::Settings;
use crate::dom::{Document, NodeId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Carries the link-target attribute (`data-href`).
    LinkTarget,
    /// Menu controls inside the fragment. Wiring prefers these over the
    /// page-wide id lookup.
    MenuToggle,
    MenuPanel,
    CallToAction,
    MobileLink,
    NavLink,
}

impl Role {
    pub const ALL: [Role; 6] = [
        Role::LinkTarget,
        Role::MenuToggle,
        Role::MenuPanel,
        Role::CallToAction,
        Role::MobileLink,
        Role::NavLink,
    ];

    fn bit(self) -> u8 {
        1 << self as u8
    }
}

/// Small set of [`Role`]s.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RoleSet(u8);

impl RoleSet {
    pub fn contains(self, role: Role) -> bool {
        self.0 & role.bit() != 0
    }

    pub fn insert(&mut self, role: Role) {
        self.0 |= role.bit();
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn iter(self) -> impl Iterator<Item = Role> {
        Role::ALL.into_iter().filter(move |role| self.contains(*role))
    }
}

impl FromIterator<Role> for RoleSet {
    fn from_iter<I: IntoIterator<Item = Role>>(iter: I) -> Self {
        let mut set = RoleSet::default();
        for role in iter {
            set.insert(role);
        }
        set
    }
}

/// Tags `root` and every element below it. Returns how many elements got at
/// least one role.
pub fn tag_roles(doc: &mut Document, root: NodeId, settings: &Settings) -> usize {
    let mut tagged = 0;
    for node in doc.subtree_elements(root) {
        let roles = roles_for(doc, node, settings);
        if roles.is_empty() {
            continue;
        }
        for role in roles.iter() {
            doc.add_role(node, role);
        }
        tagged += 1;
    }
    tagged
}

fn roles_for(doc: &Document, node: NodeId, settings: &Settings) -> RoleSet {
    let mut roles = RoleSet::default();
    if doc.has_attr(node, &settings.attributes.link_target) {
        roles.insert(Role::LinkTarget);
    }
    match doc.attr(node, "id") {
        Some(id) if id == settings.menu.toggle_id => roles.insert(Role::MenuToggle),
        Some(id) if id == settings.menu.panel_id => roles.insert(Role::MenuPanel),
        _ => {}
    }
    let classes = &settings.classes;
    if doc.has_class(node, &classes.call_to_action) {
        roles.insert(Role::CallToAction);
    }
    if doc.has_class(node, &classes.mobile_link) {
        roles.insert(Role::MobileLink);
    }
    if doc.has_class(node, &classes.nav_link) {
        roles.insert(Role::NavLink);
    }
    roles
}
