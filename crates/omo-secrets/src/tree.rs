//! Group hierarchy inside the decrypted document
//!
//! root ("OhMyOps") -> plugin group -> environment group -> entries.
//! Group names match exactly; normalization happens in [`SecretPath`](crate::SecretPath).

use crate::error::{Result, SecretsError};
use keepass::config::DatabaseConfig;
use keepass::db::{Entry, Group, Node};
use keepass::Database;

pub const ROOT_GROUP: &str = "OhMyOps";

const SEGMENTS: [&str; 2] = ["plugin", "environment"];

/// Empty database: a single root group and no entries
pub fn new_document() -> Database {
    let mut db = Database::new(DatabaseConfig::default());
    db.root = Group::new(ROOT_GROUP);
    db
}

fn child_group<'a>(group: &'a Group, name: &str) -> Option<&'a Group> {
    group.children.iter().find_map(|node| match node {
        Node::Group(g) if g.name == name => Some(g),
        _ => None,
    })
}

fn child_group_mut<'a>(group: &'a mut Group, name: &str) -> Option<&'a mut Group> {
    group.children.iter_mut().find_map(|node| match node {
        Node::Group(g) if g.name == name => Some(g),
        _ => None,
    })
}

/// Strict descent for reads: never creates anything
pub fn find_group<'a>(root: &'a Group, names: [&str; 2]) -> Result<&'a Group> {
    let mut current = root;
    for (segment, name) in SEGMENTS.into_iter().zip(names) {
        current = child_group(current, name).ok_or_else(|| SecretsError::GroupNotFound {
            segment,
            name: name.to_string(),
        })?;
    }
    Ok(current)
}

pub fn find_group_mut<'a>(root: &'a mut Group, names: [&str; 2]) -> Result<&'a mut Group> {
    let mut current = root;
    for (segment, name) in SEGMENTS.into_iter().zip(names) {
        current = child_group_mut(current, name).ok_or_else(|| SecretsError::GroupNotFound {
            segment,
            name: name.to_string(),
        })?;
    }
    Ok(current)
}

/// Permissive descent for writes: creates any missing group on the way
pub fn ensure_groups<'a>(root: &'a mut Group, names: [&str; 2]) -> &'a mut Group {
    let mut current = root;
    for name in names {
        let found = current
            .children
            .iter()
            .position(|node| matches!(node, Node::Group(g) if g.name == name));
        let index = match found {
            Some(index) => index,
            None => {
                current.children.push(Node::Group(Group::new(name)));
                current.children.len() - 1
            }
        };
        current = match &mut current.children[index] {
            Node::Group(g) => g,
            Node::Entry(_) => unreachable!("position matched a group"),
        };
    }
    current
}

/// Entries directly inside `group`
pub fn entries(group: &Group) -> impl Iterator<Item = &Entry> {
    group.children.iter().filter_map(|node| match node {
        Node::Entry(e) => Some(e),
        Node::Group(_) => None,
    })
}

/// Subgroups directly inside `group`
pub fn groups(group: &Group) -> impl Iterator<Item = &Group> {
    group.children.iter().filter_map(|node| match node {
        Node::Group(g) => Some(g),
        Node::Entry(_) => None,
    })
}

/// Index into `group.children` of the entry titled `title`
pub fn entry_index(group: &Group, title: &str) -> Option<usize> {
    group.children.iter().position(|node| match node {
        Node::Entry(e) => e.get_title() == Some(title),
        Node::Group(_) => false,
    })
}

/// Every `plugin/environment/title` address in the document
pub fn paths(root: &Group) -> Vec<String> {
    let mut out = Vec::new();
    for plugin in groups(root) {
        for env in groups(plugin) {
            for entry in entries(env) {
                let title = entry.get_title().unwrap_or_default();
                out.push(format!("{}/{}/{}", plugin.name, env.name, title));
            }
        }
    }
    out
}
