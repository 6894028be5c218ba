//! Identifier derivation.
//!
//! Maps a fixture's base path (relative path without the fixture extension)
//! to a canonical test identifier: `codegen/customSimple` under the default
//! prefix becomes `testCodegen_CustomSimple`.

use std::collections::BTreeMap;

use goldcheck_schema::Fixture;
use thiserror::Error;

use crate::discovery::DiscoveredFile;

/// Two fixtures that derive the same identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collision {
    pub id: String,
    pub first: String,
    pub second: String,
}

/// Fatal: the identifier mapping is not injective over the scan.
#[derive(Debug, Error)]
#[error("{} identifier collision(s): {}", .collisions.len(), describe(.collisions))]
pub struct CollisionError {
    pub collisions: Vec<Collision>,
}

fn describe(collisions: &[Collision]) -> String {
    collisions
        .iter()
        .map(|c| format!("{} <- {} and {}", c.id, c.first, c.second))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Derive the identifier for one base path.
pub fn derive_id(prefix: &str, base_path: &str) -> String {
    let segments: Vec<String> = base_path
        .split('/')
        .filter(|s| !s.is_empty())
        .map(sanitize_segment)
        .collect();

    let mut id = String::with_capacity(prefix.len() + base_path.len());
    id.push_str(prefix);
    id.push_str(&segments.join("_"));

    if id.starts_with(|c: char| c.is_ascii_digit()) {
        id.insert(0, '_');
    }
    id
}

fn sanitize_segment(segment: &str) -> String {
    let mut out = String::with_capacity(segment.len());
    for (i, c) in segment.chars().enumerate() {
        let c = if c.is_ascii_alphanumeric() || c == '_' {
            c
        } else {
            '_'
        };
        if i == 0 {
            out.push(c.to_ascii_uppercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// Derive identifiers for a whole scan, rejecting collisions.
///
/// The returned fixtures keep the input order.
pub fn derive_all(prefix: &str, files: Vec<DiscoveredFile>) -> Result<Vec<Fixture>, CollisionError> {
    let mut seen: BTreeMap<String, String> = BTreeMap::new();
    let mut collisions = Vec::new();
    let mut fixtures = Vec::with_capacity(files.len());

    for file in files {
        let id = derive_id(prefix, &file.base_path);
        match seen.get(&id) {
            Some(first) => collisions.push(Collision {
                id: id.clone(),
                first: first.clone(),
                second: file.relative_path.clone(),
            }),
            None => {
                seen.insert(id.clone(), file.relative_path.clone());
            }
        }
        fixtures.push(Fixture::new(file.relative_path, id));
    }

    if collisions.is_empty() {
        Ok(fixtures)
    } else {
        Err(CollisionError { collisions })
    }
}
