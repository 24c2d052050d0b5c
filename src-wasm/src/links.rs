//! Link construction and duplicate detection

use uuid::Uuid;

use crate::types::{Anchor, Link, LinkType};

/// Link type implied by the two anchors. Anything other than SS, FF or SF
/// is Finish-to-Start.
pub fn derive_type(from: Anchor, to: Anchor) -> LinkType {
    match (from, to) {
        (Anchor::Start, Anchor::Start) => LinkType::StartToStart,
        (Anchor::End, Anchor::End) => LinkType::FinishToFinish,
        (Anchor::Start, Anchor::End) => LinkType::StartToFinish,
        _ => LinkType::FinishToStart,
    }
}

/// Textual link type from user input, unknown values are FS
pub fn parse_type(value: &str) -> LinkType {
    LinkType::parse(value)
}

/// New zero-lag link with a fresh id
pub fn build(from_id: &str, from_anchor: Anchor, to_id: &str, to_anchor: Anchor) -> Link {
    Link {
        id: format!("link-{}", Uuid::new_v4()),
        from: from_id.to_string(),
        to: to_id.to_string(),
        link_type: derive_type(from_anchor, to_anchor),
        lag: 0.0,
    }
}

/// Exact-match duplicate check.
///
/// Only zero-lag links collide: an existing link with a lag never blocks a
/// zero-lag one between the same endpoints, and the reverse holds too.
pub fn is_duplicate(links: &[Link], candidate: &Link) -> bool {
    candidate.lag == 0.0
        && links.iter().any(|link| {
            link.id != candidate.id
                && link.from == candidate.from
                && link.to == candidate.to
                && link.link_type == candidate.link_type
                && link.lag == 0.0
        })
}
