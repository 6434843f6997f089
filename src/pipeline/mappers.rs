//! Conversions between index matches and pipeline response types.

use std::collections::BTreeSet;

use crate::pinecone::QueryMatch;

use super::types::RetrievedChunk;

/// Parse a composite vector id of the form `paper_{id}#chunk_{index}`.
pub(crate) fn parse_paper_ref(id: &str) -> Option<(i64, usize)> {
    let (paper, chunk) = id.split_once("#chunk_")?;
    let paper_id = paper.strip_prefix("paper_")?.parse().ok()?;
    let index = chunk.parse().ok()?;
    Some((paper_id, index))
}

/// Shape an index match for the HTTP response.
///
/// The owning paper id is taken from the stored metadata when present and
/// recovered from the composite id otherwise, so older vectors indexed
/// without metadata still resolve to a document.
pub(crate) fn map_match(found: QueryMatch) -> RetrievedChunk {
    let fallback = parse_paper_ref(&found.id).map(|(paper_id, _)| paper_id);
    let (paper_id, text) = match found.metadata {
        Some(meta) => (Some(meta.paper_id), Some(meta.chunk)),
        None => (fallback, None),
    };
    RetrievedChunk {
        id: found.id,
        score: found.score,
        paper_id,
        text,
    }
}

/// Distinct document ids referenced by the strongest `limit` matches, in
/// first-seen order.
pub(crate) fn distinct_paper_ids(matches: &[QueryMatch], limit: usize) -> Vec<i64> {
    let mut seen = BTreeSet::new();
    let mut ids = Vec::new();
    for found in matches.iter().take(limit) {
        let id = found
            .metadata
            .as_ref()
            .map(|meta| meta.paper_id)
            .or_else(|| parse_paper_ref(&found.id).map(|(paper_id, _)| paper_id));
        if let Some(id) = id
            && seen.insert(id)
        {
            ids.push(id);
        }
    }
    ids
}

/// Concatenate the text of the strongest `limit` matches into one context
/// string, preserving the order the index returned them in. Matches without
/// stored text contribute nothing.
pub(crate) fn context_from_matches(matches: &[QueryMatch], limit: usize) -> String {
    matches
        .iter()
        .take(limit)
        .filter_map(|found| found.metadata.as_ref().map(|meta| meta.chunk.as_str()))
        .collect::<Vec<_>>()
        .join(" ")
}
