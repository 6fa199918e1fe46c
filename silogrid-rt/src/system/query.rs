//! Paginated actor metadata queries for external diagnostics.

// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
use chrono::{DateTime, Utc};
use glob::Pattern;
use serde::{Deserialize, Serialize};

// Layer 3: Internal module imports
use super::errors::SiloError;

/// Filter and paging parameters.
///
/// `id_pattern` is a glob supporting `*` and `?`; `type_filter` is an
/// exact match. Pages are 1-based.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActorQuery {
    /// Exact actor type to match, if any.
    pub type_filter: Option<String>,

    /// Glob over actor ids, if any.
    pub id_pattern: Option<String>,

    /// 1-based page number.
    pub page: usize,

    /// Items per page.
    pub page_size: usize,
}

impl Default for ActorQuery {
    fn default() -> Self {
        Self {
            type_filter: None,
            id_pattern: None,
            page: 1,
            page_size: 50,
        }
    }
}

/// One activation's public metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActorInfo {
    /// Logical actor type.
    pub actor_type: String,

    /// Actor id.
    pub actor_id: String,

    /// When the activation was created.
    pub activated_at: DateTime<Utc>,

    /// When it last completed a turn.
    pub last_activity: DateTime<Utc>,

    /// Messages waiting in its mailbox.
    pub queued_messages: usize,

    /// Whether a turn is in flight right now.
    pub is_processing: bool,
}

/// One page of query results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActorPage {
    /// The page's items, ordered by `(actor_type, actor_id)`.
    pub items: Vec<ActorInfo>,

    /// Matches across all pages.
    pub total_count: usize,

    /// The returned (1-based) page.
    pub page_number: usize,

    /// Requested page size.
    pub page_size: usize,

    /// Total pages for this filter.
    pub total_pages: usize,

    /// Whether a later page exists.
    pub has_next: bool,

    /// Whether an earlier page exists.
    pub has_prev: bool,
}

/// Filter, sort and paginate a snapshot of activations.
pub(crate) fn run_query(
    mut infos: Vec<ActorInfo>,
    query: &ActorQuery,
) -> Result<ActorPage, SiloError> {
    if query.page == 0 {
        return Err(SiloError::InvalidQuery("page numbers are 1-based".to_string()));
    }
    if query.page_size == 0 {
        return Err(SiloError::InvalidQuery("page_size must be > 0".to_string()));
    }
    let pattern = query
        .id_pattern
        .as_deref()
        .map(Pattern::new)
        .transpose()
        .map_err(|e| SiloError::InvalidQuery(format!("bad id pattern: {e}")))?;

    infos.retain(|info| {
        if let Some(type_filter) = &query.type_filter {
            if info.actor_type != *type_filter {
                return false;
            }
        }
        if let Some(pattern) = &pattern {
            if !pattern.matches(&info.actor_id) {
                return false;
            }
        }
        true
    });
    infos.sort_by(|a, b| {
        (a.actor_type.as_str(), a.actor_id.as_str())
            .cmp(&(b.actor_type.as_str(), b.actor_id.as_str()))
    });

    let total_count = infos.len();
    let total_pages = total_count.div_ceil(query.page_size);
    let start = (query.page - 1) * query.page_size;
    let items: Vec<ActorInfo> = infos
        .into_iter()
        .skip(start)
        .take(query.page_size)
        .collect();

    Ok(ActorPage {
        items,
        total_count,
        page_number: query.page,
        page_size: query.page_size,
        total_pages,
        has_next: query.page < total_pages,
        has_prev: query.page > 1 && total_count > 0,
    })
}
