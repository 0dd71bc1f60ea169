pub mod handlers;
pub mod query;
pub mod store;

/// Jobs and events are structurally parallel postings kept in independent
/// tables; the kind selects which family of tables a query runs against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostingKind {
    Job,
    Event,
}

impl PostingKind {
    pub fn parse(s: &str) -> Option<PostingKind> {
        match s {
            "job" => Some(PostingKind::Job),
            "event" => Some(PostingKind::Event),
            _ => None,
        }
    }

    pub fn table(&self) -> &'static str {
        match self {
            PostingKind::Job => "jobs",
            PostingKind::Event => "events",
        }
    }

    pub fn times_table(&self) -> &'static str {
        match self {
            PostingKind::Job => "job_times",
            PostingKind::Event => "event_times",
        }
    }

    pub fn tag_table(&self) -> &'static str {
        match self {
            PostingKind::Job => "job_tags",
            PostingKind::Event => "event_tags",
        }
    }

    pub fn bookmark_table(&self) -> &'static str {
        match self {
            PostingKind::Job => "job_bookmarks",
            PostingKind::Event => "event_bookmarks",
        }
    }

    pub fn watched_table(&self) -> &'static str {
        match self {
            PostingKind::Job => "job_watched",
            PostingKind::Event => "event_watched",
        }
    }

    /// Column name on the shared `reviews` and `purchases` tables.
    pub fn fk_column(&self) -> &'static str {
        match self {
            PostingKind::Job => "job_id",
            PostingKind::Event => "event_id",
        }
    }
}

/// Posting lifecycle. Transitions happen only through the admin
/// change-status call; creation always yields `Draft`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostingStatus {
    Draft,
    Active,
    Inactive,
}

impl PostingStatus {
    pub fn parse(s: &str) -> Option<PostingStatus> {
        match s {
            "draft" => Some(PostingStatus::Draft),
            "active" => Some(PostingStatus::Active),
            "inactive" => Some(PostingStatus::Inactive),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PostingStatus::Draft => "draft",
            PostingStatus::Active => "active",
            PostingStatus::Inactive => "inactive",
        }
    }

    /// Valid edges: draft → active ⇄ inactive. There is no edge back to
    /// draft, and staying in place is not a transition.
    pub fn can_transition_to(self, next: PostingStatus) -> bool {
        matches!(
            (self, next),
            (PostingStatus::Draft, PostingStatus::Active)
                | (PostingStatus::Active, PostingStatus::Inactive)
                | (PostingStatus::Inactive, PostingStatus::Active)
        )
    }
}

/// Listing status filter. Unknown values fall back to `All`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ListStatus {
    #[default]
    All,
    Active,
    Inactive,
    Draft,
    /// active ∪ inactive.
    Posted,
}

impl ListStatus {
    pub fn parse(s: Option<&str>) -> ListStatus {
        match s {
            Some("active") => ListStatus::Active,
            Some("inactive") => ListStatus::Inactive,
            Some("draft") => ListStatus::Draft,
            Some("posted") => ListStatus::Posted,
            _ => ListStatus::All,
        }
    }
}

/// Closed set of sort keys. Unknown values fall back to `Recent`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    Id,
    Review,
    Favorite,
    Pv,
    LastWatched,
    #[default]
    Recent,
}

impl SortKey {
    pub fn parse(s: Option<&str>) -> SortKey {
        match s {
            Some("id") => SortKey::Id,
            Some("review") => SortKey::Review,
            Some("favorite") => SortKey::Favorite,
            Some("pv") => SortKey::Pv,
            Some("last_watched") => SortKey::LastWatched,
            _ => SortKey::Recent,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn parse(s: Option<&str>) -> Option<SortOrder> {
        match s {
            Some("asc") => Some(SortOrder::Asc),
            Some("desc") => Some(SortOrder::Desc),
            _ => None,
        }
    }
}

/// Which user-relationship to scope a listing by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Favorite,
    History,
    Posted,
    Apply,
}

impl Target {
    pub fn parse(s: &str) -> Option<Target> {
        match s {
            "favorite" => Some(Target::Favorite),
            "history" => Some(Target::History),
            "posted" => Some(Target::Posted),
            "apply" => Some(Target::Apply),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_sort_falls_back_to_recent() {
        assert_eq!(SortKey::parse(Some("zzz")), SortKey::Recent);
        assert_eq!(SortKey::parse(None), SortKey::Recent);
        assert_eq!(SortKey::parse(Some("pv")), SortKey::Pv);
    }

    #[test]
    fn unknown_status_falls_back_to_all() {
        assert_eq!(ListStatus::parse(Some("archived")), ListStatus::All);
        assert_eq!(ListStatus::parse(None), ListStatus::All);
        assert_eq!(ListStatus::parse(Some("posted")), ListStatus::Posted);
    }

    #[test]
    fn posting_status_parse_is_strict() {
        assert_eq!(PostingStatus::parse("active"), Some(PostingStatus::Active));
        assert_eq!(PostingStatus::parse("posted"), None);
        assert_eq!(PostingStatus::parse(""), None);
    }

    #[test]
    fn lifecycle_has_no_edge_back_to_draft() {
        assert!(PostingStatus::Draft.can_transition_to(PostingStatus::Active));
        assert!(PostingStatus::Active.can_transition_to(PostingStatus::Inactive));
        assert!(PostingStatus::Inactive.can_transition_to(PostingStatus::Active));
        assert!(!PostingStatus::Active.can_transition_to(PostingStatus::Draft));
        assert!(!PostingStatus::Inactive.can_transition_to(PostingStatus::Draft));
        assert!(!PostingStatus::Draft.can_transition_to(PostingStatus::Inactive));
        assert!(!PostingStatus::Active.can_transition_to(PostingStatus::Active));
    }

    #[test]
    fn target_parse_is_strict() {
        assert_eq!(Target::parse("favorite"), Some(Target::Favorite));
        assert_eq!(Target::parse("bookmarks"), None);
    }
}
