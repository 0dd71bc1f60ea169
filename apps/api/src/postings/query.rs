//! Listing query composer: one SQL statement per listing request, built
//! with `QueryBuilder` over the posting kind's table family.

use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::errors::AppError;
use crate::models::posting::PostingRow;

use super::{ListStatus, PostingKind, SortKey, SortOrder, Target};

/// Scopes a listing to one user's relationship to postings.
#[derive(Debug, Clone, Copy)]
pub struct Scope {
    pub user_id: i64,
    pub target: Target,
}

#[derive(Debug, Clone)]
pub struct ListParams {
    pub status: ListStatus,
    pub keyword: Option<String>,
    pub tag: Option<String>,
    pub sort: SortKey,
    pub order: Option<SortOrder>,
    pub offset: i64,
    pub limit: i64,
    pub scope: Option<Scope>,
}

impl Default for ListParams {
    fn default() -> Self {
        ListParams {
            status: ListStatus::All,
            keyword: None,
            tag: None,
            sort: SortKey::Recent,
            order: None,
            offset: 0,
            limit: 100,
            scope: None,
        }
    }
}

pub async fn list_postings(
    pool: &PgPool,
    kind: PostingKind,
    params: &ListParams,
) -> Result<Vec<PostingRow>, AppError> {
    let mut qb = build_listing_query(kind, params);
    Ok(qb.build_query_as::<PostingRow>().fetch_all(pool).await?)
}

/// Builds the listing statement. The `tag` filter short-circuits to a
/// tag-join query ordered by id and ignores `sort`; every other path
/// dispatches on the closed `SortKey` set.
pub fn build_listing_query(kind: PostingKind, p: &ListParams) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new(format!("SELECT p.* FROM {} p", kind.table()));

    if let Some(tag) = p.tag.clone() {
        qb.push(format!(
            " JOIN {} pt ON pt.posting_id = p.id JOIN tags t ON t.id = pt.tag_id",
            kind.tag_table()
        ));
        let force_empty = push_scope_join(&mut qb, kind, p.scope);
        let mut has_where = false;
        push_cond(&mut qb, &mut has_where);
        qb.push("t.name = ").push_bind(tag);
        if force_empty {
            push_cond(&mut qb, &mut has_where);
            qb.push("FALSE");
        }
        push_scope_where(&mut qb, p.scope, &mut has_where);
        push_status(&mut qb, p.status, &mut has_where);
        qb.push(" ORDER BY p.id DESC");
        push_page(&mut qb, p);
        return qb;
    }

    let force_empty = push_scope_join(&mut qb, kind, p.scope);
    let target = p.scope.map(|s| s.target);

    // Each sort branch contributes its joins, its order expression, its
    // natural direction, and whether the statement aggregates.
    let mut aggregated = true;
    let mut default_order = SortOrder::Desc;
    let mut nulls_last = false;
    let order_expr: &str = match p.sort {
        SortKey::Id => {
            aggregated = false;
            "p.id"
        }
        SortKey::Review => {
            qb.push(format!(
                " LEFT JOIN reviews rv ON rv.{} = p.id",
                kind.fk_column()
            ));
            "COALESCE(AVG(rv.score), 0)"
        }
        SortKey::Favorite => {
            // When the target already narrowed to the user's own bookmarks
            // the count runs over that filtered set, not global popularity.
            if target == Some(Target::Favorite) {
                "COUNT(sb.user_id)"
            } else {
                qb.push(format!(
                    " LEFT JOIN {} fb ON fb.posting_id = p.id",
                    kind.bookmark_table()
                ));
                "COUNT(fb.user_id)"
            }
        }
        SortKey::Pv => {
            if target == Some(Target::History) {
                "COUNT(sw.user_id)"
            } else {
                qb.push(format!(
                    " LEFT JOIN {} pw ON pw.posting_id = p.id",
                    kind.watched_table()
                ));
                "COUNT(pw.user_id)"
            }
        }
        SortKey::LastWatched => {
            nulls_last = true;
            if target == Some(Target::History) {
                "MAX(sw.updated_at)"
            } else {
                qb.push(format!(
                    " LEFT JOIN {} lw ON lw.posting_id = p.id",
                    kind.watched_table()
                ));
                "MAX(lw.updated_at)"
            }
        }
        SortKey::Recent => {
            // Inner join: postings with no future time window are excluded.
            default_order = SortOrder::Asc;
            qb.push(format!(
                " JOIN {} tm ON tm.posting_id = p.id AND tm.start_time > NOW()",
                kind.times_table()
            ));
            "MIN(tm.start_time)"
        }
    };

    let mut has_where = false;
    if force_empty {
        push_cond(&mut qb, &mut has_where);
        qb.push("FALSE");
    }
    push_scope_where(&mut qb, p.scope, &mut has_where);
    push_status(&mut qb, p.status, &mut has_where);
    if let Some(keyword) = &p.keyword {
        let pattern = format!("%{keyword}%");
        push_cond(&mut qb, &mut has_where);
        qb.push("(p.name LIKE ").push_bind(pattern.clone());
        qb.push(format!(
            " OR EXISTS (SELECT 1 FROM {} kt JOIN tags kg ON kg.id = kt.tag_id WHERE kt.posting_id = p.id AND kg.name LIKE ",
            kind.tag_table()
        ));
        qb.push_bind(pattern);
        qb.push("))");
    }

    if aggregated {
        qb.push(" GROUP BY p.id");
    }

    let direction = match p.order.unwrap_or(default_order) {
        SortOrder::Asc => "ASC",
        SortOrder::Desc => "DESC",
    };
    qb.push(format!(" ORDER BY {order_expr} {direction}"));
    if nulls_last {
        qb.push(" NULLS LAST");
    }
    if order_expr != "p.id" {
        qb.push(", p.id DESC");
    }
    push_page(&mut qb, p);
    qb
}

/// Pushes the target's join (bookmarks/watched/applications scoped to the
/// user). Returns true when the combination can never match (apply on
/// events) and the statement must yield an empty set.
fn push_scope_join(
    qb: &mut QueryBuilder<'static, Postgres>,
    kind: PostingKind,
    scope: Option<Scope>,
) -> bool {
    let Some(scope) = scope else { return false };
    match scope.target {
        Target::Favorite => {
            qb.push(format!(
                " JOIN {} sb ON sb.posting_id = p.id AND sb.user_id = ",
                kind.bookmark_table()
            ));
            qb.push_bind(scope.user_id);
        }
        Target::History => {
            qb.push(format!(
                " JOIN {} sw ON sw.posting_id = p.id AND sw.user_id = ",
                kind.watched_table()
            ));
            qb.push_bind(scope.user_id);
        }
        Target::Apply => {
            if kind != PostingKind::Job {
                return true;
            }
            qb.push(" JOIN applications sa ON sa.job_id = p.id AND sa.user_id = ");
            qb.push_bind(scope.user_id);
        }
        Target::Posted => {} // a WHERE clause, not a join
    }
    false
}

fn push_scope_where(
    qb: &mut QueryBuilder<'static, Postgres>,
    scope: Option<Scope>,
    has_where: &mut bool,
) {
    if let Some(scope) = scope {
        if scope.target == Target::Posted {
            push_cond(qb, has_where);
            qb.push("p.user_id = ").push_bind(scope.user_id);
        }
    }
}

fn push_status(
    qb: &mut QueryBuilder<'static, Postgres>,
    status: ListStatus,
    has_where: &mut bool,
) {
    let clause = match status {
        ListStatus::All => return,
        ListStatus::Active => "p.status = 'active'",
        ListStatus::Inactive => "p.status = 'inactive'",
        ListStatus::Draft => "p.status = 'draft'",
        ListStatus::Posted => "p.status IN ('active', 'inactive')",
    };
    push_cond(qb, has_where);
    qb.push(clause);
}

fn push_cond(qb: &mut QueryBuilder<'static, Postgres>, has_where: &mut bool) {
    if *has_where {
        qb.push(" AND ");
    } else {
        qb.push(" WHERE ");
        *has_where = true;
    }
}

fn push_page(qb: &mut QueryBuilder<'static, Postgres>, p: &ListParams) {
    qb.push(" LIMIT ").push_bind(p.limit);
    qb.push(" OFFSET ").push_bind(p.offset);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sql(kind: PostingKind, p: &ListParams) -> String {
        build_listing_query(kind, p).sql().to_string()
    }

    #[test]
    fn default_listing_uses_future_time_windows_ascending() {
        let s = sql(PostingKind::Job, &ListParams::default());
        assert!(s.contains("JOIN job_times tm ON tm.posting_id = p.id AND tm.start_time > NOW()"));
        assert!(s.contains("ORDER BY MIN(tm.start_time) ASC"));
        assert!(s.contains("GROUP BY p.id"));
        assert!(s.contains("LIMIT"));
        assert!(s.contains("OFFSET"));
    }

    #[test]
    fn event_listing_targets_event_tables() {
        let s = sql(PostingKind::Event, &ListParams::default());
        assert!(s.contains("FROM events p"));
        assert!(s.contains("JOIN event_times tm"));
    }

    #[test]
    fn id_sort_is_descending_by_default() {
        let p = ListParams {
            sort: SortKey::Id,
            ..Default::default()
        };
        let s = sql(PostingKind::Job, &p);
        assert!(s.contains("ORDER BY p.id DESC"));
        assert!(!s.contains("GROUP BY"));
    }

    #[test]
    fn explicit_order_overrides_branch_default() {
        let p = ListParams {
            sort: SortKey::Id,
            order: Some(SortOrder::Asc),
            ..Default::default()
        };
        assert!(sql(PostingKind::Job, &p).contains("ORDER BY p.id ASC"));
    }

    #[test]
    fn review_sort_outer_joins_and_coalesces() {
        let p = ListParams {
            sort: SortKey::Review,
            ..Default::default()
        };
        let s = sql(PostingKind::Job, &p);
        assert!(s.contains("LEFT JOIN reviews rv ON rv.job_id = p.id"));
        assert!(s.contains("ORDER BY COALESCE(AVG(rv.score), 0) DESC"));
    }

    #[test]
    fn review_sort_uses_event_fk_for_events() {
        let p = ListParams {
            sort: SortKey::Review,
            ..Default::default()
        };
        assert!(sql(PostingKind::Event, &p).contains("rv.event_id = p.id"));
    }

    #[test]
    fn favorite_sort_counts_global_bookmarks_without_target() {
        let p = ListParams {
            sort: SortKey::Favorite,
            ..Default::default()
        };
        let s = sql(PostingKind::Job, &p);
        assert!(s.contains("LEFT JOIN job_bookmarks fb"));
        assert!(s.contains("ORDER BY COUNT(fb.user_id) DESC"));
    }

    #[test]
    fn favorite_sort_reuses_target_join_when_scoped() {
        let p = ListParams {
            sort: SortKey::Favorite,
            scope: Some(Scope {
                user_id: 7,
                target: Target::Favorite,
            }),
            ..Default::default()
        };
        let s = sql(PostingKind::Job, &p);
        // one join over the user's own set, no second global-popularity join
        assert!(s.contains("JOIN job_bookmarks sb ON sb.posting_id = p.id AND sb.user_id ="));
        assert!(!s.contains("LEFT JOIN job_bookmarks"));
        assert!(s.contains("ORDER BY COUNT(sb.user_id) DESC"));
    }

    #[test]
    fn last_watched_sorts_by_most_recent_with_nulls_last() {
        let p = ListParams {
            sort: SortKey::LastWatched,
            ..Default::default()
        };
        let s = sql(PostingKind::Job, &p);
        assert!(s.contains("LEFT JOIN job_watched lw"));
        assert!(s.contains("ORDER BY MAX(lw.updated_at) DESC NULLS LAST"));
    }

    #[test]
    fn status_filters_are_disjoint_and_posted_is_their_union() {
        let active = sql(
            PostingKind::Job,
            &ListParams {
                status: ListStatus::Active,
                sort: SortKey::Id,
                ..Default::default()
            },
        );
        let posted = sql(
            PostingKind::Job,
            &ListParams {
                status: ListStatus::Posted,
                sort: SortKey::Id,
                ..Default::default()
            },
        );
        let all = sql(
            PostingKind::Job,
            &ListParams {
                status: ListStatus::All,
                sort: SortKey::Id,
                ..Default::default()
            },
        );
        assert!(active.contains("p.status = 'active'"));
        assert!(posted.contains("p.status IN ('active', 'inactive')"));
        assert!(!all.contains("p.status"));
    }

    #[test]
    fn keyword_matches_name_or_tag_name() {
        let p = ListParams {
            keyword: Some("rust".to_string()),
            sort: SortKey::Id,
            ..Default::default()
        };
        let s = sql(PostingKind::Job, &p);
        assert!(s.contains("p.name LIKE"));
        assert!(s.contains("kg.name LIKE"));
    }

    #[test]
    fn tag_filter_short_circuits_and_ignores_sort() {
        let p = ListParams {
            tag: Some("remote".to_string()),
            sort: SortKey::Review,
            status: ListStatus::Active,
            ..Default::default()
        };
        let s = sql(PostingKind::Job, &p);
        assert!(s.contains("JOIN job_tags pt ON pt.posting_id = p.id"));
        assert!(s.contains("t.name = "));
        assert!(s.contains("ORDER BY p.id DESC"));
        assert!(s.contains("p.status = 'active'"));
        assert!(!s.contains("AVG"));
    }

    #[test]
    fn posted_target_filters_by_author() {
        let p = ListParams {
            sort: SortKey::Id,
            scope: Some(Scope {
                user_id: 3,
                target: Target::Posted,
            }),
            ..Default::default()
        };
        assert!(sql(PostingKind::Job, &p).contains("p.user_id ="));
    }

    #[test]
    fn apply_target_joins_applications_for_jobs() {
        let p = ListParams {
            sort: SortKey::Id,
            scope: Some(Scope {
                user_id: 3,
                target: Target::Apply,
            }),
            ..Default::default()
        };
        assert!(sql(PostingKind::Job, &p).contains("JOIN applications sa ON sa.job_id = p.id"));
    }

    #[test]
    fn apply_target_yields_empty_set_for_events() {
        let p = ListParams {
            sort: SortKey::Id,
            scope: Some(Scope {
                user_id: 3,
                target: Target::Apply,
            }),
            ..Default::default()
        };
        assert!(sql(PostingKind::Event, &p).contains("WHERE FALSE"));
    }
}
