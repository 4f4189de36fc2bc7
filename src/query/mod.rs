//! The list/detail query-shaping core.
//!
//! Every resource endpoint is served by the same pipeline: a declarative
//! [`ResourceConfig`] names what the resource can be sorted and filtered by,
//! [`prepare`] validates the request parameters against that config, and
//! [`build_select`] assembles one parameterized SQL statement in a fixed
//! stage order (base predicate, site scope, multi-id selection, date range,
//! tag inclusion/exclusion, title and name substrings, ordering, paging).
//! All stages compose by logical AND and each is a no-op when its parameter
//! is absent; only site scoping is mandatory.

pub mod resources;

use chrono::{Days, NaiveDate};
use serde::Deserialize;
use sqlx::{QueryBuilder, Sqlite};

use crate::errors::AppError;

/// Default number of items per page.
pub const DEFAULT_PAGE_SIZE: i64 = 30;
/// Hard ceiling for `pagesize`; larger requests are clamped, not rejected.
pub const MAX_PAGE_SIZE: i64 = 100;
/// Maximum identifiers honored on a detail route; the rest are ignored.
pub const MAX_IDS: usize = 100;

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    /// Parse a request token; anything unrecognized keeps the field default.
    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "asc" => Some(Direction::Asc),
            "desc" => Some(Direction::Desc),
            _ => None,
        }
    }

    fn sql(self) -> &'static str {
        match self {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        }
    }
}

/// Value semantics of an orderable field.
#[derive(Debug, Clone, Copy)]
pub enum ValueKind {
    Text,
    Integer,
    Date,
    /// Ordered by the declared variant position (ascending), never by the
    /// storage engine's collation of the stored strings.
    Ranked(&'static [&'static str]),
}

/// One orderable dimension of a resource.
#[derive(Debug)]
pub struct OrderField {
    /// Name accepted in the `sort` query parameter.
    pub public_name: &'static str,
    /// Column the comparison runs against.
    pub storage_field: &'static str,
    pub kind: ValueKind,
    pub default_direction: Direction,
}

impl OrderField {
    fn order_expr(&self, dir: Direction) -> String {
        match self.kind {
            ValueKind::Ranked(variants) => {
                // Explicit ordinal mapping so sort order is identical across
                // storage engines.
                let mut case = format!("CASE {}", self.storage_field);
                for (ordinal, variant) in variants.iter().enumerate() {
                    case.push_str(&format!(" WHEN '{}' THEN {}", variant, ordinal));
                }
                case.push_str(" END");
                format!("{} {}", case, dir.sql())
            }
            _ => format!("{} {}", self.storage_field, dir.sql()),
        }
    }
}

/// Declarative per-resource query configuration. One static instance per
/// resource; resolved once per request instead of branching at runtime.
#[derive(Debug)]
pub struct ResourceConfig {
    pub table: &'static str,
    /// Static predicate narrowing the base collection (e.g. a post type).
    pub base_where: Option<&'static str>,
    /// Orderable fields; the first entry is the fallback sort.
    pub ordering: &'static [OrderField],
    /// Column matched by multi-id detail routes; `None` means the resource
    /// has no detail action.
    pub detail_field: Option<&'static str>,
    /// Column filtered by `fromdate`/`todate`, when declared.
    pub date_field: Option<&'static str>,
    /// Column matched by `inname`, when declared.
    pub name_field: Option<&'static str>,
    /// Whether `intitle` applies.
    pub has_title: bool,
    /// Whether `tagged`/`nottagged` apply (post-shaped resources only).
    pub taggable: bool,
    /// Whether the `site` parameter is required.
    pub site_scoped: bool,
}

impl ResourceConfig {
    /// Resolve the requested sort to an ORDER BY clause body. Unknown sort
    /// names fall back to the first declared field; a recognized direction
    /// token overrides that field's default. The primary-key tiebreaker is
    /// always appended so pagination is stable across identical requests.
    pub fn resolve_order(&self, sort: Option<&str>, order: Option<&str>) -> String {
        let dir_override = order.and_then(Direction::parse);
        let field = sort
            .and_then(|name| self.ordering.iter().find(|f| f.public_name == name))
            .or_else(|| self.ordering.first());

        match field {
            // No ordering fields declared: insertion order is unspecified,
            // so fall back to pk ascending for determinism.
            None => "id ASC".to_string(),
            Some(f) => {
                let dir = dir_override.unwrap_or(f.default_direction);
                format!("{}, id ASC", f.order_expr(dir))
            }
        }
    }
}

/// Raw list/detail query parameters, as extracted from the request.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct ListParams {
    pub sort: Option<String>,
    pub order: Option<String>,
    pub fromdate: Option<String>,
    pub todate: Option<String>,
    pub tagged: Option<String>,
    pub nottagged: Option<String>,
    pub intitle: Option<String>,
    pub inname: Option<String>,
    pub site: Option<String>,
    pub page: Option<i64>,
    pub pagesize: Option<i64>,
}

/// Validated, storage-ready form of one list/detail request.
#[derive(Debug)]
pub struct PreparedQuery {
    pub site_id: Option<i64>,
    pub ids: Option<Vec<i64>>,
    /// Inclusive RFC 3339 lower bound on the resource date field.
    pub from_bound: Option<String>,
    /// Exclusive RFC 3339 upper bound (start of the day after `todate`).
    pub to_bound: Option<String>,
    pub tagged: Vec<String>,
    pub not_tagged: Vec<String>,
    pub intitle: Option<String>,
    pub inname: Option<String>,
    pub order_by: String,
    /// Effective page size after clamping.
    pub limit: i64,
    pub offset: i64,
}

/// Validate request parameters against a resource config.
///
/// `site_id` must already be resolved by the caller (the mandatory site
/// stage); `ids` come from a detail route path segment.
pub fn prepare(
    cfg: &ResourceConfig,
    params: &ListParams,
    site_id: Option<i64>,
    ids: Option<Vec<i64>>,
) -> Result<PreparedQuery, AppError> {
    // A detail route on a resource without a detail field is a programming
    // error in the routing table, not a user-facing condition.
    if ids.is_some() {
        assert!(
            cfg.detail_field.is_some(),
            "detail route configured for table '{}' which declares no detail field",
            cfg.table
        );
    }

    let (from_bound, to_bound) = if cfg.date_field.is_some() {
        (
            parse_day_start(params.fromdate.as_deref(), "fromdate")?,
            parse_day_after(params.todate.as_deref(), "todate")?,
        )
    } else {
        (None, None)
    };

    let (tagged, not_tagged) = if cfg.taggable {
        (
            split_names(params.tagged.as_deref()),
            split_names(params.nottagged.as_deref()),
        )
    } else {
        (Vec::new(), Vec::new())
    };

    let intitle = if cfg.has_title {
        params.intitle.clone().filter(|s| !s.is_empty())
    } else {
        None
    };

    let inname = if cfg.name_field.is_some() {
        params
            .inname
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    } else {
        None
    };

    let pagesize = params
        .pagesize
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .clamp(1, MAX_PAGE_SIZE);
    let page = params.page.unwrap_or(1).max(1);

    Ok(PreparedQuery {
        site_id,
        ids,
        from_bound,
        to_bound,
        tagged,
        not_tagged,
        intitle,
        inname,
        order_by: cfg.resolve_order(params.sort.as_deref(), params.order.as_deref()),
        limit: pagesize,
        offset: (page - 1) * pagesize,
    })
}

/// Build the full SELECT for a prepared query. One extra row beyond the page
/// size is requested so the caller can derive `has_more` without a count.
pub fn build_select(
    cfg: &ResourceConfig,
    columns: &str,
    q: &PreparedQuery,
) -> QueryBuilder<'static, Sqlite> {
    let mut qb: QueryBuilder<Sqlite> =
        QueryBuilder::new(format!("SELECT {} FROM {} WHERE 1=1", columns, cfg.table));

    if let Some(base) = cfg.base_where {
        qb.push(" AND ");
        qb.push(base);
    }

    if let Some(site_id) = q.site_id {
        qb.push(" AND site_id = ");
        qb.push_bind(site_id);
    }

    if let Some(ids) = &q.ids {
        let field = cfg
            .detail_field
            .expect("detail query for a resource without a detail field");
        if ids.is_empty() {
            qb.push(" AND 0 = 1");
        } else {
            qb.push(format!(" AND {} IN (", field));
            let mut sep = qb.separated(", ");
            for id in ids {
                sep.push_bind(*id);
            }
            qb.push(")");
        }
    }

    if let Some(bound) = &q.from_bound {
        let field = cfg.date_field.expect("date bound without a date field");
        qb.push(format!(" AND {} >= ", field));
        qb.push_bind(bound.clone());
    }
    if let Some(bound) = &q.to_bound {
        let field = cfg.date_field.expect("date bound without a date field");
        qb.push(format!(" AND {} < ", field));
        qb.push_bind(bound.clone());
    }

    // Every named tag must be present...
    for tag in &q.tagged {
        push_tag_exists(&mut qb, cfg.table, tag, false);
    }
    // ...and none of these may be.
    for tag in &q.not_tagged {
        push_tag_exists(&mut qb, cfg.table, tag, true);
    }

    if let Some(needle) = &q.intitle {
        // Case rules are left to the engine here; `title` is the
        // search-optimized column.
        qb.push(" AND title LIKE '%' || ");
        qb.push_bind(needle.clone());
        qb.push(" || '%'");
    }

    if let Some(needle) = &q.inname {
        let field = cfg.name_field.expect("inname without a name field");
        qb.push(format!(" AND LOWER({}) LIKE '%' || LOWER(", field));
        qb.push_bind(needle.clone());
        qb.push(") || '%'");
    }

    qb.push(format!(" ORDER BY {}", q.order_by));
    qb.push(" LIMIT ");
    qb.push_bind(q.limit + 1);
    qb.push(" OFFSET ");
    qb.push_bind(q.offset);

    qb
}

fn push_tag_exists(
    qb: &mut QueryBuilder<'static, Sqlite>,
    table: &str,
    tag: &str,
    negate: bool,
) {
    let verb = if negate { "NOT EXISTS" } else { "EXISTS" };
    qb.push(format!(
        " AND {verb} (SELECT 1 FROM post_tags pt \
         JOIN tags t ON t.site_id = pt.site_id AND t.id = pt.tag_id \
         WHERE pt.site_id = {table}.site_id AND pt.post_id = {table}.id AND t.name = "
    ));
    qb.push_bind(tag.to_string());
    qb.push(")");
}

/// Split a `;`-delimited name list: trim entries, drop empties.
pub fn split_names(raw: Option<&str>) -> Vec<String> {
    raw.map(|s| {
        s.split(';')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}

/// Parse a detail route path segment into identifiers. Entries beyond
/// [`MAX_IDS`] are silently ignored; a non-numeric entry within the honored
/// prefix is a validation error.
pub fn parse_id_list(raw: &str) -> Result<Vec<i64>, AppError> {
    let mut ids = Vec::new();
    for token in raw.split(';').map(str::trim).filter(|t| !t.is_empty()) {
        if ids.len() == MAX_IDS {
            break;
        }
        let id = token
            .parse()
            .map_err(|_| AppError::BadParameter(format!("Invalid id: {}", token)))?;
        ids.push(id);
    }
    Ok(ids)
}

fn parse_date(raw: &str, param: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| AppError::BadParameter(format!("Invalid date: {}", param)))
}

/// Inclusive lower bound: start of the given day, UTC.
fn parse_day_start(raw: Option<&str>, param: &str) -> Result<Option<String>, AppError> {
    raw.map(|s| parse_date(s, param).map(|d| format!("{}T00:00:00+00:00", d)))
        .transpose()
}

/// Exclusive upper bound: start of the day after, so the named day is
/// included in full.
fn parse_day_after(raw: Option<&str>, param: &str) -> Result<Option<String>, AppError> {
    raw.map(|s| {
        let day = parse_date(s, param)?;
        let next = day
            .checked_add_days(Days::new(1))
            .ok_or_else(|| AppError::BadParameter(format!("Invalid date: {}", param)))?;
        Ok(format!("{}T00:00:00+00:00", next))
    })
    .transpose()
}
