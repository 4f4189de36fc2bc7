//! Per-resource query configuration tables.
//!
//! One static config per endpoint family. Keeping these declarative makes
//! the whole endpoint surface reviewable in a single file: what a resource
//! can be sorted by, which filters apply, and what its detail routes match.

use super::{Direction, OrderField, ResourceConfig, ValueKind};
use crate::models::BADGE_RANKS;

pub const QUESTIONS: ResourceConfig = ResourceConfig {
    table: "posts",
    base_where: Some("post_type = 1"),
    ordering: &[
        OrderField {
            public_name: "activity",
            storage_field: "last_activity_date",
            kind: ValueKind::Date,
            default_direction: Direction::Desc,
        },
        OrderField {
            public_name: "creation",
            storage_field: "creation_date",
            kind: ValueKind::Date,
            default_direction: Direction::Desc,
        },
        OrderField {
            public_name: "votes",
            storage_field: "score",
            kind: ValueKind::Integer,
            default_direction: Direction::Desc,
        },
    ],
    detail_field: Some("id"),
    date_field: Some("creation_date"),
    name_field: None,
    has_title: true,
    taggable: true,
    site_scoped: true,
};

pub const ANSWERS: ResourceConfig = ResourceConfig {
    table: "posts",
    base_where: Some("post_type = 2"),
    ordering: &[
        OrderField {
            public_name: "activity",
            storage_field: "last_activity_date",
            kind: ValueKind::Date,
            default_direction: Direction::Desc,
        },
        OrderField {
            public_name: "creation",
            storage_field: "creation_date",
            kind: ValueKind::Date,
            default_direction: Direction::Desc,
        },
        OrderField {
            public_name: "votes",
            storage_field: "score",
            kind: ValueKind::Integer,
            default_direction: Direction::Desc,
        },
    ],
    detail_field: Some("id"),
    date_field: Some("creation_date"),
    // Answers carry no title or tags of their own.
    name_field: None,
    has_title: false,
    taggable: false,
    site_scoped: true,
};

pub const POSTS: ResourceConfig = ResourceConfig {
    table: "posts",
    base_where: None,
    ordering: &[
        OrderField {
            public_name: "activity",
            storage_field: "last_activity_date",
            kind: ValueKind::Date,
            default_direction: Direction::Desc,
        },
        OrderField {
            public_name: "creation",
            storage_field: "creation_date",
            kind: ValueKind::Date,
            default_direction: Direction::Desc,
        },
        OrderField {
            public_name: "votes",
            storage_field: "score",
            kind: ValueKind::Integer,
            default_direction: Direction::Desc,
        },
    ],
    detail_field: Some("id"),
    date_field: Some("creation_date"),
    name_field: None,
    has_title: true,
    taggable: true,
    site_scoped: true,
};

pub const BADGES: ResourceConfig = ResourceConfig {
    table: "badges",
    base_where: None,
    ordering: &[
        OrderField {
            public_name: "rank",
            storage_field: "rank",
            kind: ValueKind::Ranked(&BADGE_RANKS),
            default_direction: Direction::Asc,
        },
        OrderField {
            public_name: "name",
            storage_field: "name",
            kind: ValueKind::Text,
            default_direction: Direction::Asc,
        },
    ],
    detail_field: Some("id"),
    date_field: None,
    name_field: Some("name"),
    has_title: false,
    taggable: false,
    site_scoped: true,
};

pub const TAGS: ResourceConfig = ResourceConfig {
    table: "tags",
    base_where: None,
    ordering: &[
        OrderField {
            public_name: "popular",
            storage_field: "count",
            kind: ValueKind::Integer,
            default_direction: Direction::Desc,
        },
        OrderField {
            public_name: "name",
            storage_field: "name",
            kind: ValueKind::Text,
            default_direction: Direction::Asc,
        },
    ],
    detail_field: Some("id"),
    date_field: None,
    name_field: Some("name"),
    has_title: false,
    taggable: false,
    site_scoped: true,
};

pub const USERS: ResourceConfig = ResourceConfig {
    table: "users",
    base_where: None,
    ordering: &[
        OrderField {
            public_name: "reputation",
            storage_field: "reputation",
            kind: ValueKind::Integer,
            default_direction: Direction::Desc,
        },
        OrderField {
            public_name: "creation",
            storage_field: "creation_date",
            kind: ValueKind::Date,
            default_direction: Direction::Desc,
        },
        OrderField {
            public_name: "name",
            storage_field: "display_name",
            kind: ValueKind::Text,
            default_direction: Direction::Asc,
        },
    ],
    detail_field: Some("id"),
    date_field: Some("creation_date"),
    name_field: Some("display_name"),
    has_title: false,
    taggable: false,
    site_scoped: true,
};

pub const COMMENTS: ResourceConfig = ResourceConfig {
    table: "comments",
    base_where: None,
    ordering: &[
        OrderField {
            public_name: "creation",
            storage_field: "creation_date",
            kind: ValueKind::Date,
            default_direction: Direction::Desc,
        },
        OrderField {
            public_name: "votes",
            storage_field: "score",
            kind: ValueKind::Integer,
            default_direction: Direction::Desc,
        },
    ],
    detail_field: Some("id"),
    date_field: Some("creation_date"),
    name_field: None,
    has_title: false,
    taggable: false,
    site_scoped: true,
};

/// Comments looked up by post: the detail field is a foreign key, so one
/// route serves "all comments for these posts".
pub const POST_COMMENTS: ResourceConfig = ResourceConfig {
    table: "comments",
    base_where: None,
    ordering: &[
        OrderField {
            public_name: "creation",
            storage_field: "creation_date",
            kind: ValueKind::Date,
            default_direction: Direction::Desc,
        },
        OrderField {
            public_name: "votes",
            storage_field: "score",
            kind: ValueKind::Integer,
            default_direction: Direction::Desc,
        },
    ],
    detail_field: Some("post_id"),
    date_field: Some("creation_date"),
    name_field: None,
    has_title: false,
    taggable: false,
    site_scoped: true,
};

/// The tenant directory itself; the only resource that is not site-scoped
/// and has no detail action.
pub const SITES: ResourceConfig = ResourceConfig {
    table: "sites",
    base_where: None,
    ordering: &[OrderField {
        public_name: "name",
        storage_field: "name",
        kind: ValueKind::Text,
        default_direction: Direction::Asc,
    }],
    detail_field: None,
    date_field: None,
    name_field: Some("name"),
    has_title: false,
    taggable: false,
    site_scoped: false,
};
