//! Internal Diesel row structs and their conversion to user records.
//!
//! Row types never leave the persistence layer; discovery hands the domain
//! opaque [`Record`]s shaped like Keycloak user representations.

use diesel::prelude::*;
use serde_json::{Map, Value};

use super::schema::{user_accounts, user_groups, users};
use crate::domain::{GROUPS_FIELD, Record};

/// Row struct for the standard `users` table.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct UserRow {
    pub username: Option<String>,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub enabled: Option<bool>,
}

/// Row struct for the standard `user_groups` table.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = user_groups)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct UserGroupRow {
    pub username: String,
    pub group_name: String,
}

/// Row struct for the flat `user_accounts` table.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = user_accounts)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct UserAccountRow {
    pub username: Option<String>,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub enabled: Option<bool>,
    pub groups: Option<Vec<String>>,
}

impl UserRow {
    /// Convert to a user record carrying `groups` when any are given.
    pub(crate) fn into_record(self, groups: Vec<String>) -> Record {
        user_record(
            [
                ("username", self.username),
                ("email", self.email),
                ("firstName", self.first_name),
                ("lastName", self.last_name),
            ],
            self.enabled,
            groups,
        )
    }
}

impl UserAccountRow {
    pub(crate) fn into_record(self) -> Record {
        user_record(
            [
                ("username", self.username),
                ("email", self.email),
                ("firstName", self.first_name),
                ("lastName", self.last_name),
            ],
            self.enabled,
            self.groups.unwrap_or_default(),
        )
    }
}

fn user_record(
    text_fields: [(&str, Option<String>); 4],
    enabled: Option<bool>,
    groups: Vec<String>,
) -> Record {
    let mut fields = Map::new();
    for (key, value) in text_fields {
        if let Some(value) = value {
            fields.insert(key.to_owned(), Value::String(value));
        }
    }
    if let Some(enabled) = enabled {
        fields.insert("enabled".to_owned(), Value::Bool(enabled));
    }
    if !groups.is_empty() {
        fields.insert(
            GROUPS_FIELD.to_owned(),
            Value::Array(groups.into_iter().map(Value::String).collect()),
        );
    }
    Record::new(fields)
}
