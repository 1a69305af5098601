//! Identity records and the object kinds they are imported as.
//!
//! A [`Record`] is an opaque JSON object. The tool never validates its schema;
//! it only reads the name field required by the [`ObjectKind`] it is imported
//! as and, for users, the `groups` field used to derive group records.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Key holding the group memberships of a user record.
pub const GROUPS_FIELD: &str = "groups";

/// The type of object a batch of records is imported as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    /// Keycloak users, keyed by `username`.
    User,
    /// Keycloak groups, keyed by `name`.
    Group,
}

impl ObjectKind {
    /// Type tag used in messages and file names.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Group => "group",
        }
    }

    /// Record field holding the object's name.
    #[must_use]
    pub const fn name_key(self) -> &'static str {
        match self {
            Self::User => "username",
            Self::Group => "name",
        }
    }

    /// Admin API collection the object is created in.
    #[must_use]
    pub const fn collection(self) -> &'static str {
        match self {
            Self::User => "users",
            Self::Group => "groups",
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown [`ObjectKind`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown object kind '{0}', expected 'user' or 'group'")]
pub struct ParseObjectKindError(String);

impl FromStr for ObjectKind {
    type Err = ParseObjectKindError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "user" | "users" => Ok(Self::User),
            "group" | "groups" => Ok(Self::Group),
            _ => Err(ParseObjectKindError(value.to_owned())),
        }
    }
}

/// A single user or group representation as sent to the admin API.
///
/// # Examples
/// ```
/// use serde_json::json;
/// use usermigrate::domain::{ObjectKind, Record};
///
/// let record: Record = serde_json::from_value(json!({"username": "alice"}))
///     .expect("object");
/// assert_eq!(record.name(ObjectKind::User).as_deref(), Some("alice"));
/// assert_eq!(record.name(ObjectKind::Group), None);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(Map<String, Value>);

impl Record {
    /// Wrap an existing JSON object.
    #[must_use]
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// Build a group record `{"name": <name>}`.
    #[must_use]
    pub fn group(name: &str) -> Self {
        let mut fields = Map::new();
        fields.insert(
            ObjectKind::Group.name_key().to_owned(),
            Value::String(name.to_owned()),
        );
        Self(fields)
    }

    /// Borrow a field value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Name of the record when imported as `kind`.
    ///
    /// Strings are returned verbatim and non-zero numbers are rendered as
    /// text. Absent, `null`, blank, zero, or otherwise typed names yield
    /// `None`, which makes the record unimportable.
    #[must_use]
    pub fn name(&self, kind: ObjectKind) -> Option<String> {
        match self.0.get(kind.name_key())? {
            Value::String(name) if !name.trim().is_empty() => Some(name.clone()),
            Value::Number(number) if number.as_f64().is_some_and(|value| value != 0.0) => {
                Some(number.to_string())
            }
            _ => None,
        }
    }

    /// Group names listed in the record's `groups` field.
    ///
    /// Non-string and blank entries are ignored.
    pub fn group_names(&self) -> impl Iterator<Item = &str> {
        self.0
            .get(GROUPS_FIELD)
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .filter_map(Value::as_str)
            .filter(|name| !name.trim().is_empty())
    }
}

impl From<Map<String, Value>> for Record {
    fn from(fields: Map<String, Value>) -> Self {
        Self::new(fields)
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered = serde_json::to_string(&self.0).map_err(|_| fmt::Error)?;
        f.write_str(&rendered)
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for record name and group extraction.

    use rstest::rstest;
    use serde_json::json;

    use super::*;

    fn record(value: Value) -> Record {
        serde_json::from_value(value).expect("record fixture must be an object")
    }

    #[rstest]
    #[case::string(json!({"username": "alice"}), Some("alice"))]
    #[case::number(json!({"username": 42}), Some("42"))]
    #[case::negative(json!({"username": -7}), Some("-7"))]
    #[case::zero(json!({"username": 0}), None)]
    #[case::float_zero(json!({"username": 0.0}), None)]
    #[case::missing(json!({"email": "a@example.com"}), None)]
    #[case::null(json!({"username": null}), None)]
    #[case::blank(json!({"username": "  "}), None)]
    #[case::array(json!({"username": ["alice"]}), None)]
    fn user_names(#[case] value: Value, #[case] expected: Option<&str>) {
        assert_eq!(record(value).name(ObjectKind::User).as_deref(), expected);
    }

    #[rstest]
    fn group_name_uses_the_name_key() {
        let group = Record::group("admins");
        assert_eq!(group.name(ObjectKind::Group).as_deref(), Some("admins"));
        assert_eq!(group.name(ObjectKind::User), None);
    }

    #[rstest]
    #[case::listed(json!({"groups": ["g1", "g2"]}), vec!["g1", "g2"])]
    #[case::missing(json!({"username": "a"}), vec![])]
    #[case::null(json!({"groups": null}), vec![])]
    #[case::mixed(json!({"groups": ["g1", 7, "", null, "g2"]}), vec!["g1", "g2"])]
    #[case::not_a_list(json!({"groups": "g1"}), vec![])]
    fn group_names(#[case] value: Value, #[case] expected: Vec<&str>) {
        let record = record(value);
        assert_eq!(record.group_names().collect::<Vec<_>>(), expected);
    }

    #[rstest]
    fn displays_as_compact_json() {
        let record = record(json!({"groups": ["g1"]}));
        assert_eq!(record.to_string(), r#"{"groups":["g1"]}"#);
    }

    #[rstest]
    fn non_objects_do_not_deserialize() {
        assert!(serde_json::from_value::<Record>(json!(["alice"])).is_err());
    }

    #[rstest]
    #[case("user", ObjectKind::User)]
    #[case("Groups", ObjectKind::Group)]
    fn object_kind_parses(#[case] raw: &str, #[case] expected: ObjectKind) {
        assert_eq!(raw.parse::<ObjectKind>(), Ok(expected));
    }

    #[rstest]
    fn object_kind_rejects_unknown_values() {
        assert!("role".parse::<ObjectKind>().is_err());
    }
}
