//! Derive group records from user memberships.

use std::collections::BTreeSet;

use serde_json::Value;
use tracing::debug;

use super::record::{GROUPS_FIELD, ObjectKind, Record};

/// Build one group record per distinct group named by any user.
///
/// Groups come back sorted by name, so the result does not depend on the
/// order of `users`.
///
/// # Examples
/// ```
/// use serde_json::json;
/// use usermigrate::domain::{ObjectKind, Record, derive_groups};
///
/// let users: Vec<Record> = vec![
///     serde_json::from_value(json!({"username": "b", "groups": ["g2", "g1"]})).expect("object"),
///     serde_json::from_value(json!({"username": "a", "groups": ["g1"]})).expect("object"),
/// ];
/// let names: Vec<_> = derive_groups(&users)
///     .iter()
///     .filter_map(|group| group.name(ObjectKind::Group))
///     .collect();
/// assert_eq!(names, ["g1", "g2"]);
/// ```
#[must_use]
pub fn derive_groups(users: &[Record]) -> Vec<Record> {
    let mut names = BTreeSet::new();
    for user in users {
        let ignored = user
            .get(GROUPS_FIELD)
            .and_then(Value::as_array)
            .map_or(0, |entries| {
                entries
                    .iter()
                    .filter(|entry| entry.as_str().is_none_or(|name| name.trim().is_empty()))
                    .count()
            });
        if ignored > 0 {
            debug!(
                user = user.name(ObjectKind::User).as_deref().unwrap_or("<unnamed>"),
                ignored, "ignoring group entries that are not names"
            );
        }
        names.extend(user.group_names());
    }
    names.into_iter().map(Record::group).collect()
}

#[cfg(test)]
mod tests {
    //! Regression coverage for group derivation.

    use rstest::rstest;
    use serde_json::{Value, json};

    use super::*;

    fn users(values: Vec<Value>) -> Vec<Record> {
        values
            .into_iter()
            .map(|value| serde_json::from_value(value).expect("object fixture"))
            .collect()
    }

    fn names(groups: &[Record]) -> Vec<String> {
        groups
            .iter()
            .filter_map(|group| group.name(ObjectKind::Group))
            .collect()
    }

    #[rstest]
    fn unions_and_deduplicates_memberships() {
        let users = users(vec![
            json!({"username": "a", "groups": ["g1"]}),
            json!({"username": "b", "groups": ["g1", "g2"]}),
        ]);
        assert_eq!(names(&derive_groups(&users)), ["g1", "g2"]);
    }

    #[rstest]
    #[case::forward(vec![
        json!({"username": "a", "groups": ["z", "m"]}),
        json!({"username": "b", "groups": ["a"]}),
    ])]
    #[case::reversed(vec![
        json!({"username": "b", "groups": ["a"]}),
        json!({"username": "a", "groups": ["m", "z"]}),
    ])]
    fn output_is_independent_of_input_order(#[case] values: Vec<Value>) {
        assert_eq!(names(&derive_groups(&users(values))), ["a", "m", "z"]);
    }

    #[rstest]
    fn users_without_groups_contribute_nothing() {
        let users = users(vec![
            json!({"username": "a"}),
            json!({"username": "b", "groups": null}),
            json!({"username": "c", "groups": []}),
        ]);
        assert!(derive_groups(&users).is_empty());
    }

    #[rstest]
    fn derived_groups_carry_only_a_name() {
        let users = users(vec![json!({"username": "a", "groups": ["g1"]})]);
        let groups = derive_groups(&users);
        assert_eq!(
            serde_json::to_value(&groups).expect("serialize"),
            json!([{"name": "g1"}])
        );
    }
}
