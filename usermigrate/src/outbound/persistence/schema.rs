//! Diesel table definitions for the supported source schemas.
//!
//! Only the columns discovery reads are declared. `id` orders the scan.

diesel::table! {
    /// Standard shape: one row per account.
    users (id) {
        id -> Int8,
        username -> Nullable<Text>,
        email -> Nullable<Text>,
        first_name -> Nullable<Text>,
        last_name -> Nullable<Text>,
        enabled -> Nullable<Bool>,
    }
}

diesel::table! {
    /// Standard shape: group memberships keyed by user name.
    user_groups (id) {
        id -> Int8,
        username -> Text,
        group_name -> Text,
    }
}

diesel::table! {
    /// Flat shape: accounts with memberships inline.
    user_accounts (id) {
        id -> Int8,
        username -> Nullable<Text>,
        email -> Nullable<Text>,
        first_name -> Nullable<Text>,
        last_name -> Nullable<Text>,
        enabled -> Nullable<Bool>,
        groups -> Nullable<Array<Text>>,
    }
}
