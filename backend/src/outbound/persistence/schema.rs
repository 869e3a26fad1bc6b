//! Diesel table definitions for the ledger schema.
//!
//! These must match `migrations/` exactly. Regenerate with
//! `diesel print-schema` against a migrated database when the schema changes.

diesel::table! {
    /// Registered users; `username` is unique and immutable.
    users (id) {
        id -> Int8,
        username -> Text,
        /// Credential hash owned by the authentication layer; never read here.
        password_hash -> Text,
    }
}

diesel::table! {
    /// Purchases, one row per item bought.
    purchases (id) {
        id -> Int8,
        buyer_id -> Int8,
        market -> Nullable<Text>,
        date_bought -> Date,
        product_category -> Text,
        product_name -> Text,
        /// Price in minor units (cents), strictly positive.
        price_minor -> Int8,
    }
}

diesel::table! {
    /// Consumption shares; unique per `(purchase_id, user_id)`.
    purchase_mappings (id) {
        id -> Int8,
        purchase_id -> Int8,
        user_id -> Int8,
        consumption_share -> Int4,
    }
}

diesel::joinable!(purchases -> users (buyer_id));
diesel::joinable!(purchase_mappings -> purchases (purchase_id));
diesel::joinable!(purchase_mappings -> users (user_id));

diesel::allow_tables_to_appear_in_same_query!(purchase_mappings, purchases, users);
