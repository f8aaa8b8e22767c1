//! Macros for defining entity schemas.
//!
//! The [`define_schema!`] macro generates a module holding a lazily built
//! [`Schema`](crate::schema::Schema) for a table.

/// Defines a module with the schema descriptor of a table.
///
/// # Syntax
///
/// ```ignore
/// define_schema!(
///     books {
///         table: "books",
///         id: "id",
///         fields: {
///             title => "title",
///             year => "published_year"
///         },
///         relations: {
///             author => "author_id": people::schema
///         }
///     }
/// );
/// ```
///
/// This expands to a `pub mod books` exposing `TABLE` and `schema()`. The
/// schema is built on first use and shared afterwards. The `relations`
/// section is optional; targets are resolved relative to the enclosing
/// module.
///
/// # Usage
///
/// ```rust
/// use std::sync::Arc;
///
/// use rowset_db::{define_schema, Entity, FromRow, Row, Schema};
///
/// define_schema!(
///     users {
///         table: "users",
///         id: "id",
///         fields: {
///             name => "name"
///         }
///     }
/// );
///
/// struct User {
///     name: String,
/// }
///
/// impl FromRow for User {
///     fn from_row(row: &Row) -> Option<Self> {
///         Some(User {
///             name: row.get("name").ok()?,
///         })
///     }
/// }
///
/// impl Entity for User {
///     fn schema() -> Arc<Schema> {
///         users::schema()
///     }
/// }
///
/// assert_eq!(users::TABLE, "users");
/// assert_eq!(User::schema().column("name"), Some("name"));
/// ```
#[macro_export]
macro_rules! define_schema {
    (
        $entity:ident {
            table: $table:literal,
            id: $id:literal,
            fields: {
                $($field:ident => $column:literal),* $(,)?
            } $(,)?
            $(relations: {
                $($rel:ident => $rel_column:literal : $target:path),* $(,)?
            } $(,)?)?
        }
    ) => {
        pub mod $entity {
            #[allow(unused_imports)]
            use super::*;

            pub const TABLE: &str = $table;

            static SCHEMA: ::std::sync::LazyLock<::std::sync::Arc<$crate::schema::Schema>> =
                ::std::sync::LazyLock::new(|| {
                    let schema = $crate::schema::Schema::new(TABLE, $id)
                        $(.field(stringify!($field), $column))*;
                    $($(
                        let schema = schema.relation(stringify!($rel), $rel_column, $target);
                    )*)?
                    ::std::sync::Arc::new(schema)
                });

            pub fn schema() -> ::std::sync::Arc<$crate::schema::Schema> {
                ::std::sync::Arc::clone(&SCHEMA)
            }
        }
    };
}
