use std::any::type_name;

use documented::{Documented, DocumentedFields};
use toml_edit::{Decor, Item, RawString, Table};
use tracing::warn;

use crate::error::{ConfigError, Result};

/// Appends documentation lines as TOML comments to the given `Decor`.
///
/// Each line becomes a `#` comment placed after any comment already in the
/// prefix. Blank documentation lines become a bare `#`.
pub fn append_docs_as_toml_comments(decor: &mut Decor, docs: &str) {
    let old_prefix = decor.prefix().and_then(RawString::as_str);

    let comments: String = docs
        .lines()
        .map(|l| {
            if l.is_empty() {
                "#\n".into()
            } else {
                format!("# {l}\n")
            }
        })
        .collect();

    let new_prefix = match old_prefix {
        None | Some("") => comments,
        Some(prefix) if prefix.ends_with("\n\n") || !prefix.contains('#') => {
            format!("{prefix}{comments}")
        }
        Some(prefix) => format!("{prefix}#\n{comments}"),
    };
    decor.set_prefix(new_prefix);
}

/// Annotates a TOML `Table` with the field docs of `T`.
///
/// Every key gets the doc comment of the matching struct field. Unless
/// `is_root` is set, the table itself also gets the struct-level docs.
///
/// # Errors
///
/// Returns [`ConfigError::UnexpectedTomlItem`] if a key holds no item.
pub fn annotate_toml_table<T>(table: &mut Table, is_root: bool) -> Result<()>
where
    T: Documented + DocumentedFields,
{
    if !is_root {
        append_docs_as_toml_comments(table.decor_mut(), T::DOCS);
    }

    for (mut key_mut, value_item) in table.iter_mut() {
        let key_str = key_mut.get();
        match T::get_field_docs(key_str) {
            Ok(docs) => match value_item {
                Item::None => {
                    return Err(ConfigError::UnexpectedTomlItem(key_str.into()));
                }
                Item::Value(_) => append_docs_as_toml_comments(key_mut.leaf_decor_mut(), docs),
                Item::Table(sub_table) => append_docs_as_toml_comments(sub_table.decor_mut(), docs),
                Item::ArrayOfTables(array) => {
                    if let Some(first_table) = array.iter_mut().next() {
                        append_docs_as_toml_comments(first_table.decor_mut(), docs);
                    }
                }
            },
            Err(_) => {
                warn!(
                    "Field '{}' found in TOML but not in struct '{}' for documentation lookup",
                    key_str,
                    type_name::<T>()
                );
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use toml_edit::{Decor, DocumentMut};

    use super::*;
    use crate::config::{Config, DatabaseConfig};

    #[test]
    fn test_append_docs_as_toml_comments() {
        let mut decor = Decor::new("", "");
        append_docs_as_toml_comments(&mut decor, "Test documentation");

        let prefix = decor.prefix().and_then(|p| p.as_str()).unwrap();
        assert_eq!(prefix, "# Test documentation\n");
    }

    #[test]
    fn test_append_docs_multiline() {
        let mut decor = Decor::new("", "");
        append_docs_as_toml_comments(&mut decor, "Line 1\n\nLine 2");

        let prefix = decor.prefix().and_then(|p| p.as_str()).unwrap();
        assert_eq!(prefix, "# Line 1\n#\n# Line 2\n");
    }

    #[test]
    fn test_append_docs_after_existing_comment() {
        let mut decor = Decor::new("# First\n", "");
        append_docs_as_toml_comments(&mut decor, "Second");

        let prefix = decor.prefix().and_then(|p| p.as_str()).unwrap();
        assert_eq!(prefix, "# First\n#\n# Second\n");
    }

    #[test]
    fn test_annotate_table_fields() {
        let mut doc = "path = \"/tmp/app.db\"\nbusy_timeout_ms = 10\n"
            .parse::<DocumentMut>()
            .unwrap();

        annotate_toml_table::<DatabaseConfig>(doc.as_table_mut(), true).unwrap();

        let rendered = doc.to_string();
        assert!(rendered.contains("# Path to the SQLite database file"));
        assert!(rendered.contains("busy_timeout_ms = 10"));
    }

    #[test]
    fn test_annotate_toml_document() {
        let config = Config::default_config();
        let doc = config.to_annotated_document().unwrap();

        let rendered = doc.to_string();
        assert!(rendered.contains("[database]"));
        assert!(rendered.contains("# Maximum number of related-field hops"));
    }
}
