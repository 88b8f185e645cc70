//! Tag extraction for report rows.

use crate::model::Tag;

pub const TAG_NAME: &str = "Name";
pub const TAG_DESCRIPTION: &str = "Description";

/// Placeholder for a tag the resource does not carry.
pub const NOT_AVAILABLE: &str = "N/A";

/// Normalized `Name`/`Description` pair of a resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagSummary {
    pub name: String,
    pub description: String,
}

/// Extract the `Name` and `Description` tags.
///
/// Scans forward so the last occurrence of a duplicated key wins. Missing
/// keys map to [`NOT_AVAILABLE`].
pub fn extract(tags: &[Tag]) -> TagSummary {
    let mut name = None;
    let mut description = None;

    for tag in tags {
        match tag.key.as_str() {
            TAG_NAME => name = Some(tag.value.as_str()),
            TAG_DESCRIPTION => description = Some(tag.value.as_str()),
            _ => {}
        }
    }

    TagSummary {
        name: name.unwrap_or(NOT_AVAILABLE).to_string(),
        description: description.unwrap_or(NOT_AVAILABLE).to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_tags_default_to_sentinel() {
        let summary = extract(&[]);
        assert_eq!(summary.name, "N/A");
        assert_eq!(summary.description, "N/A");
    }

    #[test]
    fn test_name_and_description() {
        let tags = vec![
            Tag::new("Environment", "prod"),
            Tag::new("Name", "db-data"),
            Tag::new("Description", "postgres data volume"),
        ];
        let summary = extract(&tags);
        assert_eq!(summary.name, "db-data");
        assert_eq!(summary.description, "postgres data volume");
    }

    #[test]
    fn test_duplicate_key_last_wins() {
        let tags = vec![Tag::new("Name", "a"), Tag::new("Name", "b")];
        assert_eq!(extract(&tags).name, "b");
    }

    #[test]
    fn test_keys_are_case_sensitive() {
        let tags = vec![Tag::new("name", "lower"), Tag::new("DESCRIPTION", "upper")];
        let summary = extract(&tags);
        assert_eq!(summary.name, "N/A");
        assert_eq!(summary.description, "N/A");
    }

    #[test]
    fn test_empty_value_is_kept() {
        let tags = vec![Tag::new("Name", "")];
        assert_eq!(extract(&tags).name, "");
    }
}
