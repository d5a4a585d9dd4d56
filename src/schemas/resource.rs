use serde::{Deserialize, Deserializer, Serialize};
use time::PrimitiveDateTime;

use crate::core::time::rfc3339;
use crate::db::models::Resource;
use crate::db::types::ResourceType;

#[derive(Debug, Deserialize)]
pub(crate) struct ResourceCreate {
    #[serde(rename = "type")]
    pub(crate) kind: ResourceType,
    #[serde(default)]
    pub(crate) title: Option<String>,
    #[serde(default)]
    pub(crate) content: Option<String>,
    #[serde(default, alias = "contentRef")]
    pub(crate) content_ref: Option<String>,
    #[serde(default, alias = "thumbnailRef")]
    pub(crate) thumbnail_ref: Option<String>,
}

/// Partial update. The outer `Option` records whether the key was sent at all, so an
/// explicit `null` can clear a field while an absent key leaves it untouched.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ResourceUpdate {
    #[serde(default, deserialize_with = "present")]
    pub(crate) title: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub(crate) notes: Option<Option<String>>,
    #[serde(default, alias = "learningCategory", deserialize_with = "present")]
    pub(crate) learning_category: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub(crate) tags: Option<Option<Vec<String>>>,
}

fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Serialize)]
pub(crate) struct ResourceResponse {
    pub(crate) id: String,
    #[serde(rename = "type")]
    pub(crate) kind: ResourceType,
    pub(crate) title: Option<String>,
    pub(crate) content_ref: String,
    pub(crate) thumbnail_ref: Option<String>,
    pub(crate) extracted_topics: Vec<String>,
    pub(crate) notes: Option<String>,
    pub(crate) learning_category: Option<String>,
    pub(crate) tags: Vec<String>,
    #[serde(serialize_with = "rfc3339::serialize")]
    pub(crate) created_at: PrimitiveDateTime,
    #[serde(serialize_with = "rfc3339::serialize")]
    pub(crate) updated_at: PrimitiveDateTime,
}

impl ResourceResponse {
    pub(crate) fn from_db(resource: Resource) -> Self {
        Self {
            id: resource.id,
            kind: resource.kind,
            title: resource.title,
            content_ref: resource.content_ref,
            thumbnail_ref: resource.thumbnail_ref,
            extracted_topics: resource.extracted_topics,
            notes: resource.notes,
            learning_category: resource.learning_category,
            tags: resource.tags,
            created_at: resource.created_at,
            updated_at: resource.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_distinguishes_absent_from_null() {
        let update: ResourceUpdate =
            serde_json::from_str(r#"{"notes": null, "learningCategory": "Ops"}"#).unwrap();
        assert_eq!(update.title, None);
        assert_eq!(update.notes, Some(None));
        assert_eq!(update.learning_category, Some(Some("Ops".to_string())));
        assert_eq!(update.tags, None);
    }

    #[test]
    fn create_accepts_camel_case_ref() {
        let create: ResourceCreate =
            serde_json::from_str(r#"{"type": "pdf", "contentRef": "https://x.test/a.pdf"}"#).unwrap();
        assert_eq!(create.kind, ResourceType::Pdf);
        assert_eq!(create.content_ref.as_deref(), Some("https://x.test/a.pdf"));
    }
}
