//! Books service records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{EntityCodec, Resource, put_some};
use crate::domain::{
    Book, BookDraft, BookPatch, BookStatus, CopyCounts, DEFAULT_CATEGORY, EntityId, ValidationError,
};

/// Availability as spelled by the books service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RemoteBookStatus {
    /// `AVAILABLE`.
    #[default]
    #[serde(alias = "DISPONIBLE", alias = "available")]
    Available,
    /// `LOANED`.
    #[serde(alias = "PRESTADO", alias = "loaned")]
    Loaned,
    /// `RESERVED`.
    #[serde(alias = "RESERVADO", alias = "reserved")]
    Reserved,
}

impl From<RemoteBookStatus> for BookStatus {
    fn from(value: RemoteBookStatus) -> Self {
        match value {
            RemoteBookStatus::Available => Self::Available,
            RemoteBookStatus::Loaned => Self::Loaned,
            RemoteBookStatus::Reserved => Self::Reserved,
        }
    }
}

impl From<BookStatus> for RemoteBookStatus {
    fn from(value: BookStatus) -> Self {
        match value {
            BookStatus::Available => Self::Available,
            BookStatus::Loaned => Self::Loaned,
            BookStatus::Reserved => Self::Reserved,
        }
    }
}

/// Book as returned by the books service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteBook {
    /// Numeric key.
    pub id: u64,
    /// Title.
    pub title: String,
    /// Author.
    pub author: String,
    /// Category; may be absent or blank.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Summary.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Cover image reference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_url: Option<String>,
    /// Availability.
    #[serde(default)]
    pub status: RemoteBookStatus,
    /// Copies owned.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_copies: Option<u32>,
    /// Copies on the shelf.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub available_copies: Option<u32>,
}

/// Catalogue entries served by the books service.
#[derive(Debug, Clone, Copy, Default)]
pub struct BookResource;

impl EntityCodec for BookResource {
    type Remote = RemoteBook;
    type Local = Book;
    type Draft = BookDraft;
    type Patch = BookPatch;

    fn to_local(remote: RemoteBook) -> Book {
        let category = category_or_default(remote.category.as_deref());
        let copies = match (remote.total_copies, remote.available_copies) {
            (Some(total), Some(available)) => Some(CopyCounts { total, available }),
            _ => None,
        };
        Book {
            id: EntityId::from(remote.id),
            title: remote.title,
            author: remote.author,
            category,
            description: remote.description.unwrap_or_default(),
            cover_url: remote.cover_url.unwrap_or_default(),
            status: remote.status.into(),
            copies,
        }
    }

    fn to_remote(local: &Book) -> Option<RemoteBook> {
        Some(RemoteBook {
            id: local.id.remote_id()?,
            title: local.title.clone(),
            author: local.author.clone(),
            category: Some(local.category.clone()),
            description: Some(local.description.clone()),
            cover_url: Some(local.cover_url.clone()),
            status: local.status.into(),
            total_copies: local.copies.map(|copies| copies.total),
            available_copies: local.copies.map(|copies| copies.available),
        })
    }

    fn draft_payload(draft: &BookDraft) -> Option<Value> {
        let mut body = Map::new();
        body.insert("title".into(), draft.title.trim().into());
        body.insert("author".into(), draft.author.trim().into());
        body.insert(
            "category".into(),
            category_or_default(draft.category.as_deref()).into(),
        );
        body.insert(
            "description".into(),
            draft.description.as_deref().unwrap_or_default().into(),
        );
        body.insert(
            "coverUrl".into(),
            draft.cover_url.as_deref().unwrap_or_default().into(),
        );
        body.insert("totalCopies".into(), 1.into());
        Some(Value::Object(body))
    }

    fn patch_payload(patch: &BookPatch) -> Value {
        let mut body = Map::new();
        put_some(&mut body, "title", patch.title.as_deref());
        put_some(&mut body, "author", patch.author.as_deref());
        let category = patch
            .category
            .as_deref()
            .map(|value| category_or_default(Some(value)));
        put_some(&mut body, "category", category.as_deref());
        put_some(&mut body, "description", patch.description.as_deref());
        put_some(&mut body, "coverUrl", patch.cover_url.as_deref());
        Value::Object(body)
    }
}

impl Resource for BookResource {
    const ENTITY: &'static str = "book";
    const STORE_KEY: &'static str = "books";
    const LIST_PATH: &'static str = "/all";

    fn id(local: &Book) -> &EntityId {
        &local.id
    }

    fn validate_draft(draft: &BookDraft) -> Result<(), ValidationError> {
        ValidationError::require_text("title", &draft.title)?;
        ValidationError::require_text("author", &draft.author)
    }

    fn validate_patch(patch: &BookPatch) -> Result<(), ValidationError> {
        if let Some(title) = &patch.title {
            ValidationError::require_text("title", title)?;
        }
        if let Some(author) = &patch.author {
            ValidationError::require_text("author", author)?;
        }
        Ok(())
    }

    fn synthesize(draft: &BookDraft, id: EntityId, _now: DateTime<Utc>) -> Book {
        Book {
            id,
            title: draft.title.trim().to_owned(),
            author: draft.author.trim().to_owned(),
            category: category_or_default(draft.category.as_deref()),
            description: draft.description.clone().unwrap_or_default(),
            cover_url: draft.cover_url.clone().unwrap_or_default(),
            status: draft.status.unwrap_or_default(),
            copies: None,
        }
    }

    fn merge(local: &mut Book, patch: &BookPatch) {
        if let Some(title) = &patch.title {
            local.title = title.trim().to_owned();
        }
        if let Some(author) = &patch.author {
            local.author = author.trim().to_owned();
        }
        if let Some(category) = &patch.category {
            local.category = category_or_default(Some(category));
        }
        if let Some(description) = &patch.description {
            local.description = description.clone();
        }
        if let Some(cover_url) = &patch.cover_url {
            local.cover_url = cover_url.clone();
        }
        // Once copy counts are tracked the status belongs to the books service.
        if let (Some(status), None) = (patch.status, local.copies) {
            local.status = status;
        }
    }

    fn seed(_now: DateTime<Utc>) -> Vec<Book> {
        [
            ("b1", "Clean Code", "Robert C. Martin", "Programación", "Principios para escribir código limpio"),
            ("b2", "Design Patterns", "GoF", "Programación", "Patrones de diseño clásicos"),
            ("b3", "Fundamentos de Bases de Datos", "Elmasri & Navathe", "Base de Datos", "Modelado y diseño de BD"),
            ("b4", "JavaScript: The Good Parts", "Douglas Crockford", "Programación", "Lo mejor de JavaScript"),
            ("b5", "Refactoring", "Martin Fowler", "Programación", "Técnicas de refactorización"),
            ("b6", "Sistemas Operativos", "Tanenbaum", "Sistemas", "Conceptos de SO"),
            ("b7", "Redes de Computadoras", "Kurose & Ross", "Redes", "Fundamentos de redes"),
            ("b8", "Patrones de Arquitectura", "Buschmann", "Arquitectura", "Patrones arquitectónicos"),
        ]
        .into_iter()
        .map(|(id, title, author, category, description)| Book {
            id: EntityId::new(id),
            title: title.to_owned(),
            author: author.to_owned(),
            category: category.to_owned(),
            description: description.to_owned(),
            cover_url: String::new(),
            status: BookStatus::Available,
            copies: None,
        })
        .collect()
    }
}

/// A missing or blank category is filed under [`DEFAULT_CATEGORY`].
fn category_or_default(category: Option<&str>) -> String {
    category
        .map(str::trim)
        .filter(|category| !category.is_empty())
        .unwrap_or(DEFAULT_CATEGORY)
        .to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    fn book() -> Book {
        Book {
            id: EntityId::new("12"),
            title: "Refactoring".to_owned(),
            author: "Martin Fowler".to_owned(),
            category: "Programación".to_owned(),
            description: "Técnicas".to_owned(),
            cover_url: "https://covers.example/12.jpg".to_owned(),
            status: BookStatus::Loaned,
            copies: Some(CopyCounts {
                total: 3,
                available: 0,
            }),
        }
    }

    #[test]
    fn fills_defaults_for_absent_fields() {
        let remote: RemoteBook =
            serde_json::from_value(json!({"id": 4, "title": "SICP", "author": "Abelson"}))
                .expect("decode book");
        let local = BookResource::to_local(remote);

        assert_eq!(local.id, EntityId::new("4"));
        assert_eq!(local.category, DEFAULT_CATEGORY);
        assert_eq!(local.description, "");
        assert_eq!(local.cover_url, "");
        assert_eq!(local.status, BookStatus::Available);
        assert_eq!(local.copies, None);
    }

    #[test]
    fn blank_categories_become_general() {
        let remote: RemoteBook = serde_json::from_value(
            json!({"id": 4, "title": "SICP", "author": "Abelson", "category": "  "}),
        )
        .expect("decode book");
        assert_eq!(BookResource::to_local(remote).category, DEFAULT_CATEGORY);
    }

    #[test]
    fn remote_round_trip_preserves_shared_fields() {
        let original = book();
        let remote = BookResource::to_remote(&original).expect("numeric id");
        assert_eq!(BookResource::to_local(remote), original);
    }

    #[test]
    fn local_only_books_have_no_remote_form() {
        let mut local = book();
        local.id = EntityId::generate();
        assert!(BookResource::to_remote(&local).is_none());
    }

    #[test]
    fn draft_payload_requests_one_copy_with_defaults() {
        let payload = BookResource::draft_payload(&BookDraft::new(" SICP ", "Abelson"))
            .expect("books are always remotely expressible");
        assert_eq!(
            payload,
            json!({
                "title": "SICP",
                "author": "Abelson",
                "category": "General",
                "description": "",
                "coverUrl": "",
                "totalCopies": 1,
            })
        );
    }

    #[test]
    fn patch_payload_omits_absent_fields_and_status() {
        let patch = BookPatch {
            title: Some("Refactoring, 2nd ed.".to_owned()),
            status: Some(BookStatus::Reserved),
            ..BookPatch::default()
        };
        assert_eq!(
            BookResource::patch_payload(&patch),
            json!({"title": "Refactoring, 2nd ed."})
        );
    }

    #[test]
    fn merge_leaves_status_alone_once_copies_are_tracked() {
        let mut tracked = book();
        let patch = BookPatch {
            status: Some(BookStatus::Available),
            ..BookPatch::default()
        };
        BookResource::merge(&mut tracked, &patch);
        assert_eq!(tracked.status, BookStatus::Loaned);

        let mut untracked = book();
        untracked.copies = None;
        BookResource::merge(&mut untracked, &patch);
        assert_eq!(untracked.status, BookStatus::Available);
    }

    #[rstest]
    #[case("")]
    #[case("   ")]
    fn blank_category_patches_fall_back_to_general(#[case] category: &str) {
        let mut local = book();
        let patch = BookPatch {
            category: Some(category.to_owned()),
            ..BookPatch::default()
        };

        BookResource::merge(&mut local, &patch);

        assert_eq!(local.category, DEFAULT_CATEGORY);
        assert_eq!(
            BookResource::patch_payload(&patch),
            json!({"category": DEFAULT_CATEGORY})
        );
    }

    #[test]
    fn seed_catalogue_has_eight_available_books() {
        let seed = BookResource::seed(Utc::now());
        assert_eq!(seed.len(), 8);
        assert!(seed.iter().all(|book| book.status == BookStatus::Available));
        assert_eq!(seed[0].title, "Clean Code");
    }
}
