//! Catalogue service: the book repository plus catalogue queries.

use std::collections::BTreeSet;

use super::codec::BookResource;
use super::ports::RemoteClient;
use super::repository::{ResilientRepository, WriteOutcome};
use super::{Book, BookDraft, BookPatch, EntityId, RepositoryError};

type Books<C> = ResilientRepository<BookResource, C>;

/// Book catalogue backed by the books service.
pub struct BookService<C: ?Sized> {
    books: Books<C>,
}

impl<C> BookService<C>
where
    C: RemoteClient + ?Sized,
{
    /// Catalogue over `books`.
    #[must_use]
    pub const fn new(books: Books<C>) -> Self {
        Self { books }
    }

    /// Cached records, verbatim.
    #[must_use]
    pub fn get_all_sync(&self) -> &[Book] {
        self.books.get_all_sync()
    }

    /// Cached record matching `id`.
    #[must_use]
    pub fn get_by_id_sync(&self, id: &EntityId) -> Option<&Book> {
        self.books.get_by_id_sync(id)
    }

    /// List remotely, falling back to the cache.
    pub async fn get_all_async(&mut self) -> Vec<Book> {
        self.books.get_all_async().await
    }

    /// Fetch one record; `None` when absent.
    pub async fn get_by_id_async(&mut self, id: &EntityId) -> Option<Book> {
        self.books.get_by_id_async(id).await
    }

    /// Create a book, remotely when possible.
    ///
    /// # Errors
    ///
    /// See [`ResilientRepository::create`].
    pub async fn create(&mut self, draft: BookDraft) -> Result<WriteOutcome<Book>, RepositoryError> {
        self.books.create(draft).await
    }

    /// Update a book, remotely when possible.
    ///
    /// # Errors
    ///
    /// See [`ResilientRepository::update`].
    pub async fn update(
        &mut self,
        id: &EntityId,
        patch: BookPatch,
    ) -> Result<Option<WriteOutcome<Book>>, RepositoryError> {
        self.books.update(id, patch).await
    }

    /// Delete remotely and always locally; `true` when a cached record went.
    pub async fn delete(&mut self, id: &EntityId) -> bool {
        self.books.delete(id).await
    }

    /// Cached books whose title or author contains `query`, ignoring case.
    #[must_use]
    pub fn search_sync(&self, query: &str) -> Vec<Book> {
        self.get_all_sync()
            .iter()
            .filter(|book| book.matches_query(query))
            .cloned()
            .collect()
    }

    /// Search remotely, falling back to [`BookService::search_sync`].
    pub async fn search_async(&mut self, query: &str) -> Vec<Book> {
        let needle = query.trim();
        if needle.is_empty() {
            return self.get_all_async().await;
        }
        let path = format!("/search?q={}", encode_query(needle));
        self.books
            .query(&path, |book| book.matches_query(needle))
            .await
    }

    /// Cached books in `category`, ignoring case. `"all"` and blank select
    /// every book.
    #[must_use]
    pub fn filter_by_category(&self, category: &str) -> Vec<Book> {
        let wanted = category.trim();
        self.get_all_sync()
            .iter()
            .filter(|book| {
                wanted.is_empty()
                    || wanted.eq_ignore_ascii_case("all")
                    || book.category.to_lowercase() == wanted.to_lowercase()
            })
            .cloned()
            .collect()
    }

    /// Distinct categories of the cached books, sorted.
    #[must_use]
    pub fn categories(&self) -> Vec<String> {
        self.get_all_sync()
            .iter()
            .map(|book| book.category.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

/// Percent-encode a query string value.
fn encode_query(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

#[cfg(test)]
#[path = "book_service_tests.rs"]
mod tests;
