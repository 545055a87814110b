use std::sync::Arc;

use chrono::Datelike;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    errors::{AppError, AppResult},
    models::{Book, BookStatus},
    store::BookStore,
    utils::Clock,
};

/// No book predates movable type.
const EARLIEST_PUBLICATION_YEAR: i32 = 1450;

/// Owns book records and their availability state. `set_status` is the only
/// mutator after `add` and is called exclusively by the lending workflow.
#[derive(Clone)]
pub struct BookCatalog {
    store: Arc<dyn BookStore>,
    clock: Arc<dyn Clock>,
}

impl BookCatalog {
    pub fn new(store: Arc<dyn BookStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Add a new book. The status of a freshly added book is always
    /// `Available`.
    ///
    /// # Errors
    /// `Validation` on blank fields or an out-of-range year; `Duplicate` when
    /// a same-edition book already exists, regardless of its status.
    pub async fn add(
        &self,
        title: &str,
        author: &str,
        year: i32,
        publisher: &str,
    ) -> AppResult<Book> {
        debug!(title, author, "attempting to add new book");

        if title.trim().is_empty() || author.trim().is_empty() || publisher.trim().is_empty() {
            warn!(title, author, publisher, "book validation failed, one or more required fields are empty");
            return Err(AppError::Validation(
                "book title, author and publisher cannot be empty".into(),
            ));
        }

        let current_year = self.clock.now().year();
        if year < EARLIEST_PUBLICATION_YEAR || year > current_year {
            warn!(year, "publication year out of bounds");
            return Err(AppError::Validation(format!(
                "publication year must be between {EARLIEST_PUBLICATION_YEAR} and {current_year}"
            )));
        }

        let duplicate = self
            .store
            .find_by_title(title)
            .await?
            .iter()
            .any(|b| b.describes(title, author, year, publisher));
        if duplicate {
            warn!(title, author, year, publisher, "duplicate book detected");
            return Err(AppError::Duplicate(format!(
                "book '{title}' already exists in the catalog"
            )));
        }

        let book = Book {
            id: Uuid::new_v4(),
            title: title.to_string(),
            author: author.to_string(),
            year,
            publisher: publisher.to_string(),
            status: BookStatus::Available,
            created_at: self.clock.now(),
        };
        let saved = self.store.save(book).await?;

        info!(title, author, year, publisher, "book added successfully");
        Ok(saved)
    }

    /// Case-insensitive exact title search.
    ///
    /// # Errors
    /// Propagates store failures.
    pub async fn find_by_title(&self, title: &str) -> AppResult<Vec<Book>> {
        debug!(title, "searching for books by title");
        let found = self.store.find_by_title(title).await?;
        if found.is_empty() {
            debug!(title, "no books found with the given title");
        }
        Ok(found)
    }

    /// # Errors
    /// Propagates store failures.
    pub async fn list_available(&self) -> AppResult<Vec<Book>> {
        debug!("listing available books");
        self.store.find_available().await
    }

    /// # Errors
    /// Propagates store failures.
    pub async fn list_all(&self) -> AppResult<Vec<Book>> {
        debug!("listing all books");
        self.store.find_all().await
    }

    /// # Errors
    /// Propagates store failures.
    pub async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Book>> {
        self.store.find_by_id(id).await
    }

    /// Whether a same-edition entry exists in the catalog, regardless of its
    /// current status.
    ///
    /// # Errors
    /// Propagates store failures.
    pub async fn exists(&self, book: &Book) -> AppResult<bool> {
        let found = self.store.find_by_title(&book.title).await?;
        Ok(found.iter().any(|b| b.same_edition(book)))
    }

    /// Whether a same-edition entry exists and is currently `Available`.
    /// An unknown book is reported as unavailable, never as an error.
    ///
    /// # Errors
    /// Propagates store failures.
    pub async fn is_available(&self, book: &Book) -> AppResult<bool> {
        let matching: Vec<Book> = self
            .store
            .find_by_title(&book.title)
            .await?
            .into_iter()
            .filter(|b| b.same_edition(book))
            .collect();

        if matching.is_empty() {
            warn!(title = %book.title, "book not found in catalog");
            return Ok(false);
        }

        Ok(matching.iter().any(Book::is_available))
    }

    /// Flip the availability flag. Invoked only by the lending workflow,
    /// inside its per-book critical section; the flag is a cache of the
    /// ledger's active-loan state.
    ///
    /// # Errors
    /// Propagates store failures.
    pub async fn set_status(&self, book_id: Uuid, status: BookStatus) -> AppResult<bool> {
        debug!(%book_id, ?status, "updating book status");
        self.store.update_status(book_id, status).await
    }
}
