use std::sync::Arc;

use crate::core::filters::unreciprocated;
use crate::models::{Actor, LikesPage};
use crate::services::{DecisionStore, StoreError};

/// Likes listings for a recipient
///
/// # Pagination
/// Likers are ordered by actor id. The cursor handed back to callers is the
/// id of the last actor on the page; the next call resumes strictly after
/// it, so no server-side cursor state is kept. A page shorter than the page
/// size ends the listing. A full page always carries a cursor, even when
/// nothing follows it, so callers may see one trailing empty page.
#[derive(Clone)]
pub struct LikesEngine {
    store: Arc<dyn DecisionStore>,
    page_size: usize,
}

impl LikesEngine {
    pub fn new(store: Arc<dyn DecisionStore>, page_size: usize) -> Self {
        Self {
            store,
            page_size: page_size.max(1),
        }
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// One page of actors who liked `recipient`
    ///
    /// `cursor` is the token from the previous page, `None` on the first call.
    /// It is passed to the store as-is; a garbage token fails there.
    pub async fn list_likers(
        &self,
        recipient: &str,
        cursor: Option<&str>,
    ) -> Result<LikesPage, StoreError> {
        let rows = match cursor {
            None => self.store.query_likes_start(recipient, self.page_size).await?,
            Some(cursor) => {
                self.store
                    .query_likes_after(recipient, cursor, self.page_size)
                    .await?
            }
        };

        let next_cursor = if rows.rows.len() == self.page_size {
            rows.watermark
        } else {
            None
        };

        tracing::debug!(
            "Page for {}: {} likers, more={}",
            recipient,
            rows.rows.len(),
            next_cursor.is_some()
        );

        Ok(LikesPage {
            likers: rows.rows,
            next_cursor,
        })
    }

    /// Actors who liked `recipient` and have not been liked back. Unpaginated.
    pub async fn list_new_likers(&self, recipient: &str) -> Result<Vec<Actor>, StoreError> {
        let received = self.store.query_likes_received(recipient).await?;
        let sent = self.store.query_likes_sent(recipient).await?;

        Ok(unreciprocated(received, &sent))
    }

    /// Number of actors currently liking `recipient`
    pub async fn count_likers(&self, recipient: &str) -> Result<u64, StoreError> {
        self.store.query_like_count(recipient).await
    }
}
