use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use sqlx::{Pool, Postgres, Row};
use std::time::Duration;
use utoipa::ToSchema;

use nd_core::metrics;

use crate::{ApiError, ApiResult, AppState, SERVICE_NAME};

const COMMIT_ATTEMPTS: u32 = 3;
const COMMIT_BACKOFF: Duration = Duration::from_millis(200);

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct TrendingPost {
    pub id: String,
    pub title: String,
    pub category: String,
    pub trending_rank: Option<i32>,
}

/// Working copy of the trending partition. Posts are either ranked (position
/// = rank - 1) or untracked (rank None); the two lists never share an id.
/// Nothing is persisted until `commit`.
#[derive(Debug, Default)]
pub struct TrendingBoard {
    untracked: Vec<TrendingPost>,
    ranked: Vec<TrendingPost>,
}

impl TrendingBoard {
    /// Partitions the full post set by rank presence. Stored ranks may have
    /// gaps or duplicates; the ranked side is sorted by stored rank and then
    /// renumbered so the board always starts from a contiguous 1..K.
    pub fn load(items: Vec<TrendingPost>) -> Self {
        let mut untracked = Vec::new();
        let mut ranked = Vec::new();
        for item in items {
            if item.trending_rank.is_some() {
                ranked.push(item);
            } else {
                untracked.push(item);
            }
        }
        ranked.sort_by_key(|item| item.trending_rank);

        let mut board = Self { untracked, ranked };
        board.renumber();
        board
    }

    pub fn ranked(&self) -> &[TrendingPost] {
        &self.ranked
    }

    pub fn untracked(&self) -> &[TrendingPost] {
        &self.untracked
    }

    /// Promotes an untracked post to the end of the ranking.
    pub fn add_to_ranked(&mut self, id: &str) -> ApiResult<()> {
        let Some(index) = self.untracked.iter().position(|item| item.id == id) else {
            return Err(ApiError::new(
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                format!("post {id} is not in the available list"),
            ));
        };
        let mut item = self.untracked.remove(index);
        item.trending_rank = Some(self.ranked.len() as i32 + 1);
        self.ranked.push(item);
        Ok(())
    }

    /// Demotes a ranked post back to the untracked pool and closes the gap.
    pub fn remove_from_ranked(&mut self, id: &str) -> ApiResult<()> {
        let Some(index) = self.ranked.iter().position(|item| item.id == id) else {
            return Err(ApiError::new(
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                format!("post {id} is not in the trending list"),
            ));
        };
        let mut item = self.ranked.remove(index);
        item.trending_rank = None;
        self.untracked.push(item);
        self.renumber();
        Ok(())
    }

    /// Swaps with the previous entry; no-op at the top.
    pub fn move_up(&mut self, index: usize) {
        if index == 0 || index >= self.ranked.len() {
            return;
        }
        self.ranked.swap(index - 1, index);
        self.renumber();
    }

    /// Swaps with the next entry; no-op at the bottom.
    pub fn move_down(&mut self, index: usize) {
        if index + 1 >= self.ranked.len() {
            return;
        }
        self.ranked.swap(index, index + 1);
        self.renumber();
    }

    fn renumber(&mut self) {
        for (position, item) in self.ranked.iter_mut().enumerate() {
            item.trending_rank = Some(position as i32 + 1);
        }
    }

    /// Persists the ranking in one transaction: ranks leaving the list are
    /// cleared and the new ranks are written in a single batch keyed by id,
    /// so no reader ever observes an empty or partially written ranking.
    /// Transient store errors are retried a bounded number of times.
    pub async fn commit(&self, pool: &Pool<Postgres>) -> Result<(), sqlx::Error> {
        let ids: Vec<String> = self.ranked.iter().map(|item| item.id.clone()).collect();
        let ranks: Vec<i32> = (1..=self.ranked.len() as i32).collect();

        let mut delay = COMMIT_BACKOFF;
        let mut attempt = 1;
        loop {
            match try_commit(pool, &ids, &ranks).await {
                Ok(()) => return Ok(()),
                Err(err) if attempt < COMMIT_ATTEMPTS && is_transient(&err) => {
                    tracing::warn!(error = %err, attempt, "trending commit failed, retrying");
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

async fn try_commit(
    pool: &Pool<Postgres>,
    ids: &[String],
    ranks: &[i32],
) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;

    sqlx::query(
        "UPDATE posts SET trending_rank = NULL          WHERE trending_rank IS NOT NULL AND NOT (id = ANY($1))",
    )
    .bind(ids)
    .execute(&mut *tx)
    .await?;

    if !ids.is_empty() {
        sqlx::query(
            "UPDATE posts SET trending_rank = ranking.rank              FROM (SELECT UNNEST($1::text[]) AS id, UNNEST($2::int4[]) AS rank) AS ranking              WHERE posts.id = ranking.id",
        )
        .bind(ids)
        .bind(ranks)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await
}

fn is_transient(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut)
}

#[derive(Serialize, ToSchema)]
pub struct TrendingSnapshot {
    pub trending: Vec<TrendingPost>,
    pub available: Vec<TrendingPost>,
}

#[derive(Deserialize, ToSchema)]
pub struct SaveTrendingRequest {
    pub ranked_ids: Vec<String>,
}

pub async fn get_trending(State(state): State<AppState>) -> ApiResult<Json<TrendingSnapshot>> {
    let board = load_board(&state.pool).await?;
    Ok(Json(TrendingSnapshot {
        trending: board.ranked().to_vec(),
        available: board.untracked().to_vec(),
    }))
}

/// Replaces the whole ranking with the submitted order and persists it.
pub async fn save_trending(
    State(state): State<AppState>,
    Json(payload): Json<SaveTrendingRequest>,
) -> ApiResult<Json<TrendingSnapshot>> {
    let loaded = load_board(&state.pool).await?;

    // Rebuild from scratch: everything starts untracked, then the submitted
    // ids are promoted in order, which yields exactly the ranking 1..N.
    let mut board = TrendingBoard::load(
        loaded
            .untracked()
            .iter()
            .chain(loaded.ranked().iter())
            .cloned()
            .map(|mut item| {
                item.trending_rank = None;
                item
            })
            .collect(),
    );
    for id in &payload.ranked_ids {
        board.add_to_ranked(id)?;
    }

    match board.commit(&state.pool).await {
        Ok(()) => metrics::inc_trending_commit(SERVICE_NAME, metrics::COMMIT_RESULT_SUCCESS),
        Err(err) => {
            metrics::inc_trending_commit(SERVICE_NAME, metrics::COMMIT_RESULT_ERROR);
            return Err(err.into());
        }
    }

    Ok(Json(TrendingSnapshot {
        trending: board.ranked().to_vec(),
        available: board.untracked().to_vec(),
    }))
}

async fn load_board(pool: &Pool<Postgres>) -> ApiResult<TrendingBoard> {
    let rows = sqlx::query(
        "SELECT id, title, category, trending_rank FROM posts ORDER BY created_at DESC",
    )
    .fetch_all(pool)
    .await?;

    let mut items = Vec::with_capacity(rows.len());
    for row in rows {
        items.push(TrendingPost {
            id: row.try_get("id")?,
            title: row.try_get("title")?,
            category: row.try_get("category")?,
            trending_rank: row.try_get("trending_rank")?,
        });
    }

    Ok(TrendingBoard::load(items))
}
