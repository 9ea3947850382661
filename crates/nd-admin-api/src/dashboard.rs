use axum::extract::State;
use axum::Json;
use serde::Serialize;
use sqlx::Row;
use utoipa::ToSchema;

use crate::{ApiResult, AppState};

#[derive(Debug, Serialize, ToSchema)]
pub struct DashboardSnapshot {
    pub collected_at: i64,
    pub posts: PostCounters,
    pub events: EventCounters,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PostCounters {
    pub total: i64,
    pub featured: i64,
    pub editor_picks: i64,
    pub trending: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct EventCounters {
    pub total: i64,
    pub upcoming: i64,
}

pub async fn get_dashboard_snapshot(
    State(state): State<AppState>,
) -> ApiResult<Json<DashboardSnapshot>> {
    let collected_at = chrono::Utc::now().timestamp();
    let posts = collect_post_counters(&state).await?;
    let events = collect_event_counters(&state).await?;

    Ok(Json(DashboardSnapshot {
        collected_at,
        posts,
        events,
    }))
}

async fn collect_post_counters(state: &AppState) -> ApiResult<PostCounters> {
    let row = sqlx::query(
        "SELECT COUNT(*) AS total,                 COUNT(*) FILTER (WHERE is_featured) AS featured,                 COUNT(*) FILTER (WHERE is_editor_pick) AS editor_picks,                 COUNT(*) FILTER (WHERE trending_rank IS NOT NULL) AS trending          FROM posts",
    )
    .fetch_one(&state.pool)
    .await?;

    Ok(PostCounters {
        total: row.try_get("total")?,
        featured: row.try_get("featured")?,
        editor_picks: row.try_get("editor_picks")?,
        trending: row.try_get("trending")?,
    })
}

async fn collect_event_counters(state: &AppState) -> ApiResult<EventCounters> {
    let row = sqlx::query(
        "SELECT COUNT(*) AS total,                 COUNT(*) FILTER (WHERE date >= NOW()) AS upcoming          FROM events",
    )
    .fetch_one(&state.pool)
    .await?;

    Ok(EventCounters {
        total: row.try_get("total")?,
        upcoming: row.try_get("upcoming")?,
    })
}
