use axum::extract::{Query, State};
use axum::Json;
use chrono::{NaiveDate, Utc};
use diesel::pg::Pg;
use diesel::prelude::*;
use serde::Deserialize;
use std::sync::Arc;

use troth_shared::clients::db::get_conn;
use troth_shared::errors::AppResult;
use troth_shared::types::account::AccountStatus;
use troth_shared::types::auth::AuthUser;
use troth_shared::types::pagination::{Paginated, PaginationParams};
use troth_shared::types::ApiResponse;
use uuid::Uuid;

use crate::lifecycle::birth_date_bounds;
use crate::models::{Profile, ProfileCard};
use crate::schema::profiles;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_per_page")]
    pub per_page: u64,
    pub gender: Option<String>,
    pub religion: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub min_age: Option<u32>,
    pub max_age: Option<u32>,
    /// Matches display name, occupation or bio
    pub q: Option<String>,
}

fn default_page() -> u64 { 1 }
fn default_per_page() -> u64 { 20 }

fn non_empty(value: &Option<String>) -> Option<String> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
}

/// Escapes LIKE wildcards so user input only matches literally.
fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

type BirthBounds = (Option<NaiveDate>, Option<NaiveDate>);

fn filtered<'a>(params: &SearchParams, viewer: Uuid, bounds: BirthBounds) -> profiles::BoxedQuery<'a, Pg> {
    let mut query = profiles::table
        .into_boxed()
        .filter(profiles::user_id.ne(viewer))
        .filter(profiles::is_hidden.eq(false))
        .filter(profiles::account_status.ne(AccountStatus::Banned.as_str()));

    if let Some(gender) = non_empty(&params.gender) {
        query = query.filter(profiles::gender.eq(gender.to_lowercase()));
    }
    if let Some(religion) = non_empty(&params.religion) {
        query = query.filter(profiles::religion.ilike(escape_like(&religion)));
    }
    if let Some(city) = non_empty(&params.city) {
        query = query.filter(profiles::city.ilike(escape_like(&city)));
    }
    if let Some(country) = non_empty(&params.country) {
        query = query.filter(profiles::country.eq(country.to_uppercase()));
    }

    let (earliest, latest) = bounds;
    if let Some(earliest) = earliest {
        query = query.filter(profiles::birth_date.ge(earliest));
    }
    if let Some(latest) = latest {
        query = query.filter(profiles::birth_date.le(latest));
    }

    if let Some(q) = non_empty(&params.q) {
        let pattern = format!("%{}%", escape_like(&q));
        query = query.filter(
            profiles::display_name
                .ilike(pattern.clone())
                .or(profiles::occupation.ilike(pattern.clone()))
                .or(profiles::bio.ilike(pattern)),
        );
    }
    query
}

/// GET /search
pub async fn search_profiles(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> AppResult<Json<ApiResponse<Paginated<ProfileCard>>>> {
    let pagination = PaginationParams { page: params.page, per_page: params.per_page };
    let today = Utc::now().date_naive();
    let bounds = birth_date_bounds(today, params.min_age, params.max_age)?;
    let mut conn = get_conn(&state.db)?;

    // VERIFIED sorts before LIMITED; banned rows are filtered out
    let rows = filtered(&params, user.id, bounds)
        .order((
            profiles::account_status.desc(),
            profiles::trust_score.desc(),
            profiles::created_at.desc(),
        ))
        .offset(pagination.offset() as i64)
        .limit(pagination.limit() as i64)
        .load::<Profile>(&mut conn)?;
    let total: i64 = filtered(&params, user.id, bounds).count().get_result(&mut conn)?;

    let cards = rows.iter().map(|p| ProfileCard::from_profile(p, today)).collect();

    Ok(Json(ApiResponse::ok(Paginated::new(cards, total as u64, &pagination))))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_wildcards_are_escaped() {
        assert_eq!(escape_like("100%_sure"), "100\\%\\_sure");
        assert_eq!(escape_like("a\\b"), "a\\\\b");
        assert_eq!(escape_like("Lagos"), "Lagos");
    }
}
