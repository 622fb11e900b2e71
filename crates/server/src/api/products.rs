use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    response::Html,
};
use shared::{
    domain::{ProductId, ProductPage, ProductSearch},
    protocol::ProductQuery,
};
use tracing::info;

use super::{internal_error, ApiFailure};
use crate::{app_state::AppState, views};

async fn results(
    state: &AppState,
    query: &ProductQuery,
) -> Result<(ProductSearch, ProductPage), ApiFailure> {
    let search = query.normalize();
    let page = state
        .storage
        .search_products(&search)
        .await
        .map_err(internal_error)?;
    Ok((search, page))
}

pub(crate) async fn index(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ProductQuery>,
) -> Result<Html<String>, ApiFailure> {
    let (search, page) = results(&state, &query).await?;
    let categories = state
        .storage
        .list_product_categories()
        .await
        .map_err(internal_error)?;
    Ok(Html(views::products_page(&page, &search, &categories)))
}

pub(crate) async fn table(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ProductQuery>,
) -> Result<Html<String>, ApiFailure> {
    let (search, page) = results(&state, &query).await?;
    Ok(Html(views::product_results(&page, &search)))
}

/// Deletes, then re-renders the results for the same query.
pub(crate) async fn delete(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Query(query): Query<ProductQuery>,
) -> Result<Html<String>, ApiFailure> {
    let removed = state
        .storage
        .delete_product(ProductId(id))
        .await
        .map_err(internal_error)?;
    info!(product_id = id, removed, "product delete");
    let (search, page) = results(&state, &query).await?;
    Ok(Html(views::product_results(&page, &search)))
}
