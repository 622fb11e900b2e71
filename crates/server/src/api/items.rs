use std::{convert::Infallible, sync::Arc};

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{
        sse::{Event, KeepAlive},
        Html, IntoResponse, Redirect, Response, Sse,
    },
    Form,
};
use futures::{Stream, StreamExt};
use shared::protocol::ItemForm;
use tracing::{debug, info};

use super::{internal_error, ApiFailure};
use crate::{app_state::AppState, views};

pub(crate) const ITEM_CREATED_EVENT: &str = "item-created";

pub(crate) async fn index(State(state): State<Arc<AppState>>) -> Result<Html<String>, ApiFailure> {
    let items = state.storage.list_items().await.map_err(internal_error)?;
    Ok(Html(views::items_page(&items, &ItemForm::default(), &[])))
}

pub(crate) async fn create_item(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Form(form): Form<ItemForm>,
) -> Result<Response, ApiFailure> {
    let htmx = is_htmx(&headers);

    let new_item = match form.validate() {
        Ok(new_item) => new_item,
        Err(errors) => {
            debug!(errors = errors.len(), htmx, "item rejected");
            let html = if htmx {
                views::item_form(&form, &errors)
            } else {
                let items = state.storage.list_items().await.map_err(internal_error)?;
                views::items_page(&items, &form, &errors)
            };
            return Ok((StatusCode::UNPROCESSABLE_ENTITY, Html(html)).into_response());
        }
    };

    let item = state
        .storage
        .insert_item(&new_item.name, new_item.description.as_deref())
        .await
        .map_err(internal_error)?;
    let delivered = state.live.broadcast(views::item_fragment(&item));
    info!(item_id = %item.id, delivered, "item created");

    if htmx {
        Ok(Html(views::item_form(&ItemForm::default(), &[])).into_response())
    } else {
        Ok(Redirect::to("/").into_response())
    }
}

pub(crate) async fn item_stream(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let subscription = state.live.subscribe();
    debug!(subscriber = ?subscription.id(), "item stream opened");
    let events = subscription
        .map(|fragment| Ok(Event::default().event(ITEM_CREATED_EVENT).data(fragment.as_ref())));
    Sse::new(events).keep_alive(KeepAlive::default())
}

pub(crate) fn is_htmx(headers: &HeaderMap) -> bool {
    headers
        .get("HX-Request")
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.eq_ignore_ascii_case("true"))
}

#[cfg(test)]
#[path = "tests/items_tests.rs"]
mod tests;
