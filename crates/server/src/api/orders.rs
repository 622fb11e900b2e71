use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    Form, Json,
};
use serde::Deserialize;
use shared::{
    domain::{CarModel, MakeId, OrderId},
    protocol::{
        CustomizationForm, DeliveryInformationForm, PaymentInformationForm, ProductSelectionForm,
    },
};
use wizard::{ConfirmOutcome, Step, StepForm, StepView, SubmitOutcome};

use super::{not_found, wizard_failure, ApiFailure};
use crate::{app_state::AppState, session::resolve_session, views};

#[derive(Debug, Deserialize)]
pub(crate) struct SuccessQuery {
    #[serde(rename = "orderId")]
    order_id: i64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ModelsQuery {
    #[serde(rename = "makeId")]
    make_id: i64,
}

pub(crate) async fn start() -> Redirect {
    Redirect::to(&Step::ProductSelection.path())
}

pub(crate) async fn show_step(
    State(state): State<Arc<AppState>>,
    Path(segment): Path<String>,
    headers: HeaderMap,
) -> Result<Response, ApiFailure> {
    let step = parse_step_segment(&segment)?;
    let session = resolve_session(&state, &headers).await?;

    let response = match state
        .wizard
        .get_step(step, &session.id)
        .await
        .map_err(wizard_failure)?
    {
        StepView::Render(page) => Html(views::step_page(&page)).into_response(),
        StepView::Redirect(target) => Redirect::to(&target.path()).into_response(),
    };
    Ok(session.attach(&state.session_cookie, response))
}

pub(crate) async fn submit_step(
    State(state): State<Arc<AppState>>,
    Path(segment): Path<String>,
    headers: HeaderMap,
    form: Option<Form<HashMap<String, String>>>,
) -> Result<Response, ApiFailure> {
    let step = parse_step_segment(&segment)?;
    let session = resolve_session(&state, &headers).await?;
    let fields = form.map(|Form(fields)| fields).unwrap_or_default();

    let response = match step_form(step, fields) {
        Some(form) => {
            match state
                .wizard
                .submit_step(&session.id, form)
                .await
                .map_err(wizard_failure)?
            {
                SubmitOutcome::Advance(next) | SubmitOutcome::Redirect(next) => {
                    Redirect::to(&next.path()).into_response()
                }
                SubmitOutcome::Invalid(page) => {
                    (StatusCode::UNPROCESSABLE_ENTITY, Html(views::step_page(&page)))
                        .into_response()
                }
            }
        }
        None => match state
            .wizard
            .confirm(&session.id)
            .await
            .map_err(wizard_failure)?
        {
            ConfirmOutcome::Confirmed(order_id)
            | ConfirmOutcome::AlreadyConfirmed {
                last_order: Some(order_id),
            } => Redirect::to(&success_path(order_id)).into_response(),
            ConfirmOutcome::AlreadyConfirmed { last_order: None } => {
                Redirect::to(&Step::ProductSelection.path()).into_response()
            }
            ConfirmOutcome::Redirect(target) => Redirect::to(&target.path()).into_response(),
        },
    };
    Ok(session.attach(&state.session_cookie, response))
}

pub(crate) async fn success(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SuccessQuery>,
) -> Result<Html<String>, ApiFailure> {
    let order = state
        .wizard
        .receipt(OrderId(query.order_id))
        .await
        .map_err(wizard_failure)?;
    Ok(Html(views::receipt_page(&order)))
}

pub(crate) async fn models_for_make(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ModelsQuery>,
) -> Result<Json<Vec<CarModel>>, ApiFailure> {
    let models = state
        .wizard
        .catalog_models(MakeId(query.make_id))
        .await
        .map_err(wizard_failure)?;
    Ok(Json(models))
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ModelOptionsQuery {
    #[serde(rename = "makeId", default)]
    make_id: Option<String>,
}

/// HTML variant of [`models_for_make`] for the step 1 make dropdown. A blank
/// or unparseable make yields only the placeholder option.
pub(crate) async fn model_options_for_make(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ModelOptionsQuery>,
) -> Result<Html<String>, ApiFailure> {
    let make_id = query
        .make_id
        .as_deref()
        .and_then(|raw| raw.trim().parse::<i64>().ok())
        .map(MakeId);
    let models = match make_id {
        Some(make_id) => state
            .wizard
            .catalog_models(make_id)
            .await
            .map_err(wizard_failure)?,
        None => Vec::new(),
    };
    Ok(Html(views::model_option_list(&models)))
}

pub(crate) fn success_path(order_id: OrderId) -> String {
    format!("/order/success?orderId={order_id}")
}

fn parse_step_segment(segment: &str) -> Result<Step, ApiFailure> {
    segment
        .strip_prefix("step")
        .and_then(|number| number.parse::<u8>().ok())
        .and_then(Step::from_number)
        .ok_or_else(|| not_found(format!("unknown wizard page '{segment}'")))
}

/// Raw form for `step`; `None` for the confirmation step, which carries no fields.
fn step_form(step: Step, mut fields: HashMap<String, String>) -> Option<StepForm> {
    let mut take = |name: &str| fields.remove(name);
    let form = match step {
        Step::ProductSelection => StepForm::ProductSelection(ProductSelectionForm {
            product_category: take("productCategory"),
            make_id: take("makeId"),
            model_id: take("modelId"),
            quantity: take("quantity"),
        }),
        Step::Customization => StepForm::Customization(CustomizationForm {
            color: take("color"),
            interior: take("interior"),
            tire_type: take("tireType"),
        }),
        Step::DeliveryInformation => StepForm::DeliveryInformation(DeliveryInformationForm {
            delivery_address: take("deliveryAddress"),
            contact_name: take("contactName"),
            contact_email: take("contactEmail"),
            contact_phone: take("contactPhone"),
        }),
        Step::PaymentInformation => StepForm::PaymentInformation(PaymentInformationForm {
            payment_method: take("paymentMethod"),
            billing_address: take("billingAddress"),
        }),
        Step::Confirmation => return None,
    };
    Some(form)
}
