//! Five-step order wizard over a session-scoped draft.
//!
//! The wizard owns the step state machine: structural validation, catalog
//! reference resolution, gating, and the single hand-off to persistence on
//! confirmation. Session storage, the catalog and order persistence are
//! collaborators behind the traits below.

use std::str::FromStr;

use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;
use shared::domain::{CarModel, Make, MakeId, ModelId, Order, OrderDetails, OrderId, SessionId};
use tracing::{debug, error, info};

pub mod draft;
pub mod error;
pub mod locks;
pub mod steps;

pub use draft::{DraftUpdate, OrderDraft, ResolvedProductSelection, Step};
pub use error::{CommitError, SessionError, WizardError};
pub use locks::SessionLocks;
pub use steps::{FieldError, FieldErrorKind, StepForm, ValidatedStep};

/// One draft slot per session, plus the id of the order the session confirmed last.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn load_draft(&self, session: &SessionId) -> Result<Option<OrderDraft>, SessionError>;
    async fn save_draft(&self, session: &SessionId, draft: &OrderDraft) -> Result<(), SessionError>;
    async fn last_confirmed_order(&self, session: &SessionId)
        -> Result<Option<OrderId>, SessionError>;
}

#[async_trait]
pub trait CatalogLookup: Send + Sync {
    async fn list_makes(&self) -> Result<Vec<Make>>;
    async fn find_make(&self, make_id: MakeId) -> Result<Option<Make>>;
    async fn find_model(&self, model_id: ModelId) -> Result<Option<CarModel>>;
    async fn list_models_for_make(&self, make_id: MakeId) -> Result<Vec<CarModel>>;
}

#[async_trait]
pub trait OrderPersistence: Send + Sync {
    /// Stores the order, removes the session's draft and records the new order
    /// as the session's last confirmed one. All or nothing.
    async fn commit_order(
        &self,
        session: &SessionId,
        details: &OrderDetails,
    ) -> Result<OrderId, CommitError>;
    async fn load_order(&self, order_id: OrderId) -> Result<Option<Order>>;
}

/// Where a gating failure sends the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GatingPolicy {
    /// Always back to step 1, whichever step is missing.
    #[default]
    RestartWizard,
    FirstIncomplete,
}

impl GatingPolicy {
    pub fn redirect_target(self, first_incomplete: Step) -> Step {
        match self {
            GatingPolicy::RestartWizard => Step::ProductSelection,
            GatingPolicy::FirstIncomplete => first_incomplete,
        }
    }
}

impl FromStr for GatingPolicy {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "step1" | "restart" | "restart_wizard" => Ok(GatingPolicy::RestartWizard),
            "first_incomplete" => Ok(GatingPolicy::FirstIncomplete),
            other => Err(format!("unknown gating policy '{other}'")),
        }
    }
}

/// Everything a step view needs to render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepPage {
    pub step: Step,
    /// Form values to display. `None` on the confirmation step.
    pub form: Option<StepForm>,
    pub errors: Vec<FieldError>,
    pub draft: OrderDraft,
    /// Step 1 only: the make dropdown.
    pub makes: Vec<Make>,
    /// Step 1 only: models of the currently selected make.
    pub models: Vec<CarModel>,
}

impl StepPage {
    pub fn error_for(&self, field: &str) -> Option<&FieldError> {
        self.errors.iter().find(|error| error.field == field)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepView {
    Render(StepPage),
    Redirect(Step),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Advance(Step),
    Invalid(StepPage),
    Redirect(Step),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmOutcome {
    Confirmed(OrderId),
    /// No draft in the session: a duplicate submit after a successful confirm.
    AlreadyConfirmed { last_order: Option<OrderId> },
    Redirect(Step),
}

pub struct OrderWizard<S, C, P> {
    sessions: S,
    catalog: C,
    orders: P,
    locks: SessionLocks,
    gating: GatingPolicy,
}

impl<S, C, P> OrderWizard<S, C, P>
where
    S: SessionStore,
    C: CatalogLookup,
    P: OrderPersistence,
{
    pub fn new(sessions: S, catalog: C, orders: P) -> Self {
        Self {
            sessions,
            catalog,
            orders,
            locks: SessionLocks::new(),
            gating: GatingPolicy::default(),
        }
    }

    pub fn with_gating_policy(mut self, gating: GatingPolicy) -> Self {
        self.gating = gating;
        self
    }

    pub fn gating_policy(&self) -> GatingPolicy {
        self.gating
    }

    /// Read-only view of `step`. Never mutates the session.
    pub async fn get_step(&self, step: Step, session: &SessionId) -> Result<StepView, WizardError> {
        let draft = self.current_draft(session).await?;
        if let Err(incomplete) = draft.gate(step) {
            let target = self.gating.redirect_target(incomplete);
            debug!(%session, step = step.number(), target = target.number(), "step gated");
            return Ok(StepView::Redirect(target));
        }
        let form = draft.form_for(step);
        let page = self.page(step, form, Vec::new(), draft).await?;
        Ok(StepView::Render(page))
    }

    pub async fn submit_step(
        &self,
        session: &SessionId,
        form: StepForm,
    ) -> Result<SubmitOutcome, WizardError> {
        let step = form.step();
        let _guard = self.locks.acquire(session).await;
        let mut draft = self.current_draft(session).await?;

        let validated = match steps::validate(&form) {
            Ok(validated) => validated,
            Err(errors) => {
                debug!(%session, step = step.number(), errors = errors.len(), "step rejected");
                let page = self.page(step, Some(form), errors, draft).await?;
                return Ok(SubmitOutcome::Invalid(page));
            }
        };

        let update = match self.resolve(validated).await? {
            Ok(update) => update,
            Err(errors) => {
                debug!(%session, step = step.number(), "step references did not resolve");
                let page = self.page(step, Some(form), errors, draft).await?;
                return Ok(SubmitOutcome::Invalid(page));
            }
        };

        if let Err(incomplete) = draft.gate(step) {
            let target = self.gating.redirect_target(incomplete);
            debug!(%session, step = step.number(), target = target.number(), "submit gated");
            return Ok(SubmitOutcome::Redirect(target));
        }

        draft.apply(update);
        self.sessions.save_draft(session, &draft).await?;

        let next = step.next().unwrap_or(Step::Confirmation);
        debug!(%session, step = step.number(), next = next.number(), "step accepted");
        Ok(SubmitOutcome::Advance(next))
    }

    pub async fn confirm(&self, session: &SessionId) -> Result<ConfirmOutcome, WizardError> {
        let _guard = self.locks.acquire(session).await;

        let Some(draft) = self.sessions.load_draft(session).await? else {
            let last_order = self.sessions.last_confirmed_order(session).await?;
            info!(%session, ?last_order, "confirm without draft treated as duplicate submit");
            return Ok(ConfirmOutcome::AlreadyConfirmed { last_order });
        };

        let details = match draft.into_details() {
            Ok(details) => details,
            Err(incomplete) => {
                let target = self.gating.redirect_target(incomplete);
                debug!(%session, target = target.number(), "confirm gated");
                return Ok(ConfirmOutcome::Redirect(target));
            }
        };

        let order_id = match self.orders.commit_order(session, &details).await {
            Ok(order_id) => order_id,
            Err(err) => {
                error!(%session, error = %err, "failed to commit confirmed order");
                return Err(err.into());
            }
        };

        info!(%session, %order_id, "order confirmed");
        Ok(ConfirmOutcome::Confirmed(order_id))
    }

    pub async fn catalog_models(&self, make_id: MakeId) -> Result<Vec<CarModel>, WizardError> {
        self.catalog
            .list_models_for_make(make_id)
            .await
            .map_err(WizardError::Catalog)
    }

    pub async fn makes(&self) -> Result<Vec<Make>, WizardError> {
        self.catalog.list_makes().await.map_err(WizardError::Catalog)
    }

    pub async fn receipt(&self, order_id: OrderId) -> Result<Order, WizardError> {
        self.orders
            .load_order(order_id)
            .await
            .map_err(WizardError::Persistence)?
            .ok_or(WizardError::OrderNotFound(order_id))
    }

    async fn current_draft(&self, session: &SessionId) -> Result<OrderDraft, WizardError> {
        Ok(self
            .sessions
            .load_draft(session)
            .await?
            .unwrap_or_default())
    }

    /// Turns structurally valid step data into a draft update. The inner error
    /// lists unresolved catalog references.
    async fn resolve(
        &self,
        validated: ValidatedStep,
    ) -> Result<Result<DraftUpdate, Vec<FieldError>>, WizardError> {
        let update = match validated {
            ValidatedStep::ProductSelection(selection) => {
                let make = self
                    .catalog
                    .find_make(selection.make_id)
                    .await
                    .map_err(WizardError::Catalog)?;
                let model = self
                    .catalog
                    .find_model(selection.model_id)
                    .await
                    .map_err(WizardError::Catalog)?;

                let mut errors = Vec::new();
                if make.is_none() {
                    errors.push(FieldError::invalid_reference("makeId", "Invalid make ID"));
                }
                let model = model.filter(|model| model.make_id == selection.make_id);
                if model.is_none() {
                    errors.push(FieldError::invalid_reference("modelId", "Invalid model ID"));
                }

                match (make, model) {
                    (Some(make), Some(model)) => {
                        DraftUpdate::ProductSelection(ResolvedProductSelection {
                            product_category: selection.product_category,
                            make,
                            model,
                            quantity: selection.quantity,
                        })
                    }
                    _ => return Ok(Err(errors)),
                }
            }
            ValidatedStep::Customization(customization) => {
                DraftUpdate::Customization(customization)
            }
            ValidatedStep::DeliveryInformation(delivery) => {
                DraftUpdate::DeliveryInformation(delivery)
            }
            ValidatedStep::PaymentInformation(payment) => DraftUpdate::PaymentInformation(payment),
        };
        Ok(Ok(update))
    }

    async fn page(
        &self,
        step: Step,
        form: Option<StepForm>,
        errors: Vec<FieldError>,
        draft: OrderDraft,
    ) -> Result<StepPage, WizardError> {
        let (makes, models) = if step == Step::ProductSelection {
            let makes = self.makes().await?;
            let selected_make = match &form {
                Some(StepForm::ProductSelection(form)) => form
                    .make_id
                    .as_deref()
                    .and_then(|raw| raw.trim().parse::<i64>().ok())
                    .map(MakeId),
                _ => None,
            };
            let models = match selected_make {
                Some(make_id) => self.catalog_models(make_id).await?,
                None => Vec::new(),
            };
            (makes, models)
        } else {
            (Vec::new(), Vec::new())
        };

        Ok(StepPage {
            step,
            form,
            errors,
            draft,
            makes,
            models,
        })
    }
}

#[cfg(test)]
#[path = "tests/mod_tests.rs"]
mod tests;
