use serde::{Deserialize, Serialize};
use shared::{
    domain::{CarModel, Make, OrderDetails},
    protocol::{
        CustomizationForm, DeliveryInformationForm, PaymentInformationForm, ProductSelectionForm,
    },
};

use crate::steps::{Customization, DeliveryInformation, PaymentInformation, StepForm};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    ProductSelection,
    Customization,
    DeliveryInformation,
    PaymentInformation,
    Confirmation,
}

impl Step {
    pub const ALL: [Step; 5] = [
        Step::ProductSelection,
        Step::Customization,
        Step::DeliveryInformation,
        Step::PaymentInformation,
        Step::Confirmation,
    ];

    pub fn number(self) -> u8 {
        match self {
            Step::ProductSelection => 1,
            Step::Customization => 2,
            Step::DeliveryInformation => 3,
            Step::PaymentInformation => 4,
            Step::Confirmation => 5,
        }
    }

    pub fn from_number(number: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|step| step.number() == number)
    }

    pub fn next(self) -> Option<Self> {
        Self::from_number(self.number() + 1)
    }

    pub fn title(self) -> &'static str {
        match self {
            Step::ProductSelection => "Product Selection",
            Step::Customization => "Customization",
            Step::DeliveryInformation => "Delivery Information",
            Step::PaymentInformation => "Payment",
            Step::Confirmation => "Confirmation",
        }
    }

    pub fn path(self) -> String {
        format!("/order/step{}", self.number())
    }
}

/// Step 1 data after its catalog references were resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedProductSelection {
    pub product_category: String,
    pub make: Make,
    pub model: CarModel,
    pub quantity: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DraftUpdate {
    ProductSelection(ResolvedProductSelection),
    Customization(Customization),
    DeliveryInformation(DeliveryInformation),
    PaymentInformation(PaymentInformation),
}

impl DraftUpdate {
    pub fn step(&self) -> Step {
        match self {
            DraftUpdate::ProductSelection(_) => Step::ProductSelection,
            DraftUpdate::Customization(_) => Step::Customization,
            DraftUpdate::DeliveryInformation(_) => Step::DeliveryInformation,
            DraftUpdate::PaymentInformation(_) => Step::PaymentInformation,
        }
    }
}

/// The in-progress order kept in a session slot. Confirmation turns it into
/// [`OrderDetails`]; the draft itself carries no status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderDraft {
    pub product_category: Option<String>,
    pub make: Option<Make>,
    pub model: Option<CarModel>,
    pub quantity: Option<u32>,
    pub color: Option<String>,
    pub interior: Option<String>,
    pub tire_type: Option<String>,
    pub delivery_address: Option<String>,
    pub contact_name: Option<String>,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
    pub payment_method: Option<String>,
    pub billing_address: Option<String>,
}

impl OrderDraft {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrites exactly the fields owned by the update's step.
    pub fn apply(&mut self, update: DraftUpdate) {
        match update {
            DraftUpdate::ProductSelection(selection) => {
                self.product_category = Some(selection.product_category);
                self.make = Some(selection.make);
                self.model = Some(selection.model);
                self.quantity = Some(selection.quantity);
            }
            DraftUpdate::Customization(customization) => {
                self.color = Some(customization.color);
                self.interior = Some(customization.interior);
                self.tire_type = Some(customization.tire_type);
            }
            DraftUpdate::DeliveryInformation(delivery) => {
                self.delivery_address = Some(delivery.delivery_address);
                self.contact_name = Some(delivery.contact_name);
                self.contact_email = Some(delivery.contact_email);
                self.contact_phone = Some(delivery.contact_phone);
            }
            DraftUpdate::PaymentInformation(payment) => {
                self.payment_method = Some(payment.payment_method);
                self.billing_address = Some(payment.billing_address);
            }
        }
    }

    fn own_fields_set(&self, step: Step) -> bool {
        match step {
            Step::ProductSelection => {
                self.product_category.is_some()
                    && self.make.is_some()
                    && self.model.is_some()
                    && self.quantity.is_some()
            }
            Step::Customization => {
                self.color.is_some() && self.interior.is_some() && self.tire_type.is_some()
            }
            Step::DeliveryInformation => {
                self.delivery_address.is_some()
                    && self.contact_name.is_some()
                    && self.contact_email.is_some()
                    && self.contact_phone.is_some()
            }
            Step::PaymentInformation => {
                self.payment_method.is_some() && self.billing_address.is_some()
            }
            Step::Confirmation => true,
        }
    }

    /// A step is complete when it and every step before it has all fields set.
    pub fn is_step_complete(&self, step: Step) -> bool {
        Step::ALL
            .into_iter()
            .take_while(|candidate| *candidate <= step)
            .all(|candidate| self.own_fields_set(candidate))
    }

    pub fn first_incomplete_step(&self) -> Option<Step> {
        Step::ALL
            .into_iter()
            .find(|step| !self.own_fields_set(*step))
    }

    /// Checks that every step before `step` is complete. The error carries the
    /// first incomplete step.
    pub fn gate(&self, step: Step) -> Result<(), Step> {
        match self.first_incomplete_step() {
            Some(incomplete) if incomplete < step => Err(incomplete),
            _ => Ok(()),
        }
    }

    /// Consumes a complete draft. Returns the first incomplete step otherwise.
    pub fn into_details(self) -> Result<OrderDetails, Step> {
        if let Some(incomplete) = self.first_incomplete_step() {
            return Err(incomplete);
        }
        match self {
            OrderDraft {
                product_category: Some(product_category),
                make: Some(make),
                model: Some(model),
                quantity: Some(quantity),
                color: Some(color),
                interior: Some(interior),
                tire_type: Some(tire_type),
                delivery_address: Some(delivery_address),
                contact_name: Some(contact_name),
                contact_email: Some(contact_email),
                contact_phone: Some(contact_phone),
                payment_method: Some(payment_method),
                billing_address: Some(billing_address),
            } => Ok(OrderDetails {
                product_category,
                make,
                model,
                quantity,
                color,
                interior,
                tire_type,
                delivery_address,
                contact_name,
                contact_email,
                contact_phone,
                payment_method,
                billing_address,
            }),
            _ => Err(Step::ProductSelection),
        }
    }

    /// The form for `step` pre-filled from the draft, `None` for the confirmation step.
    pub fn form_for(&self, step: Step) -> Option<StepForm> {
        let form = match step {
            Step::ProductSelection => StepForm::ProductSelection(ProductSelectionForm {
                product_category: self.product_category.clone(),
                make_id: self.make.as_ref().map(|make| make.id.to_string()),
                model_id: self.model.as_ref().map(|model| model.id.to_string()),
                quantity: self.quantity.map(|quantity| quantity.to_string()),
            }),
            Step::Customization => StepForm::Customization(CustomizationForm {
                color: self.color.clone(),
                interior: self.interior.clone(),
                tire_type: self.tire_type.clone(),
            }),
            Step::DeliveryInformation => StepForm::DeliveryInformation(DeliveryInformationForm {
                delivery_address: self.delivery_address.clone(),
                contact_name: self.contact_name.clone(),
                contact_email: self.contact_email.clone(),
                contact_phone: self.contact_phone.clone(),
            }),
            Step::PaymentInformation => StepForm::PaymentInformation(PaymentInformationForm {
                payment_method: self.payment_method.clone(),
                billing_address: self.billing_address.clone(),
            }),
            Step::Confirmation => return None,
        };
        Some(form)
    }
}

#[cfg(test)]
#[path = "tests/draft_tests.rs"]
mod tests;
