//! Per-step form records and their structural validation.
//!
//! Validation is pure: a raw form either becomes a typed record or a list of
//! field errors. Catalog references are only parsed here; resolving them
//! against the catalog is the wizard's job.

use std::sync::LazyLock;

use regex::Regex;
pub use shared::error::{FieldError, FieldErrorKind};
use shared::{
    domain::{MakeId, ModelId},
    protocol::{
        CustomizationForm, DeliveryInformationForm, PaymentInformationForm, ProductSelectionForm,
    },
};

use crate::draft::Step;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?)*$",
    )
    .expect("email pattern compiles")
});

/// A submitted step form, one variant per editable step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepForm {
    ProductSelection(ProductSelectionForm),
    Customization(CustomizationForm),
    DeliveryInformation(DeliveryInformationForm),
    PaymentInformation(PaymentInformationForm),
}

impl StepForm {
    pub fn step(&self) -> Step {
        match self {
            StepForm::ProductSelection(_) => Step::ProductSelection,
            StepForm::Customization(_) => Step::Customization,
            StepForm::DeliveryInformation(_) => Step::DeliveryInformation,
            StepForm::PaymentInformation(_) => Step::PaymentInformation,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductSelection {
    pub product_category: String,
    pub make_id: MakeId,
    pub model_id: ModelId,
    pub quantity: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Customization {
    pub color: String,
    pub interior: String,
    pub tire_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryInformation {
    pub delivery_address: String,
    pub contact_name: String,
    pub contact_email: String,
    pub contact_phone: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentInformation {
    pub payment_method: String,
    pub billing_address: String,
}

/// Structurally valid step data. Step 1 still carries unresolved catalog ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidatedStep {
    ProductSelection(ProductSelection),
    Customization(Customization),
    DeliveryInformation(DeliveryInformation),
    PaymentInformation(PaymentInformation),
}

pub fn validate(form: &StepForm) -> Result<ValidatedStep, Vec<FieldError>> {
    match form {
        StepForm::ProductSelection(form) => {
            validate_product_selection(form).map(ValidatedStep::ProductSelection)
        }
        StepForm::Customization(form) => {
            validate_customization(form).map(ValidatedStep::Customization)
        }
        StepForm::DeliveryInformation(form) => {
            validate_delivery_information(form).map(ValidatedStep::DeliveryInformation)
        }
        StepForm::PaymentInformation(form) => {
            validate_payment_information(form).map(ValidatedStep::PaymentInformation)
        }
    }
}

pub fn validate_product_selection(
    form: &ProductSelectionForm,
) -> Result<ProductSelection, Vec<FieldError>> {
    let mut errors = Vec::new();
    let product_category = required(
        &form.product_category,
        "productCategory",
        "Product category is required",
        &mut errors,
    );
    let make_id = required(&form.make_id, "makeId", "Make is required", &mut errors)
        .and_then(|raw| parse_id(&raw, "makeId", "Invalid make ID", &mut errors))
        .map(MakeId);
    let model_id = required(&form.model_id, "modelId", "Model is required", &mut errors)
        .and_then(|raw| parse_id(&raw, "modelId", "Invalid model ID", &mut errors))
        .map(ModelId);
    let quantity = required(&form.quantity, "quantity", "Quantity is required", &mut errors)
        .and_then(|raw| parse_quantity(&raw, &mut errors));

    match (product_category, make_id, model_id, quantity) {
        (Some(product_category), Some(make_id), Some(model_id), Some(quantity)) => {
            Ok(ProductSelection {
                product_category,
                make_id,
                model_id,
                quantity,
            })
        }
        _ => Err(errors),
    }
}

pub fn validate_customization(form: &CustomizationForm) -> Result<Customization, Vec<FieldError>> {
    let mut errors = Vec::new();
    let color = required(&form.color, "color", "Color is required", &mut errors);
    let interior = required(&form.interior, "interior", "Interior is required", &mut errors);
    let tire_type = required(&form.tire_type, "tireType", "Tire type is required", &mut errors);

    match (color, interior, tire_type) {
        (Some(color), Some(interior), Some(tire_type)) => Ok(Customization {
            color,
            interior,
            tire_type,
        }),
        _ => Err(errors),
    }
}

pub fn validate_delivery_information(
    form: &DeliveryInformationForm,
) -> Result<DeliveryInformation, Vec<FieldError>> {
    let mut errors = Vec::new();
    let delivery_address = required(
        &form.delivery_address,
        "deliveryAddress",
        "Delivery address is required",
        &mut errors,
    );
    let contact_name = required(
        &form.contact_name,
        "contactName",
        "Contact name is required",
        &mut errors,
    );
    let contact_email = required(
        &form.contact_email,
        "contactEmail",
        "Contact email is required",
        &mut errors,
    )
    .and_then(|email| {
        if is_valid_email(&email) {
            Some(email)
        } else {
            errors.push(FieldError::malformed(
                "contactEmail",
                "Please provide a valid email",
            ));
            None
        }
    });
    let contact_phone = required(
        &form.contact_phone,
        "contactPhone",
        "Contact phone is required",
        &mut errors,
    );

    match (delivery_address, contact_name, contact_email, contact_phone) {
        (Some(delivery_address), Some(contact_name), Some(contact_email), Some(contact_phone)) => {
            Ok(DeliveryInformation {
                delivery_address,
                contact_name,
                contact_email,
                contact_phone,
            })
        }
        _ => Err(errors),
    }
}

pub fn validate_payment_information(
    form: &PaymentInformationForm,
) -> Result<PaymentInformation, Vec<FieldError>> {
    let mut errors = Vec::new();
    let payment_method = required(
        &form.payment_method,
        "paymentMethod",
        "Payment method is required",
        &mut errors,
    );
    let billing_address = required(
        &form.billing_address,
        "billingAddress",
        "Billing address is required",
        &mut errors,
    );

    match (payment_method, billing_address) {
        (Some(payment_method), Some(billing_address)) => Ok(PaymentInformation {
            payment_method,
            billing_address,
        }),
        _ => Err(errors),
    }
}

pub fn is_valid_email(candidate: &str) -> bool {
    EMAIL_RE.is_match(candidate)
}

fn required(
    value: &Option<String>,
    field: &'static str,
    message: &str,
    errors: &mut Vec<FieldError>,
) -> Option<String> {
    match value.as_deref().map(str::trim) {
        Some(trimmed) if !trimmed.is_empty() => Some(trimmed.to_string()),
        _ => {
            errors.push(FieldError::missing(field, message));
            None
        }
    }
}

fn parse_id(
    raw: &str,
    field: &'static str,
    message: &str,
    errors: &mut Vec<FieldError>,
) -> Option<i64> {
    match raw.parse::<i64>() {
        Ok(id) if id > 0 => Some(id),
        _ => {
            errors.push(FieldError::malformed(field, message));
            None
        }
    }
}

fn parse_quantity(raw: &str, errors: &mut Vec<FieldError>) -> Option<u32> {
    let Ok(quantity) = raw.parse::<i64>() else {
        errors.push(FieldError::malformed(
            "quantity",
            "Quantity must be a whole number",
        ));
        return None;
    };
    if quantity < 1 {
        errors.push(FieldError::malformed(
            "quantity",
            "Quantity must be at least 1",
        ));
        return None;
    }
    match u32::try_from(quantity) {
        Ok(quantity) => Some(quantity),
        Err(_) => {
            errors.push(FieldError::malformed("quantity", "Quantity is too large"));
            None
        }
    }
}

#[cfg(test)]
#[path = "tests/steps_tests.rs"]
mod tests;
