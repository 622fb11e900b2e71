//! Server-rendered HTML for every page and HTMX fragment.

use std::fmt::Write as _;

use shared::{
    domain::{
        CarModel, Item, Make, Order, ProductPage, ProductSearch, ProductSort, SortDirection, Todo,
    },
    protocol::ItemForm,
};
use wizard::{FieldError, OrderDraft, Step, StepForm, StepPage};

const HTMX_SRC: &str = "https://unpkg.com/htmx.org@1.9.12";
const HTMX_SSE_SRC: &str = "https://unpkg.com/htmx.org@1.9.12/dist/ext/sse.js";

pub(crate) fn escape(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            // SSE frames are line based; a raw CR would split the data field.
            '\r' => escaped.push_str("&#13;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

fn layout(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <title>{title}</title>\n<script src=\"{HTMX_SRC}\"></script>\n\
         <script src=\"{HTMX_SSE_SRC}\"></script>\n</head>\n<body>\n{body}\n</body>\n</html>\n",
        title = escape(title),
    )
}

fn error_line(errors: &[FieldError], field: &str) -> String {
    errors
        .iter()
        .filter(|error| error.field == field)
        .map(|error| format!("<span class=\"error\">{}</span>", escape(&error.message)))
        .collect()
}

fn text_input(label: &str, name: &str, value: Option<&str>, errors: &[FieldError]) -> String {
    let input_type = if name.to_ascii_lowercase().contains("email") {
        "email"
    } else {
        "text"
    };
    format!(
        "<p><label for=\"{name}\">{label}</label>\
         <input type=\"{input_type}\" id=\"{name}\" name=\"{name}\" value=\"{value}\">{error}</p>\n",
        label = escape(label),
        value = escape(value.unwrap_or_default()),
        error = error_line(errors, name),
    )
}

/// Swaps the model dropdown's options whenever the make changes.
const MAKE_SELECT_ATTRS: &str = "hx-get=\"/order/api/models/options\" hx-target=\"#modelId\" hx-trigger=\"change\"";

fn option_list<'a>(options: impl Iterator<Item = (i64, &'a str)>, selected: Option<&str>) -> String {
    let mut html = String::from("<option value=\"\">-- choose --</option>");
    for (id, option) in options {
        let id = id.to_string();
        let marker = if selected == Some(id.as_str()) {
            " selected"
        } else {
            ""
        };
        let _ = write!(
            html,
            "<option value=\"{id}\"{marker}>{}</option>",
            escape(option)
        );
    }
    html
}

fn select<'a>(
    label: &str,
    name: &str,
    attrs: &str,
    options: impl Iterator<Item = (i64, &'a str)>,
    selected: Option<&str>,
    errors: &[FieldError],
) -> String {
    let attrs = if attrs.is_empty() {
        String::new()
    } else {
        format!(" {attrs}")
    };
    format!(
        "<p><label for=\"{name}\">{label}</label><select id=\"{name}\" name=\"{name}\"{attrs}>\
         {options}</select>{error}</p>\n",
        label = escape(label),
        options = option_list(options, selected),
        error = error_line(errors, name),
    )
}

/// Option elements for the model dropdown of one make.
pub(crate) fn model_option_list(models: &[CarModel]) -> String {
    option_list(model_options(models), None)
}

fn make_options(makes: &[Make]) -> impl Iterator<Item = (i64, &str)> + '_ {
    makes.iter().map(|make| (make.id.0, make.name.as_str()))
}

fn model_options(models: &[CarModel]) -> impl Iterator<Item = (i64, &str)> + '_ {
    models.iter().map(|model| (model.id.0, model.name.as_str()))
}

pub(crate) fn step_page(page: &StepPage) -> String {
    let step = page.step;
    let mut body = format!(
        "<h1>Step {} of {}: {}</h1>\n",
        step.number(),
        Step::ALL.len(),
        escape(step.title())
    );

    let fields = match &page.form {
        Some(StepForm::ProductSelection(form)) => {
            let mut fields = text_input(
                "Product category",
                "productCategory",
                form.product_category.as_deref(),
                &page.errors,
            );
            fields.push_str(&select(
                "Make",
                "makeId",
                MAKE_SELECT_ATTRS,
                make_options(&page.makes),
                form.make_id.as_deref(),
                &page.errors,
            ));
            fields.push_str(&select(
                "Model",
                "modelId",
                "",
                model_options(&page.models),
                form.model_id.as_deref(),
                &page.errors,
            ));
            fields.push_str(&text_input(
                "Quantity",
                "quantity",
                form.quantity.as_deref(),
                &page.errors,
            ));
            fields
        }
        Some(StepForm::Customization(form)) => [
            text_input("Color", "color", form.color.as_deref(), &page.errors),
            text_input("Interior", "interior", form.interior.as_deref(), &page.errors),
            text_input("Tire type", "tireType", form.tire_type.as_deref(), &page.errors),
        ]
        .concat(),
        Some(StepForm::DeliveryInformation(form)) => [
            text_input(
                "Delivery address",
                "deliveryAddress",
                form.delivery_address.as_deref(),
                &page.errors,
            ),
            text_input(
                "Contact name",
                "contactName",
                form.contact_name.as_deref(),
                &page.errors,
            ),
            text_input(
                "Contact email",
                "contactEmail",
                form.contact_email.as_deref(),
                &page.errors,
            ),
            text_input(
                "Contact phone",
                "contactPhone",
                form.contact_phone.as_deref(),
                &page.errors,
            ),
        ]
        .concat(),
        Some(StepForm::PaymentInformation(form)) => [
            text_input(
                "Payment method",
                "paymentMethod",
                form.payment_method.as_deref(),
                &page.errors,
            ),
            text_input(
                "Billing address",
                "billingAddress",
                form.billing_address.as_deref(),
                &page.errors,
            ),
        ]
        .concat(),
        None => draft_summary(&page.draft),
    };

    let action = if step == Step::Confirmation {
        "Confirm order"
    } else {
        "Next"
    };
    let _ = write!(
        body,
        "<form method=\"post\" action=\"{path}\">\n{fields}<button type=\"submit\">{action}</button>\n</form>\n",
        path = step.path(),
    );
    if step != Step::ProductSelection {
        let _ = writeln!(body, "<p><a href=\"/order/step1\">Start over</a></p>");
    }
    layout(step.title(), &body)
}

fn summary_rows(rows: &[(&str, String)]) -> String {
    let mut html = String::from("<dl>\n");
    for (label, value) in rows {
        let _ = writeln!(html, "<dt>{}</dt><dd>{}</dd>", escape(label), escape(value));
    }
    html.push_str("</dl>\n");
    html
}

fn draft_summary(draft: &OrderDraft) -> String {
    let text = |value: &Option<String>| value.clone().unwrap_or_default();
    summary_rows(&[
        ("Product category", text(&draft.product_category)),
        (
            "Make",
            draft.make.as_ref().map(|make| make.name.clone()).unwrap_or_default(),
        ),
        (
            "Model",
            draft
                .model
                .as_ref()
                .map(|model| model.name.clone())
                .unwrap_or_default(),
        ),
        (
            "Quantity",
            draft.quantity.map(|quantity| quantity.to_string()).unwrap_or_default(),
        ),
        ("Color", text(&draft.color)),
        ("Interior", text(&draft.interior)),
        ("Tire type", text(&draft.tire_type)),
        ("Delivery address", text(&draft.delivery_address)),
        ("Contact name", text(&draft.contact_name)),
        ("Contact email", text(&draft.contact_email)),
        ("Contact phone", text(&draft.contact_phone)),
        ("Payment method", text(&draft.payment_method)),
        ("Billing address", text(&draft.billing_address)),
    ])
}

pub(crate) fn receipt_page(order: &Order) -> String {
    let details = &order.details;
    let body = format!(
        "<h1>Thank you! Order #{id} confirmed</h1>\n{summary}<p>Placed {placed}</p>\n\
         <p><a href=\"/order\">Place another order</a></p>\n",
        id = order.id,
        summary = summary_rows(&[
            ("Product category", details.product_category.clone()),
            ("Make", details.make.name.clone()),
            ("Model", details.model.name.clone()),
            ("Quantity", details.quantity.to_string()),
            ("Color", details.color.clone()),
            ("Interior", details.interior.clone()),
            ("Tire type", details.tire_type.clone()),
            ("Delivery address", details.delivery_address.clone()),
            ("Contact name", details.contact_name.clone()),
            ("Contact email", details.contact_email.clone()),
            ("Contact phone", details.contact_phone.clone()),
            ("Payment method", details.payment_method.clone()),
            ("Billing address", details.billing_address.clone()),
            ("Status", order.status.as_str().to_string()),
        ]),
        placed = order.created_at.format("%Y-%m-%d %H:%M UTC"),
    );
    layout("Order confirmed", &body)
}

/// One `<li>`, both for the initial list and for live pushes.
pub(crate) fn item_fragment(item: &Item) -> String {
    let description = item
        .description
        .as_deref()
        .map(|description| format!(" <small>{}</small>", escape(description)))
        .unwrap_or_default();
    format!(
        "<li id=\"item-{id}\"><strong>{name}</strong>{description} <time datetime=\"{added}\">{shown}</time></li>",
        id = item.id,
        name = escape(&item.name),
        added = item.date_time_added.to_rfc3339(),
        shown = item.date_time_added.format("%Y-%m-%d %H:%M:%S"),
    )
}

pub(crate) fn item_form(form: &ItemForm, errors: &[FieldError]) -> String {
    format!(
        "<form id=\"item-form\" method=\"post\" action=\"/items\" hx-post=\"/items\" \
         hx-target=\"this\" hx-swap=\"outerHTML\">\n{name}{description}\
         <button type=\"submit\">Add item</button>\n</form>\n",
        name = text_input("Name", "name", form.name.as_deref(), errors),
        description = text_input(
            "Description",
            "description",
            form.description.as_deref(),
            errors
        ),
    )
}

pub(crate) fn items_page(items: &[Item], form: &ItemForm, errors: &[FieldError]) -> String {
    let list: String = items.iter().map(item_fragment).collect::<Vec<_>>().join("\n");
    let body = format!(
        "<h1>Items</h1>\n{form}<ul id=\"items\" hx-ext=\"sse\" sse-connect=\"/items/stream\" \
         sse-swap=\"item-created\" hx-swap=\"afterbegin\">\n{list}\n</ul>\n",
        form = item_form(form, errors),
    );
    layout("Items", &body)
}

// Todos

pub(crate) fn todo_item(todo: &Todo) -> String {
    let (checked, class) = if todo.done {
        (" checked", " class=\"done\"")
    } else {
        ("", "")
    };
    format!(
        "<li id=\"todo-{id}\"{class}>\
         <input type=\"checkbox\"{checked} hx-put=\"/todos/{id}/toggle\" hx-target=\"#todo-{id}\" hx-swap=\"outerHTML\">\
         <span>{text}</span> \
         <button hx-get=\"/todos/{id}/edit\" hx-target=\"#todo-{id}\" hx-swap=\"outerHTML\">Edit</button> \
         <button hx-delete=\"/todos/{id}\" hx-target=\"#todo-{id}\" hx-swap=\"outerHTML\">Delete</button></li>",
        id = todo.id,
        text = escape(&todo.text),
    )
}

pub(crate) fn todo_edit(todo: &Todo, error: Option<&str>) -> String {
    let error = error
        .map(|message| format!("<span class=\"error\">{}</span>", escape(message)))
        .unwrap_or_default();
    format!(
        "<li id=\"todo-{id}\"><form hx-put=\"/todos/{id}\" hx-target=\"#todo-{id}\" hx-swap=\"outerHTML\">\
         <input type=\"text\" name=\"text\" value=\"{text}\" autofocus>{error}\
         <button type=\"submit\">Save</button></form></li>",
        id = todo.id,
        text = escape(&todo.text),
    )
}

/// The add form and the list. This is also the response to an HTMX add.
pub(crate) fn todo_section(todos: &[Todo]) -> String {
    let list: String = todos.iter().map(todo_item).collect::<Vec<_>>().join("\n");
    format!(
        "<form id=\"todo-form\" method=\"post\" action=\"/todos\" hx-post=\"/todos\" \
         hx-target=\"#todo-section\" hx-swap=\"innerHTML\">\
         <input type=\"text\" name=\"text\" placeholder=\"What needs doing?\">\
         <button type=\"submit\">Add</button></form>\n<ul id=\"todo-list\">\n{list}\n</ul>\n"
    )
}

pub(crate) fn todos_page(todos: &[Todo]) -> String {
    let body = format!(
        "<h1>Todos</h1>\n<div id=\"todo-section\">\n{}</div>\n",
        todo_section(todos)
    );
    layout("Todos", &body)
}

// Products

/// Query string for `search` with the page, sort column and direction replaced.
fn product_query(
    search: &ProductSearch,
    page: u32,
    sort: ProductSort,
    direction: SortDirection,
) -> String {
    let mut query = format!(
        "page={page}&sortBy={}&direction={}",
        sort.as_str(),
        direction.as_str()
    );
    if let Some(term) = &search.search {
        let _ = write!(query, "&search={}", urlencoding::encode(term));
    }
    if let Some(category) = &search.category {
        let _ = write!(query, "&category={}", urlencoding::encode(category));
    }
    query
}

fn sort_header(search: &ProductSearch, sort: ProductSort, label: &str) -> String {
    let (direction, marker) = if search.sort == sort {
        let marker = match search.direction {
            SortDirection::Asc => " &#9650;",
            SortDirection::Desc => " &#9660;",
        };
        (search.direction.reversed(), marker)
    } else {
        (SortDirection::Asc, "")
    };
    format!(
        "<th><a href=\"/products?{query}\" hx-get=\"/products/table?{query}\" \
         hx-target=\"#product-results\" hx-swap=\"outerHTML\">{label}{marker}</a></th>",
        query = escape(&product_query(search, 0, sort, direction)),
    )
}

fn pager_link(search: &ProductSearch, page: u32, label: &str) -> String {
    format!(
        "<a href=\"/products?{query}\" hx-get=\"/products/table?{query}\" \
         hx-target=\"#product-results\" hx-swap=\"outerHTML\">{label}</a>",
        query = escape(&product_query(search, page, search.sort, search.direction)),
    )
}

/// The results table with its sort headers and pager. Swapped as a whole.
pub(crate) fn product_results(results: &ProductPage, search: &ProductSearch) -> String {
    let mut html = String::from("<div id=\"product-results\">\n");
    let _ = writeln!(
        html,
        "<p>{} product(s), page {} of {}</p>",
        results.total_items,
        u64::from(results.page) + 1,
        results.total_pages().max(1),
    );
    html.push_str("<table>\n<thead><tr>");
    for (sort, label) in [
        (ProductSort::Name, "Name"),
        (ProductSort::Category, "Category"),
        (ProductSort::Price, "Price"),
        (ProductSort::Stock, "Stock"),
    ] {
        html.push_str(&sort_header(search, sort, label));
    }
    html.push_str("<th></th></tr></thead>\n<tbody>\n");
    let current = escape(&product_query(
        search,
        results.page,
        search.sort,
        search.direction,
    ));
    for product in &results.products {
        let _ = writeln!(
            html,
            "<tr id=\"product-{id}\"><td>{name}</td><td>{category}</td><td>{price}</td><td>{stock}</td>\
             <td><button hx-delete=\"/products/{id}?{current}\" hx-target=\"#product-results\" \
             hx-swap=\"outerHTML\" hx-confirm=\"Delete {name}?\">Delete</button></td></tr>",
            id = product.id,
            name = escape(&product.name),
            category = escape(&product.category),
            price = product.price_display(),
            stock = product.stock,
        );
    }
    if results.products.is_empty() {
        html.push_str("<tr><td colspan=\"5\">No products found</td></tr>\n");
    }
    html.push_str("</tbody>\n</table>\n<nav class=\"pager\">");
    if results.has_previous() {
        html.push_str(&pager_link(search, results.page - 1, "Previous"));
    }
    if results.has_next() {
        html.push(' ');
        html.push_str(&pager_link(search, results.page + 1, "Next"));
    }
    html.push_str("</nav>\n</div>\n");
    html
}

pub(crate) fn products_page(
    results: &ProductPage,
    search: &ProductSearch,
    categories: &[String],
) -> String {
    let mut category_options = String::from("<option value=\"\">All categories</option>");
    for category in categories {
        let marker = if search.category.as_deref() == Some(category.as_str()) {
            " selected"
        } else {
            ""
        };
        let _ = write!(
            category_options,
            "<option value=\"{value}\"{marker}>{value}</option>",
            value = escape(category)
        );
    }
    let body = format!(
        "<h1>Products</h1>\n<form id=\"product-filters\" method=\"get\" action=\"/products\" \
         hx-get=\"/products/table\" hx-target=\"#product-results\" hx-swap=\"outerHTML\" \
         hx-trigger=\"input changed delay:300ms from:#search, change from:#category, submit\">\
         <input type=\"search\" id=\"search\" name=\"search\" value=\"{term}\" placeholder=\"Search by name\">\
         <select id=\"category\" name=\"category\">{category_options}</select>\
         <input type=\"hidden\" name=\"sortBy\" value=\"{sort}\">\
         <input type=\"hidden\" name=\"direction\" value=\"{direction}\">\
         <button type=\"submit\">Search</button></form>\n{results}",
        term = escape(search.search.as_deref().unwrap_or_default()),
        sort = search.sort.as_str(),
        direction = search.direction.as_str(),
        results = product_results(results, search),
    );
    layout("Products", &body)
}

#[cfg(test)]
#[path = "tests/views_tests.rs"]
mod tests;
