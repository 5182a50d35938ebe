use std::fmt::Write as _;

use server_api::{Notice, TableView};
use shared::{
    domain::MIN_QUANTITY,
    error::{SyncError, LOAD_FAILURE_HINTS},
    protocol::OrderForm,
};

const TITLE: &str = "Site Order Management";
const SUBMIT_LABEL: &str = "Save to sheet";

const STYLE: &str = "body{font-family:sans-serif;margin:0;display:flex}\
aside{width:22rem;padding:1rem;background:#f4f4f4;min-height:100vh}\
main{flex:1;padding:1rem;overflow-x:auto}\
label{display:block;margin-top:.5rem}input{width:100%;box-sizing:border-box}\
table{border-collapse:collapse;width:100%}th,td{border:1px solid #ccc;padding:.25rem .5rem}\
.notice{background:#e6f4ea;padding:.5rem}.warning{background:#fff4e5;padding:.5rem}\
.error{background:#fdecea;padding:.5rem}.info{background:#e8f0fe;padding:.5rem}";

pub struct OrdersPage<'a> {
    pub view: &'a TableView,
    pub form: &'a OrderForm,
    pub notice: Option<&'a Notice>,
    pub warning: Option<&'a SyncError>,
    pub error: Option<&'a SyncError>,
}

pub fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}

pub fn column_label(column: &str) -> &str {
    match column {
        "order_date" => "Order date",
        "site_name" => "Site name",
        "address" => "Delivery address",
        "company" => "Company",
        "manager" => "Contact person",
        "phone" => "Phone",
        "item" => "Item",
        "quantity" => "Quantity",
        "delivery_date" => "Delivery date",
        other => other,
    }
}

fn document(body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\"><head><meta charset=\"utf-8\">\
<title>{TITLE}</title><style>{STYLE}</style></head><body>{body}</body></html>\n"
    )
}

/// Full page shown when the table could not be loaded. Nothing else is
/// rendered: no form, no table.
pub fn load_error_page(error: &SyncError) -> String {
    let mut body = format!(
        "<main><h1>{TITLE}</h1><p class=\"error\">Connecting to the order sheet failed.</p>\
<p class=\"info\">Error: {}</p><p class=\"warning\">Please check the following:</p><ol>",
        escape(&error.to_string())
    );
    for hint in LOAD_FAILURE_HINTS {
        let _ = write!(body, "<li>{}</li>", escape(hint));
    }
    body.push_str("</ol></main>");
    document(&body)
}

pub fn orders_page(page: &OrdersPage<'_>) -> String {
    let mut body = String::new();
    body.push_str(&order_form(page.form));

    body.push_str("<main>");
    let _ = write!(body, "<h1>{TITLE}</h1><h2>Orders and deliveries</h2>");
    if let Some(notice) = page.notice {
        let _ = write!(body, "<p class=\"notice\">{}</p>", escape(&notice.to_string()));
    }
    if let Some(warning) = page.warning {
        let _ = write!(body, "<p class=\"warning\">{}</p>", escape(&warning.to_string()));
    }
    if let Some(error) = page.error {
        let _ = write!(body, "<p class=\"error\">{}</p>", escape(&error.to_string()));
    }
    body.push_str(&table_section(page.view));
    body.push_str("</main>");
    document(&body)
}

fn text_field(out: &mut String, name: &str, value: &str) {
    let _ = write!(
        out,
        "<label for=\"{name}\">{}</label><input type=\"text\" id=\"{name}\" name=\"{name}\" value=\"{}\">",
        column_label(name),
        escape(value)
    );
}

fn order_form(form: &OrderForm) -> String {
    let mut out = String::from(
        "<aside><h2>New order</h2><form method=\"post\" action=\"/orders\">",
    );
    text_field(&mut out, "site_name", &form.site_name);
    text_field(&mut out, "address", &form.address);
    text_field(&mut out, "company", &form.company);
    text_field(&mut out, "manager", &form.manager);
    text_field(&mut out, "phone", &form.phone);
    text_field(&mut out, "item", &form.item);
    let _ = write!(
        out,
        "<label for=\"quantity\">{}</label>\
<input type=\"number\" id=\"quantity\" name=\"quantity\" min=\"{MIN_QUANTITY}\" step=\"1\" value=\"{}\">\
<label for=\"delivery_date\">{}</label>\
<input type=\"date\" id=\"delivery_date\" name=\"delivery_date\" value=\"{}\">\
<p><button type=\"submit\">{SUBMIT_LABEL}</button></p></form></aside>",
        column_label("quantity"),
        escape(&form.quantity),
        column_label("delivery_date"),
        escape(&form.delivery_date),
    );
    out
}

fn table_section(view: &TableView) -> String {
    let (columns, rows, selectable) = match view {
        TableView::Empty { message } => {
            return format!("<p class=\"info\">{}</p>", escape(message));
        }
        TableView::Rows {
            columns,
            rows,
            selectable,
        } => (columns, rows, selectable),
    };

    let mut out = String::from(
        "<form method=\"post\" action=\"/orders/delete\">\
<label for=\"row_index\">Select the row number to delete (leftmost column)</label>\
<select id=\"row_index\" name=\"row_index\">",
    );
    for index in selectable {
        let _ = write!(out, "<option value=\"{0}\">{0}</option>", index.0);
    }
    out.push_str("</select> <button type=\"submit\">Delete selected row</button></form>");

    out.push_str("<table><thead><tr><th>#</th>");
    for column in columns {
        let _ = write!(out, "<th>{}</th>", escape(column_label(column)));
    }
    out.push_str("</tr></thead><tbody>");
    for row in rows {
        let _ = write!(out, "<tr><td>{}</td>", row.index.0);
        for cell in &row.cells {
            let _ = write!(out, "<td>{}</td>", escape(cell));
        }
        out.push_str("</tr>");
    }
    out.push_str("</tbody></table>");
    out
}

#[cfg(test)]
#[path = "tests/page_tests.rs"]
mod tests;
