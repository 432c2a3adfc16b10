//! Built-in templates for the pending order email.
//!
//! Subject and heading are short placeholder-substituted strings; the body
//! comes in an HTML and a plain text variant rendered from the order record.
//! Rendering is a pure function of its inputs.

use crate::orders::Order;

/// Default subject when the admin has not set an override
pub const DEFAULT_SUBJECT: &str = "[{site_title}]: New order #{order_number}";

/// Default heading when the admin has not set an override
pub const DEFAULT_HEADING: &str = "New Order: #{order_number}";

/// Default text shown below the main email content
pub const DEFAULT_ADDITIONAL_CONTENT: &str = "Congrats on the order.";

/// Replace `{name}` tokens in a template with their values.
///
/// Unknown tokens are left untouched so a typo in an admin-supplied template
/// stays visible instead of silently vanishing.
pub fn substitute(template: &str, values: &[(&str, String)]) -> String {
    let mut result = template.to_string();
    for (token, value) in values {
        result = result.replace(&format!("{{{}}}", token), value);
    }
    result
}

/// Placeholder values computed from an order
pub fn order_placeholders(order: &Order, site_title: &str) -> Vec<(&'static str, String)> {
    vec![
        ("order_date", order.formatted_date()),
        ("order_number", order.number.clone()),
        ("site_title", site_title.to_string()),
    ]
}

/// Render the HTML version of the new order email
pub fn render_order_html(order: &Order, heading: &str, additional_content: &str) -> String {
    let item_rows: String = order
        .line_items()
        .iter()
        .map(|item| {
            format!(
                r#"<tr><td class="item-name">{}</td><td class="item-qty">{}</td><td class="item-total">{}</td></tr>"#,
                html_escape(&item.name),
                item.quantity,
                html_escape(&item.line_total),
            )
        })
        .collect();

    let additional_html = if additional_content.is_empty() {
        String::new()
    } else {
        format!(
            r#"<p class="additional">{}</p>"#,
            html_escape(additional_content)
        )
    };

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <style>
        body {{ font-family: Arial, sans-serif; margin: 0; padding: 20px; background-color: #f5f5f5; }}
        .container {{ max-width: 600px; margin: 0 auto; background-color: #ffffff; border-radius: 8px; overflow: hidden; box-shadow: 0 2px 4px rgba(0,0,0,0.1); }}
        .header {{ background-color: #7f54b3; color: white; padding: 20px; text-align: center; }}
        .header h1 {{ margin: 0; font-size: 20px; }}
        .content {{ padding: 20px; }}
        .meta-row {{ display: flex; justify-content: space-between; padding: 8px 0; border-bottom: 1px solid #e2e8f0; }}
        .meta-row:last-child {{ border-bottom: none; }}
        .meta-label {{ color: #64748b; font-weight: 500; }}
        .meta-value {{ color: #1e293b; font-weight: 600; }}
        .items {{ width: 100%; border-collapse: collapse; margin: 15px 0; }}
        .items th {{ text-align: left; color: #64748b; font-size: 13px; padding: 8px; border-bottom: 2px solid #e2e8f0; }}
        .items td {{ padding: 8px; border-bottom: 1px solid #e2e8f0; color: #1e293b; }}
        .total-row {{ text-align: right; font-weight: 600; padding: 8px; }}
        .additional {{ color: #475569; margin-top: 20px; }}
        .footer {{ padding: 15px; text-align: center; color: #888; font-size: 12px; border-top: 1px solid #eee; }}
    </style>
</head>
<body>
    <div class="container">
        <div class="header">
            <h1>{heading}</h1>
        </div>
        <div class="content">
            <p>You have received an order from {customer}. The order is as follows:</p>
            <div class="meta-row">
                <span class="meta-label">Order</span>
                <span class="meta-value">#{number}</span>
            </div>
            <div class="meta-row">
                <span class="meta-label">Date</span>
                <span class="meta-value">{date}</span>
            </div>
            <table class="items">
                <thead>
                    <tr><th>Product</th><th>Quantity</th><th>Price</th></tr>
                </thead>
                <tbody>
                    {item_rows}
                </tbody>
            </table>
            <div class="total-row">Total: {total}</div>
            {additional_html}
        </div>
        <div class="footer">
            Ordermail
        </div>
    </div>
</body>
</html>"#,
        heading = html_escape(heading),
        customer = html_escape(&order.customer_name),
        number = html_escape(&order.number),
        date = html_escape(&order.formatted_date()),
        item_rows = item_rows,
        total = html_escape(&order.formatted_total()),
        additional_html = additional_html,
    )
}

/// Render the plain text version of the new order email
pub fn render_order_text(order: &Order, heading: &str, additional_content: &str) -> String {
    let items: String = order
        .line_items()
        .iter()
        .map(|item| format!("- {} x{} ({})\n", item.name, item.quantity, item.line_total))
        .collect();

    let additional = if additional_content.is_empty() {
        String::new()
    } else {
        format!("\n{}\n", additional_content)
    };

    format!(
        "{heading}\n\n\
        You have received an order from {customer}. The order is as follows:\n\n\
        Order: #{number}\n\
        Date: {date}\n\n\
        {items}\n\
        Total: {total}\n\
        {additional}\n\
        ---\n\
        Ordermail",
        heading = heading,
        customer = order.customer_name,
        number = order.number,
        date = order.formatted_date(),
        items = items,
        total = order.formatted_total(),
        additional = additional,
    )
}

/// Escape HTML special characters
fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
