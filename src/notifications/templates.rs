//! HTML bodies for transactional mail. Every interpolated value is escaped.

use std::fmt::Write as _;

use crate::entities::{order, order_item};
use crate::reports::DeliveryLine;

pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

const CELL: &str = "padding:8px;border-bottom:1px solid #ddd;";
const ROW_LABEL: &str = "padding:14px 18px;font-weight:600;";
const ROW_VALUE: &str = "padding:14px 18px;";

/// Confirmation sent to the customer and the store admin when an order is placed.
pub fn order_placed(
    store_name: &str,
    order: &order::Model,
    items: &[order_item::Model],
) -> String {
    let store = escape_html(store_name);
    let mut item_list = String::new();
    for item in items {
        let _ = write!(
            item_list,
            r#"<li style="margin-bottom:6px;">{} &times; {}</li>"#,
            escape_html(&item.name),
            item.quantity
        );
    }

    let rows = [
        ("Invoice Number", escape_html(&order.invoice_number)),
        ("Total Items", order.total_items.to_string()),
        ("Total Amount", order.subtotal.to_string()),
        ("Payment Method", escape_html(&order.payment_method)),
    ];
    let mut table = String::new();
    for (label, value) in rows {
        let _ = write!(
            table,
            r#"<tr><td style="{ROW_LABEL}">{label}</td><td style="{ROW_VALUE}">{value}</td></tr>"#
        );
    }

    format!(
        r#"<div style="max-width:640px;margin:auto;padding:30px;font-family:Arial,Helvetica,sans-serif;border:1px solid #e5e7eb;">
<div style="text-align:center;margin-bottom:25px;">
<h2 style="font-size:28px;margin:0;color:#0f172a;">{store}</h2>
<p style="margin:6px 0 0 0;font-size:13px;color:#64748b;letter-spacing:2px;">Order Confirmation</p>
</div>
<p style="font-size:16px;color:#334155;">Dear <strong>{customer}</strong>,</p>
<p style="font-size:15px;color:#475569;line-height:1.7;">Thank you for shopping with <strong>{store}</strong>. Your order has been confirmed and is being processed.</p>
<table style="width:100%;border-collapse:collapse;margin-top:25px;border:1px solid #e2e8f0;">{table}</table>
<div style="margin-top:25px;padding:18px;background:#f8fafc;border-left:4px solid #2563eb;">
<p style="margin:0 0 8px 0;font-size:15px;font-weight:700;color:#0f172a;">Shipping Address</p>
<p style="margin:0;font-size:14px;color:#475569;">{address}</p>
</div>
<div style="margin-top:30px;padding:20px;background:#f1f5f9;">
<h3 style="margin:0 0 15px 0;font-size:18px;">Ordered Items</h3>
<ul style="margin:0;padding-left:18px;color:#475569;">{item_list}</ul>
</div>
<div style="text-align:center;margin-top:30px;padding:16px;background:#0f172a;">
<p style="margin:0;font-size:13px;color:#ffffff;">Thank you for choosing {store}</p>
</div>
</div>"#,
        customer = escape_html(&order.customer_name),
        address = escape_html(&order.customer_address),
    )
}

/// Download table sent once an order is delivered.
pub fn order_delivered(store_name: &str, customer_name: &str, lines: &[DeliveryLine]) -> String {
    let mut rows = String::new();
    for line in lines {
        let _ = write!(
            rows,
            r#"<tr><td style="{CELL}">{name}</td><td style="{CELL}">{validity}</td><td style="{CELL}">{description}</td><td style="{CELL}"><a href="{url}" target="_blank" style="background:#007BFF;color:white;padding:6px 12px;border-radius:4px;text-decoration:none;">Download</a></td></tr>"#,
            name = escape_html(&line.name),
            validity = escape_html(line.validity()),
            description = escape_html(&line.short_description),
            url = escape_html(&line.download_url),
        );
    }

    format!(
        r#"<div style="font-family:Arial,sans-serif;padding:20px;">
<h2 style="color:#333;">Hello {customer},</h2>
<p>Your digital products are now available for download!</p>
<table style="width:100%;border-collapse:collapse;margin-top:10px;">
<thead><tr style="background:#007BFF;color:white;"><th>Product</th><th>Validity</th><th>Description</th><th>Download</th></tr></thead>
<tbody>{rows}</tbody>
</table>
<p style="margin-top:20px;">Thank you for shopping with <b>{store}</b></p>
</div>"#,
        customer = escape_html(customer_name),
        store = escape_html(store_name),
    )
}

/// Newsletter announcement for a newly published product.
pub fn product_announcement(store_name: &str, product_name: &str, link: &str) -> String {
    format!(
        r#"<h2>New arrival at {store}</h2>
<p>A brand-new product has just been published.</p>
<p><b>{product}</b></p>
<p>Be among the first to get it.</p>
<p><a href="{link}">View product</a></p>
<br/>
<h4>{store}</h4>"#,
        store = escape_html(store_name),
        product = escape_html(product_name),
        link = escape_html(link),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_markup_characters() {
        assert_eq!(
            escape_html(r#"<script>alert("x & 'y'")</script>"#),
            "&lt;script&gt;alert(&quot;x &amp; &#39;y&#39;&quot;)&lt;/script&gt;"
        );
    }

    #[test]
    fn delivered_table_has_one_row_per_line() {
        let lines = vec![
            DeliveryLine {
                name: "Antivirus <Pro>".into(),
                size: None,
                short_description: "Protects 1 PC".into(),
                long_description: None,
                download_url: "https://drive.example.com/a".into(),
            },
            DeliveryLine {
                name: "VPN".into(),
                size: Some("6 Months".into()),
                short_description: "Private browsing".into(),
                long_description: None,
                download_url: "#".into(),
            },
        ];
        let html = order_delivered("File Box", "Nadia", &lines);
        assert_eq!(html.matches("<tr><td").count(), 2);
        assert!(html.contains("Antivirus &lt;Pro&gt;"));
        assert!(html.contains("Lifetime"));
        assert!(html.contains("6 Months"));
        assert!(html.contains("Hello Nadia,"));
    }

    #[test]
    fn announcement_links_to_product_page() {
        let html = product_announcement(
            "File Box",
            "Office 2024",
            "https://shop.example.com/product-details/office-2024",
        );
        assert!(html.contains(r#"href="https://shop.example.com/product-details/office-2024""#));
        assert!(html.contains("Office 2024"));
    }
}
