//! Delivery confirmation document attached to "order delivered" mails.

use once_cell::sync::Lazy;
use printpdf::{
    BuiltinFont, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference, PdfLayerReference,
};
use regex::Regex;
use serde::Serialize;

use crate::errors::ServiceError;

const PAGE_WIDTH: Mm = Mm(210.0);
const PAGE_HEIGHT: Mm = Mm(297.0);
const MARGIN_X: f32 = 20.0;
const TOP_Y: f32 = 277.0;
const BOTTOM_Y: f32 = 20.0;
/// Characters per line of body text at 10pt Helvetica on A4 with margins
const WRAP_WIDTH: usize = 95;
const PT_TO_MM: f32 = 0.3528;

static HTML_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").expect("valid tag regex"));
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));

/// One purchased item as shown to the customer on delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeliveryLine {
    pub name: String,
    pub size: Option<String>,
    pub short_description: String,
    pub long_description: Option<String>,
    pub download_url: String,
}

impl DeliveryLine {
    pub fn validity(&self) -> &str {
        self.size
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or("Lifetime")
    }
}

/// Reduces rich-text product copy to plain text.
pub fn strip_html(input: &str) -> String {
    let text = HTML_TAG.replace_all(input, " ");
    let text = text
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'");
    WHITESPACE.replace_all(text.trim(), " ").into_owned()
}

/// Greedy word wrap; words longer than `width` are split.
pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let mut word = word.to_string();
        while word.chars().count() > width {
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            let head: String = word.chars().take(width).collect();
            word = word.chars().skip(width).collect();
            lines.push(head);
        }
        let needed = if current.is_empty() {
            word.chars().count()
        } else {
            current.chars().count() + 1 + word.chars().count()
        };
        if needed > width && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(&word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

// Builtin PDF fonts only cover Latin-1
fn pdf_safe(text: &str) -> String {
    text.chars()
        .map(|c| if (c as u32) < 0x100 { c } else { '?' })
        .collect()
}

struct PageWriter<'a> {
    doc: &'a PdfDocumentReference,
    layer: PdfLayerReference,
    y: f32,
}

impl PageWriter<'_> {
    fn line(&mut self, text: &str, size: f32, font: &IndirectFontRef) {
        let height = size * PT_TO_MM * 1.5;
        if self.y - height < BOTTOM_Y {
            let (page, layer) = self.doc.add_page(PAGE_WIDTH, PAGE_HEIGHT, "content");
            self.layer = self.doc.get_page(page).get_layer(layer);
            self.y = TOP_Y;
        }
        self.y -= height;
        self.layer
            .use_text(pdf_safe(text), size, Mm(MARGIN_X), Mm(self.y), font);
    }

    fn gap(&mut self, mm: f32) {
        self.y -= mm;
    }
}

/// Renders the delivery document for an order.
pub fn render_delivery_pdf(
    store_name: &str,
    invoice_number: &str,
    customer_name: &str,
    lines: &[DeliveryLine],
) -> Result<Vec<u8>, ServiceError> {
    let report_err = |e: printpdf::Error| ServiceError::ReportError(e.to_string());

    let (doc, page, layer) = PdfDocument::new(
        format!("Order {invoice_number}"),
        PAGE_WIDTH,
        PAGE_HEIGHT,
        "content",
    );
    let regular = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(report_err)?;
    let bold = doc
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(report_err)?;

    let mut writer = PageWriter {
        doc: &doc,
        layer: doc.get_page(page).get_layer(layer),
        y: TOP_Y,
    };

    writer.line(store_name, 20.0, &bold);
    writer.line(&format!("Invoice #{invoice_number}"), 12.0, &regular);
    writer.line(&format!("Customer: {customer_name}"), 12.0, &regular);
    writer.gap(6.0);
    writer.line("Your digital products", 14.0, &bold);
    writer.gap(2.0);

    for (index, item) in lines.iter().enumerate() {
        writer.line(
            &format!("{}. {} ({})", index + 1, item.name, item.validity()),
            12.0,
            &bold,
        );
        let description = item
            .long_description
            .as_deref()
            .map(strip_html)
            .filter(|d| !d.is_empty())
            .unwrap_or_else(|| strip_html(&item.short_description));
        for text in wrap_text(&description, WRAP_WIDTH) {
            writer.line(&text, 10.0, &regular);
        }
        for text in wrap_text(&format!("Download: {}", item.download_url), WRAP_WIDTH) {
            writer.line(&text, 10.0, &regular);
        }
        writer.gap(4.0);
    }

    writer.gap(6.0);
    writer.line(
        &format!("Thank you for shopping with {store_name}."),
        11.0,
        &bold,
    );

    doc.save_to_bytes().map_err(report_err)
}
