//! PayPilot Render crate - invoice documents.
//!
//! Renders an invoice as a self-contained HTML page written to a temporary
//! file. The file is deleted when the returned [`RenderedDocument`] drops.

use std::io::Write;

use async_trait::async_trait;
use paypilot_core::{format_amount, Invoice, InvoiceStatus, PayPilotError, RenderedDocument, Renderer};
use tracing::debug;

/// Errors from document rendering.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("Failed to write document: {0}")]
    Io(#[from] std::io::Error),
    #[error("Render task failed: {0}")]
    Task(String),
}

impl From<RenderError> for PayPilotError {
    fn from(err: RenderError) -> Self {
        PayPilotError::Render(err.to_string())
    }
}

pub const HTML_MIME: &str = "text/html";

/// HTML invoice renderer.
#[derive(Debug, Clone)]
pub struct HtmlRenderer {
    business_name: String,
    currency_symbol: String,
}

impl HtmlRenderer {
    pub fn new(business_name: impl Into<String>, currency_symbol: impl Into<String>) -> Self {
        Self {
            business_name: business_name.into(),
            currency_symbol: currency_symbol.into(),
        }
    }

    /// Produce the HTML markup for an invoice.
    pub fn to_html(&self, invoice: &Invoice) -> String {
        let (status_label, status_color) = match invoice.status {
            InvoiceStatus::Paid => ("PAID", "#10b981"),
            InvoiceStatus::Overdue => ("OVERDUE", "#ef4444"),
            InvoiceStatus::Draft => ("DRAFT", "#6b7280"),
            InvoiceStatus::Pending => ("PENDING", "#f59e0b"),
        };
        let amount = format_amount(invoice.amount, &self.currency_symbol);

        format!(
            r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<title>Invoice {id}</title>
<style>
  body {{ font-family: -apple-system, 'Segoe UI', sans-serif; color: #1f2937; padding: 40px; }}
  .invoice {{ max-width: 700px; margin: 0 auto; }}
  .header {{ display: flex; justify-content: space-between; border-bottom: 3px solid #6366f1; padding-bottom: 24px; }}
  .status {{ color: #fff; background: {status_color}; padding: 4px 12px; border-radius: 12px; font-weight: 600; }}
  table {{ width: 100%; border-collapse: collapse; margin-top: 32px; }}
  th, td {{ text-align: left; padding: 12px; border-bottom: 1px solid #e5e7eb; }}
  .total {{ font-size: 1.4em; font-weight: 700; text-align: right; margin-top: 24px; }}
</style>
</head>
<body>
<div class="invoice">
  <div class="header">
    <div><h1>{business}</h1><p>Invoice #{id}</p></div>
    <div><span class="status">{status_label}</span></div>
  </div>
  <p><strong>Billed to:</strong> {customer}</p>
  <p><strong>Issued:</strong> {issued}<br><strong>Due:</strong> {due}</p>
  <table>
    <tr><th>Description</th><th>Amount</th></tr>
    <tr><td>{description}</td><td>{amount}</td></tr>
  </table>
  <p class="total">Total: {amount}</p>
</div>
</body>
</html>
"#,
            id = escape(&invoice.id.to_ascii_uppercase()),
            business = escape(&self.business_name),
            customer = escape(&invoice.customer_name),
            issued = invoice.created_at.format("%d %B %Y"),
            due = invoice.due_date.format("%d %B %Y"),
            description = escape(&invoice.description),
            amount = escape(&amount),
            status_label = status_label,
            status_color = status_color,
        )
    }

    fn write(&self, invoice: &Invoice) -> Result<RenderedDocument, RenderError> {
        let html = self.to_html(invoice);
        let mut file = tempfile::Builder::new()
            .prefix("paypilot-invoice-")
            .suffix(".html")
            .tempfile()?;
        file.write_all(html.as_bytes())?;
        file.flush()?;

        let file_name = format!("invoice-{}.html", invoice.id.to_ascii_uppercase());
        debug!(id = %invoice.id, bytes = html.len(), "Invoice document rendered");
        Ok(RenderedDocument::new(
            file.into_temp_path(),
            file_name,
            HTML_MIME.to_string(),
        ))
    }
}

#[async_trait]
impl Renderer for HtmlRenderer {
    async fn render(&self, invoice: &Invoice) -> Result<RenderedDocument, PayPilotError> {
        let renderer = self.clone();
        let invoice = invoice.clone();
        let doc = tokio::task::spawn_blocking(move || renderer.write(&invoice))
            .await
            .map_err(|e| RenderError::Task(e.to_string()))??;
        Ok(doc)
    }
}

/// Escape text for inclusion in HTML element content.
fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}
