//! Regex-based intent extraction.
//!
//! Deterministic fallback used when no language-model provider is
//! configured or every provider fails. Detection order is payment, status,
//! listing, creation; anything else is unknown.

use chrono::{DateTime, Utc};
use paypilot_core::{Intent, InvoiceRequest};
use regex::Regex;

use crate::due_date::{iso_date_re, parse_due_date};

/// Words that never name a customer even when capitalized.
const NAME_STOPWORDS: &[&str] = &[
    "rs", "rs.", "inr", "usd", "eur", "invoice", "bill", "due", "amount", "the", "a", "an", "my",
];

/// Collection of compiled extraction patterns, built once and reused.
pub struct PatternExtractor {
    payment: Vec<Regex>,
    status: Vec<Regex>,
    list: Vec<Regex>,
    create: Regex,
    lookup_verb: Regex,
    id_token: Regex,
    amount_prefixed: Regex,
    amount_suffixed: Regex,
    bare_number: Regex,
    phone: Regex,
    name: Regex,
    description: Regex,
}

impl Default for PatternExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl PatternExtractor {
    pub fn new() -> Self {
        let compile = |pat: &str| Regex::new(pat).expect("Invalid extractor regex");

        // =====================================================================
        // Payment
        // =====================================================================
        // "<id> is paid" must open the message.
        let payment = [
            r"(?i)^\s*paid\b",
            r"(?i)^\s*mark\b.*\bpaid\b",
            r"(?i)^\s*(?:invoice\s+)?#?(?:[a-z0-9-]*\d[a-z0-9-]*|[a-f]{8})\s+(?:is|was|has\s+been|got)\s+paid\b",
            r"(?i)^\s*(?:payment\s+)?received\s+(?:for\s+)?(?:invoice\s+)?#?[a-z0-9-]*\d",
        ]
        .iter()
        .map(|p| compile(*p))
        .collect();

        // =====================================================================
        // Status
        // =====================================================================
        let status = [
            r"(?i)^\s*(?:(?:check|show|get|what(?:'s|\s+is))\s+(?:the\s+)?)?status\b",
            r"(?i)\bstatus\s+(?:of\s+)?(?:invoice\s+)?#?(?:[a-z0-9-]*\d[a-z0-9-]*|[a-f]{8})\b",
            r"(?i)^\s*(?:is|has)\s+(?:invoice\s+)?#?\S+\s+(?:been\s+)?paid\s*\?",
        ]
        .iter()
        .map(|p| compile(*p))
        .collect();

        // =====================================================================
        // Listing
        // =====================================================================
        let list = [
            r"(?i)^\s*(?:list|show|view|see|get)\b.*\binvoices\b",
            r"(?i)\bmy\s+invoices\b",
            r"(?i)^\s*(?:all\s+)?invoices\s*[?.!]*\s*$",
            r"(?i)^\s*list\s*(?:all)?\s*[?.!]*\s*$",
        ]
        .iter()
        .map(|p| compile(*p))
        .collect();

        Self {
            payment,
            status,
            list,
            create: compile(r"(?i)\b(?:invoice|bill|charge)\b"),
            lookup_verb: compile(r"(?i)^\s*(?:check|show|get|find|view)\b"),
            id_token: compile(r"#?([A-Za-z0-9][A-Za-z0-9-]*)"),
            amount_prefixed: compile(
                r"(?i)(?:₹|\brs\.?|\binr\b|\$|\busd\b|€|\beur\b|\bamount(?:\s+of)?)\s*:?\s*(\d[\d,]*(?:\.\d+)?)\b",
            ),
            amount_suffixed: compile(
                r"(?i)(\d[\d,]*(?:\.\d+)?)\s*(?:rs\b\.?|rupees\b|inr\b|usd\b|dollars\b|eur\b|euros?\b)",
            ),
            bare_number: compile(r"(?i)\b(\d[\d,]*(?:\.\d+)?)\b(\s*(?:days?|weeks?)\b)?"),
            phone: compile(r"\+?\d[\d \-]{8,18}\d"),
            name: compile(r"\b(?:[Tt]o|[Ff]or)\s+([A-Z][\w&.'-]*(?:\s+[A-Z][\w&.'-]*)*)"),
            description: compile(
                r"\bfor\s+([a-z][^,]*?)(?:\s*,|\s+due\b|\s+by\b|\s+(?:of\s+)?(?:₹|\$|€)|\s+(?:rs\.?|inr|usd|eur|amount)\b|\s+\d|\s*[.!?]*\s*$)",
            ),
        }
    }

    /// Classify `text`, resolving relative due dates against `now`.
    pub fn extract(&self, text: &str, now: DateTime<Utc>) -> Intent {
        let text = text.trim();
        if text.is_empty() {
            return Intent::Unknown;
        }

        if self.payment.iter().any(|re| re.is_match(text)) {
            return Intent::UpdatePayment {
                invoice_id: self.find_invoice_id(text),
            };
        }

        if self.status.iter().any(|re| re.is_match(text)) {
            return Intent::CheckStatus {
                invoice_id: self.find_invoice_id(text),
            };
        }

        if self.list.iter().any(|re| re.is_match(text)) {
            return Intent::ListInvoices;
        }

        // "check 3f2a9c1b", "show invoice 3f2a9c1b"
        if self.lookup_verb.is_match(text) {
            if let Some(id) = self.find_invoice_id(text) {
                return Intent::CheckStatus {
                    invoice_id: Some(id),
                };
            }
        }

        let marked = self.find_amount(text);
        if self.create.is_match(text) || marked.is_some() {
            return Intent::CreateInvoice(InvoiceRequest {
                customer_name: self.find_name(text),
                customer_phone: self.find_phone(text),
                amount: marked.or_else(|| self.find_bare_amount(text)),
                description: self.find_description(text),
                due_date: parse_due_date(text, now),
            });
        }

        Intent::Unknown
    }

    /// First token that looks like an invoice id.
    fn find_invoice_id(&self, text: &str) -> Option<String> {
        // Currency amounts are never ids.
        let text = self.amount_prefixed.replace_all(text, " ");
        let text = self.amount_suffixed.replace_all(&text, " ");
        self.id_token
            .captures_iter(&text)
            .filter_map(|caps| caps.get(1))
            .map(|m| m.as_str())
            .find(|token| looks_like_id(token))
            .map(|token| token.to_ascii_lowercase())
    }

    fn find_amount(&self, text: &str) -> Option<f64> {
        if let Some(caps) = self.amount_prefixed.captures(text) {
            return parse_number(&caps[1]);
        }
        if let Some(caps) = self.amount_suffixed.captures(text) {
            return parse_number(&caps[1]);
        }
        None
    }

    /// Amount for creation requests that carry no currency marker:
    /// the first number that is not a date, a phone number or a day count.
    fn find_bare_amount(&self, text: &str) -> Option<f64> {
        let without_dates = iso_date_re().replace_all(text, " ");
        let without_phones = self.phone.replace_all(&without_dates, |caps: &regex::Captures| {
            let digits = caps[0].chars().filter(|c| c.is_ascii_digit()).count();
            if digits >= 10 {
                " ".to_string()
            } else {
                caps[0].to_string()
            }
        });
        self.bare_number
            .captures_iter(&without_phones)
            .filter(|caps| caps.get(2).is_none())
            .filter_map(|caps| parse_number(&caps[1]))
            .next()
    }

    fn find_name(&self, text: &str) -> Option<String> {
        for caps in self.name.captures_iter(text) {
            let words: Vec<&str> = caps[1]
                .split_whitespace()
                .take_while(|w| !NAME_STOPWORDS.contains(&w.to_ascii_lowercase().as_str()))
                .collect();
            if !words.is_empty() {
                return Some(words.join(" ").trim_end_matches(['.', ',']).to_string());
            }
        }
        None
    }

    fn find_description(&self, text: &str) -> Option<String> {
        self.description
            .captures(text)
            .map(|caps| caps[1].trim().to_string())
            .filter(|d| !d.is_empty())
    }

    fn find_phone(&self, text: &str) -> Option<String> {
        self.phone
            .find_iter(text)
            .find_map(|m| paypilot_core::normalize_phone(m.as_str()))
    }
}

/// An id token contains a digit (or is eight hex letters) and is short.
fn looks_like_id(token: &str) -> bool {
    if token.is_empty() || token.len() > 36 {
        return false;
    }
    let has_digit = token.chars().any(|c| c.is_ascii_digit());
    let all_hex8 = token.len() == 8 && token.chars().all(|c| c.is_ascii_hexdigit());
    (has_digit || all_hex8) && token.chars().filter(|c| c.is_ascii_digit()).count() < 10
}

fn parse_number(raw: &str) -> Option<f64> {
    raw.replace(',', "").parse::<f64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 10, 12, 0, 0).unwrap()
    }

    fn extract(text: &str) -> Intent {
        PatternExtractor::new().extract(text, now())
    }

    fn request(text: &str) -> InvoiceRequest {
        match extract(text) {
            Intent::CreateInvoice(request) => request,
            other => panic!("expected create_invoice for {:?}, got {:?}", text, other),
        }
    }

    // =====================================================================
    // Payment
    // =====================================================================

    #[test]
    fn test_paid_with_id() {
        assert_eq!(
            extract("paid 3F2A9C1B"),
            Intent::UpdatePayment {
                invoice_id: Some("3f2a9c1b".to_string())
            }
        );
    }

    #[test]
    fn test_mark_as_paid() {
        assert_eq!(
            extract("mark invoice #ab12cd34 as paid"),
            Intent::UpdatePayment {
                invoice_id: Some("ab12cd34".to_string())
            }
        );
    }

    #[test]
    fn test_has_been_paid() {
        assert_eq!(
            extract("invoice 102 has been paid"),
            Intent::UpdatePayment {
                invoice_id: Some("102".to_string())
            }
        );
    }

    #[test]
    fn test_paid_without_id() {
        assert_eq!(extract("paid"), Intent::UpdatePayment { invoice_id: None });
        assert_eq!(
            extract("paid the invoice"),
            Intent::UpdatePayment { invoice_id: None }
        );
    }

    #[test]
    fn test_hex_word_id() {
        assert_eq!(
            extract("paid deadbeef"),
            Intent::UpdatePayment {
                invoice_id: Some("deadbeef".to_string())
            }
        );
    }

    // =====================================================================
    // Status
    // =====================================================================

    #[test]
    fn test_status_of_invoice() {
        assert_eq!(
            extract("status of invoice 3f2a9c1b"),
            Intent::CheckStatus {
                invoice_id: Some("3f2a9c1b".to_string())
            }
        );
    }

    #[test]
    fn test_status_without_id() {
        assert_eq!(extract("status"), Intent::CheckStatus { invoice_id: None });
    }

    #[test]
    fn test_status_phrasings() {
        assert_eq!(
            extract("what's the status of invoice 3f2a9c1b"),
            Intent::CheckStatus {
                invoice_id: Some("3f2a9c1b".to_string())
            }
        );
        assert_eq!(
            extract("can you give me the status 3f2a9c1b"),
            Intent::CheckStatus {
                invoice_id: Some("3f2a9c1b".to_string())
            }
        );
    }

    #[test]
    fn test_check_id() {
        assert_eq!(
            extract("check 3f2a9c1b"),
            Intent::CheckStatus {
                invoice_id: Some("3f2a9c1b".to_string())
            }
        );
    }

    // =====================================================================
    // Listing
    // =====================================================================

    #[test]
    fn test_list_variants() {
        for text in ["list invoices", "show all my invoices", "my invoices", "Invoices?", "list"] {
            assert_eq!(extract(text), Intent::ListInvoices, "text: {}", text);
        }
    }

    #[test]
    fn test_list_paid_invoices_is_not_payment() {
        assert_eq!(extract("list paid invoices"), Intent::ListInvoices);
    }

    // =====================================================================
    // Creation
    // =====================================================================

    #[test]
    fn test_create_with_rupee_symbol() {
        let req = request("Invoice to ABC Traders ₹15,000 for consulting due in 5 days");
        assert_eq!(req.customer_name.as_deref(), Some("ABC Traders"));
        assert_eq!(req.amount, Some(15000.0));
        assert_eq!(req.description.as_deref(), Some("consulting"));
        assert_eq!(req.due_date, Some(now() + Duration::days(5)));
    }

    #[test]
    fn test_create_amount_before_name() {
        let req = request("Invoice ₹15,000 to ABC Traders for consulting, due in 7 days");
        assert_eq!(req.customer_name.as_deref(), Some("ABC Traders"));
        assert_eq!(req.amount, Some(15000.0));
        assert_eq!(req.description.as_deref(), Some("consulting"));
        assert_eq!(req.due_date, Some(now() + Duration::days(7)));
    }

    #[test]
    fn test_create_mentioning_status_or_paid() {
        let req = request("Invoice ₹500 to Ravi for status report");
        assert_eq!(req.customer_name.as_deref(), Some("Ravi"));
        assert_eq!(req.amount, Some(500.0));
        assert_eq!(req.description.as_deref(), Some("status report"));

        let req = request("Invoice ₹2,000 to Ravi for website work that is paid on delivery");
        assert_eq!(req.amount, Some(2000.0));
        assert_eq!(
            req.description.as_deref(),
            Some("website work that is paid on delivery")
        );
    }

    #[test]
    fn test_currency_amount_is_never_an_id() {
        assert_eq!(
            extract("paid ₹500 for 3f2a9c1b"),
            Intent::UpdatePayment {
                invoice_id: Some("3f2a9c1b".to_string())
            }
        );
        assert_eq!(extract("paid Rs 500"), Intent::UpdatePayment { invoice_id: None });
    }

    #[test]
    fn test_create_with_amount_keyword() {
        let req = request("Create invoice for John Doe amount 150 for consultation");
        assert_eq!(req.customer_name.as_deref(), Some("John Doe"));
        assert_eq!(req.amount, Some(150.0));
        assert_eq!(req.description.as_deref(), Some("consultation"));
        assert!(req.due_date.is_none());
    }

    #[test]
    fn test_create_with_currency_words() {
        assert_eq!(request("bill Meera Rs. 2,500.50 for design").amount, Some(2500.5));
        assert_eq!(request("charge Sam $300").amount, Some(300.0));
        assert_eq!(request("charge Sam 300 USD").amount, Some(300.0));
        assert_eq!(request("charge Sam €75").amount, Some(75.0));
        assert_eq!(request("invoice Ravi INR 800").amount, Some(800.0));
    }

    #[test]
    fn test_amount_glued_to_letters_is_ignored() {
        assert_eq!(request("Invoice Ravi ₹1e400 for design").amount, None);
        assert_eq!(request("invoice Ravi ref A42 900").amount, Some(900.0));
    }

    #[test]
    fn test_currency_amount_alone_means_create() {
        let req = request("₹500 to Ravi Kumar");
        assert_eq!(req.amount, Some(500.0));
        assert_eq!(req.customer_name.as_deref(), Some("Ravi Kumar"));
    }

    #[test]
    fn test_bare_amount_skips_day_count_and_phone() {
        let req = request("invoice Ravi 9876543210 due in 10 days 4500");
        assert_eq!(req.amount, Some(4500.0));
        assert_eq!(req.customer_phone.as_deref(), Some("9876543210"));
    }

    #[test]
    fn test_iso_due_date() {
        let req = request("bill to Acme ₹100 due 2026-04-01");
        assert_eq!(
            req.due_date,
            Some(Utc.with_ymd_and_hms(2026, 4, 1, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_name_skips_currency_word() {
        let req = request("invoice for Rs 500");
        assert!(req.customer_name.is_none());
        assert_eq!(req.amount, Some(500.0));
    }

    #[test]
    fn test_create_without_fields() {
        let req = request("make an invoice");
        assert_eq!(req, InvoiceRequest::default());
    }

    // =====================================================================
    // Unknown
    // =====================================================================

    #[test]
    fn test_unknown_inputs() {
        for text in ["yes", "hello there", "", "   ", "what can you do?"] {
            assert_eq!(extract(text), Intent::Unknown, "text: {:?}", text);
        }
    }

    #[test]
    fn test_looks_like_id() {
        assert!(looks_like_id("3f2a9c1b"));
        assert!(looks_like_id("102"));
        assert!(looks_like_id("cafebabe"));
        assert!(!looks_like_id("invoice"));
        assert!(!looks_like_id("9876543210"));
    }
}
