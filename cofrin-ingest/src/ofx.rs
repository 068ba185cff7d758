//! OFX statement parser (1.x SGML and 2.x XML tag soup).
//!
//! Only the subset the pipeline needs: STMTTRN entries from the bank or
//! credit-card message sets. OFX carries no category, so everything lands
//! in "Bancário"; the posted-amount sign decides expense vs income.

use chrono::NaiveDate;
use cofrin_core::{TransactionCandidate, TransactionKind};

use crate::types::{ParseError, ParsedDocument};

/// Parse an OFX document into candidates.
///
/// Zero extracted transactions yields `ParseError::NoTransactions` so the
/// caller can tell the user, instead of silently saving nothing.
pub fn parse_ofx(content: &str) -> Result<ParsedDocument, ParseError> {
    let body = extract_ofx_body(content);
    let upper = body.to_ascii_uppercase();

    if !upper.contains("<OFX>") && !upper.contains("<STMTTRN") {
        return Err(ParseError::InvalidDocument(
            "missing <OFX> envelope".to_string(),
        ));
    }

    let mut transactions = Vec::new();
    for block in stmt_blocks(body, &upper) {
        if let Some(tx) = parse_stmttrn(block) {
            transactions.push(tx);
        }
    }

    if transactions.is_empty() {
        return Err(ParseError::NoTransactions);
    }

    Ok(ParsedDocument {
        transactions,
        // An OFX file is an account statement, not an invoice.
        invoice_total: None,
        invoice_due_date: None,
    })
}

/// Skip the OFX 1.x key:value header lines, if present.
fn extract_ofx_body(content: &str) -> &str {
    match content.to_ascii_uppercase().find("<OFX>") {
        Some(pos) => &content[pos..],
        None => content,
    }
}

/// Slice out each STMTTRN aggregate. SGML statements may omit closing
/// tags, so a block runs until its close tag or the next open tag.
fn stmt_blocks<'a>(body: &'a str, upper: &str) -> Vec<&'a str> {
    const OPEN: &str = "<STMTTRN>";
    const CLOSE: &str = "</STMTTRN>";

    let mut blocks = Vec::new();
    let mut at = 0;
    while let Some(rel) = upper[at..].find(OPEN) {
        let start = at + rel + OPEN.len();
        let close = upper[start..].find(CLOSE).map(|p| start + p);
        let next_open = upper[start..].find(OPEN).map(|p| start + p);
        let end = match (close, next_open) {
            (Some(c), Some(n)) => c.min(n),
            (Some(c), None) => c,
            (None, Some(n)) => n,
            (None, None) => body.len(),
        };
        blocks.push(&body[start..end]);
        at = end;
    }
    blocks
}

fn parse_stmttrn(block: &str) -> Option<TransactionCandidate> {
    let amount_raw = tag_value(block, "TRNAMT")?;
    let amount: f64 = amount_raw.replace(',', ".").parse().ok()?;
    if amount == 0.0 {
        return None;
    }

    // DTPOSTED carries YYYYMMDD plus an optional time/zone suffix.
    let posted = tag_value(block, "DTPOSTED")?;
    let date = posted
        .get(..8)
        .and_then(|d| NaiveDate::parse_from_str(d, "%Y%m%d").ok())?;

    let description = tag_value(block, "MEMO")
        .or_else(|| tag_value(block, "NAME"))
        .unwrap_or_else(|| "Transação OFX".to_string());

    Some(TransactionCandidate {
        description,
        amount: amount.abs(),
        currency_code: String::new(),
        category: "Bancário".to_string(),
        kind: if amount < 0.0 {
            TransactionKind::Expense
        } else {
            TransactionKind::Income
        },
        date,
        raw_source_id: tag_value(block, "FITID"),
    })
}

/// Value of a leaf tag: the text after `<TAG>` up to the next `<` or
/// end of line. Empty values count as absent.
fn tag_value(block: &str, tag: &str) -> Option<String> {
    let upper = block.to_ascii_uppercase();
    let open = format!("<{tag}>");
    let start = upper.find(&open)? + open.len();
    let rest = &block[start..];
    let end = rest.find(['<', '\r', '\n']).unwrap_or(rest.len());
    let value = rest[..end].trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BANK_OFX: &str = "OFXHEADER:100\nDATA:OFXSGML\n\
        <OFX>\n<BANKMSGSRSV1>\n<STMTTRNRS>\n<STMTRS>\n<BANKTRANLIST>\n\
        <STMTTRN>\n<TRNTYPE>DEBIT\n<DTPOSTED>20240310120000[-3:BRT]\n<TRNAMT>-45.00\n<FITID>ABC123\n<MEMO>Padaria do Zé\n</STMTTRN>\n\
        <STMTTRN>\n<TRNTYPE>CREDIT\n<DTPOSTED>20240311\n<TRNAMT>1500.00\n<FITID>DEF456\n<MEMO>Salário\n</STMTTRN>\n\
        </BANKTRANLIST>\n</STMTRS>\n</STMTTRNRS>\n</BANKMSGSRSV1>\n</OFX>";

    #[test]
    fn test_debit_entry_becomes_expense() {
        let doc = parse_ofx(BANK_OFX).unwrap();
        let tx = &doc.transactions[0];
        assert_eq!(tx.amount, 45.0);
        assert_eq!(tx.kind, TransactionKind::Expense);
        assert_eq!(tx.date, NaiveDate::from_ymd_opt(2024, 3, 10).unwrap());
        assert_eq!(tx.category, "Bancário");
        assert_eq!(tx.description, "Padaria do Zé");
        assert_eq!(tx.raw_source_id.as_deref(), Some("ABC123"));
    }

    #[test]
    fn test_credit_entry_becomes_income() {
        let doc = parse_ofx(BANK_OFX).unwrap();
        let tx = &doc.transactions[1];
        assert_eq!(tx.amount, 1500.0);
        assert_eq!(tx.kind, TransactionKind::Income);
    }

    #[test]
    fn test_statement_is_not_an_invoice() {
        let doc = parse_ofx(BANK_OFX).unwrap();
        assert!(doc.invoice_total.is_none());
        assert!(doc.invoice_due_date.is_none());
    }

    #[test]
    fn test_credit_card_message_set() {
        let ofx = "<OFX><CREDITCARDMSGSRSV1><CCSTMTTRNRS><CCSTMTRS><BANKTRANLIST>\
            <STMTTRN><DTPOSTED>20240401<TRNAMT>-99.90<FITID>X1<MEMO>Streaming\
            </BANKTRANLIST></CCSTMTRS></CCSTMTTRNRS></CREDITCARDMSGSRSV1></OFX>";
        let doc = parse_ofx(ofx).unwrap();
        assert_eq!(doc.transactions.len(), 1);
        assert_eq!(doc.transactions[0].amount, 99.9);
        assert_eq!(doc.transactions[0].kind, TransactionKind::Expense);
    }

    #[test]
    fn test_sgml_without_closing_tags() {
        let ofx = "<OFX><BANKTRANLIST>\
            <STMTTRN><DTPOSTED>20240501<TRNAMT>-10.00<FITID>A<MEMO>Um\
            <STMTTRN><DTPOSTED>20240502<TRNAMT>-20.00<FITID>B<MEMO>Dois\
            </BANKTRANLIST></OFX>";
        let doc = parse_ofx(ofx).unwrap();
        assert_eq!(doc.transactions.len(), 2);
        assert_eq!(doc.transactions[0].description, "Um");
        assert_eq!(doc.transactions[1].description, "Dois");
    }

    #[test]
    fn test_missing_memo_falls_back() {
        let ofx = "<OFX><STMTTRN><DTPOSTED>20240501<TRNAMT>-10.00<FITID>A</STMTTRN></OFX>";
        let doc = parse_ofx(ofx).unwrap();
        assert_eq!(doc.transactions[0].description, "Transação OFX");
    }

    #[test]
    fn test_empty_statement_is_reportable() {
        let ofx = "<OFX><BANKTRANLIST></BANKTRANLIST></OFX>";
        assert!(matches!(parse_ofx(ofx), Err(ParseError::NoTransactions)));
    }

    #[test]
    fn test_garbage_is_invalid_document() {
        assert!(matches!(
            parse_ofx("isto não é um OFX"),
            Err(ParseError::InvalidDocument(_))
        ));
    }
}
