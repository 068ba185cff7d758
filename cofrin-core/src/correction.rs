//! Deterministic correction/cancellation grammar over a single utterance.
//!
//! The oracle resolves corrections in natural language; this module is the
//! local, testable counterpart used as a guardrail over its output. It reads
//! the utterance left to right: a correction marker invalidates the amount
//! immediately before it only when a replacement amount follows closely, and
//! a cancellation phrase anywhere nullifies the whole turn.

use regex::Regex;
use std::sync::LazyLock;

static AMOUNT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+(?:[.,]\d+)?").expect("amount regex"));

static MARKER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:quer dizer|digo|minto|espera|na verdade|ali[áa]s|n[ãa]o)\b")
        .expect("marker regex")
});

static CANCEL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?x)
        \besquece\b
        | \bdeixa\s+pra\s+l[áa]\b
        | \bdeixa\s+quieto\b
        | \bn[ãa]o\s+(?:vou\s+)?anotar?\s+nada\b
        | \bn[ãa]o\s+registra\s+nada\b
        | \bcancela(?:r)?\s+tudo\b
        | \bnem\s+anota\b
        ",
    )
    .expect("cancel regex")
});

/// How close (in chars) a replacement amount must follow a marker for the
/// marker to count as a genuine correction.
const CORRECTION_WINDOW: usize = 20;

/// Outcome of the local pass over one utterance.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    /// The user called the whole thing off; record nothing.
    pub cancelled: bool,
    /// Surviving amounts, in stated order, after corrections applied.
    pub amounts: Vec<f64>,
}

/// Resolve corrections and cancellations in `text`.
///
/// "20, quer dizer, 30" keeps 30. "não me arrependi" is sentiment, not a
/// correction, because no amount follows the negation. Chained corrections
/// apply sequentially, so the last stated value wins.
pub fn resolve_utterance(text: &str) -> Resolution {
    let lower = text.to_lowercase();

    if CANCEL_RE.is_match(&lower) {
        return Resolution {
            cancelled: true,
            amounts: Vec::new(),
        };
    }

    // (start, value, alive)
    let mut amounts: Vec<(usize, f64, bool)> = AMOUNT_RE
        .find_iter(&lower)
        .filter_map(|m| {
            let v: f64 = m.as_str().replace(',', ".").parse().ok()?;
            Some((m.start(), v, true))
        })
        .collect();

    for marker in MARKER_RE.find_iter(&lower) {
        let follows = amounts
            .iter()
            .any(|(pos, _, _)| *pos >= marker.end() && pos - marker.end() <= CORRECTION_WINDOW);
        if !follows {
            // Negation with no replacement amount: not a correction.
            continue;
        }
        // Invalidate the nearest still-alive amount before the marker.
        if let Some(prev) = amounts
            .iter_mut()
            .rev()
            .find(|(pos, _, alive)| *alive && *pos < marker.start())
        {
            prev.2 = false;
        }
    }

    Resolution {
        cancelled: false,
        amounts: amounts
            .into_iter()
            .filter(|(_, _, alive)| *alive)
            .map(|(_, v, _)| v)
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_correction_keeps_last_value() {
        let r = resolve_utterance("Era 20 reais, quer dizer, 30.");
        assert!(!r.cancelled);
        assert_eq!(r.amounts, vec![30.0]);
    }

    #[test]
    fn test_total_cancellation() {
        let r = resolve_utterance("Gastei 50... ah, esquece, não vou anotar nada hoje.");
        assert!(r.cancelled);
        assert!(r.amounts.is_empty());
    }

    #[test]
    fn test_chained_corrections_last_wins() {
        let r = resolve_utterance("10 no Uber, não, 15, não, 20 porque dei gorjeta.");
        assert!(!r.cancelled);
        assert_eq!(r.amounts, vec![20.0]);
    }

    #[test]
    fn test_false_correction_keeps_amount() {
        let r = resolve_utterance("Gastei 50 no almoço e não me arrependi.");
        assert!(!r.cancelled);
        assert_eq!(r.amounts, vec![50.0]);
    }

    #[test]
    fn test_negated_comment_keeps_amount() {
        let r = resolve_utterance("Paguei 120 na consulta, não foi caro.");
        assert!(!r.cancelled);
        assert_eq!(r.amounts, vec![120.0]);
    }

    #[test]
    fn test_multiple_items_survive() {
        let r = resolve_utterance("10 de pão, 20 de uber");
        assert_eq!(r.amounts, vec![10.0, 20.0]);
    }

    #[test]
    fn test_correction_in_multi_item_utterance() {
        let r = resolve_utterance("Foi 20 no mercado, aliás 25, e 30 de gasolina");
        assert_eq!(r.amounts, vec![25.0, 30.0]);
    }

    #[test]
    fn test_decimal_amounts() {
        let r = resolve_utterance("Café custou 10,50, digo, 12,75");
        assert_eq!(r.amounts, vec![12.75]);
    }

    #[test]
    fn test_no_amounts_at_all() {
        let r = resolve_utterance("Abacaxi");
        assert!(!r.cancelled);
        assert!(r.amounts.is_empty());
    }

    #[test]
    fn test_cancellation_without_prior_amount() {
        let r = resolve_utterance("esquece o que eu disse");
        assert!(r.cancelled);
    }
}
