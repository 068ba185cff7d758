//! Currency normalization: every persisted amount is expressed in BRL.

/// The single currency all persisted amounts are expressed in.
pub const CANONICAL_CURRENCY: &str = "BRL";

/// Result of normalizing an amount into the canonical currency.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Converted {
    pub amount_converted: f64,
    pub rate: f64,
}

/// Convert `amount` stated in `currency_code` using a pre-fetched rate.
///
/// The canonical currency (or a blank code) never converts: the rate is
/// exactly 1.0 and the amount passes through untouched, so no float drift
/// is introduced for the common case. Rate lookup failures are handled by
/// the caller passing `None`, which also falls back to 1.0: an
/// unavailable rate must never block a save.
pub fn convert(amount: f64, currency_code: &str, rate: Option<f64>) -> Converted {
    let code = currency_code.trim();
    if code.is_empty() || code.eq_ignore_ascii_case(CANONICAL_CURRENCY) {
        return Converted {
            amount_converted: amount,
            rate: 1.0,
        };
    }
    match rate {
        Some(r) if r > 0.0 => Converted {
            amount_converted: amount * r,
            rate: r,
        },
        _ => Converted {
            amount_converted: amount,
            rate: 1.0,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_currency_passes_through() {
        let c = convert(123.45, "BRL", Some(5.0));
        assert_eq!(c.rate, 1.0);
        assert_eq!(c.amount_converted, 123.45);
    }

    #[test]
    fn test_blank_code_means_canonical() {
        let c = convert(10.0, "", None);
        assert_eq!(c.rate, 1.0);
        assert_eq!(c.amount_converted, 10.0);
    }

    #[test]
    fn test_case_insensitive_code() {
        let c = convert(10.0, "brl", Some(2.0));
        assert_eq!(c.rate, 1.0);
    }

    #[test]
    fn test_foreign_currency_applies_rate() {
        let c = convert(30.0, "USD", Some(5.25));
        assert_eq!(c.rate, 5.25);
        assert!((c.amount_converted - 157.5).abs() < 1e-9);
    }

    #[test]
    fn test_missing_rate_falls_back_to_one() {
        let c = convert(30.0, "USD", None);
        assert_eq!(c.rate, 1.0);
        assert_eq!(c.amount_converted, 30.0);
    }

    #[test]
    fn test_nonsense_rate_falls_back_to_one() {
        let c = convert(30.0, "USD", Some(0.0));
        assert_eq!(c.rate, 1.0);
        assert_eq!(c.amount_converted, 30.0);
    }
}
