//! Pure catalog/order arithmetic: the order pricing policy, the shop page
//! price filter predicate, and review rating aggregation.

/// Order pricing breakdown computed at checkout.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrderPricing {
    pub items_price: f64,
    pub shipping_price: f64,
    pub tax_price: f64,
    pub total_price: f64,
}

const FREE_SHIPPING_THRESHOLD: f64 = 100.0;
const FLAT_SHIPPING_PRICE: f64 = 10.0;
const TAX_RATE: f64 = 0.15;

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Compute the pricing for a set of (unit_price, qty) line items.
///
/// Shipping is free above the threshold, otherwise a flat fee; tax is a
/// fixed rate on the items subtotal, rounded to cents.
pub fn compute_order_pricing(items: &[(f64, i32)]) -> OrderPricing {
    let items_price = round2(
        items
            .iter()
            .map(|(price, qty)| price * f64::from(*qty))
            .sum(),
    );
    let shipping_price = if items_price > FREE_SHIPPING_THRESHOLD {
        0.0
    } else {
        FLAT_SHIPPING_PRICE
    };
    let tax_price = round2(TAX_RATE * items_price);
    let total_price = round2(items_price + shipping_price + tax_price);

    OrderPricing {
        items_price,
        shipping_price,
        tax_price,
        total_price,
    }
}

/// Shop price filter predicate.
///
/// A product qualifies when the decimal-string form of its price contains
/// the typed filter, or when the price equals the filter parsed as an
/// integer. Both checks are applied, matching the storefront's behavior
/// exactly.
pub fn price_matches(price: f64, filter: &str) -> bool {
    if filter.is_empty() {
        return true;
    }
    if format_price(price).contains(filter) {
        return true;
    }
    filter
        .parse::<i64>()
        .is_ok_and(|n| price == n as f64)
}

/// Decimal-string form of a price, e.g. 299 -> "299", 19.99 -> "19.99".
fn format_price(price: f64) -> String {
    if price.fract() == 0.0 {
        format!("{}", price as i64)
    } else {
        let mut s = format!("{}", price);
        // Trim float noise like "19.990000000000002".
        if let Some(dot) = s.find('.') {
            let max = dot + 3;
            if s.len() > max {
                s.truncate(max);
            }
        }
        s
    }
}

/// Mean review rating rounded to one decimal, the display convention used
/// by the product pages. Zero reviews yields a rating of 0.
pub fn aggregate_rating(ratings: &[i32]) -> f64 {
    if ratings.is_empty() {
        return 0.0;
    }
    let sum: i32 = ratings.iter().sum();
    let mean = f64::from(sum) / ratings.len() as f64;
    (mean * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pricing_two_phones_at_299() {
        let pricing = compute_order_pricing(&[(299.0, 2)]);
        assert_eq!(pricing.items_price, 598.0);
        assert_eq!(pricing.shipping_price, 0.0);
        assert_eq!(pricing.tax_price, 89.7);
        assert_eq!(pricing.total_price, 687.7);
    }

    #[test]
    fn pricing_charges_flat_shipping_under_threshold() {
        let pricing = compute_order_pricing(&[(20.0, 2)]);
        assert_eq!(pricing.items_price, 40.0);
        assert_eq!(pricing.shipping_price, 10.0);
        assert_eq!(pricing.tax_price, 6.0);
        assert_eq!(pricing.total_price, 56.0);
    }

    #[test]
    fn pricing_threshold_is_exclusive() {
        // Exactly 100 still pays shipping.
        let pricing = compute_order_pricing(&[(100.0, 1)]);
        assert_eq!(pricing.shipping_price, 10.0);
    }

    #[test]
    fn pricing_sums_multiple_lines() {
        let pricing = compute_order_pricing(&[(10.0, 3), (5.5, 2)]);
        assert_eq!(pricing.items_price, 41.0);
    }

    #[test]
    fn price_filter_matches_substring() {
        assert!(price_matches(299.0, "29"));
        assert!(price_matches(299.0, "99"));
        assert!(!price_matches(299.0, "30"));
    }

    #[test]
    fn price_filter_matches_exact_integer() {
        assert!(price_matches(299.0, "299"));
        assert!(!price_matches(299.5, "300"));
    }

    #[test]
    fn price_filter_handles_decimals() {
        assert!(price_matches(19.99, "9.9"));
        assert!(price_matches(19.99, "19.99"));
        assert!(!price_matches(19.99, "20"));
    }

    #[test]
    fn empty_filter_matches_everything() {
        assert!(price_matches(1.0, ""));
    }

    #[test]
    fn rating_mean_rounds_to_one_decimal() {
        assert_eq!(aggregate_rating(&[]), 0.0);
        assert_eq!(aggregate_rating(&[4]), 4.0);
        assert_eq!(aggregate_rating(&[4, 5]), 4.5);
        assert_eq!(aggregate_rating(&[3, 4, 4]), 3.7);
        assert_eq!(aggregate_rating(&[1, 2]), 1.5);
    }
}
