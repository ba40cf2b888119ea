//! Document aggregation: subtotal, tax, global discount, withholding,
//! VAT retention, total and contravalue.
//!
//! ```text
//! subtotal    = Σ line total
//! tax         = Σ line total × line tax rate / 100
//! withholding = has_withholding ? subtotal × 6.5% : 0
//! retention   = NONE: 0 | CAT_50: tax × 50% | CAT_100: tax
//! total       = subtotal + tax − subtotal × global discount / 100 − withholding − retention
//! contravalue = total × exchange rate
//! ```
//!
//! The total is not clamped: retention or withholding larger than
//! `subtotal + tax` yields a negative figure, which is returned as-is.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use kwanza_core::{DomainResult, Money, Rate};

use crate::currency::{Currency, ExchangeRate};
use crate::line::DocumentLine;

/// VAT retention ("cativação") category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RetentionCategory {
    #[default]
    #[serde(rename = "NONE")]
    None,
    #[serde(rename = "CAT_50")]
    Cat50,
    #[serde(rename = "CAT_100")]
    Cat100,
}

impl RetentionCategory {
    /// Portion of the tax amount that is retained.
    pub fn retained(&self, tax_amount: Money) -> Money {
        match self {
            RetentionCategory::None => Money::ZERO,
            RetentionCategory::Cat50 => tax_amount.scale(Decimal::new(5, 1)),
            RetentionCategory::Cat100 => tax_amount,
        }
    }
}

/// Withholding-at-source rule for service sales.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithholdingPolicy {
    pub rate: Rate,
    /// Subtotal that must be strictly exceeded, in document currency units.
    pub threshold: Money,
}

impl WithholdingPolicy {
    pub const DEFAULT_RATE_POINTS: Decimal = Decimal::from_parts(65, 0, 0, false, 1);
    pub const DEFAULT_THRESHOLD: Decimal = Decimal::from_parts(20_000, 0, 0, false, 0);

    /// True when at least one line is a service and `subtotal > threshold`.
    pub fn applies(&self, lines: &[DocumentLine], subtotal: Money) -> bool {
        lines.iter().any(DocumentLine::is_service) && subtotal > self.threshold
    }

    pub fn amount(&self, subtotal: Money) -> Money {
        subtotal.percent(self.rate)
    }
}

impl Default for WithholdingPolicy {
    fn default() -> Self {
        Self {
            rate: Rate::percent(Self::DEFAULT_RATE_POINTS),
            threshold: Money::new(Self::DEFAULT_THRESHOLD),
        }
    }
}

/// Document-level modifiers applied on top of the line set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentModifiers {
    #[serde(default)]
    pub global_discount: Rate,
    #[serde(default)]
    pub currency: Currency,
    #[serde(default)]
    pub exchange_rate: ExchangeRate,
    #[serde(default)]
    pub retention: RetentionCategory,
}

impl DocumentModifiers {
    pub fn validate(&self) -> DomainResult<()> {
        self.global_discount.ensure_bounded("global discount")
    }
}

/// Derived document figures. Never stored on their own; always recomputed
/// from the lines and modifiers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentTotals {
    pub subtotal: Money,
    pub tax_amount: Money,
    pub global_discount_amount: Money,
    pub withholding_amount: Money,
    pub retention_amount: Money,
    pub total: Money,
    pub contra_value: Money,
}

impl DocumentTotals {
    /// Every figure rounded to currency precision, for presentation.
    pub fn rounded(&self) -> DocumentTotals {
        DocumentTotals {
            subtotal: self.subtotal.rounded(),
            tax_amount: self.tax_amount.rounded(),
            global_discount_amount: self.global_discount_amount.rounded(),
            withholding_amount: self.withholding_amount.rounded(),
            retention_amount: self.retention_amount.rounded(),
            total: self.total.rounded(),
            contra_value: self.contra_value.rounded(),
        }
    }

    pub fn is_negative(&self) -> bool {
        self.total.is_negative()
    }
}

/// Applies the aggregation rules with a configurable withholding policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DocumentAggregator {
    policy: WithholdingPolicy,
}

impl DocumentAggregator {
    pub fn new(policy: WithholdingPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &WithholdingPolicy {
        &self.policy
    }

    pub fn subtotal(&self, lines: &[DocumentLine]) -> Money {
        lines.iter().map(DocumentLine::total).sum()
    }

    pub fn tax_amount(&self, lines: &[DocumentLine]) -> Money {
        lines.iter().map(DocumentLine::tax).sum()
    }

    /// Withholding flag derived from the current line set.
    pub fn derive_withholding(&self, lines: &[DocumentLine]) -> bool {
        self.policy.applies(lines, self.subtotal(lines))
    }

    pub fn aggregate(
        &self,
        lines: &[DocumentLine],
        global_discount: Rate,
        has_withholding: bool,
        retention: RetentionCategory,
        exchange_rate: ExchangeRate,
    ) -> DocumentTotals {
        let subtotal = self.subtotal(lines);
        let tax_amount = self.tax_amount(lines);
        let global_discount_amount = subtotal.percent(global_discount);
        let withholding_amount = if has_withholding {
            self.policy.amount(subtotal)
        } else {
            Money::ZERO
        };
        let retention_amount = retention.retained(tax_amount);

        let total =
            subtotal + tax_amount - global_discount_amount - withholding_amount - retention_amount;
        let contra_value = exchange_rate.convert(total);

        tracing::trace!(
            lines = lines.len(),
            %subtotal,
            %tax_amount,
            %total,
            "aggregated document"
        );

        DocumentTotals {
            subtotal,
            tax_amount,
            global_discount_amount,
            withholding_amount,
            retention_amount,
            total,
            contra_value,
        }
    }

    pub fn aggregate_with(
        &self,
        lines: &[DocumentLine],
        modifiers: &DocumentModifiers,
        has_withholding: bool,
    ) -> DocumentTotals {
        self.aggregate(
            lines,
            modifiers.global_discount,
            has_withholding,
            modifiers.retention,
            modifiers.exchange_rate,
        )
    }

    /// Aggregate with the withholding flag derived from the lines.
    pub fn aggregate_derived(
        &self,
        lines: &[DocumentLine],
        modifiers: &DocumentModifiers,
    ) -> (bool, DocumentTotals) {
        let has_withholding = self.derive_withholding(lines);
        (has_withholding, self.aggregate_with(lines, modifiers, has_withholding))
    }
}

/// Aggregate a document with the default 6.5% withholding rate.
pub fn compute_document_totals(
    lines: &[DocumentLine],
    global_discount: Rate,
    has_withholding: bool,
    retention: RetentionCategory,
    exchange_rate: ExchangeRate,
) -> DocumentTotals {
    DocumentAggregator::default().aggregate(
        lines,
        global_discount,
        has_withholding,
        retention,
        exchange_rate,
    )
}

/// Withholding flag for a line set whose subtotal is already known.
pub fn derive_withholding(
    lines: &[DocumentLine],
    subtotal: Money,
    policy: &WithholdingPolicy,
) -> bool {
    policy.applies(lines, subtotal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::line::LineKind;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn line(qty: Decimal, price: Decimal, tax: Decimal, kind: LineKind) -> DocumentLine {
        DocumentLine::new(
            1,
            qty,
            Money::new(price),
            Rate::ZERO,
            Rate::percent(tax),
            kind,
        )
    }

    #[test]
    fn single_product_line_example() {
        let lines = vec![line(dec!(3), dec!(1000), dec!(14), LineKind::Product)];
        let totals = compute_document_totals(
            &lines,
            Rate::ZERO,
            false,
            RetentionCategory::None,
            ExchangeRate::ONE,
        );
        assert_eq!(totals.subtotal, Money::from(3000));
        assert_eq!(totals.tax_amount, Money::from(420));
        assert_eq!(totals.total, Money::from(3420));
        assert_eq!(totals.contra_value, Money::from(3420));
    }

    #[test]
    fn service_above_threshold_activates_withholding() {
        let lines = vec![line(dec!(1), dec!(25000), dec!(0), LineKind::Service)];
        let aggregator = DocumentAggregator::default();
        let (flag, totals) = aggregator.aggregate_derived(&lines, &DocumentModifiers::default());
        assert!(flag);
        assert_eq!(totals.withholding_amount, Money::from(1625));
        assert_eq!(totals.total, Money::from(25000 - 1625));
    }

    #[test]
    fn service_below_threshold_has_no_withholding() {
        let lines = vec![line(dec!(1), dec!(15000), dec!(14), LineKind::Service)];
        let aggregator = DocumentAggregator::default();
        assert!(!aggregator.derive_withholding(&lines));
        let (_, totals) = aggregator.aggregate_derived(&lines, &DocumentModifiers::default());
        assert!(totals.withholding_amount.is_zero());
    }

    #[test]
    fn threshold_is_strict() {
        let lines = vec![line(dec!(2), dec!(10000), dec!(14), LineKind::Service)];
        assert!(!derive_withholding(
            &lines,
            Money::from(20000),
            &WithholdingPolicy::default()
        ));
    }

    #[test]
    fn products_only_never_withhold() {
        let lines = vec![line(dec!(1), dec!(90000), dec!(14), LineKind::Product)];
        assert!(!DocumentAggregator::default().derive_withholding(&lines));
    }

    #[test]
    fn retention_categories() {
        let tax = Money::from(1400);
        assert_eq!(RetentionCategory::None.retained(tax), Money::ZERO);
        assert_eq!(RetentionCategory::Cat50.retained(tax), Money::from(700));
        assert_eq!(RetentionCategory::Cat100.retained(tax), Money::from(1400));
    }

    #[test]
    fn global_discount_applies_to_subtotal_only() {
        let lines = vec![line(dec!(10), dec!(1000), dec!(14), LineKind::Product)];
        let totals = compute_document_totals(
            &lines,
            Rate::percent(dec!(10)),
            false,
            RetentionCategory::None,
            ExchangeRate::ONE,
        );
        // 10000 + 1400 − 1000
        assert_eq!(totals.global_discount_amount, Money::from(1000));
        assert_eq!(totals.total, Money::from(10400));
    }

    #[test]
    fn full_stack_with_currency() {
        let lines = vec![
            line(dec!(1), dec!(30000), dec!(14), LineKind::Service),
            line(dec!(2), dec!(500), dec!(14), LineKind::Product),
        ];
        let modifiers = DocumentModifiers {
            global_discount: Rate::percent(dec!(5)),
            currency: Currency::new("USD"),
            exchange_rate: ExchangeRate::new(dec!(850)).unwrap(),
            retention: RetentionCategory::Cat50,
        };
        let (flag, totals) = DocumentAggregator::default().aggregate_derived(&lines, &modifiers);
        assert!(flag);
        assert_eq!(totals.subtotal, Money::from(31000));
        assert_eq!(totals.tax_amount, Money::from(4340));
        assert_eq!(totals.global_discount_amount, Money::from(1550));
        assert_eq!(totals.withholding_amount, Money::from(2015));
        assert_eq!(totals.retention_amount, Money::from(2170));
        // 31000 + 4340 − 1550 − 2015 − 2170
        assert_eq!(totals.total, Money::from(29605));
        assert_eq!(totals.contra_value, Money::from(29605 * 850));
    }

    #[test]
    fn negative_total_is_not_clamped() {
        let lines = vec![line(dec!(1), dec!(100), dec!(14), LineKind::Product)];
        let totals = compute_document_totals(
            &lines,
            Rate::HUNDRED,
            false,
            RetentionCategory::Cat100,
            ExchangeRate::ONE,
        );
        // 100 + 14 − 100 − 14
        assert!(totals.total.is_zero());

        let totals = compute_document_totals(
            &lines,
            Rate::HUNDRED,
            true,
            RetentionCategory::Cat100,
            ExchangeRate::ONE,
        );
        assert!(totals.is_negative());
        assert_eq!(totals.total, Money::new(dec!(-6.5)));
    }

    #[test]
    fn empty_document_is_all_zero() {
        let totals = compute_document_totals(
            &[],
            Rate::ZERO,
            false,
            RetentionCategory::None,
            ExchangeRate::ONE,
        );
        assert_eq!(totals, DocumentTotals::default());
    }

    #[test]
    fn rounded_totals_round_each_figure() {
        let lines = vec![line(dec!(1), dec!(0.333), dec!(14), LineKind::Product)];
        let totals = compute_document_totals(
            &lines,
            Rate::ZERO,
            false,
            RetentionCategory::None,
            ExchangeRate::ONE,
        );
        assert_eq!(totals.tax_amount.amount(), dec!(0.04662));
        let rounded = totals.rounded();
        assert_eq!(rounded.subtotal.amount(), dec!(0.33));
        assert_eq!(rounded.tax_amount.amount(), dec!(0.05));
        assert_eq!(rounded.total.amount(), dec!(0.38));
    }

    #[test]
    fn retention_category_serde_codes() {
        let json = serde_json::to_string(&RetentionCategory::Cat50).unwrap();
        assert_eq!(json, "\"CAT_50\"");
        let parsed: RetentionCategory = serde_json::from_str("\"CAT_100\"").unwrap();
        assert_eq!(parsed, RetentionCategory::Cat100);
    }

    fn arb_line() -> impl Strategy<Value = DocumentLine> {
        (
            1u32..100u32,
            0i64..5_000_000i64,
            0u32..=100u32,
            prop_oneof![Just(0u32), Just(7u32), Just(14u32)],
            any::<bool>(),
        )
            .prop_map(|(qty, cents, discount, tax, service)| {
                DocumentLine::new(
                    1,
                    Decimal::from(qty),
                    Money::new(Decimal::new(cents, 2)),
                    Rate::percent(Decimal::from(discount)),
                    Rate::percent(Decimal::from(tax)),
                    if service {
                        LineKind::Service
                    } else {
                        LineKind::Product
                    },
                )
            })
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: aggregating the same inputs twice yields identical totals.
        #[test]
        fn aggregation_is_idempotent(
            lines in prop::collection::vec(arb_line(), 0..12),
            discount in 0u32..=100u32,
            retention in prop_oneof![
                Just(RetentionCategory::None),
                Just(RetentionCategory::Cat50),
                Just(RetentionCategory::Cat100),
            ],
        ) {
            let modifiers = DocumentModifiers {
                global_discount: Rate::percent(Decimal::from(discount)),
                retention,
                ..DocumentModifiers::default()
            };
            let aggregator = DocumentAggregator::default();
            let first = aggregator.aggregate_derived(&lines, &modifiers);

            let snapshot = serde_json::to_string(&lines).unwrap();
            let restored: Vec<DocumentLine> = serde_json::from_str(&snapshot).unwrap();
            let second = aggregator.aggregate_derived(&restored, &modifiers);

            prop_assert_eq!(first, second);
        }

        /// Property: the total identity holds for every input.
        #[test]
        fn total_identity(
            lines in prop::collection::vec(arb_line(), 1..12),
            has_withholding in any::<bool>(),
        ) {
            let t = compute_document_totals(
                &lines,
                Rate::ZERO,
                has_withholding,
                RetentionCategory::Cat50,
                ExchangeRate::ONE,
            );
            prop_assert_eq!(
                t.total,
                t.subtotal + t.tax_amount - t.withholding_amount - t.retention_amount
            );
            prop_assert_eq!(t.retention_amount.scale(Decimal::TWO), t.tax_amount);
        }
    }
}
