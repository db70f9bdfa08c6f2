use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::errors::BookingError;
use crate::models::booking::{
    BookedExtra, DepositInfo, DepositStatus, ExtraSelection, GuestCounts, InsuranceSelection,
    PriceBreakdown, TaxInfo,
};
use crate::models::vehicle::{PriceType, VehicleExtra, VehiclePricing};
use crate::services::insurance;

const MS_PER_DAY: i64 = 86_400_000;

pub struct PricingService;

impl PricingService {
    /// Rental length in calendar days, partial days rounded up. Always >= 1
    /// for a valid range.
    pub fn number_of_days(start: DateTime<Utc>, end: DateTime<Utc>) -> i64 {
        let ms = (end - start).num_milliseconds();
        (ms + MS_PER_DAY - 1).div_euclid(MS_PER_DAY)
    }

    /// Long-rental discount: 10% of the subtotal from 7 days, 20% from 30
    /// days. The monthly rate replaces the weekly one rather than stacking
    /// on top of it, and both are taken from the undiscounted subtotal.
    pub fn long_rental_discount(subtotal: Decimal, number_of_days: i64) -> Decimal {
        if number_of_days >= 30 {
            subtotal * Decimal::new(20, 2)
        } else if number_of_days >= 7 {
            subtotal * Decimal::new(10, 2)
        } else {
            Decimal::ZERO
        }
    }

    /// Price the selected extras against the vehicle's catalog. Selections
    /// that don't match a catalog entry are dropped with a warning, never
    /// an error.
    pub fn price_extras(
        catalog: &[VehicleExtra],
        selections: &[ExtraSelection],
        number_of_days: i64,
        total_guests: u32,
    ) -> (Vec<BookedExtra>, Decimal) {
        let mut booked = Vec::new();
        let mut extras_total = Decimal::ZERO;

        for selection in selections {
            let Some(item) = catalog.iter().find(|e| e.name == selection.name) else {
                log::warn!(
                    "extra '{}' not in vehicle catalog, ignoring",
                    selection.name
                );
                continue;
            };

            let multiplier = match item.price_type {
                PriceType::PerDay => Decimal::from(number_of_days),
                PriceType::PerRental => Decimal::ONE,
                PriceType::PerPerson => Decimal::from(total_guests),
            };
            let total = item.price * Decimal::from(selection.quantity) * multiplier;
            extras_total += total;

            booked.push(BookedExtra {
                name: item.name.clone(),
                price: item.price,
                quantity: selection.quantity,
                price_type: item.price_type,
                total: total.round_dp(2),
            });
        }

        (booked, extras_total)
    }

    /// Compute the full itemized quote for a candidate rental.
    ///
    /// Pure and deterministic: identical input yields a bit-identical
    /// breakdown. All arithmetic runs unrounded in decimal; amounts are
    /// rounded to two places only when the breakdown is sealed, so the
    /// discount/fee/tax chain never compounds rounding error.
    pub fn compute_quote(
        pricing: &VehiclePricing,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        guests: &GuestCounts,
        extras: &[ExtraSelection],
        insurance_type: &str,
    ) -> Result<PriceBreakdown, BookingError> {
        if end <= start {
            return Err(BookingError::validation("end date must be after start date"));
        }
        if guests.adults < 1 {
            return Err(BookingError::validation("at least one adult is required"));
        }

        let number_of_days = Self::number_of_days(start, end);
        let days = Decimal::from(number_of_days);
        let total_guests = guests.adults + guests.children;

        let subtotal = pricing.base_price_per_day * days;
        let discount = Self::long_rental_discount(subtotal, number_of_days);

        let (booked_extras, extras_total) =
            Self::price_extras(&pricing.extras, extras, number_of_days, total_guests);

        let tier = insurance::tier(insurance::parse_type(insurance_type));
        let insurance_price = tier.price * days;

        // 5% service fee on the discounted rental price plus extras;
        // insurance and cleaning are exempt.
        let service_fee = (subtotal - discount + extras_total) * Decimal::new(5, 2);
        let cleaning_fee = pricing.cleaning_fee;

        let taxable_amount =
            subtotal - discount + extras_total + insurance_price + service_fee + cleaning_fee;
        let tax_rate = Decimal::new(19, 2); // German VAT
        let tax_amount = taxable_amount * tax_rate;
        let total_amount = taxable_amount + tax_amount;

        Ok(PriceBreakdown {
            daily_rate: pricing.base_price_per_day,
            number_of_days,
            subtotal: subtotal.round_dp(2),
            discount: discount.round_dp(2),
            extras: booked_extras,
            extras_total: extras_total.round_dp(2),
            insurance: InsuranceSelection {
                insurance_type: tier.insurance_type,
                price: insurance_price.round_dp(2),
                deductible: tier.deductible,
            },
            service_fee: service_fee.round_dp(2),
            cleaning_fee: cleaning_fee.round_dp(2),
            deposit: DepositInfo {
                amount: pricing.deposit,
                status: DepositStatus::Pending,
                release_amount: None,
                forfeit_reason: None,
            },
            taxable_amount: taxable_amount.round_dp(2),
            taxes: TaxInfo {
                rate: tax_rate,
                amount: tax_amount.round_dp(2),
            },
            total_amount: total_amount.round_dp(2),
            currency: "EUR".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::booking::InsuranceType;
    use crate::models::vehicle::MileagePolicy;
    use chrono::TimeZone;
    use rand::Rng;

    fn pricing(base_per_day: i64, cleaning: i64) -> VehiclePricing {
        VehiclePricing {
            base_price_per_day: Decimal::from(base_per_day),
            deposit: Decimal::from(1000),
            cleaning_fee: Decimal::from(cleaning),
            mileage: MileagePolicy::default(),
            extras: vec![
                VehicleExtra {
                    name: "Bed linen".to_string(),
                    price: Decimal::from(12),
                    price_type: PriceType::PerPerson,
                    max_quantity: Some(6),
                },
                VehicleExtra {
                    name: "Camping table".to_string(),
                    price: Decimal::from(25),
                    price_type: PriceType::PerRental,
                    max_quantity: Some(1),
                },
                VehicleExtra {
                    name: "Bike rack".to_string(),
                    price: Decimal::from(5),
                    price_type: PriceType::PerDay,
                    max_quantity: Some(2),
                },
            ],
        }
    }

    fn day(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, d, 0, 0, 0).unwrap()
    }

    fn guests(adults: u32, children: u32) -> GuestCounts {
        GuestCounts { adults, children }
    }

    #[test]
    fn test_number_of_days_ceiling() {
        assert_eq!(PricingService::number_of_days(day(1), day(11)), 10);
        assert_eq!(PricingService::number_of_days(day(1), day(2)), 1);
        // Partial days round up to a full day
        let start = Utc.with_ymd_and_hms(2025, 6, 1, 10, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2025, 6, 2, 22, 0, 0).unwrap();
        assert_eq!(PricingService::number_of_days(start, end), 2);
        let end = Utc.with_ymd_and_hms(2025, 6, 1, 10, 0, 1).unwrap();
        assert_eq!(PricingService::number_of_days(start, end), 1);
    }

    #[test]
    fn test_discount_tiers() {
        let subtotal = Decimal::from(600);
        assert_eq!(
            PricingService::long_rental_discount(subtotal, 6),
            Decimal::ZERO
        );
        assert_eq!(
            PricingService::long_rental_discount(subtotal, 7),
            Decimal::from(60)
        );
        // The monthly discount replaces the weekly one: 20% of the
        // undiscounted subtotal, not 10% + 20%.
        assert_eq!(
            PricingService::long_rental_discount(subtotal, 30),
            Decimal::from(120)
        );
    }

    #[test]
    fn test_reference_scenario() {
        // 100 EUR/day, 10 days, standard insurance, 50 EUR cleaning fee:
        // subtotal 1000, discount 100, insurance 250, service fee 45,
        // taxable 1245, tax 236.55, total 1481.55.
        let quote = PricingService::compute_quote(
            &pricing(100, 50),
            day(1),
            day(11),
            &guests(2, 0),
            &[],
            "standard",
        )
        .unwrap();

        assert_eq!(quote.number_of_days, 10);
        assert_eq!(quote.subtotal, Decimal::from(1000));
        assert_eq!(quote.discount, Decimal::from(100));
        assert_eq!(quote.extras_total, Decimal::ZERO);
        assert_eq!(quote.insurance.price, Decimal::from(250));
        assert_eq!(quote.service_fee, Decimal::from(45));
        assert_eq!(quote.cleaning_fee, Decimal::from(50));
        assert_eq!(quote.taxable_amount, Decimal::from(1245));
        assert_eq!(quote.taxes.amount, Decimal::new(23655, 2));
        assert_eq!(quote.total_amount, Decimal::new(148155, 2));
    }

    #[test]
    fn test_extras_multipliers() {
        // 4 days, 3 guests
        let selections = vec![
            ExtraSelection {
                name: "Bed linen".to_string(),
                quantity: 1,
            },
            ExtraSelection {
                name: "Camping table".to_string(),
                quantity: 1,
            },
            ExtraSelection {
                name: "Bike rack".to_string(),
                quantity: 2,
            },
        ];
        let quote = PricingService::compute_quote(
            &pricing(100, 0),
            day(1),
            day(5),
            &guests(2, 1),
            &selections,
            "basic",
        )
        .unwrap();

        // per_person: 12 * 1 * 3 = 36; per_rental: 25; per_day: 5 * 2 * 4 = 40
        assert_eq!(quote.extras_total, Decimal::from(101));
        assert_eq!(quote.extras.len(), 3);
        assert_eq!(quote.extras[0].total, Decimal::from(36));
        assert_eq!(quote.extras[1].total, Decimal::from(25));
        assert_eq!(quote.extras[2].total, Decimal::from(40));
    }

    #[test]
    fn test_unmatched_extra_is_dropped() {
        let selections = vec![ExtraSelection {
            name: "Jetpack".to_string(),
            quantity: 3,
        }];
        let quote = PricingService::compute_quote(
            &pricing(100, 0),
            day(1),
            day(5),
            &guests(2, 0),
            &selections,
            "basic",
        )
        .unwrap();

        assert!(quote.extras.is_empty());
        assert_eq!(quote.extras_total, Decimal::ZERO);
    }

    #[test]
    fn test_unknown_insurance_falls_back_to_basic() {
        let quote = PricingService::compute_quote(
            &pricing(100, 0),
            day(1),
            day(5),
            &guests(2, 0),
            &[],
            "platinum",
        )
        .unwrap();

        assert_eq!(quote.insurance.insurance_type, InsuranceType::Basic);
        assert_eq!(quote.insurance.price, Decimal::from(60)); // 15 * 4
    }

    #[test]
    fn test_validation_errors() {
        let p = pricing(100, 0);
        assert!(matches!(
            PricingService::compute_quote(&p, day(5), day(5), &guests(2, 0), &[], "basic"),
            Err(BookingError::Validation(_))
        ));
        assert!(matches!(
            PricingService::compute_quote(&p, day(5), day(1), &guests(2, 0), &[], "basic"),
            Err(BookingError::Validation(_))
        ));
        assert!(matches!(
            PricingService::compute_quote(&p, day(1), day(5), &guests(0, 2), &[], "basic"),
            Err(BookingError::Validation(_))
        ));
    }

    #[test]
    fn test_quote_is_deterministic() {
        let p = pricing(87, 35);
        let selections = vec![ExtraSelection {
            name: "Bike rack".to_string(),
            quantity: 1,
        }];
        let a = PricingService::compute_quote(&p, day(1), day(9), &guests(2, 2), &selections, "premium")
            .unwrap();
        let b = PricingService::compute_quote(&p, day(1), day(9), &guests(2, 2), &selections, "premium")
            .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_total_formula_randomized() {
        let mut rng = rand::thread_rng();
        for _ in 0..200 {
            let base_cents: i64 = rng.gen_range(0..50_000);
            let cleaning_cents: i64 = rng.gen_range(0..20_000);
            let length: u32 = rng.gen_range(1..40);
            let adults: u32 = rng.gen_range(1..5);
            let children: u32 = rng.gen_range(0..4);

            let p = VehiclePricing {
                base_price_per_day: Decimal::new(base_cents, 2),
                deposit: Decimal::from(500),
                cleaning_fee: Decimal::new(cleaning_cents, 2),
                mileage: MileagePolicy::default(),
                extras: vec![],
            };
            let start = day(1);
            let end = start + chrono::Duration::days(length as i64);

            let quote = PricingService::compute_quote(
                &p,
                start,
                end,
                &guests(adults, children),
                &[],
                "standard",
            )
            .unwrap();

            // Rebuild the unrounded chain independently
            let days = Decimal::from(length);
            let subtotal = p.base_price_per_day * days;
            let discount = PricingService::long_rental_discount(subtotal, length as i64);
            let insurance_price = Decimal::from(25) * days;
            let service_fee = (subtotal - discount) * Decimal::new(5, 2);
            let taxable = subtotal - discount + insurance_price + service_fee + p.cleaning_fee;
            let total = taxable * (Decimal::ONE + Decimal::new(19, 2));

            assert_eq!(quote.total_amount, total.round_dp(2));
            assert_eq!(quote.taxable_amount, taxable.round_dp(2));
            assert!(quote.total_amount >= Decimal::ZERO);
        }
    }
}
