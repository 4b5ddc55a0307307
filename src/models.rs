use chrono::{Datelike, NaiveDate};

use crate::calendar::WeekBucket;

/// A dated fact row that the filter selection can narrow.
pub trait Fact {
    fn year(&self) -> i32;
    fn month(&self) -> u32;
    fn location(&self) -> &str;
    /// Calendar date, for sources that carry one.
    fn date(&self) -> Option<NaiveDate> {
        None
    }
}

macro_rules! dated_fact {
    ($ty:ty, $date:ident, $location:ident) => {
        impl Fact for $ty {
            fn year(&self) -> i32 {
                self.$date.year()
            }
            fn month(&self) -> u32 {
                self.$date.month()
            }
            fn location(&self) -> &str {
                &self.$location
            }
            fn date(&self) -> Option<NaiveDate> {
                Some(self.$date)
            }
        }
    };
}

macro_rules! periodic_fact {
    ($ty:ty) => {
        impl Fact for $ty {
            fn year(&self) -> i32 {
                self.year
            }
            fn month(&self) -> u32 {
                self.month
            }
            fn location(&self) -> &str {
                &self.location
            }
        }
    };
}

/// One line of the monthly P&L extract.
#[derive(Debug, Clone, PartialEq)]
pub struct PnlEntry {
    pub year: i32,
    pub month: u32,
    pub location: String,
    pub category: String,
    pub sub_category: String,
    pub super_sub_category: String,
    pub amount: f64,
}

impl PnlEntry {
    /// True when any of the three category levels is `name`.
    pub fn is(&self, name: &str) -> bool {
        self.category == name || self.sub_category == name || self.super_sub_category == name
    }
}

periodic_fact!(PnlEntry);

/// One day's cash-up for one location.
#[derive(Debug, Clone, PartialEq)]
pub struct CashEntry {
    pub date: NaiveDate,
    pub location: String,
    pub total_sales: f64,
    pub swiggy: f64,
    pub zomato: f64,
    pub card_sales: f64,
    pub upi: f64,
    pub dineout: f64,
    pub zomato_pro: f64,
    pub expenses: f64,
    pub expected_cash: f64,
    pub actual_cash: f64,
}

impl CashEntry {
    pub fn variance(&self) -> f64 {
        self.actual_cash - self.expected_cash
    }
}

dated_fact!(CashEntry, date, location);

#[derive(Debug, Clone, PartialEq)]
pub struct FoodCostEntry {
    pub year: i32,
    pub month: u32,
    pub location: String,
    pub category: String,
    pub ideal_cost: f64,
    pub actual_cost: f64,
    pub variance: f64,
}

periodic_fact!(FoodCostEntry);

/// Stock movement of one item at one location for one month.
#[derive(Debug, Clone, PartialEq)]
pub struct ConsumptionEntry {
    pub year: i32,
    pub month: u32,
    pub location: String,
    pub item: String,
    pub uom: String,
    pub price: f64,
    pub opening_qty: f64,
    pub purchases_qty: f64,
    pub closing_qty: f64,
    pub consumption_qty: f64,
}

periodic_fact!(ConsumptionEntry);

#[derive(Debug, Clone, PartialEq)]
pub struct StockLossEntry {
    pub year: i32,
    pub month: u32,
    pub location: String,
    pub item: String,
    pub uom: String,
    pub price: f64,
    pub ideal_closing_qty: f64,
    pub actual_closing_qty: f64,
    pub variance_qty: f64,
    pub ideal_closing_value: f64,
    pub actual_closing_value: f64,
}

periodic_fact!(StockLossEntry);

#[derive(Debug, Clone, PartialEq)]
pub struct DishEntry {
    pub year: i32,
    pub month: u32,
    pub location: String,
    pub item: String,
    pub cost_price: f64,
    pub selling_qty: f64,
    pub selling_price: f64,
}

impl DishEntry {
    pub fn total_cost(&self) -> f64 {
        self.selling_qty * self.cost_price
    }

    pub fn total_revenue(&self) -> f64 {
        self.selling_qty * self.selling_price
    }
}

periodic_fact!(DishEntry);

/// One bill line from the POS sales export.
#[derive(Debug, Clone, PartialEq)]
pub struct SaleEntry {
    pub date: NaiveDate,
    pub tab: String,
    pub location: String,
    pub net_sale: f64,
    pub charges: f64,
}

impl SaleEntry {
    pub fn sales_value(&self) -> f64 {
        self.net_sale + self.charges
    }
}

dated_fact!(SaleEntry, date, location);

/// A Swiggy order as billed by the POS.
#[derive(Debug, Clone, PartialEq)]
pub struct SwiggyOrder {
    pub location: String,
    pub order_id: String,
    pub bill_date: NaiveDate,
    pub gross: f64,
    pub source: String,
    pub restaurant_id: Option<String>,
    pub week: WeekBucket,
}

dated_fact!(SwiggyOrder, bill_date, location);

/// Swiggy restaurant id to POS deployment name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutletMapping {
    pub restaurant_id: String,
    pub deployment: String,
}

/// A Swiggy order as reported by the platform payout sheet.
#[derive(Debug, Clone, PartialEq)]
pub struct PlatformOrder {
    pub order_date: NaiveDate,
    pub status: String,
    pub order_id: String,
    pub customer_paid: f64,
    pub source: String,
}

impl PlatformOrder {
    pub fn is_cancelled(&self) -> bool {
        self.status.to_lowercase().contains("cancel")
    }
}

// The payout sheet carries no outlet; only the period dimensions apply.
impl Fact for PlatformOrder {
    fn year(&self) -> i32 {
        self.order_date.year()
    }
    fn month(&self) -> u32 {
        self.order_date.month()
    }
    fn location(&self) -> &str {
        ""
    }
    fn date(&self) -> Option<NaiveDate> {
        Some(self.order_date)
    }
}
