//! Group-by aggregation over in-memory fact rows.

use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Agg {
    Sum,
    Mean,
}

type KeyFn<'a, R> = Box<dyn Fn(&R) -> String + 'a>;
type ValueFn<'a, R> = Box<dyn Fn(&R) -> f64 + 'a>;

struct Measure<'a, R> {
    name: &'static str,
    agg: Agg,
    value: ValueFn<'a, R>,
}

/// Grouping keys and measures for one table.
pub struct Aggregator<'a, R> {
    keys: Vec<(&'static str, KeyFn<'a, R>)>,
    measures: Vec<Measure<'a, R>>,
}

impl<'a, R> Default for Aggregator<'a, R> {
    fn default() -> Self {
        Self {
            keys: Vec::new(),
            measures: Vec::new(),
        }
    }
}

impl<'a, R> Aggregator<'a, R> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn group_by(mut self, name: &'static str, key: impl Fn(&R) -> String + 'a) -> Self {
        self.keys.push((name, Box::new(key)));
        self
    }

    pub fn sum(self, name: &'static str, value: impl Fn(&R) -> f64 + 'a) -> Self {
        self.measure(name, Agg::Sum, value)
    }

    pub fn mean(self, name: &'static str, value: impl Fn(&R) -> f64 + 'a) -> Self {
        self.measure(name, Agg::Mean, value)
    }

    fn measure(mut self, name: &'static str, agg: Agg, value: impl Fn(&R) -> f64 + 'a) -> Self {
        self.measures.push(Measure {
            name,
            agg,
            value: Box::new(value),
        });
        self
    }

    pub fn run<'r, I>(&self, records: I) -> Grouped
    where
        I: IntoIterator<Item = &'r R>,
        R: 'r,
    {
        let mut acc: BTreeMap<Vec<String>, (Vec<f64>, usize)> = BTreeMap::new();
        for record in records {
            let key: Vec<String> = self.keys.iter().map(|(_, k)| k(record)).collect();
            let entry = acc
                .entry(key)
                .or_insert_with(|| (vec![0.0; self.measures.len()], 0));
            for (slot, m) in entry.0.iter_mut().zip(&self.measures) {
                *slot += (m.value)(record);
            }
            entry.1 += 1;
        }

        let groups = acc
            .into_iter()
            .map(|(keys, (sums, count))| {
                let values = sums
                    .iter()
                    .zip(&self.measures)
                    .map(|(sum, m)| match m.agg {
                        Agg::Sum => *sum,
                        Agg::Mean => sum / count as f64,
                    })
                    .collect();
                Group { keys, values, count }
            })
            .collect();

        Grouped {
            key_names: self.keys.iter().map(|(n, _)| *n).collect(),
            measure_names: self.measures.iter().map(|m| m.name).collect(),
            groups,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    pub keys: Vec<String>,
    pub values: Vec<f64>,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Grouped {
    pub key_names: Vec<&'static str>,
    pub measure_names: Vec<&'static str>,
    pub groups: Vec<Group>,
}

impl Grouped {
    fn measure_index(&self, name: &str) -> Option<usize> {
        self.measure_names.iter().position(|n| *n == name)
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn get(&self, keys: &[&str]) -> Option<&Group> {
        self.groups
            .iter()
            .find(|g| g.keys.iter().map(String::as_str).eq(keys.iter().copied()))
    }

    /// A measure of one group, 0 when the measure is unknown.
    pub fn value(&self, group: &Group, measure: &str) -> f64 {
        self.measure_index(measure)
            .and_then(|i| group.values.get(i).copied())
            .unwrap_or(0.0)
    }

    /// Sum of a measure across all groups.
    pub fn total(&self, measure: &str) -> f64 {
        self.groups.iter().map(|g| self.value(g, measure)).sum()
    }

    /// Mean of a measure across groups (not records).
    pub fn mean_of_groups(&self, measure: &str) -> f64 {
        if self.groups.is_empty() {
            return 0.0;
        }
        self.total(measure) / self.groups.len() as f64
    }

    /// Divide one measure of every group by `divisor`; a zero divisor is ignored.
    pub fn scale(&mut self, measure: &str, divisor: f64) {
        if divisor == 0.0 {
            return;
        }
        if let Some(i) = self.measure_index(measure) {
            for g in &mut self.groups {
                g.values[i] /= divisor;
            }
        }
    }
}

/// Sum `value` over the records matching `pred`.
pub fn sum_where<'r, R: 'r, I>(records: I, pred: impl Fn(&R) -> bool, value: impl Fn(&R) -> f64) -> f64
where
    I: IntoIterator<Item = &'r R>,
{
    records.into_iter().filter(|r| pred(r)).map(|r| value(r)).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Row {
        item: &'static str,
        uom: &'static str,
        price: f64,
        qty: f64,
    }

    fn rows() -> Vec<Row> {
        vec![
            Row { item: "Onion", uom: "kg", price: 30.0, qty: 10.0 },
            Row { item: "Onion", uom: "kg", price: 40.0, qty: 5.0 },
            Row { item: "Milk", uom: "ltr", price: 50.0, qty: 20.0 },
        ]
    }

    fn aggregator<'a>() -> Aggregator<'a, Row> {
        Aggregator::new()
            .group_by("Item", |r: &Row| r.item.to_string())
            .group_by("UOM", |r: &Row| r.uom.to_string())
            .mean("Price", |r: &Row| r.price)
            .sum("Qty", |r: &Row| r.qty)
    }

    #[test]
    fn test_groups_sum_and_mean() {
        let data = rows();
        let grouped = aggregator().run(&data);
        assert_eq!(grouped.groups.len(), 2);
        let onion = grouped.get(&["Onion", "kg"]).unwrap();
        assert_eq!(grouped.value(onion, "Price"), 35.0);
        assert_eq!(grouped.value(onion, "Qty"), 15.0);
        assert_eq!(onion.count, 2);
        assert_eq!(grouped.total("Qty"), 35.0);
        assert_eq!(grouped.mean_of_groups("Price"), 42.5);
    }

    #[test]
    fn test_groups_are_ordered_by_key() {
        let data = rows();
        let grouped = aggregator().run(&data);
        let names: Vec<_> = grouped.groups.iter().map(|g| g.keys[0].as_str()).collect();
        assert_eq!(names, vec!["Milk", "Onion"]);
    }

    #[test]
    fn test_aggregation_is_filter_order_independent() {
        let data = rows();
        let filtered_first: Vec<&Row> = data.iter().filter(|r| r.item == "Onion").collect();
        let a = aggregator().run(filtered_first.iter().copied());
        let b = aggregator().run(&data);
        assert_eq!(a.get(&["Onion", "kg"]), b.get(&["Onion", "kg"]));
    }

    #[test]
    fn test_scale_and_empty() {
        let data = rows();
        let mut grouped = aggregator().run(&data);
        grouped.scale("Qty", 5.0);
        assert_eq!(grouped.total("Qty"), 7.0);
        grouped.scale("Qty", 0.0);
        assert_eq!(grouped.total("Qty"), 7.0);
        let empty = aggregator().run(std::iter::empty());
        assert!(empty.is_empty());
        assert_eq!(empty.mean_of_groups("Price"), 0.0);
    }

    #[test]
    fn test_sum_where() {
        let data = rows();
        assert_eq!(sum_where(&data, |r: &Row| r.item == "Milk", |r: &Row| r.qty), 20.0);
    }
}
