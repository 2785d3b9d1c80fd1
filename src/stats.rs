use itertools::{Itertools, MinMaxResult};
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde::Deserialize;
use statistical::{mean as statistical_mean, population_standard_deviation};
use std::slice;

/// Column means, in the order the columns appear in the table.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Means {
    entries: Vec<(String, f64)>,
}

impl Means {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
        }
    }

    pub(crate) fn push(&mut self, column: String, mean: f64) {
        self.entries.push((column, mean));
    }

    #[must_use]
    pub fn get(&self, column: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, mean)| *mean)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> slice::Iter<'_, (String, f64)> {
        self.entries.iter()
    }
}

impl<'a> IntoIterator for &'a Means {
    type Item = &'a (String, f64);
    type IntoIter = slice::Iter<'a, (String, f64)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl Serialize for Means {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (column, mean) in &self.entries {
            map.serialize_entry(column, mean)?;
        }
        map.end()
    }
}

/// Statistical summary of the present values of a numeric column.
#[derive(Debug, Clone, PartialEq, serde::Serialize, Deserialize)]
pub struct Description {
    pub(crate) count: usize,
    pub(crate) missing: usize,
    pub(crate) mean: f64,
    pub(crate) s_deviation: f64,
    pub(crate) min: f64,
    pub(crate) max: f64,
}

impl Description {
    /// Number of present values.
    #[must_use]
    pub fn get_count(&self) -> usize {
        self.count
    }

    #[must_use]
    pub fn get_missing(&self) -> usize {
        self.missing
    }

    #[must_use]
    pub fn get_mean(&self) -> f64 {
        self.mean
    }

    /// Population standard deviation.
    #[must_use]
    pub fn get_s_deviation(&self) -> f64 {
        self.s_deviation
    }

    #[must_use]
    pub fn get_min(&self) -> f64 {
        self.min
    }

    #[must_use]
    pub fn get_max(&self) -> f64 {
        self.max
    }
}

/// Sum of `values` divided by their count, or `None` if there are none.
pub(crate) fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(statistical_mean(values))
    }
}

/// Describes `values`, the present cells out of `total` rows.
pub(crate) fn describe(values: &[f64], total: usize) -> Option<Description> {
    let (min, max) = match values.iter().copied().minmax() {
        MinMaxResult::NoElements => return None,
        MinMaxResult::OneElement(v) => (v, v),
        MinMaxResult::MinMax(min, max) => (min, max),
    };
    let m = statistical_mean(values);
    Some(Description {
        count: values.len(),
        missing: total.saturating_sub(values.len()),
        mean: m,
        s_deviation: population_standard_deviation(values, Some(m)),
        min,
        max,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mean_is_sum_over_count() {
        let values = [80.0, 81.6258, 79.1, 83.25];
        let expected = values.iter().sum::<f64>() / values.len() as f64;
        assert_eq!(mean(&values), Some(expected));
        assert_eq!(mean(&[]), None);
    }

    #[test]
    fn single_value_description() {
        let description = describe(&[5.5], 3).unwrap();
        assert_eq!(description.get_count(), 1);
        assert_eq!(description.get_missing(), 2);
        assert_eq!(description.get_min(), 5.5);
        assert_eq!(description.get_max(), 5.5);
        assert_eq!(description.get_s_deviation(), 0.0);
        assert!(describe(&[], 3).is_none());
    }

    #[test]
    fn means_keep_column_order() {
        let mut means = Means::with_capacity(2);
        means.push("wind_speed".to_string(), 5.5);
        means.push("humidity".to_string(), 80.0);
        assert_eq!(
            serde_json::to_string(&means).unwrap(),
            r#"{"wind_speed":5.5,"humidity":80.0}"#
        );
        assert_eq!(means.get("humidity"), Some(80.0));
        assert_eq!(means.get("salinity"), None);
        assert_eq!(
            means.iter().map(|(c, _)| c.as_str()).collect::<Vec<_>>(),
            vec!["wind_speed", "humidity"]
        );
    }
}
