//! Row filtering and selector domains.
//!
//! A row passes only when age, gender and admission type are all present and
//! accepted. A missing value never acts as a wildcard.

use crate::error::EmptyDatasetError;
use crate::models::{Dataset, FilterCriteria, FilteredView, Record, COL_AGE};

/// Minimum and maximum age among rows that have one.
pub fn compute_age_bounds(dataset: &Dataset) -> Result<(i64, i64), EmptyDatasetError> {
    let mut ages = dataset.records.iter().filter_map(|r| r.age);
    let first = ages.next().ok_or(EmptyDatasetError { column: COL_AGE })?;

    Ok(ages.fold((first, first), |(lo, hi), age| (lo.min(age), hi.max(age))))
}

/// Age bounds, or the degenerate `(0, 0)` range when no row has an age.
pub fn age_bounds_or_default(dataset: &Dataset) -> (i64, i64) {
    compute_age_bounds(dataset).unwrap_or((0, 0))
}

impl FilterCriteria {
    /// Criteria selecting the whole observed domain: the first-load defaults.
    pub fn full_domain(dataset: &Dataset) -> Self {
        let (age_min, age_max) = age_bounds_or_default(dataset);
        Self::new(
            age_min,
            age_max,
            dataset.gender_options(),
            dataset.admission_type_options(),
        )
    }

    /// Whether a single record passes every predicate.
    pub fn matches(&self, record: &Record) -> bool {
        let age_ok = record
            .age
            .is_some_and(|age| self.age_min <= age && age <= self.age_max);
        let gender_ok = record
            .gender
            .as_ref()
            .is_some_and(|g| self.allowed_genders.contains(g));
        let type_ok = record
            .admission_type
            .as_ref()
            .is_some_and(|t| self.allowed_admission_types.contains(t));

        age_ok && gender_ok && type_ok
    }
}

/// Rows of `dataset` that satisfy `criteria`, in dataset order.
pub fn filter<'a>(dataset: &'a Dataset, criteria: &FilterCriteria) -> FilteredView<'a> {
    filter_records(dataset.records.iter(), criteria)
}

/// Filter any sequence of borrowed records.
pub fn filter_records<'a, I>(records: I, criteria: &FilterCriteria) -> FilteredView<'a>
where
    I: IntoIterator<Item = &'a Record>,
{
    FilteredView::new(
        records
            .into_iter()
            .filter(|record| criteria.matches(record))
            .collect(),
    )
}

impl<'a> FilteredView<'a> {
    /// Narrow this view further. Applying the criteria that produced the
    /// view returns the same rows.
    pub fn refine(&self, criteria: &FilterCriteria) -> FilteredView<'a> {
        filter_records(self.iter(), criteria)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(age: Option<i64>, gender: Option<&str>, admission_type: Option<&str>) -> Record {
        Record {
            age,
            gender: gender.map(String::from),
            admission_type: admission_type.map(String::from),
            ..Default::default()
        }
    }

    fn sample() -> Dataset {
        Dataset::from_records(vec![
            record(Some(40), Some("M"), Some("Emergency")),
            record(Some(70), Some("F"), Some("Emergency")),
            record(Some(20), Some("M"), Some("Elective")),
            record(None, Some("F"), Some("Emergency")),
            record(Some(55), None, Some("Emergency")),
            record(Some(60), Some("F"), None),
            record(Some(17), Some("F"), Some("Urgent")),
        ])
    }

    #[test]
    fn test_age_bounds() {
        assert_eq!(compute_age_bounds(&sample()), Ok((17, 70)));
    }

    #[test]
    fn test_age_bounds_empty() {
        let dataset = Dataset::from_records(vec![record(None, Some("M"), Some("Urgent"))]);
        assert_eq!(
            compute_age_bounds(&dataset),
            Err(EmptyDatasetError { column: "Age" })
        );
        assert_eq!(age_bounds_or_default(&dataset), (0, 0));
        assert_eq!(age_bounds_or_default(&Dataset::from_records(vec![])), (0, 0));
    }

    #[test]
    fn test_filter_basic() {
        let dataset = sample();
        let criteria = FilterCriteria::new(18, 99, ["M", "F"], ["Emergency"]);
        let view = filter(&dataset, &criteria);

        let ages: Vec<Option<i64>> = view.iter().map(|r| r.age).collect();
        assert_eq!(ages, vec![Some(40), Some(70)]);
    }

    #[test]
    fn test_absent_fields_are_not_wildcards() {
        let dataset = sample();
        let criteria = FilterCriteria::full_domain(&dataset);
        let view = filter(&dataset, &criteria);

        // Rows missing age, gender or admission type are dropped even
        // though every observed value is selected.
        assert_eq!(view.len(), 4);
        assert!(view
            .iter()
            .all(|r| r.age.is_some() && r.gender.is_some() && r.admission_type.is_some()));
    }

    #[test]
    fn test_age_bounds_inclusive() {
        let dataset = sample();
        let criteria = FilterCriteria::new(40, 70, ["M", "F"], ["Emergency"]);
        assert_eq!(filter(&dataset, &criteria).len(), 2);

        let criteria = FilterCriteria::new(41, 69, ["M", "F"], ["Emergency"]);
        assert!(filter(&dataset, &criteria).is_empty());
    }

    #[test]
    fn test_empty_selection_excludes_everything() {
        let dataset = sample();
        let criteria = FilterCriteria::new(0, 200, Vec::<String>::new(), ["Emergency"]);
        assert!(filter(&dataset, &criteria).is_empty());
    }

    #[test]
    fn test_inverted_range_is_empty() {
        let dataset = sample();
        let criteria = FilterCriteria::new(70, 18, ["M", "F"], ["Emergency"]);
        assert!(filter(&dataset, &criteria).is_empty());
    }

    #[test]
    fn test_filter_is_idempotent() {
        let dataset = sample();
        let criteria = FilterCriteria::new(18, 65, ["F", "M"], ["Emergency", "Elective"]);
        let once = filter(&dataset, &criteria);
        let twice = once.refine(&criteria);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_filter_has_no_false_negatives() {
        let dataset = sample();
        let criteria = FilterCriteria::new(15, 75, ["F"], ["Emergency", "Urgent"]);
        let view = filter(&dataset, &criteria);
        assert_eq!(view.len(), 2);

        let expected = dataset.records.iter().filter(|r| criteria.matches(r)).count();
        assert_eq!(view.len(), expected);
        assert!(view.iter().all(|r| criteria.matches(r)));
    }

    #[test]
    fn test_full_domain_defaults() {
        let criteria = FilterCriteria::full_domain(&sample());
        assert_eq!((criteria.age_min, criteria.age_max), (17, 70));
        assert_eq!(criteria.allowed_genders.len(), 2);
        assert!(criteria.allowed_admission_types.contains("Urgent"));
        assert_eq!(criteria.allowed_admission_types.len(), 3);
    }
}
