use std::collections::BTreeSet;

use serde::Serialize;

use crate::models::catalog::CatalogActivity;

/// Every field is optional; an absent field matches everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterSpec {
    pub country: Option<String>,
    pub location: Option<String>,
    pub category: Option<String>,
    pub tags: Option<BTreeSet<String>>,
    pub min_cost: Option<f64>,
    pub max_cost: Option<f64>,
    pub min_duration: Option<i32>,
    pub max_duration: Option<i32>,
    pub popular: Option<bool>,
    pub limit: Option<usize>,
}

impl FilterSpec {
    pub fn matches(&self, entry: &CatalogActivity) -> bool {
        fn eq(want: &Option<String>, have: &str) -> bool {
            want.as_deref().map_or(true, |w| w == have)
        }

        eq(&self.country, &entry.country)
            && eq(&self.location, &entry.location)
            && eq(&self.category, &entry.category)
            && self
                .tags
                .as_ref()
                .map_or(true, |tags| tags.iter().all(|t| entry.has_tag(t)))
            && at_least(self.min_cost, entry.average_cost)
            && at_most(self.max_cost, entry.average_cost)
            && at_least(self.min_duration, entry.typical_duration_minutes)
            && at_most(self.max_duration, entry.typical_duration_minutes)
            && self.popular.map_or(true, |p| p == entry.is_popular)
    }
}

// A bound against a missing value never matches.
fn at_least<T: PartialOrd>(bound: Option<T>, value: Option<T>) -> bool {
    match (bound, value) {
        (None, _) => true,
        (Some(bound), Some(value)) => value >= bound,
        (Some(_), None) => false,
    }
}

fn at_most<T: PartialOrd>(bound: Option<T>, value: Option<T>) -> bool {
    match (bound, value) {
        (None, _) => true,
        (Some(bound), Some(value)) => value <= bound,
        (Some(_), None) => false,
    }
}

/// Matching entries in catalog order, cut to `spec.limit` when set.
pub fn filter<'a>(catalog: &'a [CatalogActivity], spec: &FilterSpec) -> Vec<&'a CatalogActivity> {
    let matching = catalog.iter().filter(|entry| spec.matches(entry));
    match spec.limit {
        Some(limit) => matching.take(limit).collect(),
        None => matching.collect(),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Facets {
    pub countries: BTreeSet<String>,
    pub locations: BTreeSet<String>,
    pub categories: BTreeSet<String>,
    pub tags: BTreeSet<String>,
}

pub fn facets(catalog: &[CatalogActivity]) -> Facets {
    let mut facets = Facets::default();
    for entry in catalog {
        insert_non_empty(&mut facets.countries, &entry.country);
        insert_non_empty(&mut facets.locations, &entry.location);
        insert_non_empty(&mut facets.categories, &entry.category);
        for tag in &entry.tags {
            insert_non_empty(&mut facets.tags, tag);
        }
    }
    facets
}

fn insert_non_empty(set: &mut BTreeSet<String>, value: &str) {
    let value = value.trim();
    if !value.is_empty() {
        set.insert(value.to_string());
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ValueRange<T> {
    pub min: T,
    pub max: T,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogRanges {
    pub cost: Option<ValueRange<f64>>,
    pub duration: Option<ValueRange<i32>>,
}

pub fn ranges(catalog: &[CatalogActivity]) -> CatalogRanges {
    CatalogRanges {
        cost: span(catalog.iter().filter_map(|e| e.average_cost)),
        duration: span(catalog.iter().filter_map(|e| e.typical_duration_minutes)),
    }
}

fn span<T: PartialOrd + Copy>(values: impl Iterator<Item = T>) -> Option<ValueRange<T>> {
    values.fold(None, |acc, v| match acc {
        None => Some(ValueRange { min: v, max: v }),
        Some(r) => Some(ValueRange {
            min: if v < r.min { v } else { r.min },
            max: if v > r.max { v } else { r.max },
        }),
    })
}

#[cfg(test)]
mod tests {
    use chrono::NaiveTime;

    use super::*;

    fn entry(id: i64, location: &str, country: &str, tags: &[&str]) -> CatalogActivity {
        CatalogActivity {
            id,
            title: format!("entry {id}"),
            description: None,
            location: location.into(),
            country: country.into(),
            category: "Sightseeing".into(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            typical_duration_minutes: Some(30 * id as i32),
            average_cost: Some(10.0 * id as f64),
            recommended_time: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
            is_popular: id % 2 == 0,
        }
    }

    fn catalog() -> Vec<CatalogActivity> {
        vec![
            entry(1, "Kyoto", "Japan", &["food"]),
            entry(2, "Kyoto", "Japan", &["food", "outdoor"]),
            entry(3, "Bangkok", "Thailand", &["museum"]),
        ]
    }

    fn tags(values: &[&str]) -> Option<BTreeSet<String>> {
        Some(values.iter().map(|t| t.to_string()).collect())
    }

    fn ids(found: &[&CatalogActivity]) -> Vec<i64> {
        found.iter().map(|e| e.id).collect()
    }

    #[test]
    fn empty_spec_is_identity() {
        let catalog = catalog();
        assert_eq!(ids(&filter(&catalog, &FilterSpec::default())), vec![1, 2, 3]);
    }

    #[test]
    fn tag_filter_requires_superset_and_keeps_order() {
        let catalog = catalog();
        let spec = FilterSpec {
            tags: tags(&["food"]),
            ..FilterSpec::default()
        };
        assert_eq!(ids(&filter(&catalog, &spec)), vec![1, 2]);

        let spec = FilterSpec {
            tags: tags(&["food", "outdoor"]),
            ..FilterSpec::default()
        };
        assert_eq!(ids(&filter(&catalog, &spec)), vec![2]);
    }

    #[test]
    fn empty_tag_set_matches_everything() {
        let catalog = catalog();
        let spec = FilterSpec {
            tags: tags(&[]),
            ..FilterSpec::default()
        };
        assert_eq!(filter(&catalog, &spec).len(), 3);
    }

    #[test]
    fn country_and_location_are_exact() {
        let catalog = catalog();
        let spec = FilterSpec {
            country: Some("Thailand".into()),
            ..FilterSpec::default()
        };
        assert_eq!(ids(&filter(&catalog, &spec)), vec![3]);

        let spec = FilterSpec {
            location: Some("kyoto".into()),
            ..FilterSpec::default()
        };
        assert!(filter(&catalog, &spec).is_empty());
    }

    #[test]
    fn limit_truncates_after_matching() {
        let catalog = catalog();
        let spec = FilterSpec {
            country: Some("Japan".into()),
            limit: Some(1),
            ..FilterSpec::default()
        };
        assert_eq!(ids(&filter(&catalog, &spec)), vec![1]);
    }

    #[test]
    fn cost_bounds_skip_entries_without_cost() {
        let mut catalog = catalog();
        catalog[0].average_cost = None;
        let spec = FilterSpec {
            min_cost: Some(0.0),
            max_cost: Some(20.0),
            ..FilterSpec::default()
        };
        assert_eq!(ids(&filter(&catalog, &spec)), vec![2]);
    }

    #[test]
    fn popular_flag() {
        let catalog = catalog();
        let spec = FilterSpec {
            popular: Some(true),
            ..FilterSpec::default()
        };
        assert_eq!(ids(&filter(&catalog, &spec)), vec![2]);
    }

    #[test]
    fn facets_collect_distinct_values() {
        let facets = facets(&catalog());
        assert_eq!(facets.countries.len(), 2);
        assert_eq!(facets.locations.len(), 2);
        assert_eq!(
            facets.tags.into_iter().collect::<Vec<_>>(),
            vec!["food", "museum", "outdoor"]
        );
    }

    #[test]
    fn ranges_span_known_values() {
        let r = ranges(&catalog());
        assert_eq!(r.cost, Some(ValueRange { min: 10.0, max: 30.0 }));
        assert_eq!(r.duration, Some(ValueRange { min: 30, max: 90 }));
        assert_eq!(ranges(&[]), CatalogRanges::default());
    }
}
