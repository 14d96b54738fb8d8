//! Default sibling comparator
//!
//! Names compare case-insensitively with the raw name as tiebreak. Buckets
//! keep their positional order. With `by_date`, images are ordered by
//! acquisition date and undated images go last.

use std::cmp::Ordering;

use canopy_core::{NodeComparator, Payload};

#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultComparator;

impl DefaultComparator {
    fn by_name(a: &Payload, b: &Payload) -> Ordering {
        a.name()
            .to_lowercase()
            .cmp(&b.name().to_lowercase())
            .then_with(|| a.name().cmp(b.name()))
            .then_with(|| a.id().cmp(&b.id()))
    }
}

impl NodeComparator for DefaultComparator {
    fn compare(&self, a: &Payload, b: &Payload, by_date: bool) -> Ordering {
        match (a, b) {
            (Payload::TimeBucket { period: x }, Payload::TimeBucket { period: y }) => {
                x.index().cmp(&y.index())
            }
            (Payload::FileBucket { bucket: x }, Payload::FileBucket { bucket: y }) => {
                x.index().cmp(&y.index())
            }
            (Payload::Image { .. }, Payload::Image { .. }) if by_date => {
                match (a.acquired(), b.acquired()) {
                    (Some(x), Some(y)) => x.cmp(&y).then_with(|| Self::by_name(a, b)),
                    (Some(_), None) => Ordering::Less,
                    (None, Some(_)) => Ordering::Greater,
                    (None, None) => Self::by_name(a, b),
                }
            }
            _ => Self::by_name(a, b),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use canopy_core::{order_children, SortOptions, TimePeriod};
    use chrono::{TimeZone, Utc};

    fn image(id: i64, name: &str, day: Option<u32>) -> Payload {
        Payload::Image {
            id,
            name: name.to_string(),
            acquired: day.map(|d| Utc.with_ymd_and_hms(2024, 3, d, 12, 0, 0).unwrap()),
        }
    }

    fn names(items: &[Payload]) -> Vec<&str> {
        items.iter().map(|p| p.name()).collect()
    }

    #[test]
    fn test_names_ignore_case() {
        let items = vec![image(1, "beta", None), image(2, "Alpha", None), image(3, "alpha", None)];
        let ordered = order_children(items, |p| p, &DefaultComparator, SortOptions::default());
        assert_eq!(names(&ordered), vec!["Alpha", "alpha", "beta"]);
    }

    #[test]
    fn test_date_order_puts_undated_last() {
        let items = vec![
            image(1, "undated", None),
            image(2, "late", Some(20)),
            image(3, "early", Some(2)),
        ];
        let options = SortOptions {
            by_date: true,
            descending: false,
        };
        let ordered = order_children(items, |p| p, &DefaultComparator, options);
        assert_eq!(names(&ordered), vec!["early", "late", "undated"]);
    }

    #[test]
    fn test_buckets_keep_positional_order() {
        let items: Vec<Payload> = TimePeriod::ALL
            .iter()
            .rev()
            .map(|period| Payload::TimeBucket { period: *period })
            .collect();
        let ordered = order_children(items, |p| p, &DefaultComparator, SortOptions::default());
        let indices: Vec<i64> = ordered.iter().filter_map(|p| p.id()).collect();
        assert_eq!(indices, vec![0, 1, 2, 3, 4, 5]);
    }
}
