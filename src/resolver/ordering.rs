//! Ordering of catalog version labels.
//!
//! Catalog keys are loose dotted labels (`"3"`, `"3.4"`, `"3.4.1"`,
//! occasionally `"3.5.0-rc1"`), so plain [`semver`] parsing only covers part
//! of the space. Where both labels parse as full semantic versions the
//! semver ordering is authoritative; otherwise labels are compared segment
//! by segment: numeric prefixes numerically, with a pre-release suffix
//! ordering *below* the bare segment (`3.5.0-rc1 < 3.5.0`, matching semver)
//! and remaining suffixes byte-wise. A label with fewer segments orders
//! below its extensions (`3.4 < 3.4.1`).

use std::cmp::Ordering;

use semver::Version;

/// Compare two version labels.
#[must_use]
pub fn compare_labels(a: &str, b: &str) -> Ordering {
    if let (Ok(av), Ok(bv)) = (Version::parse(a), Version::parse(b)) {
        return av.cmp(&bv);
    }

    let av: Vec<&str> = a.split('.').collect();
    let bv: Vec<&str> = b.split('.').collect();
    let len = av.len().max(bv.len());

    for i in 0..len {
        match (av.get(i), bv.get(i)) {
            (Some(x), Some(y)) => {
                let (xn, xs) = split_segment(x);
                let (yn, ys) = split_segment(y);
                match xn.cmp(&yn) {
                    Ordering::Equal => {}
                    ord => return ord,
                }
                match (xs.is_empty(), ys.is_empty()) {
                    (true, true) => {}
                    // a suffixed segment is a pre-release of the bare one
                    (true, false) => return Ordering::Greater,
                    (false, true) => return Ordering::Less,
                    (false, false) => match xs.cmp(ys) {
                        Ordering::Equal => {}
                        ord => return ord,
                    },
                }
            }
            (Some(_), None) => return Ordering::Greater,
            (None, Some(_)) => return Ordering::Less,
            (None, None) => unreachable!("loop bounded by the longer label"),
        }
    }

    Ordering::Equal
}

/// Whether `label` satisfies the floor `floor` (i.e. `label >= floor`).
#[must_use]
pub fn satisfies_floor(label: &str, floor: &str) -> bool {
    compare_labels(label, floor) != Ordering::Less
}

/// Split a label segment into its numeric prefix and the remaining suffix.
fn split_segment(segment: &str) -> (u64, &str) {
    let end = segment
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(segment.len());
    let number = segment[..end].parse().unwrap_or(0);
    (number, &segment[end..])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_segments_compare_numerically() {
        assert_eq!(compare_labels("3.10", "3.9"), Ordering::Greater);
        assert_eq!(compare_labels("3.4", "3.4"), Ordering::Equal);
        assert_eq!(compare_labels("2.9.9", "3.0.0"), Ordering::Less);
    }

    #[test]
    fn shorter_label_orders_below_its_extension() {
        assert_eq!(compare_labels("3.4", "3.4.1"), Ordering::Less);
        assert_eq!(compare_labels("3.4.1", "3.4"), Ordering::Greater);
    }

    #[test]
    fn pre_release_orders_below_the_release() {
        assert_eq!(compare_labels("3.5.0-rc1", "3.5.0"), Ordering::Less);
        assert_eq!(compare_labels("3.5.0", "3.5.0-rc1"), Ordering::Greater);
        assert_eq!(compare_labels("3.5.0-rc1", "3.5.0-rc2"), Ordering::Less);
    }

    #[test]
    fn full_semver_labels_use_semver_ordering() {
        assert_eq!(compare_labels("3.5.0-rc1", "3.5.0-beta2"), Ordering::Greater);
        assert_eq!(compare_labels("10.0.0", "9.9.9"), Ordering::Greater);
    }

    #[test]
    fn floor_check_is_greater_or_equal() {
        assert!(satisfies_floor("3.6", "3.4"));
        assert!(satisfies_floor("3.4", "3.4"));
        assert!(!satisfies_floor("3.3", "3.4"));
    }
}
