mod helpers;

use helpers::{keys, numbered, set_of};
use rankset::Interval;

fn tiered() -> rankset::SortedSet {
    set_of(&[
        ("a1", 1.0),
        ("a2", 1.0),
        ("b1", 2.0),
        ("b2", 2.0),
        ("c1", 3.0),
        ("d1", 4.0),
    ])
}

#[test]
fn unbounded_query_equals_full_range() {
    let set = tiered();
    let by_score = set.range_by_score(&Interval::NEG_INFINITY, &Interval::POS_INFINITY, 0, -1, false);
    assert_eq!(by_score, set.range(0, set.len() as isize, false).unwrap());
    let by_score = set.range_by_score(&Interval::NEG_INFINITY, &Interval::POS_INFINITY, 0, -1, true);
    assert_eq!(by_score, set.range(0, set.len() as isize, true).unwrap());
}

#[test]
fn inclusive_and_exclusive_bounds() {
    let set = tiered();
    let q = |lo: Interval, hi: Interval| keys(&set.range_by_score(&lo, &hi, 0, -1, false)).join(",");
    assert_eq!(q(Interval::inclusive(2.0), Interval::inclusive(3.0)), "b1,b2,c1");
    assert_eq!(q(Interval::exclusive(2.0), Interval::inclusive(3.0)), "c1");
    assert_eq!(q(Interval::inclusive(2.0), Interval::exclusive(3.0)), "b1,b2");
    assert_eq!(q(Interval::exclusive(1.0), Interval::exclusive(4.0)), "b1,b2,c1");
    assert_eq!(q(Interval::NEG_INFINITY, Interval::exclusive(2.0)), "a1,a2");
    assert_eq!(q(Interval::exclusive(3.0), Interval::POS_INFINITY), "d1");
}

#[test]
fn empty_and_malformed_ranges() {
    let set = tiered();
    let empty = |lo: Interval, hi: Interval| {
        assert!(set.range_by_score(&lo, &hi, 0, -1, false).is_empty(), "{lo} {hi}");
        assert!(set.range_by_score(&lo, &hi, 0, -1, true).is_empty(), "{lo} {hi}");
        assert_eq!(set.count(&lo, &hi), 0, "{lo} {hi}");
    };
    empty(Interval::inclusive(3.0), Interval::inclusive(2.0));
    empty(Interval::exclusive(2.0), Interval::inclusive(2.0));
    empty(Interval::inclusive(2.0), Interval::exclusive(2.0));
    empty(Interval::exclusive(2.0), Interval::exclusive(3.0));
    empty(Interval::exclusive(4.0), Interval::POS_INFINITY);
    empty(Interval::NEG_INFINITY, Interval::exclusive(1.0));
    empty(Interval::POS_INFINITY, Interval::POS_INFINITY);
    empty(Interval::NEG_INFINITY, Interval::NEG_INFINITY);
    empty(Interval::inclusive(10.0), Interval::inclusive(20.0));

    let none = set_of(&[]);
    assert!(none
        .range_by_score(&Interval::NEG_INFINITY, &Interval::POS_INFINITY, 0, -1, false)
        .is_empty());
}

#[test]
fn descending_starts_from_the_top_of_the_range() {
    let set = tiered();
    let got = set.range_by_score(&Interval::inclusive(1.0), &Interval::inclusive(2.0), 0, -1, true);
    assert_eq!(keys(&got), ["b2", "b1", "a2", "a1"]);
}

#[test]
fn offset_and_limit() {
    let set = tiered();
    let (lo, hi) = (Interval::NEG_INFINITY, Interval::POS_INFINITY);
    assert_eq!(keys(&set.range_by_score(&lo, &hi, 1, 2, false)), ["a2", "b1"]);
    assert_eq!(keys(&set.range_by_score(&lo, &hi, 1, 2, true)), ["c1", "b2"]);
    assert_eq!(keys(&set.range_by_score(&lo, &hi, 4, -1, false)), ["c1", "d1"]);
    assert_eq!(keys(&set.range_by_score(&lo, &hi, 0, 100, false)).len(), 6);
    assert!(set.range_by_score(&lo, &hi, 0, 0, false).is_empty());
    assert!(set.range_by_score(&lo, &hi, -1, 5, false).is_empty());
    assert!(set.range_by_score(&lo, &hi, 6, -1, false).is_empty());
    assert!(set.range_by_score(&lo, &hi, 60, -1, true).is_empty());

    // offset inside a bounded range never spills past the bound
    let (lo, hi) = (Interval::inclusive(2.0), Interval::inclusive(2.0));
    assert_eq!(keys(&set.range_by_score(&lo, &hi, 1, -1, false)), ["b2"]);
    assert!(set.range_by_score(&lo, &hi, 2, -1, false).is_empty());
    assert!(set.range_by_score(&lo, &hi, 2, -1, true).is_empty());
}

#[test]
fn visitor_stop_is_honoured() {
    let set = numbered(50);
    let mut seen = 0;
    set.for_each_by_score(&Interval::inclusive(10.0), &Interval::POS_INFINITY, 0, -1, false, |_| {
        seen += 1;
        seen < 5
    });
    assert_eq!(seen, 5);
}

#[test]
fn count_matches_linear_filter() {
    let set = numbered(1_000);
    for (lo, hi) in [
        (Interval::inclusive(100.0), Interval::inclusive(199.0)),
        (Interval::exclusive(100.0), Interval::exclusive(199.0)),
        (Interval::NEG_INFINITY, Interval::inclusive(0.0)),
        (Interval::inclusive(999.0), Interval::POS_INFINITY),
        (Interval::inclusive(-5.5), Interval::inclusive(3.5)),
    ] {
        let want = set
            .iter()
            .filter(|m| lo.admits_above(m.score) && hi.admits_below(m.score))
            .count();
        assert_eq!(set.count(&lo, &hi), want, "[{lo}, {hi}]");
    }
}
