//! Canonical cross-type ordering.
//!
//! `compare` is total and is what sorting, `$min`/`$max` and range matching
//! ultimately rely on. `compare_scalars` is the query-time variant that reports
//! `NotEqual` for values of different type brackets instead of ordering them.

use std::cmp::Ordering;

use crate::document::Value;

use super::types::{CompareResult, Order};

// 2^63; every double in [-2^63, 2^63) has an exact i64 integer part.
const TWO_POW_63: f64 = 9_223_372_036_854_775_808.0;

static NULL: Value = Value::Null;

/// Position of a value's type in the canonical order. All numeric cases
/// share one bracket.
#[must_use]
pub const fn type_rank(v: &Value) -> u8 {
    match v {
        Value::MinKey => 0,
        Value::Null => 1,
        Value::Int32(_) | Value::Int64(_) | Value::Double(_) => 2,
        Value::String(_) => 3,
        Value::Document(_) => 4,
        Value::Array(_) => 5,
        Value::Binary(_) => 6,
        Value::ObjectId(_) => 7,
        Value::Bool(_) => 8,
        Value::DateTime(_) => 9,
        Value::MaxKey => 10,
    }
}

fn cmp_f64(x: f64, y: f64) -> Ordering {
    match (x.is_nan(), y.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (false, false) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
    }
}

/// Exact comparison of an integer with a double, without rounding `i`.
fn cmp_i64_f64(i: i64, f: f64) -> Ordering {
    if f.is_nan() {
        return Ordering::Greater;
    }
    if f >= TWO_POW_63 {
        return Ordering::Less;
    }
    if f < -TWO_POW_63 {
        return Ordering::Greater;
    }
    let t = f.trunc();
    #[allow(clippy::cast_possible_truncation)]
    let ti = t as i64;
    match i.cmp(&ti) {
        Ordering::Equal if f > t => Ordering::Less,
        Ordering::Equal if f < t => Ordering::Greater,
        o => o,
    }
}

/// Compares two numeric values by mathematical value. NaN is the smallest
/// number and equal to itself. Non-numeric input compares `Equal`.
#[must_use]
pub fn compare_numbers(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Double(x), Value::Double(y)) => cmp_f64(*x, *y),
        (Value::Double(x), Value::Int32(i)) => cmp_f64(*x, f64::from(*i)),
        (Value::Int32(i), Value::Double(y)) => cmp_f64(f64::from(*i), *y),
        (Value::Double(x), Value::Int64(i)) => cmp_i64_f64(*i, *x).reverse(),
        (Value::Int64(i), Value::Double(y)) => cmp_i64_f64(*i, *y),
        (Value::Int32(x), Value::Int32(y)) => x.cmp(y),
        (Value::Int32(x), Value::Int64(y)) => i64::from(*x).cmp(y),
        (Value::Int64(x), Value::Int32(y)) => x.cmp(&i64::from(*y)),
        (Value::Int64(x), Value::Int64(y)) => x.cmp(y),
        _ => Ordering::Equal,
    }
}

/// Total order over all values.
#[must_use]
pub fn compare(a: &Value, b: &Value) -> Ordering {
    let (ra, rb) = (type_rank(a), type_rank(b));
    if ra != rb {
        return ra.cmp(&rb);
    }
    match (a, b) {
        (Value::String(x), Value::String(y)) => x.as_bytes().cmp(y.as_bytes()),
        (Value::Document(x), Value::Document(y)) => {
            for ((ka, va), (kb, vb)) in x.iter().zip(y.iter()) {
                let o = type_rank(va)
                    .cmp(&type_rank(vb))
                    .then_with(|| ka.as_bytes().cmp(kb.as_bytes()))
                    .then_with(|| compare(va, vb));
                if o != Ordering::Equal {
                    return o;
                }
            }
            x.len().cmp(&y.len())
        }
        (Value::Array(x), Value::Array(y)) => {
            for (va, vb) in x.iter().zip(y) {
                let o = compare(va, vb);
                if o != Ordering::Equal {
                    return o;
                }
            }
            x.len().cmp(&y.len())
        }
        (Value::Binary(x), Value::Binary(y)) => x
            .bytes
            .len()
            .cmp(&y.bytes.len())
            .then(x.subtype.cmp(&y.subtype))
            .then_with(|| x.bytes.cmp(&y.bytes)),
        (Value::ObjectId(x), Value::ObjectId(y)) => x.bytes().cmp(&y.bytes()),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::DateTime(x), Value::DateTime(y)) => x.timestamp_millis().cmp(&y.timestamp_millis()),
        _ if a.is_number() => compare_numbers(a, b),
        // MinKey, MaxKey and Null carry no payload.
        _ => Ordering::Equal,
    }
}

/// Query-time comparison: numbers compare across representations, other
/// values only within their own type.
#[must_use]
pub fn compare_scalars(a: &Value, b: &Value) -> CompareResult {
    if a.is_number() && b.is_number() {
        return compare_numbers(a, b).into();
    }
    if type_rank(a) != type_rank(b) {
        return CompareResult::NotEqual;
    }
    compare(a, b).into()
}

enum SortOperand<'a> {
    EmptyArray,
    Value(&'a Value),
}

fn sort_operand(v: Option<&Value>, order: Order) -> SortOperand<'_> {
    match v {
        None => SortOperand::Value(&NULL),
        Some(Value::Array(items)) => {
            let pick = match order {
                Order::Asc => items.iter().min_by(|x, y| compare(x, y)),
                Order::Desc => items.iter().max_by(|x, y| compare(x, y)),
            };
            pick.map_or(SortOperand::EmptyArray, SortOperand::Value)
        }
        Some(v) => SortOperand::Value(v),
    }
}

/// Compares two sort-key values, `None` meaning the field is absent.
///
/// Absent sorts as Null. An array sorts by its smallest element when
/// ascending and its largest when descending; an empty array sorts after
/// MinKey and before everything else.
#[must_use]
pub fn compare_for_sort(a: Option<&Value>, b: Option<&Value>, order: Order) -> Ordering {
    let o = match (sort_operand(a, order), sort_operand(b, order)) {
        (SortOperand::EmptyArray, SortOperand::EmptyArray) => Ordering::Equal,
        (SortOperand::EmptyArray, SortOperand::Value(v)) => {
            if matches!(v, Value::MinKey) { Ordering::Greater } else { Ordering::Less }
        }
        (SortOperand::Value(v), SortOperand::EmptyArray) => {
            if matches!(v, Value::MinKey) { Ordering::Less } else { Ordering::Greater }
        }
        (SortOperand::Value(x), SortOperand::Value(y)) => compare(x, y),
    };
    order.apply(o)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;

    #[test]
    fn numbers_compare_by_value() {
        assert_eq!(compare(&Value::Int32(2), &Value::Double(2.0)), Ordering::Equal);
        assert_eq!(compare(&Value::Int64(3), &Value::Int32(2)), Ordering::Greater);
        assert_eq!(compare(&Value::Double(f64::NAN), &Value::Int64(i64::MIN)), Ordering::Less);
        assert_eq!(compare(&Value::Double(f64::NAN), &Value::Double(f64::NAN)), Ordering::Equal);
    }

    #[test]
    fn large_int64_is_not_rounded() {
        // 2^53 + 1 is not representable as f64; naive float conversion would say Equal.
        let big = Value::Int64((1 << 53) + 1);
        assert_eq!(compare(&big, &Value::Double(9_007_199_254_740_992.0)), Ordering::Greater);
        assert_eq!(compare(&Value::Int64(i64::MAX), &Value::Double(TWO_POW_63)), Ordering::Less);
        assert_eq!(compare(&Value::Int64(-2), &Value::Double(-1.5)), Ordering::Less);
    }

    #[test]
    fn type_brackets_follow_canonical_order() {
        let ordered = [
            Value::MinKey,
            Value::Null,
            Value::Int32(100),
            Value::from("a"),
            Value::Document(Document::new()),
            Value::Array(vec![]),
            Value::Binary(crate::document::Binary { subtype: 0, bytes: vec![] }),
            Value::ObjectId(crate::document::ObjectId::from_bytes([0; 12])),
            Value::Bool(false),
            Value::DateTime(crate::document::DateTime::from_millis(0)),
            Value::MaxKey,
        ];
        for pair in ordered.windows(2) {
            assert_eq!(compare(&pair[0], &pair[1]), Ordering::Less, "{} < {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn scalars_of_different_types_are_not_equal() {
        assert_eq!(compare_scalars(&Value::from("1"), &Value::Int32(1)), CompareResult::NotEqual);
        assert_eq!(compare_scalars(&Value::Int64(1), &Value::Double(1.0)), CompareResult::Equal);
        assert_eq!(compare_scalars(&Value::Null, &Value::Null), CompareResult::Equal);
    }

    #[test]
    fn sort_uses_array_min_or_max() {
        let arr = Value::Array(vec![Value::Int32(1), Value::Int32(5)]);
        let three = Value::Int32(3);
        assert_eq!(compare_for_sort(Some(&arr), Some(&three), Order::Asc), Ordering::Less);
        // Descending uses 5, which is greater than 3, so it comes first.
        assert_eq!(compare_for_sort(Some(&arr), Some(&three), Order::Desc), Ordering::Less);
    }

    #[test]
    fn empty_array_and_missing_field_in_sort() {
        let empty = Value::Array(vec![]);
        assert_eq!(compare_for_sort(Some(&empty), None, Order::Asc), Ordering::Less);
        assert_eq!(compare_for_sort(None, Some(&Value::Null), Order::Asc), Ordering::Equal);
        assert_eq!(compare_for_sort(Some(&Value::MinKey), Some(&empty), Order::Asc), Ordering::Less);
    }
}
