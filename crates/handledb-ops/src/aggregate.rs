//! Aggregation functions for group_by.

use std::fmt;
use std::str::FromStr;

use handledb_core::Value;

use crate::error::OpError;

/// Supported aggregation functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggFunc {
    /// Sum of non-null numeric values.
    Sum,
    /// Count of non-null values.
    Count,
    /// Arithmetic mean of non-null numeric values.
    Mean,
    /// Minimum non-null value.
    Min,
    /// Maximum non-null value.
    Max,
}

impl AggFunc {
    /// All recognized names, for error messages.
    pub const NAMES: &'static [&'static str] = &["sum", "count", "mean", "min", "max"];
}

impl FromStr for AggFunc {
    type Err = OpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sum" => Ok(AggFunc::Sum),
            "count" => Ok(AggFunc::Count),
            "mean" | "avg" => Ok(AggFunc::Mean),
            "min" => Ok(AggFunc::Min),
            "max" => Ok(AggFunc::Max),
            other => Err(OpError::invalid(format!(
                "unsupported aggregation '{}', expected one of: {}",
                other,
                Self::NAMES.join(", ")
            ))),
        }
    }
}

impl fmt::Display for AggFunc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AggFunc::Sum => "sum",
            AggFunc::Count => "count",
            AggFunc::Mean => "mean",
            AggFunc::Min => "min",
            AggFunc::Max => "max",
        };
        write!(f, "{}", name)
    }
}

/// Accumulator for a single aggregated column within one group.
#[derive(Debug, Clone)]
pub enum Accumulator {
    Sum { total: f64, all_integer: bool, seen: bool },
    Count(i64),
    Mean { sum: f64, count: i64 },
    Min(Option<Value>),
    Max(Option<Value>),
}

impl Accumulator {
    /// Creates a fresh accumulator for the given function.
    pub fn new(func: AggFunc) -> Self {
        match func {
            AggFunc::Sum => Accumulator::Sum {
                total: 0.0,
                all_integer: true,
                seen: false,
            },
            AggFunc::Count => Accumulator::Count(0),
            AggFunc::Mean => Accumulator::Mean { sum: 0.0, count: 0 },
            AggFunc::Min => Accumulator::Min(None),
            AggFunc::Max => Accumulator::Max(None),
        }
    }

    /// Accumulates a value. Nulls are skipped by every function.
    pub fn accumulate(&mut self, value: &Value) {
        if value.is_null() {
            return;
        }

        match self {
            Accumulator::Sum {
                total,
                all_integer,
                seen,
            } => {
                if let Some(v) = value.to_f64() {
                    *total += v;
                    *seen = true;
                    if !matches!(value, Value::Integer(_) | Value::Boolean(_)) {
                        *all_integer = false;
                    }
                }
            }
            Accumulator::Count(count) => {
                *count += 1;
            }
            Accumulator::Mean { sum, count } => {
                if let Some(v) = value.to_f64() {
                    *sum += v;
                    *count += 1;
                }
            }
            Accumulator::Min(min) => {
                if min.as_ref().map_or(true, |m| value < m) {
                    *min = Some(value.clone());
                }
            }
            Accumulator::Max(max) => {
                if max.as_ref().map_or(true, |m| value > m) {
                    *max = Some(value.clone());
                }
            }
        }
    }

    /// Returns the final result. Sums over all-integer input stay
    /// integers; means are always floats.
    pub fn result(&self) -> Value {
        match self {
            Accumulator::Sum {
                total,
                all_integer,
                seen,
            } => {
                if !seen {
                    Value::Null
                } else if *all_integer {
                    Value::Integer(*total as i64)
                } else {
                    Value::Float(*total)
                }
            }
            Accumulator::Count(count) => Value::Integer(*count),
            Accumulator::Mean { sum, count } => {
                if *count == 0 {
                    Value::Null
                } else {
                    Value::Float(*sum / *count as f64)
                }
            }
            Accumulator::Min(min) => min.clone().unwrap_or(Value::Null),
            Accumulator::Max(max) => max.clone().unwrap_or(Value::Null),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(func: AggFunc, values: &[Value]) -> Value {
        let mut acc = Accumulator::new(func);
        for v in values {
            acc.accumulate(v);
        }
        acc.result()
    }

    #[test]
    fn test_sum_integers_stay_integer() {
        let result = run(AggFunc::Sum, &[Value::int(10), Value::int(20), Value::int(5)]);
        assert_eq!(result, Value::int(35));
    }

    #[test]
    fn test_sum_mixed_becomes_float() {
        let result = run(AggFunc::Sum, &[Value::int(1), Value::float(0.5)]);
        assert_eq!(result, Value::float(1.5));
    }

    #[test]
    fn test_count_skips_nulls() {
        let result = run(
            AggFunc::Count,
            &[Value::int(1), Value::Null, Value::string("x")],
        );
        assert_eq!(result, Value::int(2));
    }

    #[test]
    fn test_mean() {
        let result = run(AggFunc::Mean, &[Value::int(2), Value::int(4)]);
        assert_eq!(result, Value::float(3.0));
        assert_eq!(run(AggFunc::Mean, &[Value::Null]), Value::Null);
    }

    #[test]
    fn test_min_max() {
        let values = [Value::int(3), Value::Null, Value::int(1), Value::int(2)];
        assert_eq!(run(AggFunc::Min, &values), Value::int(1));
        assert_eq!(run(AggFunc::Max, &values), Value::int(3));
    }

    #[test]
    fn test_parse_agg_func() {
        assert_eq!("sum".parse::<AggFunc>().unwrap(), AggFunc::Sum);
        assert_eq!("MEAN".parse::<AggFunc>().unwrap(), AggFunc::Mean);
        assert_eq!("avg".parse::<AggFunc>().unwrap(), AggFunc::Mean);
        assert!(matches!(
            "median".parse::<AggFunc>(),
            Err(OpError::InvalidParameter(_))
        ));
    }
}
