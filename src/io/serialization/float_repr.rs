//! Serde adapters for floats that may be non-finite.
//!
//! JSON has no representation for NaN or infinities. Human readable formats
//! therefore store non-finite values as the strings `"nan"`, `"inf"` and
//! `"-inf"`; binary formats store the raw `f64`.

use serde::de::{self, Deserializer, SeqAccess, Visitor};
use serde::ser::{SerializeSeq, Serializer};
use serde::{Deserialize, Serialize};
use std::fmt;

struct Repr(f64);

impl Serialize for Repr {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let v = self.0;
        if !serializer.is_human_readable() || v.is_finite() {
            serializer.serialize_f64(v)
        } else if v.is_nan() {
            serializer.serialize_str("nan")
        } else if v > 0.0 {
            serializer.serialize_str("inf")
        } else {
            serializer.serialize_str("-inf")
        }
    }
}

struct ReprVisitor;

impl<'de> Visitor<'de> for ReprVisitor {
    type Value = f64;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a number or one of \"nan\", \"inf\", \"-inf\"")
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<f64, E> {
        Ok(v)
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<f64, E> {
        Ok(v as f64)
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<f64, E> {
        Ok(v as f64)
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<f64, E> {
        match v {
            "nan" => Ok(f64::NAN),
            "inf" => Ok(f64::INFINITY),
            "-inf" => Ok(f64::NEG_INFINITY),
            other => Err(E::invalid_value(de::Unexpected::Str(other), &self)),
        }
    }
}

impl<'de> Deserialize<'de> for Repr {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        if deserializer.is_human_readable() {
            deserializer.deserialize_any(ReprVisitor).map(Repr)
        } else {
            f64::deserialize(deserializer).map(Repr)
        }
    }
}

pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    Repr(*value).serialize(serializer)
}

pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    Repr::deserialize(deserializer).map(|r| r.0)
}

/// The same encoding for `Vec<f64>`.
pub mod vec {
    use super::*;

    pub fn serialize<S: Serializer>(values: &[f64], serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(values.len()))?;
        for &v in values {
            seq.serialize_element(&Repr(v))?;
        }
        seq.end()
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<f64>, D::Error> {
        struct SeqVisitor;

        impl<'de> Visitor<'de> for SeqVisitor {
            type Value = Vec<f64>;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a sequence of numbers")
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Vec<f64>, A::Error> {
                let mut values = Vec::with_capacity(seq.size_hint().unwrap_or(0));
                while let Some(Repr(v)) = seq.next_element()? {
                    values.push(v);
                }
                Ok(values)
            }
        }

        deserializer.deserialize_seq(SeqVisitor)
    }
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Serialize, Deserialize)]
    struct Sample {
        #[serde(with = "crate::io::serialization::float_repr")]
        value: f64,
        #[serde(with = "crate::io::serialization::float_repr::vec")]
        series: Vec<f64>,
    }

    #[test]
    fn test_json_non_finite() {
        let sample = Sample {
            value: f64::NAN,
            series: vec![0.1, f64::INFINITY, -2.5],
        };
        let text = serde_json::to_string(&sample).unwrap();
        assert!(text.contains("\"nan\""));
        let back: Sample = serde_json::from_str(&text).unwrap();
        assert!(back.value.is_nan());
        assert_eq!(back.series[0], 0.1);
        assert_eq!(back.series[1], f64::INFINITY);
    }

    #[test]
    fn test_bincode_raw() {
        let sample = Sample {
            value: 1.0 / 3.0,
            series: vec![f64::NAN],
        };
        let bytes = bincode::serialize(&sample).unwrap();
        let back: Sample = bincode::deserialize(&bytes).unwrap();
        assert_eq!(back.value, 1.0 / 3.0);
        assert!(back.series[0].is_nan());
    }
}
