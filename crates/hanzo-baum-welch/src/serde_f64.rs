//! Serde helpers for log-likelihoods that may be non-finite.
//!
//! JSON has no encoding for infinities or NaN, so those are written as the
//! strings `"-inf"`, `"inf"` and `"nan"`. Finite values stay plain numbers.

use serde::de::{self, Deserializer, Unexpected};
use serde::{Deserialize, Serialize, Serializer};

#[derive(Deserialize)]
#[serde(untagged)]
enum Repr {
    Number(f64),
    Text(String),
}

fn text(value: f64) -> Option<&'static str> {
    if value.is_nan() {
        Some("nan")
    } else if value == f64::INFINITY {
        Some("inf")
    } else if value == f64::NEG_INFINITY {
        Some("-inf")
    } else {
        None
    }
}

/// One value in the extended representation.
struct Extended(f64);

impl Serialize for Extended {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match text(self.0) {
            Some(t) => serializer.serialize_str(t),
            None => serializer.serialize_f64(self.0),
        }
    }
}

impl<'de> Deserialize<'de> for Extended {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match Repr::deserialize(deserializer)? {
            Repr::Number(v) => Ok(Extended(v)),
            Repr::Text(s) => match s.as_str() {
                "-inf" => Ok(Extended(f64::NEG_INFINITY)),
                "inf" => Ok(Extended(f64::INFINITY)),
                "nan" => Ok(Extended(f64::NAN)),
                other => Err(de::Error::invalid_value(
                    Unexpected::Str(other),
                    &"a number, \"-inf\", \"inf\" or \"nan\"",
                )),
            },
        }
    }
}

pub(crate) fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    Extended(*value).serialize(serializer)
}

pub(crate) fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    Extended::deserialize(deserializer).map(|e| e.0)
}

/// Same representation for a sequence of values.
pub(crate) mod vec {
    use super::Extended;
    use serde::{Deserialize, Deserializer, Serializer};

    pub(crate) fn serialize<S: Serializer>(
        values: &[f64],
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(values.iter().map(|v| Extended(*v)))
    }

    pub(crate) fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Vec<f64>, D::Error> {
        let values = Vec::<Extended>::deserialize(deserializer)?;
        Ok(values.into_iter().map(|e| e.0).collect())
    }
}
