//! Rust element types that map onto dataset scalar types.

use crate::types::{Datum, ScalarType};

/// A Rust type that can be stored as a dataset element.
pub trait Element: Sized + Clone {
    /// The dataset scalar type this element is stored as.
    const SCALAR: ScalarType;

    /// Convert into a dynamically-typed element.
    fn into_datum(self) -> Datum;

    /// Convert back from a dynamically-typed element.
    fn from_datum(datum: Datum) -> Option<Self>;
}

impl Element for i32 {
    const SCALAR: ScalarType = ScalarType::I32;

    fn into_datum(self) -> Datum {
        Datum::Int(i64::from(self))
    }

    fn from_datum(datum: Datum) -> Option<Self> {
        match datum {
            Datum::Int(v) => i32::try_from(v).ok(),
            _ => None,
        }
    }
}

impl Element for i64 {
    const SCALAR: ScalarType = ScalarType::I64;

    fn into_datum(self) -> Datum {
        Datum::Int(self)
    }

    fn from_datum(datum: Datum) -> Option<Self> {
        match datum {
            Datum::Int(v) => Some(v),
            _ => None,
        }
    }
}

impl Element for u64 {
    const SCALAR: ScalarType = ScalarType::U64;

    fn into_datum(self) -> Datum {
        Datum::UInt(self)
    }

    fn from_datum(datum: Datum) -> Option<Self> {
        match datum {
            Datum::UInt(v) => Some(v),
            _ => None,
        }
    }
}

impl Element for f64 {
    const SCALAR: ScalarType = ScalarType::F64;

    fn into_datum(self) -> Datum {
        Datum::Real(self)
    }

    fn from_datum(datum: Datum) -> Option<Self> {
        match datum {
            Datum::Real(v) => Some(v),
            _ => None,
        }
    }
}

impl Element for String {
    const SCALAR: ScalarType = ScalarType::Str;

    fn into_datum(self) -> Datum {
        Datum::Str(self)
    }

    fn from_datum(datum: Datum) -> Option<Self> {
        match datum {
            Datum::Str(v) => Some(v),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn i32_rejects_out_of_range_datum() {
        assert_eq!(i32::from_datum(Datum::Int(7)), Some(7));
        assert_eq!(i32::from_datum(Datum::Int(i64::MAX)), None);
        assert_eq!(f64::from_datum(Datum::Int(1)), None);
    }
}
