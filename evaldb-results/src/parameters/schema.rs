//! Record layout of each variable kind's distribution parameters.

use crate::types::VariableKind;
use evaldb_core::ScalarType;

/// Type of one parameter field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    /// Real scalar.
    Real,
    /// Integer scalar.
    Int,
    /// String scalar.
    Str,
    /// Ragged real array.
    RealArray,
    /// Ragged integer array.
    IntArray,
    /// Ragged string array.
    StrArray,
}

impl ParamType {
    /// Element type in the compound record.
    pub const fn scalar(self) -> ScalarType {
        match self {
            Self::Real | Self::RealArray => ScalarType::F64,
            Self::Int | Self::IntArray => ScalarType::I32,
            Self::Str | Self::StrArray => ScalarType::Str,
        }
    }

    /// Whether the field is a ragged array.
    pub const fn is_array(self) -> bool {
        matches!(self, Self::RealArray | Self::IntArray | Self::StrArray)
    }
}

/// One field of a parameter record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParamField {
    /// Field name.
    pub name: &'static str,
    /// Field type.
    pub ty: ParamType,
}

const fn real(name: &'static str) -> ParamField {
    ParamField { name, ty: ParamType::Real }
}

const fn int(name: &'static str) -> ParamField {
    ParamField { name, ty: ParamType::Int }
}

const fn reals(name: &'static str) -> ParamField {
    ParamField { name, ty: ParamType::RealArray }
}

const fn ints(name: &'static str) -> ParamField {
    ParamField { name, ty: ParamType::IntArray }
}

const fn strs(name: &'static str) -> ParamField {
    ParamField { name, ty: ParamType::StrArray }
}

// Shared layouts.
const BOUNDS: &[ParamField] = &[real("lower_bound"), real("upper_bound")];
const INT_BOUNDS: &[ParamField] = &[int("lower_bound"), int("upper_bound")];
const ALPHA_BETA: &[ParamField] = &[real("alpha"), real("beta")];
const INT_SET: &[ParamField] = &[ints("elements")];
const STR_SET: &[ParamField] = &[strs("elements")];
const REAL_SET: &[ParamField] = &[reals("elements")];
const TRIALS: &[ParamField] = &[real("probability_per_trial"), int("num_trials")];

// Per-distribution layouts.
const NORMAL: &[ParamField] = &[
    real("mean"),
    real("std_deviation"),
    real("lower_bound"),
    real("upper_bound"),
];
const LOGNORMAL: &[ParamField] = &[
    real("lambda"),
    real("zeta"),
    real("error_factor"),
    real("mean"),
    real("std_deviation"),
    real("lower_bound"),
    real("upper_bound"),
];
const TRIANGULAR: &[ParamField] = &[real("mode"), real("lower_bound"), real("upper_bound")];
const EXPONENTIAL: &[ParamField] = &[real("beta")];
const BETA: &[ParamField] = &[
    real("alpha"),
    real("beta"),
    real("lower_bound"),
    real("upper_bound"),
];
const HISTOGRAM_REAL: &[ParamField] = &[reals("abscissas"), reals("counts")];
const POISSON: &[ParamField] = &[real("lambda")];
const GEOMETRIC: &[ParamField] = &[real("probability_per_trial")];
const HYPERGEOMETRIC: &[ParamField] = &[
    int("total_population"),
    int("selected_population"),
    int("num_drawn"),
];
const HISTOGRAM_INT: &[ParamField] = &[ints("abscissas"), reals("counts")];
const HISTOGRAM_STR: &[ParamField] = &[strs("abscissas"), reals("counts")];
const CONTINUOUS_INTERVAL: &[ParamField] = &[
    reals("probabilities"),
    reals("lower_bounds"),
    reals("upper_bounds"),
];
const DISCRETE_INTERVAL: &[ParamField] = &[
    reals("probabilities"),
    ints("lower_bounds"),
    ints("upper_bounds"),
];
const UNCERTAIN_INT_SET: &[ParamField] = &[ints("elements"), reals("probabilities")];
const UNCERTAIN_STR_SET: &[ParamField] = &[strs("elements"), reals("probabilities")];
const UNCERTAIN_REAL_SET: &[ParamField] = &[reals("elements"), reals("probabilities")];

/// Field layout of the parameter record for `kind`.
///
/// When any field is an array, the stored record is prefixed with a
/// `num_elements` integer field shared by all array fields.
pub fn schema_for(kind: VariableKind) -> &'static [ParamField] {
    use VariableKind::*;
    match kind {
        ContinuousDesign | ContinuousState | UniformUncertain | LoguniformUncertain => BOUNDS,
        DiscreteDesignRange | DiscreteStateRange => INT_BOUNDS,
        DiscreteDesignSetInt | DiscreteStateSetInt => INT_SET,
        DiscreteDesignSetString | DiscreteStateSetString => STR_SET,
        DiscreteDesignSetReal | DiscreteStateSetReal => REAL_SET,
        NormalUncertain => NORMAL,
        LognormalUncertain => LOGNORMAL,
        TriangularUncertain => TRIANGULAR,
        ExponentialUncertain => EXPONENTIAL,
        BetaUncertain => BETA,
        GammaUncertain | GumbelUncertain | FrechetUncertain | WeibullUncertain => ALPHA_BETA,
        HistogramBinUncertain | HistogramPointUncertainReal => HISTOGRAM_REAL,
        PoissonUncertain => POISSON,
        BinomialUncertain | NegativeBinomialUncertain => TRIALS,
        GeometricUncertain => GEOMETRIC,
        HypergeometricUncertain => HYPERGEOMETRIC,
        HistogramPointUncertainInt => HISTOGRAM_INT,
        HistogramPointUncertainString => HISTOGRAM_STR,
        ContinuousIntervalUncertain => CONTINUOUS_INTERVAL,
        DiscreteIntervalUncertain => DISCRETE_INTERVAL,
        DiscreteUncertainSetInt => UNCERTAIN_INT_SET,
        DiscreteUncertainSetString => UNCERTAIN_STR_SET,
        DiscreteUncertainSetReal => UNCERTAIN_REAL_SET,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_kind_has_fields() {
        for kind in VariableKind::ALL {
            assert!(!schema_for(*kind).is_empty(), "{} has no fields", kind);
        }
    }

    #[test]
    fn array_kinds() {
        assert!(schema_for(VariableKind::HistogramBinUncertain).iter().all(|f| f.ty.is_array()));
        assert!(!schema_for(VariableKind::NormalUncertain).iter().any(|f| f.ty.is_array()));
        assert_eq!(ParamType::IntArray.scalar(), ScalarType::I32);
    }

    #[test]
    fn layouts_are_static() {
        let normal: &'static [ParamField] = schema_for(VariableKind::NormalUncertain);
        let names: Vec<&str> = normal.iter().map(|f| f.name).collect();
        assert_eq!(names, ["mean", "std_deviation", "lower_bound", "upper_bound"]);
        assert_eq!(schema_for(VariableKind::LognormalUncertain).len(), 7);
        assert_eq!(
            schema_for(VariableKind::DiscreteIntervalUncertain)[1].ty,
            ParamType::IntArray
        );
    }
}
