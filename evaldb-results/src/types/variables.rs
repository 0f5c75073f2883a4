//! Variable kinds and per-evaluation variable values.

use crate::error::{Result, ResultsError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Value domain a variable kind belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VariableDomain {
    /// Continuous real values.
    Continuous,
    /// Discrete integer values.
    DiscreteInt,
    /// Discrete string values.
    DiscreteString,
    /// Discrete real values.
    DiscreteReal,
}

macro_rules! variable_kinds {
    ($($variant:ident => ($name:literal, $domain:ident),)*) => {
        /// Kind of a variable: its role (design, uncertain, state) and
        /// distribution or set type.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum VariableKind {
            $(
                #[allow(missing_docs)]
                $variant,
            )*
        }

        impl VariableKind {
            /// Every kind, in declaration order.
            pub const ALL: &'static [VariableKind] = &[$(VariableKind::$variant,)*];

            /// Lower snake-case name, used for parameter table paths.
            pub const fn name(self) -> &'static str {
                match self {
                    $(Self::$variant => $name,)*
                }
            }

            /// Domain the values of this kind live in.
            pub const fn domain(self) -> VariableDomain {
                match self {
                    $(Self::$variant => VariableDomain::$domain,)*
                }
            }
        }
    };
}

variable_kinds! {
    ContinuousDesign => ("continuous_design", Continuous),
    DiscreteDesignRange => ("discrete_design_range", DiscreteInt),
    DiscreteDesignSetInt => ("discrete_design_set_int", DiscreteInt),
    DiscreteDesignSetString => ("discrete_design_set_string", DiscreteString),
    DiscreteDesignSetReal => ("discrete_design_set_real", DiscreteReal),
    NormalUncertain => ("normal_uncertain", Continuous),
    LognormalUncertain => ("lognormal_uncertain", Continuous),
    UniformUncertain => ("uniform_uncertain", Continuous),
    LoguniformUncertain => ("loguniform_uncertain", Continuous),
    TriangularUncertain => ("triangular_uncertain", Continuous),
    ExponentialUncertain => ("exponential_uncertain", Continuous),
    BetaUncertain => ("beta_uncertain", Continuous),
    GammaUncertain => ("gamma_uncertain", Continuous),
    GumbelUncertain => ("gumbel_uncertain", Continuous),
    FrechetUncertain => ("frechet_uncertain", Continuous),
    WeibullUncertain => ("weibull_uncertain", Continuous),
    HistogramBinUncertain => ("histogram_bin_uncertain", Continuous),
    PoissonUncertain => ("poisson_uncertain", DiscreteInt),
    BinomialUncertain => ("binomial_uncertain", DiscreteInt),
    NegativeBinomialUncertain => ("negative_binomial_uncertain", DiscreteInt),
    GeometricUncertain => ("geometric_uncertain", DiscreteInt),
    HypergeometricUncertain => ("hypergeometric_uncertain", DiscreteInt),
    HistogramPointUncertainInt => ("histogram_point_uncertain_int", DiscreteInt),
    HistogramPointUncertainString => ("histogram_point_uncertain_string", DiscreteString),
    HistogramPointUncertainReal => ("histogram_point_uncertain_real", DiscreteReal),
    ContinuousIntervalUncertain => ("continuous_interval_uncertain", Continuous),
    DiscreteIntervalUncertain => ("discrete_interval_uncertain", DiscreteInt),
    DiscreteUncertainSetInt => ("discrete_uncertain_set_int", DiscreteInt),
    DiscreteUncertainSetString => ("discrete_uncertain_set_string", DiscreteString),
    DiscreteUncertainSetReal => ("discrete_uncertain_set_real", DiscreteReal),
    ContinuousState => ("continuous_state", Continuous),
    DiscreteStateRange => ("discrete_state_range", DiscreteInt),
    DiscreteStateSetInt => ("discrete_state_set_int", DiscreteInt),
    DiscreteStateSetString => ("discrete_state_set_string", DiscreteString),
    DiscreteStateSetReal => ("discrete_state_set_real", DiscreteReal),
}

impl VariableKind {
    /// Upper snake-case label stored in the `types` scale.
    pub fn label(self) -> String {
        self.name().to_ascii_uppercase()
    }
}

impl fmt::Display for VariableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for VariableKind {
    type Err = ResultsError;

    fn from_str(s: &str) -> Result<Self> {
        let lower = s.to_ascii_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|k| k.name() == lower)
            .ok_or_else(|| ResultsError::UnknownVariableKind(s.to_string()))
    }
}

/// Values of one domain together with their descriptors.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct VariableBlock<T> {
    /// Values, one per variable.
    pub values: Vec<T>,
    /// Descriptors.
    pub labels: Vec<String>,
    /// 1-based variable ids.
    pub ids: Vec<u64>,
    /// Kind of each variable.
    pub kinds: Vec<VariableKind>,
}

impl<T> VariableBlock<T> {
    /// Number of variables in the block.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the block holds no variables.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn push(&mut self, label: String, id: u64, kind: VariableKind, value: T) {
        self.values.push(value);
        self.labels.push(label);
        self.ids.push(id);
        self.kinds.push(kind);
    }

    /// Upper-case kind labels.
    pub fn kind_labels(&self) -> Vec<String> {
        self.kinds.iter().map(|k| k.label()).collect()
    }
}

/// The variables of one evaluation, split by domain.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Variables {
    /// Continuous variables.
    pub continuous: VariableBlock<f64>,
    /// Discrete integer variables.
    pub discrete_int: VariableBlock<i64>,
    /// Discrete string variables.
    pub discrete_string: VariableBlock<String>,
    /// Discrete real variables.
    pub discrete_real: VariableBlock<f64>,
}

impl Variables {
    /// Empty variable set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a continuous variable.
    pub fn with_continuous(mut self, label: impl Into<String>, id: u64, kind: VariableKind, value: f64) -> Self {
        self.continuous.push(label.into(), id, kind, value);
        self
    }

    /// Add a discrete integer variable.
    pub fn with_discrete_int(mut self, label: impl Into<String>, id: u64, kind: VariableKind, value: i64) -> Self {
        self.discrete_int.push(label.into(), id, kind, value);
        self
    }

    /// Add a discrete string variable.
    pub fn with_discrete_string(
        mut self,
        label: impl Into<String>,
        id: u64,
        kind: VariableKind,
        value: impl Into<String>,
    ) -> Self {
        self.discrete_string.push(label.into(), id, kind, value.into());
        self
    }

    /// Add a discrete real variable.
    pub fn with_discrete_real(mut self, label: impl Into<String>, id: u64, kind: VariableKind, value: f64) -> Self {
        self.discrete_real.push(label.into(), id, kind, value);
        self
    }

    /// Variable counts per domain, in block order.
    pub fn shape(&self) -> [usize; 4] {
        [
            self.continuous.len(),
            self.discrete_int.len(),
            self.discrete_string.len(),
            self.discrete_real.len(),
        ]
    }

    /// Total number of variables.
    pub fn len(&self) -> usize {
        self.shape().iter().sum()
    }

    /// Whether there are no variables.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
