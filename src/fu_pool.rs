//! Functional-unit pool: the closed set of operation classes and the latency table built from one
//! `(op_latency, issue_latency)` pair.

use crate::error::{Error, Result};
use strum::{EnumCount, IntoEnumIterator};

/// Operation classes the engine schedules onto functional units.
///
/// The set is closed. Every class must receive an entry in a [`FunctionalUnitTable`]; a class
/// without one is treated as unsupported by the engine.
#[derive(
    strum::EnumIter,
    strum::EnumCount,
    strum::AsRefStr,
    Clone,
    Copy,
    Debug,
    Hash,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
)]
pub enum OperationClass {
    FloatAdd,
    FloatCmp,
    FloatCvt,
    FloatDiv,
    FloatMult,
    FloatMisc,
    FloatSqrt,
    SimdAdd,
    SimdAddAcc,
    SimdAlu,
    SimdCmp,
    SimdCvt,
    SimdMisc,
    SimdMult,
    SimdMultAcc,
    SimdShift,
    SimdShiftAcc,
    SimdSqrt,
    SimdFloatAdd,
    SimdFloatAlu,
    SimdFloatCmp,
    SimdFloatCvt,
    SimdFloatDiv,
    SimdFloatMisc,
    SimdFloatMult,
    SimdFloatMultAcc,
    SimdFloatSqrt,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OpCategory {
    Float,
    SimdInt,
    SimdFloat,
}

impl OperationClass {
    pub fn category(self) -> OpCategory {
        use OperationClass::*;
        match self {
            FloatAdd | FloatCmp | FloatCvt | FloatDiv | FloatMult | FloatMisc | FloatSqrt => {
                OpCategory::Float
            }
            SimdAdd | SimdAddAcc | SimdAlu | SimdCmp | SimdCvt | SimdMisc | SimdMult
            | SimdMultAcc | SimdShift | SimdShiftAcc | SimdSqrt => OpCategory::SimdInt,
            SimdFloatAdd | SimdFloatAlu | SimdFloatCmp | SimdFloatCvt | SimdFloatDiv
            | SimdFloatMisc | SimdFloatMult | SimdFloatMultAcc | SimdFloatSqrt => {
                OpCategory::SimdFloat
            }
        }
    }
}

/// Latency entry for one operation class.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OpDesc {
    pub class: OperationClass,
    pub latency: u32,
}

/// A single functional unit serving every operation class.
///
/// `issue_latency` applies to the unit as a whole, not per class.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FunctionalUnitTable {
    op_list: Vec<OpDesc>,
    op_latency: u32,
    issue_latency: u32,
    count: u32,
}

impl FunctionalUnitTable {
    pub fn op_list(&self) -> &[OpDesc] {
        &self.op_list
    }

    /// Per-class latency, or `None` if the class is unsupported.
    pub fn latency(&self, class: OperationClass) -> Option<u32> {
        self.op_list
            .iter()
            .find(|desc| desc.class == class)
            .map(|desc| desc.latency)
    }

    pub fn supports(&self, class: OperationClass) -> bool {
        self.latency(class).is_some()
    }

    /// Latency of the unit itself.
    pub fn op_latency(&self) -> u32 {
        self.op_latency
    }

    pub fn issue_latency(&self) -> u32 {
        self.issue_latency
    }

    /// Number of identical units in the pool.
    pub fn count(&self) -> u32 {
        self.count
    }

    #[cfg(test)]
    pub(crate) fn remove(&mut self, class: OperationClass) {
        self.op_list.retain(|desc| desc.class != class);
    }
}

/// Expands a latency pair into a full table: every class gets `op_latency`.
///
/// Any positive pair is accepted, including `issue_latency < op_latency`.
pub fn build_latency_table(op_latency: u32, issue_latency: u32) -> Result<FunctionalUnitTable> {
    if op_latency == 0 {
        return Err(Error::InvalidConfiguration(
            "op latency must be at least 1".to_string(),
        ));
    }
    if issue_latency == 0 {
        return Err(Error::InvalidConfiguration(
            "issue latency must be at least 1".to_string(),
        ));
    }
    let op_list: Vec<OpDesc> = OperationClass::iter()
        .map(|class| OpDesc {
            class,
            latency: op_latency,
        })
        .collect();
    debug_assert_eq!(op_list.len(), OperationClass::COUNT);
    Ok(FunctionalUnitTable {
        op_list,
        op_latency,
        issue_latency,
        count: 1,
    })
}
