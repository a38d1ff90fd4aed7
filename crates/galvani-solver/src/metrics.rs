//! Per-component readouts derived from a solve result.

use serde::{Deserialize, Serialize};

use galvani_core::Component;

use crate::resistance::effective_resistance;
use crate::solve::SolveResult;

/// A measurable field on a component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MeasureField {
    /// Current from `a` to `b`.
    Iab,
    /// Voltage across the component, `Va - Vb`.
    Vab,
    /// Voltage at endpoint `a`.
    Va,
    /// Voltage at endpoint `b`.
    Vb,
    /// Dissipated power, `Vab * Iab`.
    P,
    /// Effective resistance (absent for open components).
    R,
}

/// Snapshot of a component's electrical quantities.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ComponentMetrics {
    pub va: f64,
    pub vb: f64,
    pub vab: f64,
    pub iab: f64,
    pub p: f64,
    pub r: Option<f64>,
}

impl ComponentMetrics {
    pub fn field(&self, field: MeasureField) -> Option<f64> {
        match field {
            MeasureField::Iab => Some(self.iab),
            MeasureField::Vab => Some(self.vab),
            MeasureField::Va => Some(self.va),
            MeasureField::Vb => Some(self.vb),
            MeasureField::P => Some(self.p),
            MeasureField::R => self.r,
        }
    }
}

/// Compute the readouts for one component against a solve result.
pub fn component_metrics(result: &SolveResult, comp: &Component) -> ComponentMetrics {
    let va = result.voltage(comp.a);
    let vb = result.voltage(comp.b);
    let vab = va - vb;
    let iab = result.current(&comp.cid);
    ComponentMetrics {
        va,
        vb,
        vab,
        iab,
        p: vab * iab,
        r: effective_resistance(comp),
    }
}
