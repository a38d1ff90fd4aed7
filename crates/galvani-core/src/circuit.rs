//! Circuit container and JSON persistence.
//!
//! The circuit owns components keyed by identifier. Insertion order is
//! preserved and observable: the solver assigns voltage-source auxiliary rows
//! in iteration order, so the container must iterate deterministically.

use std::collections::BTreeMap;

use indexmap::IndexMap;
use serde::de::{Deserializer, Error as _};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};

use crate::component::{Component, ComponentKind};
use crate::error::Result;
use crate::geom::Point;

/// Default filename for persisted circuits.
pub const DEFAULT_CIRCUIT_FILE: &str = "circuit.json";

/// A circuit: components keyed by identifier, in insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Circuit {
    pub components: IndexMap<String, Component>,
}

/// Persisted projection: `{"components": [...]}`.
#[derive(Serialize, Deserialize)]
struct CircuitDoc {
    #[serde(default)]
    components: Vec<Component>,
}

impl Circuit {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a component with a fresh random identifier. Returns the identifier.
    pub fn add(
        &mut self,
        kind: ComponentKind,
        a: Point,
        b: Point,
        props: &[(&str, f64)],
    ) -> String {
        let cid = random_cid();
        let mut comp = Component::new(cid.clone(), kind, a, b);
        comp.props = props
            .iter()
            .map(|(name, value)| (name.to_string(), *value))
            .collect::<BTreeMap<_, _>>();
        self.components.insert(cid.clone(), comp);
        cid
    }

    /// Insert a fully-built component, keyed by its own identifier.
    pub fn insert(&mut self, comp: Component) {
        self.components.insert(comp.cid.clone(), comp);
    }

    pub fn get(&self, cid: &str) -> Option<&Component> {
        self.components.get(cid)
    }

    pub fn get_mut(&mut self, cid: &str) -> Option<&mut Component> {
        self.components.get_mut(cid)
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Delete the first component (in insertion order) with an endpoint or
    /// rounded midpoint at `p`. Returns the deleted identifier.
    pub fn delete_at(&mut self, p: Point) -> Option<String> {
        let hit = self.components.iter().find_map(|(cid, c)| {
            if c.a == p || c.b == p {
                return Some(cid.clone());
            }
            let mx = ((c.a.x + c.b.x) as f64 / 2.0).round() as i32;
            let my = ((c.a.y + c.b.y) as f64 / 2.0).round() as i32;
            (mx == p.x && my == p.y).then(|| cid.clone())
        })?;
        self.components.shift_remove(&hit);
        Some(hit)
    }

    /// Hit test: the component whose endpoint or midpoint is nearest to `p`,
    /// if that distance is at most 1 (L¹).
    pub fn find_near(&self, p: Point) -> Option<&Component> {
        let mut best: Option<&Component> = None;
        let mut best_d = i32::MAX;
        for c in self.components.values() {
            for q in [c.a, c.b, c.a.midpoint(c.b)] {
                let d = q.l1_distance(p);
                if d < best_d {
                    best_d = d;
                    best = Some(c);
                }
            }
        }
        (best_d <= 1).then_some(best).flatten()
    }

    /// JSON projection of the whole circuit.
    pub fn to_json(&self) -> serde_json::Value {
        // Serialization of a component list cannot fail.
        serde_json::to_value(self).unwrap_or_else(|_| serde_json::json!({ "components": [] }))
    }

    /// Build a circuit from a JSON projection.
    pub fn from_json(value: &serde_json::Value) -> Result<Self> {
        Ok(serde_json::from_value(value.clone())?)
    }

    /// Replace the in-memory circuit atomically with a JSON projection.
    ///
    /// On error the existing contents are left untouched.
    pub fn apply_json(&mut self, value: &serde_json::Value) -> Result<()> {
        let next = Circuit::from_json(value)?;
        *self = next;
        Ok(())
    }
}

impl Serialize for Circuit {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct DocRef<'a> {
            components: Vec<&'a Component>,
        }
        DocRef {
            components: self.components.values().collect(),
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Circuit {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let doc = CircuitDoc::deserialize(deserializer)?;
        let mut cir = Circuit::new();
        for comp in doc.components {
            if comp.cid.is_empty() {
                return Err(D::Error::custom("component with empty cid"));
            }
            cir.insert(comp);
        }
        Ok(cir)
    }
}

/// A fresh 32-hex-character identifier.
fn random_cid() -> String {
    format!("{:032x}", rand::random::<u128>())
}
