//! Scoped Overlay
//!
//! An additive chain of variable/env bindings that shadow a parent on
//! lookup and are discarded on return. Implemented as a linked chain of
//! immutable layers rather than a copied map, so `Derive` stays O(1)
//! even under deep nesting (retry inside parallel inside timeout).

use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Default)]
struct OverlayLayer {
    vars: HashMap<String, String>,
    env: HashMap<String, String>,
    parent: Option<Arc<OverlayLayer>>,
}

/// A scoped overlay; cheap to clone (it's a reference-counted pointer to
/// an immutable chain).
#[derive(Debug, Clone, Default)]
pub struct Overlay(Option<Arc<OverlayLayer>>);

impl Overlay {
    pub fn empty() -> Self {
        Self(None)
    }

    /// Push a new layer on top of this overlay with the given additional
    /// bindings, returning the child without mutating `self`.
    pub fn push(&self, vars: HashMap<String, String>, env: HashMap<String, String>) -> Self {
        Self(Some(Arc::new(OverlayLayer {
            vars,
            env,
            parent: self.0.clone(),
        })))
    }

    pub fn get_var(&self, key: &str) -> Option<String> {
        let mut node = self.0.as_ref();
        while let Some(layer) = node {
            if let Some(v) = layer.vars.get(key) {
                return Some(v.clone());
            }
            node = layer.parent.as_ref();
        }
        None
    }

    pub fn get_env(&self, key: &str) -> Option<String> {
        let mut node = self.0.as_ref();
        while let Some(layer) = node {
            if let Some(v) = layer.env.get(key) {
                return Some(v.clone());
            }
            node = layer.parent.as_ref();
        }
        None
    }

    /// Flatten the whole chain into a single map, root first so closer
    /// layers win on collision. Used to build a transport call's env
    /// overlay, which has no notion of "fall through to parent" — it
    /// needs one concrete map.
    pub fn flatten_env(&self) -> HashMap<String, String> {
        let mut layers = Vec::new();
        let mut node = self.0.as_ref();
        while let Some(layer) = node {
            layers.push(layer);
            node = layer.parent.as_ref();
        }
        let mut out = HashMap::new();
        for layer in layers.into_iter().rev() {
            out.extend(layer.env.clone());
        }
        out
    }
}
