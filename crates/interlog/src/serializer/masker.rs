//! Recursive masking over captured values.
//!
//! The masker walks lists, maps and records, replacing values under
//! sensitive keys with the mask token. Foreign records and opaque values are
//! never walked; they become `TypeName@identity` tags. Records nested deeper
//! than the policy's limit are tagged as well.
//!
//! Foreign detection matches type-name prefixes such as `std::`. Only the
//! outermost captured record has a fully qualified name; nested records carry
//! serde's short struct name and are walked like any other record.
//!
//! Masking tracks changes so unchanged subtrees are cloned once at the end
//! rather than rebuilt, and masking an already-masked value is a no-op.

use dashmap::DashMap;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use super::policy::MaskingPolicy;
use crate::value::{Record, Value};

/// Per-type sensitivity of record fields.
#[derive(Debug)]
struct FieldPlan {
    sensitive: HashMap<String, bool>,
}

impl FieldPlan {
    fn is_sensitive(&self, field: &str, policy: &MaskingPolicy) -> bool {
        self.sensitive
            .get(field)
            .copied()
            .unwrap_or_else(|| policy.is_sensitive(field))
    }
}

/// Applies a [`MaskingPolicy`] to captured values.
#[derive(Debug)]
pub struct Masker {
    policy: MaskingPolicy,
    plans: DashMap<String, Arc<FieldPlan>>,
}

impl Masker {
    /// Creates a masker for `policy`.
    pub fn new(policy: MaskingPolicy) -> Self {
        Self {
            policy,
            plans: DashMap::new(),
        }
    }

    /// The policy in use.
    pub fn policy(&self) -> &MaskingPolicy {
        &self.policy
    }

    /// Returns a masked copy of `value`.
    pub fn mask(&self, value: &Value) -> Value {
        if !self.policy.is_enabled() {
            return value.clone();
        }
        self.mask_internal(value, 0)
            .unwrap_or_else(|| value.clone())
    }

    /// Registers a sensitive field name and invalidates cached field plans.
    pub fn register_sensitive_field(&self, field: &str) {
        if self.policy.register_field(field) {
            self.plans.clear();
        }
    }

    /// Number of cached per-type field plans.
    pub fn plan_count(&self) -> usize {
        self.plans.len()
    }

    /// Drops all cached field plans, returning how many were cached.
    pub fn clear_plans(&self) -> usize {
        let dropped = self.plans.len();
        self.plans.clear();
        dropped
    }

    fn token(&self) -> Value {
        Value::String(self.policy.mask_token().to_string())
    }

    /// Returns None when nothing under `value` changed.
    fn mask_internal(&self, value: &Value, depth: usize) -> Option<Value> {
        match value {
            Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_) => None,
            Value::List(items) => {
                let mut masked = Vec::with_capacity(items.len());
                let mut any_changed = false;
                for item in items {
                    match self.mask_internal(item, depth + 1) {
                        Some(changed) => {
                            masked.push(changed);
                            any_changed = true;
                        }
                        None => masked.push(item.clone()),
                    }
                }
                any_changed.then_some(Value::List(masked))
            }
            Value::Map(map) => {
                let mut masked = BTreeMap::new();
                let mut any_changed = false;
                for (key, item) in map {
                    let replacement = self.mask_entry(self.policy.is_sensitive(key), item, depth);
                    any_changed |= replacement.is_some();
                    masked.insert(key.clone(), replacement.unwrap_or_else(|| item.clone()));
                }
                any_changed.then_some(Value::Map(masked))
            }
            Value::Object(record) => {
                if self.policy.is_foreign(&record.type_name) || depth >= self.policy.max_depth() {
                    return Some(Value::String(value.type_tag()));
                }
                let plan = self.plan_for(record);
                let mut fields = Vec::with_capacity(record.fields.len());
                let mut any_changed = false;
                for (name, item) in &record.fields {
                    let sensitive = plan.is_sensitive(name, &self.policy);
                    let replacement = self.mask_entry(sensitive, item, depth);
                    any_changed |= replacement.is_some();
                    fields.push((name.clone(), replacement.unwrap_or_else(|| item.clone())));
                }
                any_changed.then(|| {
                    Value::Object(Record {
                        type_name: record.type_name.clone(),
                        fields,
                    })
                })
            }
            Value::Opaque { .. } => Some(Value::String(value.type_tag())),
        }
    }

    fn mask_entry(&self, sensitive: bool, item: &Value, depth: usize) -> Option<Value> {
        if sensitive {
            let token = self.token();
            (*item != token).then_some(token)
        } else {
            self.mask_internal(item, depth + 1)
        }
    }

    fn plan_for(&self, record: &Record) -> Arc<FieldPlan> {
        if let Some(plan) = self.plans.get(&*record.type_name) {
            return Arc::clone(plan.value());
        }
        let plan = Arc::new(FieldPlan {
            sensitive: record
                .fields
                .iter()
                .map(|(name, _)| (name.clone(), self.policy.is_sensitive(name)))
                .collect(),
        });
        self.plans
            .insert(record.type_name.to_string(), Arc::clone(&plan));
        plan
    }
}
