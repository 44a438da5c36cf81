//! Precedence merge of layer outputs.
//!
//! Layers are merged lowest priority first (defaults < file < env < CLI).
//! A later candidate replaces an earlier one and the loss is recorded as an
//! [`Override`]. List parameters declared with [`MergePolicy::Append`]
//! concatenate instead, so candidates from every source survive with the
//! highest-precedence elements last. Defaults never participate in an
//! append: a declared default only applies when no source provided a value.

use indexmap::map::Entry;
use indexmap::IndexMap;

use crate::config_value::{ConfigValue, Sourced};
use crate::provenance::{Override, Provenance};
use crate::schema::{MergePolicy, Schema};

/// Result of merging all layers.
pub struct MergeResult {
    /// One winning (or concatenated) candidate per parameter.
    pub values: IndexMap<String, ConfigValue>,
    /// Records of values that lost to a higher-precedence source.
    pub overrides: Vec<Override>,
}

/// Merge layer value maps given in ascending priority order.
pub fn merge_layers(schema: &Schema, layers: Vec<&IndexMap<String, ConfigValue>>) -> MergeResult {
    let mut values: IndexMap<String, ConfigValue> = IndexMap::new();
    let mut overrides = Vec::new();

    for layer in layers {
        for (name, candidate) in layer {
            let append = schema
                .get(name)
                .map(|spec| spec.is_repeated() && spec.merge_policy() == MergePolicy::Append)
                .unwrap_or(false);

            match values.entry(name.clone()) {
                Entry::Vacant(entry) => {
                    entry.insert(candidate.clone());
                }
                Entry::Occupied(mut entry) => {
                    let existing = entry.get_mut();
                    let existing_is_default = existing
                        .provenance()
                        .map(Provenance::is_default)
                        .unwrap_or(false);

                    if append && !existing_is_default {
                        append_into(existing, candidate.clone());
                    } else {
                        let winner = candidate.provenance().cloned().unwrap_or_default();
                        let loser = existing.provenance().cloned().unwrap_or_default();
                        overrides.push(Override::new(name.clone(), winner, loser));
                        *existing = candidate.clone();
                    }
                }
            }
        }
    }

    MergeResult { values, overrides }
}

/// Concatenate an incoming candidate onto an existing one, normalizing
/// scalars to single-element lists.
fn append_into(existing: &mut ConfigValue, incoming: ConfigValue) {
    let mut elements = match existing.clone() {
        ConfigValue::Array(arr) => arr.value,
        other => vec![other],
    };

    let incoming_provenance = incoming.provenance().cloned();
    match incoming {
        ConfigValue::Array(arr) => elements.extend(arr.value),
        other => elements.push(other),
    }

    let mut sourced = Sourced::new(elements);
    sourced.provenance = incoming_provenance;
    *existing = ConfigValue::Array(sourced);
}
