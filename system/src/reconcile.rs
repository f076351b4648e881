use std::collections::HashMap;

use crate::SceneElement;

/// Whether `incoming` should replace `local` for the same element id.
///
/// A strictly greater version always wins. On an exact version tie the
/// element with the smaller nonce wins, so any two replicas shown the same
/// conflicting pair pick the same winner without coordination. Tombstones
/// follow the same rule as live edits.
pub fn remote_wins(local: &SceneElement, incoming: &SceneElement) -> bool {
    incoming.version > local.version
        || (incoming.version == local.version && incoming.version_nonce < local.version_nonce)
}

/// Merges an incoming element batch into the local scene.
///
/// Pure and deterministic: the same two input lists always produce the same
/// output, and applying batches in any interleaving converges to the same
/// per-element state. Survivor order follows the local list; elements seen
/// for the first time append in arrival order.
pub fn reconcile(local: &[SceneElement], incoming: &[SceneElement]) -> Vec<SceneElement> {
    let mut merged: Vec<SceneElement> = local.to_vec();
    let mut positions: HashMap<String, usize> = merged
        .iter()
        .enumerate()
        .map(|(i, element)| (element.id.clone(), i))
        .collect();

    for remote in incoming {
        match positions.get(&remote.id) {
            Some(&i) => {
                if remote_wins(&merged[i], remote) {
                    merged[i] = remote.clone();
                }
            }
            None => {
                positions.insert(remote.id.clone(), merged.len());
                merged.push(remote.clone());
            }
        }
    }

    merged
}
