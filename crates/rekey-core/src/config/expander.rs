// Rekey Logical-Key Expander
// Replaces logical keys with the fan-out of their concrete members

use smallvec::SmallVec;

use crate::config::Config;
use crate::key::{Key, KeyEvent, KeySequence, KeyState};

/// A logical-key registration. A definition with more than two members is
/// chained through anonymous intermediate nodes, so expansion of `both` into
/// `left | right` flattens any definition transitively.
pub(crate) struct LogicalKey {
    pub name: String,
    pub both: Key,
    pub left: Key,
    pub right: Key,
}

/// Replace every logical key in the catalog, in reverse registration order
/// so later definitions may reference earlier ones.
pub(crate) fn expand_logical_keys(config: &mut Config, logical_keys: &[LogicalKey]) {
    for logical in logical_keys.iter().rev() {
        replace_logical_key(config, logical.both, logical.left, logical.right);
        log::trace!(
            "expanded logical key '{}' into {} / {}",
            logical.name,
            logical.left,
            logical.right
        );
    }
}

fn replace_logical_key(config: &mut Config, both: Key, left: Key, right: Key) {
    for context in &mut config.contexts {
        // !both means: neither member may be down
        for input in &mut context.inputs {
            replace_not_key(&mut input.input, both, left, right);
        }
        for output in &mut context.outputs {
            replace_not_key(output, both, left, right);
        }
        for command in &mut context.command_outputs {
            replace_not_key(&mut command.output, both, left, right);
        }

        // split each press occurrence into a left and a right variant; the
        // variants of several occurrences multiply out
        let mut i = 0;
        while i < context.inputs.len() {
            let Some(occurrence) = find_press_occurrence(&context.inputs[i].input, both) else {
                i += 1;
                continue;
            };
            let mut right_copy = context.inputs[i].clone();
            for &event in &occurrence {
                context.inputs[i].input[event].key = left;
                right_copy.input[event].key = right;
            }
            // a directly mapped output that also names the logical key is
            // duplicated and paired with the right variant
            if right_copy.output_index >= 0 {
                let output_index = right_copy.output_index as usize;
                if contains_key(&context.outputs[output_index], both) {
                    right_copy.output_index = context.outputs.len() as i32;
                    let mut output = context.outputs[output_index].clone();
                    replace_key(&mut output, both, right);
                    context.outputs.push(output);
                }
            }
            context.inputs.insert(i + 1, right_copy);
            // stay on i: the left variant may contain further occurrences
        }
        for input in &mut context.inputs {
            replace_key(&mut input.input, both, left);
        }

        // remaining references resolve to the left member
        for output in &mut context.outputs {
            replace_key(output, both, left);
        }
        for command in &mut context.command_outputs {
            replace_key(&mut command.output, both, left);
        }
    }
}

/// Indices of the next press occurrence of `key`: the press event, its
/// synchronizing `Down` when the press is async, and the matching release.
fn find_press_occurrence(sequence: &KeySequence, key: Key) -> Option<SmallVec<[usize; 3]>> {
    let first = sequence.iter().position(|event| {
        event.key == key && matches!(event.state, KeyState::Down | KeyState::DownAsync)
    })?;
    let mut indices = SmallVec::new();
    indices.push(first);
    let mut cursor = first + 1;
    if sequence[first].state == KeyState::DownAsync {
        if let Some(offset) = sequence[cursor..]
            .iter()
            .position(|event| event.key == key && event.state == KeyState::Down)
        {
            indices.push(cursor + offset);
            cursor += offset + 1;
        }
    }
    if let Some(offset) = sequence[cursor..].iter().position(|event| {
        event.key == key && matches!(event.state, KeyState::Up | KeyState::UpAsync)
    }) {
        indices.push(cursor + offset);
    }
    Some(indices)
}

fn contains_key(sequence: &KeySequence, key: Key) -> bool {
    sequence.iter().any(|event| event.key == key)
}

fn replace_key(sequence: &mut KeySequence, from: Key, to: Key) {
    for event in sequence {
        if event.key == from {
            event.key = to;
        }
    }
}

/// Replace `!both` with `!left !right`.
fn replace_not_key(sequence: &mut KeySequence, both: Key, left: Key, right: Key) {
    let mut i = 0;
    while i < sequence.len() {
        if sequence[i].key == both && sequence[i].state == KeyState::Not {
            sequence[i].key = right;
            sequence.insert(i, KeyEvent::new(left, KeyState::Not));
            i += 2;
        } else {
            i += 1;
        }
    }
}
