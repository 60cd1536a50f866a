//! Superset grouping engine.
//!
//! Pure functions over ordered lists of logged exercises:
//! - Partition into contiguous superset groups
//! - Reassign dense orders after a change
//! - Link, unlink and move groups

use crate::LoggedExercise;
use uuid::Uuid;

/// Partition exercises into maximal runs sharing a non-null superset id
///
/// Sorts by `order` first. An exercise whose id differs from the running
/// group's id (including `None`) starts a new group.
pub fn group_exercises(exercises: &[LoggedExercise]) -> Vec<Vec<LoggedExercise>> {
    let mut sorted = exercises.to_vec();
    sorted.sort_by_key(|e| e.order);

    let mut groups: Vec<Vec<LoggedExercise>> = Vec::new();
    let mut current_group_id: Option<Uuid> = None;

    for exercise in sorted {
        let joins_current = match (exercise.superset_group_id, current_group_id) {
            (Some(id), Some(current)) => id == current,
            _ => false,
        };

        if joins_current {
            if let Some(group) = groups.last_mut() {
                group.push(exercise);
                continue;
            }
        }
        current_group_id = exercise.superset_group_id;
        groups.push(vec![exercise]);
    }

    groups
}

/// Assign a fresh dense order 0..N-1 across the flattened groups
///
/// Group sequence is kept; members inside a group keep their relative order.
pub fn reassign_orders(groups: &mut [Vec<LoggedExercise>]) {
    let mut next = 0;
    for group in groups.iter_mut() {
        group.sort_by_key(|e| e.order);
        for exercise in group.iter_mut() {
            exercise.order = next;
            next += 1;
        }
    }
}

/// Put two exercises in the same superset group
///
/// An existing group id on either side is adopted by the other; otherwise a
/// fresh id is minted for both.
pub fn link_as_superset(a: &mut LoggedExercise, b: &mut LoggedExercise) -> Uuid {
    let group_id = a
        .superset_group_id
        .or(b.superset_group_id)
        .unwrap_or_else(Uuid::new_v4);
    a.superset_group_id = Some(group_id);
    b.superset_group_id = Some(group_id);
    group_id
}

/// Remove one exercise from its superset group
///
/// A group left with a single member is dissolved. Returns the ids whose
/// superset id was cleared.
pub fn unlink(exercises: &mut [LoggedExercise], exercise_id: Uuid) -> Vec<Uuid> {
    let Some(group_id) = exercises
        .iter()
        .find(|e| e.id == exercise_id)
        .and_then(|e| e.superset_group_id)
    else {
        return Vec::new();
    };

    let mut cleared = Vec::new();
    for exercise in exercises.iter_mut().filter(|e| e.id == exercise_id) {
        exercise.superset_group_id = None;
        cleared.push(exercise.id);
    }

    let remaining: Vec<usize> = exercises
        .iter()
        .enumerate()
        .filter(|(_, e)| e.superset_group_id == Some(group_id))
        .map(|(index, _)| index)
        .collect();
    if let [only] = remaining.as_slice() {
        exercises[*only].superset_group_id = None;
        cleared.push(exercises[*only].id);
    }

    cleared
}

/// Clear superset ids that only one exercise carries
pub fn dissolve_singleton_groups(exercises: &mut [LoggedExercise]) -> Vec<Uuid> {
    let mut cleared = Vec::new();
    let ids: Vec<Uuid> = exercises.iter().filter_map(|e| e.superset_group_id).collect();
    for exercise in exercises.iter_mut() {
        if let Some(group_id) = exercise.superset_group_id {
            if ids.iter().filter(|id| **id == group_id).count() < 2 {
                exercise.superset_group_id = None;
                cleared.push(exercise.id);
            }
        }
    }
    cleared
}

/// Move the group at `from` to position `to` and renumber everything
///
/// Returns `false` without touching anything when the indices are equal or
/// out of range.
pub fn move_group(groups: &mut Vec<Vec<LoggedExercise>>, from: usize, to: usize) -> bool {
    if from == to || from >= groups.len() || to >= groups.len() {
        return false;
    }
    let group = groups.remove(from);
    groups.insert(to, group);
    reassign_orders(groups);
    true
}

/// Pull the members of `group_id` together at the first member's position
///
/// Non-members keep their relative order; orders are renumbered densely.
/// Returns `true` if any exercise moved.
pub fn gather_group(exercises: &mut Vec<LoggedExercise>, group_id: Uuid) -> bool {
    exercises.sort_by_key(|e| e.order);
    let Some(anchor) = exercises
        .iter()
        .position(|e| e.superset_group_id == Some(group_id))
    else {
        return false;
    };

    let (members, others): (Vec<LoggedExercise>, Vec<LoggedExercise>) = exercises
        .drain(..)
        .partition(|e| e.superset_group_id == Some(group_id));
    let mut gathered = others;
    let insert_at = anchor.min(gathered.len());
    gathered.splice(insert_at..insert_at, members);

    let mut moved = false;
    for (order, exercise) in gathered.iter_mut().enumerate() {
        if exercise.order != order {
            exercise.order = order;
            moved = true;
        }
    }
    *exercises = gathered;
    moved
}

/// Members of the superset group containing `exercise`, by order
pub fn group_members<'a>(
    exercises: &'a [LoggedExercise],
    exercise: &LoggedExercise,
) -> Vec<&'a LoggedExercise> {
    let Some(group_id) = exercise.superset_group_id else {
        return Vec::new();
    };
    let mut members: Vec<&LoggedExercise> = exercises
        .iter()
        .filter(|e| e.superset_group_id == Some(group_id))
        .collect();
    members.sort_by_key(|e| e.order);
    members
}
