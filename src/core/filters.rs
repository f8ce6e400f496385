use std::collections::HashSet;

use crate::models::Actor;

/// Likers the recipient has not liked back
///
/// Keeps the order of `received`. The subtracted side goes into a hash set,
/// so the whole pass is linear in the size of both lists.
pub fn unreciprocated(received: Vec<Actor>, sent: &[Actor]) -> Vec<Actor> {
    let liked_back: HashSet<&str> = sent.iter().map(|a| a.id.as_str()).collect();

    received
        .into_iter()
        .filter(|actor| !liked_back.contains(actor.id.as_str()))
        .collect()
}
