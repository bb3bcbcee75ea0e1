//! Chord expansion for instrument rows.

use crate::model::{ChordAddition, ChordType};

fn base_intervals(chord: ChordType) -> &'static [i32] {
    match chord {
        ChordType::None => &[0],
        ChordType::Major => &[0, 4, 7],
        ChordType::Minor => &[0, 3, 7],
        ChordType::Dominant => &[0, 4, 7, 10],
    }
}

fn addition_interval(chord: ChordType, addition: ChordAddition) -> Option<i32> {
    match addition {
        ChordAddition::None => None,
        ChordAddition::Seventh if chord == ChordType::Major => Some(11),
        ChordAddition::Seventh => Some(10),
        ChordAddition::Ninth => Some(14),
        ChordAddition::Fourth => Some(5),
    }
}

/// Notes of a chord built on `root`.
///
/// The chord's intervals come first, then the addition. Transposition rotates
/// the list left one note at a time, re-appending each rotated note an octave
/// up: C minor with transposition 2 is G, C', Eb'. Notes above 127 are
/// dropped. A `None` chord is just the root.
pub fn chord_notes(
    root: u8,
    chord: ChordType,
    addition: ChordAddition,
    transpose: u8,
) -> Vec<u8> {
    if chord == ChordType::None {
        return vec![root];
    }

    let mut notes: Vec<i32> = base_intervals(chord)
        .iter()
        .map(|&i| i32::from(root) + i)
        .collect();
    if let Some(extra) = addition_interval(chord, addition) {
        let note = i32::from(root) + extra;
        if !notes.contains(&note) {
            notes.push(note);
        }
    }

    for _ in 0..transpose {
        let lowest = notes.remove(0);
        notes.push(lowest + 12);
    }

    notes
        .into_iter()
        .filter(|n| (0..=127).contains(n))
        .map(|n| n as u8)
        .collect()
}
