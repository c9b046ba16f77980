//! Referee mood labels.
//!
//! The referee's state is a narrative label drawn from three families:
//! `normal_*` (fair), `angry_*` (a wrong accusation), `sad_*` (a correct
//! accusation). Within a family the concrete label is picked uniformly
//! at random each time the state changes; the client maps labels to
//! artwork, the server only cares about the family prefix.

use rand::Rng;

const NORMAL_LABELS: &[&str] = &[
    "normal_01", "normal_02", "normal_03", "normal_04", "normal_05", "normal_06", "normal_07",
];

const ANGRY_LABELS: &[&str] = &["angry_01", "angry_02", "angry_03", "angry_04", "angry_05"];

const SAD_LABELS: &[&str] = &["sad_01", "sad_02", "sad_03", "sad_04"];

/// Number of marks an abnormal referee stays abnormal before reverting
/// to a fresh `normal_*` label.
pub const REFEREE_COUNTDOWN: u32 = 4;

/// Mood family of a referee label.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RefereeFamily {
    Normal,
    Angry,
    Sad,
}

/// Pick a uniformly random label from `family`.
pub fn pick_label(family: RefereeFamily, rng: &mut impl Rng) -> String {
    let labels = match family {
        RefereeFamily::Normal => NORMAL_LABELS,
        RefereeFamily::Angry => ANGRY_LABELS,
        RefereeFamily::Sad => SAD_LABELS,
    };
    labels[rng.gen_range(0..labels.len())].to_string()
}

/// True when `label` belongs to the fair (`normal_*`) family.
pub fn is_normal(label: &str) -> bool {
    label.starts_with("normal")
}
