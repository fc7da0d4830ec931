/// Interaction states of a single trial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MarkPhase {
    #[default]
    AwaitingFirstTouch,
    Tracking,
    Confirmed,
}

/// One number to locate together with its ground-truth fraction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Target {
    pub value: f64,
    pub fraction: f64,
}

/// Seconds since the trial loop started.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TrialTiming {
    pub first_mark_secs: f64,
    pub confirm_secs: f64,
}

/// Recorded result per trial
#[derive(Debug, Clone, PartialEq)]
pub struct TrialRecord {
    pub participant: String,
    /// 1-based.
    pub block: usize,
    /// 1-based, within the block.
    pub trial: usize,
    pub target_value: f64,
    pub target_fraction: f64,
    pub marked_value: f64,
    pub marked_fraction: f64,
    pub first_mark_secs: f64,
    pub confirm_secs: f64,
}

impl TrialRecord {
    pub const HEADER: [&'static str; 9] = [
        "PART_ID",
        "Block_no",
        "Trial_no",
        "Target_no",
        "Target_fr",
        "Marked_no",
        "Marked_fr",
        "Marked_time",
        "Click_time",
    ];

    /// Field values in `HEADER` order.
    pub fn fields(&self) -> [String; 9] {
        [
            self.participant.clone(),
            self.block.to_string(),
            self.trial.to_string(),
            self.target_value.to_string(),
            self.target_fraction.to_string(),
            self.marked_value.to_string(),
            self.marked_fraction.to_string(),
            self.first_mark_secs.to_string(),
            self.confirm_secs.to_string(),
        ]
    }
}
