use numline_core::{Color, ConfigError, Key, Layout, LineSegment, Palette};
use serde::Deserialize;
use std::path::Path;

/// Keys every configuration file must define.
pub const REQUIRED_KEYS: [&str; 17] = [
    "SCREEN_RES",
    "MONITOR_WIDTH",
    "BACKGROUND_COLOR",
    "STIM_COLOR",
    "HIGHLIGHT_COLOR",
    "HATCH_COLOR",
    "FRAME_RATE",
    "NL_ABS_LENGTH",
    "HATCH_LENGTH",
    "NO_BLOCKS",
    "BLOCK_LENGTH",
    "ONLY_WHOLE_NUMBERS",
    "WANTED_NUMBERS",
    "NUMBER_TO_POS",
    "NL_START_END",
    "READY_MSG",
    "READY_LETTER",
];

const DEFAULT_WELCOME: &str = "W trakcie badania prezentowana Ci będzie oś liczbowa \
o oznaczonym początku oraz końcu.\n\n\
Twoim zadaniem jest odczytać umieszczoną nad nią wartość liczbową \
i nanieść ją na oś za pomocą lewego przycisku myszy.\n\n\
Kiedy będziesz gotowx, kliknij spację.";
const DEFAULT_PREPARE: &str = "Poczekaj na próbę";
const DEFAULT_REMINDER: &str = "Zaznacz pozycję liczby!";

fn default_welcome() -> String {
    DEFAULT_WELCOME.to_string()
}

fn default_prepare() -> String {
    DEFAULT_PREPARE.to_string()
}

fn default_reminder() -> String {
    DEFAULT_REMINDER.to_string()
}

/// Session configuration, loaded once at startup and read-only afterwards.
///
/// Per-block settings are parallel lists indexed by block; each must have
/// exactly `NO_BLOCKS` entries.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct ExperimentConfig {
    pub screen_res: [u32; 2],
    /// Physical width of the screen in cm.
    pub monitor_width: f64,
    pub background_color: Color,
    pub stim_color: Color,
    pub highlight_color: Color,
    pub hatch_color: Color,
    pub frame_rate: u32,
    /// Line length in cm.
    pub nl_abs_length: f64,
    pub hatch_length: f64,
    pub no_blocks: usize,
    pub block_length: Vec<usize>,
    pub only_whole_numbers: Vec<bool>,
    pub wanted_numbers: Vec<Vec<f64>>,
    pub number_to_pos: Vec<bool>,
    pub nl_start_end: Vec<[f64; 2]>,
    pub ready_msg: String,
    /// Letter height of the ready button in normalized units.
    pub ready_letter: f64,
    #[serde(default)]
    pub abort_key: Key,
    #[serde(default = "default_welcome")]
    pub welcome_msg: String,
    #[serde(default = "default_prepare")]
    pub prepare_msg: String,
    #[serde(default = "default_reminder")]
    pub reminder_msg: String,
}

/// Settings of one block.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockConfig {
    /// 0-based position in declaration order.
    pub index: usize,
    pub trials: usize,
    pub whole_numbers: bool,
    pub wanted: Vec<f64>,
    pub show_target: bool,
    pub line: LineSegment,
}

impl BlockConfig {
    /// Number of targets drawn at random.
    pub fn generated_count(&self) -> usize {
        self.trials.saturating_sub(self.wanted.len())
    }

    /// Distinct whole numbers in `[start, end)`.
    pub fn available_whole_numbers(&self) -> usize {
        (self.line.end.ceil() - self.line.start.ceil()).max(0.0) as usize
    }

    /// Checks that the block's targets can be generated.
    pub fn check_feasible(&self) -> Result<(), ConfigError> {
        if self.wanted.len() > self.trials {
            return Err(ConfigError::InvalidValue {
                key: "WANTED_NUMBERS",
                reason: format!(
                    "block {} lists {} wanted numbers but has only {} trials",
                    self.index + 1,
                    self.wanted.len(),
                    self.trials
                ),
            });
        }
        if self.whole_numbers && self.generated_count() > self.available_whole_numbers() {
            return Err(ConfigError::InfeasibleSampling {
                block: self.index + 1,
                requested: self.generated_count(),
                available: self.available_whole_numbers(),
            });
        }
        Ok(())
    }
}

impl ExperimentConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&raw)
    }

    pub fn from_yaml_str(raw: &str) -> Result<Self, ConfigError> {
        let value: serde_yaml::Value =
            serde_yaml::from_str(raw).map_err(|e| ConfigError::Parse(e.to_string()))?;
        let map = value
            .as_mapping()
            .ok_or_else(|| ConfigError::Parse("top level must be a mapping".to_string()))?;
        if let Some(key) = REQUIRED_KEYS.iter().find(|k| !map.contains_key(**k)) {
            return Err(ConfigError::MissingKey { key: *key });
        }
        let config: Self =
            serde_yaml::from_value(value).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks cross-key consistency. Runs before any window is opened.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("MONITOR_WIDTH", self.monitor_width),
            ("NL_ABS_LENGTH", self.nl_abs_length),
            ("HATCH_LENGTH", self.hatch_length),
            ("READY_LETTER", self.ready_letter),
        ];
        for (key, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::InvalidValue {
                    key,
                    reason: format!("must be positive, got {value}"),
                });
            }
        }
        if self.screen_res.contains(&0) {
            return Err(ConfigError::InvalidValue {
                key: "SCREEN_RES",
                reason: format!("{:?} has a zero dimension", self.screen_res),
            });
        }
        if self.frame_rate == 0 {
            return Err(ConfigError::InvalidValue {
                key: "FRAME_RATE",
                reason: "must be positive".to_string(),
            });
        }
        if self.nl_abs_length > self.monitor_width {
            return Err(ConfigError::InvalidValue {
                key: "NL_ABS_LENGTH",
                reason: format!(
                    "line of {} cm does not fit a {} cm wide screen",
                    self.nl_abs_length, self.monitor_width
                ),
            });
        }
        if self.no_blocks == 0 {
            return Err(ConfigError::InvalidValue {
                key: "NO_BLOCKS",
                reason: "at least one block is required".to_string(),
            });
        }

        let lengths = [
            ("BLOCK_LENGTH", self.block_length.len()),
            ("ONLY_WHOLE_NUMBERS", self.only_whole_numbers.len()),
            ("WANTED_NUMBERS", self.wanted_numbers.len()),
            ("NUMBER_TO_POS", self.number_to_pos.len()),
            ("NL_START_END", self.nl_start_end.len()),
        ];
        for (key, found) in lengths {
            if found != self.no_blocks {
                return Err(ConfigError::BlockCountMismatch {
                    key,
                    expected: self.no_blocks,
                    found,
                });
            }
        }

        for block in self.blocks() {
            if !block.line.is_valid() {
                return Err(ConfigError::InvalidValue {
                    key: "NL_START_END",
                    reason: format!(
                        "block {}: end {} must be greater than start {}",
                        block.index + 1,
                        block.line.end,
                        block.line.start
                    ),
                });
            }
            let integral = block.line.start.fract() == 0.0 && block.line.end.fract() == 0.0;
            if block.whole_numbers && !integral {
                return Err(ConfigError::InvalidValue {
                    key: "NL_START_END",
                    reason: format!(
                        "block {} draws whole numbers but its bounds {}..{} are not integers",
                        block.index + 1,
                        block.line.start,
                        block.line.end
                    ),
                });
            }
            if block.wanted.iter().any(|w| !w.is_finite()) {
                return Err(ConfigError::InvalidValue {
                    key: "WANTED_NUMBERS",
                    reason: format!("block {} contains a non-finite number", block.index + 1),
                });
            }
            block.check_feasible()?;
        }
        Ok(())
    }

    /// Settings of block `index`.
    ///
    /// Panics if `index >= no_blocks`; `validate` guarantees every list covers
    /// that range.
    pub fn block(&self, index: usize) -> BlockConfig {
        let [start, end] = self.nl_start_end[index];
        BlockConfig {
            index,
            trials: self.block_length[index],
            whole_numbers: self.only_whole_numbers[index],
            wanted: self.wanted_numbers[index].clone(),
            show_target: self.number_to_pos[index],
            line: LineSegment::new(start, end),
        }
    }

    /// Blocks in declaration order.
    pub fn blocks(&self) -> Vec<BlockConfig> {
        (0..self.no_blocks).map(|i| self.block(i)).collect()
    }

    pub fn total_trials(&self) -> usize {
        self.block_length.iter().sum()
    }

    pub fn palette(&self) -> Palette {
        Palette {
            background: self.background_color,
            stimulus: self.stim_color,
            highlight: self.highlight_color,
            hatch: self.hatch_color,
        }
    }

    pub fn layout(&self) -> Layout {
        let res = (self.screen_res[0], self.screen_res[1]);
        Layout::new(
            self.monitor_width,
            Layout::screen_height_for(res, self.monitor_width),
            self.nl_abs_length,
            self.hatch_length,
            self.ready_msg.clone(),
            self.ready_letter,
        )
    }
}
