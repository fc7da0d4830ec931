use numline_core::ConfigError;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sex {
    M,
    F,
}

impl fmt::Display for Sex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Sex::M => "M",
            Sex::F => "F",
        })
    }
}

impl FromStr for Sex {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "M" | "m" => Ok(Sex::M),
            "F" | "f" => Ok(Sex::F),
            other => Err(ConfigError::InvalidValue {
                key: "sex",
                reason: format!("expected M or F, got `{other}`"),
            }),
        }
    }
}

/// Identity collected before the session starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    pub id: String,
    pub sex: Sex,
    pub age: String,
}

/// Characters that cannot appear in the output file name on common platforms.
const FORBIDDEN: [char; 9] = ['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

fn check_file_name_part(key: &'static str, value: &str) -> Result<(), ConfigError> {
    match value.chars().find(|c| FORBIDDEN.contains(c) || c.is_control()) {
        Some(c) => Err(ConfigError::InvalidValue {
            key,
            reason: format!("`{value}` contains {c:?}, which cannot be used in a file name"),
        }),
        None => Ok(()),
    }
}

impl Participant {
    /// Trims the fields and rejects values that cannot form the output file
    /// name.
    pub fn new(id: impl Into<String>, sex: Sex, age: impl Into<String>) -> Result<Self, ConfigError> {
        let id = id.into().trim().to_string();
        if id.is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "id",
                reason: "participant id must not be empty".to_string(),
            });
        }
        let age = age.into().trim().to_string();
        check_file_name_part("id", &id)?;
        check_file_name_part("age", &age)?;
        Ok(Self { id, sex, age })
    }

    /// Tag written into every record and used in the output file name,
    /// e.g. `P07_23F`.
    pub fn identifier(&self) -> String {
        format!("{}_{}{}", self.id, self.age, self.sex)
    }
}
