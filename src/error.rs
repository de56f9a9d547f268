use thiserror::Error;

use crate::models::SkillName;

#[derive(Error, Debug)]
pub enum MasteryError {
    #[error("skill {0} is missing from the assessment")]
    MissingSkill(SkillName),

    #[error("skill {0} appears more than once in the assessment")]
    DuplicateSkill(SkillName),

    #[error("skill {skill} has level {level}, outside [0, 100]")]
    LevelOutOfRange { skill: SkillName, level: f64 },

    #[error("unknown skill name: {0}")]
    UnknownSkill(String),

    #[error("invalid student id: {0:?}")]
    InvalidStudentId(String),

    #[error("no assessment found for student {0}")]
    NotFound(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

pub type Result<T> = std::result::Result<T, MasteryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_skill_names_the_skill() {
        let err = MasteryError::MissingSkill(SkillName::SourceIntegration);
        assert_eq!(
            err.to_string(),
            "skill source_integration is missing from the assessment"
        );
    }

    #[test]
    fn out_of_range_level_reports_value() {
        let err = MasteryError::LevelOutOfRange {
            skill: SkillName::LogicalReasoning,
            level: 250.0,
        };
        assert_eq!(
            err.to_string(),
            "skill logical_reasoning has level 250, outside [0, 100]"
        );
    }

    #[test]
    fn json_errors_convert() {
        let parse = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: MasteryError = parse.into();
        assert!(err.to_string().starts_with("JSON error"));
    }
}
