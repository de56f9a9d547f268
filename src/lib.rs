//! Skill mastery tracking for argumentative essay feedback.
//!
//! Raw essay analysis from a language model is turned into per-skill scores
//! (`extract`), folded into each student's persisted mastery with an
//! exponential moving average (`mastery`), and summarized as a learning path
//! with a tier, recommended skills and a next milestone (`planner`).

pub mod config;
pub mod engine;
pub mod error;
pub mod extract;
pub mod import;
pub mod mastery;
pub mod models;
pub mod planner;
pub mod practice;
pub mod report;
pub mod service;
pub mod store;
pub mod telemetry;

pub use config::EngineConfig;
pub use engine::{AssessmentEngine, AssessmentOutcome};
pub use error::{MasteryError, Result};
pub use models::{AssessmentAggregate, LearningPath, ProgressSnapshot, SkillName, Tier};
