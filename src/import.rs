//! CSV import of analysis scores and practice-test results.
//!
//! Unlike model output, these files are written by operators, so an unknown
//! skill name is an error rather than a skipped row.

use std::io::Read;
use std::path::Path;

use serde::Deserialize;

use crate::error::Result;
use crate::mastery::PracticeResult;
use crate::models::{AnalysisBatch, SkillName, SkillScore};

/// All rows of one essay for one student, in file order.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportedAnalysis {
    pub student_id: String,
    pub essay_ref: String,
    pub batch: AnalysisBatch,
}

#[derive(Debug, Deserialize)]
struct AnalysisRow {
    student_id: String,
    essay_ref: String,
    skill: String,
    score: f64,
}

#[derive(Debug, Deserialize)]
struct PracticeRow {
    skill: String,
    score: f64,
}

pub fn read_analyses<R: Read>(source: R) -> Result<Vec<ImportedAnalysis>> {
    let mut reader = csv::Reader::from_reader(source);
    let mut imported: Vec<ImportedAnalysis> = Vec::new();

    for result in reader.deserialize::<AnalysisRow>() {
        let row = result?;
        let skill: SkillName = row.skill.parse()?;
        let score = SkillScore {
            skill,
            value: row.score.clamp(0.0, 100.0),
            aspects: Vec::new(),
        };

        let position = imported
            .iter()
            .position(|item| item.student_id == row.student_id && item.essay_ref == row.essay_ref);
        let target = match position {
            Some(index) => &mut imported[index],
            None => {
                imported.push(ImportedAnalysis {
                    student_id: row.student_id,
                    essay_ref: row.essay_ref,
                    batch: AnalysisBatch::default(),
                });
                let last = imported.len() - 1;
                &mut imported[last]
            }
        };

        // A later row for the same skill and essay replaces the earlier one.
        target.batch.scores.retain(|existing| existing.skill != skill);
        target.batch.scores.push(score);
    }

    for item in &mut imported {
        item.batch.scores.sort_by_key(|score| score.skill.position());
    }
    Ok(imported)
}

pub fn read_analyses_file(path: &Path) -> Result<Vec<ImportedAnalysis>> {
    read_analyses(std::fs::File::open(path)?)
}

pub fn read_practice_results<R: Read>(source: R) -> Result<Vec<PracticeResult>> {
    let mut reader = csv::Reader::from_reader(source);
    let mut results = Vec::new();
    for row in reader.deserialize::<PracticeRow>() {
        let row = row?;
        results.push(PracticeResult {
            skill: row.skill.parse()?,
            score: row.score,
        });
    }
    Ok(results)
}

pub fn read_practice_file(path: &Path) -> Result<Vec<PracticeResult>> {
    read_practice_results(std::fs::File::open(path)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MasteryError;

    #[test]
    fn groups_rows_per_student_essay() {
        let csv = "student_id,essay_ref,skill,score\n\
                   s1,e1,argument_structure,70\n\
                   s2,e9,thesis_construction,40\n\
                   s1,e1,thesis_construction,80\n\
                   s1,e2,thesis_construction,90\n\
                   s1,e1,argument_structure,75\n";
        let imported = read_analyses(csv.as_bytes()).unwrap();
        assert_eq!(imported.len(), 3);
        assert_eq!(imported[0].essay_ref, "e1");
        assert_eq!(imported[1].student_id, "s2");
        let first = &imported[0].batch.scores;
        assert_eq!(first.len(), 2);
        assert_eq!(first[0].skill, SkillName::ThesisConstruction);
        assert_eq!(first[1].value, 75.0);
    }

    #[test]
    fn clamps_imported_scores() {
        let csv = "student_id,essay_ref,skill,score\ns1,e1,logical_reasoning,140\n";
        let imported = read_analyses(csv.as_bytes()).unwrap();
        assert_eq!(imported[0].batch.scores[0].value, 100.0);
    }

    #[test]
    fn unknown_skill_is_an_error() {
        let csv = "student_id,essay_ref,skill,score\ns1,e1,spelling,50\n";
        let err = read_analyses(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, MasteryError::UnknownSkill(name) if name == "spelling"));
    }

    #[test]
    fn bad_score_is_a_csv_error() {
        let csv = "student_id,essay_ref,skill,score\ns1,e1,logical_reasoning,high\n";
        assert!(matches!(read_analyses(csv.as_bytes()), Err(MasteryError::Csv(_))));
    }

    #[test]
    fn reads_practice_results() {
        let csv = "skill,score\nevidence_evaluation,40\nevidence_evaluation,61\n";
        let results = read_practice_results(csv.as_bytes()).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[1].score, 61.0);
    }
}
