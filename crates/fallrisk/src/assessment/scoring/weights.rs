use super::super::domain::QuestionId;

/// Questionnaire items that carry a risk weight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Question {
    Dizziness,
    Balance,
    Falls,
    MobilityAid,
    UnsteadyWalking,
    RecentFall,
    StandWithoutHands,
    Medications,
    Exercise,
    Numbness,
}

impl Question {
    pub const ALL: [Question; 10] = [
        Question::Dizziness,
        Question::Balance,
        Question::Falls,
        Question::MobilityAid,
        Question::UnsteadyWalking,
        Question::RecentFall,
        Question::StandWithoutHands,
        Question::Medications,
        Question::Exercise,
        Question::Numbness,
    ];

    pub fn from_id(id: QuestionId) -> Option<Self> {
        Self::ALL.into_iter().find(|question| question.id() == id)
    }

    pub fn id(&self) -> QuestionId {
        let raw = match self {
            Question::Dizziness => 1,
            Question::Balance => 2,
            Question::Falls => 3,
            Question::MobilityAid => 4,
            Question::UnsteadyWalking => 5,
            Question::RecentFall => 6,
            Question::StandWithoutHands => 7,
            Question::Medications => 8,
            Question::Exercise => 9,
            Question::Numbness => 10,
        };
        QuestionId(raw)
    }

    /// Points per unit of the selected option.
    pub fn weight(&self) -> i64 {
        match self {
            Question::Dizziness | Question::RecentFall => 2,
            Question::Balance
            | Question::Falls
            | Question::MobilityAid
            | Question::UnsteadyWalking
            | Question::StandWithoutHands
            | Question::Medications
            | Question::Exercise
            | Question::Numbness => 1,
        }
    }
}
