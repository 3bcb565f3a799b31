//! Closed intent categories produced by the bridge and classifier

use serde::{Deserialize, Serialize};

/// Coarse intent from purely syntactic signals.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CoarseIntent {
    Question,
    Request,
    Statement,
}

impl CoarseIntent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Question => "question",
            Self::Request => "request",
            Self::Statement => "statement",
        }
    }
}

impl std::fmt::Display for CoarseIntent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fine-grained communicative function of an utterance.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum ToneFunction {
    // information seeking
    Instructional,
    FactualInquiry,
    OpinionSeeking,
    // commitments and declarations
    VowDeclaration,
    StatementDeclaration,
    // emotional expression
    EmotionalVent,
    Appreciation,
    Complaint,
    // action requests
    ActionRequest,
    AssistanceSeeking,
    // other
    CasualChat,
    Unknown,
}

impl ToneFunction {
    pub const ALL: [ToneFunction; 12] = [
        Self::Instructional,
        Self::FactualInquiry,
        Self::OpinionSeeking,
        Self::VowDeclaration,
        Self::StatementDeclaration,
        Self::EmotionalVent,
        Self::Appreciation,
        Self::Complaint,
        Self::ActionRequest,
        Self::AssistanceSeeking,
        Self::CasualChat,
        Self::Unknown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Instructional => "instructional",
            Self::FactualInquiry => "factual_inquiry",
            Self::OpinionSeeking => "opinion_seeking",
            Self::VowDeclaration => "vow_declaration",
            Self::StatementDeclaration => "statement_declaration",
            Self::EmotionalVent => "emotional_vent",
            Self::Appreciation => "appreciation",
            Self::Complaint => "complaint",
            Self::ActionRequest => "action_request",
            Self::AssistanceSeeking => "assistance_seeking",
            Self::CasualChat => "casual_chat",
            Self::Unknown => "unknown",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|t| t.as_str() == s)
    }
}

impl std::fmt::Display for ToneFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_matches_wire_names() {
        for tone in ToneFunction::ALL {
            let json = serde_json::to_string(&tone).unwrap();
            assert_eq!(json, format!("\"{}\"", tone.as_str()));
            assert_eq!(ToneFunction::parse(tone.as_str()), Some(tone));
        }
        assert_eq!(ToneFunction::parse("shouting"), None);
    }
}
