//! Built-in responders: keyword rule -> canned reply

use crate::keywords;
use crate::registry::{Responder, ResponderError};
use tonesoul_core::TrustLevel;

/// Stateless responder driven by an ordered rule list. The first rule whose
/// keywords appear in the sentence supplies the reply.
pub struct KeywordResponder {
    name: &'static str,
    description: &'static str,
    trust: TrustLevel,
    rules: Vec<(&'static [&'static str], &'static str)>,
    default_reply: &'static str,
}

impl KeywordResponder {
    pub fn new(name: &'static str, description: &'static str, default_reply: &'static str) -> Self {
        Self {
            name,
            description,
            trust: TrustLevel::B,
            rules: Vec::new(),
            default_reply,
        }
    }

    pub fn trust(mut self, trust: TrustLevel) -> Self {
        self.trust = trust;
        self
    }

    pub fn rule(mut self, keywords: &'static [&'static str], reply: &'static str) -> Self {
        self.rules.push((keywords, reply));
        self
    }
}

impl Responder for KeywordResponder {
    fn name(&self) -> &str {
        self.name
    }

    fn description(&self) -> &str {
        self.description
    }

    fn trust_level(&self) -> TrustLevel {
        self.trust
    }

    fn respond(&self, sentence: &str) -> Result<String, ResponderError> {
        let reply = self
            .rules
            .iter()
            .find(|(kws, _)| keywords::contains_any(sentence, kws))
            .map(|(_, reply)| *reply)
            .unwrap_or(self.default_reply);
        Ok(reply.to_string())
    }
}

pub fn qa() -> KeywordResponder {
    KeywordResponder::new(
        "qa",
        "Answers instructional questions",
        "Thanks for the question, I will do my best to help.",
    )
    .rule(&["how", "如何"], "Good question. You can approach it step by step:")
    .rule(&["what", "什麼"], "As I understand it, this concept refers to...")
}

pub fn knowledge_base() -> KeywordResponder {
    KeywordResponder::new(
        "knowledge_base",
        "Answers factual inquiries",
        "Let me look into what I know about that.",
    )
    .rule(&["why", "為什麼"], "There are several reasons behind this.")
    .rule(&["where", "哪裡"], "Here is where that can be found.")
    .rule(&["when", "何時"], "Here is the timing as far as I know.")
}

pub fn reflection() -> KeywordResponder {
    KeywordResponder::new(
        "reflection",
        "Offers a considered opinion",
        "That is worth thinking about from a few angles.",
    )
    .rule(&["think", "覺得", "認為"], "Here is how I see it, with the caveat that views differ.")
}

pub fn empathy() -> KeywordResponder {
    KeywordResponder::new(
        "empathy",
        "Acknowledges emotional expression",
        "I can sense how you feel, and I am here with you.",
    )
    .trust(TrustLevel::A)
    .rule(&["sad", "upset", "難過", "傷心", "沮喪"], "I can feel your sadness. It is all right to feel this way.")
    .rule(&["angry", "furious", "生氣", "憤怒"], "I understand your anger, and I am listening.")
    .rule(&["anxious", "worried", "afraid", "焦慮", "擔心", "害怕"], "Your worry makes sense. Let us face it together.")
}

pub fn gratitude() -> KeywordResponder {
    KeywordResponder::new(
        "gratitude",
        "Responds to thanks and praise",
        "Thank you for the kind words, they keep me improving.",
    )
    .trust(TrustLevel::A)
    .rule(&["thank", "thanks", "thank you", "謝謝", "感謝"], "You are welcome! Glad I could help.")
    .rule(&["great job", "awesome", "太好了", "很棒"], "I am glad it worked for you!")
}

pub fn complaint() -> KeywordResponder {
    KeywordResponder::new(
        "complaint",
        "Handles complaints",
        "I hear your concern. Tell me more so I can help.",
    )
    .trust(TrustLevel::A)
    .rule(&["terrible", "awful", "糟糕"], "I am sorry for that experience. Tell me what went wrong and I will try to fix it.")
    .rule(&["hate", "annoying", "討厭", "煩"], "I understand the frustration. Let us find the root cause.")
}

pub fn action_executor() -> KeywordResponder {
    KeywordResponder::new(
        "action_executor",
        "Acknowledges action requests",
        "Understood, I will take care of that.",
    )
}

pub fn assistance() -> KeywordResponder {
    KeywordResponder::new(
        "assistance",
        "Offers assistance",
        "I am happy to help. What do you need?",
    )
    .trust(TrustLevel::A)
}

pub fn conversation() -> KeywordResponder {
    KeywordResponder::new(
        "conversation",
        "Casual chat",
        "Nice chatting with you!",
    )
    .rule(&["hello", "hi", "hey", "你好", "嗨"], "Hello! Nice to see you. How is your day?")
    .rule(&["good morning", "早安"], "Good morning! Hope your day starts well.")
    .rule(&["good night", "晚安"], "Good night! Sleep well.")
}

pub fn statement_processor() -> KeywordResponder {
    KeywordResponder::new(
        "statement_processor",
        "Acknowledges statements",
        "Noted, thank you for sharing.",
    )
}

pub fn default_handler() -> KeywordResponder {
    KeywordResponder::new(
        "default_handler",
        "Fallback for unclassified input",
        "I am still learning how to understand this. Could you rephrase?",
    )
    .trust(TrustLevel::C)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_matching_rule_wins() {
        let r = conversation();
        assert_eq!(r.respond("hello there").unwrap(), "Hello! Nice to see you. How is your day?");
        assert_eq!(r.respond("good night all").unwrap(), "Good night! Sleep well.");
        assert_eq!(r.respond("nice weather").unwrap(), "Nice chatting with you!");
    }

    #[test]
    fn default_handler_is_low_trust() {
        assert_eq!(default_handler().trust_level(), TrustLevel::C);
        assert_eq!(default_handler().tool_id(), "core.default_handler.v1");
    }
}
