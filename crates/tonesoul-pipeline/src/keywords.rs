//! Keyword tables and matching
//!
//! ASCII keywords match case-insensitively on word boundaries ("hi" does not
//! fire inside "this"). CJK keywords match as plain substrings.

use tonesoul_core::{Error, Result};

/// Named, ordered keyword list.
#[derive(Clone, Debug)]
pub struct KeywordSet {
    name: &'static str,
    keywords: Vec<String>,
}

impl KeywordSet {
    pub fn new<I, S>(name: &'static str, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name,
            keywords: keywords.into_iter().map(Into::into).collect(),
        }
    }

    pub fn name(&self) -> &str {
        self.name
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    /// First keyword (in table order) present in `text`, with its byte offset.
    ///
    /// An empty keyword is a broken table and is reported as an internal error.
    pub fn find(&self, text: &str) -> Result<Option<(&str, usize)>> {
        for keyword in &self.keywords {
            if keyword.trim().is_empty() {
                return Err(Error::Internal(format!(
                    "keyword table '{}' contains an empty keyword",
                    self.name
                )));
            }
            if let Some(at) = locate(text, keyword) {
                return Ok(Some((keyword.as_str(), at)));
            }
        }
        Ok(None)
    }

    pub fn matches(&self, text: &str) -> Result<bool> {
        Ok(self.find(text)?.is_some())
    }
}

/// Byte offset of `keyword` in `text`, honouring ASCII word boundaries.
///
/// Lowercasing is ASCII-only so offsets into the lowered text are valid
/// offsets into the original.
pub fn locate(text: &str, keyword: &str) -> Option<usize> {
    let haystack = text.to_ascii_lowercase();
    let needle = keyword.to_ascii_lowercase();
    if needle.is_empty() {
        return None;
    }
    let bound_start = needle.chars().next().is_some_and(|c| c.is_ascii_alphanumeric());
    let bound_end = needle.chars().last().is_some_and(|c| c.is_ascii_alphanumeric());

    haystack.match_indices(needle.as_str()).map(|(at, _)| at).find(|&at| {
        let before_ok = !bound_start
            || haystack[..at]
                .chars()
                .next_back()
                .map_or(true, |c| !c.is_alphanumeric());
        let after_ok = !bound_end
            || haystack[at + needle.len()..]
                .chars()
                .next()
                .map_or(true, |c| !c.is_alphanumeric());
        before_ok && after_ok
    })
}

pub fn contains_any(text: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|k| locate(text, k).is_some())
}

// --- Default tables ---

pub const REQUEST_MARKERS: &[&str] = &["please", "help me", "could you", "can you", "請", "幫我"];

pub const APPRECIATION: &[&str] = &[
    "thank you", "thanks", "thank", "appreciate", "great job", "well done", "awesome",
    "謝謝", "感謝", "太好了", "很棒", "讚",
];

pub const COMPLAINT: &[&str] = &[
    "hate", "annoying", "annoyed", "terrible", "awful", "complain", "unacceptable",
    "討厭", "煩", "糟糕", "不滿", "抱怨",
];

pub const ASSISTANCE: &[&str] = &[
    "help me", "can you help", "assist", "support", "請幫我", "幫忙", "協助", "支援",
];

pub const INSTRUCTIONAL: &[&str] = &[
    "how to", "how do", "how can", "how should", "steps to", "如何", "怎麼做", "怎樣做", "怎麼辦",
];

pub const FACTUAL: &[&str] = &[
    "what", "why", "where", "who", "when", "which", "什麼", "為什麼", "哪裡", "誰", "何時",
];

pub const OPINION: &[&str] = &[
    "think", "opinion", "how about", "what about", "feel about", "view on",
    "怎麼樣", "覺得", "認為", "看法", "意見",
];

pub const CASUAL: &[&str] = &[
    "hello", "hi", "hey", "good morning", "good night", "你好", "嗨", "哈囉", "早安", "晚安",
];

// Vow body markers
pub const TEMPORAL: &[&str] = &["today", "tomorrow", "next week", "this week", "今天", "明天", "下週", "本週"];
pub const COMPLETION: &[&str] = &[
    "finish", "complete", "deliver", "implement", "get done", "完成", "交付", "實現", "做好",
];
pub const QUALITY: &[&str] = &[
    "quality", "standard", "requirement", "requirements", "on time", "品質", "標準", "要求", "準時",
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_keywords_respect_word_boundaries() {
        assert!(locate("Hi there", "hi").is_some());
        assert!(locate("this is fine", "hi").is_none());
        assert!(locate("Thanks!", "thanks").is_some());
        assert_eq!(locate("well, I PROMISE to", "i promise"), Some(6));
    }

    #[test]
    fn cjk_keywords_match_as_substrings() {
        assert!(locate("我承諾明天完成", "我承諾").is_some());
        assert_eq!(locate("好，我答應你", "我答應"), Some("好，".len()));
    }

    #[test]
    fn empty_keyword_is_internal_error() {
        let set = KeywordSet::new("broken", ["ok", ""]);
        assert!(set.find("nothing here").is_err());
    }

    #[test]
    fn find_returns_first_in_table_order() {
        let set = KeywordSet::new("t", ["beta", "alpha"]);
        let (kw, _) = set.find("alpha then beta").unwrap().unwrap();
        assert_eq!(kw, "beta");
    }
}
