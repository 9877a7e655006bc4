//! Maps the evaluation stage's answer onto one of five sentiment labels.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::prompts::Language;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sentiment {
    VeryNegative,
    Negative,
    Neutral,
    Positive,
    VeryPositive,
    Unknown,
}

const ENGLISH_LABELS: [(&str, Sentiment); 5] = [
    ("very negative", Sentiment::VeryNegative),
    ("negative", Sentiment::Negative),
    ("neutral", Sentiment::Neutral),
    ("positive", Sentiment::Positive),
    ("very positive", Sentiment::VeryPositive),
];

const CHINESE_LABELS: [(&str, Sentiment); 5] = [
    ("非常负面", Sentiment::VeryNegative),
    ("负面", Sentiment::Negative),
    ("中性", Sentiment::Neutral),
    ("正面", Sentiment::Positive),
    ("非常正面", Sentiment::VeryPositive),
];

impl Sentiment {
    pub const KNOWN: [Sentiment; 5] = [
        Sentiment::VeryNegative,
        Sentiment::Negative,
        Sentiment::Neutral,
        Sentiment::Positive,
        Sentiment::VeryPositive,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::VeryNegative => "very_negative",
            Sentiment::Negative => "negative",
            Sentiment::Neutral => "neutral",
            Sentiment::Positive => "positive",
            Sentiment::VeryPositive => "very_positive",
            Sentiment::Unknown => "unknown",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            Sentiment::VeryNegative => "😠",
            Sentiment::Negative => "😞",
            Sentiment::Neutral => "😐",
            Sentiment::Positive => "😊",
            Sentiment::VeryPositive => "😄",
            Sentiment::Unknown => "❓",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Sentiment::VeryNegative => "Very Negative",
            Sentiment::Negative => "Negative",
            Sentiment::Neutral => "Neutral",
            Sentiment::Positive => "Positive",
            Sentiment::VeryPositive => "Very Positive",
            Sentiment::Unknown => "Unknown",
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            Sentiment::VeryNegative => "red",
            Sentiment::Negative => "orange",
            Sentiment::Neutral => "blue",
            Sentiment::Positive => "green",
            Sentiment::VeryPositive => "darkgreen",
            Sentiment::Unknown => "black",
        }
    }

    /// The label the evaluation prompt asks the model to answer with.
    pub fn canonical(&self, language: Language) -> Option<&'static str> {
        let table = match language {
            Language::En => &ENGLISH_LABELS,
            Language::Cn => &CHINESE_LABELS,
        };
        table.iter().find(|(_, s)| s == self).map(|(label, _)| *label)
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified evaluation answer, remembering which language's label matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SentimentReading {
    pub sentiment: Sentiment,
    pub matched_language: Option<Language>,
}

impl SentimentReading {
    pub const UNKNOWN: SentimentReading = SentimentReading {
        sentiment: Sentiment::Unknown,
        matched_language: None,
    };

    /// Exact match after trimming and lowercasing. Free text is `Unknown`.
    pub fn from_response(response: &str) -> Self {
        let normalized = response.trim().to_lowercase();
        let matched = ENGLISH_LABELS
            .iter()
            .map(|(label, s)| (*label, *s, Language::En))
            .chain(
                CHINESE_LABELS
                    .iter()
                    .map(|(label, s)| (*label, *s, Language::Cn)),
            )
            .find(|(label, _, _)| *label == normalized);

        match matched {
            Some((_, sentiment, language)) => Self {
                sentiment,
                matched_language: Some(language),
            },
            None => Self::UNKNOWN,
        }
    }

    pub fn is_known(&self) -> bool {
        self.sentiment != Sentiment::Unknown
    }

    pub fn label(&self) -> String {
        let sentiment = self.sentiment;
        match (self.matched_language, sentiment.canonical(Language::Cn)) {
            (Some(Language::Cn), Some(chinese)) => {
                format!("{} {} - {}", sentiment.icon(), chinese, sentiment.title())
            }
            _ => format!("{} {}", sentiment.icon(), sentiment.title()),
        }
    }

    pub fn color(&self) -> &'static str {
        self.sentiment.color()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_english_labels() {
        let cases = vec![
            ("very negative", "😠 Very Negative", "red"),
            ("negative", "😞 Negative", "orange"),
            ("neutral", "😐 Neutral", "blue"),
            ("positive", "😊 Positive", "green"),
            ("very positive", "😄 Very Positive", "darkgreen"),
        ];

        for (response, label, color) in cases {
            let reading = SentimentReading::from_response(response);
            assert_eq!(reading.label(), label, "{response:?}");
            assert_eq!(reading.color(), color, "{response:?}");
            assert_eq!(reading.matched_language, Some(Language::En));
        }
    }

    #[test]
    fn test_chinese_labels() {
        let cases = vec![
            ("非常负面", "😠 非常负面 - Very Negative", "red"),
            ("负面", "😞 负面 - Negative", "orange"),
            ("中性", "😐 中性 - Neutral", "blue"),
            ("正面", "😊 正面 - Positive", "green"),
            ("非常正面", "😄 非常正面 - Very Positive", "darkgreen"),
        ];

        for (response, label, color) in cases {
            let reading = SentimentReading::from_response(response);
            assert_eq!(reading.label(), label, "{response:?}");
            assert_eq!(reading.color(), color, "{response:?}");
            assert_eq!(reading.matched_language, Some(Language::Cn));
        }
    }

    #[test]
    fn test_whitespace_and_case_are_ignored() {
        let reading = SentimentReading::from_response("  Very Positive\n");
        assert_eq!(reading.sentiment, Sentiment::VeryPositive);
    }

    #[test]
    fn test_free_text_is_unknown() {
        for response in [
            "",
            "I think they are positive.",
            "positive.",
            "mostly negative",
            "error generating response: connection refused",
        ] {
            let reading = SentimentReading::from_response(response);
            assert_eq!(reading, SentimentReading::UNKNOWN, "{response:?}");
            assert_eq!(reading.label(), "❓ Unknown");
            assert_eq!(reading.color(), "black");
            assert!(!reading.is_known());
        }
    }

    #[test]
    fn test_canonical_labels_round_trip() {
        for sentiment in Sentiment::KNOWN {
            for language in [Language::En, Language::Cn] {
                let label = sentiment.canonical(language).unwrap();
                assert_eq!(SentimentReading::from_response(label).sentiment, sentiment);
            }
        }
        assert!(Sentiment::Unknown.canonical(Language::En).is_none());
    }

    #[test]
    fn test_serializes_snake_case() {
        let json = serde_json::to_string(&Sentiment::VeryNegative).unwrap();
        assert_eq!(json, "\"very_negative\"");
    }
}
