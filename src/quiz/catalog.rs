//! Built-in flag questions and the country index derived from a question set.

use super::{Prompt, Question};
use std::collections::BTreeMap;

const FLAG_QUESTIONS: &[(&str, [&str; 3], &str)] = &[
    ("https://flagcdn.com/w320/ru.png", ["United Kingdom", "Russia", "Mexico"], "Russia"),
    ("https://flagcdn.com/w320/ca.png", ["Canada", "Peru", "Austria"], "Canada"),
    ("https://flagcdn.com/w320/jp.png", ["South Korea", "China", "Japan"], "Japan"),
    ("https://flagcdn.com/w320/br.png", ["Brazil", "Portugal", "Argentina"], "Brazil"),
    ("https://flagcdn.com/w320/au.png", ["New Zealand", "Australia", "Fiji"], "Australia"),
    ("https://flagcdn.com/w320/de.png", ["Germany", "Belgium", "Spain"], "Germany"),
    ("https://flagcdn.com/w320/za.png", ["Ethiopia", "Kenya", "South Africa"], "South Africa"),
];

/// The built-in seven-flag quiz.
pub fn flag_questions() -> Vec<Question> {
    FLAG_QUESTIONS
        .iter()
        .map(|(url, options, answer)| Question {
            prompt: Prompt::Flag(url.to_string()),
            options: options.iter().map(|o| o.to_string()).collect(),
            correct_answer: answer.to_string(),
        })
        .collect()
}

/// Countries that appear as answers in a question set, with their flags.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    // Sorted by country name; `None` for answers to text questions.
    flags: BTreeMap<String, Option<String>>,
}

impl Catalog {
    pub fn builtin() -> Self {
        Self::from_questions(&flag_questions())
    }

    pub fn from_questions(questions: &[Question]) -> Self {
        let mut flags = BTreeMap::new();
        for question in questions {
            let flag = match question.prompt() {
                Prompt::Flag(url) => Some(url.clone()),
                Prompt::Text(_) => None,
            };
            let entry = flags.entry(question.correct_answer().to_string()).or_insert(None);
            if entry.is_none() {
                *entry = flag;
            }
        }
        Self { flags }
    }

    /// Sorted, de-duplicated country names.
    pub fn countries(&self) -> impl Iterator<Item = &str> {
        self.flags.keys().map(String::as_str)
    }

    pub fn contains(&self, country: &str) -> bool {
        self.flags.contains_key(country)
    }

    pub fn flag_url(&self, country: &str) -> Option<&str> {
        self.flags.get(country).and_then(|f| f.as_deref())
    }

    /// Case-insensitive substring match over country names. An empty query
    /// matches nothing.
    pub fn search(&self, query: &str) -> Vec<&str> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }
        self.countries()
            .filter(|country| country.to_lowercase().contains(&needle))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.flags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_questions_pass_validation() {
        for question in flag_questions() {
            let rebuilt = Question::new(
                question.prompt().clone(),
                question.options().to_vec(),
                question.correct_answer(),
            );
            assert_eq!(rebuilt.as_ref(), Ok(&question));
        }
    }

    #[test]
    fn countries_are_sorted() {
        let catalog = Catalog::builtin();
        let countries: Vec<&str> = catalog.countries().collect();
        assert_eq!(
            countries,
            vec!["Australia", "Brazil", "Canada", "Germany", "Japan", "Russia", "South Africa"]
        );
        assert_eq!(catalog.flag_url("Japan"), Some("https://flagcdn.com/w320/jp.png"));
        assert_eq!(catalog.flag_url("Peru"), None);
    }

    #[test]
    fn search_is_case_insensitive() {
        let catalog = Catalog::builtin();
        assert_eq!(catalog.search("AN"), vec!["Canada", "Germany", "Japan"]);
        assert_eq!(catalog.search("south"), vec!["South Africa"]);
        assert!(catalog.search("").is_empty());
        assert!(catalog.search("atlantis").is_empty());
    }

    #[test]
    fn text_questions_have_no_flag() {
        let questions = vec![
            Question::text("Land of the rising sun?", ["Japan", "Chile"], "Japan").unwrap(),
            Question::flag("https://flagcdn.com/w320/jp.png", ["Japan", "China"], "Japan").unwrap(),
        ];
        let catalog = Catalog::from_questions(&questions);
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.flag_url("Japan"), Some("https://flagcdn.com/w320/jp.png"));
    }
}
