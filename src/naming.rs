//! Casing transforms applied to property names, discriminator literals and
//! enum members.
use once_cell::sync::Lazy;
use regex::Regex;

/// Either a (possibly acronym-led) capitalized/lowercase word, or a bare
/// uppercase run such as a trailing acronym. Any script.
static WORD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[\p{Lu}\p{Lt}]*[\p{Ll}\p{Lm}\p{Lo}\p{Nd}]+|[\p{Lu}\p{Lt}]+\p{Nd}*").expect("static word pattern")
});

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum NamingPolicy {
    #[default]
    Identity,
    CamelCase,
    PascalCase,
    SnakeCaseLower,
    SnakeCaseUpper,
    KebabCaseLower,
    KebabCaseUpper,
}

impl NamingPolicy {
    pub fn apply(&self, name: &str) -> String {
        if matches!(self, NamingPolicy::Identity) {
            return name.to_string();
        }
        // sigils such as `$type` or `_id` survive untouched
        let body_start = name
            .find(char::is_alphanumeric)
            .unwrap_or(name.len());
        let (prefix, body) = name.split_at(body_start);
        let words = split_words(body);
        if words.is_empty() {
            return name.to_string();
        }
        let converted: String = match self {
            NamingPolicy::Identity => name.to_string(),
            NamingPolicy::CamelCase => words
                .iter()
                .enumerate()
                .map(|(i, w)| if i == 0 { w.to_lowercase() } else { capitalize(w) })
                .collect(),
            NamingPolicy::PascalCase => words.iter().map(|w| capitalize(w)).collect(),
            NamingPolicy::SnakeCaseLower => join_with(&words, "_", str::to_lowercase),
            NamingPolicy::SnakeCaseUpper => join_with(&words, "_", str::to_uppercase),
            NamingPolicy::KebabCaseLower => join_with(&words, "-", str::to_lowercase),
            NamingPolicy::KebabCaseUpper => join_with(&words, "-", str::to_uppercase),
        };
        format!("{prefix}{converted}")
    }
}

/// Split an identifier into words: separators, lower→upper transitions and
/// acronym boundaries (`HTTPServer` → `HTTP`, `Server`).
pub fn split_words(name: &str) -> Vec<&str> {
    let mut out = Vec::new();
    for m in WORD.find_iter(name) {
        let word = m.as_str();
        let capitals: Vec<usize> = word.char_indices().take_while(|(_, c)| c.is_uppercase()).map(|(i, _)| i).collect();
        let run_end = word.char_indices().find(|(_, c)| !c.is_uppercase()).map_or(word.len(), |(i, _)| i);
        let rest_is_lower = word[run_end..].chars().next().is_some_and(|c| c.is_alphabetic());
        if capitals.len() > 1 && rest_is_lower {
            // `HTTPServer`: the last capital starts the next word
            let split = capitals[capitals.len() - 1];
            out.push(&word[..split]);
            out.push(&word[split..]);
        } else {
            out.push(word);
        }
    }
    out
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

fn join_with(words: &[&str], sep: &str, case: fn(&str) -> String) -> String {
    words.iter().map(|w| case(w)).collect::<Vec<_>>().join(sep)
}
