//! Deterministic classifier and enhancer for running without a reasoning model.
use async_trait::async_trait;
use hadith_core::error::ExternalResult;
use hadith_core::traits::{Classify, Enhance};
use hadith_core::types::QueryType;

const GREETINGS: &[&str] = &[
    "hi", "hello", "hey", "yo", "sup", "greetings",
    "hi there", "hello there", "hey there", "hi everyone", "hello everyone",
    "salam", "salaam", "salams", "as salam", "salam alaikum", "salaam alaikum",
    "assalamu alaikum", "asalamu alaikum", "as salamu alaikum", "assalamualaikum",
    "assalamu alaykum", "as salamu alaykum", "salamu alaykum", "wa alaikum salaam",
    "السلام عليكم", "peace be upon you",
    "good morning", "good afternoon", "good evening",
    "how are you", "how are you doing", "whats up", "thanks", "thank you",
    "jazakallah", "jazakallah khair",
];

const DOMAIN_WORDS: &[&str] = &[
    "hadith", "hadiths", "ahadith", "sunnah", "prophet", "messenger", "muhammad", "rasul",
    "allah", "islam", "islamic", "muslim", "muslims", "quran", "sahabah", "companions",
    "narrated", "narrator", "bukhari", "tirmidhi", "abudawud", "dawud", "nasai", "majah",
    "halal", "haram", "fiqh", "aqeedah", "mosque", "masjid", "imam", "sharia", "jihad",
    // worship and eschatology terms that rarely appear outside a religious question
    "prayer", "prayers", "pray", "praying", "salah", "salat", "jamaah", "sadaqah", "zakat", "zakah",
    "fasting", "ramadan", "sawm", "pilgrimage", "hajj", "umrah", "ablution", "wudu", "barzakh",
    "barzaq", "paradise", "jannah", "hellfire", "jahannam", "iman", "niyyah", "nikah", "ilm",
    "supplication", "dua",
];

/// (triggers, expansion terms). Order is the emission order.
const GLOSSARY: &[(&[&str], &[&str])] = &[
    (&["prayer", "pray", "praying", "salah", "salat"], &["salah", "Book of Prayer"]),
    (&["congregation", "congregational", "jamaah", "row"], &["jama'ah", "congregational prayer"]),
    (&["charity", "alms", "sadaqah", "giving"], &["sadaqah", "zakah", "Book of Zakat"]),
    (&["zakat", "zakah"], &["zakah", "Book of Zakat"]),
    (&["fasting", "fast", "ramadan", "sawm"], &["sawm", "ramadan", "Book of Fasting"]),
    (&["pilgrimage", "hajj", "umrah"], &["hajj", "umrah", "Book of Hajj"]),
    (&["ablution", "wudu", "purification"], &["wudu", "taharah", "Book of Ablution"]),
    (&["grave", "barzakh", "barzaq", "death", "funeral"], &["barzakh", "qabr", "Book of Funerals"]),
    (&["paradise", "heaven", "jannah"], &["jannah"]),
    (&["hell", "hellfire", "jahannam"], &["jahannam", "nar"]),
    (&["faith", "belief", "iman", "creed"], &["iman", "aqeedah", "Book of Faith"]),
    (&["intention", "intentions", "niyyah"], &["niyyah", "actions are judged by intentions"]),
    (&["fly", "flies", "insect", "insects"], &["dhubab", "fly falls in the drink", "dip it"]),
    (&["drink", "drinks", "drinking", "vessel"], &["ashribah", "Book of Drinks"]),
    (&["food", "eat", "eating", "meal"], &["at'imah", "Book of Food", "right hand"]),
    (&["marriage", "marry", "wife", "husband", "nikah"], &["nikah", "Book of Marriage"]),
    (&["trade", "business", "sale", "selling", "buying"], &["buyu", "Book of Sales"]),
    (&["knowledge", "learning", "ilm"], &["ilm", "Book of Knowledge"]),
    (&["supplication", "dua", "invocation", "invoke"], &["dua", "Book of Invocations"]),
    (&["parents", "mother", "father"], &["birr al-walidayn", "Book of Good Manners"]),
    (&["slave", "girl"], &["jariyah", "where is Allah"]),
];

/// Lowercased alphanumeric words; apostrophes are dropped so "what's" reads "whats".
pub(crate) fn normalize_words(text: &str) -> Vec<String> {
    text.to_lowercase()
        .chars()
        .filter(|c| *c != '\'' && *c != '’')
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

fn is_greeting(words: &[String]) -> bool {
    if words.is_empty() {
        return false;
    }
    let phrases: Vec<Vec<&str>> = GREETINGS.iter().map(|g| g.split_whitespace().collect()).collect();
    let mut pos = 0;
    while pos < words.len() {
        let longest = phrases
            .iter()
            .filter(|p| p.len() <= words.len() - pos && p.iter().zip(&words[pos..]).all(|(a, b)| *a == b.as_str()))
            .map(|p| p.len())
            .max();
        match longest {
            Some(n) => pos += n,
            None => return false,
        }
    }
    true
}

fn mentions_domain(words: &[String]) -> bool {
    words.iter().any(|w| DOMAIN_WORDS.contains(&w.as_str()))
}

/// Lexicon rules: a query made only of greetings is GREETING, one touching
/// hadith vocabulary is HADITH_QUERY, anything else is OFF_TOPIC.
#[derive(Debug, Default, Clone, Copy)]
pub struct RuleClassifier;

impl RuleClassifier {
    pub fn classify_sync(&self, query: &str) -> QueryType {
        let words = normalize_words(query);
        if is_greeting(&words) {
            QueryType::Greeting
        } else if mentions_domain(&words) {
            QueryType::HadithQuery
        } else {
            QueryType::OffTopic
        }
    }
}

#[async_trait]
impl Classify for RuleClassifier {
    async fn classify(&self, query: &str) -> ExternalResult<QueryType> {
        Ok(self.classify_sync(query))
    }
}

/// Appends transliterations and book names for the topics a query mentions.
#[derive(Debug, Default, Clone, Copy)]
pub struct GlossaryEnhancer;

impl GlossaryEnhancer {
    pub fn expand(&self, query: &str) -> String {
        let words = normalize_words(query);
        let mut terms: Vec<&str> = Vec::new();
        for (triggers, expansion) in GLOSSARY {
            if !words.iter().any(|w| triggers.contains(&w.as_str())) {
                continue;
            }
            for term in expansion.iter() {
                let already_in_query = words.iter().any(|w| w.eq_ignore_ascii_case(term));
                if !already_in_query && !terms.contains(term) {
                    terms.push(*term);
                }
            }
        }
        terms.join(" ")
    }
}

#[async_trait]
impl Enhance for GlossaryEnhancer {
    async fn enhance(&self, query: &str) -> ExternalResult<String> {
        Ok(self.expand(query))
    }
}
