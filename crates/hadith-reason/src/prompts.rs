//! Prompt text for the reasoning model.
use hadith_core::types::ScoredResult;

pub const CLASSIFY_SYSTEM: &str = r#"You are a hadith search assistant.

Determine if the user is asking for a hadith or just greeting/chatting.

Respond with ONLY ONE of these:
1. "HADITH_QUERY" - if they're asking about Islamic knowledge, hadith, or Prophet's teachings
2. "GREETING" - if they're just saying hi, hello, how are you, etc.
3. "OFF_TOPIC" - if they're asking about non-Islamic topics

Examples:
- "What did the Prophet say about prayer?" → HADITH_QUERY
- "Tell me about fasting" → HADITH_QUERY
- "Hey what's up" → GREETING
- "asalamu alaikum" → GREETING
- "What's the weather?" → OFF_TOPIC"#;

pub const ENHANCE_SYSTEM: &str = r#"You are a hadith disambiguator and search query enhancer.

Your task is to help find the EXACT hadith or cluster of hadiths the user is looking for.

For FAMOUS/CONTROVERSIAL hadiths (like "slave girl hadith", "fly in drink", etc.):
- Identify the specific well-known hadith
- Include distinctive phrases from the hadith text
- Include the controversial/discussion point

For TOPICAL queries (like "praying in a row alone", "charity in Ramadan"):
- Extract the specific fiqh/aqeedah topic
- Include related common Arabic terminology transliterations (salah, sadaqah, barzakh (barzaq), etc.)
- Include relevant narrator names if applicable
- Include book sections (Book of Prayer, Book of Fasting, etc.)
- Include related actions/scenarios described in the hadith

For BOTH types:
- Do NOT add broad ethical expansions
- Do NOT generalize to generic themes
- Focus on EXACT phrases and terms that would appear in the hadith text
- Include Arabic transliterations of key terms

Return a search-optimized string with canonical identifiers, key phrases, narrator names, Arabic terms, and subject tags. Do not repeat the user's query."#;

pub fn enhance_user(query: &str) -> String {
    format!(
        r#"User's original query: "{query}"

Analyze this query and provide:
1. If it's a famous/controversial hadith - identify the specific hadith and its key identifiers
2. If it's a topical query - extract the precise topic, related terms, and Arabic terminology
3. Key phrases that would appear in the hadith text
4. Relevant narrator names
5. Subject classification (salah/prayer, zakah/charity, aqeedah/creed, etc.)

Output format: A search-optimized string combining all these elements."#
    )
}

pub const CLUSTER_SYSTEM: &str = r#"You are an expert Islamic scholar specializing in hadith analysis.

Your task is to identify which hadiths describe the EXACT SAME SPECIFIC EVENT, not just similar themes or topics.

STRICT CLUSTERING RULES:
1. ONLY cluster if hadiths describe the SAME specific incident with:
   - Same people involved (e.g., names such as "Umar bin Abi Salama" or characters such as "the boy", "the slave girl", "merchant")
   - Same time/place (e.g., "at a meal with a tailor")
   - Same specific conversation or action
   - IF it's the same narrator AND same event, they can be clustered

2. DO NOT cluster if hadiths only share:
   - Similar topic (eating etiquette)
   - Similar teaching (eat with right hand)
   - Similar context (Prophet teaching companions)

3. Examples:
   ✓ CLUSTER: "Prophet teaching Umar bin Abi Salama as a boy at mealtime" (specific boy, specific event)
   ✗ DO NOT CLUSTER: "Prophet teaching about eating with right hand" (general teaching, different occasions)

   ✓ CLUSTER: "The fly falling in the drink incident" (specific event)
   ✗ DO NOT CLUSTER: "Hadiths about insects in food" (general topic)

4. For each cluster, pick the PRIMARY hadith (best chain, most detail)

5. A hadith index may appear in at most one cluster.

6. Give each cluster a SPECIFIC descriptive title mentioning the people/place involved

Return your analysis as a JSON object:
{
  "clusters": [
    {
      "event_title": "Specific event title (include people/place)",
      "primary_index": 0,
      "hadith_indices": [0, 3, 5],
      "reasoning": "Why these describe the EXACT same event"
    }
  ],
  "standalone_indices": [1, 2, 4]
}

If NO hadiths should be clustered, return:
{
  "clusters": [],
  "standalone_indices": [0, 1, 2, ...]
}

Be reasonable in clustering - cluster hadiths that clearly describe the same event, but don't force unrelated hadiths together."#;

/// One summary block per result, indexed by its position in `results`.
pub fn cluster_user(results: &[ScoredResult], max_text_chars: usize) -> String {
    let summaries: Vec<String> = results
        .iter()
        .enumerate()
        .map(|(i, r)| {
            let p = &r.passage;
            format!(
                "Hadith {i}:\nCollection: {}\nReference: {}\nNarrator: {}\nText: {}...",
                p.collection,
                p.collection_reference,
                p.narrator,
                truncate_chars(&p.text, max_text_chars)
            )
        })
        .collect();
    format!(
        "Analyze these {} hadiths and identify which ones describe the same events:\n\n{}\n\nRemember: Only cluster hadiths that describe the EXACT SAME event, not just similar topics.",
        results.len(),
        summaries.join("\n\n")
    )
}

pub(crate) fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
