//! Keyword retriever over a fixed document set
//!
//! The inverted index maps each lower-cased, trimmed keyword to the
//! documents declaring it. A keyword matches when it occurs anywhere in the
//! lower-cased query, so "gym" matches "gyms" and "how much" matches a
//! multi-word question. Documents are ranked by the number of matching
//! keywords, ties keeping declaration order.

use std::collections::HashMap;

use crate::KnowledgeDocument;

/// Header placed above joined context snippets
pub const CONTEXT_HEADER: &str = "Relevant Information:";

const DEFAULT_FALLBACK_COUNT: usize = 3;
const DEFAULT_CONTEXT_TOP_K: usize = 2;

/// A retrieved document and its keyword hit count
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredDocument<'a> {
    pub document: &'a KnowledgeDocument,
    /// Zero for fallback results
    pub score: usize,
}

/// Read-only keyword index, safe to share across sessions
#[derive(Debug, Clone)]
pub struct KnowledgeRetriever {
    documents: Vec<KnowledgeDocument>,
    index: HashMap<String, Vec<usize>>,
    fallback_count: usize,
    context_top_k: usize,
}

impl KnowledgeRetriever {
    /// Build the index once over `documents`
    pub fn new(documents: Vec<KnowledgeDocument>) -> Self {
        let mut index: HashMap<String, Vec<usize>> = HashMap::new();
        for (idx, doc) in documents.iter().enumerate() {
            for keyword in &doc.keywords {
                let keyword = keyword.trim().to_lowercase();
                if keyword.is_empty() {
                    continue;
                }
                let postings = index.entry(keyword).or_default();
                if postings.last() != Some(&idx) {
                    postings.push(idx);
                }
            }
        }

        tracing::debug!(
            documents = documents.len(),
            keywords = index.len(),
            "Built knowledge index"
        );

        Self {
            documents,
            index,
            fallback_count: DEFAULT_FALLBACK_COUNT,
            context_top_k: DEFAULT_CONTEXT_TOP_K,
        }
    }

    /// Number of documents returned when nothing matches
    pub fn with_fallback_count(mut self, count: usize) -> Self {
        self.fallback_count = count.max(1);
        self
    }

    /// Number of documents joined by [`get_context`](Self::get_context)
    pub fn with_context_top_k(mut self, top_k: usize) -> Self {
        self.context_top_k = top_k.max(1);
        self
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn documents(&self) -> &[KnowledgeDocument] {
        &self.documents
    }

    /// Top `top_k` documents by keyword hits
    ///
    /// With no keyword hit, returns the first `min(fallback_count, N)`
    /// documents in declaration order regardless of `top_k`.
    pub fn retrieve_scored(&self, query: &str, top_k: usize) -> Vec<ScoredDocument<'_>> {
        let query = query.to_lowercase();
        let mut scores: HashMap<usize, usize> = HashMap::new();
        for (keyword, postings) in &self.index {
            if query.contains(keyword.as_str()) {
                for idx in postings {
                    *scores.entry(*idx).or_insert(0) += 1;
                }
            }
        }

        if scores.is_empty() {
            return self
                .documents
                .iter()
                .take(self.fallback_count)
                .map(|document| ScoredDocument { document, score: 0 })
                .collect();
        }

        let mut ranked: Vec<(usize, usize)> = scores.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        ranked
            .into_iter()
            .take(top_k)
            .map(|(idx, score)| ScoredDocument {
                document: &self.documents[idx],
                score,
            })
            .collect()
    }

    /// Documents only, see [`retrieve_scored`](Self::retrieve_scored)
    pub fn retrieve(&self, query: &str, top_k: usize) -> Vec<&KnowledgeDocument> {
        self.retrieve_scored(query, top_k)
            .into_iter()
            .map(|s| s.document)
            .collect()
    }

    /// Prompt-ready context for `query`
    ///
    /// Each retrieved document becomes a `- {content}` item; items are
    /// separated by a blank line and placed under [`CONTEXT_HEADER`].
    pub fn get_context(&self, query: &str) -> String {
        let items = self
            .retrieve(query, self.context_top_k)
            .into_iter()
            .map(|doc| format!("- {}", doc.content))
            .collect::<Vec<_>>()
            .join("\n\n");
        format!("{}\n{}", CONTEXT_HEADER, items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corpus() -> Vec<KnowledgeDocument> {
        vec![
            KnowledgeDocument::new("synviora", "Synviora platform")
                .with_keywords(["synviora", "crm", "payroll", "business"]),
            KnowledgeDocument::new("fitviora", "Fitviora gym platform")
                .with_keywords(["fitviora", "gym", "fitness", "membership"]),
            KnowledgeDocument::new("voice", "Voice bots")
                .with_keywords(["voice", "bot", "call"]),
            KnowledgeDocument::new("chat", "Chatbots")
                .with_keywords(["chatbot", "chat", "website", "bot"]),
            KnowledgeDocument::new("pricing", "Custom pricing")
                .with_keywords(["price", "cost", "how much"]),
        ]
    }

    #[test]
    fn test_keyword_hit_ranks_first() {
        let retriever = KnowledgeRetriever::new(corpus());
        let docs = retriever.retrieve("Do you have something for my gym?", 1);
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].id, "fitviora");
    }

    #[test]
    fn test_fallback_is_first_three_in_order() {
        let retriever = KnowledgeRetriever::new(corpus());
        let docs = retriever.retrieve("zzz qqq", 5);
        let ids: Vec<_> = docs.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["synviora", "fitviora", "voice"]);

        let small = KnowledgeRetriever::new(corpus().into_iter().take(2).collect());
        assert_eq!(small.retrieve("nothing", 1).len(), 2);
    }

    #[test]
    fn test_ties_keep_declaration_order() {
        let retriever = KnowledgeRetriever::new(corpus());
        // "bot" is declared by voice (idx 2) and chat (idx 3)
        let scored = retriever.retrieve_scored("a bot please", 5);
        let ids: Vec<_> = scored.iter().map(|s| s.document.id.as_str()).collect();
        assert_eq!(ids, vec!["voice", "chat"]);
        assert!(scored.iter().all(|s| s.score == 1));
    }

    #[test]
    fn test_score_counts_matching_keywords() {
        let retriever = KnowledgeRetriever::new(corpus());
        // chat matches "chatbot", "chat", "website" and "bot"; voice only "bot"
        let scored = retriever.retrieve_scored("a chatbot for my website", 3);
        assert_eq!(scored[0].document.id, "chat");
        assert_eq!(scored[0].score, 4);
        assert_eq!(scored[1].document.id, "voice");
    }

    #[test]
    fn test_keywords_normalized_and_substring_matched() {
        let docs = vec![KnowledgeDocument::new("t", "Timeline")
            .with_keywords(["  How Long ", "", "TIME"])];
        let retriever = KnowledgeRetriever::new(docs);
        let scored = retriever.retrieve_scored("HOW LONG does it take?", 3);
        assert_eq!(scored.len(), 1);
        assert_eq!(scored[0].score, 1);
        // "time" matches inside "timeline"
        assert_eq!(retriever.retrieve_scored("timeline please", 3)[0].score, 1);
    }

    #[test]
    fn test_duplicate_keyword_counts_once() {
        let docs = vec![KnowledgeDocument::new("d", "dup").with_keywords(["gym", "GYM"])];
        let retriever = KnowledgeRetriever::new(docs);
        assert_eq!(retriever.retrieve_scored("gym", 1)[0].score, 1);
    }

    #[test]
    fn test_get_context_format() {
        let retriever = KnowledgeRetriever::new(corpus());
        assert_eq!(
            retriever.get_context("chatbot for my website"),
            "Relevant Information:\n- Chatbots\n\n- Voice bots"
        );
    }

    #[test]
    fn test_empty_corpus() {
        let retriever = KnowledgeRetriever::new(Vec::new());
        assert!(retriever.retrieve("anything", 3).is_empty());
        assert_eq!(retriever.get_context("anything"), "Relevant Information:\n");
    }
}
