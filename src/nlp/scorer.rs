//! Controversy scorer.

use std::sync::Arc;

use tokio::sync::OnceCell;

use super::model::{ModelError, ModelLoader, PreloadedModel, SentimentModel};
use super::sentences::split_sentences;
use crate::cleaner::clean_text;
use crate::models::ControversyResult;
use crate::tei::extract_tei_text;

/// Sentences with fewer words are not scored.
pub const MIN_SENTENCE_WORDS: usize = 5;

/// Scores documents by the sentence whose sentiment is most balanced.
///
/// The scorer owns its model handle. The model is loaded through the
/// [`ModelLoader`] the first time a sentence needs scoring, then reused for
/// the scorer's lifetime. Concurrent first calls are serialized by the
/// `OnceCell`; a failed load is not cached and is retried on the next call.
pub struct ControversyScorer {
    loader: Arc<dyn ModelLoader>,
    model: OnceCell<Arc<dyn SentimentModel>>,
    max_chars: usize,
}

impl ControversyScorer {
    pub fn new(loader: Arc<dyn ModelLoader>, max_chars: usize) -> Self {
        Self {
            loader,
            model: OnceCell::new(),
            max_chars: max_chars.max(1),
        }
    }

    /// Scorer around an already constructed model.
    pub fn with_model(model: Arc<dyn SentimentModel>, max_chars: usize) -> Self {
        Self::new(Arc::new(PreloadedModel(model)), max_chars)
    }

    pub fn is_loaded(&self) -> bool {
        self.model.initialized()
    }

    async fn model(&self) -> Result<&Arc<dyn SentimentModel>, ModelError> {
        self.model.get_or_try_init(|| self.loader.load()).await
    }

    /// Score cleaned text. Never fails: model errors yield the error result.
    pub async fn score(&self, text: &str) -> ControversyResult {
        match self.try_score(text).await {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!("Controversy scoring failed: {}", e);
                ControversyResult::failed()
            }
        }
    }

    async fn try_score(&self, text: &str) -> Result<ControversyResult, ModelError> {
        let mut best_score = 0.0;
        let mut best_sentence: Option<&str> = None;

        for sentence in split_sentences(text) {
            if sentence.split_whitespace().count() < MIN_SENTENCE_WORDS {
                continue;
            }

            let model = self.model().await?;
            let scores = model
                .classify(truncate_chars(sentence, self.max_chars))
                .await?;
            let score = scores.divergence();

            // Strict comparison keeps the first of equal sentences
            if score > best_score {
                best_score = score;
                best_sentence = Some(sentence);
            }
        }

        Ok(ControversyResult::from_best(best_score, best_sentence))
    }

    /// Score TEI markup through its abstract and body text.
    ///
    /// Markup that yields no text short-circuits to the empty result without
    /// touching the model.
    pub async fn score_tei(&self, xml: &str) -> ControversyResult {
        let text = extract_tei_text(xml);
        if text.is_empty() {
            return ControversyResult::empty();
        }
        self.score(&clean_text(&text)).await
    }
}

/// Truncate to at most `max` characters on a char boundary.
fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NO_EXCERPT, SCORING_ERROR};
    use crate::nlp::SentimentScores;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Scores sentences containing "contested" as perfectly balanced.
    struct KeywordModel {
        calls: AtomicUsize,
        inputs: Mutex<Vec<String>>,
    }

    impl KeywordModel {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                inputs: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl SentimentModel for KeywordModel {
        async fn classify(&self, text: &str) -> Result<SentimentScores, ModelError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inputs.lock().unwrap().push(text.to_string());
            if text.contains("contested") {
                Ok(SentimentScores {
                    positive: 0.5,
                    negative: 0.5,
                })
            } else if text.contains("mixed") {
                Ok(SentimentScores {
                    positive: 0.4,
                    negative: 0.6,
                })
            } else {
                Ok(SentimentScores {
                    positive: 0.95,
                    negative: 0.05,
                })
            }
        }
    }

    struct FailingModel;

    #[async_trait]
    impl SentimentModel for FailingModel {
        async fn classify(&self, _text: &str) -> Result<SentimentScores, ModelError> {
            Err(ModelError::Connection("refused".into()))
        }
    }

    struct CountingLoader {
        loads: AtomicUsize,
        model: Arc<KeywordModel>,
    }

    #[async_trait]
    impl ModelLoader for CountingLoader {
        async fn load(&self) -> Result<Arc<dyn SentimentModel>, ModelError> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            Ok(self.model.clone())
        }
    }

    struct BrokenLoader;

    #[async_trait]
    impl ModelLoader for BrokenLoader {
        async fn load(&self) -> Result<Arc<dyn SentimentModel>, ModelError> {
            Err(ModelError::Load("weights missing".into()))
        }
    }

    #[tokio::test]
    async fn test_picks_most_balanced_sentence() {
        let scorer = ControversyScorer::with_model(KeywordModel::new(), 512);
        let result = scorer
            .score("This result is clearly very good. The claim is hotly contested by many experts.")
            .await;

        assert_eq!(result.score, 1.0);
        assert!(result.is_controversial);
        assert_eq!(result.excerpt, "The claim is hotly contested by many experts.");
    }

    #[tokio::test]
    async fn test_below_threshold() {
        let scorer = ControversyScorer::with_model(KeywordModel::new(), 512);
        let result = scorer.score("Reviewers had rather mixed feelings about it.").await;

        assert_eq!(result.score, 0.8);
        assert!(result.is_controversial);

        let result = scorer.score("Everyone agreed this was a fine paper.").await;
        assert_eq!(result.score, 0.1);
        assert!(!result.is_controversial);
    }

    #[tokio::test]
    async fn test_short_sentences_are_skipped() {
        let model = KeywordModel::new();
        let scorer = ControversyScorer::with_model(model.clone(), 512);
        let result = scorer.score("Too short. Also contested here. Nope!").await;

        assert_eq!(result.score, 0.0);
        assert!(!result.is_controversial);
        assert_eq!(result.excerpt, NO_EXCERPT);
        assert_eq!(model.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_ties_keep_first_sentence() {
        let scorer = ControversyScorer::with_model(KeywordModel::new(), 512);
        let result = scorer
            .score("The first claim is contested by experts. The second claim is contested by experts too.")
            .await;
        assert_eq!(result.excerpt, "The first claim is contested by experts.");
    }

    #[tokio::test]
    async fn test_model_input_is_truncated() {
        let model = KeywordModel::new();
        let scorer = ControversyScorer::with_model(model.clone(), 20);
        let long = "word ".repeat(50) + "end.";
        let result = scorer.score(&long).await;

        let inputs = model.inputs.lock().unwrap();
        assert_eq!(inputs.len(), 1);
        assert_eq!(inputs[0].chars().count(), 20);
        // The excerpt keeps the full sentence
        assert_eq!(result.excerpt, long.trim());
    }

    #[tokio::test]
    async fn test_model_loaded_once_and_lazily() {
        let loader = Arc::new(CountingLoader {
            loads: AtomicUsize::new(0),
            model: KeywordModel::new(),
        });
        let scorer = ControversyScorer::new(loader.clone(), 512);

        scorer.score("").await;
        assert!(!scorer.is_loaded());
        assert_eq!(loader.loads.load(Ordering::SeqCst), 0);

        scorer.score("One sentence with enough words here.").await;
        scorer.score("Another sentence with enough words here.").await;
        assert!(scorer.is_loaded());
        assert_eq!(loader.loads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failures_degrade_to_error_result() {
        let scorer = ControversyScorer::with_model(Arc::new(FailingModel), 512);
        let result = scorer.score("This sentence has more than five words.").await;
        assert_eq!(result, ControversyResult::failed());
        assert_eq!(result.excerpt, SCORING_ERROR);

        let scorer = ControversyScorer::new(Arc::new(BrokenLoader), 512);
        let result = scorer.score("This sentence has more than five words.").await;
        assert_eq!(result, ControversyResult::failed());
        assert!(!scorer.is_loaded());
    }

    #[tokio::test]
    async fn test_score_tei_short_circuits_on_empty_markup() {
        let model = KeywordModel::new();
        let scorer = ControversyScorer::with_model(model.clone(), 512);

        let result = scorer.score_tei("<not-xml").await;
        assert_eq!(result, ControversyResult::empty());
        assert_eq!(model.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_score_tei_uses_abstract_and_body() {
        let scorer = ControversyScorer::with_model(KeywordModel::new(), 512);
        let xml = r#"<TEI xmlns="http://www.tei-c.org/ns/1.0">
            <teiHeader><profileDesc><abstract><p>We study a well understood and pleasant topic here.</p></abstract></profileDesc></teiHeader>
            <text><body><div><p>Our central claim remains contested within the wider field.</p></div></body></text>
        </TEI>"#;

        let result = scorer.score_tei(xml).await;
        assert!(result.is_controversial);
        assert_eq!(result.excerpt, "Our central claim remains contested within the wider field.");
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("abc", 10), "abc");
    }
}
