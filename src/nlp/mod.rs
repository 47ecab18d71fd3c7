//! Sentence-level controversy scoring on top of a sentiment classifier.

mod model;
mod scorer;
mod sentences;

pub use model::{
    HttpModelLoader, HttpSentimentModel, ModelError, ModelLoader, PreloadedModel, SentimentModel,
    SentimentScores,
};
pub use scorer::{ControversyScorer, MIN_SENTENCE_WORDS};
pub use sentences::split_sentences;
