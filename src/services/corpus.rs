// Corpus Construction
// Assembles the immutable review list handed to the scoring core

use tracing::info;

use crate::models::{Review, ReviewInput, ReviewSource, DEFAULT_MAX_REVIEWS, MIN_REVIEW_CHARS};

const SAMPLE_REVIEWS: [&str; 8] = [
    "This product is amazing! Best purchase ever! 5 stars! Highly recommend to everyone! Buy it now!",
    "I've been using this for 3 months now. The quality is decent for the price. Battery life could be better but overall satisfied with my purchase.",
    "BEST PRODUCT EVER!!! BUY NOW!!! AMAZING!!! 5 STARS!!! PERFECT!!!",
    "Received the item last week. Packaging was good. The product works as described. Took a star off because shipping was slow.",
    "Great great great! Love love love! Best best best! Amazing amazing amazing! Perfect perfect perfect!",
    "Not bad for the price. I was skeptical at first but it does what it says. The instructions could be clearer though.",
    "Excellent product excellent service excellent quality excellent everything! 5 stars!",
    "Used this for my home office setup. It's functional but nothing special. Does the job adequately.",
];

/// Normalize one candidate; only texts longer than the acceptance threshold survive.
pub fn accept_review(text: &str, source: ReviewSource) -> Option<Review> {
    if text.trim().chars().count() <= MIN_REVIEW_CHARS {
        return None;
    }
    Review::new(text, source)
}

/// Fixed mixed-character demonstration corpus.
pub fn sample_reviews() -> Vec<Review> {
    SAMPLE_REVIEWS
        .iter()
        .filter_map(|t| Review::new(t, ReviewSource::Sample))
        .collect()
}

/// Builds the corpus from exactly one source: provided reviews, else retrieved
/// texts, else the demonstration sample.
#[derive(Debug, Clone)]
pub struct CorpusBuilder {
    max_reviews: usize,
    provided: Vec<ReviewInput>,
    retrieved: Vec<String>,
    use_sample: bool,
}

impl Default for CorpusBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_REVIEWS)
    }
}

impl CorpusBuilder {
    pub fn new(max_reviews: usize) -> Self {
        Self {
            max_reviews,
            provided: Vec::new(),
            retrieved: Vec::new(),
            use_sample: true,
        }
    }

    pub fn provided(mut self, reviews: Vec<ReviewInput>) -> Self {
        self.provided = reviews;
        self
    }

    /// Texts obtained by an external retrieval collaborator.
    pub fn retrieved(mut self, texts: Vec<String>) -> Self {
        self.retrieved = texts;
        self
    }

    pub fn without_sample(mut self) -> Self {
        self.use_sample = false;
        self
    }

    pub fn build(self) -> Vec<Review> {
        let provided: Vec<Review> = self
            .provided
            .iter()
            .filter_map(|r| accept_review(r.text(), r.source()))
            .take(self.max_reviews)
            .collect();
        if !provided.is_empty() {
            info!("[CORPUS] using {} provided reviews", provided.len());
            return provided;
        }

        let retrieved: Vec<Review> = self
            .retrieved
            .iter()
            .filter_map(|t| accept_review(t, ReviewSource::Retrieved))
            .take(self.max_reviews)
            .collect();
        if !retrieved.is_empty() {
            info!("[CORPUS] using {} retrieved reviews", retrieved.len());
            return retrieved;
        }

        if self.use_sample {
            info!("[CORPUS] no reviews supplied, using sample reviews for demonstration");
            return sample_reviews();
        }
        Vec::new()
    }
}
