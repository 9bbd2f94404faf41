use std::collections::{BTreeSet, HashMap};

/// Counts word n-grams of a text against a fixed, ordered vocabulary.
///
/// Vocabulary entries are space-separated token sequences of any length.
/// Input text is split on single spaces with no further normalization, so
/// callers are expected to run [`normalize`] first.
#[derive(Debug, Clone)]
pub struct Vectorizer {
    vocabulary: Vec<String>,
    /// n-gram length -> (n-gram -> vocabulary index)
    index_by_len: HashMap<usize, HashMap<String, usize>>,
}

impl Vectorizer {
    pub fn new(vocabulary: Vec<String>) -> Self {
        let mut index_by_len: HashMap<usize, HashMap<String, usize>> = HashMap::new();
        for (i, entry) in vocabulary.iter().enumerate() {
            let len = entry.split(' ').count();
            index_by_len
                .entry(len)
                .or_default()
                .entry(entry.clone())
                .or_insert(i);
        }
        Self {
            vocabulary,
            index_by_len,
        }
    }

    /// Build a vocabulary of every n-gram of length `1..=max_n` found in `corpus`.
    ///
    /// The result is sorted, so the same corpus always yields the same layout.
    pub fn from_corpus<'a>(corpus: impl IntoIterator<Item = &'a str>, max_n: usize) -> Self {
        let mut grams = BTreeSet::new();
        for text in corpus {
            let tokens: Vec<&str> = text.split(' ').filter(|t| !t.is_empty()).collect();
            for n in 1..=max_n {
                for window in tokens.windows(n) {
                    grams.insert(window.join(" "));
                }
            }
        }
        Self::new(grams.into_iter().collect())
    }

    pub fn len(&self) -> usize {
        self.vocabulary.len()
    }

    /// Occurrence count of every vocabulary entry, indexed like the vocabulary.
    pub fn vectorize(&self, text: &str) -> Vec<u32> {
        let mut counts = vec![0u32; self.vocabulary.len()];
        if text.is_empty() {
            return counts;
        }

        let tokens: Vec<&str> = text.split(' ').collect();
        for (&len, index) in &self.index_by_len {
            if len == 0 || len > tokens.len() {
                continue;
            }
            for window in tokens.windows(len) {
                if let Some(&i) = index.get(window.join(" ").as_str()) {
                    counts[i] += 1;
                }
            }
        }
        counts
    }

    /// [`vectorize`](Self::vectorize) followed by one trailing component: the
    /// character length of `text`. Classifier models expect this layout.
    pub fn vectorize_with_length(&self, text: &str) -> Vec<u32> {
        let mut counts = self.vectorize(text);
        counts.push(text.chars().count() as u32);
        counts
    }
}

/// Lowercase, keep only `[a-z0-9 ]`, and collapse whitespace runs to one space.
///
/// Line breaks and tabs count as whitespace so words on adjacent lines stay
/// separate tokens.
pub fn normalize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending_space = false;
    for c in text.chars() {
        if c.is_whitespace() {
            pending_space = !out.is_empty();
        } else if c.is_ascii_alphanumeric() {
            if pending_space {
                out.push(' ');
                pending_space = false;
            }
            out.push(c.to_ascii_lowercase());
        }
    }
    out
}
