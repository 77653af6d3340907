use std::collections::hash_map::DefaultHasher;
use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};
use std::path::Path;

use crate::error::{MigrateError, Result};

pub type Embedding = Vec<f32>;

/// Turns category names into vectors comparable by cosine similarity.
pub trait Embedder {
    fn embed(&mut self, texts: &[String]) -> Result<Vec<Embedding>>;
}

const HASH_DIMENSION: usize = 384;

/// Deterministic bag-of-tokens embedding. Needs no model download; good
/// enough when ledger and MMEX categories share vocabulary.
pub struct HashEmbedder {
    dimension: usize,
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self {
            dimension: HASH_DIMENSION,
        }
    }
}

impl Embedder for HashEmbedder {
    fn embed(&mut self, texts: &[String]) -> Result<Vec<Embedding>> {
        Ok(texts.iter().map(|t| hash_embed(t, self.dimension)).collect())
    }
}

fn hash_embed(text: &str, dimension: usize) -> Embedding {
    let mut vec = vec![0.0_f32; dimension];
    let mut seen = 0usize;

    for token in text.split(|c: char| !c.is_alphanumeric()) {
        let token = token.to_lowercase();
        if token.is_empty() {
            continue;
        }
        let mut hasher = DefaultHasher::new();
        token.hash(&mut hasher);
        let hash = hasher.finish();
        let idx = (hash as usize) % dimension;
        let sign = if (hash & 1) == 0 { 1.0 } else { -1.0 };
        vec[idx] += sign;
        seen += 1;
    }

    if seen == 0 {
        return vec;
    }

    let norm = vec.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for value in &mut vec {
            *value /= norm;
        }
    }
    vec
}

/// Model names accepted by `embedder_for`, besides `hash`.
pub const MODEL_NAMES: &[&str] = &[
    "paraphrase-multilingual-minilm-l12-v2",
    "paraphrase-multilingual-mpnet-base-v2",
    "multilingual-e5-small",
    "all-minilm-l6-v2",
];

#[cfg(feature = "semantic")]
pub struct FastEmbedder {
    model: fastembed::TextEmbedding,
}

#[cfg(feature = "semantic")]
impl FastEmbedder {
    pub fn new(model_name: &str) -> Result<Self> {
        use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};

        let model = match model_name.to_lowercase().as_str() {
            "paraphrase-multilingual-minilm-l12-v2" => EmbeddingModel::ParaphraseMLMiniLML12V2,
            "paraphrase-multilingual-mpnet-base-v2" => EmbeddingModel::ParaphraseMLMpnetBaseV2,
            "multilingual-e5-small" => EmbeddingModel::MultilingualE5Small,
            "all-minilm-l6-v2" => EmbeddingModel::AllMiniLML6V2,
            other => return Err(MigrateError::UnknownModel(other.to_string())),
        };
        log::info!("loading embedding model {model_name}");
        let model = TextEmbedding::try_new(InitOptions::new(model).with_show_download_progress(true))
            .map_err(|e| MigrateError::Embedding(e.to_string()))?;
        Ok(Self { model })
    }
}

#[cfg(feature = "semantic")]
impl Embedder for FastEmbedder {
    fn embed(&mut self, texts: &[String]) -> Result<Vec<Embedding>> {
        self.model
            .embed(texts.to_vec(), None)
            .map_err(|e| MigrateError::Embedding(e.to_string()))
    }
}

/// The embedder for a configured model name. `hash` always selects the
/// token-hashing embedder; the sentence models need the `semantic` feature.
pub fn embedder_for(model_name: &str) -> Result<Box<dyn Embedder>> {
    if model_name.eq_ignore_ascii_case("hash") {
        return Ok(Box::new(HashEmbedder::default()));
    }
    if !MODEL_NAMES.iter().any(|m| m.eq_ignore_ascii_case(model_name)) {
        return Err(MigrateError::UnknownModel(model_name.to_string()));
    }
    #[cfg(feature = "semantic")]
    {
        Ok(Box::new(FastEmbedder::new(model_name)?))
    }
    #[cfg(not(feature = "semantic"))]
    {
        Err(MigrateError::Embedding(format!(
            "{model_name} needs the `semantic` feature; rebuild with it or pass --model hash"
        )))
    }
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0_f32;
    let mut norm_a = 0.0_f32;
    let mut norm_b = 0.0_f32;

    for (va, vb) in a.iter().zip(b.iter()) {
        dot += va * vb;
        norm_a += va * va;
        norm_b += vb * vb;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// Index of the most similar candidate; the first one wins ties.
fn most_similar(query: &[f32], candidates: &[Embedding]) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (i, candidate) in candidates.iter().enumerate() {
        let score = cosine_similarity(query, candidate);
        if best.map_or(true, |(_, s)| score > s) {
            best = Some((i, score));
        }
    }
    best.map(|(i, _)| i)
}

/// Greedy nearest-neighbour match of every MMEX category onto a ledger
/// category. The result is keyed by ledger category; when several MMEX
/// categories land on the same ledger category the last one wins.
pub fn map_categories(
    ledger: &[String],
    mmex: &[String],
    embedder: &mut dyn Embedder,
) -> Result<BTreeMap<String, String>> {
    let mut mapped = BTreeMap::new();
    if ledger.is_empty() || mmex.is_empty() {
        return Ok(mapped);
    }

    let ledger_embeddings = embedder.embed(ledger)?;
    let mmex_embeddings = embedder.embed(mmex)?;

    for (category, embedding) in mmex.iter().zip(mmex_embeddings.iter()) {
        if let Some(idx) = most_similar(embedding, &ledger_embeddings) {
            log::debug!("{category} -> {}", ledger[idx]);
            if let Some(previous) = mapped.insert(ledger[idx].clone(), category.clone()) {
                log::debug!("{} was mapped to {previous}; replaced", ledger[idx]);
            }
        }
    }
    Ok(mapped)
}

pub fn read_mapping(path: &Path) -> Result<BTreeMap<String, String>> {
    let file = std::fs::File::open(path)?;
    Ok(serde_json::from_reader(std::io::BufReader::new(file))?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    /// Fixed vectors keyed by text, for exercising the matcher.
    struct TableEmbedder(Vec<(&'static str, Embedding)>);

    impl Embedder for TableEmbedder {
        fn embed(&mut self, texts: &[String]) -> Result<Vec<Embedding>> {
            Ok(texts
                .iter()
                .map(|t| {
                    self.0
                        .iter()
                        .find(|(k, _)| *k == t.as_str())
                        .map(|(_, v)| v.clone())
                        .unwrap_or_else(|| vec![0.0, 0.0, 0.0])
                })
                .collect())
        }
    }

    #[test]
    fn test_cosine_similarity_ranking() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![0.9, 0.1, 0.0];
        let c = vec![0.0, 1.0, 0.0];
        assert!(cosine_similarity(&a, &b) > cosine_similarity(&a, &c));
        assert_eq!(cosine_similarity(&a, &[0.0, 0.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&a, &[1.0]), 0.0);
    }

    #[test]
    fn test_map_picks_nearest_ledger_category() {
        let mut embedder = TableEmbedder(vec![
            ("Spese:Cibo", vec![1.0, 0.0, 0.0]),
            ("Spese:Auto", vec![0.0, 1.0, 0.0]),
            ("Food:Groceries", vec![0.9, 0.1, 0.0]),
            ("Transport:Fuel", vec![0.1, 0.9, 0.0]),
        ]);
        let mapped = map_categories(
            &strings(&["Spese:Cibo", "Spese:Auto"]),
            &strings(&["Food:Groceries", "Transport:Fuel"]),
            &mut embedder,
        )
        .unwrap();
        assert_eq!(mapped["Spese:Cibo"], "Food:Groceries");
        assert_eq!(mapped["Spese:Auto"], "Transport:Fuel");
    }

    #[test]
    fn test_map_last_match_wins_on_collision() {
        let mut embedder = TableEmbedder(vec![
            ("Spese:Cibo", vec![1.0, 0.0, 0.0]),
            ("Food", vec![1.0, 0.1, 0.0]),
            ("Food:Groceries", vec![1.0, 0.2, 0.0]),
        ]);
        let mapped = map_categories(
            &strings(&["Spese:Cibo"]),
            &strings(&["Food", "Food:Groceries"]),
            &mut embedder,
        )
        .unwrap();
        assert_eq!(mapped.len(), 1);
        assert_eq!(mapped["Spese:Cibo"], "Food:Groceries");
    }

    #[test]
    fn test_map_empty_inputs() {
        let mut embedder = HashEmbedder::default();
        assert!(map_categories(&[], &strings(&["Food"]), &mut embedder).unwrap().is_empty());
    }

    #[test]
    fn test_hash_embedder_matches_shared_tokens() {
        let mut embedder = HashEmbedder::default();
        let mapped = map_categories(
            &strings(&["Spese:Auto:Benzina", "Spese:Casa:Affitto"]),
            &strings(&["Auto:Benzina", "Casa:Affitto"]),
            &mut embedder,
        )
        .unwrap();
        assert_eq!(mapped["Spese:Auto:Benzina"], "Auto:Benzina");
        assert_eq!(mapped["Spese:Casa:Affitto"], "Casa:Affitto");
    }

    #[test]
    fn test_embedder_for_hash() {
        let mut embedder = embedder_for("hash").unwrap();
        let out = embedder.embed(&strings(&["a b", ""])).unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].len(), HASH_DIMENSION);
        assert!(out[1].iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_embedder_for_unknown_model() {
        let err = embedder_for("word2vec").err().unwrap();
        assert!(matches!(err, MigrateError::UnknownModel(_)));
    }

    #[cfg(not(feature = "semantic"))]
    #[test]
    fn test_embedder_for_sentence_model_needs_feature() {
        let err = embedder_for("paraphrase-multilingual-minilm-l12-v2").err().unwrap();
        assert!(matches!(err, MigrateError::Embedding(msg) if msg.contains("--model hash")));
    }
}
