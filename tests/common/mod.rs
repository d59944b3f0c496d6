#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::Result;
use candle::{DType, Device, Tensor};
use candle_nn::{VarBuilder, VarMap};
use candle_transformers::models::bert::{BertModel, Config};
use serde_json::{json, Value};

static TEMP_DIR_COUNTER: AtomicU64 = AtomicU64::new(0);

pub struct TestTempDir {
    path: PathBuf,
}

impl TestTempDir {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TestTempDir {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.path);
    }
}

pub fn make_temp_dir(label: &str) -> Result<TestTempDir> {
    let mut path = std::env::temp_dir();
    let pid = std::process::id();
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let seq = TEMP_DIR_COUNTER.fetch_add(1, Ordering::Relaxed);
    path.push(format!("qa-handlers-{label}-{pid}-{nanos}-{seq}"));
    fs::create_dir_all(&path)?;
    Ok(TestTempDir { path })
}

pub const TINY_HIDDEN: usize = 8;
pub const TINY_MAX_POSITIONS: usize = 16;

const VOCAB: [&str; 24] = [
    "[PAD]", "[UNK]", "[CLS]", "[SEP]", "when", "was", "the", "car", "invented", "?", "cars",
    "came", "into", "use", "in", "1886", ".", "karl", "benz", "patented", "his", "motor",
    "##wagen", "year",
];

pub fn tiny_config() -> Value {
    json!({
        "architectures": ["BertForQuestionAnswering"],
        "model_type": "bert",
        "vocab_size": 32,
        "hidden_size": TINY_HIDDEN,
        "num_hidden_layers": 1,
        "num_attention_heads": 2,
        "intermediate_size": 16,
        "hidden_act": "gelu",
        "hidden_dropout_prob": 0.1,
        "attention_probs_dropout_prob": 0.1,
        "max_position_embeddings": TINY_MAX_POSITIONS,
        "type_vocab_size": 2,
        "initializer_range": 0.02,
        "layer_norm_eps": 1e-12,
        "pad_token_id": 0
    })
}

pub fn tiny_tokenizer() -> Value {
    let vocab: serde_json::Map<String, Value> = VOCAB
        .iter()
        .enumerate()
        .map(|(id, token)| (token.to_string(), json!(id)))
        .collect();
    let added_tokens: Vec<Value> = VOCAB[..4]
        .iter()
        .enumerate()
        .map(|(id, token)| {
            json!({
                "id": id,
                "content": token,
                "single_word": false,
                "lstrip": false,
                "rstrip": false,
                "normalized": false,
                "special": true
            })
        })
        .collect();

    json!({
        "version": "1.0",
        "truncation": null,
        "padding": null,
        "added_tokens": added_tokens,
        "normalizer": {
            "type": "BertNormalizer",
            "clean_text": true,
            "handle_chinese_chars": true,
            "strip_accents": null,
            "lowercase": true
        },
        "pre_tokenizer": { "type": "BertPreTokenizer" },
        "post_processor": {
            "type": "BertProcessing",
            "sep": ["[SEP]", 3],
            "cls": ["[CLS]", 2]
        },
        "decoder": { "type": "WordPiece", "prefix": "##", "cleanup": true },
        "model": {
            "type": "WordPiece",
            "unk_token": "[UNK]",
            "continuing_subword_prefix": "##",
            "max_input_chars_per_word": 100,
            "vocab": vocab
        }
    })
}

/// Writes a randomly initialised BERT question answering checkpoint.
pub fn write_tiny_bert(dir: &Path) -> Result<()> {
    write_tiny_bert_with(dir, false, &tiny_tokenizer())
}

/// Same checkpoint, but `qa_outputs` is all zeros: every token scores the
/// same, so the span always lands on position 0.
pub fn write_tiny_bert_flat_head(dir: &Path) -> Result<()> {
    write_tiny_bert_with(dir, true, &tiny_tokenizer())
}

pub fn write_tiny_bert_with(dir: &Path, flat_head: bool, tokenizer: &Value) -> Result<()> {
    fs::create_dir_all(dir)?;

    let varmap = VarMap::new();
    let vb = VarBuilder::from_varmap(&varmap, DType::F32, &Device::Cpu);
    let config: Config = serde_json::from_value(tiny_config())?;
    BertModel::load(vb.pp("bert"), &config)?;
    candle_nn::linear(TINY_HIDDEN, 2, vb.pp("qa_outputs"))?;
    if flat_head {
        let vars = varmap.data().lock().unwrap();
        vars["qa_outputs.weight"].set(&Tensor::zeros((2, TINY_HIDDEN), DType::F32, &Device::Cpu)?)?;
        vars["qa_outputs.bias"].set(&Tensor::zeros(2, DType::F32, &Device::Cpu)?)?;
    }
    varmap.save(dir.join("model.safetensors"))?;

    fs::write(dir.join("config.json"), serde_json::to_vec_pretty(&tiny_config())?)?;
    fs::write(dir.join("tokenizer.json"), serde_json::to_vec(tokenizer)?)?;
    fs::write(
        dir.join("tokenizer_config.json"),
        serde_json::to_vec(&json!({ "do_lower_case": true, "model_max_length": TINY_MAX_POSITIONS }))?,
    )?;
    Ok(())
}

/// Placeholder artifacts for code that only moves files around.
pub fn write_fake_artifacts(dir: &Path, marker: &str) -> Result<()> {
    fs::create_dir_all(dir)?;
    fs::write(dir.join("pytorch_model.bin"), format!("weights-{marker}"))?;
    fs::write(dir.join("config.json"), format!("{{\"marker\": \"{marker}\"}}"))?;
    fs::write(dir.join("tokenizer.json"), "{}")?;
    fs::write(dir.join("tokenizer_config.json"), "{}")?;
    Ok(())
}

pub const CAR_CONTEXT: &str = "Cars came into global use during the 20th century, and developed economies depend on them. The year 1886 is regarded as the birth year of the modern car when German inventor Karl Benz patented his Benz Patent-Motorwagen.";
