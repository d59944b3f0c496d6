// BERT encoder with an extractive question answering head
use anyhow::{bail, Context};
use candle::{Device, Tensor};
use candle_nn::{Linear, Module, VarBuilder};
use candle_transformers::models::bert::{BertModel, Config, DTYPE};
use log::debug;
use serde::Deserialize;
use std::ops::Range;
use std::path::Path;
use tokenizers::{Tokenizer, TruncationParams, TruncationStrategy};

use super::{ModelFiles, QuestionAnswerer};

/// The handful of `config.json` fields the QA head needs on top of what
/// `candle_transformers` reads.
#[derive(Debug, Deserialize)]
struct HeadConfig {
    hidden_size: usize,
    max_position_embeddings: usize,
    #[serde(default)]
    model_type: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct TokenizerOptions {
    #[serde(default)]
    model_max_length: Option<f64>,
}

pub struct BertQaModel {
    model: BertModel,
    qa_outputs: Linear,
    tokenizer: Tokenizer,
    device: Device,
}

impl BertQaModel {
    pub fn load(model_dir: &Path, device: Device) -> anyhow::Result<Self> {
        let files = ModelFiles::locate(model_dir)?;

        // load the model config
        let raw_config = std::fs::read_to_string(&files.config)
            .with_context(|| format!("reading {}", files.config.display()))?;
        let head: HeadConfig = serde_json::from_str(&raw_config)?;
        if let Some(model_type) = head.model_type.as_deref() {
            if model_type != "bert" {
                bail!(
                    "unsupported model_type `{model_type}` in {}",
                    files.config.display()
                );
            }
        }
        let config: Config = serde_json::from_str(&raw_config)?;

        // load the tokenizer, contexts that overflow the encoder get cut
        let mut tokenizer = Tokenizer::from_file(&files.tokenizer).map_err(anyhow::Error::msg)?;
        let options = match &files.tokenizer_config {
            Some(path) => serde_json::from_str(&std::fs::read_to_string(path)?)?,
            None => TokenizerOptions::default(),
        };
        let max_length = truncation_limit(head.max_position_embeddings, &options);
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length,
                strategy: TruncationStrategy::OnlySecond,
                ..Default::default()
            }))
            .map_err(anyhow::Error::msg)?;
        // one pair per forward pass, never padded
        tokenizer.with_padding(None);

        // load the model
        let variable_builder = if files.is_safetensors() {
            unsafe { VarBuilder::from_mmaped_safetensors(&[&files.weights], DTYPE, &device)? }
        } else {
            VarBuilder::from_pth(&files.weights, DTYPE, &device)?
        };
        let model = BertModel::load(variable_builder.pp("bert"), &config)?;
        let qa_outputs = candle_nn::linear(head.hidden_size, 2, variable_builder.pp("qa_outputs"))?;
        debug!(
            "loaded {} (max input length {max_length})",
            model_dir.display()
        );

        Ok(Self {
            model,
            qa_outputs,
            tokenizer,
            device,
        })
    }

    /// Runs one forward pass and returns the start and end logits per token.
    fn span_logits(&self, question: &str, context: &str) -> anyhow::Result<(Vec<u32>, Vec<f32>, Vec<f32>)> {
        let encoding = self
            .tokenizer
            .encode((question, context), true)
            .map_err(anyhow::Error::msg)?;

        let input_ids = Tensor::new(encoding.get_ids(), &self.device)?.unsqueeze(0)?;
        let token_type_ids = Tensor::new(encoding.get_type_ids(), &self.device)?.unsqueeze(0)?;
        let attention_mask = Tensor::new(encoding.get_attention_mask(), &self.device)?.unsqueeze(0)?;

        let hidden = self
            .model
            .forward(&input_ids, &token_type_ids, Some(&attention_mask))?;
        // (seq_len, 2)
        let logits = self.qa_outputs.forward(&hidden)?.squeeze(0)?;
        let start_logits = logits.narrow(1, 0, 1)?.squeeze(1)?.to_vec1::<f32>()?;
        let end_logits = logits.narrow(1, 1, 1)?.squeeze(1)?.to_vec1::<f32>()?;

        Ok((encoding.get_ids().to_vec(), start_logits, end_logits))
    }

    pub fn tokenizer(&self) -> &Tokenizer {
        &self.tokenizer
    }
}

impl QuestionAnswerer for BertQaModel {
    fn answer(&self, question: &str, context: &str) -> anyhow::Result<String> {
        let (ids, start_logits, end_logits) = self.span_logits(question, context)?;
        let span = answer_span(&start_logits, &end_logits);
        decode_span(&self.tokenizer, &ids, span)
    }
}

/// Turns the answer tokens back into text. Special tokens stay in, a span
/// landing on `[CLS]` decodes as such.
pub fn decode_span(tokenizer: &Tokenizer, ids: &[u32], span: Range<usize>) -> anyhow::Result<String> {
    let end = span.end.min(ids.len());
    let start = span.start.min(end);
    tokenizer
        .decode(&ids[start..end], false)
        .map_err(anyhow::Error::msg)
}

/// Token range of the answer: best start through best end, inclusive.
/// An end that falls before the start yields an empty range.
pub fn answer_span(start_logits: &[f32], end_logits: &[f32]) -> Range<usize> {
    let start = first_argmax(start_logits);
    let end = (first_argmax(end_logits) + 1).min(end_logits.len());
    if end <= start {
        start..start
    } else {
        start..end
    }
}

fn first_argmax(values: &[f32]) -> usize {
    let mut best = 0;
    for (index, value) in values.iter().enumerate() {
        if *value > values[best] {
            best = index;
        }
    }
    best
}

fn truncation_limit(max_position_embeddings: usize, options: &TokenizerOptions) -> usize {
    match options.model_max_length {
        Some(limit) if limit >= 1.0 && limit < max_position_embeddings as f64 => limit as usize,
        _ => max_position_embeddings,
    }
}
