//! Stub mapping transformers.
//!
//! A transformer rewrites a stub after repeated requests have been resolved.
//! The registry maps names to transformers; a snapshot request names the
//! ones it wants and they run in the order listed, after every transformer
//! that applies globally.

use super::builtin::{DecorateTransformer, RemoveResponseHeaders, ResponseTemplateTransformer};
use super::spec::Parameters;
use crate::stub::StubMapping;
use std::path::PathBuf;
use std::sync::Arc;

/// Error types for transformer execution
#[derive(Debug, thiserror::Error)]
pub enum TransformerError {
    #[error("Missing parameter '{0}'")]
    MissingParameter(&'static str),
    #[error("Invalid parameter '{name}': {reason}")]
    InvalidParameter { name: &'static str, reason: String },
    #[error("Script error: {0}")]
    Script(String),
}

/// Read-only context handed to every transformer.
#[derive(Debug, Clone)]
pub struct TransformContext {
    /// Root for side files written by transformers
    pub files_root: PathBuf,
}

pub trait StubMappingTransformer: Send + Sync {
    fn name(&self) -> &str;

    /// Whether the transformer runs on every snapshot, requested or not.
    fn apply_globally(&self) -> bool {
        false
    }

    fn transform(
        &self,
        stub: StubMapping,
        parameters: &Parameters,
        context: &TransformContext,
    ) -> Result<StubMapping, TransformerError>;
}

/// Named transformers in registration order.
#[derive(Clone)]
pub struct TransformerRegistry {
    transformers: Vec<Arc<dyn StubMappingTransformer>>,
}

impl Default for TransformerRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl TransformerRegistry {
    pub fn empty() -> Self {
        Self {
            transformers: Vec::new(),
        }
    }

    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();
        registry.register(Arc::new(RemoveResponseHeaders));
        registry.register(Arc::new(ResponseTemplateTransformer));
        registry.register(Arc::new(DecorateTransformer));
        registry
    }

    /// Register a transformer, replacing any with the same name.
    pub fn register(&mut self, transformer: Arc<dyn StubMappingTransformer>) {
        match self
            .transformers
            .iter()
            .position(|t| t.name() == transformer.name())
        {
            Some(index) => self.transformers[index] = transformer,
            None => self.transformers.push(transformer),
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn StubMappingTransformer>> {
        self.transformers.iter().find(|t| t.name() == name).cloned()
    }

    pub fn names(&self) -> Vec<&str> {
        self.transformers.iter().map(|t| t.name()).collect()
    }

    /// Build the chain for one snapshot: global transformers first, then the
    /// requested ones in listed order, each at most once.
    ///
    /// Fails with every unknown name when any requested name is unregistered.
    pub fn chain(&self, requested: &[String]) -> Result<TransformerChain, Vec<String>> {
        let unknown: Vec<String> = requested
            .iter()
            .filter(|name| self.get(name).is_none())
            .cloned()
            .collect();
        if !unknown.is_empty() {
            return Err(unknown);
        }

        let mut chain: Vec<Arc<dyn StubMappingTransformer>> = self
            .transformers
            .iter()
            .filter(|t| t.apply_globally())
            .cloned()
            .collect();
        for name in requested {
            if chain.iter().any(|t| t.name() == name.as_str()) {
                continue;
            }
            if let Some(transformer) = self.get(name) {
                chain.push(transformer);
            }
        }
        Ok(TransformerChain { transformers: chain })
    }
}

/// Ordered transformers resolved for one snapshot run.
pub struct TransformerChain {
    transformers: Vec<Arc<dyn StubMappingTransformer>>,
}

impl TransformerChain {
    pub fn names(&self) -> Vec<&str> {
        self.transformers.iter().map(|t| t.name()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.transformers.is_empty()
    }

    /// Thread `stub` through every transformer. On failure, the name of the
    /// failing transformer comes back with the error.
    pub fn apply(
        &self,
        stub: StubMapping,
        parameters: &Parameters,
        context: &TransformContext,
    ) -> Result<StubMapping, (String, TransformerError)> {
        self.transformers.iter().try_fold(stub, |stub, transformer| {
            transformer
                .transform(stub, parameters, context)
                .map_err(|e| (transformer.name().to_string(), e))
        })
    }
}
