use crate::{
    config::LLMConfig,
    error::AnalysisFailure,
    extractor::CodeUnit,
    llm::{build_prompt, LLMClient},
};
use anyhow::Result;
use async_trait::async_trait;

/// Turns one unit into analysis text. Implementations make at most one
/// external call per invocation and report every error as an [`AnalysisFailure`].
#[async_trait]
pub trait UnitAnalyzer: Send + Sync {
    async fn analyze(&self, unit: &CodeUnit) -> std::result::Result<String, AnalysisFailure>;
}

/// Asks the configured LLM for a summary, a patentability verdict and a search phrase.
pub struct PatentAnalyzer {
    llm_client: LLMClient,
}

impl PatentAnalyzer {
    pub fn new(config: LLMConfig) -> Result<Self> {
        Ok(Self {
            llm_client: LLMClient::new(config)?,
        })
    }
}

#[async_trait]
impl UnitAnalyzer for PatentAnalyzer {
    async fn analyze(&self, unit: &CodeUnit) -> std::result::Result<String, AnalysisFailure> {
        let prompt = build_prompt(&unit.name, &unit.source_text);
        self.llm_client
            .complete(&prompt)
            .await
            .map(|text| text.trim().to_string())
            .map_err(|e| AnalysisFailure::new(unit, e))
    }
}
