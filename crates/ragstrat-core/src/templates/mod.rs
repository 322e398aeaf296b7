//! Prompt template store
//!
//! Templates are plain strings with `{name}` placeholders. A
//! `PromptTemplates` value is built once and shared read-only by the
//! runners. Any single field can be overridden from YAML; unset fields
//! keep the built-in wording.

mod defaults;
mod prompt_type;

pub use prompt_type::PromptType;

use serde::{Deserialize, Deserializer, Serialize};

/// One template per [`PromptType`]; lookups cannot miss
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TypedTemplates {
    pub general: String,
    pub technical: String,
    pub business: String,
    pub academic: String,
    pub enhanced: String,
}

/// Defaults to the Hyde hypothesis templates
impl Default for TypedTemplates {
    fn default() -> Self {
        Self {
            general: defaults::HYDE_GENERAL.to_string(),
            technical: defaults::HYDE_TECHNICAL.to_string(),
            business: defaults::HYDE_BUSINESS.to_string(),
            academic: defaults::HYDE_ACADEMIC.to_string(),
            enhanced: defaults::HYDE_ENHANCED.to_string(),
        }
    }
}

impl TypedTemplates {
    /// Built-in final-answer templates; `Enhanced` shares the generic one
    pub fn final_answer_defaults() -> Self {
        Self {
            general: defaults::FINAL_ANSWER_GENERAL.to_string(),
            technical: defaults::FINAL_ANSWER_TECHNICAL.to_string(),
            business: defaults::FINAL_ANSWER_BUSINESS.to_string(),
            academic: defaults::FINAL_ANSWER_ACADEMIC.to_string(),
            enhanced: defaults::FINAL_ANSWER_GENERAL.to_string(),
        }
    }

    pub fn get(&self, prompt_type: PromptType) -> &str {
        match prompt_type {
            PromptType::General => &self.general,
            PromptType::Technical => &self.technical,
            PromptType::Business => &self.business,
            PromptType::Academic => &self.academic,
            PromptType::Enhanced => &self.enhanced,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HydeTemplates {
    /// `{question}`
    pub classification: String,
    /// `{question}`
    pub hypothesis: TypedTemplates,
    /// `{question}`, `{context}`
    #[serde(deserialize_with = "final_answer_overrides")]
    pub final_answer: TypedTemplates,
}

impl Default for HydeTemplates {
    fn default() -> Self {
        Self {
            classification: defaults::QUESTION_CLASSIFICATION.to_string(),
            hypothesis: TypedTemplates::default(),
            final_answer: TypedTemplates::final_answer_defaults(),
        }
    }
}

/// Per-type overrides; unset types keep their base template
#[derive(Deserialize, Default)]
#[serde(default)]
struct TypedOverrides {
    general: Option<String>,
    technical: Option<String>,
    business: Option<String>,
    academic: Option<String>,
    enhanced: Option<String>,
}

impl TypedOverrides {
    fn apply(self, base: TypedTemplates) -> TypedTemplates {
        TypedTemplates {
            general: self.general.unwrap_or(base.general),
            technical: self.technical.unwrap_or(base.technical),
            business: self.business.unwrap_or(base.business),
            academic: self.academic.unwrap_or(base.academic),
            enhanced: self.enhanced.unwrap_or(base.enhanced),
        }
    }
}

// A partial final-answer section must fall back to the final-answer
// defaults, not the hypothesis ones `TypedTemplates::default` gives
fn final_answer_overrides<'de, D>(deserializer: D) -> Result<TypedTemplates, D::Error>
where
    D: Deserializer<'de>,
{
    let overrides = TypedOverrides::deserialize(deserializer)?;
    Ok(overrides.apply(TypedTemplates::final_answer_defaults()))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RefineTemplates {
    /// `{context}`, `{question}`
    pub initial: String,
    /// `{question}`, `{existing_answer}`, `{context}`
    pub refine: String,
}

impl Default for RefineTemplates {
    fn default() -> Self {
        Self {
            initial: defaults::REFINE_INITIAL.to_string(),
            refine: defaults::REFINE_ITERATION.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapReduceTemplates {
    /// `{chunk_index}`, `{context}`, `{question}`
    pub map: String,
    /// `{question}`, `{map_results}`
    pub reduce: String,
}

impl Default for MapReduceTemplates {
    fn default() -> Self {
        Self {
            map: defaults::MAP.to_string(),
            reduce: defaults::REDUCE.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecompositionTemplates {
    /// `{query}`
    pub decompose: String,
    /// `{query}`, `{context}`
    pub single_query: String,
    /// `{original_query}`, `{sub_qa_pairs}`
    pub summarize: String,
}

impl Default for DecompositionTemplates {
    fn default() -> Self {
        Self {
            decompose: defaults::QUERY_DECOMPOSITION.to_string(),
            single_query: defaults::SINGLE_QUERY.to_string(),
            summarize: defaults::RESULT_SUMMARIZATION.to_string(),
        }
    }
}

/// All strategy templates
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PromptTemplates {
    #[serde(default)]
    pub hyde: HydeTemplates,
    #[serde(default)]
    pub refine: RefineTemplates,
    #[serde(default)]
    pub map_reduce: MapReduceTemplates,
    #[serde(default)]
    pub decomposition: DecompositionTemplates,
}

/// Fill `{name}` placeholders in one pass
///
/// Substituted values are never re-scanned, and braces that do not name a
/// known variable (JSON examples in prompts) are kept verbatim.
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    let extra: usize = vars.iter().map(|(_, v)| v.len()).sum();
    let mut out = String::with_capacity(template.len() + extra);
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];

        let Some(close) = after.find('}') else {
            out.push_str(&rest[open..]);
            return out;
        };

        let name = &after[..close];
        match vars.iter().find(|(key, _)| *key == name) {
            Some((_, value)) => {
                out.push_str(value);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }

    out.push_str(rest);
    out
}
