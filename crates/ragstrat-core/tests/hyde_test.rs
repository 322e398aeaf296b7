//! Hyde runner against a scripted completion client

mod common;

use common::{setup, ScriptedClient};
use ragstrat_core::{HydeConfig, HydeRunner, KeywordRetriever, PromptType, RagStratError};
use std::cell::RefCell;

const QUESTION: &str = "什么是智能体？";

#[test]
fn test_hyde_end_to_end_with_fixed_type() {
    let (client, gateway, templates) = setup(ScriptedClient::sequence(&["HYPOTHESIS", "FINAL"]));
    let runner = HydeRunner::new(gateway, templates);

    let queries = RefCell::new(Vec::new());
    let retriever = |query: &str, top_k: usize| {
        queries.borrow_mut().push((query.to_string(), top_k));
        vec![
            "智能体是自主行动的系统".to_string(),
            "智能体由感知、规划与执行模块组成".to_string(),
        ]
    };

    let answer = runner
        .run(QUESTION, &retriever, Some(PromptType::Technical), None)
        .unwrap();

    assert_eq!(answer, "FINAL");
    assert_eq!(queries.into_inner(), vec![("HYPOTHESIS".to_string(), 5)]);

    let prompts = client.prompts();
    assert_eq!(prompts.len(), 2);
    assert!(prompts[0].contains("技术问题"));
    assert!(prompts[0].contains(QUESTION));
    let first = prompts[1].find("文档1:\n智能体是自主行动的系统").unwrap();
    let second = prompts[1].find("文档2:\n智能体由感知、规划与执行模块组成").unwrap();
    assert!(first < second);
    assert!(prompts[1].contains("技术文档资料"));
}

#[test]
fn test_hyde_auto_detects_type_and_records_result() {
    let (client, gateway, templates) = setup(ScriptedClient::sequence(&[
        "business",
        "HYPOTHESIS",
        "FINAL",
    ]));
    let runner = HydeRunner::new(gateway, templates);
    let retriever = |_q: &str, _k: usize| Vec::<String>::new();

    let result = runner.run_detailed(QUESTION, &retriever, None, Some(2)).unwrap();

    assert_eq!(result.prompt_type, PromptType::Business);
    assert_eq!(result.hypothetical_answer, "HYPOTHESIS");
    assert!(result.retrieved_documents.is_empty());
    assert_eq!(result.final_answer, "FINAL");

    let prompts = client.prompts();
    assert_eq!(prompts.len(), 3);
    assert!(prompts[1].contains("业务问题"));
    assert!(prompts[2].contains("商业资料"));
}

#[test]
fn test_unrecognized_classification_falls_back_to_enhanced() {
    let (_client, gateway, templates) = setup(ScriptedClient::sequence(&["完全无法判断"]));
    let runner = HydeRunner::new(gateway, templates);

    assert_eq!(
        runner.auto_detect_prompt_type(QUESTION).unwrap(),
        PromptType::Enhanced
    );
}

#[test]
fn test_hypothesis_cache_skips_repeat_generation() {
    let (client, gateway, templates) = setup(ScriptedClient::sequence(&["H1", "H2"]));
    let runner = HydeRunner::new(gateway, templates);

    let first = runner
        .generate_hypothetical_answer(QUESTION, Some(PromptType::General))
        .unwrap();
    let second = runner
        .generate_hypothetical_answer(QUESTION, Some(PromptType::General))
        .unwrap();

    assert_eq!(first, "H1");
    assert_eq!(second, "H1");
    assert_eq!(client.call_count(), 1);
    assert_eq!(runner.cache_len(), 1);
    assert_eq!(
        runner.cached_hypotheses()[&(QUESTION.to_string(), PromptType::General)],
        "H1"
    );

    runner.clear_cache();
    assert_eq!(runner.cache_len(), 0);
    let third = runner
        .generate_hypothetical_answer(QUESTION, Some(PromptType::General))
        .unwrap();
    assert_eq!(third, "H2");
}

#[test]
fn test_cache_disabled_regenerates() {
    let (client, gateway, templates) = setup(ScriptedClient::sequence(&["H1", "H2"]));
    let config = HydeConfig {
        cache_hypotheses: false,
        ..HydeConfig::default()
    };
    let runner = HydeRunner::with_config(gateway, templates, config);

    runner
        .generate_hypothetical_answer(QUESTION, Some(PromptType::Academic))
        .unwrap();
    let again = runner
        .generate_hypothetical_answer(QUESTION, Some(PromptType::Academic))
        .unwrap();

    assert_eq!(again, "H2");
    assert_eq!(client.call_count(), 2);
    assert_eq!(runner.cache_len(), 0);
}

#[test]
fn test_provider_failure_aborts_run() {
    let (_client, gateway, templates) = setup(ScriptedClient::with_responder(|_| {
        Err(RagStratError::Provider("LLM service error (HTTP 500): down".to_string()))
    }));
    let runner = HydeRunner::new(gateway, templates);
    let retriever = |_q: &str, _k: usize| vec!["doc".to_string()];

    let err = runner
        .run(QUESTION, &retriever, Some(PromptType::General), None)
        .unwrap_err();
    assert!(err.is_provider_error());
}

#[test]
fn test_compare_with_baseline() {
    let (client, gateway, templates) = setup(ScriptedClient::sequence(&[
        "BASELINE",
        "HYPOTHESIS",
        "FINAL",
    ]));
    let runner = HydeRunner::new(gateway, templates);

    let queries = RefCell::new(Vec::new());
    let retriever = |query: &str, _k: usize| {
        queries.borrow_mut().push(query.to_string());
        vec![format!("doc for {}", query)]
    };

    let comparison = runner
        .compare_with_baseline(QUESTION, &retriever, Some(PromptType::General))
        .unwrap();

    assert_eq!(comparison.baseline_answer, "BASELINE");
    assert_eq!(comparison.baseline_documents, vec![format!("doc for {}", QUESTION)]);
    assert_eq!(comparison.hyde.final_answer, "FINAL");
    assert_eq!(queries.into_inner(), vec![QUESTION.to_string(), "HYPOTHESIS".to_string()]);
    assert_eq!(client.call_count(), 3);
}

#[tokio::test]
async fn test_hyde_async_with_keyword_retriever() {
    let (client, gateway, templates) = setup(ScriptedClient::sequence(&[
        "technical",
        "智能体能够感知环境",
        "FINAL",
    ]));
    let runner = HydeRunner::new(gateway, templates);
    let retriever = KeywordRetriever::new(vec![
        "智能体是能够感知环境并自主行动的系统".to_string(),
        "Rust uses ownership for memory safety".to_string(),
    ]);

    let result = runner
        .run_detailed_async(QUESTION, &retriever, None, None)
        .await
        .unwrap();

    assert_eq!(result.prompt_type, PromptType::Technical);
    assert_eq!(
        result.retrieved_documents,
        vec!["智能体是能够感知环境并自主行动的系统".to_string()]
    );
    assert_eq!(result.final_answer, "FINAL");
    assert_eq!(client.call_count(), 3);
}
