mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;

use common::*;
use hadith_core::error::{ErrorClass, ExternalError, PipelineError};
use hadith_core::types::{Degradation, EventCluster, QueryType, SearchRequest, SearchResponse};
use pretty_assertions::assert_eq;

const FLY_QUERY: &str = "hadiths about the fly falling in a drink";

fn assert_descending(response: &SearchResponse) {
    for pair in response.results.windows(2) {
        assert!(pair[0].score >= pair[1].score, "{} < {}", pair[0].score, pair[1].score);
    }
}

fn assert_cluster_invariants(response: &SearchResponse) {
    let mut seen = std::collections::HashSet::new();
    for c in &response.clusters {
        assert!(c.hadith_indices.contains(&c.primary_index));
        for &i in &c.hadith_indices {
            assert!(i < response.results.len());
            assert!(seen.insert(i), "index {i} in two clusters");
        }
    }
}

#[tokio::test]
async fn greeting_short_circuits_before_any_search() {
    let h = Harness::new(MemoryIndex::build(&corpus()));
    let response = h.pipeline().handle_query(SearchRequest::new("hi")).await.expect("handle");
    assert_eq!(response.query_type, QueryType::Greeting);
    assert_eq!(response.message.as_deref(), QueryType::Greeting.canned_message());
    assert!(response.results.is_empty());
    assert!(response.clusters.is_empty());
    assert_eq!(response.total_results, 0);
    assert_eq!(h.embed_calls(), 0);
    assert!(h.index.calls().is_empty());
    assert_eq!(h.registry.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn off_topic_short_circuits_with_message() {
    let h = Harness::new(MemoryIndex::build(&corpus()));
    let response = h
        .pipeline()
        .handle_query(SearchRequest::new("What is the capital of France?"))
        .await
        .expect("handle");
    assert_eq!(response.query_type, QueryType::OffTopic);
    assert!(response.message.as_deref().unwrap_or_default().starts_with("I specialize in finding Hadiths"));
    assert!(response.results.is_empty());
    assert_eq!(h.embed_calls(), 0);
    assert!(h.index.calls().is_empty());
}

#[tokio::test]
async fn fly_query_restricted_to_bukhari() {
    let h = Harness::new(MemoryIndex::build(&corpus()));
    let request = SearchRequest::new(FLY_QUERY).with_collections(["hadith-bukhari"]);
    let response = h.pipeline().handle_query(request).await.expect("handle");

    assert_eq!(response.query_type, QueryType::HadithQuery);
    assert_eq!(response.searched_collections, vec!["hadith-bukhari".to_string()]);
    assert!(response.enhanced_query.starts_with(FLY_QUERY));
    assert!(response.enhanced_query.len() > FLY_QUERY.len(), "glossary adds terms");
    assert!(!response.results.is_empty());
    assert!(response.results.iter().all(|r| r.passage.collection == "hadith-bukhari"));
    assert_eq!(response.results[0].passage.hadith_id, 3320);
    assert_descending(&response);
    assert_eq!(response.total_results, response.results.len());
    assert!(response.degradations.is_empty());
    assert_eq!(h.index.calls(), vec!["hadith-bukhari".to_string()]);
}

#[tokio::test]
async fn same_event_in_two_collections_forms_one_cluster() {
    let h = Harness::new(MemoryIndex::build(&corpus()));
    let response = h.pipeline().handle_query(SearchRequest::new(FLY_QUERY)).await.expect("handle");

    assert_eq!(response.searched_collections.len(), 3);
    assert_cluster_invariants(&response);
    let fly: Vec<usize> = response
        .results
        .iter()
        .enumerate()
        .filter(|(_, r)| r.passage.text.contains("If a fly falls"))
        .map(|(i, _)| i)
        .collect();
    assert_eq!(fly.len(), 2);
    assert_eq!(response.clusters.len(), 1);
    assert_eq!(response.clusters[0].hadith_indices, fly);
    assert_eq!(response.standalone_indices().len(), response.results.len() - 2);
}

#[tokio::test]
async fn one_failed_collection_is_skipped() {
    let index = MemoryIndex::build(&corpus())
        .with_behaviour("hadith-muslim", Behaviour::Fail(ExternalError::Unavailable("503".into())));
    let h = Harness::new(index);
    let response = h.pipeline().handle_query(SearchRequest::new(FLY_QUERY)).await.expect("handle");

    assert_eq!(
        response.searched_collections,
        vec!["hadith-abudawud".to_string(), "hadith-bukhari".to_string()]
    );
    assert!(response.results.iter().all(|r| r.passage.collection != "hadith-muslim"));
    assert!(matches!(
        response.degradations.as_slice(),
        [Degradation::CollectionSkipped { collection, .. }] if collection == "hadith-muslim"
    ));
    // transient failures are retried up to max_attempts
    let muslim_calls = h.index.calls().iter().filter(|c| *c == "hadith-muslim").count();
    assert_eq!(muslim_calls, 2);
}

#[tokio::test]
async fn permanent_collection_failure_is_not_retried() {
    let index = MemoryIndex::build(&corpus())
        .with_behaviour("hadith-muslim", Behaviour::Fail(ExternalError::InvalidInput("bad vector".into())));
    let h = Harness::new(index);
    h.pipeline().handle_query(SearchRequest::new(FLY_QUERY)).await.expect("handle");
    let muslim_calls = h.index.calls().iter().filter(|c| *c == "hadith-muslim").count();
    assert_eq!(muslim_calls, 1);
}

#[tokio::test]
async fn all_collections_failing_is_an_error() {
    let index = MemoryIndex::build(&corpus())
        .with_behaviour("hadith-bukhari", Behaviour::Fail(ExternalError::Unavailable("down".into())))
        .with_behaviour("hadith-abudawud", Behaviour::Fail(ExternalError::Timeout("slow".into())))
        .with_behaviour("hadith-muslim", Behaviour::Fail(ExternalError::InvalidInput("bad".into())));
    let h = Harness::new(index);
    let err = h.pipeline().handle_query(SearchRequest::new(FLY_QUERY)).await.unwrap_err();
    assert!(matches!(err, PipelineError::AllCollectionsFailed { attempted: 3 }));
    assert_eq!(err.class(), ErrorClass::TotalFailure);
}

#[tokio::test]
async fn hanging_collection_times_out_without_blocking_the_rest() {
    let index = MemoryIndex::build(&corpus()).with_behaviour("hadith-abudawud", Behaviour::Hang);
    let mut h = Harness::new(index);
    h.settings.search.request_timeout_ms = 300;
    let started = std::time::Instant::now();
    let response = h.pipeline().handle_query(SearchRequest::new(FLY_QUERY)).await.expect("handle");

    assert!(started.elapsed() < std::time::Duration::from_secs(5));
    assert_eq!(
        response.searched_collections,
        vec!["hadith-bukhari".to_string(), "hadith-muslim".to_string()]
    );
    assert!(response.degradations.iter().any(|d| matches!(
        d,
        Degradation::CollectionSkipped { collection, reason } if collection == "hadith-abudawud" && reason.contains("timed out")
    )));
}

#[tokio::test]
async fn embedding_failure_is_fatal() {
    let mut h = Harness::new(MemoryIndex::build(&corpus()));
    h.embedder = Arc::new(CountingEmbedder::failing(ExternalError::RateLimited("429".into())));
    let err = h.pipeline().handle_query(SearchRequest::new(FLY_QUERY)).await.unwrap_err();
    assert!(matches!(err, PipelineError::Embedding(ExternalError::RateLimited(_))));
    assert_eq!(err.class(), ErrorClass::TransientExternal);
    assert_eq!(h.embed_calls(), 2);
    assert!(h.index.calls().is_empty());
}

#[tokio::test]
async fn classifier_failure_fails_open() {
    let mut h = Harness::new(MemoryIndex::build(&corpus()));
    h.classifier = Arc::new(FixedClassifier(Err(ExternalError::MalformedOutput("maybe?".into()))));
    let response = h.pipeline().handle_query(SearchRequest::new("hi")).await.expect("handle");
    assert_eq!(response.query_type, QueryType::HadithQuery);
    assert!(response.message.is_none());
    assert!(matches!(response.degradations.first(), Some(Degradation::ClassificationFailed { .. })));
    assert_eq!(h.embed_calls(), 1);
}

#[tokio::test]
async fn enhancer_failure_uses_original_query() {
    let mut h = Harness::new(MemoryIndex::build(&corpus()));
    h.enhancer = Arc::new(FixedEnhancer(Err(ExternalError::Timeout("slow model".into()))));
    let response = h.pipeline().handle_query(SearchRequest::new(FLY_QUERY)).await.expect("handle");
    assert_eq!(response.enhanced_query, FLY_QUERY);
    assert!(!response.results.is_empty());
    assert!(response.degradations.iter().any(|d| matches!(d, Degradation::EnhancementFailed { .. })));
}

#[tokio::test]
async fn inconsistent_clusters_are_discarded() {
    let mut h = Harness::new(MemoryIndex::build(&corpus()));
    h.clusterer = Arc::new(FixedClusterer(Ok(vec![EventCluster {
        event_title: "out of range".into(),
        primary_index: 0,
        hadith_indices: vec![0, 99],
        reasoning: None,
    }])));
    let response = h.pipeline().handle_query(SearchRequest::new(FLY_QUERY)).await.expect("handle");
    assert!(response.clusters.is_empty());
    assert_eq!(response.total_results, 6);
    assert_eq!(response.standalone_indices(), (0..6).collect::<Vec<_>>());
    assert!(response.degradations.iter().any(|d| matches!(d, Degradation::ClusteringDiscarded { .. })));
}

#[tokio::test]
async fn clusterer_error_leaves_results_standalone() {
    let mut h = Harness::new(MemoryIndex::build(&corpus()));
    h.clusterer = Arc::new(FixedClusterer(Err(ExternalError::MalformedOutput("no clusters field".into()))));
    let response = h.pipeline().handle_query(SearchRequest::new(FLY_QUERY)).await.expect("handle");
    assert!(response.clusters.is_empty());
    assert_eq!(response.results.len(), 6);
}

#[tokio::test]
async fn valid_scripted_clusters_are_kept() {
    let mut h = Harness::new(MemoryIndex::build(&corpus()));
    let cluster = EventCluster {
        event_title: "The fly falling in the drink".into(),
        primary_index: 1,
        hadith_indices: vec![0, 1],
        reasoning: Some("same instruction".into()),
    };
    h.clusterer = Arc::new(FixedClusterer(Ok(vec![cluster.clone()])));
    let response = h.pipeline().handle_query(SearchRequest::new(FLY_QUERY)).await.expect("handle");
    assert_eq!(response.clusters, vec![cluster]);
    assert_cluster_invariants(&response);
}

#[tokio::test]
async fn single_result_is_not_clustered() {
    let mut h = Harness::new(MemoryIndex::build(&corpus()));
    h.clusterer = Arc::new(FixedClusterer(Ok(vec![EventCluster {
        event_title: "never asked".into(),
        primary_index: 0,
        hadith_indices: vec![0, 1],
        reasoning: None,
    }])));
    let response = h
        .pipeline()
        .handle_query(SearchRequest::new(FLY_QUERY).with_top_k(1))
        .await
        .expect("handle");
    assert_eq!(response.results.len(), 1);
    assert!(response.clusters.is_empty());
    assert!(response.degradations.is_empty());
}

#[tokio::test]
async fn top_k_bounds_results() {
    let filler: Vec<(String, i64, String)> = (0..30)
        .map(|i| {
            let collection = if i % 2 == 0 { "hadith-bukhari" } else { "hadith-muslim" };
            (collection.to_string(), i, format!("Narrated companion {i}:\nStatement {i} concerning prayer number {i}"))
        })
        .collect();
    let corpus: Vec<(&str, i64, &str)> = filler.iter().map(|(c, i, t)| (c.as_str(), *i, t.as_str())).collect();
    let h = Harness::new(MemoryIndex::build(&corpus));
    let pipeline = h.pipeline();

    let default = pipeline.handle_query(SearchRequest::new("prayer")).await.expect("default");
    assert_eq!(default.results.len(), 10);
    let three = pipeline.handle_query(SearchRequest::new("prayer").with_top_k(3)).await.expect("three");
    assert_eq!(three.results.len(), 3);
    assert_descending(&three);
    let all = pipeline.handle_query(SearchRequest::new("prayer").with_top_k(50)).await.expect("fifty");
    assert_eq!(all.results.len(), 30);
}

#[tokio::test]
async fn equal_scores_order_by_collection_then_id() {
    let text = "Narrated Anas:\nThe Prophet used to break his fast with fresh dates.";
    let corpus = vec![("hadith-muslim", 7, text), ("hadith-bukhari", 9, text), ("hadith-bukhari", 2, text)];
    let mut h = Harness::new(MemoryIndex::build(&corpus));
    h.clusterer = Arc::new(FixedClusterer(Ok(vec![])));
    let pipeline = h.pipeline();
    for _ in 0..3 {
        let response = pipeline.handle_query(SearchRequest::new("breaking the fast in Ramadan")).await.expect("handle");
        let keys: Vec<(&str, i64)> = response.results.iter().map(|r| r.passage.key()).collect();
        assert_eq!(keys, vec![("hadith-bukhari", 2), ("hadith-bukhari", 9), ("hadith-muslim", 7)]);
    }
}

#[tokio::test]
async fn invalid_requests_are_rejected_up_front() {
    let h = Harness::new(MemoryIndex::build(&corpus()));
    let pipeline = h.pipeline();
    let too_long = "a".repeat(501);
    for request in [
        SearchRequest::new("   "),
        SearchRequest::new(too_long.as_str()),
        SearchRequest::new(FLY_QUERY).with_top_k(0),
        SearchRequest::new(FLY_QUERY).with_top_k(51),
    ] {
        let err = pipeline.handle_query(request).await.unwrap_err();
        assert!(matches!(err, PipelineError::InvalidQuery(_)), "got {err:?}");
        assert_eq!(err.class(), ErrorClass::PermanentInput);
    }
    assert!(pipeline.handle_query(SearchRequest::new("a".repeat(500))).await.is_ok());
    assert_eq!(h.embed_calls(), 0);
}

#[tokio::test]
async fn unknown_collections_are_rejected_before_embedding() {
    let h = Harness::new(MemoryIndex::build(&corpus()));
    let request = SearchRequest::new(FLY_QUERY).with_collections(["hadith-bukhari", "hadith-nowhere"]);
    let err = h.pipeline().handle_query(request).await.unwrap_err();
    assert_eq!(
        err.to_string(),
        "Invalid collections: hadith-nowhere. Available: hadith-abudawud, hadith-bukhari, hadith-muslim"
    );
    assert_eq!(err.class(), ErrorClass::PermanentInput);
    assert_eq!(h.embed_calls(), 0);
}

#[tokio::test]
async fn duplicate_and_empty_collection_requests() {
    let h = Harness::new(MemoryIndex::build(&corpus()));
    let pipeline = h.pipeline();
    let dup = SearchRequest::new(FLY_QUERY).with_collections(["hadith-muslim", "hadith-muslim"]);
    let response = pipeline.handle_query(dup).await.expect("dup");
    assert_eq!(response.searched_collections, vec!["hadith-muslim".to_string()]);

    let empty = SearchRequest::new(FLY_QUERY).with_collections(Vec::<String>::new());
    let response = pipeline.handle_query(empty).await.expect("empty");
    assert_eq!(response.searched_collections.len(), 3);
}

#[tokio::test]
async fn registry_listing_is_cached_between_queries() {
    let h = Harness::new(MemoryIndex::build(&corpus()));
    let pipeline = h.pipeline();
    for _ in 0..3 {
        pipeline.handle_query(SearchRequest::new(FLY_QUERY)).await.expect("handle");
    }
    assert_eq!(h.registry.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn registry_failure_without_cache_is_an_error() {
    let mut h = Harness::new(MemoryIndex::build(&corpus()));
    h.registry = Arc::new(StaticRegistry::failing(ExternalError::Unavailable("index service down".into())));
    let err = h.pipeline().handle_query(SearchRequest::new(FLY_QUERY)).await.unwrap_err();
    assert!(matches!(err, PipelineError::Registry(_)));
    assert_eq!(err.class(), ErrorClass::TransientExternal);
}

#[tokio::test]
async fn hanging_registry_fails_at_the_request_deadline() {
    let mut h = Harness::new(MemoryIndex::build(&corpus()));
    h.registry = Arc::new(StaticRegistry::hanging());
    h.settings.search.request_timeout_ms = 200;
    let pipeline = h.pipeline();
    let outcome = tokio::time::timeout(
        std::time::Duration::from_secs(3),
        pipeline.handle_query(SearchRequest::new(FLY_QUERY)),
    )
    .await
    .expect("handle_query must finish once the request deadline passes");

    let err = outcome.unwrap_err();
    assert!(matches!(err, PipelineError::Registry(ExternalError::Timeout(_))), "got {err:?}");
    assert_eq!(err.class(), ErrorClass::TransientExternal);
    assert_eq!(h.embed_calls(), 0);
}

#[tokio::test]
async fn empty_registry_means_no_collections() {
    let mut h = Harness::new(MemoryIndex::build(&corpus()));
    h.registry = Arc::new(StaticRegistry::new(vec![]));
    let err = h.pipeline().handle_query(SearchRequest::new(FLY_QUERY)).await.unwrap_err();
    assert!(matches!(err, PipelineError::NoCollections));
}

#[tokio::test]
async fn response_serializes_flat_results() {
    let h = Harness::new(MemoryIndex::build(&corpus()));
    let request = SearchRequest::new(FLY_QUERY).with_collections(["hadith-bukhari"]).with_top_k(1);
    let response = h.pipeline().handle_query(request).await.expect("handle");
    let json = serde_json::to_value(&response).expect("serialize");
    assert_eq!(json["query_type"], "HADITH_QUERY");
    assert_eq!(json["results"][0]["collection"], "hadith-bukhari");
    assert_eq!(json["results"][0]["hadith_id"], 3320);
    assert!(json["results"][0]["score"].is_number());
    assert!(json.get("degradations").is_none());
    assert!(json.get("message").is_none());
}
