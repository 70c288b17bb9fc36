//! End-to-end behavior of the standard pipeline over real controllers.

use std::sync::Arc;
use std::time::Duration;

use controllers::{FileController, MemoryController};
use nodes::{
    standard_pipeline, CacheInMemory, CreateBodyStream, ExpandEnvironmentVariables,
    PipelineConfig, SerializeJson, ValidateRequiredResource,
};
use pipeline::{
    Body, Controller, ControllerName, MaxAge, Pipeline, ProviderSearch, Request, ResourceError,
    ResourceName, StatusCode,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Record {
    name: String,
    count: u32,
}

fn name(value: &str) -> ResourceName {
    ResourceName::new(value).unwrap()
}

fn controller_name(value: &str) -> ControllerName {
    ControllerName::new(value).unwrap()
}

/// A (always empty) and B (holding `foo -> bar`), both on `mem`, in that order.
fn memory_pair() -> (Arc<MemoryController>, Arc<MemoryController>, Arc<ProviderSearch>) {
    let a = Arc::new(MemoryController::new(controller_name("a")));
    let b = Arc::new(MemoryController::new(controller_name("b")));
    b.insert("foo", "bar");
    let controllers: Vec<Arc<dyn Controller>> = vec![a.clone(), b.clone()];
    let search = Arc::new(ProviderSearch::new(controllers).unwrap());
    (a, b, search)
}

fn standard(search: Arc<ProviderSearch>) -> Pipeline {
    standard_pipeline(
        &PipelineConfig::default(),
        search,
        vec![Arc::new(SerializeJson::<Record>::new())],
    )
}

fn text(body: &Body) -> String {
    body.to_text(Default::default()).unwrap()
}

#[tokio::test]
async fn test_read_falls_through_to_second_controller() {
    let (_a, _b, search) = memory_pair();
    let pipeline = standard(search);

    let response = pipeline.invoke(Request::read(name("mem:foo"))).await.unwrap();
    assert_eq!(response.status, StatusCode::Success);
    assert_eq!(text(&response.body), "bar");
    assert_eq!(response.controller, Some(controller_name("b")));
}

#[tokio::test]
async fn test_missing_read_depends_on_required() {
    let (_a, _b, search) = memory_pair();
    let pipeline = standard(search);

    let err = pipeline
        .invoke(Request::read(name("mem:baz")).with_required(true))
        .await
        .unwrap_err();
    assert!(matches!(err, ResourceError::ResourceNotFound { .. }));

    let response = pipeline
        .invoke(Request::read(name("mem:baz")).with_required(false))
        .await
        .unwrap();
    assert_eq!(response.status, StatusCode::NotFound);
}

#[tokio::test]
async fn test_create_with_two_file_controllers_is_ambiguous() {
    let root = std::env::temp_dir();
    let controllers: Vec<Arc<dyn Controller>> = vec![
        Arc::new(FileController::new(controller_name("files"), &root)),
        Arc::new(FileController::new(controller_name("backup"), &root)),
    ];
    let pipeline = standard(Arc::new(ProviderSearch::new(controllers).unwrap()));

    let err = pipeline
        .invoke(Request::create(name("file:/tmp/x"), "data"))
        .await
        .unwrap_err();
    assert!(matches!(err, ResourceError::AmbiguousController { .. }));
}

#[tokio::test(start_paused = true)]
async fn test_cached_response_until_max_age_elapses() {
    let (_a, b, search) = memory_pair();
    b.insert("x", "v1");
    let pipeline = standard(search);
    let read = || Request::read(name("mem:x")).with_max_age(MaxAge::from_secs(5));

    let first = pipeline.invoke(read()).await.unwrap();
    assert_eq!(text(&first.body), "v1");

    b.insert("x", "v2");
    tokio::time::advance(Duration::from_secs(1)).await;
    let second = pipeline.invoke(read()).await.unwrap();
    assert_eq!(text(&second.body), "v1");
    assert!(second.cached);

    tokio::time::advance(Duration::from_secs(5)).await;
    let third = pipeline.invoke(read()).await.unwrap();
    assert_eq!(text(&third.body), "v2");
    assert!(!third.cached);
}

#[tokio::test]
async fn test_json_round_trip_through_memory() {
    let memory = Arc::new(MemoryController::new(controller_name("memory")));
    let search = Arc::new(ProviderSearch::new(vec![memory.clone() as Arc<dyn Controller>]).unwrap());
    let pipeline = standard(search);
    let record = Record {
        name: "x".into(),
        count: 3,
    };

    pipeline
        .invoke(Request::create(name("mem:record"), Body::typed(record.clone())))
        .await
        .unwrap();
    let response = pipeline
        .invoke(Request::read(name("mem:record")).expecting::<Record>())
        .await
        .unwrap();

    assert_eq!(response.body.downcast_ref::<Record>(), Some(&record));
}

#[tokio::test]
async fn test_expanded_name_reaches_the_controller() {
    let memory = Arc::new(MemoryController::new(controller_name("memory")));
    memory.insert("/srv/app/a.txt", "content");
    let search = Arc::new(ProviderSearch::new(vec![memory as Arc<dyn Controller>]).unwrap());
    let pipeline = Pipeline::builder(search)
        .node(ExpandEnvironmentVariables::with_lookup(|k| {
            (k == "APPDIR").then(|| "/srv/app".to_string())
        }))
        .node(ValidateRequiredResource)
        .node(CacheInMemory::new())
        .node(CreateBodyStream)
        .build();

    let response = pipeline
        .invoke(Request::read(name("mem:%APPDIR%/a.txt")))
        .await
        .unwrap();
    assert_eq!(response.name.as_str(), "mem:/srv/app/a.txt");
    assert_eq!(text(&response.body), "content");
}

#[tokio::test]
async fn test_second_read_reuses_resolution() {
    let (_a, _b, search) = memory_pair();
    let pipeline = standard(search.clone());

    pipeline.invoke(Request::read(name("mem:foo"))).await.unwrap();
    pipeline.invoke(Request::read(name("mem:foo"))).await.unwrap();

    assert_eq!(search.search_count(), 1);
}

#[tokio::test]
async fn test_deferred_body_is_stored() {
    let memory = Arc::new(MemoryController::new(controller_name("memory")));
    let search = Arc::new(ProviderSearch::new(vec![memory.clone() as Arc<dyn Controller>]).unwrap());
    let pipeline = standard(search);

    pipeline
        .invoke(Request::create(
            name("mem:lazy"),
            Body::deferred(|| Ok(bytes::Bytes::from_static(b"produced"))),
        ))
        .await
        .unwrap();
    let response = pipeline.invoke(Request::read(name("mem:lazy"))).await.unwrap();
    assert_eq!(text(&response.body), "produced");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_reads_share_one_pipeline() {
    let (_a, b, search) = memory_pair();
    for i in 0..32 {
        b.insert(format!("k{i}"), format!("v{i}"));
    }
    let pipeline = standard(search);

    let tasks = (0..32)
        .map(|i| {
            let pipeline = pipeline.clone();
            tokio::spawn(async move {
                let response = pipeline
                    .invoke(Request::read(name(&format!("mem:k{i}"))))
                    .await
                    .unwrap();
                (i, text(&response.body))
            })
        })
        .collect::<Vec<_>>();

    for task in tasks {
        let (i, body) = task.await.unwrap();
        assert_eq!(body, format!("v{i}"));
    }
}
