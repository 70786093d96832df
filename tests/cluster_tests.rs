use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use xtree::primitives::{create_generic_operation, create_vsplit_operation, PrimitiveEnv};
use xtree::registry::builtin_patterns;
use xtree::{
    Cluster, CtorArgs, EngineConfig, ErrorCode, EvalContext, ExecutionTree, LocalityId,
    MatchPattern, Matrix, MemorySink, Operand, PatternRegistry, Primitive, PrimitiveError,
    PrimitiveMeta, PrimitiveResult, TreeBuilder, Value,
};

// ================================
// Helpers
// ================================

/// Never completes; stands in for a long-running remote evaluation.
struct Stall {
    meta: PrimitiveMeta,
}

impl Stall {
    fn create(args: CtorArgs, _env: &PrimitiveEnv) -> PrimitiveResult<Arc<dyn Primitive>> {
        Ok(Arc::new(Stall { meta: args.meta() }))
    }
}

#[async_trait]
impl Primitive for Stall {
    fn meta(&self) -> &PrimitiveMeta {
        &self.meta
    }

    async fn eval(&self, _args: &[Value], _ctx: &EvalContext) -> PrimitiveResult<Value> {
        std::future::pending::<()>().await;
        Ok(Value::Nil)
    }
}

fn config(localities: usize) -> EngineConfig {
    EngineConfig {
        localities,
        ..EngineConfig::default()
    }
}

fn cluster(localities: usize) -> Arc<Cluster> {
    Cluster::new(config(localities), Arc::new(MemorySink::new())).unwrap()
}

fn cluster_with_stall(localities: usize) -> Arc<Cluster> {
    let patterns = builtin_patterns()
        .into_iter()
        .chain([MatchPattern::new("stall", "stall()", Stall::create)]);
    let registry = Arc::new(PatternRegistry::from_patterns(patterns));
    Cluster::with_registry(config(localities), Arc::new(MemorySink::new()), registry).unwrap()
}

fn squares_6x3() -> Matrix {
    Matrix::from_vec(6, 3, (1..=18).map(|i| f64::from(i * i)).collect()).unwrap()
}

fn lit(v: impl Into<Value>) -> Operand {
    Operand::Literal(v.into())
}

// ================================
// Location-transparent evaluation
// ================================

#[tokio::test]
async fn test_remote_tree_evaluates() {
    let cluster = cluster(2);
    let sqrt = create_generic_operation(&cluster, LocalityId(0), "sqrt", lit(squares_6x3()), "", "")
        .await
        .unwrap();
    let split = create_vsplit_operation(
        &cluster,
        LocalityId(1),
        vec![Operand::Node(sqrt), lit(3i64)],
        "",
        "",
    )
    .await
    .unwrap();

    let parts = ExecutionTree::new(&cluster, split)
        .eval(&[])
        .await
        .unwrap()
        .into_range()
        .unwrap();
    assert_eq!(parts.len(), 3);
    assert_eq!(
        parts[0],
        Value::from(Matrix::from_rows(vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]]).unwrap())
    );
    assert_eq!(parts[2].shape(), Some(vec![2, 3]));
}

#[tokio::test]
async fn test_same_instance_evaluates_repeatedly() {
    let cluster = cluster(1);
    let mut builder = TreeBuilder::new(&cluster);
    let arg = builder
        .node(cluster.here(), "argument", vec![lit(0i64)])
        .await
        .unwrap();
    let root = builder
        .node(cluster.here(), "square", vec![Operand::Node(arg)])
        .await
        .unwrap();
    let tree = builder.finish(root);

    assert_eq!(tree.eval(&[Value::from(3.0)]).await.unwrap(), Value::Scalar(9.0));
    assert_eq!(
        tree.eval(&[Value::from(vec![1.0, 2.0])]).await.unwrap(),
        Value::Vector(vec![1.0, 4.0])
    );
    let err = tree.eval(&[]).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidIndex);
}

#[tokio::test]
async fn test_context_bindings_reach_remote_nodes() {
    let cluster = cluster(2);
    let mut builder = TreeBuilder::new(&cluster);
    let x = builder
        .node(LocalityId(1), "variable", vec![lit("x")])
        .await
        .unwrap();
    let root = builder
        .node(LocalityId(0), "sqrt", vec![Operand::Node(x)])
        .await
        .unwrap();
    let tree = builder.finish(root);

    let ctx = EvalContext::new(tree.cluster()).with_binding("x", Value::from(16.0));
    assert_eq!(tree.eval_with(&[], ctx).await.unwrap(), Value::Scalar(4.0));

    let err = tree.eval(&[]).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidIndex);
}

#[tokio::test]
async fn test_concurrent_evaluations_of_one_tree() {
    let cluster = cluster(2);
    let arg = cluster
        .create(LocalityId(1), "argument", vec![lit(0i64)], "", "")
        .await
        .unwrap();
    let root = create_generic_operation(&cluster, LocalityId(0), "exp2", Operand::Node(arg), "", "")
        .await
        .unwrap();
    let tree = ExecutionTree::new(&cluster, root);

    let calls = (0..8).map(|i| {
        let tree = &tree;
        async move { tree.eval(&[Value::from(i as f64)]).await }
    });
    let results = futures::future::join_all(calls).await;
    for (i, result) in results.into_iter().enumerate() {
        assert_eq!(result.unwrap(), Value::Scalar(2f64.powi(i as i32)));
    }
}

// ================================
// Construction
// ================================

#[tokio::test]
async fn test_unknown_kind() {
    let cluster = cluster(1);
    let err = cluster
        .create(cluster.here(), "not_a_kind", vec![lit(1.0)], "", "")
        .await
        .unwrap_err();
    assert_eq!(err, PrimitiveError::UnknownKind { kind: "not_a_kind".to_string() });
}

#[tokio::test]
async fn test_construction_arity_checked_on_target_locality() {
    let cluster = cluster(2);
    let err = create_vsplit_operation(&cluster, LocalityId(1), vec![], "split_rows", "model:7")
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::ArityMismatch);
    assert_eq!(err.primitive(), Some("split_rows (model:7)"));
}

#[tokio::test]
async fn test_unknown_locality_is_remote_failure() {
    let cluster = cluster(1);
    let err = cluster
        .create(LocalityId(7), "sqrt", vec![lit(1.0)], "", "")
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::RemoteFailure);
}

#[tokio::test]
async fn test_invalid_config_rejected() {
    let result = Cluster::new(config(0), Arc::new(MemorySink::new()));
    assert!(matches!(result, Err(xtree::EngineError::InvalidConfig(_))));
}

// ================================
// Failure propagation
// ================================

#[tokio::test]
async fn test_unknown_function_reports_rank() {
    let cluster = cluster(1);
    let root = create_generic_operation(
        &cluster,
        cluster.here(),
        "not_a_real_fn",
        lit(vec![1.0, 2.0]),
        "",
        "",
    )
    .await
    .unwrap();
    let err = ExecutionTree::new(&cluster, root).eval(&[]).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::UnknownFunction);
    assert!(matches!(err, PrimitiveError::UnknownFunction { rank: 1, .. }));
}

#[tokio::test]
async fn test_first_operand_failure_short_circuits() {
    let cluster = cluster_with_stall(2);
    let failing = create_generic_operation(&cluster, LocalityId(1), "not_a_real_fn", lit(1.0), "", "")
        .await
        .unwrap();
    let stall = cluster
        .create(LocalityId(0), "stall", vec![], "", "")
        .await
        .unwrap();
    let split = create_vsplit_operation(
        &cluster,
        LocalityId(0),
        vec![Operand::Node(failing), Operand::Node(stall)],
        "",
        "",
    )
    .await
    .unwrap();

    let result = tokio::time::timeout(
        Duration::from_secs(5),
        ExecutionTree::new(&cluster, split).eval(&[]),
    )
    .await
    .expect("evaluation should not wait for the stalled operand");
    let err = result.unwrap_err();
    assert!(matches!(err, PrimitiveError::UnknownFunction { rank: 0, .. }));
}

// ================================
// Lifecycle
// ================================

#[tokio::test]
async fn test_destroyed_handle_is_stale() {
    let cluster = cluster(2);
    let handle = cluster
        .create(LocalityId(1), "sqrt", vec![lit(4.0)], "", "")
        .await
        .unwrap();
    let tree = ExecutionTree::new(&cluster, handle);
    assert_eq!(tree.eval(&[]).await.unwrap(), Value::Scalar(2.0));

    cluster.destroy(handle).await.unwrap();
    let err = tree.eval(&[]).await.unwrap_err();
    assert_eq!(err, PrimitiveError::StaleHandle { handle });

    let err = cluster.destroy(handle).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::StaleHandle);
}

#[tokio::test]
async fn test_teardown_destroys_every_node() {
    let cluster = cluster(2);
    let mut builder = TreeBuilder::new(&cluster);
    let leaf = builder
        .node(LocalityId(1), "absolute", vec![lit(-9.0)])
        .await
        .unwrap();
    let root = builder
        .node(LocalityId(0), "sqrt", vec![Operand::Node(leaf)])
        .await
        .unwrap();
    assert_eq!(builder.nodes().len(), 2);
    let tree = builder.finish(root);
    assert_eq!(tree.eval(&[]).await.unwrap(), Value::Scalar(3.0));

    tree.teardown().await.unwrap();
    let probe = ExecutionTree::new(&cluster, leaf);
    assert_eq!(probe.eval(&[]).await.unwrap_err().code(), ErrorCode::StaleHandle);
}

#[tokio::test]
async fn test_shutdown_fails_in_flight_and_later_calls() {
    let cluster = cluster_with_stall(2);
    let stall = cluster
        .create(LocalityId(1), "stall", vec![], "", "")
        .await
        .unwrap();

    let in_flight = {
        let cluster = cluster.clone();
        tokio::spawn(async move { ExecutionTree::new(&cluster, stall).eval(&[]).await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;
    cluster.shutdown_locality(LocalityId(1)).await;

    let err = in_flight.await.unwrap().unwrap_err();
    assert_eq!(err.code(), ErrorCode::RemoteFailure);
    assert!(err.error_context().retryability == xtree::error::ErrorRetryability::Retryable);

    let err = ExecutionTree::new(&cluster, stall).eval(&[]).await.unwrap_err();
    assert!(matches!(
        err,
        PrimitiveError::RemoteFailure { locality: LocalityId(1), .. }
    ));

    let err = cluster
        .create(LocalityId(1), "sqrt", vec![lit(1.0)], "", "")
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::RemoteFailure);

    // The other locality keeps serving.
    let alive = cluster
        .create(LocalityId(0), "sqrt", vec![lit(1.0)], "", "")
        .await
        .unwrap();
    assert_eq!(
        ExecutionTree::new(&cluster, alive).eval(&[]).await.unwrap(),
        Value::Scalar(1.0)
    );
}
