use xtree::primitives::{create_file_write, create_generic_operation, create_vsplit_operation};
use xtree::{
    Cluster, EngineConfig, EngineError, ExecutionTree, LocalityId, Matrix, Operand, Value,
};

#[tokio::main]
async fn main() -> Result<(), EngineError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    println!("=== xtree execution core ===\n");

    let sink_root = std::env::temp_dir().join("xtree-demo");
    std::fs::create_dir_all(&sink_root)
        .map_err(|e| EngineError::InvalidConfig(format!("cannot create sink root: {}", e)))?;
    let config = EngineConfig {
        localities: 2,
        sink_root: sink_root.clone(),
        ..EngineConfig::default()
    };
    let cluster = Cluster::from_config(config)?;
    let here = cluster.here();
    let remote = LocalityId(1);

    let data: Vec<f64> = (1..=18).map(|i| f64::from(i * i)).collect();
    let Some(matrix) = Matrix::from_vec(6, 3, data) else {
        return Err(EngineError::InvalidConfig("bad demo matrix".to_string()));
    };
    println!("[input] {}", matrix);

    // vsplit runs on the second locality, the caller sits on the first.
    let split = create_vsplit_operation(
        &cluster,
        remote,
        vec![Operand::Literal(Value::from(matrix.clone())), Operand::Literal(Value::from(3i64))],
        "split_rows",
        "demo:1",
    )
    .await?;
    let parts = ExecutionTree::new(&cluster, split).eval(&[]).await?;
    println!("[vsplit @ {}] {}", remote, parts);

    let root = create_generic_operation(
        &cluster,
        here,
        "sqrt",
        Operand::Literal(Value::from(matrix)),
        "",
        "demo:2",
    )
    .await?;
    let tree = ExecutionTree::new(&cluster, root);
    let value = tree.eval(&[]).await?;
    println!("[sqrt] {}", value);

    let write = create_file_write(&cluster, remote, "sqrt.json", Operand::Node(root), "", "demo:3").await?;
    ExecutionTree::new(&cluster, write).eval(&[]).await?;
    println!("[file_write] {}", sink_root.join("sqrt.json").display());

    match create_generic_operation(&cluster, here, "not_a_real_fn", Operand::Literal(Value::from(1.0)), "", "demo:4")
        .await
    {
        Ok(handle) => {
            if let Err(e) = ExecutionTree::new(&cluster, handle).eval(&[]).await {
                println!("[expected failure] {} ({:?})", e, e.code());
            }
        }
        Err(e) => println!("[construction failure] {}", e),
    }

    cluster.shutdown().await;
    Ok(())
}
