//! 配置文件驱动求值的集成测试

mod common;

use std::io::Write;

use serial_test::serial;
use tempfile::NamedTempFile;

use common::*;

use graphquery::config::Config;
use graphquery::core::vertex_edge_path::{EdgeDirection, VertexId};
use graphquery::core::{EvalError, QueryErrorKind, Value};
use graphquery::expression::{evaluate, Environment};
use graphquery::query::{
    ComprehensionKind, NodeId, NodeKind, PathDescription, PathShape, QueryGraphBuilder,
    TypeRestriction,
};
use graphquery::utils::logging;

fn load(content: &str) -> Config {
    let mut file = NamedTempFile::new().expect("创建临时文件失败");
    file.write_all(content.as_bytes()).expect("写入配置失败");
    Config::load(file.path()).expect("加载配置失败")
}

/// Road* 从 v1 出发可达的顶点
fn roads_from_v1() -> (QueryGraphBuilder, NodeId) {
    let mut b = builder();
    let road = b.add(NodeKind::PathDescription(PathDescription::new(
        PathShape::Simple {
            direction: EdgeDirection::Out,
            types: TypeRestriction::new().accept("Road"),
            roles: vec![],
            predicate: None,
        },
    )));
    let path = b.add(NodeKind::PathDescription(PathDescription::new(
        PathShape::Iterated {
            path: road,
            at_least_once: false,
        },
    )));
    let start = b.literal(Value::Vertex(VertexId(1)));
    let root = b.add(NodeKind::ForwardVertexSet { start, path });
    (b, root)
}

#[test]
fn test_search_limit_from_config_file() {
    let config = load("[evaluation]\nmax_search_states = 2\n");

    let graph = town_graph();
    let mut env = Environment::new();

    let (b, root) = roads_from_v1();
    let unlimited = compile(b, root);
    assert_eq!(
        evaluate(&unlimited, &graph, &mut env, None),
        Ok(vertex_set(&[1, 2, 3]))
    );

    let (b, root) = roads_from_v1();
    let limited = compile(b, root).with_config(&config);
    match evaluate(&limited, &graph, &mut env, None) {
        Err(EvalError::Query(err)) => assert_eq!(err.kind, QueryErrorKind::PathError),
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_cost_model_from_config_file() {
    let config = load("[cost]\nfunction_cost = 7.5\n");

    let mut b = builder();
    let x = b.variable("x");
    let call = b.apply("echo", vec![x]);
    let root = b.add(NodeKind::Root {
        bound_variables: vec![x],
        query: call,
        store_as: None,
    });
    // echo 没有声明代价，使用配置中的默认函数代价
    let query = compile_counting(b, root).0.with_config(&config);
    assert_eq!(query.cost_estimate(call).own_cost, 7.5);
}

#[test]
#[serial]
fn test_logging_during_evaluation() {
    let dir = tempfile::tempdir().expect("创建临时目录失败");
    let mut config = load("[log]\nlevel = \"debug\"\nfile = \"evaluation\"\n");
    config.log.dir = dir.path().to_string_lossy().into_owned();

    logging::init(&config.log).expect("日志初始化失败");
    let mut b = builder();
    let (x, decl) = declaration(&mut b, "x", int_list(1..=3));
    let root = b.add(NodeKind::Comprehension {
        kind: ComprehensionKind::List,
        declaration: decl,
        result: x,
        key: None,
        max_count: None,
    });
    let query = compile(b, root).with_config(&config);
    let graph = empty_graph();
    let mut env = Environment::new();
    let result = evaluate(&query, &graph, &mut env, None);
    logging::shutdown();

    assert_eq!(result, Ok(int_list(1..=3)));
    assert!(!logging::is_initialized());
    let written = std::fs::read_dir(dir.path())
        .expect("读取日志目录失败")
        .filter_map(Result::ok)
        .any(|entry| entry.file_name().to_string_lossy().starts_with("evaluation"));
    assert!(written);
}
