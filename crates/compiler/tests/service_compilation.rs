use schema_compiler::{kind_tag, sentinel, Bucket, Compilation, Compiler, SchemaRef, TraitEncoding};
use schema_model::{prelude, tags, Service, Shape, ShapeGraph, ShapeId, TagId, TagMap, TagValue};
use std::collections::BTreeMap;

fn id(text: &str) -> ShapeId {
    ShapeId::parse(text).expect("shape id")
}

fn compile_weather() -> Compilation {
    let _ = env_logger::builder().is_test(true).try_init();
    Compiler::with_defaults()
        .compile(&weather_graph())
        .expect("compile")
}

fn required() -> TagMap {
    let mut tag_map = TagMap::new();
    tag_map.insert(TagId::from(tags::REQUIRED), TagValue::Annotation);
    tag_map
}

fn http(method: &str, uri: &str, code: i64) -> TagValue {
    let mut record = BTreeMap::new();
    record.insert("method".to_string(), TagValue::Str(method.to_string()));
    record.insert("uri".to_string(), TagValue::Str(uri.to_string()));
    record.insert("code".to_string(), TagValue::Int(code));
    TagValue::Record(record)
}

/// A weather service with two operations sharing the Forecast shape
fn weather_graph() -> ShapeGraph {
    let ns = "example.weather";
    let mut graph = ShapeGraph::with_prelude();

    graph.add_shape(
        Shape::structure(id(&format!("{ns}#Forecast")))
            .member("chanceOfRain", ShapeId::new("core", "Float"))
            .member("low", ShapeId::new("core", "Float"))
            .member("high", ShapeId::new("core", "Float")),
    );
    graph.add_shape(Shape::list(
        id(&format!("{ns}#ForecastList")),
        id(&format!("{ns}#Forecast")),
    ));
    graph.add_shape(Shape::map(
        id(&format!("{ns}#Labels")),
        prelude::string(),
        prelude::string(),
    ));
    graph.add_shape(
        Shape::structure(id(&format!("{ns}#GetForecastInput"))).tagged_member(
            "cityId",
            prelude::string(),
            required(),
        ),
    );
    graph.add_shape(
        Shape::structure(id(&format!("{ns}#GetForecastOutput")))
            .member("forecast", id(&format!("{ns}#Forecast")))
            .member("labels", id(&format!("{ns}#Labels"))),
    );
    graph.add_shape(
        Shape::structure(id(&format!("{ns}#ListForecastsOutput")))
            .member("forecasts", id(&format!("{ns}#ForecastList"))),
    );
    graph.add_shape(
        Shape::structure(id(&format!("{ns}#NoSuchCity")))
            .annotation(tags::ERROR)
            .member("message", prelude::string()),
    );
    graph.add_shape(
        Shape::operation(id(&format!("{ns}#GetForecast")))
            .tag(tags::HTTP, http("GET", "/forecast/{cityId}", 200))
            .input(id(&format!("{ns}#GetForecastInput")))
            .output(id(&format!("{ns}#GetForecastOutput")))
            .error(id(&format!("{ns}#NoSuchCity"))),
    );
    graph.add_shape(
        Shape::operation(id(&format!("{ns}#ListForecasts")))
            .output(id(&format!("{ns}#ListForecastsOutput"))),
    );
    graph.add_service(Service::new(
        id(&format!("{ns}#Weather")),
        vec![
            id(&format!("{ns}#GetForecast")),
            id(&format!("{ns}#ListForecasts")),
        ],
    ));
    graph
}

#[test]
fn classification_is_total_and_disjoint() {
    let compilation = compile_weather();

    for shape in compilation.closure.all_shapes() {
        assert!(
            compilation.closure.bucket_of(&shape).is_some(),
            "unclassified shape: {shape}"
        );
        assert!(
            compilation.groups.group_of(&shape).is_some(),
            "ungrouped shape: {shape}"
        );
    }

    assert_eq!(
        compilation.closure.bucket_of(&id("example.weather#NoSuchCity")),
        Some(Bucket::Error)
    );
    assert_eq!(
        compilation.closure.bucket_of(&id("example.weather#ForecastList")),
        Some(Bucket::List)
    );
    assert_eq!(
        compilation.closure.bucket_of(&id("example.weather#Labels")),
        Some(Bucket::Map)
    );
}

#[test]
fn simple_containers_flatten_and_reference_containers_do_not() {
    let compilation = compile_weather();

    // map of strings flattens to the map modifier over the string code
    assert_eq!(
        compilation.resolution_of(&id("example.weather#Labels")),
        Some(&SchemaRef::Sentinel(sentinel::compose_map(sentinel::STRING)))
    );

    // list of structures needs its own descriptor
    let forecast_list = compilation
        .descriptor_of(&id("example.weather#ForecastList"))
        .expect("ForecastList descriptor");
    assert_eq!(forecast_list.kind_tag, kind_tag::LIST);
    assert_eq!(
        forecast_list.members[0].schema,
        SchemaRef::Ref("Forecast".to_string())
    );
}

#[test]
fn operation_descriptors_reference_payloads_lazily() {
    let compilation = compile_weather();

    let get_forecast = compilation
        .descriptor_of(&id("example.weather#GetForecast"))
        .expect("GetForecast descriptor");
    assert_eq!(get_forecast.kind_tag, kind_tag::OPERATION);
    assert_eq!(
        get_forecast.input,
        Some(SchemaRef::Ref("GetForecastInput".to_string()))
    );
    assert_eq!(
        get_forecast.output,
        Some(SchemaRef::Ref("GetForecastOutput".to_string()))
    );

    // the http binding encodes as a map entry, not a bit vector
    let TraitEncoding::Map(trait_map) = &get_forecast.traits else {
        panic!("expected map-encoded traits on GetForecast");
    };
    assert!(trait_map.contains_key(&TagId::from(tags::HTTP)));
}

#[test]
fn required_member_encodes_into_member_traits() {
    let compilation = compile_weather();

    let input = compilation
        .descriptor_of(&id("example.weather#GetForecastInput"))
        .expect("input descriptor");
    let TraitEncoding::Map(trait_map) = &input.members[0].traits else {
        panic!("expected map-encoded member traits");
    };
    assert!(trait_map.contains_key(&TagId::from(tags::REQUIRED)));
}

#[test]
fn errors_register_per_namespace() {
    let compilation = compile_weather();

    assert_eq!(
        compilation.error_registry["example.weather"],
        vec!["NoSuchCity".to_string()]
    );
}

#[test]
fn shared_shapes_group_under_the_mined_phrase() {
    let compilation = compile_weather();

    // Forecast is reached by both operations; the recurring phrase across
    // GetForecast/ListForecasts names the group
    assert_eq!(
        compilation
            .groups
            .group_name_of(&id("example.weather#Forecast")),
        Some("Forecast")
    );
    assert!(compilation.groups.same_group(
        &id("example.weather#Forecast"),
        &id("example.weather#ForecastList")
    ));

    // input shapes reached by a single operation group under it
    assert_eq!(
        compilation
            .groups
            .group_name_of(&id("example.weather#GetForecastInput")),
        Some("GetForecast")
    );

    // no generated group exceeds the cap
    let cap = Compiler::with_defaults().config().max_group_operations;
    for group in compilation.groups.groups().iter().skip(1) {
        assert!(group.operations.len() <= cap);
    }
}

#[test]
fn interned_literals_are_declared_once() {
    let compilation = compile_weather();

    for literal in &compilation.strings {
        let occurrences = compilation
            .strings
            .iter()
            .filter(|other| other == &literal)
            .count();
        assert_eq!(occurrences, 1, "duplicated literal: {literal}");
    }
    assert!(compilation.strings.iter().any(|s| s == "example.weather"));
    assert!(compilation.strings.iter().any(|s| s == "cityId"));
}

#[test]
fn compilation_snapshot_is_byte_identical_across_runs() {
    let first = Compiler::with_defaults()
        .compile(&weather_graph())
        .expect("first compile")
        .snapshot()
        .expect("first snapshot");
    let second = Compiler::with_defaults()
        .compile(&weather_graph())
        .expect("second compile")
        .snapshot()
        .expect("second snapshot");

    assert_eq!(first, second);
}
