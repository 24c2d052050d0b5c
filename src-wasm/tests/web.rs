//! Browser tests for the JS-facing engine

#![cfg(target_arch = "wasm32")]

use serde_json::{json, Value};
use wasm_bindgen::JsValue;
use wasm_bindgen_test::*;

use timeline_wasm::TimelineEngine;

wasm_bindgen_test_configure!(run_in_browser);

fn js(value: Value) -> JsValue {
    serde_wasm_bindgen::to_value(&value).unwrap()
}

fn rust(value: JsValue) -> Value {
    serde_wasm_bindgen::from_value(value).unwrap()
}

#[wasm_bindgen_test]
fn calculate_before_initialize_fails() {
    let engine = TimelineEngine::new();
    assert!(engine.calculate().is_err());
}

#[wasm_bindgen_test]
fn calculate_returns_camel_case_rows() {
    let mut engine = TimelineEngine::new();
    engine
        .initialize(
            js(json!([
                {"id": "A", "durationDays": 10, "backParallelDays": 3},
                {"id": "B", "duration_days": 6, "front_parallel_days": 2},
            ])),
            JsValue::UNDEFINED,
        )
        .unwrap();

    let timeline = rust(engine.calculate().unwrap());
    assert_eq!(timeline["rows"][1]["startDay"].as_f64(), Some(5.0));
    assert_eq!(timeline["rows"][0]["successor"], json!("B"));
    assert_eq!(timeline["stats"]["taskCount"].as_u64(), Some(2));
}

#[wasm_bindgen_test]
fn draw_gesture_round_trip() {
    let mut engine = TimelineEngine::new();
    engine
        .initialize(
            js(json!([{"id": "A", "durationDays": 10, "backParallelDays": 4}])),
            js(json!({"pixelsPerUnit": 10})),
        )
        .unwrap();

    assert!(engine.begin_draw("A".into(), 70.0).unwrap());
    assert!(!engine.pointer_move(90.0, 0.0).unwrap().is_null());
    let result = rust(engine.pointer_up(90.0, 0.0).unwrap());
    assert_eq!(result["committed"], json!(true));
    assert_eq!(result["outcome"]["kind"], json!("subTaskDrafted"));

    let subtasks = rust(engine.get_subtasks().unwrap());
    assert_eq!(subtasks.as_array().map(Vec::len), Some(1));
}

#[wasm_bindgen_test]
fn unknown_target_kind_is_an_error() {
    let mut engine = TimelineEngine::new();
    engine.initialize(js(json!([])), JsValue::NULL).unwrap();
    assert!(engine.begin_drag("milestone".into(), "A".into(), 0.0).is_err());
}
