// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Shared helpers for the integration tests.

#![allow(dead_code)]

use tracing_subscriber::EnvFilter;
use veil_vm::ast::Statement;
use veil_vm::ast::build::program;
use veil_vm::{Engine, EngineConfig, Environment, Error, TableMode, Value, VmOptions};

/// Installs a subscriber honouring `RUST_LOG`; repeated calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// An engine with a fixed, non-canonical table.
pub fn engine() -> Engine {
    engine_with(TableMode::Random { seed: Some(0x5eed) }, VmOptions::default())
}

pub fn engine_with(table: TableMode, vm: VmOptions) -> Engine {
    init_tracing();
    let config = EngineConfig {
        table,
        vm,
        ..EngineConfig::default()
    };
    match Engine::with_config(config) {
        Ok(engine) => engine,
        Err(err) => panic!("engine configuration rejected: {}", err),
    }
}

/// Runs a program against a fresh environment with the builtins.
pub fn run(body: Vec<Statement>) -> Result<Value, Error> {
    run_in(&Environment::with_builtins(), body)
}

pub fn run_in(env: &Environment, body: Vec<Statement>) -> Result<Value, Error> {
    engine().eval(&program(body), env)
}

/// Runs a program that must complete, returning its value.
pub fn eval(body: Vec<Statement>) -> Value {
    match run(body) {
        Ok(value) => value,
        Err(err) => panic!("program failed: {}", err),
    }
}

/// The value thrown out of a failed run.
pub fn thrown(result: Result<Value, Error>) -> Value {
    match result {
        Err(Error::Runtime(err)) => match err.thrown() {
            Some(value) => value.clone(),
            None => panic!("expected a thrown value, got {}", err),
        },
        Err(err) => panic!("expected a runtime error, got {}", err),
        Ok(value) => panic!("expected a throw, got {}", value),
    }
}

/// The `name` of a thrown error object.
pub fn error_name(value: &Value) -> String {
    match value {
        Value::Object(object) => object.get("name").to_js_string(),
        other => panic!("expected an error object, got {}", other),
    }
}

pub fn number(n: f64) -> Value {
    Value::Number(n)
}

pub fn text(s: &str) -> Value {
    Value::from(s)
}
