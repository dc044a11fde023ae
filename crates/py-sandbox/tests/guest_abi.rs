//! Integration tests for the sandbox binding against small WAT guest
//! modules implementing the canonical-ABI contract.
//!
//! The guests stand in for the real interpreter module: a bump
//! allocator plays `canonical_abi_realloc`, `canonical_abi_free` is a
//! no-op, and `exec`/`eval` write fixed (or echoed) result envelopes.

use py_sandbox::{Sandbox, SandboxConfig, SandboxError, SandboxRuntime, Stdout, Value};

/// Guest whose `exec` reports `out="hi\n", err=""` and whose `eval`
/// reports an empty stdout record with value `("2", "int")`.
const FIXED_GUEST: &str = r#"
(module
  (memory (export "memory") 1)
  (data (i32.const 64) "hi\n")
  (data (i32.const 80) "2")
  (data (i32.const 84) "int")
  (global $next (mut i32) (i32.const 4096))
  (func (export "canonical_abi_realloc") (param i32 i32 i32 i32) (result i32)
    (local $ptr i32)
    (local.set $ptr (global.get $next))
    (global.set $next (i32.add (global.get $next) (local.get 3)))
    (local.get $ptr))
  (func (export "canonical_abi_free") (param i32 i32 i32))
  (func (export "exec") (param i32 i32) (result i32)
    (i32.store (i32.const 512) (i32.const 64))  ;; out ptr
    (i32.store (i32.const 516) (i32.const 3))   ;; out len
    (i32.store (i32.const 520) (i32.const 0))   ;; err ptr
    (i32.store (i32.const 524) (i32.const 0))   ;; err len
    (i32.const 512))
  (func (export "eval") (param i32 i32) (result i32)
    (i32.store (i32.const 512) (i32.const 0))
    (i32.store (i32.const 516) (i32.const 0))
    (i32.store (i32.const 520) (i32.const 0))
    (i32.store (i32.const 524) (i32.const 0))
    (i32.store8 (i32.const 528) (i32.const 1))  ;; discriminant: present
    (i32.store (i32.const 532) (i32.const 80))  ;; value ptr
    (i32.store (i32.const 536) (i32.const 1))   ;; value len
    (i32.store (i32.const 540) (i32.const 84))  ;; datatype ptr
    (i32.store (i32.const 544) (i32.const 3))   ;; datatype len
    (i32.const 512)))
"#;

/// Guest whose `exec` echoes its argument back as `stdout.out`,
/// exercising the host's encode path end to end. Its `eval` reports an
/// absent value.
const ECHO_GUEST: &str = r#"
(module
  (memory (export "memory") 1)
  (global $next (mut i32) (i32.const 4096))
  (func (export "canonical_abi_realloc") (param i32 i32 i32 i32) (result i32)
    (local $ptr i32)
    (local.set $ptr (global.get $next))
    (global.set $next (i32.add (global.get $next) (local.get 3)))
    (local.get $ptr))
  (func (export "canonical_abi_free") (param i32 i32 i32))
  (func (export "exec") (param $ptr i32) (param $len i32) (result i32)
    (i32.store (i32.const 512) (local.get $ptr))
    (i32.store (i32.const 516) (local.get $len))
    (i32.store (i32.const 520) (i32.const 0))
    (i32.store (i32.const 524) (i32.const 0))
    (i32.const 512))
  (func (export "eval") (param i32 i32) (result i32)
    (i32.store (i32.const 512) (i32.const 0))
    (i32.store (i32.const 516) (i32.const 0))
    (i32.store (i32.const 520) (i32.const 0))
    (i32.store (i32.const 524) (i32.const 0))
    (i32.store8 (i32.const 528) (i32.const 0)) ;; discriminant: absent
    (i32.const 512)))
"#;

/// Guest whose `eval` writes a discriminant byte of 2.
const BAD_DISCRIMINANT_GUEST: &str = r#"
(module
  (memory (export "memory") 1)
  (func (export "canonical_abi_realloc") (param i32 i32 i32 i32) (result i32)
    (i32.const 4096))
  (func (export "canonical_abi_free") (param i32 i32 i32))
  (func (export "exec") (param i32 i32) (result i32)
    (i32.const 512))
  (func (export "eval") (param i32 i32) (result i32)
    (i32.store (i32.const 512) (i32.const 0))
    (i32.store (i32.const 516) (i32.const 0))
    (i32.store (i32.const 520) (i32.const 0))
    (i32.store (i32.const 524) (i32.const 0))
    (i32.store8 (i32.const 528) (i32.const 2))
    (i32.const 512)))
"#;

/// Guest whose `exec` traps.
const TRAPPING_GUEST: &str = r#"
(module
  (memory (export "memory") 1)
  (func (export "canonical_abi_realloc") (param i32 i32 i32 i32) (result i32)
    (i32.const 4096))
  (func (export "canonical_abi_free") (param i32 i32 i32))
  (func (export "exec") (param i32 i32) (result i32)
    unreachable)
  (func (export "eval") (param i32 i32) (result i32)
    (i32.const 512)))
"#;

/// Guest whose `exec` spins forever; only an epoch tick can stop it.
const SPINNING_GUEST: &str = r#"
(module
  (memory (export "memory") 1)
  (func (export "canonical_abi_realloc") (param i32 i32 i32 i32) (result i32)
    (i32.const 4096))
  (func (export "canonical_abi_free") (param i32 i32 i32))
  (func (export "exec") (param i32 i32) (result i32)
    (loop $spin (br $spin))
    (i32.const 512))
  (func (export "eval") (param i32 i32) (result i32)
    (i32.const 512)))
"#;

/// Guest missing the `eval` export.
const MISSING_EVAL_GUEST: &str = r#"
(module
  (memory (export "memory") 1)
  (func (export "canonical_abi_realloc") (param i32 i32 i32 i32) (result i32)
    (i32.const 4096))
  (func (export "canonical_abi_free") (param i32 i32 i32))
  (func (export "exec") (param i32 i32) (result i32)
    (i32.const 512)))
"#;

/// Guest exporting `memory` as a function.
const MEMORY_AS_FUNCTION_GUEST: &str = r#"
(module
  (func (export "memory"))
  (func (export "canonical_abi_realloc") (param i32 i32 i32 i32) (result i32)
    (i32.const 0))
  (func (export "canonical_abi_free") (param i32 i32 i32))
  (func (export "exec") (param i32 i32) (result i32)
    (i32.const 0))
  (func (export "eval") (param i32 i32) (result i32)
    (i32.const 0)))
"#;

fn sandbox_from_wat(wat: &str) -> py_sandbox::Result<Sandbox> {
    let runtime = SandboxRuntime::new(SandboxConfig::default())?;
    let module = runtime.load_module_bytes("guest", wat.as_bytes())?;
    runtime.instantiate(&module)
}

#[test]
fn test_module_export_listing() {
    let runtime = SandboxRuntime::new(SandboxConfig::default()).expect("failed to create runtime");
    let module = runtime
        .load_module_bytes("guest", FIXED_GUEST.as_bytes())
        .expect("failed to load module");

    assert_eq!(module.name(), "guest");
    let exports: Vec<&str> = module.exports().collect();
    assert!(exports.contains(&"exec"));
    assert!(exports.contains(&"eval"));
    assert!(exports.contains(&"canonical_abi_realloc"));
    assert!(exports.contains(&"canonical_abi_free"));
    // `memory` is not a function export
    assert!(!exports.contains(&"memory"));
}

#[test]
fn test_exec_end_to_end() {
    let mut sandbox = sandbox_from_wat(FIXED_GUEST).expect("failed to build sandbox");

    let output = sandbox.exec("print('hi')").expect("exec failed");
    assert_eq!(
        output,
        Stdout {
            out: "hi\n".into(),
            err: String::new(),
        }
    );
}

#[test]
fn test_eval_end_to_end() {
    let mut sandbox = sandbox_from_wat(FIXED_GUEST).expect("failed to build sandbox");

    let result = sandbox.eval("1+1").expect("eval failed");
    assert_eq!(result.stdout, Stdout { out: String::new(), err: String::new() });
    assert_eq!(
        result.value,
        Some(Value {
            value: "2".into(),
            datatype: "int".into(),
        })
    );
}

#[test]
fn test_exec_echoes_encoded_argument() {
    let mut sandbox = sandbox_from_wat(ECHO_GUEST).expect("failed to build sandbox");

    for code in ["print('hi')", "", "x = 'héllo ✨'"] {
        let output = sandbox.exec(code).expect("exec failed");
        assert_eq!(output.out, code);
        assert_eq!(output.err, "");
    }
}

#[test]
fn test_eval_absent_value() {
    let mut sandbox = sandbox_from_wat(ECHO_GUEST).expect("failed to build sandbox");

    let result = sandbox.eval("x = 1").expect("eval failed");
    assert!(result.value.is_none());
}

#[test]
fn test_eval_invalid_discriminant() {
    let mut sandbox = sandbox_from_wat(BAD_DISCRIMINANT_GUEST).expect("failed to build sandbox");

    let err = sandbox.eval("1+1").unwrap_err();
    assert!(matches!(err, SandboxError::InvalidDiscriminant(2)));
}

#[test]
fn test_guest_trap_propagates() {
    let mut sandbox = sandbox_from_wat(TRAPPING_GUEST).expect("failed to build sandbox");

    let err = sandbox.exec("boom").unwrap_err();
    assert!(matches!(err, SandboxError::GuestTrap(_)));
}

#[test]
fn test_missing_export_fails_binding() {
    let err = sandbox_from_wat(MISSING_EVAL_GUEST).unwrap_err();
    match err {
        SandboxError::ExportBinding { name, .. } => assert_eq!(name, "eval"),
        other => panic!("expected ExportBinding, got {other:?}"),
    }
}

#[test]
fn test_memory_as_function_fails_binding() {
    let err = sandbox_from_wat(MEMORY_AS_FUNCTION_GUEST).unwrap_err();
    match err {
        SandboxError::ExportBinding { name, .. } => assert_eq!(name, "memory"),
        other => panic!("expected ExportBinding, got {other:?}"),
    }
}

#[test]
fn test_fuel_metering() {
    let runtime =
        SandboxRuntime::new(SandboxConfig::minimal()).expect("failed to create runtime");
    let module = runtime
        .load_module_bytes("guest", FIXED_GUEST.as_bytes())
        .expect("failed to load module");
    let mut sandbox = runtime.instantiate(&module).expect("failed to instantiate");

    let before = sandbox.remaining_fuel().expect("fuel should be metered");
    sandbox.exec("print('hi')").expect("exec failed");
    let after = sandbox.remaining_fuel().expect("fuel should be metered");
    assert!(after < before, "executing the guest should consume fuel");
}

#[test]
fn test_epoch_tick_interrupts_running_guest() {
    let config = SandboxConfig {
        epoch_interruption: true,
        ..SandboxConfig::default()
    };
    let runtime = SandboxRuntime::new(config).expect("failed to create runtime");
    let module = runtime
        .load_module_bytes("guest", SPINNING_GUEST.as_bytes())
        .expect("failed to load module");
    let mut sandbox = runtime.instantiate(&module).expect("failed to instantiate");

    let engine = runtime.engine().clone();
    let ticker = std::thread::spawn(move || {
        std::thread::sleep(std::time::Duration::from_millis(50));
        engine.increment_epoch();
    });

    let err = sandbox.exec("while True: pass").unwrap_err();
    assert!(matches!(err, SandboxError::GuestTrap(_)));
    ticker.join().unwrap();
}

#[test]
fn test_invalid_module_bytes() {
    let runtime = SandboxRuntime::new(SandboxConfig::default()).expect("failed to create runtime");
    let err = runtime
        .load_module_bytes("guest", b"not a wasm module")
        .unwrap_err();
    assert!(matches!(err, SandboxError::ModuleLoad(_)));
}
