//! The live sandbox instance and its two operations.

use tracing::debug;
use wasmtime::{Instance, Memory, Store, TypedFunc, WasmParams, WasmResults};

use crate::abi::decode::EnvelopeReader;
use crate::abi::string::encode_string;
use crate::abi::{EvalResult, Stdout};
use crate::error::{Result, SandboxError};
use crate::runtime::HostState;

/// A live Python interpreter instance.
///
/// Holds the instance's store together with typed handles to the five
/// exports the binding needs, resolved once at construction:
///
/// | Export | Signature |
/// |--------|-----------|
/// | `memory` | linear memory |
/// | `canonical_abi_realloc` | `(i32, i32, i32, i32) -> i32` |
/// | `canonical_abi_free` | `(i32, i32, i32) -> ()` |
/// | `exec` | `(ptr: i32, len: i32) -> i32` |
/// | `eval` | `(ptr: i32, len: i32) -> i32` |
///
/// Calls are synchronous and run the guest to completion; the `&mut
/// self` receivers keep one call in flight per instance. Guest-side
/// resources are reclaimed when the instance is dropped.
pub struct Sandbox {
    store: Store<HostState>,
    memory: Memory,
    realloc: TypedFunc<(i32, i32, i32, i32), i32>,
    free: TypedFunc<(i32, i32, i32), ()>,
    exec_fn: TypedFunc<(i32, i32), i32>,
    eval_fn: TypedFunc<(i32, i32), i32>,
}

impl Sandbox {
    /// Bind an instantiated module, resolving and type-checking every
    /// required export. A missing or mistyped export is a fatal
    /// construction error: the module is structurally incompatible
    /// with this binding.
    pub(crate) fn bind(mut store: Store<HostState>, instance: Instance) -> Result<Self> {
        let memory = instance.get_memory(&mut store, "memory").ok_or_else(|| {
            SandboxError::ExportBinding {
                name: "memory",
                reason: "not found or not a linear memory".into(),
            }
        })?;
        let realloc = typed_export(&mut store, &instance, "canonical_abi_realloc")?;
        let free = typed_export(&mut store, &instance, "canonical_abi_free")?;
        let exec_fn = typed_export(&mut store, &instance, "exec")?;
        let eval_fn = typed_export(&mut store, &instance, "eval")?;

        Ok(Self {
            store,
            memory,
            realloc,
            free,
            exec_fn,
            eval_fn,
        })
    }

    /// Run Python code in the sandbox, capturing its output.
    pub fn exec(&mut self, code: &str) -> Result<Stdout> {
        let ret = self.call_export("exec", self.exec_fn.clone(), code)?;
        EnvelopeReader::new(&mut self.store, self.memory, self.free.clone()).read_stdout(ret)
    }

    /// Evaluate a Python expression, capturing its output and, when
    /// the source produced one, its value.
    pub fn eval(&mut self, expr: &str) -> Result<EvalResult> {
        let ret = self.call_export("eval", self.eval_fn.clone(), expr)?;
        EnvelopeReader::new(&mut self.store, self.memory, self.free.clone()).read_eval_result(ret)
    }

    /// Encode the argument into guest memory and invoke one export,
    /// returning the envelope pointer it hands back.
    ///
    /// The guest consumes the argument buffer itself; the host frees
    /// only the buffers it lifts out of the result envelope.
    fn call_export(
        &mut self,
        name: &'static str,
        func: TypedFunc<(i32, i32), i32>,
        arg: &str,
    ) -> Result<u32> {
        let (ptr, len) = encode_string(&mut self.store, &self.memory, &self.realloc, arg)?;
        debug!(export = name, len, "invoking guest export");

        let ret = func
            .call(&mut self.store, (ptr as i32, len as i32))
            .map_err(|e| SandboxError::GuestTrap(e.to_string()))?;
        Ok(ret as u32)
    }

    /// Get remaining fuel, if fuel metering is enabled.
    pub fn remaining_fuel(&self) -> Option<u64> {
        self.store.get_fuel().ok()
    }
}

impl std::fmt::Debug for Sandbox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sandbox").finish_non_exhaustive()
    }
}

fn typed_export<P, R>(
    store: &mut Store<HostState>,
    instance: &Instance,
    name: &'static str,
) -> Result<TypedFunc<P, R>>
where
    P: WasmParams,
    R: WasmResults,
{
    instance
        .get_typed_func::<P, R>(&mut *store, name)
        .map_err(|e| SandboxError::ExportBinding {
            name,
            reason: e.to_string(),
        })
}
