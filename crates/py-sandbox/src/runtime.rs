//! Runtime setup: engine, module loading, and instantiation.
//!
//! Uses wasmtime-wasi preview1 for compatibility with the interpreter
//! module, which is built for `wasm32-wasi`.

use std::path::Path;

use tracing::debug;
use wasmtime::{
    Config, Engine, ExternType, Linker, Module, OptLevel, Store, StoreLimits, StoreLimitsBuilder,
};

use crate::config::{SandboxConfig, WasiCapabilities};
use crate::error::{Result, SandboxError};
use crate::sandbox::Sandbox;

/// Host state for the store, containing the WASI preview1 context.
pub(crate) struct HostState {
    preview1: wasmtime_wasi::preview1::WasiP1Ctx,
    limits: StoreLimits,
}

impl HostState {
    fn preview1(&mut self) -> &mut wasmtime_wasi::preview1::WasiP1Ctx {
        &mut self.preview1
    }
}

/// Factory for sandbox instances: owns the engine and configuration.
pub struct SandboxRuntime {
    engine: Engine,
    config: SandboxConfig,
}

/// A compiled interpreter module, ready to instantiate.
pub struct SandboxModule {
    module: Module,
    name: String,
}

impl std::fmt::Debug for SandboxModule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SandboxModule")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl SandboxRuntime {
    /// Create a new runtime with the given configuration.
    pub fn new(config: SandboxConfig) -> Result<Self> {
        let mut engine_config = Config::new();

        engine_config.cranelift_opt_level(match config.optimization_level {
            0 => OptLevel::None,
            _ => OptLevel::Speed,
        });

        if config.fuel_limit.is_some() {
            engine_config.consume_fuel(true);
        }

        if config.epoch_interruption {
            engine_config.epoch_interruption(true);
        }

        if let Some(ref cache_path) = config.cache_path {
            if let Err(e) = engine_config.cache_config_load(cache_path) {
                tracing::warn!("Failed to load cache config: {}", e);
            }
        }

        let engine = Engine::new(&engine_config)
            .map_err(|e| SandboxError::Engine(format!("engine creation failed: {}", e)))?;

        Ok(Self { engine, config })
    }

    /// Load the interpreter module from a file.
    pub fn load_module(&self, path: impl AsRef<Path>) -> Result<SandboxModule> {
        let path = path.as_ref();
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("module")
            .to_string();

        let bytes = std::fs::read(path)?;
        self.load_module_bytes(&name, &bytes)
    }

    /// Load the interpreter module from bytes.
    pub fn load_module_bytes(&self, name: &str, bytes: &[u8]) -> Result<SandboxModule> {
        let module = Module::new(&self.engine, bytes)
            .map_err(|e| SandboxError::ModuleLoad(e.to_string()))?;

        Ok(SandboxModule {
            module,
            name: name.to_string(),
        })
    }

    /// Instantiate a module and bind it into a live [`Sandbox`].
    pub fn instantiate(&self, module: &SandboxModule) -> Result<Sandbox> {
        let host_state = self.build_host_state(&self.config.capabilities)?;
        let mut store = Store::new(&self.engine, host_state);
        store.limiter(|state| &mut state.limits);

        if let Some(fuel) = self.config.fuel_limit {
            store
                .set_fuel(fuel)
                .map_err(|e| SandboxError::Engine(format!("fuel setup failed: {}", e)))?;
        }
        if self.config.epoch_interruption {
            // One tick of headroom; the caller drives increment_epoch.
            store.set_epoch_deadline(1);
        }

        let mut linker: Linker<HostState> = Linker::new(&self.engine);
        wasmtime_wasi::preview1::add_to_linker_sync(&mut linker, |state| state.preview1())
            .map_err(|e| SandboxError::Wasi(e.to_string()))?;

        debug!(module = %module.name, "instantiating interpreter module");
        let instance = linker
            .instantiate(&mut store, &module.module)
            .map_err(|e| SandboxError::Instantiation(e.to_string()))?;

        Sandbox::bind(store, instance)
    }

    /// Build host state from capabilities.
    fn build_host_state(&self, caps: &WasiCapabilities) -> Result<HostState> {
        let mut builder = wasmtime_wasi::WasiCtxBuilder::new();

        if caps.stdin {
            builder.inherit_stdin();
        }
        if caps.stdout {
            builder.inherit_stdout();
        }
        if caps.stderr {
            builder.inherit_stderr();
        }

        for (key, value) in &caps.env_vars {
            builder.env(key, value);
        }

        builder.args(&caps.args);

        for dir in &caps.preopened_dirs_ro {
            builder
                .preopened_dir(
                    dir,
                    dir.to_string_lossy(),
                    wasmtime_wasi::DirPerms::READ,
                    wasmtime_wasi::FilePerms::READ,
                )
                .map_err(|e| SandboxError::Wasi(format!("failed to open dir {:?}: {}", dir, e)))?;
        }

        for dir in &caps.preopened_dirs_rw {
            builder
                .preopened_dir(
                    dir,
                    dir.to_string_lossy(),
                    wasmtime_wasi::DirPerms::all(),
                    wasmtime_wasi::FilePerms::all(),
                )
                .map_err(|e| SandboxError::Wasi(format!("failed to open dir {:?}: {}", dir, e)))?;
        }

        let preview1 = builder.build_p1();

        let mut limits = StoreLimitsBuilder::new();
        if self.config.max_memory > 0 {
            limits = limits.memory_size(self.config.max_memory);
        }

        Ok(HostState {
            preview1,
            limits: limits.build(),
        })
    }

    /// Get the configuration.
    pub fn config(&self) -> &SandboxConfig {
        &self.config
    }

    /// Get the engine.
    ///
    /// When epoch interruption is enabled, a watchdog thread calls
    /// [`Engine::increment_epoch`] on (a clone of) this engine to cut
    /// off running guests:
    ///
    /// ```rust,ignore
    /// let engine = runtime.engine().clone();
    /// std::thread::spawn(move || {
    ///     std::thread::sleep(deadline);
    ///     engine.increment_epoch();
    /// });
    /// ```
    pub fn engine(&self) -> &Engine {
        &self.engine
    }
}

impl SandboxModule {
    /// Get the module name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get exported function names.
    pub fn exports(&self) -> impl Iterator<Item = &str> {
        self.module.exports().filter_map(|e| {
            if matches!(e.ty(), ExternType::Func(_)) {
                Some(e.name())
            } else {
                None
            }
        })
    }
}
