use inkwell::OptimizationLevel;
use inkwell::targets::{
    CodeModel, InitializationConfig, RelocMode, Target, TargetMachine, TargetTriple,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TargetError {
    #[error("failed to initialize the native target: {0}")]
    Initialization(String),

    #[error("no LLVM target for triple '{triple}': {message}")]
    UnknownTriple { triple: String, message: String },

    #[error("LLVM could not create a target machine for '{triple}' (cpu '{cpu}')")]
    MachineCreation { triple: String, cpu: String },
}

/// How to build the target machine used for object emission.
///
/// Defaults to the host triple, a generic CPU and no optimization.
#[derive(Debug, Clone)]
pub struct TargetOptions {
    triple: Option<String>,
    cpu: String,
    features: String,
    opt_level: OptimizationLevel,
    reloc_mode: RelocMode,
    code_model: CodeModel,
}

impl Default for TargetOptions {
    fn default() -> Self {
        TargetOptions {
            triple: None,
            cpu: "generic".to_string(),
            features: String::new(),
            opt_level: OptimizationLevel::None,
            reloc_mode: RelocMode::Default,
            code_model: CodeModel::Default,
        }
    }
}

impl TargetOptions {
    pub fn host() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_triple(mut self, triple: &str) -> Self {
        self.triple = Some(triple.to_string());
        self
    }

    #[must_use]
    pub fn with_cpu(mut self, cpu: &str) -> Self {
        self.cpu = cpu.to_string();
        self
    }

    #[must_use]
    pub fn with_features(mut self, features: &str) -> Self {
        self.features = features.to_string();
        self
    }

    #[must_use]
    pub fn with_opt_level(mut self, level: OptimizationLevel) -> Self {
        self.opt_level = level;
        self
    }

    #[must_use]
    pub fn with_reloc_mode(mut self, mode: RelocMode) -> Self {
        self.reloc_mode = mode;
        self
    }

    #[must_use]
    pub fn with_code_model(mut self, model: CodeModel) -> Self {
        self.code_model = model;
        self
    }

    pub fn triple(&self) -> Option<&str> {
        self.triple.as_deref()
    }

    pub fn cpu(&self) -> &str {
        &self.cpu
    }

    pub fn features(&self) -> &str {
        &self.features
    }

    pub fn opt_level(&self) -> OptimizationLevel {
        self.opt_level
    }

    pub(crate) fn create_machine(&self) -> Result<(TargetMachine, TargetTriple), TargetError> {
        let config = InitializationConfig::default();
        let triple = match &self.triple {
            Some(triple) => {
                Target::initialize_all(&config);
                TargetTriple::create(triple)
            }
            None => {
                Target::initialize_native(&config).map_err(TargetError::Initialization)?;
                TargetMachine::get_default_triple()
            }
        };
        let triple_name = triple.as_str().to_string_lossy().to_string();

        let target = Target::from_triple(&triple).map_err(|e| TargetError::UnknownTriple {
            triple: triple_name.clone(),
            message: e.to_string(),
        })?;

        let machine = target
            .create_target_machine(
                &triple,
                &self.cpu,
                &self.features,
                self.opt_level,
                self.reloc_mode,
                self.code_model,
            )
            .ok_or_else(|| TargetError::MachineCreation {
                triple: triple_name,
                cpu: self.cpu.clone(),
            })?;

        Ok((machine, triple))
    }
}
