//! Generator orchestrator.
//!
//! The orchestrator owns the output modules, the wrappers bound to them, the
//! type registry and the feature gate. It receives schema traversal events
//! through [`SchemaVisitor`] and fans them out:
//!
//! - the registry sees every element of a supported feature, plus the
//!   exception-set types of unsupported ones;
//! - wrappers see only supported features, filtered by the feature's
//!   restriction;
//! - modules get feature guards around each supported feature.
//!
//! At end-file every module is finalized and the build fragments are
//! aggregated. A failing module does not stop the others.
//!
//! ```text
//! Ready --begin-file--> Idle --begin-feature--> FeatureActive | FeatureSkipped
//!                        ^                            |
//!                        +-------end-feature----------+
//! Idle --end-file--> Spent
//! ```

use std::collections::HashMap;
use std::path::PathBuf;

use tracing::{debug, trace, warn};

use crate::error::{ConfigError, GenResult, GuardError, LifecycleError, WriteError};
use crate::fragment::BuildFragments;
use crate::gate::FeatureGate;
use crate::module::{ModuleOutcome, ModuleSpec, OutputModule};
use crate::options::GeneratorOptions;
use crate::registry::TypeRegistry;
use crate::schema::{
    CommandDef, EnumDef, Feature, GroupDef, Schema, SchemaVisitor, StructDef, TypeDef,
};
use crate::wrapper::{EmitContext, Wrapper, WrapperBinding};
use crate::writer::{Artifact, ArtifactKind, ArtifactWriter, WriteResult};

/// Environment switch naming the single module to regenerate.
pub const SUPPRESS_ENV: &str = "ANDROID_EMU_VK_CEREAL_SUPPRESS";

/// Traversal state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum State {
    /// Waiting for begin-file.
    Ready,
    /// Between features.
    Idle,
    /// Inside a supported feature; holds the admitted wrapper indices.
    FeatureActive { name: String, wrappers: Vec<usize> },
    /// Inside a feature that is not generated.
    FeatureSkipped { name: String },
    /// end-file processed; no further events are accepted.
    Spent,
}

impl State {
    fn lifecycle(&self, event: &'static str) -> Result<(), LifecycleError> {
        match self {
            State::Ready => Err(LifecycleError::NotStarted { event }),
            State::Spent => Err(LifecycleError::Spent { event }),
            _ => Ok(()),
        }
    }
}

/// A wrapper with the index of its module.
#[derive(Debug)]
struct BoundWrapper {
    wrapper: Box<dyn Wrapper>,
    module: usize,
}

/// Result of a build fragment write.
#[derive(Debug)]
pub enum FragmentOutcome {
    Written(WriteResult),
    Failed(WriteError),
}

/// What a completed run produced.
#[derive(Debug)]
pub struct GenerationReport {
    /// One outcome per module, in registration order.
    pub outcomes: Vec<ModuleOutcome>,

    /// Implementation sources by build target.
    pub fragments: BuildFragments,

    /// Build fragment writes; empty in suppression mode.
    pub fragment_outcomes: Vec<FragmentOutcome>,

    /// Module kept by suppression mode, if it was on.
    pub suppress_except: Option<String>,
}

impl GenerationReport {
    /// Modules whose artifacts were written or rendered.
    pub fn written(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, ModuleOutcome::Written { .. }))
            .map(ModuleOutcome::module)
            .collect()
    }

    /// Modules skipped by suppression mode.
    pub fn suppressed(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, ModuleOutcome::Suppressed { .. }))
            .map(ModuleOutcome::module)
            .collect()
    }

    /// Modules that failed to persist, with their error.
    pub fn failed(&self) -> Vec<(&str, &WriteError)> {
        self.outcomes
            .iter()
            .filter_map(|o| match o {
                ModuleOutcome::Failed { module, error, .. } => Some((module.as_str(), error)),
                _ => None,
            })
            .collect()
    }

    /// Build fragments that failed to persist.
    pub fn fragment_failures(&self) -> Vec<&WriteError> {
        self.fragment_outcomes
            .iter()
            .filter_map(|o| match o {
                FragmentOutcome::Failed(error) => Some(error),
                FragmentOutcome::Written(_) => None,
            })
            .collect()
    }

    /// Every artifact write, modules first, then fragments.
    pub fn write_results(&self) -> impl Iterator<Item = &WriteResult> {
        let none: &[WriteResult] = &[];
        let modules = self.outcomes.iter().flat_map(move |o| match o {
            ModuleOutcome::Written { results, .. } => results.as_slice(),
            _ => none,
        });
        let fragments = self.fragment_outcomes.iter().filter_map(|o| match o {
            FragmentOutcome::Written(result) => Some(result),
            FragmentOutcome::Failed(_) => None,
        });
        modules.chain(fragments)
    }

    /// Whether every module and fragment was persisted.
    pub fn is_success(&self) -> bool {
        self.failed().is_empty() && self.fragment_failures().is_empty()
    }

    /// How to regenerate one module alone.
    pub fn suppression_hint(module: &str) -> String {
        format!("re-run with {SUPPRESS_ENV}={module} to regenerate only that module")
    }
}

/// Drives one generation run.
///
/// Not meant to be shared between threads; wrappers and modules are mutated
/// in place on every event.
#[derive(Debug)]
pub struct GeneratorOrchestrator {
    options: GeneratorOptions,
    gate: FeatureGate,
    writer: ArtifactWriter,
    modules: Vec<OutputModule>,
    module_index: HashMap<String, usize>,
    wrappers: Vec<BoundWrapper>,
    registry: TypeRegistry,
    state: State,
}

impl GeneratorOrchestrator {
    /// Register modules and wrappers.
    ///
    /// Fails when two modules share a name, a wrapper names an unknown
    /// module, or suppression mode keeps an unknown module.
    pub fn new(
        options: GeneratorOptions,
        gate: FeatureGate,
        specs: Vec<ModuleSpec>,
        bindings: Vec<WrapperBinding>,
    ) -> GenResult<Self> {
        let mut modules = Vec::with_capacity(specs.len());
        let mut module_index = HashMap::with_capacity(specs.len());

        for spec in &specs {
            if module_index.contains_key(&spec.name) {
                return Err(ConfigError::DuplicateModule {
                    name: spec.name.clone(),
                }
                .into());
            }
            let directory: PathBuf = spec
                .custom_dir
                .clone()
                .unwrap_or_else(|| options.role_dir(spec.role));
            module_index.insert(spec.name.clone(), modules.len());
            modules.push(OutputModule::new(spec, directory, &options.templates));
        }

        let known = || specs.iter().map(|s| s.name.clone()).collect::<Vec<_>>();

        let mut wrappers = Vec::with_capacity(bindings.len());
        for binding in bindings {
            let Some(&module) = module_index.get(&binding.module) else {
                return Err(ConfigError::unknown_module(
                    binding.wrapper.name(),
                    binding.module,
                    known(),
                )
                .into());
            };
            wrappers.push(BoundWrapper {
                wrapper: binding.wrapper,
                module,
            });
        }

        if let Some(keep) = &options.suppress_except {
            if !module_index.contains_key(keep) {
                return Err(ConfigError::UnknownSuppressedModule {
                    module: keep.clone(),
                    known: known(),
                }
                .into());
            }
            for module in &mut modules {
                module.set_suppressed(module.name() != keep);
            }
            debug!(module = %keep, "Suppression mode keeps a single module");
        }

        Ok(Self {
            writer: ArtifactWriter::new(options.dry_run),
            options,
            gate,
            modules,
            module_index,
            wrappers,
            registry: TypeRegistry::new(),
            state: State::Ready,
        })
    }

    /// Validate the schema and replay it through the orchestrator.
    pub fn run(&mut self, schema: &Schema) -> GenResult<GenerationReport> {
        schema.validate()?;
        schema.walk(self)
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    pub fn gate(&self) -> &FeatureGate {
        &self.gate
    }

    pub fn options(&self) -> &GeneratorOptions {
        &self.options
    }

    /// Module by registry name.
    pub fn module(&self, name: &str) -> Option<&OutputModule> {
        self.module_index.get(name).map(|&i| &self.modules[i])
    }

    /// Modules in registration order.
    pub fn modules(&self) -> &[OutputModule] {
        &self.modules
    }

    /// Invoke `f` on the selected wrappers (all when `selection` is `None`),
    /// in registration order, each with its own module.
    fn for_each_wrapper(
        wrappers: &mut [BoundWrapper],
        modules: &mut [OutputModule],
        registry: &TypeRegistry,
        selection: Option<&[usize]>,
        mut f: impl FnMut(&mut dyn Wrapper, &mut EmitContext<'_>),
    ) {
        let mut call = |bound: &mut BoundWrapper| {
            let mut cx = EmitContext {
                module: &mut modules[bound.module],
                registry,
            };
            f(bound.wrapper.as_mut(), &mut cx);
        };
        match selection {
            Some(indices) => {
                for &i in indices {
                    call(&mut wrappers[i]);
                }
            }
            None => wrappers.iter_mut().for_each(call),
        }
    }

    /// Deliver an element: registry first, then the admitted wrappers.
    ///
    /// Outside a supported feature only exception-set types reach the
    /// registry; everything else is dropped.
    fn element(
        &mut self,
        event: &'static str,
        name: &str,
        register: impl FnOnce(&mut TypeRegistry),
        emit: impl FnMut(&mut dyn Wrapper, &mut EmitContext<'_>),
    ) -> GenResult<()> {
        self.state.lifecycle(event)?;
        match &self.state {
            State::FeatureActive { wrappers, .. } => {
                register(&mut self.registry);
                Self::for_each_wrapper(
                    &mut self.wrappers,
                    &mut self.modules,
                    &self.registry,
                    Some(wrappers.as_slice()),
                    emit,
                );
            }
            State::FeatureSkipped { name: feature } => {
                trace!(element = %name, feature = %feature, "Dropped element of skipped feature");
            }
            _ => trace!(element = %name, "Dropped element outside any feature"),
        }
        Ok(())
    }

    /// Feature that encloses a dropped element, if any.
    fn skipped_feature(&self) -> Option<String> {
        match &self.state {
            State::FeatureSkipped { name } => Some(name.clone()),
            _ => None,
        }
    }

    fn finalize_all(&mut self) -> GenerationReport {
        let mut outcomes = Vec::with_capacity(self.modules.len());
        let mut fragments = BuildFragments::default();

        for module in &mut self.modules {
            let outcome = module.finalize(&self.writer);
            match &outcome {
                ModuleOutcome::Written { module: name, .. } => {
                    debug!(module = %name, "Module written");
                }
                ModuleOutcome::Failed {
                    module: name,
                    error,
                    landed,
                } => {
                    warn!(
                        module = %name,
                        error = %error,
                        landed = landed.len(),
                        "Module failed to write"
                    );
                }
                _ => {}
            }
            if let Some(entry) = module.build_fragment_entry() {
                fragments.push(entry);
            }
            outcomes.push(outcome);
        }

        let mut fragment_outcomes = Vec::new();
        if !self.options.is_suppressing() {
            let settings = &self.options.fragments;
            let guest_dir = self.options.guest_dir();
            let renders = [
                (
                    self.options.guest_fragment_path(),
                    fragments.render_guest(&guest_dir, settings),
                ),
                (
                    self.options.host_fragment_path(),
                    fragments.render_host(&self.options.output_dir, settings),
                ),
            ];
            for (path, content) in renders {
                let artifact = Artifact::new(ArtifactKind::BuildFragment, &path, content);
                match self.writer.write_fragment(artifact) {
                    Ok(result) => fragment_outcomes.push(FragmentOutcome::Written(result)),
                    Err(error) => {
                        warn!(path = %path.display(), error = %error, "Build fragment failed to write");
                        fragment_outcomes.push(FragmentOutcome::Failed(error));
                    }
                }
            }
        }

        GenerationReport {
            outcomes,
            fragments,
            fragment_outcomes,
            suppress_except: self.options.suppress_except.clone(),
        }
    }
}

impl SchemaVisitor for GeneratorOrchestrator {
    type Error = crate::error::GenError;
    type Output = GenerationReport;

    fn begin_file(&mut self) -> GenResult<()> {
        match self.state {
            State::Ready => {}
            State::Spent => return Err(LifecycleError::Spent { event: "begin-file" }.into()),
            _ => return Err(LifecycleError::AlreadyStarted.into()),
        }
        self.state = State::Idle;
        Self::for_each_wrapper(
            &mut self.wrappers,
            &mut self.modules,
            &self.registry,
            None,
            |w, cx| w.on_begin(cx),
        );
        Ok(())
    }

    fn begin_feature(&mut self, feature: &Feature) -> GenResult<()> {
        self.state.lifecycle("begin-feature")?;
        match &self.state {
            State::FeatureActive { name, .. } | State::FeatureSkipped { name } => {
                return Err(GuardError::NestedFeature {
                    active: name.clone(),
                    next: feature.name.clone(),
                }
                .into());
            }
            _ => {}
        }

        let decision = self.gate.evaluate(&feature.name);
        if !decision.supported {
            trace!(feature = %feature.name, "Feature skipped");
            self.state = State::FeatureSkipped {
                name: feature.name.clone(),
            };
            return Ok(());
        }

        let admitted: Vec<usize> = self
            .wrappers
            .iter()
            .enumerate()
            .filter(|(_, b)| decision.admits(b.wrapper.kind()))
            .map(|(i, _)| i)
            .collect();
        debug!(
            feature = %feature.name,
            kind = feature.kind.as_str(),
            wrappers = admitted.len(),
            "Feature begins"
        );

        self.registry.on_begin_feature(&feature.name, feature.kind);
        for module in &mut self.modules {
            module.open_feature_guard(&feature.name);
        }

        let kind = feature.kind;
        Self::for_each_wrapper(
            &mut self.wrappers,
            &mut self.modules,
            &self.registry,
            Some(admitted.as_slice()),
            |w, cx| w.on_begin_feature(cx, &feature.name, kind),
        );
        for command in &feature.require {
            Self::for_each_wrapper(
                &mut self.wrappers,
                &mut self.modules,
                &self.registry,
                Some(admitted.as_slice()),
                |w, cx| w.on_feature_new_cmd(cx, command),
            );
        }

        self.state = State::FeatureActive {
            name: feature.name.clone(),
            wrappers: admitted,
        };
        Ok(())
    }

    fn gen_type(&mut self, def: &TypeDef) -> GenResult<()> {
        self.state.lifecycle("gen-type")?;
        if !matches!(self.state, State::FeatureActive { .. }) && self.gate.is_exception(&def.name) {
            let feature = self.skipped_feature();
            trace!(name = %def.name, "Recording exception type");
            self.registry.record_type(def, feature);
            return Ok(());
        }
        self.element(
            "gen-type",
            &def.name,
            |r| r.on_gen_type(def),
            |w, cx| w.on_gen_type(cx, def),
        )
    }

    fn gen_struct(&mut self, def: &StructDef) -> GenResult<()> {
        self.element(
            "gen-struct",
            &def.name,
            |r| r.on_gen_struct(def),
            |w, cx| w.on_gen_struct(cx, def),
        )
    }

    fn gen_group(&mut self, def: &GroupDef) -> GenResult<()> {
        self.element(
            "gen-group",
            &def.name,
            |r| r.on_gen_group(def),
            |w, cx| w.on_gen_group(cx, def),
        )
    }

    fn gen_enum(&mut self, def: &EnumDef) -> GenResult<()> {
        self.element(
            "gen-enum",
            &def.name,
            |r| r.on_gen_enum(def),
            |w, cx| w.on_gen_enum(cx, def),
        )
    }

    fn gen_cmd(&mut self, def: &CommandDef) -> GenResult<()> {
        self.element(
            "gen-cmd",
            &def.name,
            |r| r.on_gen_cmd(def),
            |w, cx| w.on_gen_cmd(cx, def),
        )
    }

    fn end_feature(&mut self) -> GenResult<()> {
        self.state.lifecycle("end-feature")?;
        match std::mem::replace(&mut self.state, State::Idle) {
            State::FeatureActive { name, wrappers } => {
                Self::for_each_wrapper(
                    &mut self.wrappers,
                    &mut self.modules,
                    &self.registry,
                    Some(wrappers.as_slice()),
                    |w, cx| w.on_end_feature(cx),
                );
                self.registry.on_end_feature();
                for module in &mut self.modules {
                    module.close_feature_guard();
                }
                trace!(feature = %name, "Feature ends");
                Ok(())
            }
            State::FeatureSkipped { .. } => Ok(()),
            other => {
                self.state = other;
                Err(GuardError::UnmatchedEnd.into())
            }
        }
    }

    fn end_file(&mut self) -> GenResult<GenerationReport> {
        self.state.lifecycle("end-file")?;
        if let State::FeatureActive { name, .. } | State::FeatureSkipped { name } = &self.state {
            return Err(GuardError::UnclosedFeature {
                active: name.clone(),
            }
            .into());
        }

        self.registry.on_end();
        Self::for_each_wrapper(
            &mut self.wrappers,
            &mut self.modules,
            &self.registry,
            None,
            |w, cx| w.on_end(cx),
        );
        self.state = State::Spent;

        let report = self.finalize_all();
        debug!(
            written = report.written().len(),
            suppressed = report.suppressed().len(),
            failed = report.failed().len(),
            "Generation finished"
        );
        Ok(report)
    }
}
