//! Compile environment resolution
//!
//! Computes the include paths, definitions, and forced includes visible
//! to one module's translation units: the module's own private
//! contributions plus the public contribution of every module reachable
//! through its private and public dependency closure.

use crate::binary::{BinaryId, BinarySet};
use crate::graph::{Module, ModuleGraph, ModuleId};
use girder_module::{ModuleKind, SymbolVisibility, TargetConfig};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Resolved compile settings for one module.
///
/// All lists are ordered by first occurrence and contain no duplicates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompileEnvironment {
    pub include_paths: Vec<PathBuf>,
    pub system_include_paths: Vec<PathBuf>,
    pub definitions: Vec<String>,
    pub forced_includes: Vec<PathBuf>,
}

impl CompileEnvironment {
    pub fn new() -> Self {
        Self::default()
    }

    fn push_include_path(&mut self, path: &Path) {
        push_unique(&mut self.include_paths, path.to_path_buf());
    }

    fn push_system_include_path(&mut self, path: &Path) {
        push_unique(&mut self.system_include_paths, path.to_path_buf());
    }

    fn push_definition(&mut self, definition: &str) {
        push_unique(&mut self.definitions, definition.to_string());
    }

    fn push_forced_include(&mut self, path: &Path) {
        push_unique(&mut self.forced_includes, path.to_path_buf());
    }

    /// Whether a definition with the given text is present.
    pub fn has_definition(&self, definition: &str) -> bool {
        self.definitions.iter().any(|d| d == definition)
    }
}

fn push_unique<T: PartialEq>(values: &mut Vec<T>, value: T) {
    if !values.contains(&value) {
        values.push(value);
    }
}

/// Insertion-ordered map from module to an "include paths only" flag.
///
/// The flag forms a two-valued lattice where full inclusion dominates: a
/// module first reached through an include-path-only walk is upgraded in
/// place when a full dependency path reaches it later, keeping its
/// original position. Traversal order cannot otherwise change the
/// outcome.
#[derive(Debug, Default)]
struct EnvModuleSet {
    order: Vec<ModuleId>,
    include_paths_only: HashMap<ModuleId, bool>,
}

impl EnvModuleSet {
    /// Mark a module as fully included. Returns false when the module was
    /// already fully included, in which case the caller must not recurse.
    fn mark_full(&mut self, id: ModuleId) -> bool {
        match self.include_paths_only.insert(id, false) {
            Some(false) => false,
            Some(true) => true,
            None => {
                self.order.push(id);
                true
            }
        }
    }

    /// Mark a module as include-paths-only. Returns false when the module
    /// was already present with either flag.
    fn mark_include_paths_only(&mut self, id: ModuleId) -> bool {
        if self.include_paths_only.contains_key(&id) {
            return false;
        }
        self.include_paths_only.insert(id, true);
        self.order.push(id);
        true
    }
}

/// Resolves private compile environments against a bound module graph.
pub struct CompileEnvironmentResolver<'a> {
    graph: &'a ModuleGraph,
    binaries: &'a BinarySet,
    target: &'a TargetConfig,
}

impl<'a> CompileEnvironmentResolver<'a> {
    pub fn new(graph: &'a ModuleGraph, binaries: &'a BinarySet, target: &'a TargetConfig) -> Self {
        Self {
            graph,
            binaries,
            target,
        }
    }

    /// Compute the full compile environment for one module's own
    /// translation units.
    pub fn compute_private_compile_environment(&self, id: ModuleId) -> CompileEnvironment {
        let module = &self.graph[id];
        let mut environment = CompileEnvironment::new();

        // The module's own private settings come first.
        for path in &module.private_include_paths {
            environment.push_include_path(path);
        }
        for file in &module.descriptor().forced_include_files {
            environment.push_forced_include(file);
        }

        let mut participants = EnvModuleSet::default();
        self.find_modules_in_private_environment(id, &mut participants);

        let source_binary = module.binary();
        for &participant in &participants.order {
            self.add_module_to_environment(participant, source_binary, &mut environment);
        }
        environment
    }

    /// Collect the modules whose public settings this module's private
    /// compilation can see.
    fn find_modules_in_private_environment(&self, id: ModuleId, set: &mut EnvModuleSet) {
        let module = &self.graph[id];

        for &dependency in module.private_dependencies() {
            self.find_modules_in_public_environment(dependency, set);
        }
        for &include_module in module.private_include_path_modules() {
            self.find_include_path_modules(include_module, set);
        }

        self.find_modules_in_public_environment(id, set);
    }

    fn find_modules_in_public_environment(&self, id: ModuleId, set: &mut EnvModuleSet) {
        if !set.mark_full(id) {
            return;
        }
        let module = &self.graph[id];
        for &dependency in module.public_dependencies() {
            self.find_modules_in_public_environment(dependency, set);
        }
        // Header-only visibility propagates through public include-path
        // modules without pulling in their dependencies.
        for &include_module in module.public_include_path_modules() {
            self.find_include_path_modules(include_module, set);
        }
    }

    fn find_include_path_modules(&self, id: ModuleId, set: &mut EnvModuleSet) {
        if !set.mark_include_paths_only(id) {
            return;
        }
        for &include_module in self.graph[id].public_include_path_modules() {
            self.find_include_path_modules(include_module, set);
        }
    }

    /// Append one collected module's public contribution.
    fn add_module_to_environment(
        &self,
        id: ModuleId,
        source_binary: Option<BinaryId>,
        environment: &mut CompileEnvironment,
    ) {
        let module = &self.graph[id];

        // Root generated #includes at the module's parent directory.
        if let Some(parent) = module.descriptor().directory.parent() {
            if !parent.as_os_str().is_empty() {
                environment.push_include_path(parent);
            }
        }
        for path in &module.public_include_paths {
            environment.push_include_path(path);
        }
        for path in &module.system_include_paths {
            environment.push_system_include_path(path);
        }
        for definition in &module.descriptor().public_definitions {
            environment.push_definition(definition);
        }
        if let Some(definition) = self.api_definition(module, source_binary) {
            environment.push_definition(&definition);
        }
    }

    /// The import/export macro for `module` as seen from `source_binary`.
    ///
    /// A module's own translation units must export its symbols while
    /// consumers in other binaries import them; anything else produces
    /// silent link failures on platforms with explicit import/export.
    fn api_definition(&self, module: &Module, source_binary: Option<BinaryId>) -> Option<String> {
        if module.kind() != ModuleKind::CPlusPlus {
            return None;
        }
        let define = module.descriptor().api_define();

        let value = if self.target.is_monolithic() {
            // One binary for the whole target: a single visibility value.
            let visible_for_dll = self.target.compile_as_dll
                && module.descriptor().symbol_visibility == SymbolVisibility::VisibleForDll;
            if self.target.has_exports || visible_for_dll {
                "DLLEXPORT"
            } else {
                ""
            }
        } else {
            match module.binary() {
                Some(binary) if Some(binary) == source_binary => {
                    if self.binaries[binary].allow_exports {
                        "DLLEXPORT"
                    } else {
                        ""
                    }
                }
                // Unbound or in another binary: consumers import.
                _ => "DLLIMPORT",
            }
        };
        Some(format!("{}={}", define, value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binary::{BinaryBinder, BinaryKind};
    use crate::graph::GraphBuilder;
    use girder_module::{LinkType, ModuleDescriptor};

    fn resolve(descriptors: Vec<ModuleDescriptor>, root: &str) -> (ModuleGraph, ModuleId) {
        let mut builder = GraphBuilder::new(descriptors).with_path_probing(false);
        let root = builder.resolve(root).unwrap();
        let (graph, _) = builder.finish();
        (graph, root)
    }

    fn include_path_strings(environment: &CompileEnvironment) -> Vec<String> {
        environment
            .include_paths
            .iter()
            .map(|p| p.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_private_dependency_sees_public_closure_only() {
        // Game privately depends on Engine; Engine publicly depends on
        // Core. Game sees Core's and Engine's public include paths but
        // not Engine's private ones.
        let mut game = ModuleDescriptor::new("Game");
        game.private_dependencies = vec!["Engine".into()];
        let mut engine = ModuleDescriptor::new("Engine");
        engine.public_dependencies = vec!["Core".into()];
        engine.public_include_paths = vec!["Engine/Public".into()];
        engine.private_include_paths = vec!["Engine/Private".into()];
        let mut core = ModuleDescriptor::new("Core");
        core.public_include_paths = vec!["Core/Public".into()];

        let (mut graph, root) = resolve(vec![game, engine, core], "Game");
        let target = TargetConfig::new("Game", LinkType::Monolithic);
        let binaries = BinaryBinder::bind_monolithic(&mut graph, &target, root).unwrap();

        let resolver = CompileEnvironmentResolver::new(&graph, &binaries, &target);
        let environment = resolver.compute_private_compile_environment(root);

        let paths = include_path_strings(&environment);
        assert!(paths.contains(&"Engine/Public".to_string()));
        assert!(paths.contains(&"Core/Public".to_string()));
        assert!(!paths.contains(&"Engine/Private".to_string()));
    }

    #[test]
    fn test_transitive_public_paths_appear_once() {
        // Diamond: Game -> {Engine, Renderer} -> Core. Core's public
        // include path must appear exactly once however many paths reach
        // it.
        let mut game = ModuleDescriptor::new("Game");
        game.private_dependencies = vec!["Engine".into(), "Renderer".into()];
        let mut engine = ModuleDescriptor::new("Engine");
        engine.public_dependencies = vec!["Core".into()];
        let mut renderer = ModuleDescriptor::new("Renderer");
        renderer.public_dependencies = vec!["Core".into()];
        let mut core = ModuleDescriptor::new("Core");
        core.public_include_paths = vec!["Core/Public".into()];

        let (mut graph, root) = resolve(vec![game, engine, renderer, core], "Game");
        let target = TargetConfig::new("Game", LinkType::Monolithic);
        let binaries = BinaryBinder::bind_monolithic(&mut graph, &target, root).unwrap();

        let resolver = CompileEnvironmentResolver::new(&graph, &binaries, &target);
        let environment = resolver.compute_private_compile_environment(root);

        let occurrences = environment
            .include_paths
            .iter()
            .filter(|p| p.to_string_lossy() == "Core/Public")
            .count();
        assert_eq!(occurrences, 1);
    }

    #[test]
    fn test_own_private_include_paths_come_first() {
        let mut engine = ModuleDescriptor::new("Engine");
        engine.private_include_paths = vec!["Engine/Private".into()];
        engine.public_include_paths = vec!["Engine/Public".into()];

        let (mut graph, root) = resolve(vec![engine], "Engine");
        let target = TargetConfig::new("Engine", LinkType::Monolithic);
        let binaries = BinaryBinder::bind_monolithic(&mut graph, &target, root).unwrap();

        let resolver = CompileEnvironmentResolver::new(&graph, &binaries, &target);
        let environment = resolver.compute_private_compile_environment(root);
        assert_eq!(
            include_path_strings(&environment),
            vec!["Engine/Private".to_string(), "Engine/Public".to_string()]
        );
    }

    #[test]
    fn test_monolithic_exporting_target_exports_everywhere() {
        // With one binary there is no import side: a sibling consumer
        // gets DLLEXPORT too.
        let mut game = ModuleDescriptor::new("Game");
        game.private_dependencies = vec!["Engine".into()];
        let engine = ModuleDescriptor::new("Engine");

        let (mut graph, root) = resolve(vec![game, engine], "Game");
        let target = TargetConfig::new("Game", LinkType::Monolithic)
            .with_compile_as_dll(true)
            .with_exports(true);
        let binaries = BinaryBinder::bind_monolithic(&mut graph, &target, root).unwrap();

        let resolver = CompileEnvironmentResolver::new(&graph, &binaries, &target);
        let engine_id = graph.find("Engine").unwrap();

        let game_environment = resolver.compute_private_compile_environment(root);
        assert!(game_environment.has_definition("ENGINE_API=DLLEXPORT"));
        let engine_environment = resolver.compute_private_compile_environment(engine_id);
        assert!(engine_environment.has_definition("ENGINE_API=DLLEXPORT"));
    }

    #[test]
    fn test_monolithic_without_exports_has_empty_macro() {
        let (mut graph, root) = resolve(vec![ModuleDescriptor::new("Engine")], "Engine");
        let target = TargetConfig::new("Engine", LinkType::Monolithic);
        let binaries = BinaryBinder::bind_monolithic(&mut graph, &target, root).unwrap();

        let resolver = CompileEnvironmentResolver::new(&graph, &binaries, &target);
        let environment = resolver.compute_private_compile_environment(root);
        assert!(environment.has_definition("ENGINE_API="));
    }

    #[test]
    fn test_monolithic_visible_for_dll_module_exports() {
        let mut launch = ModuleDescriptor::new("Launch");
        launch.symbol_visibility = SymbolVisibility::VisibleForDll;

        let (mut graph, root) = resolve(vec![launch], "Launch");
        let target =
            TargetConfig::new("Launch", LinkType::Monolithic).with_compile_as_dll(true);
        let binaries = BinaryBinder::bind_monolithic(&mut graph, &target, root).unwrap();

        let resolver = CompileEnvironmentResolver::new(&graph, &binaries, &target);
        let environment = resolver.compute_private_compile_environment(root);
        assert!(environment.has_definition("LAUNCH_API=DLLEXPORT"));
    }

    #[test]
    fn test_modular_import_and_export_sides() {
        // M in its own DLL, N consuming it from another DLL: N imports,
        // M exports.
        let mut n = ModuleDescriptor::new("N");
        n.private_dependencies = vec!["M".into()];
        let m = ModuleDescriptor::new("M");

        let (mut graph, root) = resolve(vec![n, m], "N");
        let m_id = graph.find("M").unwrap();
        let target = TargetConfig::new("App", LinkType::Modular);
        let mut binder = BinaryBinder::new();
        let dll_a = binder
            .create_binary("DLL_A", BinaryKind::DynamicLibrary, "out", true)
            .unwrap();
        let dll_b = binder
            .create_binary("DLL_B", BinaryKind::DynamicLibrary, "out", true)
            .unwrap();
        binder.bind(&mut graph, dll_a, m_id).unwrap();
        binder.bind(&mut graph, dll_b, root).unwrap();
        let binaries = binder.finish();

        let resolver = CompileEnvironmentResolver::new(&graph, &binaries, &target);

        let n_environment = resolver.compute_private_compile_environment(root);
        assert!(n_environment.has_definition("M_API=DLLIMPORT"));
        assert!(n_environment.has_definition("N_API=DLLEXPORT"));

        let m_environment = resolver.compute_private_compile_environment(m_id);
        assert!(m_environment.has_definition("M_API=DLLEXPORT"));
    }

    #[test]
    fn test_modular_same_binary_without_exports_is_empty() {
        let mut n = ModuleDescriptor::new("N");
        n.private_dependencies = vec!["M".into()];
        let m = ModuleDescriptor::new("M");

        let (mut graph, root) = resolve(vec![n, m], "N");
        let m_id = graph.find("M").unwrap();
        let target = TargetConfig::new("App", LinkType::Modular);
        let mut binder = BinaryBinder::new();
        let dll = binder
            .create_binary("DLL", BinaryKind::DynamicLibrary, "out", false)
            .unwrap();
        binder.bind(&mut graph, dll, root).unwrap();
        binder.bind(&mut graph, dll, m_id).unwrap();
        let binaries = binder.finish();

        let resolver = CompileEnvironmentResolver::new(&graph, &binaries, &target);
        let environment = resolver.compute_private_compile_environment(root);
        assert!(environment.has_definition("M_API="));
        assert!(environment.has_definition("N_API="));
    }

    #[test]
    fn test_external_module_has_no_api_macro() {
        let mut engine = ModuleDescriptor::new("Engine");
        engine.public_dependencies = vec!["zlib".into()];
        let mut zlib = ModuleDescriptor::new("zlib");
        zlib.kind = ModuleKind::External;
        zlib.public_include_paths = vec!["zlib/include".into()];
        zlib.public_definitions = vec!["Z_SOLO=1".into()];

        let (mut graph, root) = resolve(vec![engine, zlib], "Engine");
        let target = TargetConfig::new("Engine", LinkType::Monolithic).with_exports(true);
        let binaries = BinaryBinder::bind_monolithic(&mut graph, &target, root).unwrap();

        let resolver = CompileEnvironmentResolver::new(&graph, &binaries, &target);
        let environment = resolver.compute_private_compile_environment(root);
        assert!(environment.has_definition("Z_SOLO=1"));
        assert!(!environment.definitions.iter().any(|d| d.starts_with("ZLIB_API=")));
        assert!(include_path_strings(&environment).contains(&"zlib/include".to_string()));
    }

    #[test]
    fn test_include_path_only_module_contributes_headers() {
        let mut engine = ModuleDescriptor::new("Engine");
        engine.private_include_path_modules = vec!["Json".into()];
        let mut json = ModuleDescriptor::new("Json");
        json.public_include_paths = vec!["Json/Public".into()];

        let (mut graph, root) = resolve(vec![engine, json], "Engine");
        let target = TargetConfig::new("Engine", LinkType::Monolithic);
        let binaries = BinaryBinder::bind_monolithic(&mut graph, &target, root).unwrap();

        let resolver = CompileEnvironmentResolver::new(&graph, &binaries, &target);
        let environment = resolver.compute_private_compile_environment(root);
        assert!(include_path_strings(&environment).contains(&"Json/Public".to_string()));
    }

    #[test]
    fn test_full_inclusion_dominates_include_paths_only() {
        // Json is reached both as an include-path module and as a full
        // public dependency; the full walk must win regardless of which
        // path is visited first, and Json keeps its first position.
        let mut game = ModuleDescriptor::new("Game");
        game.private_include_path_modules = vec!["Json".into()];
        game.private_dependencies = vec!["Engine".into()];
        let mut engine = ModuleDescriptor::new("Engine");
        engine.public_dependencies = vec!["Json".into()];
        let mut json = ModuleDescriptor::new("Json");
        json.public_dependencies = vec!["Core".into()];
        json.public_include_paths = vec!["Json/Public".into()];
        let mut core = ModuleDescriptor::new("Core");
        core.public_include_paths = vec!["Core/Public".into()];

        let (mut graph, root) = resolve(vec![game, engine, json, core], "Game");
        let target = TargetConfig::new("Game", LinkType::Monolithic);
        let binaries = BinaryBinder::bind_monolithic(&mut graph, &target, root).unwrap();

        let resolver = CompileEnvironmentResolver::new(&graph, &binaries, &target);
        let environment = resolver.compute_private_compile_environment(root);

        // Core is only reachable through Json's full dependency list, so
        // its presence proves the upgrade happened.
        let paths = include_path_strings(&environment);
        assert!(paths.contains(&"Json/Public".to_string()));
        assert!(paths.contains(&"Core/Public".to_string()));
    }

    #[test]
    fn test_sticky_merge_is_order_independent() {
        let mut set = EnvModuleSet::default();
        assert!(set.mark_include_paths_only(ModuleId(0)));
        assert!(set.mark_full(ModuleId(0)));
        assert!(!set.mark_full(ModuleId(0)));
        assert!(!set.mark_include_paths_only(ModuleId(0)));
        assert_eq!(set.order, vec![ModuleId(0)]);
        assert_eq!(set.include_paths_only[&ModuleId(0)], false);

        let mut set = EnvModuleSet::default();
        assert!(set.mark_full(ModuleId(1)));
        assert!(!set.mark_include_paths_only(ModuleId(1)));
        assert_eq!(set.include_paths_only[&ModuleId(1)], false);
    }

    #[test]
    fn test_forced_includes_from_own_descriptor() {
        let mut engine = ModuleDescriptor::new("Engine");
        engine.forced_include_files = vec!["Engine/EnginePrefix.h".into()];

        let (mut graph, root) = resolve(vec![engine], "Engine");
        let target = TargetConfig::new("Engine", LinkType::Monolithic);
        let binaries = BinaryBinder::bind_monolithic(&mut graph, &target, root).unwrap();

        let resolver = CompileEnvironmentResolver::new(&graph, &binaries, &target);
        let environment = resolver.compute_private_compile_environment(root);
        assert_eq!(
            environment.forced_includes,
            vec![PathBuf::from("Engine/EnginePrefix.h")]
        );
    }
}
