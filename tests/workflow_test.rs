//! End-to-end workflow runs against an in-process toolchain.

use std::cell::RefCell;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use tempfile::TempDir;

use frida_builder::presets::MODULE_NAME;
use frida_builder::{
    extract, BuildError, Executor, Registry, Result, Step, Tool, Toolchain, Workflow, ARTIFACT,
};

/// Stands in for esbuild, terser and qjsc.
///
/// Every call records which file it read. Bundling prefixes a banner,
/// minifying strips whitespace, and compiling emits the C array that qjsc
/// would generate for the module file.
#[derive(Default)]
struct FakeToolchain {
    inputs: RefCell<Vec<(Tool, PathBuf)>>,
    generated: RefCell<Vec<String>>,
}

impl FakeToolchain {
    fn inputs(&self) -> Vec<(Tool, PathBuf)> {
        self.inputs.borrow().clone()
    }
}

impl Toolchain for FakeToolchain {
    fn bundle(&self, entry: &Path, _options: &Value) -> Result<Vec<u8>> {
        self.inputs
            .borrow_mut()
            .push((Tool::Esbuild, entry.to_path_buf()));
        let mut out = b"/* bundled */\n".to_vec();
        out.extend(std::fs::read(entry).unwrap());
        Ok(out)
    }

    fn minify(&self, dir: &Path, args: &[OsString]) -> Result<()> {
        let input = dir.join(&args[0]);
        self.inputs.borrow_mut().push((Tool::Terser, input.clone()));
        assert_eq!(&args[args.len() - 2..], ["-o", ARTIFACT]);

        let source = std::fs::read_to_string(&input).unwrap();
        let minified: String = source.split_whitespace().collect();
        std::fs::write(dir.join(ARTIFACT), minified).unwrap();
        Ok(())
    }

    fn compile(&self, dir: &Path, args: &[OsString]) -> Result<()> {
        assert_eq!(args, ["-c", "-m", MODULE_NAME, "-o", ARTIFACT]);
        let module = dir.join(MODULE_NAME);
        self.inputs.borrow_mut().push((Tool::Qjsc, module.clone()));

        let source = std::fs::read(&module).unwrap();
        let mut text = format!(
            "/* File generated automatically by the QuickJS compiler. */\n\n\
             #include <inttypes.h>\n\n\
             const uint32_t qjsc_f_size = {len};\n\n\
             const uint8_t qjsc_f[{len}] = {{\n",
            len = source.len()
        );
        for line in source.chunks(8) {
            text.push(' ');
            for byte in line {
                text.push_str(&format!("0x{byte:02x}, "));
            }
            text.push('\n');
        }
        text.push_str("};\n\n");

        self.generated.borrow_mut().push(text.clone());
        std::fs::write(dir.join(ARTIFACT), text).unwrap();
        Ok(())
    }
}

struct Fixture {
    root: TempDir,
    entrypoint: PathBuf,
}

impl Fixture {
    fn new() -> Self {
        let root = tempfile::tempdir().unwrap();
        let entrypoint = root.path().join("agent.js");
        std::fs::write(&entrypoint, "send( 'hello' );\n").unwrap();
        Self { root, entrypoint }
    }

    fn executor<'a>(&self, registry: &'a Registry, tools: &'a FakeToolchain) -> Executor<'a> {
        Executor::new(registry, tools, &self.entrypoint)
            .unwrap()
            .scratch_root(self.root.path())
    }

    fn scratch_dirs(&self) -> usize {
        std::fs::read_dir(self.root.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().starts_with(".frida_builder_"))
            .count()
    }
}

#[test]
fn reused_workflow_consumes_first_step() {
    let fixture = Fixture::new();
    let mut registry = Registry::new();
    registry.insert(
        Workflow::new("a")
            .add(Step::reuse("b"))
            .add(Step::minify(Vec::<String>::new())),
    );
    registry.insert(Workflow::new("b").add(Step::bundle(json!({"Bundle": true}))));
    let tools = FakeToolchain::default();

    let workdir = fixture.executor(&registry, &tools).run("a").unwrap();

    assert_eq!(
        tools.inputs(),
        vec![
            (Tool::Esbuild, fixture.entrypoint.clone()),
            (Tool::Terser, workdir.path().join(ARTIFACT)),
        ]
    );
    assert_eq!(
        std::fs::read_to_string(workdir.artifact()).unwrap(),
        "/*bundled*/send('hello');"
    );
}

#[test]
fn reuse_in_later_position_reads_artifact() {
    let fixture = Fixture::new();
    let mut registry = Registry::new();
    registry.insert(
        Workflow::new("outer")
            .add(Step::bundle(json!({})))
            .add(Step::reuse("inner")),
    );
    registry.insert(
        Workflow::new("inner")
            .add(Step::minify(["--compress"]))
            .add(Step::compile()),
    );
    let tools = FakeToolchain::default();

    let workdir = fixture.executor(&registry, &tools).run("outer").unwrap();

    let firsts: Vec<bool> = tools
        .inputs()
        .iter()
        .map(|(_, path)| path == &fixture.entrypoint)
        .collect();
    assert_eq!(firsts, vec![true, false, false]);
    assert!(workdir.artifact().exists());
}

#[test]
fn nested_reuse_passes_first_through() {
    let fixture = Fixture::new();
    let mut registry = Registry::new();
    registry.insert(Workflow::new("top").add(Step::reuse("middle")).add(Step::compile()));
    registry.insert(Workflow::new("middle").add(Step::reuse("leaf")).add(Step::minify(["-m"])));
    registry.insert(Workflow::new("leaf").add(Step::bundle(json!({}))));
    let tools = FakeToolchain::default();

    fixture.executor(&registry, &tools).run("top").unwrap();

    let inputs = tools.inputs();
    let first_count = inputs
        .iter()
        .filter(|(_, path)| path == &fixture.entrypoint)
        .count();
    assert_eq!(first_count, 1);
    assert_eq!(inputs[0], (Tool::Esbuild, fixture.entrypoint.clone()));
}

#[test]
fn qjsc_only_end_to_end() {
    let fixture = Fixture::new();
    let mut registry = Registry::new();
    registry.insert(Workflow::new("qjsc-only").add(Step::compile()));
    let tools = FakeToolchain::default();
    let output = fixture.root.path().join("bundle");

    let workdir = fixture.executor(&registry, &tools).run("QJSC-only ").unwrap();
    let dir = workdir.path().to_path_buf();
    workdir.finish(&output).unwrap();

    let generated = tools.generated.borrow();
    let expected = extract(&generated[0]).unwrap();
    assert_eq!(std::fs::read(&output).unwrap(), expected);
    assert_eq!(expected, std::fs::read(&fixture.entrypoint).unwrap());
    assert!(!dir.exists());
    assert_eq!(fixture.scratch_dirs(), 0);
}

#[test]
fn reruns_are_byte_identical() {
    let fixture = Fixture::new();
    let mut registry = Registry::new();
    registry.insert(
        Workflow::new("release")
            .add(Step::bundle(json!({"Bundle": true})))
            .add(Step::minify(["--compress"]))
            .add(Step::compile()),
    );

    let mut outputs = Vec::new();
    for i in 0..2 {
        let tools = FakeToolchain::default();
        let output = fixture.root.path().join(format!("bundle-{i}"));
        fixture
            .executor(&registry, &tools)
            .run("release")
            .unwrap()
            .finish(&output)
            .unwrap();
        outputs.push(std::fs::read(output).unwrap());
    }

    assert_eq!(outputs[0], outputs[1]);
}

#[test]
fn failures_abort_without_output() {
    let fixture = Fixture::new();
    let mut registry = Registry::new();
    registry.insert(
        Workflow::new("broken")
            .add(Step::bundle(json!({})))
            .add(Step {
                util: Some("webpack".to_string()),
                ..Step::default()
            }),
    );
    let tools = FakeToolchain::default();

    let err = fixture.executor(&registry, &tools).run("broken").unwrap_err();

    assert!(matches!(err, BuildError::UnknownUtil { index: 1, .. }));
    assert_eq!(fixture.scratch_dirs(), 0);
}

#[test]
fn registry_files_merge_last_wins() {
    let fixture = Fixture::new();
    let first = fixture.root.path().join("workflows.json");
    let second = fixture.root.path().join("override.yaml");
    std::fs::write(
        &first,
        r#"{"x": [{"Util": "esbuild", "EsbuildOptions": {}}], "y": [{"Util": "qjsc"}]}"#,
    )
    .unwrap();
    std::fs::write(&second, "x:\n  - Util: qjsc\n").unwrap();

    let registry = Registry::from_sources(&[first, second]);
    let tools = FakeToolchain::default();

    fixture.executor(&registry, &tools).run("x").unwrap();

    let inputs = tools.inputs();
    assert_eq!(inputs.len(), 1);
    assert_eq!(inputs[0].0, Tool::Qjsc);
    assert!(registry.contains("y"));
}
