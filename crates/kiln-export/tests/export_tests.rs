//! Integration tests for the export pipeline
//!
//! Projects are laid out under `<temp>/demo` so the root output name is stable.

use kiln_config::GlobalConfig;
use kiln_export::{ExportEngine, ExportError, Platform};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn write(root: &Path, rel: &str, content: &str) {
    let full = root.join(rel);
    fs::create_dir_all(full.parent().unwrap()).unwrap();
    fs::write(full, content).unwrap();
}

fn create_project(files: &[(&str, &str)]) -> (TempDir, PathBuf) {
    let temp = TempDir::new().unwrap();
    let project = temp.path().join("demo");
    fs::create_dir_all(&project).unwrap();
    for (rel, content) in files {
        write(&project, rel, content);
    }
    (temp, project)
}

fn engine(project: &Path, os: &str) -> ExportEngine {
    ExportEngine::new(project, os, GlobalConfig::default())
        .unwrap()
        .with_host_address("10.0.0.1")
}

fn read_json(path: &Path) -> Value {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

fn target(project: &Path, name: &str) -> Value {
    read_json(&project.join(format!("out/{}.gypi", name)))["targets"][0].clone()
}

const APP_WITH_LIBX: &[(&str, &str)] = &[
    (
        "package.json",
        r#"{"name": "demo", "version": "1.0.0", "dependencies": {"libx": "^2.0.0"}}"#,
    ),
    ("index.js", "start();"),
    ("node_modules/libx/package.json", r#"{"name": "libx", "version": "2.0.0"}"#),
    ("node_modules/libx/src/x.cc", "int x() { return 1; }"),
    ("node_modules/libx/index.js", "module.exports = 1;"),
];

#[test]
fn test_android_app_links_native_dependency() {
    let (_temp, project) = create_project(APP_WITH_LIBX);
    let mut engine = engine(&project, "android");

    let umbrella = engine.write_descriptors().unwrap();
    assert_eq!(umbrella, project.join("demo.gyp"));

    let app = engine.node("demo").unwrap();
    assert!(app.is_app);
    assert!(app.native);
    assert!(!app.binding);
    assert_eq!(app.dependencies, vec!["libx@2.0.0"]);

    let app_target = target(&project, "demo");
    assert_eq!(app_target["type"], "shared_library");
    assert_eq!(app_target["dependencies"], json!(["libx@2.0.0"]));
    assert_eq!(
        app_target["sources"],
        json!(["../index.js", "../package.json", "empty.c"])
    );
    assert!(app_target.get("ldflags").is_none());
    assert!(project.join("out/empty.c").exists());

    let lib_target = target(&project, "libx@2.0.0");
    assert_eq!(lib_target["type"], "static_library");
    assert_eq!(lib_target["include_dirs"], json!(["../node_modules/libx"]));
    assert_eq!(
        lib_target["direct_dependent_settings"]["include_dirs"],
        json!(["../node_modules/libx"])
    );
    assert_eq!(
        lib_target["sources"],
        json!([
            "../node_modules/libx/index.js",
            "../node_modules/libx/package.json",
            "../node_modules/libx/src/x.cc"
        ])
    );

    assert_eq!(
        read_json(&umbrella),
        json!({
            "variables": { "libquark": ["libquark"] },
            "includes": ["out/libx@2.0.0.gypi", "out/demo.gypi"]
        })
    );
}

#[test]
fn test_android_app_without_native_code() {
    let (_temp, project) = create_project(&[
        ("package.json", r#"{"name": "demo", "version": "1.0.0"}"#),
        ("index.js", "start();"),
    ]);
    let mut engine = engine(&project, "android");
    engine.write_descriptors().unwrap();

    assert!(!engine.node("demo").unwrap().native);
    let app_target = target(&project, "demo");
    assert_eq!(app_target["type"], "none");
    assert!(!project.join("out/empty.c").exists());
}

#[test]
fn test_range_prefix_resolves_and_missing_dependency_is_dropped() {
    let (_temp, project) = create_project(&[
        (
            "package.json",
            r#"{"name": "demo", "version": "1.0.0", "dependencies": {"foo": "^1.2.0", "bar": "1.0.0"}}"#,
        ),
        ("node_modules/foo/package.json", r#"{"name": "foo", "version": "1.2.0"}"#),
    ]);
    let mut engine = engine(&project, "linux");
    engine.write_descriptors().unwrap();

    assert_eq!(engine.node("demo").unwrap().dependencies, vec!["foo@1.2.0"]);
    assert_eq!(
        engine.nodes().map(|n| n.output_name.as_str()).collect::<Vec<_>>(),
        vec!["demo", "foo@1.2.0"]
    );
}

#[test]
fn test_transitive_dependencies_reach_the_app() {
    let (_temp, project) = create_project(&[
        (
            "package.json",
            r#"{"name": "demo", "version": "1.0.0", "dependencies": {"a": "1.0.0"}}"#,
        ),
        (
            "node_modules/a/package.json",
            r#"{"name": "a", "version": "1.0.0", "dependencies": {"b": "~3.1.0"}}"#,
        ),
        ("node_modules/b/package.json", r#"{"name": "b", "version": "3.1.0"}"#),
        (
            "node_modules/b/binding.gyp",
            "{ 'targets': [ { 'target_name': 'b_native', 'sources': ['b.cc',] } ] }",
        ),
        ("node_modules/b/b.cc", ""),
    ]);
    let mut engine = engine(&project, "android");
    engine.write_descriptors().unwrap();

    let b = engine.node("b@3.1.0").unwrap();
    assert!(b.binding_gyp);
    assert!(!b.binding);
    assert_eq!(b.dependencies, vec!["node_modules/b/binding.gyp:b_native"]);

    assert!(engine.node("a@1.0.0").unwrap().native);

    let app = engine.node("demo").unwrap();
    assert!(app.native);
    assert_eq!(app.dependencies, vec!["a@1.0.0"]);
    assert_eq!(app.dependencies_recursion, vec!["a@1.0.0", "b@3.1.0"]);

    assert_eq!(target(&project, "b@3.1.0")["type"], "none");
    assert_eq!(
        read_json(&project.join("demo.gyp"))["includes"],
        json!(["out/a@1.0.0.gypi", "out/b@3.1.0.gypi", "out/demo.gypi"])
    );
}

#[test]
fn test_linux_app_scaffolding() {
    let (_temp, project) = create_project(APP_WITH_LIBX);
    let mut engine = engine(&project, "linux");
    engine.write_descriptors().unwrap();

    let app_target = target(&project, "demo");
    assert_eq!(app_target["type"], "executable");
    assert_eq!(app_target["ldflags"], json!(["${LDFLAGS}"]));
    assert_eq!(
        app_target["sources"],
        json!(["../index.js", "../package.json", "../project/linux/main.cc"])
    );
    assert_eq!(target(&project, "libx@2.0.0")["ldflags"], json!(["${LDFLAGS}"]));

    let proj_out = project.join("project/linux");
    let main = fs::read_to_string(proj_out.join("main.cc")).unwrap();
    assert!(main.contains("\"http://10.0.0.1:1026/ --inspect=0.0.0.0:9229\""));
    let makefile = fs::read_to_string(proj_out.join("Makefile")).unwrap();
    assert!(makefile.contains("TARGET_NAME = demo\n"));
    assert!(proj_out.join("run.sh").exists());
}

#[test]
fn test_ios_app_descriptor() {
    let (_temp, project) = create_project(&[
        (
            "package.json",
            r#"{"name": "demo", "version": "1.2.3", "id": "org.demo.app", "app": "Demo"}"#,
        ),
        ("index.js", "start();"),
        ("out/small/index.js", "start();"),
        ("out/small/package.json", "{}"),
        ("out/small/package-lock.json", "{}"),
        ("out/small/run.js", ""),
    ]);
    let mut engine = engine(&project, "ios");
    engine.write_descriptors().unwrap();

    let app_target = target(&project, "demo");
    assert_eq!(app_target["type"], "executable");
    assert_eq!(app_target["product_name"], "demo");
    assert_eq!(app_target["mac_bundle"], 1);
    assert_eq!(
        app_target["variables"]["XCODE_INFOPLIST_FILE"],
        "$(SRCROOT)/project/<(os)/main.plist"
    );
    assert_eq!(
        app_target["xcode_settings"]["PRODUCT_BUNDLE_IDENTIFIER"],
        "org.demo.app"
    );
    assert_eq!(
        app_target["mac_bundle_resources"],
        json!([
            "small/index.js",
            "small/package.json",
            "../project/<(os)/main.storyboard",
            "../project/<(os)/Images.xcassets"
        ])
    );
    assert_eq!(
        app_target["sources"],
        json!([
            "../index.js",
            "../package.json",
            "../project/<(os)/main.plist",
            "../project/<(os)/main.mm"
        ])
    );

    let plist = fs::read_to_string(project.join("project/ios/main.plist")).unwrap();
    assert!(plist.contains("<string>org.demo.app</string>"));
    assert!(plist.contains("<string>Demo</string>"));
    assert!(plist.contains("<string>1.2.3</string>"));
}

#[test]
fn test_add_module_is_memoized() {
    let (_temp, project) = create_project(APP_WITH_LIBX);
    let mut engine = engine(&project, "mac");

    let first = engine.add_module(&project, true, false).unwrap();
    let second = engine.add_module(&project, true, false).unwrap();
    assert_eq!(first, "demo");
    assert_eq!(second, "demo");
    assert_eq!(engine.nodes().count(), 2);

    let lib = engine
        .add_module(&project.join("node_modules/libx"), false, true)
        .unwrap();
    assert_eq!(lib, "libx@2.0.0");
    assert_eq!(engine.nodes().count(), 2);
}

#[test]
fn test_constructor_rejects_bad_input() {
    let (_temp, project) = create_project(&[("package.json", r#"{"name": "demo", "version": "1.0.0"}"#)]);

    assert!(matches!(
        ExportEngine::new("https://example.com/demo", "ios", GlobalConfig::default()),
        Err(ExportError::InvalidSource(_))
    ));
    assert!(matches!(
        ExportEngine::new(project.join("missing"), "ios", GlobalConfig::default()),
        Err(ExportError::Config { .. })
    ));
    assert!(matches!(
        ExportEngine::new(&project, "windows", GlobalConfig::default()),
        Err(ExportError::UnsupportedPlatform(_))
    ));

    let engine = ExportEngine::new(&project, "android", GlobalConfig::default()).unwrap();
    assert_eq!(engine.platform(), Platform::Android);
    assert!(project.join("project/android").is_dir());
}

#[test]
fn test_ensure_built_runs_the_build_once() {
    let (_temp, project) = create_project(&[
        ("package.json", r#"{"name": "demo", "version": "1.0.0"}"#),
        ("index.js", "start();"),
    ]);
    let engine = engine(&project, "linux");

    engine.ensure_built().unwrap();
    let manifest = project.join("out/build/package.json");
    assert!(manifest.is_file());
    assert!(read_json(&manifest)["hash"].is_string());

    fs::write(project.join("index.js"), "changed();").unwrap();
    engine.ensure_built().unwrap();
    assert_eq!(
        fs::read_to_string(project.join("out/build/index.js")).unwrap(),
        "start();"
    );
}

#[cfg(unix)]
#[test]
fn test_android_project_generation() {
    let (temp, project) = create_project(APP_WITH_LIBX);
    write(&project, "out/build/package.json", r#"{"name": "demo", "version": "1.0.0"}"#);
    write(temp.path(), "sdk/cacert.pem", "cert");
    write(temp.path(), "sdk/android/libquark.so", "elf");

    let mut config = GlobalConfig::default();
    config.toolchain.generator = "true".to_string();
    config.sdk.bundle_resources = vec![temp.path().join("sdk/cacert.pem")];
    config
        .sdk
        .libraries
        .insert("android".to_string(), vec![temp.path().join("sdk/android")]);
    config.sdk.gyp_includes = vec![temp.path().join("sdk/common.gypi")];

    let mut engine = ExportEngine::new(&project, "android", config)
        .unwrap()
        .with_host_address("10.0.0.1");
    let opened = engine.prepare_project(false).unwrap();
    assert_eq!(opened, project.join("project/android"));

    assert_eq!(fs::read_to_string(project.join("out/usr/cacert.pem")).unwrap(), "cert");
    assert!(project.join("out/usr/android/libquark.so").exists());
    assert_eq!(
        engine.node("demo").unwrap().bundle_resources,
        vec!["usr/cacert.pem"]
    );

    assert_eq!(
        read_json(&project.join("out/var.gypi")),
        json!({
            "variables": {
                "OS": "android",
                "os": "android",
                "style": "cmake-linux",
                "DEPTH": project.to_string_lossy()
            }
        })
    );

    let app = project.join("project/android/app");
    let gradle = fs::read_to_string(app.join("build.gradle.kts")).unwrap();
    assert!(gradle.contains("applicationId = \"org.quark.demo\""));
    assert!(gradle.contains("out/android/demo/out/Release/CMakeLists.txt"));
    assert!(app.join("src/main/java/org/quark/demo/MainActivity.java").exists());

    let settings = fs::read_to_string(project.join("project/android/settings.gradle.kts")).unwrap();
    assert!(settings.contains("rootProject.name = \"demo\""));
}

#[cfg(unix)]
#[test]
fn test_generator_failure_is_reported() {
    let (_temp, project) = create_project(&[("package.json", r#"{"name": "demo", "version": "1.0.0"}"#)]);
    let mut config = GlobalConfig::default();
    config.toolchain.generator = "false".to_string();

    let mut engine = ExportEngine::new(&project, "linux", config)
        .unwrap()
        .with_host_address("10.0.0.1");
    let err = engine.generate().unwrap_err();
    assert!(matches!(
        err,
        ExportError::Build(kiln_build::BuildError::ToolFailed { .. })
    ));
}
