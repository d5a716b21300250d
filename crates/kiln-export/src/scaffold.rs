//! Platform project scaffolding
//!
//! Template files are embedded in the binary and copied into the project
//! directory only when absent. The spots that depend on the application
//! (identifiers, names, start arguments) are patched on every export.

use crate::error::ExportResult;
use crate::patch::{self, StartArgs};
use crate::platform::Platform;
use kiln_build::fsutil;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// An embedded template file, `path` relative to where its group is installed
#[derive(Debug, Clone, Copy)]
pub struct Template {
    pub path: &'static str,
    pub contents: &'static str,
}

macro_rules! template {
    ($dir:literal, $path:literal) => {
        Template {
            path: $path,
            contents: include_str!(concat!("../templates/", $dir, "/", $path)),
        }
    };
}

const IOS: &[Template] = &[
    template!("ios", "main.plist"),
    template!("ios", "main.storyboard"),
    template!("ios", "Images.xcassets/Contents.json"),
    template!("ios", "Images.xcassets/AppIcon.appiconset/Contents.json"),
];
const IOS_MAIN: Template = template!("ios", "main.mm");

const MAC: &[Template] = &[
    template!("mac", "main.plist"),
    template!("mac", "main.storyboard"),
    template!("mac", "Images.xcassets/Contents.json"),
    template!("mac", "Images.xcassets/AppIcon.appiconset/Contents.json"),
];
const MAC_MAIN: Template = template!("mac", "main.mm");

const LINUX: &[Template] = &[template!("linux", "main.cc"), template!("linux", "Makefile")];
const LINUX_MAIN: Template = template!("linux", "main.cc");

const RUN_SH: Template = template!(".", "run.sh");
const EMPTY_C: Template = template!(".", "empty.c");

const ANDROID_PROJECT: &[Template] = &[
    template!("android/proj_template", "settings.gradle.kts"),
    template!("android/proj_template", "build.gradle.kts"),
    template!("android/proj_template", "gradle.properties"),
    template!("android/proj_template", "gradle/libs.versions.toml"),
];
const ANDROID_SETTINGS: Template = template!("android/proj_template", "settings.gradle.kts");

const ANDROID_APP: &[Template] = &[
    template!("android/app_template", "build.gradle.kts"),
    template!("android/app_template", "proguard-rules.pro"),
    template!("android/app_template", "src/main/AndroidManifest.xml"),
    template!("android/app_template", "src/main/res/values/strings.xml"),
];
const MAIN_ACTIVITY: Template = template!("android", "MainActivity.java");

/// File names of the xcode scaffolding, relative to the project directory
pub const PLIST: &str = "main.plist";
pub const STORYBOARD: &str = "main.storyboard";
pub const XCASSETS: &str = "Images.xcassets";
pub const XCODE_MAIN: &str = "main.mm";
pub const LINUX_MAIN_FILE: &str = "main.cc";
pub const EMPTY_SOURCE: &str = "empty.c";

const CMAKE_VERSION: &str = "3.22.1";

/// Application identity written into platform files
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppIdentity {
    /// Output name; also the native library name
    pub name: String,
    pub id: String,
    pub display_name: String,
    pub version: String,
}

/// Copy every template of a group whose target does not exist yet.
///
/// Returns the number of files written.
pub fn install_missing(templates: &[Template], dest: &Path) -> ExportResult<usize> {
    let mut written = 0;
    for template in templates {
        if install_one(template, &dest.join(template.path))? {
            written += 1;
        }
    }
    Ok(written)
}

fn install_one(template: &Template, target: &Path) -> ExportResult<bool> {
    if target.exists() {
        return Ok(false);
    }
    debug!(path = %target.display(), "installing template");
    fsutil::write_file(target, template.contents)?;
    Ok(true)
}

/// Write an entry point with its start arguments filled in, unless present
fn install_entry_point(
    template: &Template,
    target: &Path,
    args: &StartArgs,
    resource: &str,
) -> ExportResult<()> {
    if target.exists() {
        return Ok(());
    }
    fsutil::write_file(target, patch::fill_start_args(template.contents, args, resource))?;
    Ok(())
}

fn patch_file<F>(path: &Path, edit: F) -> ExportResult<()>
where
    F: FnOnce(String) -> ExportResult<String>,
{
    let text = fsutil::read_to_string(path)?;
    let patched = edit(text.clone())?;
    if patched != text {
        fsutil::write_file(path, patched)?;
    }
    Ok(())
}

/// Xcode application files for ios or mac in `proj_out`
pub fn scaffold_xcode(
    proj_out: &Path,
    platform: Platform,
    app: &AppIdentity,
    args: &StartArgs,
) -> ExportResult<()> {
    let (group, main) = match platform {
        Platform::Ios => (IOS, &IOS_MAIN),
        _ => (MAC, &MAC_MAIN),
    };
    install_missing(group, proj_out)?;

    patch_file(&proj_out.join(PLIST), |text| {
        let text = patch::set_plist_string(&text, "CFBundleIdentifier", &app.id)?;
        let text = patch::set_plist_string(&text, "CFBundleDisplayName", &app.display_name)?;
        let text = if app.version.is_empty() {
            text
        } else {
            patch::set_plist_string(&text, "CFBundleShortVersionString", &app.version)?
        };
        Ok(text.replace("[Storyboard]", STORYBOARD))
    })?;

    install_entry_point(main, &proj_out.join(XCODE_MAIN), args, "fs_resources")
}

/// Linux application files in `proj_out`
pub fn scaffold_linux(proj_out: &Path, app: &AppIdentity, args: &StartArgs) -> ExportResult<()> {
    install_entry_point(&LINUX_MAIN, &proj_out.join(LINUX_MAIN_FILE), args, "fs_resources")?;
    install_missing(LINUX, proj_out)?;

    patch_file(&proj_out.join("Makefile"), |text| {
        patch::set_makefile_target(&text, &app.name)
    })?;

    let run_sh = proj_out.join("run.sh");
    install_one(&RUN_SH, &run_sh)?;
    set_executable(&run_sh)
}

/// Empty translation unit for native applications without sources of their own
pub fn install_empty_source(output: &Path) -> ExportResult<()> {
    install_one(&EMPTY_C, &output.join(EMPTY_SOURCE))?;
    Ok(())
}

/// Android Studio project around the generated native build.
///
/// `cmake_lists` are the generated `CMakeLists.txt` files, first one
/// referenced from the app module when the application is native.
pub fn scaffold_android_studio(
    proj_out: &Path,
    app: &AppIdentity,
    args: &StartArgs,
    native: bool,
    cmake_lists: &[PathBuf],
) -> ExportResult<()> {
    let app_dir = proj_out.join("app");
    let library = if native { app.name.as_str() } else { "quark" };

    install_missing(ANDROID_PROJECT, proj_out)?;
    install_missing(ANDROID_APP, &app_dir)?;
    fsutil::create_dir_all(&app_dir.join("src/main/assets"))?;
    fsutil::create_dir_all(&app_dir.join("src/main/java"))?;

    let activity = app_dir
        .join("src/main/java")
        .join(app.id.replace('.', "/"))
        .join("MainActivity.java");
    install_one(&MAIN_ACTIVITY, &activity)?;
    patch_file(&activity, |text| {
        let text = text.replace("{id}", &app.id);
        let text = patch::set_java_library(&text, library)?;
        Ok(patch::fill_start_args(&text, args, "getPathInAssets"))
    })?;

    patch_file(&app_dir.join("src/main/AndroidManifest.xml"), |text| {
        let text = patch::set_manifest_package(&text, &app.id)?;
        patch::set_manifest_lib_name(&text, library)
    })?;

    patch_file(&app_dir.join("src/main/res/values/strings.xml"), |text| {
        patch::set_app_name(&text, &app.display_name)
    })?;

    patch_file(&app_dir.join("build.gradle.kts"), |text| {
        let text = text.replace("{id}", &app.id);
        let text = patch::set_gradle_value(&text, "namespace", &app.id)?;
        let text = patch::set_gradle_value(&text, "applicationId", &app.id)?;
        let text = if app.version.is_empty() {
            text
        } else {
            patch::set_gradle_value(&text, "versionName", &app.version)?
        };
        let mut text = patch::strip_cmake_settings(&text)?;
        if let Some(cmake) = cmake_lists.first().filter(|_| native) {
            text.push_str(&format!(
                "\nandroid.externalNativeBuild.cmake.path = \"{}\"",
                fsutil::relative_slash(&app_dir, cmake)
            ));
            text.push_str(&format!(
                "\nandroid.externalNativeBuild.cmake.version = \"{}\"",
                CMAKE_VERSION
            ));
        }
        Ok(text)
    })?;

    if native {
        for cmake in cmake_lists {
            if cmake.exists() {
                patch_file(cmake, |text| patch::strip_cmake_output_dirs(&text))?;
            } else {
                warn!("Generated {} is missing", cmake.display());
            }
        }
    }

    let settings = format!(
        "{}\nrootProject.name = \"{}\"\ninclude(\":app\")",
        ANDROID_SETTINGS.contents, app.name
    );
    fsutil::write_file(&proj_out.join("settings.gradle.kts"), settings)?;
    Ok(())
}

#[cfg(unix)]
pub(crate) fn set_executable(path: &Path) -> ExportResult<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))
        .map_err(|e| crate::error::ExportError::io(path, e))
}

#[cfg(not(unix))]
pub(crate) fn set_executable(_path: &Path) -> ExportResult<()> {
    Ok(())
}
