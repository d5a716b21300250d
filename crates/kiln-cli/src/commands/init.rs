//! Init command - create a project in an empty directory

use crate::config::Context;
use anyhow::{anyhow, bail, Context as _, Result};
use kiln_build::fsutil;
use serde_json::json;
use std::path::Path;

const INDEX_TSX: &str = r#"
import { Application,Window,Jsx } from 'quark';

const app = new Application();

const win = new Window().render(
	<free width="match" height="match">
		<text value="Hello world" textSize={48} align="centerMiddle" />
	</free>
);
"#;

// A package with a single source file does not compile.
const TEST_TS: &str = r#"

console.log('test');

"#;

const EDITORCONFIG: &str = "
# top-most EditorConfig file
root = true

# all files
[*]
indent_style = tab
indent_size = 2

";

const GITIGNORE: [&str; 7] = [
    ".vscode",
    "*.DS_Store",
    "node_modules",
    "out",
    "project",
    "*.gyp",
    ".tsconfig.json",
];

/// Run the init command
pub fn run(ctx: &Context, template: Option<&str>) -> Result<()> {
    if has_entries(&ctx.cwd)? {
        bail!("Directory must be empty: {}", ctx.cwd.display());
    }
    ctx.install_types()?;

    match template {
        Some("examples") => {
            let examples = ctx
                .config
                .sdk
                .examples
                .as_ref()
                .ok_or_else(|| anyhow!("No examples configured, set sdk.examples"))?;
            fsutil::copy_tree(examples, &ctx.cwd, false, |_| false)
                .with_context(|| format!("Failed to copy examples from {}", examples.display()))?;
        }
        Some(other) => bail!("Unknown template '{}', expected 'examples'", other),
        None => write_default_project(&ctx.cwd)?,
    }

    println!("Initialized project in {}", ctx.cwd.display());
    Ok(())
}

fn has_entries(dir: &Path) -> Result<bool> {
    let mut entries =
        std::fs::read_dir(dir).with_context(|| format!("Failed to read {}", dir.display()))?;
    Ok(entries.next().is_some())
}

/// Project name from the directory name
pub fn project_name(dir: &Path) -> String {
    dir.file_name()
        .and_then(|n| n.to_str())
        .filter(|n| !n.is_empty())
        .unwrap_or("kilnproj")
        .to_string()
}

fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub fn default_manifest(name: &str) -> serde_json::Value {
    json!({
        "name": name,
        "app": capitalize(name),
        "id": format!("org.quark.{}", name),
        "main": "index.js",
        "types": "index",
        "version": "1.0.0",
        "description": "",
        "dependencies": {}
    })
}

pub fn default_tsconfig() -> serde_json::Value {
    json!({
        "compileOnSave": true,
        "compilerOptions": {
            "noEmitHelpers": true,
            "module": "commonjs",
            "target": "ES2018",
            "moduleResolution": "node",
            "sourceMap": false,
            "outDir": "out/build",
            "rootDir": ".",
            "baseUrl": ".",
            "declaration": true,
            "alwaysStrict": true,
            "allowJs": true,
            "checkJs": false,
            "strict": true,
            "noImplicitAny": true,
            "noImplicitThis": true,
            "strictNullChecks": true,
            "strictPropertyInitialization": false,
            "emitDecoratorMetadata": false,
            "experimentalDecorators": true,
            "removeComments": true,
            "jsx": "react",
            "jsxFactory": "Jsx",
            "incremental": true,
            "tsBuildInfoFile": "./out/tsbuildinfo"
        },
        "include": ["**/*"],
        "exclude": ["out", ".git", "project", "node_modules"]
    })
}

fn write_default_project(dir: &Path) -> Result<()> {
    let name = project_name(dir);
    let files = [
        ("package.json", serde_json::to_string_pretty(&default_manifest(&name))?),
        ("index.tsx", INDEX_TSX.to_string()),
        ("test.ts", TEST_TS.to_string()),
        ("tsconfig.json", serde_json::to_string_pretty(&default_tsconfig())?),
        (".editorconfig", EDITORCONFIG.to_string()),
        (".gitignore", GITIGNORE.join("\n")),
    ];
    for (file, content) in files {
        let path = dir.join(file);
        fsutil::write_file(&path, content.as_bytes())
            .with_context(|| format!("Failed to write {}", path.display()))?;
    }
    Ok(())
}
