//! Language detection for snippets and archive members.
//!
//! Tags are the identifiers the highlighting layer understands
//! (`javascript`, `csharp`, `plaintext`, ...). Anything unrecognised maps to
//! [`DEFAULT_LANGUAGE`].

/// Tag used whenever no better guess is available.
pub const DEFAULT_LANGUAGE: &str = "plaintext";

/// Extensions decoded eagerly when an archive is uploaded.
const SUPPORTED_TEXT_EXTENSIONS: &[&str] = &[
    "js", "ts", "tsx", "py", "java", "cs", "cpp", "c", "h", "hpp", "go", "rs", "md", "txt", "json",
    "html", "css", "scss", "xml", "yaml", "yml",
];

/// Extensions that are never routed through text decoding.
const BINARY_EXTENSIONS: &[&str] = &[
    // office documents
    "xlsx", "xls", "xlsm", "doc", "docx", "pdf", "ppt", "pptx", "odt", "ods", "odp", "rtf",
    // archives and packages
    "rar", "7z", "zip", "tar", "gz", "bz2", "xz", "iso", "dmg", "unitypackage", "jar", "apk",
    "deb", "rpm", "msi",
    // executables and libraries
    "exe", "dll", "so", "dylib", "class", "o", "a", "wasm",
    // images
    "jpg", "jpeg", "png", "gif", "bmp", "ico", "svg", "webp", "tiff", "psd", "ai", "sketch",
    "eps", "raw", "cr2", "nef",
    // audio and video
    "mp3", "mp4", "wav", "avi", "mov", "wmv", "flv", "mkv", "webm", "m4v", "3gp", "mpeg", "mpg",
    "vob", "swf", "ogg", "flac",
    // CAD and 3D
    "stl", "dwg", "dxf", "3mf", "obj", "fbx", "3ds", "max", "blend", "ma", "mb", "lwo", "ply",
    "gltf", "glb", "f3d", "step", "ipt", "iam",
    // databases
    "db", "sqlite", "mdb", "accdb", "frm", "myd", "myi",
    // disk images and blobs
    "vdi", "vmdk", "vhd", "vhdx", "qcow2", "img", "bin", "dat",
    // fonts
    "ttf", "otf", "woff", "woff2",
];

/// Lower-cased text after the last `.` of the final path segment.
///
/// Dotfiles like `.gitignore` have no extension.
fn extension(filename: &str) -> Option<String> {
    let name = filename.rsplit('/').next().unwrap_or(filename);
    match name.rfind('.') {
        Some(0) | None => None,
        Some(i) => Some(name[i + 1..].to_ascii_lowercase()),
    }
}

/// Classify a file by its extension.
pub fn classify_by_extension(filename: &str) -> &'static str {
    let Some(ext) = extension(filename) else {
        return DEFAULT_LANGUAGE;
    };

    match ext.as_str() {
        "js" | "jsx" | "mjs" | "cjs" => "javascript",
        "ts" | "tsx" | "mts" | "cts" => "typescript",
        "py" | "pyw" => "python",
        "java" => "java",
        "cs" => "csharp",
        "cpp" | "cc" | "cxx" | "c" | "h" | "hpp" | "hh" => "cpp",
        "go" => "go",
        "rs" => "rust",
        "php" => "php",
        "rb" => "ruby",
        "swift" => "swift",
        "kt" | "kts" => "kotlin",
        "dart" => "dart",
        "html" | "htm" => "html",
        "css" => "css",
        "scss" => "scss",
        "json" => "json",
        "xml" => "xml",
        "yaml" | "yml" => "yaml",
        "md" | "markdown" => "markdown",
        "sql" => "sql",
        "sh" | "bash" => "shell",
        "toml" => "toml",
        _ => DEFAULT_LANGUAGE,
    }
}

/// Best-effort guess from source text, for snippets pasted without a
/// filename. Checks run in order and the first hit wins.
pub fn classify_by_source(text: &str) -> &'static str {
    let has = |needle: &str| text.contains(needle);

    if has("<?php") {
        "php"
    } else if has("package main") || (has("func ") && has(":= ")) {
        "go"
    } else if has("fn main()") || has("use std::") {
        "rust"
    } else if has("using System;") || (has("namespace ") && has("{")) {
        "csharp"
    } else if has("public class")
        || has("System.out.println")
        || has("private void")
        || has("import java.")
    {
        "java"
    } else if has("#include") || has("int main(") {
        "cpp"
    } else if has("def ") || has("import numpy") || has("print(") || has_python_import(text) {
        "python"
    } else if has("interface ") || has("<T>") || has(": string") || has(": number") {
        "typescript"
    } else if has("function")
        || has("=>")
        || has("const ")
        || has("let ")
        || has("var ")
        || has(" from '")
        || has(" from \"")
    {
        "javascript"
    } else if has("func ") {
        "go"
    } else {
        DEFAULT_LANGUAGE
    }
}

/// A bare `import x` line. ES module imports (`... from 'x'`) and Go import
/// forms (`import "x"`, `import (`) do not count.
fn has_python_import(text: &str) -> bool {
    text.lines().any(|line| {
        let Some(rest) = line.trim_start().strip_prefix("import ") else {
            return false;
        };
        let rest = rest.trim_start();
        !rest.starts_with(['"', '(', '{', '\'', '*'])
            && !line.contains(" from '")
            && !line.contains(" from \"")
    })
}

/// Language of a plain snippet: from the filename when there is one,
/// otherwise guessed from the code.
pub fn snippet_language(filename: Option<&str>, code: &str) -> &'static str {
    match filename {
        Some(name) => classify_by_extension(name),
        None => classify_by_source(code),
    }
}

pub fn is_binary_by_extension(filename: &str) -> bool {
    match extension(filename) {
        Some(ext) => BINARY_EXTENSIONS.contains(&ext.as_str()) || is_pak_extension(&ext),
        None => false,
    }
}

/// Numbered game packs: `pak`, `pak2` .. `pak50`.
fn is_pak_extension(ext: &str) -> bool {
    match ext.strip_prefix("pak") {
        Some("") => true,
        Some(n) => n.parse::<u8>().is_ok_and(|n| (2..=50).contains(&n)),
        None => false,
    }
}

pub fn is_supported_text(filename: &str) -> bool {
    extension(filename).is_some_and(|ext| SUPPORTED_TEXT_EXTENSIONS.contains(&ext.as_str()))
}

/// Human-readable label for a language tag.
pub fn display_name(language: &str) -> &str {
    match language {
        "javascript" => "JavaScript",
        "typescript" => "TypeScript",
        "python" => "Python",
        "java" => "Java",
        "cpp" => "C++",
        "c" => "C",
        "csharp" => "C#",
        "php" => "PHP",
        "ruby" => "Ruby",
        "go" => "Go",
        "rust" => "Rust",
        "swift" => "Swift",
        "kotlin" => "Kotlin",
        "dart" => "Dart",
        "html" => "HTML",
        "css" => "CSS",
        "scss" => "SCSS",
        "json" => "JSON",
        "xml" => "XML",
        "yaml" => "YAML",
        "markdown" => "Markdown",
        "sql" => "SQL",
        "shell" => "Shell",
        "toml" => "TOML",
        "plaintext" => "txt",
        other => other,
    }
}

/// File extension used when a snippet in `language` is saved to disk.
pub fn extension_for_language(language: &str) -> &'static str {
    match language {
        "javascript" => "js",
        "typescript" => "ts",
        "python" => "py",
        "java" => "java",
        "csharp" => "cs",
        "cpp" => "cpp",
        "go" => "go",
        "rust" => "rs",
        "dart" => "dart",
        "php" => "php",
        "ruby" => "rb",
        "swift" => "swift",
        "kotlin" => "kt",
        "html" => "html",
        "css" => "css",
        "scss" => "scss",
        "json" => "json",
        "xml" => "xml",
        "yaml" => "yaml",
        "markdown" => "md",
        "sql" => "sql",
        "shell" => "sh",
        "toml" => "toml",
        _ => "txt",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_table() {
        assert_eq!(classify_by_extension("app.JSX"), "javascript");
        assert_eq!(classify_by_extension("src/main.tsx"), "typescript");
        assert_eq!(classify_by_extension("a.py"), "python");
        assert_eq!(classify_by_extension("Main.java"), "java");
        assert_eq!(classify_by_extension("Program.cs"), "csharp");
        assert_eq!(classify_by_extension("lib.h"), "cpp");
        assert_eq!(classify_by_extension("x.hpp"), "cpp");
        assert_eq!(classify_by_extension("main.go"), "go");
        assert_eq!(classify_by_extension("lib.rs"), "rust");
        assert_eq!(classify_by_extension("config.yml"), "yaml");
    }

    #[test]
    fn unknown_or_missing_extension_uses_default() {
        assert_eq!(classify_by_extension("notes.txt"), DEFAULT_LANGUAGE);
        assert_eq!(classify_by_extension("Makefile"), DEFAULT_LANGUAGE);
        assert_eq!(classify_by_extension("weird.xyz"), DEFAULT_LANGUAGE);
        assert_eq!(classify_by_extension(".bashrc"), DEFAULT_LANGUAGE);
        assert_eq!(classify_by_extension("dir.v2/README"), DEFAULT_LANGUAGE);
        assert_eq!(classify_by_extension(""), DEFAULT_LANGUAGE);
    }

    #[test]
    fn source_heuristics() {
        assert_eq!(classify_by_source("print(1)"), "python");
        assert_eq!(classify_by_source("def f():\n    return 1"), "python");
        assert_eq!(
            classify_by_source("public class A { void m() { System.out.println(1); } }"),
            "java"
        );
        assert_eq!(classify_by_source("package main\n\nfunc main() {}"), "go");
        assert_eq!(classify_by_source("fn main() { println!(\"hi\"); }"), "rust");
        assert_eq!(classify_by_source("#include <stdio.h>\nint main() {}"), "cpp");
        assert_eq!(classify_by_source("<?php echo 1; ?>"), "php");
        assert_eq!(classify_by_source("const x = () => 1"), "javascript");
        assert_eq!(
            classify_by_source("interface A { x: number }\nconst a: A = { x: 1 }"),
            "typescript"
        );
        assert_eq!(classify_by_source("just some words"), DEFAULT_LANGUAGE);
        assert_eq!(classify_by_source(""), DEFAULT_LANGUAGE);
    }

    #[test]
    fn import_lines() {
        assert_eq!(classify_by_source("import os\nos.getcwd()"), "python");
        assert_eq!(classify_by_source("import sys, json"), "python");
        assert_eq!(classify_by_source("import java.util.List;"), "java");
        assert_eq!(
            classify_by_source("import \"fmt\"\n\nfunc main() {}"),
            "go"
        );
        assert_eq!(classify_by_source("import { a } from 'b'"), "javascript");
        assert_eq!(classify_by_source("import React from \"react\""), "javascript");
        assert_eq!(
            classify_by_source("import { a } from 'b'\nlet n: number = a"),
            "typescript"
        );
    }

    #[test]
    fn snippet_language_prefers_filename() {
        assert_eq!(snippet_language(Some("main.go"), "print(1)"), "go");
        assert_eq!(snippet_language(None, "print(1)"), "python");
    }

    #[test]
    fn binary_denylist() {
        assert!(is_binary_by_extension("archive.rar"));
        assert!(is_binary_by_extension("photos/IMG_0001.JPG"));
        assert!(is_binary_by_extension("model.blend"));
        assert!(is_binary_by_extension("game.pak"));
        assert!(is_binary_by_extension("game.pak17"));
        assert!(!is_binary_by_extension("game.pak51"));
        assert!(!is_binary_by_extension("main.rs"));
        assert!(!is_binary_by_extension("README"));
    }

    #[test]
    fn supported_text_allow_list() {
        assert!(is_supported_text("src/index.ts"));
        assert!(is_supported_text("STYLE.SCSS"));
        assert!(!is_supported_text("Cargo.toml"));
        assert!(!is_supported_text("LICENSE"));
    }

    #[test]
    fn download_helpers() {
        assert_eq!(display_name("csharp"), "C#");
        assert_eq!(display_name("elixir"), "elixir");
        assert_eq!(extension_for_language("python"), "py");
        assert_eq!(extension_for_language(DEFAULT_LANGUAGE), "txt");
    }
}
